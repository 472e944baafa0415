use std::{
    collections::{HashMap, HashSet},
    fmt::{self, Display},
    ops::Index,
};

use smallvec::{smallvec, SmallVec};

use super::AsmBlock;
use crate::error::AllocationError;

pub struct ControlFlowNode {
    pub predecessors: SmallVec<[u32; 4]>,
    pub successors: SmallVec<[u32; 4]>,
    pub label: u32,
    pub loop_depth: u32,
}

impl Display for ControlFlowNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} -> {} -> {:?} (depth {})",
            self.predecessors, self.label, self.successors, self.loop_depth
        )
    }
}

impl ControlFlowNode {
    pub fn new(label: u32) -> ControlFlowNode {
        ControlFlowNode {
            predecessors: SmallVec::new(),
            successors: SmallVec::new(),
            label,
            loop_depth: 0,
        }
    }
}

pub struct ControlFlowGraph {
    pub graph: Vec<ControlFlowNode>,
    pub reachable: Vec<bool>,
}

pub type CFG = ControlFlowGraph;

impl ControlFlowGraph {
    pub fn to_string(cfg: &ControlFlowGraph) -> String {
        let mut result = String::new();
        for block in &cfg.graph {
            result.push_str(&format!("{}\n", block));
        }
        result
    }

    // Every branch or jump ends a path inside the block unless it is conditional
    // A block without a terminator falls through into the next block
    pub fn find_successors(
        cfg: &mut ControlFlowGraph,
        blocks: &[AsmBlock],
        labels: &HashMap<&str, u32>,
        function: &str,
    ) -> Result<(), AllocationError> {
        let length = blocks.len() as u32;
        for (block, i) in blocks.iter().zip(0u32..) {
            let node = &mut cfg.graph[i as usize];
            let mut falls_through = true;
            for instruction in &block.instructions {
                if let Some(target) = instruction.branch_target() {
                    let target = *labels.get(target).ok_or_else(|| {
                        AllocationError::UnknownLabel {
                            function: function.to_string(),
                            label: target.to_string(),
                        }
                    })?;
                    if !node.successors.contains(&target) {
                        node.successors.push(target);
                    }
                }
                if instruction.is_terminator() {
                    falls_through = false;
                    break;
                }
            }
            // The last block has no successor to fall into
            if falls_through && i + 1 < length && !node.successors.contains(&(i + 1)) {
                node.successors.push(i + 1);
            }
        }
        Ok(())
    }

    pub fn find_predecessors(cfg: &mut ControlFlowGraph) {
        for block in 0..cfg.graph.len() {
            for successor in cfg.graph[block].successors.clone() {
                cfg.graph[successor as usize]
                    .predecessors
                    .push(block as u32);
            }
        }
    }

    // Depth first search from the entry block
    // An edge to a block that is still on the stack is a back edge and closes a loop
    fn find_loops(cfg: &mut ControlFlowGraph) {
        let length = cfg.len();
        let mut reachable = vec![false; length];
        let mut on_stack = vec![false; length];
        let mut back_edges = Vec::new();
        if length == 0 {
            cfg.reachable = reachable;
            return;
        }

        let mut stack: Vec<(usize, usize)> = vec![(0, 0)];
        reachable[0] = true;
        on_stack[0] = true;
        while let Some((block, next)) = stack.pop() {
            if let Some(&succ) = cfg.graph[block].successors.get(next) {
                stack.push((block, next + 1));
                let succ = succ as usize;
                if on_stack[succ] {
                    back_edges.push((block, succ as u32));
                } else if !reachable[succ] {
                    reachable[succ] = true;
                    on_stack[succ] = true;
                    stack.push((succ, 0));
                }
            } else {
                on_stack[block] = false;
            }
        }

        let mut loops: HashMap<u32, SmallVec<[u32; 4]>> = HashMap::new();
        for (back_edge, header) in back_edges {
            let mut body = search_loop_body(cfg, back_edge, header);
            let entry = loops.entry(header).or_insert_with(SmallVec::new);
            entry.append(&mut body);
            entry.sort_unstable();
            entry.dedup();
        }
        for body in loops.values() {
            for &b in body {
                cfg.graph[b as usize].loop_depth += 1;
            }
        }
        cfg.reachable = reachable;
    }

    pub fn construct(blocks: &[AsmBlock], function: &str) -> Result<ControlFlowGraph, AllocationError> {
        log::debug!("Constructing CFG for {}", function);
        let labels: HashMap<&str, u32> = blocks
            .iter()
            .zip(0u32..)
            .map(|(block, i)| (block.label.as_str(), i))
            .collect();
        let graph = (0..blocks.len() as u32).map(ControlFlowNode::new).collect();
        let mut cfg = ControlFlowGraph {
            graph,
            reachable: Vec::new(),
        };
        CFG::find_successors(&mut cfg, blocks, &labels, function)?;
        CFG::find_predecessors(&mut cfg);
        CFG::find_loops(&mut cfg);
        log::trace!("CFG:\n{}", CFG::to_string(&cfg));

        Ok(cfg)
    }

    pub fn is_reachable(&self, block: usize) -> bool {
        self.reachable[block]
    }

    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ControlFlowNode> {
        self.graph.iter()
    }
}

fn search_loop_body(cfg: &ControlFlowGraph, back_edge: usize, header: u32) -> SmallVec<[u32; 4]> {
    let mut loop_body = smallvec![header];
    let header = header as usize;
    let mut stack = vec![back_edge];
    let mut visited = HashSet::new();

    while let Some(block) = stack.pop() {
        if block == header || !visited.insert(block) {
            continue;
        }
        loop_body.push(block as u32);

        stack.extend(
            cfg.graph[block]
                .predecessors
                .iter()
                .map(|&p| p as usize)
                .filter(|&pred| pred != header)
                .filter(|pred| !visited.contains(pred)),
        );
    }

    loop_body
}

impl Index<usize> for ControlFlowGraph {
    type Output = ControlFlowNode;
    fn index(&self, index: usize) -> &Self::Output {
        &self.graph[index]
    }
}
