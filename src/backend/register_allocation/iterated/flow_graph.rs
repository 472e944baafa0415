use std::collections::HashMap;
use std::fmt::{self, Debug};

use smallvec::{smallvec, SmallVec};

use crate::backend::asm::{ControlFlowGraph, Instruction};

use super::super::RegisterBackend;
use super::Renumber;

/// One instruction of a reachable block, with its registers renumbered
pub struct FlowNode {
    pub block: usize,
    pub position: usize,
    pub defs: SmallVec<[u32; 4]>,
    pub uses: SmallVec<[u32; 4]>,
    pub successors: SmallVec<[u32; 2]>,
    pub is_move: bool,
    // (address base, value) of a store into a symbolic slot
    pub symbolic_store: Option<(u32, u32)>,
    pub loop_depth: u32,
}

/// The instruction level view of a function used by liveness and build
pub struct FlowGraph {
    pub nodes: Vec<FlowNode>,
    // Reverse instruction order, which makes the backwards analysis converge quickly
    pub order: Vec<u32>,
}

impl FlowGraph {
    pub fn construct<B: RegisterBackend>(
        backend: &B,
        cfg: &ControlFlowGraph,
        renumber: &Renumber,
    ) -> FlowGraph {
        let blocks = backend.blocks();
        let labels: HashMap<&str, usize> = blocks
            .iter()
            .enumerate()
            .map(|(i, block)| (block.label.as_str(), i))
            .collect();

        // Instructions after the first terminator of a block are never executed
        let reachable_length: Vec<usize> = blocks
            .iter()
            .enumerate()
            .map(|(i, block)| {
                if !cfg.is_reachable(i) {
                    return 0;
                }
                block
                    .instructions
                    .iter()
                    .position(Instruction::is_terminator)
                    .map_or(block.instructions.len(), |p| p + 1)
            })
            .collect();

        let mut first_node = Vec::with_capacity(blocks.len());
        let mut count = 0u32;
        for &length in &reachable_length {
            first_node.push(count);
            count += length as u32;
        }

        // The first node executed when entering a block, empty blocks fall through
        let entry_of = |mut block: usize| -> Option<u32> {
            while block < blocks.len() {
                if reachable_length[block] > 0 {
                    return Some(first_node[block]);
                }
                block += 1;
            }
            None
        };

        let mut nodes = Vec::with_capacity(count as usize);
        for (b, block) in blocks.iter().enumerate() {
            let length = reachable_length[b];
            for (position, instruction) in block.instructions[..length].iter().enumerate() {
                let index = first_node[b] + position as u32;
                let mut successors: SmallVec<[u32; 2]> = smallvec![];

                if let Some(target) = instruction.branch_target() {
                    // Labels were checked while constructing the cfg
                    if let Some(entry) = labels.get(target).and_then(|&t| entry_of(t)) {
                        successors.push(entry);
                    }
                }
                if !instruction.is_terminator() {
                    let next = if position + 1 < length {
                        Some(index + 1)
                    } else {
                        entry_of(b + 1)
                    };
                    if let Some(next) = next {
                        if !successors.contains(&next) {
                            successors.push(next);
                        }
                    }
                }

                let renumbered = |registers: SmallVec<[_; 4]>| -> SmallVec<[u32; 4]> {
                    registers.into_iter().map(|reg| renumber.index(reg)).collect()
                };
                nodes.push(FlowNode {
                    block: b,
                    position,
                    defs: renumbered(instruction.defs()),
                    uses: renumbered(instruction.uses()),
                    successors,
                    is_move: instruction.is_move(),
                    symbolic_store: instruction
                        .symbolic_store()
                        .map(|(base, value)| (renumber.index(base), renumber.index(value))),
                    loop_depth: cfg[b].loop_depth,
                });
            }
        }

        let order = (0..count).rev().collect();
        log::trace!("Flow graph of {} with {} nodes", backend.name(), count);
        FlowGraph { nodes, order }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Debug for FlowGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, node) in self.nodes.iter().enumerate() {
            writeln!(
                f,
                "{}: def {:?} use {:?} -> {:?}{}",
                i,
                node.defs,
                node.uses,
                node.successors,
                if node.is_move { " (move)" } else { "" }
            )?;
        }
        Ok(())
    }
}
