use bitvec::prelude::BitVec;

use super::{FlowGraph, InterferenceGraph, Liveness, Renumber};

/// A register to register copy that is a candidate for coalescing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub node: u32,
    pub dst: u32,
    pub src: u32,
}

// Walks every node in flow order and lets every definition interfere with everything live after it
// The source of a move does not interfere with its destination, which allows them to be coalesced
// Without coalescing moves are treated like any other instruction
pub fn build(
    flow: &FlowGraph,
    liveness: &Liveness,
    renumber: &Renumber,
    coalesce: bool,
) -> (InterferenceGraph, Vec<Move>) {
    log::debug!("Starting build stage");
    let mut graph = InterferenceGraph::new(renumber.length, renumber.vreg_count());
    let mut moves = Vec::new();

    for &n in &flow.order {
        let node = &flow.nodes[n as usize];
        let mut live: BitVec = liveness.live_out[n as usize].clone();

        if node.is_move && coalesce {
            for &used in &node.uses {
                live.set(used as usize, false);
            }
            moves.push(Move {
                node: n,
                dst: node.defs[0],
                src: node.uses[0],
            });
        }

        for &def in &node.defs {
            live.set(def as usize, true);
        }
        for &def in &node.defs {
            for l in live.iter_ones() {
                graph.add_edge(l as u32, def);
            }
        }

        // Both registers of a symbolic store are in use at the same moment
        if let Some((base, value)) = node.symbolic_store {
            graph.add_edge(base, value);
        }
    }

    // Moves are handled in program order by the coalesce phase
    moves.sort_unstable_by_key(|m| m.node);
    fill_move_lists(&mut graph, &moves);

    log::debug!("Build found {} moves", moves.len());
    log::trace!("Graph:{:?}", graph);
    (graph, moves)
}

fn fill_move_lists(graph: &mut InterferenceGraph, moves: &[Move]) {
    for (m, copy) in moves.iter().enumerate() {
        graph.add_move(copy.dst, m as u32);
        graph.add_move(copy.src, m as u32);
    }
}
