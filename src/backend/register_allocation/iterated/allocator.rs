use std::collections::HashSet;

use crate::backend::asm::{ControlFlowGraph, RegisterCatalog, VirtualRegister};
use crate::backend::register_allocation::{AllocationReport, AllocationSettings, RegisterBackend};
use crate::error::AllocationError;

use super::write_back::write_back;
use super::{
    build, FlowGraph, InterferenceGraph, Liveness, Move, MoveState, NodeState, Renumber,
    SpillCode,
};
use super::worklist::Worklists;

/// State of a single coloring attempt
/// Everything in here is thrown away when the attempt ends in a spill
pub struct Coloring<'a> {
    pub graph: InterferenceGraph,
    pub moves: Vec<Move>,
    pub worklists: Worklists,
    pub renumber: &'a Renumber<'a>,
    // Number of colors
    pub k: usize,
    pub priority: Vec<f64>,
}

impl<'a> Coloring<'a> {
    pub fn new(
        graph: InterferenceGraph,
        moves: Vec<Move>,
        renumber: &'a Renumber<'a>,
        priority: Vec<f64>,
    ) -> Coloring<'a> {
        let worklists = Worklists::new(graph.length, renumber.vreg_count(), moves.len());
        Coloring {
            graph,
            moves,
            worklists,
            renumber,
            k: renumber.catalog().allocatable_count(),
            priority,
        }
    }

    // Sorts the initial nodes into the first worklists
    pub fn make_worklist(&mut self, initial: impl Iterator<Item = u32>) {
        for n in initial {
            let state = if self.graph.degree(n) >= self.k {
                NodeState::Spill
            } else if self.move_related(n) {
                NodeState::Freeze
            } else {
                NodeState::Simplify
            };
            self.worklists.transition(n, state);
        }
    }

    // Simplify > Coalesce > Freeze > Select spill, until every worklist is empty
    pub fn run(&mut self, verify: bool) {
        loop {
            if self.worklists.has_simplify() {
                self.simplify();
            } else if self.worklists.has_moves() {
                self.coalesce();
            } else if self.worklists.has_freeze() {
                self.freeze();
            } else if self.worklists.has_spill() {
                self.select_spill();
            } else {
                break;
            }
            if verify {
                self.verify_degrees();
            }
        }
    }

    // Neighbors that are still part of the graph
    pub fn adjacent(&self, n: u32) -> impl Iterator<Item = u32> + '_ {
        self.graph.adjacency_list[n as usize]
            .iter()
            .copied()
            .filter(move |&m| {
                !matches!(
                    self.worklists.state(m),
                    NodeState::Selected | NodeState::Coalesced
                )
            })
    }

    // Moves of n that may still be coalesced
    pub fn node_moves(&self, n: u32) -> impl Iterator<Item = u32> + '_ {
        self.graph.move_list[n as usize]
            .iter()
            .copied()
            .filter(move |&m| self.worklists.is_move_pending(m))
    }

    pub fn move_related(&self, n: u32) -> bool {
        self.node_moves(n).next().is_some()
    }

    pub fn is_precolored(&self, n: u32) -> bool {
        self.graph.is_precolored(n)
    }

    pub fn spilled(&self) -> &[u32] {
        &self.worklists.spilled
    }

    // degree[n] == |adjacent(n)| for every node still in a worklist
    fn verify_degrees(&self) {
        for state in [NodeState::Simplify, NodeState::Freeze, NodeState::Spill] {
            for n in self.worklists.nodes_in(state) {
                assert_eq!(
                    self.graph.degree(n),
                    self.adjacent(n).count(),
                    "degree of node {} diverged from its adjacency",
                    n
                );
            }
        }
    }

    // Interfering nodes never share a color and precolored nodes keep their own
    fn verify_colors(&self) {
        for n in self.worklists.nodes_in(NodeState::Precolored) {
            assert_eq!(
                self.graph.color[n as usize],
                Some(self.renumber.precolor(n)),
                "precolored node {} changed color",
                n
            );
        }
        for (u, v) in self.graph.edges() {
            let (cu, cv) = (self.graph.color[u as usize], self.graph.color[v as usize]);
            if let (Some(cu), Some(cv)) = (cu, cv) {
                assert_ne!(cu, cv, "interfering nodes {} and {} share color {}", u, v, cu);
            }
        }
    }
}

// Spill cost weight: every def and use counts 10^loop depth
fn spill_priority(flow: &FlowGraph, length: usize) -> Vec<f64> {
    let mut priority = vec![0.0; length];
    for node in &flow.nodes {
        let weight = 10f64.powi(node.loop_depth as i32);
        for &reg in node.defs.iter().chain(node.uses.iter()) {
            priority[reg as usize] += weight;
        }
    }
    priority
}

/// Iterated register coalescing of a single function
/// Rebuilds the graph and retries after every round that spilled
pub fn allocate_function<B: RegisterBackend>(
    backend: &mut B,
    catalog: &RegisterCatalog,
    settings: &AllocationSettings,
) -> Result<AllocationReport, AllocationError> {
    if backend.blocks().is_empty() {
        return Err(AllocationError::EmptyFunction {
            function: backend.name().to_string(),
        });
    }
    log::info!("Allocating registers of {}", backend.name());
    let verify = settings.verify();
    let mut spill_code = SpillCode::new();

    for round in 1..=settings.max_rounds {
        log::debug!("{}: round {}", backend.name(), round);
        let cfg = ControlFlowGraph::construct(backend.blocks(), backend.name())?;
        let renumber = Renumber::new(backend, catalog);
        let flow = FlowGraph::construct(backend, &cfg, &renumber);
        let liveness = Liveness::analyze(&flow, renumber.length);
        if verify {
            assert!(liveness.is_fixpoint(&flow), "liveness did not reach a fixpoint");
        }

        let (graph, moves) = build(&flow, &liveness, &renumber, settings.coalesce);
        let priority = spill_priority(&flow, renumber.length);
        let mut coloring = Coloring::new(graph, moves, &renumber, priority);
        let initial = (0..renumber.vreg_count())
            .filter(|&n| !spill_code.is_retired(VirtualRegister(n)));
        coloring.make_worklist(initial);
        coloring.run(verify);
        coloring.assign_colors();
        if verify {
            coloring.verify_colors();
        }

        if coloring.spilled().is_empty() {
            let coalesced_moves = coloring.worklists.count_moves(MoveState::Coalesced);
            let (assignment, removed_moves) = write_back(backend, &coloring);
            log::info!(
                "{}: allocated in {} rounds, {} moves coalesced, {} removed",
                backend.name(),
                round,
                coalesced_moves,
                removed_moves
            );
            return Ok(AllocationReport {
                function: backend.name().to_string(),
                rounds: round,
                spilled: spill_code.spilled(),
                coalesced_moves,
                removed_moves,
                frame_size: backend.get_frame_size(),
                callee_saved: Vec::new(),
                assignment,
            });
        }

        let spilled: HashSet<VirtualRegister> = coloring
            .spilled()
            .iter()
            .map(|&n| VirtualRegister(n))
            .collect();
        log::debug!("{}: spilling {:?}", backend.name(), spilled);
        spill_code.rewrite(backend, catalog, &spilled);
    }

    Err(AllocationError::SpillDidNotConverge {
        function: backend.name().to_string(),
        rounds: settings.max_rounds,
    })
}
