use smallvec::SmallVec;

use super::{Coloring, MoveState, NodeState};

impl<'a> Coloring<'a> {
    // Gives up on coalescing the moves of a low degree node, so it can be simplified
    pub fn freeze(&mut self) {
        if let Some(u) = self.worklists.next_freeze() {
            self.worklists.transition(u, NodeState::Simplify);
            self.freeze_moves(u);
        }
    }

    pub fn freeze_moves(&mut self, u: u32) {
        let moves: SmallVec<[u32; 4]> = self.node_moves(u).collect();
        for m in moves {
            let copy = self.moves[m as usize];
            let (x, y) = (self.get_alias(copy.dst), self.get_alias(copy.src));
            let v = if y == self.get_alias(u) { x } else { y };
            self.worklists.transition_move(m, MoveState::Frozen);

            if self.worklists.state(v) == NodeState::Freeze
                && !self.move_related(v)
                && self.graph.degree(v) < self.k
            {
                self.worklists.transition(v, NodeState::Simplify);
            }
        }
    }

    // Picks the cheapest node of high degree as potential spill
    // Cheap means few weighted uses for the number of neighbors it frees
    // Ties go to the lowest node
    pub fn select_spill(&mut self) {
        let mut best: Option<(u32, f64)> = None;
        for n in self.worklists.spill_candidates() {
            let cost = self.priority[n as usize] / self.graph.degree(n) as f64;
            if best.map_or(true, |(_, lowest)| cost < lowest) {
                best = Some((n, cost));
            }
        }
        if let Some((m, cost)) = best {
            log::trace!("potential spill {} with cost {}", m, cost);
            self.worklists.transition(m, NodeState::Simplify);
            self.freeze_moves(m);
        }
    }
}
