use smallvec::SmallVec;

use super::{Coloring, MoveState, NodeState};

impl<'a> Coloring<'a> {
    // Removes a low degree node that is not move related from the graph
    pub fn simplify(&mut self) {
        let n = match self.worklists.next_simplify() {
            Some(n) => n,
            None => return,
        };
        self.worklists.transition(n, NodeState::Selected);
        let neighbors: SmallVec<[u32; 8]> = self.adjacent(n).collect();
        for m in neighbors {
            self.decrement_degree(m);
        }
    }

    // A node that drops below K colors can be simplified or frozen,
    // and the moves around it get another chance to coalesce
    pub fn decrement_degree(&mut self, m: u32) {
        if self.is_precolored(m) {
            return;
        }
        let degree = self.graph.degree[m as usize];
        self.graph.degree[m as usize] = degree - 1;
        if degree == self.k {
            let mut nodes: SmallVec<[u32; 8]> = self.adjacent(m).collect();
            nodes.push(m);
            self.enable_moves(&nodes);
            if self.move_related(m) {
                self.worklists.transition(m, NodeState::Freeze);
            } else {
                self.worklists.transition(m, NodeState::Simplify);
            }
        }
    }

    pub fn enable_moves(&mut self, nodes: &[u32]) {
        for &n in nodes {
            let moves: SmallVec<[u32; 4]> = self.node_moves(n).collect();
            for m in moves {
                if self.worklists.move_state(m) == MoveState::Active {
                    self.worklists.transition_move(m, MoveState::Worklist);
                }
            }
        }
    }
}
