use std::collections::BTreeSet;

use smallvec::SmallVec;

use super::{Coloring, MoveState, NodeState};

impl<'a> Coloring<'a> {
    pub fn get_alias(&self, mut n: u32) -> u32 {
        while self.worklists.state(n) == NodeState::Coalesced {
            n = self.graph.alias[n as usize].unwrap_or(n);
        }
        n
    }

    // Takes the next move and either merges both ends, gives up on it,
    // or parks it until a degree drops
    pub fn coalesce(&mut self) {
        let m = match self.worklists.next_move() {
            Some(m) => m,
            None => return,
        };
        let copy = self.moves[m as usize];
        let x = self.get_alias(copy.dst);
        let y = self.get_alias(copy.src);
        let (u, v) = if self.is_precolored(y) { (y, x) } else { (x, y) };
        log::trace!("coalesce move {}: {} <- {}", m, u, v);

        if u == v {
            self.worklists.transition_move(m, MoveState::Coalesced);
            self.add_worklist(u);
        } else if self.is_precolored(v) || self.graph.interfere(u, v) || self.is_fixed(u) {
            self.worklists.transition_move(m, MoveState::Constrained);
            self.add_worklist(u);
            self.add_worklist(v);
        } else if self.can_coalesce(u, v) {
            self.worklists.transition_move(m, MoveState::Coalesced);
            self.combine(u, v);
            self.add_worklist(u);
        } else {
            self.worklists.transition_move(m, MoveState::Active);
        }
    }

    // Registers that are never handed out, like the stack pointer, keep all their moves
    fn is_fixed(&self, n: u32) -> bool {
        self.is_precolored(n) && !self.renumber.catalog().colors().contains(&self.renumber.precolor(n))
    }

    fn can_coalesce(&self, u: u32, v: u32) -> bool {
        if self.is_precolored(u) {
            self.adjacent(v).all(|t| self.george(t, u))
        } else {
            let nodes: BTreeSet<u32> = self.adjacent(u).chain(self.adjacent(v)).collect();
            self.briggs(nodes.into_iter())
        }
    }

    // A neighbor t of v does not get in the way of merging v into the precolored r
    fn george(&self, t: u32, r: u32) -> bool {
        self.graph.degree(t) < self.k || self.is_precolored(t) || self.graph.interfere(t, r)
    }

    // Fewer than K neighbors of significant degree
    fn briggs(&self, nodes: impl Iterator<Item = u32>) -> bool {
        nodes.filter(|&n| self.graph.degree(n) >= self.k).count() < self.k
    }

    // A frozen node that lost its last move and has a low degree can be simplified
    pub fn add_worklist(&mut self, u: u32) {
        if self.worklists.state(u) == NodeState::Freeze
            && !self.move_related(u)
            && self.graph.degree(u) < self.k
        {
            self.worklists.transition(u, NodeState::Simplify);
        }
    }

    // Merges v into u
    pub fn combine(&mut self, u: u32, v: u32) {
        log::trace!("combine {} into {}", v, u);
        self.worklists.transition(v, NodeState::Coalesced);
        self.graph.alias[v as usize] = Some(u);

        let moves = self.graph.move_list[v as usize].clone();
        for m in moves {
            self.graph.add_move(u, m);
        }
        self.enable_moves(&[v]);

        let neighbors: SmallVec<[u32; 8]> = self.adjacent(v).collect();
        for t in neighbors {
            self.graph.add_edge(t, u);
            self.decrement_degree(t);
        }

        if self.graph.degree(u) >= self.k && self.worklists.state(u) == NodeState::Freeze {
            self.worklists.transition(u, NodeState::Spill);
        }
    }
}
