use std::collections::BTreeSet;

/// Every node is in exactly one of these states
/// The sets of the state machine are kept next to the state so the smallest member is found quickly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Initial,
    Precolored,
    Simplify,
    Freeze,
    Spill,
    Spilled,
    Coalesced,
    Colored,
    Selected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveState {
    Worklist,
    Active,
    Coalesced,
    Constrained,
    Frozen,
}

#[derive(Debug, Clone)]
pub struct Worklists {
    state: Vec<NodeState>,
    simplify: BTreeSet<u32>,
    freeze: BTreeSet<u32>,
    spill: BTreeSet<u32>,
    pub spilled: Vec<u32>,
    pub coalesced: Vec<u32>,
    pub select_stack: Vec<u32>,

    move_state: Vec<MoveState>,
    worklist_moves: BTreeSet<u32>,
    active_moves: BTreeSet<u32>,
}

impl Worklists {
    pub fn new(length: usize, precolored_from: u32, move_count: usize) -> Worklists {
        let state = (0..length as u32)
            .map(|n| {
                if n >= precolored_from {
                    NodeState::Precolored
                } else {
                    NodeState::Initial
                }
            })
            .collect();
        Worklists {
            state,
            simplify: BTreeSet::new(),
            freeze: BTreeSet::new(),
            spill: BTreeSet::new(),
            spilled: Vec::new(),
            coalesced: Vec::new(),
            select_stack: Vec::new(),
            move_state: vec![MoveState::Worklist; move_count],
            worklist_moves: (0..move_count as u32).collect(),
            active_moves: BTreeSet::new(),
        }
    }

    pub fn state(&self, n: u32) -> NodeState {
        self.state[n as usize]
    }

    // Moves a node into a new state, leaving its previous set
    pub fn transition(&mut self, n: u32, to: NodeState) {
        let from = self.state[n as usize];
        assert!(
            from != NodeState::Precolored && to != NodeState::Precolored,
            "precolored node {} cannot change state",
            n
        );
        log::trace!("node {}: {:?} -> {:?}", n, from, to);
        match from {
            NodeState::Simplify => {
                self.simplify.remove(&n);
            }
            NodeState::Freeze => {
                self.freeze.remove(&n);
            }
            NodeState::Spill => {
                self.spill.remove(&n);
            }
            NodeState::Initial | NodeState::Colored | NodeState::Selected => (),
            NodeState::Spilled | NodeState::Coalesced | NodeState::Precolored => {
                panic!("node {} cannot leave {:?}", n, from)
            }
        }
        match to {
            NodeState::Simplify => {
                self.simplify.insert(n);
            }
            NodeState::Freeze => {
                self.freeze.insert(n);
            }
            NodeState::Spill => {
                self.spill.insert(n);
            }
            NodeState::Spilled => self.spilled.push(n),
            NodeState::Coalesced => self.coalesced.push(n),
            NodeState::Selected => self.select_stack.push(n),
            NodeState::Initial | NodeState::Colored | NodeState::Precolored => (),
        }
        self.state[n as usize] = to;
    }

    pub fn next_simplify(&self) -> Option<u32> {
        self.simplify.iter().next().copied()
    }

    pub fn next_freeze(&self) -> Option<u32> {
        self.freeze.iter().next().copied()
    }

    pub fn spill_candidates(&self) -> impl Iterator<Item = u32> + '_ {
        self.spill.iter().copied()
    }

    // The node stays selected until it is colored or spilled
    pub fn pop_select(&mut self) -> Option<u32> {
        self.select_stack.pop()
    }

    pub fn move_state(&self, m: u32) -> MoveState {
        self.move_state[m as usize]
    }

    pub fn transition_move(&mut self, m: u32, to: MoveState) {
        let from = self.move_state[m as usize];
        log::trace!("move {}: {:?} -> {:?}", m, from, to);
        match from {
            MoveState::Worklist => {
                self.worklist_moves.remove(&m);
            }
            MoveState::Active => {
                self.active_moves.remove(&m);
            }
            MoveState::Coalesced | MoveState::Constrained | MoveState::Frozen => {
                panic!("move {} cannot leave {:?}", m, from)
            }
        }
        match to {
            MoveState::Worklist => {
                self.worklist_moves.insert(m);
            }
            MoveState::Active => {
                self.active_moves.insert(m);
            }
            MoveState::Coalesced | MoveState::Constrained | MoveState::Frozen => (),
        }
        self.move_state[m as usize] = to;
    }

    pub fn next_move(&self) -> Option<u32> {
        self.worklist_moves.iter().next().copied()
    }

    // Moves that may still be coalesced
    pub fn is_move_pending(&self, m: u32) -> bool {
        matches!(
            self.move_state[m as usize],
            MoveState::Worklist | MoveState::Active
        )
    }

    pub fn count_moves(&self, state: MoveState) -> usize {
        self.move_state.iter().filter(|&&s| s == state).count()
    }

    pub fn has_simplify(&self) -> bool {
        !self.simplify.is_empty()
    }

    pub fn has_moves(&self) -> bool {
        !self.worklist_moves.is_empty()
    }

    pub fn has_freeze(&self) -> bool {
        !self.freeze.is_empty()
    }

    pub fn has_spill(&self) -> bool {
        !self.spill.is_empty()
    }

    pub fn nodes_in(&self, state: NodeState) -> impl Iterator<Item = u32> + '_ {
        self.state
            .iter()
            .enumerate()
            .filter(move |&(_, &s)| s == state)
            .map(|(n, _)| n as u32)
    }
}
