use std::fmt::{self, Debug};

use bitvec::prelude::BitVec;

use super::FlowGraph;

/// Registers live on entry and exit of every flow node
#[derive(Clone, PartialEq)]
pub struct Liveness {
    pub live_in: Vec<BitVec>,
    pub live_out: Vec<BitVec>,
}

impl Debug for Liveness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.live_in.len() {
            writeln!(
                f,
                "{} => live_in: {:?} live_out: {:?}",
                i,
                self.live_in[i].iter_ones().collect::<Vec<_>>(),
                self.live_out[i].iter_ones().collect::<Vec<_>>(),
            )?;
        }
        Ok(())
    }
}

impl Liveness {
    // in[n] = use[n] | (out[n] - def[n])
    // out[n] = union of in[s] for all successors s
    // Iterates over the node order until a full pass changes nothing
    pub fn analyze(flow: &FlowGraph, length: usize) -> Liveness {
        let mut liveness = Liveness {
            live_in: vec![BitVec::repeat(false, length); flow.len()],
            live_out: vec![BitVec::repeat(false, length); flow.len()],
        };

        let mut passes = 0;
        loop {
            passes += 1;
            let mut changed = false;
            for &node in &flow.order {
                changed |= liveness.update(flow, node as usize);
            }
            if !changed {
                break;
            }
        }
        log::debug!("Liveness converged after {} passes", passes);
        log::trace!("Liveness:\n{:?}", liveness);
        liveness
    }

    // Recomputes a single node, returns whether anything changed
    fn update(&mut self, flow: &FlowGraph, n: usize) -> bool {
        let node = &flow.nodes[n];
        let mut live_out = BitVec::repeat(false, self.live_out[n].len());
        for &succ in &node.successors {
            live_out |= &*self.live_in[succ as usize];
        }

        let mut live_in = live_out.clone();
        for &def in &node.defs {
            live_in.set(def as usize, false);
        }
        for &used in &node.uses {
            live_in.set(used as usize, true);
        }

        let changed = live_in != self.live_in[n] || live_out != self.live_out[n];
        self.live_in[n] = live_in;
        self.live_out[n] = live_out;
        changed
    }

    /// A further pass over the result leaves it unchanged
    pub fn is_fixpoint(&self, flow: &FlowGraph) -> bool {
        let mut copy = self.clone();
        !(0..flow.len()).any(|n| copy.update(flow, n))
    }

    pub fn is_live_out(&self, node: usize, index: u32) -> bool {
        self.live_out[node][index as usize]
    }
}
