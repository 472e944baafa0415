mod allocator;
mod build;
mod coalesce;
mod flow_graph;
mod freeze;
mod graph;
mod live_analysis;
mod renumber;
mod select;
mod simplify;
mod spill_code;
mod worklist;
mod write_back;

pub use allocator::allocate_function;
pub use build::{build, Move};
pub use flow_graph::{FlowGraph, FlowNode};
pub use graph::{BitMatrix, InterferenceGraph};
pub use live_analysis::Liveness;
pub use renumber::Renumber;
pub use worklist::{MoveState, NodeState};

pub(self) use allocator::Coloring;
pub(self) use spill_code::SpillCode;
