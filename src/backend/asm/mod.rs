mod asm;
pub mod control_flow_graph;
pub mod parse_asm;
mod print_asm;
pub mod registers;

pub use asm::*;
pub use control_flow_graph::ControlFlowGraph;
pub use parse_asm::parse_module;
pub use registers::*;
