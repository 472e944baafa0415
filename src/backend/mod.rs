pub mod asm;
pub mod register_allocation;

pub use register_allocation::{allocate_module, AllocationReport, AllocationSettings};
