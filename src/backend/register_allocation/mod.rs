mod callee_saved;
pub mod iterated;
mod register_interface;

use std::collections::HashMap;

use crate::backend::asm::{AsmFunction, AsmModule, PhysicalRegister, RegisterCatalog, VirtualRegister};
use crate::error::AllocationError;

pub use callee_saved::bracket_callee_saved;
pub use iterated::allocate_function;
pub use register_interface::RegisterBackend;

/// Knobs of the allocator, built from the command line options
#[derive(Debug, Clone)]
pub struct AllocationSettings {
    /// Number of spill rounds before giving up on a function
    pub max_rounds: usize,
    pub coalesce: bool,
    pub callee_saved: bool,
    /// Check the internal invariants of the allocator while running
    pub verify: bool,
}

impl Default for AllocationSettings {
    fn default() -> Self {
        AllocationSettings {
            max_rounds: 16,
            coalesce: true,
            callee_saved: true,
            verify: false,
        }
    }
}

impl AllocationSettings {
    pub(crate) fn verify(&self) -> bool {
        self.verify || cfg!(debug_assertions)
    }
}

/// Summary of the allocation of a single function
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AllocationReport {
    pub function: String,
    /// Number of coloring rounds, one more than the number of spill rewrites
    pub rounds: usize,
    /// The virtual registers of the input that live in a stack slot
    pub spilled: Vec<VirtualRegister>,
    pub coalesced_moves: usize,
    /// Moves between identical registers deleted after coloring
    pub removed_moves: usize,
    pub frame_size: u32,
    /// Callee saved registers the function still saves and restores
    pub callee_saved: Vec<PhysicalRegister>,
    pub assignment: HashMap<VirtualRegister, PhysicalRegister>,
}

/// Allocates the registers of every function of the module in place
/// Functions share nothing, so they are allocated one after another
pub fn allocate_module(
    module: &mut AsmModule,
    catalog: &RegisterCatalog,
    settings: &AllocationSettings,
) -> Result<Vec<AllocationReport>, AllocationError> {
    log::info!(
        "Allocating {} functions with {} colors",
        module.functions.len(),
        catalog.allocatable_count()
    );
    module
        .functions
        .iter_mut()
        .map(|function| allocate(function, catalog, settings))
        .collect()
}

fn allocate(
    function: &mut AsmFunction,
    catalog: &RegisterCatalog,
    settings: &AllocationSettings,
) -> Result<AllocationReport, AllocationError> {
    if function.blocks.is_empty() {
        return Err(AllocationError::EmptyFunction {
            function: function.name.clone(),
        });
    }
    let saved = if settings.callee_saved {
        bracket_callee_saved(function, catalog)
    } else {
        Vec::new()
    };
    let mut report = allocate_function(function, catalog, settings)?;

    // A copy that was coalesced into its register left no save behind
    report.callee_saved = saved
        .into_iter()
        .filter(|(reg, vreg)| report.assignment.get(vreg) != Some(reg))
        .map(|(reg, _)| reg)
        .collect();
    Ok(report)
}
