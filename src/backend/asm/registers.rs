use std::collections::HashSet;

use lazy_static::lazy_static;

use super::PhysicalRegister;
use crate::error::CatalogError;

// Catalog order of the RV32 integer registers
// Registers that are never handed out come first, so the allocatable ones form a suffix
const RISCV32_NAMES: [&str; 32] = [
    "zero", "ra", "sp", "gp", "tp", "s0", // fixed
    "t0", "t1", "t2", "a0", "a1", "a2", "a3", "a4", "a5", "a6", "a7", "t3", "t4", "t5",
    "t6", // caller saved
    "s1", "s2", "s3", "s4", "s5", "s6", "s7", "s8", "s9", "s10", "s11", // callee saved
];

const RISCV32_CALLER_SAVED: [&str; 15] = [
    "t0", "t1", "t2", "a0", "a1", "a2", "a3", "a4", "a5", "a6", "a7", "t3", "t4", "t5", "t6",
];

const RISCV32_CALLEE_SAVED: [&str; 11] = [
    "s1", "s2", "s3", "s4", "s5", "s6", "s7", "s8", "s9", "s10", "s11",
];

lazy_static! {
    pub static ref RISCV32: RegisterCatalog = RegisterCatalog::new(
        &RISCV32_NAMES,
        &RISCV32_CALLEE_SAVED,
        &RISCV32_CALLER_SAVED,
        "s0"
    )
    .expect("the RV32 register catalog is well formed");
}

/// Ordered list of physical registers split into callee saved and caller saved registers
/// Colors are the catalog positions of the callee and caller saved registers,
/// which must be the last K entries of the catalog
#[derive(Clone, Debug, PartialEq)]
pub struct RegisterCatalog {
    registers: Vec<PhysicalRegister>,
    callee_saved: Vec<PhysicalRegister>,
    caller_saved: Vec<PhysicalRegister>,
    frame_base: PhysicalRegister,
}

impl RegisterCatalog {
    pub fn new(
        names: &[&'static str],
        callee_saved: &[&'static str],
        caller_saved: &[&'static str],
        frame_base: &'static str,
    ) -> Result<RegisterCatalog, CatalogError> {
        if names.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut seen = HashSet::new();
        let registers: Vec<_> = names
            .iter()
            .enumerate()
            .map(|(index, &name)| PhysicalRegister {
                index: index as u16,
                name,
            })
            .collect();
        for reg in &registers {
            if !seen.insert(reg.name) {
                return Err(CatalogError::Duplicate {
                    name: reg.name.to_string(),
                });
            }
        }

        let lookup = |name: &str| {
            registers
                .iter()
                .find(|reg| reg.name == name)
                .copied()
                .ok_or_else(|| CatalogError::UnknownRegister {
                    name: name.to_string(),
                })
        };
        let callee_saved = callee_saved
            .iter()
            .map(|&name| lookup(name))
            .collect::<Result<Vec<_>, _>>()?;
        let caller_saved = caller_saved
            .iter()
            .map(|&name| lookup(name))
            .collect::<Result<Vec<_>, _>>()?;
        let frame_base = lookup(frame_base)?;

        let count = callee_saved.len() + caller_saved.len();
        if count == 0 {
            return Err(CatalogError::NoAllocatableRegisters);
        }

        let mut allocatable = HashSet::new();
        for reg in callee_saved.iter().chain(caller_saved.iter()) {
            if !allocatable.insert(reg.index) {
                return Err(CatalogError::Duplicate {
                    name: reg.name.to_string(),
                });
            }
            if (reg.index as usize) < registers.len().saturating_sub(count) {
                return Err(CatalogError::NotASuffix {
                    name: reg.name.to_string(),
                    count,
                });
            }
        }
        if allocatable.contains(&frame_base.index) {
            return Err(CatalogError::AllocatableFrameBase {
                name: frame_base.name.to_string(),
            });
        }

        Ok(RegisterCatalog {
            registers,
            callee_saved,
            caller_saved,
            frame_base,
        })
    }

    pub fn len(&self) -> usize {
        self.registers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }

    pub fn callee_saved(&self) -> &[PhysicalRegister] {
        &self.callee_saved
    }

    pub fn caller_saved(&self) -> &[PhysicalRegister] {
        &self.caller_saved
    }

    pub fn frame_base(&self) -> PhysicalRegister {
        self.frame_base
    }

    // K, the number of colors
    pub fn allocatable_count(&self) -> usize {
        self.callee_saved.len() + self.caller_saved.len()
    }

    // The colors in the order they are handed out
    pub fn colors(&self) -> std::ops::Range<usize> {
        (self.len() - self.allocatable_count())..self.len()
    }

    pub fn is_allocatable(&self, reg: PhysicalRegister) -> bool {
        self.colors().contains(&(reg.index as usize))
    }

    pub fn get(&self, index: usize) -> PhysicalRegister {
        self.registers[index]
    }

    pub fn find(&self, name: &str) -> Option<PhysicalRegister> {
        self.registers.iter().find(|reg| reg.name == name).copied()
    }
}
