use crate::backend::asm::{Register, RegisterCatalog, VirtualRegister};

use super::super::RegisterBackend;

// Maps every register onto a dense index
// Virtual registers keep their own number, physical registers follow them in catalog order
// The numbering is only valid for one round, a spill adds new virtual registers
#[derive(Debug, Clone)]
pub struct Renumber<'a> {
    catalog: &'a RegisterCatalog,
    vreg_count: u32,
    pub length: usize,
}

impl<'a> Renumber<'a> {
    pub fn new<B: RegisterBackend>(backend: &B, catalog: &'a RegisterCatalog) -> Renumber<'a> {
        let vreg_count = backend.get_vreg_count();
        Renumber {
            catalog,
            vreg_count,
            length: vreg_count as usize + catalog.len(),
        }
    }

    pub fn index(&self, reg: Register) -> u32 {
        match reg {
            Register::Virtual(vreg) => {
                debug_assert!(vreg.0 < self.vreg_count, "{} was never reserved", vreg);
                vreg.0
            }
            Register::Physical(reg) => self.vreg_count + reg.index as u32,
        }
    }

    pub fn register(&self, index: u32) -> Register {
        if self.is_precolored(index) {
            Register::Physical(self.catalog.get((index - self.vreg_count) as usize))
        } else {
            Register::Virtual(VirtualRegister(index))
        }
    }

    pub fn is_precolored(&self, index: u32) -> bool {
        index >= self.vreg_count
    }

    // The color of a precolored node is its own catalog position
    pub fn precolor(&self, index: u32) -> usize {
        (index - self.vreg_count) as usize
    }

    pub fn vreg_count(&self) -> u32 {
        self.vreg_count
    }

    pub fn catalog(&self) -> &'a RegisterCatalog {
        self.catalog
    }
}
