use crate::backend::asm::{AsmBlock, AsmFunction, VirtualRegister};

/// Everything the allocator needs from a function of the instruction selector
/// The allocator rewrites the blocks in place
pub trait RegisterBackend {
    fn name(&self) -> &str;
    fn blocks(&self) -> &[AsmBlock];
    fn blocks_mut(&mut self) -> &mut Vec<AsmBlock>;

    fn get_vreg_count(&self) -> u32;
    fn get_vreg_size(&self, vreg: VirtualRegister) -> u32;
    fn add_vreg(&mut self, size: u32) -> VirtualRegister;

    /// Gives the offset below the frame base, the same register always gets the same slot
    fn alloc_stack_slot(&mut self, vreg: VirtualRegister, size: u32) -> u32;
    fn get_frame_size(&self) -> u32;
}

impl RegisterBackend for AsmFunction {
    fn name(&self) -> &str {
        &self.name
    }

    fn blocks(&self) -> &[AsmBlock] {
        &self.blocks
    }

    fn blocks_mut(&mut self) -> &mut Vec<AsmBlock> {
        &mut self.blocks
    }

    fn get_vreg_count(&self) -> u32 {
        self.vreg_count()
    }

    fn get_vreg_size(&self, vreg: VirtualRegister) -> u32 {
        self.vreg_size(vreg)
    }

    fn add_vreg(&mut self, size: u32) -> VirtualRegister {
        AsmFunction::add_vreg(self, size)
    }

    fn alloc_stack_slot(&mut self, vreg: VirtualRegister, size: u32) -> u32 {
        let offset = self.frame.alloc(vreg, size);
        log::trace!("{}: slot of {} at -{}", self.name, vreg, offset);
        offset
    }

    fn get_frame_size(&self) -> u32 {
        self.frame.size
    }
}
