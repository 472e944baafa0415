use crate::backend::asm::{Instruction, PhysicalRegister, RegisterCatalog, VirtualRegister};

use super::RegisterBackend;

// Every callee saved register is copied into a fresh virtual register on entry
// and copied back before the function leaves through its last block
// When the function never touches the register the pair coalesces away
// Returns every callee saved register with its copy in catalog order
pub fn bracket_callee_saved<B: RegisterBackend>(
    backend: &mut B,
    catalog: &RegisterCatalog,
) -> Vec<(PhysicalRegister, VirtualRegister)> {
    if backend.blocks().is_empty() {
        return Vec::new();
    }
    let saved: Vec<(PhysicalRegister, VirtualRegister)> = catalog
        .callee_saved()
        .iter()
        .map(|&reg| (reg, backend.add_vreg(4)))
        .collect();
    log::debug!(
        "Bracketing {} with {} callee saved registers",
        backend.name(),
        saved.len()
    );

    let blocks = backend.blocks_mut();
    let entry = &mut blocks[0];
    let saves = saved.iter().map(|&(reg, vreg)| Instruction::mv(vreg, reg));
    entry.instructions.splice(0..0, saves);

    let last = blocks.len() - 1;
    let tail = &mut blocks[last].instructions;
    let position = match tail.last() {
        Some(instruction) if instruction.is_terminator() => tail.len() - 1,
        _ => tail.len(),
    };
    let restores = saved
        .iter()
        .rev()
        .map(|&(reg, vreg)| Instruction::mv(reg, vreg));
    tail.splice(position..position, restores);

    saved
}
