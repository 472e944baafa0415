use std::collections::HashMap;

use crate::backend::asm::{PhysicalRegister, Register, VirtualRegister};

use super::super::RegisterBackend;
use super::Coloring;

// Replaces every virtual register with the physical register of its color
// Moves that end up copying a register onto itself are deleted
// Returns the assignment and the number of deleted moves
pub(super) fn write_back<B: RegisterBackend>(
    backend: &mut B,
    coloring: &Coloring,
) -> (HashMap<VirtualRegister, PhysicalRegister>, usize) {
    log::debug!("Writing back colors of {}", backend.name());
    let catalog = coloring.renumber.catalog();
    let mut assignment = HashMap::new();
    let mut physical = |vreg: VirtualRegister| -> PhysicalRegister {
        let n = coloring.get_alias(vreg.0);
        let color = coloring.graph.color[n as usize]
            .unwrap_or_else(|| panic!("{} was not colored", vreg));
        let reg = catalog.get(color);
        assignment.insert(vreg, reg);
        reg
    };

    let mut removed = 0;
    for block in backend.blocks_mut() {
        for instruction in &mut block.instructions {
            for reg in instruction.uses_mut() {
                if let Register::Virtual(vreg) = *reg {
                    *reg = Register::Physical(physical(vreg));
                }
            }
            for reg in instruction.defs_mut() {
                if let Register::Virtual(vreg) = *reg {
                    *reg = Register::Physical(physical(vreg));
                }
            }
        }

        let before = block.instructions.len();
        block
            .instructions
            .retain(|instruction| !matches!(instruction.move_operands(), Some((rd, rs)) if rd == rs));
        removed += before - block.instructions.len();
    }

    (assignment, removed)
}
