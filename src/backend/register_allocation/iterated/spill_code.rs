use std::collections::{BTreeSet, HashMap, HashSet};

use smallvec::SmallVec;

use crate::backend::asm::{Instruction, RCalcOp, Register, RegisterCatalog, VirtualRegister, Width};

use super::super::RegisterBackend;

// Range of the 12 bit immediate of loads and stores
const IMMEDIATE_RANGE: std::ops::Range<i32> = -2048..2048;

/// Bookkeeping of the spills of one function across all rounds
/// Stack slots belong to the register of the input, the temporaries that replace it share its slot
#[derive(Clone, Debug, Default)]
pub struct SpillCode {
    origin: HashMap<VirtualRegister, VirtualRegister>,
    retired: HashSet<VirtualRegister>,
    spilled: BTreeSet<VirtualRegister>,
}

impl SpillCode {
    pub(super) fn new() -> SpillCode {
        SpillCode::default()
    }

    // The register of the input a temporary stands in for
    pub fn original(&self, vreg: VirtualRegister) -> VirtualRegister {
        self.origin.get(&vreg).copied().unwrap_or(vreg)
    }

    // Spilled registers no longer occur in the function
    pub fn is_retired(&self, vreg: VirtualRegister) -> bool {
        self.retired.contains(&vreg)
    }

    pub fn spilled(&self) -> Vec<VirtualRegister> {
        self.spilled.iter().copied().collect()
    }

    // Every use of a spilled register becomes a load into a fresh temporary right before the instruction
    // and every definition a store of a fresh temporary right after it
    pub(super) fn rewrite<B: RegisterBackend>(
        &mut self,
        backend: &mut B,
        catalog: &RegisterCatalog,
        spills: &HashSet<VirtualRegister>,
    ) {
        let frame_base = Register::Physical(catalog.frame_base());
        let mut slots = HashMap::new();
        for &vreg in spills {
            let original = self.original(vreg);
            let size = backend.get_vreg_size(original);
            let offset = backend.alloc_stack_slot(original, size);
            slots.insert(vreg, (offset, size));
            self.retired.insert(vreg);
            self.spilled.insert(original);
        }

        let mut blocks = std::mem::take(backend.blocks_mut());
        for block in &mut blocks {
            let instructions = std::mem::take(&mut block.instructions);
            let mut rewritten = Vec::with_capacity(instructions.len());
            for mut instruction in instructions {
                let used = spilled_registers(instruction.uses(), spills);
                let defined = spilled_registers(instruction.defs(), spills);
                if used.is_empty() && defined.is_empty() {
                    rewritten.push(instruction);
                    continue;
                }

                let mut temporaries: SmallVec<[(VirtualRegister, VirtualRegister); 2]> =
                    SmallVec::new();
                for &vreg in used.iter().chain(defined.iter()) {
                    if temporaries.iter().all(|&(v, _)| v != vreg) {
                        let (_, size) = slots[&vreg];
                        let temporary = backend.add_vreg(size);
                        self.origin.insert(temporary, self.original(vreg));
                        temporaries.push((vreg, temporary));
                    }
                }
                let temporary = |vreg: VirtualRegister| {
                    temporaries
                        .iter()
                        .find(|&&(v, _)| v == vreg)
                        .map(|&(_, t)| t)
                        .unwrap_or(vreg)
                };

                for &vreg in &used {
                    let (offset, size) = slots[&vreg];
                    load(&mut rewritten, temporary(vreg), offset, size, frame_base);
                }

                for reg in instruction.uses_mut() {
                    if let Register::Virtual(vreg) = *reg {
                        *reg = Register::Virtual(temporary(vreg));
                    }
                }
                for reg in instruction.defs_mut() {
                    if let Register::Virtual(vreg) = *reg {
                        *reg = Register::Virtual(temporary(vreg));
                    }
                }
                rewritten.push(instruction);

                for &vreg in &defined {
                    let (offset, size) = slots[&vreg];
                    let address = if IMMEDIATE_RANGE.contains(&-(offset as i32)) {
                        None
                    } else {
                        Some(backend.add_vreg(4))
                    };
                    store(&mut rewritten, temporary(vreg), address, offset, size, frame_base);
                }
            }
            block.instructions = rewritten;
        }
        *backend.blocks_mut() = blocks;
    }
}

fn spilled_registers(
    registers: SmallVec<[Register; 4]>,
    spills: &HashSet<VirtualRegister>,
) -> SmallVec<[VirtualRegister; 2]> {
    let mut result: SmallVec<[VirtualRegister; 2]> = SmallVec::new();
    for vreg in registers.iter().filter_map(Register::vreg) {
        if spills.contains(&vreg) && !result.contains(&vreg) {
            result.push(vreg);
        }
    }
    result
}

// lw t, -offset(s0)
// or for large frames
// li t, -offset; add t, s0, t; lw t, 0(t)
fn load(
    code: &mut Vec<Instruction>,
    temporary: VirtualRegister,
    offset: u32,
    size: u32,
    frame_base: Register,
) {
    let width = Width::from_size(size);
    let offset = -(offset as i32);
    let rd = Register::Virtual(temporary);
    if IMMEDIATE_RANGE.contains(&offset) {
        code.push(Instruction::Load {
            width,
            rd,
            base: frame_base,
            offset,
        });
    } else {
        code.push(Instruction::Li { rd, imm: offset });
        code.push(Instruction::RCalc {
            op: RCalcOp::Add,
            rd,
            rs1: frame_base,
            rs2: rd,
        });
        code.push(Instruction::Load {
            width,
            rd,
            base: rd,
            offset: 0,
        });
    }
}

// sw t, -offset(s0)
// or for large frames with an extra register a
// li a, -offset; add a, s0, a; sw t, 0(a)
fn store(
    code: &mut Vec<Instruction>,
    temporary: VirtualRegister,
    address: Option<VirtualRegister>,
    offset: u32,
    size: u32,
    frame_base: Register,
) {
    let width = Width::from_size(size);
    let offset = -(offset as i32);
    let rs = Register::Virtual(temporary);
    match address {
        None => code.push(Instruction::Store {
            width,
            rs,
            base: frame_base,
            offset,
        }),
        Some(address) => {
            let address = Register::Virtual(address);
            code.push(Instruction::Li {
                rd: address,
                imm: offset,
            });
            code.push(Instruction::RCalc {
                op: RCalcOp::Add,
                rd: address,
                rs1: frame_base,
                rs2: address,
            });
            code.push(Instruction::Store {
                width,
                rs,
                base: address,
                offset: 0,
            });
        }
    }
}
