use indoc::indoc;
use rvra_lib::backend::asm::{
    parse_module, AsmFunction, AsmModule, ControlFlowGraph, ICalcOp, Instruction,
    PhysicalRegister, RCalcOp, Register, RegisterCatalog, VirtualRegister, RISCV32,
};
use std::collections::HashMap;
use rvra_lib::backend::register_allocation::iterated::{build, FlowGraph, Liveness, Renumber};
use rvra_lib::backend::{allocate_module, AllocationReport, AllocationSettings};
use rvra_lib::error::AllocationError;

fn settings() -> AllocationSettings {
    AllocationSettings {
        verify: true,
        ..AllocationSettings::default()
    }
}

fn without_callee_saved() -> AllocationSettings {
    AllocationSettings {
        callee_saved: false,
        ..settings()
    }
}

// Two allocatable registers x1 and x2, fp is the frame base
fn two_registers() -> RegisterCatalog {
    RegisterCatalog::new(&["fp", "x1", "x2"], &[], &["x1", "x2"], "fp").unwrap()
}

// s1 comes first, so it is the lowest color
fn callee_saved_first() -> RegisterCatalog {
    RegisterCatalog::new(&["fp", "s1", "c1"], &["s1"], &["c1"], "fp").unwrap()
}

fn allocate(
    text: &str,
    catalog: &RegisterCatalog,
    settings: &AllocationSettings,
) -> (AsmModule, Vec<AllocationReport>) {
    let mut module = parse_module(text, catalog).unwrap();
    let reports = allocate_module(&mut module, catalog, settings).unwrap();
    (module, reports)
}

// All pairs of registers that may not share a physical register
fn interference(function: &AsmFunction, catalog: &RegisterCatalog) -> Vec<(Register, Register)> {
    let cfg = ControlFlowGraph::construct(&function.blocks, &function.name).unwrap();
    let renumber = Renumber::new(function, catalog);
    let flow = FlowGraph::construct(function, &cfg, &renumber);
    let liveness = Liveness::analyze(&flow, renumber.length);
    let (graph, _) = build(&flow, &liveness, &renumber, true);
    graph
        .edges()
        .map(|(u, v)| (renumber.register(u), renumber.register(v)))
        .collect()
}

// Runs straight line code with every physical register starting at 1000 plus its index
// Returns the returned values and the register file at the return
fn execute(function: &AsmFunction, catalog: &RegisterCatalog) -> (Vec<i32>, HashMap<Register, i32>) {
    let mut registers: HashMap<Register, i32> = (0..catalog.len())
        .map(|i| (Register::Physical(catalog.get(i)), 1000 + i as i32))
        .collect();
    registers.insert(Register::Physical(catalog.frame_base()), 1 << 16);
    let mut memory: HashMap<i32, i32> = HashMap::new();
    let read = |registers: &HashMap<Register, i32>, reg: Register| {
        registers.get(&reg).copied().unwrap_or(0)
    };

    for block in &function.blocks {
        for instruction in &block.instructions {
            match instruction {
                Instruction::Li { rd, imm } => {
                    registers.insert(*rd, *imm);
                }
                Instruction::Mv { rd, rs } => {
                    let value = read(&registers, *rs);
                    registers.insert(*rd, value);
                }
                Instruction::RCalc {
                    op: RCalcOp::Add,
                    rd,
                    rs1,
                    rs2,
                } => {
                    let value = read(&registers, *rs1).wrapping_add(read(&registers, *rs2));
                    registers.insert(*rd, value);
                }
                Instruction::ICalc {
                    op: ICalcOp::Addi,
                    rd,
                    rs1,
                    imm,
                } => {
                    let value = read(&registers, *rs1).wrapping_add(*imm);
                    registers.insert(*rd, value);
                }
                Instruction::Load {
                    rd, base, offset, ..
                } => {
                    let address = read(&registers, *base) + offset;
                    let value = memory.get(&address).copied().unwrap_or(0);
                    registers.insert(*rd, value);
                }
                Instruction::Store {
                    rs, base, offset, ..
                } => {
                    let address = read(&registers, *base) + offset;
                    memory.insert(address, read(&registers, *rs));
                }
                Instruction::Ret { values, .. } => {
                    let values = values.iter().map(|&reg| read(&registers, reg)).collect();
                    return (values, registers);
                }
                other => panic!("cannot execute {}", other),
            }
        }
    }
    panic!("{} falls off its last block", function.name)
}

fn resolve(reg: Register, report: &AllocationReport) -> Option<PhysicalRegister> {
    match reg {
        Register::Physical(reg) => Some(reg),
        Register::Virtual(vreg) => report.assignment.get(&vreg).copied(),
    }
}

#[test]
fn interfering_registers_get_different_registers() {
    let text = indoc! {"
        fn sum {
        entry:
            li %0, 1
            li %1, 2
            li %2, 3
            add %3, %0, %1
            add %4, %3, %2
            mul %5, %4, %0
            mv a0, %5
            ret a0
        }
    "};
    let before = parse_module(text, &RISCV32).unwrap();
    let (_, reports) = allocate(text, &RISCV32, &without_callee_saved());
    let report = &reports[0];

    assert_eq!(report.rounds, 1);
    assert!(report.spilled.is_empty());
    let edges = interference(&before.functions[0], &RISCV32);
    assert!(!edges.is_empty());
    for (u, v) in edges {
        if let (Some(pu), Some(pv)) = (resolve(u, report), resolve(v, report)) {
            assert_ne!(pu, pv, "{} and {} interfere", u, v);
        }
    }
}

#[test]
fn moves_into_argument_registers_are_coalesced() {
    let text = indoc! {"
        fn add {
        entry:
            mv %0, a0
            mv %1, a1
            add %2, %0, %1
            mv a0, %2
            ret a0
        }
    "};
    let (module, reports) = allocate(text, &RISCV32, &without_callee_saved());

    assert_eq!(
        module.to_string(),
        indoc! {"
            fn add {
            entry:
            \tadd a0, a0, a1
            \tret a0
            }
        "}
    );
    let report = &reports[0];
    assert_eq!(report.coalesced_moves, 3);
    assert_eq!(report.removed_moves, 3);
    let a0 = RISCV32.find("a0").unwrap();
    assert_eq!(report.assignment[&VirtualRegister(0)], a0);
    assert_eq!(report.assignment[&VirtualRegister(2)], a0);
    assert_eq!(report.assignment[&VirtualRegister(1)], RISCV32.find("a1").unwrap());
}

#[test]
fn unused_callee_saved_registers_are_not_saved() {
    let text = indoc! {"
        fn add {
        entry:
            mv %0, a0
            mv %1, a1
            add %2, %0, %1
            mv a0, %2
            ret a0
        }
    "};
    let (module, reports) = allocate(text, &RISCV32, &settings());

    assert_eq!(
        module.to_string(),
        indoc! {"
            fn add {
            entry:
            \tadd a0, a0, a1
            \tret a0
            }
        "}
    );
    // 11 saves, 11 restores and the 3 moves of the body
    assert_eq!(reports[0].coalesced_moves, 25);
    assert_eq!(reports[0].removed_moves, 25);
    assert!(reports[0].callee_saved.is_empty());
}

#[test]
fn clobbered_callee_saved_register_is_saved_and_restored() {
    let text = indoc! {"
        fn keep {
        entry:
            li s1, 5
            mv a0, s1
            ret a0
        }
    "};
    let (module, reports) = allocate(text, &RISCV32, &settings());

    assert_eq!(
        module.to_string(),
        indoc! {"
            fn keep {
            entry:
            \tmv t0, s1
            \tli s1, 5
            \tmv a0, s1
            \tmv s1, t0
            \tret a0
            }
        "}
    );
    assert_eq!(reports[0].removed_moves, 20);
    assert_eq!(reports[0].callee_saved, vec![RISCV32.find("s1").unwrap()]);
}

#[test]
fn a_single_move_is_coalesced_away() {
    let text = indoc! {"
        fn copy {
        entry:
            mv %1, %0
        }
    "};
    let (module, reports) = allocate(text, &RISCV32, &without_callee_saved());
    let report = &reports[0];

    assert_eq!(report.coalesced_moves, 1);
    assert_eq!(report.removed_moves, 1);
    assert_eq!(
        report.assignment[&VirtualRegister(0)],
        report.assignment[&VirtualRegister(1)]
    );
    assert!(module.functions[0].blocks[0].instructions.is_empty());
}

#[test]
fn spills_the_cheapest_register_with_two_colors() {
    let catalog = two_registers();
    let text = indoc! {"
        fn spill {
        entry:
            li %2, 7
            li %0, 1
            li %1, 2
            add %0, %0, %1
            add %0, %0, %1
            add %0, %0, %2
            ret %0
        }
    "};
    let (module, reports) = allocate(text, &catalog, &settings());
    let report = &reports[0];

    assert_eq!(report.rounds, 2);
    assert_eq!(report.spilled, vec![VirtualRegister(2)]);
    assert_eq!(report.frame_size, 4);
    assert_eq!(
        module.to_string(),
        indoc! {"
            fn spill {
            \t# frame 4
            entry:
            \tli x1, 7
            \tsw x1, -4(fp)
            \tli x1, 1
            \tli x2, 2
            \tadd x1, x1, x2
            \tadd x1, x1, x2
            \tlw x2, -4(fp)
            \tadd x1, x1, x2
            \tret x1
            }
        "}
    );
}

#[test]
fn large_frames_address_spill_slots_through_a_register() {
    let catalog = two_registers();
    let text = indoc! {"
        fn spill {
        entry:
            li %2, 7
            li %0, 1
            li %1, 2
            add %0, %0, %1
            add %0, %0, %1
            add %0, %0, %2
            ret %0
        }
    "};
    let mut module = parse_module(text, &catalog).unwrap();
    module.functions[0].frame.size = 4096;
    let reports = allocate_module(&mut module, &catalog, &settings()).unwrap();

    assert_eq!(reports[0].rounds, 2);
    assert_eq!(reports[0].frame_size, 4100);
    assert_eq!(
        module.to_string(),
        indoc! {"
            fn spill {
            \t# frame 4100
            entry:
            \tli x2, 7
            \tli x1, -4100
            \tadd x1, fp, x1
            \tsw x2, 0(x1)
            \tli x1, 1
            \tli x2, 2
            \tadd x1, x1, x2
            \tadd x1, x1, x2
            \tli x2, -4100
            \tadd x2, fp, x2
            \tlw x2, 0(x2)
            \tadd x1, x1, x2
            \tret x1
            }
        "}
    );
}

#[test]
fn registers_used_inside_loops_are_not_spilled() {
    let catalog = two_registers();
    let text = indoc! {"
        fn count {
        entry:
            li %2, 5
            li %0, 0
            li %1, 1
        head:
            add %0, %0, %1
            bne %0, %1, head
        exit:
            add %0, %0, %2
            add %0, %0, %2
            add %0, %0, %2
            ret %0
        }
    "};
    let (module, reports) = allocate(text, &catalog, &settings());

    assert_eq!(reports[0].rounds, 2);
    assert_eq!(reports[0].spilled, vec![VirtualRegister(2)]);
    let printed = module.to_string();
    assert_eq!(printed.matches("sw ").count(), 1);
    assert_eq!(printed.matches("lw ").count(), 3);
}

#[test]
fn spilled_registers_stay_spilled() {
    let catalog = two_registers();
    let text = indoc! {"
        fn spill {
        entry:
            li %2, 7
            li %0, 1
            li %1, 2
            add %0, %0, %1
            add %0, %0, %1
            add %0, %0, %2
            ret %0
        }
    "};
    let (module, reports) = allocate(text, &catalog, &settings());

    // The spilled register no longer occurs and got no register of its own
    assert!(!reports[0].assignment.contains_key(&VirtualRegister(2)));
    assert_eq!(module.functions[0].frame.get(VirtualRegister(2)), Some(4));
}

#[test]
fn gives_up_after_the_last_round() {
    let catalog = two_registers();
    let text = indoc! {"
        fn spill {
        entry:
            li %2, 7
            li %0, 1
            li %1, 2
            add %0, %0, %1
            add %0, %0, %1
            add %0, %0, %2
            ret %0
        }
    "};
    let mut module = parse_module(text, &catalog).unwrap();
    let settings = AllocationSettings {
        max_rounds: 1,
        ..settings()
    };

    assert_eq!(
        allocate_module(&mut module, &catalog, &settings),
        Err(AllocationError::SpillDidNotConverge {
            function: "spill".to_string(),
            rounds: 1
        })
    );
}

#[test]
fn unknown_labels_are_reported() {
    let text = indoc! {"
        fn jump {
        entry:
            j nowhere
        }
    "};
    let mut module = parse_module(text, &RISCV32).unwrap();

    assert_eq!(
        allocate_module(&mut module, &RISCV32, &settings()),
        Err(AllocationError::UnknownLabel {
            function: "jump".to_string(),
            label: "nowhere".to_string()
        })
    );
}

#[test]
fn functions_without_blocks_are_rejected() {
    let mut module = parse_module("fn empty {\n}\n", &RISCV32).unwrap();

    assert_eq!(
        allocate_module(&mut module, &RISCV32, &settings()),
        Err(AllocationError::EmptyFunction {
            function: "empty".to_string()
        })
    );
}

#[test]
fn values_live_across_calls_avoid_caller_saved_registers() {
    let catalog = RegisterCatalog::new(&["fp", "c1", "c2", "s1"], &["s1"], &["c1", "c2"], "fp").unwrap();
    let text = indoc! {"
        fn outer {
        entry:
            li %0, 3
            call inner()
            add %0, %0, %0
            mv c1, %0
            ret c1
        }
    "};
    let (module, reports) = allocate(text, &catalog, &settings());

    // the copy of s1 goes to the stack so the value can use s1 across the call
    assert_eq!(
        module.to_string(),
        indoc! {"
            fn outer {
            \t# frame 4
            entry:
            \tsw s1, -4(fp)
            \tli s1, 3
            \tcall inner()
            \tadd s1, s1, s1
            \tmv c1, s1
            \tlw s1, -4(fp)
            \tret c1
            }
        "}
    );
    assert_eq!(reports[0].rounds, 2);
    assert_eq!(reports[0].spilled, vec![VirtualRegister(1)]);
    assert_eq!(reports[0].assignment[&VirtualRegister(0)], catalog.find("s1").unwrap());
    assert_eq!(reports[0].callee_saved, vec![catalog.find("s1").unwrap()]);
}

#[test]
fn reloaded_return_values_leave_callee_saved_registers_intact() {
    let catalog = callee_saved_first();
    let text = indoc! {"
        fn seven {
        entry:
            li %0, 7
            li %1, 1
            add %1, %1, %1
            ret %0
        }
    "};
    let original = parse_module(text, &catalog).unwrap();
    let (module, reports) = allocate(text, &catalog, &settings());

    // the reload of %0 comes after s1 is restored, so it must not land in s1
    assert_eq!(
        module.to_string(),
        indoc! {"
            fn seven {
            \t# frame 4
            entry:
            \tmv c1, s1
            \tli s1, 7
            \tsw s1, -4(fp)
            \tli s1, 1
            \tadd s1, s1, s1
            \tmv s1, c1
            \tlw c1, -4(fp)
            \tret c1
            }
        "}
    );
    assert_eq!(reports[0].rounds, 2);
    assert_eq!(reports[0].spilled, vec![VirtualRegister(0)]);
    assert_eq!(reports[0].callee_saved, vec![catalog.find("s1").unwrap()]);

    let (expected, _) = execute(&original.functions[0], &catalog);
    let (values, registers) = execute(&module.functions[0], &catalog);
    assert_eq!(values, expected);
    for &reg in catalog.callee_saved() {
        assert_eq!(registers[&Register::Physical(reg)], 1000 + reg.index as i32);
    }
}

#[test]
fn moves_with_the_stack_pointer_are_kept() {
    let text = indoc! {"
        fn frame {
        entry:
            mv %0, sp
            addi %1, %0, 16
            mv a0, %1
            ret a0
        }
    "};
    let (module, _) = allocate(text, &RISCV32, &without_callee_saved());

    assert_eq!(
        module.to_string(),
        indoc! {"
            fn frame {
            entry:
            \tmv t0, sp
            \taddi a0, t0, 16
            \tret a0
            }
        "}
    );
}
