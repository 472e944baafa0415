use indoc::indoc;
use rvra_lib::backend::asm::{
    parse_module, ControlFlowGraph, Instruction, Register, VirtualRegister, RISCV32,
};
use rvra_lib::backend::register_allocation::bracket_callee_saved;
use rvra_lib::backend::register_allocation::iterated::{build, FlowGraph, Liveness, Renumber};
use rvra_lib::error::ParseErrorKind;

const COUNTER: &str = indoc! {"
    global counter = 0

    fn count {
    entry:
        li %0, 0
        li %1, 10
    head:
        addi %0, %0, 1
        sw %0, counter, %2
        blt %0, %1, head
    exit:
        mv a0, %0
        ret a0
    dead:
        li %3, 1
        j head
    }
"};

#[test]
fn printed_module_reads_back_the_same() {
    let text = indoc! {"
        global counter = 0
        global limit = -4

        fn everything {
        entry:
        \tli %0, 1
        \tla %1, counter
        \tlw %2, counter
        \tsb %2, counter, %3
        \tlh %4, -8(s0)
        \tsw %4, 12(sp)
        \tsltu %5, %0, %4
        \tsrai %6, %5, 2
        \tbgeu %6, zero, next
        next:
        \tcall print(a0, a1)
        \tmv a0, %6
        \tret a0
        }

        fn nothing {
        start:
        \tret
        }
    "};
    let module = parse_module(text, &RISCV32).unwrap();

    assert_eq!(module.globals.len(), 2);
    assert_eq!(module.functions[0].vreg_count(), 7);
    assert_eq!(module.to_string(), text);
}

#[test]
fn calls_clobber_the_caller_saved_registers() {
    let module = parse_module("fn f {\nentry:\n\tcall g(a0)\n}\n", &RISCV32).unwrap();
    let call = &module.functions[0].blocks[0].instructions[0];

    assert_eq!(call.defs().len(), RISCV32.caller_saved().len());
    assert_eq!(call.uses().to_vec(), vec![Register::Physical(RISCV32.find("a0").unwrap())]);
}

#[test]
fn parse_errors_point_at_the_line() {
    let text = indoc! {"
        fn broken {
        entry:
            li %0, 1
            frobnicate %0
        }
    "};
    let error = parse_module(text, &RISCV32).unwrap_err();

    assert_eq!(error.span.line(), 4);
    assert_eq!(error.span.column(), 5);
    assert_eq!(
        error.kind,
        ParseErrorKind::UnknownInstruction("frobnicate".to_string())
    );
}

#[test]
fn unknown_registers_are_rejected() {
    let error = parse_module("fn f {\nentry:\n\tmv x99, a0\n}\n", &RISCV32).unwrap_err();

    assert_eq!(error.kind, ParseErrorKind::UnknownRegister("x99".to_string()));
}

#[test]
fn unclosed_functions_are_rejected() {
    let error = parse_module("fn f {\nentry:\n\tret\n", &RISCV32).unwrap_err();

    assert_eq!(error.kind, ParseErrorKind::UnclosedFunction("f".to_string()));
    assert_eq!(error.span.line(), 1);
}

#[test]
fn loop_blocks_are_one_level_deep() {
    let module = parse_module(COUNTER, &RISCV32).unwrap();
    let function = &module.functions[0];
    let cfg = ControlFlowGraph::construct(&function.blocks, &function.name).unwrap();

    let depths: Vec<_> = cfg.iter().map(|node| node.loop_depth).collect();
    assert_eq!(depths, vec![0, 1, 0, 0]);
    assert_eq!(cfg[1].successors.to_vec(), vec![1, 2]);
    assert!(cfg.is_reachable(2));
    assert!(!cfg.is_reachable(3));
}

#[test]
fn unreachable_instructions_are_not_analyzed() {
    let module = parse_module(COUNTER, &RISCV32).unwrap();
    let function = &module.functions[0];
    let cfg = ControlFlowGraph::construct(&function.blocks, &function.name).unwrap();
    let renumber = Renumber::new(function, &RISCV32);
    let flow = FlowGraph::construct(function, &cfg, &renumber);

    assert_eq!(flow.len(), 7);
    assert!(flow.nodes.iter().all(|node| node.block != 3));
    assert_eq!(flow.nodes[6].successors.len(), 0);
    // blt goes back to the head and falls through to the exit
    assert_eq!(flow.nodes[4].successors.to_vec(), vec![2, 5]);
}

#[test]
fn liveness_reaches_a_fixpoint() {
    let mut module = parse_module(COUNTER, &RISCV32).unwrap();
    let function = &mut module.functions[0];
    bracket_callee_saved(function, &RISCV32);
    let cfg = ControlFlowGraph::construct(&function.blocks, &function.name).unwrap();
    let renumber = Renumber::new(&*function, &RISCV32);
    let flow = FlowGraph::construct(&*function, &cfg, &renumber);
    let liveness = Liveness::analyze(&flow, renumber.length);

    assert!(liveness.is_fixpoint(&flow));
    assert_eq!(Liveness::analyze(&flow, renumber.length), liveness);
}

#[test]
fn loop_carried_registers_are_live_around_the_loop() {
    let module = parse_module(COUNTER, &RISCV32).unwrap();
    let function = &module.functions[0];
    let cfg = ControlFlowGraph::construct(&function.blocks, &function.name).unwrap();
    let renumber = Renumber::new(function, &RISCV32);
    let flow = FlowGraph::construct(function, &cfg, &renumber);
    let liveness = Liveness::analyze(&flow, renumber.length);

    let v0 = renumber.index(Register::Virtual(VirtualRegister(0)));
    let v1 = renumber.index(Register::Virtual(VirtualRegister(1)));
    let a0 = renumber.index(Register::Physical(RISCV32.find("a0").unwrap()));
    // out of blt
    assert!(liveness.is_live_out(4, v0));
    assert!(liveness.is_live_out(4, v1));
    // out of mv a0, %0
    assert!(liveness.is_live_out(5, a0));
    assert!(!liveness.is_live_out(5, v0));
    assert!(!liveness.is_live_out(5, v1));
}

#[test]
fn symbolic_stores_interfere_with_their_scratch_register() {
    let text = indoc! {"
        fn store {
        entry:
            li %0, 4
            sw %0, counter, %1
            ret
        }
    "};
    let module = parse_module(text, &RISCV32).unwrap();
    let function = &module.functions[0];
    let cfg = ControlFlowGraph::construct(&function.blocks, &function.name).unwrap();
    let renumber = Renumber::new(function, &RISCV32);
    let flow = FlowGraph::construct(function, &cfg, &renumber);
    let liveness = Liveness::analyze(&flow, renumber.length);
    let (graph, moves) = build(&flow, &liveness, &renumber, true);

    assert!(moves.is_empty());
    assert!(graph.interfere(0, 1));
    let virtual_neighbors = graph.adjacency_list[0]
        .iter()
        .filter(|&&n| !graph.is_precolored(n))
        .count();
    assert_eq!(virtual_neighbors, 1);
}

#[test]
fn moves_do_not_make_their_ends_interfere() {
    let text = indoc! {"
        fn copy {
        entry:
            li %0, 4
            mv %1, %0
            add %2, %1, %1
            mv a0, %2
            ret a0
        }
    "};
    let module = parse_module(text, &RISCV32).unwrap();
    let function = &module.functions[0];
    let cfg = ControlFlowGraph::construct(&function.blocks, &function.name).unwrap();
    let renumber = Renumber::new(function, &RISCV32);
    let flow = FlowGraph::construct(function, &cfg, &renumber);
    let liveness = Liveness::analyze(&flow, renumber.length);
    let (graph, moves) = build(&flow, &liveness, &renumber, true);

    assert_eq!(moves.len(), 2);
    assert_eq!((moves[0].dst, moves[0].src), (1, 0));
    assert!(!graph.interfere(0, 1));
    assert_eq!(graph.move_list[0].to_vec(), vec![0]);
}

#[test]
fn callee_saved_registers_are_bracketed() {
    let mut module = parse_module(COUNTER, &RISCV32).unwrap();
    let function = &mut module.functions[0];
    let saved = bracket_callee_saved(function, &RISCV32);

    let s1 = RISCV32.find("s1").unwrap();
    assert_eq!(saved.len(), 11);
    assert_eq!(saved[0], (s1, VirtualRegister(4)));
    assert_eq!(function.blocks[0].instructions[0], Instruction::mv(saved[0].1, s1));
    // restores go in front of the jump that ends the last block
    let last = &function.blocks[3].instructions;
    assert_eq!(last.len(), 1 + 11 + 1);
    assert_eq!(last[11], Instruction::mv(s1, saved[0].1));
    assert!(last[12].is_terminator());
}

#[test]
fn returns_keep_callee_saved_registers_alive() {
    let module = parse_module(COUNTER, &RISCV32).unwrap();
    let function = &module.functions[0];
    let cfg = ControlFlowGraph::construct(&function.blocks, &function.name).unwrap();
    let renumber = Renumber::new(function, &RISCV32);
    let flow = FlowGraph::construct(function, &cfg, &renumber);
    let liveness = Liveness::analyze(&flow, renumber.length);

    let ret = &function.blocks[2].instructions[1];
    assert_eq!(ret.uses().len(), 1 + RISCV32.callee_saved().len());
    assert_eq!(ret.to_string(), "ret a0");
    // nothing writes them, so they are live from entry to the return
    for &reg in RISCV32.callee_saved() {
        let n = renumber.index(Register::Physical(reg));
        assert!(liveness.is_live_out(0, n));
        assert!(liveness.is_live_out(5, n));
    }
}
