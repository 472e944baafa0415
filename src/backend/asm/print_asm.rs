use std::fmt::{self, Display};

use super::*;

// This prints the assembly in a RISC-V like format using the Display trait
// The output can be read back with parse_module

impl Display for AsmModule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for global in &self.globals {
            writeln!(f, "global {} = {}", global.name, global.value)?;
        }
        for (i, function) in self.functions.iter().enumerate() {
            if i > 0 || !self.globals.is_empty() {
                writeln!(f)?;
            }
            write!(f, "{}", function)?;
        }
        Ok(())
    }
}

impl Display for AsmFunction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "fn {} {{", self.name)?;
        if self.frame.size > 0 {
            writeln!(f, "\t# frame {}", self.frame.size)?;
        }
        for block in &self.blocks {
            write!(f, "{}", block)?;
        }
        writeln!(f, "}}")
    }
}

impl Display for AsmBlock {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}:", self.label)?;
        for instruction in &self.instructions {
            writeln!(f, "\t{}", instruction)?;
        }
        Ok(())
    }
}

impl Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Register::Virtual(vreg) => write!(f, "{}", vreg),
            Register::Physical(reg) => write!(f, "{}", reg),
        }
    }
}

impl Display for VirtualRegister {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

impl Display for PhysicalRegister {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

fn write_list(f: &mut fmt::Formatter, registers: &[Register]) -> fmt::Result {
    for (i, reg) in registers.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", reg)?;
    }
    Ok(())
}

impl Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use Instruction::*;
        match self {
            Li { rd, imm } => write!(f, "li {}, {}", rd, imm),
            Mv { rd, rs } => write!(f, "mv {}, {}", rd, rs),
            La { rd, symbol } => write!(f, "la {}, {}", rd, symbol),
            RCalc { op, rd, rs1, rs2 } => write!(f, "{} {}, {}, {}", op, rd, rs1, rs2),
            ICalc { op, rd, rs1, imm } => write!(f, "{} {}, {}, {}", op, rd, rs1, imm),
            Load {
                width,
                rd,
                base,
                offset,
            } => write!(f, "l{} {}, {}({})", width, rd, offset, base),
            Store {
                width,
                rs,
                base,
                offset,
            } => write!(f, "s{} {}, {}({})", width, rs, offset, base),
            LoadSymbol { width, rd, symbol } => write!(f, "l{} {}, {}", width, rd, symbol),
            StoreSymbol {
                width,
                rs,
                scratch,
                symbol,
            } => write!(f, "s{} {}, {}, {}", width, rs, symbol, scratch),
            Branch {
                op,
                rs1,
                rs2,
                target,
            } => write!(f, "{} {}, {}, {}", op, rs1, rs2, target),
            Jump { target } => write!(f, "j {}", target),
            Call {
                callee, arguments, ..
            } => {
                write!(f, "call {}(", callee)?;
                write_list(f, arguments)?;
                write!(f, ")")
            }
            Ret { values, .. } if values.is_empty() => write!(f, "ret"),
            Ret { values, .. } => {
                write!(f, "ret ")?;
                write_list(f, values)
            }
        }
    }
}

impl Display for Width {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Width::Byte => write!(f, "b"),
            Width::Half => write!(f, "h"),
            Width::Word => write!(f, "w"),
        }
    }
}

impl Display for RCalcOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}

impl Display for ICalcOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}

impl Display for BranchOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}
