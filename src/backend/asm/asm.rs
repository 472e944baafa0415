use std::collections::HashMap;

use smallvec::{smallvec, SmallVec};

pub type AsmLabel = String;

/// A symbolic register produced by instruction selection
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VirtualRegister(pub u32);

/// A hardware register. The index is its position in the register catalog
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PhysicalRegister {
    pub index: u16,
    pub name: &'static str,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Register {
    Virtual(VirtualRegister),
    Physical(PhysicalRegister),
}

impl Register {
    pub fn vreg(&self) -> Option<VirtualRegister> {
        match self {
            Register::Virtual(vreg) => Some(*vreg),
            Register::Physical(_) => None,
        }
    }
}

impl From<VirtualRegister> for Register {
    fn from(vreg: VirtualRegister) -> Self {
        Register::Virtual(vreg)
    }
}

impl From<PhysicalRegister> for Register {
    fn from(reg: PhysicalRegister) -> Self {
        Register::Physical(reg)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Width {
    Byte,
    Half,
    Word,
}

impl Width {
    pub fn from_size(size: u32) -> Width {
        match size {
            1 => Width::Byte,
            2 => Width::Half,
            _ => Width::Word,
        }
    }

    pub fn bytes(&self) -> u32 {
        match self {
            Width::Byte => 1,
            Width::Half => 2,
            Width::Word => 4,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RCalcOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    Sll,
    Srl,
    Sra,
    Slt,
    Sltu,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ICalcOp {
    Addi,
    Andi,
    Ori,
    Xori,
    Slli,
    Srli,
    Srai,
    Slti,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BranchOp {
    Beq,
    Bne,
    Blt,
    Bge,
    Bltu,
    Bgeu,
}

impl RCalcOp {
    pub const ALL: [RCalcOp; 13] = [
        RCalcOp::Add,
        RCalcOp::Sub,
        RCalcOp::Mul,
        RCalcOp::Div,
        RCalcOp::Rem,
        RCalcOp::And,
        RCalcOp::Or,
        RCalcOp::Xor,
        RCalcOp::Sll,
        RCalcOp::Srl,
        RCalcOp::Sra,
        RCalcOp::Slt,
        RCalcOp::Sltu,
    ];

    pub fn mnemonic(&self) -> &'static str {
        use RCalcOp::*;
        match self {
            Add => "add",
            Sub => "sub",
            Mul => "mul",
            Div => "div",
            Rem => "rem",
            And => "and",
            Or => "or",
            Xor => "xor",
            Sll => "sll",
            Srl => "srl",
            Sra => "sra",
            Slt => "slt",
            Sltu => "sltu",
        }
    }
}

impl ICalcOp {
    pub const ALL: [ICalcOp; 8] = [
        ICalcOp::Addi,
        ICalcOp::Andi,
        ICalcOp::Ori,
        ICalcOp::Xori,
        ICalcOp::Slli,
        ICalcOp::Srli,
        ICalcOp::Srai,
        ICalcOp::Slti,
    ];

    pub fn mnemonic(&self) -> &'static str {
        use ICalcOp::*;
        match self {
            Addi => "addi",
            Andi => "andi",
            Ori => "ori",
            Xori => "xori",
            Slli => "slli",
            Srli => "srli",
            Srai => "srai",
            Slti => "slti",
        }
    }
}

impl BranchOp {
    pub const ALL: [BranchOp; 6] = [
        BranchOp::Beq,
        BranchOp::Bne,
        BranchOp::Blt,
        BranchOp::Bge,
        BranchOp::Bltu,
        BranchOp::Bgeu,
    ];

    pub fn mnemonic(&self) -> &'static str {
        use BranchOp::*;
        match self {
            Beq => "beq",
            Bne => "bne",
            Blt => "blt",
            Bge => "bge",
            Bltu => "bltu",
            Bgeu => "bgeu",
        }
    }
}

/// All instructions the allocator understands
#[derive(Clone, Debug, PartialEq)]
pub enum Instruction {
    Li {
        rd: Register,
        imm: i32,
    },
    Mv {
        rd: Register,
        rs: Register,
    },
    La {
        rd: Register,
        symbol: String,
    },
    RCalc {
        op: RCalcOp,
        rd: Register,
        rs1: Register,
        rs2: Register,
    },
    ICalc {
        op: ICalcOp,
        rd: Register,
        rs1: Register,
        imm: i32,
    },
    Load {
        width: Width,
        rd: Register,
        base: Register,
        offset: i32,
    },
    Store {
        width: Width,
        rs: Register,
        base: Register,
        offset: i32,
    },
    // lw rd, symbol
    LoadSymbol {
        width: Width,
        rd: Register,
        symbol: String,
    },
    // sw rs, symbol, scratch
    // The scratch register receives the symbol address before rs is stored
    StoreSymbol {
        width: Width,
        rs: Register,
        scratch: Register,
        symbol: String,
    },
    Branch {
        op: BranchOp,
        rs1: Register,
        rs2: Register,
        target: AsmLabel,
    },
    Jump {
        target: AsmLabel,
    },
    Call {
        callee: String,
        arguments: Vec<Register>,
        clobbers: Vec<Register>,
    },
    // The preserved registers must hold their value from entry when the function returns
    Ret {
        values: Vec<Register>,
        preserved: Vec<Register>,
    },
}

impl Instruction {
    pub fn mv(rd: impl Into<Register>, rs: impl Into<Register>) -> Instruction {
        Instruction::Mv {
            rd: rd.into(),
            rs: rs.into(),
        }
    }

    // Registers written by this instruction in operand order
    pub fn defs(&self) -> SmallVec<[Register; 4]> {
        use Instruction::*;
        match self {
            Li { rd, .. }
            | Mv { rd, .. }
            | La { rd, .. }
            | RCalc { rd, .. }
            | ICalc { rd, .. }
            | Load { rd, .. }
            | LoadSymbol { rd, .. } => smallvec![*rd],
            StoreSymbol { scratch, .. } => smallvec![*scratch],
            Call { clobbers, .. } => clobbers.iter().copied().collect(),
            Store { .. } | Branch { .. } | Jump { .. } | Ret { .. } => SmallVec::new(),
        }
    }

    // Registers read by this instruction in operand order
    pub fn uses(&self) -> SmallVec<[Register; 4]> {
        use Instruction::*;
        match self {
            Mv { rs, .. } | StoreSymbol { rs, .. } => smallvec![*rs],
            RCalc { rs1, rs2, .. } | Branch { rs1, rs2, .. } => smallvec![*rs1, *rs2],
            ICalc { rs1, .. } => smallvec![*rs1],
            Load { base, .. } => smallvec![*base],
            Store { rs, base, .. } => smallvec![*rs, *base],
            Call { arguments, .. } => arguments.iter().copied().collect(),
            Ret { values, preserved } => values.iter().chain(preserved.iter()).copied().collect(),
            Li { .. } | La { .. } | LoadSymbol { .. } | Jump { .. } => SmallVec::new(),
        }
    }

    pub fn defs_mut(&mut self) -> SmallVec<[&mut Register; 4]> {
        use Instruction::*;
        match self {
            Li { rd, .. }
            | Mv { rd, .. }
            | La { rd, .. }
            | RCalc { rd, .. }
            | ICalc { rd, .. }
            | Load { rd, .. }
            | LoadSymbol { rd, .. } => smallvec![rd],
            StoreSymbol { scratch, .. } => smallvec![scratch],
            Call { clobbers, .. } => clobbers.iter_mut().collect(),
            Store { .. } | Branch { .. } | Jump { .. } | Ret { .. } => SmallVec::new(),
        }
    }

    pub fn uses_mut(&mut self) -> SmallVec<[&mut Register; 4]> {
        use Instruction::*;
        match self {
            Mv { rs, .. } | StoreSymbol { rs, .. } => smallvec![rs],
            RCalc { rs1, rs2, .. } | Branch { rs1, rs2, .. } => smallvec![rs1, rs2],
            ICalc { rs1, .. } => smallvec![rs1],
            Load { base, .. } => smallvec![base],
            Store { rs, base, .. } => smallvec![rs, base],
            Call { arguments, .. } => arguments.iter_mut().collect(),
            Ret { values, preserved } => values.iter_mut().chain(preserved.iter_mut()).collect(),
            Li { .. } | La { .. } | LoadSymbol { .. } | Jump { .. } => SmallVec::new(),
        }
    }

    pub fn is_move(&self) -> bool {
        matches!(self, Instruction::Mv { .. })
    }

    /// Gives (destination, source) of a register to register copy
    pub fn move_operands(&self) -> Option<(Register, Register)> {
        match self {
            Instruction::Mv { rd, rs } => Some((*rd, *rs)),
            _ => None,
        }
    }

    /// Gives (address base, value) of a store into a symbolic slot
    pub fn symbolic_store(&self) -> Option<(Register, Register)> {
        match self {
            Instruction::StoreSymbol { rs, scratch, .. } => Some((*scratch, *rs)),
            _ => None,
        }
    }

    pub fn branch_target(&self) -> Option<&str> {
        match self {
            Instruction::Branch { target, .. } | Instruction::Jump { target } => Some(target),
            _ => None,
        }
    }

    // Control never falls through to the next instruction
    pub fn is_terminator(&self) -> bool {
        matches!(self, Instruction::Jump { .. } | Instruction::Ret { .. })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AsmBlock {
    pub label: AsmLabel,
    pub instructions: Vec<Instruction>,
}

impl AsmBlock {
    pub fn new(label: impl Into<AsmLabel>) -> AsmBlock {
        AsmBlock {
            label: label.into(),
            instructions: Vec::new(),
        }
    }
}

/// Stack slots of spilled registers, addressed below the frame base
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StackFrame {
    pub size: u32,
    slots: HashMap<VirtualRegister, u32>,
}

impl StackFrame {
    // Slots are never released, a register keeps its offset for the whole function
    pub fn alloc(&mut self, vreg: VirtualRegister, size: u32) -> u32 {
        if let Some(&offset) = self.slots.get(&vreg) {
            return offset;
        }
        let align = size.max(1);
        let offset = (self.size + size + align - 1) / align * align;
        self.size = offset;
        self.slots.insert(vreg, offset);
        offset
    }

    pub fn get(&self, vreg: VirtualRegister) -> Option<u32> {
        self.slots.get(&vreg).copied()
    }
}

/// Stores a function and all the associated information
/// The first block is the entry block
#[derive(Clone, Debug, PartialEq)]
pub struct AsmFunction {
    pub name: String,
    pub blocks: Vec<AsmBlock>,
    pub vreg_sizes: Vec<u32>,
    pub frame: StackFrame,
}

impl AsmFunction {
    pub fn new(name: impl Into<String>) -> AsmFunction {
        AsmFunction {
            name: name.into(),
            blocks: Vec::new(),
            vreg_sizes: Vec::new(),
            frame: StackFrame::default(),
        }
    }

    pub fn vreg_count(&self) -> u32 {
        self.vreg_sizes.len() as u32
    }

    pub fn add_vreg(&mut self, size: u32) -> VirtualRegister {
        let vreg = VirtualRegister(self.vreg_sizes.len() as u32);
        self.vreg_sizes.push(size);
        vreg
    }

    pub fn vreg_size(&self, vreg: VirtualRegister) -> u32 {
        self.vreg_sizes.get(vreg.0 as usize).copied().unwrap_or(4)
    }

    // Makes sure vreg is a valid register of this function
    pub fn reserve_vreg(&mut self, vreg: VirtualRegister, size: u32) {
        let index = vreg.0 as usize;
        if index >= self.vreg_sizes.len() {
            self.vreg_sizes.resize(index + 1, 4);
        }
        self.vreg_sizes[index] = size;
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AsmGlobal {
    pub name: String,
    pub value: i32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AsmModule {
    pub globals: Vec<AsmGlobal>,
    pub functions: Vec<AsmFunction>,
}
