use thiserror::Error;

use crate::span::Span;

#[macro_export]
macro_rules! error {
    ($span:expr,$( $exp:expr ),*) => {
        {
            use colored::Colorize;
            let string= format!("{}: error: {}",$span,format!($($exp,)*).red());
            eprintln!("{}",string);
            string
        }
    };
}

#[macro_export]
macro_rules! warning {
    ($span:expr,$( $exp:expr ),*) => {
        {
            use colored::Colorize;
            let string = format!("{}: warning: {}",$span,format!($($exp,)*).purple());
            eprintln!("{}",string);
            string
        }
    };
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("the register catalog is empty")]
    Empty,

    #[error("the register catalog has no allocatable registers")]
    NoAllocatableRegisters,

    #[error("register `{name}` is listed twice")]
    Duplicate { name: String },

    #[error("register `{name}` is not part of the catalog")]
    UnknownRegister { name: String },

    #[error("allocatable register `{name}` is not in the last {count} catalog positions")]
    NotASuffix { name: String, count: usize },

    #[error("frame base `{name}` cannot be an allocatable register")]
    AllocatableFrameBase { name: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AllocationError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("function `{function}` has no blocks")]
    EmptyFunction { function: String },

    #[error("function `{function}` jumps to unknown label `{label}`")]
    UnknownLabel { function: String, label: String },

    #[error("function `{function}` still spills after {rounds} rounds")]
    SpillDidNotConverge { function: String, rounds: usize },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{span} {kind}")]
pub struct ParseError {
    pub span: Span,
    pub kind: ParseErrorKind,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    #[error("unknown instruction `{0}`")]
    UnknownInstruction(String),

    #[error("unknown register `{0}`")]
    UnknownRegister(String),

    #[error("expected {expected} operands, got {got}")]
    OperandCount { expected: usize, got: usize },

    #[error("invalid immediate `{0}`")]
    InvalidImmediate(String),

    #[error("invalid memory operand `{0}`")]
    InvalidAddress(String),

    #[error("instruction outside of a block")]
    OutsideBlock,

    #[error("unexpected `{0}`")]
    Unexpected(String),

    #[error("function `{0}` is not closed")]
    UnclosedFunction(String),
}

impl ParseError {
    pub fn new(span: Span, kind: ParseErrorKind) -> ParseError {
        ParseError { span, kind }
    }
}
