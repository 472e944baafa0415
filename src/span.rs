use std::fmt::Display;

/// Struct too show were an instruction or declaration originates from.
// .line is the line number of the start of the item.
// .column is the column number of the start.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct Span {
    line: u32,
    column: u32,
}

impl Span {
    pub fn new(line: u32, column: u32) -> Self {
        Span { line, column }
    }
    pub fn line(&self) -> u32 {
        self.line
    }
    pub fn column(&self) -> u32 {
        self.column
    }
}

impl Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:", self.line, self.column)
    }
}
