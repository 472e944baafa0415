use super::*;
use crate::error::{ParseError, ParseErrorKind};
use crate::span::Span;

// Reads the textual form written by the printer
// The format is line based:
//  global name = value
//  fn name {
//  label:
//      instruction operand, operand
//  }
// Everything after a '#' is a comment

pub fn parse_module(text: &str, catalog: &RegisterCatalog) -> Result<AsmModule, ParseError> {
    let mut parser = Parser {
        catalog,
        module: AsmModule::default(),
        function: None,
    };
    for (line, number) in text.lines().zip(1u32..) {
        let line = match line.find('#') {
            Some(comment) => &line[..comment],
            None => line,
        };
        let content = line.trim();
        if content.is_empty() {
            continue;
        }
        let column = (line.len() - line.trim_start().len()) as u32 + 1;
        parser.parse_line(content, Span::new(number, column))?;
    }

    if let Some((function, span)) = parser.function {
        return Err(ParseError::new(
            span,
            ParseErrorKind::UnclosedFunction(function.name),
        ));
    }
    log::debug!(
        "Parsed {} functions and {} globals",
        parser.module.functions.len(),
        parser.module.globals.len()
    );
    Ok(parser.module)
}

struct Parser<'a> {
    catalog: &'a RegisterCatalog,
    module: AsmModule,
    function: Option<(AsmFunction, Span)>,
}

impl<'a> Parser<'a> {
    fn parse_line(&mut self, line: &str, span: Span) -> Result<(), ParseError> {
        let unexpected = || ParseError::new(span, ParseErrorKind::Unexpected(line.to_string()));

        if self.function.is_none() {
            if let Some(rest) = line.strip_prefix("global ") {
                let (name, value) = rest.split_once('=').ok_or_else(unexpected)?;
                let value = parse_immediate(value.trim(), span)?;
                self.module.globals.push(AsmGlobal {
                    name: name.trim().to_string(),
                    value,
                });
                return Ok(());
            }
            if let Some(rest) = line.strip_prefix("fn ") {
                let name = rest.strip_suffix('{').ok_or_else(unexpected)?.trim();
                if name.is_empty() {
                    return Err(unexpected());
                }
                self.function = Some((AsmFunction::new(name), span));
                return Ok(());
            }
            return Err(unexpected());
        }

        if line == "}" {
            if let Some((function, _)) = self.function.take() {
                self.module.functions.push(function);
            }
            return Ok(());
        }

        if let Some(label) = line.strip_suffix(':') {
            if label.contains(char::is_whitespace) || label.is_empty() {
                return Err(unexpected());
            }
            if let Some((function, _)) = &mut self.function {
                function.blocks.push(AsmBlock::new(label));
            }
            return Ok(());
        }

        let instruction = self.parse_instruction(line, span)?;
        match &mut self.function {
            Some((function, _)) => match function.blocks.last_mut() {
                Some(block) => {
                    block.instructions.push(instruction);
                    Ok(())
                }
                None => Err(ParseError::new(span, ParseErrorKind::OutsideBlock)),
            },
            None => Err(unexpected()),
        }
    }

    fn parse_instruction(&mut self, line: &str, span: Span) -> Result<Instruction, ParseError> {
        let (mnemonic, rest) = match line.split_once(char::is_whitespace) {
            Some((mnemonic, rest)) => (mnemonic, rest.trim()),
            None => (line, ""),
        };

        if mnemonic == "call" {
            return self.parse_call(rest, span);
        }

        let operands: Vec<&str> = if rest.is_empty() {
            Vec::new()
        } else {
            rest.split(',').map(str::trim).collect()
        };
        let expect = |expected: usize| {
            if operands.len() == expected {
                Ok(())
            } else {
                Err(ParseError::new(
                    span,
                    ParseErrorKind::OperandCount {
                        expected,
                        got: operands.len(),
                    },
                ))
            }
        };

        let instruction = match mnemonic {
            "li" => {
                expect(2)?;
                Instruction::Li {
                    rd: self.register(operands[0], span)?,
                    imm: parse_immediate(operands[1], span)?,
                }
            }
            "mv" => {
                expect(2)?;
                Instruction::Mv {
                    rd: self.register(operands[0], span)?,
                    rs: self.register(operands[1], span)?,
                }
            }
            "la" => {
                expect(2)?;
                Instruction::La {
                    rd: self.register(operands[0], span)?,
                    symbol: operands[1].to_string(),
                }
            }
            "j" => {
                expect(1)?;
                Instruction::Jump {
                    target: operands[0].to_string(),
                }
            }
            "ret" => Instruction::Ret {
                values: operands
                    .iter()
                    .map(|operand| self.register(operand, span))
                    .collect::<Result<_, _>>()?,
                preserved: self
                    .catalog
                    .callee_saved()
                    .iter()
                    .map(|&reg| Register::Physical(reg))
                    .collect(),
            },
            _ => {
                if let Some(&op) = RCalcOp::ALL.iter().find(|op| op.mnemonic() == mnemonic) {
                    expect(3)?;
                    Instruction::RCalc {
                        op,
                        rd: self.register(operands[0], span)?,
                        rs1: self.register(operands[1], span)?,
                        rs2: self.register(operands[2], span)?,
                    }
                } else if let Some(&op) = ICalcOp::ALL.iter().find(|op| op.mnemonic() == mnemonic)
                {
                    expect(3)?;
                    Instruction::ICalc {
                        op,
                        rd: self.register(operands[0], span)?,
                        rs1: self.register(operands[1], span)?,
                        imm: parse_immediate(operands[2], span)?,
                    }
                } else if let Some(&op) = BranchOp::ALL.iter().find(|op| op.mnemonic() == mnemonic)
                {
                    expect(3)?;
                    Instruction::Branch {
                        op,
                        rs1: self.register(operands[0], span)?,
                        rs2: self.register(operands[1], span)?,
                        target: operands[2].to_string(),
                    }
                } else if let Some(width) = memory_width(mnemonic, 'l') {
                    expect(2)?;
                    let rd = self.register(operands[0], span)?;
                    if operands[1].contains('(') {
                        let (offset, base) = self.address(operands[1], span)?;
                        Instruction::Load {
                            width,
                            rd,
                            base,
                            offset,
                        }
                    } else {
                        Instruction::LoadSymbol {
                            width,
                            rd,
                            symbol: operands[1].to_string(),
                        }
                    }
                } else if let Some(width) = memory_width(mnemonic, 's') {
                    let rs = operands
                        .first()
                        .map(|operand| self.register(operand, span))
                        .transpose()?;
                    match (rs, operands.len()) {
                        (Some(rs), 2) => {
                            let (offset, base) = self.address(operands[1], span)?;
                            Instruction::Store {
                                width,
                                rs,
                                base,
                                offset,
                            }
                        }
                        (Some(rs), 3) => Instruction::StoreSymbol {
                            width,
                            rs,
                            scratch: self.register(operands[2], span)?,
                            symbol: operands[1].to_string(),
                        },
                        _ => {
                            return Err(ParseError::new(
                                span,
                                ParseErrorKind::OperandCount {
                                    expected: 2,
                                    got: operands.len(),
                                },
                            ))
                        }
                    }
                } else {
                    return Err(ParseError::new(
                        span,
                        ParseErrorKind::UnknownInstruction(mnemonic.to_string()),
                    ));
                }
            }
        };
        Ok(instruction)
    }

    // call name(arg, arg)
    fn parse_call(&mut self, rest: &str, span: Span) -> Result<Instruction, ParseError> {
        let unexpected = || ParseError::new(span, ParseErrorKind::Unexpected(rest.to_string()));
        let (callee, arguments) = rest.split_once('(').ok_or_else(unexpected)?;
        let arguments = arguments.trim_end().strip_suffix(')').ok_or_else(unexpected)?;
        let arguments = arguments
            .split(',')
            .map(str::trim)
            .filter(|argument| !argument.is_empty())
            .map(|argument| self.register(argument, span))
            .collect::<Result<_, _>>()?;
        let clobbers = self
            .catalog
            .caller_saved()
            .iter()
            .map(|&reg| Register::Physical(reg))
            .collect();
        Ok(Instruction::Call {
            callee: callee.trim().to_string(),
            arguments,
            clobbers,
        })
    }

    fn register(&mut self, name: &str, span: Span) -> Result<Register, ParseError> {
        if let Some(number) = name.strip_prefix('%') {
            let vreg = number
                .parse()
                .map(VirtualRegister)
                .map_err(|_| ParseError::new(span, ParseErrorKind::UnknownRegister(name.to_string())))?;
            if let Some((function, _)) = &mut self.function {
                if vreg.0 >= function.vreg_count() {
                    function.reserve_vreg(vreg, 4);
                }
            }
            return Ok(Register::Virtual(vreg));
        }
        self.catalog
            .find(name)
            .map(Register::Physical)
            .ok_or_else(|| ParseError::new(span, ParseErrorKind::UnknownRegister(name.to_string())))
    }

    // offset(base)
    fn address(&mut self, operand: &str, span: Span) -> Result<(i32, Register), ParseError> {
        let invalid = || ParseError::new(span, ParseErrorKind::InvalidAddress(operand.to_string()));
        let (offset, base) = operand.split_once('(').ok_or_else(invalid)?;
        let base = base.strip_suffix(')').ok_or_else(invalid)?.trim();
        let offset = offset.trim();
        let offset = if offset.is_empty() {
            0
        } else {
            parse_immediate(offset, span)?
        };
        Ok((offset, self.register(base, span)?))
    }
}

fn memory_width(mnemonic: &str, kind: char) -> Option<Width> {
    let mut chars = mnemonic.chars();
    if chars.next() != Some(kind) {
        return None;
    }
    let width = match chars.next()? {
        'b' => Width::Byte,
        'h' => Width::Half,
        'w' => Width::Word,
        _ => return None,
    };
    match chars.next() {
        None => Some(width),
        Some(_) => None,
    }
}

fn parse_immediate(text: &str, span: Span) -> Result<i32, ParseError> {
    let invalid = || ParseError::new(span, ParseErrorKind::InvalidImmediate(text.to_string()));
    let (negative, digits) = match text.strip_prefix('-') {
        Some(digits) => (true, digits),
        None => (false, text),
    };
    let value = match digits.strip_prefix("0x") {
        Some(hex) => i64::from_str_radix(hex, 16).map_err(|_| invalid())?,
        None => digits.parse::<i64>().map_err(|_| invalid())?,
    };
    let value = if negative { -value } else { value };
    i32::try_from(value).map_err(|_| invalid())
}
