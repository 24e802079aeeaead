use mlarch::inst::enc_format;
use mlarch::{Field, Image, OpCode};
use tracing::debug;

use crate::error::Error;
use crate::expr::{self, Term};
use crate::symbol::{Action, Symbols};

// ----------------------------------------------------------------------------
// Instruction record

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum State {
    #[default]
    None,
    Code,
    Data,
}

/// Instruction waiting for its symbols. Operands are only ever added into
/// the fields, and the fields are truncated when the word is packed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insn {
    pub position: usize,
    pub opcode: OpCode,
    pub maddr: i64,
    pub caddr: i64,
    pub line: usize,
}

impl Insn {
    fn field_mut(&mut self, field: Field) -> &mut i64 {
        match field {
            Field::Maddr => &mut self.maddr,
            Field::Caddr => &mut self.caddr,
        }
    }

    fn add(&mut self, field: Field, value: i64) {
        let slot = self.field_mut(field);
        *slot = slot.wrapping_add(value);
    }

    pub fn encode(&self) -> u32 {
        enc_format(self.opcode.into(), self.maddr as u32, self.caddr as u32)
    }
}

/// Word emitted by a source line. `insn` is set for instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Row {
    pub line: usize,
    pub addr: usize,
    pub insn: Option<usize>,
}

// ----------------------------------------------------------------------------
// Assembler

#[derive(Debug, Default)]
pub struct Assembler {
    state: State,
    cursor: usize,
    insns: Vec<Insn>,
    symbols: Symbols,
    image: Image,
    rows: Vec<Row>,
}

/// Result of a successful assembly.
#[derive(Debug)]
pub struct Program {
    pub image: Image,
    pub symbols: Symbols,
    pub insns: Vec<Insn>,
    pub rows: Vec<Row>,
}

impl Program {
    /// Assemble a whole listing. Errors carry the 1-based line.
    pub fn assemble(listing: &str) -> Result<Program, Error> {
        let mut asm = Assembler::new();
        for (idx, text) in listing.lines().enumerate() {
            asm.parse_line(idx + 1, text).map_err(|e| e.at(idx + 1))?;
        }
        asm.finish()
    }
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn parse_line(&mut self, line: usize, text: &str) -> Result<(), Error> {
        let text = text.trim_start();
        if text.is_empty() || text.starts_with("//") || text.starts_with('#') {
            return Ok(());
        }

        let (cmd, rest) = text
            .split_once(|c: char| c.is_ascii_whitespace())
            .unwrap_or((text, ""));
        let split_ws = self.state() == State::Data || cmd.starts_with('.');
        let args: Vec<String> = if split_ws {
            rest.split_ascii_whitespace().map(str::to_string).collect()
        } else {
            rest.split(',')
                .map(|arg| {
                    arg.chars()
                        .filter(|c| !c.is_ascii_whitespace())
                        .collect::<String>()
                })
                .filter(|arg| !arg.is_empty())
                .collect()
        };

        match cmd {
            ".sym" => self.define_sym(line, &args),
            ".code" => self.section(State::Code, &args),
            ".data" => self.section(State::Data, &args),
            _ if cmd.starts_with('.') => {
                Err(Error::SyntaxError(format!("Unknown directive `{}`", cmd)))
            }
            _ if cmd.len() > 1 && cmd.ends_with(':') && args.is_empty() => {
                let name = &cmd[..cmd.len() - 1];
                debug!("label `{}` at 0x{:05x}", name, self.cursor);
                self.symbols.define(name, self.cursor as i64, line)
            }
            _ => match self.state() {
                State::Code => self.code(line, cmd, &args),
                State::Data => self.data(line, cmd, &args),
                State::None => Err(Error::SyntaxError(format!(
                    "`{}` outside of a .code or .data section",
                    cmd
                ))),
            },
        }
    }

    fn define_sym(&mut self, line: usize, args: &[String]) -> Result<(), Error> {
        let [name, value] = args else {
            return Err(Error::SyntaxError(
                "`.sym` takes a name and a value".to_string(),
            ));
        };
        let value = expr::parse_int(value)
            .ok_or_else(|| Error::SyntaxError(format!("Cannot parse `{}` as integer", value)))?;
        self.symbols.define(name, value, line)
    }

    fn section(&mut self, state: State, args: &[String]) -> Result<(), Error> {
        match args {
            [] => {}
            [addr] => {
                let addr = expr::parse_int(addr).ok_or_else(|| {
                    Error::SyntaxError(format!("Cannot parse `{}` as address", addr))
                })?;
                if addr < self.cursor as i64 {
                    return Err(Error::Backward(self.cursor, addr));
                }
                if addr % 4 != 0 {
                    return Err(Error::Misaligned(addr));
                }
                self.cursor = addr as usize;
            }
            _ => {
                return Err(Error::SyntaxError(
                    "Section directive takes at most one address".to_string(),
                ))
            }
        }
        debug!("{:?} section at 0x{:05x}", state, self.cursor);
        self.state = state;
        Ok(())
    }

    fn code(&mut self, line: usize, cmd: &str, args: &[String]) -> Result<(), Error> {
        let opcode =
            OpCode::parse(cmd).ok_or_else(|| Error::UnknownOperation(cmd.to_string()))?;
        let fields = opcode.format().fields();
        if fields.len() != args.len() {
            return Err(Error::Arity(opcode, fields.len(), args.len()));
        }

        let idx = self.insns.len();
        let mut insn = Insn {
            position: self.cursor,
            opcode,
            maddr: 0,
            caddr: 0,
            line,
        };
        for (arg, &field) in args.iter().zip(fields) {
            for term in expr::parse(arg) {
                match term {
                    Term::Literal(value) => insn.add(field, value),
                    Term::Symbol {
                        name,
                        factor,
                        divisor,
                    } => self.symbols.reference(
                        &name,
                        Action {
                            insn: idx,
                            field,
                            factor,
                            divisor,
                            line,
                        },
                    ),
                }
            }
        }
        self.insns.push(insn);
        self.rows.push(Row {
            line,
            addr: self.cursor,
            insn: Some(idx),
        });
        self.cursor += 4;
        Ok(())
    }

    fn data(&mut self, line: usize, cmd: &str, args: &[String]) -> Result<(), Error> {
        let tokens: Vec<&str> = std::iter::once(cmd)
            .chain(args.iter().map(String::as_str))
            .collect();
        if tokens.len() % 4 != 0 {
            return Err(Error::DataRow(tokens.len()));
        }
        let bytes = tokens
            .iter()
            .map(|tok| {
                expr::parse_int(tok)
                    .and_then(|v| u8::try_from(v).ok())
                    .ok_or_else(|| Error::ByteLiteral(tok.to_string()))
            })
            .collect::<Result<Vec<u8>, Error>>()?;
        for word in bytes.chunks_exact(4) {
            let word = u32::from_le_bytes([word[0], word[1], word[2], word[3]]);
            self.image.write_word(self.cursor, word)?;
            self.rows.push(Row {
                line,
                addr: self.cursor,
                insn: None,
            });
            self.cursor += 4;
        }
        Ok(())
    }

    /// Second pass: apply relocations and write the instruction words.
    pub fn finish(mut self) -> Result<Program, Error> {
        for (name, sym) in self.symbols.iter() {
            let Some(position) = sym.position else {
                let line = sym.actions.first().map_or(0, |a| a.line);
                return Err(Error::UndefinedSymbol(name.clone()).at(line));
            };
            debug!(
                "{} = 0x{:05x} ({} references)",
                name,
                position,
                sym.actions.len()
            );
            for action in &sym.actions {
                let value = position.wrapping_mul(action.factor);
                let quotient = match value.checked_rem(action.divisor) {
                    Some(0) => value.checked_div(action.divisor),
                    _ => None,
                };
                let Some(quotient) = quotient else {
                    return Err(
                        Error::NotMultiple(name.clone(), value, action.divisor).at(action.line)
                    );
                };
                self.insns[action.insn].add(action.field, quotient);
            }
        }

        for insn in &self.insns {
            self.image
                .write_word(insn.position, insn.encode())
                .map_err(|e| Error::from(e).at(insn.line))?;
        }
        debug!(
            "{} instructions, {} symbols, image ends at 0x{:05x}",
            self.insns.len(),
            self.symbols.len(),
            self.image.defined_end()
        );

        Ok(Program {
            image: self.image,
            symbols: self.symbols,
            insns: self.insns,
            rows: self.rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(image: &Image, addr: u32) -> u32 {
        image.word(addr)
    }

    #[test]
    fn states() {
        let mut asm = Assembler::new();
        assert_eq!(asm.state(), State::None);
        asm.parse_line(1, "// comment").unwrap();
        asm.parse_line(2, "   # also a comment").unwrap();
        asm.parse_line(3, "").unwrap();
        assert!(matches!(
            asm.parse_line(4, "Sync"),
            Err(Error::SyntaxError(_))
        ));
        asm.parse_line(5, ".data 0x10").unwrap();
        assert_eq!(asm.state(), State::Data);
        assert_eq!(asm.cursor(), 0x10);
        asm.parse_line(6, ".code").unwrap();
        assert_eq!(asm.state(), State::Code);
        assert_eq!(asm.cursor(), 0x10);
    }

    #[test]
    fn operand_tokens() {
        let mut asm = Assembler::new();
        asm.parse_line(1, ".code").unwrap();
        asm.parse_line(2, "\tMACC  0x2 00 , 3").unwrap();
        asm.parse_line(3, "Store 0x10,,1").unwrap();
        let program = asm.finish().unwrap();
        assert_eq!(program.insns[0].maddr, 0x200);
        assert_eq!(program.insns[0].caddr, 3);
        assert_eq!(program.insns[1].maddr, 0x10);
        assert_eq!(program.insns[1].caddr, 1);
    }

    #[test]
    fn arity_and_mnemonic() {
        let mut asm = Assembler::new();
        asm.parse_line(1, ".code").unwrap();
        assert!(matches!(
            asm.parse_line(2, "Return 0"),
            Err(Error::Arity(OpCode::Return, 0, 1))
        ));
        assert!(matches!(
            asm.parse_line(3, "MACC 0x200"),
            Err(Error::Arity(OpCode::MACC, 2, 1))
        ));
        assert!(matches!(
            asm.parse_line(4, "Halt"),
            Err(Error::UnknownOperation(op)) if op == "Halt"
        ));
        assert_eq!(asm.cursor(), 0);
    }

    #[test]
    fn directives() {
        let mut asm = Assembler::new();
        assert!(matches!(
            asm.parse_line(1, ".sym A"),
            Err(Error::SyntaxError(_))
        ));
        assert!(matches!(
            asm.parse_line(2, ".sym A 1 2"),
            Err(Error::SyntaxError(_))
        ));
        asm.parse_line(3, ".sym A 0x40").unwrap();
        assert!(matches!(
            asm.parse_line(4, ".sym A 1"),
            Err(Error::RedefinedSymbol(_, 3))
        ));
        assert!(matches!(
            asm.parse_line(5, ".code 1 2"),
            Err(Error::SyntaxError(_))
        ));
        assert!(matches!(
            asm.parse_line(6, ".code 6"),
            Err(Error::Misaligned(6))
        ));
        assert!(matches!(
            asm.parse_line(7, ".text"),
            Err(Error::SyntaxError(_))
        ));
    }

    #[test]
    fn data_rows() {
        let mut asm = Assembler::new();
        asm.parse_line(1, ".data 8").unwrap();
        asm.parse_line(2, "1 2 3 4 0x05 006 7 255").unwrap();
        assert!(matches!(
            asm.parse_line(3, "1 2 3"),
            Err(Error::DataRow(3))
        ));
        assert!(matches!(
            asm.parse_line(4, "1 2 3 256"),
            Err(Error::ByteLiteral(b)) if b == "256"
        ));
        assert!(matches!(
            asm.parse_line(5, "1 2 3 -1"),
            Err(Error::ByteLiteral(_))
        ));
        let program = asm.finish().unwrap();
        assert_eq!(word(&program.image, 8), 0x0403_0201);
        assert_eq!(word(&program.image, 12), 0xff07_0605);
        assert_eq!(program.image.defined_end(), 16);
    }

    #[test]
    fn fields_wrap_when_packed() {
        let insn = Insn {
            position: 0,
            opcode: OpCode::AddVBP,
            maddr: -8,
            caddr: 0,
            line: 1,
        };
        assert_eq!(insn.encode() >> 15, 0x1fff8);
    }
}
