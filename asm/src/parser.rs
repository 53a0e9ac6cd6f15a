use std::str::FromStr;

use indexmap::IndexMap;

use arch::image::{Image, DEFAULT_STACK_SIZE};
use arch::op::{Opcode, REP_PREFIX};
use arch::reg::{Reg16, Reg8};
use arch::tag::OperandTag;

use crate::cp437;
use crate::error::ParseError;
use crate::expr;
use crate::lexer;
use crate::token::{Token, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Code,
    Data,
    Stack,
}

#[derive(Debug, Clone, Copy)]
struct LabelDef {
    #[allow(dead_code)]
    seg: Segment,
    offset: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    Size,
    Emit,
}

/// Two-pass assembler. Pass 1 walks the token stream predicting instruction
/// sizes and recording per-segment label offsets; pass 2 rewalks it emitting
/// bytes, resolving label references against the recorded offsets. Both
/// passes scan operands through the same routine, so a predicted size can
/// only diverge from emission if the label table itself is inconsistent —
/// which pass 2 checks at every label definition.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    pass: Pass,
    seg: Segment,
    labels: IndexMap<String, LabelDef>,
    code: Vec<u8>,
    data: Vec<u8>,
    code_offset: u16,
    data_offset: u16,
    stack_size: u16,
}

/// Operand as written in the source; sized in pass 1, encoded in pass 2.
#[derive(Debug, Clone)]
enum RawOperand {
    Reg16(Reg16),
    Reg8(Reg8),
    Imm(u16),
    LabelRef { name: String, line: usize },
    Mem(u16),
    MemReg { reg: Reg16, disp: u16 },
}

impl RawOperand {
    /// Encoded size in bytes, type tag included. Immediates from numeric
    /// literals narrow to one byte when they fit; label references always
    /// reserve 16 bits because pass 1 cannot know forward offsets.
    fn size(&self) -> u16 {
        match self {
            RawOperand::Reg16(_) | RawOperand::Reg8(_) => 2,
            RawOperand::Imm(v) => {
                if *v <= 0xFF {
                    2
                } else {
                    3
                }
            }
            RawOperand::LabelRef { .. } => 3,
            RawOperand::Mem(_) => 3,
            RawOperand::MemReg { .. } => 4,
        }
    }
}

impl Parser {
    pub fn parse(tokens: Vec<Token>) -> Result<Image, ParseError> {
        let mut parser = Parser {
            tokens,
            pos: 0,
            pass: Pass::Size,
            seg: Segment::Code,
            labels: IndexMap::new(),
            code: Vec::new(),
            data: Vec::new(),
            code_offset: 0,
            data_offset: 0,
            stack_size: DEFAULT_STACK_SIZE,
        };

        parser.walk()?;

        parser.pos = 0;
        parser.pass = Pass::Emit;
        parser.seg = Segment::Code;
        parser.code_offset = 0;
        parser.data_offset = 0;
        parser.walk()?;

        Ok(Image {
            code: parser.code,
            data: parser.data,
            stack_size: parser.stack_size,
        })
    }

    fn walk(&mut self) -> Result<(), ParseError> {
        while !self.at_end() {
            let token = self.current().clone();
            match token.kind {
                TokenKind::Label => {
                    if self.peek_kind() == TokenKind::Colon {
                        self.define_label(&token)?;
                        self.advance();
                        self.advance();
                    } else if self.peek_kind() == TokenKind::Instruction {
                        // Label on the same line as its instruction.
                        self.define_label(&token)?;
                        self.advance();
                    } else {
                        self.advance();
                    }
                }
                TokenKind::Directive => self.directive(&token)?,
                TokenKind::Instruction => self.statement(&token)?,
                TokenKind::Newline | TokenKind::Comment => self.advance(),
                TokenKind::Eof => break,
                _ => {
                    if self.pass == Pass::Emit {
                        return Err(ParseError::UnexpectedToken {
                            text: token.text,
                            line: token.line,
                        });
                    }
                    self.advance();
                }
            }
        }
        Ok(())
    }

    fn define_label(&mut self, token: &Token) -> Result<(), ParseError> {
        let name = token.text.to_uppercase();
        let offset = self.current_offset();
        match self.pass {
            Pass::Size => {
                self.labels.insert(
                    name,
                    LabelDef {
                        seg: self.seg,
                        offset,
                    },
                );
            }
            Pass::Emit => {
                // The invariant of the two-pass scheme: the address predicted
                // in pass 1 is where pass 2 actually lands.
                if let Some(def) = self.labels.get(&name) {
                    if def.offset != offset {
                        return Err(ParseError::SizingMismatch {
                            label: token.text.clone(),
                            predicted: def.offset,
                            emitted: offset,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn directive(&mut self, token: &Token) -> Result<(), ParseError> {
        match token.text.to_uppercase().as_str() {
            ".CODE" => self.seg = Segment::Code,
            ".DATA" => self.seg = Segment::Data,
            ".STACK" => self.seg = Segment::Stack,
            _ => {
                return Err(ParseError::UnknownDirective {
                    name: token.text.clone(),
                    line: token.line,
                })
            }
        }
        self.advance();
        Ok(())
    }

    fn statement(&mut self, token: &Token) -> Result<(), ParseError> {
        let mut name = token.text.to_uppercase();
        let mut line = token.line;
        self.advance();

        if self.seg == Segment::Stack {
            return Err(ParseError::StackSegment(line));
        }

        let mut rep = false;
        if name == "REP" {
            rep = true;
            let next = self.current().clone();
            if next.kind != TokenKind::Instruction {
                return Err(ParseError::UnexpectedToken {
                    text: next.text,
                    line: next.line,
                });
            }
            name = next.text.to_uppercase();
            line = next.line;
            self.advance();
        }

        if !rep {
            match name.as_str() {
                "DB" => return self.data_directive(1),
                "DW" => return self.data_directive(2),
                "DD" => return self.data_directive(4),
                _ => {}
            }
        }

        let opcode =
            Opcode::from_str(&name).map_err(|_| ParseError::UnknownInstruction {
                name: name.clone(),
                line,
            })?;

        let mut operands = Vec::new();
        while !self.line_end() {
            if self.current().kind == TokenKind::Comma {
                self.advance();
                continue;
            }
            operands.push(self.operand()?);
        }

        if operands.len() != opcode.operand_count() {
            return Err(ParseError::OperandCount {
                name,
                expected: opcode.operand_count(),
                got: operands.len(),
                line,
            });
        }

        match self.pass {
            Pass::Size => {
                let size = 1
                    + rep as u16
                    + operands.iter().map(RawOperand::size).sum::<u16>();
                self.bump(size);
            }
            Pass::Emit => {
                if rep {
                    self.emit_byte(REP_PREFIX);
                }
                self.emit_byte(opcode.into());
                for op in &operands {
                    self.emit_operand(op)?;
                }
            }
        }
        Ok(())
    }

    fn operand(&mut self) -> Result<RawOperand, ParseError> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::Register => {
                self.advance();
                if let Ok(reg) = Reg8::from_str(&token.text) {
                    Ok(RawOperand::Reg8(reg))
                } else if let Ok(reg) = Reg16::from_str(&token.text) {
                    Ok(RawOperand::Reg16(reg))
                } else {
                    // IP and FLAGS lex as registers but have no operand code.
                    Err(ParseError::BadOperand {
                        text: token.text,
                        line: token.line,
                    })
                }
            }
            TokenKind::Number => {
                self.advance();
                let value =
                    lexer::parse_number(&token.text).map_err(|_| ParseError::InvalidNumber {
                        text: token.text.clone(),
                        line: token.line,
                    })?;
                Ok(RawOperand::Imm(value))
            }
            TokenKind::Label => {
                self.advance();
                Ok(RawOperand::LabelRef {
                    name: token.text.to_uppercase(),
                    line: token.line,
                })
            }
            TokenKind::Instruction
                if matches!(token.text.to_uppercase().as_str(), "BYTE" | "WORD" | "DWORD") =>
            {
                // Width annotation; the operand type tags already carry width.
                self.advance();
                self.operand()
            }
            TokenKind::LBracket => {
                self.advance();
                self.memory_operand(token.line)
            }
            _ => Err(ParseError::BadOperand {
                text: token.text,
                line: token.line,
            }),
        }
    }

    fn memory_operand(&mut self, line: usize) -> Result<RawOperand, ParseError> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::Register => {
                self.advance();
                let reg = Reg16::from_str(&token.text).map_err(|_| ParseError::BadOperand {
                    text: token.text.clone(),
                    line,
                })?;

                let mut disp = 0;
                if self.current().kind == TokenKind::Plus {
                    self.advance();
                    if self.current().kind == TokenKind::Number {
                        let text = self.current().text.clone();
                        disp = lexer::parse_number(&text).map_err(|_| {
                            ParseError::InvalidNumber {
                                text,
                                line,
                            }
                        })?;
                        self.advance();
                    }
                }

                self.expect_bracket(line)?;
                Ok(RawOperand::MemReg { reg, disp })
            }
            TokenKind::Number => {
                self.advance();
                let addr =
                    lexer::parse_number(&token.text).map_err(|_| ParseError::InvalidNumber {
                        text: token.text.clone(),
                        line,
                    })?;
                self.expect_bracket(line)?;
                Ok(RawOperand::Mem(addr))
            }
            _ => Err(ParseError::BadOperand {
                text: token.text,
                line,
            }),
        }
    }

    fn expect_bracket(&mut self, line: usize) -> Result<(), ParseError> {
        if self.current().kind != TokenKind::RBracket {
            return Err(ParseError::ExpectedBracket(line));
        }
        self.advance();
        Ok(())
    }

    fn emit_operand(&mut self, op: &RawOperand) -> Result<(), ParseError> {
        match op {
            RawOperand::Reg16(reg) => {
                self.emit_byte(OperandTag::Reg16.into());
                self.emit_byte(reg.code());
            }
            RawOperand::Reg8(reg) => {
                self.emit_byte(OperandTag::Reg8.into());
                self.emit_byte(reg.code());
            }
            RawOperand::Imm(value) => {
                if *value <= 0xFF {
                    self.emit_byte(OperandTag::Imm8.into());
                    self.emit_byte(*value as u8);
                } else {
                    self.emit_byte(OperandTag::Imm16.into());
                    self.emit_word(*value);
                }
            }
            RawOperand::LabelRef { name, line } => {
                let def = self
                    .labels
                    .get(name)
                    .ok_or_else(|| ParseError::UndefinedLabel {
                        name: name.clone(),
                        line: *line,
                    })?;
                let offset = def.offset;
                self.emit_byte(OperandTag::Imm16.into());
                self.emit_word(offset);
            }
            RawOperand::Mem(addr) => {
                self.emit_byte(OperandTag::Mem.into());
                self.emit_word(*addr);
            }
            RawOperand::MemReg { reg, disp } => {
                self.emit_byte(OperandTag::MemReg.into());
                self.emit_byte(reg.code());
                self.emit_word(*disp);
            }
        }
        Ok(())
    }

    /// DB/DW/DD: comma-separated string literals (DB only) and constant
    /// expressions. Item count and string lengths fix the size, so pass 1
    /// skips evaluation entirely.
    fn data_directive(&mut self, width: u16) -> Result<(), ParseError> {
        while !self.line_end() {
            let token = self.current().clone();
            match token.kind {
                TokenKind::Comma => self.advance(),
                TokenKind::Str => {
                    if width != 1 {
                        return Err(ParseError::BadOperand {
                            text: token.text,
                            line: token.line,
                        });
                    }
                    self.advance();
                    let unescaped = unescape(&token.text, token.line)?;
                    match self.pass {
                        Pass::Size => {
                            let count = unescaped.chars().count() as u16;
                            self.bump(count);
                        }
                        Pass::Emit => {
                            let bytes = cp437::encode_str(&unescaped).map_err(|ch| {
                                ParseError::Unrepresentable {
                                    ch,
                                    code: ch as u32,
                                }
                            })?;
                            for byte in bytes {
                                self.emit_byte(byte);
                            }
                        }
                    }
                }
                _ => {
                    let item_line = token.line;
                    let mut parts = Vec::new();
                    while !self.line_end() && self.current().kind != TokenKind::Comma {
                        parts.push(self.current().text.clone());
                        self.advance();
                    }
                    match self.pass {
                        Pass::Size => self.bump(width),
                        Pass::Emit => {
                            let value = expr::evaluate(&parts.join(" "), |name| {
                                self.labels.get(name).map(|def| def.offset)
                            })
                            .map_err(|source| ParseError::DataExpr {
                                line: item_line,
                                source,
                            })?;
                            match width {
                                1 => {
                                    if value > 0xFF {
                                        return Err(ParseError::OversizedByte {
                                            value,
                                            line: item_line,
                                        });
                                    }
                                    self.emit_byte(value as u8);
                                }
                                2 => self.emit_word(value),
                                _ => {
                                    self.emit_word(value);
                                    self.emit_word(0);
                                }
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Token stream helpers

    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> TokenKind {
        self.tokens
            .get(self.pos + 1)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::Eof)
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len() || self.current().kind == TokenKind::Eof
    }

    fn line_end(&self) -> bool {
        matches!(
            self.current().kind,
            TokenKind::Newline | TokenKind::Comment | TokenKind::Eof
        )
    }

    // ------------------------------------------------------------------
    // Segment emission helpers

    fn current_offset(&self) -> u16 {
        match self.pass {
            Pass::Size => match self.seg {
                Segment::Code => self.code_offset,
                Segment::Data => self.data_offset,
                Segment::Stack => 0,
            },
            Pass::Emit => match self.seg {
                Segment::Code => self.code.len() as u16,
                Segment::Data => self.data.len() as u16,
                Segment::Stack => 0,
            },
        }
    }

    fn bump(&mut self, n: u16) {
        match self.seg {
            Segment::Code => self.code_offset = self.code_offset.wrapping_add(n),
            Segment::Data => self.data_offset = self.data_offset.wrapping_add(n),
            Segment::Stack => {}
        }
    }

    fn emit_byte(&mut self, byte: u8) {
        match self.seg {
            Segment::Code => self.code.push(byte),
            Segment::Data => self.data.push(byte),
            Segment::Stack => {}
        }
    }

    fn emit_word(&mut self, word: u16) {
        self.emit_byte(word as u8);
        self.emit_byte((word >> 8) as u8);
    }
}

fn unescape(raw: &str, line: usize) -> Result<String, ParseError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some(other) => return Err(ParseError::InvalidEscape { ch: other, line }),
            None => return Err(ParseError::InvalidEscape { ch: '\\', line }),
        }
    }
    Ok(out)
}
