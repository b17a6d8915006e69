//! ICWS '88/'94 loadfile parser.
//!
//! One statement per line: an instruction, `ORG n`, `END [n]`, `PIN n`, a
//! comment, or a blank. Comments run from `;` to end of line; a `;name`
//! comment carries the warrior's display name. Parsing is case-insensitive
//! and whitespace-permissive; numeric literals must fit in signed 64 bits
//! and are reduced modulo the core size later, by the loader.

use thiserror::Error;

use crate::insn::{default_modifier, AddrMode, Field, Instruction, Modifier, Opcode};
use crate::warrior::{Warrior, WarriorError};

/// Loadfile dialect selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Dialect {
    /// ICWS '94 loadfiles: every instruction carries a modifier.
    #[default]
    Icws94,
    /// ICWS '88 loadfiles: modifiers are omitted and inferred from the
    /// opcode and addressing modes via the '94 translation table.
    Icws88,
}

/// Parser configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ParseOptions {
    /// Loadfile dialect.
    pub dialect: Dialect,
    /// Reject trailing statements after `END` instead of ignoring them.
    pub strict: bool,
    /// Maximum number of instructions accepted before
    /// [`ParseErrorKind::TooManyInstructions`] is raised.
    pub max_instructions: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            dialect: Dialect::Icws94,
            strict: false,
            max_instructions: 100,
        }
    }
}

impl ParseOptions {
    /// '88-dialect options with the given instruction cap.
    #[must_use]
    pub const fn icws88(max_instructions: usize) -> Self {
        Self {
            dialect: Dialect::Icws88,
            strict: false,
            max_instructions,
        }
    }
}

/// Machine-readable parse failure kinds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ParseErrorKind {
    /// Token in mnemonic position is not an opcode.
    #[error("unknown opcode: {0}")]
    UnknownOpcode(String),
    /// Token after `.` is not a modifier.
    #[error("unknown modifier: {0}")]
    UnknownModifier(String),
    /// '94 instruction without a `.MOD` suffix.
    #[error("missing modifier")]
    MissingModifier,
    /// Operand begins with a character that is neither a sigil nor a number.
    #[error("unknown addressing mode: {0}")]
    UnknownMode(char),
    /// Numeric literal missing or outside signed 64-bit range.
    #[error("bad number: {0}")]
    BadNumber(String),
    /// Operands must be separated by a comma.
    #[error("missing comma between operands")]
    MissingComma,
    /// Text remains after a complete statement.
    #[error("unexpected token: {0}")]
    UnexpectedToken(String),
    /// Instruction count exceeded the configured cap.
    #[error("too many instructions (limit {0})")]
    TooManyInstructions(usize),
    /// Second `END` statement (strict mode only).
    #[error("multiple END statements")]
    MultipleEnd,
    /// Statement ended before its operands were complete.
    #[error("unexpected end of statement")]
    UnexpectedEof,
    /// Effective start offset does not address an instruction.
    #[error("start offset {start} is outside the code (length {len})")]
    StartOutOfRange {
        /// Offending start offset.
        start: i64,
        /// Number of instructions parsed.
        len: usize,
    },
}

/// A parse failure with its source location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[error("{line}:{column}: {kind}")]
pub struct ParseError {
    /// 1-indexed source line.
    pub line: usize,
    /// 1-indexed source column.
    pub column: usize,
    /// Failure classification.
    pub kind: ParseErrorKind,
}

impl ParseError {
    const fn new(line: usize, column: usize, kind: ParseErrorKind) -> Self {
        Self { line, column, kind }
    }
}

/// Parses a loadfile into a warrior.
///
/// # Errors
///
/// Returns a [`ParseError`] carrying the line, column, and kind of the
/// first failure.
pub fn parse_warrior(source: &str, options: &ParseOptions) -> Result<Warrior, ParseError> {
    Parser::new(options).run(source)
}

/// Parses a loadfile from raw bytes, replacing invalid UTF-8.
///
/// Legacy warriors occasionally carry non-UTF-8 bytes in comments; those
/// are replaced rather than rejected. Replacement never alters the ASCII
/// statement text the grammar cares about.
///
/// # Errors
///
/// Returns a [`ParseError`] exactly as [`parse_warrior`] does.
pub fn parse_warrior_bytes(source: &[u8], options: &ParseOptions) -> Result<Warrior, ParseError> {
    parse_warrior(&String::from_utf8_lossy(source), options)
}

struct Parser<'o> {
    options: &'o ParseOptions,
    code: Vec<Instruction>,
    name: Option<String>,
    pin: Option<i64>,
    start: Option<i64>,
    // Location of the statement that set `start`, for range errors.
    start_loc: (usize, usize),
    end_seen: bool,
}

enum Statement {
    Nothing,
    Org(Field),
    End(Option<Field>),
    Pin(Field),
    Instruction(Instruction),
}

impl<'o> Parser<'o> {
    fn new(options: &'o ParseOptions) -> Self {
        Self {
            options,
            code: Vec::new(),
            name: None,
            pin: None,
            start: None,
            start_loc: (1, 1),
            end_seen: false,
        }
    }

    fn run(mut self, source: &str) -> Result<Warrior, ParseError> {
        for (idx, raw_line) in source.lines().enumerate() {
            let line_no = idx + 1;
            if self.end_seen && !self.options.strict {
                continue;
            }

            let (content, comment) = split_comment(raw_line);
            if let Some(name) = comment.and_then(name_metadata) {
                self.name = Some(name.to_string());
            }

            let mut cursor = Cursor::new(content, line_no);
            cursor.skip_ws();
            let statement = self.parse_statement(&mut cursor)?;

            if self.end_seen {
                // Strict mode: only blanks and comments may follow END.
                match statement {
                    Statement::Nothing => {}
                    Statement::End(_) => {
                        return Err(ParseError::new(line_no, 1, ParseErrorKind::MultipleEnd));
                    }
                    _ => {
                        return Err(ParseError::new(
                            line_no,
                            1,
                            ParseErrorKind::UnexpectedToken(content.trim().to_string()),
                        ));
                    }
                }
                continue;
            }

            match statement {
                Statement::Nothing => {}
                Statement::Org(value) => {
                    self.start = Some(value);
                    self.start_loc = (line_no, 1);
                }
                Statement::End(value) => {
                    if let Some(value) = value {
                        self.start = Some(value);
                        self.start_loc = (line_no, 1);
                    }
                    self.end_seen = true;
                }
                Statement::Pin(value) => self.pin = Some(value),
                Statement::Instruction(insn) => {
                    if self.code.len() == self.options.max_instructions {
                        return Err(ParseError::new(
                            line_no,
                            1,
                            ParseErrorKind::TooManyInstructions(self.options.max_instructions),
                        ));
                    }
                    self.code.push(insn);
                }
            }
        }

        self.finish()
    }

    fn finish(self) -> Result<Warrior, ParseError> {
        let start = self.start.unwrap_or(0);
        let (line, column) = self.start_loc;
        let len = self.code.len();
        let start_usize = usize::try_from(start).map_err(|_| {
            ParseError::new(line, column, ParseErrorKind::StartOutOfRange { start, len })
        })?;

        let mut warrior = Warrior::new(self.code, start_usize).map_err(
            |WarriorError::StartOutOfRange { .. }| {
                ParseError::new(line, column, ParseErrorKind::StartOutOfRange { start, len })
            },
        )?;
        if let Some(name) = self.name {
            warrior = warrior.with_name(name);
        }
        if let Some(pin) = self.pin {
            warrior = warrior.with_pin(pin);
        }
        Ok(warrior)
    }

    fn parse_statement(&self, cursor: &mut Cursor<'_>) -> Result<Statement, ParseError> {
        if cursor.done() {
            return Ok(Statement::Nothing);
        }

        let word_column = cursor.column();
        let word = cursor.take_word();
        let upper = word.to_ascii_uppercase();
        let statement = match upper.as_str() {
            "ORG" => Statement::Org(cursor.expect_number()?),
            "END" => {
                cursor.skip_ws();
                if cursor.done() {
                    Statement::End(None)
                } else {
                    Statement::End(Some(cursor.expect_number()?))
                }
            }
            "PIN" => Statement::Pin(cursor.expect_number()?),
            _ => Statement::Instruction(self.parse_instruction(word, word_column, cursor)?),
        };

        cursor.skip_ws();
        if !cursor.done() {
            let column = cursor.column();
            let rest = cursor.take_word_or_char();
            return Err(cursor.error_at(column, ParseErrorKind::UnexpectedToken(rest)));
        }
        Ok(statement)
    }

    fn parse_instruction(
        &self,
        word: &str,
        word_column: usize,
        cursor: &mut Cursor<'_>,
    ) -> Result<Instruction, ParseError> {
        let (op_token, modifier_token) = match word.split_once('.') {
            Some((op, modifier)) => (op, Some(modifier)),
            None => (word, None),
        };

        let opcode = Opcode::from_mnemonic(op_token).ok_or_else(|| {
            cursor.error_at(word_column, ParseErrorKind::UnknownOpcode(op_token.to_string()))
        })?;

        let modifier = match modifier_token {
            Some(token) => Some(Modifier::from_token(token).ok_or_else(|| {
                cursor.error_at(
                    word_column + op_token.len() + 1,
                    ParseErrorKind::UnknownModifier(token.to_string()),
                )
            })?),
            None => None,
        };

        if modifier.is_none() && self.options.dialect == Dialect::Icws94 {
            return Err(cursor.error_at(word_column, ParseErrorKind::MissingModifier));
        }

        let (a_mode, a_field) = cursor.expect_operand()?;

        cursor.skip_ws();
        if cursor.done() {
            return Err(cursor.error_at(cursor.column(), ParseErrorKind::UnexpectedEof));
        }
        if !cursor.eat(',') {
            return Err(cursor.error_at(cursor.column(), ParseErrorKind::MissingComma));
        }

        let (b_mode, b_field) = cursor.expect_operand()?;

        let modifier = modifier.unwrap_or_else(|| default_modifier(opcode, a_mode, b_mode));
        Ok(Instruction::new(opcode, modifier, a_mode, a_field, b_mode, b_field))
    }
}

/// Splits a raw line into statement content and the comment text after `;`.
fn split_comment(line: &str) -> (&str, Option<&str>) {
    match line.find(';') {
        Some(pos) => (&line[..pos], Some(&line[pos + 1..])),
        None => (line, None),
    }
}

/// Extracts the warrior name from a `;name <text>` comment.
fn name_metadata(comment: &str) -> Option<&str> {
    let trimmed = comment.trim_start();
    let rest = trimmed
        .strip_prefix("name")
        .or_else(|| trimmed.strip_prefix("NAME"))
        .or_else(|| trimmed.strip_prefix("Name"))?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let name = rest.trim();
    (!name.is_empty()).then_some(name)
}

/// Character cursor over one statement, tracking 1-indexed columns.
struct Cursor<'a> {
    text: &'a str,
    line: usize,
    pos: usize,
}

impl<'a> Cursor<'a> {
    const fn new(text: &'a str, line: usize) -> Self {
        Self { text, line, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn done(&self) -> bool {
        self.rest().is_empty()
    }

    const fn column(&self) -> usize {
        self.pos + 1
    }

    fn error_at(&self, column: usize, kind: ParseErrorKind) -> ParseError {
        ParseError::new(self.line, column, kind)
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            return true;
        }
        false
    }

    /// Takes a run of mnemonic characters (letters, digits, `.`, `_`).
    fn take_word(&mut self) -> &'a str {
        let begin = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_')
        {
            self.advance();
        }
        &self.text[begin..self.pos]
    }

    /// Takes a word, or failing that a single character, for error reports.
    fn take_word_or_char(&mut self) -> String {
        let word = self.take_word();
        if word.is_empty() {
            let c = self.peek().unwrap_or(' ');
            self.advance();
            c.to_string()
        } else {
            word.to_string()
        }
    }

    /// Parses `<mode-sigil?><signed-int>`. A missing sigil means direct mode.
    fn expect_operand(&mut self) -> Result<(AddrMode, Field), ParseError> {
        self.skip_ws();
        let Some(first) = self.peek() else {
            return Err(self.error_at(self.column(), ParseErrorKind::UnexpectedEof));
        };

        let mode = if let Some(mode) = AddrMode::from_sigil(first) {
            self.advance();
            mode
        } else if first == '+' || first == '-' || first.is_ascii_digit() {
            AddrMode::Direct
        } else {
            return Err(self.error_at(self.column(), ParseErrorKind::UnknownMode(first)));
        };

        let value = self.expect_number()?;
        Ok((mode, value))
    }

    /// Parses a signed 64-bit decimal literal.
    fn expect_number(&mut self) -> Result<Field, ParseError> {
        self.skip_ws();
        let begin = self.pos;
        let column = self.column();

        if matches!(self.peek(), Some('+' | '-')) {
            self.advance();
        }
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }

        let token = &self.text[begin..self.pos];
        if token.is_empty() || token == "+" || token == "-" {
            if self.done() {
                return Err(self.error_at(column, ParseErrorKind::UnexpectedEof));
            }
            let bad = self.take_word_or_char();
            return Err(self.error_at(column, ParseErrorKind::BadNumber(bad)));
        }
        token
            .parse::<Field>()
            .map_err(|_| self.error_at(column, ParseErrorKind::BadNumber(token.to_string())))
    }
}
