//! Redcode instruction model: opcodes, modifiers, addressing modes.

use core::fmt;

/// Raw operand field value.
///
/// Fields are signed 64-bit until a warrior is loaded into a core; the
/// loader reduces them modulo the core size, after which every in-core
/// field lies in `[0, core_size)`.
pub type Field = i64;

/// Redcode opcodes from ICWS '88/'94 plus the common pMARS extensions.
///
/// `CMP` is a synonym of `SEQ`; the loadfile parser normalizes the `CMP`
/// mnemonic to [`Opcode::Seq`], and the engine treats a `Cmp` value
/// identically to `Seq`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum Opcode {
    /// Terminator: removes the executing task from its queue.
    Dat = 0,
    /// Copies fields or whole instructions from the A-target to the B-target.
    Mov = 1,
    /// Adds A-values into the B-target.
    Add = 2,
    /// Subtracts A-values from B-values into the B-target.
    Sub = 3,
    /// Multiplies B-values by A-values into the B-target.
    Mul = 4,
    /// Divides B-values by A-values; a zero divisor kills the task.
    Div = 5,
    /// Remainder of B-values by A-values; a zero divisor kills the task.
    Mod = 6,
    /// Unconditional jump to the A-pointer.
    Jmp = 7,
    /// Jump to the A-pointer when the selected B-value is zero.
    Jmz = 8,
    /// Jump to the A-pointer when the selected B-value is non-zero.
    Jmn = 9,
    /// Decrement the B-target, then jump when the result is non-zero.
    Djn = 10,
    /// Queue the next instruction, then also queue the A-pointer.
    Spl = 11,
    /// Skip the next instruction when the A-value is less than the B-value.
    Slt = 12,
    /// Synonym of `Seq`, kept for '88 compatibility.
    Cmp = 13,
    /// Skip the next instruction when the compared values are equal.
    Seq = 14,
    /// Skip the next instruction when the compared values differ.
    Sne = 15,
    /// Queue the next instruction and nothing else.
    Nop = 16,
    /// Load a p-space cell into the B-target.
    Ldp = 17,
    /// Store an A-value into a p-space cell.
    Stp = 18,
}

/// Instruction modifier: selects which fields of the A- and B-instructions
/// participate in an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum Modifier {
    /// A-number to A-number.
    A = 0,
    /// B-number to B-number.
    B = 1,
    /// A-number to B-number.
    AB = 2,
    /// B-number to A-number.
    BA = 3,
    /// Both pairs, uncrossed.
    F = 4,
    /// Both pairs, crossed.
    X = 5,
    /// Entire instruction.
    I = 6,
}

/// Addressing mode applied to one operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum AddrMode {
    /// `#`: the operand is data; the pointer resolves to the instruction
    /// itself.
    Immediate = 0,
    /// `$`: offset from the program counter.
    Direct = 1,
    /// `*`: indirect through the A-number of the pointed-to instruction.
    IndirectA = 2,
    /// `@`: indirect through the B-number of the pointed-to instruction.
    IndirectB = 3,
    /// `{`: as `*`, with the A-number decremented before use.
    PredecA = 4,
    /// `<`: as `@`, with the B-number decremented before use.
    PredecB = 5,
    /// `}`: as `*`, with the A-number incremented after the cycle commits.
    PostincA = 6,
    /// `>`: as `@`, with the B-number incremented after the cycle commits.
    PostincB = 7,
}

impl Opcode {
    /// Every opcode, in stable encoding order.
    pub const ALL: [Self; 19] = [
        Self::Dat,
        Self::Mov,
        Self::Add,
        Self::Sub,
        Self::Mul,
        Self::Div,
        Self::Mod,
        Self::Jmp,
        Self::Jmz,
        Self::Jmn,
        Self::Djn,
        Self::Spl,
        Self::Slt,
        Self::Cmp,
        Self::Seq,
        Self::Sne,
        Self::Nop,
        Self::Ldp,
        Self::Stp,
    ];

    /// Stable low-byte encoding of this opcode.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Decodes the stable low-byte encoding back into an opcode.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Dat),
            1 => Some(Self::Mov),
            2 => Some(Self::Add),
            3 => Some(Self::Sub),
            4 => Some(Self::Mul),
            5 => Some(Self::Div),
            6 => Some(Self::Mod),
            7 => Some(Self::Jmp),
            8 => Some(Self::Jmz),
            9 => Some(Self::Jmn),
            10 => Some(Self::Djn),
            11 => Some(Self::Spl),
            12 => Some(Self::Slt),
            13 => Some(Self::Cmp),
            14 => Some(Self::Seq),
            15 => Some(Self::Sne),
            16 => Some(Self::Nop),
            17 => Some(Self::Ldp),
            18 => Some(Self::Stp),
            _ => None,
        }
    }

    /// Resolves a mnemonic, case-insensitively. `CMP` resolves to `Seq`.
    #[must_use]
    pub fn from_mnemonic(token: &str) -> Option<Self> {
        let upper = token.to_ascii_uppercase();
        match upper.as_str() {
            "DAT" => Some(Self::Dat),
            "MOV" => Some(Self::Mov),
            "ADD" => Some(Self::Add),
            "SUB" => Some(Self::Sub),
            "MUL" => Some(Self::Mul),
            "DIV" => Some(Self::Div),
            "MOD" => Some(Self::Mod),
            "JMP" => Some(Self::Jmp),
            "JMZ" => Some(Self::Jmz),
            "JMN" => Some(Self::Jmn),
            "DJN" => Some(Self::Djn),
            "SPL" => Some(Self::Spl),
            "SLT" => Some(Self::Slt),
            "CMP" | "SEQ" => Some(Self::Seq),
            "SNE" => Some(Self::Sne),
            "NOP" => Some(Self::Nop),
            "LDP" => Some(Self::Ldp),
            "STP" => Some(Self::Stp),
            _ => None,
        }
    }

    /// Canonical upper-case mnemonic.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Dat => "DAT",
            Self::Mov => "MOV",
            Self::Add => "ADD",
            Self::Sub => "SUB",
            Self::Mul => "MUL",
            Self::Div => "DIV",
            Self::Mod => "MOD",
            Self::Jmp => "JMP",
            Self::Jmz => "JMZ",
            Self::Jmn => "JMN",
            Self::Djn => "DJN",
            Self::Spl => "SPL",
            Self::Slt => "SLT",
            Self::Cmp => "CMP",
            Self::Seq => "SEQ",
            Self::Sne => "SNE",
            Self::Nop => "NOP",
            Self::Ldp => "LDP",
            Self::Stp => "STP",
        }
    }
}

impl Modifier {
    /// Every modifier, in stable encoding order.
    pub const ALL: [Self; 7] = [
        Self::A,
        Self::B,
        Self::AB,
        Self::BA,
        Self::F,
        Self::X,
        Self::I,
    ];

    /// Stable low-byte encoding of this modifier.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Decodes the stable low-byte encoding back into a modifier.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::A),
            1 => Some(Self::B),
            2 => Some(Self::AB),
            3 => Some(Self::BA),
            4 => Some(Self::F),
            5 => Some(Self::X),
            6 => Some(Self::I),
            _ => None,
        }
    }

    /// Resolves a modifier token, case-insensitively.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        let upper = token.to_ascii_uppercase();
        match upper.as_str() {
            "A" => Some(Self::A),
            "B" => Some(Self::B),
            "AB" => Some(Self::AB),
            "BA" => Some(Self::BA),
            "F" => Some(Self::F),
            "X" => Some(Self::X),
            "I" => Some(Self::I),
            _ => None,
        }
    }

    /// Canonical upper-case token.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::AB => "AB",
            Self::BA => "BA",
            Self::F => "F",
            Self::X => "X",
            Self::I => "I",
        }
    }
}

impl AddrMode {
    /// Every addressing mode, in stable encoding order.
    pub const ALL: [Self; 8] = [
        Self::Immediate,
        Self::Direct,
        Self::IndirectA,
        Self::IndirectB,
        Self::PredecA,
        Self::PredecB,
        Self::PostincA,
        Self::PostincB,
    ];

    /// Stable low-byte encoding of this mode.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Decodes the stable low-byte encoding back into a mode.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Immediate),
            1 => Some(Self::Direct),
            2 => Some(Self::IndirectA),
            3 => Some(Self::IndirectB),
            4 => Some(Self::PredecA),
            5 => Some(Self::PredecB),
            6 => Some(Self::PostincA),
            7 => Some(Self::PostincB),
            _ => None,
        }
    }

    /// The one-character sigil used in loadfiles.
    #[must_use]
    pub const fn sigil(self) -> char {
        match self {
            Self::Immediate => '#',
            Self::Direct => '$',
            Self::IndirectA => '*',
            Self::IndirectB => '@',
            Self::PredecA => '{',
            Self::PredecB => '<',
            Self::PostincA => '}',
            Self::PostincB => '>',
        }
    }

    /// Resolves a sigil character into a mode.
    #[must_use]
    pub const fn from_sigil(sigil: char) -> Option<Self> {
        match sigil {
            '#' => Some(Self::Immediate),
            '$' => Some(Self::Direct),
            '*' => Some(Self::IndirectA),
            '@' => Some(Self::IndirectB),
            '{' => Some(Self::PredecA),
            '<' => Some(Self::PredecB),
            '}' => Some(Self::PostincA),
            '>' => Some(Self::PostincB),
            _ => None,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl fmt::Display for AddrMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sigil())
    }
}

/// One Redcode instruction in its readable shape.
///
/// Field values are raw (possibly negative) until the battle loader reduces
/// them modulo the core size. Structural equality compares every component,
/// which is exactly the comparison `SEQ.I`/`SNE.I` perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Instruction {
    /// Operation to perform.
    pub opcode: Opcode,
    /// Field-selection modifier.
    pub modifier: Modifier,
    /// Addressing mode of the A-operand.
    pub a_mode: AddrMode,
    /// A-operand field value.
    pub a_field: Field,
    /// Addressing mode of the B-operand.
    pub b_mode: AddrMode,
    /// B-operand field value.
    pub b_field: Field,
}

impl Instruction {
    /// Builds an instruction from its components.
    #[must_use]
    pub const fn new(
        opcode: Opcode,
        modifier: Modifier,
        a_mode: AddrMode,
        a_field: Field,
        b_mode: AddrMode,
        b_field: Field,
    ) -> Self {
        Self {
            opcode,
            modifier,
            a_mode,
            a_field,
            b_mode,
            b_field,
        }
    }

    /// The core fill instruction, `DAT.F $0, $0`.
    #[must_use]
    pub const fn fill() -> Self {
        Self::new(Opcode::Dat, Modifier::F, AddrMode::Direct, 0, AddrMode::Direct, 0)
    }
}

impl Default for Instruction {
    fn default() -> Self {
        Self::fill()
    }
}

impl fmt::Display for Instruction {
    /// Canonical loadfile form: `OP.MOD <sigil><a>, <sigil><b>`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} {}{}, {}{}",
            self.opcode, self.modifier, self.a_mode, self.a_field, self.b_mode, self.b_field
        )
    }
}

/// The ICWS '94 default-modifier table used when loading '88 loadfiles.
///
/// Deterministic in the opcode and the two addressing modes.
#[must_use]
pub const fn default_modifier(op: Opcode, a_mode: AddrMode, b_mode: AddrMode) -> Modifier {
    match op {
        Opcode::Dat | Opcode::Nop => Modifier::F,
        Opcode::Mov | Opcode::Cmp | Opcode::Seq | Opcode::Sne => match (a_mode, b_mode) {
            (AddrMode::Immediate, _) => Modifier::AB,
            (_, AddrMode::Immediate) => Modifier::B,
            _ => Modifier::I,
        },
        Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div | Opcode::Mod => {
            match (a_mode, b_mode) {
                (AddrMode::Immediate, _) => Modifier::AB,
                (_, AddrMode::Immediate) => Modifier::B,
                _ => Modifier::F,
            }
        }
        Opcode::Slt | Opcode::Ldp | Opcode::Stp => match a_mode {
            AddrMode::Immediate => Modifier::AB,
            _ => Modifier::B,
        },
        Opcode::Jmp | Opcode::Jmz | Opcode::Jmn | Opcode::Djn | Opcode::Spl => Modifier::B,
    }
}
