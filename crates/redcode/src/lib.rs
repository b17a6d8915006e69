//! Redcode instruction model and ICWS '88/'94 loadfile parsing.

/// Instruction model primitives: opcodes, modifiers, addressing modes.
pub mod insn;
pub use insn::{default_modifier, AddrMode, Field, Instruction, Modifier, Opcode};

/// Compact packed instruction shape.
pub mod packed;
pub use packed::{pack_word, unpack_word, PackedInstruction};

/// Loadfile parser and structured parse errors.
pub mod parser;
pub use parser::{
    parse_warrior, parse_warrior_bytes, Dialect, ParseError, ParseErrorKind, ParseOptions,
};

/// Assembled warrior values.
pub mod warrior;
pub use warrior::{Warrior, WarriorError};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
