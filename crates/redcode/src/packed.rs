//! Compact packed instruction shape.
//!
//! The opcode, modifier, and both addressing modes pack into 14 bits of one
//! `u16` (opcode 5, modifier 3, modes 3+3); the two operand fields ride
//! alongside unchanged. The packed and readable shapes are bijective over
//! the whole 19·7·8·8 instruction space.

use crate::insn::{AddrMode, Field, Instruction, Modifier, Opcode};

const OPCODE_SHIFT: u16 = 9;
const MODIFIER_SHIFT: u16 = 6;
const A_MODE_SHIFT: u16 = 3;
const FIELD_MASK_3: u16 = 0x7;
const OPCODE_MASK: u16 = 0x1F;

/// An instruction in its packed shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct PackedInstruction {
    /// 14-bit packed opcode/modifier/mode word.
    pub word: u16,
    /// A-operand field value.
    pub a_field: Field,
    /// B-operand field value.
    pub b_field: Field,
}

/// Packs an opcode/modifier/mode tuple into its 14-bit word.
#[must_use]
pub const fn pack_word(op: Opcode, modifier: Modifier, a_mode: AddrMode, b_mode: AddrMode) -> u16 {
    ((op.as_u8() as u16) << OPCODE_SHIFT)
        | ((modifier.as_u8() as u16) << MODIFIER_SHIFT)
        | ((a_mode.as_u8() as u16) << A_MODE_SHIFT)
        | (b_mode.as_u8() as u16)
}

/// Unpacks a 14-bit word back into its tuple.
///
/// Returns `None` for words whose opcode bits fall outside the 19 defined
/// opcodes or whose modifier bits exceed the 7 defined modifiers.
#[must_use]
pub const fn unpack_word(word: u16) -> Option<(Opcode, Modifier, AddrMode, AddrMode)> {
    let op = ((word >> OPCODE_SHIFT) & OPCODE_MASK) as u8;
    let modifier = ((word >> MODIFIER_SHIFT) & FIELD_MASK_3) as u8;
    let a_mode = ((word >> A_MODE_SHIFT) & FIELD_MASK_3) as u8;
    let b_mode = (word & FIELD_MASK_3) as u8;

    let Some(op) = Opcode::from_u8(op) else {
        return None;
    };
    let Some(modifier) = Modifier::from_u8(modifier) else {
        return None;
    };
    let Some(a_mode) = AddrMode::from_u8(a_mode) else {
        return None;
    };
    let Some(b_mode) = AddrMode::from_u8(b_mode) else {
        return None;
    };
    Some((op, modifier, a_mode, b_mode))
}

impl PackedInstruction {
    /// Encodes a readable instruction into the packed shape.
    #[must_use]
    pub const fn from_instruction(insn: Instruction) -> Self {
        Self {
            word: pack_word(insn.opcode, insn.modifier, insn.a_mode, insn.b_mode),
            a_field: insn.a_field,
            b_field: insn.b_field,
        }
    }

    /// Decodes the packed shape back into a readable instruction.
    ///
    /// Returns `None` when the packed word does not name a defined
    /// opcode/modifier/mode tuple.
    #[must_use]
    pub const fn try_into_instruction(self) -> Option<Instruction> {
        let Some((opcode, modifier, a_mode, b_mode)) = unpack_word(self.word) else {
            return None;
        };
        Some(Instruction {
            opcode,
            modifier,
            a_mode,
            a_field: self.a_field,
            b_mode,
            b_field: self.b_field,
        })
    }
}

impl From<Instruction> for PackedInstruction {
    fn from(insn: Instruction) -> Self {
        Self::from_instruction(insn)
    }
}
