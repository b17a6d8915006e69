//! Assembled warrior values.

use core::fmt;

use thiserror::Error;

use crate::insn::Instruction;

/// Violations of the warrior construction invariants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum WarriorError {
    /// `start` must address an instruction of the warrior.
    #[error("start offset {start} is outside the code (length {len})")]
    StartOutOfRange {
        /// Offending start offset.
        start: usize,
        /// Number of instructions in the warrior.
        len: usize,
    },
}

/// An assembled Redcode program, immutable after construction.
///
/// Field values are kept raw; the battle loader reduces them modulo the
/// core size when the warrior is placed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Warrior {
    name: Option<String>,
    code: Vec<Instruction>,
    start: usize,
    pin: Option<i64>,
}

impl Warrior {
    /// Builds a warrior, validating that `start` addresses one of its
    /// instructions (an empty warrior must use `start == 0`).
    ///
    /// # Errors
    ///
    /// Returns [`WarriorError::StartOutOfRange`] when the invariant does not
    /// hold.
    pub fn new(code: Vec<Instruction>, start: usize) -> Result<Self, WarriorError> {
        if start != 0 && start >= code.len() {
            return Err(WarriorError::StartOutOfRange {
                start,
                len: code.len(),
            });
        }
        Ok(Self {
            name: None,
            code,
            start,
            pin: None,
        })
    }

    /// Attaches a display name (loadfile `;name` metadata).
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attaches a p-space key (loadfile `PIN` pseudo-op).
    #[must_use]
    pub const fn with_pin(mut self, pin: i64) -> Self {
        self.pin = Some(pin);
        self
    }

    /// Display name, when the loadfile carried one.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The instruction sequence.
    #[must_use]
    pub fn code(&self) -> &[Instruction] {
        &self.code
    }

    /// Number of instructions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.code.len()
    }

    /// True when the warrior contains no instructions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Offset into the code where execution begins.
    #[must_use]
    pub const fn start(&self) -> usize {
        self.start
    }

    /// P-space key, when the loadfile carried one.
    #[must_use]
    pub const fn pin(&self) -> Option<i64> {
        self.pin
    }

    /// Serializes the warrior in canonical loadfile form.
    ///
    /// Parsing the result yields this warrior back; formatting that parse
    /// yields the identical text.
    #[must_use]
    pub fn to_loadfile(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Warrior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            writeln!(f, ";name {name}")?;
        }
        if let Some(pin) = self.pin {
            writeln!(f, "PIN {pin}")?;
        }
        writeln!(f, "ORG {}", self.start)?;
        for insn in &self.code {
            writeln!(f, "{insn}")?;
        }
        writeln!(f, "END")
    }
}
