//! Battle configuration.

use thiserror::Error;

/// Default core size, matching pMARS.
pub const DEFAULT_CORE_SIZE: u32 = 8000;
/// Default cycle limit before a battle is called a tie, matching pMARS.
pub const DEFAULT_CYCLES_BEFORE_TIE: u32 = 80_000;
/// Default per-warrior task limit, matching pMARS.
pub const DEFAULT_MAX_PROCESSES: u32 = 8000;
/// Default maximum warrior length, matching pMARS.
pub const DEFAULT_MAX_WARRIOR_SIZE: u32 = 100;
/// Default minimum placement separation, matching pMARS.
pub const DEFAULT_MIN_SEPARATION: u32 = 100;
/// Default p-space size, matching pMARS.
pub const DEFAULT_PSPACE_SIZE: u32 = 500;
/// Default number of warriors in a battle.
pub const DEFAULT_WARRIORS: u32 = 2;

/// Immutable battle parameters, accepted at battle construction and fixed
/// for the battle's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct MarsConfig {
    /// Number of cells in the circular core.
    pub core_size: u32,
    /// Dispatch count at which an undecided battle becomes a tie.
    pub cycles_before_tie: u32,
    /// Per-warrior task queue capacity; excess spawns are dropped.
    pub max_processes: u32,
    /// Maximum accepted warrior length, in instructions.
    pub max_warrior_size: u32,
    /// Minimum forward distance required between placed warriors.
    pub min_separation: u32,
    /// Cells in each warrior's p-space buffer.
    pub pspace_size: u32,
    /// Number of warriors per battle.
    pub warriors: u32,
}

impl Default for MarsConfig {
    fn default() -> Self {
        Self {
            core_size: DEFAULT_CORE_SIZE,
            cycles_before_tie: DEFAULT_CYCLES_BEFORE_TIE,
            max_processes: DEFAULT_MAX_PROCESSES,
            max_warrior_size: DEFAULT_MAX_WARRIOR_SIZE,
            min_separation: DEFAULT_MIN_SEPARATION,
            pspace_size: DEFAULT_PSPACE_SIZE,
            warriors: DEFAULT_WARRIORS,
        }
    }
}

/// Rejected configurations, reported at battle construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ConfigError {
    /// The core must hold at least one cell.
    #[error("core size must be non-zero")]
    ZeroCoreSize,
    /// Warriors must be able to run at least one task.
    #[error("max processes must be non-zero")]
    ZeroMaxProcesses,
    /// Warriors must be allowed at least one instruction.
    #[error("max warrior size must be non-zero")]
    ZeroMaxWarriorSize,
    /// A battle needs at least two warriors.
    #[error("a battle requires at least 2 warriors, got {0}")]
    TooFewWarriors(u32),
    /// The warriors cannot fit in the core at the required separation.
    #[error(
        "{warriors} warriors of up to {max_warrior_size} instructions cannot \
         keep separation {min_separation} in a core of {core_size}"
    )]
    SeparationTooLarge {
        /// Configured warrior count.
        warriors: u32,
        /// Configured maximum warrior length.
        max_warrior_size: u32,
        /// Configured minimum separation.
        min_separation: u32,
        /// Configured core size.
        core_size: u32,
    },
    /// P-space may not exceed the core.
    #[error("pspace size {pspace_size} exceeds core size {core_size}")]
    PspaceTooLarge {
        /// Configured p-space size.
        pspace_size: u32,
        /// Configured core size.
        core_size: u32,
    },
}

impl MarsConfig {
    /// Checks the parameter set for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] the parameters violate.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.core_size == 0 {
            return Err(ConfigError::ZeroCoreSize);
        }
        if self.max_processes == 0 {
            return Err(ConfigError::ZeroMaxProcesses);
        }
        if self.max_warrior_size == 0 {
            return Err(ConfigError::ZeroMaxWarriorSize);
        }
        if self.warriors < 2 {
            return Err(ConfigError::TooFewWarriors(self.warriors));
        }

        let footprint = u64::from(self.warriors)
            * (u64::from(self.max_warrior_size) + u64::from(self.min_separation));
        if footprint > u64::from(self.core_size) {
            return Err(ConfigError::SeparationTooLarge {
                warriors: self.warriors,
                max_warrior_size: self.max_warrior_size,
                min_separation: self.min_separation,
                core_size: self.core_size,
            });
        }

        if self.pspace_size > self.core_size {
            return Err(ConfigError::PspaceTooLarge {
                pspace_size: self.pspace_size,
                core_size: self.core_size,
            });
        }

        Ok(())
    }
}
