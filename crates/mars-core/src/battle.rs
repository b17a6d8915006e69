//! Battle setup and the outer run loop.

use redcode::{Field, Warrior};
use thiserror::Error;

use crate::config::{ConfigError, MarsConfig};
use crate::core::Core;
use crate::engine::{self, DeferredIncrements};
use crate::pspace::PSpaceSet;
use crate::scheduler::Scheduler;

/// How a battle (or a bounded run of one) ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Outcome {
    /// Exactly one warrior still had tasks; index into the warrior list.
    Win(usize),
    /// No single survivor: every queue drained, or the cycle limit hit.
    Tie,
    /// The step budget ran out with the battle still undecided.
    Paused,
}

/// Rejected battle setups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum SetupError {
    /// The configuration itself is inconsistent.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The warrior list does not match the configured battle size.
    #[error("configured for {expected} warriors, got {got}")]
    WarriorCount {
        /// Configured warrior count.
        expected: u32,
        /// Warriors supplied.
        got: usize,
    },
    /// The placement vector must name one offset per warrior.
    #[error("expected {warriors} placement offsets, got {offsets}")]
    OffsetCount {
        /// Warriors supplied.
        warriors: usize,
        /// Offsets supplied.
        offsets: usize,
    },
    /// A warrior must occupy at least one cell.
    #[error("warrior {index} has no instructions")]
    EmptyWarrior {
        /// Index of the offending warrior.
        index: usize,
    },
    /// A warrior exceeds the configured length limit.
    #[error("warrior {index} has {len} instructions (limit {max})")]
    WarriorTooLong {
        /// Index of the offending warrior.
        index: usize,
        /// Its length.
        len: usize,
        /// Configured maximum.
        max: u32,
    },
    /// A placement offset falls outside the core.
    #[error("offset {offset} of warrior {index} is outside the core")]
    OffsetOutOfRange {
        /// Index of the offending warrior.
        index: usize,
        /// The rejected offset.
        offset: Field,
    },
    /// Two placements are closer than the minimum separation.
    #[error("warriors {first} and {second} violate the minimum separation")]
    SeparationViolation {
        /// Index of the earlier warrior.
        first: usize,
        /// Index of the later warrior.
        second: usize,
    },
}

/// One battle: a core, the warriors' task queues, and the cycle state.
///
/// Single-threaded and deterministic; identical configuration, warriors,
/// and offsets produce identical state at every cycle. Cloning yields an
/// independent battle that replays identically from the cloned point.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Battle {
    config: MarsConfig,
    core: Core,
    sched: Scheduler,
    deferred: DeferredIncrements,
    pspace: Option<PSpaceSet>,
}

impl Battle {
    /// Validates the configuration and placement, fills the core, and
    /// seeds one task per warrior at `(offset + start) mod core_size`.
    ///
    /// Placement preconditions: every offset lies in `[0, core_size)` and
    /// each ordered pair satisfies
    /// `fwd(offset_i + len_i, offset_j) >= min_separation`.
    ///
    /// # Errors
    ///
    /// Returns a [`SetupError`] naming the first violated precondition.
    pub fn new(
        config: MarsConfig,
        warriors: &[Warrior],
        offsets: &[Field],
    ) -> Result<Self, SetupError> {
        config.validate()?;

        if warriors.len() != config.warriors as usize {
            return Err(SetupError::WarriorCount {
                expected: config.warriors,
                got: warriors.len(),
            });
        }
        if offsets.len() != warriors.len() {
            return Err(SetupError::OffsetCount {
                warriors: warriors.len(),
                offsets: offsets.len(),
            });
        }

        let mut core = Core::new(config.core_size);
        for (index, (warrior, &offset)) in warriors.iter().zip(offsets).enumerate() {
            if warrior.is_empty() {
                return Err(SetupError::EmptyWarrior { index });
            }
            if warrior.len() > config.max_warrior_size as usize {
                return Err(SetupError::WarriorTooLong {
                    index,
                    len: warrior.len(),
                    max: config.max_warrior_size,
                });
            }
            if !core.in_range(offset) {
                return Err(SetupError::OffsetOutOfRange { index, offset });
            }
        }

        for first in 0..warriors.len() {
            for second in 0..warriors.len() {
                if first == second {
                    continue;
                }
                let end = core.fold(offsets[first] + warriors[first].len() as Field);
                if core.fwd(end, offsets[second]) < Field::from(config.min_separation) {
                    return Err(SetupError::SeparationViolation { first, second });
                }
            }
        }

        let mut sched = Scheduler::new(warriors.len(), config.max_processes as usize);
        for (index, (warrior, &offset)) in warriors.iter().zip(offsets).enumerate() {
            for (position, &insn) in warrior.code().iter().enumerate() {
                let addr = core.fold(offset + position as Field);
                let normalized = core.normalized(insn);
                core.set(addr, normalized);
            }
            sched.spawn(index, core.fold(offset + warrior.start() as Field));
        }

        Ok(Self {
            config,
            core,
            sched,
            deferred: DeferredIncrements::new(),
            pspace: None,
        })
    }

    /// Hands a p-space set to the battle for its lifetime.
    ///
    /// The set must match this battle's warrior count and configured
    /// p-space size; anything else is a harness bug.
    pub fn attach_pspace(&mut self, pspace: PSpaceSet) {
        assert_eq!(
            pspace.warriors(),
            self.sched.warriors(),
            "pspace set does not match the battle's warrior count"
        );
        assert_eq!(
            pspace.size(),
            self.config.pspace_size,
            "pspace set does not match the configured pspace size"
        );
        self.pspace = Some(pspace);
    }

    /// Takes the p-space set back, typically after the battle ends, so the
    /// harness can carry it into the next round.
    pub fn release_pspace(&mut self) -> Option<PSpaceSet> {
        self.pspace.take()
    }

    /// The battle's immutable configuration.
    #[must_use]
    pub const fn config(&self) -> &MarsConfig {
        &self.config
    }

    /// Read access to the core, for observers and fingerprinting.
    #[must_use]
    pub const fn core(&self) -> &Core {
        &self.core
    }

    /// Dispatches executed so far.
    #[must_use]
    pub const fn cycles(&self) -> u32 {
        self.sched.cycle()
    }

    /// The task queue of `warrior`, in dispatch order.
    #[must_use]
    pub fn tasks(&self, warrior: usize) -> Vec<Field> {
        self.sched.tasks(warrior).collect()
    }

    /// Number of tasks `warrior` currently has.
    #[must_use]
    pub fn task_count(&self, warrior: usize) -> usize {
        self.sched.task_count(warrior)
    }

    /// Total tasks across all warriors.
    #[must_use]
    pub fn total_tasks(&self) -> usize {
        self.sched.total_tasks()
    }

    /// Runs at most `steps` cycles, stopping early at a terminal outcome.
    ///
    /// Returns [`Outcome::Paused`] when the budget runs out first; a later
    /// call resumes where this one stopped. Once the battle is decided,
    /// every further call reports the same outcome without executing.
    pub fn run(&mut self, steps: u32) -> Outcome {
        for _ in 0..steps {
            if let Some(outcome) = self.decided() {
                return outcome;
            }
            self.cycle();
        }
        self.decided().unwrap_or(Outcome::Paused)
    }

    /// The terminal outcome, when the battle has one.
    #[must_use]
    pub fn decided(&self) -> Option<Outcome> {
        match self.sched.live_count() {
            0 => Some(Outcome::Tie),
            1 => {
                let survivor = self.sched.sole_survivor().expect("exactly one live warrior");
                Some(Outcome::Win(survivor))
            }
            _ if self.sched.cycle() >= self.config.cycles_before_tie => Some(Outcome::Tie),
            _ => None,
        }
    }

    /// Executes exactly one dispatch.
    fn cycle(&mut self) {
        let warrior = self.sched.select().expect("undecided battle has live warriors");
        let pc = self.sched.next_task(warrior).expect("selected warrior has a task");

        engine::step(
            &mut self.core,
            &mut self.sched,
            self.pspace.as_mut(),
            &mut self.deferred,
            warrior,
            pc,
        );
        self.sched.advance_cycle();

        debug_assert!(self.deferred.is_empty(), "post-increments leaked past commit");
    }
}
