//! Cycle-accurate Memory Array Redcode Simulator engine.
//!
//! A [`Battle`] owns a circular [`Core`] and per-warrior task queues,
//! executes one task per cycle under ICWS '94 semantics (with the common
//! `SEQ`/`SNE`/`NOP`/`LDP`/`STP` and `*`/`{`/`}` extensions), and reports
//! an [`Outcome`]. Battles are deterministic, resumable, and cheaply
//! clonable; parallelism belongs to harnesses running independent battles.

/// Battle configuration.
pub mod config;
pub use config::{ConfigError, MarsConfig};

/// Circular core memory.
pub mod core;
pub use core::Core;

/// Per-warrior task queues and turn order.
pub mod scheduler;
pub use scheduler::Scheduler;

/// P-space buffers persisted across rounds by the harness.
pub mod pspace;
pub use pspace::PSpaceSet;

/// Battle setup and the outer run loop.
pub mod battle;
pub use battle::{Battle, Outcome, SetupError};

mod engine;

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
