/*
SPDX-License-Identifier: MIT
*/

//! Structured error types for the simulation core.
//!
//! Failures split into two layers:
//!
//! * [`UnknownPolicy`] — a policy name that is none of `rr` / `hpf` / `srtn`;
//!   surfaces straight from CLI parsing.
//! * [`SimError`] — a failure during a run. The only recoverable failure mode
//!   inside the tick loop is writing an output file; everything else in the
//!   core is either a negative result (deferred admission) or a logic
//!   invariant whose violation panics.
//!
//! Input-file and settings-file problems have their own enums next to the
//! code that detects them (`input::InputError`, `config::ConfigError`).

use thiserror::Error;

/// Unrecognised scheduling policy name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown scheduling policy: '{0}' (valid: rr, hpf, srtn)")]
pub struct UnknownPolicy(pub String);

/// Top-level failure of a simulation run.
#[derive(Debug, Error)]
pub enum SimError {
    /// An event log, memory trace or summary write failed.
    #[error("failed to write simulation output: {0}")]
    Output(#[from] std::io::Error),
}
