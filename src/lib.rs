/*
SPDX-License-Identifier: MIT
*/

//! schedsim – discrete-time scheduler + buddy memory simulator
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── clock      – monotonic tick counter, the sole notion of time
//! ├── job        – Job (input record) and Pcb (runtime record)
//! ├── config     – YAML simulation settings (arena size, output paths)
//! ├── input      – job-descriptor file reader
//! ├── memory     – MemoryManager + BuddyAllocator
//! ├── scheduler  – SchedulerCore, ready structure, policies
//! ├── report     – event log, memory trace, performance summary
//! └── sim        – Simulator driver: runs the tick loop to quiescence
//! ```

pub mod clock;
pub mod config;
pub mod input;
pub mod job;
pub mod memory;
pub mod report;
pub mod scheduler;
pub mod sim;
