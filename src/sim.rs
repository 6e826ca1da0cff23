/*
SPDX-License-Identifier: MIT
*/

//! The simulation driver.
//!
//! [`Simulator`] owns the clock, the scheduler core and the not-yet-arrived
//! jobs. Per tick it hands the scheduler exactly the jobs whose arrival time
//! equals the current tick, then advances the clock — the clock is advanced
//! nowhere else. The loop ends at quiescence: every job delivered, nothing
//! ready, nothing waiting for memory, nothing running.
//!
//! Determinism: the run is a pure function of the job list and the
//! configuration. Jobs are delivered sorted by `(arrival, id)` and every
//! container downstream breaks ties totally, so two runs over the same input
//! produce byte-identical logs.

use std::collections::VecDeque;

use tracing::info;

use crate::clock::{Clock, Tick};
use crate::job::Job;
use crate::memory::MemoryManager;
use crate::report::{Accountant, Summary};
use crate::scheduler::{Policy, SchedulerCore, SimError};

/// Owns a whole simulation run.
#[derive(Debug)]
pub struct Simulator {
    clock: Clock,
    scheduler: SchedulerCore,
    /// Jobs not yet delivered, sorted by `(arrival, id)`.
    pending: VecDeque<Job>,
}

impl Simulator {
    /// Assemble a run over `jobs` (any order; sorted internally).
    pub fn new(
        policy: Policy,
        quantum: u64,
        mut jobs: Vec<Job>,
        memory: MemoryManager,
        accountant: Accountant,
    ) -> Self {
        jobs.sort_by_key(|j| (j.arrival, j.id));
        Self {
            clock: Clock::new(),
            scheduler: SchedulerCore::new(policy, quantum, memory, accountant),
            pending: jobs.into(),
        }
    }

    /// Run to quiescence and return the performance summary.
    pub fn run(&mut self) -> Result<Summary, SimError> {
        info!(jobs = self.pending.len(), "simulation starting");

        while !(self.pending.is_empty() && self.scheduler.is_idle()) {
            let now = self.clock.now();
            let arrivals = self.take_arrivals(now);
            self.scheduler.step(now, arrivals)?;
            self.clock.advance();
        }

        let total_ticks = self.clock.now();
        let summary = self.scheduler.finish(total_ticks)?;
        info!(total_ticks, "simulation complete");
        Ok(summary)
    }

    /// Pop every pending job arriving at `now`. The pending queue is sorted,
    /// so the result is in ascending id order.
    fn take_arrivals(&mut self, now: Tick) -> Vec<Job> {
        let mut arrivals = Vec::new();
        while self
            .pending
            .front()
            .is_some_and(|job| job.arrival == now)
        {
            arrivals.push(self.pending.pop_front().expect("front vanished"));
        }
        arrivals
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
