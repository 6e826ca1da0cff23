/*
SPDX-License-Identifier: MIT
*/

//! Core process data structures.
//!
//! Two distinct types model the two sides of the admission boundary:
//!
//! ```text
//! input file ──► Job ──(admission, memory granted)──► Pcb ──► finished
//!                 ↑ immutable descriptor                ↑ mutable runtime record
//! ```
//!
//! # Ownership model
//! `Job`s are owned by the input feeder until handed to the scheduler; a `Job`
//! is **consumed** on admission and a fresh [`Pcb`] takes its place. The
//! scheduler core is the single owner of every live `Pcb` — a PCB is either
//! inside the ready structure or in the currently-running slot, never both.

use crate::clock::Tick;

// ── Job (input record) ────────────────────────────────────────────────────────

/// One job descriptor read from the input file. Immutable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// Unique positive process id, assigned by the input file.
    pub id: u32,
    /// Tick at which the job arrives.
    pub arrival: Tick,
    /// Total runtime in ticks. Always positive.
    pub runtime: u64,
    /// Scheduling priority; smaller means higher.
    pub priority: u32,
    /// Memory requirement in bytes (rounded to a power of two at admission).
    pub memsize: u64,
}

// ── Process state ─────────────────────────────────────────────────────────────

/// Lifecycle state of an admitted process.
///
/// `Ready → Running → {Ready | Finished}`; `Finished` is terminal. The
/// pre-admission "new" state has no variant — a job that has not been admitted
/// is still a [`Job`], not a `Pcb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Ready,
    Running,
    Finished,
}

// ── Pcb (runtime record) ──────────────────────────────────────────────────────

/// Process Control Block: the mutable per-process record, created on admission
/// and retired on completion.
///
/// `Option<Tick>` replaces the `-1` sentinels of classic PCB layouts for the
/// three "not yet happened" timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pcb {
    pub id: u32,
    pub arrival: Tick,
    /// Original runtime; never modified after admission.
    pub runtime: u64,
    /// Ticks of execution still owed. Decrements monotonically to 0.
    pub remaining: u64,
    pub priority: u32,
    pub state: ProcessState,
    /// Tick of the first dispatch.
    pub start_time: Option<Tick>,
    /// Last tick at which the process held the CPU (or was stopped).
    pub last_run_time: Option<Tick>,
    /// Set exactly once, when `remaining` reaches 0.
    pub finish_time: Option<Tick>,
    /// Accumulated ticks spent Ready (including time waiting for memory).
    pub waiting_time: u64,
}

impl Pcb {
    /// Build the runtime record for a job that has just been granted memory.
    pub fn admit(job: Job) -> Self {
        Self {
            id: job.id,
            arrival: job.arrival,
            runtime: job.runtime,
            remaining: job.runtime,
            priority: job.priority,
            state: ProcessState::Ready,
            start_time: None,
            last_run_time: None,
            finish_time: None,
            waiting_time: 0,
        }
    }

    /// Charge the Ready time accumulated since the process last held the CPU
    /// (or since arrival, if it never ran). Called at every Ready→Running
    /// transition.
    pub fn accrue_wait(&mut self, now: Tick) {
        let since = self.last_run_time.unwrap_or(self.arrival);
        self.waiting_time += now - since;
    }

    /// Transition to `Finished` at tick `at`.
    ///
    /// # Panics
    /// Panics if the process still has runtime owed — completing a process
    /// with `remaining > 0` is a scheduler bug.
    pub fn finish(&mut self, at: Tick) {
        assert_eq!(
            self.remaining, 0,
            "process {} finished with {} ticks remaining",
            self.id, self.remaining
        );
        self.state = ProcessState::Finished;
        self.finish_time = Some(at);
    }

    /// `finish_time − arrival`, once finished.
    pub fn turnaround(&self) -> Option<u64> {
        self.finish_time.map(|f| f - self.arrival)
    }

    /// Turnaround divided by runtime, once finished.
    pub fn weighted_turnaround(&self) -> Option<f64> {
        self.turnaround().map(|ta| ta as f64 / self.runtime as f64)
    }

    /// `start_time − arrival`, once dispatched for the first time.
    pub fn response_time(&self) -> Option<u64> {
        self.start_time.map(|s| s - self.arrival)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn job(id: u32, arrival: Tick, runtime: u64) -> Job {
        Job {
            id,
            arrival,
            runtime,
            priority: 1,
            memsize: 8,
        }
    }

    #[test]
    fn admit_initialises_runtime_record() {
        let pcb = Pcb::admit(job(3, 5, 7));
        assert_eq!(pcb.remaining, 7);
        assert_eq!(pcb.state, ProcessState::Ready);
        assert_eq!(pcb.start_time, None);
        assert_eq!(pcb.last_run_time, None);
        assert_eq!(pcb.finish_time, None);
        assert_eq!(pcb.waiting_time, 0);
    }

    #[test]
    fn first_wait_accrues_from_arrival() {
        let mut pcb = Pcb::admit(job(1, 2, 4));
        pcb.accrue_wait(6);
        assert_eq!(pcb.waiting_time, 4);
    }

    #[test]
    fn later_waits_accrue_from_last_run_time() {
        let mut pcb = Pcb::admit(job(1, 0, 4));
        pcb.accrue_wait(0); // first dispatch, no wait
        pcb.last_run_time = Some(2); // stopped at tick 2
        pcb.accrue_wait(5); // redispatched at tick 5
        assert_eq!(pcb.waiting_time, 3);
    }

    #[test]
    fn turnaround_metrics_require_completion() {
        let mut pcb = Pcb::admit(job(1, 2, 4));
        assert_eq!(pcb.turnaround(), None);
        assert_eq!(pcb.weighted_turnaround(), None);

        pcb.remaining = 0;
        pcb.finish(8);
        assert_eq!(pcb.state, ProcessState::Finished);
        assert_eq!(pcb.turnaround(), Some(6));
        assert!((pcb.weighted_turnaround().unwrap() - 1.5).abs() < 1e-9);
    }

    #[test]
    #[should_panic(expected = "ticks remaining")]
    fn finishing_with_runtime_owed_panics() {
        let mut pcb = Pcb::admit(job(1, 0, 4));
        pcb.finish(4);
    }

    #[test]
    fn response_time_is_start_minus_arrival() {
        let mut pcb = Pcb::admit(job(1, 3, 4));
        assert_eq!(pcb.response_time(), None);
        pcb.start_time = Some(5);
        assert_eq!(pcb.response_time(), Some(2));
    }
}
