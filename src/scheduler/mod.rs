//! The scheduler core: one `step()` per tick.
//!
//! [`SchedulerCore`] owns every live PCB, the ready structure, the running
//! slot and the memory manager. The driver calls [`SchedulerCore::step`]
//! exactly once per tick; within a tick the ordering is strict and
//! observable:
//!
//! 1. newly arrived jobs are admitted (ascending id),
//! 2. the memory waiting queue is drained (queue order, head-first),
//! 3. the policy decides preemption and dispatch,
//! 4. the running process is charged one tick of execution,
//! 5. completions release memory and retire the PCB.
//!
//! All state transitions are logged through the [`Accountant`] at the moment
//! they occur, so the event log is an exact replay of the run.
//!
//! # Timestamps
//! A process that consumes its last runtime unit during tick `t` finishes at
//! `t + 1` (end of tick); its completion event, turnaround figures and memory
//! release all carry `t + 1`. The same end-of-tick convention stamps a
//! round-robin quantum expiry, while a shortest-remaining preemption is
//! decided *before* execution and stamps the tick itself.

pub mod error;
pub mod ready;

pub use error::{SimError, UnknownPolicy};

use std::fmt;
use std::str::FromStr;

use tracing::{debug, info};

use crate::clock::Tick;
use crate::job::{Job, Pcb, ProcessState};
use crate::memory::{Admission, MemoryManager};
use crate::report::{Accountant, Summary, Transition};
use ready::{HeapKey, ReadyQueue};

// ── Policy ────────────────────────────────────────────────────────────────────

/// The three scheduling disciplines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Non-preemptive highest priority first (lowest `priority` value wins).
    HighestPriorityFirst,
    /// Preemptive shortest remaining time next.
    ShortestRemainingTimeNext,
    /// Time-sliced round-robin.
    RoundRobin,
}

impl FromStr for Policy {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hpf" => Ok(Policy::HighestPriorityFirst),
            "srtn" => Ok(Policy::ShortestRemainingTimeNext),
            "rr" => Ok(Policy::RoundRobin),
            other => Err(UnknownPolicy(other.to_string())),
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Policy::HighestPriorityFirst => "hpf",
            Policy::ShortestRemainingTimeNext => "srtn",
            Policy::RoundRobin => "rr",
        })
    }
}

// ── SchedulerCore ─────────────────────────────────────────────────────────────

/// The per-tick scheduling state machine.
pub struct SchedulerCore {
    policy: Policy,
    /// Round-robin time slice length in ticks. Unused by the other policies.
    quantum: u64,
    ready: ReadyQueue,
    running: Option<Pcb>,
    /// Ticks the running process has held the CPU in its current slice (RR).
    slice_used: u64,
    memory: MemoryManager,
    accountant: Accountant,
    /// Jobs dropped because their memory request can never fit the arena.
    dropped: u64,
}

impl SchedulerCore {
    /// Build a scheduler for `policy`. `quantum` is the round-robin slice
    /// length and must be positive.
    pub fn new(policy: Policy, quantum: u64, memory: MemoryManager, accountant: Accountant) -> Self {
        assert!(quantum > 0, "round-robin quantum must be positive");
        let ready = match policy {
            Policy::HighestPriorityFirst => ReadyQueue::heap(HeapKey::Priority),
            Policy::ShortestRemainingTimeNext => ReadyQueue::heap(HeapKey::Remaining),
            Policy::RoundRobin => ReadyQueue::fifo(),
        };
        Self {
            policy,
            quantum,
            ready,
            running: None,
            slice_used: 0,
            memory,
            accountant,
            dropped: 0,
        }
    }

    /// Advance the simulation by one tick. `arrivals` are the jobs whose
    /// arrival time equals `now`, in ascending id order.
    pub fn step(&mut self, now: Tick, arrivals: Vec<Job>) -> Result<(), SimError> {
        for job in arrivals {
            debug_assert!(job.arrival <= now, "job {} delivered before arrival", job.id);
            self.admit(now, job)?;
        }
        // Drained after new arrivals so that smaller jobs arriving this very
        // tick compete with the queue on equal footing.
        for job in self.memory.try_drain_waiters(now)? {
            debug!(process = job.id, tick = now, "waiter admitted");
            self.ready.push(Pcb::admit(job));
        }
        if self.memory.has_waiters() {
            debug!(
                tick = now,
                waiting = self.memory.waiting_len(),
                "jobs still waiting for memory"
            );
        }
        self.dispatch(now)?;
        self.execute(now)?;
        Ok(())
    }

    /// True when nothing is running, ready or waiting for memory.
    pub fn is_idle(&self) -> bool {
        self.running.is_none() && self.ready.is_empty() && !self.memory.has_waiters()
    }

    /// The process currently holding the CPU, if any.
    pub fn running(&self) -> Option<&Pcb> {
        self.running.as_ref()
    }

    /// Number of processes in the ready structure.
    pub fn ready_len(&self) -> usize {
        self.ready.len()
    }

    /// Finish the run: flush the logs and compute the summary over
    /// `total_ticks` elapsed ticks.
    pub fn finish(&mut self, total_ticks: Tick) -> Result<Summary, SimError> {
        info!(
            total_ticks,
            finished = self.accountant.finished_count(),
            dropped = self.dropped,
            "simulation accounting closed"
        );
        self.accountant.flush()?;
        self.memory.flush_log()?;
        Ok(self.accountant.summary(total_ticks))
    }

    // ── Admission ─────────────────────────────────────────────────────────────

    fn admit(&mut self, now: Tick, job: Job) -> Result<(), SimError> {
        match self.memory.admit(now, job)? {
            Admission::Admitted { job, offset } => {
                debug!(process = job.id, tick = now, offset, "job admitted");
                self.ready.push(Pcb::admit(job));
            }
            Admission::Deferred => {}
            Admission::Rejected { job: _ } => {
                self.dropped += 1;
            }
        }
        Ok(())
    }

    // ── Dispatch ──────────────────────────────────────────────────────────────

    fn dispatch(&mut self, now: Tick) -> Result<(), SimError> {
        if self.policy == Policy::ShortestRemainingTimeNext {
            // Preempt only when the heap head owes strictly less than the
            // running process; on a tie the incumbent keeps the CPU.
            let head_is_shorter = match (&self.running, self.ready.peek()) {
                (Some(run), Some(head)) => head.remaining < run.remaining,
                _ => false,
            };
            if head_is_shorter {
                self.stop_running(now)?;
            }
        }

        if self.running.is_none() {
            if let Some(pcb) = self.ready.pop() {
                self.start(now, pcb)?;
            }
        }
        Ok(())
    }

    /// Move `pcb` into the running slot, accruing its ready time and logging
    /// `started` on first dispatch, `resumed` afterwards.
    fn start(&mut self, now: Tick, mut pcb: Pcb) -> Result<(), SimError> {
        assert!(
            self.running.is_none(),
            "dispatch of process {} while process {} is running",
            pcb.id,
            self.running.as_ref().map(|p| p.id).unwrap_or(0)
        );
        pcb.accrue_wait(now);
        pcb.state = ProcessState::Running;
        let transition = if pcb.start_time.is_none() {
            pcb.start_time = Some(now);
            debug!(
                process = pcb.id,
                tick = now,
                response = pcb.response_time().unwrap_or(0),
                "first dispatch"
            );
            Transition::Started
        } else {
            Transition::Resumed
        };
        self.accountant.record_transition(now, &pcb, transition)?;
        self.slice_used = 0;
        self.running = Some(pcb);
        Ok(())
    }

    /// Take the running process off the CPU at time `at` and return it to the
    /// ready structure.
    fn stop_running(&mut self, at: Tick) -> Result<(), SimError> {
        let mut pcb = self
            .running
            .take()
            .expect("stop_running with an empty running slot");
        pcb.state = ProcessState::Ready;
        pcb.last_run_time = Some(at);
        self.accountant
            .record_transition(at, &pcb, Transition::Stopped)?;
        self.ready.push(pcb);
        Ok(())
    }

    // ── Execution ─────────────────────────────────────────────────────────────

    /// Charge one tick of execution to the running process, handling
    /// completion and round-robin quantum expiry.
    fn execute(&mut self, now: Tick) -> Result<(), SimError> {
        if self.running.is_none() {
            return Ok(());
        }
        self.accountant.charge_busy_tick();

        let pcb = self.running.as_mut().expect("running slot emptied mid-tick");
        pcb.remaining -= 1;
        pcb.last_run_time = Some(now);

        if pcb.remaining == 0 {
            let mut pcb = self.running.take().expect("running slot emptied mid-tick");
            let finish = now + 1;
            pcb.finish(finish);
            self.accountant
                .record_transition(finish, &pcb, Transition::Finished)?;
            if let Some(alloc) = self.memory.allocation(pcb.id) {
                debug!(
                    process = pcb.id,
                    offset = alloc.offset,
                    bytes = alloc.rounded,
                    "releasing memory at completion"
                );
            }
            self.memory.release(finish, pcb.id)?;
            return Ok(());
        }

        if self.policy == Policy::RoundRobin {
            self.slice_used += 1;
            if self.slice_used == self.quantum {
                self.stop_running(now + 1)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for SchedulerCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchedulerCore")
            .field("policy", &self.policy)
            .field("quantum", &self.quantum)
            .field("ready", &self.ready.len())
            .field("running", &self.running.as_ref().map(|p| p.id))
            .finish_non_exhaustive()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::MemoryLog;
    use std::io::sink;

    fn scheduler(policy: Policy, quantum: u64, arena: u64) -> SchedulerCore {
        let memory = MemoryManager::new(arena, MemoryLog::new(Box::new(sink())).unwrap());
        let accountant = Accountant::new(Box::new(sink())).unwrap();
        SchedulerCore::new(policy, quantum, memory, accountant)
    }

    fn job(id: u32, arrival: Tick, runtime: u64, priority: u32) -> Job {
        Job {
            id,
            arrival,
            runtime,
            priority,
            memsize: 8,
        }
    }

    // ── Policy parsing ────────────────────────────────────────────────────────

    #[test]
    fn policy_parses_the_cli_names() {
        assert_eq!("hpf".parse(), Ok(Policy::HighestPriorityFirst));
        assert_eq!("srtn".parse(), Ok(Policy::ShortestRemainingTimeNext));
        assert_eq!("rr".parse(), Ok(Policy::RoundRobin));
    }

    #[test]
    fn unknown_policy_name_is_an_error() {
        let err = "fifo".parse::<Policy>().unwrap_err();
        assert_eq!(err, UnknownPolicy("fifo".to_string()));
    }

    #[test]
    fn policy_display_round_trips() {
        for p in [
            Policy::HighestPriorityFirst,
            Policy::ShortestRemainingTimeNext,
            Policy::RoundRobin,
        ] {
            assert_eq!(p.to_string().parse::<Policy>(), Ok(p));
        }
    }

    // ── HPF ───────────────────────────────────────────────────────────────────

    #[test]
    fn hpf_runs_the_highest_priority_ready_process() {
        let mut s = scheduler(Policy::HighestPriorityFirst, 2, 1024);
        s.step(0, vec![job(1, 0, 3, 5), job(2, 0, 3, 1)]).unwrap();
        assert_eq!(s.running().map(|p| p.id), Some(2));
    }

    #[test]
    fn hpf_never_preempts() {
        let mut s = scheduler(Policy::HighestPriorityFirst, 2, 1024);
        s.step(0, vec![job(1, 0, 4, 5)]).unwrap();
        // A higher-priority arrival must wait for the incumbent to finish.
        s.step(1, vec![job(2, 1, 2, 1)]).unwrap();
        assert_eq!(s.running().map(|p| p.id), Some(1));
        s.step(2, vec![]).unwrap();
        s.step(3, vec![]).unwrap(); // process 1 finishes at end of tick 3
        assert!(s.running().is_none());
        s.step(4, vec![]).unwrap();
        assert_eq!(s.running().map(|p| p.id), Some(2));
    }

    // ── SRTN ──────────────────────────────────────────────────────────────────

    #[test]
    fn srtn_preempts_for_strictly_shorter_arrivals() {
        let mut s = scheduler(Policy::ShortestRemainingTimeNext, 2, 1024);
        s.step(0, vec![job(1, 0, 6, 1)]).unwrap();
        s.step(1, vec![]).unwrap();
        // Remaining: p1 = 4. A 2-tick job preempts it.
        s.step(2, vec![job(2, 2, 2, 1)]).unwrap();
        assert_eq!(s.running().map(|p| p.id), Some(2));
        assert_eq!(s.ready_len(), 1);
    }

    #[test]
    fn srtn_keeps_the_incumbent_on_equal_remaining() {
        let mut s = scheduler(Policy::ShortestRemainingTimeNext, 2, 1024);
        s.step(0, vec![job(1, 0, 4, 1)]).unwrap();
        s.step(1, vec![]).unwrap();
        // Remaining: p1 = 2. An equal 2-tick job must not preempt.
        s.step(2, vec![job(2, 2, 2, 1)]).unwrap();
        assert_eq!(s.running().map(|p| p.id), Some(1));
    }

    #[test]
    fn srtn_preempted_process_resumes_after_the_interloper() {
        let mut s = scheduler(Policy::ShortestRemainingTimeNext, 2, 1024);
        s.step(0, vec![job(1, 0, 6, 1)]).unwrap();
        s.step(1, vec![]).unwrap();
        s.step(2, vec![job(2, 2, 2, 1)]).unwrap();
        s.step(3, vec![]).unwrap(); // p2 finishes at end of tick 3
        s.step(4, vec![]).unwrap();
        let p1 = s.running().unwrap();
        assert_eq!(p1.id, 1);
        // Waited through ticks 2 and 3.
        assert_eq!(p1.waiting_time, 2);
    }

    // ── RR ────────────────────────────────────────────────────────────────────

    #[test]
    fn rr_rotates_on_quantum_expiry() {
        let mut s = scheduler(Policy::RoundRobin, 2, 1024);
        s.step(0, vec![job(1, 0, 4, 1), job(2, 0, 4, 1)]).unwrap();
        assert_eq!(s.running().map(|p| p.id), Some(1));
        s.step(1, vec![]).unwrap(); // quantum expires at end of tick 1
        assert!(s.running().is_none());
        s.step(2, vec![]).unwrap();
        assert_eq!(s.running().map(|p| p.id), Some(2));
        s.step(3, vec![]).unwrap();
        s.step(4, vec![]).unwrap();
        assert_eq!(s.running().map(|p| p.id), Some(1));
    }

    #[test]
    fn rr_completion_does_not_consume_the_full_quantum() {
        let mut s = scheduler(Policy::RoundRobin, 4, 1024);
        s.step(0, vec![job(1, 0, 1, 1), job(2, 0, 3, 1)]).unwrap();
        // p1 needs a single tick: the slot clears at the end of tick 0 and
        // p2 dispatches at tick 1, not at quantum boundary.
        assert!(s.running().is_none());
        s.step(1, vec![]).unwrap();
        assert_eq!(s.running().map(|p| p.id), Some(2));
    }

    #[test]
    fn rr_requeues_behind_same_tick_arrivals() {
        let mut s = scheduler(Policy::RoundRobin, 1, 1024);
        s.step(0, vec![job(1, 0, 3, 1)]).unwrap();
        // p1's slice expires at the end of tick 0 and it re-enters the queue
        // then, ahead of the tick-1 arrival: dispatch order is p1, p2.
        s.step(1, vec![job(2, 1, 2, 1)]).unwrap();
        assert_eq!(s.running().map(|p| p.id), Some(1));
        s.step(2, vec![]).unwrap();
        assert_eq!(s.running().map(|p| p.id), Some(2));
    }

    // ── Memory coupling ───────────────────────────────────────────────────────

    #[test]
    fn deferred_job_runs_once_memory_frees_up() {
        let mut s = scheduler(Policy::HighestPriorityFirst, 2, 8);
        s.step(
            0,
            vec![Job {
                id: 1,
                arrival: 0,
                runtime: 2,
                priority: 1,
                memsize: 8,
            }],
        )
        .unwrap();
        assert_eq!(s.running().map(|p| p.id), Some(1));
        // p2 is deferred (the arena is fully claimed by p1); p1 consumes its
        // last runtime unit this same tick.
        s.step(
            1,
            vec![Job {
                id: 2,
                arrival: 1,
                runtime: 1,
                priority: 1,
                memsize: 4,
            }],
        )
        .unwrap();
        assert!(s.running().is_none());
        assert!(!s.is_idle(), "a waiter keeps the scheduler non-idle");
        // Tick 2 drains the waiter, dispatches it, and its single runtime
        // unit completes within the same tick.
        s.step(2, vec![]).unwrap();
        assert!(s.is_idle());
    }

    #[test]
    fn oversized_jobs_are_dropped_not_queued() {
        let mut s = scheduler(Policy::HighestPriorityFirst, 2, 8);
        s.step(
            0,
            vec![Job {
                id: 1,
                arrival: 0,
                runtime: 2,
                priority: 1,
                memsize: 64,
            }],
        )
        .unwrap();
        assert!(s.is_idle());
        assert_eq!(s.dropped, 1);
    }
}
