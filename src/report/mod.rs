//! Simulation output surfaces.
//!
//! Three artifacts are produced per run, each overwritten, each with a
//! byte-exact line format:
//!
//! * the **event log** (`scheduler.log`) — one line per process state
//!   transition, written by [`Accountant`];
//! * the **performance summary** (`scheduler.perf`) — four lines, rendered
//!   from [`Summary`];
//! * the **memory trace** (`memory.log`) — one line per allocator event,
//!   written by [`MemoryLog`].
//!
//! These files are the product surface and are written directly; `tracing`
//! carries the diagnostic mirror of the same events.

use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use tracing::debug;

use crate::clock::Tick;
use crate::job::Pcb;

// ── Transitions ───────────────────────────────────────────────────────────────

/// The four observable process state transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// First dispatch of a process.
    Started,
    /// Any dispatch after the first.
    Resumed,
    /// Preemption or quantum expiry with runtime still owed.
    Stopped,
    /// Last runtime unit consumed.
    Finished,
}

impl Transition {
    fn as_str(self) -> &'static str {
        match self {
            Transition::Started => "started",
            Transition::Resumed => "resumed",
            Transition::Stopped => "stopped",
            Transition::Finished => "finished",
        }
    }
}

// ── Accountant ────────────────────────────────────────────────────────────────

/// Per-process results captured at completion, from which the summary is
/// computed.
#[derive(Debug, Clone, PartialEq)]
struct FinishedProcess {
    waiting: u64,
    turnaround: u64,
    weighted_turnaround: f64,
}

/// Event log writer plus the completion bookkeeping behind the run summary.
pub struct Accountant {
    out: Box<dyn Write>,
    finished: Vec<FinishedProcess>,
    busy_ticks: u64,
}

impl Accountant {
    /// Wrap a writer and emit the event log header.
    pub fn new(mut out: Box<dyn Write>) -> io::Result<Self> {
        writeln!(out, "#At time x process y state arr w total z remain y wait k")?;
        Ok(Self {
            out,
            finished: Vec::new(),
            busy_ticks: 0,
        })
    }

    /// Open (truncating) the event log file at `path`.
    pub fn create(path: &Path) -> io::Result<Self> {
        let file = BufWriter::new(File::create(path)?);
        Self::new(Box::new(file))
    }

    /// Append one transition line.
    ///
    /// A `Finished` transition additionally records the process's turnaround
    /// metrics for the summary; `pcb.finish_time` must already be set.
    pub fn record_transition(
        &mut self,
        time: Tick,
        pcb: &Pcb,
        transition: Transition,
    ) -> io::Result<()> {
        debug!(
            tick = time,
            process = pcb.id,
            state = transition.as_str(),
            remain = pcb.remaining,
            wait = pcb.waiting_time,
            "process transition"
        );
        match transition {
            Transition::Finished => {
                let ta = pcb
                    .turnaround()
                    .expect("finished transition for a process with no finish time");
                let wta = pcb
                    .weighted_turnaround()
                    .expect("finished transition for a process with no finish time");
                writeln!(
                    self.out,
                    "At time {} process {} finished arr {} total {} remain 0 wait {} TA {} WTA {:.2}",
                    time, pcb.id, pcb.arrival, pcb.runtime, pcb.waiting_time, ta, wta
                )?;
                self.finished.push(FinishedProcess {
                    waiting: pcb.waiting_time,
                    turnaround: ta,
                    weighted_turnaround: wta,
                });
            }
            other => {
                writeln!(
                    self.out,
                    "At time {} process {} {} arr {} total {} remain {} wait {}",
                    time,
                    pcb.id,
                    other.as_str(),
                    pcb.arrival,
                    pcb.runtime,
                    pcb.remaining,
                    pcb.waiting_time
                )?;
            }
        }
        Ok(())
    }

    /// Count one tick during which a process held the CPU.
    pub fn charge_busy_tick(&mut self) {
        self.busy_ticks += 1;
    }

    /// Number of processes that have completed so far.
    pub fn finished_count(&self) -> usize {
        self.finished.len()
    }

    /// Flush the event log.
    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    /// Compute the run summary over all finished processes.
    ///
    /// `total_ticks` is the clock value at termination. With no finished
    /// processes the averages are 0 (the utilization still reflects any
    /// elapsed ticks).
    pub fn summary(&self, total_ticks: Tick) -> Summary {
        let cpu_utilization = if total_ticks == 0 {
            0.0
        } else {
            100.0 * self.busy_ticks as f64 / total_ticks as f64
        };

        if self.finished.is_empty() {
            return Summary {
                cpu_utilization,
                avg_wta: 0.0,
                avg_waiting: 0.0,
                std_wta: 0.0,
            };
        }

        let n = self.finished.len() as f64;
        let avg_wta = self
            .finished
            .iter()
            .map(|p| p.weighted_turnaround)
            .sum::<f64>()
            / n;
        let avg_waiting = self.finished.iter().map(|p| p.waiting as f64).sum::<f64>() / n;
        // Population standard deviation of WTA.
        let variance = self
            .finished
            .iter()
            .map(|p| {
                let d = p.weighted_turnaround - avg_wta;
                d * d
            })
            .sum::<f64>()
            / n;

        Summary {
            cpu_utilization,
            avg_wta,
            avg_waiting,
            std_wta: variance.sqrt(),
        }
    }
}

impl fmt::Debug for Accountant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accountant")
            .field("finished", &self.finished.len())
            .field("busy_ticks", &self.busy_ticks)
            .finish_non_exhaustive()
    }
}

// ── Summary ───────────────────────────────────────────────────────────────────

/// The four figures of the performance file.
///
/// `Display` renders the exact `scheduler.perf` content.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    /// `100 · busy_ticks / total_ticks`.
    pub cpu_utilization: f64,
    /// Mean weighted turnaround over finished processes.
    pub avg_wta: f64,
    /// Mean waiting time over finished processes.
    pub avg_waiting: f64,
    /// Population standard deviation of the weighted turnaround.
    pub std_wta: f64,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "CPU utilization = {:.2}%", self.cpu_utilization)?;
        writeln!(f, "Avg WTA = {:.2}", self.avg_wta)?;
        writeln!(f, "Avg Waiting = {:.2}", self.avg_waiting)?;
        writeln!(f, "Std WTA = {:.2}", self.std_wta)
    }
}

// ── MemoryLog ─────────────────────────────────────────────────────────────────

/// Allocation / deallocation trace writer.
pub struct MemoryLog {
    out: Box<dyn Write>,
}

impl MemoryLog {
    /// Wrap a writer and emit the trace header.
    pub fn new(mut out: Box<dyn Write>) -> io::Result<Self> {
        writeln!(out, "#At time x allocated y bytes for process z from i to j")?;
        Ok(Self { out })
    }

    /// Open (truncating) the memory trace file at `path`.
    pub fn create(path: &Path) -> io::Result<Self> {
        let file = BufWriter::new(File::create(path)?);
        Self::new(Box::new(file))
    }

    /// Record a granted allocation. `size` is the rounded block size.
    pub fn record_allocated(
        &mut self,
        time: Tick,
        process: u32,
        size: u64,
        offset: u64,
    ) -> io::Result<()> {
        debug!(tick = time, process, size, offset, "memory allocated");
        writeln!(
            self.out,
            "At time {} allocated {} bytes for process {} from {} to {}",
            time,
            size,
            process,
            offset,
            offset + size - 1
        )
    }

    /// Record a released allocation. `size` is the rounded block size.
    pub fn record_freed(
        &mut self,
        time: Tick,
        process: u32,
        size: u64,
        offset: u64,
    ) -> io::Result<()> {
        debug!(tick = time, process, size, offset, "memory freed");
        writeln!(
            self.out,
            "At time {} freed {} bytes from process {} from {} to {}",
            time,
            size,
            process,
            offset,
            offset + size - 1
        )
    }

    /// Flush the trace.
    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

impl fmt::Debug for MemoryLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryLog").finish_non_exhaustive()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
