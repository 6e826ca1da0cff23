//! Memory admission control.
//!
//! [`MemoryManager`] owns the buddy arena, the table of live allocations and
//! the queue of jobs waiting for memory. Admission has three outcomes:
//!
//! * **Admitted** — a block was granted; the job may become a process.
//! * **Deferred** — no block fits *right now*; the job waits, ordered by
//!   rounded size (smallest first) then arrival. Not an error.
//! * **Rejected** — the request can *never* fit the arena; the job is
//!   dropped with a warning and does not wait.
//!
//! The waiting queue drains strictly head-first: if the smallest waiting
//! request cannot be placed, nothing behind it is tried. Skipping past the
//! head would let small latecomers starve a large early request indefinitely.

pub mod buddy;

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap};
use std::io;

use tracing::{debug, warn};

use crate::clock::Tick;
use crate::job::Job;
use crate::report::MemoryLog;

pub use buddy::{round_to_block, BuddyAllocator};

// ── Admission ─────────────────────────────────────────────────────────────────

/// Outcome of [`MemoryManager::admit`]. `Admitted` and `Rejected` hand the
/// job back to the caller; a deferred job is retained in the waiting queue.
#[derive(Debug)]
pub enum Admission {
    Admitted { job: Job, offset: u64 },
    Deferred,
    Rejected { job: Job },
}

/// One live allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    pub offset: u64,
    /// Size as requested by the job.
    pub requested: u64,
    /// Power-of-two block size actually reserved.
    pub rounded: u64,
}

// ── Waiting queue entries ─────────────────────────────────────────────────────

/// Queue entry for a memory-starved job. Ordered by `(rounded, arrival, id)`
/// so the head is always the smallest request, earliest arrival first.
#[derive(Debug)]
struct Waiter {
    rounded: u64,
    job: Job,
}

impl Waiter {
    fn key(&self) -> (u64, Tick, u32) {
        (self.rounded, self.job.arrival, self.job.id)
    }
}

impl PartialEq for Waiter {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Waiter {}

impl PartialOrd for Waiter {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Waiter {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

// ── MemoryManager ─────────────────────────────────────────────────────────────

/// Owns the buddy arena, the `id → allocation` table and the waiting queue.
///
/// Invariant: after every operation, each table entry corresponds to exactly
/// one allocated buddy block at the matching offset and rounded size.
#[derive(Debug)]
pub struct MemoryManager {
    buddy: BuddyAllocator,
    table: HashMap<u32, Allocation>,
    waiting: BinaryHeap<Reverse<Waiter>>,
    log: MemoryLog,
}

impl MemoryManager {
    /// Create a manager over a fresh arena of `arena_size` bytes (a power of
    /// two, guaranteed by the configuration layer).
    pub fn new(arena_size: u64, log: MemoryLog) -> Self {
        Self {
            buddy: BuddyAllocator::new(arena_size),
            table: HashMap::new(),
            waiting: BinaryHeap::new(),
            log,
        }
    }

    /// Arena size in bytes.
    pub fn arena_size(&self) -> u64 {
        self.buddy.total_size()
    }

    /// Size of the largest block currently obtainable from the arena.
    pub fn largest_free(&self) -> u64 {
        self.buddy.largest_free()
    }

    /// Try to grant `job` its memory.
    ///
    /// # Panics
    /// Panics if `job.id` already holds a live allocation — input ids are
    /// unique, so a duplicate here is a driver bug.
    pub fn admit(&mut self, now: Tick, job: Job) -> io::Result<Admission> {
        let rounded = round_to_block(job.memsize);
        if rounded > self.arena_size() {
            warn!(
                process = job.id,
                memsize = job.memsize,
                arena = self.arena_size(),
                "memory size {} exceeds arena; dropping process {}",
                job.memsize,
                job.id
            );
            return Ok(Admission::Rejected { job });
        }
        assert!(
            !self.table.contains_key(&job.id),
            "process {} already holds a live allocation",
            job.id
        );

        match self.buddy.allocate(rounded) {
            Some(offset) => {
                self.table.insert(
                    job.id,
                    Allocation {
                        offset,
                        requested: job.memsize,
                        rounded,
                    },
                );
                self.log.record_allocated(now, job.id, rounded, offset)?;
                Ok(Admission::Admitted { job, offset })
            }
            None => {
                debug!(
                    process = job.id,
                    rounded,
                    largest_free = self.largest_free(),
                    "no free block of the required size; job deferred"
                );
                self.waiting.push(Reverse(Waiter { rounded, job }));
                Ok(Admission::Deferred)
            }
        }
    }

    /// Release the allocation held by `id`, if any. Releasing an unknown id
    /// (or releasing twice) is a no-op.
    pub fn release(&mut self, at: Tick, id: u32) -> io::Result<()> {
        let Some(alloc) = self.table.remove(&id) else {
            debug!(process = id, "release for a process with no live allocation");
            return Ok(());
        };
        self.buddy.free(alloc.offset);
        debug!(
            process = id,
            largest_free = self.largest_free(),
            "block released"
        );
        self.log.record_freed(at, id, alloc.rounded, alloc.offset)
    }

    /// Admit as many waiting jobs as now fit, strictly head-first, and return
    /// them in admission order. Stops at the first head that cannot be placed.
    pub fn try_drain_waiters(&mut self, now: Tick) -> io::Result<Vec<Job>> {
        let mut admitted = Vec::new();
        loop {
            let rounded = match self.waiting.peek() {
                Some(Reverse(head)) => head.rounded,
                None => break,
            };
            let Some(offset) = self.buddy.allocate(rounded) else {
                break;
            };
            let Reverse(waiter) = self.waiting.pop().expect("peeked waiter vanished");
            self.table.insert(
                waiter.job.id,
                Allocation {
                    offset,
                    requested: waiter.job.memsize,
                    rounded,
                },
            );
            self.log
                .record_allocated(now, waiter.job.id, rounded, offset)?;
            admitted.push(waiter.job);
        }
        Ok(admitted)
    }

    /// Whether any job is still waiting for memory.
    pub fn has_waiters(&self) -> bool {
        !self.waiting.is_empty()
    }

    /// Number of jobs waiting for memory.
    pub fn waiting_len(&self) -> usize {
        self.waiting.len()
    }

    /// Look up the live allocation for `id`.
    pub fn allocation(&self, id: u32) -> Option<&Allocation> {
        self.table.get(&id)
    }

    /// Flush the memory trace.
    pub fn flush_log(&mut self) -> io::Result<()> {
        self.log.flush()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
