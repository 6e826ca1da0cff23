/*
SPDX-License-Identifier: MIT
*/

//! The ready structure: the ordered container behind dispatch.
//!
//! One type, two shapes. The heap variants back the priority-ordered policies
//! (keyed by `priority` or by `remaining`, ties broken by arrival then id so
//! ordering is total and runs are reproducible); the FIFO variant backs
//! round-robin, where insertion order *is* the dispatch order.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};

use crate::clock::Tick;
use crate::job::Pcb;

/// Which PCB field keys the heap variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeapKey {
    /// Lowest `priority` first (highest-priority-first dispatch).
    Priority,
    /// Lowest `remaining` first (shortest-remaining-time dispatch).
    Remaining,
}

impl HeapKey {
    fn of(self, pcb: &Pcb) -> (u64, Tick, u32) {
        match self {
            HeapKey::Priority => (u64::from(pcb.priority), pcb.arrival, pcb.id),
            HeapKey::Remaining => (pcb.remaining, pcb.arrival, pcb.id),
        }
    }
}

/// Heap entry: the sort key is captured at push time. A PCB's key fields never
/// change while it sits in the structure (a preempted process is re-pushed,
/// re-keying it).
#[derive(Debug)]
struct Entry {
    key: (u64, Tick, u32),
    pcb: Pcb,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key.cmp(&other.key)
    }
}

/// Policy-shaped ready container.
#[derive(Debug)]
pub enum ReadyQueue {
    Heap {
        heap: BinaryHeap<Reverse<Entry>>,
        key: HeapKey,
    },
    Fifo(VecDeque<Pcb>),
}

impl ReadyQueue {
    /// A min-heap ordered by `key`.
    pub fn heap(key: HeapKey) -> Self {
        ReadyQueue::Heap {
            heap: BinaryHeap::new(),
            key,
        }
    }

    /// A first-in-first-out queue.
    pub fn fifo() -> Self {
        ReadyQueue::Fifo(VecDeque::new())
    }

    pub fn push(&mut self, pcb: Pcb) {
        match self {
            ReadyQueue::Heap { heap, key } => heap.push(Reverse(Entry {
                key: key.of(&pcb),
                pcb,
            })),
            ReadyQueue::Fifo(queue) => queue.push_back(pcb),
        }
    }

    pub fn pop(&mut self) -> Option<Pcb> {
        match self {
            ReadyQueue::Heap { heap, .. } => heap.pop().map(|Reverse(e)| e.pcb),
            ReadyQueue::Fifo(queue) => queue.pop_front(),
        }
    }

    pub fn peek(&self) -> Option<&Pcb> {
        match self {
            ReadyQueue::Heap { heap, .. } => heap.peek().map(|Reverse(e)| &e.pcb),
            ReadyQueue::Fifo(queue) => queue.front(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ReadyQueue::Heap { heap, .. } => heap.len(),
            ReadyQueue::Fifo(queue) => queue.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
