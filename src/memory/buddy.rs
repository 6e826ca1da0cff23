/*
SPDX-License-Identifier: MIT
*/

//! Buddy allocator over a power-of-two arena.
//!
//! The split tree is encoded as an implicit complete binary tree in a flat
//! array of `2N` slots (1-based heap indexing, slot 0 unused): node `i` has
//! children `2i` / `2i+1`, and a node's block size is the arena size halved
//! once per level. The tree shape is fixed by the arena size, so the array
//! encoding needs no parent pointers and no per-node offsets — both fall out
//! of the index arithmetic during descent. All walks are iterative.
//!
//! Per node, two facts are tracked:
//!
//! * `allocated` — this exact block was handed out; no allocation may be
//!   placed below it.
//! * `longest_free` — the largest block obtainable in this subtree. A fully
//!   free node reports its own size; an allocated node reports 0.
//!
//! Allocation descends left-first wherever the left subtree can satisfy the
//! request, which gives deterministic placement. Freeing recomputes
//! `longest_free` toward the root; a parent whose two children are both whole
//! and unallocated reports its full size again — that recognition *is* the
//! buddy merge, no node state needs rewriting.

/// Round a requested size up to the block size it will occupy: the smallest
/// power of two that is ≥ the request and ≥ 1.
pub fn round_to_block(size: u64) -> u64 {
    size.max(1).next_power_of_two()
}

#[derive(Debug, Clone, Copy, Default)]
struct Node {
    allocated: bool,
    longest_free: u64,
}

/// Fixed-size buddy arena.
#[derive(Debug)]
pub struct BuddyAllocator {
    /// Arena size `N`. Always a power of two.
    size: u64,
    /// `2N` slots, 1-based; slot `i`'s block size is `N >> level(i)`.
    nodes: Vec<Node>,
}

impl BuddyAllocator {
    /// Create an arena of `size` bytes.
    ///
    /// # Panics
    /// Panics unless `size` is a positive power of two (the configuration
    /// layer guarantees this before construction).
    pub fn new(size: u64) -> Self {
        assert!(
            size.is_power_of_two(),
            "buddy arena size must be a positive power of two, got {size}"
        );
        let mut nodes = vec![Node::default(); (2 * size) as usize];
        // Every block starts wholly free: longest_free == own size.
        let mut block = size;
        let mut idx = 1usize;
        while idx < nodes.len() {
            let level_end = idx * 2;
            while idx < level_end {
                nodes[idx].longest_free = block;
                idx += 1;
            }
            block /= 2;
        }
        Self { size, nodes }
    }

    /// Arena size `N`.
    pub fn total_size(&self) -> u64 {
        self.size
    }

    /// Size of the largest block an `allocate` call could currently return.
    pub fn largest_free(&self) -> u64 {
        self.nodes[1].longest_free
    }

    /// Allocate a block for `size` bytes (rounded up to a power of two).
    ///
    /// Returns the block's offset, or `None` when no block of the rounded
    /// size is free — a negative result, not an error.
    pub fn allocate(&mut self, size: u64) -> Option<u64> {
        let want = round_to_block(size);
        if want > self.size || self.nodes[1].longest_free < want {
            return None;
        }

        // Descend to a wholly free node of exactly `want` bytes, preferring
        // the left child whenever it can satisfy the request.
        let mut idx = 1usize;
        let mut block = self.size;
        let mut offset = 0u64;
        while block > want {
            block /= 2;
            idx *= 2;
            if self.nodes[idx].longest_free < want {
                idx += 1;
                offset += block;
            }
        }
        debug_assert_eq!(self.nodes[idx].longest_free, want);

        self.nodes[idx].allocated = true;
        self.nodes[idx].longest_free = 0;
        self.recompute_ancestors(idx, block);
        Some(offset)
    }

    /// Free the block previously returned for `offset`.
    ///
    /// Freeing an offset with no live allocation (including a repeated free)
    /// is a no-op.
    pub fn free(&mut self, offset: u64) {
        if offset >= self.size {
            return;
        }

        // Walk down to the unique allocated node starting at `offset`. An
        // allocated mark forbids allocations below it, so the first allocated
        // node on the path is the only candidate.
        let mut idx = 1usize;
        let mut block = self.size;
        let mut node_off = 0u64;
        loop {
            if self.nodes[idx].allocated {
                if node_off != offset {
                    return; // interior of a live block, not an allocation start
                }
                break;
            }
            if block == 1 {
                return; // free leaf: nothing allocated at this offset
            }
            block /= 2;
            idx *= 2;
            if offset >= node_off + block {
                idx += 1;
                node_off += block;
            }
        }

        self.nodes[idx].allocated = false;
        self.nodes[idx].longest_free = block;
        self.recompute_ancestors(idx, block);
    }

    /// Recompute `longest_free` for every ancestor of node `idx` (whose block
    /// size is `block`). A parent with both children whole and unallocated is
    /// itself whole again — the buddy merge.
    fn recompute_ancestors(&mut self, mut idx: usize, mut block: u64) {
        while idx > 1 {
            idx /= 2;
            block *= 2;
            let left = self.nodes[2 * idx];
            let right = self.nodes[2 * idx + 1];
            let child = block / 2;
            let whole = !left.allocated
                && !right.allocated
                && left.longest_free == child
                && right.longest_free == child;
            self.nodes[idx].longest_free = if whole {
                block
            } else {
                left.longest_free.max(right.longest_free)
            };
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── round_to_block ────────────────────────────────────────────────────────

    #[test]
    fn round_to_block_rounds_up_to_powers_of_two() {
        assert_eq!(round_to_block(1), 1);
        assert_eq!(round_to_block(2), 2);
        assert_eq!(round_to_block(3), 4);
        assert_eq!(round_to_block(5), 8);
        assert_eq!(round_to_block(8), 8);
        assert_eq!(round_to_block(1000), 1024);
    }

    #[test]
    fn round_to_block_zero_becomes_one() {
        assert_eq!(round_to_block(0), 1);
    }

    // ── allocate ──────────────────────────────────────────────────────────────

    #[test]
    fn left_first_placement_is_deterministic() {
        let mut buddy = BuddyAllocator::new(16);
        assert_eq!(buddy.allocate(4), Some(0));
        assert_eq!(buddy.allocate(4), Some(4));
        assert_eq!(buddy.allocate(8), Some(8));
        assert_eq!(buddy.allocate(1), None); // arena full
    }

    #[test]
    fn requests_are_rounded_before_placement() {
        let mut buddy = BuddyAllocator::new(16);
        // 3 → 4-byte block; the next 4-byte block starts at 4, not 3.
        assert_eq!(buddy.allocate(3), Some(0));
        assert_eq!(buddy.allocate(3), Some(4));
    }

    #[test]
    fn oversized_request_fails() {
        let mut buddy = BuddyAllocator::new(16);
        assert_eq!(buddy.allocate(17), None);
        assert_eq!(buddy.allocate(32), None);
    }

    #[test]
    fn whole_arena_allocation_requires_empty_arena() {
        let mut buddy = BuddyAllocator::new(16);
        assert_eq!(buddy.allocate(1), Some(0));
        assert_eq!(buddy.allocate(16), None);
        buddy.free(0);
        assert_eq!(buddy.allocate(16), Some(0));
    }

    #[test]
    fn offsets_are_multiples_of_the_rounded_size() {
        let mut buddy = BuddyAllocator::new(64);
        let mut seen = Vec::new();
        for req in [1u64, 7, 2, 16, 3] {
            let rounded = round_to_block(req);
            let off = buddy.allocate(req).unwrap();
            assert_eq!(off % rounded, 0, "offset {off} not aligned to {rounded}");
            seen.push((off, rounded));
        }
        // No two live blocks overlap.
        for (i, &(a_off, a_len)) in seen.iter().enumerate() {
            for &(b_off, b_len) in &seen[i + 1..] {
                assert!(
                    a_off + a_len <= b_off || b_off + b_len <= a_off,
                    "blocks [{a_off},{}) and [{b_off},{}) overlap",
                    a_off + a_len,
                    b_off + b_len
                );
            }
        }
    }

    #[test]
    fn minimum_leaf_blocks_can_fill_the_arena() {
        let mut buddy = BuddyAllocator::new(4);
        for expected in 0..4 {
            assert_eq!(buddy.allocate(1), Some(expected));
        }
        assert_eq!(buddy.allocate(1), None);
    }

    // ── free / merge ──────────────────────────────────────────────────────────

    #[test]
    fn alloc_free_round_trip_restores_the_root() {
        let mut buddy = BuddyAllocator::new(32);
        let off = buddy.allocate(5).unwrap();
        assert!(buddy.largest_free() < 32);
        buddy.free(off);
        assert_eq!(buddy.largest_free(), 32);
    }

    #[test]
    fn buddies_merge_back_into_larger_blocks() {
        // Arena 16: 4@0, 4@4, 8@8, then free everything — the root must be
        // whole again and a 16-byte allocation must succeed at offset 0.
        let mut buddy = BuddyAllocator::new(16);
        let a = buddy.allocate(4).unwrap();
        let b = buddy.allocate(4).unwrap();
        let c = buddy.allocate(8).unwrap();
        assert_eq!((a, b, c), (0, 4, 8));

        buddy.free(a);
        buddy.free(b);
        buddy.free(c);
        assert_eq!(buddy.largest_free(), 16);
        assert_eq!(buddy.allocate(16), Some(0));
    }

    #[test]
    fn partial_merge_only_exposes_the_merged_half() {
        let mut buddy = BuddyAllocator::new(16);
        let a = buddy.allocate(4).unwrap();
        let _b = buddy.allocate(4).unwrap();
        let _c = buddy.allocate(8).unwrap();
        buddy.free(a);
        // Only the first 4-byte block is free; no 8-byte block exists.
        assert_eq!(buddy.largest_free(), 4);
        assert_eq!(buddy.allocate(8), None);
        assert_eq!(buddy.allocate(4), Some(0));
    }

    #[test]
    fn double_free_is_a_no_op() {
        let mut buddy = BuddyAllocator::new(16);
        let a = buddy.allocate(4).unwrap();
        let b = buddy.allocate(4).unwrap();
        buddy.free(a);
        buddy.free(a);
        buddy.free(a);
        // b must still be live: the repeated frees must not have released it
        // or merged its buddy away.
        assert_eq!(buddy.largest_free(), 8);
        buddy.free(b);
        assert_eq!(buddy.largest_free(), 16);
    }

    #[test]
    fn freeing_an_unknown_offset_is_a_no_op() {
        let mut buddy = BuddyAllocator::new(16);
        let _a = buddy.allocate(8).unwrap();
        buddy.free(3); // interior of the live block
        buddy.free(12); // free region
        buddy.free(400); // outside the arena
        assert_eq!(buddy.largest_free(), 8);
    }

    #[test]
    fn freed_block_is_reused_before_deeper_splits() {
        let mut buddy = BuddyAllocator::new(16);
        let a = buddy.allocate(4).unwrap();
        let _b = buddy.allocate(4).unwrap();
        buddy.free(a);
        // Left-first descent lands on the freed block again.
        assert_eq!(buddy.allocate(4), Some(0));
    }
}
