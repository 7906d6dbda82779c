//! Append-only sequence with stable element addresses
//!
//! Elements live in fixed-capacity data blocks grouped into superblocks.
//! Superblock `k` holds `2^(k/2)` blocks (rounded down) of `2^(k/2)`
//! elements (rounded up), so it stores exactly `2^k` elements and both the
//! block count and the block size double every two superblocks. A block is
//! allocated at its final capacity and never grows, so pushing never moves
//! an element that is already stored.

use std::fmt;
use std::ops::Index;

/// Append-only sequence with O(1) push and O(1) random access
pub struct GrowableSequence<T> {
    /// Data blocks in allocation order
    blocks: Vec<Vec<T>>,
    /// Superblock the last block belongs to
    superblock: usize,
    /// Blocks allocated so far in the current superblock
    blocks_in_superblock: usize,
    len: usize,
}

/// Element capacity of every block in `superblock`
#[inline]
fn block_capacity(superblock: usize) -> usize {
    1 << ((superblock + 1) / 2)
}

/// Number of blocks in `superblock`
#[inline]
fn superblock_block_count(superblock: usize) -> usize {
    1 << (superblock / 2)
}

/// Index of the first block of `superblock`
#[inline]
fn first_block_of(superblock: usize) -> usize {
    if superblock % 2 == 0 {
        2 * ((1 << (superblock / 2)) - 1)
    } else {
        3 * (1 << ((superblock - 1) / 2)) - 2
    }
}

/// Map an element index to `(block, offset within block)`
#[inline]
fn locate(index: usize) -> (usize, usize) {
    let n = index + 1;
    // Bit length of `n` minus one
    let superblock = (usize::BITS - 1 - n.leading_zeros()) as usize;
    let offset = n - (1 << superblock);
    let shift = (superblock + 1) / 2;
    let block = first_block_of(superblock) + (offset >> shift);
    (block, offset & ((1 << shift) - 1))
}

impl<T> GrowableSequence<T> {
    /// Create an empty sequence; nothing is allocated until the first push
    pub fn new() -> Self {
        Self {
            blocks: Vec::new(),
            superblock: 0,
            blocks_in_superblock: 0,
            len: 0,
        }
    }

    /// Append a value and return its index
    pub fn push(&mut self, value: T) -> usize {
        let full = match self.blocks.last() {
            Some(block) => block.len() >= block_capacity(self.superblock),
            None => true,
        };
        if full {
            self.allocate_block();
        }

        let index = self.len;
        if let Some(block) = self.blocks.last_mut() {
            block.push(value);
        }
        self.len += 1;
        index
    }

    /// Element at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    pub fn at(&self, index: usize) -> &T {
        assert!(
            index < self.len,
            "GrowableSequence index out of bounds: the len is {} but the index is {}",
            self.len,
            index
        );
        let (block, offset) = locate(index);
        &self.blocks[block][offset]
    }

    /// Element at `index`, or `None` when out of range
    pub fn get(&self, index: usize) -> Option<&T> {
        if index < self.len {
            Some(self.at(index))
        } else {
            None
        }
    }

    /// Last pushed element
    pub fn last(&self) -> Option<&T> {
        self.blocks.last().and_then(|block| block.last())
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total element slots reserved across all blocks
    pub fn capacity(&self) -> usize {
        if self.blocks.is_empty() {
            return 0;
        }
        // Superblocks before the current one are full: 2^k - 1 slots
        (1 << self.superblock) - 1 + self.blocks_in_superblock * block_capacity(self.superblock)
    }

    /// Number of data blocks allocated
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Iterate in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.blocks.iter().flatten()
    }

    /// Index of the first element for which `pred` is false, assuming the
    /// sequence is partitioned by `pred` (as `slice::partition_point`)
    pub fn partition_point<P: FnMut(&T) -> bool>(&self, mut pred: P) -> usize {
        let (mut low, mut high) = (0, self.len);
        while low < high {
            let mid = low + (high - low) / 2;
            if pred(self.at(mid)) {
                low = mid + 1;
            } else {
                high = mid;
            }
        }
        low
    }

    fn allocate_block(&mut self) {
        if !self.blocks.is_empty()
            && self.blocks_in_superblock >= superblock_block_count(self.superblock)
        {
            self.superblock += 1;
            self.blocks_in_superblock = 0;
        }
        self.blocks
            .push(Vec::with_capacity(block_capacity(self.superblock)));
        self.blocks_in_superblock += 1;
    }
}

impl<T> Default for GrowableSequence<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Index<usize> for GrowableSequence<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        self.at(index)
    }
}

impl<T> Extend<T> for GrowableSequence<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.push(value);
        }
    }
}

impl<T> FromIterator<T> for GrowableSequence<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut seq = Self::new();
        seq.extend(iter);
        seq
    }
}

impl<T: fmt::Debug> fmt::Debug for GrowableSequence<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_million_inserts_random_access() {
        let n = 1_000_000;
        let mut seq = GrowableSequence::new();
        for i in 0..n {
            assert_eq!(seq.push(i), i);
        }

        assert_eq!(seq.len(), n);
        for i in 0..n {
            assert_eq!(*seq.at(i), i);
        }
    }

    #[test]
    fn test_addresses_stable_across_growth() {
        let mut seq = GrowableSequence::new();
        for i in 0..100u64 {
            seq.push(i);
        }
        let before: Vec<*const u64> = (0..100).map(|i| seq.at(i) as *const u64).collect();

        for i in 100..100_000u64 {
            seq.push(i);
        }

        for (i, ptr) in before.iter().enumerate() {
            assert_eq!(seq.at(i) as *const u64, *ptr);
            assert_eq!(*seq.at(i), i as u64);
        }
    }

    // A single growing Vec would satisfy push/at too, but its reallocations
    // move every element; the block layout is what keeps addresses fixed.
    #[test]
    fn test_superblock_layout() {
        let mut seq = GrowableSequence::new();
        // Superblocks 0..=4 hold 1 + 2 + 4 + 8 + 16 elements in
        // 1 + 1 + 2 + 2 + 4 blocks.
        for i in 0..31 {
            seq.push(i);
        }
        assert_eq!(seq.block_count(), 10);
        assert_eq!(seq.capacity(), 31);

        seq.push(31);
        assert_eq!(seq.block_count(), 11);
        assert_eq!(seq.capacity(), 31 + 8);
    }

    #[test]
    fn test_locate() {
        assert_eq!(locate(0), (0, 0));
        assert_eq!(locate(1), (1, 0));
        assert_eq!(locate(2), (1, 1));
        assert_eq!(locate(3), (2, 0));
        assert_eq!(locate(5), (3, 0));
        assert_eq!(locate(6), (3, 1));
        assert_eq!(locate(7), (4, 0));
        assert_eq!(locate(14), (5, 3));
        assert_eq!(locate(15), (6, 0));
    }

    #[test]
    fn test_iter_and_get() {
        let seq: GrowableSequence<i32> = (0..50).collect();
        let collected: Vec<i32> = seq.iter().copied().collect();
        assert_eq!(collected, (0..50).collect::<Vec<_>>());
        assert_eq!(seq.get(49), Some(&49));
        assert_eq!(seq.get(50), None);
        assert_eq!(seq.last(), Some(&49));
        assert_eq!(seq[10], 10);
    }

    #[test]
    fn test_partition_point() {
        let seq: GrowableSequence<i32> = (0..100).map(|i| i * 2).collect();
        assert_eq!(seq.partition_point(|&v| v < 0), 0);
        assert_eq!(seq.partition_point(|&v| v < 51), 26);
        assert_eq!(seq.partition_point(|&v| v < 52), 26);
        assert_eq!(seq.partition_point(|&v| v < 1000), 100);

        let empty: GrowableSequence<i32> = GrowableSequence::new();
        assert_eq!(empty.partition_point(|_| true), 0);
    }

    #[test]
    fn test_empty() {
        let seq: GrowableSequence<u8> = GrowableSequence::default();
        assert!(seq.is_empty());
        assert_eq!(seq.capacity(), 0);
        assert_eq!(seq.iter().count(), 0);
        assert_eq!(seq.last(), None);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_at_out_of_range_panics() {
        let mut seq = GrowableSequence::new();
        seq.push(1);
        seq.at(1);
    }
}
