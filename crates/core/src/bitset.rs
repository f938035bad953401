//! Word-packed bit vector marking active or matching rows.

use alloc::vec;
use alloc::vec::Vec;

/// A fixed-capacity bit vector.
///
/// Bits are stored little-endian within each `u64` word:
/// - bit 0 is the LSB of word 0
/// - bit 63 is the MSB of word 0
///
/// Bits past `len` in the last word are always zero.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BitSet {
    words: Vec<u64>,
    len: usize,
}

impl BitSet {
    /// Creates a bit set of `len` cleared bits.
    pub fn new(len: usize) -> Self {
        Self {
            words: vec![0u64; (len + 63) / 64],
            len,
        }
    }

    /// Creates a bit set of `len` set bits.
    pub fn full(len: usize) -> Self {
        let mut set = Self {
            words: vec![u64::MAX; (len + 63) / 64],
            len,
        };
        set.mask_tail();
        set
    }

    /// Creates a bit set with the given indices set.
    pub fn from_indices(len: usize, indices: impl IntoIterator<Item = usize>) -> Self {
        let mut set = Self::new(len);
        for i in indices {
            set.set(i);
        }
        set
    }

    /// Capacity in bits.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of set bits.
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    #[inline]
    pub fn get(&self, index: usize) -> bool {
        debug_assert!(index < self.len, "BitSet index out of bounds");
        (self.words[index / 64] >> (index % 64)) & 1 == 1
    }

    #[inline]
    pub fn set(&mut self, index: usize) {
        debug_assert!(index < self.len, "BitSet index out of bounds");
        self.words[index / 64] |= 1u64 << (index % 64);
    }

    #[inline]
    pub fn clear(&mut self, index: usize) {
        debug_assert!(index < self.len, "BitSet index out of bounds");
        self.words[index / 64] &= !(1u64 << (index % 64));
    }

    /// Returns the first set bit at or after `from`.
    pub fn next(&self, from: usize) -> Option<usize> {
        if from >= self.len {
            return None;
        }
        let mut word_idx = from / 64;
        let mut word = self.words[word_idx] & (u64::MAX << (from % 64));
        loop {
            if word != 0 {
                return Some(word_idx * 64 + word.trailing_zeros() as usize);
            }
            word_idx += 1;
            if word_idx >= self.words.len() {
                return None;
            }
            word = self.words[word_idx];
        }
    }

    /// Iterates set bits in ascending order.
    pub fn iter(&self) -> Ones<'_> {
        Ones {
            set: self,
            word_idx: 0,
            word: self.words.first().copied().unwrap_or(0),
        }
    }

    /// Visits every set bit in ascending order.
    pub fn scan<F: FnMut(usize)>(&self, mut visit: F) {
        for i in self.iter() {
            visit(i);
        }
    }

    /// Returns the intersection of two sets of equal length.
    pub fn and(&self, other: &BitSet) -> BitSet {
        debug_assert_eq!(self.len, other.len, "BitSet length mismatch");
        let words = self
            .words
            .iter()
            .zip(other.words.iter())
            .map(|(a, b)| a & b)
            .collect();
        BitSet {
            words,
            len: self.len,
        }
    }

    /// Returns the union of two sets of equal length.
    pub fn or(&self, other: &BitSet) -> BitSet {
        debug_assert_eq!(self.len, other.len, "BitSet length mismatch");
        let words = self
            .words
            .iter()
            .zip(other.words.iter())
            .map(|(a, b)| a | b)
            .collect();
        BitSet {
            words,
            len: self.len,
        }
    }

    /// Returns the complement.
    pub fn not(&self) -> BitSet {
        let mut set = BitSet {
            words: self.words.iter().map(|w| !w).collect(),
            len: self.len,
        };
        set.mask_tail();
        set
    }

    fn mask_tail(&mut self) {
        let rem = self.len % 64;
        if rem != 0 {
            if let Some(last) = self.words.last_mut() {
                *last &= (1u64 << rem) - 1;
            }
        }
    }
}

/// Iterator over the set bits of a `BitSet`.
pub struct Ones<'a> {
    set: &'a BitSet,
    word_idx: usize,
    word: u64,
}

impl Iterator for Ones<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        loop {
            if self.word != 0 {
                let bit = self.word.trailing_zeros() as usize;
                self.word &= self.word - 1;
                return Some(self.word_idx * 64 + bit);
            }
            self.word_idx += 1;
            if self.word_idx >= self.set.words.len() {
                return None;
            }
            self.word = self.set.words[self.word_idx];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    #[test]
    fn test_set_and_get() {
        let mut bits = BitSet::new(130);
        bits.set(0);
        bits.set(64);
        bits.set(129);
        assert!(bits.get(0));
        assert!(bits.get(64));
        assert!(bits.get(129));
        assert!(!bits.get(1));
        assert_eq!(bits.count(), 3);

        bits.clear(64);
        assert!(!bits.get(64));
        assert_eq!(bits.count(), 2);
    }

    #[test]
    fn test_full_and_not() {
        let bits = BitSet::full(70);
        assert_eq!(bits.count(), 70);
        let none = bits.not();
        assert_eq!(none.count(), 0);
        assert_eq!(none.not(), bits);
    }

    #[test]
    fn test_and_or() {
        let a = BitSet::from_indices(10, [1, 3, 5]);
        let b = BitSet::from_indices(10, [3, 4, 5]);
        assert_eq!(a.and(&b).iter().collect::<Vec<_>>(), [3, 5]);
        assert_eq!(a.or(&b).iter().collect::<Vec<_>>(), [1, 3, 4, 5]);
    }

    #[test]
    fn test_next_and_scan() {
        let bits = BitSet::from_indices(200, [2, 63, 64, 199]);
        assert_eq!(bits.next(0), Some(2));
        assert_eq!(bits.next(3), Some(63));
        assert_eq!(bits.next(65), Some(199));
        assert_eq!(bits.next(200), None);

        let mut seen = Vec::new();
        bits.scan(|i| seen.push(i));
        assert_eq!(seen, [2, 63, 64, 199]);
    }

    #[test]
    fn test_empty() {
        let bits = BitSet::new(0);
        assert!(bits.is_empty());
        assert_eq!(bits.iter().count(), 0);
        assert_eq!(bits.not().count(), 0);
    }
}
