/// Fixed-length bit-vector backed by `u64` words.
///
/// Used as a per-ray "already tested" marker: one bit per primitive (or per piece of a
/// primitive). `clear()` is cheap relative to reallocating, so a vector is sized once and reused
/// for many rays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitVec {
    words: Vec<u64>,
    len: usize,
}

const WORD_BITS: usize = 64;

impl BitVec {
    /// Creates a vector of `len` bits, all cleared.
    pub fn new(len: usize) -> Self {
        BitVec {
            words: vec![0; (len + WORD_BITS - 1) / WORD_BITS],
            len,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the bit at `i`. Out-of-range indices read as cleared.
    pub fn test(&self, i: usize) -> bool {
        if i >= self.len {
            return false;
        }
        self.words[i / WORD_BITS] & (1u64 << (i % WORD_BITS)) != 0
    }

    /// Sets the bit at `i`; panics if `i` is out of range.
    pub fn set(&mut self, i: usize) {
        assert!(i < self.len, "bit {} out of range for BitVec of {}", i, self.len);
        self.words[i / WORD_BITS] |= 1u64 << (i % WORD_BITS);
    }

    /// Clears all bits.
    pub fn clear(&mut self) {
        self.words.iter_mut().for_each(|w| *w = 0);
    }

    /// Resizes to `len` bits and clears all of them.
    pub fn reset(&mut self, len: usize) {
        self.words.clear();
        self.words.resize((len + WORD_BITS - 1) / WORD_BITS, 0);
        self.len = len;
    }

    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Iterates over the indices of set bits, in increasing order.
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(wi, &word)| {
            let mut w = word;
            std::iter::from_fn(move || {
                if w == 0 {
                    return None;
                }
                let bit = w.trailing_zeros() as usize;
                w &= w - 1;
                Some(wi * WORD_BITS + bit)
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::BitVec;

    #[test]
    fn set_test_clear() {
        let mut bv = BitVec::new(130);
        assert_eq!(bv.len(), 130);
        assert!(!bv.test(0));
        bv.set(0);
        bv.set(64);
        bv.set(129);
        assert!(bv.test(0) && bv.test(64) && bv.test(129));
        assert!(!bv.test(1) && !bv.test(63) && !bv.test(128));
        assert_eq!(bv.count_ones(), 3);
        assert_eq!(bv.iter_ones().collect::<Vec<_>>(), vec![0, 64, 129]);
        bv.clear();
        assert_eq!(bv.count_ones(), 0);
        assert_eq!(bv.len(), 130);
    }

    #[test]
    fn out_of_range_reads_as_clear() {
        let bv = BitVec::new(3);
        assert!(!bv.test(3));
        assert!(!bv.test(1000));
    }

    #[test]
    #[should_panic]
    fn set_out_of_range_panics() {
        let mut bv = BitVec::new(3);
        bv.set(3);
    }

    #[test]
    fn reset_changes_length() {
        let mut bv = BitVec::new(4);
        bv.set(2);
        bv.reset(200);
        assert_eq!(bv.len(), 200);
        assert_eq!(bv.count_ones(), 0);
        bv.set(199);
        assert!(bv.test(199));
    }
}
