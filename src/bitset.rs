//! Fixed-width taxon bitsets.
//!
//! # Overview
//! Every bipartition is stored as the set of taxa on one side of an edge.
//! Bit `i` corresponds to taxon index `i` of the run's
//! [`TaxonRegistry`](crate::taxa::TaxonRegistry), so all bitsets of one run
//! share the same width and the same meaning per bit.
//!
//! # Example
//! With taxa [A, B, C, D] registered as [0, 1, 2, 3]:
//! - Side {A, C} → `0b0101`
//! - Side {B, C, D} → `0b1110`

/// A compact set of taxon indices.
///
/// Bits are packed into `u64` words, 64 taxa per word. Bits beyond the
/// universe size are always zero, so two bitsets over the same universe
/// compare and hash equal exactly when they hold the same taxa.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Bitset(pub Vec<u64>);

impl Bitset {
    /// Number of words needed to hold `num_taxa` bits.
    #[inline]
    pub fn words_for(num_taxa: usize) -> usize {
        num_taxa.div_ceil(64)
    }

    /// Creates an empty bitset of `words` words.
    ///
    /// ```
    /// # use posterior_tree_distances::bitset::Bitset;
    /// let bs = Bitset::zeros(Bitset::words_for(100));
    /// assert_eq!(bs.0.len(), 2);
    /// assert!(bs.is_empty());
    /// ```
    pub fn zeros(words: usize) -> Self {
        Bitset(vec![0u64; words])
    }

    /// Creates the bitset holding every taxon in `0..num_taxa`.
    pub fn full(num_taxa: usize) -> Self {
        let mut bs = Bitset::zeros(Self::words_for(num_taxa));
        for (w, word) in bs.0.iter_mut().enumerate() {
            let remaining = num_taxa - w * 64;
            *word = if remaining >= 64 {
                u64::MAX
            } else {
                (1u64 << remaining) - 1
            };
        }
        bs
    }

    /// Adds taxon `idx`.
    ///
    /// ```
    /// # use posterior_tree_distances::bitset::Bitset;
    /// let mut bs = Bitset::zeros(1);
    /// bs.set(0);
    /// bs.set(5);
    /// assert_eq!(bs.0[0], 0b00100001);
    /// ```
    #[inline]
    pub fn set(&mut self, idx: usize) {
        self.0[idx >> 6] |= 1u64 << (idx & 63);
    }

    #[inline]
    pub fn contains(&self, idx: usize) -> bool {
        self.0
            .get(idx >> 6)
            .is_some_and(|w| w & (1u64 << (idx & 63)) != 0)
    }

    /// In-place union: `self = self ∪ other`.
    ///
    /// ```
    /// # use posterior_tree_distances::bitset::Bitset;
    /// let mut left = Bitset::zeros(1);
    /// left.set(0);
    /// let mut right = Bitset::zeros(1);
    /// right.set(1);
    /// left.or_assign(&right);
    /// assert_eq!(left.0[0], 0b11);
    /// ```
    #[inline]
    pub fn or_assign(&mut self, other: &Bitset) {
        for (a, b) in self.0.iter_mut().zip(&other.0) {
            *a |= *b;
        }
    }

    /// The other side of the split within a universe of `num_taxa` taxa.
    ///
    /// ```
    /// # use posterior_tree_distances::bitset::Bitset;
    /// let mut ab = Bitset::zeros(1);
    /// ab.set(0);
    /// ab.set(1);
    /// assert_eq!(ab.complement(4).0[0], 0b1100);
    /// ```
    pub fn complement(&self, num_taxa: usize) -> Bitset {
        let mut out = Bitset::full(num_taxa);
        for (a, b) in out.0.iter_mut().zip(&self.0) {
            *a &= !*b;
        }
        out
    }

    /// Number of taxa in the set.
    #[inline]
    pub fn count_ones(&self) -> usize {
        self.0.iter().map(|w| w.count_ones() as usize).sum()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|w| *w == 0)
    }
}
