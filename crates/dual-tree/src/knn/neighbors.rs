//! A bounded, sorted list of nearest-neighbor candidates.

/// The `k` closest candidates seen so far for one query point.
///
/// Candidates are kept sorted by distance, nearest first. Among equal
/// distances the earlier candidate is kept.
#[derive(Debug, Clone, PartialEq)]
pub struct NeighborList {
    /// The maximum number of candidates.
    k: usize,
    /// `(reference index, distance)` pairs, sorted by distance.
    items: Vec<(usize, f64)>,
}

impl NeighborList {
    /// Creates an empty list that holds at most `k` candidates.
    #[must_use]
    pub fn new(k: usize) -> Self {
        Self {
            k,
            items: Vec::with_capacity(k + 1),
        }
    }

    /// The maximum number of candidates.
    #[must_use]
    pub const fn k(&self) -> usize {
        self.k
    }

    /// Offers a candidate, keeping the list sorted and truncated to `k`.
    ///
    /// Returns whether the candidate was kept.
    pub fn push(&mut self, index: usize, distance: f64) -> bool {
        if self.k == 0 || (self.is_full() && distance >= self.kth_distance()) {
            return false;
        }
        let position = self.items.partition_point(|&(_, d)| d <= distance);
        self.items.insert(position, (index, distance));
        self.items.truncate(self.k);
        true
    }

    /// The distance to the `k`-th candidate, or infinity if there are fewer
    /// than `k` candidates.
    #[must_use]
    pub fn kth_distance(&self) -> f64 {
        if self.is_full() {
            self.items.last().map_or(f64::INFINITY, |&(_, d)| d)
        } else {
            f64::INFINITY
        }
    }

    /// Whether the list holds `k` candidates.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.items.len() == self.k
    }

    /// The number of candidates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the list holds no candidates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The candidates, nearest first.
    #[must_use]
    pub fn as_slice(&self) -> &[(usize, f64)] {
        &self.items
    }

    /// Consumes the list and returns the candidates, nearest first.
    #[must_use]
    pub fn into_vec(self) -> Vec<(usize, f64)> {
        self.items
    }
}
