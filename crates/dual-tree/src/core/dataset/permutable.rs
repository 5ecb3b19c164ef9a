//! A collection whose elements can be permuted in-place.

/// A collection whose elements can be permuted in-place.
///
/// Tree construction reorders a `PointSet` so that every node covers a
/// contiguous range. Per-query outputs computed in that reordered space are
/// mapped back through the same trait.
pub trait Permutable {
    /// Swaps the location of two items in the collection.
    ///
    /// # Arguments
    ///
    /// * `i` - An index in the collection.
    /// * `j` - An index in the collection.
    fn swap_two(&mut self, i: usize, j: usize);

    /// Permutes the collection in-place so that the item now at position
    /// `i` is the one that was at position `permutation[i]`.
    ///
    /// # Arguments
    ///
    /// * `permutation` - A permutation of the indices of the collection.
    fn permute(&mut self, permutation: &[usize]) {
        // The `source_index` represents the index that we will swap to
        let mut source_index: usize;

        // INVARIANT: After each iteration of the loop, the elements of the
        // sub-array [0..i] are in the correct position.
        for i in 0..permutation.len().saturating_sub(1) {
            source_index = permutation[i];

            // Follow the cycle until we reach an index to the right of `i`.
            // Everything to the left of `i` is already in place, so the
            // position we land on holds the item that belongs at `i`.
            while source_index < i {
                source_index = permutation[source_index];
            }

            if source_index != i {
                self.swap_two(source_index, i);
            }
        }
    }
}

impl<T> Permutable for Vec<T> {
    fn swap_two(&mut self, i: usize, j: usize) {
        self.swap(i, j);
    }
}

impl<T> Permutable for &mut [T] {
    fn swap_two(&mut self, i: usize, j: usize) {
        self.swap(i, j);
    }
}

#[cfg(test)]
mod tests {
    use super::Permutable;

    #[test]
    fn permute_gathers() {
        let mut items = vec!['a', 'b', 'c', 'd', 'e'];
        let permutation = [3, 0, 4, 1, 2];
        items.permute(&permutation);
        assert_eq!(items, vec!['d', 'a', 'e', 'b', 'c']);
    }

    #[test]
    fn permute_empty_and_single() {
        let mut empty: Vec<u8> = Vec::new();
        empty.permute(&[]);
        assert!(empty.is_empty());

        let mut single = vec![7];
        single.permute(&[0]);
        assert_eq!(single, vec![7]);
    }
}
