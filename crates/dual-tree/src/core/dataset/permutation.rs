//! The index mapping produced by physically reordering a `PointSet`.

use serde::{Deserialize, Serialize};

use crate::{Result, TreeError};

use super::Permutable;

/// The index mapping produced by reordering a `PointSet` during tree
/// construction.
///
/// `old_from_new[i]` is the original index of the point now stored at
/// position `i`, and `new_from_old` is its inverse. Both always form a
/// bijection on `0..n`.
///
/// # Example
///
/// ```rust
/// use dual_tree::Permutation;
///
/// let permutation = Permutation::from_old_from_new(vec![2, 0, 1]).unwrap();
/// assert_eq!(permutation.new_from_old(), &[1, 2, 0]);
///
/// // Outputs computed in the reordered space go back to the original order.
/// let reordered = vec!["c", "a", "b"];
/// assert_eq!(permutation.to_original(reordered).unwrap(), vec!["a", "b", "c"]);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPermutation")]
pub struct Permutation {
    /// The original index of the point at each reordered position.
    old_from_new: Vec<usize>,
    /// The reordered position of the point at each original index.
    new_from_old: Vec<usize>,
}

/// Both halves of a `Permutation` as they come out of a deserializer.
#[derive(Deserialize)]
struct RawPermutation {
    old_from_new: Vec<usize>,
    new_from_old: Vec<usize>,
}

impl TryFrom<RawPermutation> for Permutation {
    type Error = TreeError;

    fn try_from(raw: RawPermutation) -> Result<Self> {
        let permutation = Self::from_old_from_new(raw.old_from_new)?;
        if permutation.new_from_old == raw.new_from_old {
            Ok(permutation)
        } else {
            Err(TreeError::invalid("`new_from_old` is not the inverse of `old_from_new`"))
        }
    }
}

impl Permutation {
    /// The identity permutation on `0..n`.
    #[must_use]
    pub fn identity(n: usize) -> Self {
        let old_from_new = (0..n).collect::<Vec<_>>();
        Self {
            new_from_old: old_from_new.clone(),
            old_from_new,
        }
    }

    /// Builds the permutation from its `old_from_new` half.
    ///
    /// # Errors
    ///
    /// * If `old_from_new` is not a bijection on `0..old_from_new.len()`.
    pub fn from_old_from_new(old_from_new: Vec<usize>) -> Result<Self> {
        let n = old_from_new.len();
        let mut new_from_old = vec![usize::MAX; n];
        for (new, &old) in old_from_new.iter().enumerate() {
            if old >= n || new_from_old[old] != usize::MAX {
                return Err(TreeError::invalid(format!(
                    "`old_from_new` is not a permutation of 0..{n}: bad entry {old} at {new}"
                )));
            }
            new_from_old[old] = new;
        }
        Ok(Self {
            old_from_new,
            new_from_old,
        })
    }

    /// Inverts an `old_from_new` array that is known to be a bijection.
    pub(crate) fn from_bijection(old_from_new: Vec<usize>) -> Self {
        let mut new_from_old = vec![0; old_from_new.len()];
        for (new, &old) in old_from_new.iter().enumerate() {
            new_from_old[old] = new;
        }
        Self {
            old_from_new,
            new_from_old,
        }
    }

    /// Returns the number of indices in the permutation.
    #[must_use]
    pub fn len(&self) -> usize {
        self.old_from_new.len()
    }

    /// Returns whether the permutation is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.old_from_new.is_empty()
    }

    /// The original index of the point at each reordered position.
    #[must_use]
    pub fn old_from_new(&self) -> &[usize] {
        &self.old_from_new
    }

    /// The reordered position of the point at each original index.
    #[must_use]
    pub fn new_from_old(&self) -> &[usize] {
        &self.new_from_old
    }

    /// The original index of the point stored at reordered position `new`.
    #[must_use]
    pub fn original_index(&self, new: usize) -> usize {
        self.old_from_new[new]
    }

    /// The reordered position of the point with original index `old`.
    #[must_use]
    pub fn reordered_index(&self, old: usize) -> usize {
        self.new_from_old[old]
    }

    /// Reorders per-point values from the reordered space into the original
    /// order, i.e. `result[old] = values[new_from_old[old]]`.
    ///
    /// # Errors
    ///
    /// * If `values` does not have one entry per point.
    pub fn to_original<T>(&self, mut values: Vec<T>) -> Result<Vec<T>> {
        self.check_len(values.len())?;
        values.permute(&self.new_from_old);
        Ok(values)
    }

    /// Reorders per-point values from the original order into the reordered
    /// space, i.e. `result[new] = values[old_from_new[new]]`.
    ///
    /// # Errors
    ///
    /// * If `values` does not have one entry per point.
    pub fn to_reordered<T>(&self, mut values: Vec<T>) -> Result<Vec<T>> {
        self.check_len(values.len())?;
        values.permute(&self.old_from_new);
        Ok(values)
    }

    /// Checks that a per-point array has the right length.
    fn check_len(&self, len: usize) -> Result<()> {
        if len == self.len() {
            Ok(())
        } else {
            Err(TreeError::invalid(format!(
                "expected {} per-point values but got {len}",
                self.len()
            )))
        }
    }
}
