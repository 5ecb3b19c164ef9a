//! Sample sizes for rank-approximate search.
//!
//! Drawing `n` of `N` reference points uniformly without replacement, a
//! search *fails* when fewer than `k` of the samples fall among the true
//! `r + k` nearest points, where `r` is the rank tolerance. The number of
//! samples among the top `r + k` is hypergeometric, so the failure
//! probability is its lower tail below `k`.

use serde::{Deserialize, Serialize};

use crate::{Result, TreeError};

/// The probability that none of `sample_size` uniform samples, drawn
/// without replacement from `set_size` points, is among the
/// `target_rank + 1` nearest points.
///
/// This is the product `prod_{i < n} (N - r - 1 - i) / (N - i)`, built one
/// factor at a time so no binomial coefficient is ever formed.
#[must_use]
pub fn failure_probability(set_size: usize, sample_size: usize, target_rank: usize) -> f64 {
    let misses = set_size.saturating_sub(target_rank + 1);
    if sample_size > misses {
        return 0.0;
    }
    (0..sample_size).fold(1.0, |p, i| {
        #[allow(clippy::cast_precision_loss)]
        let factor = (misses - i) as f64 / (set_size - i) as f64;
        p * factor
    })
}

/// The probability that fewer than `k` of `sample_size` uniform samples,
/// drawn without replacement from `set_size` points, are among the
/// `target_rank + k` nearest points.
///
/// For `k = 1` this is [`failure_probability`].
#[must_use]
pub fn failure_probability_k(set_size: usize, sample_size: usize, target_rank: usize, k: usize) -> f64 {
    if k <= 1 {
        return failure_probability(set_size, sample_size, target_rank);
    }
    if sample_size < k {
        return 1.0;
    }
    let hits = (target_rank + k).min(set_size);
    let misses = set_size - hits;
    let ln_total = ln_choose(set_size, sample_size);

    let p = (0..k)
        .filter(|&j| j <= hits && sample_size >= j && sample_size - j <= misses)
        .map(|j| (ln_choose(hits, j) + ln_choose(misses, sample_size - j) - ln_total).exp())
        .sum::<f64>();
    p.clamp(0.0, 1.0)
}

/// The natural logarithm of the binomial coefficient `C(n, k)`.
#[allow(clippy::cast_precision_loss)]
fn ln_choose(n: usize, k: usize) -> f64 {
    let ln_factorial = |x: usize| libm::lgamma(x as f64 + 1.0);
    ln_factorial(n) - ln_factorial(k) - ln_factorial(n - k)
}

/// The larger root of `2 p^2 n^2 - (4 p k + L) n + 2 k^2 = 0`, where
/// `L = ln(1 / alpha)` and `p = (target_rank + k) / set_size`.
///
/// By Hoeffding's inequality for sampling without replacement, drawing this
/// many samples makes the failure probability at most `alpha`.
///
/// # Errors
///
/// * `NumericDegenerate` if the discriminant is negative or any
///   intermediate value is not finite.
pub fn hoeffding_sample_size(set_size: usize, target_rank: usize, alpha: f64, k: usize) -> Result<f64> {
    #[allow(clippy::cast_precision_loss)]
    let (p, k) = ((target_rank + k) as f64 / set_size as f64, k as f64);
    let l = -alpha.ln();

    let a = 2.0 * p * p;
    let b = 4.0 * p * k + l;
    let discriminant = b * b - 8.0 * a * k * k;

    if !(discriminant >= 0.0 && a > 0.0 && l.is_finite()) {
        return Err(TreeError::NumericDegenerate(format!(
            "no Hoeffding sample size for p = {p}, k = {k} and alpha = {alpha}: discriminant {discriminant}"
        )));
    }
    let root = (b + discriminant.sqrt()) / (2.0 * a);
    if root.is_finite() {
        Ok(root)
    } else {
        Err(TreeError::NumericDegenerate(format!(
            "the Hoeffding sample size overflowed for p = {p}, k = {k} and alpha = {alpha}"
        )))
    }
}

/// The smallest number of samples for which the failure probability drops
/// below `alpha`.
///
/// If `target_rank >= set_size`, every point is trivially within the
/// tolerance and the whole set is returned, i.e. the search is exhaustive.
///
/// # Errors
///
/// * If `set_size` or `k` is zero, `k > set_size`, or `alpha` is outside
///   `(0, 1)`.
pub fn minimum_sample_size(set_size: usize, target_rank: usize, alpha: f64, k: usize) -> Result<usize> {
    if set_size == 0 || k == 0 || k > set_size {
        return Err(TreeError::invalid(format!(
            "need 1 <= k <= set size, got k = {k} and set size {set_size}"
        )));
    }
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(TreeError::invalid(format!("alpha must be in (0, 1), got {alpha}")));
    }
    if target_rank >= set_size {
        return Ok(set_size);
    }

    let failure = |n: usize| failure_probability_k(set_size, n, target_rank, k);

    let mut high = match hoeffding_sample_size(set_size, target_rank, alpha, k) {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Ok(root) => (root.ceil() as usize).clamp(k, set_size),
        // The discriminant is `8pkL + L^2`, never negative once `alpha` is in
        // `(0, 1)`, so this arm is not reached from here.
        Err(e) => {
            ftlog::warn!("{e}. Falling back to the full set as the upper bracket.");
            set_size
        }
    };
    if failure(high) >= alpha {
        high = set_size;
    }

    // Invariant: failure(low) >= alpha > failure(high).
    let mut low = k - 1;
    while high - low > 1 {
        let mid = low + (high - low) / 2;
        if failure(mid) < alpha {
            high = mid;
        } else {
            low = mid;
        }
    }
    Ok(high)
}

/// Decides how many points to sample from a reference node so that, with
/// probability at least `1 - alpha`, every reported neighbor is within the
/// rank tolerance.
///
/// # Example
///
/// ```rust
/// use dual_tree::rank_approx::{failure_probability, RankApproximationSampler};
///
/// let sampler = RankApproximationSampler::new(1000, 5.0, 0.05, 1).unwrap();
/// assert_eq!(sampler.target_rank(), 50);
///
/// let n = sampler.min_samples();
/// assert!(failure_probability(1000, n, 50) < 0.05);
/// assert!(failure_probability(1000, n - 1, 50) >= 0.05);
///
/// // Small nodes are compared exhaustively, large ones are sampled.
/// assert_eq!(sampler.sample_size(20), 20);
/// assert!(sampler.sample_size(500) < 500);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankApproximationSampler {
    /// The number of candidate reference points.
    set_size: usize,
    /// The rank tolerance, as an absolute rank.
    target_rank: usize,
    /// The allowed failure probability.
    alpha: f64,
    /// The number of neighbors.
    k: usize,
    /// The number of samples needed from the whole set.
    min_samples: usize,
    /// `min_samples / set_size`, the fraction sampled from large nodes.
    ratio: f64,
}

impl RankApproximationSampler {
    /// Computes the sample sizes for a set of `set_size` candidates.
    ///
    /// # Arguments
    ///
    /// * `set_size` - The number of candidate reference points.
    /// * `rank_tolerance_percent` - The rank tolerance as a percentage of
    ///   `set_size`, in `[0, 100)`.
    /// * `alpha` - The allowed failure probability, in `(0, 1)`.
    /// * `k` - The number of neighbors.
    ///
    /// # Errors
    ///
    /// * If any argument is out of range, or the tolerance resolves to a
    ///   rank of at least `set_size`.
    pub fn new(set_size: usize, rank_tolerance_percent: f64, alpha: f64, k: usize) -> Result<Self> {
        if !(0.0..100.0).contains(&rank_tolerance_percent) {
            return Err(TreeError::invalid(format!(
                "the rank tolerance must be a percentage in [0, 100), got {rank_tolerance_percent}"
            )));
        }
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let target_rank = (rank_tolerance_percent / 100.0 * set_size as f64).floor() as usize;
        if target_rank >= set_size {
            return Err(TreeError::invalid(format!(
                "a rank tolerance of {target_rank} leaves nothing to search among {set_size} points"
            )));
        }

        let min_samples = minimum_sample_size(set_size, target_rank, alpha, k)?;
        #[allow(clippy::cast_precision_loss)]
        let ratio = min_samples as f64 / set_size as f64;

        ftlog::debug!(
            "Rank approximation over {set_size} points: rank {target_rank}, alpha {alpha}, k {k}, {min_samples} samples (ratio {ratio:.4})"
        );

        Ok(Self {
            set_size,
            target_rank,
            alpha,
            k,
            min_samples,
            ratio,
        })
    }

    /// The number of candidate reference points.
    #[must_use]
    pub const fn set_size(&self) -> usize {
        self.set_size
    }

    /// The rank tolerance, as an absolute rank.
    #[must_use]
    pub const fn target_rank(&self) -> usize {
        self.target_rank
    }

    /// The allowed failure probability.
    #[must_use]
    pub const fn alpha(&self) -> f64 {
        self.alpha
    }

    /// The number of neighbors.
    #[must_use]
    pub const fn k(&self) -> usize {
        self.k
    }

    /// The number of samples each query needs from the whole set.
    #[must_use]
    pub const fn min_samples(&self) -> usize {
        self.min_samples
    }

    /// The fraction of a large node that is sampled.
    #[must_use]
    pub const fn ratio(&self) -> f64 {
        self.ratio
    }

    /// The number of points to sample from a node holding `size` points.
    ///
    /// Nodes no larger than `target_rank + k` are taken whole; larger ones
    /// are sampled in proportion to the whole set.
    #[must_use]
    pub fn sample_size(&self, size: usize) -> usize {
        if size <= self.target_rank + self.k {
            size
        } else {
            (self.min_samples * size).div_ceil(self.set_size).clamp(1, size)
        }
    }
}

#[cfg(test)]
mod tests {
    use float_cmp::approx_eq;
    use test_case::test_case;

    use crate::TreeError;

    use super::{
        failure_probability, failure_probability_k, hoeffding_sample_size, minimum_sample_size,
        RankApproximationSampler,
    };

    #[test]
    fn product_matches_closed_form() {
        // Drawing 2 of 10 with the top 3 excluded: (7 / 10) * (6 / 9).
        assert!(approx_eq!(f64, failure_probability(10, 2, 2), 0.7 * 6.0 / 9.0, ulps = 2));
        assert_eq!(failure_probability(10, 0, 2), 1.0);
        assert_eq!(failure_probability(10, 8, 2), 0.0);
    }

    #[test]
    fn general_k_agrees_with_product() {
        for n in [1, 5, 20, 57, 200] {
            let a = failure_probability(1000, n, 50);
            let b = failure_probability_k(1000, n, 50, 1);
            assert_eq!(a, b);
        }
        // With k = 2 the lgamma path is taken; it must match a direct sum.
        // P(X < 2) for X ~ Hypergeometric(N = 20, K = 4, n = 5).
        let direct = (1.0 * 1.0 * 4368.0 + 4.0 * 1820.0) / 15504.0;
        assert!(approx_eq!(f64, failure_probability_k(20, 5, 2, 2), direct, epsilon = 1e-9));
    }

    #[test]
    fn boundary_is_tight() {
        let n = minimum_sample_size(1000, 50, 0.05, 1).unwrap();
        assert!(failure_probability(1000, n, 50) < 0.05);
        assert!(failure_probability(1000, n - 1, 50) >= 0.05);
    }

    #[test_case(500, 10, 0.1, 3 ; "k_3")]
    #[test_case(100, 0, 0.01, 1 ; "exact_rank")]
    #[test_case(10_000, 100, 0.05, 5 ; "large")]
    fn boundary_is_tight_for_k(set_size: usize, rank: usize, alpha: f64, k: usize) {
        let n = minimum_sample_size(set_size, rank, alpha, k).unwrap();
        assert!(failure_probability_k(set_size, n, rank, k) < alpha);
        assert!(failure_probability_k(set_size, n - 1, rank, k) >= alpha);
    }

    #[test]
    fn monotone_in_rank_and_alpha() {
        let by_rank = (0..200)
            .step_by(10)
            .map(|r| minimum_sample_size(1000, r, 0.05, 1).unwrap())
            .collect::<Vec<_>>();
        assert!(by_rank.windows(2).all(|w| w[0] >= w[1]));

        let by_alpha = [0.001, 0.01, 0.05, 0.1, 0.5]
            .into_iter()
            .map(|a| minimum_sample_size(1000, 20, a, 1).unwrap())
            .collect::<Vec<_>>();
        assert!(by_alpha.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn hoeffding_bracket_is_an_upper_bound() {
        let root = hoeffding_sample_size(1000, 50, 0.05, 1).unwrap();
        let n = minimum_sample_size(1000, 50, 0.05, 1).unwrap();
        #[allow(clippy::cast_precision_loss)]
        let n = n as f64;
        assert!(root >= n);
    }

    #[test]
    fn hoeffding_rejects_degenerate_alpha() {
        for alpha in [0.0, f64::NAN] {
            assert!(matches!(
                hoeffding_sample_size(1000, 50, alpha, 1),
                Err(TreeError::NumericDegenerate(_))
            ));
        }
    }

    #[test]
    fn degenerate_ranks() {
        assert_eq!(minimum_sample_size(10, 10, 0.05, 1).unwrap(), 10);
        assert_eq!(minimum_sample_size(10, 9, 0.05, 1).unwrap(), 1);
        assert!(minimum_sample_size(10, 0, 1.0, 1).is_err());
        assert!(minimum_sample_size(10, 0, 0.05, 11).is_err());
        assert!(RankApproximationSampler::new(10, 100.0, 0.05, 1).is_err());
    }

    #[test]
    fn sample_sizes() {
        let sampler = RankApproximationSampler::new(1000, 5.0, 0.05, 1).unwrap();
        assert_eq!(sampler.sample_size(51), 51);
        assert_eq!(sampler.sample_size(1000), sampler.min_samples());
        let sizes = (52..1000).map(|s| sampler.sample_size(s)).collect::<Vec<_>>();
        assert!(sizes.windows(2).all(|w| w[0] <= w[1]));
        assert!(sizes.iter().all(|&n| n >= 1));
    }
}
