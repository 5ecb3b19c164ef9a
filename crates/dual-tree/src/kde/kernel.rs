//! Kernels for the kernel sums.

use serde::{Deserialize, Serialize};

use crate::{Result, TreeError};

/// A radial kernel, evaluated on the distance between two points.
///
/// The kernel sums rely on two properties: the kernel is non-negative and it
/// is non-increasing in distance. Together they let a reference node's
/// contribution be bounded from its minimum and maximum distance alone.
///
/// # Example
///
/// ```rust
/// use dual_tree::kde::{Kernel, Epanechnikov};
///
/// let kernel = Epanechnikov::new(2.0).unwrap();
/// assert_eq!(kernel.evaluate(0.0), 1.0);
/// assert_eq!(kernel.evaluate(1.0), 0.75);
/// assert_eq!(kernel.evaluate(3.0), 0.0);
/// ```
pub trait Kernel: Send + Sync {
    /// The value of the kernel at `distance`.
    fn evaluate(&self, distance: f64) -> f64;

    /// The name of the kernel.
    fn name(&self) -> &str;

    /// Whether the kernel is non-negative and non-increasing in distance.
    fn is_monotone(&self) -> bool {
        true
    }

    /// Whether the kernel is meaningful under the metric with the given name.
    fn supports_metric(&self, metric: &str) -> bool {
        let _ = metric;
        true
    }
}

/// Checks that a bandwidth is positive and finite.
fn check_bandwidth(bandwidth: f64) -> Result<()> {
    if bandwidth.is_finite() && bandwidth > 0.0 {
        Ok(())
    } else {
        Err(TreeError::invalid(format!(
            "the bandwidth must be positive and finite, got {bandwidth}"
        )))
    }
}

/// The (unnormalized) Gaussian kernel `exp(-d^2 / (2 h^2))`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gaussian {
    /// The bandwidth `h`.
    bandwidth: f64,
}

impl Gaussian {
    /// Creates a Gaussian kernel with the given bandwidth.
    ///
    /// # Errors
    ///
    /// * If the bandwidth is not positive and finite.
    pub fn new(bandwidth: f64) -> Result<Self> {
        check_bandwidth(bandwidth)?;
        Ok(Self { bandwidth })
    }

    /// The bandwidth.
    #[must_use]
    pub const fn bandwidth(&self) -> f64 {
        self.bandwidth
    }
}

impl Kernel for Gaussian {
    fn evaluate(&self, distance: f64) -> f64 {
        let r = distance / self.bandwidth;
        (-0.5 * r * r).exp()
    }

    fn name(&self) -> &str {
        "gaussian"
    }

    fn supports_metric(&self, metric: &str) -> bool {
        // On squared distances the kernel would square the distance twice.
        metric != "squared-euclidean"
    }
}

/// The (unnormalized) Epanechnikov kernel `max(0, 1 - d^2 / h^2)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Epanechnikov {
    /// The bandwidth `h`, beyond which the kernel is zero.
    bandwidth: f64,
}

impl Epanechnikov {
    /// Creates an Epanechnikov kernel with the given bandwidth.
    ///
    /// # Errors
    ///
    /// * If the bandwidth is not positive and finite.
    pub fn new(bandwidth: f64) -> Result<Self> {
        check_bandwidth(bandwidth)?;
        Ok(Self { bandwidth })
    }

    /// The bandwidth.
    #[must_use]
    pub const fn bandwidth(&self) -> f64 {
        self.bandwidth
    }
}

impl Kernel for Epanechnikov {
    fn evaluate(&self, distance: f64) -> f64 {
        let r = distance / self.bandwidth;
        (1.0 - r * r).max(0.0)
    }

    fn name(&self) -> &str {
        "epanechnikov"
    }

    fn supports_metric(&self, metric: &str) -> bool {
        metric != "squared-euclidean"
    }
}
