//! A `PointSet` is a dense buffer of points with a per-point payload.

use serde::{Deserialize, Serialize};

use crate::{Result, TreeError};

use super::Permutable;

/// A dense buffer of `D`-dimensional points with a per-point payload.
///
/// Each point occupies one contiguous column of `D` coordinates in a flat
/// buffer, so after tree construction a contiguous index range is also a
/// contiguous slice of memory. The payload (label, weight, target value...)
/// is reordered together with the coordinates.
///
/// # Type Parameters
///
/// - `P`: The type of the per-point payload.
///
/// # Example
///
/// ```rust
/// use dual_tree::PointSet;
///
/// let points = PointSet::from_rows(&[vec![0.0, 0.0], vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();
/// assert_eq!(points.len(), 3);
/// assert_eq!(points.dim(), 2);
/// assert_eq!(points.point(1), &[1.0, 0.0]);
///
/// let points = points.with_payload(vec![0.5, 1.0, 2.0]).unwrap();
/// assert_eq!(points.payload(2), &2.0);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPointSet<P>")]
pub struct PointSet<P = ()> {
    /// The dimensionality of every point.
    dim: usize,
    /// The coordinates, point after point.
    coords: Vec<f64>,
    /// The payload of every point.
    payload: Vec<P>,
}

impl PointSet<()> {
    /// Creates a new `PointSet` from a flat buffer of coordinates.
    ///
    /// # Arguments
    ///
    /// - `dim`: The dimensionality of the points.
    /// - `coords`: The coordinates; point `i` is `coords[i * dim..(i + 1) * dim]`.
    ///
    /// # Errors
    ///
    /// * If `dim` is zero.
    /// * If `coords` is empty or its length is not a multiple of `dim`.
    /// * If any coordinate is not finite.
    pub fn new(dim: usize, coords: Vec<f64>) -> Result<Self> {
        check_coords(dim, &coords)?;
        let payload = vec![(); coords.len() / dim];
        Ok(Self { dim, coords, payload })
    }

    /// Creates a new `PointSet` from rows of coordinates.
    ///
    /// # Errors
    ///
    /// * If there are no rows, or the rows are empty.
    /// * If the rows do not all have the same length.
    /// * If any coordinate is not finite.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self> {
        let dim = rows.first().map_or(0, |r| r.as_ref().len());
        if let Some(i) = rows.iter().position(|r| r.as_ref().len() != dim) {
            return Err(TreeError::invalid(format!(
                "row {i} has {} coordinates but row 0 has {dim}",
                rows[i].as_ref().len()
            )));
        }
        let coords = rows.iter().flat_map(|r| r.as_ref().iter().copied()).collect();
        Self::new(dim, coords)
    }
}

/// The fields of a `PointSet` as they come out of a deserializer, before
/// any checks.
#[derive(Deserialize)]
struct RawPointSet<P> {
    dim: usize,
    coords: Vec<f64>,
    payload: Vec<P>,
}

impl<P> TryFrom<RawPointSet<P>> for PointSet<P> {
    type Error = TreeError;

    fn try_from(raw: RawPointSet<P>) -> Result<Self> {
        check_coords(raw.dim, &raw.coords)?;
        if raw.coords.len() != raw.payload.len() * raw.dim {
            return Err(TreeError::invalid(format!(
                "{} coordinates do not hold {} points of dimension {}",
                raw.coords.len(),
                raw.payload.len(),
                raw.dim
            )));
        }
        Ok(Self {
            dim: raw.dim,
            coords: raw.coords,
            payload: raw.payload,
        })
    }
}

/// Checks a flat coordinate buffer against its dimensionality.
fn check_coords(dim: usize, coords: &[f64]) -> Result<()> {
    if dim == 0 {
        return Err(TreeError::invalid("points must have at least one dimension"));
    }
    if coords.is_empty() {
        return Err(TreeError::invalid("the point set is empty"));
    }
    if coords.len() % dim != 0 {
        return Err(TreeError::invalid(format!(
            "{} coordinates cannot be split into points of dimension {dim}",
            coords.len()
        )));
    }
    if let Some(i) = coords.iter().position(|c| !c.is_finite()) {
        return Err(TreeError::invalid(format!(
            "coordinate {} of point {} is not finite",
            i % dim,
            i / dim
        )));
    }
    Ok(())
}

impl<P> PointSet<P> {
    /// Attaches a payload to the points, replacing any existing one.
    ///
    /// # Errors
    ///
    /// * If the payload length does not match the number of points.
    pub fn with_payload<Q>(self, payload: Vec<Q>) -> Result<PointSet<Q>> {
        if payload.len() == self.len() {
            Ok(PointSet {
                dim: self.dim,
                coords: self.coords,
                payload,
            })
        } else {
            Err(TreeError::invalid(format!(
                "the payload length does not match the number of points. {} vs {}",
                payload.len(),
                self.len()
            )))
        }
    }

    /// Returns the number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Returns whether there are no points. Every constructor rejects an
    /// empty buffer, so this is always `false`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Returns the dimensionality of the points.
    #[must_use]
    pub const fn dim(&self) -> usize {
        self.dim
    }

    /// Returns the coordinates of the point at `index`.
    ///
    /// # Panics
    ///
    /// * If `index` is out of bounds.
    #[must_use]
    pub fn point(&self, index: usize) -> &[f64] {
        &self.coords[index * self.dim..(index + 1) * self.dim]
    }

    /// Returns a single coordinate of the point at `index`.
    #[must_use]
    pub fn coordinate(&self, index: usize, dim: usize) -> f64 {
        self.coords[index * self.dim + dim]
    }

    /// Returns the payload of the point at `index`.
    #[must_use]
    pub fn payload(&self, index: usize) -> &P {
        &self.payload[index]
    }

    /// Returns the payloads of all points.
    #[must_use]
    pub fn payloads(&self) -> &[P] {
        &self.payload
    }

    /// Returns the flat coordinate buffer.
    #[must_use]
    pub fn coords(&self) -> &[f64] {
        &self.coords
    }

    /// Iterates over the points in their current order.
    pub fn iter(&self) -> impl Iterator<Item = &[f64]> {
        self.coords.chunks_exact(self.dim)
    }

    /// Deconstructs the `PointSet` into its dimensionality, coordinates and
    /// payload.
    #[must_use]
    pub fn into_parts(self) -> (usize, Vec<f64>, Vec<P>) {
        (self.dim, self.coords, self.payload)
    }
}

impl<P> Permutable for PointSet<P> {
    fn swap_two(&mut self, i: usize, j: usize) {
        if i == j {
            return;
        }
        let (a, b) = if i < j { (i, j) } else { (j, i) };
        let (left, right) = self.coords.split_at_mut(b * self.dim);
        left[a * self.dim..(a + 1) * self.dim].swap_with_slice(&mut right[..self.dim]);
        self.payload.swap(a, b);
    }
}
