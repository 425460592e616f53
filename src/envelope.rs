//! N-dimensional axis-aligned bounding box used for every pruning decision.
//!
//! Every tree traversal in this crate rejects subtrees on envelope geometry
//! alone before any exact-geometry work happens, so the operations here are
//! deliberately allocation-light: coordinates live in a `SmallVec` that keeps
//! 2D and 3D envelopes inline.

use crate::error::{GeoQueryError, Result};
use geo::{Point, Polygon, Rect, coord};
use smallvec::SmallVec;

type Coords = SmallVec<[f64; 3]>;

/// An axis-aligned bounding box with a fixed dimension.
///
/// Invariant: `min[d] <= max[d]` for every dimension `d`. Constructors
/// validate this and fail with [`GeoQueryError::InvalidEnvelope`] on
/// violation, so a held `Envelope` is always well-formed.
///
/// # Examples
///
/// ```rust
/// use geoquery::Envelope;
///
/// let a = Envelope::new_2d(0.0, 0.0, 10.0, 10.0)?;
/// let b = Envelope::new_2d(5.0, 5.0, 15.0, 15.0)?;
/// assert!(a.intersects(&b)?);
/// assert_eq!(a.area(), 100.0);
/// # Ok::<(), geoquery::GeoQueryError>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    min: Coords,
    max: Coords,
}

impl Envelope {
    /// Create an envelope from min/max coordinate slices.
    ///
    /// # Errors
    ///
    /// Returns [`GeoQueryError::InvalidEnvelope`] if the slices differ in
    /// length or `min[d] > max[d]` for any dimension.
    pub fn new(min: &[f64], max: &[f64]) -> Result<Self> {
        if min.len() != max.len() || min.iter().zip(max).any(|(lo, hi)| lo > hi) {
            return Err(GeoQueryError::InvalidEnvelope {
                min: min.to_vec(),
                max: max.to_vec(),
            });
        }
        Ok(Self {
            min: Coords::from_slice(min),
            max: Coords::from_slice(max),
        })
    }

    /// Convenience constructor for the 2D case.
    pub fn new_2d(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Result<Self> {
        Self::new(&[min_x, min_y], &[max_x, max_y])
    }

    /// Degenerate envelope covering a single coordinate.
    pub fn from_coords(p: &[f64]) -> Self {
        Self {
            min: Coords::from_slice(p),
            max: Coords::from_slice(p),
        }
    }

    /// Degenerate 2D envelope at a `geo` point.
    pub fn from_point(point: Point<f64>) -> Self {
        Self::from_coords(&[point.x(), point.y()])
    }

    /// 2D envelope from a `geo::Rect` (already min/max ordered).
    pub fn from_rect(rect: Rect<f64>) -> Self {
        Self {
            min: Coords::from_slice(&[rect.min().x, rect.min().y]),
            max: Coords::from_slice(&[rect.max().x, rect.max().y]),
        }
    }

    /// Number of dimensions.
    pub fn dimension(&self) -> usize {
        self.min.len()
    }

    /// Lower bound in dimension `d`.
    pub fn min(&self, d: usize) -> f64 {
        self.min[d]
    }

    /// Upper bound in dimension `d`.
    pub fn max(&self, d: usize) -> f64 {
        self.max[d]
    }

    /// Lower bound on the sweep axis (dimension 0).
    pub fn min_x(&self) -> f64 {
        self.min[0]
    }

    /// Upper bound on the sweep axis (dimension 0).
    pub fn max_x(&self) -> f64 {
        self.max[0]
    }

    /// Width in dimension `d` (0 for a degenerate side).
    pub fn width(&self, d: usize) -> f64 {
        self.max[d] - self.min[d]
    }

    /// Midpoint in dimension `d`.
    pub fn center(&self, d: usize) -> f64 {
        (self.min[d] + self.max[d]) / 2.0
    }

    /// True if every side has zero width.
    pub fn is_point(&self) -> bool {
        self.min == self.max
    }

    /// Product of per-dimension widths; 0 for degenerate envelopes.
    pub fn area(&self) -> f64 {
        self.min
            .iter()
            .zip(&self.max)
            .map(|(lo, hi)| hi - lo)
            .product()
    }

    fn check_dimension(&self, other: &Self) -> Result<()> {
        if self.dimension() == other.dimension() {
            Ok(())
        } else {
            Err(GeoQueryError::DimensionMismatch {
                left: self.dimension(),
                right: other.dimension(),
            })
        }
    }

    /// True iff the envelopes share at least a boundary point. Symmetric.
    pub fn intersects(&self, other: &Self) -> Result<bool> {
        self.check_dimension(other)?;
        Ok(self
            .min
            .iter()
            .zip(&self.max)
            .zip(other.min.iter().zip(&other.max))
            .all(|((a_lo, a_hi), (b_lo, b_hi))| b_lo <= a_hi && a_lo <= b_hi))
    }

    /// True iff `other` lies entirely inside this envelope (boundary included).
    pub fn covers(&self, other: &Self) -> Result<bool> {
        self.check_dimension(other)?;
        Ok(self
            .min
            .iter()
            .zip(&self.max)
            .zip(other.min.iter().zip(&other.max))
            .all(|((a_lo, a_hi), (b_lo, b_hi))| b_lo >= a_lo && b_hi <= a_hi))
    }

    /// Alias for [`covers`](Self::covers).
    pub fn contains(&self, other: &Self) -> Result<bool> {
        self.covers(other)
    }

    /// Grow this envelope in place to cover `other`.
    pub fn expand_to_include(&mut self, other: &Self) -> Result<()> {
        self.check_dimension(other)?;
        for d in 0..self.min.len() {
            self.min[d] = self.min[d].min(other.min[d]);
            self.max[d] = self.max[d].max(other.max[d]);
        }
        Ok(())
    }

    /// Grow this envelope in place to cover a coordinate.
    pub fn expand_to_include_coords(&mut self, p: &[f64]) -> Result<()> {
        if p.len() != self.dimension() {
            return Err(GeoQueryError::DimensionMismatch {
                left: self.dimension(),
                right: p.len(),
            });
        }
        for d in 0..self.min.len() {
            self.min[d] = self.min[d].min(p[d]);
            self.max[d] = self.max[d].max(p[d]);
        }
        Ok(())
    }

    /// Smallest envelope covering both inputs, as a new value.
    pub fn union(&self, other: &Self) -> Result<Self> {
        let mut combined = self.clone();
        combined.expand_to_include(other)?;
        Ok(combined)
    }

    /// The overlapping sub-envelope, or `None` when the inputs are disjoint.
    ///
    /// Never produces inverted bounds: when the envelopes merely touch, the
    /// result is degenerate in the touching dimension.
    pub fn intersection(&self, other: &Self) -> Result<Option<Self>> {
        self.check_dimension(other)?;
        let mut min = Coords::with_capacity(self.min.len());
        let mut max = Coords::with_capacity(self.min.len());
        for d in 0..self.min.len() {
            if other.min[d] > self.max[d] || other.max[d] < self.min[d] {
                return Ok(None);
            }
            min.push(self.min[d].max(other.min[d]));
            max.push(self.max[d].min(other.max[d]));
        }
        Ok(Some(Self { min, max }))
    }

    /// Euclidean distance between the envelopes; 0 when they intersect.
    pub fn distance(&self, other: &Self) -> Result<f64> {
        if self.intersects(other)? {
            return Ok(0.0);
        }
        let mut sum = 0.0;
        for d in 0..self.min.len() {
            let gap = if self.min[d] < other.min[d] {
                other.min[d] - self.max[d]
            } else {
                self.min[d] - other.max[d]
            };
            if gap > 0.0 {
                sum += gap * gap;
            }
        }
        Ok(sum.sqrt())
    }

    /// Euclidean distance from this envelope to a coordinate, clamping the
    /// coordinate to the box per dimension. 0 when the point is inside.
    pub fn distance_to_coords(&self, p: &[f64]) -> Result<f64> {
        if p.len() != self.dimension() {
            return Err(GeoQueryError::DimensionMismatch {
                left: self.dimension(),
                right: p.len(),
            });
        }
        let mut sum = 0.0;
        for d in 0..self.min.len() {
            let gap = if p[d] < self.min[d] {
                self.min[d] - p[d]
            } else if p[d] > self.max[d] {
                p[d] - self.max[d]
            } else {
                0.0
            };
            sum += gap * gap;
        }
        Ok(sum.sqrt())
    }

    /// Euclidean distance from this 2D envelope to a `geo` point.
    pub fn distance_to_point(&self, point: Point<f64>) -> Result<f64> {
        self.distance_to_coords(&[point.x(), point.y()])
    }

    /// Ratio of the intersection area to the smaller envelope's area.
    ///
    /// 1.0 when the smaller envelope is a point lying within the
    /// intersection; 0.0 when the envelopes do not intersect.
    pub fn overlap(&self, other: &Self) -> Result<f64> {
        let smaller = if self.area() < other.area() {
            self
        } else {
            other
        };
        Ok(match self.intersection(other)? {
            None => 0.0,
            Some(_) if smaller.is_point() => 1.0,
            Some(common) => common.area() / smaller.area(),
        })
    }

    /// Envelope grown by `margin` on every side (used for distance buffering).
    pub fn expand(&self, margin: f64) -> Result<Self> {
        let min: Vec<f64> = self.min.iter().map(|v| v - margin).collect();
        let max: Vec<f64> = self.max.iter().map(|v| v + margin).collect();
        Self::new(&min, &max)
    }

    /// Convert a 2D envelope to a `geo::Rect`.
    ///
    /// # Errors
    ///
    /// Returns [`GeoQueryError::DimensionMismatch`] for non-2D envelopes.
    pub fn to_rect(&self) -> Result<Rect<f64>> {
        if self.dimension() != 2 {
            return Err(GeoQueryError::DimensionMismatch {
                left: self.dimension(),
                right: 2,
            });
        }
        Ok(Rect::new(
            coord! { x: self.min[0], y: self.min[1] },
            coord! { x: self.max[0], y: self.max[1] },
        ))
    }

    /// Convert a 2D envelope to its bounding polygon.
    ///
    /// This is the region handed to the geometry provider for the range
    /// query's exact containment check.
    pub fn to_polygon(&self) -> Result<Polygon<f64>> {
        Ok(self.to_rect()?.to_polygon())
    }
}

impl std::fmt::Display for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Envelope[min={:?}, max={:?}]", &self.min[..], &self.max[..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Envelope {
        Envelope::new_2d(min_x, min_y, max_x, max_y).unwrap()
    }

    #[test]
    fn test_construction_rejects_inverted_bounds() {
        assert!(Envelope::new_2d(10.0, 0.0, 0.0, 10.0).is_err());
        assert!(Envelope::new(&[0.0, 0.0], &[1.0]).is_err());
        assert!(Envelope::new_2d(0.0, 0.0, 0.0, 0.0).is_ok());
    }

    #[test]
    fn test_intersects_is_symmetric() {
        let cases = [
            (env(0.0, 0.0, 10.0, 10.0), env(5.0, 5.0, 15.0, 15.0)),
            (env(0.0, 0.0, 10.0, 10.0), env(10.0, 10.0, 20.0, 20.0)),
            (env(0.0, 0.0, 1.0, 1.0), env(2.0, 2.0, 3.0, 3.0)),
            (env(0.0, 0.0, 4.0, 4.0), env(1.0, 1.0, 2.0, 2.0)),
        ];
        for (a, b) in &cases {
            assert_eq!(a.intersects(b).unwrap(), b.intersects(a).unwrap());
        }
    }

    #[test]
    fn test_touching_envelopes_intersect() {
        let a = env(0.0, 0.0, 5.0, 5.0);
        let b = env(5.0, 0.0, 10.0, 5.0);
        assert!(a.intersects(&b).unwrap());
    }

    #[test]
    fn test_covers_implies_intersects() {
        let outer = env(0.0, 0.0, 10.0, 10.0);
        let inner = env(2.0, 2.0, 8.0, 8.0);
        assert!(outer.covers(&inner).unwrap());
        assert!(outer.intersects(&inner).unwrap());
        assert!(!inner.covers(&outer).unwrap());
        assert!(outer.contains(&inner).unwrap());
    }

    #[test]
    fn test_dimension_mismatch_errors() {
        let flat = env(0.0, 0.0, 1.0, 1.0);
        let solid = Envelope::new(&[0.0, 0.0, 0.0], &[1.0, 1.0, 1.0]).unwrap();
        assert!(matches!(
            flat.intersects(&solid),
            Err(GeoQueryError::DimensionMismatch { left: 2, right: 3 })
        ));
        assert!(flat.covers(&solid).is_err());
        assert!(flat.union(&solid).is_err());
        assert!(flat.intersection(&solid).is_err());
        assert!(flat.distance(&solid).is_err());
        assert!(flat.distance_to_coords(&[0.0, 0.0, 0.0]).is_err());
    }

    #[test]
    fn test_union_and_expand_to_include() {
        let a = env(0.0, 0.0, 5.0, 5.0);
        let b = env(3.0, -2.0, 8.0, 4.0);
        let combined = a.union(&b).unwrap();
        assert_eq!(combined, env(0.0, -2.0, 8.0, 5.0));

        // Mutating form reaches the same envelope.
        let mut c = a.clone();
        c.expand_to_include(&b).unwrap();
        assert_eq!(c, combined);

        let mut d = a;
        d.expand_to_include_coords(&[-1.0, 7.0]).unwrap();
        assert_eq!(d, env(-1.0, 0.0, 5.0, 7.0));
    }

    #[test]
    fn test_intersection_area_bound() {
        let a = env(0.0, 0.0, 10.0, 10.0);
        let b = env(5.0, 5.0, 20.0, 20.0);
        let common = a.intersection(&b).unwrap().unwrap();
        assert_eq!(common, env(5.0, 5.0, 10.0, 10.0));
        assert!(common.area() <= a.area().min(b.area()));

        let far = env(100.0, 100.0, 101.0, 101.0);
        assert!(a.intersection(&far).unwrap().is_none());

        // Touching boxes intersect in a degenerate (never inverted) envelope.
        let touch = env(10.0, 0.0, 20.0, 10.0);
        let edge = a.intersection(&touch).unwrap().unwrap();
        assert_eq!(edge, env(10.0, 0.0, 10.0, 10.0));
        assert_eq!(edge.area(), 0.0);
    }

    #[test]
    fn test_envelope_distance() {
        let a = env(0.0, 0.0, 1.0, 1.0);
        let b = env(4.0, 5.0, 6.0, 7.0);
        // Gaps of 3 and 4 give distance 5.
        assert_eq!(a.distance(&b).unwrap(), 5.0);
        assert_eq!(b.distance(&a).unwrap(), 5.0);

        let overlapping = env(0.5, 0.5, 2.0, 2.0);
        assert_eq!(a.distance(&overlapping).unwrap(), 0.0);

        // Offset on one axis only.
        let beside = env(5.0, 0.0, 6.0, 1.0);
        assert_eq!(a.distance(&beside).unwrap(), 4.0);
    }

    #[test]
    fn test_distance_to_point() {
        let e = env(0.0, 0.0, 10.0, 10.0);
        assert_eq!(e.distance_to_coords(&[5.0, 5.0]).unwrap(), 0.0);
        assert_eq!(e.distance_to_coords(&[10.0, 10.0]).unwrap(), 0.0);
        assert_eq!(e.distance_to_coords(&[13.0, 14.0]).unwrap(), 5.0);
        assert_eq!(e.distance_to_coords(&[-3.0, 5.0]).unwrap(), 3.0);
        assert_eq!(
            e.distance_to_point(Point::new(13.0, 14.0)).unwrap(),
            5.0
        );
    }

    #[test]
    fn test_area_and_widths() {
        let e = env(0.0, 0.0, 10.0, 5.0);
        assert_eq!(e.area(), 50.0);
        assert_eq!(e.width(0), 10.0);
        assert_eq!(e.width(1), 5.0);
        assert_eq!(e.center(0), 5.0);
        assert_eq!(e.center(1), 2.5);

        let point = Envelope::from_coords(&[3.0, 4.0]);
        assert!(point.is_point());
        assert_eq!(point.area(), 0.0);
    }

    #[test]
    fn test_overlap_ratio() {
        let a = env(0.0, 0.0, 10.0, 10.0);
        let b = env(5.0, 0.0, 15.0, 10.0);
        // Half of the smaller envelope is covered.
        assert_eq!(a.overlap(&b).unwrap(), 0.5);

        let disjoint = env(20.0, 20.0, 30.0, 30.0);
        assert_eq!(a.overlap(&disjoint).unwrap(), 0.0);

        // A point envelope inside the intersection counts as full overlap.
        let point = Envelope::from_coords(&[5.0, 5.0]);
        assert_eq!(a.overlap(&point).unwrap(), 1.0);
        assert_eq!(point.overlap(&a).unwrap(), 1.0);
    }

    #[test]
    fn test_expand() {
        let e = env(0.0, 0.0, 10.0, 10.0);
        assert_eq!(e.expand(2.0).unwrap(), env(-2.0, -2.0, 12.0, 12.0));
        // Shrinking past the midpoint inverts the bounds and is rejected.
        assert!(e.expand(-6.0).is_err());
    }

    #[test]
    fn test_rect_and_polygon_conversion() {
        let e = env(1.0, 2.0, 3.0, 4.0);
        let rect = e.to_rect().unwrap();
        assert_eq!(Envelope::from_rect(rect), e);
        let polygon = e.to_polygon().unwrap();
        assert_eq!(polygon.exterior().coords().count(), 5);

        let solid = Envelope::new(&[0.0; 3], &[1.0; 3]).unwrap();
        assert!(solid.to_rect().is_err());
        assert!(solid.to_polygon().is_err());
    }

    #[test]
    fn test_from_point_constructors() {
        let p = Envelope::from_point(Point::new(2.0, 3.0));
        assert!(p.is_point());
        assert_eq!(p.min(0), 2.0);
        assert_eq!(p.max(1), 3.0);
    }
}
