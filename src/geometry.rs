//! Exact-geometry evaluation behind the [`GeometryProvider`] trait.
//!
//! Envelope pruning only narrows the candidate set; final acceptance always
//! goes through exact geometry. This module defines the provider interface
//! the engine consumes, the [`SpatialPredicate`] sum type (predicate names
//! are resolved once at query construction, never re-matched inside hot
//! loops), and a map-backed provider for in-memory payloads.

use crate::envelope::Envelope;
use crate::error::{GeoQueryError, Result};
use crate::index::LeafRef;
use geo::dimensions::Dimensions;
use geo::{
    BoundingRect, Distance, Euclidean, Geometry, HasDimensions, Intersects, Point, Polygon, Relate,
};
use rustc_hash::FxHashMap;
use std::str::FromStr;

/// Topological predicate between two exact geometries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpatialPredicate {
    Intersects,
    Contains,
    Within,
    Touches,
    Crosses,
    Overlaps,
    Equals,
    Disjoint,
}

impl SpatialPredicate {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Intersects => "intersects",
            Self::Contains => "contains",
            Self::Within => "within",
            Self::Touches => "touches",
            Self::Crosses => "crosses",
            Self::Overlaps => "overlaps",
            Self::Equals => "equals",
            Self::Disjoint => "disjoint",
        }
    }
}

impl FromStr for SpatialPredicate {
    type Err = GeoQueryError;

    /// Case-insensitive predicate lookup, failing with
    /// [`GeoQueryError::UnsupportedOperation`] before any traversal starts.
    fn from_str(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "intersects" => Ok(Self::Intersects),
            "contains" => Ok(Self::Contains),
            "within" => Ok(Self::Within),
            "touches" => Ok(Self::Touches),
            "crosses" => Ok(Self::Crosses),
            "overlaps" => Ok(Self::Overlaps),
            "equals" => Ok(Self::Equals),
            "disjoint" => Ok(Self::Disjoint),
            _ => Err(GeoQueryError::UnsupportedOperation(name.to_string())),
        }
    }
}

impl std::fmt::Display for SpatialPredicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// DE-9IM dimension ordering used by the crosses predicate.
fn dimension_rank(d: Dimensions) -> u8 {
    match d {
        Dimensions::Empty => 0,
        Dimensions::ZeroDimensional => 1,
        Dimensions::OneDimensional => 2,
        Dimensions::TwoDimensional => 3,
    }
}

/// Evaluate `predicate` between two exact geometries.
///
/// `intersects`/`disjoint` use the dedicated `geo` kernels; the remaining
/// predicates go through a single DE-9IM relate pass.
pub fn evaluate_predicate(
    predicate: SpatialPredicate,
    a: &Geometry<f64>,
    b: &Geometry<f64>,
) -> Result<bool> {
    match predicate {
        SpatialPredicate::Intersects => return Ok(a.intersects(b)),
        SpatialPredicate::Disjoint => return Ok(!a.intersects(b)),
        _ => {}
    }
    let matrix = a.relate(b);
    let matches = |spec: &str| {
        matrix
            .matches(spec)
            .map_err(|e| GeoQueryError::Geometry(e.to_string()))
    };
    match predicate {
        SpatialPredicate::Contains => Ok(matrix.is_contains()),
        SpatialPredicate::Within => Ok(matrix.is_within()),
        SpatialPredicate::Equals => Ok(matrix.is_equal_topo()),
        SpatialPredicate::Touches => {
            Ok(matches("FT*******")? || matches("F**T*****")? || matches("F***T****")?)
        }
        SpatialPredicate::Crosses => match (a.dimensions(), b.dimensions()) {
            (Dimensions::OneDimensional, Dimensions::OneDimensional) => matches("0********"),
            (da, db) if dimension_rank(da) < dimension_rank(db) => matches("T*T******"),
            (da, db) if dimension_rank(da) > dimension_rank(db) => matches("T*****T**"),
            _ => Ok(false),
        },
        SpatialPredicate::Overlaps => match (a.dimensions(), b.dimensions()) {
            (Dimensions::OneDimensional, Dimensions::OneDimensional) => matches("1*T***T**"),
            (da, db) if da == db && da != Dimensions::Empty => matches("T*T***T**"),
            _ => Ok(false),
        },
        // Handled above.
        SpatialPredicate::Intersects | SpatialPredicate::Disjoint => unreachable!(),
    }
}

/// Source of exact geometry for leaf payloads.
///
/// Implementations own whatever decoding machinery and caching they need;
/// the engine only ever borrows a provider for the duration of one query.
/// `Sync` is required because the exact-evaluation stage fans out across
/// worker threads.
pub trait GeometryProvider: Sync {
    /// Decode the exact geometry behind a leaf reference.
    fn decode(&self, leaf: LeafRef) -> Result<Geometry<f64>>;

    /// Envelope of `geometry` grown by `distance` on every side.
    ///
    /// Used to turn a "within distance of X" range argument into a search
    /// window.
    fn buffer_envelope(&self, geometry: &Geometry<f64>, distance: f64) -> Result<Envelope> {
        let rect = geometry.bounding_rect().ok_or_else(|| {
            GeoQueryError::Geometry("cannot buffer an empty geometry".to_string())
        })?;
        Envelope::from_rect(rect).expand(distance)
    }

    /// Evaluate a topological predicate between two exact geometries.
    fn evaluate(
        &self,
        predicate: SpatialPredicate,
        a: &Geometry<f64>,
        b: &Geometry<f64>,
    ) -> Result<bool> {
        evaluate_predicate(predicate, a, b)
    }

    /// True if `geometry` lies within `region`. Touching the region boundary
    /// is fine, but the interiors must intersect, so a geometry lying
    /// entirely on the boundary is not within.
    fn within(&self, geometry: &Geometry<f64>, region: &Polygon<f64>) -> Result<bool> {
        self.evaluate(
            SpatialPredicate::Within,
            geometry,
            &Geometry::Polygon(region.clone()),
        )
    }

    /// Exact Euclidean distance from `geometry` to a point.
    fn distance_to_point(&self, geometry: &Geometry<f64>, point: Point<f64>) -> Result<f64> {
        Ok(Euclidean.distance(&Geometry::Point(point), geometry))
    }
}

/// [`GeometryProvider`] over an owned in-memory geometry table.
///
/// The table is owned by the provider instance, with no process-wide cache,
/// so its lifecycle is exactly the lifecycle of the snapshot it belongs to.
#[derive(Default)]
pub struct MemoryGeometryProvider {
    geometries: FxHashMap<LeafRef, Geometry<f64>>,
}

impl MemoryGeometryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the exact geometry for a leaf, replacing any previous one.
    pub fn insert(&mut self, leaf: LeafRef, geometry: impl Into<Geometry<f64>>) {
        self.geometries.insert(leaf, geometry.into());
    }

    pub fn len(&self) -> usize {
        self.geometries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.geometries.is_empty()
    }
}

impl GeometryProvider for MemoryGeometryProvider {
    fn decode(&self, leaf: LeafRef) -> Result<Geometry<f64>> {
        self.geometries
            .get(&leaf)
            .cloned()
            .ok_or_else(|| GeoQueryError::Geometry(format!("no geometry for leaf {:?}", leaf)))
    }
}
