//! Query entry points over tree index snapshots.
//!
//! A [`SpatialQueryEngine`] borrows a tree index, a geometry provider, and
//! optionally a progress listener for the duration of one query call. Queries
//! are stateless across invocations: nothing is cached between calls and
//! several queries may run concurrently against the same snapshot.
//!
//! The three query classes live in their own submodules: `range` (window
//! search), `knn` (best-first k-nearest-neighbor), and `join` (synchronized
//! dual-tree spatial join).

mod join;
mod knn;
mod range;

use crate::envelope::Envelope;
use crate::error::{GeoQueryError, Result};
use crate::geometry::GeometryProvider;
use crate::index::{LeafRef, NodeRef, TreeIndex};
use crate::progress::{NoProgress, ProgressListener};
use geo::{Geometry, Point};

/// A leaf accepted by a range query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeMatch {
    pub leaf: LeafRef,
}

/// A leaf returned by a k-nearest-neighbor query, with its exact distance
/// to the query point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KnnMatch {
    pub leaf: LeafRef,
    pub distance: f64,
}

/// A pair of leaves satisfying a join predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinMatch {
    pub left: LeafRef,
    pub right: LeafRef,
}

/// Search region argument for a range query.
#[derive(Debug, Clone)]
pub enum SearchArg {
    /// A literal search window.
    Window(Envelope),
    /// Everything within `distance` of `geometry`; the window is derived by
    /// buffering the geometry's envelope through the provider.
    Around {
        geometry: Geometry<f64>,
        distance: f64,
    },
}

impl SearchArg {
    /// Decode the positional argument form: four values are a window
    /// (`min_x, min_y, max_x, max_y`), three are a point plus a buffer
    /// distance (`x, y, distance`).
    ///
    /// # Errors
    ///
    /// Any other arity fails with [`GeoQueryError::InvalidArgument`] before
    /// traversal starts; an inverted window fails with
    /// [`GeoQueryError::InvalidEnvelope`].
    pub fn from_values(values: &[f64]) -> Result<Self> {
        match *values {
            [min_x, min_y, max_x, max_y] => {
                Ok(Self::Window(Envelope::new_2d(min_x, min_y, max_x, max_y)?))
            }
            [x, y, distance] => {
                if !distance.is_finite() || distance < 0.0 {
                    return Err(GeoQueryError::InvalidArgument(format!(
                        "buffer distance must be finite and non-negative, got {distance}"
                    )));
                }
                Ok(Self::Around {
                    geometry: Geometry::Point(Point::new(x, y)),
                    distance,
                })
            }
            _ => Err(GeoQueryError::InvalidArgument(format!(
                "expected 4 window coordinates or point plus distance, got {} values",
                values.len()
            ))),
        }
    }
}

/// A node handle paired with its envelope, the working unit of every
/// traversal.
#[derive(Debug, Clone)]
pub(crate) struct NodeWithEnvelope {
    pub(crate) node: NodeRef,
    pub(crate) envelope: Envelope,
}

/// Query driver over one index snapshot.
///
/// # Examples
///
/// ```rust
/// use geo::Point;
/// use geoquery::{
///     ArenaTreeIndex, Envelope, LayerId, LeafRef, MemoryGeometryProvider, SearchArg,
///     SpatialQueryEngine,
/// };
///
/// let mut index = ArenaTreeIndex::new();
/// let mut provider = MemoryGeometryProvider::new();
/// provider.insert(LeafRef(1), Point::new(2.0, 2.0));
/// let leaf = index.add_leaf(
///     Envelope::new_2d(2.0, 2.0, 2.0, 2.0)?,
///     vec![(LeafRef(1), Envelope::new_2d(2.0, 2.0, 2.0, 2.0)?)],
/// );
/// let root = index.add_internal(vec![leaf])?;
/// index.set_layer_root(LayerId(0), root);
///
/// let engine = SpatialQueryEngine::new(&index, &provider);
/// let window = SearchArg::from_values(&[0.0, 0.0, 10.0, 10.0])?;
/// let matches = engine.range(&[LayerId(0)], &window, None)?;
/// assert_eq!(matches.len(), 1);
/// # Ok::<(), geoquery::GeoQueryError>(())
/// ```
pub struct SpatialQueryEngine<'a, I, G>
where
    I: TreeIndex,
    G: GeometryProvider,
{
    pub(crate) index: &'a I,
    pub(crate) provider: &'a G,
    pub(crate) progress: &'a dyn ProgressListener,
}

impl<'a, I, G> SpatialQueryEngine<'a, I, G>
where
    I: TreeIndex,
    G: GeometryProvider,
{
    pub fn new(index: &'a I, provider: &'a G) -> Self {
        Self {
            index,
            provider,
            progress: &NoProgress,
        }
    }

    /// Attach a progress listener for subsequent queries.
    pub fn with_progress(mut self, progress: &'a dyn ProgressListener) -> Self {
        self.progress = progress;
        self
    }

    /// Children of `node` whose envelopes intersect `region`.
    pub(crate) fn children_intersecting(
        &self,
        node: NodeRef,
        region: &Envelope,
    ) -> Result<Vec<NodeWithEnvelope>> {
        let children = self.index.children(node)?;
        self.progress.add_visited_index_nodes(children.len());
        let mut retained = Vec::with_capacity(children.len());
        for (child, envelope) in children {
            if envelope.intersects(region)? {
                retained.push(NodeWithEnvelope {
                    node: child,
                    envelope,
                });
            }
        }
        Ok(retained)
    }

    /// Every leaf reference in the subtree under `node`, in traversal order.
    pub(crate) fn collect_leaf_refs(&self, node: NodeRef) -> Result<Vec<LeafRef>> {
        let mut refs = Vec::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            if self.index.is_leaf(current)? {
                refs.extend(
                    self.index
                        .leaf_entries(current)?
                        .into_iter()
                        .map(|(leaf, _)| leaf),
                );
            } else {
                // Reverse keeps traversal order stable for a stack walk.
                for (child, _) in self.index.children(current)?.into_iter().rev() {
                    stack.push(child);
                }
            }
        }
        Ok(refs)
    }
}
