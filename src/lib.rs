//! Spatial query engine over bounding-box tree indexes: window search,
//! k-nearest-neighbor, and dual-tree spatial joins with envelope pruning.
//!
//! ```rust
//! use geo::Point;
//! use geoquery::{
//!     ArenaTreeIndex, Envelope, LayerId, LeafRef, MemoryGeometryProvider, SearchArg,
//!     SpatialQueryEngine,
//! };
//!
//! let mut index = ArenaTreeIndex::new();
//! let mut provider = MemoryGeometryProvider::new();
//! provider.insert(LeafRef(1), Point::new(2.0, 3.0));
//! let envelope = Envelope::new_2d(2.0, 3.0, 2.0, 3.0)?;
//! let leaf = index.add_leaf(envelope.clone(), vec![(LeafRef(1), envelope)]);
//! let root = index.add_internal(vec![leaf])?;
//! index.set_layer_root(LayerId(0), root);
//!
//! let engine = SpatialQueryEngine::new(&index, &provider);
//! let window = SearchArg::from_values(&[0.0, 0.0, 10.0, 10.0])?;
//! let matches = engine.range(&[LayerId(0)], &window, None)?;
//! assert_eq!(matches[0].leaf, LeafRef(1));
//!
//! let nearest = engine.knn(&[LayerId(0)], Point::new(0.0, 0.0), 1)?;
//! assert_eq!(nearest[0].leaf, LeafRef(1));
//! # Ok::<(), geoquery::GeoQueryError>(())
//! ```

pub mod envelope;
pub mod error;
pub mod geometry;
pub mod index;
pub mod parallel;
pub mod progress;
pub mod query;

pub use envelope::Envelope;
pub use error::{GeoQueryError, Result};

pub use geo::{Geometry, Point, Polygon, Rect};

pub use geometry::{GeometryProvider, MemoryGeometryProvider, SpatialPredicate};

pub use index::{ArenaTreeIndex, LayerId, LeafRef, NodeRef, TreeIndex};

pub use progress::{LogProgress, NoProgress, ProgressListener};

pub use query::{JoinMatch, KnnMatch, RangeMatch, SearchArg, SpatialQueryEngine};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {

    pub use crate::{Envelope, GeoQueryError, Result};

    pub use geo::{Geometry, Point, Polygon, Rect};

    pub use crate::{ArenaTreeIndex, LayerId, LeafRef, NodeRef, TreeIndex};

    pub use crate::{GeometryProvider, MemoryGeometryProvider, SpatialPredicate};

    pub use crate::{SearchArg, SpatialQueryEngine};

    pub use crate::{LogProgress, NoProgress, ProgressListener};
}
