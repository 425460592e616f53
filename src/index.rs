//! Read-only access to hierarchical bounding-box trees.
//!
//! The query engine never owns a tree; it navigates an externally supplied
//! snapshot through the [`TreeIndex`] trait. Node and leaf identities are
//! plain integer handles so that an implementation can be an arena, a file
//! offset table, or a database cursor without the engine caring.
//!
//! [`ArenaTreeIndex`] is the bundled in-memory implementation. It performs no
//! balancing or splitting; callers place nodes exactly where they say, which
//! is all the engine needs: tree construction is out of scope here.

use crate::envelope::Envelope;
use crate::error::{GeoQueryError, Result};
use rustc_hash::FxHashMap;

/// Identifies one tree (layer) within an index snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerId(pub u64);

/// Opaque handle to a tree node. Identity semantics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRef(pub u64);

/// Opaque handle to a leaf payload object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LeafRef(pub u64);

/// Read interface over an R-tree style index snapshot.
///
/// Implementations must be consistent for the duration of one query call:
/// the engine assumes a node reported as internal stays internal and that
/// child envelopes do not change mid-traversal.
pub trait TreeIndex {
    /// Root node of a layer.
    fn root(&self, layer: LayerId) -> Result<NodeRef>;

    /// Envelope bounding everything beneath `node`.
    fn node_envelope(&self, node: NodeRef) -> Result<Envelope>;

    /// True if `node` holds leaf entries rather than child nodes.
    fn is_leaf(&self, node: NodeRef) -> Result<bool>;

    /// Child nodes of an internal node with their envelopes.
    /// Empty for leaf nodes.
    fn children(&self, node: NodeRef) -> Result<Vec<(NodeRef, Envelope)>>;

    /// Leaf entries of a leaf node, each with the envelope stored at
    /// insertion time. Empty for internal nodes.
    ///
    /// The stored envelope is a pruning hint only. It may disagree with the
    /// envelope of the exact geometry, which is why the range query
    /// re-validates candidates against exact geometry.
    fn leaf_entries(&self, node: NodeRef) -> Result<Vec<(LeafRef, Envelope)>>;
}

enum ArenaNodeKind {
    Internal(Vec<NodeRef>),
    Leaf(Vec<(LeafRef, Envelope)>),
}

struct ArenaNode {
    envelope: Envelope,
    kind: ArenaNodeKind,
}

/// In-memory [`TreeIndex`] backed by a flat node arena.
///
/// Handles are indexes into the arena, so equality and hashing never depend
/// on a live host object.
///
/// # Examples
///
/// ```rust
/// use geoquery::{ArenaTreeIndex, Envelope, LayerId, LeafRef, TreeIndex};
///
/// let mut index = ArenaTreeIndex::new();
/// let leaf = index.add_leaf(
///     Envelope::new_2d(0.0, 0.0, 10.0, 10.0)?,
///     vec![(LeafRef(1), Envelope::new_2d(2.0, 2.0, 4.0, 4.0)?)],
/// );
/// let root = index.add_internal(vec![leaf])?;
/// index.set_layer_root(LayerId(0), root);
///
/// assert!(!index.is_leaf(root)?);
/// assert_eq!(index.children(root)?.len(), 1);
/// # Ok::<(), geoquery::GeoQueryError>(())
/// ```
#[derive(Default)]
pub struct ArenaTreeIndex {
    nodes: Vec<ArenaNode>,
    layers: FxHashMap<LayerId, NodeRef>,
}

impl ArenaTreeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn node(&self, node: NodeRef) -> Result<&ArenaNode> {
        self.nodes
            .get(node.0 as usize)
            .ok_or_else(|| GeoQueryError::Index(format!("dangling node handle {:?}", node)))
    }

    fn push(&mut self, node: ArenaNode) -> NodeRef {
        let handle = NodeRef(self.nodes.len() as u64);
        self.nodes.push(node);
        handle
    }

    /// Add a leaf node holding `entries`, bounded by `envelope`.
    ///
    /// The node envelope is supplied rather than derived so that callers can
    /// model stored envelopes that drifted from the exact geometry.
    pub fn add_leaf(&mut self, envelope: Envelope, entries: Vec<(LeafRef, Envelope)>) -> NodeRef {
        self.push(ArenaNode {
            envelope,
            kind: ArenaNodeKind::Leaf(entries),
        })
    }

    /// Add an internal node over existing children. Its envelope is the
    /// union of the child envelopes.
    ///
    /// # Errors
    ///
    /// Fails with [`GeoQueryError::Index`] when `children` is empty or holds
    /// a dangling handle, and with [`GeoQueryError::DimensionMismatch`] when
    /// the children disagree on dimension.
    pub fn add_internal(&mut self, children: Vec<NodeRef>) -> Result<NodeRef> {
        let mut bounds: Option<Envelope> = None;
        for &child in &children {
            let child_envelope = &self.node(child)?.envelope;
            match &mut bounds {
                None => bounds = Some(child_envelope.clone()),
                Some(b) => b.expand_to_include(child_envelope)?,
            }
        }
        let envelope = bounds
            .ok_or_else(|| GeoQueryError::Index("internal node needs at least one child".into()))?;
        Ok(self.push(ArenaNode {
            envelope,
            kind: ArenaNodeKind::Internal(children),
        }))
    }

    /// Register `node` as the root of `layer`, replacing any previous root.
    pub fn set_layer_root(&mut self, layer: LayerId, node: NodeRef) {
        self.layers.insert(layer, node);
    }

    /// Number of nodes in the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl TreeIndex for ArenaTreeIndex {
    fn root(&self, layer: LayerId) -> Result<NodeRef> {
        self.layers
            .get(&layer)
            .copied()
            .ok_or_else(|| GeoQueryError::Index(format!("unknown layer {:?}", layer)))
    }

    fn node_envelope(&self, node: NodeRef) -> Result<Envelope> {
        Ok(self.node(node)?.envelope.clone())
    }

    fn is_leaf(&self, node: NodeRef) -> Result<bool> {
        Ok(matches!(self.node(node)?.kind, ArenaNodeKind::Leaf(_)))
    }

    fn children(&self, node: NodeRef) -> Result<Vec<(NodeRef, Envelope)>> {
        match &self.node(node)?.kind {
            ArenaNodeKind::Internal(children) => children
                .iter()
                .map(|&child| Ok((child, self.node(child)?.envelope.clone())))
                .collect(),
            ArenaNodeKind::Leaf(_) => Ok(Vec::new()),
        }
    }

    fn leaf_entries(&self, node: NodeRef) -> Result<Vec<(LeafRef, Envelope)>> {
        match &self.node(node)?.kind {
            ArenaNodeKind::Leaf(entries) => Ok(entries.clone()),
            ArenaNodeKind::Internal(_) => Ok(Vec::new()),
        }
    }
}
