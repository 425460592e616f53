//! Synchronized dual-tree spatial join.
//!
//! Both trees descend together: at each level the surviving children of each
//! side are candidate-paired with a sort-based plane sweep on the x axis, and
//! only pairs whose envelopes intersect recurse with a tightened shared
//! region. Exact predicate evaluation happens once, over the leaf pairs that
//! survive the descent.

use crate::envelope::Envelope;
use crate::error::Result;
use crate::geometry::{GeometryProvider, SpatialPredicate};
use crate::index::{LayerId, LeafRef, NodeRef, TreeIndex};
use crate::parallel::filter_map_parallel;
use crate::query::{JoinMatch, NodeWithEnvelope, SpatialQueryEngine};
use rustc_hash::FxHashSet;

/// A pair of leaf index nodes (one per side) whose envelopes intersect.
type LeafNodePair = (NodeWithEnvelope, NodeWithEnvelope);

impl<I, G> SpatialQueryEngine<'_, I, G>
where
    I: TreeIndex,
    G: GeometryProvider,
{
    /// Join two layers on a spatial predicate, returning every (left, right)
    /// leaf pair that satisfies it.
    ///
    /// `Disjoint` is computed as the complement of `Intersects` over the
    /// cross product of the two layers, so the tree descent is identical;
    /// when the two root envelopes do not even touch, the whole cross
    /// product is returned without visiting a single geometry.
    pub fn join(
        &self,
        left: LayerId,
        right: LayerId,
        predicate: SpatialPredicate,
    ) -> Result<Vec<JoinMatch>> {
        let left_root = self.index.root(left)?;
        let right_root = self.index.root(right)?;
        let left_env = self.index.node_envelope(left_root)?;
        let right_env = self.index.node_envelope(right_root)?;

        let complement = predicate == SpatialPredicate::Disjoint;
        let exact = if complement {
            SpatialPredicate::Intersects
        } else {
            predicate
        };

        self.progress.begin(4);
        let matches = if let Some(region) = left_env.intersection(&right_env)? {
            self.progress.worked(1, "intersected roots");
            let leaf_pairs = self.spatial_join(left_root, right_root, &region)?;
            self.progress.worked(1, "explored index");
            let intersecting = self.evaluate_pairs(&leaf_pairs, exact)?;
            if complement {
                self.complement_of(left_root, right_root, &intersecting)?
            } else {
                intersecting
            }
        } else if complement {
            // Separated roots: every pair is disjoint, no geometry decoded.
            self.progress.worked(2, "separated roots");
            self.cross_product(left_root, right_root)?
        } else {
            self.progress.worked(2, "separated roots");
            Vec::new()
        };
        self.progress.done();
        Ok(matches)
    }

    /// [`join`](Self::join) with the predicate given by name, as accepted by
    /// [`SpatialPredicate::from_str`](std::str::FromStr).
    pub fn join_named(&self, left: LayerId, right: LayerId, name: &str) -> Result<Vec<JoinMatch>> {
        self.join(left, right, name.parse()?)
    }

    /// Descend both subtrees in lockstep, restricted to `region`, and return
    /// the leaf-node pairs whose envelopes intersect.
    fn spatial_join(
        &self,
        left: NodeRef,
        right: NodeRef,
        region: &Envelope,
    ) -> Result<Vec<LeafNodePair>> {
        let mut left_children = self.children_intersecting(left, region)?;
        let mut right_children = self.children_intersecting(right, region)?;
        left_children.sort_by(|a, b| a.envelope.min_x().total_cmp(&b.envelope.min_x()));
        right_children.sort_by(|a, b| a.envelope.min_x().total_cmp(&b.envelope.min_x()));

        let mut leaf_pairs = Vec::new();
        for (a, b) in sweep_pairs(&left_children, &right_children)? {
            let Some(shared) = a.envelope.intersection(&b.envelope)? else {
                continue;
            };
            match (self.index.is_leaf(a.node)?, self.index.is_leaf(b.node)?) {
                (true, true) => leaf_pairs.push((a, b)),
                (true, false) => {
                    self.window_probe(&a, b.node, &shared, true, &mut leaf_pairs)?;
                }
                (false, true) => {
                    self.window_probe(&b, a.node, &shared, false, &mut leaf_pairs)?;
                }
                (false, false) => {
                    leaf_pairs.extend(self.spatial_join(a.node, b.node, &shared)?);
                }
            }
        }
        Ok(leaf_pairs)
    }

    /// One side already bottomed out at a leaf node; walk the other subtree
    /// down to its leaf nodes, pruning against the leaf's envelope.
    fn window_probe(
        &self,
        leaf: &NodeWithEnvelope,
        subtree: NodeRef,
        region: &Envelope,
        leaf_is_left: bool,
        out: &mut Vec<LeafNodePair>,
    ) -> Result<()> {
        for child in self.children_intersecting(subtree, region)? {
            if !leaf.envelope.intersects(&child.envelope)? {
                continue;
            }
            if self.index.is_leaf(child.node)? {
                out.push(if leaf_is_left {
                    (leaf.clone(), child)
                } else {
                    (child, leaf.clone())
                });
            } else {
                let Some(tightened) = child.envelope.intersection(region)? else {
                    continue;
                };
                self.window_probe(leaf, child.node, &tightened, leaf_is_left, out)?;
            }
        }
        Ok(())
    }

    /// Expand leaf-node pairs into geometry pairs whose stored envelopes
    /// intersect, then evaluate the exact predicate over them in parallel.
    fn evaluate_pairs(
        &self,
        leaf_pairs: &[LeafNodePair],
        predicate: SpatialPredicate,
    ) -> Result<Vec<JoinMatch>> {
        let mut candidates: Vec<(LeafRef, LeafRef)> = Vec::new();
        for (a, b) in leaf_pairs {
            let left_entries = self.index.leaf_entries(a.node)?;
            let right_entries = self.index.leaf_entries(b.node)?;
            for (left, left_env) in &left_entries {
                for (right, right_env) in &right_entries {
                    if left_env.intersects(right_env)? {
                        candidates.push((*left, *right));
                    }
                }
            }
        }
        self.progress.add_candidate_geometries(candidates.len());
        self.progress.worked(1, "paired candidates");

        let provider = self.provider;
        let matches = filter_map_parallel(&candidates, |&(left, right)| {
            let left_geometry = provider.decode(left)?;
            let right_geometry = provider.decode(right)?;
            Ok(provider
                .evaluate(predicate, &left_geometry, &right_geometry)?
                .then_some(JoinMatch { left, right }))
        })?;
        self.progress.worked(1, "evaluated predicate");
        Ok(matches)
    }

    /// Every (left, right) pair not present in `intersecting`.
    fn complement_of(
        &self,
        left_root: NodeRef,
        right_root: NodeRef,
        intersecting: &[JoinMatch],
    ) -> Result<Vec<JoinMatch>> {
        let found: FxHashSet<(LeafRef, LeafRef)> = intersecting
            .iter()
            .map(|pair| (pair.left, pair.right))
            .collect();
        let mut pairs = self.cross_product(left_root, right_root)?;
        pairs.retain(|pair| !found.contains(&(pair.left, pair.right)));
        Ok(pairs)
    }

    fn cross_product(&self, left_root: NodeRef, right_root: NodeRef) -> Result<Vec<JoinMatch>> {
        let left_refs = self.collect_leaf_refs(left_root)?;
        let right_refs = self.collect_leaf_refs(right_root)?;
        let mut pairs = Vec::with_capacity(left_refs.len() * right_refs.len());
        for &left in &left_refs {
            for &right in &right_refs {
                pairs.push(JoinMatch { left, right });
            }
        }
        Ok(pairs)
    }
}

/// Plane sweep over two lists sorted by ascending min-x: advance the side
/// whose current element has the smaller max-x, scanning the other list
/// while it still overlaps on x, and emit each x-overlapping pair exactly
/// once with its (left, right) orientation preserved.
fn sweep_pairs(
    left: &[NodeWithEnvelope],
    right: &[NodeWithEnvelope],
) -> Result<Vec<LeafNodePair>> {
    let mut pairs = Vec::new();
    let mut i = 0;
    let mut j = 0;
    while i < left.len() && j < right.len() {
        if left[i].envelope.max_x() <= right[j].envelope.max_x() {
            let pivot = &left[i];
            for candidate in &right[j..] {
                if candidate.envelope.min_x() > pivot.envelope.max_x() {
                    break;
                }
                if pivot.envelope.intersects(&candidate.envelope)? {
                    pairs.push((pivot.clone(), candidate.clone()));
                }
            }
            i += 1;
        } else {
            let pivot = &right[j];
            for candidate in &left[i..] {
                if candidate.envelope.min_x() > pivot.envelope.max_x() {
                    break;
                }
                if candidate.envelope.intersects(&pivot.envelope)? {
                    pairs.push((candidate.clone(), pivot.clone()));
                }
            }
            j += 1;
        }
    }
    Ok(pairs)
}
