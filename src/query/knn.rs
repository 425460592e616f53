//! Best-first k-nearest-neighbor search with branch-and-bound pruning.

use crate::error::{GeoQueryError, Result};
use crate::geometry::GeometryProvider;
use crate::index::{LayerId, LeafRef, NodeRef, TreeIndex};
use crate::parallel::filter_map_parallel;
use crate::query::{KnnMatch, SpatialQueryEngine};
use geo::Point;
use std::collections::BinaryHeap;

/// Max-heap entry holding the current k best; the heap peek is the worst
/// retained distance.
#[derive(Debug, Clone, Copy)]
struct HeapEntry {
    leaf: LeafRef,
    distance: f64,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.leaf.cmp(&other.leaf))
    }
}

/// The worst distance still worth beating: the heap peek once the heap holds
/// k entries, unbounded before that so an underfull heap never prunes.
fn worst_distance(heap: &BinaryHeap<HeapEntry>, k: usize) -> f64 {
    if heap.len() < k {
        f64::INFINITY
    } else {
        heap.peek().map(|entry| entry.distance).unwrap_or(f64::INFINITY)
    }
}

impl<I, G> SpatialQueryEngine<'_, I, G>
where
    I: TreeIndex,
    G: GeometryProvider,
{
    /// Find the `k` leaves whose exact geometries are nearest to `point`,
    /// ordered by ascending distance.
    ///
    /// Subtrees are visited in ascending order of envelope distance to the
    /// query point, and a subtree is skipped entirely once its envelope
    /// distance exceeds the worst retained exact distance. Envelope distance
    /// lower-bounds every exact distance inside, so pruning never discards a
    /// true neighbor. Returns `min(k, total leaves)` results.
    ///
    /// # Errors
    ///
    /// `k == 0` fails with [`GeoQueryError::InvalidArgument`] before any
    /// traversal.
    pub fn knn(&self, layers: &[LayerId], point: Point<f64>, k: usize) -> Result<Vec<KnnMatch>> {
        if k == 0 {
            return Err(GeoQueryError::InvalidArgument(
                "k must be at least 1".to_string(),
            ));
        }

        self.progress.begin(layers.len());
        let mut roots = Vec::with_capacity(layers.len());
        for &layer in layers {
            let root = self.index.root(layer)?;
            let distance = self.index.node_envelope(root)?.distance_to_point(point)?;
            roots.push((root, distance));
        }
        roots.sort_by(|a, b| a.1.total_cmp(&b.1));

        let mut heap = BinaryHeap::with_capacity(k + 1);
        for (root, distance) in roots {
            if distance <= worst_distance(&heap, k) {
                self.visit(root, point, k, &mut heap)?;
            }
            self.progress.worked(1, "searched layer");
        }
        self.progress.done();

        let mut matches: Vec<KnnMatch> = heap
            .into_sorted_vec()
            .into_iter()
            .map(|entry| KnnMatch {
                leaf: entry.leaf,
                distance: entry.distance,
            })
            .collect();
        // into_sorted_vec is ascending by Ord, which is ascending distance.
        debug_assert!(matches.windows(2).all(|w| w[0].distance <= w[1].distance));
        matches.truncate(k);
        Ok(matches)
    }

    fn visit(
        &self,
        node: NodeRef,
        point: Point<f64>,
        k: usize,
        heap: &mut BinaryHeap<HeapEntry>,
    ) -> Result<()> {
        if self.index.is_leaf(node)? {
            let entries = self.index.leaf_entries(node)?;
            self.progress.add_candidate_geometries(entries.len());

            // Exact distances fan out; folding into the heap stays on the
            // traversal thread.
            let provider = self.provider;
            let measured = filter_map_parallel(&entries, |&(leaf, _)| {
                let geometry = provider.decode(leaf)?;
                let distance = provider.distance_to_point(&geometry, point)?;
                Ok(Some(HeapEntry { leaf, distance }))
            })?;
            for entry in measured {
                if heap.len() < k {
                    heap.push(entry);
                } else if entry.distance < worst_distance(heap, k) {
                    heap.pop();
                    heap.push(entry);
                }
            }
            return Ok(());
        }

        let children = self.index.children(node)?;
        self.progress.add_visited_index_nodes(children.len());
        let mut ranked = Vec::with_capacity(children.len());
        for (child, envelope) in children {
            ranked.push((child, envelope.distance_to_point(point)?));
        }
        ranked.sort_by(|a, b| a.1.total_cmp(&b.1));

        for (child, distance) in ranked {
            // Children are sorted, so the first cutoff ends the node.
            if distance > worst_distance(heap, k) {
                break;
            }
            self.visit(child, point, k, heap)?;
        }
        Ok(())
    }
}
