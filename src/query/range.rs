//! Window search: breadth-first descent with envelope pruning, then an exact
//! containment check against the search region.

use crate::error::Result;
use crate::geometry::GeometryProvider;
use crate::index::{LayerId, LeafRef, NodeRef, TreeIndex};
use crate::parallel::filter_map_parallel;
use crate::query::{RangeMatch, SearchArg, SpatialQueryEngine};

impl<I, G> SpatialQueryEngine<'_, I, G>
where
    I: TreeIndex,
    G: GeometryProvider,
{
    /// Find every leaf whose exact geometry lies within the search region.
    ///
    /// The descent keeps only subtrees whose envelopes intersect the search
    /// window, but envelope intersection is never the acceptance criterion:
    /// a candidate is a result only when the provider confirms its exact
    /// geometry is within the window's bounding polygon. An optional
    /// `post_filter` runs over the candidate set before the exact stage.
    pub fn range(
        &self,
        layers: &[LayerId],
        arg: &SearchArg,
        post_filter: Option<&dyn Fn(LeafRef) -> bool>,
    ) -> Result<Vec<RangeMatch>> {
        let search = match arg {
            SearchArg::Window(envelope) => envelope.clone(),
            SearchArg::Around { geometry, distance } => {
                self.provider.buffer_envelope(geometry, *distance)?
            }
        };

        self.progress.begin(3);
        let roots = layers
            .iter()
            .map(|&layer| self.index.root(layer))
            .collect::<Result<Vec<NodeRef>>>()?;

        // Level-by-level descent; a level's survivors are either candidates
        // (leaf entries) or the next level's active set.
        let mut candidates: Vec<LeafRef> = Vec::new();
        let mut active = roots;
        while !active.is_empty() {
            self.progress.add_visited_index_nodes(active.len());
            let mut next_level = Vec::new();
            for node in active {
                if self.index.is_leaf(node)? {
                    for (leaf, stored) in self.index.leaf_entries(node)? {
                        if stored.intersects(&search)? {
                            candidates.push(leaf);
                        }
                    }
                } else {
                    for (child, envelope) in self.index.children(node)? {
                        if envelope.intersects(&search)? {
                            next_level.push(child);
                        }
                    }
                }
            }
            active = next_level;
        }
        self.progress.worked(1, "searched index");

        if let Some(filter) = post_filter {
            candidates.retain(|&leaf| filter(leaf));
        }
        self.progress.add_candidate_geometries(candidates.len());
        self.progress.worked(1, "filtered candidates");

        // Exact stage: candidates are independent, so they fan out over the
        // worker pool.
        let region = search.to_polygon()?;
        let provider = self.provider;
        let matches = filter_map_parallel(&candidates, |&leaf| {
            let geometry = provider.decode(leaf)?;
            Ok(provider
                .within(&geometry, &region)?
                .then_some(RangeMatch { leaf }))
        })?;
        self.progress.worked(1, "checked exact geometry");
        self.progress.done();
        Ok(matches)
    }
}
