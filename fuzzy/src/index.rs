//! BK-tree over named items.
//!
//! The tree is built once from a fixed collection and only read afterwards,
//! so concurrent searches need no locking.

use std::collections::BTreeMap;

use tracing::trace;

use crate::distance::item_distance;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IndexError {
    #[error("attempted to search an index with no items")]
    EmptyIndex,
}

pub type Result<T> = std::result::Result<T, IndexError>;

/// Something addressable by a primary name and any number of aliases.
pub trait Named {
    fn name(&self) -> &str;

    fn aliases(&self) -> &[String] {
        &[]
    }

    /// Primary name followed by every alias.
    fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name()).chain(self.aliases().iter().map(String::as_str))
    }
}

impl Named for String {
    fn name(&self) -> &str {
        self
    }
}

/// How [`NameIndex::search`] ranks the items that survive filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    /// Keep only the items sharing the lowest distance.
    #[default]
    Best,
    /// Keep every survivor within the radius.
    All,
}

/// One search hit.
#[derive(Debug)]
pub struct Match<'a, T> {
    pub item: &'a T,
    pub distance: usize,
}

impl<T> Clone for Match<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Match<'_, T> {}

#[derive(Debug)]
struct Node<T> {
    item: T,
    /// Edge distance -> slot of the child in `NameIndex::nodes`.
    children: BTreeMap<usize, usize>,
}

/// BK-tree keyed by [`item_distance`].
///
/// Nodes live in a flat arena in insertion order; slot 0 is the root.
#[derive(Debug)]
pub struct NameIndex<T> {
    nodes: Vec<Node<T>>,
}

impl<T: Named> NameIndex<T> {
    pub fn build(items: impl IntoIterator<Item = T>) -> Self {
        let mut index = Self { nodes: Vec::new() };
        for item in items {
            index.insert(item);
        }
        index
    }

    fn insert(&mut self, item: T) {
        let slot = self.nodes.len();
        if slot > 0 {
            let mut cursor = 0;
            loop {
                let edge = item_distance(item.name(), self.nodes[cursor].item.names());
                match self.nodes[cursor].children.get(&edge) {
                    Some(&next) => cursor = next,
                    None => {
                        self.nodes[cursor].children.insert(edge, slot);
                        break;
                    }
                }
            }
        }
        self.nodes.push(Node {
            item,
            children: BTreeMap::new(),
        });
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Items in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + Clone {
        self.nodes.iter().map(|node| &node.item)
    }

    /// Every item whose best name or alias is within `radius` of `query`, in
    /// insertion order.
    ///
    /// Edges are keyed by primary names while queries are scored against
    /// aliases too, and the prefix rules keep the score from being a metric.
    /// The tree walk therefore only narrows the first pass; nodes it pruned
    /// are scored afterwards so no item in range is lost.
    pub fn within(&self, query: &str, radius: usize) -> Result<Vec<Match<'_, T>>> {
        if self.nodes.is_empty() {
            return Err(IndexError::EmptyIndex);
        }

        let mut scores: Vec<Option<usize>> = vec![None; self.nodes.len()];
        let mut pending = vec![0usize];
        while let Some(slot) = pending.pop() {
            let node = &self.nodes[slot];
            let distance = item_distance(query, node.item.names());
            scores[slot] = Some(distance);
            let low = distance.saturating_sub(radius);
            let high = distance.saturating_add(radius);
            pending.extend(node.children.range(low..=high).map(|(_, &child)| child));
        }

        let mut pruned = 0usize;
        let found: Vec<Match<'_, T>> = self
            .nodes
            .iter()
            .zip(scores)
            .filter_map(|(node, score)| {
                let distance = score.unwrap_or_else(|| {
                    pruned += 1;
                    item_distance(query, node.item.names())
                });
                (distance <= radius).then_some(Match {
                    item: &node.item,
                    distance,
                })
            })
            .collect();
        trace!(query, radius, pruned, "name index range query");
        Ok(found)
    }

    /// Fuzzy search at a match threshold.
    ///
    /// `threshold` is the fraction of the query that has to match; the search
    /// radius is `round(len(query) * (1 - threshold))`. Items rejected by
    /// `permissible` are dropped before ranking, so a hidden item can never
    /// shadow a visible one.
    pub fn search<F>(
        &self,
        query: &str,
        threshold: f64,
        permissible: F,
        mode: SearchMode,
    ) -> Result<Vec<Match<'_, T>>>
    where
        F: Fn(&T) -> bool,
    {
        let radius = radius_for(query, threshold);
        let mut survivors = self.within(query, radius)?;
        survivors.retain(|hit| permissible(hit.item));

        if mode == SearchMode::Best
            && let Some(best) = survivors.iter().map(|hit| hit.distance).min()
        {
            survivors.retain(|hit| hit.distance == best);
        }

        trace!(query, radius, hits = survivors.len(), "name index search");
        Ok(survivors)
    }
}

/// Search radius for `query` at `threshold` (clamped to `0.0..=1.0`).
pub fn radius_for(query: &str, threshold: f64) -> usize {
    let threshold = threshold.clamp(0.0, 1.0);
    (query.chars().count() as f64 * (1.0 - threshold)).round() as usize
}
