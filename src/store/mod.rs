//! # Graph Store Trait
//!
//! The single source of truth for the current node and edge lists.
//! Every mutation in the crate is expressed as a transform from the old
//! list to the new one, applied synchronously against the latest state.
//! Node and edge identity across transforms is by id, never by reference.
//!
//! ## Implementations
//!
//! | Store | Module | Description |
//! |-------|--------|-------------|
//! | `MemoryStore` | `memory` | `RwLock`-guarded lists, shareable across tasks |

pub mod memory;

use hashbrown::HashSet;
use tracing::debug;

use crate::model::*;

pub use memory::MemoryStore;

// ============================================================================
// GraphSnapshot
// ============================================================================

/// Both lists, owned. The unit a whole-graph transform operates on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphSnapshot {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl GraphSnapshot {
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self { nodes, edges }
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == *id)
    }

    pub fn node_mut(&mut self, id: &NodeId) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == *id)
    }

    /// Set of every `full_path` currently materialized.
    pub fn full_paths(&self) -> HashSet<&str> {
        self.nodes.iter().filter_map(Node::full_path).collect()
    }

    /// Append nodes whose id is not already present. Returns how many were added.
    pub fn append_nodes(&mut self, nodes: impl IntoIterator<Item = Node>) -> usize {
        let mut seen: HashSet<NodeId> = self.nodes.iter().map(|n| n.id.clone()).collect();
        let before = self.nodes.len();
        for node in nodes {
            if seen.insert(node.id.clone()) {
                self.nodes.push(node);
            } else {
                debug!(node = %node.id, "skipping duplicate node id");
            }
        }
        self.nodes.len() - before
    }

    /// Append edges, treating `(source, target)` as unique. Returns how many were added.
    pub fn append_edges(&mut self, edges: impl IntoIterator<Item = Edge>) -> usize {
        let mut pairs: HashSet<(NodeId, NodeId)> = self.edges.iter()
            .map(|e| (e.source.clone(), e.target.clone()))
            .collect();
        let before = self.edges.len();
        for edge in edges {
            if pairs.insert((edge.source.clone(), edge.target.clone())) {
                self.edges.push(edge);
            } else {
                debug!(source = %edge.source, target = %edge.target, "skipping duplicate edge pair");
            }
        }
        self.edges.len() - before
    }

    /// Remove the given nodes and every edge touching one of them.
    /// Returns `(nodes_removed, edges_removed)`.
    pub fn remove_nodes(&mut self, ids: &HashSet<NodeId>) -> (usize, usize) {
        let nodes_before = self.nodes.len();
        let edges_before = self.edges.len();
        self.nodes.retain(|n| !ids.contains(&n.id));
        self.edges.retain(|e| !ids.contains(&e.source) && !ids.contains(&e.target));
        (nodes_before - self.nodes.len(), edges_before - self.edges.len())
    }
}

// ============================================================================
// GraphStore Trait
// ============================================================================

/// The store contract.
///
/// Transforms are `FnMut` for object safety but are invoked exactly once per
/// call. Implementations must apply them in submission order and must never
/// block on anything but their own lock.
pub trait GraphStore: Send + Sync + 'static {
    /// Clone of the current node list.
    fn nodes(&self) -> Vec<Node>;

    /// Clone of the current edge list.
    fn edges(&self) -> Vec<Edge>;

    /// Replace the node list with `f(old)`.
    fn replace_nodes(&self, f: &mut dyn FnMut(Vec<Node>) -> Vec<Node>);

    /// Replace the edge list with `f(old)`.
    fn replace_edges(&self, f: &mut dyn FnMut(Vec<Edge>) -> Vec<Edge>);

    /// Replace both lists with `f(old)` as one atomic step.
    fn replace_graph(&self, f: &mut dyn FnMut(GraphSnapshot) -> GraphSnapshot);

    /// Monotonic counter bumped by every transform.
    fn generation(&self) -> u64;

    // ========================================================================
    // Provided helpers
    // ========================================================================

    /// Both lists. The default reads them separately; stores that can do
    /// better should override.
    fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot::new(self.nodes(), self.edges())
    }

    fn node(&self, id: &NodeId) -> Option<Node> {
        self.nodes().into_iter().find(|n| n.id == *id)
    }

    fn node_count(&self) -> usize {
        self.nodes().len()
    }

    fn edge_count(&self) -> usize {
        self.edges().len()
    }

    /// Patch one node by id against the latest state. Returns false if the
    /// id is not present; every other node passes through untouched.
    fn patch_node(&self, id: &NodeId, f: &mut dyn FnMut(&mut Node)) -> bool {
        let mut found = false;
        self.replace_nodes(&mut |nodes| {
            nodes.into_iter()
                .map(|mut n| {
                    if n.id == *id {
                        f(&mut n);
                        found = true;
                    }
                    n
                })
                .collect()
        });
        found
    }

    /// Patch every node.
    fn patch_all(&self, f: &mut dyn FnMut(&mut Node)) {
        self.replace_nodes(&mut |mut nodes| {
            for n in nodes.iter_mut() {
                f(n);
            }
            nodes
        });
    }

    /// Swap in a whole new graph, discarding the old one.
    fn load(&self, graph: GraphSnapshot) {
        let mut next = Some(graph);
        self.replace_graph(&mut |old| next.take().unwrap_or(old));
    }

    fn clear(&self) {
        self.load(GraphSnapshot::default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(id: &str) -> Node {
        Node::new(id, NodeData::new(id, NodeKind::File).with_full_path(id))
    }

    #[test]
    fn test_append_edges_is_pair_unique() {
        let mut g = GraphSnapshot::new(vec![file("a"), file("b")], Vec::new());
        let a = NodeId::from("a");
        let b = NodeId::from("b");

        assert_eq!(g.append_edges([Edge::new("e1", a.clone(), b.clone())]), 1);
        assert_eq!(g.append_edges([Edge::new("e2", a.clone(), b.clone())]), 0);
        // Reverse direction is a different pair
        assert_eq!(g.append_edges([Edge::new("e3", b, a)]), 1);
        assert_eq!(g.edges.len(), 2);
    }

    #[test]
    fn test_append_nodes_skips_known_ids() {
        let mut g = GraphSnapshot::new(vec![file("a")], Vec::new());
        assert_eq!(g.append_nodes([file("a"), file("b"), file("b")]), 1);
        assert_eq!(g.nodes.len(), 2);
    }

    #[test]
    fn test_remove_nodes_drops_touching_edges() {
        let mut g = GraphSnapshot::new(vec![file("a"), file("b"), file("c")], Vec::new());
        g.append_edges([
            Edge::new("ab", "a".into(), "b".into()),
            Edge::new("bc", "b".into(), "c".into()),
            Edge::new("ac", "a".into(), "c".into()),
        ]);

        let gone: HashSet<NodeId> = [NodeId::from("b")].into_iter().collect();
        assert_eq!(g.remove_nodes(&gone), (1, 2));
        assert_eq!(g.edges.len(), 1);
        assert_eq!(g.edges[0].id, EdgeId::from("ac"));
    }
}
