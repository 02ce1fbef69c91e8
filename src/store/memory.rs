//! In-memory graph store.
//!
//! This is the reference implementation of `GraphStore`: both lists live
//! behind one `RwLock`, so a whole-graph transform is atomic with respect
//! to every other transform.
//!
//! ## Limitations
//!
//! - **Clone on read**: `nodes()` and `edges()` hand out owned copies.
//!   Fine for repository-sized graphs (hundreds to low thousands of nodes).
//! - **No history**: a transform cannot be undone.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::model::*;
use super::{GraphSnapshot, GraphStore};

// ============================================================================
// MemoryStore
// ============================================================================

/// In-memory node/edge storage. Cheap to clone; clones share state.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    graph: RwLock<GraphSnapshot>,
    generation: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_graph(graph: GraphSnapshot) -> Self {
        let store = Self::new();
        *store.inner.graph.write() = graph;
        store
    }

    fn bump(&self) {
        self.inner.generation.fetch_add(1, Ordering::Relaxed);
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let graph = self.inner.graph.read();
        f.debug_struct("MemoryStore")
            .field("nodes", &graph.nodes.len())
            .field("edges", &graph.edges.len())
            .field("generation", &self.generation())
            .finish()
    }
}

// ============================================================================
// GraphStore impl
// ============================================================================

impl GraphStore for MemoryStore {
    fn nodes(&self) -> Vec<Node> {
        self.inner.graph.read().nodes.clone()
    }

    fn edges(&self) -> Vec<Edge> {
        self.inner.graph.read().edges.clone()
    }

    fn replace_nodes(&self, f: &mut dyn FnMut(Vec<Node>) -> Vec<Node>) {
        let mut graph = self.inner.graph.write();
        let old = std::mem::take(&mut graph.nodes);
        graph.nodes = f(old);
        self.bump();
    }

    fn replace_edges(&self, f: &mut dyn FnMut(Vec<Edge>) -> Vec<Edge>) {
        let mut graph = self.inner.graph.write();
        let old = std::mem::take(&mut graph.edges);
        graph.edges = f(old);
        self.bump();
    }

    fn replace_graph(&self, f: &mut dyn FnMut(GraphSnapshot) -> GraphSnapshot) {
        let mut graph = self.inner.graph.write();
        let old = std::mem::take(&mut *graph);
        *graph = f(old);
        self.bump();
    }

    fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::Relaxed)
    }

    // ========================================================================
    // Overrides: read under one lock, without cloning everything
    // ========================================================================

    fn snapshot(&self) -> GraphSnapshot {
        self.inner.graph.read().clone()
    }

    fn node(&self, id: &NodeId) -> Option<Node> {
        self.inner.graph.read().node(id).cloned()
    }

    fn node_count(&self) -> usize {
        self.inner.graph.read().nodes.len()
    }

    fn edge_count(&self) -> usize {
        self.inner.graph.read().edges.len()
    }
}

// ============================================================================
// Tests
// ============================================================================
