//! Focus mode: dim everything a search result does not point at.
//!
//! A focus pass computes the highlight set (related ids plus the primary),
//! sets `dimmed` on every node outside it, and hands back the nodes the
//! viewport should fit. A timed revert later clears `dimmed` everywhere.
//! The revert carries no cancellation: a manual selection clears dimming
//! straight away and the pending revert then resets flags that are
//! already false.

use std::sync::Arc;
use std::time::Duration;

use hashbrown::HashSet;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::*;
use crate::store::GraphStore;

/// Zoom bounds and padding for the viewport fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitBounds {
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub padding: f64,
}

impl Default for FitBounds {
    fn default() -> Self {
        Self { min_zoom: 0.5, max_zoom: 1.5, padding: 0.2 }
    }
}

/// What the viewport should zoom to. Exactly the highlighted nodes that exist.
#[derive(Debug, Clone, PartialEq)]
pub struct FitRequest {
    pub nodes: Vec<Node>,
    pub bounds: FitBounds,
}

/// Result of one focus pass.
#[derive(Debug, Clone, PartialEq)]
pub struct FocusOutcome {
    pub highlighted: HashSet<NodeId>,
    pub fit: FitRequest,
    /// The primary node, if it is in the graph.
    pub primary: Option<Node>,
    pub dimmed: usize,
}

/// Related ids ∪ {primary}. `None` when the result has no primary id.
pub fn highlight_set(result: &SearchResult) -> Option<HashSet<NodeId>> {
    let primary = result.primary()?;
    let mut set: HashSet<NodeId> = result.path.iter().cloned().collect();
    set.insert(primary.clone());
    Some(set)
}

/// Dim every node outside the result's highlight set.
///
/// Returns `None` and leaves the graph alone when there is no primary id.
pub fn apply_focus<S: GraphStore + ?Sized>(
    store: &S,
    result: &SearchResult,
    bounds: FitBounds,
) -> Option<FocusOutcome> {
    let highlighted = highlight_set(result)?;

    let mut dimmed = 0;
    let mut targets = Vec::new();
    let mut primary = None;
    store.patch_all(&mut |node| {
        node.data.dimmed = !highlighted.contains(&node.id);
        if node.data.dimmed {
            dimmed += 1;
        } else {
            targets.push(node.clone());
            if result.primary() == Some(&node.id) {
                primary = Some(node.clone());
            }
        }
    });

    debug!(primary = %result.node_id, highlighted = highlighted.len(), dimmed, "focus applied");
    Some(FocusOutcome {
        highlighted,
        fit: FitRequest { nodes: targets, bounds },
        primary,
        dimmed,
    })
}

/// Clear `dimmed` on every node. Returns how many were dimmed.
pub fn clear_focus<S: GraphStore + ?Sized>(store: &S) -> usize {
    let mut cleared = 0;
    store.patch_all(&mut |node| {
        if node.data.dimmed {
            node.data.dimmed = false;
            cleared += 1;
        }
    });
    cleared
}

/// Wait `delay`, then clear focus.
pub async fn revert_after<S: GraphStore + ?Sized>(store: Arc<S>, delay: Duration) -> usize {
    tokio::time::sleep(delay).await;
    let cleared = clear_focus(&*store);
    debug!(cleared, "focus reverted");
    cleared
}

/// Spawn `revert_after` on the current tokio runtime.
pub fn schedule_revert<S: GraphStore>(store: Arc<S>, delay: Duration) -> tokio::task::JoinHandle<usize> {
    tokio::spawn(revert_after(store, delay))
}
