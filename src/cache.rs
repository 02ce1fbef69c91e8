//! Per-node annotation cache merge.
//!
//! A merge sets one mode's text and leaves every other mode alone. It is a
//! read-modify-write against the store's latest state, so two merges for
//! different modes of the same node never lose each other's result even
//! when both were requested before either finished.

use tracing::debug;

use crate::model::*;
use crate::store::GraphStore;

/// Set `mode` to `text` in `cache`; other modes are untouched.
pub fn merge_into(cache: &mut AnalysisCache, mode: AnalysisMode, text: impl Into<String>) {
    cache.insert(mode, text.into());
}

/// Merge one annotation into the node `id` in `store`.
///
/// Returns false if the node is gone; that is a stale reference and a no-op.
pub fn merge_analysis<S: GraphStore + ?Sized>(
    store: &S,
    id: &NodeId,
    mode: AnalysisMode,
    text: &str,
) -> bool {
    let merged = store.patch_node(id, &mut |node| {
        merge_into(&mut node.data.analysis_cache, mode, text);
    });
    if !merged {
        debug!(node = %id, %mode, "annotation arrived for a node no longer in the graph");
    }
    merged
}
