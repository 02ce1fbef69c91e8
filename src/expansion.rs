//! Folder expansion engine.
//!
//! Each folder node is either collapsed or expanded. Expanding scans the
//! repository's flat path list for immediate children, materializes the
//! ones not yet in the graph, fans them out around the parent and links
//! them with inferred edges. Collapsing removes every node nested under
//! the folder's path, at any depth, together with all edges touching them.
//!
//! ```text
//!            expand: scan file map, add children + edges
//! collapsed ───────────────────────────────────────────▶ expanded
//!     ▲                                                      │
//!     └──────────────────────────────────────────────────────┘
//!            collapse: drop every path under "<folder>/"
//! ```
//!
//! The functions here operate on a `GraphSnapshot` and are applied through
//! `GraphStore::replace_graph`, so one transition is one atomic transform.

use hashbrown::HashSet;
use tracing::debug;

use crate::layout::FanOut;
use crate::model::*;
use crate::store::GraphSnapshot;

// ============================================================================
// Context
// ============================================================================

/// What the engine needs to know about the current repository.
#[derive(Debug, Clone, Copy)]
pub struct ExpansionContext<'a> {
    pub repo_name: &'a str,
    pub default_branch: &'a str,
    /// Flat path list; ground truth for children.
    pub file_map: &'a [String],
    pub view_base_url: &'a str,
    pub fan_out: &'a FanOut,
}

// ============================================================================
// Transition result
// ============================================================================

/// Outcome of one expand/collapse request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Expanded { added_nodes: usize, added_edges: usize },
    Collapsed { removed_nodes: usize, removed_edges: usize },
    /// Guard tripped; the graph is unchanged.
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No node with the requested id (e.g. a callback after a repository switch).
    MissingNode,
    /// The node has no `full_path`.
    MissingPath,
    /// No repository, hence no flat path list, is loaded.
    NoFileMap,
    /// Already in the requested state.
    AlreadyInState,
}

impl Transition {
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }

    /// True if the graph was changed.
    pub fn changed(&self) -> bool {
        !self.is_skipped()
    }
}

// ============================================================================
// Transitions
// ============================================================================

/// Expand a collapsed node, collapse an expanded one.
pub fn toggle(graph: &mut GraphSnapshot, id: &NodeId, ctx: Option<&ExpansionContext<'_>>) -> Transition {
    match graph.node(id) {
        None => Transition::Skipped(SkipReason::MissingNode),
        Some(n) if n.is_expanded() => collapse(graph, id, ctx),
        Some(_) => expand(graph, id, ctx),
    }
}

/// Reveal the immediate children of a collapsed folder.
pub fn expand(graph: &mut GraphSnapshot, id: &NodeId, ctx: Option<&ExpansionContext<'_>>) -> Transition {
    let Some(ctx) = ctx else {
        return Transition::Skipped(SkipReason::NoFileMap);
    };
    let Some(parent) = graph.node(id) else {
        return Transition::Skipped(SkipReason::MissingNode);
    };
    if parent.is_expanded() {
        return Transition::Skipped(SkipReason::AlreadyInState);
    }
    let Some(folder_path) = parent.full_path() else {
        return Transition::Skipped(SkipReason::MissingPath);
    };
    let origin = parent.position;

    // Distinct paths can derive the same id (`a/b-c` and `a-b/c`); the
    // first materialized path keeps it and later ones are not revealed.
    let new_paths: Vec<String> = {
        let existing = graph.full_paths();
        let mut taken: HashSet<NodeId> = graph.nodes.iter().map(|n| n.id.clone()).collect();
        immediate_children(ctx.file_map, folder_path)
            .into_iter()
            .filter(|p| !existing.contains(p.as_str()))
            .filter(|p| {
                let fresh = taken.insert(derive_node_id(p));
                if !fresh {
                    debug!(path = %p, "derived id already taken, not revealing");
                }
                fresh
            })
            .collect()
    };

    let positions = ctx.fan_out.place(origin, new_paths.len());
    let children: Vec<Node> = new_paths.iter()
        .zip(positions)
        .map(|(path, position)| materialize(path, position, ctx))
        .collect();
    let edges: Vec<Edge> = children.iter().map(|c| Edge::inferred(id, &c.id)).collect();

    let added_nodes = graph.append_nodes(children);
    let added_edges = graph.append_edges(edges);
    if let Some(parent) = graph.node_mut(id) {
        parent.data.expanded = true;
    }

    debug!(node = %id, added_nodes, added_edges, "expanded folder");
    Transition::Expanded { added_nodes, added_edges }
}

/// Hide everything nested under an expanded folder.
pub fn collapse(graph: &mut GraphSnapshot, id: &NodeId, ctx: Option<&ExpansionContext<'_>>) -> Transition {
    if ctx.is_none() {
        return Transition::Skipped(SkipReason::NoFileMap);
    }
    let Some(parent) = graph.node(id) else {
        return Transition::Skipped(SkipReason::MissingNode);
    };
    if !parent.is_expanded() {
        return Transition::Skipped(SkipReason::AlreadyInState);
    }
    let Some(folder_path) = parent.full_path() else {
        return Transition::Skipped(SkipReason::MissingPath);
    };

    let doomed = descendants(graph, folder_path);
    let (removed_nodes, removed_edges) = graph.remove_nodes(&doomed);
    if let Some(parent) = graph.node_mut(id) {
        parent.data.expanded = false;
    }

    debug!(node = %id, removed_nodes, removed_edges, "collapsed folder");
    Transition::Collapsed { removed_nodes, removed_edges }
}

// ============================================================================
// Path helpers
// ============================================================================

/// `path` with exactly one trailing `/`.
fn folder_prefix(path: &str) -> String {
    if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{path}/")
    }
}

/// Ids of every node strictly nested under `folder_path`.
pub fn descendants(graph: &GraphSnapshot, folder_path: &str) -> HashSet<NodeId> {
    let prefix = folder_prefix(folder_path);
    graph.nodes.iter()
        .filter(|n| n.full_path().is_some_and(|p| p != folder_path && p.starts_with(&prefix)))
        .map(|n| n.id.clone())
        .collect()
}

/// Immediate child paths of `folder_path`, deduplicated, in file-map order.
pub fn immediate_children(file_map: &[String], folder_path: &str) -> Vec<String> {
    let prefix = folder_prefix(folder_path);
    let mut seen = HashSet::new();
    let mut children = Vec::new();
    for path in file_map {
        let Some(rest) = path.strip_prefix(prefix.as_str()) else {
            continue;
        };
        let segment = rest.split('/').next().unwrap_or_default();
        if segment.is_empty() {
            continue;
        }
        let child = format!("{prefix}{segment}");
        if seen.insert(child.clone()) {
            children.push(child);
        }
    }
    children
}

/// A path is a folder if some file lives beneath it.
pub fn is_folder_path(file_map: &[String], path: &str) -> bool {
    let prefix = folder_prefix(path);
    file_map.iter().any(|f| f.starts_with(&prefix))
}

/// `auto-` + path with `/` and whitespace replaced by `-`.
pub fn derive_node_id(path: &str) -> NodeId {
    let slug: String = path.chars()
        .map(|c| if c == '/' || c.is_whitespace() { '-' } else { c })
        .collect();
    NodeId(format!("auto-{slug}"))
}

/// Link to the repository's tree (folder) or blob (file) view of `path`.
pub fn view_url(base: &str, repo: &str, branch: &str, path: &str, is_folder: bool) -> String {
    let kind = if is_folder { "tree" } else { "blob" };
    format!(
        "{}/{repo}/{kind}/{branch}/{}",
        base.trim_end_matches('/'),
        encode_component(path),
    )
}

/// Percent-encode everything outside the URI-component unreserved set.
fn encode_component(s: &str) -> String {
    const KEEP: &[u8] = b"-_.!~*'()";
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        if b.is_ascii_alphanumeric() || KEEP.contains(&b) {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

/// Build the placeholder node for a newly revealed path.
fn materialize(path: &str, position: Position, ctx: &ExpansionContext<'_>) -> Node {
    let label = path.rsplit('/').next().unwrap_or(path);
    let is_folder = is_folder_path(ctx.file_map, path);
    let kind = if is_folder {
        NodeKind::Folder
    } else if label.ends_with(".json") {
        NodeKind::Config
    } else {
        NodeKind::File
    };
    let summary = if is_folder {
        "Directory".to_string()
    } else {
        match label.rsplit_once('.') {
            Some((_, ext)) => format!("{} File", ext.to_uppercase()),
            None => "File".to_string(),
        }
    };

    let mut data = NodeData::new(label, kind)
        .with_full_path(path)
        .with_complexity(2)
        .with_summary(summary)
        .with_url(view_url(ctx.view_base_url, ctx.repo_name, ctx.default_branch, path, is_folder));
    data.reasoning = "Expanded from parent".to_string();

    Node::new(derive_node_id(path), data).at(position)
}

// ============================================================================
// Tests
// ============================================================================
