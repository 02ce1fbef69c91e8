//! Repository-side helpers for service implementations.
//!
//! Name normalisation, tree filtering, and hydration of a model's module
//! drafts into a `RepoAnalysis` ready to install. Nothing here performs
//! I/O; fetch implementations call these around their own network code.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::config::EngineConfig;
use crate::expansion::view_url;
use crate::model::*;

// ============================================================================
// Names and paths
// ============================================================================

/// `https://github.com/owner/repo.git` → `owner/repo`.
///
/// Inputs with fewer than two segments are returned unchanged.
pub fn normalize_repo_name(input: &str) -> String {
    let clean = input.trim()
        .replace("https://github.com/", "")
        .replace(".git", "");
    let parts: Vec<&str> = clean.split('/').filter(|p| !p.trim().is_empty()).collect();
    match parts.as_slice() {
        [owner, repo, ..] => format!("{owner}/{repo}"),
        _ => input.to_string(),
    }
}

const KEPT_EXTENSIONS: &[&str] = &[
    "ts", "tsx", "js", "jsx", "py", "go", "rs", "java", "c", "cpp", "h",
    "css", "html", "json", "csv", "xml", "yaml", "yml", "md", "txt", "pdf", "sql",
];

/// Whether a tree path is worth showing: no vendored, test or dot paths,
/// and a recognised source or document extension.
pub fn is_relevant_path(path: &str) -> bool {
    if path.contains("node_modules") || path.contains("test") || path.starts_with('.') {
        return false;
    }
    path.rsplit_once('.')
        .is_some_and(|(_, ext)| KEPT_EXTENSIONS.contains(&ext))
}

/// Relevant paths, in input order, capped at `limit`
/// (normally `EngineConfig::max_tree_paths`).
pub fn filter_tree_paths<I, P>(paths: I, limit: usize) -> Vec<String>
where
    I: IntoIterator<Item = P>,
    P: AsRef<str>,
{
    paths.into_iter()
        .filter(|p| is_relevant_path(p.as_ref()))
        .map(|p| p.as_ref().to_string())
        .take(limit)
        .collect()
}

// ============================================================================
// Hydration
// ============================================================================

/// One module as described by the repository model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleDraft {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub full_path: Option<String>,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default)]
    pub complexity_score: f64,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub concepts: Vec<String>,
    #[serde(default)]
    pub lines_of_code: f64,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeDraft {
    pub id: String,
    pub source: String,
    pub target: String,
}

/// The repository model's structured answer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelOutput {
    #[serde(default)]
    pub repo_name: Option<String>,
    #[serde(default)]
    pub overall_summary: String,
    #[serde(default)]
    pub architecture_type: String,
    #[serde(default)]
    pub nodes: Vec<ModuleDraft>,
    #[serde(default)]
    pub edges: Vec<EdgeDraft>,
}

/// The repository listing a fetch produced alongside the model output.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TreeListing {
    pub default_branch: String,
    pub file_paths: Vec<String>,
}

/// Turn model output plus a raw tree listing into an installable analysis.
///
/// Drafts whose kind is folder, or whose label has no extension, become
/// collapsed folders. Root nodes are laid out on the configured grid. The
/// listing is filtered and capped at `max_tree_paths` to form the file map.
/// The stored score is rounded; level and overall mean use the raw score.
pub fn hydrate(repo_name: &str, output: ModelOutput, listing: TreeListing, config: &EngineConfig) -> RepoAnalysis {
    let branch = listing.default_branch;
    let mut raw_total = 0.0;
    let draft_count = output.nodes.len();
    let nodes: Vec<Node> = output.nodes.into_iter()
        .enumerate()
        .map(|(i, draft)| {
            let is_folder = draft.kind == NodeKind::Folder || !draft.label.contains('.');
            let path = draft.full_path
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| draft.label.clone());
            let raw = draft.complexity_score.clamp(0.0, 10.0);
            raw_total += raw;

            let mut data = NodeData::new(draft.label, if is_folder { NodeKind::Folder } else { draft.kind })
                .with_complexity(raw.round() as u8)
                .with_summary(draft.summary)
                .with_url(view_url(&config.view_base_url, repo_name, &branch, &path, is_folder))
                .with_full_path(path);
            data.complexity_level = ComplexityLevel::from_fractional(raw);
            data.reasoning = draft.reasoning;
            data.lines_of_code = draft.lines_of_code.max(0.0) as u64;
            data.concepts = SmallVec::from_vec(draft.concepts);
            data.files_preview = draft.files;

            Node::new(draft.id, data).at(config.grid.place(i))
        })
        .collect();

    let edges = output.edges.into_iter()
        .map(|e| Edge::new(e.id, NodeId(e.source), NodeId(e.target)))
        .collect();

    let overall_complexity = if draft_count == 0 { 0.0 } else { raw_total / draft_count as f64 };

    RepoAnalysis {
        repo_name: output.repo_name.unwrap_or_else(|| repo_name.to_string()),
        nodes,
        edges,
        overall_complexity,
        overall_summary: output.overall_summary,
        architecture_type: output.architecture_type,
        file_map: filter_tree_paths(listing.file_paths, config.max_tree_paths),
        timestamp: None,
        default_branch: branch,
    }
}
