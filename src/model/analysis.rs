//! Repository analysis record, annotation modes and search results.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Edge, Node, NodeId};

/// Kind of annotation requested for a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AnalysisMode {
    /// Explanatory narrative.
    Explain,
    /// Workflow steps.
    Flow,
    /// Critique.
    Review,
}

impl AnalysisMode {
    pub const ALL: [AnalysisMode; 3] = [Self::Explain, Self::Flow, Self::Review];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Explain => "EXPLAIN",
            Self::Flow => "FLOW",
            Self::Review => "REVIEW",
        }
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisMode {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "EXPLAIN" => Ok(Self::Explain),
            "FLOW" => Ok(Self::Flow),
            "REVIEW" => Ok(Self::Review),
            other => Err(crate::Error::NotFound(format!("analysis mode '{other}'"))),
        }
    }
}

/// Mode → generated text. Grows key-wise only.
pub type AnalysisCache = BTreeMap<AnalysisMode, String>;

/// Everything known about one fetched repository.
///
/// Created once per fetch. The node and edge lists here are the bulk root
/// set; after install the graph store is authoritative and this record is
/// rebuilt from it on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoAnalysis {
    pub repo_name: String,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub overall_complexity: f64,
    #[serde(default)]
    pub overall_summary: String,
    #[serde(default)]
    pub architecture_type: String,
    /// Every known file path. Ground truth for expansion.
    #[serde(default)]
    pub file_map: Vec<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    pub default_branch: String,
}

impl RepoAnalysis {
    pub fn new(repo_name: impl Into<String>, default_branch: impl Into<String>) -> Self {
        Self {
            repo_name: repo_name.into(),
            nodes: Vec::new(),
            edges: Vec::new(),
            overall_complexity: 0.0,
            overall_summary: String::new(),
            architecture_type: String::new(),
            file_map: Vec::new(),
            timestamp: None,
            default_branch: default_branch.into(),
        }
    }

    pub fn with_nodes(mut self, nodes: Vec<Node>) -> Self {
        self.nodes = nodes;
        self
    }

    pub fn with_edges(mut self, edges: Vec<Edge>) -> Self {
        self.edges = edges;
        self
    }

    pub fn with_file_map(mut self, paths: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.file_map = paths.into_iter().map(Into::into).collect();
        self
    }
}

/// Outcome of a semantic search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub node_id: NodeId,
    /// Related node ids, in order.
    #[serde(default)]
    pub path: Vec<NodeId>,
    #[serde(default)]
    pub answer: String,
}

impl SearchResult {
    pub fn new(node_id: impl Into<NodeId>) -> Self {
        Self {
            node_id: node_id.into(),
            path: Vec::new(),
            answer: String::new(),
        }
    }

    pub fn with_path(mut self, ids: impl IntoIterator<Item = impl Into<NodeId>>) -> Self {
        self.path = ids.into_iter().map(Into::into).collect();
        self
    }

    /// The primary node id, or `None` when the search produced an empty one.
    pub fn primary(&self) -> Option<&NodeId> {
        (!self.node_id.as_str().trim().is_empty()).then_some(&self.node_id)
    }
}
