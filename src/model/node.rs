//! Node in the architecture graph.

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::{AnalysisCache, AnalysisMode};

/// Stable node identifier. Immutable once a node exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// 2D canvas position.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// What a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Component,
    Service,
    Utility,
    Config,
    Folder,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Component => "component",
            Self::Service => "service",
            Self::Utility => "utility",
            Self::Config => "config",
            Self::Folder => "folder",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Complexity band derived from a 0–10 score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ComplexityLevel {
    Low,
    Moderate,
    High,
    Intense,
}

impl ComplexityLevel {
    /// `≥8` intense, `≥6` high, `≥4` moderate, otherwise low.
    pub fn from_score(score: u8) -> Self {
        Self::from_fractional(f64::from(score))
    }

    /// Same thresholds on an unrounded score: 7.6 is still `High`.
    pub fn from_fractional(score: f64) -> Self {
        if score >= 8.0 {
            Self::Intense
        } else if score >= 6.0 {
            Self::High
        } else if score >= 4.0 {
            Self::Moderate
        } else {
            Self::Low
        }
    }
}

/// Descriptive payload carried by every node.
///
/// Only `full_path`, `expanded`, `analysis_cache` and `dimmed` are read or
/// written by the engine; everything else is opaque display data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeData {
    pub label: String,
    /// Canonical repository path. `None` only for legacy nodes.
    #[serde(default)]
    pub full_path: Option<String>,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub complexity_score: u8,
    pub complexity_level: ComplexityLevel,
    #[serde(default)]
    pub lines_of_code: u64,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub concepts: SmallVec<[String; 3]>,
    /// A few child file names, shown while a folder is collapsed.
    #[serde(default, rename = "files")]
    pub files_preview: Vec<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub expanded: bool,
    #[serde(default)]
    pub analysis_cache: AnalysisCache,
    /// Focus-mode flag. Never persisted.
    #[serde(skip)]
    pub dimmed: bool,
}

impl NodeData {
    pub fn new(label: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            label: label.into(),
            full_path: None,
            kind,
            complexity_score: 0,
            complexity_level: ComplexityLevel::Low,
            lines_of_code: 0,
            summary: String::new(),
            reasoning: String::new(),
            concepts: SmallVec::new(),
            files_preview: Vec::new(),
            url: String::new(),
            expanded: false,
            analysis_cache: AnalysisCache::new(),
            dimmed: false,
        }
    }

    pub fn with_full_path(mut self, path: impl Into<String>) -> Self {
        self.full_path = Some(path.into());
        self
    }

    /// Set the score (clamped to 10) and its derived level together.
    pub fn with_complexity(mut self, score: u8) -> Self {
        self.complexity_score = score.min(10);
        self.complexity_level = ComplexityLevel::from_score(self.complexity_score);
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

/// A node in the architecture graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub position: Position,
    pub data: NodeData,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, data: NodeData) -> Self {
        Self {
            id: id.into(),
            position: Position::default(),
            data,
        }
    }

    pub fn at(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    pub fn full_path(&self) -> Option<&str> {
        self.data.full_path.as_deref()
    }

    pub fn is_folder(&self) -> bool {
        self.data.kind == NodeKind::Folder
    }

    pub fn is_expanded(&self) -> bool {
        self.data.expanded
    }

    /// Previously generated text for `mode`, if any.
    pub fn cached(&self, mode: AnalysisMode) -> Option<&str> {
        self.data.analysis_cache.get(&mode).map(String::as_str)
    }
}
