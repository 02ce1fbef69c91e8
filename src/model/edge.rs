//! Edge (directed relation) in the architecture graph.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::NodeId;

/// Opaque edge identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(pub String);

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EdgeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Where an edge came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeStyle {
    /// Produced by the repository analysis.
    #[default]
    Model,
    /// Synthesised by folder expansion. Rendered lighter and dashed.
    Inferred,
}

/// A directed edge: `source` contains or depends on `target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    #[serde(default)]
    pub style: EdgeStyle,
    #[serde(default)]
    pub animated: bool,
}

impl Edge {
    pub fn new(id: impl Into<EdgeId>, source: NodeId, target: NodeId) -> Self {
        Self {
            id: id.into(),
            source,
            target,
            style: EdgeStyle::Model,
            animated: true,
        }
    }

    /// The containment edge expansion draws from a folder to a revealed child.
    pub fn inferred(parent: &NodeId, child: &NodeId) -> Self {
        Self {
            id: EdgeId(format!("edge-{parent}-{child}")),
            source: parent.clone(),
            target: child.clone(),
            style: EdgeStyle::Inferred,
            animated: true,
        }
    }
}

impl From<String> for EdgeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}
