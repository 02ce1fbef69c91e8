//! # Architecture Graph Model
//!
//! Plain DTOs shared by the store, the engine and every collaborator.
//! Serialized field names follow the camelCase shape persisted records use.
//!
//! Design rule: this module is pure data: no I/O, no locks, no async.

pub mod node;
pub mod edge;
pub mod analysis;

pub use node::{Node, NodeId, NodeData, NodeKind, ComplexityLevel, Position};
pub use edge::{Edge, EdgeId, EdgeStyle};
pub use analysis::{AnalysisMode, AnalysisCache, RepoAnalysis, SearchResult};
