//! # codelens-graph: Incremental Architecture Graph Engine
//!
//! The state engine behind an explorable repository map. A repository is
//! summarised into a root set of module nodes; folders are then expanded
//! and collapsed on demand against the repository's flat path list,
//! per-node annotations are cached, and search results drive a temporary
//! focus mode that dims everything unrelated.
//!
//! ## Design Principles
//!
//! 1. **Trait-first**: `GraphStore` is the contract between the engine and graph state
//! 2. **Transforms, not handles**: every mutation is a pure `old list → new list` function
//! 3. **Re-derive, never cache**: selection and repository views are read back from the store
//! 4. **Collaborators at the edge**: fetch, annotation, search and persistence are traits
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use codelens_graph::{EngineConfig, MemoryPersistence, NodeId, Session};
//!
//! # fn example(analysis: codelens_graph::RepoAnalysis) {
//! let session = Session::in_memory(Arc::new(MemoryPersistence::default()), EngineConfig::default());
//! session.install(analysis);
//!
//! // Reveal the children of a folder, then hide them again
//! let src = NodeId::from("src");
//! session.toggle(&src);
//! session.toggle(&src);
//! # }
//! ```
//!
//! ## Components
//!
//! | Component | Module | Description |
//! |-----------|--------|-------------|
//! | Graph Store | `store` | Node/edge lists behind transform primitives |
//! | Layout Allocator | `layout` | Deterministic fan-out placement |
//! | Expansion Engine | `expansion` | Folder expand/collapse state machine |
//! | Analysis Cache | `cache` | Per-node, per-mode annotation merge |
//! | Focus Controller | `focus` | Search highlight, dimming and timed revert |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod store;
pub mod layout;
pub mod expansion;
pub mod cache;
pub mod focus;
pub mod services;
pub mod persistence;
pub mod bridge;
pub mod repo;
pub mod config;
pub mod session;

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{
    Node, NodeId, NodeData, NodeKind, ComplexityLevel, Position,
    Edge, EdgeId, EdgeStyle,
    AnalysisMode, AnalysisCache, RepoAnalysis, SearchResult,
};

// ============================================================================
// Re-exports: Store + engine
// ============================================================================

pub use store::{GraphStore, GraphSnapshot, MemoryStore};
pub use layout::{FanOut, Grid};
pub use expansion::{ExpansionContext, Transition, SkipReason};
pub use focus::{FitBounds, FitRequest, FocusOutcome};

// ============================================================================
// Re-exports: Collaborators
// ============================================================================

pub use services::{
    RepositoryService, AnnotationService, AnnotationRequest, SearchService,
    Persistence, TextGenerator, GuardedAnnotator,
};
pub use persistence::{MemoryPersistence, FilePersistence, WriteBehind};
pub use bridge::{ToolBridge, CodeSource, BridgeSource, ChainSource};
pub use config::EngineConfig;
pub use session::{Session, RepoContext};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A stored id no longer resolves in the graph. Engine paths treat this
    /// as a no-op; it only surfaces from collaborators that choose to report it.
    #[error("Stale reference: {0}")]
    StaleReference(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
