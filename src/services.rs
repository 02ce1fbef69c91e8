//! # Collaborator Contracts
//!
//! The engine never talks to a network, a model or a disk directly. These
//! traits are the narrow seams it calls through. None of them is allowed
//! to leave partial state behind in the engine on failure.
//!
//! | Trait | Failure mode |
//! |-------|--------------|
//! | `RepositoryService` | `Err(NotFound \| Network)`; engine state untouched |
//! | `AnnotationService` | never fails; maps errors to placeholder text |
//! | `SearchService` | `None` for no match |
//! | `Persistence` | `Err`, logged and swallowed by the session |

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::bridge::{self, CodeSource};
use crate::model::*;
use crate::Result;

/// Text shown in place of an annotation that could not be generated.
pub const ANNOTATION_FAILED: &str = "Failed to generate analysis. Please check your API key.";

/// Text shown when generation succeeded but produced nothing.
pub const ANNOTATION_EMPTY: &str = "No analysis generated.";

// ============================================================================
// Repository fetch
// ============================================================================

#[async_trait]
pub trait RepositoryService: Send + Sync {
    /// Fetch and summarise a repository: root nodes and edges, the flat
    /// path list, default branch and summary metadata.
    async fn fetch_repository(&self, name: &str) -> Result<RepoAnalysis>;
}

// ============================================================================
// Annotation
// ============================================================================

/// Everything an annotation is keyed on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationRequest {
    pub repo_name: String,
    pub branch: String,
    pub path: String,
    pub kind: NodeKind,
    pub mode: AnalysisMode,
}

#[async_trait]
pub trait AnnotationService: Send + Sync {
    /// Always resolves to displayable text.
    async fn generate_annotation(&self, request: &AnnotationRequest) -> String;
}

/// The fallible half of an annotation: turns assembled context into text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, context: &str, mode: AnalysisMode) -> Result<String>;
}

/// `AnnotationService` built from a code source and a fallible generator.
///
/// The code source decides where file content comes from (tool bridge,
/// raw fetch, nothing); any generator error becomes `ANNOTATION_FAILED`.
pub struct GuardedAnnotator<G, C> {
    generator: G,
    source: C,
}

impl<G: TextGenerator, C: CodeSource> GuardedAnnotator<G, C> {
    pub fn new(generator: G, source: C) -> Self {
        Self { generator, source }
    }
}

#[async_trait]
impl<G: TextGenerator, C: CodeSource> AnnotationService for GuardedAnnotator<G, C> {
    async fn generate_annotation(&self, request: &AnnotationRequest) -> String {
        let context = bridge::annotation_context(&self.source, request).await;
        match self.generator.generate(&context, request.mode).await {
            Ok(text) if text.trim().is_empty() => ANNOTATION_EMPTY.to_string(),
            Ok(text) => text,
            Err(e) => {
                warn!(path = %request.path, mode = %request.mode, error = %e, "annotation failed");
                ANNOTATION_FAILED.to_string()
            }
        }
    }
}

// ============================================================================
// Search
// ============================================================================

#[async_trait]
pub trait SearchService: Send + Sync {
    /// Best-matching node plus related ids, or `None` for no match.
    async fn search(&self, query: &str, nodes: &[Node], file_map: &[String]) -> Option<SearchResult>;
}

// ============================================================================
// Persistence
// ============================================================================

/// Local snapshot cache keyed by repository name.
///
/// Synchronous. The session reaches `update` through a `WriteBehind`, so
/// implementations may block on I/O.
pub trait Persistence: Send + Sync {
    /// Store a full analysis, stamping it with the current time.
    fn save(&self, analysis: &RepoAnalysis) -> Result<()>;

    /// Replace the node and edge lists of an existing record and refresh
    /// its timestamp. No-op if the repository has no record.
    fn update(&self, repo_name: &str, nodes: &[Node], edges: &[Edge]) -> Result<()>;

    /// Unexpired record for `repo_name`.
    fn load(&self, repo_name: &str) -> Result<Option<RepoAnalysis>>;

    /// All records, newest first.
    fn list(&self) -> Result<Vec<RepoAnalysis>>;

    fn clear(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    struct Fixed(Result<String>);

    #[async_trait]
    impl TextGenerator for Fixed {
        async fn generate(&self, _context: &str, _mode: AnalysisMode) -> Result<String> {
            match &self.0 {
                Ok(s) => Ok(s.clone()),
                Err(_) => Err(Error::Configuration("no credential".into())),
            }
        }
    }

    struct NoCode;

    #[async_trait]
    impl CodeSource for NoCode {
        async fn read(&self, _repo: &str, _branch: &str, _path: &str) -> Option<String> {
            None
        }
    }

    fn request() -> AnnotationRequest {
        AnnotationRequest {
            repo_name: "acme/widgets".into(),
            branch: "main".into(),
            path: "src/lib.rs".into(),
            kind: NodeKind::File,
            mode: AnalysisMode::Review,
        }
    }

    #[tokio::test]
    async fn test_generator_error_becomes_placeholder() {
        let annotator = GuardedAnnotator::new(Fixed(Err(Error::Network("down".into()))), NoCode);
        assert_eq!(annotator.generate_annotation(&request()).await, ANNOTATION_FAILED);
    }

    #[tokio::test]
    async fn test_empty_text_becomes_placeholder() {
        let annotator = GuardedAnnotator::new(Fixed(Ok("  ".into())), NoCode);
        assert_eq!(annotator.generate_annotation(&request()).await, ANNOTATION_EMPTY);
    }

    #[tokio::test]
    async fn test_text_passes_through() {
        let annotator = GuardedAnnotator::new(Fixed(Ok("- solid".into())), NoCode);
        assert_eq!(annotator.generate_annotation(&request()).await, "- solid");
    }
}
