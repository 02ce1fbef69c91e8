//! The top-level handle.
//!
//! A `Session` owns one graph store and wires the engine components to the
//! collaborators. It holds the current repository context (name, branch,
//! flat path list, summary) and the id of the selected node; node data is
//! always read back from the store, never cached here.
//!
//! ```text
//! expand/collapse ──▶ expansion ─┐
//! annotate ────────▶ cache ──────┼──▶ GraphStore ──▶ WriteBehind ──▶ Persistence
//! search ──────────▶ focus ──────┘
//! ```

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::cache;
use crate::config::EngineConfig;
use crate::expansion::{self, ExpansionContext, SkipReason, Transition};
use crate::focus::{self, FocusOutcome};
use crate::model::*;
use crate::persistence::WriteBehind;
use crate::repo::normalize_repo_name;
use crate::services::{AnnotationRequest, AnnotationService, Persistence, RepositoryService, SearchService};
use crate::store::{GraphSnapshot, GraphStore, MemoryStore};
use crate::Result;

// ============================================================================
// Repository context
// ============================================================================

/// The repository-level half of a `RepoAnalysis`: everything except the
/// node and edge lists, which live in the store.
#[derive(Debug, Clone, PartialEq)]
pub struct RepoContext {
    pub repo_name: String,
    pub default_branch: String,
    pub file_map: Arc<[String]>,
    pub overall_complexity: f64,
    pub overall_summary: String,
    pub architecture_type: String,
    pub timestamp: Option<DateTime<Utc>>,
}

impl RepoContext {
    fn split(analysis: RepoAnalysis) -> (Self, GraphSnapshot) {
        let ctx = Self {
            repo_name: analysis.repo_name,
            default_branch: analysis.default_branch,
            file_map: analysis.file_map.into(),
            overall_complexity: analysis.overall_complexity,
            overall_summary: analysis.overall_summary,
            architecture_type: analysis.architecture_type,
            timestamp: analysis.timestamp,
        };
        (ctx, GraphSnapshot::new(analysis.nodes, analysis.edges))
    }

    fn join(&self, graph: GraphSnapshot) -> RepoAnalysis {
        RepoAnalysis {
            repo_name: self.repo_name.clone(),
            nodes: graph.nodes,
            edges: graph.edges,
            overall_complexity: self.overall_complexity,
            overall_summary: self.overall_summary.clone(),
            architecture_type: self.architecture_type.clone(),
            file_map: self.file_map.to_vec(),
            timestamp: self.timestamp,
            default_branch: self.default_branch.clone(),
        }
    }
}

// ============================================================================
// Session
// ============================================================================

pub struct Session<S: GraphStore> {
    store: Arc<S>,
    repo: RwLock<Option<RepoContext>>,
    selected: RwLock<Option<NodeId>>,
    writer: WriteBehind,
    config: EngineConfig,
    last_write: Mutex<Option<Instant>>,
}

impl Session<MemoryStore> {
    /// Session over a fresh `MemoryStore`.
    pub fn in_memory(persistence: Arc<dyn Persistence>, config: EngineConfig) -> Self {
        Self::new(MemoryStore::new(), persistence, config)
    }
}

impl<S: GraphStore> Session<S> {
    pub fn new(store: S, persistence: Arc<dyn Persistence>, config: EngineConfig) -> Self {
        Self {
            store: Arc::new(store),
            repo: RwLock::new(None),
            selected: RwLock::new(None),
            writer: WriteBehind::new(persistence),
            config,
            last_write: Mutex::new(None),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ========================================================================
    // Repository lifecycle
    // ========================================================================

    /// Make `analysis` the current repository, replacing whatever was loaded.
    ///
    /// Every node starts undimmed; caches carried by the record are kept.
    pub fn install(&self, analysis: RepoAnalysis) {
        let (ctx, mut graph) = RepoContext::split(analysis);
        for node in &mut graph.nodes {
            node.data.dimmed = false;
        }
        info!(repo = %ctx.repo_name, nodes = graph.nodes.len(), edges = graph.edges.len(),
              paths = ctx.file_map.len(), "repository installed");

        *self.selected.write() = None;
        *self.repo.write() = Some(ctx);
        self.store.load(graph);
    }

    /// Drop the current repository. Late callbacks become no-ops.
    pub fn discard(&self) {
        *self.selected.write() = None;
        *self.repo.write() = None;
        self.store.clear();
    }

    pub fn repo_name(&self) -> Option<String> {
        self.repo.read().as_ref().map(|r| r.repo_name.clone())
    }

    pub fn repo_context(&self) -> Option<RepoContext> {
        self.repo.read().clone()
    }

    /// The current repository record, rebuilt from the latest store state.
    pub fn analysis(&self) -> Option<RepoAnalysis> {
        let repo = self.repo.read();
        repo.as_ref().map(|ctx| ctx.join(self.store.snapshot()))
    }

    /// Load `input` from the snapshot cache, or fetch it through `service`.
    ///
    /// On failure the session is left exactly as it was.
    pub async fn analyze<R>(&self, input: &str, service: &R) -> Result<()>
    where
        R: RepositoryService + ?Sized,
    {
        let name = normalize_repo_name(input);
        self.writer.flush().await;

        let cached = self.persistence().load(&name).unwrap_or_else(|e| {
            warn!(repo = %name, error = %e, "snapshot cache read failed");
            None
        });
        if let Some(analysis) = cached {
            info!(repo = %name, "snapshot cache hit");
            self.install(analysis);
            return Ok(());
        }

        let analysis = service.fetch_repository(&name).await?;
        if let Err(e) = self.persistence().save(&analysis) {
            warn!(repo = %name, error = %e, "snapshot cache write failed");
        }
        self.install(analysis);
        Ok(())
    }

    /// Cached records, newest first. Read failures yield an empty list.
    pub fn history(&self) -> Vec<RepoAnalysis> {
        self.persistence().list().unwrap_or_else(|e| {
            warn!(error = %e, "snapshot cache list failed");
            Vec::new()
        })
    }

    pub fn clear_history(&self) {
        if let Err(e) = self.persistence().clear() {
            warn!(error = %e, "snapshot cache clear failed");
        }
    }

    // ========================================================================
    // Expansion
    // ========================================================================

    /// Expand a collapsed folder or collapse an expanded one.
    pub fn toggle(&self, id: &NodeId) -> Transition {
        self.transition(id, expansion::toggle)
    }

    pub fn expand(&self, id: &NodeId) -> Transition {
        self.transition(id, expansion::expand)
    }

    pub fn collapse(&self, id: &NodeId) -> Transition {
        self.transition(id, expansion::collapse)
    }

    fn transition(
        &self,
        id: &NodeId,
        step: fn(&mut GraphSnapshot, &NodeId, Option<&ExpansionContext<'_>>) -> Transition,
    ) -> Transition {
        let repo = self.repo.read().clone();
        let ctx = repo.as_ref().map(|r| ExpansionContext {
            repo_name: &r.repo_name,
            default_branch: &r.default_branch,
            file_map: &r.file_map,
            view_base_url: &self.config.view_base_url,
            fan_out: &self.config.fan_out,
        });

        let mut outcome = Transition::Skipped(SkipReason::NoFileMap);
        self.store.replace_graph(&mut |mut graph| {
            outcome = step(&mut graph, id, ctx.as_ref());
            graph
        });

        if outcome.changed() {
            self.write_through();
        } else {
            debug!(node = %id, ?outcome, "transition skipped");
        }
        outcome
    }

    // ========================================================================
    // Annotation
    // ========================================================================

    /// Merge `text` into the node's cache for `mode`. False if the node is gone.
    pub fn merge_analysis(&self, id: &NodeId, mode: AnalysisMode, text: &str) -> bool {
        let merged = cache::merge_analysis(&*self.store, id, mode, text);
        if merged {
            self.write_through();
        }
        merged
    }

    /// Annotation text for a node, generating and caching it if needed.
    ///
    /// Returns `None` when the node or repository disappeared, either
    /// before the request or while it was in flight.
    pub async fn annotate<A>(&self, id: &NodeId, mode: AnalysisMode, service: &A) -> Option<String>
    where
        A: AnnotationService + ?Sized,
    {
        let node = self.store.node(id)?;
        if let Some(text) = node.cached(mode) {
            return Some(text.to_string());
        }
        let (repo_name, branch) = {
            let repo = self.repo.read();
            let ctx = repo.as_ref()?;
            (ctx.repo_name.clone(), ctx.default_branch.clone())
        };

        let request = AnnotationRequest {
            path: node.data.full_path.clone().unwrap_or_else(|| node.data.label.clone()),
            kind: node.data.kind,
            repo_name: repo_name.clone(),
            branch,
            mode,
        };
        let text = service.generate_annotation(&request).await;

        if self.repo_name().as_deref() != Some(repo_name.as_str()) {
            debug!(node = %id, "annotation arrived after a repository switch");
            return None;
        }
        self.merge_analysis(id, mode, &text).then_some(text)
    }

    // ========================================================================
    // Selection + focus
    // ========================================================================

    /// Manual selection. Clears any focus dimming.
    pub fn select(&self, id: &NodeId) -> Option<Node> {
        focus::clear_focus(&*self.store);
        let node = self.store.node(id)?;
        *self.selected.write() = Some(id.clone());
        Some(node)
    }

    pub fn clear_selection(&self) {
        *self.selected.write() = None;
    }

    /// The selected node as it is in the store right now.
    pub fn selected_node(&self) -> Option<Node> {
        let id = self.selected.read().clone()?;
        self.store.node(&id)
    }

    /// Apply focus mode for a search result and select its primary node.
    ///
    /// Does not schedule the revert; see `search` or `focus::schedule_revert`.
    pub fn focus(&self, result: &SearchResult) -> Option<FocusOutcome> {
        let outcome = focus::apply_focus(&*self.store, result, self.config.fit)?;
        if let Some(primary) = &outcome.primary {
            *self.selected.write() = Some(primary.id.clone());
        }
        Some(outcome)
    }

    /// Clear focus dimming on every node.
    pub fn revert_focus(&self) -> usize {
        focus::clear_focus(&*self.store)
    }

    /// Run a search, focus its result and schedule the timed revert.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn search<Q>(&self, query: &str, service: &Q) -> Option<FocusOutcome>
    where
        Q: SearchService + ?Sized,
    {
        let file_map = self.repo.read().as_ref()
            .map(|r| Arc::clone(&r.file_map))
            .unwrap_or_else(|| Arc::from(Vec::new()));
        let nodes = self.store.nodes();
        if nodes.is_empty() {
            return None;
        }

        let result = service.search(query, &nodes, &file_map).await?;
        let outcome = self.focus(&result)?;
        focus::schedule_revert(Arc::clone(&self.store), self.config.dim_revert);
        Some(outcome)
    }

    // ========================================================================
    // Write-through
    // ========================================================================

    /// True for `saving_indicator` after the last write-through.
    pub fn is_saving(&self) -> bool {
        self.last_write.lock()
            .is_some_and(|t| t.elapsed() < self.config.saving_indicator)
    }

    /// Wait for queued write-throughs to reach the persistence.
    pub async fn flush(&self) {
        self.writer.flush().await;
    }

    fn persistence(&self) -> &dyn Persistence {
        &**self.writer.persistence()
    }

    fn write_through(&self) {
        let Some(repo_name) = self.repo_name() else {
            return;
        };
        *self.last_write.lock() = Some(Instant::now());
        let graph = self.store.snapshot();
        self.writer.submit(&repo_name, graph.nodes, graph.edges);
    }
}
