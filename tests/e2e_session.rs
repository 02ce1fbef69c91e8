//! End-to-end tests for the session lifecycle against stub collaborators:
//! cache-first analyze, annotation merge, search focus with timed revert,
//! and write-through to a file-backed snapshot cache.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use codelens_graph::{
    AnalysisMode, AnnotationRequest, AnnotationService, EngineConfig, Error, FilePersistence,
    GraphStore, MemoryPersistence, MemoryStore, Node, NodeData, NodeId, NodeKind, Persistence,
    RepoAnalysis, RepositoryService, Result, SearchResult, SearchService, Session,
};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use tokio::sync::oneshot;

// ============================================================================
// Stub collaborators
// ============================================================================

fn widgets() -> RepoAnalysis {
    let nodes = vec![
        Node::new("src", NodeData::new("src", NodeKind::Folder).with_full_path("src")),
        Node::new("api", NodeData::new("api.ts", NodeKind::Service).with_full_path("api.ts")),
        Node::new("db", NodeData::new("db.ts", NodeKind::Utility).with_full_path("db.ts")),
        Node::new("ui", NodeData::new("ui.tsx", NodeKind::Component).with_full_path("ui.tsx")),
    ];
    RepoAnalysis::new("acme/widgets", "main")
        .with_nodes(nodes)
        .with_file_map(["src/a.ts", "src/b.ts", "api.ts", "db.ts", "ui.tsx"])
}

#[derive(Default)]
struct CountingRepos {
    calls: AtomicUsize,
    fail: bool,
}

#[async_trait]
impl RepositoryService for CountingRepos {
    async fn fetch_repository(&self, name: &str) -> Result<RepoAnalysis> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::Network(format!("{name}: 404")));
        }
        let mut analysis = widgets();
        analysis.repo_name = name.to_string();
        Ok(analysis)
    }
}

#[derive(Default)]
struct EchoAnnotator {
    calls: AtomicUsize,
}

#[async_trait]
impl AnnotationService for EchoAnnotator {
    async fn generate_annotation(&self, request: &AnnotationRequest) -> String {
        self.calls.fetch_add(1, Ordering::SeqCst);
        format!("{} of {}", request.mode, request.path)
    }
}

/// Annotator whose answer for each mode arrives only when the test sends it.
#[derive(Default)]
struct GatedAnnotator {
    gates: Mutex<HashMap<AnalysisMode, oneshot::Receiver<String>>>,
}

impl GatedAnnotator {
    fn gate(&self, mode: AnalysisMode) -> oneshot::Sender<String> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().insert(mode, rx);
        tx
    }
}

#[async_trait]
impl AnnotationService for GatedAnnotator {
    async fn generate_annotation(&self, request: &AnnotationRequest) -> String {
        let rx = self.gates.lock().remove(&request.mode);
        match rx {
            Some(rx) => rx.await.unwrap_or_default(),
            None => String::new(),
        }
    }
}

struct FixedSearch(SearchResult);

#[async_trait]
impl SearchService for FixedSearch {
    async fn search(&self, _query: &str, _nodes: &[Node], _file_map: &[String]) -> Option<SearchResult> {
        Some(self.0.clone())
    }
}

fn memory_session() -> (Session<MemoryStore>, Arc<MemoryPersistence>) {
    let db = Arc::new(MemoryPersistence::default());
    (Session::in_memory(db.clone(), EngineConfig::default()), db)
}

fn dimmed(session: &Session<MemoryStore>) -> Vec<String> {
    let mut ids: Vec<String> = session.store().nodes().into_iter()
        .filter(|n| n.data.dimmed)
        .map(|n| n.id.0)
        .collect();
    ids.sort();
    ids
}

// ============================================================================
// 1. Analyze: cache first, fetch on miss, untouched on failure
// ============================================================================

#[tokio::test]
async fn test_analyze_fetches_once_then_hits_cache() {
    let (session, db) = memory_session();
    let repos = CountingRepos::default();

    session.analyze("https://github.com/acme/widgets.git", &repos).await.unwrap();
    assert_eq!(session.repo_name().as_deref(), Some("acme/widgets"));
    assert_eq!(repos.calls.load(Ordering::SeqCst), 1);
    assert_eq!(db.len(), 1);

    session.discard();
    session.analyze("acme/widgets", &repos).await.unwrap();
    assert_eq!(repos.calls.load(Ordering::SeqCst), 1);
    assert_eq!(session.store().node_count(), 4);
}

#[tokio::test]
async fn test_failed_fetch_leaves_state_untouched() {
    let (session, _) = memory_session();
    session.install(widgets());
    session.expand(&NodeId::from("src"));
    let before = session.store().snapshot();

    let repos = CountingRepos { fail: true, ..Default::default() };
    let err = session.analyze("acme/other", &repos).await.unwrap_err();

    assert!(matches!(err, Error::Network(_)));
    assert_eq!(session.repo_name().as_deref(), Some("acme/widgets"));
    assert_eq!(session.store().snapshot(), before);
}

// ============================================================================
// 2. Annotation
// ============================================================================

#[tokio::test]
async fn test_annotation_is_cached_per_mode() {
    let (session, _) = memory_session();
    session.install(widgets());
    let annotator = EchoAnnotator::default();
    let api = NodeId::from("api");

    let text = session.annotate(&api, AnalysisMode::Explain, &annotator).await;
    assert_eq!(text.as_deref(), Some("EXPLAIN of api.ts"));

    let again = session.annotate(&api, AnalysisMode::Explain, &annotator).await;
    assert_eq!(again, text);
    assert_eq!(annotator.calls.load(Ordering::SeqCst), 1);

    session.annotate(&api, AnalysisMode::Review, &annotator).await;
    let node = session.store().node(&api).unwrap();
    assert_eq!(node.data.analysis_cache.len(), 2);
    assert_eq!(node.cached(AnalysisMode::Review), Some("REVIEW of api.ts"));
}

#[tokio::test]
async fn test_annotation_for_missing_node_is_none() {
    let (session, _) = memory_session();
    session.install(widgets());
    let annotator = EchoAnnotator::default();

    assert!(session.annotate(&NodeId::from("ghost"), AnalysisMode::Flow, &annotator).await.is_none());
    assert_eq!(annotator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_late_annotation_after_repo_switch_is_dropped() {
    let (session, _) = memory_session();
    session.install(widgets());

    let annotator = GatedAnnotator::default();
    let tx = annotator.gate(AnalysisMode::Flow);
    let api = NodeId::from("api");

    let mut other = widgets();
    other.repo_name = "acme/other".to_string();

    let (text, ()) = tokio::join!(
        session.annotate(&api, AnalysisMode::Flow, &annotator),
        async {
            tokio::task::yield_now().await;
            session.install(other);
            let _ = tx.send("late".to_string());
        },
    );

    assert!(text.is_none());
    assert_eq!(session.repo_name().as_deref(), Some("acme/other"));
    assert!(session.store().node(&api).unwrap().data.analysis_cache.is_empty());
}

#[tokio::test]
async fn test_concurrent_modes_on_one_node_both_land() {
    let (session, _) = memory_session();
    session.install(widgets());
    let annotator = GatedAnnotator::default();
    let explain = annotator.gate(AnalysisMode::Explain);
    let flow = annotator.gate(AnalysisMode::Flow);
    let api = NodeId::from("api");

    // Answers come back in the opposite order to the requests
    let (a, b, ()) = tokio::join!(
        session.annotate(&api, AnalysisMode::Explain, &annotator),
        session.annotate(&api, AnalysisMode::Flow, &annotator),
        async {
            tokio::task::yield_now().await;
            let _ = flow.send("calls db".to_string());
            tokio::task::yield_now().await;
            let _ = explain.send("entry point".to_string());
        },
    );

    assert_eq!(a.as_deref(), Some("entry point"));
    assert_eq!(b.as_deref(), Some("calls db"));
    let node = session.store().node(&api).unwrap();
    assert_eq!(node.data.analysis_cache.len(), 2);
    assert_eq!(node.cached(AnalysisMode::Explain), Some("entry point"));
    assert_eq!(node.cached(AnalysisMode::Flow), Some("calls db"));
}

// ============================================================================
// 3. Search focus and timed revert
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_search_dims_then_reverts() {
    let (session, _) = memory_session();
    session.install(widgets());
    let search = FixedSearch(SearchResult::new("api").with_path(["db"]));

    let outcome = session.search("where is the api", &search).await.unwrap();
    assert_eq!(outcome.dimmed, 2);
    assert_eq!(outcome.fit.nodes.len(), 2);
    assert_eq!(dimmed(&session), vec!["src", "ui"]);
    assert_eq!(session.selected_node().map(|n| n.id), Some(NodeId::from("api")));

    tokio::time::sleep(Duration::from_secs(14)).await;
    assert_eq!(dimmed(&session), vec!["src", "ui"]);

    tokio::time::sleep(Duration::from_secs(2)).await;
    tokio::task::yield_now().await;
    assert!(dimmed(&session).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_manual_select_clears_dimming_before_revert() {
    let (session, _) = memory_session();
    session.install(widgets());
    let search = FixedSearch(SearchResult::new("api"));

    session.search("api", &search).await.unwrap();
    assert_eq!(dimmed(&session).len(), 3);

    session.select(&NodeId::from("ui"));
    assert!(dimmed(&session).is_empty());

    // The pending revert fires harmlessly
    tokio::time::sleep(Duration::from_secs(16)).await;
    assert!(dimmed(&session).is_empty());
    assert_eq!(session.selected_node().map(|n| n.id), Some(NodeId::from("ui")));
}

#[tokio::test]
async fn test_search_without_primary_changes_nothing() {
    let (session, _) = memory_session();
    session.install(widgets());
    let search = FixedSearch(SearchResult::new(" "));

    assert!(session.search("?", &search).await.is_none());
    assert!(dimmed(&session).is_empty());
    assert!(session.selected_node().is_none());
}

// ============================================================================
// 4. Write-through to disk
// ============================================================================

#[tokio::test]
async fn test_write_through_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("analyses.json");
    let repos = CountingRepos::default();
    let annotator = EchoAnnotator::default();

    {
        let session = Session::in_memory(Arc::new(FilePersistence::new(&path)), EngineConfig::default());
        session.analyze("acme/widgets", &repos).await.unwrap();
        session.expand(&NodeId::from("src"));
        session.annotate(&NodeId::from("db"), AnalysisMode::Explain, &annotator).await;
        session.flush().await;
    }

    let reopened = FilePersistence::from_config(&path, &EngineConfig::default());
    let record = reopened.load("acme/widgets").unwrap().unwrap();
    assert_eq!(record.nodes.len(), 6);
    assert_eq!(record.edges.len(), 2);
    let db = record.nodes.iter().find(|n| n.id.as_str() == "db").unwrap();
    assert_eq!(db.cached(AnalysisMode::Explain), Some("EXPLAIN of db.ts"));

    // A fresh session restores the expanded graph without fetching
    let session = Session::in_memory(Arc::new(reopened), EngineConfig::default());
    session.analyze("acme/widgets", &repos).await.unwrap();
    assert_eq!(repos.calls.load(Ordering::SeqCst), 1);
    assert!(session.store().node(&NodeId::from("src")).unwrap().is_expanded());
    assert_eq!(session.history().len(), 1);

    session.clear_history();
    assert!(session.history().is_empty());
}

#[tokio::test]
async fn test_configured_ttl_bounds_the_cache() {
    let config = EngineConfig::default()
        .with_overrides(|key| (key == "CODELENS_CACHE_TTL_HOURS").then(|| "0".to_string()))
        .unwrap();
    let db = Arc::new(MemoryPersistence::from_config(&config));
    let session = Session::in_memory(db.clone(), config);
    let repos = CountingRepos::default();

    session.analyze("acme/widgets", &repos).await.unwrap();
    session.discard();
    session.analyze("acme/widgets", &repos).await.unwrap();

    assert_eq!(repos.calls.load(Ordering::SeqCst), 2);
    assert!(db.load("acme/widgets").unwrap().is_none());
}
