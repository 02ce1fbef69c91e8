//! Optional external tool bridge and code-sourcing strategies.
//!
//! A tool bridge is a request/response side-channel to named tool
//! providers (list tools, call a tool, health and status). It only ever
//! feeds the annotation and repository services; the graph engine has no
//! path to it. `CodeSource` is the strategy seam those services use:
//! `BridgeSource` reads through a bridge, `ChainSource` tries several
//! sources in order.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::model::NodeKind;
use crate::services::AnnotationRequest;
use crate::Result;

/// Lines of code included in an annotation context.
pub const SNIPPET_LINES: usize = 200;

/// Characters of bridge output kept per read.
pub const BRIDGE_READ_LIMIT: usize = 10_000;

// ============================================================================
// Bridge DTOs
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub input_schema: Value,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse {
    #[serde(default)]
    pub content: Vec<Value>,
    #[serde(default)]
    pub is_error: bool,
}

impl ToolResponse {
    /// Concatenated `text` parts, or the raw JSON when there are none.
    pub fn text(&self) -> String {
        let parts: Vec<&str> = self.content.iter()
            .filter_map(|c| c.get("text").and_then(Value::as_str))
            .collect();
        if parts.is_empty() {
            Value::Array(self.content.clone()).to_string()
        } else {
            parts.join("\n")
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderStatus {
    pub name: String,
    pub connected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BridgeStatus {
    pub initialized: bool,
    #[serde(default)]
    pub servers: Vec<ProviderStatus>,
}

impl BridgeStatus {
    pub fn is_connected(&self, provider: &str) -> bool {
        self.initialized && self.servers.iter().any(|s| s.name == provider && s.connected)
    }
}

// ============================================================================
// ToolBridge Trait
// ============================================================================

#[async_trait]
pub trait ToolBridge: Send + Sync {
    /// Cheap reachability check.
    async fn health(&self) -> bool;

    async fn status(&self) -> BridgeStatus;

    async fn list_tools(&self, provider: &str) -> Result<Vec<ToolDescriptor>>;

    async fn call_tool(&self, provider: &str, tool: &str, args: Value) -> Result<ToolResponse>;
}

// ============================================================================
// Code sources
// ============================================================================

/// Where file content for an annotation comes from.
#[async_trait]
pub trait CodeSource: Send + Sync {
    /// File content, or `None` if this source cannot provide it.
    async fn read(&self, repo: &str, branch: &str, path: &str) -> Option<String>;
}

#[async_trait]
impl<T: CodeSource + ?Sized> CodeSource for Box<T> {
    async fn read(&self, repo: &str, branch: &str, path: &str) -> Option<String> {
        (**self).read(repo, branch, path).await
    }
}

/// Reads files through a bridge provider's file tool.
pub struct BridgeSource<B> {
    bridge: B,
    provider: String,
    tool: String,
    root: String,
}

impl<B: ToolBridge> BridgeSource<B> {
    /// Defaults to the `filesystem` provider's `read_file` tool.
    pub fn new(bridge: B, root: impl Into<String>) -> Self {
        Self {
            bridge,
            provider: "filesystem".into(),
            tool: "read_file".into(),
            root: root.into(),
        }
    }

    pub fn with_tool(mut self, provider: impl Into<String>, tool: impl Into<String>) -> Self {
        self.provider = provider.into();
        self.tool = tool.into();
        self
    }
}

#[async_trait]
impl<B: ToolBridge> CodeSource for BridgeSource<B> {
    async fn read(&self, _repo: &str, _branch: &str, path: &str) -> Option<String> {
        if !self.bridge.health().await || !self.bridge.status().await.is_connected(&self.provider) {
            return None;
        }
        let full = format!("{}/{}", self.root.trim_end_matches('/'), path);
        match self.bridge.call_tool(&self.provider, &self.tool, json!({ "path": full })).await {
            Ok(resp) if !resp.is_error => {
                Some(resp.text().chars().take(BRIDGE_READ_LIMIT).collect())
            }
            Ok(_) => None,
            Err(e) => {
                debug!(provider = %self.provider, error = %e, "bridge read failed");
                None
            }
        }
    }
}

/// First source that yields content wins.
#[derive(Default)]
pub struct ChainSource {
    sources: Vec<Box<dyn CodeSource>>,
}

impl ChainSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, source: impl CodeSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }
}

#[async_trait]
impl CodeSource for ChainSource {
    async fn read(&self, repo: &str, branch: &str, path: &str) -> Option<String> {
        for source in &self.sources {
            if let Some(text) = source.read(repo, branch, path).await {
                return Some(text);
            }
        }
        None
    }
}

// ============================================================================
// Annotation context
// ============================================================================

/// Context text handed to a generator: repository, module path, kind, and
/// for non-folders the first `SNIPPET_LINES` lines of code when available.
pub async fn annotation_context<C: CodeSource + ?Sized>(source: &C, request: &AnnotationRequest) -> String {
    let mut context = format!(
        "Repository: {}\nModule: {}\nType: {}",
        request.repo_name, request.path, request.kind,
    );
    if request.kind == NodeKind::Folder {
        return context;
    }
    match source.read(&request.repo_name, &request.branch, &request.path).await {
        Some(code) => {
            let snippet: Vec<&str> = code.lines().take(SNIPPET_LINES).collect();
            context.push_str(&format!(
                "\n\nCode Snippet (First {SNIPPET_LINES} lines):\n{}",
                snippet.join("\n"),
            ));
        }
        None => context.push_str("\n\n[Code snippet unavailable]"),
    }
    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AnalysisMode;
    use crate::Error;

    struct FakeBridge {
        healthy: bool,
        connected: bool,
    }

    #[async_trait]
    impl ToolBridge for FakeBridge {
        async fn health(&self) -> bool {
            self.healthy
        }

        async fn status(&self) -> BridgeStatus {
            BridgeStatus {
                initialized: true,
                servers: vec![ProviderStatus { name: "filesystem".into(), connected: self.connected }],
            }
        }

        async fn list_tools(&self, _provider: &str) -> Result<Vec<ToolDescriptor>> {
            Ok(Vec::new())
        }

        async fn call_tool(&self, provider: &str, tool: &str, args: Value) -> Result<ToolResponse> {
            if provider != "filesystem" || tool != "read_file" {
                return Err(Error::NotFound(tool.into()));
            }
            let path = args["path"].as_str().unwrap_or_default();
            Ok(ToolResponse {
                content: vec![json!({ "type": "text", "text": format!("// {path}") })],
                is_error: false,
            })
        }
    }

    struct Static(&'static str);

    #[async_trait]
    impl CodeSource for Static {
        async fn read(&self, _repo: &str, _branch: &str, _path: &str) -> Option<String> {
            Some(self.0.to_string())
        }
    }

    fn request(kind: NodeKind) -> AnnotationRequest {
        AnnotationRequest {
            repo_name: "acme/widgets".into(),
            branch: "main".into(),
            path: "src/app.ts".into(),
            kind,
            mode: AnalysisMode::Explain,
        }
    }

    #[tokio::test]
    async fn test_bridge_source_reads_under_root() {
        let source = BridgeSource::new(FakeBridge { healthy: true, connected: true }, "/work/");
        let text = source.read("acme/widgets", "main", "src/app.ts").await;
        assert_eq!(text.as_deref(), Some("// /work/src/app.ts"));
    }

    #[tokio::test]
    async fn test_unreachable_bridge_falls_through_chain() {
        let chain = ChainSource::new()
            .then(BridgeSource::new(FakeBridge { healthy: false, connected: true }, "/work"))
            .then(BridgeSource::new(FakeBridge { healthy: true, connected: false }, "/work"))
            .then(Static("fn main() {}"));
        assert_eq!(chain.read("r", "b", "p").await.as_deref(), Some("fn main() {}"));
    }

    #[tokio::test]
    async fn test_context_truncates_snippet() {
        let long: String = (0..500).map(|i| format!("line {i}\n")).collect();
        let source = ChainSource::new().then(StaticOwned(long));
        let ctx = annotation_context(&source, &request(NodeKind::File)).await;
        assert!(ctx.starts_with("Repository: acme/widgets\nModule: src/app.ts\nType: file"));
        assert!(ctx.contains("line 199"));
        assert!(!ctx.contains("line 200"));
    }

    #[tokio::test]
    async fn test_context_for_folder_has_no_code() {
        let ctx = annotation_context(&Static("x"), &request(NodeKind::Folder)).await;
        assert!(!ctx.contains("Code Snippet"));
        assert!(!ctx.contains("unavailable"));
    }

    #[tokio::test]
    async fn test_context_marks_missing_code() {
        let ctx = annotation_context(&ChainSource::new(), &request(NodeKind::Service)).await;
        assert!(ctx.ends_with("[Code snippet unavailable]"));
    }

    #[test]
    fn test_response_text_falls_back_to_json() {
        let resp = ToolResponse { content: vec![json!({ "type": "image" })], is_error: false };
        assert_eq!(resp.text(), r#"[{"type":"image"}]"#);
    }

    struct StaticOwned(String);

    #[async_trait]
    impl CodeSource for StaticOwned {
        async fn read(&self, _repo: &str, _branch: &str, _path: &str) -> Option<String> {
            Some(self.0.clone())
        }
    }
}
