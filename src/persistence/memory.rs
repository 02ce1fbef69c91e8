//! Process-local persistence.

use chrono::{TimeDelta, Utc};
use parking_lot::RwLock;

use crate::config::EngineConfig;
use crate::model::*;
use crate::services::Persistence;
use crate::Result;
use super::{CacheTable, DEFAULT_TTL};

/// `Persistence` backed by an in-memory table. Nothing survives the process.
pub struct MemoryPersistence {
    table: RwLock<CacheTable>,
    ttl: TimeDelta,
}

impl MemoryPersistence {
    pub fn new(ttl: TimeDelta) -> Self {
        Self { table: RwLock::new(CacheTable::new()), ttl }
    }

    /// Expiry taken from `EngineConfig::cache_ttl`.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.cache_ttl_delta())
    }

    pub fn len(&self) -> usize {
        self.table.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.read().is_empty()
    }
}

impl Default for MemoryPersistence {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl Persistence for MemoryPersistence {
    fn save(&self, analysis: &RepoAnalysis) -> Result<()> {
        self.table.write().save(analysis, Utc::now());
        Ok(())
    }

    fn update(&self, repo_name: &str, nodes: &[Node], edges: &[Edge]) -> Result<()> {
        self.table.write().update(repo_name, nodes, edges, Utc::now());
        Ok(())
    }

    fn load(&self, repo_name: &str) -> Result<Option<RepoAnalysis>> {
        Ok(self.table.read().get(repo_name, Utc::now(), self.ttl).cloned())
    }

    fn list(&self) -> Result<Vec<RepoAnalysis>> {
        Ok(self.table.read().list())
    }

    fn clear(&self) -> Result<()> {
        self.table.write().clear();
        Ok(())
    }
}
