//! JSON-file persistence.
//!
//! The whole table is one pretty-printed JSON object keyed by repository
//! name. Every write rewrites the file; a mutex serialises writers within
//! the process. A missing file reads as an empty table.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{TimeDelta, Utc};
use parking_lot::Mutex;
use tracing::debug;

use crate::config::EngineConfig;
use crate::model::*;
use crate::services::Persistence;
use crate::Result;
use super::{CacheTable, DEFAULT_TTL};

pub struct FilePersistence {
    path: PathBuf,
    ttl: TimeDelta,
    lock: Mutex<()>,
}

impl FilePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_ttl(path, DEFAULT_TTL)
    }

    pub fn with_ttl(path: impl Into<PathBuf>, ttl: TimeDelta) -> Self {
        Self { path: path.into(), ttl, lock: Mutex::new(()) }
    }

    /// Expiry taken from `EngineConfig::cache_ttl`.
    pub fn from_config(path: impl Into<PathBuf>, config: &EngineConfig) -> Self {
        Self::with_ttl(path, config.cache_ttl_delta())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_table(&self) -> Result<CacheTable> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(CacheTable::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_table(&self, table: &CacheTable) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_vec_pretty(table)?)?;
        debug!(path = %self.path.display(), records = table.len(), "snapshot cache written");
        Ok(())
    }
}

impl Persistence for FilePersistence {
    fn save(&self, analysis: &RepoAnalysis) -> Result<()> {
        let _guard = self.lock.lock();
        let mut table = self.read_table()?;
        table.save(analysis, Utc::now());
        self.write_table(&table)
    }

    fn update(&self, repo_name: &str, nodes: &[Node], edges: &[Edge]) -> Result<()> {
        let _guard = self.lock.lock();
        let mut table = self.read_table()?;
        if table.update(repo_name, nodes, edges, Utc::now()) {
            self.write_table(&table)?;
        }
        Ok(())
    }

    fn load(&self, repo_name: &str) -> Result<Option<RepoAnalysis>> {
        let _guard = self.lock.lock();
        Ok(self.read_table()?.get(repo_name, Utc::now(), self.ttl).cloned())
    }

    fn list(&self) -> Result<Vec<RepoAnalysis>> {
        let _guard = self.lock.lock();
        Ok(self.read_table()?.list())
    }

    fn clear(&self) -> Result<()> {
        let _guard = self.lock.lock();
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let db = FilePersistence::new(dir.path().join("cache").join("analyses.json"));

        assert!(db.load("o/r").unwrap().is_none());
        db.save(&RepoAnalysis::new("o/r", "main").with_file_map(["src/a.rs"])).unwrap();

        let reopened = FilePersistence::new(db.path());
        let record = reopened.load("o/r").unwrap().unwrap();
        assert_eq!(record.file_map, vec!["src/a.rs"]);
        assert_eq!(record.default_branch, "main");
    }

    #[test]
    fn test_config_ttl_applies_on_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analyses.json");
        FilePersistence::new(&path).save(&RepoAnalysis::new("o/r", "main")).unwrap();

        let expired = EngineConfig { cache_ttl: std::time::Duration::ZERO, ..Default::default() };
        assert!(FilePersistence::from_config(&path, &expired).load("o/r").unwrap().is_none());
        assert!(FilePersistence::from_config(&path, &EngineConfig::default()).load("o/r").unwrap().is_some());
    }

    #[test]
    fn test_update_without_record_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let db = FilePersistence::new(dir.path().join("analyses.json"));
        db.update("o/r", &[], &[]).unwrap();
        assert!(!db.path().exists());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analyses.json");
        fs::write(&path, b"{ not json").unwrap();
        let db = FilePersistence::new(&path);
        assert!(matches!(db.load("o/r"), Err(crate::Error::Serialization(_))));
    }

    #[test]
    fn test_clear_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let db = FilePersistence::new(dir.path().join("analyses.json"));
        db.save(&RepoAnalysis::new("o/r", "main")).unwrap();
        db.clear().unwrap();
        db.clear().unwrap();
        assert!(db.list().unwrap().is_empty());
    }
}
