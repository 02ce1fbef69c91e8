//! # Local Snapshot Cache
//!
//! Repository analyses are cached locally, keyed by repository name, and
//! expire after a fixed time to live (24 hours by default). Every engine
//! mutation writes the latest node and edge lists through `update`, which
//! also refreshes the record's timestamp. Those writes go through a
//! `WriteBehind`, which keeps file I/O off the caller.
//!
//! | Implementation | Module | Description |
//! |----------------|--------|-------------|
//! | `MemoryPersistence` | `memory` | Process-local, for tests and embedding |
//! | `FilePersistence` | `file` | One JSON document on disk |

pub mod memory;
pub mod file;
pub mod writer;

use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::model::*;

pub use memory::MemoryPersistence;
pub use file::FilePersistence;
pub use writer::WriteBehind;

/// Default record lifetime.
pub const DEFAULT_TTL: TimeDelta = TimeDelta::hours(24);

/// The table both implementations keep: repository name → record.
///
/// All time-dependent operations take `now` explicitly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheTable {
    records: BTreeMap<String, RepoAnalysis>,
}

impl CacheTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn save(&mut self, analysis: &RepoAnalysis, now: DateTime<Utc>) {
        let mut record = analysis.clone();
        record.timestamp = Some(now);
        self.records.insert(record.repo_name.clone(), record);
    }

    /// Returns false when there is no record to update.
    pub fn update(&mut self, repo_name: &str, nodes: &[Node], edges: &[Edge], now: DateTime<Utc>) -> bool {
        let Some(record) = self.records.get_mut(repo_name) else {
            return false;
        };
        record.nodes = nodes.to_vec();
        record.edges = edges.to_vec();
        record.timestamp = Some(now);
        true
    }

    /// Record younger than `ttl`. Records without a timestamp count as expired.
    pub fn get(&self, repo_name: &str, now: DateTime<Utc>, ttl: TimeDelta) -> Option<&RepoAnalysis> {
        self.records.get(repo_name)
            .filter(|r| r.timestamp.is_some_and(|t| now - t < ttl))
    }

    /// Newest first.
    pub fn list(&self) -> Vec<RepoAnalysis> {
        let mut all: Vec<RepoAnalysis> = self.records.values().cloned().collect();
        all.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        all
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis(name: &str) -> RepoAnalysis {
        RepoAnalysis::new(name, "main").with_file_map(["a.rs"])
    }

    #[test]
    fn test_expiry() {
        let t0 = Utc::now();
        let mut table = CacheTable::new();
        table.save(&analysis("o/r"), t0);

        assert!(table.get("o/r", t0 + TimeDelta::hours(23), DEFAULT_TTL).is_some());
        assert!(table.get("o/r", t0 + TimeDelta::hours(24), DEFAULT_TTL).is_none());
        assert!(table.get("o/other", t0, DEFAULT_TTL).is_none());
    }

    #[test]
    fn test_update_refreshes_timestamp() {
        let t0 = Utc::now();
        let mut table = CacheTable::new();
        table.save(&analysis("o/r"), t0);

        let node = Node::new("n", NodeData::new("n", NodeKind::File));
        let later = t0 + TimeDelta::hours(20);
        assert!(table.update("o/r", &[node], &[], later));

        let record = table.get("o/r", later + TimeDelta::hours(20), DEFAULT_TTL).unwrap();
        assert_eq!(record.nodes.len(), 1);
        assert_eq!(record.file_map, vec!["a.rs"]);
    }

    #[test]
    fn test_update_without_record_is_noop() {
        let mut table = CacheTable::new();
        assert!(!table.update("o/r", &[], &[], Utc::now()));
        assert!(table.is_empty());
    }

    #[test]
    fn test_list_newest_first() {
        let t0 = Utc::now();
        let mut table = CacheTable::new();
        table.save(&analysis("a/old"), t0);
        table.save(&analysis("z/new"), t0 + TimeDelta::minutes(5));
        table.save(&analysis("m/mid"), t0 + TimeDelta::minutes(1));

        let names: Vec<_> = table.list().into_iter().map(|r| r.repo_name).collect();
        assert_eq!(names, vec!["z/new", "m/mid", "a/old"]);
    }
}
