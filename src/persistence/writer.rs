//! Background write-through.
//!
//! Engine mutations hand their latest graph to a `WriteBehind` and return.
//! Inside a tokio runtime the write runs on the blocking pool; a burst of
//! mutations on one repository collapses to a single write of the newest
//! graph. Outside a runtime the write runs inline.

use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::model::*;
use crate::services::Persistence;

struct PendingWrite {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

#[derive(Default)]
struct WriterState {
    /// Newest unwritten graph per repository.
    pending: HashMap<String, PendingWrite>,
    /// A drain loop is running.
    active: bool,
}

pub struct WriteBehind {
    persistence: Arc<dyn Persistence>,
    state: Arc<Mutex<WriterState>>,
    idle: Arc<Notify>,
}

impl WriteBehind {
    pub fn new(persistence: Arc<dyn Persistence>) -> Self {
        Self {
            persistence,
            state: Arc::new(Mutex::new(WriterState::default())),
            idle: Arc::new(Notify::new()),
        }
    }

    pub fn persistence(&self) -> &Arc<dyn Persistence> {
        &self.persistence
    }

    /// Queue `nodes`/`edges` as the newest graph for `repo_name`.
    pub fn submit(&self, repo_name: &str, nodes: Vec<Node>, edges: Vec<Edge>) {
        {
            let mut state = self.state.lock();
            if state.pending.insert(repo_name.to_string(), PendingWrite { nodes, edges }).is_some() {
                debug!(repo = %repo_name, "pending write superseded");
            }
            if state.active {
                return;
            }
            state.active = true;
        }

        let persistence = Arc::clone(&self.persistence);
        let state = Arc::clone(&self.state);
        let idle = Arc::clone(&self.idle);
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(move || drain(&*persistence, &state, &idle));
            }
            Err(_) => drain(&*persistence, &state, &idle),
        }
    }

    /// True when nothing is queued or being written.
    pub fn is_idle(&self) -> bool {
        let state = self.state.lock();
        !state.active && state.pending.is_empty()
    }

    /// Wait until every submitted write has reached the persistence.
    pub async fn flush(&self) {
        loop {
            let notified = self.idle.notified();
            if self.is_idle() {
                return;
            }
            notified.await;
        }
    }
}

fn drain(persistence: &dyn Persistence, state: &Mutex<WriterState>, idle: &Notify) {
    loop {
        let next = {
            let mut state = state.lock();
            let key = state.pending.keys().next().cloned();
            match key.and_then(|k| state.pending.remove_entry(&k)) {
                Some(entry) => entry,
                None => {
                    state.active = false;
                    break;
                }
            }
        };
        let (repo_name, write) = next;
        if let Err(e) = persistence.update(&repo_name, &write.nodes, &write.edges) {
            warn!(repo = %repo_name, error = %e, "write-through failed");
        }
    }
    idle.notify_waiters();
}
