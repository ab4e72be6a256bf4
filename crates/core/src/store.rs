// crates/core/src/store.rs
//! Shared in-memory progress store.
//!
//! Last-write-wins map from task id to the latest [`TaskStatus`] snapshot.
//! Records are replaced whole, so readers always see a complete snapshot.
//! A std `RwLock` is enough here: every access is a short critical section
//! and the lock is never held across an await point.
//!
//! Records are kept for the life of the process. There is no eviction;
//! late pollers of long-finished tasks still get their terminal record.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::task::{TaskId, TaskStatus};

/// Cloneable handle to the progress map. All clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct ProgressStore {
    inner: Arc<RwLock<HashMap<TaskId, TaskStatus>>>,
}

impl ProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the record for `id`, creating it if absent.
    pub fn set(&self, id: &TaskId, status: TaskStatus) {
        match self.inner.write() {
            Ok(mut map) => {
                map.insert(id.clone(), status);
            }
            Err(e) => {
                tracing::error!(task_id = %id, error = %e, "progress store poisoned, dropping write");
            }
        }
    }

    /// Latest snapshot for `id`, if the task is known.
    pub fn get(&self, id: &str) -> Option<TaskStatus> {
        match self.inner.read() {
            Ok(map) => map.get(id).cloned(),
            Err(e) => {
                tracing::error!(error = %e, "progress store poisoned, reads degrade to not-found");
                None
            }
        }
    }

    /// Point-in-time listing of every known task.
    pub fn snapshot(&self) -> Vec<(TaskId, TaskStatus)> {
        match self.inner.read() {
            Ok(map) => map.iter().map(|(id, status)| (id.clone(), status.clone())).collect(),
            Err(e) => {
                tracing::error!(error = %e, "progress store poisoned, returning empty snapshot");
                Vec::new()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|map| map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
