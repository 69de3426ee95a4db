//! ---
//! fcp_section: "07-resilience-drills"
//! fcp_subsection: "module"
//! fcp_type: "source"
//! fcp_scope: "code"
//! fcp_description: "Drill history persistence contract."
//! fcp_version: "v0.1.0"
//! fcp_owner: "reliability"
//! ---
use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::RwLock;
use thiserror::Error;

use crate::drills::DrillResult;

/// Failure of a history backend.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("drill history unavailable: {0}")]
    Unavailable(String),
}

/// Storage collaborator for finished drills.
#[async_trait]
pub trait DrillHistory: Send + Sync {
    /// Persist one result.
    async fn save(&self, result: DrillResult) -> Result<(), HistoryError>;
    /// Results newest first; `limit == 0` returns everything.
    async fn list(&self, limit: usize) -> Result<Vec<DrillResult>, HistoryError>;
}

/// History kept in memory, retaining at most `retention` results (0 = unbounded).
#[derive(Debug, Default)]
pub struct InMemoryDrillHistory {
    retention: usize,
    entries: RwLock<VecDeque<DrillResult>>,
}

impl InMemoryDrillHistory {
    pub fn new(retention: usize) -> Self {
        Self {
            retention,
            entries: RwLock::new(VecDeque::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl DrillHistory for InMemoryDrillHistory {
    async fn save(&self, result: DrillResult) -> Result<(), HistoryError> {
        let mut entries = self.entries.write();
        entries.push_front(result);
        if self.retention > 0 {
            entries.truncate(self.retention);
        }
        Ok(())
    }

    async fn list(&self, limit: usize) -> Result<Vec<DrillResult>, HistoryError> {
        let entries = self.entries.read();
        let take = if limit == 0 { entries.len() } else { limit };
        Ok(entries.iter().take(take).cloned().collect())
    }
}
