//! Query History
//!
//! Timestamped record of every execution attempt that reached the endpoint,
//! newest first. No deduplication; the oldest entries are evicted once the
//! configured capacity is reached.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::descriptor::QueryDescriptor;
use crate::gateway::ExecutionResult;

/// Default number of entries kept
pub const DEFAULT_HISTORY_CAPACITY: usize = 200;

/// How an execution ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum HistoryOutcome {
    Success { row_count: usize },
    Failure { message: String, code: Option<String> },
}

impl From<&ExecutionResult> for HistoryOutcome {
    fn from(result: &ExecutionResult) -> Self {
        match result {
            ExecutionResult::Rows(rows) => HistoryOutcome::Success {
                row_count: rows.len(),
            },
            ExecutionResult::Failure(f) => HistoryOutcome::Failure {
                message: f.message.clone(),
                code: f.code.clone(),
            },
        }
    }
}

/// One recorded execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub descriptor: QueryDescriptor,
    pub timestamp: DateTime<Utc>,
    pub outcome: HistoryOutcome,
}

/// Bounded, newest-first execution history
#[derive(Debug, Clone)]
pub struct QueryHistory {
    /// Front = newest
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl Default for QueryHistory {
    fn default() -> Self {
        QueryHistory::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl QueryHistory {
    /// Create a history keeping at most `capacity` entries (0 = unbounded)
    pub fn new(capacity: usize) -> Self {
        QueryHistory {
            entries: VecDeque::new(),
            capacity,
        }
    }

    pub fn record(&mut self, descriptor: QueryDescriptor, outcome: HistoryOutcome) -> &HistoryEntry {
        self.entries.push_front(HistoryEntry {
            descriptor,
            timestamp: Utc::now(),
            outcome,
        });
        if self.capacity > 0 {
            self.entries.truncate(self.capacity);
        }
        &self.entries[0]
    }

    /// Entries, newest first
    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    /// Entry by display position (0 = newest)
    pub fn get(&self, index: usize) -> Option<&HistoryEntry> {
        self.entries.get(index)
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.front()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
