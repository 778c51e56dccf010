use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use super::{RequestDefinition, Response};
use crate::constants::MAX_HISTORY;
use crate::error::ExecutionError;

/// History entry
#[derive(Clone, Debug)]
pub struct HistoryEntry {
    /// The resolved request as it was sent
    pub request: RequestDefinition,
    pub status: Option<u16>,
    pub elapsed_ms: Option<u64>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Session history of executed requests, most recent first
#[derive(Clone, Debug)]
pub struct History {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl History {
    pub fn new() -> Self {
        Self::with_capacity(MAX_HISTORY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        History {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record the outcome of an execution
    pub fn record(
        &mut self,
        request: &RequestDefinition,
        outcome: &Result<Response, ExecutionError>,
    ) {
        let (status, elapsed_ms, error) = match outcome {
            Ok(response) => (Some(response.status), Some(response.elapsed_ms()), None),
            Err(err) => (None, None, Some(err.to_string())),
        };
        self.push(HistoryEntry {
            request: request.clone(),
            status,
            elapsed_ms,
            error,
            timestamp: Utc::now(),
        });
    }

    pub fn push(&mut self, entry: HistoryEntry) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() >= self.capacity {
            self.entries.pop_back();
        }
        self.entries.push_front(entry);
    }

    /// Get history item by index (0 = most recent)
    pub fn get(&self, index: usize) -> Option<&HistoryEntry> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}
