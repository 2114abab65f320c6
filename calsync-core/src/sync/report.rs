//! Typed outcomes of load and commit operations.
//!
//! Failures never propagate out of the synchronizer; they are collected here
//! so callers can decide whether to surface them.

use std::fmt;

use crate::error::SyncError;
use crate::event::{EventOccurrence, OccurrenceKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Load,
    Create,
    Update,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Load => write!(f, "load"),
            Operation::Create => write!(f, "create"),
            Operation::Update => write!(f, "update"),
            Operation::Delete => write!(f, "delete"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyncFailure {
    pub operation: Operation,
    /// Template id, when the failure concerns a single event.
    pub id: Option<String>,
    pub error: SyncError,
}

impl SyncFailure {
    pub fn new(operation: Operation, id: Option<&str>, error: SyncError) -> Self {
        SyncFailure {
            operation,
            id: id.map(String::from),
            error,
        }
    }
}

impl fmt::Display for SyncFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{} {}: {}", self.operation, id, self.error),
            None => write!(f, "{}: {}", self.operation, self.error),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// Everything that was processed, in display order.
    pub occurrences: Vec<EventOccurrence>,
    pub failures: Vec<SyncFailure>,
}

impl LoadReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CommitReport {
    /// Store-assigned id of the added event.
    pub created: Option<String>,
    pub updated: Vec<String>,
    pub deleted: Option<String>,
    /// Single occurrence removed from its series.
    pub excluded: Option<OccurrenceKey>,
    /// Ids not present in the cache (no write was attempted).
    pub skipped: Vec<String>,
    /// Ids left unprocessed after an earlier update in the batch failed.
    pub unattempted: Vec<String>,
    pub failures: Vec<SyncFailure>,
}

impl CommitReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.unattempted.is_empty()
    }
}
