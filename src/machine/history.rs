//! Committed-transition history.
//!
//! Every committed transition is recorded with a UTC timestamp. The history
//! is an immutable value: `record` returns a new history rather than
//! mutating in place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One committed transition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: String,
    pub to: String,
    pub at: DateTime<Utc>,
}

impl TransitionRecord {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            at: Utc::now(),
        }
    }
}

/// Ordered log of committed transitions.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct History {
    records: Vec<TransitionRecord>,
}

impl History {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Append a record, returning the extended history.
    pub fn record(&self, record: TransitionRecord) -> Self {
        let mut records = self.records.clone();
        records.push(record);
        Self { records }
    }

    pub fn records(&self) -> &[TransitionRecord] {
        &self.records
    }

    /// The states traversed, starting from the first record's origin.
    pub fn path(&self) -> Vec<&str> {
        let mut path = Vec::new();
        if let Some(first) = self.records.first() {
            path.push(first.from.as_str());
        }
        for record in &self.records {
            path.push(record.to.as_str());
        }
        path
    }

    /// Elapsed time between the first and last recorded transition.
    pub fn duration(&self) -> Option<Duration> {
        match (self.records.first(), self.records.last()) {
            (Some(first), Some(last)) => last.at.signed_duration_since(first.at).to_std().ok(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_history_has_no_path() {
        let history = History::new();
        assert!(history.path().is_empty());
        assert!(history.duration().is_none());
    }

    #[test]
    fn record_is_immutable() {
        let history = History::new();
        let grown = history.record(TransitionRecord::new("red", "green"));
        assert_eq!(history.records().len(), 0);
        assert_eq!(grown.records().len(), 1);
    }

    #[test]
    fn path_includes_the_origin_state() {
        let history = History::new()
            .record(TransitionRecord::new("red", "green"))
            .record(TransitionRecord::new("green", "yellow"));
        assert_eq!(history.path(), vec!["red", "green", "yellow"]);
    }

    #[test]
    fn duration_spans_first_to_last() {
        let history = History::new()
            .record(TransitionRecord::new("red", "green"))
            .record(TransitionRecord::new("green", "yellow"));
        assert!(history.duration().is_some());
    }
}
