//! Outcome summaries returned by the router and the aggregator.

use oshin_core::types::{DigestWindow, StatusItem};
use serde::Serialize;

/// One destination that could not be reached.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DeliveryFailure {
    pub destination: String,
    pub error: String,
}

/// Result of one accepted submission.
#[derive(Debug, Clone, Serialize)]
pub struct FanoutReport {
    pub item: StatusItem,
    /// Destinations that accepted the announcement, primary first.
    pub delivered: Vec<String>,
    pub failed: Vec<DeliveryFailure>,
}

impl FanoutReport {
    pub fn new(item: StatusItem) -> Self {
        Self {
            item,
            delivered: vec![],
            failed: vec![],
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Result of one digest run across every routing rule.
#[derive(Debug, Clone, Serialize)]
pub struct DigestReport {
    pub window: DigestWindow,
    pub title: String,
    /// Destinations that received a digest, with the number of owners in it.
    pub posted: Vec<(String, usize)>,
    /// Destinations with nothing to report.
    pub skipped: Vec<String>,
    pub failed: Vec<DeliveryFailure>,
}

impl DigestReport {
    pub fn new(window: DigestWindow, title: impl Into<String>) -> Self {
        Self {
            window,
            title: title.into(),
            posted: vec![],
            skipped: vec![],
            failed: vec![],
        }
    }
}
