//! Digest windows and the digest body model.
//!
//! A digest is an ordered list of per-owner blocks plus a title line. The
//! body is rendered in exactly one place: either as structured fields (for
//! sinks that can group blocks) or as one flat text block.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::message::MessageField;

/// Half-open interval `[start, end)` covered by one aggregation run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DigestWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DigestWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        t >= self.start && t < self.end
    }
}

/// Prefix applied to every item line in a digest block.
pub const LINE_PREFIX: &str = "+ ";

/// One owner's contribution to a digest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DigestBlock {
    pub title: String,
    pub lines: Vec<String>,
}

impl DigestBlock {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            lines: vec![],
        }
    }

    pub fn push(&mut self, text: &str) {
        self.lines.push(format!("{LINE_PREFIX}{text}"));
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Lines joined one per row.
    pub fn value(&self) -> String {
        self.lines.join("\n")
    }
}

/// A fully built digest for one destination.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Digest {
    pub title: String,
    pub blocks: Vec<DigestBlock>,
}

impl Digest {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            blocks: vec![],
        }
    }

    /// Append a block. Empty blocks are dropped so owners without content
    /// never show up.
    pub fn push_block(&mut self, block: DigestBlock) {
        if !block.is_empty() {
            self.blocks.push(block);
        }
    }

    /// Number of owners with content.
    pub fn owner_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn to_fields(&self) -> Vec<MessageField> {
        self.blocks
            .iter()
            .map(|b| MessageField {
                title: b.title.clone(),
                value: b.value(),
            })
            .collect()
    }

    /// Single text block for sinks without structured field support.
    pub fn to_plain_text(&self) -> String {
        let mut sections = Vec::with_capacity(self.blocks.len() + 1);
        sections.push(self.title.clone());
        for block in &self.blocks {
            sections.push(format!("{}\n{}", block.title, block.value()));
        }
        sections.join("\n\n")
    }
}
