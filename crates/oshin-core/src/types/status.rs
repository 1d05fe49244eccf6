//! Status items: the records users post through the bot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{OshinError, Result};

/// Which command produced a status update. Selects the fan-out template.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    /// `/on`: what someone is working on right now.
    On,
    /// `/til`: something learned today.
    Til,
    /// `/done`: something finished.
    Done,
}

impl StatusKind {
    /// Render the fan-out announcement for this kind.
    pub fn announce(&self, owner_name: &str, text: &str) -> String {
        match self {
            StatusKind::On => format!("{owner_name} is working on: {text}"),
            StatusKind::Til => format!("{owner_name} - Today I learned: {text}"),
            StatusKind::Done => format!("{owner_name} has done: {text}"),
        }
    }
}

impl std::fmt::Display for StatusKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusKind::On => write!(f, "on"),
            StatusKind::Til => write!(f, "til"),
            StatusKind::Done => write!(f, "done"),
        }
    }
}

/// A submission as received from the inbound endpoint, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub kind: StatusKind,
    pub text: String,
    pub owner_id: String,
    pub owner_name: String,
}

impl Submission {
    pub fn new(
        kind: StatusKind,
        text: impl Into<String>,
        owner_id: impl Into<String>,
        owner_name: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            text: text.into(),
            owner_id: owner_id.into(),
            owner_name: owner_name.into(),
        }
    }

    /// Trim the text and reject blank submissions.
    pub fn validate(mut self) -> Result<Self> {
        let trimmed = self.text.trim();
        if trimmed.is_empty() {
            return Err(OshinError::invalid_input("status text is empty"));
        }
        if trimmed.len() != self.text.len() {
            self.text = trimmed.to_string();
        }
        Ok(self)
    }
}

/// One persisted, user-authored status record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusItem {
    pub id: String,
    pub owner_id: String,
    /// Display name at the time of authoring. Never updated afterwards.
    pub owner_name: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl StatusItem {
    /// Build a record from a validated submission. `created_at` is always
    /// supplied by the caller's clock, never by the submitter.
    pub fn from_submission(submission: &Submission, created_at: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: submission.owner_id.clone(),
            owner_name: submission.owner_name.clone(),
            text: submission.text.clone(),
            created_at,
        }
    }
}
