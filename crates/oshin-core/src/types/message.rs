//! Outbound notification payloads.

use serde::{Deserialize, Serialize};

/// A title/value pair shown as one grouped block by sinks that support it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageField {
    pub title: String,
    pub value: String,
}

/// How the bot presents itself on every post.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Presentation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// Message handed to a notification sink.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub text: String,
    /// Structured blocks. Empty for plain announcements.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<MessageField>,
    #[serde(flatten)]
    pub presentation: Presentation,
}

impl OutgoingMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            fields: vec![],
            presentation: Presentation::default(),
        }
    }

    pub fn with_fields(mut self, fields: Vec<MessageField>) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_presentation(mut self, presentation: Presentation) -> Self {
        self.presentation = presentation;
        self
    }
}
