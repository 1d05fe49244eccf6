//! # Oshin Channels
//! Notification sinks and the owner directory backed by Slack.

pub mod capture;
pub mod slack;
pub mod webhook;

use std::sync::Arc;

use oshin_core::config::{SinkKind, SlackConfig};
use oshin_core::traits::{NotificationSink, OwnerDirectory};

/// Create the notification sink selected by `slack.sink`.
pub fn create_sink(config: &SlackConfig) -> Arc<dyn NotificationSink> {
    match config.sink {
        SinkKind::Api => Arc::new(slack::SlackSink::new(&config.api_base)),
        SinkKind::Webhook => Arc::new(webhook::WebhookSink::new()),
    }
}

/// Create the owner directory. Always uses the primary bot credential.
pub fn create_directory(config: &SlackConfig) -> Arc<dyn OwnerDirectory> {
    Arc::new(slack::SlackDirectory::new(
        &config.api_base,
        config.bot_token.clone(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_sink_by_kind() {
        let mut config = SlackConfig::default();
        let sink = create_sink(&config);
        assert_eq!(sink.name(), "slack");
        assert!(sink.supports_fields());

        config.sink = SinkKind::Webhook;
        let sink = create_sink(&config);
        assert_eq!(sink.name(), "webhook");
        assert!(!sink.supports_fields());
    }
}
