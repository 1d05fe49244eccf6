//! Concrete scheduled jobs.

use std::sync::Arc;

use async_trait::async_trait;
use oshin_core::error::Result;
use oshin_core::routing::Credential;
use oshin_core::traits::NotificationSink;
use oshin_core::types::{OutgoingMessage, Presentation};
use oshin_engine::DigestAggregator;

use crate::engine::Job;

/// Runs the digest aggregator against the current clock.
pub struct DigestJob {
    aggregator: Arc<DigestAggregator>,
}

impl DigestJob {
    pub fn new(aggregator: Arc<DigestAggregator>) -> Self {
        Self { aggregator }
    }
}

#[async_trait]
impl Job for DigestJob {
    fn name(&self) -> &str {
        "digest"
    }

    async fn run(&self) -> Result<()> {
        let report = self.aggregator.run().await?;
        tracing::info!(
            "Digest '{}': {} posted, {} skipped, {} failed",
            report.title,
            report.posted.len(),
            report.skipped.len(),
            report.failed.len()
        );
        Ok(())
    }
}

/// Posts a fixed reminder message to one channel.
pub struct ReminderJob {
    sink: Arc<dyn NotificationSink>,
    credential: Credential,
    channel: String,
    message: OutgoingMessage,
}

impl ReminderJob {
    pub fn new(
        sink: Arc<dyn NotificationSink>,
        credential: Credential,
        channel: impl Into<String>,
        text: impl Into<String>,
        presentation: Presentation,
    ) -> Self {
        Self {
            sink,
            credential,
            channel: channel.into(),
            message: OutgoingMessage::text(text).with_presentation(presentation),
        }
    }
}

#[async_trait]
impl Job for ReminderJob {
    fn name(&self) -> &str {
        "reminder"
    }

    async fn run(&self) -> Result<()> {
        self.sink
            .deliver(&self.credential, &self.channel, &self.message)
            .await?;
        tracing::info!("Reminder posted to {}", self.channel);
        Ok(())
    }
}
