//! Fan-out router: persist one submission, then announce it to the primary
//! destination and to every rule whose tags appear in the text.

use std::sync::Arc;

use mockable::Clock;
use oshin_core::error::Result;
use oshin_core::routing::{Credential, RoutingConfig};
use oshin_core::traits::{NotificationSink, RecordStore};
use oshin_core::types::{OutgoingMessage, Presentation, StatusItem, Submission};

use crate::report::{DeliveryFailure, FanoutReport};

/// The team-wide destination that sees every update regardless of tags.
#[derive(Debug, Clone)]
pub struct PrimaryTarget {
    pub destination: String,
    pub credential: Credential,
}

impl PrimaryTarget {
    pub fn new(destination: impl Into<String>, credential: Credential) -> Self {
        Self {
            destination: destination.into(),
            credential,
        }
    }
}

pub struct FanoutRouter {
    store: Arc<dyn RecordStore>,
    sink: Arc<dyn NotificationSink>,
    routing: Arc<RoutingConfig>,
    primary: PrimaryTarget,
    clock: Arc<dyn Clock>,
    presentation: Presentation,
}

impl FanoutRouter {
    pub fn new(
        store: Arc<dyn RecordStore>,
        sink: Arc<dyn NotificationSink>,
        routing: Arc<RoutingConfig>,
        primary: PrimaryTarget,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            sink,
            routing,
            primary,
            clock,
            presentation: Presentation::default(),
        }
    }

    pub fn with_presentation(mut self, presentation: Presentation) -> Self {
        self.presentation = presentation;
        self
    }

    pub fn routing(&self) -> &RoutingConfig {
        &self.routing
    }

    /// Validate, persist, then fan out.
    ///
    /// Blank text and store failures return an error before any delivery.
    /// Delivery failures are recorded in the report and never abort the
    /// remaining destinations.
    pub async fn submit(&self, submission: Submission) -> Result<FanoutReport> {
        let submission = submission.validate()?;
        let item = StatusItem::from_submission(&submission, self.clock.utc());

        if let Err(e) = self.store.insert(&item).await {
            tracing::error!("Failed to persist {} item from {}: {e}", submission.kind, item.owner_id);
            return Err(e);
        }
        tracing::info!(
            "📝 Stored {} item {} from {}",
            submission.kind,
            item.id,
            item.owner_name
        );

        let message = OutgoingMessage::text(submission.kind.announce(&item.owner_name, &item.text))
            .with_presentation(self.presentation.clone());

        let matched: Vec<_> = self.routing.matching(&item.text).cloned().collect();
        tracing::debug!("Item {} matched {} routing rule(s)", item.id, matched.len());

        let mut report = FanoutReport::new(item);
        self.deliver(
            &mut report,
            &self.primary.credential,
            &self.primary.destination,
            &message,
        )
        .await;

        for rule in matched {
            self.deliver(&mut report, &rule.credential, &rule.destination, &message)
                .await;
        }

        if !report.is_complete() {
            tracing::warn!(
                "Item {} delivered to {} destination(s), {} failed",
                report.item.id,
                report.delivered.len(),
                report.failed.len()
            );
        }
        Ok(report)
    }

    async fn deliver(
        &self,
        report: &mut FanoutReport,
        credential: &Credential,
        destination: &str,
        message: &OutgoingMessage,
    ) {
        match self.sink.deliver(credential, destination, message).await {
            Ok(()) => report.delivered.push(destination.to_string()),
            Err(e) => {
                tracing::warn!("Delivery to {destination} failed: {e}");
                report.failed.push(DeliveryFailure {
                    destination: destination.to_string(),
                    error: e.to_string(),
                });
            }
        }
    }
}
