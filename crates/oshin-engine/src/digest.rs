//! Daily digest aggregator.
//!
//! One run covers `[midnight UTC of yesterday, now)`. For every routing rule
//! it collects each eligible owner's items in the window, keeps the ones the
//! rule's tags admit, and posts one message per destination that has
//! anything to show.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use mockable::Clock;
use oshin_core::error::Result;
use oshin_core::routing::{RoutingConfig, RoutingRule};
use oshin_core::time;
use oshin_core::traits::{NotificationSink, OwnerDirectory, RecordStore};
use oshin_core::types::{
    Digest, DigestBlock, DigestWindow, DirectoryUser, OutgoingMessage, Presentation,
    eligible_owners,
};

use crate::report::{DeliveryFailure, DigestReport};

pub const DEFAULT_TITLE_FORMAT: &str = "Team daily digest for %Y-%m-%d";

pub struct DigestAggregator {
    store: Arc<dyn RecordStore>,
    sink: Arc<dyn NotificationSink>,
    directory: Arc<dyn OwnerDirectory>,
    routing: Arc<RoutingConfig>,
    clock: Arc<dyn Clock>,
    presentation: Presentation,
    display_tz: Tz,
    title_format: String,
}

impl DigestAggregator {
    pub fn new(
        store: Arc<dyn RecordStore>,
        sink: Arc<dyn NotificationSink>,
        directory: Arc<dyn OwnerDirectory>,
        routing: Arc<RoutingConfig>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            sink,
            directory,
            routing,
            clock,
            presentation: Presentation::default(),
            display_tz: Tz::UTC,
            title_format: DEFAULT_TITLE_FORMAT.into(),
        }
    }

    pub fn with_presentation(mut self, presentation: Presentation) -> Self {
        self.presentation = presentation;
        self
    }

    /// Zone and strftime template used for the title line only. Window
    /// boundaries stay in UTC.
    pub fn with_title(mut self, display_tz: Tz, title_format: impl Into<String>) -> Self {
        self.display_tz = display_tz;
        self.title_format = title_format.into();
        self
    }

    /// Run against the current clock.
    pub async fn run(&self) -> Result<DigestReport> {
        self.run_at(self.clock.utc()).await
    }

    /// Run as if the trigger fired at `now`.
    ///
    /// A directory failure aborts the whole run before anything is posted.
    /// Store and delivery failures only affect the destination they occur for.
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<DigestReport> {
        let window = time::digest_window(now)?;
        let title = self.title_for(now)?;

        let owners = match self.directory.list_users().await {
            Ok(users) => eligible_owners(users),
            Err(e) => {
                tracing::error!("Digest run aborted, owner directory unavailable: {e}");
                return Err(e);
            }
        };
        tracing::info!(
            "📰 Digest run for [{}, {}) over {} owner(s), {} rule(s)",
            window.start,
            window.end,
            owners.len(),
            self.routing.len()
        );

        let mut report = DigestReport::new(window, title.clone());
        for rule in self.routing.rules() {
            let digest = match self.build(rule, &owners, &window, &title).await {
                Ok(d) => d,
                Err(e) => {
                    tracing::warn!("Skipping digest for {}: {e}", rule.destination);
                    report.failed.push(DeliveryFailure {
                        destination: rule.destination.clone(),
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            if digest.is_empty() {
                tracing::debug!("Nothing to report for {}", rule.destination);
                report.skipped.push(rule.destination.clone());
                continue;
            }

            let message = self.render(&digest);
            match self
                .sink
                .deliver(&rule.credential, &rule.destination, &message)
                .await
            {
                Ok(()) => {
                    tracing::info!(
                        "Digest posted to {} ({} owner(s))",
                        rule.destination,
                        digest.owner_count()
                    );
                    report
                        .posted
                        .push((rule.destination.clone(), digest.owner_count()));
                }
                Err(e) => {
                    tracing::warn!("Digest delivery to {} failed: {e}", rule.destination);
                    report.failed.push(DeliveryFailure {
                        destination: rule.destination.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }
        Ok(report)
    }

    /// Build one rule's digest. Owners keep directory order; owners with no
    /// admitted items are left out.
    pub async fn build(
        &self,
        rule: &RoutingRule,
        owners: &[DirectoryUser],
        window: &DigestWindow,
        title: &str,
    ) -> Result<Digest> {
        let mut digest = Digest::new(title);
        for owner in owners {
            let items = self.store.query_by_owner(&owner.id, window).await?;
            let mut block = DigestBlock::new(owner.name.as_str());
            for item in items.iter().filter(|i| rule.admits(&i.text)) {
                block.push(&item.text);
            }
            digest.push_block(block);
        }
        Ok(digest)
    }

    /// Title line: yesterday's date in the display zone.
    pub fn title_for(&self, now: DateTime<Utc>) -> Result<String> {
        let local = now.with_timezone(&self.display_tz);
        let day = time::yesterday(&local)?;
        Ok(time::strftime(&day, &self.title_format))
    }

    fn render(&self, digest: &Digest) -> OutgoingMessage {
        let message = if self.sink.supports_fields() {
            OutgoingMessage::text(digest.title.as_str()).with_fields(digest.to_fields())
        } else {
            OutgoingMessage::text(digest.to_plain_text())
        };
        message.with_presentation(self.presentation.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::{FanoutRouter, PrimaryTarget};
    use crate::testing::*;
    use oshin_channels::capture::CaptureSink;
    use oshin_core::error::OshinError;
    use oshin_core::routing::Credential;
    use oshin_core::types::{StatusItem, StatusKind, Submission};
    use oshin_memory::in_memory::InMemoryStore;

    fn item(owner: &str, text: &str, created_at: DateTime<Utc>) -> StatusItem {
        StatusItem {
            id: format!("{owner}:{text}"),
            owner_id: owner.into(),
            owner_name: owner.into(),
            text: text.into(),
            created_at,
        }
    }

    fn team() -> Vec<DirectoryUser> {
        let mut bot = DirectoryUser::new("B1", "deploybot");
        bot.is_bot = true;
        let mut gone = DirectoryUser::new("U9", "mallory");
        gone.is_deactivated = true;
        vec![
            DirectoryUser::new("U2", "bob"),
            bot,
            DirectoryUser::new("U1", "alice"),
            gone,
        ]
    }

    fn aggregator(
        store: Arc<dyn RecordStore>,
        sink: Arc<dyn NotificationSink>,
        directory: Arc<dyn OwnerDirectory>,
        rules: Vec<RoutingRule>,
    ) -> DigestAggregator {
        DigestAggregator::new(
            store,
            sink,
            directory,
            Arc::new(RoutingConfig::new(rules)),
            fixed_clock(at(2024, 3, 15, 9, 30, 0)),
        )
    }

    async fn seeded_store(items: &[StatusItem]) -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        for i in items {
            store.insert(i).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_end_to_end_bugfix_scenario() {
        let store: Arc<dyn RecordStore> = Arc::new(InMemoryStore::new());
        let sink = Arc::new(CaptureSink::new(true));
        let rules = vec![
            RoutingRule::new("#eng", &["#bugfix"], Credential::new("eng")),
            RoutingRule::new("#design", &["#ux"], Credential::new("design")),
        ];

        let router = FanoutRouter::new(
            store.clone(),
            Arc::new(CaptureSink::new(true)),
            Arc::new(RoutingConfig::new(rules.clone())),
            PrimaryTarget::new("#working", Credential::new("primary")),
            fixed_clock(at(2024, 3, 14, 12, 0, 0)),
        );
        router
            .submit(Submission::new(
                StatusKind::On,
                "-fixed the login bug #bugfix",
                "U1",
                "alice",
            ))
            .await
            .unwrap();

        let agg = aggregator(
            store,
            sink.clone(),
            Arc::new(StaticDirectory::new(team())),
            rules,
        );
        let report = agg.run().await.unwrap();

        let deliveries = sink.deliveries();
        assert_eq!(deliveries.len(), 1);
        let d = &deliveries[0];
        assert_eq!(d.destination, "#eng");
        assert_eq!(d.credential.expose(), "eng");
        assert_eq!(d.message.text, "Team daily digest for 2024-03-14");
        assert_eq!(d.message.fields.len(), 1);
        assert_eq!(d.message.fields[0].title, "alice");
        assert_eq!(d.message.fields[0].value, "+ -fixed the login bug #bugfix");

        assert_eq!(report.posted, vec![("#eng".to_string(), 1)]);
        assert_eq!(report.skipped, vec!["#design"]);
        assert_eq!(report.window.start, at(2024, 3, 14, 0, 0, 0));
        assert_eq!(report.window.end, at(2024, 3, 15, 9, 30, 0));
    }

    #[tokio::test]
    async fn test_window_and_owner_filtering() {
        let store = seeded_store(&[
            item("U1", "before window", at(2024, 3, 13, 23, 59, 59)),
            item("U1", "first", at(2024, 3, 14, 0, 0, 0)),
            item("U2", "bob thing", at(2024, 3, 14, 8, 0, 0)),
            item("U1", "second", at(2024, 3, 15, 9, 0, 0)),
            item("U1", "at trigger", at(2024, 3, 15, 9, 30, 0)),
            item("B1", "bot noise", at(2024, 3, 14, 9, 0, 0)),
            item("U9", "ghost", at(2024, 3, 14, 9, 0, 0)),
        ])
        .await;
        let sink = Arc::new(CaptureSink::new(true));
        let agg = aggregator(
            store,
            sink.clone(),
            Arc::new(StaticDirectory::new(team())),
            vec![RoutingRule::new("#all", &[], Credential::new("t"))],
        );
        agg.run().await.unwrap();

        let d = &sink.deliveries()[0];
        let titles: Vec<_> = d.message.fields.iter().map(|f| f.title.as_str()).collect();
        assert_eq!(titles, vec!["bob", "alice"]);
        assert_eq!(d.message.fields[1].value, "+ first\n+ second");
    }

    #[tokio::test]
    async fn test_tag_filter_drops_owners_without_matches() {
        let store = seeded_store(&[
            item("U1", "deploy #ops", at(2024, 3, 14, 10, 0, 0)),
            item("U1", "lunch", at(2024, 3, 14, 11, 0, 0)),
            item("U2", "coffee", at(2024, 3, 14, 10, 0, 0)),
        ])
        .await;
        let sink = Arc::new(CaptureSink::new(true));
        let agg = aggregator(
            store,
            sink.clone(),
            Arc::new(StaticDirectory::new(team())),
            vec![RoutingRule::new("#ops", &["#ops"], Credential::new("t"))],
        );
        let report = agg.run().await.unwrap();
        assert_eq!(report.posted, vec![("#ops".to_string(), 1)]);

        let d = &sink.deliveries()[0];
        assert_eq!(d.message.fields.len(), 1);
        assert_eq!(d.message.fields[0].title, "alice");
        assert_eq!(d.message.fields[0].value, "+ deploy #ops");
    }

    #[tokio::test]
    async fn test_empty_digest_is_not_posted() {
        let store = seeded_store(&[item("U1", "old", at(2024, 3, 1, 10, 0, 0))]).await;
        let sink = Arc::new(CaptureSink::new(true));
        let agg = aggregator(
            store,
            sink.clone(),
            Arc::new(StaticDirectory::new(team())),
            vec![
                RoutingRule::new("#a", &[], Credential::new("t")),
                RoutingRule::new("#b", &["x"], Credential::new("t")),
            ],
        );
        let report = agg.run().await.unwrap();
        assert!(sink.deliveries().is_empty());
        assert!(report.posted.is_empty());
        assert_eq!(report.skipped, vec!["#a", "#b"]);
    }

    #[tokio::test]
    async fn test_directory_failure_aborts_run() {
        let store = seeded_store(&[item("U1", "x", at(2024, 3, 14, 10, 0, 0))]).await;
        let sink = Arc::new(CaptureSink::new(true));
        let agg = aggregator(
            store,
            sink.clone(),
            Arc::new(StaticDirectory::unreachable()),
            vec![RoutingRule::new("#a", &[], Credential::new("t"))],
        );
        let err = agg.run().await.unwrap_err();
        assert!(matches!(err, OshinError::Directory(_)));
        assert!(sink.deliveries().is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_is_reported_per_rule() {
        let sink = Arc::new(CaptureSink::new(true));
        let agg = aggregator(
            Arc::new(FailingStore),
            sink.clone(),
            Arc::new(StaticDirectory::new(team())),
            vec![
                RoutingRule::new("#a", &[], Credential::new("t")),
                RoutingRule::new("#b", &[], Credential::new("t")),
            ],
        );
        let report = agg.run().await.unwrap();
        assert_eq!(report.failed.len(), 2);
        assert!(sink.deliveries().is_empty());
    }

    #[tokio::test]
    async fn test_delivery_failure_does_not_stop_other_rules() {
        let store = seeded_store(&[item("U1", "x", at(2024, 3, 14, 10, 0, 0))]).await;
        let sink = Arc::new(FlakySink::failing_for(&["#a"]));
        let agg = aggregator(
            store,
            sink.clone(),
            Arc::new(StaticDirectory::new(team())),
            vec![
                RoutingRule::new("#a", &[], Credential::new("t")),
                RoutingRule::new("#b", &[], Credential::new("t")),
            ],
        );
        let report = agg.run().await.unwrap();
        assert_eq!(sink.attempts(), vec!["#a", "#b"]);
        assert_eq!(report.failed[0].destination, "#a");
        assert_eq!(report.posted, vec![("#b".to_string(), 1)]);
    }

    #[tokio::test]
    async fn test_plain_text_fallback() {
        let store = seeded_store(&[
            item("U2", "b1", at(2024, 3, 14, 10, 0, 0)),
            item("U1", "a1", at(2024, 3, 14, 10, 0, 0)),
            item("U1", "a2", at(2024, 3, 14, 11, 0, 0)),
        ])
        .await;
        let sink = Arc::new(CaptureSink::new(false));
        let agg = aggregator(
            store,
            sink.clone(),
            Arc::new(StaticDirectory::new(team())),
            vec![RoutingRule::new("#a", &[], Credential::new("t"))],
        );
        agg.run().await.unwrap();
        let d = &sink.deliveries()[0];
        assert!(d.message.fields.is_empty());
        assert_eq!(
            d.message.text,
            "Team daily digest for 2024-03-14\n\nbob\n+ b1\n\nalice\n+ a1\n+ a2"
        );
    }

    #[tokio::test]
    async fn test_title_uses_display_zone() {
        let agg = aggregator(
            Arc::new(InMemoryStore::new()),
            Arc::new(CaptureSink::new(true)),
            Arc::new(StaticDirectory::new(vec![])),
            vec![],
        )
        .with_title(chrono_tz::Asia::Tokyo, "Digest %A %d %B");
        // 2024-03-15T20:00Z is already the 16th in Tokyo.
        assert_eq!(
            agg.title_for(at(2024, 3, 15, 20, 0, 0)).unwrap(),
            "Digest Friday 15 March"
        );
    }
}
