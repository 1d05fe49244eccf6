//! Test doubles shared by the router and aggregator tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone, Utc};
use mockable::Clock;
use oshin_core::error::{OshinError, Result};
use oshin_core::routing::Credential;
use oshin_core::traits::{NotificationSink, OwnerDirectory, RecordStore};
use oshin_core::types::{DigestWindow, DirectoryUser, OutgoingMessage, StatusItem};

pub fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, s)
        .single()
        .expect("valid fixture timestamp")
}

struct FixedClock {
    utc_now: DateTime<Utc>,
}

impl Clock for FixedClock {
    fn local(&self) -> DateTime<Local> {
        self.utc_now.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.utc_now
    }
}

pub fn fixed_clock(utc_now: DateTime<Utc>) -> Arc<dyn Clock> {
    Arc::new(FixedClock { utc_now })
}

/// Store that rejects every call.
pub struct FailingStore;

#[async_trait]
impl RecordStore for FailingStore {
    fn name(&self) -> &str {
        "failing"
    }

    async fn insert(&self, _item: &StatusItem) -> Result<()> {
        Err(OshinError::persistence("database is locked"))
    }

    async fn query_by_owner(
        &self,
        _owner_id: &str,
        _window: &DigestWindow,
    ) -> Result<Vec<StatusItem>> {
        Err(OshinError::persistence("database is locked"))
    }
}

/// Sink that fails for a fixed set of destinations and records every attempt.
pub struct FlakySink {
    failing: Vec<String>,
    fields: bool,
    attempts: Mutex<Vec<(String, OutgoingMessage)>>,
}

impl FlakySink {
    pub fn failing_for(destinations: &[&str]) -> Self {
        Self {
            failing: destinations.iter().map(|d| d.to_string()).collect(),
            fields: true,
            attempts: Mutex::new(vec![]),
        }
    }

    pub fn attempts(&self) -> Vec<String> {
        self.attempts
            .lock()
            .unwrap()
            .iter()
            .map(|(d, _)| d.clone())
            .collect()
    }
}

#[async_trait]
impl NotificationSink for FlakySink {
    fn name(&self) -> &str {
        "flaky"
    }

    fn supports_fields(&self) -> bool {
        self.fields
    }

    async fn deliver(
        &self,
        _credential: &Credential,
        destination: &str,
        message: &OutgoingMessage,
    ) -> Result<()> {
        self.attempts
            .lock()
            .unwrap()
            .push((destination.to_string(), message.clone()));
        if self.failing.iter().any(|d| d == destination) {
            Err(OshinError::delivery(format!("{destination}: channel_not_found")))
        } else {
            Ok(())
        }
    }
}

/// Directory returning a fixed list, or failing when `users` is `None`.
pub struct StaticDirectory {
    users: Option<Vec<DirectoryUser>>,
}

impl StaticDirectory {
    pub fn new(users: Vec<DirectoryUser>) -> Self {
        Self { users: Some(users) }
    }

    pub fn unreachable() -> Self {
        Self { users: None }
    }
}

#[async_trait]
impl OwnerDirectory for StaticDirectory {
    fn name(&self) -> &str {
        "static"
    }

    async fn list_users(&self) -> Result<Vec<DirectoryUser>> {
        self.users
            .clone()
            .ok_or_else(|| OshinError::directory("invalid_auth"))
    }
}
