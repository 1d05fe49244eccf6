//! Sink that records deliveries instead of sending them. Backs `--dry-run`.

use std::sync::Mutex;

use async_trait::async_trait;
use oshin_core::error::{OshinError, Result};
use oshin_core::routing::Credential;
use oshin_core::traits::NotificationSink;
use oshin_core::types::OutgoingMessage;

/// One recorded delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub destination: String,
    pub credential: Credential,
    pub message: OutgoingMessage,
}

#[derive(Default)]
pub struct CaptureSink {
    fields: bool,
    deliveries: Mutex<Vec<Delivery>>,
}

impl CaptureSink {
    /// `fields` controls what `supports_fields` reports.
    pub fn new(fields: bool) -> Self {
        Self {
            fields,
            deliveries: Mutex::new(Vec::new()),
        }
    }

    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries
            .lock()
            .map(|d| d.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl NotificationSink for CaptureSink {
    fn name(&self) -> &str {
        "capture"
    }

    fn supports_fields(&self) -> bool {
        self.fields
    }

    async fn deliver(
        &self,
        credential: &Credential,
        destination: &str,
        message: &OutgoingMessage,
    ) -> Result<()> {
        self.deliveries
            .lock()
            .map_err(|e| OshinError::delivery(e.to_string()))?
            .push(Delivery {
                destination: destination.to_string(),
                credential: credential.clone(),
                message: message.clone(),
            });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_in_order() {
        let sink = CaptureSink::new(true);
        let c = Credential::new("t");
        sink.deliver(&c, "#a", &OutgoingMessage::text("1")).await.unwrap();
        sink.deliver(&c, "#b", &OutgoingMessage::text("2")).await.unwrap();
        let d = sink.deliveries();
        assert_eq!(d.len(), 2);
        assert_eq!(d[0].destination, "#a");
        assert_eq!(d[1].message.text, "2");
        assert!(sink.supports_fields());
    }
}
