//! Notification sink trait: delivers text to a named destination.

use async_trait::async_trait;

use crate::error::Result;
use crate::routing::Credential;
use crate::types::OutgoingMessage;

#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Sink name.
    fn name(&self) -> &str;

    /// Whether `OutgoingMessage::fields` are rendered as grouped blocks.
    /// Callers fall back to one flat text block otherwise.
    fn supports_fields(&self) -> bool {
        false
    }

    /// Deliver one message. No retries.
    async fn deliver(
        &self,
        credential: &Credential,
        destination: &str,
        message: &OutgoingMessage,
    ) -> Result<()>;
}
