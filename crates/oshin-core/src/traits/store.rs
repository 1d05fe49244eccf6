//! Record store trait: append-only persistence of status items.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{DigestWindow, StatusItem};

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Backend name.
    fn name(&self) -> &str;

    /// Persist one item. All-or-nothing.
    async fn insert(&self, item: &StatusItem) -> Result<()>;

    /// Items authored by `owner_id` with `created_at` inside `window`,
    /// in insertion order.
    async fn query_by_owner(&self, owner_id: &str, window: &DigestWindow)
        -> Result<Vec<StatusItem>>;
}
