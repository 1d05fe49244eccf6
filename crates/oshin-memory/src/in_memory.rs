//! Process-local store. Contents are lost on restart.

use async_trait::async_trait;
use oshin_core::error::Result;
use oshin_core::traits::RecordStore;
use oshin_core::types::{DigestWindow, StatusItem};
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryStore {
    items: RwLock<Vec<StatusItem>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn insert(&self, item: &StatusItem) -> Result<()> {
        self.items.write().await.push(item.clone());
        Ok(())
    }

    async fn query_by_owner(
        &self,
        owner_id: &str,
        window: &DigestWindow,
    ) -> Result<Vec<StatusItem>> {
        Ok(self
            .items
            .read()
            .await
            .iter()
            .filter(|i| i.owner_id == owner_id && window.contains(i.created_at))
            .cloned()
            .collect())
    }
}
