//! Owner directory trait: enumerates users eligible for digests.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::DirectoryUser;

#[async_trait]
pub trait OwnerDirectory: Send + Sync {
    fn name(&self) -> &str;

    /// Every known user, bots and deactivated accounts included.
    async fn list_users(&self) -> Result<Vec<DirectoryUser>>;
}
