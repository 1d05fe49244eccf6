//! Users as reported by the external owner directory.

use serde::{Deserialize, Serialize};

/// One entry from the owner directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DirectoryUser {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub is_deactivated: bool,
}

impl DirectoryUser {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            is_bot: false,
            is_deactivated: false,
        }
    }

    /// Bots and deactivated accounts never get a digest entry.
    pub fn is_eligible(&self) -> bool {
        !self.is_bot && !self.is_deactivated
    }
}

/// Keep only digest-eligible owners, preserving directory order.
pub fn eligible_owners(users: Vec<DirectoryUser>) -> Vec<DirectoryUser> {
    users.into_iter().filter(DirectoryUser::is_eligible).collect()
}
