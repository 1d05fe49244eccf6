//! # Oshin Memory
//! Append-only status item stores.

pub mod in_memory;
pub mod sqlite;

use std::sync::Arc;

use oshin_core::config::{StoreBackend, StoreConfig, expand_path};
use oshin_core::error::Result;
use oshin_core::traits::RecordStore;

/// Create a record store from configuration.
pub fn create_store(config: &StoreConfig) -> Result<Arc<dyn RecordStore>> {
    match config.backend {
        StoreBackend::Sqlite => {
            let path = expand_path(&config.path);
            Ok(Arc::new(sqlite::SqliteStore::open(&path)?))
        }
        StoreBackend::Memory => Ok(Arc::new(in_memory::InMemoryStore::new())),
    }
}
