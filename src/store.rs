use std::sync::Arc;

use anyhow::{Context, Result};
use calsync_core::config::{StoreBackend, SyncConfig};
use calsync_core::{EventStore, MemoryStore, Synchronizer};
use calsync_store_firestore::FirestoreStore;
use tracing::warn;

pub type SharedStore = Arc<dyn EventStore>;

fn open_store(config: &SyncConfig) -> Result<SharedStore> {
    match config.store.backend {
        StoreBackend::Memory => {
            warn!("using the in-memory store; nothing is persisted between runs");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Firestore => {
            let store = FirestoreStore::from_config(&config.store)
                .context("Invalid [store] config")?;
            Ok(Arc::new(store))
        }
    }
}

/// Build a synchronizer for the configured backend.
pub fn synchronizer(config: &SyncConfig) -> Result<Synchronizer<SharedStore>> {
    let options = config.sync_options()?;
    Ok(Synchronizer::new(open_store(config)?, options))
}
