//! The remote event store boundary.
//!
//! The synchronizer only needs four document operations. Backends implement
//! [`EventStore`]; [`MemoryStore`] keeps everything in process.

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{SyncError, SyncResult};
use crate::event::{EventDocument, StoredEvent};

#[async_trait]
pub trait EventStore: Send + Sync {
    /// Read every event document in the collection.
    async fn list_all(&self) -> SyncResult<Vec<StoredEvent>>;

    /// Write a new document and return its store-assigned id.
    async fn create(&self, document: &EventDocument) -> SyncResult<String>;

    /// Overwrite the fields of an existing document.
    async fn update(&self, id: &str, document: &EventDocument) -> SyncResult<()>;

    async fn delete(&self, id: &str) -> SyncResult<()>;
}

#[async_trait]
impl<S: EventStore + ?Sized> EventStore for std::sync::Arc<S> {
    async fn list_all(&self) -> SyncResult<Vec<StoredEvent>> {
        (**self).list_all().await
    }

    async fn create(&self, document: &EventDocument) -> SyncResult<String> {
        (**self).create(document).await
    }

    async fn update(&self, id: &str, document: &EventDocument) -> SyncResult<()> {
        (**self).update(id, document).await
    }

    async fn delete(&self, id: &str) -> SyncResult<()> {
        (**self).delete(id).await
    }
}

/// An in-process store, in insertion order.
#[derive(Default)]
pub struct MemoryStore {
    documents: Mutex<Vec<StoredEvent>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Seed the store with existing documents.
    pub fn with_documents(documents: Vec<StoredEvent>) -> Self {
        MemoryStore {
            documents: Mutex::new(documents),
        }
    }

    pub async fn get(&self, id: &str) -> Option<EventDocument> {
        self.documents
            .lock()
            .await
            .iter()
            .find(|d| d.id == id)
            .map(|d| d.document.clone())
    }

    pub async fn len(&self) -> usize {
        self.documents.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.lock().await.is_empty()
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn list_all(&self) -> SyncResult<Vec<StoredEvent>> {
        Ok(self.documents.lock().await.clone())
    }

    async fn create(&self, document: &EventDocument) -> SyncResult<String> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        self.documents.lock().await.push(StoredEvent {
            id: id.clone(),
            document: document.clone(),
        });
        debug!(%id, "created document");
        Ok(id)
    }

    async fn update(&self, id: &str, document: &EventDocument) -> SyncResult<()> {
        let mut documents = self.documents.lock().await;
        let stored = documents
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| SyncError::Network(format!("No document to update: {}", id)))?;
        stored.document = document.clone();
        Ok(())
    }

    async fn delete(&self, id: &str) -> SyncResult<()> {
        let mut documents = self.documents.lock().await;
        let before = documents.len();
        documents.retain(|d| d.id != id);
        if documents.len() == before {
            return Err(SyncError::Network(format!("No document to delete: {}", id)));
        }
        Ok(())
    }
}
