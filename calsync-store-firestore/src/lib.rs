//! calsync-store-firestore - Firestore backend for calsync
//!
//! Talks to the Firestore v1 REST API directly. Each event is one document
//! in a single collection, with the fields `startDate`, `endDate`, `title`,
//! `rRule` and `exDate`.

mod convert;

use async_trait::async_trait;
use calsync_core::config::StoreConfig;
use calsync_core::{EventDocument, EventStore, StoredEvent, SyncError, SyncResult};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, instrument};

pub const DEFAULT_BASE_URL: &str = "https://firestore.googleapis.com/v1";

const PAGE_SIZE: u32 = 300;

#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    documents: Vec<Document>,
    next_page_token: Option<String>,
}

impl Document {
    /// The document id is the last segment of its resource name.
    fn id(&self) -> Option<&str> {
        self.name.rsplit('/').next().filter(|id| !id.is_empty())
    }
}

pub struct FirestoreStore {
    client: Client,
    base_url: String,
    project_id: String,
    database: String,
    collection: String,
    api_key: Option<String>,
}

impl FirestoreStore {
    pub fn new(project_id: &str, database: &str, collection: &str) -> Self {
        FirestoreStore {
            client: Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            project_id: project_id.to_string(),
            database: database.to_string(),
            collection: collection.to_string(),
            api_key: None,
        }
    }

    /// Point at another endpoint, e.g. the local emulator.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.api_key = Some(api_key.to_string());
        self
    }

    pub fn from_config(config: &StoreConfig) -> SyncResult<Self> {
        let project_id = config.project_id.as_deref().ok_or_else(|| {
            SyncError::Config("store.project_id is required for the firestore backend".into())
        })?;

        let mut store = FirestoreStore::new(project_id, &config.database, &config.collection);
        if let Some(base_url) = &config.base_url {
            store = store.with_base_url(base_url);
        }
        if let Some(api_key) = &config.api_key {
            store = store.with_api_key(api_key);
        }
        Ok(store)
    }

    fn collection_url(&self) -> String {
        format!(
            "{}/projects/{}/databases/{}/documents/{}",
            self.base_url, self.project_id, self.database, self.collection
        )
    }

    fn document_url(&self, id: &str) -> String {
        format!("{}/{}", self.collection_url(), id)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.query(&[("key", key)]),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder, action: &str) -> SyncResult<Response> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| SyncError::Network(format!("Failed to {}: {}", action, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::Network(format!(
                "Failed to {}: {} {}",
                action, status, body
            )));
        }
        Ok(response)
    }

    async fn read_json<T: for<'de> Deserialize<'de>>(response: Response) -> SyncResult<T> {
        response
            .json()
            .await
            .map_err(|e| SyncError::Serialization(e.to_string()))
    }
}

#[async_trait]
impl EventStore for FirestoreStore {
    #[instrument(skip(self), fields(collection = %self.collection))]
    async fn list_all(&self) -> SyncResult<Vec<StoredEvent>> {
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(self.collection_url())
                .query(&[("pageSize", PAGE_SIZE.to_string())]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }

            let response = self.send(request, "list events").await?;
            let page: ListResponse = Self::read_json(response).await?;
            debug!(documents = page.documents.len(), "fetched page");

            for document in &page.documents {
                let Some(id) = document.id() else {
                    debug!(name = %document.name, "skipping document without id");
                    continue;
                };
                events.push(StoredEvent {
                    id: id.to_string(),
                    document: convert::from_fields(&document.fields),
                });
            }

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(events)
    }

    async fn create(&self, document: &EventDocument) -> SyncResult<String> {
        let body = Document {
            name: String::new(),
            fields: convert::to_fields(document),
        };
        let request = self.client.post(self.collection_url()).json(&body);

        let response = self.send(request, "create event").await?;
        let created: Document = Self::read_json(response).await?;
        let id = created.id().ok_or_else(|| {
            SyncError::Network("Create response did not include a document name".into())
        })?;

        debug!(%id, "created document");
        Ok(id.to_string())
    }

    async fn update(&self, id: &str, document: &EventDocument) -> SyncResult<()> {
        let mut query: Vec<(&str, &str)> = convert::FIELD_PATHS
            .iter()
            .map(|field| ("updateMask.fieldPaths", *field))
            .collect();
        query.push(("currentDocument.exists", "true"));

        let body = Document {
            name: String::new(),
            fields: convert::to_fields(document),
        };
        let request = self
            .client
            .patch(self.document_url(id))
            .query(&query)
            .json(&body);

        self.send(request, &format!("update event {}", id)).await?;
        debug!(%id, "updated document");
        Ok(())
    }

    async fn delete(&self, id: &str) -> SyncResult<()> {
        let request = self.client.delete(self.document_url(id));
        self.send(request, &format!("delete event {}", id)).await?;
        debug!(%id, "deleted document");
        Ok(())
    }
}
