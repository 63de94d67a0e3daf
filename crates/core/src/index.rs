//! Lifecycle of the one search index this system owns.
//!
//! `Uninitialized -> Created -> Configured`. Creating an index that already
//! exists counts as created. Upserts are only accepted for processing by the
//! service; they are not guaranteed to be searchable when the call returns.

use crate::error::{IndexError, Result};
use crate::models::{IndexSetup, IndexedDocument, SearchHit, SearchQuery};
use providers::meili::{IndexSettings, SearchRequest, SearchServiceClient};
use providers::ProviderError;
use std::sync::Mutex;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IndexState {
    Uninitialized,
    Created,
    Configured,
}

pub fn default_settings() -> IndexSettings {
    let names = |xs: &[&str]| xs.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    IndexSettings {
        filterable_attributes: names(&["code", "category", "type"]),
        searchable_attributes: names(&["code", "fullname", "content"]),
        sortable_attributes: names(&["code"]),
    }
}

fn already_exists(err: &ProviderError) -> bool {
    matches!(err, ProviderError::Status { status, body }
        if *status == 409 || body.contains("index_already_exists"))
}

pub struct IndexClient {
    client: SearchServiceClient,
    primary_key: String,
    state: Mutex<IndexState>,
}

impl IndexClient {
    pub fn new(client: SearchServiceClient, primary_key: impl Into<String>) -> Self {
        Self {
            client,
            primary_key: primary_key.into(),
            state: Mutex::new(IndexState::Uninitialized),
        }
    }

    pub fn name(&self) -> &str {
        self.client.index()
    }

    pub fn state(&self) -> IndexState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn advance(&self, to: IndexState) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if *state < to {
            *state = to;
        }
    }

    pub async fn create_index(&self) -> Result<IndexSetup> {
        let setup = match self.client.create_index(&self.primary_key).await {
            Ok(resp) => {
                info!(index = %self.name(), status = resp.status, "index creation");
                IndexSetup {
                    created: true,
                    already_existed: false,
                }
            }
            Err(err) if already_exists(&err) => {
                info!(index = %self.name(), "index already exists");
                IndexSetup {
                    created: false,
                    already_existed: true,
                }
            }
            Err(err) => return Err(IndexError::from_service(err)),
        };
        self.advance(IndexState::Created);
        Ok(setup)
    }

    /// Applying the same settings twice leaves the index unchanged.
    pub async fn configure(&self, settings: &IndexSettings) -> Result<()> {
        if self.state() == IndexState::Uninitialized {
            return Err(IndexError::Config(format!(
                "index {} must be created before it is configured",
                self.name()
            )));
        }
        let resp = self
            .client
            .update_settings(settings)
            .await
            .map_err(IndexError::from_service)?;
        info!(index = %self.name(), status = resp.status, "settings configuration");
        self.advance(IndexState::Configured);
        Ok(())
    }

    /// Create, then apply [`default_settings`].
    pub async fn ensure_ready(&self) -> Result<IndexSetup> {
        let setup = self.create_index().await?;
        self.configure(&default_settings()).await?;
        Ok(setup)
    }

    /// Replaces any document with the same id. A non-success answer is a
    /// [`IndexError::RecordRejected`]; transport failures are not.
    pub async fn upsert(&self, document: &IndexedDocument) -> Result<()> {
        match self
            .client
            .add_documents(std::slice::from_ref(document))
            .await
        {
            Ok(resp) => {
                debug!(id = %document.id, status = resp.status, "document accepted");
                Ok(())
            }
            Err(ProviderError::Status { status, body }) => Err(IndexError::RecordRejected {
                code: document.code.clone(),
                reason: format!("status {status}: {body}"),
            }),
            Err(err) => Err(IndexError::from_service(err)),
        }
    }

    /// Hits in the order the service ranked them; empty when nothing matches.
    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>> {
        let request = SearchRequest {
            q: query.text.clone(),
            limit: query.limit,
            attributes_to_retrieve: query.fields_to_return.clone(),
            show_ranking_score: true,
        };
        let resp = self
            .client
            .search(&request)
            .await
            .map_err(IndexError::from_service)?;
        resp.hits
            .into_iter()
            .map(|hit| {
                serde_json::from_value(hit)
                    .map_err(|e| IndexError::MalformedResponse(e.to_string()))
            })
            .collect()
    }
}
