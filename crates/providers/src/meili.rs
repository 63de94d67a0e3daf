//! REST client for a Meilisearch-style search service.
//!
//! Every request bypasses ambient proxy settings and carries the bearer key.
//! Non-success responses come back as [`ProviderError::Status`] with the body
//! attached so callers can report them.

use crate::ProviderError;
use bytes::Bytes;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Clone)]
pub struct SearchServiceConfig {
    pub url: String,
    pub index: String,
    pub api_key: String,
}

#[derive(Clone)]
pub struct SearchServiceClient {
    client: Client,
    cfg: SearchServiceConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexSettings {
    pub filterable_attributes: Vec<String>,
    pub searchable_attributes: Vec<String>,
    pub sortable_attributes: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub q: String,
    pub limit: usize,
    pub attributes_to_retrieve: Vec<String>,
    pub show_ranking_score: bool,
}

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub hits: Vec<serde_json::Value>,
}

/// Outcome of a request the service answered with a 2xx status.
#[derive(Debug, Clone)]
pub struct Accepted {
    pub status: u16,
    pub body: String,
}

impl SearchServiceClient {
    pub fn new(cfg: SearchServiceConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .no_proxy()
            .build()
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        Ok(Self { client, cfg })
    }

    pub fn index(&self) -> &str {
        &self.cfg.index
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.cfg.url.trim_end_matches('/'), path)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, ProviderError> {
        let resp = builder
            .bearer_auth(&self.cfg.api_key)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.bytes().await.unwrap_or(Bytes::from_static(b""));
            debug!(status, index = %self.cfg.index, "search service returned an error");
            return Err(ProviderError::Status {
                status,
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }
        Ok(resp)
    }

    async fn accepted(&self, builder: RequestBuilder) -> Result<Accepted, ProviderError> {
        let resp = self.send(builder).await?;
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        Ok(Accepted { status, body })
    }

    pub async fn create_index(&self, primary_key: &str) -> Result<Accepted, ProviderError> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct CreateIndex<'a> {
            uid: &'a str,
            primary_key: &'a str,
        }
        let body = CreateIndex {
            uid: &self.cfg.index,
            primary_key,
        };
        self.accepted(self.client.post(self.url("/indexes")).json(&body))
            .await
    }

    pub async fn update_settings(&self, settings: &IndexSettings) -> Result<Accepted, ProviderError> {
        let url = self.url(&format!("/indexes/{}/settings", self.cfg.index));
        self.accepted(self.client.patch(url).json(settings)).await
    }

    pub async fn add_documents<T: Serialize + Sync>(
        &self,
        documents: &[T],
    ) -> Result<Accepted, ProviderError> {
        let url = self.url(&format!("/indexes/{}/documents", self.cfg.index));
        self.accepted(self.client.post(url).json(documents)).await
    }

    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, ProviderError> {
        let url = self.url(&format!("/indexes/{}/search", self.cfg.index));
        let resp = self.send(self.client.post(url).json(request)).await?;
        let body = resp
            .bytes()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        serde_json::from_slice(&body).map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }
}
