//! Meilisearch HTTP client
//!
//! Only the three calls the mirror needs: document upsert, index delete and
//! a plain query. Meilisearch queues writes as tasks, so a successful
//! response means "accepted", not "searchable yet".
//! See: https://www.meilisearch.com/docs/reference/api/overview

use async_trait::async_trait;
use serde::Deserialize;

use super::{SearchBackend, SearchDocument, SearchError};

/// Primary key of every mirrored document.
const PRIMARY_KEY: &str = "Id";

/// Meilisearch API client
pub struct MeilisearchClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

/// Error body returned by Meilisearch
#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

impl MeilisearchClient {
    /// Create a client for the service at `base_url`.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self, SearchError> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("music-indexer/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SearchError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn index_url(&self, index: &str, suffix: &str) -> String {
        format!(
            "{}/indexes/{}{}",
            self.base_url,
            urlencoding::encode(index),
            suffix
        )
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, SearchError> {
        self.authorize(request)
            .send()
            .await
            .map_err(|e| SearchError::Network(e.to_string()))
    }
}

/// Turn a non-success response into [`SearchError::Api`].
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, SearchError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = match response.json::<ApiError>().await {
        Ok(error) => error.message,
        Err(_) => status.canonical_reason().unwrap_or("Unknown").to_string(),
    };
    Err(SearchError::Api {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl SearchBackend for MeilisearchClient {
    async fn add_documents(
        &self,
        index: &str,
        documents: &[SearchDocument],
    ) -> Result<(), SearchError> {
        let url = self.index_url(index, "/documents");
        let request = self
            .http_client
            .post(&url)
            .query(&[("primaryKey", PRIMARY_KEY)])
            .json(documents);
        check_status(self.send(request).await?).await?;
        Ok(())
    }

    async fn drop_index(&self, index: &str) -> Result<(), SearchError> {
        let url = self.index_url(index, "");
        let response = self.send(self.http_client.delete(&url)).await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }
        check_status(response).await?;
        Ok(())
    }

    async fn search(&self, index: &str, query: &str) -> Result<serde_json::Value, SearchError> {
        let url = self.index_url(index, "/search");
        let request = self
            .http_client
            .post(&url)
            .json(&serde_json::json!({ "q": query }));
        check_status(self.send(request).await?)
            .await?
            .json::<serde_json::Value>()
            .await
            .map_err(|e| SearchError::Parse(e.to_string()))
    }
}
