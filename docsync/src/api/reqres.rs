use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, StatusCode, header};
use serde::Serialize;

use crate::api::PostOutcome;
use crate::error::{Result, SyncError};
use crate::models::{PostRecord, UserRecord};

#[async_trait]
pub trait RemoteApi: Send + Sync {
    async fn create_user(&self, user: &UserRecord) -> Result<PostOutcome>;
    async fn create_post(&self, post: &PostRecord) -> Result<PostOutcome>;
    async fn get_source(&self, id: &str) -> Result<Vec<u8>>;
    async fn get_post(&self, id: &str) -> Result<Vec<u8>>;
}

/// Client for a reqres-style demo API exposing `/users` and `/posts`.
pub struct ReqresClient {
    client: Client,
    base_url: String,
}

impl ReqresClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::Config(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn create<T: Serialize + Sync>(
        &self,
        resource: &str,
        what: &'static str,
        record: &T,
    ) -> Result<PostOutcome> {
        let url = format!("{}/{}", self.base_url, resource);
        let body =
            serde_json::to_vec(record).map_err(|source| SyncError::Serialize { what, source })?;

        let response = self
            .client
            .post(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|source| SyncError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        debug!("POST {url} answered {status}");

        if status != StatusCode::CREATED {
            return Ok(PostOutcome::Rejected { status });
        }

        let body = response
            .text()
            .await
            .map_err(|source| SyncError::BodyRead { url, source })?;

        Ok(PostOutcome::Created { body })
    }

    async fn fetch(&self, resource: &str, id: &str) -> Result<Vec<u8>> {
        let url = format!("{}/{}/{}", self.base_url, resource, id);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| SyncError::Transport {
                url: url.clone(),
                source,
            })?;
        debug!("GET {url} answered {}", response.status());

        let bytes = response
            .bytes()
            .await
            .map_err(|source| SyncError::BodyRead { url, source })?;

        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl RemoteApi for ReqresClient {
    async fn create_user(&self, user: &UserRecord) -> Result<PostOutcome> {
        self.create("users", "user record", user).await
    }

    async fn create_post(&self, post: &PostRecord) -> Result<PostOutcome> {
        self.create("posts", "post record", post).await
    }

    async fn get_source(&self, id: &str) -> Result<Vec<u8>> {
        self.fetch("users", id).await
    }

    async fn get_post(&self, id: &str) -> Result<Vec<u8>> {
        self.fetch("posts", id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_stripped() {
        let client = ReqresClient::new("https://reqres.in/api/", Duration::from_secs(30)).unwrap();
        assert_eq!(client.base_url(), "https://reqres.in/api");
    }
}
