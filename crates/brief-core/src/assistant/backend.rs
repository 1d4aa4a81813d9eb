//! Client for the brief backend service (`/chat`, `/upload`, `/export`,
//! `/generate-feed`) and the live [`Assistant`] built on it.

use async_trait::async_trait;
use reqwest::{Client, Response, multipart};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use super::trait_def::{Assistant, AssistantError};
use super::types::{ChatReply, ChatRequest, UploadResponse};
use crate::export::{CanonicalDocument, ExportFormat};
use crate::feed::{FeedRequest, FeedResponse, FeedRow};

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

#[derive(Serialize)]
struct ExportBody<'a> {
    plan: &'a CanonicalDocument,
}

/// Thin reqwest wrapper around the backend's HTTP contract.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: Client,
    base_url: String,
}

impl BackendClient {
    pub const DEFAULT_URL: &str = "http://localhost:8000";

    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// `POST /chat`.
    pub async fn chat(&self, request: &ChatRequest) -> Result<String, BackendError> {
        let resp = self.http.post(self.url("/chat")).json(request).send().await?;
        let reply: ChatReply = check(resp).await?.json().await?;
        Ok(reply.reply)
    }

    /// `POST /upload` as a multipart form with a single `file` field.
    pub async fn upload(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadResponse, BackendError> {
        let part = multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = multipart::Form::new().part("file", part);
        let resp = self
            .http
            .post(self.url("/upload"))
            .multipart(form)
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    /// `POST /export/{format}`; returns the raw payload.
    pub async fn export(
        &self,
        format: ExportFormat,
        plan: &CanonicalDocument,
    ) -> Result<Vec<u8>, BackendError> {
        let resp = self
            .http
            .post(self.url(&format!("/export/{format}")))
            .json(&ExportBody { plan })
            .send()
            .await?;
        let bytes = check(resp).await?.bytes().await?;
        debug!(%format, bytes = bytes.len(), "backend export complete");
        Ok(bytes.to_vec())
    }

    /// `POST /generate-feed`.
    pub async fn generate_feed(&self, request: &FeedRequest) -> Result<Vec<FeedRow>, BackendError> {
        let resp = self
            .http
            .post(self.url("/generate-feed"))
            .json(request)
            .send()
            .await?;
        let body: FeedResponse = check(resp).await?.json().await?;
        Ok(body.feed)
    }
}

impl Default for BackendClient {
    fn default() -> Self {
        Self::new(Self::DEFAULT_URL)
    }
}

/// Turn a non-success response into [`BackendError::Status`].
async fn check(resp: Response) -> Result<Response, BackendError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(BackendError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Live assistant: forwards each turn to the backend's `/chat`.
#[derive(Debug, Clone)]
pub struct BackendAssistant {
    client: BackendClient,
}

impl BackendAssistant {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Assistant for BackendAssistant {
    fn name(&self) -> &str {
        "backend"
    }

    async fn reply(&self, request: &ChatRequest) -> Result<String, AssistantError> {
        Ok(self.client.chat(request).await?)
    }
}
