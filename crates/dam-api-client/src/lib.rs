//! HTTP client for the DAM REST API.
//!
//! Wraps `reqwest` with per-request timeouts (30 s default, 60 s for asset
//! listing, 5 min for uploads), bounded retry for idempotent reads, error
//! classification into [`DamError`], and streamed multipart uploads that
//! report byte progress. Domain methods live in [`api`]; the CLI and the
//! state machines use the client through the [`AssetApi`] trait.

pub mod api;
pub mod progress;
pub mod retry;

use std::sync::Arc;
use std::time::Duration;

use dam_core::{ClientConfig, DamError, DamResult, RetryConfig};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::progress::{tracked_body, ProgressCallback, ProgressTracker};

pub use api::AssetApi;
pub use progress::TransferProgress;

/// Deadline for [`ApiClient::check_health`].
pub const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// One file of a multipart upload, in submission order.
#[derive(Debug, Clone)]
pub struct UploadPart {
    pub file_name: String,
    pub mime_type: String,
    pub content: bytes::Bytes,
}

/// HTTP client for the DAM API.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    config: Arc<ClientConfig>,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> DamResult<Self> {
        config.validate()?;

        // Timeouts are set per request; the builder only bounds connection setup.
        let client = Client::builder()
            .connect_timeout(config.request_timeout)
            .build()
            .map_err(|e| DamError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            config: Arc::new(config),
        })
    }

    /// Create client from environment: DAM_API_BASE_URL (or API_BASE_URL),
    /// DAM_ENVIRONMENT and the timeout/retry overrides of [`ClientConfig`].
    pub fn from_env() -> DamResult<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET with the default timeout and the configured retry policy.
    pub async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> DamResult<T> {
        self.get_with_timeout(path, query, self.config.request_timeout)
            .await
    }

    /// GET with an explicit timeout. Retries transport failures only.
    pub async fn get_with_timeout<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        timeout: Duration,
    ) -> DamResult<T> {
        self.get_url(&self.build_url(path), query, timeout).await
    }

    /// GET `segments` appended to the base URL, each percent-encoded as one
    /// path segment.
    pub async fn get_segments<T: DeserializeOwned>(&self, segments: &[&str]) -> DamResult<T> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| DamError::Config(format!("Invalid API base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| DamError::Config("API base URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(segments);

        self.get_url(url.as_str(), &[], self.config.request_timeout)
            .await
    }

    async fn get_url<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        timeout: Duration,
    ) -> DamResult<T> {
        let label = format!("GET {}", url);

        retry::with_retry(&self.config.retry, &label, move || async move {
            let mut request = self.client.get(url).timeout(timeout);
            if !query.is_empty() {
                request = request.query(query);
            }
            let response = send(request).await?;
            parse_json(response).await
        })
        .await
    }

    /// GET returning the raw body bytes.
    pub async fn get_bytes(&self, path: &str) -> DamResult<bytes::Bytes> {
        let full_url = self.build_url(path);
        let url = full_url.as_str();
        let label = format!("GET {}", path);
        let timeout = self.config.upload_timeout;

        retry::with_retry(&self.config.retry, &label, move || async move {
            let response = send(self.client.get(url).timeout(timeout)).await?;
            response.bytes().await.map_err(classify_transport_error)
        })
        .await
    }

    /// POST JSON body and deserialize response. Never retried.
    pub async fn post_json<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> DamResult<T> {
        let url = self.build_url(path);
        let request = self
            .client
            .post(&url)
            .timeout(self.config.request_timeout)
            .json(body);

        let response = send(request).await?;
        parse_json(response).await
    }

    /// POST a multipart form with one `files` part per upload, in order,
    /// followed by the text `fields`. Byte progress is reported through
    /// `on_progress` as parts are streamed. Uploads are never retried.
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        parts: Vec<UploadPart>,
        fields: Vec<(&'static str, String)>,
        on_progress: Option<ProgressCallback>,
    ) -> DamResult<T> {
        let total: u64 = parts.iter().map(|p| p.content.len() as u64).sum();
        let tracker = ProgressTracker::new(total, on_progress);

        let mut form = reqwest::multipart::Form::new();
        for part in parts {
            let length = part.content.len() as u64;
            let body = tracked_body(part.content, tracker.clone());
            let file_part = reqwest::multipart::Part::stream_with_length(body, length)
                .file_name(part.file_name)
                .mime_str(&part.mime_type)
                .map_err(|e| DamError::Io(format!("Invalid mime type for upload: {}", e)))?;
            form = form.part("files", file_part);
        }
        for (name, value) in fields {
            form = form.text(name, value);
        }

        let url = self.build_url(path);
        let request = self
            .client
            .post(&url)
            .timeout(self.config.upload_timeout)
            .multipart(form);

        let response = send(request).await?;
        parse_json(response).await
    }

    /// DELETE request. Returns Ok(()) on success.
    pub async fn delete(&self, path: &str) -> DamResult<()> {
        let url = self.build_url(path);
        let request = self
            .client
            .delete(&url)
            .timeout(self.config.request_timeout);

        send(request).await?;
        Ok(())
    }

    /// `{origin}/health`: the base URL with its trailing `/api` removed.
    pub fn health_url(&self) -> String {
        let origin = self
            .base_url
            .strip_suffix(dam_core::config::PRODUCTION_API_PATH)
            .unwrap_or(&self.base_url);
        format!("{}/health", origin)
    }

    /// Whether the backend answers its health check with a 2xx within
    /// [`HEALTH_CHECK_TIMEOUT`]. Never retried; every failure reads as down.
    pub async fn check_health(&self) -> bool {
        let url = self.health_url();
        match send(self.client.get(&url).timeout(HEALTH_CHECK_TIMEOUT)).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, url = %url, "Backend health check failed");
                false
            }
        }
    }

    /// Client with retries disabled, for callers that drive their own retry.
    pub fn without_retry(&self) -> Self {
        let mut config = (*self.config).clone();
        config.retry = RetryConfig::none();
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            config: Arc::new(config),
        }
    }
}

/// Send a request and turn transport failures and non-2xx statuses into
/// [`DamError`].
async fn send(request: RequestBuilder) -> DamResult<Response> {
    let response = request.send().await.map_err(classify_transport_error)?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message_from_body(&body).unwrap_or_else(|| {
        format!(
            "HTTP {}: {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown Status")
        )
    });

    tracing::debug!(status = status.as_u16(), message = %message, "API request failed");

    Err(DamError::Http {
        status: status.as_u16(),
        message,
    })
}

async fn parse_json<T: DeserializeOwned>(response: Response) -> DamResult<T> {
    let body = response.text().await.map_err(classify_transport_error)?;
    serde_json::from_str(&body).map_err(|e| DamError::Parse(e.to_string()))
}

/// `{"error": "..."}` or `{"message": "..."}`.
fn error_message_from_body(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["error", "message"]
        .iter()
        .find_map(|key| value.get(key).and_then(|v| v.as_str()))
        .filter(|m| !m.trim().is_empty())
        .map(str::to_string)
}

fn classify_transport_error(err: reqwest::Error) -> DamError {
    if err.is_timeout() {
        DamError::Timeout
    } else if err.is_decode() {
        DamError::Parse(err.to_string())
    } else {
        DamError::Network(err.to_string())
    }
}
