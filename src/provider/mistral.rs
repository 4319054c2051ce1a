//! Mistral HTTP client
//!
//! Implements [`CompletionProvider`] and [`BatchProvider`] against the
//! Mistral REST API:
//!
//! - `POST /v1/chat/completions`
//! - `POST /v1/files` (multipart, purpose `batch`)
//! - `GET  /v1/files/{id}/content`
//! - `POST /v1/batch/jobs`, `GET /v1/batch/jobs/{id}`
//!
//! # API Reference
//! <https://docs.mistral.ai/api/>

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{debug, instrument};

use super::{BatchProvider, CompletionProvider, classify_http_error};
use crate::defaults;
use crate::error::InferenceError;
use crate::types::{
    BatchJob, BatchJobCreateRequest, ChatCompletionRequest, FileObject, HttpConfig,
};

const PROVIDER_ID: &str = "mistral";

/// Connection settings for [`MistralClient`].
#[derive(Debug, Clone)]
pub struct MistralConfig {
    pub api_key: SecretString,
    /// API root without the `/v1` suffix
    pub base_url: String,
    pub http_config: HttpConfig,
}

impl MistralConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::from(api_key.into()),
            base_url: defaults::mistral::BASE_URL.to_string(),
            http_config: HttpConfig::default(),
        }
    }

    /// Read `MISTRAL_API_KEY` (required) and `MISTRAL_BASE_URL` (optional).
    pub fn from_env() -> Result<Self, InferenceError> {
        let api_key = std::env::var(defaults::mistral::API_KEY_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| {
                InferenceError::ConfigurationError(format!(
                    "{} is not set",
                    defaults::mistral::API_KEY_ENV
                ))
            })?;
        let mut config = Self::new(api_key);
        if let Ok(base_url) = std::env::var(defaults::mistral::BASE_URL_ENV) {
            if !base_url.trim().is_empty() {
                config.base_url = base_url.trim().to_string();
            }
        }
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_http_config(mut self, http_config: HttpConfig) -> Self {
        self.http_config = http_config;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

/// Mistral API client. Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct MistralClient {
    config: MistralConfig,
    http_client: reqwest::Client,
}

impl MistralClient {
    pub fn new(config: MistralConfig) -> Result<Self, InferenceError> {
        let http_client = config.http_config.build_client()?;
        Ok(Self {
            config,
            http_client,
        })
    }

    /// Use a caller-provided `reqwest::Client` (timeouts and proxy in
    /// `config.http_config` are then ignored).
    pub const fn with_http_client(config: MistralConfig, http_client: reqwest::Client) -> Self {
        Self {
            config,
            http_client,
        }
    }

    pub const fn config(&self) -> &MistralConfig {
        &self.config
    }

    fn headers(&self) -> Result<HeaderMap, InferenceError> {
        let mut headers = HeaderMap::new();
        let bearer = format!("Bearer {}", self.config.api_key.expose_secret());
        let auth = HeaderValue::from_str(&bearer).map_err(|_| {
            InferenceError::ConfigurationError("API key is not a valid header value".to_string())
        })?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        for (name, value) in &self.config.http_config.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                InferenceError::ConfigurationError(format!("invalid header name {name}: {e}"))
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                InferenceError::ConfigurationError(format!("invalid header value: {e}"))
            })?;
            headers.insert(name, value);
        }
        Ok(headers)
    }

    /// Send a request and return the raw body of a 2xx response.
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Vec<u8>, InferenceError> {
        let response = request.headers(self.headers()?).send().await?;
        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let body = response.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), "Provider returned an error");
            return Err(classify_http_error(
                PROVIDER_ID,
                status.as_u16(),
                &body,
                &headers,
            ));
        }
        Ok(response.bytes().await?.to_vec())
    }

    async fn send_json<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, InferenceError> {
        let body = self.send(request).await?;
        serde_json::from_slice(&body).map_err(|e| {
            InferenceError::InvalidResponse(format!(
                "provider={PROVIDER_ID} unexpected response body: {e}"
            ))
        })
    }
}

#[async_trait]
impl CompletionProvider for MistralClient {
    #[instrument(skip_all, fields(model = %request.model))]
    async fn complete(&self, request: &ChatCompletionRequest) -> Result<Value, InferenceError> {
        let url = self.config.url("/v1/chat/completions");
        self.send_json(self.http_client.post(url).json(request)).await
    }
}

#[async_trait]
impl BatchProvider for MistralClient {
    #[instrument(skip(self, content), fields(bytes = content.len()))]
    async fn upload_file(
        &self,
        file_name: &str,
        content: Vec<u8>,
        purpose: &str,
    ) -> Result<FileObject, InferenceError> {
        let part = Part::bytes(content)
            .file_name(file_name.to_string())
            .mime_str("application/jsonl")?;
        let form = Form::new()
            .text("purpose", purpose.to_string())
            .part("file", part);
        let url = self.config.url("/v1/files");
        self.send_json(self.http_client.post(url).multipart(form)).await
    }

    #[instrument(skip_all, fields(model = %request.model))]
    async fn create_batch_job(
        &self,
        request: &BatchJobCreateRequest,
    ) -> Result<BatchJob, InferenceError> {
        let url = self.config.url("/v1/batch/jobs");
        self.send_json(self.http_client.post(url).json(request)).await
    }

    async fn get_batch_job(&self, job_id: &str) -> Result<BatchJob, InferenceError> {
        let url = self.config.url(&format!("/v1/batch/jobs/{job_id}"));
        self.send_json(self.http_client.get(url)).await
    }

    #[instrument(skip(self))]
    async fn download_file(&self, file_id: &str) -> Result<Vec<u8>, InferenceError> {
        let url = self.config.url(&format!("/v1/files/{file_id}/content"));
        self.send(self.http_client.get(url)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_without_double_slash() {
        let config = MistralConfig::new("k").with_base_url("http://localhost:8080/");
        assert_eq!(
            config.url("/v1/batch/jobs"),
            "http://localhost:8080/v1/batch/jobs"
        );
    }

    #[test]
    fn api_key_is_redacted_in_debug_output() {
        let config = MistralConfig::new("super-secret-key");
        assert!(!format!("{config:?}").contains("super-secret-key"));
    }
}
