//! Provider boundary
//!
//! Backends talk to the remote model service only through these traits, so
//! tests and alternative transports can stand in for the HTTP client.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::InferenceError;
use crate::types::{BatchJob, BatchJobCreateRequest, ChatCompletionRequest, FileObject};

mod classify;
pub mod mistral;

pub use classify::classify_http_error;
pub use mistral::{MistralClient, MistralConfig};

/// Synchronous-style chat completion (one request, one response).
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Send one completion request and return the provider's raw response
    /// object. Throttling must surface as [`InferenceError::RateLimited`].
    async fn complete(&self, request: &ChatCompletionRequest) -> Result<Value, InferenceError>;
}

/// Out-of-band batch execution: files in, job, files out.
#[async_trait]
pub trait BatchProvider: Send + Sync {
    async fn upload_file(
        &self,
        file_name: &str,
        content: Vec<u8>,
        purpose: &str,
    ) -> Result<FileObject, InferenceError>;

    async fn create_batch_job(
        &self,
        request: &BatchJobCreateRequest,
    ) -> Result<BatchJob, InferenceError>;

    async fn get_batch_job(&self, job_id: &str) -> Result<BatchJob, InferenceError>;

    async fn download_file(&self, file_id: &str) -> Result<Vec<u8>, InferenceError>;
}
