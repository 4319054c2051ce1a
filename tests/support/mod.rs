//! In-process providers used by the backend tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use llm_inference::error::InferenceError;
use llm_inference::provider::{BatchProvider, CompletionProvider};
use llm_inference::types::{
    BatchJob, BatchJobCreateRequest, BatchJobStatus, BatchRequestRecord, ChatCompletionRequest,
    FileObject,
};
use serde_json::{Value, json};

/// Mistral-shaped chat completion whose content is a JSON document.
pub fn completion_response(prompt: &str) -> Value {
    let content = json!({"echo": prompt}).to_string();
    json!({
        "id": "cmpl-e5cc70bb28c444948073e77776eb30ef",
        "object": "chat.completion",
        "model": "mistral-small-latest",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 16, "completion_tokens": 34, "total_tokens": 50}
    })
}

/// Completion provider with per-prompt latency and optional throttling.
#[derive(Default)]
pub struct ScriptedProvider {
    calls: AtomicU32,
    finished: AtomicU32,
    throttle_first: u32,
    delays: HashMap<String, Duration>,
    failing: Option<String>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, prompt: &str, delay: Duration) -> Self {
        self.delays.insert(prompt.to_string(), delay);
        self
    }

    /// Answer the first `n` calls with a throttling error.
    pub fn throttling_first(mut self, n: u32) -> Self {
        self.throttle_first = n;
        self
    }

    /// Answer `prompt` with a server error, which is never retried.
    pub fn failing_on(mut self, prompt: &str) -> Self {
        self.failing = Some(prompt.to_string());
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Calls that ran to completion (not aborted mid-flight).
    pub fn finished(&self) -> u32 {
        self.finished.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    async fn complete(&self, request: &ChatCompletionRequest) -> Result<Value, InferenceError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let prompt = request.messages[0].content.as_str();
        if let Some(delay) = self.delays.get(prompt) {
            tokio::time::sleep(*delay).await;
        }
        if n <= self.throttle_first {
            return Err(InferenceError::RateLimited(format!("http=429 attempt {n}")));
        }
        if self.failing.as_deref() == Some(prompt) {
            return Err(InferenceError::api_error(500, "internal server error"));
        }
        self.finished.fetch_add(1, Ordering::SeqCst);
        Ok(completion_response(prompt))
    }
}

/// Batch provider that answers every uploaded record, or returns a fixed
/// output file when one is configured.
pub struct FakeBatchProvider {
    pub uploads: AtomicU32,
    pub jobs_created: AtomicU32,
    pub polls: AtomicU32,
    pub downloads: AtomicU32,
    statuses: Vec<BatchJobStatus>,
    fixed_output: Option<String>,
    uploaded: Mutex<Vec<BatchRequestRecord>>,
    last_job_request: Mutex<Option<BatchJobCreateRequest>>,
}

impl FakeBatchProvider {
    /// Job that is queued, then running, then succeeds.
    pub fn succeeding() -> Self {
        Self::with_statuses(vec![
            BatchJobStatus::Queued,
            BatchJobStatus::Running,
            BatchJobStatus::Success,
        ])
    }

    /// Job whose polls report `statuses` in turn, repeating the last one.
    pub fn with_statuses(statuses: Vec<BatchJobStatus>) -> Self {
        Self {
            uploads: AtomicU32::new(0),
            jobs_created: AtomicU32::new(0),
            polls: AtomicU32::new(0),
            downloads: AtomicU32::new(0),
            statuses,
            fixed_output: None,
            uploaded: Mutex::new(Vec::new()),
            last_job_request: Mutex::new(None),
        }
    }

    pub fn with_output(mut self, jsonl: impl Into<String>) -> Self {
        self.fixed_output = Some(jsonl.into());
        self
    }

    pub fn uploaded(&self) -> Vec<BatchRequestRecord> {
        self.uploaded.lock().unwrap().clone()
    }

    pub fn last_job_request(&self) -> Option<BatchJobCreateRequest> {
        self.last_job_request.lock().unwrap().clone()
    }

    pub fn contacted(&self) -> bool {
        self.uploads.load(Ordering::SeqCst)
            + self.jobs_created.load(Ordering::SeqCst)
            + self.polls.load(Ordering::SeqCst)
            + self.downloads.load(Ordering::SeqCst)
            > 0
    }

    fn job(&self, status: BatchJobStatus) -> BatchJob {
        BatchJob {
            id: "job-1".to_string(),
            status,
            input_files: vec!["file-in".to_string()],
            output_file: Some("file-out".to_string()),
            error_file: None,
            model: Some("mistral-small-latest".to_string()),
            endpoint: Some("/v1/chat/completions".to_string()),
            total_requests: None,
            succeeded_requests: None,
            failed_requests: None,
        }
    }
}

/// One line of a batch output file answering `custom_id` with `content`.
pub fn output_line(custom_id: &str, content: &str) -> String {
    json!({
        "id": format!("batch-{custom_id}"),
        "custom_id": custom_id,
        "response": {
            "status_code": 200,
            "body": {
                "object": "chat.completion",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": content},
                    "finish_reason": "stop"
                }]
            }
        },
        "error": null
    })
    .to_string()
}

#[async_trait]
impl BatchProvider for FakeBatchProvider {
    async fn upload_file(
        &self,
        file_name: &str,
        content: Vec<u8>,
        purpose: &str,
    ) -> Result<FileObject, InferenceError> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        let records = String::from_utf8(content)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        *self.uploaded.lock().unwrap() = records;
        Ok(FileObject {
            id: "file-in".to_string(),
            filename: Some(file_name.to_string()),
            purpose: Some(purpose.to_string()),
            bytes: None,
            created_at: None,
        })
    }

    async fn create_batch_job(
        &self,
        request: &BatchJobCreateRequest,
    ) -> Result<BatchJob, InferenceError> {
        self.jobs_created.fetch_add(1, Ordering::SeqCst);
        *self.last_job_request.lock().unwrap() = Some(request.clone());
        Ok(self.job(BatchJobStatus::Queued))
    }

    async fn get_batch_job(&self, _job_id: &str) -> Result<BatchJob, InferenceError> {
        let n = self.polls.fetch_add(1, Ordering::SeqCst) as usize;
        let status = self
            .statuses
            .get(n)
            .or_else(|| self.statuses.last())
            .cloned()
            .unwrap_or(BatchJobStatus::Success);
        Ok(self.job(status))
    }

    async fn download_file(&self, _file_id: &str) -> Result<Vec<u8>, InferenceError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        if let Some(output) = &self.fixed_output {
            return Ok(output.clone().into_bytes());
        }
        let lines: Vec<String> = self
            .uploaded()
            .iter()
            .map(|record| {
                let prompt = &record.body.messages[0].content;
                output_line(&record.custom_id, &json!({"echo": prompt}).to_string())
            })
            .collect();
        Ok(format!("{}\n", lines.join("\n")).into_bytes())
    }
}
