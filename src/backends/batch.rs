//! Batch-job backend
//!
//! Runs a whole submission as one provider-side batch job:
//!
//! 1. build a manifest record per prompt
//! 2. look the manifest up in the cache
//! 3. upload the manifest as a JSONL file
//! 4. create the job and poll it until it leaves `QUEUED`/`RUNNING`
//! 5. download the output file and split it back into per-prompt results
//! 6. cache the raw output records
//!
//! A cache hit re-enters at step 5, so cached and live runs go through the
//! same demultiplexing. Polling has no deadline; a job that never reaches a
//! terminal state blocks the stream indefinitely.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, error, info, instrument};

use super::{CacheLayer, InferenceBackend, InferenceStream};
use crate::cache::{CacheStorage, canonical_json, hash_key};
use crate::defaults::{batch as batch_defaults, mistral};
use crate::error::InferenceError;
use crate::provider::BatchProvider;
use crate::types::{
    BatchJob, BatchJobCreateRequest, BatchRequestRecord, BatchResultRecord, InferenceResult,
    ModelConfig, PromptItem,
};

/// Build one manifest record per item.
///
/// Identifiers are the caller's, or the item's position for anonymous items.
pub fn build_manifest(items: &[PromptItem], config: &ModelConfig) -> Vec<BatchRequestRecord> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| BatchRequestRecord::new(item.resolved_id(index), &item.prompt, config))
        .collect()
}

/// Cache key of a manifest: `mistral_batch_` followed by the SHA-256 of its
/// canonical (key-sorted) JSON form together with the model name.
pub fn manifest_cache_key(
    model: &str,
    manifest: &[BatchRequestRecord],
) -> Result<String, InferenceError> {
    let value = serde_json::json!({
        "model": model,
        "records": serde_json::to_value(manifest)?,
    });
    Ok(format!(
        "{}{}",
        batch_defaults::CACHE_KEY_PREFIX,
        hash_key(&canonical_json(&value))
    ))
}

/// Serialize a manifest as JSONL, one record per line.
pub fn manifest_to_jsonl(manifest: &[BatchRequestRecord]) -> Result<Vec<u8>, InferenceError> {
    let mut out = Vec::new();
    for record in manifest {
        serde_json::to_writer(&mut out, record)?;
        out.push(b'\n');
    }
    Ok(out)
}

/// Parse a batch output file into raw records, skipping blank lines.
pub fn parse_output_file(content: &[u8]) -> Result<Vec<Value>, InferenceError> {
    let text = std::str::from_utf8(content).map_err(|e| InferenceError::ParseError {
        message: format!("batch output is not UTF-8: {e}"),
        raw: String::from_utf8_lossy(content).into_owned(),
    })?;
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            serde_json::from_str(line).map_err(|e| InferenceError::ParseError {
                message: format!("invalid batch output line: {e}"),
                raw: line.to_string(),
            })
        })
        .collect()
}

/// Turn raw output records into tagged results, in provider order.
///
/// The returned identifiers must match the manifest's identifiers one for
/// one; anything else is an [`InferenceError::IdentifierMismatch`].
pub fn demultiplex(
    raw_records: &[Value],
    manifest: &[BatchRequestRecord],
) -> Result<Vec<InferenceResult>, InferenceError> {
    let mut outstanding: HashMap<&str, usize> = HashMap::with_capacity(manifest.len());
    for record in manifest {
        *outstanding.entry(record.custom_id.as_str()).or_default() += 1;
    }
    let mut results = Vec::with_capacity(raw_records.len());

    for raw in raw_records {
        let record = parse_result_record(raw)?;
        match outstanding.get_mut(record.custom_id.as_str()) {
            Some(count) if *count > 0 => *count -= 1,
            Some(_) => {
                return Err(InferenceError::IdentifierMismatch(format!(
                    "provider returned custom_id {} more often than it was submitted",
                    record.custom_id
                )));
            }
            None => {
                return Err(InferenceError::IdentifierMismatch(format!(
                    "provider returned unknown custom_id {}",
                    record.custom_id
                )));
            }
        }
        results.push(InferenceResult::tagged(
            record.custom_id,
            &record.response.body,
        )?);
    }

    let mut missing: Vec<&str> = outstanding
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .map(|(id, _)| id)
        .collect();
    if !missing.is_empty() {
        missing.sort_unstable();
        return Err(InferenceError::IdentifierMismatch(format!(
            "no result for custom_id(s) {}",
            missing.join(", ")
        )));
    }
    Ok(results)
}

fn parse_result_record(raw: &Value) -> Result<BatchResultRecord, InferenceError> {
    serde_json::from_value(raw.clone()).map_err(|e| InferenceError::ParseError {
        message: format!("unexpected batch output record: {e}"),
        raw: raw.to_string(),
    })
}

/// Provider-side batch backend. Cheap to clone.
#[derive(Clone)]
pub struct BatchBackend {
    provider: Arc<dyn BatchProvider>,
    cache: CacheLayer,
    poll_interval: Duration,
}

impl BatchBackend {
    pub fn new(provider: Arc<dyn BatchProvider>) -> Self {
        Self {
            provider,
            cache: CacheLayer::disabled(),
            poll_interval: batch_defaults::POLL_INTERVAL,
        }
    }

    pub fn with_cache(mut self, storage: Arc<dyn CacheStorage>) -> Self {
        self.cache = CacheLayer::new(storage);
        self
    }

    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    #[instrument(skip_all, fields(model = %config.model, items = items.len(), use_cache = use_cache))]
    async fn run(
        &self,
        items: &[PromptItem],
        config: &ModelConfig,
        use_cache: bool,
    ) -> Result<Vec<InferenceResult>, InferenceError> {
        config.validate()?;
        let manifest = build_manifest(items, config);
        if manifest.is_empty() {
            debug!("Empty submission, no batch job needed");
            return Ok(Vec::new());
        }
        let use_cache = use_cache && self.cache.is_enabled();
        let cache_key = manifest_cache_key(&config.model, &manifest)?;

        if use_cache {
            if let Some(cached) = self.cache.lookup(&cache_key).await? {
                info!("Using cached batch results");
                let Value::Array(raw_records) = cached else {
                    return Err(InferenceError::CacheCorrupted {
                        key: cache_key,
                        message: "expected a list of batch output records".to_string(),
                    });
                };
                return demultiplex(&raw_records, &manifest).map_err(|e| {
                    InferenceError::CacheCorrupted {
                        key: cache_key,
                        message: e.to_string(),
                    }
                });
            }
        }

        info!("No cached result found, executing batch job");
        let input_file = self.upload_manifest(&manifest).await?;
        let job = self.execute_job(&input_file, &config.model).await?;
        let output_file = job.output_file.as_deref().ok_or_else(|| {
            InferenceError::InvalidResponse(format!(
                "batch job {} succeeded without an output file",
                job.id
            ))
        })?;
        let raw_records = self.download_results(output_file).await?;
        let results = demultiplex(&raw_records, &manifest)?;

        if use_cache {
            self.cache
                .store(&cache_key, &Value::Array(raw_records))
                .await?;
        }
        info!(results = results.len(), "Batch inference completed");
        Ok(results)
    }

    async fn upload_manifest(
        &self,
        manifest: &[BatchRequestRecord],
    ) -> Result<String, InferenceError> {
        let content = manifest_to_jsonl(manifest)?;
        let file = self
            .provider
            .upload_file(
                mistral::BATCH_FILE_NAME,
                content,
                mistral::BATCH_FILE_PURPOSE,
            )
            .await?;
        info!(file_id = %file.id, records = manifest.len(), "Batch file uploaded");
        Ok(file.id)
    }

    /// Create the job and poll until it is no longer queued or running.
    async fn execute_job(&self, input_file: &str, model: &str) -> Result<BatchJob, InferenceError> {
        let request = BatchJobCreateRequest {
            input_files: vec![input_file.to_string()],
            model: model.to_string(),
            endpoint: mistral::BATCH_ENDPOINT.to_string(),
            metadata: BTreeMap::from([("job_type".to_string(), "inference".to_string())]),
        };
        let created = self.provider.create_batch_job(&request).await?;
        info!(job_id = %created.id, "Batch job created");

        let job = loop {
            let job = self.provider.get_batch_job(&created.id).await?;
            if !job.status.is_active() {
                break job;
            }
            debug!(job_id = %job.id, status = %job.status, "Batch job pending");
            tokio::time::sleep(self.poll_interval).await;
        };

        if !job.status.is_success() {
            error!(job_id = %job.id, status = %job.status, "Batch job failed");
            return Err(InferenceError::BatchJobFailed {
                job_id: job.id,
                status: job.status.to_string(),
            });
        }
        info!(job_id = %job.id, "Batch job completed successfully");
        Ok(job)
    }

    async fn download_results(&self, file_id: &str) -> Result<Vec<Value>, InferenceError> {
        let content = self.provider.download_file(file_id).await?;
        let records = parse_output_file(&content)?;
        info!(file_id, records = records.len(), "Downloaded batch results");
        Ok(records)
    }
}

impl std::fmt::Debug for BatchBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchBackend")
            .field("cache", &self.cache)
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl InferenceBackend for BatchBackend {
    async fn infer_one(
        &self,
        _prompt: &str,
        _config: &ModelConfig,
        _use_cache: bool,
    ) -> Result<Value, InferenceError> {
        Err(InferenceError::UnsupportedOperation(
            "single-prompt inference is not available on the batch backend".to_string(),
        ))
    }

    fn infer_many(
        &self,
        items: Vec<PromptItem>,
        config: ModelConfig,
        use_cache: bool,
    ) -> InferenceStream {
        let backend = self.clone();
        Box::pin(async_stream::stream! {
            match backend.run(&items, &config, use_cache).await {
                Ok(results) => {
                    for result in results {
                        yield Ok(result);
                    }
                }
                Err(e) => yield Err(e),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn manifest() -> Vec<BatchRequestRecord> {
        build_manifest(
            &[PromptItem::new("a", "first"), PromptItem::anonymous("second")],
            &ModelConfig::new("mistral-small-latest"),
        )
    }

    fn output_record(custom_id: &str, content: &str) -> Value {
        json!({
            "id": "batch-abc",
            "custom_id": custom_id,
            "response": {
                "status_code": 200,
                "body": {
                    "object": "chat.completion",
                    "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]
                }
            },
            "error": null
        })
    }

    #[test]
    fn anonymous_items_use_their_position() {
        let ids: Vec<_> = manifest().into_iter().map(|r| r.custom_id).collect();
        assert_eq!(ids, ["a", "1"]);
    }

    #[test]
    fn jsonl_has_one_line_per_record() {
        let manifest = manifest();
        let jsonl = String::from_utf8(manifest_to_jsonl(&manifest).unwrap()).unwrap();
        let lines: Vec<_> = jsonl.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["body"]["messages"][0]["content"], "first");
        assert!(jsonl.ends_with('\n'));
    }

    #[test]
    fn cache_key_depends_on_content_and_model() {
        let manifest = manifest();
        let key = manifest_cache_key("m", &manifest).unwrap();
        assert!(key.starts_with("mistral_batch_"));
        assert_eq!(key.len(), "mistral_batch_".len() + 64);
        assert_eq!(key, manifest_cache_key("m", &manifest).unwrap());
        assert_ne!(key, manifest_cache_key("other", &manifest).unwrap());
        assert_ne!(key, manifest_cache_key("m", &manifest[..1]).unwrap());
    }

    #[test]
    fn output_parsing_skips_blank_lines_and_reports_bad_ones() {
        let content = format!("{}\n\n{}\n", output_record("a", "x"), output_record("b", "y"));
        assert_eq!(parse_output_file(content.as_bytes()).unwrap().len(), 2);

        match parse_output_file(b"{\"custom_id\": \"a\"}\nnot json\n") {
            Err(InferenceError::ParseError { raw, .. }) => assert_eq!(raw, "not json"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn demultiplex_merges_identifier_into_body() {
        let manifest = build_manifest(
            &[PromptItem::new("1", "a"), PromptItem::new("2", "b")],
            &ModelConfig::new("m"),
        );
        let raw = vec![output_record("2", "B"), output_record("1", "A")];

        let results = demultiplex(&raw, &manifest).unwrap();
        assert_eq!(results[0].custom_id, "2");
        assert_eq!(results[0].payload["custom_id"], "2");
        assert_eq!(results[0].payload["choices"][0]["message"]["content"], "B");
        assert_eq!(results[1].custom_id, "1");
        // source records are left untouched
        assert!(raw[0]["response"]["body"].get("custom_id").is_none());
    }

    #[test]
    fn repeated_identifiers_are_matched_by_count() {
        let manifest = build_manifest(
            &[PromptItem::new("x", "a"), PromptItem::new("x", "b")],
            &ModelConfig::new("m"),
        );
        let raw = vec![output_record("x", "A"), output_record("x", "B")];
        assert_eq!(demultiplex(&raw, &manifest).unwrap().len(), 2);
    }

    #[test]
    fn demultiplex_rejects_identifier_drift() {
        let manifest = build_manifest(
            &[PromptItem::new("1", "a"), PromptItem::new("2", "b")],
            &ModelConfig::new("m"),
        );

        let missing = demultiplex(&[output_record("1", "A")], &manifest).unwrap_err();
        assert!(matches!(missing, InferenceError::IdentifierMismatch(ref m) if m.contains('2')));

        let unknown = demultiplex(
            &[output_record("1", "A"), output_record("3", "C")],
            &manifest,
        )
        .unwrap_err();
        assert!(matches!(unknown, InferenceError::IdentifierMismatch(_)));

        let duplicated = demultiplex(
            &[output_record("1", "A"), output_record("1", "A")],
            &manifest,
        )
        .unwrap_err();
        assert!(matches!(duplicated, InferenceError::IdentifierMismatch(_)));
    }
}
