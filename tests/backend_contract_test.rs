//! Behaviour shared by every backend: identifiers survive the round trip,
//! the cache absorbs repeated prompts, and the sequential path keeps order.

mod support;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use llm_inference::prelude::*;
use serde_json::json;
use support::{FakeBatchProvider, ScriptedProvider, completion_response};

fn items() -> Vec<PromptItem> {
    vec![
        PromptItem::new("alpha", "What is the capital of France?"),
        PromptItem::new("42", "Name three prime numbers."),
        PromptItem::anonymous("Translate 'bonjour'."),
    ]
}

fn ids(results: &[InferenceResult]) -> BTreeSet<String> {
    results.iter().map(|r| r.custom_id.clone()).collect()
}

fn expected_ids() -> BTreeSet<String> {
    ["alpha", "42", "2"].into_iter().map(String::from).collect()
}

#[tokio::test]
async fn identifiers_round_trip_on_every_backend() {
    let config = ModelConfig::new("mistral-small-latest");

    let sync = SyncBackend::new(Arc::new(ScriptedProvider::new()));
    let concurrent = ConcurrentBackend::new(Arc::new(ScriptedProvider::new())).unwrap();
    let batch = BatchBackend::new(Arc::new(FakeBatchProvider::succeeding()))
        .with_poll_interval(Duration::from_millis(5));
    let backends: Vec<(&str, Box<dyn InferenceBackend>)> = vec![
        ("sync", Box::new(sync)),
        ("concurrent", Box::new(concurrent)),
        ("batch", Box::new(batch)),
    ];

    for (name, backend) in backends {
        let results = collect_all(backend.infer_many(items(), config.clone(), false))
            .await
            .unwrap();
        assert_eq!(results.len(), 3, "{name}");
        assert_eq!(ids(&results), expected_ids(), "{name}");
        for result in &results {
            assert_eq!(result.payload["custom_id"], result.custom_id.as_str(), "{name}");
        }
    }
}

#[tokio::test]
async fn sync_results_keep_input_order() {
    let backend = SyncBackend::new(Arc::new(ScriptedProvider::new()));
    let items: Vec<_> = ["e", "d", "c", "b", "a"]
        .into_iter()
        .map(|id| PromptItem::new(id, format!("prompt {id}")))
        .collect();

    let results = collect_all(backend.infer_many(items, ModelConfig::new("m"), false))
        .await
        .unwrap();

    let order: Vec<_> = results.iter().map(|r| r.custom_id.as_str()).collect();
    assert_eq!(order, ["e", "d", "c", "b", "a"]);
}

#[tokio::test]
async fn repeated_prompt_is_served_from_cache() {
    let provider = Arc::new(ScriptedProvider::new());
    let storage = Arc::new(TmpCacheStorage::new().unwrap());
    let backend = SyncBackend::new(provider.clone()).with_cache(storage);
    let config = ModelConfig::new("m");

    let first = backend.infer_one("hello", &config, true).await.unwrap();
    let second = backend.infer_one("hello", &config, true).await.unwrap();

    assert_eq!(provider.calls(), 1);
    assert_eq!(first, second);
    assert_eq!(first, completion_response("hello"));
}

#[tokio::test]
async fn concurrent_backend_shares_the_cache_contract() {
    let provider = Arc::new(ScriptedProvider::new());
    let backend = ConcurrentBackend::new(provider.clone())
        .unwrap()
        .with_cache(Arc::new(MemoryCacheStorage::new()));
    let config = ModelConfig::new("m");

    backend.infer_one("hello", &config, true).await.unwrap();
    backend.infer_one("hello", &config, true).await.unwrap();
    assert_eq!(provider.calls(), 1);

    // bypassing the cache always goes to the provider
    backend.infer_one("hello", &config, false).await.unwrap();
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn distinct_prompts_get_distinct_entries() {
    let provider = Arc::new(ScriptedProvider::new());
    let backend =
        SyncBackend::new(provider.clone()).with_cache(Arc::new(MemoryCacheStorage::new()));
    let config = ModelConfig::new("m");

    let a = backend.infer_one("prompt a", &config, true).await.unwrap();
    let b = backend.infer_one("prompt b", &config, true).await.unwrap();
    assert_ne!(a, b);

    assert_eq!(backend.infer_one("prompt a", &config, true).await.unwrap(), a);
    assert_eq!(backend.infer_one("prompt b", &config, true).await.unwrap(), b);
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn disk_cache_survives_a_new_backend_instance() {
    let dir = tempfile::tempdir().unwrap();
    let config = ModelConfig::new("m");

    let first_provider = Arc::new(ScriptedProvider::new());
    let first = SyncBackend::new(first_provider.clone())
        .with_cache(Arc::new(DiskCacheStorage::new(dir.path()).unwrap()));
    let stored = first.infer_one("persist me", &config, true).await.unwrap();

    let second_provider = Arc::new(ScriptedProvider::new());
    let second = SyncBackend::new(second_provider.clone())
        .with_cache(Arc::new(DiskCacheStorage::new(dir.path()).unwrap()));
    let replayed = second.infer_one("persist me", &config, true).await.unwrap();

    assert_eq!(stored, replayed);
    assert_eq!(first_provider.calls(), 1);
    assert_eq!(second_provider.calls(), 0);
}

#[tokio::test]
async fn corrupted_cache_entry_is_an_error_not_a_miss() {
    let dir = tempfile::tempdir().unwrap();
    let storage = DiskCacheStorage::new(dir.path()).unwrap();
    let path = dir
        .path()
        .join(format!("{}.cache", llm_inference::cache::hash_key("hello")));
    std::fs::write(&path, b"{ not json").unwrap();

    let provider = Arc::new(ScriptedProvider::new());
    let backend = SyncBackend::new(provider.clone()).with_cache(Arc::new(storage));
    let err = backend
        .infer_one("hello", &ModelConfig::new("m"), true)
        .await
        .unwrap_err();

    assert!(matches!(err, InferenceError::CacheCorrupted { .. }), "{err:?}");
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn parse_response_extracts_structured_content() {
    let backend = SyncBackend::new(Arc::new(ScriptedProvider::new()));
    let raw = backend
        .infer_one("hello", &ModelConfig::new("m").with_json_output(), false)
        .await
        .unwrap();
    assert_eq!(backend.parse_response(&raw).unwrap(), json!({"echo": "hello"}));
}

#[tokio::test]
async fn sync_stream_stops_at_the_first_failure() {
    let provider = Arc::new(ScriptedProvider::new().failing_on("second"));
    let backend = SyncBackend::new(provider.clone());
    let items = vec![
        PromptItem::new("1", "first"),
        PromptItem::new("2", "second"),
        PromptItem::new("3", "third"),
    ];

    let mut stream = backend.infer_many(items, ModelConfig::new("m"), false);
    let mut yielded = Vec::new();
    while let Some(item) = futures_util::StreamExt::next(&mut stream).await {
        yielded.push(item);
    }

    assert_eq!(yielded.len(), 2);
    assert_eq!(yielded[0].as_ref().unwrap().custom_id, "1");
    assert!(matches!(
        yielded[1],
        Err(InferenceError::ApiError { code: 500, .. })
    ));
    assert_eq!(provider.calls(), 2);
    assert_eq!(provider.finished(), 1);
}
