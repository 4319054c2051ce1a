//! HTTP failure classification.

use reqwest::header::HeaderMap;

use crate::error::InferenceError;

/// Classify an HTTP failure into a typed error.
///
/// 429 (and 400/403 bodies that describe a rate limit) become
/// [`InferenceError::RateLimited`], the only variant the retry policy acts
/// on. Everything else maps to a fatal variant carrying a body sample.
pub fn classify_http_error(
    provider_id: &str,
    status: u16,
    body_text: &str,
    headers: &HeaderMap,
) -> InferenceError {
    let lower = body_text.to_lowercase();

    fn header_val(headers: &HeaderMap, name: &str) -> Option<String> {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
    }
    let ids_suffix = match header_val(headers, "x-request-id") {
        Some(id) => format!(" request_id={id}"),
        None => String::new(),
    };
    // Limit body sample size to avoid noisy logs
    let body_sample = body_text.chars().take(200).collect::<String>();

    if status == 429 {
        let retry_after = header_val(headers, "retry-after").unwrap_or_default();
        return InferenceError::RateLimited(format!(
            "provider={provider_id} http=429 retry_after={retry_after}{ids_suffix} body_sample={body_sample}"
        ));
    }

    if status == 400 || status == 403 {
        let rate_like = lower.contains("rate limit")
            || lower.contains("ratelimit")
            || lower.contains("too many requests");
        if rate_like {
            return InferenceError::RateLimited(format!(
                "provider={provider_id} http={status} rate limited{ids_suffix}"
            ));
        }
    }

    match status {
        401 | 403 => InferenceError::AuthenticationError(format!(
            "provider={provider_id} http={status}{ids_suffix} body_sample={body_sample}"
        )),
        404 => InferenceError::NotFound(format!(
            "provider={provider_id} http=404{ids_suffix} body_sample={body_sample}"
        )),
        400 | 413 | 415 | 422 => InferenceError::InvalidInput(format!(
            "provider={provider_id} http={status}{ids_suffix} body_sample={body_sample}"
        )),
        _ => {
            let message = if body_text.trim().is_empty() {
                "api error".to_string()
            } else {
                body_sample
            };
            let details = match serde_json::from_str::<serde_json::Value>(body_text) {
                Ok(json) => serde_json::json!({
                    "status": status,
                    "provider": provider_id,
                    "response": json,
                }),
                Err(_) => serde_json::json!({
                    "status": status,
                    "provider": provider_id,
                    "raw": body_text,
                }),
            };
            InferenceError::api_error_with_details(status, message, details)
        }
    }
}
