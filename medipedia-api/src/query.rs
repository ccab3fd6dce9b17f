//! Query gateway for the remote inference endpoint

use async_trait::async_trait;
use medipedia_core::{
    Failure, FailureReason, QueryGateway, QueryRequest, QueryResponse, RequestOutcome,
};
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

use crate::http::HttpClient;

pub const QUERY_FAILURE_MESSAGE: &str =
    "Failed to get response from the server. Please check if the API is running.";
pub const NO_RESPONSE_TEXT: &str = "No response received";
pub const DEFAULT_CONFIDENCE: f64 = 0.8;

/// Keys checked for the answer text, highest priority first
pub const RESPONSE_KEYS: [&str; 2] = ["response", "answer"];
/// Keys checked for citations, highest priority first
pub const REFERENCE_KEYS: [&str; 2] = ["references", "sources"];

/// Normalize the backend's answer into a [`QueryResponse`].
///
/// Backends disagree on field names, so each field is resolved in a fixed
/// priority order:
///
/// 1. text: the first of `response`, `answer` holding a non-empty string,
///    else `"No response received"`
/// 2. citations: the first of `references`, `sources` holding an array
///    (non-string entries are stringified), else empty
/// 3. confidence: a non-zero number (or numeric string) in `confidence`,
///    else `0.8`; clamped to `[0, 1]`
pub fn normalize_query_response(data: &Value) -> QueryResponse {
    let response = RESPONSE_KEYS
        .iter()
        .find_map(|key| data.get(key).and_then(Value::as_str).filter(|s| !s.is_empty()))
        .unwrap_or(NO_RESPONSE_TEXT)
        .to_string();

    let references = REFERENCE_KEYS
        .iter()
        .find_map(|key| data.get(key).and_then(Value::as_array))
        .map(|items| {
            items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect()
        })
        .unwrap_or_default();

    let confidence = data
        .get("confidence")
        .and_then(|value| match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        })
        .filter(|c| *c != 0.0 && c.is_finite())
        .unwrap_or(DEFAULT_CONFIDENCE)
        .clamp(0.0, 1.0);

    QueryResponse {
        response,
        references,
        confidence,
    }
}

/// [`QueryGateway`] posting to `/query`
pub struct HttpQueryGateway {
    http: Arc<HttpClient>,
}

impl HttpQueryGateway {
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }
}

#[async_trait]
impl QueryGateway for HttpQueryGateway {
    async fn send(&self, user_id: &str, query: &str) -> RequestOutcome<QueryResponse> {
        if query.trim().is_empty() {
            return RequestOutcome::failed(
                FailureReason::InvalidRequest,
                "Please enter a question before sending.",
            );
        }

        let body = QueryRequest {
            user_id: user_id.to_string(),
            query: query.to_string(),
        };
        let body = match serde_json::to_value(&body) {
            Ok(body) => body,
            Err(_) => {
                return RequestOutcome::failed(FailureReason::InvalidRequest, QUERY_FAILURE_MESSAGE)
            }
        };

        info!(user_id = %user_id, query_len = query.len(), "Sending query");

        let request = self
            .http
            .request(Method::POST, "query")
            .header("Content-Type", "application/json")
            .header("accept", "application/json")
            .json(body);

        let response = match self.http.execute(request).await {
            RequestOutcome::Ok(response) => response,
            RequestOutcome::Failed(failure) => {
                return RequestOutcome::Failed(failure.with_message(QUERY_FAILURE_MESSAGE))
            }
        };

        match response.json::<Value>() {
            Ok(data) => {
                let normalized = normalize_query_response(&data);
                debug!(
                    references = normalized.references.len(),
                    confidence = normalized.confidence,
                    "Query answered"
                );
                RequestOutcome::Ok(normalized)
            }
            Err(error) => {
                error.log();
                RequestOutcome::Failed(Failure::new(
                    FailureReason::ParseError,
                    QUERY_FAILURE_MESSAGE,
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn aliases_are_used_when_primary_keys_are_missing() {
        let normalized = normalize_query_response(&json!({"answer": "x", "sources": ["s1"]}));
        assert_eq!(
            normalized,
            QueryResponse {
                response: "x".to_string(),
                references: vec!["s1".to_string()],
                confidence: 0.8,
            }
        );
    }

    #[test]
    fn primary_keys_win_over_aliases() {
        let normalized = normalize_query_response(&json!({
            "response": "primary",
            "answer": "alias",
            "references": ["r1", "r2"],
            "sources": ["s1"],
            "confidence": 0.93
        }));
        assert_eq!(normalized.response, "primary");
        assert_eq!(normalized.references, vec!["r1", "r2"]);
        assert!((normalized.confidence - 0.93).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_response_falls_through_to_answer() {
        let normalized = normalize_query_response(&json!({"response": "", "answer": "fallback"}));
        assert_eq!(normalized.response, "fallback");
    }

    #[test]
    fn empty_reference_list_is_kept() {
        let normalized = normalize_query_response(&json!({"references": [], "sources": ["s1"]}));
        assert!(normalized.references.is_empty());
    }

    #[test]
    fn missing_fields_use_defaults() {
        let normalized = normalize_query_response(&json!({}));
        assert_eq!(normalized.response, NO_RESPONSE_TEXT);
        assert!(normalized.references.is_empty());
        assert_eq!(normalized.confidence, DEFAULT_CONFIDENCE);

        let normalized = normalize_query_response(&json!("just a string"));
        assert_eq!(normalized.response, NO_RESPONSE_TEXT);
    }

    #[test]
    fn zero_confidence_defaults_and_out_of_range_is_clamped() {
        assert_eq!(
            normalize_query_response(&json!({"confidence": 0})).confidence,
            DEFAULT_CONFIDENCE
        );
        assert_eq!(
            normalize_query_response(&json!({"confidence": 1.7})).confidence,
            1.0
        );
        assert_eq!(
            normalize_query_response(&json!({"confidence": "0.5"})).confidence,
            0.5
        );
    }

    #[test]
    fn non_string_references_are_stringified() {
        let normalized = normalize_query_response(&json!({"sources": ["a.pdf", 3]}));
        assert_eq!(normalized.references, vec!["a.pdf", "3"]);
    }
}
