use async_trait::async_trait;
use serde_json::Value;

use crate::error::{ClientError, ClientResult};

/// Exchanges a local SDP offer for the server's answer over HTTP.
///
/// A trait rather than a concrete client so tests can substitute a fake
/// transport without spinning up a server.
#[async_trait]
pub trait JoinConnector: Send + Sync {
    async fn connect_active_conference(
        &self,
        join_endpoint: &str,
        conference_id: &str,
        access_token: &str,
        sdp_offer: &str,
    ) -> ClientResult<String>;
}

/// Default connector, backed by `reqwest`.
pub struct ReqwestJoinConnector {
    client: reqwest::Client,
}

impl ReqwestJoinConnector {
    /// Builds a client trusting the system roots, optionally adding a CA
    /// bundle read from `ca_cert_path`.
    pub fn new(ca_cert_path: Option<&str>) -> ClientResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(path) = ca_cert_path {
            let pem = std::fs::read(path)
                .map_err(|e| ClientError::internal(format!("reading CA bundle {path}: {e}")))?;
            let cert = reqwest::Certificate::from_pem(&pem)
                .map_err(|e| ClientError::internal(format!("parsing CA bundle {path}: {e}")))?;
            builder = builder.add_root_certificate(cert);
        }
        let client = builder
            .build()
            .map_err(|e| ClientError::internal(e.to_string()))?;
        Ok(ReqwestJoinConnector { client })
    }
}

#[async_trait]
impl JoinConnector for ReqwestJoinConnector {
    async fn connect_active_conference(
        &self,
        join_endpoint: &str,
        conference_id: &str,
        access_token: &str,
        sdp_offer: &str,
    ) -> ClientResult<String> {
        let url = format!("{join_endpoint}/spaces/{conference_id}:connectActiveConference");
        let body = serde_json::json!({ "offer": sdp_offer });

        tracing::debug!(url, "posting connectActiveConference");

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json;charset=UTF-8")
            .header("Authorization", format!("Bearer {access_token}"))
            .json(&body)
            .send()
            .await
            .map_err(|e| ClientError::internal(e.to_string()))?;

        let text = response
            .text()
            .await
            .map_err(|e| ClientError::internal(e.to_string()))?;

        parse_join_response(&text)
    }
}

/// Parses the join endpoint's response body, tolerating partially-populated
/// error objects.
fn parse_join_response(body: &str) -> ClientResult<String> {
    let value: Value = match serde_json::from_str(body) {
        Ok(Value::Object(map)) => Value::Object(map),
        _ => {
            return Err(ClientError::internal(
                "Unparseable or non-json response from join endpoint",
            ))
        }
    };

    if let Some(answer) = value.get("answer").and_then(Value::as_str) {
        return Ok(answer.to_string());
    }

    if let Some(error) = value.get("error") {
        let status = error
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or("Unknown error status");
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Unknown error message");
        return Err(ClientError::internal(format!("{status}: {message}")));
    }

    Err(ClientError::internal(
        "Received response without `answer` or `error` field",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_answer_field() {
        let body = r#"{"answer": "v=0 sdp here"}"#;
        assert_eq!(parse_join_response(body).unwrap(), "v=0 sdp here");
    }

    #[test]
    fn parses_full_error_object() {
        let body = r#"{"error": {"status": "NOT_FOUND", "message": "no such space"}}"#;
        let err = parse_join_response(body).unwrap_err();
        assert_eq!(err.to_string(), "internal: NOT_FOUND: no such space");
    }

    #[test]
    fn error_object_defaults_missing_halves() {
        let body = r#"{"error": {}}"#;
        let err = parse_join_response(body).unwrap_err();
        assert_eq!(
            err.to_string(),
            "internal: Unknown error status: Unknown error message"
        );
    }

    #[test]
    fn rejects_response_missing_both_fields() {
        let body = r#"{"somethingElse": 1}"#;
        let err = parse_join_response(body).unwrap_err();
        assert!(err.to_string().contains("without `answer` or `error`"));
    }

    #[test]
    fn rejects_non_json_body() {
        let err = parse_join_response("not json at all").unwrap_err();
        assert!(err.to_string().contains("Unparseable"));
    }

    #[test]
    fn rejects_non_object_json() {
        let err = parse_join_response("[1, 2, 3]").unwrap_err();
        assert!(err.to_string().contains("Unparseable"));
    }
}
