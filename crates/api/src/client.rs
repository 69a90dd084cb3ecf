//! HTTP transport for the GW2 REST API.
//!
//! [`Gw2Api`] wraps a shared `reqwest::Client` with pre-built headers
//! and the API base URL. `call()` issues a GET, classifies the
//! response, and retries gateway failures with a fixed delay.

use crate::error::Gw2Error;
use reqwest::{
    Client, StatusCode,
    header::{self, HeaderMap, HeaderValue},
};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tcore::config::ApiConfig;

/// Production API base.
pub const BASE_URL: &str = "https://api.guildwars2.com/v2";

/// GW2 REST API client.
///
/// Cheap to clone; the underlying `reqwest::Client` is shared.
#[derive(Clone)]
pub struct Gw2Api {
    client: Client,
    base: String,
    headers: HeaderMap,
    retries: u32,
    retry_delay: Duration,
}

/// How a non-success response should be handled.
#[derive(Debug, PartialEq, Eq)]
enum Classified {
    /// Return the error to the caller as-is.
    Fatal(Gw2Error),
    /// Retry; the payload is the error reported on exhaustion.
    Transient(Gw2Error),
}

impl Gw2Api {
    /// Build a client against the production API.
    pub fn new(client: Client, config: &ApiConfig) -> Self {
        Self::with_base(client, config, BASE_URL)
    }

    /// Build a client against a custom base URL (tests, proxies).
    pub fn with_base(client: Client, config: &ApiConfig, base: impl Into<String>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert("lang", HeaderValue::from_static("en"));
        if let Ok(ua) = config.user_agent.parse() {
            headers.insert(header::USER_AGENT, ua);
        }
        Self {
            client,
            base: base.into(),
            headers,
            retries: config.retries.max(1),
            retry_delay: Duration::from_secs(config.retry_delay_secs),
        }
    }

    /// GET an endpoint relative to the API base and decode the JSON
    /// body. A token, when given, is sent as a bearer credential.
    pub async fn call(&self, endpoint: &str, token: Option<&str>) -> Result<Value, Gw2Error> {
        let url = format!("{}/{}", self.base, endpoint);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.call_once(&url, token).await {
                Ok(value) => return Ok(value),
                Err(Classified::Fatal(err)) => return Err(err),
                Err(Classified::Transient(err)) => {
                    if attempt >= self.retries {
                        tracing::warn!("{endpoint}: giving up after {attempt} attempts: {err}");
                        return Err(err);
                    }
                    tracing::debug!("{endpoint}: attempt {attempt} failed, retrying: {err}");
                    tokio::time::sleep(self.retry_delay).await;
                }
            }
        }
    }

    async fn call_once(&self, url: &str, token: Option<&str>) -> Result<Value, Classified> {
        let mut request = self.client.get(url).headers(self.headers.clone());
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = match request.send().await {
            Ok(response) => response,
            // Network-level failures retry under the same policy as
            // gateway errors.
            Err(err) => {
                return Err(Classified::Transient(Gw2Error::ConnectionError(
                    err.to_string(),
                )));
            }
        };

        let status = response.status();
        if status == StatusCode::OK || status == StatusCode::PARTIAL_CONTENT {
            return response
                .json::<Value>()
                .await
                .map_err(|err| Classified::Fatal(Gw2Error::ConnectionError(err.to_string())));
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify_error(status.as_u16(), &body))
    }

    /// Validate a token against `tokeninfo`.
    ///
    /// On success the permission list comes back sorted ascending so
    /// storage and comparisons are deterministic. Failures are the
    /// classified API error; callers inspect the tag.
    pub async fn validate_token(&self, token: &str) -> Result<TokenInfo, Gw2Error> {
        let value = self.call("tokeninfo", Some(token)).await?;
        decode_token_info(value)
    }
}

/// Decode a `tokeninfo` payload, sorting the permission list.
fn decode_token_info(value: Value) -> Result<TokenInfo, Gw2Error> {
    let mut info: TokenInfo = serde_json::from_value(value)
        .map_err(|err| Gw2Error::Key(format!("tokeninfo decode: {err}")))?;
    info.permissions.sort();
    Ok(info)
}

/// Decoded `tokeninfo` response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenInfo {
    pub id: String,
    pub name: String,
    pub permissions: Vec<String>,
}

/// The API marks key problems with this body on 400 and 403.
fn is_invalid_key_body(body: &str) -> bool {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("text").and_then(Value::as_str).map(str::to_owned))
        .is_some_and(|text| text.eq_ignore_ascii_case("invalid key"))
}

/// Server message from an error body, falling back to the raw body.
fn body_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("text").and_then(Value::as_str).map(str::to_owned))
        .unwrap_or_else(|| body.to_owned())
}

fn classify_error(status: u16, body: &str) -> Classified {
    match status {
        400 if is_invalid_key_body(body) => {
            Classified::Fatal(Gw2Error::InvalidKey("the API key is invalid".into()))
        }
        400 => Classified::Fatal(Gw2Error::BadRequest(body_message(body))),
        403 if is_invalid_key_body(body) => {
            Classified::Fatal(Gw2Error::InvalidKey("the API key is invalid".into()))
        }
        403 => Classified::Fatal(Gw2Error::Forbidden(body_message(body))),
        404 => Classified::Fatal(Gw2Error::NotFound("endpoint not found".into())),
        429 => Classified::Fatal(Gw2Error::RateLimited("too many requests".into())),
        502 | 504 => Classified::Transient(Gw2Error::Inactive(
            "the API is temporarily unavailable".into(),
        )),
        503 => Classified::Transient(Gw2Error::Inactive(body_message(body))),
        _ => Classified::Fatal(Gw2Error::ConnectionError(format!("HTTP {status}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn token_info_permissions_come_back_sorted() {
        let value = json!({
            "id": "ABCD-1234",
            "name": "bot key",
            "permissions": ["wallet", "account", "pvp", "characters"],
        });
        let info = decode_token_info(value).unwrap();
        assert_eq!(info.permissions, ["account", "characters", "pvp", "wallet"]);
    }

    #[test]
    fn token_info_missing_fields_is_a_key_error() {
        let err = decode_token_info(json!({"name": "bot key"})).unwrap_err();
        assert!(matches!(err, Gw2Error::Key(_)));
    }

    #[test]
    fn invalid_key_on_400_and_403() {
        let body = r#"{"text":"invalid key"}"#;
        for status in [400, 403] {
            match classify_error(status, body) {
                Classified::Fatal(Gw2Error::InvalidKey(_)) => {}
                other => panic!("unexpected classification for {status}: {other:?}"),
            }
        }
    }

    #[test]
    fn bad_request_without_marker() {
        let c = classify_error(400, r#"{"text":"invalid value for ids"}"#);
        assert_eq!(
            c,
            Classified::Fatal(Gw2Error::BadRequest("invalid value for ids".into()))
        );
    }

    #[test]
    fn forbidden_without_marker() {
        let c = classify_error(403, r#"{"text":"requires scope characters"}"#);
        assert!(matches!(c, Classified::Fatal(Gw2Error::Forbidden(_))));
    }

    #[test]
    fn gateway_errors_are_transient() {
        for status in [502, 503, 504] {
            assert!(
                matches!(
                    classify_error(status, ""),
                    Classified::Transient(Gw2Error::Inactive(_))
                ),
                "{status} should be transient"
            );
        }
    }

    #[test]
    fn service_unavailable_carries_server_message() {
        let c = classify_error(503, r#"{"text":"API disabled for maintenance"}"#);
        let Classified::Transient(Gw2Error::Inactive(message)) = c else {
            panic!("expected transient inactive");
        };
        assert_eq!(message, "API disabled for maintenance");
    }

    #[test]
    fn other_statuses_are_fatal_connection_errors() {
        assert!(matches!(
            classify_error(418, ""),
            Classified::Fatal(Gw2Error::ConnectionError(_))
        ));
        assert!(matches!(
            classify_error(404, ""),
            Classified::Fatal(Gw2Error::NotFound(_))
        ));
        assert!(matches!(
            classify_error(429, ""),
            Classified::Fatal(Gw2Error::RateLimited(_))
        ));
    }
}
