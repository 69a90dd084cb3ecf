//! Classified errors from the GW2 REST API.

use thiserror::Error;

/// Everything that can go wrong talking to the GW2 API, as a tagged
/// sum callers branch on. Every variant carries a human-readable
/// message.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Gw2Error {
    /// The API rejected the token.
    #[error("invalid API key: {0}")]
    InvalidKey(String),

    /// 400 without the invalid-key marker; treated as an API-down signal.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Token lacks the permission for the endpoint.
    #[error("access denied: {0}")]
    Forbidden(String),

    /// Endpoint or resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// 429 from the API.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Gateway errors persisted across all retry attempts.
    #[error("API unavailable: {0}")]
    Inactive(String),

    /// Transport failure or an unclassified status.
    #[error("connection error: {0}")]
    ConnectionError(String),

    /// A required field was missing from an otherwise valid response.
    #[error("key error: {0}")]
    Key(String),
}

impl Gw2Error {
    /// Whether the failure means the API is down or unreachable rather
    /// than anything being wrong with the user's key or request.
    pub fn is_api_down(&self) -> bool {
        matches!(
            self,
            Gw2Error::BadRequest(_)
                | Gw2Error::RateLimited(_)
                | Gw2Error::Inactive(_)
                | Gw2Error::ConnectionError(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_down_classification() {
        assert!(Gw2Error::Inactive("503".into()).is_api_down());
        assert!(Gw2Error::ConnectionError("timeout".into()).is_api_down());
        assert!(Gw2Error::RateLimited("429".into()).is_api_down());
        assert!(!Gw2Error::InvalidKey("nope".into()).is_api_down());
        assert!(!Gw2Error::Forbidden("scope".into()).is_api_down());
    }
}
