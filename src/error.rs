use std::time::Duration;
use thiserror::Error;

/// Failure modes of a single provider call. The retry policy keys off these
/// variants: only `Timeout` and `Network` are worth a second attempt against
/// the same provider.
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("network error: {0}")]
    Network(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("rate limited")]
    RateLimit { retry_after_secs: Option<u64> },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("direct provider calls are disabled by policy")]
    Blocked,
}

impl ProviderError {
    /// Whether a fresh attempt against the same provider can plausibly
    /// succeed. Auth, policy and parse failures are deterministic.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderError::Timeout(_) | ProviderError::Network(_))
    }

    /// Short stable label used in diagnostics counters.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::Timeout(_) => "timeout",
            ProviderError::Network(_) => "network",
            ProviderError::Auth(_) => "auth",
            ProviderError::RateLimit { .. } => "rate_limit",
            ProviderError::Malformed(_) => "malformed",
            ProviderError::Blocked => "blocked",
        }
    }

    /// Auth and Blocked failures need user action (keys, policy), not retries.
    pub fn is_configuration_problem(&self) -> bool {
        matches!(self, ProviderError::Auth(_) | ProviderError::Blocked)
    }

    pub fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout(timeout)
        } else {
            ProviderError::Network(err.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum ShopscoutError {
    #[error("Configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(ProviderError::Timeout(Duration::from_secs(10)).is_retryable());
        assert!(ProviderError::Network("connection reset".into()).is_retryable());
        assert!(!ProviderError::Auth("bad key".into()).is_retryable());
        assert!(!ProviderError::Blocked.is_retryable());
        assert!(!ProviderError::Malformed("not json".into()).is_retryable());
        assert!(!ProviderError::RateLimit {
            retry_after_secs: Some(30)
        }
        .is_retryable());
    }

    #[test]
    fn configuration_problems() {
        assert!(ProviderError::Auth("missing key".into()).is_configuration_problem());
        assert!(ProviderError::Blocked.is_configuration_problem());
        assert!(!ProviderError::Network("dns".into()).is_configuration_problem());
    }
}
