//! Fetch client error types.

use std::sync::Arc;

use sitecache_core::Error;

/// Errors from the reqwest-backed fetch client.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    /// The request did not complete within the configured timeout.
    #[error("request timeout")]
    Timeout,

    /// Connection, DNS, TLS or body transfer failure.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// The request method is not one reqwest accepts.
    #[error("invalid method: {0}")]
    InvalidMethod(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { FetchError::Timeout } else { FetchError::Network(Arc::new(err)) }
    }
}

impl From<FetchError> for Error {
    fn from(err: FetchError) -> Self {
        match &err {
            FetchError::Timeout => Error::FetchTimeout(err.to_string()),
            FetchError::Network(_) => Error::Network(err.to_string()),
            FetchError::InvalidMethod(method) => Error::InvalidInput(format!("invalid method: {method}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_maps_to_fetch_timeout() {
        let err: Error = FetchError::Timeout.into();
        assert!(matches!(err, Error::FetchTimeout(_)));
        assert!(err.is_network());
    }

    #[test]
    fn test_invalid_method_maps_to_invalid_input() {
        let err: Error = FetchError::InvalidMethod("BREW".into()).into();
        assert_eq!(err.code(), "INVALID_INPUT");
    }
}
