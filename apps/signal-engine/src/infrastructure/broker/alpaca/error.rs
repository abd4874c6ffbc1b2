//! Alpaca-specific error types.

use thiserror::Error;

use crate::application::ports::BrokerError;

/// Errors from the Alpaca adapter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AlpacaError {
    /// Request could not be built or the method is unsupported.
    #[error("HTTP error: {0}")]
    Http(String),

    /// API returned an error the adapter has no better category for.
    #[error("API error ({status}): {code} - {message}")]
    Api {
        /// HTTP status.
        status: u16,
        /// Error code from the API.
        code: String,
        /// Error message from the API.
        message: String,
    },

    /// Order was rejected.
    #[error("Order rejected: {0}")]
    OrderRejected(String),

    /// Authentication failed.
    #[error("Authentication failed")]
    AuthenticationFailed,

    /// Rate limited.
    #[error("Rate limited (retry after {retry_after_secs:?}s)")]
    RateLimited {
        /// Suggested retry delay in seconds.
        retry_after_secs: Option<u64>,
    },

    /// Server-side failure (5xx, 408).
    #[error("Service unavailable ({status}): {message}")]
    Unavailable {
        /// HTTP status.
        status: u16,
        /// Error message.
        message: String,
    },

    /// Network error.
    #[error("Network error: {0}")]
    Network(String),

    /// JSON parsing error.
    #[error("JSON parsing error: {0}")]
    JsonParse(String),

    /// Order, position, or quote not found.
    #[error("Not found: {resource}")]
    NotFound {
        /// Request path that returned 404.
        resource: String,
    },
}

impl From<AlpacaError> for BrokerError {
    fn from(err: AlpacaError) -> Self {
        match err {
            AlpacaError::Http(msg) | AlpacaError::Network(msg) => {
                Self::ConnectionError { message: msg }
            }
            AlpacaError::JsonParse(message) => Self::MalformedResponse { message },
            AlpacaError::Api {
                status,
                code,
                message,
            } => Self::Unknown {
                message: format!("{status} {code}: {message}"),
            },
            AlpacaError::OrderRejected(reason) => Self::OrderRejected { reason },
            AlpacaError::AuthenticationFailed => Self::AuthenticationFailed,
            AlpacaError::RateLimited { .. } => Self::RateLimited,
            AlpacaError::Unavailable { status, message } => Self::Unavailable { status, message },
            AlpacaError::NotFound { resource } => Self::NotFound { resource },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_errors_are_retryable() {
        let broker_err: BrokerError = AlpacaError::Network("connection refused".into()).into();
        assert!(matches!(broker_err, BrokerError::ConnectionError { .. }));
        assert!(broker_err.is_retryable());
    }

    #[test]
    fn auth_failure_is_final() {
        let broker_err: BrokerError = AlpacaError::AuthenticationFailed.into();
        assert_eq!(broker_err, BrokerError::AuthenticationFailed);
        assert!(!broker_err.is_retryable());
    }

    #[test]
    fn rate_limit_maps_through() {
        let broker_err: BrokerError = AlpacaError::RateLimited {
            retry_after_secs: Some(60),
        }
        .into();
        assert_eq!(broker_err, BrokerError::RateLimited);
    }

    #[test]
    fn rejection_is_final() {
        let broker_err: BrokerError =
            AlpacaError::OrderRejected("insufficient qty available".into()).into();
        assert!(matches!(broker_err, BrokerError::OrderRejected { .. }));
        assert!(!broker_err.is_retryable());
    }

    #[test]
    fn malformed_body_is_not_retried() {
        let broker_err: BrokerError = AlpacaError::JsonParse("expected value".into()).into();
        assert!(matches!(broker_err, BrokerError::MalformedResponse { .. }));
        assert!(!broker_err.is_retryable());
    }

    #[test]
    fn not_found_keeps_resource() {
        let broker_err: BrokerError = AlpacaError::NotFound {
            resource: "/v2/orders/abc".into(),
        }
        .into();
        assert_eq!(
            broker_err,
            BrokerError::NotFound {
                resource: "/v2/orders/abc".into()
            }
        );
    }
}
