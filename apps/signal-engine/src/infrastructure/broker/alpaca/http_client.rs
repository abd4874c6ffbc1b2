//! HTTP client wrapper for one Alpaca account.
//!
//! Sends exactly one request per call and classifies failures.

use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::api_types::AlpacaErrorResponse;
use super::config::AlpacaConfig;
use super::error::AlpacaError;

/// HTTP client for the Alpaca trading and data APIs.
#[derive(Debug, Clone)]
pub struct AlpacaHttpClient {
    client: Client,
    api_key: String,
    api_secret: String,
    trading_base_url: String,
    data_base_url: String,
}

impl AlpacaHttpClient {
    /// Create a new HTTP client from config.
    pub fn new(config: &AlpacaConfig) -> Result<Self, AlpacaError> {
        if config.api_key.is_empty() || config.api_secret.is_empty() {
            return Err(AlpacaError::AuthenticationFailed);
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AlpacaError::Network(e.to_string()))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            trading_base_url: config.trading_base_url().trim_end_matches('/').to_string(),
            data_base_url: config.data_base_url().trim_end_matches('/').to_string(),
        })
    }

    /// Make a GET request to the trading API.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, AlpacaError> {
        let body = self
            .send(Method::GET, &self.trading_base_url, path, None::<&()>)
            .await?;
        decode(&body)
    }

    /// Make a POST request to the trading API.
    pub async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, AlpacaError> {
        let body = self
            .send(Method::POST, &self.trading_base_url, path, Some(body))
            .await?;
        decode(&body)
    }

    /// Make a DELETE request to the trading API. The response body is ignored.
    pub async fn delete(&self, path: &str) -> Result<(), AlpacaError> {
        self.send(Method::DELETE, &self.trading_base_url, path, None::<&()>)
            .await
            .map(|_| ())
    }

    /// Make a GET request to the market data API.
    pub async fn data_get<T: DeserializeOwned>(&self, path: &str) -> Result<T, AlpacaError> {
        let body = self
            .send(Method::GET, &self.data_base_url, path, None::<&()>)
            .await?;
        decode(&body)
    }

    async fn send<B: Serialize + Sync>(
        &self,
        method: Method,
        base_url: &str,
        path: &str,
        body: Option<&B>,
    ) -> Result<String, AlpacaError> {
        let url = format!("{base_url}{path}");
        let mut request = self
            .client
            .request(method.clone(), &url)
            .header("APCA-API-KEY-ID", &self.api_key)
            .header("APCA-API-SECRET-KEY", &self.api_secret);
        if let Some(b) = body {
            request = request.json(b);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AlpacaError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return response
                .text()
                .await
                .map_err(|e| AlpacaError::Network(e.to_string()));
        }

        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());

        let error_body = response.text().await.unwrap_or_default();
        let (code, message) = match serde_json::from_str::<AlpacaErrorResponse>(&error_body) {
            Ok(err) => (
                err.code_string()
                    .unwrap_or_else(|| status.as_u16().to_string()),
                err.message,
            ),
            Err(_) => (status.as_u16().to_string(), error_body),
        };

        tracing::debug!(
            method = %method,
            path,
            status = status.as_u16(),
            code = %code,
            message = %message,
            "Alpaca request failed"
        );

        Err(classify(status, path, code, message, retry_after))
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, AlpacaError> {
    let body = if body.trim().is_empty() { "null" } else { body };
    serde_json::from_str(body).map_err(|e| AlpacaError::JsonParse(e.to_string()))
}

/// Error category for an HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ErrorCategory {
    RateLimited,
    Retryable,
    NonRetryable,
}

/// Categorize HTTP status code for the caller's retry decision.
const fn categorize_status(status: StatusCode) -> ErrorCategory {
    match status.as_u16() {
        429 => ErrorCategory::RateLimited,
        408 | 500..=599 => ErrorCategory::Retryable,
        _ => ErrorCategory::NonRetryable,
    }
}

fn classify(
    status: StatusCode,
    path: &str,
    code: String,
    message: String,
    retry_after_secs: Option<u64>,
) -> AlpacaError {
    match categorize_status(status) {
        ErrorCategory::RateLimited => AlpacaError::RateLimited { retry_after_secs },
        ErrorCategory::Retryable => AlpacaError::Unavailable {
            status: status.as_u16(),
            message,
        },
        ErrorCategory::NonRetryable => match status {
            StatusCode::UNAUTHORIZED => AlpacaError::AuthenticationFailed,
            StatusCode::NOT_FOUND => AlpacaError::NotFound {
                resource: path.to_string(),
            },
            StatusCode::FORBIDDEN | StatusCode::UNPROCESSABLE_ENTITY => {
                AlpacaError::OrderRejected(message)
            }
            _ => AlpacaError::Api {
                status: status.as_u16(),
                code,
                message,
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(StatusCode::TOO_MANY_REQUESTS, ErrorCategory::RateLimited; "429")]
    #[test_case(StatusCode::REQUEST_TIMEOUT, ErrorCategory::Retryable; "408")]
    #[test_case(StatusCode::INTERNAL_SERVER_ERROR, ErrorCategory::Retryable; "500")]
    #[test_case(StatusCode::BAD_GATEWAY, ErrorCategory::Retryable; "502")]
    #[test_case(StatusCode::SERVICE_UNAVAILABLE, ErrorCategory::Retryable; "503")]
    #[test_case(StatusCode::BAD_REQUEST, ErrorCategory::NonRetryable; "400")]
    #[test_case(StatusCode::NOT_FOUND, ErrorCategory::NonRetryable; "404")]
    #[test_case(StatusCode::UNAUTHORIZED, ErrorCategory::NonRetryable; "401")]
    fn categorizes_status(status: StatusCode, expected: ErrorCategory) {
        assert_eq!(categorize_status(status), expected);
    }

    #[test]
    fn classifies_forbidden_as_rejection() {
        let err = classify(
            StatusCode::FORBIDDEN,
            "/v2/orders",
            "40310000".into(),
            "insufficient qty available for order".into(),
            None,
        );
        assert_eq!(
            err,
            AlpacaError::OrderRejected("insufficient qty available for order".into())
        );
    }

    #[test]
    fn classifies_not_found_with_path() {
        let err = classify(
            StatusCode::NOT_FOUND,
            "/v2/orders/abc",
            "404".into(),
            String::new(),
            None,
        );
        assert_eq!(
            err,
            AlpacaError::NotFound {
                resource: "/v2/orders/abc".into()
            }
        );
    }

    #[test]
    fn rate_limit_keeps_retry_after() {
        let err = classify(
            StatusCode::TOO_MANY_REQUESTS,
            "/v2/orders",
            "429".into(),
            String::new(),
            Some(3),
        );
        assert_eq!(
            err,
            AlpacaError::RateLimited {
                retry_after_secs: Some(3)
            }
        );
    }

    #[test]
    fn empty_body_decodes_as_null() {
        let value: Option<u32> = decode("").unwrap();
        assert_eq!(value, None);
    }

    #[test]
    fn rejects_missing_credentials() {
        let config = AlpacaConfig::new(
            String::new(),
            "secret".into(),
            super::super::config::AlpacaEnvironment::Paper,
        );
        assert_eq!(
            AlpacaHttpClient::new(&config).unwrap_err(),
            AlpacaError::AuthenticationFailed
        );
    }
}
