//! HTTP client construction and error classification for transcript requests.

use crate::error::{EpochlyError, Result};
use crate::transcript::FetchError;
use reqwest::StatusCode;
use std::time::Duration;

/// Options for building a transcript HTTP client.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub user_agent: String,
    pub timeout: Duration,
    /// Disable TLS certificate verification. Only the alternate fetchers may set this.
    pub accept_invalid_certs: bool,
}

/// Create a reqwest client with the given timeout, user agent and TLS policy.
pub fn create_client(options: &ClientOptions) -> Result<reqwest::Client> {
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        reqwest::header::ACCEPT_LANGUAGE,
        reqwest::header::HeaderValue::from_static("en-US,en;q=0.9"),
    );

    reqwest::Client::builder()
        .timeout(options.timeout)
        .user_agent(options.user_agent.clone())
        .default_headers(headers)
        .danger_accept_invalid_certs(options.accept_invalid_certs)
        .build()
        .map_err(|e| EpochlyError::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Map a reqwest transport error onto a strategy failure reason.
pub fn classify_error(err: &reqwest::Error) -> FetchError {
    if is_tls_error(err) {
        return FetchError::Tls(root_cause(err));
    }
    if err.is_decode() {
        return FetchError::Malformed(root_cause(err));
    }
    if err.is_timeout() {
        return FetchError::Network(format!("request timed out: {}", root_cause(err)));
    }
    FetchError::Network(root_cause(err))
}

/// Map a non-success HTTP status onto a strategy failure reason.
pub fn check_status(status: StatusCode) -> std::result::Result<(), FetchError> {
    if status.is_success() {
        return Ok(());
    }
    Err(match status {
        StatusCode::TOO_MANY_REQUESTS => FetchError::RateLimited,
        StatusCode::NOT_FOUND | StatusCode::GONE => {
            FetchError::VideoUnavailable(format!("HTTP {}", status))
        }
        StatusCode::FORBIDDEN => FetchError::Blocked(format!("HTTP {}", status)),
        _ => FetchError::Network(format!(
            "HTTP {}: {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown error")
        )),
    })
}

fn is_tls_error(err: &reqwest::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = source {
        let msg = e.to_string().to_ascii_lowercase();
        if msg.contains("certificate") || msg.contains("tls") || msg.contains("ssl") {
            return true;
        }
        source = e.source();
    }
    false
}

fn root_cause(err: &reqwest::Error) -> String {
    let mut current: &(dyn std::error::Error + 'static) = err;
    while let Some(next) = current.source() {
        current = next;
    }
    current.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_status() {
        assert!(check_status(StatusCode::OK).is_ok());
        assert!(matches!(
            check_status(StatusCode::TOO_MANY_REQUESTS),
            Err(FetchError::RateLimited)
        ));
        assert!(matches!(
            check_status(StatusCode::NOT_FOUND),
            Err(FetchError::VideoUnavailable(_))
        ));
        assert!(matches!(
            check_status(StatusCode::INTERNAL_SERVER_ERROR),
            Err(FetchError::Network(_))
        ));
    }

    #[test]
    fn test_create_client() {
        let options = ClientOptions {
            user_agent: "epochly-test".to_string(),
            timeout: Duration::from_secs(5),
            accept_invalid_certs: true,
        };
        assert!(create_client(&options).is_ok());
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_failure() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = create_client(&ClientOptions {
            user_agent: "epochly-test".to_string(),
            timeout: Duration::from_secs(2),
            accept_invalid_certs: false,
        })
        .unwrap();

        let err = client
            .get(format!("http://{}/", addr))
            .send()
            .await
            .unwrap_err();
        assert!(matches!(classify_error(&err), FetchError::Network(_)));
    }
}
