//! Shared HTTP plumbing for the model services
//!
//! Both the embeddings and the chat endpoints are OpenAI-compatible JSON APIs,
//! so they share one client with the same timeout, auth header and retry
//! policy.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::ModelConfig;
use crate::error::{Result, VulnLensError};
use crate::utils::truncate_to_char_boundary;

/// JSON-over-HTTP client with bounded retries
#[derive(Debug, Clone)]
pub struct ModelClient {
    client: reqwest::Client,
    api_key: Option<String>,
    max_retries: u32,
    backoff: Duration,
}

impl ModelClient {
    /// Build a client from the model settings
    pub fn new(config: &ModelConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| VulnLensError::Config {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            max_retries: config.max_retries,
            backoff: Duration::from_millis(config.retry_backoff_ms),
        })
    }

    /// POST `body` to `endpoint` and decode the JSON response
    ///
    /// Transport errors, 5xx and 429 responses are retried with exponential
    /// backoff; other 4xx responses and undecodable bodies fail immediately.
    pub async fn post_json<B, R>(&self, service: &str, endpoint: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let mut attempt = 0;
        loop {
            match self.post_once(service, endpoint, body).await {
                Ok(value) => return Ok(value),
                Err(Attempt::Fatal(e)) => return Err(e),
                Err(Attempt::Retryable(e)) if attempt < self.max_retries => {
                    let delay = self.backoff * 2u32.saturating_pow(attempt);
                    tracing::debug!(
                        "{} request failed (attempt {}), retrying in {:?}: {}",
                        service,
                        attempt + 1,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(Attempt::Retryable(e)) => return Err(e),
            }
        }
    }

    async fn post_once<B, R>(&self, service: &str, endpoint: &str, body: &B) -> std::result::Result<R, Attempt>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let mut request = self.client.post(endpoint).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            let kind = if e.is_timeout() { "timed out" } else { "request failed" };
            Attempt::Retryable(VulnLensError::model(service, format!("{}: {}", kind, e)))
        })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let err = VulnLensError::model(
                service,
                format!("HTTP {}: {}", status, truncate_to_char_boundary(&text, 200)),
            );
            return Err(if status.is_server_error() || status.as_u16() == 429 {
                Attempt::Retryable(err)
            } else {
                Attempt::Fatal(err)
            });
        }

        response
            .json::<R>()
            .await
            .map_err(|e| Attempt::Fatal(VulnLensError::model(service, format!("malformed response: {}", e))))
    }
}

/// Outcome of one failed attempt
enum Attempt {
    Retryable(VulnLensError),
    Fatal(VulnLensError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve the same canned response to every request, counting requests
    async fn stub_server(status: &'static str, body: &'static str) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();

        tokio::spawn(async move {
            loop {
                let (mut socket, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => return,
                };
                read_request(&mut socket).await;
                counter.fetch_add(1, Ordering::SeqCst);
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (format!("http://{}/v1/chat/completions", addr), hits)
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = match socket.read(&mut chunk).await {
                Ok(0) | Err(_) => return,
                Ok(n) => n,
            };
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .find_map(|l| {
                        let (name, value) = l.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length").then(|| value.trim().parse::<usize>().ok())?
                    })
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    return;
                }
            }
        }
    }

    fn retrying_client(max_retries: u32) -> ModelClient {
        let config = ModelConfig {
            max_retries,
            retry_backoff_ms: 1,
            timeout_seconds: 5,
            ..ModelConfig::default()
        };
        ModelClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_server_error_is_retried() {
        let (endpoint, hits) = stub_server("500 Internal Server Error", r#"{"error":"boom"}"#).await;
        let result: Result<serde_json::Value> =
            retrying_client(2).post_json("chat", &endpoint, &serde_json::json!({})).await;

        assert!(matches!(result, Err(VulnLensError::ModelRequest { .. })));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_rate_limit_is_retried() {
        let (endpoint, hits) = stub_server("429 Too Many Requests", "{}").await;
        let result: Result<serde_json::Value> =
            retrying_client(1).post_json("chat", &endpoint, &serde_json::json!({})).await;

        assert!(result.is_err());
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let (endpoint, hits) = stub_server("400 Bad Request", r#"{"error":"bad model"}"#).await;
        let result: Result<serde_json::Value> =
            retrying_client(3).post_json("chat", &endpoint, &serde_json::json!({})).await;

        match result {
            Err(VulnLensError::ModelRequest { message, .. }) => assert!(message.contains("400")),
            other => panic!("expected model error, got {:?}", other),
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_malformed_body_is_not_retried() {
        let (endpoint, hits) = stub_server("200 OK", "{not json").await;
        let result: Result<serde_json::Value> =
            retrying_client(3).post_json("chat", &endpoint, &serde_json::json!({})).await;

        match result {
            Err(VulnLensError::ModelRequest { message, .. }) => assert!(message.contains("malformed")),
            other => panic!("expected model error, got {:?}", other),
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_success_decodes_body() {
        let (endpoint, hits) = stub_server("200 OK", r#"{"ok":true}"#).await;
        let value: serde_json::Value =
            retrying_client(3).post_json("chat", &endpoint, &serde_json::json!({"q":1})).await.unwrap();

        assert_eq!(value["ok"], true);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_empty_api_key_is_dropped() {
        let config = ModelConfig {
            api_key: Some(String::new()),
            ..ModelConfig::default()
        };
        let client = ModelClient::new(&config).unwrap();
        assert!(client.api_key.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_fails_after_retries() {
        let config = ModelConfig {
            max_retries: 1,
            retry_backoff_ms: 1,
            timeout_seconds: 2,
            ..ModelConfig::default()
        };
        let client = ModelClient::new(&config).unwrap();
        let result: Result<serde_json::Value> = client
            .post_json("chat", "http://127.0.0.1:9/v1/chat/completions", &serde_json::json!({}))
            .await;
        match result {
            Err(VulnLensError::ModelRequest { service, .. }) => assert_eq!(service, "chat"),
            other => panic!("expected model error, got {:?}", other),
        }
    }
}
