//! HTTP client for desktop hosts, backed by reqwest.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy},
};
use reqwest::{header::HeaderMap, Client, Method, StatusCode};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Reqwest-backed [`HttpClient`].
///
/// Failing statuses come back as `Ok` responses. Retries happen only for
/// connection errors, 429 and 5xx, and only while the policy allows more
/// attempts; the last failing response is returned unchanged.
pub struct ReqwestHttpClient {
    client: Client,
}

/// What to do after one attempt.
enum Attempt {
    Done(HttpResponse),
    Retry(BridgeError),
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(30))
    }

    /// Client whose requests time out after `timeout` unless the request
    /// sets its own.
    pub fn with_timeout(timeout: Duration) -> Self {
        let built = Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(concat!("blockbuffer-client/", env!("CARGO_PKG_VERSION")))
            .build();

        let client = match built {
            Ok(client) => client,
            Err(e) => {
                warn!(error = %e, "Falling back to default HTTP client configuration");
                Client::new()
            }
        };

        Self { client }
    }

    /// Wrap a preconfigured reqwest client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn method(method: HttpMethod) -> Method {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
            HttpMethod::Head => Method::HEAD,
        }
    }

    fn is_retryable(status: StatusCode) -> bool {
        status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
    }

    fn delay_before(policy: &RetryPolicy, attempt: u32) -> Duration {
        if !policy.use_exponential_backoff {
            return policy.base_delay;
        }
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        policy.base_delay.saturating_mul(factor).min(policy.max_delay)
    }

    fn headers(map: &HeaderMap) -> HashMap<String, String> {
        map.iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect()
    }

    fn send_error(error: reqwest::Error) -> BridgeError {
        if error.is_timeout() {
            BridgeError::OperationFailed("Request timed out".to_string())
        } else if error.is_connect() {
            BridgeError::OperationFailed(format!("Connection failed: {}", error))
        } else {
            BridgeError::OperationFailed(error.to_string())
        }
    }

    async fn attempt(&self, request: &HttpRequest, last: bool) -> Result<Attempt> {
        let mut builder = self
            .client
            .request(Self::method(request.method), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => return Ok(Attempt::Retry(Self::send_error(e))),
        };

        let status = response.status();
        if Self::is_retryable(status) && !last {
            return Ok(Attempt::Retry(BridgeError::OperationFailed(format!(
                "HTTP {}",
                status.as_u16()
            ))));
        }

        let headers = Self::headers(response.headers());
        let body = response
            .bytes()
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to read body: {}", e)))?;

        Ok(Attempt::Done(HttpResponse {
            status: status.as_u16(),
            headers,
            body,
        }))
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.execute_with_retry(request, RetryPolicy::default())
            .await
    }

    async fn execute_with_retry(
        &self,
        request: HttpRequest,
        policy: RetryPolicy,
    ) -> Result<HttpResponse> {
        let attempts = policy.max_attempts.max(1);
        let mut failure = None;

        for attempt in 1..=attempts {
            debug!(attempt, attempts, url = %request.url, "Sending HTTP request");

            match self.attempt(&request, attempt == attempts).await? {
                Attempt::Done(response) => return Ok(response),
                Attempt::Retry(error) => {
                    warn!(attempt, url = %request.url, error = %error, "HTTP attempt failed");
                    failure = Some(error);
                }
            }

            if attempt < attempts {
                tokio::time::sleep(Self::delay_before(&policy, attempt)).await;
            }
        }

        Err(failure.unwrap_or_else(|| {
            BridgeError::OperationFailed("No HTTP attempt was made".to_string())
        }))
    }
}
