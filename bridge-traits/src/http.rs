//! HTTP Client Abstraction
//!
//! The request function the core depends on. Hosts decide how requests are
//! actually sent (reqwest on desktop, `fetch` in a browser shell); the core
//! only needs a status code and a JSON-decodable body back.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::error::{BridgeError, Result};

/// HTTP method types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
}

/// HTTP request builder
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Bytes>,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        let json = serde_json::to_vec(body).map_err(|e| {
            BridgeError::OperationFailed(format!("JSON serialization failed: {}", e))
        })?;
        self.body = Some(Bytes::from(json));
        self.headers
            .insert("Content-Type".to_string(), "application/json".to_string());
        Ok(self)
    }

    /// Attach a `multipart/form-data` body.
    pub fn multipart(mut self, form: MultipartForm) -> Self {
        self.headers
            .insert("Content-Type".to_string(), form.content_type());
        self.body = Some(form.into_body());
        self
    }

    pub fn body(mut self, body: Bytes) -> Self {
        self.body = Some(body);
        self
    }

    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }
}

/// HTTP response
#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

/// Error payload the server writes alongside a failing status code.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

impl HttpResponse {
    /// Parse response body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| {
            BridgeError::OperationFailed(format!("JSON deserialization failed: {}", e))
        })
    }

    /// Get response body as UTF-8 string
    pub fn text(&self) -> Result<String> {
        String::from_utf8(self.body.to_vec())
            .map_err(|e| BridgeError::OperationFailed(format!("Invalid UTF-8: {}", e)))
    }

    /// Check if response status is successful (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Check if response status indicates a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    /// Check if response status indicates a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }

    /// Human readable reason for a failed response.
    ///
    /// Prefers the server's `{"error": "..."}` body and falls back to the
    /// bare status code.
    pub fn error_message(&self) -> String {
        match serde_json::from_slice::<ErrorBody>(&self.body) {
            Ok(body) => format!("HTTP {}: {}", self.status, body.error),
            Err(_) => format!("HTTP {}", self.status),
        }
    }
}

/// A single file part of a multipart upload.
#[derive(Debug, Clone)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

/// Minimal `multipart/form-data` encoder for file uploads.
#[derive(Debug, Clone)]
pub struct MultipartForm {
    boundary: String,
    parts: Vec<FilePart>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self {
            boundary: format!("----blockbuffer-{}", uuid::Uuid::new_v4().simple()),
            parts: Vec::new(),
        }
    }

    pub fn file(
        mut self,
        field: impl Into<String>,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        data: Bytes,
    ) -> Self {
        self.parts.push(FilePart {
            field: field.into(),
            file_name: file_name.into(),
            content_type: content_type.into(),
            data,
        });
        self
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn parts(&self) -> &[FilePart] {
        &self.parts
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn into_body(self) -> Bytes {
        let mut body = Vec::new();
        for part in &self.parts {
            body.extend_from_slice(format!("--{}\r\n", self.boundary).as_bytes());
            body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                    escape_quoted(&part.field),
                    escape_quoted(&part.file_name)
                )
                .as_bytes(),
            );
            body.extend_from_slice(
                format!("Content-Type: {}\r\n\r\n", part_content_type(&part.content_type)).as_bytes(),
            );
            body.extend_from_slice(&part.data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        Bytes::from(body)
    }
}

impl Default for MultipartForm {
    fn default() -> Self {
        Self::new()
    }
}

/// Content types carrying control characters fall back to a generic one.
fn part_content_type(value: &str) -> &str {
    if value.is_empty() || value.chars().any(char::is_control) {
        "application/octet-stream"
    } else {
        value
    }
}

fn escape_quoted(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace(['\r', '\n'], " ")
}

/// Retry policy configuration
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts
    pub max_attempts: u32,
    /// Base delay between retries
    pub base_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Whether to use exponential backoff
    pub use_exponential_backoff: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            use_exponential_backoff: true,
        }
    }
}

impl RetryPolicy {
    /// Single attempt, for requests that must not be replayed (uploads).
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }
}

/// Async HTTP client trait
///
/// Implementations own transport concerns: connection pooling, TLS and
/// retry/backoff. A response with a failing status is still `Ok`; callers
/// decide what a non-2xx status means for them.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::http::{HttpClient, HttpRequest, HttpMethod};
///
/// async fn fetch_files(client: &dyn HttpClient) -> Result<String> {
///     let request = HttpRequest::new(HttpMethod::Get, "http://localhost:8080/api/files");
///     let response = client.execute(request).await?;
///     response.text()
/// }
/// ```
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Execute an HTTP request
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Network connection fails
    /// - Request times out
    /// - Maximum retries exceeded
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;

    /// Execute an HTTP request with custom retry policy
    async fn execute_with_retry(
        &self,
        request: HttpRequest,
        policy: RetryPolicy,
    ) -> Result<HttpResponse> {
        let _ = policy;
        self.execute(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multipart_content_type_cannot_inject_headers() {
        let form = MultipartForm::new().file(
            "files",
            "clip.mov",
            "video/quicktime\r\nX-Injected: 1",
            Bytes::from_static(b"data"),
        );
        let body = String::from_utf8(form.into_body().to_vec()).unwrap();

        assert!(body.contains("Content-Type: application/octet-stream\r\n\r\ndata"));
        assert!(!body.contains("X-Injected"));
    }

    #[test]
    fn test_multipart_keeps_plain_content_type() {
        let form = MultipartForm::new().file("files", "clip.mov", "video/quicktime", Bytes::new());
        let body = String::from_utf8(form.into_body().to_vec()).unwrap();
        assert!(body.contains("Content-Type: video/quicktime\r\n"));
    }

    #[test]
    fn test_http_request_builder() {
        let request = HttpRequest::new(HttpMethod::Get, "http://localhost:8080/api/files")
            .header("Accept", "application/json")
            .timeout(Duration::from_secs(30));

        assert_eq!(request.url, "http://localhost:8080/api/files");
        assert_eq!(
            request.headers.get("Accept"),
            Some(&"application/json".to_string())
        );
        assert_eq!(request.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_json_body_sets_content_type() {
        let request = HttpRequest::new(HttpMethod::Post, "http://localhost/api/config")
            .json(&serde_json::json!({ "autoConvert": false }))
            .unwrap();

        assert_eq!(
            request.headers.get("Content-Type"),
            Some(&"application/json".to_string())
        );
        assert_eq!(
            request.body.unwrap(),
            Bytes::from_static(br#"{"autoConvert":false}"#)
        );
    }

    #[test]
    fn test_http_response_status_checks() {
        let response = HttpResponse {
            status: 200,
            headers: HashMap::new(),
            body: Bytes::from("test"),
        };

        assert!(response.is_success());
        assert!(!response.is_client_error());
        assert!(!response.is_server_error());
    }

    #[test]
    fn test_error_message_prefers_server_body() {
        let response = HttpResponse {
            status: 400,
            headers: HashMap::new(),
            body: Bytes::from(r#"{"error":"Failed to get files","code":400}"#),
        };
        assert_eq!(response.error_message(), "HTTP 400: Failed to get files");

        let bare = HttpResponse {
            status: 502,
            headers: HashMap::new(),
            body: Bytes::from("Bad Gateway"),
        };
        assert_eq!(bare.error_message(), "HTTP 502");
    }

    #[test]
    fn test_multipart_body_layout() {
        let form = MultipartForm::new()
            .file("files", "a.mkv", "video/x-matroska", Bytes::from_static(b"AAA"))
            .file("files", "b\"c.mp4", "video/mp4", Bytes::from_static(b"BB"));
        let boundary = form.boundary().to_string();
        assert_eq!(form.parts().len(), 2);

        let request =
            HttpRequest::new(HttpMethod::Post, "http://localhost/api/upload").multipart(form);
        assert_eq!(
            request.headers.get("Content-Type"),
            Some(&format!("multipart/form-data; boundary={}", boundary))
        );

        let body = String::from_utf8(request.body.unwrap().to_vec()).unwrap();
        assert!(body.starts_with(&format!("--{}\r\n", boundary)));
        assert!(body.contains("name=\"files\"; filename=\"a.mkv\""));
        assert!(body.contains("filename=\"b\\\"c.mp4\""));
        assert!(body.contains("Content-Type: video/mp4\r\n\r\nBB\r\n"));
        assert!(body.ends_with(&format!("--{}--\r\n", boundary)));
    }

    #[test]
    fn test_no_retry_policy() {
        let policy = RetryPolicy::no_retry();
        assert_eq!(policy.max_attempts, 1);
        assert!(policy.use_exponential_backoff);
    }
}
