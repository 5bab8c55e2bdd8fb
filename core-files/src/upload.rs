//! # Upload Orchestrator
//!
//! Sends media files to the server as one `multipart/form-data` request
//! while holding the [`MEDIA_UPLOAD_KEY`] busy token.
//!
//! The upload response only lists accepted file names. New files appear in
//! the store when the server broadcasts them over the change stream.

use std::sync::Arc;

use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, MultipartForm, RetryPolicy};
use bytes::Bytes;
use core_runtime::config::ClientConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::busy::{BusyRegistry, MEDIA_UPLOAD_KEY};
use crate::error::Result;
use crate::request::{decode_body, send};

/// Multipart field the server reads files from.
pub const UPLOAD_FIELD: &str = "files";

const OPERATION: &str = "upload files";

/// A file selected for upload.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: "application/octet-stream".to_string(),
            data: data.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }
}

/// Names of the files the server accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UploadResult {
    pub file_names: Vec<String>,
}

pub struct UploadOrchestrator {
    http: Arc<dyn HttpClient>,
    url: String,
    busy: Arc<BusyRegistry>,
}

impl UploadOrchestrator {
    pub fn new(http: Arc<dyn HttpClient>, url: impl Into<String>, busy: Arc<BusyRegistry>) -> Self {
        Self {
            http,
            url: url.into(),
            busy,
        }
    }

    pub fn from_config(config: &ClientConfig, busy: Arc<BusyRegistry>) -> Self {
        Self::new(
            config.http_client.clone(),
            config.api_url(&config.upload_path),
            busy,
        )
    }

    /// Upload `files` in a single request.
    ///
    /// The busy token is held for the whole request and released on every
    /// exit path. An empty selection sends nothing. Uploads are never
    /// retried and carry no client-side timeout.
    #[instrument(skip(self, files), fields(count = files.len()))]
    pub async fn upload(&self, files: Vec<UploadFile>) -> Result<UploadResult> {
        if files.is_empty() {
            debug!("Nothing to upload");
            return Ok(UploadResult::default());
        }

        let _busy = self.busy.acquire(MEDIA_UPLOAD_KEY);

        let form = files.into_iter().fold(MultipartForm::new(), |form, file| {
            form.file(UPLOAD_FIELD, file.file_name, file.content_type, file.data)
        });
        let request = HttpRequest::new(HttpMethod::Post, &self.url)
            .header("Accept", "application/json")
            .multipart(form);

        let response = send(self.http.as_ref(), request, RetryPolicy::no_retry(), OPERATION).await?;
        let result: UploadResult = decode_body(&response, OPERATION)?;

        info!(accepted = result.file_names.len(), "Upload finished");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FilesError;
    use async_trait::async_trait;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::http::HttpResponse;
    use mockall::mock;
    use std::collections::HashMap;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
            async fn execute_with_retry(
                &self,
                request: HttpRequest,
                policy: RetryPolicy,
            ) -> BridgeResult<HttpResponse>;
        }
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    fn orchestrator(http: MockHttpClient) -> (UploadOrchestrator, Arc<BusyRegistry>) {
        let busy = Arc::new(BusyRegistry::new());
        let uploader = UploadOrchestrator::new(
            Arc::new(http),
            "http://localhost:8080/api/upload",
            busy.clone(),
        );
        (uploader, busy)
    }

    #[tokio::test]
    async fn test_upload_sends_multipart() {
        let mut http = MockHttpClient::new();
        http.expect_execute_with_retry()
            .withf(|req, policy| {
                let body = req.body.as_ref().map(|b| String::from_utf8_lossy(b).to_string());
                req.method == HttpMethod::Post
                    && policy.max_attempts == 1
                    && req.timeout.is_none()
                    && req
                        .headers
                        .get("Content-Type")
                        .is_some_and(|v| v.starts_with("multipart/form-data; boundary="))
                    && body.is_some_and(|b| {
                        b.contains("name=\"files\"; filename=\"clip.mov\"")
                            && b.contains("name=\"files\"; filename=\"song.flac\"")
                    })
            })
            .times(1)
            .returning(|_, _| Ok(response(200, r#"["clip.mov","song.flac"]"#)));

        let (uploader, busy) = orchestrator(http);
        let result = uploader
            .upload(vec![
                UploadFile::new("clip.mov", &b"moov"[..]).with_content_type("video/quicktime"),
                UploadFile::new("song.flac", &b"fLaC"[..]),
            ])
            .await
            .unwrap();

        assert_eq!(result.file_names, vec!["clip.mov", "song.flac"]);
        assert!(!busy.is_busy(MEDIA_UPLOAD_KEY));
    }

    #[tokio::test]
    async fn test_token_held_during_request() {
        let busy = Arc::new(BusyRegistry::new());
        let observed = busy.clone();

        let mut http = MockHttpClient::new();
        http.expect_execute_with_retry().returning(move |_, _| {
            assert!(observed.is_busy(MEDIA_UPLOAD_KEY));
            Ok(response(200, r#"["a.mp4"]"#))
        });

        let uploader = UploadOrchestrator::new(Arc::new(http), "http://localhost/api/upload", busy.clone());
        uploader.upload(vec![UploadFile::new("a.mp4", vec![1u8])]).await.unwrap();

        assert!(!busy.is_busy(MEDIA_UPLOAD_KEY));
    }

    #[tokio::test]
    async fn test_rejected_upload_releases_token() {
        let mut http = MockHttpClient::new();
        http.expect_execute_with_retry()
            .returning(|_, _| Ok(response(413, r#"{"error":"file too large","code":413}"#)));

        let (uploader, busy) = orchestrator(http);
        let err = uploader
            .upload(vec![UploadFile::new("big.mkv", vec![0u8; 16])])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            FilesError::Transport { ref message, .. } if message == "HTTP 413: file too large"
        ));
        assert!(!busy.is_busy(MEDIA_UPLOAD_KEY));
    }

    #[tokio::test]
    async fn test_network_failure_releases_token() {
        let mut http = MockHttpClient::new();
        http.expect_execute_with_retry()
            .returning(|_, _| Err(BridgeError::OperationFailed("connection reset".into())));

        let (uploader, busy) = orchestrator(http);
        let result = uploader.upload(vec![UploadFile::new("a.mp4", vec![1u8])]).await;

        assert!(result.unwrap_err().is_transport());
        assert!(!busy.is_busy(MEDIA_UPLOAD_KEY));
    }

    #[tokio::test]
    async fn test_empty_selection_sends_nothing() {
        let mut http = MockHttpClient::new();
        http.expect_execute_with_retry().times(0);

        let (uploader, _busy) = orchestrator(http);
        assert_eq!(uploader.upload(Vec::new()).await.unwrap(), UploadResult::default());
    }

    #[test]
    fn test_result_decodes_from_array() {
        let result: UploadResult = serde_json::from_str(r#"["a.mp4"]"#).unwrap();
        assert_eq!(result.file_names, vec!["a.mp4"]);
    }
}
