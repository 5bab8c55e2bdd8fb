//! # Snapshot Fetcher
//!
//! One-shot read of the server's full file list.

use std::sync::Arc;
use std::time::Duration;

use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, RetryPolicy};
use core_runtime::config::ClientConfig;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::Result;
use crate::message::decode_files;
use crate::models::MediaFile;
use crate::request::{decode_body, send};

const OPERATION: &str = "fetch files";

pub struct SnapshotFetcher {
    http: Arc<dyn HttpClient>,
    url: String,
    timeout: Duration,
}

impl SnapshotFetcher {
    pub fn new(http: Arc<dyn HttpClient>, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http,
            url: url.into(),
            timeout,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(
            config.http_client.clone(),
            config.api_url(&config.files_path),
            config.request_timeout,
        )
    }

    /// Fetch every file the server currently tracks.
    ///
    /// The server answers with a JSON array; an id-keyed object is accepted
    /// as well.
    #[instrument(skip(self), fields(url = %self.url))]
    pub async fn fetch(&self) -> Result<Vec<MediaFile>> {
        let request = HttpRequest::new(HttpMethod::Get, &self.url)
            .header("Accept", "application/json")
            .timeout(self.timeout);

        let response = send(self.http.as_ref(), request, RetryPolicy::default(), OPERATION).await?;
        let body: Value = decode_body(&response, OPERATION)?;
        let files = decode_files(body)?;

        debug!(count = files.len(), "Fetched file snapshot");
        Ok(files)
    }
}
