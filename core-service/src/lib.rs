//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (HTTP client and
//! an optional push channel) into a [`FilesSession`] for one conversion
//! server. Desktop apps typically enable the `desktop-shims` feature, which
//! supplies reqwest and WebSocket adapters from `bridge-desktop`; other hosts
//! inject their own adapters through [`CoreDependencies`].

pub mod error;

pub use error::{CoreError, Result};

use std::sync::Arc;

use bridge_traits::{channel::ChannelOpener, http::HttpClient};
use core_files::{ActivationReport, FilesSession};
use core_runtime::config::{ClientConfig, ClientConfigBuilder};
use tracing::info;

/// Aggregated handle to the bridge dependencies the core requires.
#[derive(Clone)]
pub struct CoreDependencies {
    pub http_client: Arc<dyn HttpClient>,
    /// `None` keeps the session snapshot-only.
    pub channel_opener: Option<Arc<dyn ChannelOpener>>,
}

impl CoreDependencies {
    /// Construct a dependency bundle from explicit bridge handles.
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            channel_opener: None,
        }
    }

    pub fn with_channel_opener(mut self, opener: Arc<dyn ChannelOpener>) -> Self {
        self.channel_opener = Some(opener);
        self
    }

    /// Apply these bridges to a config builder.
    pub fn apply(self, builder: ClientConfigBuilder) -> ClientConfigBuilder {
        let builder = builder.http_client(self.http_client);
        match self.channel_opener {
            Some(opener) => builder.channel_opener(opener),
            None => builder.live_updates(false),
        }
    }
}

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CoreService {
    config: Arc<ClientConfig>,
    files: Arc<FilesSession>,
}

impl CoreService {
    /// Create a new service from a validated configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let files = Arc::new(FilesSession::new(&config));
        Ok(Self {
            config: Arc::new(config),
            files,
        })
    }

    /// Create a service for `base_url` using explicit bridges.
    pub fn with_dependencies(base_url: impl Into<String>, deps: CoreDependencies) -> Result<Self> {
        let config = deps.apply(ClientConfig::builder().base_url(base_url)).build()?;
        Self::new(config)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The files session: store, busy registry, uploads and settings.
    pub fn files(&self) -> Arc<FilesSession> {
        Arc::clone(&self.files)
    }

    /// Load the initial snapshot and start live updates.
    pub async fn start(&self) -> ActivationReport {
        info!(base_url = %self.config.base_url, "Starting files session");
        self.files.activate().await
    }

    /// Stop live updates. The last known file list stays readable.
    pub async fn stop(&self) {
        self.files.shutdown().await;
    }
}

/// Convenience bootstrapper for desktop hosts.
///
/// ```no_run
/// # async fn example() -> core_service::Result<()> {
/// let core = core_service::bootstrap_desktop("http://localhost:8080").await?;
/// for file in core.files().files() {
///     println!("{} {}", file.file_path, file.status);
/// }
/// # Ok(())
/// # }
/// ```
#[cfg(feature = "desktop-shims")]
pub async fn bootstrap_desktop(base_url: impl Into<String>) -> Result<CoreService> {
    let config = ClientConfig::builder().base_url(base_url).build()?;
    let core = CoreService::new(config)?;

    let report = core.start().await;
    if let Err(err) = report.snapshot {
        return Err(CoreError::from(err));
    }
    Ok(core)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::channel::UnsupportedChannelOpener;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::http::{HttpRequest, HttpResponse, RetryPolicy};
    use bytes::Bytes;
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

    fn listing(body: &'static str) -> MockHttpClient {
        let mut http = MockHttpClient::new();
        http.expect_execute_with_retry().returning(move |_, _| {
            Ok(HttpResponse {
                status: 200,
                headers: HashMap::new(),
                body: Bytes::from_static(body.as_bytes()),
            })
        });
        http
    }

    #[tokio::test]
    async fn test_start_loads_snapshot() {
        let deps = CoreDependencies::new(Arc::new(listing(
            r#"[{"id":"a","filePath":"/a.mkv","status":"completed","progress":100}]"#,
        )))
        .with_channel_opener(Arc::new(UnsupportedChannelOpener));

        let core = CoreService::with_dependencies("http://localhost:8080/", deps).unwrap();
        assert_eq!(core.config().base_url, "http://localhost:8080");

        let report = core.start().await;
        assert_eq!(report.snapshot.unwrap(), 1);
        assert!(!report.live_updates.unwrap());
        assert_eq!(core.files().files()[0].id, "a");

        core.stop().await;
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let deps = CoreDependencies::new(Arc::new(listing("[]")));
        let err = CoreService::with_dependencies("localhost:8080", deps)
            .err()
            .unwrap();
        assert!(matches!(err, CoreError::Runtime(_)));
    }

    #[test]
    fn test_missing_channel_disables_live_updates() {
        let deps = CoreDependencies::new(Arc::new(listing("[]")));
        let core = CoreService::with_dependencies("http://localhost:8080", deps).unwrap();
        assert!(core.config().channel_opener.is_none());
    }
}
