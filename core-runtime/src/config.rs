//! # Client Configuration Module
//!
//! Provides configuration for the file-tracking client.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a
//! `ClientConfig` holding the server location, endpoint paths, timeouts and
//! the bridge implementations the core talks through. It validates eagerly so
//! a misconfigured client fails at startup rather than on the first request.
//!
//! ## Required Dependencies
//!
//! - `HttpClient` - snapshot fetch, uploads and settings (desktop default:
//!   reqwest)
//!
//! ## Optional Dependencies
//!
//! - `ChannelOpener` - live change stream (desktop default: WebSocket). When
//!   absent the client runs in snapshot-only mode.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::ClientConfig;
//!
//! let config = ClientConfig::builder()
//!     .base_url("http://localhost:8080")
//!     .build()
//!     .expect("Failed to build config");
//!
//! assert_eq!(config.api_url(&config.files_path), "http://localhost:8080/api/files");
//! assert_eq!(config.channel_url(), "ws://localhost:8080/ws");
//! ```
//!
//! ## Error Handling
//!
//! Without the `desktop-shims` feature the builder fails with
//! `Error::CapabilityMissing` when no `HttpClient` is injected.

use crate::error::{Error, Result};
use bridge_traits::{ChannelOpener, HttpClient};
use std::sync::Arc;
use std::time::Duration;

/// Default API prefix the server mounts its JSON endpoints under.
pub const DEFAULT_API_PREFIX: &str = "/api";
pub const DEFAULT_FILES_PATH: &str = "/files";
pub const DEFAULT_UPLOAD_PATH: &str = "/upload";
pub const DEFAULT_SETTINGS_PATH: &str = "/config";
pub const DEFAULT_CHANNEL_PATH: &str = "/ws";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client configuration.
///
/// Use [`ClientConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct ClientConfig {
    /// Server origin, e.g. `http://localhost:8080` (no trailing slash)
    pub base_url: String,

    /// Prefix for JSON endpoints
    pub api_prefix: String,

    /// Snapshot endpoint, relative to the API prefix
    pub files_path: String,

    /// Upload endpoint, relative to the API prefix
    pub upload_path: String,

    /// Settings endpoint, relative to the API prefix
    pub settings_path: String,

    /// Push channel path, relative to the origin
    pub channel_path: String,

    /// Per-request timeout for JSON calls
    pub request_timeout: Duration,

    /// Buffer size of the event bus
    pub event_buffer_size: usize,

    pub http_client: Arc<dyn HttpClient>,

    /// `None` means live updates are disabled
    pub channel_opener: Option<Arc<dyn ChannelOpener>>,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("api_prefix", &self.api_prefix)
            .field("files_path", &self.files_path)
            .field("upload_path", &self.upload_path)
            .field("settings_path", &self.settings_path)
            .field("channel_path", &self.channel_path)
            .field("request_timeout", &self.request_timeout)
            .field("event_buffer_size", &self.event_buffer_size)
            .field("http_client", &"HttpClient { ... }")
            .field(
                "channel_opener",
                &self
                    .channel_opener
                    .as_ref()
                    .map(|_| "ChannelOpener { ... }"),
            )
            .finish()
    }
}

impl ClientConfig {
    /// Creates a new builder for constructing a `ClientConfig`.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Absolute URL of a JSON endpoint.
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, self.api_prefix, path)
    }

    /// Absolute URL of the push channel, with the scheme switched to
    /// `ws`/`wss`.
    pub fn channel_url(&self) -> String {
        let origin = if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            self.base_url.clone()
        };
        format!("{}{}", origin, self.channel_path)
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(Error::Config("Base URL cannot be empty".to_string()));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(Error::Config(format!(
                "Base URL must start with http:// or https://, got '{}'",
                self.base_url
            )));
        }

        if !self.api_prefix.is_empty() && !self.api_prefix.starts_with('/') {
            return Err(Error::Config(format!(
                "API prefix must be empty or start with '/', got '{}'",
                self.api_prefix
            )));
        }

        for (name, path) in [
            ("files_path", &self.files_path),
            ("upload_path", &self.upload_path),
            ("settings_path", &self.settings_path),
            ("channel_path", &self.channel_path),
        ] {
            if !path.starts_with('/') {
                return Err(Error::Config(format!(
                    "{} must start with '/', got '{}'",
                    name, path
                )));
            }
        }

        if self.request_timeout.is_zero() {
            return Err(Error::Config(
                "Request timeout must be greater than zero".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn http_client_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "HttpClient implementation is required for snapshot fetches and uploads. \
                 Desktop: ensure the 'desktop-shims' feature is enabled to use the default ReqwestHttpClient. \
                 Other hosts: inject a platform-native HTTP adapter."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client(timeout: Duration) -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::with_timeout(timeout));
    Ok(client)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client(_timeout: Duration) -> Result<Arc<dyn HttpClient>> {
    Err(http_client_missing_error())
}

#[cfg(feature = "desktop-shims")]
fn provide_default_channel_opener() -> Option<Arc<dyn ChannelOpener>> {
    use bridge_desktop::WebSocketChannelOpener;

    Some(Arc::new(WebSocketChannelOpener::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_channel_opener() -> Option<Arc<dyn ChannelOpener>> {
    None
}

/// Builder for constructing [`ClientConfig`] instances.
#[derive(Default)]
pub struct ClientConfigBuilder {
    base_url: Option<String>,
    api_prefix: Option<String>,
    files_path: Option<String>,
    upload_path: Option<String>,
    settings_path: Option<String>,
    channel_path: Option<String>,
    request_timeout: Option<Duration>,
    event_buffer_size: Option<usize>,
    http_client: Option<Arc<dyn HttpClient>>,
    channel_opener: Option<Arc<dyn ChannelOpener>>,
    live_updates: Option<bool>,
}

impl ClientConfigBuilder {
    /// Sets the server origin. A trailing slash is removed.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.base_url = Some(url.trim_end_matches('/').to_string());
        self
    }

    /// Sets the API prefix. Default: `/api`
    pub fn api_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.api_prefix = Some(prefix.into());
        self
    }

    /// Default: `/files`
    pub fn files_path(mut self, path: impl Into<String>) -> Self {
        self.files_path = Some(path.into());
        self
    }

    /// Default: `/upload`
    pub fn upload_path(mut self, path: impl Into<String>) -> Self {
        self.upload_path = Some(path.into());
        self
    }

    /// Default: `/config`
    pub fn settings_path(mut self, path: impl Into<String>) -> Self {
        self.settings_path = Some(path.into());
        self
    }

    /// Default: `/ws`
    pub fn channel_path(mut self, path: impl Into<String>) -> Self {
        self.channel_path = Some(path.into());
        self
    }

    /// Default: 30 seconds
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Default: 100 events
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Sets the HTTP client implementation.
    ///
    /// If not provided, the desktop default (reqwest-based) will be used when
    /// the `desktop-shims` feature is enabled.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the channel opener implementation.
    ///
    /// If not provided, the desktop default (WebSocket) will be used when the
    /// `desktop-shims` feature is enabled; otherwise live updates are off.
    pub fn channel_opener(mut self, opener: Arc<dyn ChannelOpener>) -> Self {
        self.channel_opener = Some(opener);
        self
    }

    /// Disables the change stream even when a channel opener is available.
    pub fn live_updates(mut self, enabled: bool) -> Self {
        self.live_updates = Some(enabled);
        self
    }

    /// Builds the final `ClientConfig` instance.
    ///
    /// # Errors
    ///
    /// - the base URL is missing
    /// - no `HttpClient` was injected and no platform default exists
    /// - any value fails [`ClientConfig::validate`]
    pub fn build(self) -> Result<ClientConfig> {
        let base_url = self.base_url.ok_or_else(|| {
            Error::Config("Base URL is required. Use .base_url() to set it.".to_string())
        })?;

        let request_timeout = self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT);

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client(request_timeout)?,
        };

        let channel_opener = if self.live_updates.unwrap_or(true) {
            self.channel_opener.or_else(provide_default_channel_opener)
        } else {
            None
        };

        let config = ClientConfig {
            base_url,
            api_prefix: self
                .api_prefix
                .unwrap_or_else(|| DEFAULT_API_PREFIX.to_string()),
            files_path: self
                .files_path
                .unwrap_or_else(|| DEFAULT_FILES_PATH.to_string()),
            upload_path: self
                .upload_path
                .unwrap_or_else(|| DEFAULT_UPLOAD_PATH.to_string()),
            settings_path: self
                .settings_path
                .unwrap_or_else(|| DEFAULT_SETTINGS_PATH.to_string()),
            channel_path: self
                .channel_path
                .unwrap_or_else(|| DEFAULT_CHANNEL_PATH.to_string()),
            request_timeout,
            event_buffer_size: self
                .event_buffer_size
                .unwrap_or(crate::events::DEFAULT_EVENT_BUFFER_SIZE),
            http_client,
            channel_opener,
        };

        config.validate()?;

        Ok(config)
    }
}
