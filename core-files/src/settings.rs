//! # Server Settings
//!
//! Reads and updates the conversion server's runtime options.

use std::sync::Arc;
use std::time::Duration;

use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, RetryPolicy};
use core_runtime::config::ClientConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::busy::{BusyRegistry, SETTINGS_UPDATE_KEY};
use crate::error::{FilesError, Result};
use crate::request::{decode_body, send};

/// Current server options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerSettings {
    /// Convert new files as soon as they appear
    #[serde(default)]
    pub auto_convert: bool,
    /// Remove the source once conversion completes
    #[serde(default)]
    pub delete_after: bool,
    /// Reconvert files whose output already exists
    #[serde(default, alias = "ignoreExisting")]
    pub overwrite_existing: bool,
}

/// Partial update; unset fields keep their server value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_convert: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete_after: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overwrite_existing: Option<bool>,
}

impl SettingsUpdate {
    pub fn auto_convert(mut self, enabled: bool) -> Self {
        self.auto_convert = Some(enabled);
        self
    }

    pub fn delete_after(mut self, enabled: bool) -> Self {
        self.delete_after = Some(enabled);
        self
    }

    pub fn overwrite_existing(mut self, enabled: bool) -> Self {
        self.overwrite_existing = Some(enabled);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.auto_convert.is_none() && self.delete_after.is_none() && self.overwrite_existing.is_none()
    }
}

impl From<ServerSettings> for SettingsUpdate {
    fn from(settings: ServerSettings) -> Self {
        Self {
            auto_convert: Some(settings.auto_convert),
            delete_after: Some(settings.delete_after),
            overwrite_existing: Some(settings.overwrite_existing),
        }
    }
}

pub struct SettingsClient {
    http: Arc<dyn HttpClient>,
    url: String,
    timeout: Duration,
    busy: Arc<BusyRegistry>,
}

impl SettingsClient {
    pub fn new(
        http: Arc<dyn HttpClient>,
        url: impl Into<String>,
        timeout: Duration,
        busy: Arc<BusyRegistry>,
    ) -> Self {
        Self {
            http,
            url: url.into(),
            timeout,
            busy,
        }
    }

    pub fn from_config(config: &ClientConfig, busy: Arc<BusyRegistry>) -> Self {
        Self::new(
            config.http_client.clone(),
            config.api_url(&config.settings_path),
            config.request_timeout,
            busy,
        )
    }

    #[instrument(skip(self), fields(url = %self.url))]
    pub async fn get_config(&self) -> Result<ServerSettings> {
        const OPERATION: &str = "get settings";

        let request = HttpRequest::new(HttpMethod::Get, &self.url)
            .header("Accept", "application/json")
            .timeout(self.timeout);
        let response = send(self.http.as_ref(), request, RetryPolicy::default(), OPERATION).await?;
        decode_body(&response, OPERATION)
    }

    /// Save `update`, holding [`SETTINGS_UPDATE_KEY`] while the request runs.
    #[instrument(skip(self, update), fields(url = %self.url))]
    pub async fn update_config(&self, update: &SettingsUpdate) -> Result<()> {
        const OPERATION: &str = "update settings";

        if update.is_empty() {
            debug!("No settings to update");
            return Ok(());
        }

        let _busy = self.busy.acquire(SETTINGS_UPDATE_KEY);

        let request = HttpRequest::new(HttpMethod::Post, &self.url)
            .timeout(self.timeout)
            .json(update)
            .map_err(|e| FilesError::transport(OPERATION, e))?;
        send(self.http.as_ref(), request, RetryPolicy::no_retry(), OPERATION).await?;

        debug!(?update, "Settings updated");
        Ok(())
    }
}
