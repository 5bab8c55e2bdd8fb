//! # Files Session
//!
//! Wires the store, busy registry and network clients for one logical
//! session against one server.
//!
//! ## Activation
//!
//! [`FilesSession::activate`] fetches the snapshot and opens the change
//! stream concurrently. The two are not ordered: whichever lands last
//! decides the state for any file both of them mention. The server sends a
//! full `refresh_files` message right after the channel opens, so a stale
//! snapshot is corrected by the stream.

use std::sync::Arc;

use core_runtime::config::ClientConfig;
use core_runtime::events::{ChannelEvent, CoreEvent, EventBus, EventStream};
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::busy::{BusyRegistry, FILES_FETCH_KEY};
use crate::error::{FilesError, Result};
use crate::models::MediaFile;
use crate::settings::SettingsClient;
use crate::snapshot::SnapshotFetcher;
use crate::store::FileStore;
use crate::stream::{ChangeHandler, ChangeStream, ChangeStreamClient};
use crate::upload::{UploadFile, UploadOrchestrator, UploadResult};

/// Outcome of [`FilesSession::activate`].
#[derive(Debug)]
pub struct ActivationReport {
    /// Number of files in the applied snapshot.
    pub snapshot: Result<usize>,
    /// `Ok(true)` when live updates are flowing, `Ok(false)` when the
    /// platform has no channel support.
    pub live_updates: Result<bool>,
}

impl ActivationReport {
    pub fn is_ok(&self) -> bool {
        self.snapshot.is_ok() && self.live_updates.is_ok()
    }
}

pub struct FilesSession {
    store: Arc<FileStore>,
    busy: Arc<BusyRegistry>,
    events: EventBus,
    fetcher: SnapshotFetcher,
    stream_client: Option<ChangeStreamClient>,
    stream: Mutex<Option<ChangeStream>>,
    uploader: UploadOrchestrator,
    settings: SettingsClient,
}

impl FilesSession {
    pub fn new(config: &ClientConfig) -> Self {
        let events = EventBus::new(config.event_buffer_size);
        let store = Arc::new(FileStore::with_events(events.clone()));
        let busy = Arc::new(BusyRegistry::with_events(events.clone()));

        Self {
            fetcher: SnapshotFetcher::from_config(config),
            stream_client: ChangeStreamClient::from_config(config)
                .map(|client| client.with_events(events.clone())),
            stream: Mutex::new(None),
            uploader: UploadOrchestrator::from_config(config, busy.clone()),
            settings: SettingsClient::from_config(config, busy.clone()),
            store,
            busy,
            events,
        }
    }

    pub fn store(&self) -> &Arc<FileStore> {
        &self.store
    }

    pub fn busy(&self) -> &Arc<BusyRegistry> {
        &self.busy
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// New subscriber for store, busy and channel notifications.
    pub fn subscribe(&self) -> EventStream {
        EventStream::new(self.events.subscribe())
    }

    pub fn settings(&self) -> &SettingsClient {
        &self.settings
    }

    /// Current collection, sorted by path.
    pub fn files(&self) -> Vec<MediaFile> {
        self.store.get_all()
    }

    /// Fetch the snapshot and start live updates at the same time.
    ///
    /// Neither failure stops the other half.
    #[instrument(skip(self))]
    pub async fn activate(&self) -> ActivationReport {
        let (snapshot, live_updates) = tokio::join!(self.refresh(), self.connect());

        if let Err(e) = &snapshot {
            warn!(error = %e, "Initial snapshot failed");
        }
        if let Err(e) = &live_updates {
            warn!(error = %e, "Live updates failed to start");
        }

        ActivationReport {
            snapshot,
            live_updates,
        }
    }

    /// Replace the collection with a fresh snapshot. Returns the file count.
    pub async fn refresh(&self) -> Result<usize> {
        let _busy = self.busy.acquire(FILES_FETCH_KEY);
        let files = self.fetcher.fetch().await?;
        self.store.apply_snapshot(files);
        Ok(self.store.len())
    }

    /// Open the change stream if it is not already running.
    ///
    /// A stream that was closed by the server may be reopened.
    pub async fn connect(&self) -> Result<bool> {
        let Some(client) = &self.stream_client else {
            info!("Live updates disabled");
            let _ = self.events.emit(CoreEvent::Channel(ChannelEvent::Unavailable {
                reason: "live updates disabled".to_string(),
            }));
            return Ok(false);
        };

        let mut slot = self.stream.lock().await;
        if slot.as_ref().is_some_and(|stream| !stream.is_finished()) {
            return Err(FilesError::AlreadyConnected);
        }

        let store: Arc<dyn ChangeHandler> = self.store.clone();
        match client.connect(store).await? {
            Some(stream) => {
                *slot = Some(stream);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn is_live(&self) -> bool {
        self.stream
            .lock()
            .await
            .as_ref()
            .is_some_and(|stream| !stream.is_finished())
    }

    pub async fn upload(&self, files: Vec<UploadFile>) -> Result<UploadResult> {
        self.uploader.upload(files).await
    }

    /// Close the change stream. The store keeps its last state.
    pub async fn shutdown(&self) {
        if let Some(stream) = self.stream.lock().await.take() {
            stream.shutdown().await;
        }
    }
}
