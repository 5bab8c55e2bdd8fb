//! # Change Stream
//!
//! Keeps one persistent channel open and feeds every decoded frame into a
//! [`ChangeHandler`], normally the [`FileStore`](crate::store::FileStore).
//!
//! ## Flow
//!
//! 1. [`ChangeStreamClient::connect`] opens the channel. A platform without
//!    channel support yields `Ok(None)` and the caller stays snapshot-only.
//! 2. A background task reads frames in arrival order and applies each one
//!    before reading the next.
//! 3. Frames that do not decode are logged and skipped; the stream keeps
//!    running.
//! 4. The task ends when the server closes the channel or the returned
//!    [`ChangeStream`] is shut down or dropped.

use std::sync::Arc;

use bridge_traits::channel::{ChannelHandle, ChannelOpener, Frame};
use core_runtime::config::ClientConfig;
use core_runtime::events::{ChannelEvent, CoreEvent, EventBus};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{FilesError, Result};
use crate::message::ChangeMessage;
use crate::store::FileStore;

/// Receives decoded change messages in arrival order.
pub trait ChangeHandler: Send + Sync {
    fn handle_change(&self, message: Option<ChangeMessage>);
}

impl ChangeHandler for FileStore {
    fn handle_change(&self, message: Option<ChangeMessage>) {
        self.apply_change(message);
    }
}

pub struct ChangeStreamClient {
    opener: Arc<dyn ChannelOpener>,
    url: String,
    events: Option<EventBus>,
}

impl ChangeStreamClient {
    pub fn new(opener: Arc<dyn ChannelOpener>, url: impl Into<String>) -> Self {
        Self {
            opener,
            url: url.into(),
            events: None,
        }
    }

    /// Client for the configured channel, or `None` when live updates are
    /// disabled.
    pub fn from_config(config: &ClientConfig) -> Option<Self> {
        config
            .channel_opener
            .as_ref()
            .map(|opener| Self::new(opener.clone(), config.channel_url()))
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Open the channel and start applying frames to `handler`.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn connect(&self, handler: Arc<dyn ChangeHandler>) -> Result<Option<ChangeStream>> {
        let handle = match self.opener.open(&self.url).await {
            Ok(Some(handle)) => handle,
            Ok(None) => {
                info!(url = %self.url, "Live updates not supported on this platform");
                emit(
                    &self.events,
                    ChannelEvent::Unavailable {
                        reason: "channel capability missing".to_string(),
                    },
                );
                return Ok(None);
            }
            Err(e) => {
                warn!(url = %self.url, error = %e, "Failed to open change stream");
                emit(
                    &self.events,
                    ChannelEvent::Unavailable {
                        reason: e.to_string(),
                    },
                );
                return Err(FilesError::transport("open change stream", e));
            }
        };

        info!(url = %self.url, "Change stream connected");
        emit(&self.events, ChannelEvent::Connected);

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(pump(handle, handler, shutdown_rx, self.events.clone()));

        Ok(Some(ChangeStream {
            task,
            shutdown: Some(shutdown_tx),
        }))
    }
}

/// A running change stream. Dropping it closes the channel.
#[derive(Debug)]
pub struct ChangeStream {
    task: JoinHandle<()>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl ChangeStream {
    /// True once the channel has closed, from either side.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Close the channel and wait for the reader task to stop.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Err(e) = (&mut self.task).await {
            warn!(error = %e, "Change stream task ended abnormally");
        }
    }

    /// Wait until the server closes the channel.
    pub async fn closed(mut self) {
        if let Err(e) = (&mut self.task).await {
            warn!(error = %e, "Change stream task ended abnormally");
        }
    }
}

async fn pump(
    mut handle: Box<dyn ChannelHandle>,
    handler: Arc<dyn ChangeHandler>,
    mut shutdown: oneshot::Receiver<()>,
    events: Option<EventBus>,
) {
    loop {
        let next = tokio::select! {
            _ = &mut shutdown => None,
            frame = handle.next_frame() => Some(frame),
        };

        match next {
            None => {
                debug!("Closing change stream");
                if let Err(e) = handle.close().await {
                    debug!(error = %e, "Error while closing change stream");
                }
                break;
            }
            Some(None) => {
                info!("Change stream closed by server");
                break;
            }
            Some(Some(Err(e))) => {
                warn!(error = %e, "Change stream read error");
            }
            Some(Some(Ok(frame))) => match decode(frame) {
                Ok(message) => handler.handle_change(message),
                Err(e) => {
                    warn!(error = %e, "Dropping malformed change frame");
                    emit(
                        &events,
                        ChannelEvent::FrameDropped {
                            reason: e.to_string(),
                        },
                    );
                }
            },
        }
    }

    emit(&events, ChannelEvent::Closed);
}

fn decode(frame: Frame) -> Result<Option<ChangeMessage>> {
    match frame {
        Frame::Text(text) => ChangeMessage::decode(&text),
        Frame::Binary(bytes) => Err(FilesError::decode(format!(
            "unexpected binary frame ({} bytes)",
            bytes.len()
        ))),
    }
}

fn emit(events: &Option<EventBus>, event: ChannelEvent) {
    if let Some(events) = events {
        let _ = events.emit(CoreEvent::Channel(event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::channel::UnsupportedChannelOpener;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    struct QueueHandle {
        frames: mpsc::UnboundedReceiver<BridgeResult<Frame>>,
    }

    #[async_trait]
    impl ChannelHandle for QueueHandle {
        async fn next_frame(&mut self) -> Option<BridgeResult<Frame>> {
            self.frames.recv().await
        }

        async fn close(&mut self) -> BridgeResult<()> {
            self.frames.close();
            Ok(())
        }
    }

    struct QueueOpener {
        handle: Mutex<Option<QueueHandle>>,
    }

    #[async_trait]
    impl ChannelOpener for QueueOpener {
        async fn open(&self, _url: &str) -> BridgeResult<Option<Box<dyn ChannelHandle>>> {
            let handle = self.handle.lock().unwrap().take();
            Ok(handle.map(|h| Box::new(h) as Box<dyn ChannelHandle>))
        }
    }

    struct FailingOpener;

    #[async_trait]
    impl ChannelOpener for FailingOpener {
        async fn open(&self, _url: &str) -> BridgeResult<Option<Box<dyn ChannelHandle>>> {
            Err(BridgeError::OperationFailed("connection refused".into()))
        }
    }

    fn queue() -> (mpsc::UnboundedSender<BridgeResult<Frame>>, Arc<QueueOpener>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let opener = QueueOpener {
            handle: Mutex::new(Some(QueueHandle { frames: rx })),
        };
        (tx, Arc::new(opener))
    }

    fn text(value: serde_json::Value) -> BridgeResult<Frame> {
        Ok(Frame::Text(value.to_string()))
    }

    #[tokio::test]
    async fn test_frames_applied_in_order() {
        let (tx, opener) = queue();
        let store = Arc::new(FileStore::new());
        let client = ChangeStreamClient::new(opener, "ws://localhost/ws");

        let stream = client.connect(store.clone()).await.unwrap().unwrap();

        tx.send(text(serde_json::json!({
            "type": "create_file",
            "data": { "a": { "id": "a", "filePath": "/a.mkv", "progress": 0 } }
        })))
        .unwrap();
        tx.send(text(serde_json::json!({
            "type": "update_file",
            "data": { "a": { "id": "a", "filePath": "/a.mkv", "status": "processing", "progress": 50 } }
        })))
        .unwrap();
        drop(tx);

        stream.closed().await;

        let all = store.get_all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].progress, 50.0);
    }

    #[tokio::test]
    async fn test_malformed_frame_does_not_stop_stream() {
        let (tx, opener) = queue();
        let store = Arc::new(FileStore::new());
        let events = EventBus::new(16);
        let mut rx = events.subscribe();
        let client = ChangeStreamClient::new(opener, "ws://localhost/ws").with_events(events);

        let stream = client.connect(store.clone()).await.unwrap().unwrap();

        tx.send(Ok(Frame::Text("{not json".to_string()))).unwrap();
        tx.send(Ok(Frame::Binary(vec![1, 2, 3]))).unwrap();
        tx.send(Err(BridgeError::ChannelClosed("reset".into()))).unwrap();
        tx.send(text(serde_json::json!({
            "type": "create_file",
            "data": [{ "id": "b", "filePath": "/b.mkv" }]
        })))
        .unwrap();
        drop(tx);

        stream.closed().await;

        assert_eq!(store.get_all().len(), 1);
        assert_eq!(rx.recv().await.unwrap(), CoreEvent::Channel(ChannelEvent::Connected));
        assert!(matches!(
            rx.recv().await.unwrap(),
            CoreEvent::Channel(ChannelEvent::FrameDropped { .. })
        ));
        assert!(matches!(
            rx.recv().await.unwrap(),
            CoreEvent::Channel(ChannelEvent::FrameDropped { .. })
        ));
        assert_eq!(rx.recv().await.unwrap(), CoreEvent::Channel(ChannelEvent::Closed));
    }

    #[tokio::test]
    async fn test_unsupported_platform_is_snapshot_only() {
        let client = ChangeStreamClient::new(Arc::new(UnsupportedChannelOpener), "ws://localhost/ws");
        let store = Arc::new(FileStore::new());

        assert!(client.connect(store).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_open_failure_is_transport_error() {
        let client = ChangeStreamClient::new(Arc::new(FailingOpener), "ws://localhost/ws");
        let store = Arc::new(FileStore::new());

        let err = client.connect(store).await.unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_shutdown_stops_reader() {
        let (tx, opener) = queue();
        let store = Arc::new(FileStore::new());
        let client = ChangeStreamClient::new(opener, "ws://localhost/ws");

        let stream = client.connect(store).await.unwrap().unwrap();
        assert!(!stream.is_finished());

        stream.shutdown().await;
        assert!(tx.is_closed());
    }
}
