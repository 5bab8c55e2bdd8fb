//! Persistent Channel Abstraction
//!
//! A duplex, server-push channel (a WebSocket on desktop and in the browser).
//! The core only reads from it: every inbound text frame is handed over as-is
//! and decoded at the core's boundary.
//!
//! Opening a channel has three outcomes:
//! - `Ok(Some(handle))` - connected
//! - `Ok(None)` - the platform has no channel capability; callers run in
//!   snapshot-only mode
//! - `Err(_)` - the capability exists but the connection failed

use async_trait::async_trait;

use crate::error::Result;

/// An inbound frame as received from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// UTF-8 text frame, expected to hold one JSON document
    Text(String),
    /// Binary frame; the core treats these as undecodable
    Binary(Vec<u8>),
}

/// Opens persistent channels to the server.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::channel::ChannelOpener;
///
/// async fn connect(opener: &dyn ChannelOpener) -> Result<()> {
///     match opener.open("ws://localhost:8080/ws").await? {
///         Some(mut handle) => {
///             while let Some(frame) = handle.next_frame().await {
///                 println!("{:?}", frame?);
///             }
///         }
///         None => println!("live updates disabled"),
///     }
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait ChannelOpener: Send + Sync {
    /// Open a channel to `url`.
    ///
    /// Returns `Ok(None)` when the platform cannot open channels at all.
    async fn open(&self, url: &str) -> Result<Option<Box<dyn ChannelHandle>>>;
}

/// An open channel.
#[async_trait]
pub trait ChannelHandle: Send {
    /// Wait for the next inbound frame.
    ///
    /// Returns `None` once the channel is closed. A transport error on a
    /// single frame is returned as `Some(Err(_))`; the channel may still
    /// deliver further frames afterwards.
    async fn next_frame(&mut self) -> Option<Result<Frame>>;

    /// Close the channel. Closing an already closed channel is a no-op.
    async fn close(&mut self) -> Result<()>;
}

/// Channel opener for platforms without channel support.
#[derive(Debug, Clone, Default)]
pub struct UnsupportedChannelOpener;

#[async_trait]
impl ChannelOpener for UnsupportedChannelOpener {
    async fn open(&self, _url: &str) -> Result<Option<Box<dyn ChannelHandle>>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unsupported_opener_reports_absent_capability() {
        let opener = UnsupportedChannelOpener;
        let handle = opener.open("ws://localhost/ws").await.unwrap();
        assert!(handle.is_none());
    }
}
