//! WebSocket channel implementation using tokio-tungstenite

use async_trait::async_trait;
use bridge_traits::{
    channel::{ChannelHandle, ChannelOpener, Frame},
    error::{BridgeError, Result},
};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How long `close` waits for the peer to answer the close frame.
const CLOSE_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(1);

/// Opens WebSocket connections.
///
/// Desktop always has the capability, so `open` never returns `Ok(None)`.
#[derive(Debug, Clone, Default)]
pub struct WebSocketChannelOpener;

impl WebSocketChannelOpener {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ChannelOpener for WebSocketChannelOpener {
    async fn open(&self, url: &str) -> Result<Option<Box<dyn ChannelHandle>>> {
        debug!(url = %url, "Opening WebSocket");

        let (socket, response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("WebSocket connect failed: {}", e)))?;

        info!(url = %url, status = response.status().as_u16(), "WebSocket connected");

        Ok(Some(Box::new(WebSocketHandle {
            socket,
            closed: false,
        })))
    }
}

struct WebSocketHandle {
    socket: Socket,
    closed: bool,
}

#[async_trait]
impl ChannelHandle for WebSocketHandle {
    async fn next_frame(&mut self) -> Option<Result<Frame>> {
        if self.closed {
            return None;
        }

        loop {
            match self.socket.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(Frame::Text(text))),
                Ok(Message::Binary(data)) => return Some(Ok(Frame::Binary(data))),
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "WebSocket closed by server");
                    self.closed = true;
                    return None;
                }
                // Pings are answered by tungstenite on the next read/write.
                Ok(_) => continue,
                Err(e) => {
                    return Some(Err(BridgeError::ChannelClosed(e.to_string())));
                }
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.socket
            .close(None)
            .await
            .or_else(|e| match e {
                tokio_tungstenite::tungstenite::Error::ConnectionClosed
                | tokio_tungstenite::tungstenite::Error::AlreadyClosed => Ok(()),
                other => Err(BridgeError::ChannelClosed(other.to_string())),
            })?;
        let drain = async { while let Some(Ok(_)) = self.socket.next().await {} };
        if tokio::time::timeout(CLOSE_HANDSHAKE_TIMEOUT, drain).await.is_err() {
            warn!("Peer did not finish the close handshake, dropping socket");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_open_fails_without_server() {
        let opener = WebSocketChannelOpener::new();
        let result = opener.open("ws://127.0.0.1:9/ws").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_receives_text_frames_until_close() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            ws.send(Message::Text(r#"{"type":"refresh_files","data":{}}"#.to_string()))
                .await
                .unwrap();
            ws.send(Message::Binary(vec![1, 2, 3])).await.unwrap();
            ws.close(None).await.unwrap();
        });

        let opener = WebSocketChannelOpener::new();
        let mut handle = opener
            .open(&format!("ws://{}/ws", addr))
            .await
            .unwrap()
            .expect("desktop always supports channels");

        let first = handle.next_frame().await.unwrap().unwrap();
        assert_eq!(
            first,
            Frame::Text(r#"{"type":"refresh_files","data":{}}"#.to_string())
        );

        let second = handle.next_frame().await.unwrap().unwrap();
        assert_eq!(second, Frame::Binary(vec![1, 2, 3]));

        assert!(handle.next_frame().await.is_none());
        handle.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_close_gives_up_on_silent_peer() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let _ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            // Never read, so the close frame is never answered
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let opener = WebSocketChannelOpener::new();
        let mut handle = opener
            .open(&format!("ws://{}/ws", addr))
            .await
            .unwrap()
            .expect("desktop always supports channels");

        let closed = tokio::time::timeout(Duration::from_secs(5), handle.close()).await;
        assert!(closed.expect("close should not hang").is_ok());
        assert!(handle.next_frame().await.is_none());
    }
}
