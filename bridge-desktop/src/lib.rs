//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest`
//! - `ChannelOpener` using `tokio-tungstenite` WebSockets
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{ReqwestHttpClient, WebSocketChannelOpener};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let http_client = Arc::new(ReqwestHttpClient::new());
//!     let channel_opener = Arc::new(WebSocketChannelOpener::new());
//!
//!     // Use in client configuration
//! }
//! ```

mod channel;
mod http;

pub use channel::WebSocketChannelOpener;
pub use http::ReqwestHttpClient;
