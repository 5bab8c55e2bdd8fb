//! # Host Bridge Traits
//!
//! Collaborator contracts the file-tracking core consumes from its host.
//!
//! ## Overview
//!
//! The core never talks to the network or the logging backend directly. It
//! depends on the traits in this crate, and each host (desktop binary, browser
//! shell, test harness) injects implementations.
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - the request function used for the
//!   snapshot fetch, uploads and settings
//! - [`ChannelOpener`](channel::ChannelOpener) - opens the persistent push
//!   channel, or reports that the platform has none
//! - [`LoggerSink`](log::LoggerSink) - forwards structured logs to the host
//!
//! ## Capability absence
//!
//! A missing HTTP client is a configuration error and fails fast. A missing
//! channel capability is not: `ChannelOpener::open` returns `Ok(None)` and the
//! core keeps working from snapshots alone.
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should convert platform errors into it with an actionable message.
//!
//! ## Thread Safety
//!
//! Bridge traits require `Send + Sync` so implementations can be shared across
//! tokio tasks behind an `Arc`.

pub mod channel;
pub mod error;
pub mod http;
pub mod log;

pub use error::BridgeError;

pub use channel::{ChannelHandle, ChannelOpener, Frame, UnsupportedChannelOpener};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, MultipartForm, RetryPolicy};
pub use log::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
