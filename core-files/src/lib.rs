//! # Core Files Module
//!
//! Client-side state for a media-conversion server: a reconciled, sorted
//! collection of conversion jobs kept current from a one-shot snapshot plus
//! a stream of pushed change messages.
//!
//! ## Overview
//!
//! - [`FileStore`] - the reconciliation engine (snapshot replace, upserts
//!   and deletes by id, sorted reads)
//! - [`ChangeStreamClient`] - applies pushed frames to the store in order
//! - [`SnapshotFetcher`] - reads the full list over HTTP
//! - [`UploadOrchestrator`] - multipart uploads bracketed by a busy token
//! - [`BusyRegistry`] - in-flight operation tokens for the UI
//! - [`SettingsClient`] - server conversion options
//! - [`FilesSession`] - wires all of the above for one server
//!
//! ## Usage
//!
//! ```ignore
//! use core_files::FilesSession;
//! use core_runtime::config::ClientConfig;
//!
//! let config = ClientConfig::builder()
//!     .base_url("http://localhost:8080")
//!     .build()?;
//! let session = FilesSession::new(&config);
//!
//! let report = session.activate().await;
//! for file in session.files() {
//!     println!("{} {} {:.0}%", file.file_path, file.status, file.progress);
//! }
//! ```

pub mod busy;
pub mod collation;
pub mod error;
pub mod message;
pub mod models;
mod request;
pub mod session;
pub mod settings;
pub mod snapshot;
pub mod store;
pub mod stream;
pub mod upload;

pub use busy::{BusyGuard, BusyRegistry, FILES_FETCH_KEY, MEDIA_UPLOAD_KEY, SETTINGS_UPDATE_KEY};
pub use error::{FilesError, Result};
pub use message::{ChangeKind, ChangeMessage};
pub use models::{FileStatus, MediaFile};
pub use session::{ActivationReport, FilesSession};
pub use settings::{ServerSettings, SettingsClient, SettingsUpdate};
pub use snapshot::SnapshotFetcher;
pub use store::FileStore;
pub use stream::{ChangeHandler, ChangeStream, ChangeStreamClient};
pub use upload::{UploadFile, UploadOrchestrator, UploadResult};
