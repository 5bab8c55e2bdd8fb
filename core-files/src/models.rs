//! # File Models
//!
//! The conversion job ("file") as the server reports it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a conversion job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileStatus {
    #[default]
    New,
    Queued,
    Processing,
    Completed,
    CompletedDeleted,
    Cancelled,
    Rejected,
    Failed,
    Deleted,
    /// A status this client does not know yet
    #[serde(other)]
    Unknown,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::New => "new",
            FileStatus::Queued => "queued",
            FileStatus::Processing => "processing",
            FileStatus::Completed => "completed",
            FileStatus::CompletedDeleted => "completed-deleted",
            FileStatus::Cancelled => "cancelled",
            FileStatus::Rejected => "rejected",
            FileStatus::Failed => "failed",
            FileStatus::Deleted => "deleted",
            FileStatus::Unknown => "unknown",
        }
    }

    /// The server will not move the job any further.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            FileStatus::Completed
                | FileStatus::CompletedDeleted
                | FileStatus::Cancelled
                | FileStatus::Rejected
                | FileStatus::Failed
                | FileStatus::Deleted
        )
    }

    /// Waiting for or undergoing conversion.
    pub fn is_active(&self) -> bool {
        matches!(self, FileStatus::Queued | FileStatus::Processing)
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tracked media-conversion job.
///
/// `id` is the identity; every other field may change between updates and
/// is replaced wholesale when a newer version arrives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaFile {
    pub id: String,
    /// Display and sort key
    pub file_path: String,
    #[serde(default)]
    pub status: FileStatus,
    /// Conversion progress, 0-100
    #[serde(default)]
    pub progress: f64,
    /// Media duration in seconds, once probed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

impl MediaFile {
    pub fn new(id: impl Into<String>, file_path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            file_path: file_path.into(),
            status: FileStatus::New,
            progress: 0.0,
            duration: None,
        }
    }

    pub fn with_status(mut self, status: FileStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_progress(mut self, progress: f64) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration = Some(seconds);
        self
    }
}
