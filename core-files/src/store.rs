//! # File Store
//!
//! The reconciliation engine: a single-writer collection of files keyed by
//! id, kept in collation order of `file_path`.
//!
//! ## Overview
//!
//! The store accepts two kinds of input:
//! - a full snapshot, which replaces the collection outright
//! - incremental change messages, applied as upserts or deletes by id
//!
//! The path order is maintained incrementally: an entry is re-placed only
//! when its path changes, so progress updates never re-sort the collection.
//! Readers always see a collection sorted by path with at most one entry
//! per id. Readers get an
//! owned copy and never observe a half-applied message.
//!
//! ## Usage
//!
//! ```ignore
//! use core_files::{ChangeMessage, FileStore, MediaFile};
//!
//! let store = FileStore::new();
//! store.apply_snapshot(vec![MediaFile::new("a", "/in/a.mkv")]);
//! store.apply_change(ChangeMessage::Delete(vec!["a".into()]));
//! assert!(store.get_all().is_empty());
//! ```

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use core_runtime::events::{CoreEvent, EventBus, FilesEvent};
use core_runtime::logging::strip_path;
use tracing::{debug, instrument};

use crate::collation::compare;
use crate::message::ChangeMessage;
use crate::models::MediaFile;

/// Sort position of one file.
#[derive(Debug, Clone)]
struct OrderKey {
    path: String,
    id: String,
}

impl OrderKey {
    fn of(file: &MediaFile) -> Self {
        Self {
            path: file.file_path.clone(),
            id: file.id.clone(),
        }
    }

    fn cmp_to(&self, path: &str, id: &str) -> Ordering {
        compare(&self.path, path).then_with(|| self.id.as_str().cmp(id))
    }
}

#[derive(Default)]
struct StoreState {
    files: HashMap<String, MediaFile>,
    /// Sorted by path, then id. Only touched when a path appears, moves or
    /// disappears.
    order: Vec<OrderKey>,
}

impl StoreState {
    fn replace_all(&mut self, files: Vec<MediaFile>) {
        self.files = files
            .into_iter()
            .map(|file| (file.id.clone(), file))
            .collect();
        self.order = self.files.values().map(OrderKey::of).collect();
        self.order.sort_by(|a, b| a.cmp_to(&b.path, &b.id));
    }

    /// Insert or replace `file`. Returns whether its sort position changed.
    fn upsert(&mut self, file: MediaFile) -> bool {
        let moved = match self
            .files
            .get(&file.id)
            .map(|existing| existing.file_path != file.file_path)
        {
            Some(false) => false,
            Some(true) => {
                if let Some(previous) = self.files.remove(&file.id) {
                    self.unlink(&previous.file_path, &previous.id);
                }
                true
            }
            None => true,
        };

        if moved {
            let at = self
                .search(&file.file_path, &file.id)
                .unwrap_or_else(|at| at);
            self.order.insert(at, OrderKey::of(&file));
        }
        self.files.insert(file.id.clone(), file);
        moved
    }

    fn remove(&mut self, id: &str) {
        if let Some(file) = self.files.remove(id) {
            self.unlink(&file.file_path, id);
        }
    }

    fn unlink(&mut self, path: &str, id: &str) {
        if let Ok(at) = self.search(path, id) {
            self.order.remove(at);
        }
    }

    fn search(&self, path: &str, id: &str) -> std::result::Result<usize, usize> {
        self.order.binary_search_by(|key| key.cmp_to(path, id))
    }

    fn view(&self) -> Vec<MediaFile> {
        self.order
            .iter()
            .filter_map(|key| self.files.get(&key.id).cloned())
            .collect()
    }
}

/// Reconciled collection of conversion jobs.
pub struct FileStore {
    state: RwLock<StoreState>,
    events: Option<EventBus>,
}

impl FileStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            events: None,
        }
    }

    /// Store that reports every applied mutation on `events`.
    pub fn with_events(events: EventBus) -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            events: Some(events),
        }
    }

    /// Replace the whole collection with `files`.
    ///
    /// Files absent from the snapshot are dropped. If the snapshot repeats
    /// an id, the last occurrence wins.
    #[instrument(skip(self, files), fields(entries = files.len()))]
    pub fn apply_snapshot(&self, files: Vec<MediaFile>) {
        let count = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            state.replace_all(files);
            state.files.len()
        };

        debug!(count, "Snapshot applied");
        self.emit(FilesEvent::SnapshotApplied { count });
    }

    /// Apply one change message.
    ///
    /// `None` (a `null` frame) leaves the collection untouched. Upserts
    /// replace any entry with the same id wholesale; deletes of unknown ids
    /// are ignored.
    pub fn apply_change(&self, message: impl Into<Option<ChangeMessage>>) {
        let Some(message) = message.into() else {
            debug!("Ignoring empty change message");
            return;
        };

        let kind = message.kind();
        let entries = message.len();

        let count = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            match message {
                ChangeMessage::Create(files)
                | ChangeMessage::Update(files)
                | ChangeMessage::Refresh(files) => {
                    if let Some(first) = files.first() {
                        debug!(%kind, entries, path = %strip_path(&first.file_path), "Upserting files");
                    }
                    for file in files {
                        state.upsert(file);
                    }
                }
                ChangeMessage::Delete(ids) => {
                    debug!(%kind, entries, "Removing files");
                    for id in &ids {
                        state.remove(id);
                    }
                }
            }
            state.files.len()
        };

        self.emit(FilesEvent::ChangeApplied {
            kind: kind.wire_name().to_string(),
            entries,
            count,
        });
    }

    /// Current collection, sorted by path.
    pub fn get_all(&self) -> Vec<MediaFile> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .view()
    }

    pub fn get(&self, id: &str) -> Option<MediaFile> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .files
            .get(id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .files
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn emit(&self, event: FilesEvent) {
        if let Some(events) = &self.events {
            // No subscribers is not an error
            let _ = events.emit(CoreEvent::Files(event));
        }
    }
}

impl Default for FileStore {
    fn default() -> Self {
        Self::new()
    }
}
