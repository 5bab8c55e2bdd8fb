//! # Busy Registry
//!
//! Set of string tokens naming operations that are in flight, queried by
//! presentation code to show spinners and disable actions.
//!
//! Tokens have set semantics: starting a token twice and ending it once
//! leaves it idle. Callers that can overlap should use distinct tokens.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use core_runtime::events::{BusyEvent, CoreEvent, EventBus};
use tracing::trace;

/// Held while a file upload is in flight.
pub const MEDIA_UPLOAD_KEY: &str = "media-upload";

/// Held while a snapshot is being fetched.
pub const FILES_FETCH_KEY: &str = "files-fetch";

/// Held while server settings are being saved.
pub const SETTINGS_UPDATE_KEY: &str = "settings-update";

pub struct BusyRegistry {
    tokens: Mutex<HashSet<String>>,
    events: Option<EventBus>,
}

impl BusyRegistry {
    pub fn new() -> Self {
        Self {
            tokens: Mutex::new(HashSet::new()),
            events: None,
        }
    }

    /// Registry that reports token transitions on `events`.
    pub fn with_events(events: EventBus) -> Self {
        Self {
            tokens: Mutex::new(HashSet::new()),
            events: Some(events),
        }
    }

    /// Mark `token` busy. Already-busy tokens stay busy.
    pub fn start(&self, token: &str) {
        let inserted = self
            .tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token.to_string());

        if inserted {
            trace!(token, "Busy");
            self.emit(BusyEvent::Started {
                token: token.to_string(),
            });
        }
    }

    /// Mark `token` idle. Ending an idle token is a no-op.
    pub fn end(&self, token: &str) {
        let removed = self
            .tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(token);

        if removed {
            trace!(token, "Idle");
            self.emit(BusyEvent::Ended {
                token: token.to_string(),
            });
        }
    }

    pub fn is_busy(&self, token: &str) -> bool {
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(token)
    }

    /// True if any of `tokens` is busy. An empty list is never busy.
    pub fn is_any_busy<I, S>(&self, tokens: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let busy = self.tokens.lock().unwrap_or_else(PoisonError::into_inner);
        tokens.into_iter().any(|token| busy.contains(token.as_ref()))
    }

    /// Busy tokens, sorted.
    pub fn active(&self) -> Vec<String> {
        let mut tokens: Vec<String> = self
            .tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect();
        tokens.sort();
        tokens
    }

    /// Start `token` and end it when the returned guard drops, including on
    /// early return or error.
    pub fn acquire(&self, token: &str) -> BusyGuard<'_> {
        self.start(token);
        BusyGuard {
            registry: self,
            token: token.to_string(),
        }
    }

    fn emit(&self, event: BusyEvent) {
        if let Some(events) = &self.events {
            let _ = events.emit(CoreEvent::Busy(event));
        }
    }
}

impl Default for BusyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Ends its token on drop.
#[must_use = "the token is released as soon as the guard is dropped"]
pub struct BusyGuard<'a> {
    registry: &'a BusyRegistry,
    token: String,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.registry.end(&self.token);
    }
}
