//! Workspace placeholder crate.
//!
//! Host applications can depend on `blockbuffer-workspace` and pick features
//! here instead of wiring `core-service`, `core-files` and the bridge crates
//! individually. With `desktop-shims` enabled the service façade is
//! re-exported together with its reqwest and WebSocket adapters.

#[cfg(feature = "desktop-shims")]
pub use core_service;
