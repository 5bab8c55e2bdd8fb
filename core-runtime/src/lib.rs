//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the file-tracking client:
//! - Logging and tracing infrastructure
//! - Client configuration
//! - Event bus system
//!
//! ## Overview
//!
//! Every other core crate depends on this one for its logging conventions,
//! its view of the server endpoints and the broadcast channel used to tell
//! presentation code that something changed.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
