//! Core types and utilities for unibio
//!
//! # Modules
//!
//! - `config`: Environment loading and the resolved `AppConfig`
//! - `error`: Error types and Result alias
//! - `types`: Tool call envelopes shared by the tool, model and chat crates

pub mod config;
pub mod error;
pub mod types;

// Re-exports
pub use config::{AppConfig, DispatchBackend};
pub use error::{Error, Result};
pub use types::*;
