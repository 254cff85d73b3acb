//! Paydesk Core Library
//!
//! Domain models, error types and configuration shared by every Paydesk
//! crate.

pub mod config;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::{BaseConfig, Config, ProviderDefaults};
pub use error::{AppError, ErrorMetadata, LogLevel};
