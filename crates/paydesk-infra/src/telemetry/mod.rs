//! Tracing initialization
//!
//! Log output goes through `tracing-subscriber` with an `EnvFilter`
//! (`RUST_LOG` wins over the default directive).

mod init_basic;

pub use init_basic::{init_telemetry, shutdown_telemetry, TelemetryFormat, DEFAULT_FILTER};
