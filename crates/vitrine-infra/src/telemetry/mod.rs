//! Tracing initialization
//!
//! One subscriber per process: an `EnvFilter` from `RUST_LOG` (falling back to
//! [`DEFAULT_LOG_FILTER`]) and either a human-readable or a JSON formatter.

mod init_basic;

pub use init_basic::{init_telemetry, shutdown_telemetry, LogFormat, DEFAULT_LOG_FILTER};
