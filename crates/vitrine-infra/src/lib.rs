//! Vitrine Infrastructure Library
//!
//! Shared infrastructure for the Vitrine binaries:
//! - Middleware (request ID)
//! - Telemetry initialization
//! - HTTP error response shape

#[cfg(feature = "middleware")]
pub mod middleware;

#[cfg(feature = "observability-basic")]
pub mod telemetry;

pub mod error;

#[cfg(feature = "middleware")]
pub use middleware::{get_request_id, request_id_middleware, RequestId, REQUEST_ID_HEADER};

#[cfg(feature = "observability-basic")]
pub use telemetry::{init_telemetry, shutdown_telemetry, LogFormat, DEFAULT_LOG_FILTER};

pub use error::ErrorResponse;
