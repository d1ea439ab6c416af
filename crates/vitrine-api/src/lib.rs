//! Vitrine API Library
//!
//! HTTP surface of the upload pipeline: presigned upload targets, the
//! storage completion webhook and bulk reorders.

mod handlers;

pub mod constants;
pub mod error;
pub mod setup;
pub mod state;

pub use error::HttpAppError;
pub use state::AppState;
pub use vitrine_infra::ErrorResponse;
