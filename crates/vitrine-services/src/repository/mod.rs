//! Persistence seams for the services.
//!
//! Only in-memory implementations ship; the traits are the boundary a database
//! backed implementation would plug into.

pub mod positions;
pub mod uploads;

pub use positions::{InMemoryPositionRepository, PositionRepository};
pub use uploads::{
    InMemoryUploadRecordRepository, UploadRecord, UploadRecordRepository, UploadRecordStatus,
    COMPLETION_GRACE_SECS,
};
