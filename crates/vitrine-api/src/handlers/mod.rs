pub mod health;
pub mod media;
pub mod reorder;
pub mod uploads;
