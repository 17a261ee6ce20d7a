pub mod analytics;
pub mod error;
pub mod job_schedulers;
pub mod notification;
pub mod outbox;
pub mod reminder;
pub mod shared;

pub use error::RemraError;
