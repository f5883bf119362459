//! Access control over the object graph: the reader/writer scheduler and the
//! handles it issues.

pub mod handles;
pub mod scheduler;

pub use handles::{Reader, Writer};
pub use scheduler::{AccessGuard, AccessMode, AccessScheduler, SchedulerSnapshot};
