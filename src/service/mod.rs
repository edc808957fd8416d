//! Business rules on top of the repository traits.
//!
//! Services hold `Arc<dyn ...Repository>` so the same code runs against
//! SQLite in production and the in-memory store in tests.

mod announcement;
mod auth;
mod team;

pub use announcement::*;
pub use auth::*;
pub use team::*;

use std::sync::Arc;

use chrono::{DateTime, Utc};

/// Source of the current time, injectable for tests.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}
