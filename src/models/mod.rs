//! Data models for the team recruitment backend.
//!
//! Persisted entities plus the request/response shapes the API exchanges.

mod announcement;
mod member;
mod team;

pub use announcement::*;
pub use member::*;
pub use team::*;
