//! Business logic extracted from HTTP handlers for testability and reuse.

pub mod analytics;
pub mod journal;
pub mod tasks;
