//! HTTP handlers for the authenticated API surface. Auth endpoints live in
//! `crate::auth::handlers`.

pub mod analytics;
pub mod journal;
pub mod tasks;
pub mod user;
