//! Background jobs run as tokio tasks within the backend process.

pub mod rollover;

pub use rollover::start_rollover_task;
