//! Small utilities shared by the engine backends.
mod sql_errors;

pub use sql_errors::is_lock_conflict;
