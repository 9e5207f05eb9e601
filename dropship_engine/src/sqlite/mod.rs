//! SQLite backend for the dropship engine.
//!
//! [`SqliteDatabase`] implements every backend trait. The low-level queries live in [`db`], and the schema in
//! `migrations/`, which is embedded into the binary and applied by [`SqliteDatabase::migrate`].
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
