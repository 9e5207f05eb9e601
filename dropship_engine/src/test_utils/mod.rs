//! Helpers for tests that need a real database. Only compiled with the `test_utils` feature.
pub mod prepare_env;
pub mod seed;
