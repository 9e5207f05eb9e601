use sqlx::Error as SqlxError;

// Primary result codes. Extended codes carry the primary code in the low byte.
const SQLITE_BUSY: i64 = 5;
const SQLITE_LOCKED: i64 = 6;

/// Returns true if the error means a lock could not be taken in time. These errors are safe to retry: the
/// transaction that hit them has been rolled back without side effects.
pub fn is_lock_conflict(err: &SqlxError) -> bool {
    match err {
        SqlxError::PoolTimedOut => true,
        SqlxError::Database(db_err) => db_err
            .code()
            .and_then(|code| code.parse::<i64>().ok())
            .map(|code| matches!(code & 0xff, SQLITE_BUSY | SQLITE_LOCKED))
            .unwrap_or(false),
        _ => false,
    }
}
