use log::trace;
use sqlx::SqliteConnection;

use crate::db_types::{Money, WithdrawalRequest, WithdrawalStatus};

pub async fn insert_request(
    user_id: i64,
    amount: Money,
    bank_details: &str,
    conn: &mut SqliteConnection,
) -> Result<WithdrawalRequest, sqlx::Error> {
    let request: WithdrawalRequest = sqlx::query_as(
        "INSERT INTO withdrawal_requests (user_id, amount, bank_details) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(user_id)
    .bind(amount)
    .bind(bank_details)
    .fetch_one(conn)
    .await?;
    trace!("🏦️ Withdrawal request #{} for {amount} created by user #{user_id}", request.id);
    Ok(request)
}

/// Locks the request row and returns it as it is under the lock.
pub async fn lock_request(id: i64, conn: &mut SqliteConnection) -> Result<Option<WithdrawalRequest>, sqlx::Error> {
    let request = sqlx::query_as("UPDATE withdrawal_requests SET updated_at = updated_at WHERE id = $1 RETURNING *")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(request)
}

pub async fn update_status(
    id: i64,
    status: WithdrawalStatus,
    rejection_reason: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<WithdrawalRequest, sqlx::Error> {
    let request = sqlx::query_as(
        "UPDATE withdrawal_requests SET status = $1, rejection_reason = $2, updated_at = CURRENT_TIMESTAMP WHERE id = \
         $3 RETURNING *",
    )
    .bind(status)
    .bind(rejection_reason)
    .bind(id)
    .fetch_one(conn)
    .await?;
    trace!("🏦️ Withdrawal request #{id} is now {status}");
    Ok(request)
}

/// The most recent requests made by the user, newest first.
pub async fn fetch_for_user(
    user_id: i64,
    limit: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<WithdrawalRequest>, sqlx::Error> {
    let requests = sqlx::query_as("SELECT * FROM withdrawal_requests WHERE user_id = $1 ORDER BY id DESC LIMIT $2")
        .bind(user_id)
        .bind(limit)
        .fetch_all(conn)
        .await?;
    Ok(requests)
}

/// All pending requests, oldest first.
pub async fn fetch_pending(conn: &mut SqliteConnection) -> Result<Vec<WithdrawalRequest>, sqlx::Error> {
    let requests = sqlx::query_as("SELECT * FROM withdrawal_requests WHERE status = $1 ORDER BY id ASC")
        .bind(WithdrawalStatus::Pending)
        .fetch_all(conn)
        .await?;
    Ok(requests)
}
