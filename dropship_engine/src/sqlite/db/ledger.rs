use log::{trace, warn};
use sqlx::{Sqlite, SqliteConnection, Transaction};
use thiserror::Error;

use crate::{
    db_types::{LedgerEntry, LedgerKind, Money},
    traits::{OrderFlowError, WalletApiError},
};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("A {kind} of {amount} would take the balance of user #{user_id} out of range")]
    Overflow { user_id: i64, kind: LedgerKind, amount: Money },
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl From<LedgerError> for OrderFlowError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::Overflow { .. } => OrderFlowError::AmountOverflow(e.to_string()),
            LedgerError::Database(e) => e.into(),
        }
    }
}

impl From<LedgerError> for WalletApiError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::Overflow { .. } => WalletApiError::AmountOverflow(e.to_string()),
            LedgerError::Database(e) => e.into(),
        }
    }
}

/// Proof that the current transaction holds the write lock for a user's wallet, along with the balance as it was read
/// under that lock.
///
/// The only way to get one is [`lock_wallet`], and [`record_movement`] requires one, so every ledger append is
/// computed from a fresh, locked balance.
#[derive(Debug)]
pub struct WalletLock {
    user_id: i64,
    balance: Money,
}

impl WalletLock {
    /// The balance under lock, including any movements recorded through this lock.
    pub fn balance(&self) -> Money {
        self.balance
    }

    pub fn covers(&self, amount: Money) -> bool {
        self.balance >= amount
    }
}

/// Takes the wallet lock for `user_id` and reads the balance under it.
pub async fn lock_wallet(user_id: i64, tx: &mut Transaction<'_, Sqlite>) -> Result<WalletLock, sqlx::Error> {
    sqlx::query(
        "INSERT INTO wallets (user_id) VALUES ($1) ON CONFLICT (user_id) DO UPDATE SET locked_at = CURRENT_TIMESTAMP",
    )
    .bind(user_id)
    .execute(&mut **tx)
    .await?;
    let balance = fetch_balance(user_id, &mut **tx).await?;
    trace!("💰️ Wallet for user #{user_id} locked. Balance is {balance}");
    Ok(WalletLock { user_id, balance })
}

/// Appends a ledger entry for the locked wallet.
///
/// `order_payment` and `withdrawal` amounts are stored as negative values; all other kinds as positive, regardless of
/// the sign that was passed in. Solvency is *not* checked here. That is the caller's decision.
///
/// Fails with [`LedgerError::Overflow`] if the new balance cannot be represented. Nothing is written in that case.
pub async fn record_movement(
    lock: &mut WalletLock,
    kind: LedgerKind,
    amount: Money,
    note: &str,
    tx: &mut Transaction<'_, Sqlite>,
) -> Result<LedgerEntry, LedgerError> {
    let user_id = lock.user_id;
    let (amount, balance_after) = kind
        .normalize(amount)
        .and_then(|amount| lock.balance.checked_add(amount).map(|balance| (amount, balance)))
        .ok_or_else(|| {
            warn!("💰️ A {kind} of {amount} for user #{user_id} would overflow a balance of {}", lock.balance);
            LedgerError::Overflow { user_id, kind, amount }
        })?;
    let entry: LedgerEntry = sqlx::query_as(
        r#"
            INSERT INTO ledger_entries (user_id, kind, amount, balance_after, note)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(lock.user_id)
    .bind(kind)
    .bind(amount)
    .bind(balance_after)
    .bind(note)
    .fetch_one(&mut **tx)
    .await?;
    lock.balance = balance_after;
    trace!("💰️ Ledger entry #{} for user #{}: {kind} {amount}. Balance is now {balance_after}", entry.id, lock.user_id);
    Ok(entry)
}

/// The `balance_after` of the user's latest ledger entry, or zero.
///
/// Inside a transaction this is only safe to act on after [`lock_wallet`]. Use [`WalletLock::balance`] instead.
pub async fn fetch_balance(user_id: i64, conn: &mut SqliteConnection) -> Result<Money, sqlx::Error> {
    let balance: Option<Money> =
        sqlx::query_scalar("SELECT balance_after FROM ledger_entries WHERE user_id = $1 ORDER BY id DESC LIMIT 1")
            .bind(user_id)
            .fetch_optional(conn)
            .await?;
    Ok(balance.unwrap_or_default())
}

/// The balance obtained by replaying every ledger amount for the user.
pub async fn ledger_sum(user_id: i64, conn: &mut SqliteConnection) -> Result<Money, sqlx::Error> {
    let sum: i64 = sqlx::query_scalar("SELECT COALESCE(SUM(amount), 0) FROM ledger_entries WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(conn)
        .await?;
    Ok(Money::from(sum))
}

/// All ledger entries for the user, newest first.
pub async fn fetch_entries(user_id: i64, conn: &mut SqliteConnection) -> Result<Vec<LedgerEntry>, sqlx::Error> {
    let entries = sqlx::query_as("SELECT * FROM ledger_entries WHERE user_id = $1 ORDER BY id DESC")
        .bind(user_id)
        .fetch_all(conn)
        .await?;
    Ok(entries)
}
