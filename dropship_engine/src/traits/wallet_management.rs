use thiserror::Error;

use crate::{
    db_types::{LedgerEntry, Money, WithdrawalRequest, WithdrawalStatus},
    helpers::is_lock_conflict,
    traits::WithdrawalDecision,
};

#[derive(Debug, Clone, Error)]
pub enum WalletApiError {
    #[error("Amount must be positive, not {0}")]
    InvalidAmount(Money),
    #[error("Amount {amount} is more than the limit of {limit}")]
    AmountTooLarge { amount: Money, limit: Money },
    #[error("Amount out of range. {0}")]
    AmountOverflow(String),
    #[error("Bank details are required to withdraw funds")]
    MissingBankDetails,
    #[error("A reason is required to reject a withdrawal")]
    MissingRejectionReason,
    #[error("Insufficient funds: {required} is required, but only {available} is available")]
    InsufficientFunds { required: Money, available: Money },
    #[error("Withdrawal request #{0} does not exist")]
    WithdrawalNotFound(i64),
    #[error("Withdrawal request #{id} has already been {status}")]
    WithdrawalAlreadyProcessed { id: i64, status: WithdrawalStatus },
    #[error("Ledger for user #{user_id} is inconsistent. Latest balance is {snapshot}, but entries sum to {replayed}")]
    BalanceMismatch { user_id: i64, snapshot: Money, replayed: Money },
    #[error("The wallet is busy. Try again: {0}")]
    Conflict(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for WalletApiError {
    fn from(e: sqlx::Error) -> Self {
        if is_lock_conflict(&e) {
            WalletApiError::Conflict(e.to_string())
        } else {
            WalletApiError::DatabaseError(e.to_string())
        }
    }
}

/// Ledger-backed wallet behaviour.
///
/// A wallet has no stored balance. The balance is the `balance_after` of the user's most recent ledger entry, and zero
/// if there are none. Entries are never updated or deleted; mistakes are corrected with compensating entries.
#[allow(async_fn_in_trait)]
pub trait WalletManagement {
    /// The current balance for the user, read without taking the wallet lock.
    async fn fetch_balance(&self, user_id: i64) -> Result<Money, WalletApiError>;

    /// The sum of every ledger amount for the user. In a consistent ledger this always equals [`Self::fetch_balance`].
    async fn fetch_ledger_sum(&self, user_id: i64) -> Result<Money, WalletApiError>;

    /// The user's ledger history, newest first.
    async fn fetch_ledger_entries(&self, user_id: i64) -> Result<Vec<LedgerEntry>, WalletApiError>;

    /// Credits the user's wallet with a `topup` entry.
    async fn top_up(&self, user_id: i64, amount: Money, note: &str) -> Result<LedgerEntry, WalletApiError>;

    /// Creates a pending withdrawal request and debits the funds from the wallet in the same transaction.
    ///
    /// Fails with [`WalletApiError::InsufficientFunds`] if the locked balance does not cover `amount`.
    async fn request_withdrawal(
        &self,
        user_id: i64,
        amount: Money,
        bank_details: &str,
    ) -> Result<WithdrawalRequest, WalletApiError>;

    /// The most recent `limit` withdrawal requests made by the user, newest first.
    async fn fetch_withdrawals_for_user(&self, user_id: i64, limit: i64)
        -> Result<Vec<WithdrawalRequest>, WalletApiError>;

    /// All pending withdrawal requests, oldest first.
    async fn fetch_pending_withdrawals(&self) -> Result<Vec<WithdrawalRequest>, WalletApiError>;

    /// Approves or rejects a pending request. Rejection refunds the amount to the requester's wallet.
    async fn process_withdrawal(
        &self,
        request_id: i64,
        decision: WithdrawalDecision,
    ) -> Result<WithdrawalRequest, WalletApiError>;

    /// Earnings from orders that have shipped but not completed yet. These will be paid out on completion.
    async fn fetch_pending_earnings(&self, supplier_id: i64) -> Result<Money, WalletApiError>;
}
