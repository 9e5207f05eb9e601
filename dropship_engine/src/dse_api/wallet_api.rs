//! Wallet balances, the ledger, top-ups and supplier withdrawals.
use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{LedgerEntry, Money, WithdrawalRequest},
    dse_api::wallet_objects::{BalanceAudit, SupplierWallet, WalletStatement},
    traits::{WalletApiError, WalletManagement, WithdrawalDecision},
};

/// How many recent withdrawal requests the supplier wallet view includes.
pub const RECENT_WITHDRAWALS: i64 = 20;

/// The largest single top-up, 1,000,000.00.
pub const MAX_TOP_UP: Money = Money::from_cents(100_000_000);

#[derive(Clone)]
pub struct WalletApi<B> {
    db: B,
}

impl<B: Debug> Debug for WalletApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WalletApi ({:?})", self.db)
    }
}

impl<B> WalletApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> WalletApi<B>
where B: WalletManagement
{
    /// The user's current balance. Users without any ledger history have a balance of zero.
    pub async fn balance(&self, user_id: i64) -> Result<Money, WalletApiError> {
        self.db.fetch_balance(user_id).await
    }

    /// The balance together with the full ledger history, newest first.
    pub async fn statement(&self, user_id: i64) -> Result<WalletStatement, WalletApiError> {
        let entries = self.db.fetch_ledger_entries(user_id).await?;
        let balance = entries.first().map(|e| e.balance_after).unwrap_or_default();
        Ok(WalletStatement { user_id, balance, entries })
    }

    pub async fn top_up(&self, user_id: i64, amount: Money, note: Option<&str>) -> Result<LedgerEntry, WalletApiError> {
        if !amount.is_positive() {
            return Err(WalletApiError::InvalidAmount(amount));
        }
        if amount > MAX_TOP_UP {
            return Err(WalletApiError::AmountTooLarge { amount, limit: MAX_TOP_UP });
        }
        let note = note.map(str::trim).filter(|n| !n.is_empty()).unwrap_or("Manual top-up");
        let entry = self.db.top_up(user_id, amount, note).await?;
        info!("💰️ User #{user_id} topped up {amount}");
        Ok(entry)
    }

    /// Compares the balance snapshot with a full replay of the ledger.
    pub async fn audit(&self, user_id: i64) -> Result<BalanceAudit, WalletApiError> {
        let snapshot = self.db.fetch_balance(user_id).await?;
        let replayed = self.db.fetch_ledger_sum(user_id).await?;
        Ok(BalanceAudit { user_id, snapshot, replayed })
    }

    /// Like [`Self::audit`], but a mismatch is an error.
    pub async fn verify_balance(&self, user_id: i64) -> Result<Money, WalletApiError> {
        let audit = self.audit(user_id).await?;
        if audit.is_consistent() {
            Ok(audit.snapshot)
        } else {
            error!(
                "💰️ Balance for user #{user_id} does not match its ledger. Snapshot: {}, replayed: {}",
                audit.snapshot, audit.replayed
            );
            Err(WalletApiError::BalanceMismatch { user_id, snapshot: audit.snapshot, replayed: audit.replayed })
        }
    }

    pub async fn supplier_wallet(&self, supplier_id: i64) -> Result<SupplierWallet, WalletApiError> {
        let available = self.db.fetch_balance(supplier_id).await?;
        let pending = self.db.fetch_pending_earnings(supplier_id).await?;
        let withdrawals = self.db.fetch_withdrawals_for_user(supplier_id, RECENT_WITHDRAWALS).await?;
        Ok(SupplierWallet { available, pending, withdrawals })
    }

    /// Requests a payout to the supplier's bank account. The amount leaves the available balance immediately, and is
    /// refunded if the request is rejected.
    pub async fn request_withdrawal(
        &self,
        supplier_id: i64,
        amount: Money,
        bank_details: &str,
    ) -> Result<WithdrawalRequest, WalletApiError> {
        if !amount.is_positive() {
            return Err(WalletApiError::InvalidAmount(amount));
        }
        let bank_details = bank_details.trim();
        if bank_details.is_empty() {
            return Err(WalletApiError::MissingBankDetails);
        }
        let request = self.db.request_withdrawal(supplier_id, amount, bank_details).await?;
        info!("💰️ Supplier #{supplier_id} requested a withdrawal of {amount}. Request #{}", request.id);
        Ok(request)
    }

    /// Pending withdrawal requests, oldest first.
    pub async fn pending_withdrawals(&self) -> Result<Vec<WithdrawalRequest>, WalletApiError> {
        self.db.fetch_pending_withdrawals().await
    }

    pub async fn process_withdrawal(
        &self,
        request_id: i64,
        decision: WithdrawalDecision,
    ) -> Result<WithdrawalRequest, WalletApiError> {
        let decision = match decision {
            WithdrawalDecision::Reject { reason } => {
                let reason = reason.trim();
                if reason.is_empty() {
                    return Err(WalletApiError::MissingRejectionReason);
                }
                WithdrawalDecision::Reject { reason: reason.to_string() }
            },
            approve => approve,
        };
        let request = self.db.process_withdrawal(request_id, decision).await?;
        info!("💰️ Withdrawal request #{request_id} for {} has been {}", request.amount, request.status);
        Ok(request)
    }
}
