use serde::{Deserialize, Serialize};

use crate::db_types::{LedgerEntry, Money, WithdrawalRequest};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletStatement {
    pub user_id: i64,
    pub balance: Money,
    pub entries: Vec<LedgerEntry>,
}

/// A supplier's view of their earnings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierWallet {
    /// Spendable now. This is the ledger balance.
    pub available: Money,
    /// Earned on shipped orders, payable once those orders complete.
    pub pending: Money,
    pub withdrawals: Vec<WithdrawalRequest>,
}

/// The two ways of computing a balance, side by side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceAudit {
    pub user_id: i64,
    pub snapshot: Money,
    pub replayed: Money,
}

impl BalanceAudit {
    pub fn is_consistent(&self) -> bool {
        self.snapshot == self.replayed
    }
}
