use serde::{Deserialize, Serialize};

/// A manager's verdict on a pending withdrawal request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum WithdrawalDecision {
    Approve,
    Reject { reason: String },
}
