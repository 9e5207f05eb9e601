use std::fmt::Display;

use dropship_engine::{
    db_types::{ItemRef, LedgerEntry, Money, Order, OrderStatusType},
    traits::WithdrawalDecision,
    wallet_objects::BalanceAudit,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }
}

//--------------------------------------        Requests       ---------------------------------------------------------

/// Body for adding to, or changing the quantity of, a cart line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLineParams {
    pub product_id: i64,
    #[serde(default)]
    pub variant_id: Option<i64>,
    pub quantity: i64,
}

impl CartLineParams {
    pub fn item(&self) -> ItemRef {
        ItemRef { product_id: self.product_id, variant_id: self.variant_id }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItemParams {
    pub product_id: i64,
    #[serde(default)]
    pub variant_id: Option<i64>,
}

impl CartItemParams {
    pub fn item(&self) -> ItemRef {
        ItemRef { product_id: self.product_id, variant_id: self.variant_id }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopUpParams {
    pub amount: Money,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipOrderParams {
    pub tracking_ref: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalParams {
    pub amount: Money,
    pub bank_details: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalAction {
    Approve,
    Reject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessWithdrawalParams {
    pub action: WithdrawalAction,
    #[serde(default)]
    pub rejection_reason: Option<String>,
}

impl ProcessWithdrawalParams {
    /// A missing reason becomes an empty one, which the wallet API rejects.
    pub fn decision(self) -> WithdrawalDecision {
        match self.action {
            WithdrawalAction::Approve => WithdrawalDecision::Approve,
            WithdrawalAction::Reject => WithdrawalDecision::Reject { reason: self.rejection_reason.unwrap_or_default() },
        }
    }
}

//--------------------------------------       Responses       ---------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub user_id: i64,
    pub balance: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentResponse {
    pub order_id: i64,
    pub status: OrderStatusType,
}

impl From<&Order> for PaymentResponse {
    fn from(order: &Order) -> Self {
        Self { order_id: order.id, status: order.status }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub order: Order,
    pub payouts: Vec<LedgerEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditResponse {
    #[serde(flatten)]
    pub audit: BalanceAudit,
    pub consistent: bool,
}

impl From<BalanceAudit> for AuditResponse {
    fn from(audit: BalanceAudit) -> Self {
        let consistent = audit.is_consistent();
        Self { audit, consistent }
    }
}
