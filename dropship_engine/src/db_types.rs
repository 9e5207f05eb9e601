use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
pub use dropship_common::Money;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid conversion: {0}")]
pub struct ConversionError(String);

//--------------------------------------        ItemRef        ---------------------------------------------------------
/// Identifies a purchasable item: a base product, or one of its variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemRef {
    pub product_id: i64,
    pub variant_id: Option<i64>,
}

impl ItemRef {
    pub fn product(product_id: i64) -> Self {
        Self { product_id, variant_id: None }
    }

    pub fn variant(product_id: i64, variant_id: i64) -> Self {
        Self { product_id, variant_id: Some(variant_id) }
    }
}

impl Display for ItemRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.variant_id {
            Some(v) => write!(f, "product #{} (variant #{v})", self.product_id),
            None => write!(f, "product #{}", self.product_id),
        }
    }
}

//--------------------------------------     ProductStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    Draft,
    Active,
    Archived,
}

impl Display for ProductStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProductStatus::Draft => write!(f, "draft"),
            ProductStatus::Active => write!(f, "active"),
            ProductStatus::Archived => write!(f, "archived"),
        }
    }
}

//--------------------------------------      NewProduct       ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub supplier_id: i64,
    pub name: String,
    pub sku: String,
    pub price: Money,
    pub stock_quantity: i64,
    pub status: ProductStatus,
}

impl NewProduct {
    pub fn new<S: Into<String>>(supplier_id: i64, name: S, price: Money, stock_quantity: i64) -> Self {
        let name = name.into();
        let sku = format!("SKU-{}-{}", supplier_id, name.to_ascii_uppercase().replace(' ', "-"));
        Self { supplier_id, name, sku, price, stock_quantity, status: ProductStatus::Active }
    }

    pub fn with_sku<S: Into<String>>(mut self, sku: S) -> Self {
        self.sku = sku.into();
        self
    }

    pub fn with_status(mut self, status: ProductStatus) -> Self {
        self.status = status;
        self
    }
}

#[derive(Debug, Clone)]
pub struct NewVariant {
    pub product_id: i64,
    pub sku: String,
    pub name: String,
    pub price: Money,
    pub stock_quantity: i64,
}

//--------------------------------------      StockLevel       ---------------------------------------------------------
/// Price and availability of an item as read by the stock guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockLevel {
    pub item: ItemRef,
    pub price: Money,
    pub available: i64,
    pub sellable: bool,
}

impl StockLevel {
    /// The quantity that can actually be sold right now.
    pub fn sellable_quantity(&self) -> i64 {
        if self.sellable {
            self.available
        } else {
            0
        }
    }
}

//--------------------------------------       CartLine        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct CartLine {
    pub id: i64,
    pub cart_id: i64,
    pub product_id: i64,
    pub variant_id: Option<i64>,
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CartLine {
    pub fn item(&self) -> ItemRef {
        ItemRef { product_id: self.product_id, variant_id: self.variant_id }
    }
}

/// A cart line joined with the *current* catalog data. This is a display view, not a price snapshot.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct CartLineView {
    pub product_id: i64,
    pub variant_id: Option<i64>,
    pub name: String,
    pub variant_name: Option<String>,
    pub sku: String,
    pub price: Money,
    pub stock_quantity: i64,
    pub quantity: i64,
}

impl CartLineView {
    pub fn item(&self) -> ItemRef {
        ItemRef { product_id: self.product_id, variant_id: self.variant_id }
    }

    /// The line priced from the catalog. Saturates rather than overflowing, since this is only ever displayed.
    pub fn line_total(&self) -> Money {
        self.price.saturating_mul(self.quantity)
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatusType {
    /// The order was placed, but the buyer could not cover it. No stock or money has moved.
    OnHold,
    /// The order has been paid for and stock has been reserved.
    Processing,
    /// The supplier has dispatched the order.
    Shipped,
    /// The buyer (or the timeout) acknowledged receipt. Suppliers have been paid out.
    Completed,
    /// An on-hold order that was never paid.
    Cancelled,
}

impl OrderStatusType {
    /// Whether the order machine permits moving from `self` to `next`.
    pub fn can_transition_to(&self, next: OrderStatusType) -> bool {
        use OrderStatusType::*;
        matches!(
            (self, next),
            (OnHold, Processing) | (OnHold, Cancelled) | (Processing, Shipped) | (Shipped, Completed)
        )
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::OnHold => write!(f, "on-hold"),
            OrderStatusType::Processing => write!(f, "processing"),
            OrderStatusType::Shipped => write!(f, "shipped"),
            OrderStatusType::Completed => write!(f, "completed"),
            OrderStatusType::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "on-hold" => Ok(Self::OnHold),
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------        Order          ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub status: OrderStatusType,
    /// Frozen at checkout. Later catalog price changes never touch it.
    pub total: Money,
    pub tracking_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------      OrderLine        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub variant_id: Option<i64>,
    pub quantity: i64,
    pub unit_price: Money,
    pub created_at: DateTime<Utc>,
}

impl OrderLine {
    pub fn item(&self) -> ItemRef {
        ItemRef { product_id: self.product_id, variant_id: self.variant_id }
    }
}

/// An order line, priced under the stock lock, waiting to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderLine {
    pub item: ItemRef,
    pub quantity: i64,
    pub unit_price: Money,
}

impl NewOrderLine {
    /// `None` if the total does not fit in a [`Money`].
    pub fn line_total(&self) -> Option<Money> {
        self.unit_price.checked_mul(self.quantity)
    }
}

/// An order line together with the product name and SKU, for order detail views.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct OrderLineDetail {
    pub id: i64,
    pub product_id: i64,
    pub variant_id: Option<i64>,
    pub name: String,
    pub sku: String,
    pub quantity: i64,
    pub unit_price: Money,
}

//--------------------------------------      LedgerKind       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LedgerKind {
    Topup,
    OrderPayment,
    Withdrawal,
    Refund,
    Payout,
}

impl LedgerKind {
    pub fn is_debit(&self) -> bool {
        matches!(self, LedgerKind::OrderPayment | LedgerKind::Withdrawal)
    }

    /// Debits are always stored as negative amounts and credits as positive, whatever sign the caller used.
    ///
    /// Returns `None` for an amount with no positive counterpart (`i64::MIN` cents).
    pub fn normalize(&self, amount: Money) -> Option<Money> {
        let abs = amount.checked_abs()?;
        if self.is_debit() {
            Some(-abs)
        } else {
            Some(abs)
        }
    }
}

impl Display for LedgerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerKind::Topup => write!(f, "topup"),
            LedgerKind::OrderPayment => write!(f, "order_payment"),
            LedgerKind::Withdrawal => write!(f, "withdrawal"),
            LedgerKind::Refund => write!(f, "refund"),
            LedgerKind::Payout => write!(f, "payout"),
        }
    }
}

//--------------------------------------      LedgerEntry      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub user_id: i64,
    pub kind: LedgerKind,
    pub amount: Money,
    pub balance_after: Money,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------   WithdrawalStatus    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    Pending,
    Approved,
    Rejected,
}

impl Display for WithdrawalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WithdrawalStatus::Pending => write!(f, "pending"),
            WithdrawalStatus::Approved => write!(f, "approved"),
            WithdrawalStatus::Rejected => write!(f, "rejected"),
        }
    }
}

//--------------------------------------  WithdrawalRequest    ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    pub id: i64,
    pub user_id: i64,
    pub amount: Money,
    pub status: WithdrawalStatus,
    pub bank_details: String,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------         Role          ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Dropshipper,
    Supplier,
    Manager,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Dropshipper => write!(f, "dropshipper"),
            Role::Supplier => write!(f, "supplier"),
            Role::Manager => write!(f, "manager"),
        }
    }
}

impl FromStr for Role {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dropshipper" => Ok(Self::Dropshipper),
            "supplier" => Ok(Self::Supplier),
            "manager" => Ok(Self::Manager),
            s => Err(ConversionError(format!("Invalid role: {s}"))),
        }
    }
}
