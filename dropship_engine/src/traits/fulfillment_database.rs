use thiserror::Error;

use crate::{
    db_types::{ItemRef, LedgerEntry, Money, Order, OrderStatusType},
    helpers::is_lock_conflict,
    traits::{AccountApiError, OrderManagement},
};

#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("The cart is empty")]
    EmptyCart,
    #[error("Insufficient stock for {item}: requested {requested}, available {available}")]
    InsufficientStock { item: ItemRef, requested: i64, available: i64 },
    #[error("{item} is out of stock: requested {requested}, available {available}")]
    OutOfStock { item: ItemRef, requested: i64, available: i64 },
    #[error("Insufficient funds: {required} is required, but only {available} is available")]
    InsufficientFunds { required: Money, available: Money },
    #[error("Order #{0} does not exist")]
    OrderNotFound(i64),
    #[error("Order #{order_id} is {status}, so this action is not allowed")]
    InvalidState { order_id: i64, status: OrderStatusType },
    #[error("A tracking reference is required to ship an order")]
    MissingTrackingRef,
    #[error("Amount out of range. {0}")]
    AmountOverflow(String),
    #[error("The order is busy. Try again: {0}")]
    Conflict(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for OrderFlowError {
    fn from(e: sqlx::Error) -> Self {
        if is_lock_conflict(&e) {
            OrderFlowError::Conflict(e.to_string())
        } else {
            OrderFlowError::DatabaseError(e.to_string())
        }
    }
}

impl From<AccountApiError> for OrderFlowError {
    fn from(e: AccountApiError) -> Self {
        match e {
            AccountApiError::OrderNotFound(id) => OrderFlowError::OrderNotFound(id),
            AccountApiError::Conflict(s) => OrderFlowError::Conflict(s),
            AccountApiError::QueryError(s) | AccountApiError::DatabaseError(s) => OrderFlowError::DatabaseError(s),
        }
    }
}

/// This trait defines the highest level of behaviour for backends supporting the dropship engine.
///
/// Every method is one atomic unit of work: it either commits all of its effects (order rows, stock decrements,
/// ledger entries, cart clearing) or none of them.
///
/// The order state machine enforced by implementations is:
///
/// | From         | To           | Trigger                                  |
/// |--------------|--------------|------------------------------------------|
/// | (new)        | `processing` | checkout with sufficient funds           |
/// | (new)        | `on-hold`    | checkout with insufficient funds         |
/// | `on-hold`    | `processing` | [`Self::pay_on_hold_order`]              |
/// | `on-hold`    | `cancelled`  | [`Self::cancel_on_hold_order`] (sweeper) |
/// | `processing` | `shipped`    | [`Self::ship_order`]                     |
/// | `shipped`    | `completed`  | [`Self::complete_order`]                 |
///
/// Each transition locks the order row and re-reads its status under that lock before acting, so every transition
/// happens at most once no matter how many callers race for it.
#[allow(async_fn_in_trait)]
pub trait FulfillmentDatabase: Clone + OrderManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Converts the user's cart into an order, in a single transaction:
    /// * the buyer's wallet is locked, and the cart lines are read;
    /// * every line's stock row is locked and price and stock are read under that lock;
    /// * if any line is short, the whole checkout fails with [`OrderFlowError::InsufficientStock`];
    /// * if the balance covers the total, the order is `processing`, stock is decremented and an `order_payment`
    ///   entry of `-total` is appended;
    /// * otherwise the order is `on-hold` and neither stock nor the ledger is touched;
    /// * the cart is cleared.
    ///
    /// An empty cart fails with [`OrderFlowError::EmptyCart`] and changes nothing.
    async fn checkout(&self, user_id: i64) -> Result<Order, OrderFlowError>;

    /// Pays for an `on-hold` order using the order's frozen total.
    ///
    /// Stock for every line and then the wallet balance are re-checked under lock before anything is changed.
    /// On success stock is decremented, an `order_payment` entry is appended and the order moves to `processing`.
    async fn pay_on_hold_order(&self, user_id: i64, order_id: i64) -> Result<Order, OrderFlowError>;

    /// Marks a `processing` order as `shipped`. The supplier must supply at least one line of the order.
    async fn ship_order(&self, supplier_id: i64, order_id: i64, tracking_ref: &str) -> Result<Order, OrderFlowError>;

    /// Marks a `shipped` order as `completed` and pays every supplier in the order for their lines.
    ///
    /// If `buyer_id` is given, the order must belong to that user. The sweeper passes `None`.
    /// Returns the completed order and the `payout` entries that were written.
    async fn complete_order(
        &self,
        order_id: i64,
        buyer_id: Option<i64>,
    ) -> Result<(Order, Vec<LedgerEntry>), OrderFlowError>;

    /// Cancels an `on-hold` order. If the order is no longer on hold (e.g. it was paid a moment ago), nothing happens
    /// and `None` is returned.
    async fn cancel_on_hold_order(&self, order_id: i64) -> Result<Option<Order>, OrderFlowError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), OrderFlowError>;
}
