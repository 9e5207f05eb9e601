use thiserror::Error;

use crate::{
    db_types::{CartLine, CartLineView, ItemRef},
    helpers::is_lock_conflict,
};

#[derive(Debug, Clone, Error)]
pub enum CartApiError {
    #[error("Quantity must be a positive number, not {0}")]
    InvalidQuantity(i64),
    #[error("{0} does not exist or is not for sale")]
    ItemNotFound(ItemRef),
    #[error("Insufficient stock for {item}: requested {requested}, available {available}")]
    InsufficientStock { item: ItemRef, requested: i64, available: i64 },
    #[error("{0} is not in the cart")]
    LineNotFound(ItemRef),
    #[error("The cart is busy. Try again: {0}")]
    Conflict(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for CartApiError {
    fn from(e: sqlx::Error) -> Self {
        if is_lock_conflict(&e) {
            CartApiError::Conflict(e.to_string())
        } else {
            CartApiError::DatabaseError(e.to_string())
        }
    }
}

/// Per-user shopping cart behaviour.
///
/// Carts never touch stock counters or the ledger. Stock is validated when lines are added or changed so that users
/// get early feedback, but the authoritative check happens again under lock at checkout.
#[allow(async_fn_in_trait)]
pub trait CartManagement {
    /// Adds `quantity` of the item to the user's cart, creating the cart if necessary. If the item is already in the
    /// cart, the quantities accumulate. The accumulated quantity must be covered by current stock.
    async fn add_to_cart(&self, user_id: i64, item: ItemRef, quantity: i64) -> Result<CartLine, CartApiError>;

    /// The user's cart lines joined with current catalog name, price and stock, in insertion order.
    async fn fetch_cart(&self, user_id: i64) -> Result<Vec<CartLineView>, CartApiError>;

    /// Replaces the quantity of an existing line. A quantity of zero removes the line, and `None` is returned.
    async fn set_cart_quantity(
        &self,
        user_id: i64,
        item: ItemRef,
        quantity: i64,
    ) -> Result<Option<CartLine>, CartApiError>;

    /// Removes the line for `item`. Returns `false` if there was nothing to remove.
    async fn remove_from_cart(&self, user_id: i64, item: ItemRef) -> Result<bool, CartApiError>;
}
