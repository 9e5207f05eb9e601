use thiserror::Error;

use crate::{
    db_types::{Order, OrderLineDetail},
    dse_api::order_objects::OrderQueryFilter,
    helpers::is_lock_conflict,
};

#[derive(Debug, Clone, Error)]
pub enum AccountApiError {
    #[error("Order #{0} does not exist")]
    OrderNotFound(i64),
    #[error("User error constructing query: {0}")]
    QueryError(String),
    #[error("The database is busy. Try again: {0}")]
    Conflict(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for AccountApiError {
    fn from(e: sqlx::Error) -> Self {
        if is_lock_conflict(&e) {
            AccountApiError::Conflict(e.to_string())
        } else {
            AccountApiError::DatabaseError(e.to_string())
        }
    }
}

/// Read-only queries over orders.
///
/// Orders are only ever visible to the user that placed them. Methods that take a `user_id` treat an order owned by
/// somebody else exactly like an order that does not exist.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// All orders placed by the user, newest first.
    async fn fetch_orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, AccountApiError>;

    /// The order with the given id, if it exists and belongs to `user_id`.
    async fn fetch_order_for_user(&self, user_id: i64, order_id: i64) -> Result<Option<Order>, AccountApiError>;

    /// The frozen lines of the order, joined with the product name and SKU.
    async fn fetch_order_lines(&self, order_id: i64) -> Result<Vec<OrderLineDetail>, AccountApiError>;

    /// Fetches orders matching the filter, oldest first.
    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, AccountApiError>;
}
