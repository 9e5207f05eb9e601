//! Read-only access to a user's orders.

use std::fmt::Debug;

use log::trace;

use crate::{
    db_types::Order,
    dse_api::order_objects::{OrderDetail, OrderQueryFilter},
    traits::{AccountApiError, OrderManagement},
};

/// The `AccountApi` provides a unified API for looking up orders.
pub struct AccountApi<B> {
    db: B,
}

impl<B: Debug> Debug for AccountApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccountApi ({:?})", self.db)
    }
}

impl<B> AccountApi<B>
where B: OrderManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// All the user's orders, newest first.
    pub async fn orders(&self, user_id: i64) -> Result<Vec<Order>, AccountApiError> {
        self.db.fetch_orders_for_user(user_id).await
    }

    /// The order and its frozen lines. Orders belonging to other users are reported as not found.
    pub async fn order_detail(&self, user_id: i64, order_id: i64) -> Result<OrderDetail, AccountApiError> {
        let order =
            self.db.fetch_order_for_user(user_id, order_id).await?.ok_or(AccountApiError::OrderNotFound(order_id))?;
        let lines = self.db.fetch_order_lines(order_id).await?;
        trace!("Order #{order_id} has {} lines", lines.len());
        Ok(OrderDetail { order, lines })
    }

    pub async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, AccountApiError> {
        self.db.search_orders(query).await
    }
}
