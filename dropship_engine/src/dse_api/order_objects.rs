use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{Money, Order, OrderLineDetail, OrderStatusType};

//--------------------------------------   OrderQueryFilter    ---------------------------------------------------------
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderQueryFilter {
    pub user_id: Option<i64>,
    pub statuses: Vec<OrderStatusType>,
    pub created_before: Option<DateTime<Utc>>,
    pub updated_before: Option<DateTime<Utc>>,
}

impl OrderQueryFilter {
    pub fn with_user_id(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.statuses.push(status);
        self
    }

    pub fn created_before(mut self, before: DateTime<Utc>) -> Self {
        self.created_before = Some(before);
        self
    }

    pub fn updated_before(mut self, before: DateTime<Utc>) -> Self {
        self.updated_before = Some(before);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.user_id.is_none() &&
            self.statuses.is_empty() &&
            self.created_before.is_none() &&
            self.updated_before.is_none()
    }
}

impl Display for OrderQueryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            write!(f, "No filters.")?;
            return Ok(());
        }
        if let Some(user_id) = &self.user_id {
            write!(f, "user_id: {user_id}. ")?;
        }
        if !self.statuses.is_empty() {
            let statuses = self.statuses.iter().map(|s| s.to_string()).collect::<Vec<String>>().join(",");
            write!(f, "statuses: [{statuses}]. ")?;
        }
        if let Some(before) = &self.created_before {
            write!(f, "created before {before}. ")?;
        }
        if let Some(before) = &self.updated_before {
            write!(f, "updated before {before}. ")?;
        }
        Ok(())
    }
}

//--------------------------------------    CheckoutResult     ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutResult {
    pub order_id: i64,
    pub status: OrderStatusType,
    pub total: Money,
}

impl From<&Order> for CheckoutResult {
    fn from(order: &Order) -> Self {
        Self { order_id: order.id, status: order.status, total: order.total }
    }
}

//--------------------------------------     OrderDetail       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetail {
    pub order: Order,
    pub lines: Vec<OrderLineDetail>,
}

//--------------------------------------     ExpiryResult      ---------------------------------------------------------
/// The outcome of one sweep over overdue orders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiryResult {
    /// On-hold orders that passed their payment deadline and were cancelled.
    pub cancelled: Vec<Order>,
    /// Shipped orders that passed the acknowledgement deadline and were completed.
    pub completed: Vec<Order>,
    /// Orders that could not be processed this round. They will be retried on the next sweep.
    pub failures: usize,
}

impl ExpiryResult {
    pub fn is_empty(&self) -> bool {
        self.cancelled.is_empty() && self.completed.is_empty() && self.failures == 0
    }
}
