use std::fmt::Debug;

use chrono::{Duration, Utc};
use log::*;

use crate::{
    db_types::{LedgerEntry, Order, OrderStatusType},
    dse_api::order_objects::{CheckoutResult, ExpiryResult, OrderQueryFilter},
    events::{EventProducers, OrderAnnulledEvent, OrderPaidEvent},
    traits::{FulfillmentDatabase, OrderFlowError},
};

/// `OrderFlowApi` is the primary API for moving orders through their lifecycle: checkout, deferred payment, shipping,
/// completion, and the periodic expiry of overdue orders.
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> OrderFlowApi<B>
where B: FulfillmentDatabase
{
    /// Converts the user's cart into an order.
    ///
    /// If the wallet covers the total, the order is paid immediately and is `processing`. Otherwise it is placed
    /// `on-hold` and can be paid later with [`Self::pay_order`]. Either way the cart is emptied.
    pub async fn checkout(&self, user_id: i64) -> Result<CheckoutResult, OrderFlowError> {
        let order = self.db.checkout(user_id).await?;
        info!("🔄️🛒️ User #{user_id} checked out order #{} for {}. It is {}", order.id, order.total, order.status);
        if order.status == OrderStatusType::Processing {
            self.call_order_paid_hook(&order).await;
        }
        Ok(CheckoutResult::from(&order))
    }

    /// Pays for an `on-hold` order out of the user's wallet.
    pub async fn pay_order(&self, user_id: i64, order_id: i64) -> Result<Order, OrderFlowError> {
        let order = self.db.pay_on_hold_order(user_id, order_id).await?;
        info!("🔄️💰️ User #{user_id} paid {} for order #{order_id}", order.total);
        self.call_order_paid_hook(&order).await;
        Ok(order)
    }

    pub async fn ship_order(&self, supplier_id: i64, order_id: i64, tracking_ref: &str) -> Result<Order, OrderFlowError> {
        let tracking_ref = tracking_ref.trim();
        if tracking_ref.is_empty() {
            return Err(OrderFlowError::MissingTrackingRef);
        }
        let order = self.db.ship_order(supplier_id, order_id, tracking_ref).await?;
        info!("🔄️🚚️ Supplier #{supplier_id} shipped order #{order_id} ({tracking_ref})");
        Ok(order)
    }

    /// The buyer acknowledges receipt of a shipped order. Suppliers are paid out.
    pub async fn complete_order(&self, user_id: i64, order_id: i64) -> Result<(Order, Vec<LedgerEntry>), OrderFlowError> {
        let (order, payouts) = self.db.complete_order(order_id, Some(user_id)).await?;
        info!("🔄️✅️ User #{user_id} completed order #{order_id}. {} suppliers paid", payouts.len());
        Ok((order, payouts))
    }

    /// Sweeps overdue orders:
    /// * `on-hold` orders created more than `hold_timeout` ago are cancelled;
    /// * if `auto_complete` is given, `shipped` orders that have not changed for that long are completed.
    ///
    /// Every order is handled in its own transaction. An order that fails is logged and counted, and the sweep moves
    /// on. Orders that changed state since they were found (e.g. a hold that was paid a moment ago) are skipped.
    pub async fn expire_overdue_orders(
        &self,
        hold_timeout: Duration,
        auto_complete: Option<Duration>,
    ) -> Result<ExpiryResult, OrderFlowError> {
        let mut result = ExpiryResult::default();
        let now = Utc::now();
        let query = OrderQueryFilter::default().with_status(OrderStatusType::OnHold).created_before(now - hold_timeout);
        let overdue = self.db.search_orders(query).await?;
        trace!("🔄️🕰️ {} on-hold orders are past their payment deadline", overdue.len());
        for order in overdue {
            match self.db.cancel_on_hold_order(order.id).await {
                Ok(Some(cancelled)) => {
                    debug!("🔄️🕰️ Order #{} was not paid in time and has been cancelled", cancelled.id);
                    result.cancelled.push(cancelled);
                },
                Ok(None) => trace!("🔄️🕰️ Order #{} is no longer on hold. Skipping", order.id),
                Err(e) => {
                    warn!("🔄️🕰️ Could not cancel order #{}: {e}", order.id);
                    result.failures += 1;
                },
            }
        }
        self.call_order_annulled_hook(&result.cancelled).await;

        if let Some(timeout) = auto_complete {
            let query = OrderQueryFilter::default().with_status(OrderStatusType::Shipped).updated_before(now - timeout);
            let unacknowledged = self.db.search_orders(query).await?;
            trace!("🔄️🕰️ {} shipped orders are past their acknowledgement deadline", unacknowledged.len());
            for order in unacknowledged {
                match self.db.complete_order(order.id, None).await {
                    Ok((completed, _)) => {
                        debug!("🔄️🕰️ Order #{} was completed automatically", completed.id);
                        result.completed.push(completed);
                    },
                    Err(OrderFlowError::InvalidState { order_id, status }) => {
                        trace!("🔄️🕰️ Order #{order_id} is now {status}. Skipping")
                    },
                    Err(e) => {
                        warn!("🔄️🕰️ Could not complete order #{}: {e}", order.id);
                        result.failures += 1;
                    },
                }
            }
        }
        if !result.is_empty() {
            info!(
                "🔄️🕰️ Overdue orders swept. {} cancelled, {} completed, {} failed",
                result.cancelled.len(),
                result.completed.len(),
                result.failures
            );
        }
        Ok(result)
    }

    async fn call_order_paid_hook(&self, order: &Order) {
        for emitter in &self.producers.order_paid_producer {
            debug!("🔄️📦️ Notifying order paid hook subscribers");
            emitter.publish_event(OrderPaidEvent::new(order.clone())).await;
        }
    }

    async fn call_order_annulled_hook(&self, orders: &[Order]) {
        for emitter in &self.producers.order_annulled_producer {
            debug!("🔄️📦️ Notifying order annulled hook subscribers");
            for order in orders {
                emitter.publish_event(OrderAnnulledEvent::new(order.clone())).await;
            }
        }
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }
}
