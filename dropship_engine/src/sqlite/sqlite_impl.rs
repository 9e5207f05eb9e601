//! `SqliteDatabase` is a concrete implementation of a dropship engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module.
//!
//! Every mutating method opens a transaction whose *first* statement is a locking write (see [`super::db`]), then
//! reads, decides and writes. Returning early with an error drops the transaction, which rolls it back.
use std::fmt::Debug;

use log::*;
use sqlx::{migrate::MigrateError, SqliteConnection, SqlitePool};

use super::db::{carts, catalog, db_url, ledger, new_pool, orders, withdrawals};
use crate::{
    db_types::{
        CartLine,
        CartLineView,
        ItemRef,
        LedgerEntry,
        LedgerKind,
        Money,
        NewOrderLine,
        Order,
        OrderLineDetail,
        OrderStatusType,
        WithdrawalRequest,
        WithdrawalStatus,
    },
    dse_api::order_objects::OrderQueryFilter,
    traits::{
        AccountApiError,
        CartApiError,
        CartManagement,
        FulfillmentDatabase,
        OrderFlowError,
        OrderManagement,
        WalletApiError,
        WalletManagement,
        WithdrawalDecision,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

/// Locks the stock row of every `(item, quantity)` pair and prices it at the locked price.
///
/// Fails with [`OrderFlowError::InsufficientStock`] on the first item that does not exist, is not for sale, or is
/// short.
async fn lock_and_price_lines(
    wanted: &[(ItemRef, i64)],
    conn: &mut SqliteConnection,
) -> Result<Vec<NewOrderLine>, OrderFlowError> {
    let mut lines = Vec::with_capacity(wanted.len());
    for &(item, quantity) in wanted {
        let available = match catalog::lock_stock(item, &mut *conn).await? {
            Some(stock) if stock.sellable_quantity() >= quantity => {
                lines.push(NewOrderLine { item, quantity, unit_price: stock.price });
                continue;
            },
            Some(stock) => stock.sellable_quantity(),
            None => 0,
        };
        debug!("🗃️ {item} cannot cover a quantity of {quantity}. Only {available} available");
        return Err(OrderFlowError::InsufficientStock { item, requested: quantity, available });
    }
    Ok(lines)
}

/// Decrements stock for every line. Stock must already be locked and checked by [`lock_and_price_lines`].
async fn take_stock(lines: &[NewOrderLine], conn: &mut SqliteConnection) -> Result<(), OrderFlowError> {
    for line in lines {
        if !catalog::decrement_stock(line.item, line.quantity, &mut *conn).await? {
            error!("🗃️ Stock for {} changed while it was locked. The transaction will be rolled back", line.item);
            return Err(OrderFlowError::DatabaseError(format!("Stock for {} changed while locked", line.item)));
        }
    }
    Ok(())
}

/// The sum of the line totals, or `None` if it does not fit in a [`Money`].
fn order_total(lines: &[NewOrderLine]) -> Option<Money> {
    let totals = lines.iter().map(NewOrderLine::line_total).collect::<Option<Vec<_>>>()?;
    Money::checked_sum(totals)
}

fn into_out_of_stock(e: OrderFlowError) -> OrderFlowError {
    match e {
        OrderFlowError::InsufficientStock { item, requested, available } => {
            OrderFlowError::OutOfStock { item, requested, available }
        },
        e => e,
    }
}

impl FulfillmentDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn checkout(&self, user_id: i64) -> Result<Order, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let mut wallet = ledger::lock_wallet(user_id, &mut tx).await?;
        let cart = carts::fetch_lines_for_user(user_id, &mut tx).await?;
        if cart.is_empty() {
            debug!("🗃️ Checkout for user #{user_id} rejected. The cart is empty");
            return Err(OrderFlowError::EmptyCart);
        }
        let wanted = cart.iter().map(|line| (line.item(), line.quantity)).collect::<Vec<_>>();
        let lines = lock_and_price_lines(&wanted, &mut tx).await?;
        let total = order_total(&lines).ok_or_else(|| {
            OrderFlowError::AmountOverflow(format!("The cart total for user #{user_id} is too large"))
        })?;
        let status = if wallet.covers(total) { OrderStatusType::Processing } else { OrderStatusType::OnHold };
        let order = orders::insert_order(user_id, status, total, &mut tx).await?;
        orders::insert_order_lines(order.id, &lines, &mut tx).await?;
        if status == OrderStatusType::Processing {
            take_stock(&lines, &mut tx).await?;
            let note = format!("Payment for order #{}", order.id);
            ledger::record_movement(&mut wallet, LedgerKind::OrderPayment, total, &note, &mut tx).await?;
        }
        carts::clear_cart(user_id, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Checkout for user #{user_id} created order #{} ({status}, {total})", order.id);
        Ok(order)
    }

    async fn pay_on_hold_order(&self, user_id: i64, order_id: i64) -> Result<Order, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::lock_order(order_id, &mut tx)
            .await?
            .filter(|o| o.user_id == user_id)
            .ok_or(OrderFlowError::OrderNotFound(order_id))?;
        if !order.status.can_transition_to(OrderStatusType::Processing) {
            debug!("🗃️ Order #{order_id} cannot be paid for. It is {}", order.status);
            return Err(OrderFlowError::InvalidState { order_id, status: order.status });
        }
        let mut wallet = ledger::lock_wallet(user_id, &mut tx).await?;
        let frozen = orders::fetch_order_lines(order_id, &mut tx).await?;
        let wanted = frozen.iter().map(|line| (line.item(), line.quantity)).collect::<Vec<_>>();
        let lines = lock_and_price_lines(&wanted, &mut tx).await.map_err(into_out_of_stock)?;
        if !wallet.covers(order.total) {
            debug!("🗃️ Order #{order_id} needs {}, but user #{user_id} only has {}", order.total, wallet.balance());
            return Err(OrderFlowError::InsufficientFunds { required: order.total, available: wallet.balance() });
        }
        take_stock(&lines, &mut tx).await?;
        let note = format!("Payment for order #{order_id}");
        ledger::record_movement(&mut wallet, LedgerKind::OrderPayment, order.total, &note, &mut tx).await?;
        let order = orders::update_order_status(order_id, OrderStatusType::Processing, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ On-hold order #{order_id} has been paid. Balance is now {}", wallet.balance());
        Ok(order)
    }

    async fn ship_order(&self, supplier_id: i64, order_id: i64, tracking_ref: &str) -> Result<Order, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::lock_order(order_id, &mut tx).await?.ok_or(OrderFlowError::OrderNotFound(order_id))?;
        if !orders::supplier_has_lines(order_id, supplier_id, &mut tx).await? {
            debug!("🗃️ Supplier #{supplier_id} has no lines in order #{order_id}");
            return Err(OrderFlowError::OrderNotFound(order_id));
        }
        if !order.status.can_transition_to(OrderStatusType::Shipped) {
            return Err(OrderFlowError::InvalidState { order_id, status: order.status });
        }
        let order = orders::mark_shipped(order_id, tracking_ref, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order #{order_id} shipped by supplier #{supplier_id}");
        Ok(order)
    }

    async fn complete_order(
        &self,
        order_id: i64,
        buyer_id: Option<i64>,
    ) -> Result<(Order, Vec<LedgerEntry>), OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::lock_order(order_id, &mut tx)
            .await?
            .filter(|o| buyer_id.map(|id| id == o.user_id).unwrap_or(true))
            .ok_or(OrderFlowError::OrderNotFound(order_id))?;
        if !order.status.can_transition_to(OrderStatusType::Completed) {
            return Err(OrderFlowError::InvalidState { order_id, status: order.status });
        }
        let order = orders::update_order_status(order_id, OrderStatusType::Completed, &mut tx).await?;
        let totals = orders::supplier_totals_for_order(order_id, &mut tx).await?;
        let mut payouts = Vec::with_capacity(totals.len());
        for (supplier_id, amount) in totals {
            if !amount.is_positive() {
                continue;
            }
            let mut wallet = ledger::lock_wallet(supplier_id, &mut tx).await?;
            let note = format!("Payout for order #{order_id}");
            let entry = ledger::record_movement(&mut wallet, LedgerKind::Payout, amount, &note, &mut tx).await?;
            payouts.push(entry);
        }
        tx.commit().await?;
        debug!("🗃️ Order #{order_id} completed. {} supplier payouts made", payouts.len());
        Ok((order, payouts))
    }

    async fn cancel_on_hold_order(&self, order_id: i64) -> Result<Option<Order>, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::lock_order(order_id, &mut tx).await?.ok_or(OrderFlowError::OrderNotFound(order_id))?;
        if !order.status.can_transition_to(OrderStatusType::Cancelled) {
            trace!("🗃️ Order #{order_id} is {} and no longer on hold. Not cancelling", order.status);
            return Ok(None);
        }
        let order = orders::update_order_status(order_id, OrderStatusType::Cancelled, &mut tx).await?;
        tx.commit().await?;
        Ok(Some(order))
    }

    async fn close(&mut self) -> Result<(), OrderFlowError> {
        self.pool.close().await;
        Ok(())
    }
}

impl OrderManagement for SqliteDatabase {
    async fn fetch_orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_orders_for_user(user_id, &mut conn).await?;
        Ok(orders)
    }

    async fn fetch_order_for_user(&self, user_id: i64, order_id: i64) -> Result<Option<Order>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_for_user(user_id, order_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_lines(&self, order_id: i64) -> Result<Vec<OrderLineDetail>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let lines = orders::fetch_order_line_details(order_id, &mut conn).await?;
        Ok(lines)
    }

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::search_orders(query, &mut conn).await?;
        Ok(orders)
    }
}

impl CartManagement for SqliteDatabase {
    async fn add_to_cart(&self, user_id: i64, item: ItemRef, quantity: i64) -> Result<CartLine, CartApiError> {
        let mut tx = self.pool.begin().await?;
        let cart_id = carts::lock_or_create_cart(user_id, &mut tx).await?;
        let stock = catalog::fetch_stock(item, &mut tx)
            .await?
            .filter(|s| s.sellable)
            .ok_or(CartApiError::ItemNotFound(item))?;
        let existing = carts::fetch_line(cart_id, item, &mut tx).await?;
        let current = existing.as_ref().map(|l| l.quantity).unwrap_or(0);
        let requested = current.checked_add(quantity).filter(|q| *q <= stock.available).ok_or(
            CartApiError::InsufficientStock {
                item,
                requested: current.saturating_add(quantity),
                available: stock.available,
            },
        )?;
        let line = match existing {
            Some(line) => carts::update_line_quantity(line.id, requested, &mut tx).await?,
            None => carts::insert_line(cart_id, item, quantity, &mut tx).await?,
        };
        tx.commit().await?;
        Ok(line)
    }

    async fn fetch_cart(&self, user_id: i64) -> Result<Vec<CartLineView>, CartApiError> {
        let mut conn = self.pool.acquire().await?;
        let lines = carts::fetch_cart_view(user_id, &mut conn).await?;
        Ok(lines)
    }

    async fn set_cart_quantity(
        &self,
        user_id: i64,
        item: ItemRef,
        quantity: i64,
    ) -> Result<Option<CartLine>, CartApiError> {
        let mut tx = self.pool.begin().await?;
        let cart_id = match carts::lock_cart(user_id, &mut tx).await? {
            Some(id) => id,
            None if quantity == 0 => return Ok(None),
            None => return Err(CartApiError::LineNotFound(item)),
        };
        if quantity == 0 {
            carts::delete_line(cart_id, item, &mut tx).await?;
            tx.commit().await?;
            return Ok(None);
        }
        let line = carts::fetch_line(cart_id, item, &mut tx).await?.ok_or(CartApiError::LineNotFound(item))?;
        let stock = catalog::fetch_stock(item, &mut tx)
            .await?
            .filter(|s| s.sellable)
            .ok_or(CartApiError::ItemNotFound(item))?;
        if stock.available < quantity {
            return Err(CartApiError::InsufficientStock { item, requested: quantity, available: stock.available });
        }
        let line = carts::update_line_quantity(line.id, quantity, &mut tx).await?;
        tx.commit().await?;
        Ok(Some(line))
    }

    async fn remove_from_cart(&self, user_id: i64, item: ItemRef) -> Result<bool, CartApiError> {
        let mut tx = self.pool.begin().await?;
        let removed = match carts::lock_cart(user_id, &mut tx).await? {
            Some(cart_id) => carts::delete_line(cart_id, item, &mut tx).await?,
            None => false,
        };
        tx.commit().await?;
        Ok(removed)
    }
}

impl WalletManagement for SqliteDatabase {
    async fn fetch_balance(&self, user_id: i64) -> Result<Money, WalletApiError> {
        let mut conn = self.pool.acquire().await?;
        let balance = ledger::fetch_balance(user_id, &mut conn).await?;
        Ok(balance)
    }

    async fn fetch_ledger_sum(&self, user_id: i64) -> Result<Money, WalletApiError> {
        let mut conn = self.pool.acquire().await?;
        let sum = ledger::ledger_sum(user_id, &mut conn).await?;
        Ok(sum)
    }

    async fn fetch_ledger_entries(&self, user_id: i64) -> Result<Vec<LedgerEntry>, WalletApiError> {
        let mut conn = self.pool.acquire().await?;
        let entries = ledger::fetch_entries(user_id, &mut conn).await?;
        Ok(entries)
    }

    async fn top_up(&self, user_id: i64, amount: Money, note: &str) -> Result<LedgerEntry, WalletApiError> {
        let mut tx = self.pool.begin().await?;
        let mut wallet = ledger::lock_wallet(user_id, &mut tx).await?;
        let entry = ledger::record_movement(&mut wallet, LedgerKind::Topup, amount, note, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ User #{user_id} topped up {amount}. Balance is now {}", entry.balance_after);
        Ok(entry)
    }

    async fn request_withdrawal(
        &self,
        user_id: i64,
        amount: Money,
        bank_details: &str,
    ) -> Result<WithdrawalRequest, WalletApiError> {
        let mut tx = self.pool.begin().await?;
        let mut wallet = ledger::lock_wallet(user_id, &mut tx).await?;
        if !wallet.covers(amount) {
            return Err(WalletApiError::InsufficientFunds { required: amount, available: wallet.balance() });
        }
        let request = withdrawals::insert_request(user_id, amount, bank_details, &mut tx).await?;
        let note = format!("Withdrawal request #{}", request.id);
        ledger::record_movement(&mut wallet, LedgerKind::Withdrawal, amount, &note, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ User #{user_id} requested a withdrawal of {amount} (request #{})", request.id);
        Ok(request)
    }

    async fn fetch_withdrawals_for_user(
        &self,
        user_id: i64,
        limit: i64,
    ) -> Result<Vec<WithdrawalRequest>, WalletApiError> {
        let mut conn = self.pool.acquire().await?;
        let requests = withdrawals::fetch_for_user(user_id, limit, &mut conn).await?;
        Ok(requests)
    }

    async fn fetch_pending_withdrawals(&self) -> Result<Vec<WithdrawalRequest>, WalletApiError> {
        let mut conn = self.pool.acquire().await?;
        let requests = withdrawals::fetch_pending(&mut conn).await?;
        Ok(requests)
    }

    async fn process_withdrawal(
        &self,
        request_id: i64,
        decision: WithdrawalDecision,
    ) -> Result<WithdrawalRequest, WalletApiError> {
        let mut tx = self.pool.begin().await?;
        let request = withdrawals::lock_request(request_id, &mut tx)
            .await?
            .ok_or(WalletApiError::WithdrawalNotFound(request_id))?;
        if request.status != WithdrawalStatus::Pending {
            return Err(WalletApiError::WithdrawalAlreadyProcessed { id: request_id, status: request.status });
        }
        let updated = match decision {
            WithdrawalDecision::Approve => {
                withdrawals::update_status(request_id, WithdrawalStatus::Approved, None, &mut tx).await?
            },
            WithdrawalDecision::Reject { reason } => {
                let updated =
                    withdrawals::update_status(request_id, WithdrawalStatus::Rejected, Some(&reason), &mut tx).await?;
                let mut wallet = ledger::lock_wallet(request.user_id, &mut tx).await?;
                let note = format!("Refund for rejected withdrawal request #{request_id}");
                ledger::record_movement(&mut wallet, LedgerKind::Refund, request.amount, &note, &mut tx).await?;
                updated
            },
        };
        tx.commit().await?;
        debug!("🗃️ Withdrawal request #{request_id} is now {}", updated.status);
        Ok(updated)
    }

    async fn fetch_pending_earnings(&self, supplier_id: i64) -> Result<Money, WalletApiError> {
        let mut conn = self.pool.acquire().await?;
        let pending = orders::pending_earnings(supplier_id, &mut conn).await?;
        Ok(pending)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Brings the schema up to date.
    pub async fn migrate(&self) -> Result<(), MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
