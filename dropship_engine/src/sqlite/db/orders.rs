use log::{debug, trace};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::{Money, NewOrderLine, Order, OrderLine, OrderLineDetail, OrderStatusType},
    dse_api::order_objects::OrderQueryFilter,
};

/// Inserts a new order. This is not atomic on its own; call it inside the checkout transaction together with
/// [`insert_order_lines`].
pub async fn insert_order(
    user_id: i64,
    status: OrderStatusType,
    total: Money,
    conn: &mut SqliteConnection,
) -> Result<Order, sqlx::Error> {
    let order: Order = sqlx::query_as("INSERT INTO orders (user_id, status, total) VALUES ($1, $2, $3) RETURNING *")
        .bind(user_id)
        .bind(status)
        .bind(total)
        .fetch_one(conn)
        .await?;
    debug!("📝️ Order #{} for user #{user_id} inserted as {status}, total {total}", order.id);
    Ok(order)
}

/// Writes the frozen line snapshot for an order in a single statement.
pub async fn insert_order_lines(
    order_id: i64,
    lines: &[NewOrderLine],
    conn: &mut SqliteConnection,
) -> Result<u64, sqlx::Error> {
    if lines.is_empty() {
        return Ok(0);
    }
    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new("INSERT INTO order_lines (order_id, product_id, variant_id, quantity, unit_price) ");
    builder.push_values(lines, |mut row, line| {
        row.push_bind(order_id)
            .push_bind(line.item.product_id)
            .push_bind(line.item.variant_id)
            .push_bind(line.quantity)
            .push_bind(line.unit_price);
    });
    let result = builder.build().execute(conn).await?;
    trace!("📝️ {} lines written for order #{order_id}", result.rows_affected());
    Ok(result.rows_affected())
}

/// Locks the order row and returns the order as it is under the lock. Returns `None` if there is no such order.
///
/// `updated_at` is left unchanged. The sweeper dates shipments by it.
pub async fn lock_order(order_id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("UPDATE orders SET updated_at = updated_at WHERE id = $1 RETURNING *")
        .bind(order_id)
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

pub async fn fetch_order_for_user(
    user_id: i64,
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1 AND user_id = $2")
        .bind(order_id)
        .bind(user_id)
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

/// All of the user's orders, newest first.
pub async fn fetch_orders_for_user(user_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as("SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC")
        .bind(user_id)
        .fetch_all(conn)
        .await?;
    Ok(orders)
}

pub async fn fetch_order_lines(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<OrderLine>, sqlx::Error> {
    let lines = sqlx::query_as("SELECT * FROM order_lines WHERE order_id = $1 ORDER BY id")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(lines)
}

/// Order lines with the product name and the SKU of the variant (or product) that was bought.
pub async fn fetch_order_line_details(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderLineDetail>, sqlx::Error> {
    let lines = sqlx::query_as(
        r#"
        SELECT
            ol.id AS id,
            ol.product_id AS product_id,
            ol.variant_id AS variant_id,
            p.name AS name,
            COALESCE(v.sku, p.sku) AS sku,
            ol.quantity AS quantity,
            ol.unit_price AS unit_price
        FROM order_lines ol
            JOIN products p ON p.id = ol.product_id
            LEFT JOIN product_variants v ON v.id = ol.variant_id
        WHERE ol.order_id = $1
        ORDER BY ol.id
        "#,
    )
    .bind(order_id)
    .fetch_all(conn)
    .await?;
    Ok(lines)
}

pub async fn update_order_status(
    order_id: i64,
    status: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Order, sqlx::Error> {
    let order = sqlx::query_as("UPDATE orders SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *")
        .bind(status)
        .bind(order_id)
        .fetch_one(conn)
        .await?;
    trace!("📝️ Order #{order_id} is now {status}");
    Ok(order)
}

pub async fn mark_shipped(order_id: i64, tracking_ref: &str, conn: &mut SqliteConnection) -> Result<Order, sqlx::Error> {
    let order = sqlx::query_as(
        "UPDATE orders SET status = $1, tracking_ref = $2, updated_at = CURRENT_TIMESTAMP WHERE id = $3 RETURNING *",
    )
    .bind(OrderStatusType::Shipped)
    .bind(tracking_ref)
    .bind(order_id)
    .fetch_one(conn)
    .await?;
    trace!("📝️ Order #{order_id} shipped with tracking reference {tracking_ref}");
    Ok(order)
}

/// Whether at least one line of the order is for a product sold by `supplier_id`.
pub async fn supplier_has_lines(
    order_id: i64,
    supplier_id: i64,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM order_lines ol JOIN products p ON p.id = ol.product_id WHERE ol.order_id = $1 AND \
         p.supplier_id = $2",
    )
    .bind(order_id)
    .bind(supplier_id)
    .fetch_one(conn)
    .await?;
    Ok(count > 0)
}

/// The amount owed to each supplier for their lines in the order, ordered by supplier id.
pub async fn supplier_totals_for_order(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<(i64, Money)>, sqlx::Error> {
    let totals: Vec<(i64, i64)> = sqlx::query_as(
        r#"
        SELECT p.supplier_id, SUM(ol.unit_price * ol.quantity)
        FROM order_lines ol JOIN products p ON p.id = ol.product_id
        WHERE ol.order_id = $1
        GROUP BY p.supplier_id
        ORDER BY p.supplier_id
        "#,
    )
    .bind(order_id)
    .fetch_all(conn)
    .await?;
    Ok(totals.into_iter().map(|(supplier, amount)| (supplier, Money::from(amount))).collect())
}

/// Earnings on `shipped` orders for the supplier. These become `payout` entries when the orders complete.
pub async fn pending_earnings(supplier_id: i64, conn: &mut SqliteConnection) -> Result<Money, sqlx::Error> {
    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(ol.unit_price * ol.quantity), 0)
        FROM order_lines ol
            JOIN orders o ON o.id = ol.order_id
            JOIN products p ON p.id = ol.product_id
        WHERE p.supplier_id = $1 AND o.status = $2
        "#,
    )
    .bind(supplier_id)
    .bind(OrderStatusType::Shipped)
    .fetch_one(conn)
    .await?;
    Ok(Money::from(total))
}

/// Fetches orders according to criteria specified in the `OrderQueryFilter`
///
/// Resulting orders are ordered by `created_at` in ascending order
pub async fn search_orders(query: OrderQueryFilter, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::new(
        r#"
    SELECT * FROM orders
    "#,
    );
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(user_id) = query.user_id {
        where_clause.push("user_id = ");
        where_clause.push_bind_unseparated(user_id);
    }
    if !query.statuses.is_empty() {
        // Statuses come from an enum, so they are safe to inline
        let statuses = query.statuses.iter().map(|s| format!("'{s}'")).collect::<Vec<String>>().join(",");
        where_clause.push(format!("status IN ({statuses})"));
    }
    if let Some(before) = query.created_before {
        where_clause.push("unixepoch(created_at) <= ");
        where_clause.push_bind_unseparated(before.timestamp());
    }
    if let Some(before) = query.updated_before {
        where_clause.push("unixepoch(updated_at) <= ");
        where_clause.push_bind_unseparated(before.timestamp());
    }
    builder.push(" ORDER BY created_at ASC, id ASC");

    trace!("📝️ Executing query: {}", builder.sql());
    let query = builder.build_query_as::<Order>();
    let orders = query.fetch_all(conn).await?;
    trace!("📝️ Result of search_orders: {:?}", orders.len());
    Ok(orders)
}
