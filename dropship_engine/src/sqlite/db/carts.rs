use log::trace;
use sqlx::SqliteConnection;

use crate::db_types::{CartLine, CartLineView, ItemRef};

/// Fetches the id of the user's cart, creating the cart if it does not exist yet. This is a write, so it also serves
/// as the cart lock when it is the first statement of a transaction.
pub async fn lock_or_create_cart(user_id: i64, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let id = sqlx::query_scalar(
        "INSERT INTO carts (user_id) VALUES ($1) ON CONFLICT (user_id) DO UPDATE SET updated_at = CURRENT_TIMESTAMP \
         RETURNING id",
    )
    .bind(user_id)
    .fetch_one(conn)
    .await?;
    Ok(id)
}

/// Locks the user's cart, if they have one.
pub async fn lock_cart(user_id: i64, conn: &mut SqliteConnection) -> Result<Option<i64>, sqlx::Error> {
    let id = sqlx::query_scalar("UPDATE carts SET updated_at = CURRENT_TIMESTAMP WHERE user_id = $1 RETURNING id")
        .bind(user_id)
        .fetch_optional(conn)
        .await?;
    Ok(id)
}

pub async fn fetch_line(cart_id: i64, item: ItemRef, conn: &mut SqliteConnection) -> Result<Option<CartLine>, sqlx::Error> {
    let line = sqlx::query_as(
        "SELECT * FROM cart_lines WHERE cart_id = $1 AND product_id = $2 AND IFNULL(variant_id, 0) = IFNULL($3, 0)",
    )
    .bind(cart_id)
    .bind(item.product_id)
    .bind(item.variant_id)
    .fetch_optional(conn)
    .await?;
    Ok(line)
}

pub async fn insert_line(
    cart_id: i64,
    item: ItemRef,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<CartLine, sqlx::Error> {
    let line = sqlx::query_as(
        "INSERT INTO cart_lines (cart_id, product_id, variant_id, quantity) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(cart_id)
    .bind(item.product_id)
    .bind(item.variant_id)
    .bind(quantity)
    .fetch_one(conn)
    .await?;
    trace!("🛒️ {item} x{quantity} added to cart #{cart_id}");
    Ok(line)
}

pub async fn update_line_quantity(
    line_id: i64,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<CartLine, sqlx::Error> {
    let line = sqlx::query_as(
        "UPDATE cart_lines SET quantity = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *",
    )
    .bind(quantity)
    .bind(line_id)
    .fetch_one(conn)
    .await?;
    trace!("🛒️ Cart line #{line_id} quantity set to {quantity}");
    Ok(line)
}

/// Removes the line for `item`. Returns `true` if a line was deleted.
pub async fn delete_line(cart_id: i64, item: ItemRef, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "DELETE FROM cart_lines WHERE cart_id = $1 AND product_id = $2 AND IFNULL(variant_id, 0) = IFNULL($3, 0)",
    )
    .bind(cart_id)
    .bind(item.product_id)
    .bind(item.variant_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// The raw cart lines for the user, in the order they were added.
pub async fn fetch_lines_for_user(user_id: i64, conn: &mut SqliteConnection) -> Result<Vec<CartLine>, sqlx::Error> {
    let lines = sqlx::query_as(
        "SELECT cart_lines.* FROM cart_lines JOIN carts ON carts.id = cart_lines.cart_id WHERE carts.user_id = $1 \
         ORDER BY cart_lines.id",
    )
    .bind(user_id)
    .fetch_all(conn)
    .await?;
    Ok(lines)
}

/// The user's cart lines joined with the current catalog name, SKU, price and stock.
pub async fn fetch_cart_view(user_id: i64, conn: &mut SqliteConnection) -> Result<Vec<CartLineView>, sqlx::Error> {
    let lines = sqlx::query_as(
        r#"
        SELECT
            cl.product_id AS product_id,
            cl.variant_id AS variant_id,
            p.name AS name,
            v.name AS variant_name,
            COALESCE(v.sku, p.sku) AS sku,
            COALESCE(v.price, p.price) AS price,
            COALESCE(v.stock_quantity, p.stock_quantity) AS stock_quantity,
            cl.quantity AS quantity
        FROM cart_lines cl
            JOIN carts c ON c.id = cl.cart_id
            JOIN products p ON p.id = cl.product_id
            LEFT JOIN product_variants v ON v.id = cl.variant_id
        WHERE c.user_id = $1
        ORDER BY cl.id
        "#,
    )
    .bind(user_id)
    .fetch_all(conn)
    .await?;
    Ok(lines)
}

/// Deletes every line in the user's cart. The cart itself is kept.
pub async fn clear_cart(user_id: i64, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM cart_lines WHERE cart_id IN (SELECT id FROM carts WHERE user_id = $1)")
            .bind(user_id)
            .execute(conn)
            .await?;
    trace!("🛒️ Cleared {} lines from the cart of user #{user_id}", result.rows_affected());
    Ok(result.rows_affected())
}
