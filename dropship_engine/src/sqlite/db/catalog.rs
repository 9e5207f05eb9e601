//! Stock and price access for catalog items.
//!
//! The catalog itself (products, variants, categories) is managed elsewhere. The engine reads price, status and
//! stock, and decrements stock once money has moved. The insert and update helpers at the bottom of this module exist
//! so that tests and seed scripts can populate a catalog.
use log::trace;
use sqlx::{FromRow, SqliteConnection};

use crate::db_types::{ItemRef, Money, NewProduct, NewVariant, ProductStatus, StockLevel};

#[derive(Debug, FromRow)]
struct StockRow {
    price: Money,
    stock_quantity: i64,
    status: ProductStatus,
}

impl StockRow {
    fn into_level(self, item: ItemRef) -> StockLevel {
        StockLevel {
            item,
            price: self.price,
            available: self.stock_quantity,
            sellable: self.status == ProductStatus::Active,
        }
    }
}

/// Locks the stock row for `item` and reads its price and available quantity under the lock.
///
/// This is the `SELECT ... FOR UPDATE` of the checkout and payment flows, and must be called inside a transaction.
/// Returns `None` if the item does not exist.
pub async fn lock_stock(item: ItemRef, conn: &mut SqliteConnection) -> Result<Option<StockLevel>, sqlx::Error> {
    let row: Option<StockRow> = match item.variant_id {
        None => {
            sqlx::query_as(
                "UPDATE products SET stock_quantity = stock_quantity WHERE id = $1 RETURNING price, stock_quantity, \
                 status",
            )
            .bind(item.product_id)
            .fetch_optional(&mut *conn)
            .await?
        },
        Some(variant_id) => {
            let locked: Option<(Money, i64)> = sqlx::query_as(
                "UPDATE product_variants SET stock_quantity = stock_quantity WHERE id = $1 AND product_id = $2 \
                 RETURNING price, stock_quantity",
            )
            .bind(variant_id)
            .bind(item.product_id)
            .fetch_optional(&mut *conn)
            .await?;
            match locked {
                Some((price, stock_quantity)) => {
                    let status: ProductStatus = sqlx::query_scalar("SELECT status FROM products WHERE id = $1")
                        .bind(item.product_id)
                        .fetch_one(&mut *conn)
                        .await?;
                    Some(StockRow { price, stock_quantity, status })
                },
                None => None,
            }
        },
    };
    let level = row.map(|r| r.into_level(item));
    trace!("📦️ Stock for {item} locked: {level:?}");
    Ok(level)
}

/// Reads price and stock for `item` without locking. Good enough for cart validation, which is advisory.
pub async fn fetch_stock(item: ItemRef, conn: &mut SqliteConnection) -> Result<Option<StockLevel>, sqlx::Error> {
    let row: Option<StockRow> = match item.variant_id {
        None => {
            sqlx::query_as("SELECT price, stock_quantity, status FROM products WHERE id = $1")
                .bind(item.product_id)
                .fetch_optional(conn)
                .await?
        },
        Some(variant_id) => {
            sqlx::query_as(
                r#"
                SELECT v.price AS price, v.stock_quantity AS stock_quantity, p.status AS status
                FROM product_variants v JOIN products p ON p.id = v.product_id
                WHERE v.id = $1 AND v.product_id = $2
                "#,
            )
            .bind(variant_id)
            .bind(item.product_id)
            .fetch_optional(conn)
            .await?
        },
    };
    Ok(row.map(|r| r.into_level(item)))
}

/// Decrements stock for `item`. Returns `false`, and changes nothing, if there is not enough stock.
pub async fn decrement_stock(item: ItemRef, quantity: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = match item.variant_id {
        None => {
            sqlx::query(
                "UPDATE products SET stock_quantity = stock_quantity - $1, updated_at = CURRENT_TIMESTAMP WHERE id = \
                 $2 AND stock_quantity >= $1",
            )
            .bind(quantity)
            .bind(item.product_id)
            .execute(conn)
            .await?
        },
        Some(variant_id) => {
            sqlx::query(
                "UPDATE product_variants SET stock_quantity = stock_quantity - $1, updated_at = CURRENT_TIMESTAMP \
                 WHERE id = $2 AND product_id = $3 AND stock_quantity >= $1",
            )
            .bind(quantity)
            .bind(variant_id)
            .bind(item.product_id)
            .execute(conn)
            .await?
        },
    };
    let decremented = result.rows_affected() == 1;
    trace!("📦️ Stock for {item} decremented by {quantity}: {decremented}");
    Ok(decremented)
}

pub async fn insert_product(product: NewProduct, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let id = sqlx::query_scalar(
        r#"
            INSERT INTO products (supplier_id, name, sku, price, stock_quantity, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id;
        "#,
    )
    .bind(product.supplier_id)
    .bind(product.name)
    .bind(product.sku)
    .bind(product.price)
    .bind(product.stock_quantity)
    .bind(product.status)
    .fetch_one(conn)
    .await?;
    Ok(id)
}

pub async fn insert_variant(variant: NewVariant, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let id = sqlx::query_scalar(
        r#"
            INSERT INTO product_variants (product_id, sku, name, price, stock_quantity)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id;
        "#,
    )
    .bind(variant.product_id)
    .bind(variant.sku)
    .bind(variant.name)
    .bind(variant.price)
    .bind(variant.stock_quantity)
    .fetch_one(conn)
    .await?;
    Ok(id)
}

pub async fn update_price(item: ItemRef, price: Money, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    match item.variant_id {
        None => sqlx::query("UPDATE products SET price = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2")
            .bind(price)
            .bind(item.product_id)
            .execute(conn)
            .await?,
        Some(variant_id) => {
            sqlx::query("UPDATE product_variants SET price = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2")
                .bind(price)
                .bind(variant_id)
                .execute(conn)
                .await?
        },
    };
    Ok(())
}

pub async fn update_status(product_id: i64, status: ProductStatus, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE products SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2")
        .bind(status)
        .bind(product_id)
        .execute(conn)
        .await?;
    Ok(())
}
