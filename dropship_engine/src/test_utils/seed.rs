//! Catalog and wallet fixtures.
use crate::{
    db_types::{ItemRef, Money, NewProduct, NewVariant, ProductStatus, StockLevel},
    sqlite::db::{catalog, ledger},
    SqliteDatabase,
};

pub async fn add_product(db: &SqliteDatabase, supplier_id: i64, name: &str, price: Money, stock: i64) -> ItemRef {
    let mut conn = db.pool().acquire().await.expect("Error acquiring connection");
    let product = NewProduct::new(supplier_id, name, price, stock);
    let id = catalog::insert_product(product, &mut conn).await.expect("Error inserting product");
    ItemRef::product(id)
}

pub async fn add_variant(db: &SqliteDatabase, product: ItemRef, name: &str, price: Money, stock: i64) -> ItemRef {
    let mut conn = db.pool().acquire().await.expect("Error acquiring connection");
    let variant = NewVariant {
        product_id: product.product_id,
        sku: format!("SKU-{}-{}", product.product_id, name.to_uppercase()),
        name: name.to_string(),
        price,
        stock_quantity: stock,
    };
    let id = catalog::insert_variant(variant, &mut conn).await.expect("Error inserting variant");
    ItemRef::variant(product.product_id, id)
}

pub async fn set_price(db: &SqliteDatabase, item: ItemRef, price: Money) {
    let mut conn = db.pool().acquire().await.expect("Error acquiring connection");
    catalog::update_price(item, price, &mut conn).await.expect("Error updating price");
}

pub async fn set_status(db: &SqliteDatabase, product_id: i64, status: ProductStatus) {
    let mut conn = db.pool().acquire().await.expect("Error acquiring connection");
    catalog::update_status(product_id, status, &mut conn).await.expect("Error updating product status");
}

pub async fn stock_of(db: &SqliteDatabase, item: ItemRef) -> i64 {
    let mut conn = db.pool().acquire().await.expect("Error acquiring connection");
    let level: Option<StockLevel> = catalog::fetch_stock(item, &mut conn).await.expect("Error fetching stock");
    level.map(|l| l.available).expect("Item does not exist")
}

/// Credits the user's wallet directly, as a `topup` movement.
pub async fn fund_wallet(db: &SqliteDatabase, user_id: i64, amount: Money) {
    let mut tx = db.pool().begin().await.expect("Error starting transaction");
    let mut lock = ledger::lock_wallet(user_id, &mut tx).await.expect("Error locking wallet");
    ledger::record_movement(&mut lock, crate::db_types::LedgerKind::Topup, amount, "Test funds", &mut tx)
        .await
        .expect("Error recording movement");
    tx.commit().await.expect("Error committing transaction");
}

/// Rewinds an order's timestamps, so that it looks `hours` older than it is.
pub async fn age_order(db: &SqliteDatabase, order_id: i64, hours: i64) {
    sqlx::query(
        "UPDATE orders SET created_at = datetime(created_at, $1), updated_at = datetime(updated_at, $1) WHERE id = $2",
    )
    .bind(format!("-{hours} hours"))
    .bind(order_id)
    .execute(db.pool())
    .await
    .expect("Error ageing order");
}

pub async fn count_rows(db: &SqliteDatabase, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(db.pool())
        .await
        .expect("Error counting rows")
}
