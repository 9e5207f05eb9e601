use std::collections::HashMap;

use cucumber::World;
use dropship_engine::{
    db_types::ItemRef,
    events::EventProducers,
    test_utils::prepare_env::{create_database, random_db_path, run_migrations},
    AccountApi,
    CartApi,
    OrderFlowApi,
    SqliteDatabase,
    WalletApi,
};
use log::*;

#[derive(Default, Debug, World)]
pub struct DropshipWorld {
    pub system: Option<DropshipSystem>,
    /// Catalog items by name
    pub items: HashMap<String, ItemRef>,
    pub last_order_id: Option<i64>,
    /// The latest order of each user
    pub user_orders: HashMap<i64, i64>,
    pub last_withdrawal_id: Option<i64>,
    pub last_error: Option<String>,
}

#[derive(Debug)]
pub struct DropshipSystem {
    pub db_path: String,
    pub db: SqliteDatabase,
    pub order_flow: OrderFlowApi<SqliteDatabase>,
    pub carts: CartApi<SqliteDatabase>,
    pub wallets: WalletApi<SqliteDatabase>,
    pub accounts: AccountApi<SqliteDatabase>,
}

impl DropshipWorld {
    pub fn system(&self) -> &DropshipSystem {
        self.system.as_ref().expect("The system has not been initialised")
    }

    pub fn item(&self, name: &str) -> ItemRef {
        *self.items.get(name).unwrap_or_else(|| panic!("No catalog item named {name}"))
    }

    pub fn order_id(&self) -> i64 {
        self.last_order_id.expect("No order has been created")
    }

    pub fn record<T, E: ToString>(&mut self, result: Result<T, E>) -> Option<T> {
        match result {
            Ok(v) => {
                self.last_error = None;
                Some(v)
            },
            Err(e) => {
                let e = e.to_string();
                debug!("🥒️ Step produced an error: {e}");
                self.last_error = Some(e);
                None
            },
        }
    }
}

impl DropshipSystem {
    pub async fn new() -> Self {
        let url = random_db_path();
        create_database(&url).await;
        run_migrations(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database");
        debug!("🥒️ Created database: {url}");
        Self {
            db_path: url,
            order_flow: OrderFlowApi::new(db.clone(), EventProducers::default()),
            carts: CartApi::new(db.clone()),
            wallets: WalletApi::new(db.clone()),
            accounts: AccountApi::new(db.clone()),
            db,
        }
    }
}
