//! Dropship Engine
//!
//! The dropship engine is the order fulfilment and wallet core of a dropshipping marketplace. Dropshippers fill a cart
//! with supplier products and check out against a prepaid wallet. Suppliers ship and get paid when orders complete.
//!
//! The library is divided into these main sections:
//! 1. Backend contracts ([`mod@traits`]) and the SQLite backend ([`mod@sqlite`]) that implements them. You should
//!    never need to touch the database directly. The exception is the data types used in the database, which are
//!    defined in [`mod@db_types`] and are public.
//! 2. The public API ([`mod@dse_api`]): carts, checkout and the order lifecycle, order lookups, and wallets.
//!
//! Every state change that moves money or stock runs in a single transaction. Balances live in an append-only ledger,
//! where each entry carries the balance after it was applied.
//!
//! The engine also publishes events when orders are paid or annulled. Subscribe to them with
//! [`events::EventHooks`].
pub mod db_types;
pub mod dse_api;
pub mod events;
pub mod helpers;
pub mod traits;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use dse_api::{
    accounts_api::AccountApi,
    cart_api::CartApi,
    order_flow_api::OrderFlowApi,
    order_objects,
    wallet_api::WalletApi,
    wallet_objects,
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{
    AccountApiError,
    CartApiError,
    CartManagement,
    FulfillmentDatabase,
    OrderFlowError,
    OrderManagement,
    WalletApiError,
    WalletManagement,
};
