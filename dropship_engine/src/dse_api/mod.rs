//! # Dropship engine public API
//!
//! The `dse_api` module exposes the programmatic API for the dropship engine. The API is modular, so that clients can
//! pick the functionality they need.
//!
//! * [`cart_api`] manages each user's shopping cart.
//! * [`order_flow_api`] drives orders through checkout, deferred payment, shipping and completion, and sweeps
//!   overdue orders.
//! * [`accounts_api`] is the read side: a user's orders and order details, and order searches.
//! * [`wallet_api`] exposes balances, the ledger, top-ups and supplier withdrawals.
//!
//! # API usage
//!
//! Every API is created by supplying a backend that implements the backend traits it needs:
//!
//! ```rust,ignore
//! use dropship_engine::{events::EventProducers, OrderFlowApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/dropship.db", 25).await?;
//! let api = OrderFlowApi::new(db, EventProducers::default());
//! let result = api.checkout(user_id).await?;
//! ```

pub mod accounts_api;
pub mod cart_api;
pub mod cart_objects;
pub mod order_flow_api;
pub mod order_objects;
pub mod wallet_api;
pub mod wallet_objects;
