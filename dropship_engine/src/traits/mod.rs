//! # Backend contracts
//!
//! This module defines the behaviour that a database backend needs to expose in order to power the dropship engine.
//! The public API types in [`crate::dse_api`] are generic over these traits, so the backend can be swapped out, or
//! mocked in tests, without touching the order flow logic.
//!
//! * [`FulfillmentDatabase`] is the highest level of behaviour: checkout, deferred payment and the order state
//!   machine. Every method is a single atomic unit of work.
//! * [`OrderManagement`] provides read-only queries over orders and their lines.
//! * [`CartManagement`] manages the per-user shopping cart.
//! * [`WalletManagement`] manages the append-only ledger, top-ups and supplier withdrawals.
//!
//! ## Locking
//! Every mutating method must take its locks *before* reading the data it makes decisions on. Backends without row
//! locks (SQLite) achieve this by opening each transaction with a write to the row being guarded.
mod cart_management;
mod data_objects;
mod fulfillment_database;
mod order_management;
mod wallet_management;

pub use cart_management::{CartApiError, CartManagement};
pub use data_objects::WithdrawalDecision;
pub use fulfillment_database::{FulfillmentDatabase, OrderFlowError};
pub use order_management::{AccountApiError, OrderManagement};
pub use wallet_management::{WalletApiError, WalletManagement};
