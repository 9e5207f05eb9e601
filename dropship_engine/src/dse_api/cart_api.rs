//! Shopping cart API.
//!
//! The cart is mutable, per-user state. Quantities for the same item accumulate. Stock is checked when lines are added
//! or changed, but nothing is reserved: checkout re-checks every line under lock.
use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{CartLine, ItemRef},
    dse_api::cart_objects::CartView,
    traits::{CartApiError, CartManagement},
};

pub struct CartApi<B> {
    db: B,
}

impl<B: Debug> Debug for CartApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CartApi ({:?})", self.db)
    }
}

impl<B> CartApi<B>
where B: CartManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Adds `quantity` of `item` to the user's cart. If the item is already in the cart, the quantities are added
    /// together, and current stock must cover the combined quantity.
    pub async fn add_line(&self, user_id: i64, item: ItemRef, quantity: i64) -> Result<CartLine, CartApiError> {
        if quantity <= 0 {
            return Err(CartApiError::InvalidQuantity(quantity));
        }
        let line = self.db.add_to_cart(user_id, item, quantity).await?;
        debug!("🛒️ User #{user_id} added {quantity} x {item}. Line quantity is now {}", line.quantity);
        Ok(line)
    }

    /// The user's cart, priced at today's catalog prices.
    pub async fn cart(&self, user_id: i64) -> Result<CartView, CartApiError> {
        let lines = self.db.fetch_cart(user_id).await?;
        Ok(CartView::new(user_id, lines))
    }

    /// Sets the quantity of a line. A quantity of zero removes the line, in which case `None` is returned.
    pub async fn set_quantity(
        &self,
        user_id: i64,
        item: ItemRef,
        quantity: i64,
    ) -> Result<Option<CartLine>, CartApiError> {
        if quantity < 0 {
            return Err(CartApiError::InvalidQuantity(quantity));
        }
        let line = self.db.set_cart_quantity(user_id, item, quantity).await?;
        trace!("🛒️ User #{user_id} set {item} to {quantity}");
        Ok(line)
    }

    /// Removes the line for `item`. Returns `true` if there was such a line.
    pub async fn remove_line(&self, user_id: i64, item: ItemRef) -> Result<bool, CartApiError> {
        let removed = self.db.remove_from_cart(user_id, item).await?;
        trace!("🛒️ User #{user_id} removed {item}: {removed}");
        Ok(removed)
    }
}
