use serde::{Deserialize, Serialize};

use crate::db_types::{CartLineView, Money};

/// A cart line at today's catalog price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartViewLine {
    #[serde(flatten)]
    pub line: CartLineView,
    pub line_total: Money,
}

/// The user's cart, priced from the current catalog. This is not a price snapshot; checkout re-prices every line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartView {
    pub user_id: i64,
    pub lines: Vec<CartViewLine>,
    pub subtotal: Money,
}

impl CartView {
    pub fn new(user_id: i64, lines: Vec<CartLineView>) -> Self {
        let lines = lines
            .into_iter()
            .map(|line| {
                let line_total = line.line_total();
                CartViewLine { line, line_total }
            })
            .collect::<Vec<_>>();
        let subtotal = lines.iter().fold(Money::default(), |total, l| total.saturating_add(l.line_total));
        Self { user_id, lines, subtotal }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
