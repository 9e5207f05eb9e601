mod money;

pub mod helpers;
pub mod op;

pub use helpers::parse_boolean_flag;
pub use money::{Money, MoneyConversionError, CURRENCY_CODE};
