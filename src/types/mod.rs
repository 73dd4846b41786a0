pub mod price;
pub mod symbol;

pub use price::{Price, Quote};
pub use symbol::TradingPair;
