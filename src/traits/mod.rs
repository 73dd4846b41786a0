pub mod market_data;

pub use market_data::{quote_channel, PriceFeed, PriceStream, QuotePublisher};

#[cfg(test)]
pub use market_data::MockPriceFeed;
