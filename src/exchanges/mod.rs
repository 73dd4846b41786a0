pub mod binance;
pub mod coingecko;
pub mod error;
pub mod mock;
pub mod registry;

pub use binance::BinanceFeed;
pub use coingecko::CoinGeckoFeed;
pub use error::FeedError;
pub use mock::MockFeed;
pub use registry::FeedRegistry;
