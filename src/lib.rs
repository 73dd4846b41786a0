pub mod config;
pub mod exchanges;
pub mod logging;
pub mod strategy;
pub mod traits;
pub mod types;

pub use config::{AppConfig, ConfigError, ExchangeConfig, StrategyConfig};
pub use exchanges::{BinanceFeed, CoinGeckoFeed, FeedError, FeedRegistry, MockFeed};
pub use logging::init_logging;
pub use strategy::{
    calculate_profit, ArbitrageEngine, ArbitragePlan, EngineConfig, EngineError, EngineState,
    PlanSink, PriceView, ProfitBreakdown, TableReporter,
};
pub use traits::{quote_channel, PriceFeed, PriceStream, QuotePublisher};
pub use types::{Price, Quote, TradingPair};
