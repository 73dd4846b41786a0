use crate::exchanges::error::FeedError;
use crate::exchanges::registry::FeedRegistry;
use crate::strategy::EngineConfig;
use crate::traits::PriceFeed;
use crate::types::TradingPair;
use log::info;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors surfaced to the caller instead of aborting
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("bad config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("unknown exchange: {0}")]
    UnknownExchange(String),
    #[error("strategy {strategy}: cross-exchange arbitrage requires 2 exchanges, found {found}")]
    NotEnoughExchanges { strategy: String, found: usize },
    #[error("strategy {strategy}: slippage {slippage} must be within [0, 1)")]
    InvalidSlippage { strategy: String, slippage: Decimal },
    #[error("strategy {strategy}: sampling interval must be positive")]
    InvalidInterval { strategy: String },
    #[error("strategy {strategy}: ready timeout must be positive")]
    InvalidReadyTimeout { strategy: String },
    #[error("exchange {exchange}: fee rate {fees} must not be negative")]
    InvalidFee { exchange: String, fees: Decimal },
    #[error("strategy {strategy}: {source}")]
    InvalidSymbol {
        strategy: String,
        #[source]
        source: FeedError,
    },
}

/// One exchange connector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeConfig {
    /// Registry key, e.g. `binance` or `1inch`
    pub name: String,
    /// Per-transaction fee rate
    #[serde(default)]
    pub fees: Decimal,
    /// Use the exchange testnet where one exists
    #[serde(default)]
    pub testing: bool,
}

/// One two-feed arbitrage monitor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub name: String,
    /// Ticker symbol such as `BTC-USDT`
    pub trading_pair: String,
    /// Sampling interval in milliseconds
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Fractional slippage, e.g. 0.0005
    #[serde(default)]
    pub slippage: Decimal,
    /// Names of the two exchanges to compare; defaults to the first two configured
    #[serde(default)]
    pub exchanges: Vec<String>,
    /// Give up if a feed stays silent this long after startup
    #[serde(default)]
    pub ready_timeout_ms: Option<u64>,
}

fn default_interval_ms() -> u64 {
    1000
}

/// Top-level application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub exchanges: Vec<ExchangeConfig>,
    #[serde(default)]
    pub strategies: Vec<StrategyConfig>,
}

impl AppConfig {
    /// Load and validate a TOML config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&contents)?;
        info!(
            "Loaded config {}: {} exchanges, {} strategies",
            path.display(),
            config.exchanges.len(),
            config.strategies.len()
        );
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for exchange in &self.exchanges {
            if exchange.fees.is_sign_negative() && !exchange.fees.is_zero() {
                return Err(ConfigError::InvalidFee {
                    exchange: exchange.name.clone(),
                    fees: exchange.fees,
                });
            }
        }

        for strategy in &self.strategies {
            strategy.validate()?;
            self.exchanges_for(strategy)?;
        }

        Ok(())
    }

    /// Resolve the two exchanges a strategy compares
    pub fn exchanges_for(
        &self,
        strategy: &StrategyConfig,
    ) -> Result<(&ExchangeConfig, &ExchangeConfig), ConfigError> {
        let selected: Vec<&ExchangeConfig> = if strategy.exchanges.is_empty() {
            self.exchanges.iter().take(2).collect()
        } else {
            strategy
                .exchanges
                .iter()
                .map(|name| {
                    self.exchanges
                        .iter()
                        .find(|e| &e.name == name)
                        .ok_or_else(|| ConfigError::UnknownExchange(name.clone()))
                })
                .collect::<Result<_, _>>()?
        };

        match selected.as_slice() {
            [a, b] => Ok((a, b)),
            _ => Err(ConfigError::NotEnoughExchanges {
                strategy: strategy.name.clone(),
                found: selected.len(),
            }),
        }
    }

    /// Build one engine config per strategy. Each exchange gets a single feed
    /// instance shared by every strategy that uses it.
    pub fn engine_configs(
        &self,
        registry: &FeedRegistry,
    ) -> Result<Vec<(String, EngineConfig)>, ConfigError> {
        let mut feeds: HashMap<String, Arc<dyn PriceFeed>> = HashMap::new();
        for exchange in &self.exchanges {
            feeds.insert(exchange.name.clone(), registry.build(exchange)?);
        }

        self.strategies
            .iter()
            .map(|strategy| {
                let (a, b) = self.exchanges_for(strategy)?;
                let feed = |name: &str| {
                    feeds
                        .get(name)
                        .cloned()
                        .ok_or_else(|| ConfigError::UnknownExchange(name.to_string()))
                };
                let config = strategy.engine_config(feed(&a.name)?, feed(&b.name)?)?;
                Ok((strategy.name.clone(), config))
            })
            .collect()
    }
}

impl StrategyConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.trading_pair()?;

        if self.interval_ms == 0 {
            return Err(ConfigError::InvalidInterval {
                strategy: self.name.clone(),
            });
        }

        let negative = self.slippage.is_sign_negative() && !self.slippage.is_zero();
        if negative || self.slippage >= Decimal::ONE {
            return Err(ConfigError::InvalidSlippage {
                strategy: self.name.clone(),
                slippage: self.slippage,
            });
        }

        if self.ready_timeout_ms == Some(0) {
            return Err(ConfigError::InvalidReadyTimeout {
                strategy: self.name.clone(),
            });
        }

        Ok(())
    }

    pub fn trading_pair(&self) -> Result<TradingPair, ConfigError> {
        TradingPair::parse(&self.trading_pair).map_err(|source| ConfigError::InvalidSymbol {
            strategy: self.name.clone(),
            source,
        })
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Engine settings for this strategy over two feeds
    pub fn engine_config(
        &self,
        feed_a: Arc<dyn PriceFeed>,
        feed_b: Arc<dyn PriceFeed>,
    ) -> Result<EngineConfig, ConfigError> {
        self.validate()?;

        let config = EngineConfig::new(
            self.trading_pair()?,
            self.interval(),
            self.slippage,
            feed_a,
            feed_b,
        );

        Ok(match self.ready_timeout_ms {
            Some(ms) => config.with_ready_timeout(Duration::from_millis(ms)),
            None => config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchanges::MockFeed;
    use std::str::FromStr;

    const SAMPLE: &str = r#"
        [[exchanges]]
        name = "binance"
        fees = 0.001
        testing = true

        [[exchanges]]
        name = "1inch"
        fees = 0.002

        [[strategies]]
        name = "btc-usdt"
        trading_pair = "BTC-USDT"
        interval_ms = 500
        slippage = 0.0005
        ready_timeout_ms = 30000
    "#;

    fn strategy(pair: &str, interval_ms: u64, slippage: &str) -> StrategyConfig {
        StrategyConfig {
            name: "test".to_string(),
            trading_pair: pair.to_string(),
            interval_ms,
            slippage: Decimal::from_str(slippage).unwrap(),
            exchanges: Vec::new(),
            ready_timeout_ms: None,
        }
    }

    #[test]
    fn test_parse_sample_config() {
        let config = AppConfig::from_toml_str(SAMPLE).unwrap();

        assert_eq!(config.exchanges.len(), 2);
        assert_eq!(config.exchanges[0].fees, Decimal::from_str("0.001").unwrap());
        assert!(config.exchanges[0].testing);
        assert!(!config.exchanges[1].testing);

        let strategy = &config.strategies[0];
        assert_eq!(strategy.interval(), Duration::from_millis(500));
        assert_eq!(strategy.slippage, Decimal::from_str("0.0005").unwrap());
        assert_eq!(strategy.trading_pair().unwrap(), TradingPair::new("BTC", "USDT"));
    }

    #[test]
    fn test_defaults_to_first_two_exchanges() {
        let config = AppConfig::from_toml_str(SAMPLE).unwrap();
        let (a, b) = config.exchanges_for(&config.strategies[0]).unwrap();
        assert_eq!((a.name.as_str(), b.name.as_str()), ("binance", "1inch"));
    }

    #[test]
    fn test_named_exchanges_are_resolved_in_order() {
        let mut config = AppConfig::from_toml_str(SAMPLE).unwrap();
        config.strategies[0].exchanges = vec!["1inch".to_string(), "binance".to_string()];

        let (a, b) = config.exchanges_for(&config.strategies[0]).unwrap();
        assert_eq!((a.name.as_str(), b.name.as_str()), ("1inch", "binance"));

        config.strategies[0].exchanges = vec!["1inch".to_string(), "kraken".to_string()];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnknownExchange(name)) if name == "kraken"
        ));
    }

    #[test]
    fn test_single_exchange_is_rejected() {
        let toml = r#"
            [[exchanges]]
            name = "binance"

            [[strategies]]
            name = "lonely"
            trading_pair = "BTCUSDT"
        "#;
        assert!(matches!(
            AppConfig::from_toml_str(toml),
            Err(ConfigError::NotEnoughExchanges { found: 1, .. })
        ));
    }

    #[test]
    fn test_strategy_validation() {
        assert!(strategy("BTC-USDT", 1000, "0.0005").validate().is_ok());
        assert!(matches!(
            strategy("BTC", 1000, "0").validate(),
            Err(ConfigError::InvalidSymbol { source: FeedError::InvalidSymbol(_), .. })
        ));
        assert!(matches!(
            strategy("BTC-USDT", 0, "0").validate(),
            Err(ConfigError::InvalidInterval { .. })
        ));
        assert!(matches!(
            strategy("BTC-USDT", 1000, "1").validate(),
            Err(ConfigError::InvalidSlippage { .. })
        ));
        assert!(matches!(
            strategy("BTC-USDT", 1000, "-0.1").validate(),
            Err(ConfigError::InvalidSlippage { .. })
        ));

        let mut never_ready = strategy("BTC-USDT", 1000, "0");
        never_ready.ready_timeout_ms = Some(0);
        assert!(matches!(
            never_ready.validate(),
            Err(ConfigError::InvalidReadyTimeout { .. })
        ));
    }

    #[test]
    fn test_negative_fee_is_rejected() {
        let toml = r#"
            [[exchanges]]
            name = "binance"
            fees = -0.001
        "#;
        assert!(matches!(
            AppConfig::from_toml_str(toml),
            Err(ConfigError::InvalidFee { .. })
        ));
    }

    #[test]
    fn test_bad_toml_is_a_parse_error() {
        assert!(matches!(
            AppConfig::from_toml_str("[[exchanges]\nname ="),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        match AppConfig::load("/nonexistent/arbitrage.toml") {
            Err(ConfigError::Io { path, .. }) => assert_eq!(path, "/nonexistent/arbitrage.toml"),
            other => panic!("expected Io error, got {:?}", other),
        }
    }

    #[test]
    fn test_engine_config_carries_timeout() {
        let mut config = strategy("ETH_USDC", 250, "0.001");
        config.ready_timeout_ms = Some(1500);

        let engine = config
            .engine_config(
                Arc::new(MockFeed::new("a", Decimal::ZERO)),
                Arc::new(MockFeed::new("b", Decimal::ZERO)),
            )
            .unwrap();

        assert_eq!(engine.pair, TradingPair::new("ETH", "USDC"));
        assert_eq!(engine.interval, Duration::from_millis(250));
        assert_eq!(engine.ready_timeout, Some(Duration::from_millis(1500)));
        assert_eq!(engine.feed_a.name(), "a");
    }

    #[test]
    fn test_engine_configs_share_feeds() {
        let toml = r#"
            [[exchanges]]
            name = "mock-a"
            fees = 0.001

            [[exchanges]]
            name = "mock-b"

            [[strategies]]
            name = "btc"
            trading_pair = "BTC-USDT"

            [[strategies]]
            name = "eth"
            trading_pair = "ETH-USDT"
        "#;
        let config = AppConfig::from_toml_str(toml).unwrap();

        let mut registry = FeedRegistry::new();
        registry.register("mock-a", |cfg: &ExchangeConfig| {
            Arc::new(MockFeed::new(cfg.name.clone(), cfg.fees)) as Arc<dyn PriceFeed>
        });
        registry.register("mock-b", |cfg: &ExchangeConfig| {
            Arc::new(MockFeed::new(cfg.name.clone(), cfg.fees)) as Arc<dyn PriceFeed>
        });

        let engines = config.engine_configs(&registry).unwrap();
        assert_eq!(engines.len(), 2);
        assert_eq!(engines[0].0, "btc");
        assert!(Arc::ptr_eq(&engines[0].1.feed_a, &engines[1].1.feed_a));
        assert_eq!(engines[0].1.feed_a.fees(), Decimal::from_str("0.001").unwrap());
    }
}
