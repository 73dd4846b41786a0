use crate::config::{ConfigError, ExchangeConfig};
use crate::exchanges::{BinanceFeed, CoinGeckoFeed};
use crate::traits::PriceFeed;
use std::collections::HashMap;
use std::sync::Arc;

type FeedConstructor = Box<dyn Fn(&ExchangeConfig) -> Arc<dyn PriceFeed> + Send + Sync>;

/// Maps exchange identifiers to feed constructors.
///
/// Built at composition time and passed to whoever turns configuration into
/// engines; unknown identifiers are reported as [`ConfigError::UnknownExchange`].
#[derive(Default)]
pub struct FeedRegistry {
    constructors: HashMap<String, FeedConstructor>,
}

impl FeedRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in Binance and CoinGecko/1inch feeds
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("binance", |config: &ExchangeConfig| {
            Arc::new(BinanceFeed::new(config.fees, config.testing)) as Arc<dyn PriceFeed>
        });
        registry.register("1inch", |config: &ExchangeConfig| {
            Arc::new(CoinGeckoFeed::new("1inch", config.fees)) as Arc<dyn PriceFeed>
        });
        registry.register("coingecko", |config: &ExchangeConfig| {
            Arc::new(CoinGeckoFeed::new("coingecko", config.fees)) as Arc<dyn PriceFeed>
        });
        registry
    }

    /// Add or replace the constructor for `name`
    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F)
    where
        F: Fn(&ExchangeConfig) -> Arc<dyn PriceFeed> + Send + Sync + 'static,
    {
        self.constructors.insert(name.into(), Box::new(constructor));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Registered identifiers, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Construct the feed described by `config`
    pub fn build(&self, config: &ExchangeConfig) -> Result<Arc<dyn PriceFeed>, ConfigError> {
        let constructor = self
            .constructors
            .get(&config.name)
            .ok_or_else(|| ConfigError::UnknownExchange(config.name.clone()))?;
        Ok(constructor(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn exchange(name: &str, fees: Decimal) -> ExchangeConfig {
        ExchangeConfig {
            name: name.to_string(),
            fees,
            testing: false,
        }
    }

    #[test]
    fn test_default_registry() {
        let registry = FeedRegistry::with_defaults();
        assert_eq!(registry.names(), vec!["1inch", "binance", "coingecko"]);

        let feed = registry.build(&exchange("binance", Decimal::new(1, 3))).unwrap();
        assert_eq!(feed.name(), "binance");
        assert_eq!(feed.fees(), Decimal::new(1, 3));

        let feed = registry.build(&exchange("1inch", Decimal::new(2, 3))).unwrap();
        assert_eq!(feed.name(), "1inch");
        assert_eq!(feed.fees(), Decimal::new(2, 3));
    }

    #[test]
    fn test_unknown_exchange_is_a_typed_error() {
        let registry = FeedRegistry::with_defaults();
        match registry.build(&exchange("kraken", Decimal::ZERO)) {
            Err(ConfigError::UnknownExchange(name)) => assert_eq!(name, "kraken"),
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("kraken is not registered"),
        }
    }

    #[test]
    fn test_register_replaces_constructor() {
        let mut registry = FeedRegistry::new();
        assert!(!registry.contains("binance"));

        registry.register("binance", |config: &ExchangeConfig| {
            Arc::new(crate::exchanges::MockFeed::new("stub", config.fees)) as Arc<dyn PriceFeed>
        });
        assert!(registry.contains("binance"));
        assert_eq!(
            registry.build(&exchange("binance", Decimal::ZERO)).unwrap().name(),
            "stub"
        );
    }
}
