//! The shipped example config must load and wire up against the default feeds.

use crypto_arb::{AppConfig, FeedRegistry, TradingPair};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::time::Duration;

fn example_config_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config.example.toml")
}

#[test]
fn test_example_config_loads() {
    let config = AppConfig::load(example_config_path()).unwrap();

    assert_eq!(config.exchanges.len(), 2);
    assert_eq!(config.exchanges[1].fees, Decimal::new(2, 3));
    assert_eq!(config.strategies.len(), 2);
    assert_eq!(
        config.strategies[1].trading_pair().unwrap(),
        TradingPair::new("ETH", "USDT")
    );
}

#[test]
fn test_example_config_builds_engines_from_default_registry() {
    let config = AppConfig::load(example_config_path()).unwrap();
    let engines = config.engine_configs(&FeedRegistry::with_defaults()).unwrap();

    let names: Vec<&str> = engines.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["btc-usdt", "eth-usdt"]);

    let (_, btc) = &engines[0];
    assert_eq!(btc.feed_a.name(), "binance");
    assert_eq!(btc.feed_b.name(), "1inch");
    assert_eq!(btc.feed_b.fees(), Decimal::new(2, 3));
    assert_eq!(btc.ready_timeout, None);

    let (_, eth) = &engines[1];
    assert_eq!(eth.interval, Duration::from_secs(2));
    assert_eq!(eth.ready_timeout, Some(Duration::from_secs(30)));
}
