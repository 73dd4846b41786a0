use crate::exchanges::error::FeedError;
use crate::traits::{quote_channel, PriceFeed, PriceStream, QuotePublisher};
use crate::types::{Price, Quote, TradingPair};
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

const COINGECKO_API_URL: &str = "https://api.coingecko.com/api/v3";

/// Map an exchange ticker to the CoinGecko asset id used by `/simple/price`.
/// Stablecoins are priced against `usd`.
pub fn coingecko_id(token: &str) -> String {
    match token.to_uppercase().as_str() {
        "BTC" => "bitcoin".to_string(),
        "ETH" => "ethereum".to_string(),
        "USDC" | "USDT" | "DAI" => "usd".to_string(),
        other => other.to_lowercase(),
    }
}

/// Aggregator price feed polled over REST.
///
/// 1inch swap rates track the CoinGecko oracle, so the `1inch` exchange is
/// served by this feed. Ask and bid are both set to the oracle price.
pub struct CoinGeckoFeed {
    name: String,
    fees: Decimal,
    base_url: String,
    http_client: Client,
}

impl CoinGeckoFeed {
    pub fn new(name: impl Into<String>, fees: Decimal) -> Self {
        Self {
            name: name.into(),
            fees,
            base_url: COINGECKO_API_URL.to_string(),
            http_client: Client::new(),
        }
    }

    /// Override the API root, e.g. for a local mock server
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Fetch the current oracle price for `pair`
    pub async fn fetch_quote(&self, pair: &TradingPair) -> Result<Quote, FeedError> {
        fetch_quote(&self.http_client, &self.base_url, pair).await
    }
}

async fn fetch_quote(client: &Client, base_url: &str, pair: &TradingPair) -> Result<Quote, FeedError> {
    let ids = coingecko_id(pair.base());
    let vs_currency = coingecko_id(pair.quote());
    let url = format!("{}/simple/price", base_url.trim_end_matches('/'));

    let response = client
        .get(&url)
        .query(&[("ids", ids.as_str()), ("vs_currencies", vs_currency.as_str())])
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(FeedError::Http(format!(
            "price request failed: {}",
            response.status()
        )));
    }

    let json: Value = response.json().await?;

    // {"bitcoin":{"usd":20123.45}}
    let raw = json
        .get(&ids)
        .and_then(|by_currency| by_currency.get(&vs_currency))
        .ok_or_else(|| FeedError::Parse(format!("no {}/{} price in response", ids, vs_currency)))?;

    let value = match raw {
        Value::Number(n) => Decimal::from_str(&n.to_string()),
        Value::String(s) => Decimal::from_str(s),
        other => return Err(FeedError::Parse(format!("unexpected price value: {}", other))),
    }
    .or_else(|_| Decimal::from_scientific(&raw.to_string()))
    .map_err(|e| FeedError::Parse(e.to_string()))?;

    let price = Price::new(value);
    Ok(Quote::new(price, price))
}

async fn poll_prices(
    client: Client,
    base_url: String,
    pair: TradingPair,
    interval: Duration,
    publisher: QuotePublisher,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = publisher.closed() => break,
            _ = ticker.tick() => {
                match fetch_quote(&client, &base_url, &pair).await {
                    Ok(quote) => {
                        publisher.publish(quote);
                    }
                    Err(e) => debug!("coingecko: fetch price for {} failed: {}", pair, e),
                }
            }
        }
    }
}

#[async_trait]
impl PriceFeed for CoinGeckoFeed {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn fees(&self) -> Decimal {
        self.fees
    }

    async fn ping(&self) -> Result<(), FeedError> {
        let url = format!("{}/ping", self.base_url.trim_end_matches('/'));
        let response = self.http_client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(FeedError::Http(format!("ping failed: {}", response.status())));
        }
        Ok(())
    }

    async fn open(&self, pair: &TradingPair, interval: Duration) -> Result<PriceStream, FeedError> {
        if interval.is_zero() {
            return Err(FeedError::InvalidInterval(interval));
        }

        let (publisher, stream) = quote_channel();
        let producer = tokio::spawn(poll_prices(
            self.http_client.clone(),
            self.base_url.clone(),
            pair.clone(),
            interval,
            publisher,
        ));

        Ok(stream.with_producer(producer))
    }
}
