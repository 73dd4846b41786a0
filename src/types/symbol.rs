use crate::exchanges::error::FeedError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// {base}:{quote}, {base}-{quote}, {base}_{quote}, {base}/{quote}
static SEPARATED_PAIR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<base>[A-Za-z]+)[:/\-_](?P<quote>[A-Za-z]+)$")
        .expect("trading pair pattern is valid")
});

static CONCATENATED_PAIR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z]+$").expect("trading pair pattern is valid"));

/// Quote assets recognised when a symbol has no separator, longest first so
/// that `BTCUSDT` resolves to USDT rather than a shorter suffix.
const KNOWN_QUOTE_ASSETS: &[&str] = &[
    "FDUSD", "USDT", "USDC", "BUSD", "TUSD", "DAI", "USD", "EUR", "BTC", "ETH", "BNB",
];

/// Trading pair split into base and quote asset (e.g. BTC/USDT)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TradingPair {
    base: String,
    quote: String,
}

impl TradingPair {
    /// Create a pair from already separated assets
    pub fn new(base: impl Into<String>, quote: impl Into<String>) -> Self {
        Self {
            base: base.into().to_uppercase(),
            quote: quote.into().to_uppercase(),
        }
    }

    /// Parse a ticker symbol of the form `base[:/-_]?quote`
    pub fn parse(symbol: &str) -> Result<Self, FeedError> {
        let symbol = symbol.trim();

        if let Some(captures) = SEPARATED_PAIR.captures(symbol) {
            return Ok(Self::new(&captures["base"], &captures["quote"]));
        }

        if CONCATENATED_PAIR.is_match(symbol) {
            let upper = symbol.to_uppercase();
            for quote in KNOWN_QUOTE_ASSETS {
                if let Some(base) = upper.strip_suffix(quote) {
                    if !base.is_empty() {
                        return Ok(Self::new(base, *quote));
                    }
                }
            }
        }

        Err(FeedError::InvalidSymbol(symbol.to_string()))
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn quote(&self) -> &str {
        &self.quote
    }

    /// Symbol without delimiter, as most exchanges key their markets
    pub fn concat(&self) -> String {
        format!("{}{}", self.base, self.quote)
    }
}

impl FromStr for TradingPair {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TradingPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}
