use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Mul, Sub};
use std::str::FromStr;

/// Quoted price in the pair's quote asset.
///
/// Kept apart from fee rates and slippage fractions, which stay plain
/// `Decimal`s. Serialized as a string so no precision is lost on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Price(pub Decimal);

impl Price {
    pub const ZERO: Price = Price(Decimal::ZERO);

    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Parse an exchange price string such as `"25.35190000"`
    pub fn from_str(s: &str) -> Result<Self, rust_decimal::Error> {
        Decimal::from_str(s.trim()).map(Self)
    }

    /// Strictly below zero; `-0` counts as zero
    pub fn is_sign_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// `None` when the product overflows the decimal range
    pub fn checked_mul(self, rate: Decimal) -> Option<Price> {
        self.0.checked_mul(rate).map(Price)
    }

    pub fn checked_add(self, rhs: Price) -> Option<Price> {
        self.0.checked_add(rhs.0).map(Price)
    }

    pub fn checked_sub(self, rhs: Price) -> Option<Price> {
        self.0.checked_sub(rhs.0).map(Price)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<Decimal> for Price {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl TryFrom<String> for Price {
    type Error = rust_decimal::Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Price::from_str(&s)
    }
}

impl From<Price> for String {
    fn from(price: Price) -> Self {
        price.0.to_string()
    }
}

impl Add for Price {
    type Output = Price;

    fn add(self, rhs: Price) -> Price {
        Price(self.0 + rhs.0)
    }
}

impl Sub for Price {
    type Output = Price;

    fn sub(self, rhs: Price) -> Price {
        Price(self.0 - rhs.0)
    }
}

/// Scaling by a rate (fee, slippage factor) keeps the unit
impl Mul<Decimal> for Price {
    type Output = Price;

    fn mul(self, rate: Decimal) -> Price {
        Price(self.0 * rate)
    }
}

/// Top-of-book quote from a single feed.
///
/// No relation between `ask` and `bid` is enforced; feeds may transiently
/// report a crossed book and the engine evaluates it as delivered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    /// Price a buyer pays to take liquidity
    pub ask: Price,
    /// Price a seller receives to take liquidity
    pub bid: Price,
}

impl Quote {
    pub fn new(ask: Price, bid: Price) -> Self {
        Self { ask, bid }
    }

    /// Build a quote from the string prices exchanges put on the wire
    pub fn from_strs(ask: &str, bid: &str) -> Result<Self, rust_decimal::Error> {
        Ok(Self {
            ask: Price::from_str(ask)?,
            bid: Price::from_str(bid)?,
        })
    }

    /// Both sides non-negative
    pub fn is_well_formed(&self) -> bool {
        !self.ask.is_sign_negative() && !self.bid.is_sign_negative()
    }
}
