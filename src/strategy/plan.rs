use crate::strategy::profit::calculate_profit;
use crate::types::{Price, TradingPair};
use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

/// One side of a cross-exchange trade
#[derive(Debug, Clone, Copy)]
pub struct Leg<'a> {
    pub exchange: &'a str,
    pub price: Price,
    pub fee_rate: Decimal,
}

impl<'a> Leg<'a> {
    pub fn new(exchange: &'a str, price: Price, fee_rate: Decimal) -> Self {
        Self {
            exchange,
            price,
            fee_rate,
        }
    }
}

/// Snapshot of one arbitrage direction at one tick.
///
/// Created per tick and direction, handed to a [`PlanSink`](crate::strategy::PlanSink)
/// and then discarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArbitragePlan {
    pub pair: TradingPair,
    pub timestamp: DateTime<Utc>,
    pub buy_exchange: String,
    pub buy_price: Price,
    pub sell_exchange: String,
    pub sell_price: Price,
    pub profit: Decimal,
    pub slippage: Decimal,
    pub total_fee: Price,
}

impl ArbitragePlan {
    /// Price the plan of buying on `buy` and selling on `sell`.
    /// Each leg pays the fee rate of its own exchange.
    ///
    /// `None` when the prices are too large for the profit to be represented.
    pub fn evaluate(
        pair: &TradingPair,
        timestamp: DateTime<Utc>,
        buy: Leg<'_>,
        sell: Leg<'_>,
        slippage: Decimal,
    ) -> Option<Self> {
        let breakdown = calculate_profit(sell.price, buy.price, sell.fee_rate, buy.fee_rate, slippage)?;

        Some(Self {
            pair: pair.clone(),
            timestamp,
            buy_exchange: buy.exchange.to_string(),
            buy_price: buy.price,
            sell_exchange: sell.exchange.to_string(),
            sell_price: sell.price,
            profit: breakdown.profit,
            slippage,
            total_fee: breakdown.total_fee(),
        })
    }

    pub fn is_profitable(&self) -> bool {
        self.profit > Decimal::ZERO
    }

    /// Column titles matching the `Display` row layout
    pub fn header() -> String {
        format!(
            "{:<20} | {:<15} | {:<15} | {:<15} | {:<15} | {:<15} | {:<15} | {:<10} | {:<10} | {:<7} |",
            "Timestamp",
            "Trading Pair",
            "Buy Exchange",
            "Buy Price",
            "Sell Exchange",
            "Sell Price",
            "Profit",
            "Slippage",
            "Total fee",
            "Profit?",
        )
    }

    pub fn divider() -> String {
        "-".repeat(Self::header().len())
    }
}

impl fmt::Display for ArbitragePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<20} | {:<15} | {:<15} | {:<15} | {:<15} | {:<15} | {:<15} | {:>10} | {:>10} | {:<7} |",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.pair.to_string(),
            self.buy_exchange,
            format!("{:.4}", self.buy_price.value()),
            self.sell_exchange,
            format!("{:.4}", self.sell_price.value()),
            format!("{:.4}", self.profit),
            format!("{:.4}", self.slippage),
            format!("{:.4}", self.total_fee.value()),
            if self.is_profitable() { "yes" } else { "no" },
        )
    }
}
