use crate::types::Price;
use rust_decimal::Decimal;

/// Result of evaluating one buy/sell leg pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfitBreakdown {
    /// sell x (1 - slippage)
    pub sell_adjusted: Price,
    /// buy x (1 + slippage)
    pub buy_adjusted: Price,
    /// Fee charged by the selling exchange
    pub sell_fee: Price,
    /// Fee charged by the buying exchange
    pub buy_fee: Price,
    /// Signed profit per unit of base asset
    pub profit: Decimal,
}

impl ProfitBreakdown {
    pub fn total_fee(&self) -> Price {
        self.sell_fee + self.buy_fee
    }

    pub fn is_profitable(&self) -> bool {
        self.profit > Decimal::ZERO
    }
}

/// Profit of selling at `sell_price` and buying at `buy_price` after slippage
/// and fees.
///
/// Fees are charged on the unadjusted prices:
/// `(sell(1 - slip) - buy(1 + slip)) - (sell * seller_fee + buy * buyer_fee)`
///
/// Returns `None` if any intermediate value leaves the decimal range.
pub fn calculate_profit(
    sell_price: Price,
    buy_price: Price,
    seller_fee_rate: Decimal,
    buyer_fee_rate: Decimal,
    slippage: Decimal,
) -> Option<ProfitBreakdown> {
    let sell_adjusted = sell_price.checked_mul(Decimal::ONE.checked_sub(slippage)?)?;
    let buy_adjusted = buy_price.checked_mul(Decimal::ONE.checked_add(slippage)?)?;

    let sell_fee = sell_price.checked_mul(seller_fee_rate)?;
    let buy_fee = buy_price.checked_mul(buyer_fee_rate)?;

    let spread = sell_adjusted.checked_sub(buy_adjusted)?;
    let total_fee = sell_fee.checked_add(buy_fee)?;
    let profit = spread.checked_sub(total_fee)?.value();

    Some(ProfitBreakdown {
        sell_adjusted,
        buy_adjusted,
        sell_fee,
        buy_fee,
        profit,
    })
}
