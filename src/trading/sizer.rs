//! Stake sizing for mirrored trades.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::models::CopyTradePolicy;

/// Stakes below this are not worth opening a position for.
const DUST_THRESHOLD: Decimal = dec!(0.01);

/// Computes how much of a policy's capital one mirrored trade may use.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionSizer;

impl PositionSizer {
    pub fn new() -> Self {
        Self
    }

    /// Stake for the next mirrored trade, in the investment currency.
    ///
    /// Capped by the policy's per-trade limit and by whatever capital the
    /// policy has not already deployed into open positions. Returns zero
    /// when the remainder is dust.
    pub fn stake(&self, policy: &CopyTradePolicy, open_exposure: Decimal) -> Decimal {
        let remaining = policy.investment_amount - open_exposure;
        if remaining <= DUST_THRESHOLD {
            return Decimal::ZERO;
        }

        let stake = policy.per_trade_cap().min(remaining);
        if stake <= DUST_THRESHOLD {
            return Decimal::ZERO;
        }
        stake
    }

    /// Token amount bought with `stake` at `entry_price`.
    pub fn amount(&self, stake: Decimal, entry_price: Decimal) -> Decimal {
        if entry_price <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        stake / entry_price
    }
}
