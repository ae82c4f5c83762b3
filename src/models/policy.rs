//! Copy-trade policy: a user's validated risk parameters for one trader.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Allowed bounds for policy parameters, matching the setup form.
pub const MIN_INVESTMENT: Decimal = dec!(10);
pub const MAX_INVESTMENT: Decimal = dec!(10000);
pub const MIN_STOP_LOSS_PCT: Decimal = dec!(5);
pub const MAX_STOP_LOSS_PCT: Decimal = dec!(50);
pub const MIN_PER_TRADE_PCT: Decimal = dec!(5);
pub const MAX_PER_TRADE_PCT: Decimal = dec!(100);

/// Raw risk parameters as entered by the user, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyParams {
    /// Total capital committed to copying this trader
    pub investment_amount: Decimal,

    /// Loss percentage that triggers an automatic exit
    pub stop_loss_pct: Decimal,

    /// Maximum percentage of the investment used for a single trade
    pub max_per_trade_pct: Decimal,

    /// Whether stop-loss breaches close the position automatically
    pub auto_exit: bool,
}

/// A fully validated copy-trade policy.
///
/// Policies are pure values: there is no in-place mutation, so every active
/// policy is known to have passed validation at construction time. Changing
/// a parameter means rebuilding through the
/// [`crate::trading::PolicyBuilder`]. Derived equality makes rebuilding with
/// identical inputs yield an equal value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyTradePolicy {
    /// Owning user
    pub user_id: String,

    /// The single trader this policy mirrors
    pub trader_id: String,

    /// Total capital committed
    pub investment_amount: Decimal,

    /// Stop-loss threshold, percent
    pub stop_loss_pct: Decimal,

    /// Per-trade cap, percent of the investment
    pub max_per_trade_pct: Decimal,

    /// Auto-exit on stop-loss breach
    pub auto_exit: bool,
}

impl CopyTradePolicy {
    /// Largest stake a single mirrored trade may use.
    pub fn per_trade_cap(&self) -> Decimal {
        self.investment_amount * self.max_per_trade_pct / dec!(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_trade_cap() {
        let policy = CopyTradePolicy {
            user_id: "user-1".to_string(),
            trader_id: "1".to_string(),
            investment_amount: dec!(1000),
            stop_loss_pct: dec!(10),
            max_per_trade_pct: dec!(25),
            auto_exit: true,
        };

        assert_eq!(policy.per_trade_cap(), dec!(250));
    }
}
