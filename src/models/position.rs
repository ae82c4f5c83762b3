//! Position model: one mirrored trade from open to close.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::policy::CopyTradePolicy;

/// Lifecycle state of a position. Closed is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionState {
    Open,
    Closed,
}

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// The mirrored trader exited
    Mirrored,
    /// Stop-loss threshold breached with auto-exit enabled
    StopLoss,
    /// Explicit user exit request
    Manual,
}

impl CloseReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloseReason::Mirrored => "mirrored",
            CloseReason::StopLoss => "stop_loss",
            CloseReason::Manual => "manual",
        }
    }
}

/// A position opened by a policy in response to a trader's entry signal.
///
/// The stop-loss parameters are copied from the policy at open time so that
/// transition checks never race a policy lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub id: Uuid,

    /// Owning user (via the policy)
    pub user_id: String,

    /// Trader whose trade this mirrors
    pub trader_id: String,

    /// Asset symbol (e.g. "APT", "BTC")
    pub asset: String,

    /// Price at entry
    pub entry_price: Decimal,

    /// Latest marked price
    pub current_price: Decimal,

    /// Price the position closed at
    pub exit_price: Option<Decimal>,

    /// Token amount held
    pub amount: Decimal,

    pub state: PositionState,

    pub close_reason: Option<CloseReason>,

    /// Profit/loss percent: unrealized while open, frozen at close
    pub pnl_pct: Decimal,

    /// Stop-loss threshold inherited from the policy, percent
    pub stop_loss_pct: Decimal,

    /// Auto-exit flag inherited from the policy
    pub auto_exit: bool,

    pub opened_at: DateTime<Utc>,

    pub closed_at: Option<DateTime<Utc>>,
}

impl Position {
    /// Open a new position for a policy at the given entry price.
    pub fn open(policy: &CopyTradePolicy, asset: String, entry_price: Decimal, amount: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: policy.user_id.clone(),
            trader_id: policy.trader_id.clone(),
            asset,
            entry_price,
            current_price: entry_price,
            exit_price: None,
            amount,
            state: PositionState::Open,
            close_reason: None,
            pnl_pct: Decimal::ZERO,
            stop_loss_pct: policy.stop_loss_pct,
            auto_exit: policy.auto_exit,
            opened_at: Utc::now(),
            closed_at: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.state == PositionState::Open
    }

    /// Mark the position to a new price and recompute unrealized P&L.
    pub fn mark_price(&mut self, price: Decimal) {
        debug_assert!(self.is_open());
        self.current_price = price;
        self.pnl_pct = Self::pnl_between(self.entry_price, price);
    }

    /// Whether the unrealized loss has reached the stop-loss threshold.
    pub fn stop_loss_breached(&self) -> bool {
        self.pnl_pct <= -self.stop_loss_pct
    }

    /// Transition to Closed at the given price; P&L is frozen as realized.
    pub fn close(&mut self, price: Decimal, reason: CloseReason) {
        debug_assert!(self.is_open());
        self.current_price = price;
        self.exit_price = Some(price);
        self.pnl_pct = Self::pnl_between(self.entry_price, price);
        self.state = PositionState::Closed;
        self.close_reason = Some(reason);
        self.closed_at = Some(Utc::now());
    }

    /// Signed percentage move from entry to the given price.
    fn pnl_between(entry: Decimal, price: Decimal) -> Decimal {
        if entry.is_zero() {
            return Decimal::ZERO;
        }
        (price - entry) / entry * dec!(100)
    }

    /// Capital deployed at entry.
    pub fn entry_value(&self) -> Decimal {
        self.amount * self.entry_price
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> CopyTradePolicy {
        CopyTradePolicy {
            user_id: "user-1".to_string(),
            trader_id: "1".to_string(),
            investment_amount: dec!(1000),
            stop_loss_pct: dec!(10),
            max_per_trade_pct: dec!(25),
            auto_exit: true,
        }
    }

    #[test]
    fn test_pnl_tracks_price() {
        let mut pos = Position::open(&policy(), "APT".to_string(), dec!(100), dec!(2));
        assert_eq!(pos.pnl_pct, dec!(0));
        assert_eq!(pos.entry_value(), dec!(200));

        pos.mark_price(dec!(110));
        assert_eq!(pos.pnl_pct, dec!(10));

        pos.mark_price(dec!(88));
        assert_eq!(pos.pnl_pct, dec!(-12));
        assert!(pos.stop_loss_breached());
    }

    #[test]
    fn test_close_freezes_pnl() {
        let mut pos = Position::open(&policy(), "APT".to_string(), dec!(100), dec!(2));
        pos.close(dec!(120), CloseReason::Manual);

        assert_eq!(pos.state, PositionState::Closed);
        assert_eq!(pos.close_reason, Some(CloseReason::Manual));
        assert_eq!(pos.exit_price, Some(dec!(120)));
        assert_eq!(pos.pnl_pct, dec!(20));
        assert!(pos.closed_at.is_some());
    }

    #[test]
    fn test_zero_entry_price() {
        let mut pos = Position::open(&policy(), "APT".to_string(), dec!(0), dec!(2));
        pos.mark_price(dec!(5));
        assert_eq!(pos.pnl_pct, dec!(0));
    }
}
