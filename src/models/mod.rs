//! Data models for traders, policies, positions, and signals.

mod policy;
mod position;
mod signal;
mod trader;

pub use policy::{
    CopyTradePolicy, PolicyParams, MAX_INVESTMENT, MAX_PER_TRADE_PCT, MAX_STOP_LOSS_PCT,
    MIN_INVESTMENT, MIN_PER_TRADE_PCT, MIN_STOP_LOSS_PCT,
};
pub use position::{CloseReason, Position, PositionState};
pub use signal::{SignalKind, TradeSignal};
pub use trader::{RiskLevel, TimeWindow, TraderRecord};
