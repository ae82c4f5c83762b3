//! Copy-trading engine: trader ranking, risk-policy validation, and
//! mirrored position tracking.
//!
//! The crate is an in-process library boundary: the presentation layer calls
//! [`ranking::RankingEngine::rank`] for the leaderboard, builds policies
//! through [`trading::PolicyBuilder`], and reads position state from the
//! [`trading::CopyEngine`]. Trader snapshots and trade signals arrive from
//! external feeds as plain values.

pub mod error;
pub mod metrics;
pub mod models;
pub mod ranking;
pub mod store;
pub mod trading;

pub use error::{EngineError, ValidationReason};
pub use models::{
    CloseReason, CopyTradePolicy, PolicyParams, Position, PositionState, RiskLevel, SignalKind,
    TimeWindow, TradeSignal, TraderRecord,
};
pub use ranking::{RankingEngine, RankingQuery, ScoreWeights, SortDirection, SortKey};
pub use store::TraderStore;
pub use trading::{CopyEngine, PolicyBuilder, PositionTracker, SessionContext};
