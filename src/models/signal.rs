//! Trade signals emitted by the external signal source.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Whether the trader entered or exited a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    Enter,
    Exit,
}

/// A trader action observed on the signal feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeSignal {
    /// Trader the signal belongs to
    pub trader_id: String,

    /// Asset symbol traded
    pub asset: String,

    /// Execution price
    pub price: Decimal,

    #[serde(rename = "eventType")]
    pub kind: SignalKind,

    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}
