//! Trader record: one leaderboard snapshot of a trader's performance.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Risk classification derived from a trader's return volatility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

impl FromStr for RiskLevel {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(RiskLevel::Low),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            other => Err(EngineError::InvalidQuery(format!(
                "unknown risk level: {other}"
            ))),
        }
    }
}

/// Time window a query's ROI filter and sort apply over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeWindow {
    #[serde(rename = "7d")]
    Seven,
    #[serde(rename = "30d")]
    Thirty,
    #[serde(rename = "90d")]
    Ninety,
    #[default]
    #[serde(rename = "all")]
    All,
}

impl FromStr for TimeWindow {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "7d" => Ok(TimeWindow::Seven),
            "30d" => Ok(TimeWindow::Thirty),
            "90d" => Ok(TimeWindow::Ninety),
            "all" => Ok(TimeWindow::All),
            other => Err(EngineError::InvalidQuery(format!(
                "unknown time window: {other}"
            ))),
        }
    }
}

/// One trader's performance snapshot as supplied by the feed.
///
/// Immutable once ingested; a new feed cycle replaces the whole record via
/// [`crate::store::TraderStore::replace_snapshot`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraderRecord {
    /// Opaque trader id
    pub id: String,

    /// Display name / pseudonym
    #[serde(default)]
    pub name: String,

    /// Wallet address (0x-prefixed)
    pub address: String,

    /// Whether the trader passed verification
    #[serde(default)]
    pub verified: bool,

    /// Win rate as a percentage (0-100)
    pub win_rate: f64,

    /// All-time return on investment, signed percent
    pub roi: Decimal,

    /// ROI over the trailing 7 days
    #[serde(default)]
    pub roi_7d: Decimal,

    /// ROI over the trailing 30 days
    #[serde(default)]
    pub roi_30d: Decimal,

    /// ROI over the trailing 90 days
    #[serde(default)]
    pub roi_90d: Decimal,

    /// Risk classification
    pub risk_level: RiskLevel,

    /// Total number of closed trades
    pub total_trades: u32,

    /// Average trade duration in hours
    #[serde(default)]
    pub avg_trade_duration_hours: f64,

    /// Closed-trade count per asset symbol
    #[serde(default)]
    pub asset_distribution: HashMap<String, u32>,

    /// Maximum drawdown (0.0 to 1.0); consistency input for scoring
    #[serde(default)]
    pub max_drawdown: f64,

    /// When this snapshot was produced
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl TraderRecord {
    /// Check ingestion invariants. Called before a record enters the store.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.win_rate < 0.0 {
            return Err(EngineError::below_minimum("winRate"));
        }
        if self.win_rate > 100.0 {
            return Err(EngineError::above_maximum("winRate"));
        }
        if self.max_drawdown < 0.0 {
            return Err(EngineError::below_minimum("maxDrawdown"));
        }
        if self.max_drawdown > 1.0 {
            return Err(EngineError::above_maximum("maxDrawdown"));
        }
        Ok(())
    }

    /// ROI for the given time window.
    pub fn roi_for(&self, window: TimeWindow) -> Decimal {
        match window {
            TimeWindow::Seven => self.roi_7d,
            TimeWindow::Thirty => self.roi_30d,
            TimeWindow::Ninety => self.roi_90d,
            TimeWindow::All => self.roi,
        }
    }

    /// Whether the trader has any closed trades in the given asset.
    pub fn trades_asset(&self, asset: &str) -> bool {
        self.asset_distribution
            .iter()
            .any(|(sym, count)| *count > 0 && sym.eq_ignore_ascii_case(asset))
    }

    /// Case-insensitive substring match against name or address.
    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        self.name.to_lowercase().contains(&term) || self.address.to_lowercase().contains(&term)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn record(id: &str, roi: Decimal) -> TraderRecord {
        TraderRecord {
            id: id.to_string(),
            name: format!("trader-{id}"),
            address: format!("0x{id}{id}"),
            verified: true,
            win_rate: 70.0,
            roi,
            roi_7d: roi / dec!(10),
            roi_30d: roi / dec!(4),
            roi_90d: roi / dec!(2),
            risk_level: RiskLevel::Medium,
            total_trades: 100,
            avg_trade_duration_hours: 24.0,
            asset_distribution: HashMap::from([("APT".to_string(), 60), ("BTC".to_string(), 40)]),
            max_drawdown: 0.2,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_validate_bounds() {
        let mut r = record("1", dec!(100));
        assert!(r.validate().is_ok());

        r.win_rate = 101.0;
        assert!(matches!(
            r.validate(),
            Err(EngineError::Validation {
                field: "winRate",
                ..
            })
        ));

        r.win_rate = -1.0;
        assert!(r.validate().is_err());
    }

    #[test]
    fn test_asset_and_search_matching() {
        let r = record("1", dec!(100));
        assert!(r.trades_asset("apt"));
        assert!(r.trades_asset("BTC"));
        assert!(!r.trades_asset("ETH"));

        assert!(r.matches_search("TRADER-1"));
        assert!(r.matches_search("0x11"));
        assert!(!r.matches_search("whale"));
    }

    #[test]
    fn test_window_parsing() {
        assert_eq!("30d".parse::<TimeWindow>().unwrap(), TimeWindow::Thirty);
        assert!("14d".parse::<TimeWindow>().is_err());
    }
}
