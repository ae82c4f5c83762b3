//! Record calculator: builds a `TraderRecord` from a closed-trade history.
//!
//! This is the feed-side computation behind store snapshots: the performance
//! feed resolves trades, and this module turns them into the windowed ROI,
//! drawdown, and risk classification the ranking engine consumes.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::models::{RiskLevel, TraderRecord};

/// Volatility thresholds (std dev of per-trade returns, percent) splitting
/// traders into low / medium / high risk.
const LOW_RISK_VOLATILITY: f64 = 5.0;
const HIGH_RISK_VOLATILITY: f64 = 15.0;

/// One resolved trade from a trader's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeOutcome {
    /// Asset symbol traded
    pub asset: String,

    /// Realized return of the trade, signed percent
    pub pnl_pct: Decimal,

    pub opened_at: DateTime<Utc>,

    pub closed_at: DateTime<Utc>,
}

/// Identity fields for the record being built.
#[derive(Debug, Clone)]
pub struct TraderIdentity {
    pub id: String,
    pub name: String,
    pub address: String,
    pub verified: bool,
}

/// Calculator for trader performance records.
pub struct RecordCalculator;

impl RecordCalculator {
    /// Build a full performance record from resolved trades.
    pub fn calculate(identity: TraderIdentity, trades: &[TradeOutcome]) -> TraderRecord {
        let now = Utc::now();

        let wins = trades.iter().filter(|t| t.pnl_pct > Decimal::ZERO).count();
        let win_rate = if trades.is_empty() {
            0.0
        } else {
            wins as f64 / trades.len() as f64 * 100.0
        };

        let mut distribution: HashMap<String, u32> = HashMap::new();
        for trade in trades {
            *distribution.entry(trade.asset.to_uppercase()).or_default() += 1;
        }

        let avg_duration_hours = if trades.is_empty() {
            0.0
        } else {
            trades
                .iter()
                .map(|t| (t.closed_at - t.opened_at).num_minutes() as f64 / 60.0)
                .sum::<f64>()
                / trades.len() as f64
        };

        TraderRecord {
            id: identity.id,
            name: identity.name,
            address: identity.address,
            verified: identity.verified,
            win_rate,
            roi: Self::windowed_roi(trades, None, now),
            roi_7d: Self::windowed_roi(trades, Some(Duration::days(7)), now),
            roi_30d: Self::windowed_roi(trades, Some(Duration::days(30)), now),
            roi_90d: Self::windowed_roi(trades, Some(Duration::days(90)), now),
            risk_level: Self::classify_risk(trades),
            total_trades: trades.len() as u32,
            avg_trade_duration_hours: avg_duration_hours,
            asset_distribution: distribution,
            max_drawdown: Self::max_drawdown(trades),
            updated_at: now,
        }
    }

    /// Sum of realized returns for trades closed inside the window.
    fn windowed_roi(
        trades: &[TradeOutcome],
        window: Option<Duration>,
        now: DateTime<Utc>,
    ) -> Decimal {
        trades
            .iter()
            .filter(|t| window.map_or(true, |w| t.closed_at >= now - w))
            .map(|t| t.pnl_pct)
            .sum()
    }

    /// Peak-to-trough decline of the cumulative return curve, as a fraction
    /// of peak equity. Trades are walked in close order.
    fn max_drawdown(trades: &[TradeOutcome]) -> f64 {
        let mut ordered: Vec<&TradeOutcome> = trades.iter().collect();
        ordered.sort_by_key(|t| t.closed_at);

        // Equity starts at 100 so percent returns map directly onto it.
        let mut equity = 100.0f64;
        let mut peak = equity;
        let mut max_dd = 0.0f64;

        for trade in ordered {
            equity += trade.pnl_pct.to_f64().unwrap_or(0.0);
            if equity > peak {
                peak = equity;
            }
            if peak > 0.0 {
                let dd = (peak - equity) / peak;
                if dd > max_dd {
                    max_dd = dd;
                }
            }
        }

        max_dd.clamp(0.0, 1.0)
    }

    /// Classify risk from the volatility of per-trade returns.
    fn classify_risk(trades: &[TradeOutcome]) -> RiskLevel {
        if trades.len() < 2 {
            return RiskLevel::Medium;
        }

        let returns: Vec<f64> = trades
            .iter()
            .filter_map(|t| t.pnl_pct.to_f64())
            .collect();
        let volatility = returns.std_dev();

        if volatility < LOW_RISK_VOLATILITY {
            RiskLevel::Low
        } else if volatility < HIGH_RISK_VOLATILITY {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn identity() -> TraderIdentity {
        TraderIdentity {
            id: "1".to_string(),
            name: "CryptoWhale".to_string(),
            address: "0x1a2b".to_string(),
            verified: true,
        }
    }

    fn outcome(asset: &str, pnl: Decimal, days_ago: i64) -> TradeOutcome {
        let closed = Utc::now() - Duration::days(days_ago);
        TradeOutcome {
            asset: asset.to_string(),
            pnl_pct: pnl,
            opened_at: closed - Duration::hours(12),
            closed_at: closed,
        }
    }

    #[test]
    fn test_win_rate_and_distribution() {
        let trades = vec![
            outcome("APT", dec!(10), 1),
            outcome("apt", dec!(-5), 2),
            outcome("BTC", dec!(20), 3),
            outcome("BTC", dec!(-3), 4),
            outcome("ETH", dec!(15), 5),
        ];

        let record = RecordCalculator::calculate(identity(), &trades);
        assert_eq!(record.total_trades, 5);
        assert!((record.win_rate - 60.0).abs() < 0.001);
        assert_eq!(record.asset_distribution["APT"], 2);
        assert_eq!(record.asset_distribution["BTC"], 2);
        assert!((record.avg_trade_duration_hours - 12.0).abs() < 0.01);
    }

    #[test]
    fn test_windowed_roi() {
        let trades = vec![
            outcome("APT", dec!(10), 2),   // inside 7d
            outcome("APT", dec!(20), 20),  // inside 30d
            outcome("APT", dec!(30), 60),  // inside 90d
            outcome("APT", dec!(40), 200), // all-time only
        ];

        let record = RecordCalculator::calculate(identity(), &trades);
        assert_eq!(record.roi_7d, dec!(10));
        assert_eq!(record.roi_30d, dec!(30));
        assert_eq!(record.roi_90d, dec!(60));
        assert_eq!(record.roi, dec!(100));
    }

    #[test]
    fn test_max_drawdown() {
        // Equity: 110 (peak) -> 80 -> 100; trough is 30/110 off the peak
        let trades = vec![
            outcome("APT", dec!(10), 4),
            outcome("APT", dec!(-30), 3),
            outcome("APT", dec!(20), 2),
        ];

        let record = RecordCalculator::calculate(identity(), &trades);
        assert!((record.max_drawdown - 30.0 / 110.0).abs() < 1e-9);
    }

    #[test]
    fn test_risk_classification() {
        let steady: Vec<_> = (1..=10).map(|i| outcome("APT", dec!(2), i)).collect();
        let record = RecordCalculator::calculate(identity(), &steady);
        assert_eq!(record.risk_level, RiskLevel::Low);

        let wild = vec![
            outcome("APT", dec!(80), 1),
            outcome("APT", dec!(-60), 2),
            outcome("APT", dec!(45), 3),
            outcome("APT", dec!(-30), 4),
        ];
        let record = RecordCalculator::calculate(identity(), &wild);
        assert_eq!(record.risk_level, RiskLevel::High);
    }

    #[test]
    fn test_empty_history() {
        let record = RecordCalculator::calculate(identity(), &[]);
        assert_eq!(record.total_trades, 0);
        assert_eq!(record.win_rate, 0.0);
        assert_eq!(record.roi, Decimal::ZERO);
        assert!(record.validate().is_ok());
    }
}
