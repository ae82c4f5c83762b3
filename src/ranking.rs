//! Ranking engine: pure leaderboard ordering and filtering.
//!
//! `rank` is a pure function of `(records, query)`: identical inputs produce
//! identical output, with a deterministic tie-break so the leaderboard never
//! flickers between feed cycles.

use std::cmp::Ordering;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::models::{RiskLevel, TimeWindow, TraderRecord};

/// ROI at or above this normalizes to a full score contribution.
const ROI_SCORE_CAP: f64 = 500.0;

/// Key the leaderboard is ordered by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Roi,
    WinRate,
    TotalTrades,
    /// Composite score (see [`ScoreWeights`])
    Score,
}

impl FromStr for SortKey {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "roi" => Ok(SortKey::Roi),
            "win_rate" | "winrate" => Ok(SortKey::WinRate),
            "total_trades" | "totaltrades" | "trades" => Ok(SortKey::TotalTrades),
            "score" => Ok(SortKey::Score),
            other => Err(EngineError::InvalidQuery(format!(
                "unknown sort key: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

impl FromStr for SortDirection {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Ascending),
            "desc" | "descending" => Ok(SortDirection::Descending),
            other => Err(EngineError::InvalidQuery(format!(
                "unknown sort direction: {other}"
            ))),
        }
    }
}

/// Filter and ordering criteria for one leaderboard request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingQuery {
    /// Keep only traders at this risk level
    #[serde(default)]
    pub risk_level: Option<RiskLevel>,

    /// Keep only traders with closed trades in this asset
    #[serde(default)]
    pub asset: Option<String>,

    /// Window the ROI filter and ROI sort apply over
    #[serde(default)]
    pub window: TimeWindow,

    /// Minimum windowed ROI, percent
    #[serde(default)]
    pub min_roi: Decimal,

    /// Case-insensitive substring match on name or address
    #[serde(default)]
    pub search: Option<String>,

    #[serde(default)]
    pub sort_key: SortKey,

    #[serde(default)]
    pub direction: SortDirection,
}

/// Weights for the composite score terms. The exact values are a product
/// tunable, not a fixed formula, so they can be overridden per deployment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    pub roi: f64,
    pub win_rate: f64,
    pub stability: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            roi: 0.40,
            win_rate: 0.35,
            stability: 0.25,
        }
    }
}

impl ScoreWeights {
    /// Read overrides from `SCORE_WEIGHT_*` env vars, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let read = |key: &str, fallback: f64| {
            std::env::var(key)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(fallback)
        };
        Self {
            roi: read("SCORE_WEIGHT_ROI", defaults.roi),
            win_rate: read("SCORE_WEIGHT_WIN_RATE", defaults.win_rate),
            stability: read("SCORE_WEIGHT_STABILITY", defaults.stability),
        }
    }
}

/// Stateless leaderboard ranking.
#[derive(Debug, Clone, Default)]
pub struct RankingEngine {
    weights: ScoreWeights,
}

impl RankingEngine {
    pub fn new(weights: ScoreWeights) -> Self {
        Self { weights }
    }

    /// Composite score (0-100): normalized windowed ROI, win rate, and an
    /// inverse-volatility term from the trader's max drawdown.
    pub fn composite_score(&self, record: &TraderRecord, window: TimeWindow) -> f64 {
        let roi = record.roi_for(window).to_f64().unwrap_or(0.0);
        let roi_term = (roi / ROI_SCORE_CAP).clamp(0.0, 1.0);
        let win_rate_term = (record.win_rate / 100.0).clamp(0.0, 1.0);
        let stability_term = (1.0 - record.max_drawdown).clamp(0.0, 1.0);

        let total = self.weights.roi + self.weights.win_rate + self.weights.stability;
        if total <= 0.0 {
            return 0.0;
        }

        (self.weights.roi * roi_term
            + self.weights.win_rate * win_rate_term
            + self.weights.stability * stability_term)
            / total
            * 100.0
    }

    /// Filter and order records for a leaderboard view.
    ///
    /// The output is always a permutation of the filtered input subset; an
    /// empty input is an empty leaderboard, not an error.
    pub fn rank(
        &self,
        records: &[TraderRecord],
        query: &RankingQuery,
    ) -> Result<Vec<TraderRecord>, EngineError> {
        let mut matched: Vec<TraderRecord> = records
            .iter()
            .filter(|r| self.matches(r, query))
            .cloned()
            .collect();

        matched.sort_by(|a, b| {
            let primary = self.compare_key(a, b, query);
            let ordered = match query.direction {
                SortDirection::Ascending => primary,
                SortDirection::Descending => primary.reverse(),
            };
            // Tie-break is fixed regardless of direction: most active first,
            // then id, so equal-keyed rows have one stable order.
            ordered
                .then(b.total_trades.cmp(&a.total_trades))
                .then_with(|| a.id.cmp(&b.id))
        });

        Ok(matched)
    }

    fn matches(&self, record: &TraderRecord, query: &RankingQuery) -> bool {
        if let Some(risk) = query.risk_level {
            if record.risk_level != risk {
                return false;
            }
        }
        if let Some(asset) = &query.asset {
            if !record.trades_asset(asset) {
                return false;
            }
        }
        if record.roi_for(query.window) < query.min_roi {
            return false;
        }
        if let Some(term) = &query.search {
            if !term.is_empty() && !record.matches_search(term) {
                return false;
            }
        }
        true
    }

    fn compare_key(&self, a: &TraderRecord, b: &TraderRecord, query: &RankingQuery) -> Ordering {
        match query.sort_key {
            SortKey::Roi => a.roi_for(query.window).cmp(&b.roi_for(query.window)),
            SortKey::WinRate => a.win_rate.total_cmp(&b.win_rate),
            SortKey::TotalTrades => a.total_trades.cmp(&b.total_trades),
            SortKey::Score => self
                .composite_score(a, query.window)
                .total_cmp(&self.composite_score(b, query.window)),
        }
    }
}
