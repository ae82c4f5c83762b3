//! Trader record store: read-mostly snapshots refreshed by the performance feed.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::EngineError;
use crate::models::TraderRecord;

type Snapshot = Arc<HashMap<String, TraderRecord>>;

/// In-memory store of trader performance records.
///
/// A refresh replaces the whole snapshot atomically: every incoming record is
/// validated before the swap, so readers either see the full previous cycle
/// or the full new one, never a mix.
#[derive(Default)]
pub struct TraderStore {
    snapshot: RwLock<Snapshot>,
}

impl TraderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up one trader by id.
    pub async fn get(&self, id: &str) -> Result<TraderRecord, EngineError> {
        let snapshot = self.snapshot.read().await.clone();
        snapshot
            .get(id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(format!("trader {id}")))
    }

    /// All records in the current snapshot, unordered.
    pub async fn list(&self) -> Vec<TraderRecord> {
        let snapshot = self.snapshot.read().await.clone();
        snapshot.values().cloned().collect()
    }

    /// Replace the snapshot with a new feed cycle. All-or-nothing: if any
    /// record fails its invariants the previous snapshot stays in place.
    pub async fn replace_snapshot(
        &self,
        records: Vec<TraderRecord>,
    ) -> Result<usize, EngineError> {
        let mut next = HashMap::with_capacity(records.len());
        for record in records {
            if let Err(err) = record.validate() {
                warn!(trader = %record.id, error = %err, "Rejecting feed snapshot");
                return Err(err);
            }
            next.insert(record.id.clone(), record);
        }

        let count = next.len();
        *self.snapshot.write().await = Arc::new(next);

        info!(traders = count, "Snapshot replaced");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RiskLevel;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn record(id: &str, win_rate: f64) -> TraderRecord {
        TraderRecord {
            id: id.to_string(),
            name: String::new(),
            address: format!("0x{id}"),
            verified: false,
            win_rate,
            roi: dec!(50),
            roi_7d: dec!(5),
            roi_30d: dec!(15),
            roi_90d: dec!(30),
            risk_level: RiskLevel::Low,
            total_trades: 10,
            avg_trade_duration_hours: 12.0,
            asset_distribution: HashMap::new(),
            max_drawdown: 0.1,
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_get_and_list() {
        let store = TraderStore::new();
        store
            .replace_snapshot(vec![record("a", 60.0), record("b", 70.0)])
            .await
            .unwrap();

        assert_eq!(store.get("a").await.unwrap().win_rate, 60.0);
        assert!(matches!(
            store.get("missing").await,
            Err(EngineError::NotFound(_))
        ));
        assert_eq!(store.list().await.len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_record_keeps_old_snapshot() {
        let store = TraderStore::new();
        store.replace_snapshot(vec![record("a", 60.0)]).await.unwrap();

        let result = store
            .replace_snapshot(vec![record("b", 70.0), record("c", 140.0)])
            .await;
        assert!(result.is_err());

        // Previous cycle is still fully visible
        assert!(store.get("a").await.is_ok());
        assert!(store.get("b").await.is_err());
    }
}
