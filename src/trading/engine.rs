//! Copy engine: wires policies, the trader store, and the position tracker.
//!
//! Consumes trade signals from the external source and turns them into
//! position lifecycle events for every matching policy.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::EngineError;
use crate::models::{CopyTradePolicy, Position, SignalKind, TradeSignal};
use crate::store::TraderStore;

use super::{PositionSizer, PositionTracker};

/// Active policies keyed by (user, trader).
type PolicyKey = (String, String);

/// Orchestrates copy trading for all active policies.
pub struct CopyEngine {
    store: Arc<TraderStore>,
    tracker: Arc<PositionTracker>,
    sizer: PositionSizer,
    policies: RwLock<HashMap<PolicyKey, CopyTradePolicy>>,
}

impl CopyEngine {
    pub fn new(store: Arc<TraderStore>) -> Self {
        Self {
            store,
            tracker: Arc::new(PositionTracker::new()),
            sizer: PositionSizer::new(),
            policies: RwLock::new(HashMap::new()),
        }
    }

    pub fn tracker(&self) -> &PositionTracker {
        &self.tracker
    }

    /// Activate a policy. The trader must still resolve in the current
    /// snapshot: a policy built before a feed cycle may reference a trader
    /// the feed has since dropped. A user holds at most one policy per
    /// trader; re-registering replaces it (the policy was rebuilt, not
    /// mutated).
    pub async fn register(&self, policy: CopyTradePolicy) -> Result<(), EngineError> {
        self.store.get(&policy.trader_id).await?;

        info!(
            user = %policy.user_id,
            trader = %policy.trader_id,
            amount = %policy.investment_amount,
            "Policy activated"
        );
        let key = (policy.user_id.clone(), policy.trader_id.clone());
        self.policies.write().await.insert(key, policy);
        Ok(())
    }

    /// Deactivate a user's policy for a trader. Open positions are closed
    /// at their last marked price as a manual exit; closed positions stay
    /// in the tracker as immutable history.
    pub async fn stop_copying(
        &self,
        user_id: &str,
        trader_id: &str,
    ) -> Result<CopyTradePolicy, EngineError> {
        let removed = self
            .policies
            .write()
            .await
            .remove(&(user_id.to_string(), trader_id.to_string()))
            .ok_or_else(|| {
                EngineError::NotFound(format!("policy {user_id}/{trader_id}"))
            })?;

        for position in self.open_positions(user_id, trader_id, None).await {
            self.tracker
                .manual_exit(position.id, position.current_price)
                .await?;
        }

        info!(user = %user_id, trader = %trader_id, "Policy deactivated");
        Ok(removed)
    }

    /// Apply one signal from the trade-signal source to every matching
    /// policy. Returns the affected position snapshots.
    pub async fn handle_signal(&self, signal: &TradeSignal) -> Result<Vec<Position>, EngineError> {
        let matching: Vec<CopyTradePolicy> = {
            let policies = self.policies.read().await;
            policies
                .values()
                .filter(|p| p.trader_id == signal.trader_id)
                .cloned()
                .collect()
        };

        if matching.is_empty() {
            debug!(trader = %signal.trader_id, "Signal matches no active policy");
            return Ok(Vec::new());
        }

        let mut events = Vec::new();
        for policy in matching {
            match signal.kind {
                SignalKind::Enter => {
                    if let Some(position) = self.enter(&policy, signal).await {
                        events.push(position);
                    }
                }
                SignalKind::Exit => {
                    let open = self
                        .open_positions(&policy.user_id, &policy.trader_id, Some(&signal.asset))
                        .await;
                    for position in open {
                        if let Some(closed) =
                            self.tracker.mirrored_exit(position.id, signal.price).await?
                        {
                            events.push(closed);
                        }
                    }
                }
            }
        }

        Ok(events)
    }

    /// Mark every open position in an asset to a new price, evaluating
    /// stop-losses. Positions are independent, so the fan-out is concurrent.
    pub async fn mark_asset_price(
        &self,
        asset: &str,
        price: Decimal,
    ) -> Result<Vec<Position>, EngineError> {
        let ids: Vec<Uuid> = self
            .tracker
            .snapshot()
            .await
            .into_iter()
            .filter(|p| p.is_open() && p.asset.eq_ignore_ascii_case(asset))
            .map(|p| p.id)
            .collect();

        let results = join_all(ids.into_iter().map(|id| self.tracker.mark_price(id, price))).await;

        let mut updated = Vec::new();
        for result in results {
            if let Some(position) = result? {
                updated.push(position);
            }
        }
        Ok(updated)
    }

    /// User-requested exit of one of their own positions.
    pub async fn manual_exit(
        &self,
        user_id: &str,
        position_id: Uuid,
        price: Decimal,
    ) -> Result<Option<Position>, EngineError> {
        let position = self.tracker.get(position_id).await?;
        if position.user_id != user_id {
            return Err(EngineError::NotFound(format!("position {position_id}")));
        }
        self.tracker.manual_exit(position_id, price).await
    }

    /// All of a user's positions, open and historical.
    pub async fn positions_for(&self, user_id: &str) -> Vec<Position> {
        self.tracker
            .snapshot()
            .await
            .into_iter()
            .filter(|p| p.user_id == user_id)
            .collect()
    }

    async fn enter(&self, policy: &CopyTradePolicy, signal: &TradeSignal) -> Option<Position> {
        let exposure: Decimal = self
            .open_positions(&policy.user_id, &policy.trader_id, None)
            .await
            .iter()
            .map(|p| p.entry_value())
            .sum();

        let stake = self.sizer.stake(policy, exposure);
        let amount = self.sizer.amount(stake, signal.price);
        if amount <= Decimal::ZERO {
            debug!(
                user = %policy.user_id,
                trader = %policy.trader_id,
                exposure = %exposure,
                "Skipping entry: no capital available"
            );
            return None;
        }

        Some(
            self.tracker
                .open(policy, signal.asset.clone(), signal.price, amount)
                .await,
        )
    }

    async fn open_positions(
        &self,
        user_id: &str,
        trader_id: &str,
        asset: Option<&str>,
    ) -> Vec<Position> {
        self.tracker
            .snapshot()
            .await
            .into_iter()
            .filter(|p| {
                p.is_open()
                    && p.user_id == user_id
                    && p.trader_id == trader_id
                    && asset.map_or(true, |a| p.asset.eq_ignore_ascii_case(a))
            })
            .collect()
    }
}
