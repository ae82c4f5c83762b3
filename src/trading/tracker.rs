//! Position tracker: serializes lifecycle transitions per position.
//!
//! Every position carries its own lock, so at most one transition commits;
//! any trigger that loses the race observes the already-Closed state and
//! becomes a no-op. Signal-driven transitions never wait on a lock forever:
//! they try, retry a bounded number of times, then drop. A manual exit is
//! the user's cancellation of in-flight automation, so it may wait.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::EngineError;
use crate::models::{CloseReason, CopyTradePolicy, Position};

const SIGNAL_LOCK_ATTEMPTS: u32 = 3;
const SIGNAL_RETRY_DELAY: Duration = Duration::from_millis(5);

/// Tracks positions from open to close, keeping closed ones as history.
#[derive(Default)]
pub struct PositionTracker {
    positions: RwLock<HashMap<Uuid, Arc<Mutex<Position>>>>,
    stale_signals: AtomicU64,
    dropped_signals: AtomicU64,
}

impl PositionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a position for a policy and return its snapshot.
    pub async fn open(
        &self,
        policy: &CopyTradePolicy,
        asset: String,
        entry_price: Decimal,
        amount: Decimal,
    ) -> Position {
        let position = Position::open(policy, asset, entry_price, amount);
        let snapshot = position.clone();

        let mut positions = self.positions.write().await;
        positions.insert(position.id, Arc::new(Mutex::new(position)));

        info!(
            position = %snapshot.id,
            user = %snapshot.user_id,
            trader = %snapshot.trader_id,
            asset = %snapshot.asset,
            entry = %snapshot.entry_price,
            amount = %snapshot.amount,
            "Position opened"
        );
        snapshot
    }

    /// Current snapshot of one position.
    pub async fn get(&self, id: Uuid) -> Result<Position, EngineError> {
        let arc = self.arc_for(id).await?;
        let guard = arc.lock().await;
        Ok(guard.clone())
    }

    /// Snapshot of every position, open and closed.
    pub async fn snapshot(&self) -> Vec<Position> {
        let arcs: Vec<Arc<Mutex<Position>>> =
            self.positions.read().await.values().cloned().collect();

        let mut out = Vec::with_capacity(arcs.len());
        for arc in arcs {
            out.push(arc.lock().await.clone());
        }
        out
    }

    /// Mirrored-exit signal: the source trader left the position.
    ///
    /// Returns the closed snapshot, or `None` when the signal was absorbed
    /// (position already closed, or the lock stayed contended).
    pub async fn mirrored_exit(
        &self,
        id: Uuid,
        price: Decimal,
    ) -> Result<Option<Position>, EngineError> {
        let Some(mut guard) = self.signal_lock(id).await? else {
            return Ok(None);
        };
        if !guard.is_open() {
            return Ok(self.absorb_stale(&guard));
        }

        guard.close(price, CloseReason::Mirrored);
        info!(position = %guard.id, price = %price, "Closed: trader exited");
        Ok(Some(guard.clone()))
    }

    /// Price-update signal: refresh P&L and evaluate the stop-loss.
    ///
    /// With auto-exit the breach closes the position; without it the breach
    /// only raises an alert and the position stays open.
    pub async fn mark_price(
        &self,
        id: Uuid,
        price: Decimal,
    ) -> Result<Option<Position>, EngineError> {
        let Some(mut guard) = self.signal_lock(id).await? else {
            return Ok(None);
        };
        if !guard.is_open() {
            return Ok(self.absorb_stale(&guard));
        }

        guard.mark_price(price);

        if guard.stop_loss_breached() {
            if guard.auto_exit {
                guard.close(price, CloseReason::StopLoss);
                info!(
                    position = %guard.id,
                    pnl_pct = %guard.pnl_pct,
                    threshold = %guard.stop_loss_pct,
                    "Closed: stop-loss breached"
                );
            } else {
                warn!(
                    position = %guard.id,
                    pnl_pct = %guard.pnl_pct,
                    threshold = %guard.stop_loss_pct,
                    "Stop-loss breached, auto-exit disabled"
                );
            }
        }

        Ok(Some(guard.clone()))
    }

    /// Explicit user exit. Waits for the per-position lock: this request is
    /// itself the cancellation of any in-flight auto-exit evaluation.
    pub async fn manual_exit(
        &self,
        id: Uuid,
        price: Decimal,
    ) -> Result<Option<Position>, EngineError> {
        let arc = self.arc_for(id).await?;
        let mut guard = arc.lock_owned().await;

        if !guard.is_open() {
            return Ok(self.absorb_stale(&guard));
        }

        guard.close(price, CloseReason::Manual);
        info!(position = %guard.id, price = %price, "Closed: manual exit");
        Ok(Some(guard.clone()))
    }

    /// Number of signals absorbed because the position was already closed.
    pub fn stale_signals(&self) -> u64 {
        self.stale_signals.load(Ordering::Relaxed)
    }

    /// Number of signals dropped due to sustained lock contention.
    pub fn dropped_signals(&self) -> u64 {
        self.dropped_signals.load(Ordering::Relaxed)
    }

    async fn arc_for(&self, id: Uuid) -> Result<Arc<Mutex<Position>>, EngineError> {
        let positions = self.positions.read().await;
        positions
            .get(&id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(format!("position {id}")))
    }

    /// Bounded, non-blocking acquisition for signal-driven transitions.
    /// `None` means the signal was dropped after exhausting retries.
    async fn signal_lock(
        &self,
        id: Uuid,
    ) -> Result<Option<OwnedMutexGuard<Position>>, EngineError> {
        let arc = self.arc_for(id).await?;

        for attempt in 1..=SIGNAL_LOCK_ATTEMPTS {
            match arc.clone().try_lock_owned() {
                Ok(guard) => return Ok(Some(guard)),
                Err(_) if attempt < SIGNAL_LOCK_ATTEMPTS => {
                    tokio::time::sleep(SIGNAL_RETRY_DELAY).await;
                }
                Err(_) => break,
            }
        }

        self.dropped_signals.fetch_add(1, Ordering::Relaxed);
        warn!(position = %id, "Signal dropped: position lock contended");
        Ok(None)
    }

    /// A transition reached a closed position: record it and no-op.
    fn absorb_stale(&self, position: &Position) -> Option<Position> {
        self.stale_signals.fetch_add(1, Ordering::Relaxed);
        debug!(
            position = %position.id,
            error = %EngineError::StaleSignal(position.id),
            "Signal absorbed"
        );
        None
    }
}
