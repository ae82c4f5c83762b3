//! Copy-trade policy builder: validates risk parameters into an active policy.

use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::error::EngineError;
use crate::models::{
    CopyTradePolicy, PolicyParams, MAX_INVESTMENT, MAX_PER_TRADE_PCT, MAX_STOP_LOSS_PCT,
    MIN_INVESTMENT, MIN_PER_TRADE_PCT, MIN_STOP_LOSS_PCT,
};
use crate::store::TraderStore;

/// The authenticated user a request acts on behalf of.
///
/// Passed explicitly into every build call; the engine holds no ambient
/// wallet or session state.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub user_id: String,
}

impl SessionContext {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

/// Wallet capability: grants or refuses committing an investment amount.
///
/// The engine never touches keys or signing; the identity provider hands it
/// this one capability.
pub trait Authorizer: Send + Sync {
    fn authorize(&self, user_id: &str, amount: Decimal) -> Result<(), EngineError>;
}

/// Authorizer that grants everything. Used for dry runs and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl Authorizer for AllowAll {
    fn authorize(&self, _user_id: &str, _amount: Decimal) -> Result<(), EngineError> {
        Ok(())
    }
}

/// Builds validated, immutable copy-trade policies.
pub struct PolicyBuilder<'a> {
    store: &'a TraderStore,
}

impl<'a> PolicyBuilder<'a> {
    pub fn new(store: &'a TraderStore) -> Self {
        Self { store }
    }

    /// Validate `params` and produce a policy for the session's user.
    ///
    /// Fails on the first violation so no partially-validated policy can
    /// exist: bounds first, then trader resolution, then the wallet grant.
    pub async fn build(
        &self,
        session: &SessionContext,
        trader_id: &str,
        params: PolicyParams,
        authorizer: &dyn Authorizer,
    ) -> Result<CopyTradePolicy, EngineError> {
        Self::check_bounds(&params)?;

        let trader = self.store.get(trader_id).await?;

        authorizer
            .authorize(&session.user_id, params.investment_amount)
            .map_err(|err| {
                debug!(user = %session.user_id, error = %err, "Authorization refused");
                err
            })?;

        info!(
            user = %session.user_id,
            trader = %trader.id,
            amount = %params.investment_amount,
            stop_loss = %params.stop_loss_pct,
            "Copy-trade policy built"
        );

        Ok(CopyTradePolicy {
            user_id: session.user_id.clone(),
            trader_id: trader.id,
            investment_amount: params.investment_amount,
            stop_loss_pct: params.stop_loss_pct,
            max_per_trade_pct: params.max_per_trade_pct,
            auto_exit: params.auto_exit,
        })
    }

    fn check_bounds(params: &PolicyParams) -> Result<(), EngineError> {
        if params.investment_amount < MIN_INVESTMENT {
            return Err(EngineError::below_minimum("investmentAmount"));
        }
        if params.investment_amount > MAX_INVESTMENT {
            return Err(EngineError::above_maximum("investmentAmount"));
        }
        if params.stop_loss_pct < MIN_STOP_LOSS_PCT {
            return Err(EngineError::below_minimum("stopLoss"));
        }
        if params.stop_loss_pct > MAX_STOP_LOSS_PCT {
            return Err(EngineError::above_maximum("stopLoss"));
        }
        if params.max_per_trade_pct < MIN_PER_TRADE_PCT {
            return Err(EngineError::below_minimum("maxInvestmentPerTrade"));
        }
        if params.max_per_trade_pct > MAX_PER_TRADE_PCT {
            return Err(EngineError::above_maximum("maxInvestmentPerTrade"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationReason;
    use crate::models::{RiskLevel, TraderRecord};
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn trader(id: &str) -> TraderRecord {
        TraderRecord {
            id: id.to_string(),
            name: "CryptoWhale".to_string(),
            address: "0x1a2b".to_string(),
            verified: true,
            win_rate: 76.0,
            roi: dec!(437),
            roi_7d: dec!(40),
            roi_30d: dec!(120),
            roi_90d: dec!(300),
            risk_level: RiskLevel::Medium,
            total_trades: 172,
            avg_trade_duration_hours: 36.0,
            asset_distribution: HashMap::new(),
            max_drawdown: 0.25,
            updated_at: Utc::now(),
        }
    }

    async fn store_with_trader() -> TraderStore {
        let store = TraderStore::new();
        store.replace_snapshot(vec![trader("1")]).await.unwrap();
        store
    }

    fn params() -> PolicyParams {
        PolicyParams {
            investment_amount: dec!(100),
            stop_loss_pct: dec!(10),
            max_per_trade_pct: dec!(25),
            auto_exit: true,
        }
    }

    #[tokio::test]
    async fn test_build_is_idempotent() {
        let store = store_with_trader().await;
        let builder = PolicyBuilder::new(&store);
        let session = SessionContext::new("user-1");

        let first = builder
            .build(&session, "1", params(), &AllowAll)
            .await
            .unwrap();
        let second = builder
            .build(&session, "1", params(), &AllowAll)
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(first.trader_id, "1");
        assert!(first.auto_exit);
    }

    #[tokio::test]
    async fn test_investment_below_minimum() {
        let store = store_with_trader().await;
        let builder = PolicyBuilder::new(&store);

        let mut p = params();
        p.investment_amount = dec!(5);
        let err = builder
            .build(&SessionContext::new("user-1"), "1", p, &AllowAll)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            EngineError::Validation {
                field: "investmentAmount",
                reason: ValidationReason::BelowMinimum,
            }
        ));
    }

    #[tokio::test]
    async fn test_stop_loss_above_maximum() {
        let store = store_with_trader().await;
        let builder = PolicyBuilder::new(&store);

        let mut p = params();
        p.stop_loss_pct = dec!(60);
        let err = builder
            .build(&SessionContext::new("user-1"), "1", p, &AllowAll)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            EngineError::Validation {
                field: "stopLoss",
                reason: ValidationReason::AboveMaximum,
            }
        ));
    }

    #[tokio::test]
    async fn test_first_violation_wins() {
        let store = store_with_trader().await;
        let builder = PolicyBuilder::new(&store);

        // Both amount and stop-loss invalid: amount is reported
        let p = PolicyParams {
            investment_amount: dec!(20000),
            stop_loss_pct: dec!(60),
            max_per_trade_pct: dec!(25),
            auto_exit: false,
        };
        let err = builder
            .build(&SessionContext::new("user-1"), "1", p, &AllowAll)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            EngineError::Validation {
                field: "investmentAmount",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_unknown_trader() {
        let store = store_with_trader().await;
        let builder = PolicyBuilder::new(&store);

        let err = builder
            .build(&SessionContext::new("user-1"), "nope", params(), &AllowAll)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_authorizer_refusal() {
        struct Refuse;
        impl Authorizer for Refuse {
            fn authorize(&self, user_id: &str, amount: Decimal) -> Result<(), EngineError> {
                Err(EngineError::Unauthorized {
                    user: user_id.to_string(),
                    amount: amount.to_string(),
                })
            }
        }

        let store = store_with_trader().await;
        let builder = PolicyBuilder::new(&store);

        let err = builder
            .build(&SessionContext::new("user-1"), "1", params(), &Refuse)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Unauthorized { .. }));
    }
}
