//! Engine error taxonomy.
//!
//! Every failure here is per-operation and recoverable by retrying with
//! corrected input; nothing is fatal to the process. `StaleSignal` never
//! crosses the engine boundary: the position tracker absorbs and logs it.

use std::fmt;

use thiserror::Error;
use uuid::Uuid;

/// Why a parameter failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationReason {
    BelowMinimum,
    AboveMaximum,
}

impl ValidationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationReason::BelowMinimum => "below_minimum",
            ValidationReason::AboveMaximum => "above_maximum",
        }
    }
}

impl fmt::Display for ValidationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by the ranking, policy, store, and tracking components.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Unknown trader or position id.
    #[error("not found: {0}")]
    NotFound(String),

    /// A parameter fell outside its allowed bounds. Field names use the
    /// wire (camelCase) spelling so callers can map them back onto inputs.
    #[error("invalid {field}: {reason}")]
    Validation {
        field: &'static str,
        reason: ValidationReason,
    },

    /// Unrecognized sort key or filter in a ranking query.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The wallet capability refused to authorize the investment amount.
    #[error("authorization refused for {user} (amount {amount})")]
    Unauthorized { user: String, amount: String },

    /// A transition was attempted on an already-closed position. Absorbed
    /// by the tracker; surfaced only through logs and the stale counter.
    #[error("stale signal for closed position {0}")]
    StaleSignal(Uuid),
}

impl EngineError {
    pub fn below_minimum(field: &'static str) -> Self {
        EngineError::Validation {
            field,
            reason: ValidationReason::BelowMinimum,
        }
    }

    pub fn above_maximum(field: &'static str) -> Self {
        EngineError::Validation {
            field,
            reason: ValidationReason::AboveMaximum,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_display() {
        let err = EngineError::below_minimum("investmentAmount");
        assert_eq!(err.to_string(), "invalid investmentAmount: below_minimum");

        let err = EngineError::above_maximum("stopLoss");
        assert_eq!(err.to_string(), "invalid stopLoss: above_maximum");
    }
}
