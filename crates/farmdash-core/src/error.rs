//! # Error Types
//!
//! Domain-specific error types for farmdash-core.
//!
//! ## Propagation Policy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Handling                                  │
//! │                                                                         │
//! │  Dirty data (absorbed locally)        Caller bugs (surfaced)           │
//! │  ────────────────────────────         ──────────────────────           │
//! │  • "abc" in a price field  → 0        • period "last8days"             │
//! │  • missing sale date       → now      • negative top_n                 │
//! │  • target_value = 0        → 0%       • zero-day series window         │
//! │                                                                         │
//! │  MalformedRecord is only raised when the caller opts into              │
//! │  TimestampFallback::Reject. The default policy never raises it, so     │
//! │  the dashboard always renders, at the cost of strict correctness.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Arithmetic guards (division by zero in averages, progress, margins)
//! never produce errors; they degrade to `0` deterministically.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Metrics engine errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Unrecognized period code.
    ///
    /// ## When This Occurs
    /// - A typo'd period in a request (`"last8days"`)
    /// - A stale value in a config file
    ///
    /// Never swallowed: silently falling back to "all" would give the
    /// dashboard wrong numbers that look right.
    #[error("Unknown period '{code}'")]
    InvalidPeriod { code: String },

    /// A raw record could not be normalized under the strict policy.
    #[error("Malformed {collection} record {id}: {reason}")]
    MalformedRecord {
        collection: String,
        id: String,
        reason: String,
    },

    /// Engine configuration is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl CoreError {
    /// Creates an InvalidPeriod error for a given code.
    pub fn invalid_period(code: impl Into<String>) -> Self {
        CoreError::InvalidPeriod { code: code.into() }
    }

    /// Creates a MalformedRecord error.
    pub fn malformed(
        collection: impl Into<String>,
        id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        CoreError::MalformedRecord {
            collection: collection.into(),
            id: id.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::invalid_period("last8days");
        assert_eq!(err.to_string(), "Unknown period 'last8days'");

        let err = CoreError::malformed("sales", "v-1", "missing occurredAt");
        assert_eq!(
            err.to_string(),
            "Malformed sales record v-1: missing occurredAt"
        );
    }
}
