//! # Feed Error Types
//!
//! Error types for configuration loading, the record store and the live
//! report feed.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Feed Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │     Store       │  │       Engine            │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Store          │  │  Core (InvalidPeriod,   │ │
//! │  │  ConfigLoad     │  │  UnknownColl.   │  │  MalformedRecord, ...)  │ │
//! │  │  ConfigSave     │  │                 │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  Lifecycle: ShuttingDown                                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use farmdash_core::CoreError;
use thiserror::Error;

/// Result type alias for feed operations.
pub type FeedResult<T> = Result<T, FeedError>;

/// Feed error type covering all boundary failures.
#[derive(Debug, Error)]
pub enum FeedError {
    // =========================================================================
    // Engine Errors
    // =========================================================================
    /// An error surfaced by the metrics engine.
    #[error(transparent)]
    Core(#[from] CoreError),

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid feed configuration.
    #[error("Invalid feed configuration: {0}")]
    InvalidConfig(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Store Errors
    // =========================================================================
    /// Unrecognized collection name.
    #[error("Unknown collection '{0}'")]
    UnknownCollection(String),

    /// The record store failed to deliver.
    #[error("Store error: {0}")]
    Store(String),

    // =========================================================================
    // Lifecycle Errors
    // =========================================================================
    /// Feed is shutting down.
    #[error("Dashboard feed is shutting down")]
    ShuttingDown,
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<std::io::Error> for FeedError {
    fn from(err: std::io::Error) -> Self {
        FeedError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for FeedError {
    fn from(err: toml::de::Error) -> Self {
        FeedError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for FeedError {
    fn from(err: toml::ser::Error) -> Self {
        FeedError::ConfigSaveFailed(err.to_string())
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(err: serde_json::Error) -> Self {
        FeedError::Store(err.to_string())
    }
}
