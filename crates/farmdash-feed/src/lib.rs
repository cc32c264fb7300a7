//! # farmdash-feed: Store Boundary for the Farm Dashboards
//!
//! Connects [`farmdash_core`] to the record store: loads configuration,
//! fetches or subscribes to the raw collections, and keeps a live sales
//! report up to date.
//!
//! ## Module Organization
//! - [`config`] - TOML + environment configuration
//! - [`error`] - Feed error types
//! - [`store`] - `RecordStore` trait and the in-memory store
//! - [`feed`] - `DashboardFeed` live report loop
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use farmdash_feed::{DashboardFeed, FeedConfig, MemoryStore, SystemClock};
//!
//! farmdash_feed::init_tracing("info,farmdash=debug");
//!
//! let config = FeedConfig::load_or_default(None);
//! let store = Arc::new(MemoryStore::new());
//!
//! let (feed, handle) = DashboardFeed::new(
//!     store.as_ref(),
//!     config.engine.clone(),
//!     config.initial_request(),
//!     Arc::new(SystemClock),
//! )?;
//! tokio::spawn(feed.run());
//!
//! let mut reports = handle.subscribe();
//! while reports.changed().await.is_ok() {
//!     let report = reports.borrow().clone();
//!     println!("{} sales", report.metrics.total_sales_count);
//! }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod feed;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{FeedConfig, FeedSettings};
pub use error::{FeedError, FeedResult};
pub use feed::{
    compose_once, load_records, Clock, DashboardFeed, DashboardFeedHandle, FeedCommand,
    FixedClock, SystemClock,
};
pub use store::{Collection, MemoryStore, RecordStore};

use tracing_subscriber::EnvFilter;

/// Installs a formatted tracing subscriber for hosts embedding the feed.
///
/// `RUST_LOG` wins over `default_filter`. Does nothing if a global
/// subscriber is already set.
pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
