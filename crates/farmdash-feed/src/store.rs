//! # Record Store Boundary
//!
//! The collaborator the dashboards read from: a document store that can
//! return a collection once, or redeliver the full collection on every
//! change.
//!
//! ## Delivery Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   fetch_all(sales)   ──► Vec<RawRecord>          one-shot              │
//! │                                                                         │
//! │   subscribe(sales)   ──► watch::Receiver<Vec<RawRecord>>               │
//! │                            │                                            │
//! │                            ├── full contents now                        │
//! │                            ├── full contents after change #1            │
//! │                            └── ...                                      │
//! │                                                                         │
//! │   Every delivery is a complete snapshot, never a diff. A watch         │
//! │   channel keeps only the newest one, so a slow reader skips stale      │
//! │   snapshots instead of queueing them.                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use farmdash_core::normalize::RawRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tokio::sync::watch;
use tracing::debug;

use crate::error::{FeedError, FeedResult};

// =============================================================================
// Collection
// =============================================================================

/// The logical collections the engine reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Sales,
    Products,
    Goals,
    Notifications,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Sales,
        Collection::Products,
        Collection::Goals,
        Collection::Notifications,
    ];

    /// Canonical store name.
    pub const fn name(&self) -> &'static str {
        match self {
            Collection::Sales => "sales",
            Collection::Products => "products",
            Collection::Goals => "goals",
            Collection::Notifications => "notifications",
        }
    }

    /// Name used by older deployments of the store.
    pub const fn legacy_name(&self) -> &'static str {
        match self {
            Collection::Sales => "vendas",
            Collection::Products => "produtos",
            Collection::Goals => "metas",
            Collection::Notifications => "notificacoes",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Collection {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Collection::ALL
            .into_iter()
            .find(|c| c.name() == wanted || c.legacy_name() == wanted)
            .ok_or_else(|| FeedError::UnknownCollection(s.to_string()))
    }
}

// =============================================================================
// Record Store Trait
// =============================================================================

/// A document store holding the raw collections.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Current contents of a collection.
    async fn fetch_all(&self, collection: Collection) -> FeedResult<Vec<RawRecord>>;

    /// Receiver that holds the current contents and is updated with the
    /// full contents after every change.
    fn subscribe(&self, collection: Collection) -> FeedResult<watch::Receiver<Vec<RawRecord>>>;
}

// =============================================================================
// In-Memory Store
// =============================================================================

/// A store held in process memory.
///
/// Used by tests, demos, and hosts that receive snapshots from elsewhere
/// and push them in with [`replace`](MemoryStore::replace).
#[derive(Debug)]
pub struct MemoryStore {
    channels: HashMap<Collection, watch::Sender<Vec<RawRecord>>>,
}

impl MemoryStore {
    /// Creates a store with every collection empty.
    pub fn new() -> Self {
        let channels = Collection::ALL
            .into_iter()
            .map(|c| (c, watch::Sender::new(Vec::new())))
            .collect();
        MemoryStore { channels }
    }

    /// Replaces a collection's contents and notifies subscribers.
    pub fn replace(&self, collection: Collection, records: Vec<RawRecord>) {
        if let Some(sender) = self.channels.get(&collection) {
            debug!(%collection, count = records.len(), "Replacing collection");
            sender.send_replace(records);
        }
    }

    /// Parses a JSON array of documents (each with an `id`) into a
    /// collection.
    pub fn load_json(&self, collection: Collection, json: &str) -> FeedResult<()> {
        let records: Vec<RawRecord> = serde_json::from_str(json)?;
        self.replace(collection, records);
        Ok(())
    }

    fn channel(&self, collection: Collection) -> FeedResult<&watch::Sender<Vec<RawRecord>>> {
        self.channels
            .get(&collection)
            .ok_or_else(|| FeedError::UnknownCollection(collection.to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn fetch_all(&self, collection: Collection) -> FeedResult<Vec<RawRecord>> {
        Ok(self.channel(collection)?.borrow().clone())
    }

    fn subscribe(&self, collection: Collection) -> FeedResult<watch::Receiver<Vec<RawRecord>>> {
        Ok(self.channel(collection)?.subscribe())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
