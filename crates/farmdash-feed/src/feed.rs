//! # Dashboard Feed
//!
//! Keeps the latest snapshot of every collection and republishes the sales
//! report whenever one of them changes.
//!
//! ## Feed Loop
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          DashboardFeed::run                             │
//! │                                                                         │
//! │   sales rx ─────────┐                                                   │
//! │   products rx ──────┤                                                   │
//! │   goals rx ─────────┼──► normalize that collection ──┐                 │
//! │   notifications rx ─┘                                 │                 │
//! │                                                       ▼                 │
//! │   command rx ─── SetPeriod / SetProfitStrategy ──► compose_report      │
//! │             └─── Shutdown ──► break                   │                 │
//! │                                                       ▼                 │
//! │                                  watch::Sender<Arc<ReportSnapshot>>    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The feed task owns the only mutable state. Each report is composed from
//! one consistent set of collection snapshots; a delivery that fails strict
//! normalization is logged and the previous snapshot of that collection is
//! kept, so subscribers never see a half-applied update.

use chrono::{DateTime, Utc};
use farmdash_core::config::EngineConfig;
use farmdash_core::normalize::{normalize_all, Normalizer, RawRecord};
use farmdash_core::period::Period;
use farmdash_core::report::{compose_report, ProfitStrategy, RecordSet, ReportRequest, ReportSnapshot};
use farmdash_core::CoreResult;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::error::{FeedError, FeedResult};
use crate::store::{Collection, RecordStore};

// =============================================================================
// Clock
// =============================================================================

/// Source of "now" for the feed. The engine never reads the clock itself.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock stuck at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

// =============================================================================
// One-Shot Loading
// =============================================================================

/// Fetches and normalizes every collection once.
pub async fn load_records(store: &dyn RecordStore, normalizer: &Normalizer) -> FeedResult<RecordSet> {
    let mut records = RecordSet::default();
    for collection in Collection::ALL {
        let raws = store.fetch_all(collection).await?;
        normalize_into(&mut records, collection, &raws, normalizer)?;
    }
    Ok(records)
}

/// Fetches, normalizes and composes a single report.
pub async fn compose_once(
    store: &dyn RecordStore,
    config: &EngineConfig,
    request: &ReportRequest,
    now: DateTime<Utc>,
) -> FeedResult<ReportSnapshot> {
    config.validate()?;
    let calendar = config.calendar_utc(now);
    let normalizer = Normalizer::new(now, config.timestamp_fallback).with_local_offset(calendar.offset());
    let records = load_records(store, &normalizer).await?;
    Ok(compose_report(&records, request, config, &calendar)?)
}

/// Replaces one collection of `records` with normalized `raws`.
///
/// On error `records` is left untouched.
fn normalize_into(
    records: &mut RecordSet,
    collection: Collection,
    raws: &[RawRecord],
    normalizer: &Normalizer,
) -> CoreResult<()> {
    match collection {
        Collection::Sales => records.sales = normalize_all(raws, |r| normalizer.transaction(r))?,
        Collection::Products => {
            records.catalog = normalize_all(raws, |r| normalizer.catalog_item(r))?
        }
        Collection::Goals => records.goals = normalize_all(raws, |r| normalizer.goal(r))?,
        Collection::Notifications => {
            records.notifications = normalize_all(raws, |r| normalizer.notification(r))?
        }
    }
    Ok(())
}

// =============================================================================
// Commands and Handle
// =============================================================================

/// Requests sent to a running feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedCommand {
    SetPeriod(Period),
    SetProfitStrategy(ProfitStrategy),
    /// Recompose without new data (e.g. the day rolled over).
    Refresh,
    Shutdown,
}

/// Handle for controlling a running feed and reading its output.
#[derive(Debug, Clone)]
pub struct DashboardFeedHandle {
    command_tx: mpsc::Sender<FeedCommand>,
    snapshot_rx: watch::Receiver<Arc<ReportSnapshot>>,
}

impl DashboardFeedHandle {
    /// A receiver notified on every published report.
    pub fn subscribe(&self) -> watch::Receiver<Arc<ReportSnapshot>> {
        self.snapshot_rx.clone()
    }

    /// The most recently published report.
    pub fn latest(&self) -> Arc<ReportSnapshot> {
        Arc::clone(&self.snapshot_rx.borrow())
    }

    pub async fn set_period(&self, period: Period) -> FeedResult<()> {
        self.send(FeedCommand::SetPeriod(period)).await
    }

    pub async fn set_profit_strategy(&self, strategy: ProfitStrategy) -> FeedResult<()> {
        self.send(FeedCommand::SetProfitStrategy(strategy)).await
    }

    pub async fn refresh(&self) -> FeedResult<()> {
        self.send(FeedCommand::Refresh).await
    }

    /// Triggers graceful shutdown.
    pub async fn shutdown(&self) -> FeedResult<()> {
        self.send(FeedCommand::Shutdown).await
    }

    async fn send(&self, command: FeedCommand) -> FeedResult<()> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| FeedError::ShuttingDown)
    }
}

// =============================================================================
// Dashboard Feed
// =============================================================================

/// Recomposes the sales report on every store delivery.
pub struct DashboardFeed {
    config: EngineConfig,
    request: ReportRequest,
    clock: Arc<dyn Clock>,
    records: RecordSet,

    sales_rx: watch::Receiver<Vec<RawRecord>>,
    products_rx: watch::Receiver<Vec<RawRecord>>,
    goals_rx: watch::Receiver<Vec<RawRecord>>,
    notifications_rx: watch::Receiver<Vec<RawRecord>>,

    command_rx: mpsc::Receiver<FeedCommand>,
    snapshot_tx: watch::Sender<Arc<ReportSnapshot>>,
}

impl DashboardFeed {
    /// Subscribes to every collection and publishes an empty report.
    ///
    /// Fails on invalid configuration or when the store refuses a
    /// subscription.
    pub fn new(
        store: &dyn RecordStore,
        config: EngineConfig,
        request: ReportRequest,
        clock: Arc<dyn Clock>,
    ) -> FeedResult<(Self, DashboardFeedHandle)> {
        config.validate()?;

        let (command_tx, command_rx) = mpsc::channel(16);
        let calendar = config.calendar_utc(clock.now());
        let empty = compose_report(&RecordSet::default(), &request, &config, &calendar)?;
        let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(empty));

        let feed = DashboardFeed {
            sales_rx: store.subscribe(Collection::Sales)?,
            products_rx: store.subscribe(Collection::Products)?,
            goals_rx: store.subscribe(Collection::Goals)?,
            notifications_rx: store.subscribe(Collection::Notifications)?,
            config,
            request,
            clock,
            records: RecordSet::default(),
            command_rx,
            snapshot_tx,
        };

        Ok((
            feed,
            DashboardFeedHandle {
                command_tx,
                snapshot_rx,
            },
        ))
    }

    /// Runs until shutdown is requested, every handle is dropped, or the
    /// store closes a collection.
    pub async fn run(mut self) {
        info!(period = %self.request.period, strategy = %self.request.profit_strategy, "Dashboard feed starting");

        for collection in Collection::ALL {
            self.absorb(collection);
        }
        self.publish();

        loop {
            let changed = tokio::select! {
                res = self.sales_rx.changed() => res.map(|_| Collection::Sales),
                res = self.products_rx.changed() => res.map(|_| Collection::Products),
                res = self.goals_rx.changed() => res.map(|_| Collection::Goals),
                res = self.notifications_rx.changed() => res.map(|_| Collection::Notifications),

                command = self.command_rx.recv() => {
                    match command {
                        Some(FeedCommand::SetPeriod(period)) => {
                            debug!(%period, "Period changed");
                            self.request.period = period;
                        }
                        Some(FeedCommand::SetProfitStrategy(strategy)) => {
                            debug!(%strategy, "Profit strategy changed");
                            self.request.profit_strategy = strategy;
                        }
                        Some(FeedCommand::Refresh) => {}
                        Some(FeedCommand::Shutdown) | None => {
                            info!("Dashboard feed received shutdown");
                            break;
                        }
                    }
                    self.publish();
                    continue;
                }
            };

            match changed {
                Ok(collection) => {
                    if self.absorb(collection) {
                        self.publish();
                    }
                }
                Err(_) => {
                    warn!("Record store closed a subscription");
                    break;
                }
            }
        }

        info!("Dashboard feed stopped");
    }

    /// Normalizes the newest delivery of `collection`. Returns whether the
    /// record set changed.
    fn absorb(&mut self, collection: Collection) -> bool {
        let raws = match collection {
            Collection::Sales => self.sales_rx.borrow_and_update().clone(),
            Collection::Products => self.products_rx.borrow_and_update().clone(),
            Collection::Goals => self.goals_rx.borrow_and_update().clone(),
            Collection::Notifications => self.notifications_rx.borrow_and_update().clone(),
        };

        let now = self.clock.now();
        let offset = self.config.calendar_utc(now).offset();
        let normalizer = Normalizer::new(now, self.config.timestamp_fallback).with_local_offset(offset);

        match normalize_into(&mut self.records, collection, &raws, &normalizer) {
            Ok(()) => {
                debug!(%collection, count = raws.len(), "Collection snapshot absorbed");
                true
            }
            Err(e) => {
                error!(
                    %collection,
                    policy = %normalizer.fallback(),
                    error = %e,
                    "Rejected collection snapshot, keeping previous"
                );
                false
            }
        }
    }

    fn publish(&self) {
        let calendar = self.config.calendar_utc(self.clock.now());
        let snapshot = match compose_report(&self.records, &self.request, &self.config, &calendar) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(error = %e, "Report composition failed, keeping previous snapshot");
                return;
            }
        };
        debug!(
            sales = snapshot.metrics.total_sales_count,
            period = %snapshot.period,
            "Publishing report"
        );
        self.snapshot_tx.send_replace(Arc::new(snapshot));
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::{Duration, TimeZone};
    use farmdash_core::config::TimestampFallback;
    use serde_json::json;
    use std::time::Duration as StdDuration;
    use tokio::time::timeout;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
    }

    fn sale(id: &str, total: f64, age_days: i64) -> RawRecord {
        RawRecord::new(
            id,
            json!({
                "produtoId": "p1",
                "produtoNome": "Queijo",
                "quantidade": 1,
                "precoTotal": total,
                "dataVenda": (now() - Duration::days(age_days)).to_rfc3339(),
            }),
        )
    }

    fn start(
        store: &MemoryStore,
        config: EngineConfig,
    ) -> (DashboardFeedHandle, tokio::task::JoinHandle<()>) {
        let request = ReportRequest::new(Period::Last7Days, ProfitStrategy::FlatMargin);
        let (feed, handle) =
            DashboardFeed::new(store, config, request, Arc::new(FixedClock(now()))).unwrap();
        (handle, tokio::spawn(feed.run()))
    }

    async fn wait_for(
        handle: &DashboardFeedHandle,
        predicate: impl FnMut(&Arc<ReportSnapshot>) -> bool,
    ) -> Arc<ReportSnapshot> {
        let mut rx = handle.subscribe();
        let snapshot = timeout(StdDuration::from_secs(5), rx.wait_for(predicate))
            .await
            .expect("feed did not publish in time")
            .expect("feed closed");
        Arc::clone(&snapshot)
    }

    #[tokio::test]
    async fn test_publishes_on_delivery() {
        let store = MemoryStore::new();
        store.replace(Collection::Sales, vec![sale("v1", 10.0, 0)]);
        let (handle, task) = start(&store, EngineConfig::default());

        let first = wait_for(&handle, |s| s.metrics.total_sales_count == 1).await;
        assert_eq!(first.metrics.total_sales_value.cents(), 1000);

        store.replace(Collection::Sales, vec![sale("v1", 10.0, 0), sale("v2", 5.5, 1)]);
        let second = wait_for(&handle, |s| s.metrics.total_sales_count == 2).await;
        assert_eq!(second.metrics.total_sales_value.cents(), 1550);
        assert_eq!(second.top_products[0].label, "Queijo");
        assert_eq!(second.notifications.unread, 0);

        store.replace(
            Collection::Notifications,
            vec![
                RawRecord::new("n1", json!({"titulo": "Estoque baixo", "lida": false, "prioridade": "alta"})),
                RawRecord::new("n2", json!({"titulo": "Meta batida", "lida": true})),
            ],
        );
        let third = wait_for(&handle, |s| s.notifications.unread == 1).await;
        assert_eq!(third.notifications.read, 1);
        assert_eq!(third.notifications.high_priority, 1);

        handle.shutdown().await.unwrap();
        timeout(StdDuration::from_secs(5), task).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_set_period_recomposes() {
        let store = MemoryStore::new();
        store.replace(Collection::Sales, vec![sale("v1", 10.0, 0), sale("v2", 20.0, 40)]);
        let (handle, task) = start(&store, EngineConfig::default());

        wait_for(&handle, |s| s.metrics.total_sales_count == 1).await;

        handle.set_period(Period::All).await.unwrap();
        let all = wait_for(&handle, |s| s.period == Period::All).await;
        assert_eq!(all.metrics.total_sales_count, 2);

        handle
            .set_profit_strategy(ProfitStrategy::CatalogLinked)
            .await
            .unwrap();
        let linked = wait_for(&handle, |s| s.profit_strategy == ProfitStrategy::CatalogLinked).await;
        // no catalog: every sale dangles
        assert!(linked.profit.is_zero());

        handle.shutdown().await.unwrap();
        timeout(StdDuration::from_secs(5), task).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_strict_rejection_keeps_previous_snapshot() {
        let store = MemoryStore::new();
        store.replace(Collection::Sales, vec![sale("v1", 10.0, 0)]);
        let config = EngineConfig {
            timestamp_fallback: TimestampFallback::Reject,
            ..EngineConfig::default()
        };
        let (handle, task) = start(&store, config);
        wait_for(&handle, |s| s.metrics.total_sales_count == 1).await;

        // undated sale fails the strict policy
        store.replace(
            Collection::Sales,
            vec![sale("v1", 10.0, 0), RawRecord::new("v2", json!({"precoTotal": 3}))],
        );
        store.replace(
            Collection::Products,
            vec![RawRecord::new("p1", json!({"nome": "Queijo", "quantidade": 2}))],
        );
        let snapshot = wait_for(&handle, |s| s.low_stock_count == 1).await;
        assert_eq!(snapshot.metrics.total_sales_count, 1);

        handle.shutdown().await.unwrap();
        timeout(StdDuration::from_secs(5), task).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_dropping_handles_stops_feed() {
        let store = MemoryStore::new();
        let (handle, task) = start(&store, EngineConfig::default());
        drop(handle);
        timeout(StdDuration::from_secs(5), task).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let store = MemoryStore::new();
        let config = EngineConfig {
            top_n: -1,
            ..EngineConfig::default()
        };
        let request = ReportRequest::new(Period::All, ProfitStrategy::FlatMargin);
        let result = DashboardFeed::new(&store, config, request, Arc::new(SystemClock));
        assert!(matches!(result, Err(FeedError::Core(_))));
    }

    #[tokio::test]
    async fn test_compose_once() {
        let store = MemoryStore::new();
        store.replace(Collection::Sales, vec![sale("v1", 12.0, 2), sale("v2", 8.0, 3)]);
        store.replace(
            Collection::Goals,
            vec![RawRecord::new(
                "m1",
                json!({"titulo": "Meta", "valorMeta": 10, "valorAtual": 5, "dataFim": "2026-12-31"}),
            )],
        );

        let request = ReportRequest::new(Period::Last30Days, ProfitStrategy::FlatMargin);
        let report = compose_once(&store, &EngineConfig::default(), &request, now())
            .await
            .unwrap();
        assert_eq!(report.metrics.total_sales_value.cents(), 2000);
        assert_eq!(report.profit.cents(), 600);
        assert_eq!(report.goals[0].progress_percent, 50.0);
        assert_eq!(report.daily_series.len(), 7);
    }
}
