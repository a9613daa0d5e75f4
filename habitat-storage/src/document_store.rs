//! Generic [`EntityStore`] over a blocking [`DocumentBackend`].
//!
//! Writes run on the blocking pool under one lock, bump a store-wide revision
//! and publish a [`Change`] on a broadcast feed while still holding the lock,
//! so the feed is in revision order. Each live query is a task that re-reads
//! its result set whenever a change touches its collection and forwards the
//! snapshot if it differs from the last one sent.

use crate::adapter::EntityStore;
use crate::backend::{DocumentBackend, MemoryBackend};
use crate::error::{StoreError, StoreResult};
use crate::query::Query;
use crate::subscription::{Snapshot, SnapshotResult, SnapshotSink, Subscription};
use async_trait::async_trait;
use habitat_model::{fields, HierarchyEntity};
use habitat_types::{Change, EntityId};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, trace, warn};

/// Tuning knobs for a [`DocumentStore`].
#[derive(Debug, Clone)]
pub struct DocumentStoreConfig {
    /// Buffered change records before slow live queries start lagging.
    pub change_feed_capacity: usize,
    /// Snapshots buffered per subscription.
    pub subscription_buffer: usize,
}

impl Default for DocumentStoreConfig {
    fn default() -> Self {
        Self {
            change_feed_capacity: 256,
            subscription_buffer: 16,
        }
    }
}

#[derive(Debug, Clone)]
enum Signal {
    Changed(Change),
    Offline,
}

struct Ledger<B> {
    backend: B,
    revision: u64,
    signals: broadcast::Sender<Signal>,
}

impl<B> Ledger<B> {
    fn commit(&mut self, change: impl FnOnce(u64) -> Change) -> u64 {
        self.revision += 1;
        // No receivers just means no live queries.
        let _ = self.signals.send(Signal::Changed(change(self.revision)));
        self.revision
    }
}

struct Shared<B> {
    ledger: Mutex<Ledger<B>>,
    signals: broadcast::Sender<Signal>,
    online: AtomicBool,
    config: DocumentStoreConfig,
}

/// An entity store for all hierarchy types on top of one backend.
pub struct DocumentStore<B> {
    shared: Arc<Shared<B>>,
}

impl<B> Clone for DocumentStore<B> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

/// The store used by tests and by the console when no database is given.
pub type MemoryStore = DocumentStore<MemoryBackend>;

impl DocumentStore<MemoryBackend> {
    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }
}

#[cfg(feature = "duckdb")]
impl DocumentStore<crate::duckdb_backend::DuckDbBackend> {
    /// Opens a DuckDB-backed store at `path`.
    pub fn open_duckdb(path: &std::path::Path) -> StoreResult<Self> {
        Ok(Self::new(crate::duckdb_backend::DuckDbBackend::open(path)?))
    }

    pub fn duckdb_in_memory() -> StoreResult<Self> {
        Ok(Self::new(
            crate::duckdb_backend::DuckDbBackend::open_in_memory()?,
        ))
    }
}

impl<B: DocumentBackend> DocumentStore<B> {
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, DocumentStoreConfig::default())
    }

    pub fn with_config(backend: B, config: DocumentStoreConfig) -> Self {
        info!("document store starting on {} backend", backend.name());
        let (signals, _) = broadcast::channel(config.change_feed_capacity.max(1));
        Self {
            shared: Arc::new(Shared {
                ledger: Mutex::new(Ledger {
                    backend,
                    revision: 0,
                    signals: signals.clone(),
                }),
                signals,
                online: AtomicBool::new(true),
                config,
            }),
        }
    }

    /// Current store-wide revision.
    pub fn revision(&self) -> u64 {
        self.shared
            .ledger
            .lock()
            .map(|ledger| ledger.revision)
            .unwrap_or_default()
    }

    pub fn is_online(&self) -> bool {
        self.shared.online.load(Ordering::SeqCst)
    }

    /// Simulates losing or regaining the connection.
    ///
    /// Going offline fails every open live query with a terminal error and
    /// makes CRUD calls and new subscriptions fail with `Unavailable`.
    pub fn set_online(&self, online: bool) {
        let was_online = self.shared.online.swap(online, Ordering::SeqCst);
        if was_online && !online {
            warn!("document store went offline");
            let _ = self.shared.signals.send(Signal::Offline);
        } else if !was_online && online {
            info!("document store back online");
        }
    }

    fn ensure_online(&self) -> StoreResult<()> {
        if self.is_online() {
            Ok(())
        } else {
            Err(StoreError::Unavailable("store is offline".to_string()))
        }
    }

    /// Runs `f` against the ledger on the blocking pool.
    async fn with_ledger<R, F>(&self, f: F) -> StoreResult<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut Ledger<B>) -> StoreResult<R> + Send + 'static,
    {
        let shared = self.shared.clone();
        tokio::task::spawn_blocking(move || {
            let mut ledger = shared
                .ledger
                .lock()
                .map_err(|_| StoreError::Unavailable("backend lock poisoned".to_string()))?;
            f(&mut ledger)
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("backend task failed: {e}")))?
    }

    async fn read_snapshot<T: HierarchyEntity>(&self, query: &Query) -> SnapshotResult<T> {
        let query = query.clone();
        self.with_ledger(move |ledger| {
            let docs = ledger.backend.scan(query.collection())?;
            let items = docs
                .into_iter()
                .filter(|doc| query.matches(doc))
                .map(serde_json::from_value::<T>)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Snapshot::new(ledger.revision, items))
        })
        .await
    }

    /// Writes `doc` over the stored document `id` field by field.
    async fn overlay<T: HierarchyEntity>(&self, id: &EntityId, changes: Value) -> StoreResult<()> {
        self.ensure_online()?;
        let Value::Object(changes) = changes else {
            return Err(StoreError::InvalidData(format!(
                "{} changes must be a JSON object",
                T::KIND
            )));
        };
        let id = id.clone();
        let collection = T::KIND.collection();
        let revision = self
            .with_ledger(move |ledger| {
                let Some(Value::Object(mut doc)) = ledger.backend.fetch(collection, &id)? else {
                    return Err(StoreError::NotFound { kind: T::KIND, id });
                };
                for (field, value) in changes {
                    if field != fields::ID {
                        doc.insert(field, value);
                    }
                }
                let doc = Value::Object(doc);
                serde_json::from_value::<T>(doc.clone())
                    .map_err(|e| StoreError::InvalidData(format!("{} update: {e}", T::KIND)))?;
                if !ledger.backend.replace(collection, &id, &doc)? {
                    return Err(StoreError::NotFound { kind: T::KIND, id });
                }
                Ok(ledger.commit(|rev| Change::updated(rev, collection, id)))
            })
            .await?;
        debug!(kind = %T::KIND, revision, "document updated");
        Ok(())
    }
}

fn with_id(doc: Value, id: &EntityId) -> StoreResult<Value> {
    match doc {
        Value::Object(mut map) => {
            map.insert(fields::ID.to_string(), Value::String(id.to_string()));
            Ok(Value::Object(map))
        }
        _ => Err(StoreError::InvalidData(
            "entity did not serialize to a JSON object".to_string(),
        )),
    }
}

#[async_trait]
impl<B, T> EntityStore<T> for DocumentStore<B>
where
    B: DocumentBackend,
    T: HierarchyEntity,
{
    async fn create(&self, entity: &T) -> StoreResult<EntityId> {
        self.ensure_online()?;
        let id = EntityId::generate();
        let doc = with_id(serde_json::to_value(entity)?, &id)?;
        let collection = T::KIND.collection();
        let assigned = id.clone();
        let revision = self
            .with_ledger(move |ledger| {
                ledger.backend.insert(collection, &id, &doc)?;
                Ok(ledger.commit(|rev| Change::created(rev, collection, id)))
            })
            .await?;
        debug!(kind = %T::KIND, id = %assigned, revision, "document created");
        Ok(assigned)
    }

    async fn update(&self, id: &EntityId, entity: &T) -> StoreResult<()> {
        let changes = serde_json::to_value(entity)?;
        self.overlay::<T>(id, changes).await
    }

    async fn patch(&self, id: &EntityId, changes: Value) -> StoreResult<()> {
        self.overlay::<T>(id, changes).await
    }

    async fn delete(&self, id: &EntityId) -> StoreResult<()> {
        self.ensure_online()?;
        let collection = T::KIND.collection();
        let target = id.clone();
        let revision = self
            .with_ledger(move |ledger| {
                if !ledger.backend.remove(collection, &target)? {
                    return Err(StoreError::NotFound {
                        kind: T::KIND,
                        id: target,
                    });
                }
                Ok(ledger.commit(|rev| Change::deleted(rev, collection, target)))
            })
            .await?;
        debug!(kind = %T::KIND, %id, revision, "document deleted");
        Ok(())
    }

    async fn get_by_id(&self, id: &EntityId) -> StoreResult<Option<T>> {
        self.ensure_online()?;
        let collection = T::KIND.collection();
        let id = id.clone();
        let doc = self
            .with_ledger(move |ledger| ledger.backend.fetch(collection, &id))
            .await?;
        doc.map(serde_json::from_value::<T>)
            .transpose()
            .map_err(Into::into)
    }

    async fn subscribe(&self, query: Query) -> StoreResult<Subscription<T>> {
        self.ensure_online()?;
        if query.kind != T::KIND {
            return Err(StoreError::InvalidData(format!(
                "query over {} used for {} subscription",
                query.kind.collection(),
                T::KIND.collection()
            )));
        }
        let (sink, subscription) = Subscription::channel(self.shared.config.subscription_buffer);
        // Subscribe to the feed before the first read so no write is missed.
        let signals = self.shared.signals.subscribe();
        debug!(%query, "live query opened");
        tokio::spawn(run_live_query(self.clone(), query, sink, signals));
        Ok(subscription)
    }
}

async fn run_live_query<B: DocumentBackend, T: HierarchyEntity>(
    store: DocumentStore<B>,
    query: Query,
    sink: SnapshotSink<T>,
    mut signals: broadcast::Receiver<Signal>,
) {
    let mut last_items: Option<Vec<T>> = None;
    loop {
        match store.read_snapshot::<T>(&query).await {
            Ok(snapshot) => {
                if last_items.as_ref() != Some(&snapshot.items) {
                    last_items = Some(snapshot.items.clone());
                    if !sink.send(Ok(snapshot)).await {
                        trace!(%query, "live query consumer gone");
                        return;
                    }
                }
            }
            Err(err) => {
                warn!(%query, "live query failed: {err}");
                sink.send(Err(StoreError::Subscription(err.to_string())))
                    .await;
                return;
            }
        }

        loop {
            tokio::select! {
                _ = sink.closed() => {
                    trace!(%query, "live query cancelled");
                    return;
                }
                signal = signals.recv() => match signal {
                    Ok(Signal::Changed(change)) if change.affects(query.collection()) => break,
                    Ok(Signal::Changed(_)) => continue,
                    Ok(Signal::Offline) => {
                        sink.send(Err(StoreError::Subscription("store went offline".to_string())))
                            .await;
                        return;
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(%query, skipped, "change feed lagged, re-reading");
                        break;
                    }
                    Err(RecvError::Closed) => {
                        sink.send(Err(StoreError::Subscription("change feed closed".to_string())))
                            .await;
                        return;
                    }
                }
            }
        }
    }
}
