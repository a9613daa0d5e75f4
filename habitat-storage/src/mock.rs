//! A scripted store for testing consumers of [`EntityStore`].
//!
//! Nothing is pushed automatically: tests decide which snapshot or error each
//! open query sees and when, which makes interleavings (a late snapshot for a
//! query that was already replaced) reproducible.

use crate::adapter::EntityStore;
use crate::error::{StoreError, StoreResult};
use crate::query::Query;
use crate::subscription::{CancelToken, Snapshot, SnapshotSink, Subscription};
use async_trait::async_trait;
use habitat_model::{fields, EntityKind, HierarchyEntity};
use habitat_types::{Change, ChangeKind, EntityId};
use serde_json::Value;
use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use tokio::sync::Notify;

struct ScriptedSubscription {
    query: Query,
    token: CancelToken,
    sink: Box<dyn Any + Send>,
}

#[derive(Default)]
struct Script {
    next_id: u64,
    revision: u64,
    documents: HashMap<EntityKind, BTreeMap<EntityId, Value>>,
    subscriptions: Vec<ScriptedSubscription>,
    opened_total: usize,
    fail_next: Option<StoreError>,
    changes: Vec<Change>,
}

impl Script {
    fn prune(&mut self) {
        self.subscriptions.retain(|s| !s.token.is_cancelled());
    }

    fn take_failure(&mut self) -> StoreResult<()> {
        match self.fail_next.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn record(&mut self, kind: EntityKind, id: EntityId, change: ChangeKind) {
        self.revision += 1;
        self.changes
            .push(Change::new(self.revision, kind.collection(), id, change));
    }
}

/// Store double with scripted subscriptions and integer ids.
#[derive(Default)]
pub struct ScriptedStore {
    script: Mutex<Script>,
    opened: Notify,
}

impl ScriptedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a snapshot to every open subscription for `query`.
    /// Returns how many subscriptions received it.
    pub fn emit<T: HierarchyEntity>(&self, query: &Query, items: Vec<T>) -> usize {
        let mut script = self.script.lock().unwrap();
        script.prune();
        script.revision += 1;
        let revision = script.revision;
        script
            .subscriptions
            .iter()
            .filter(|s| &s.query == query)
            .filter_map(|s| s.sink.downcast_ref::<SnapshotSink<T>>())
            .filter(|sink| sink.try_send(Ok(Snapshot::new(revision, items.clone()))))
            .count()
    }

    /// Terminates every open subscription for `query` with `error`.
    pub fn fail<T: HierarchyEntity>(&self, query: &Query, error: StoreError) -> usize {
        let mut script = self.script.lock().unwrap();
        script.prune();
        let delivered = script
            .subscriptions
            .iter()
            .filter(|s| &s.query == query)
            .filter_map(|s| s.sink.downcast_ref::<SnapshotSink<T>>())
            .filter(|sink| sink.try_send(Err(error.clone())))
            .count();
        script.subscriptions.retain(|s| &s.query != query);
        delivered
    }

    /// Queries with a live (not cancelled) subscription, in opening order.
    pub fn open_queries(&self) -> Vec<Query> {
        let mut script = self.script.lock().unwrap();
        script.prune();
        script.subscriptions.iter().map(|s| s.query.clone()).collect()
    }

    pub fn is_open(&self, query: &Query) -> bool {
        self.open_queries().contains(query)
    }

    /// Subscriptions ever opened, cancelled ones included.
    pub fn opened_total(&self) -> usize {
        self.script.lock().unwrap().opened_total
    }

    /// Waits until a subscription for `query` is open.
    pub async fn wait_for_subscription(&self, query: &Query) {
        loop {
            let notified = self.opened.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_open(query) {
                return;
            }
            notified.await;
        }
    }

    /// Makes the next CRUD or subscribe call fail with `error`.
    pub fn fail_next(&self, error: StoreError) {
        self.script.lock().unwrap().fail_next = Some(error);
    }

    /// Every successful write, oldest first.
    pub fn changes(&self) -> Vec<Change> {
        self.script.lock().unwrap().changes.clone()
    }

    /// Stored document of a kind, if any.
    pub fn document(&self, kind: EntityKind, id: &EntityId) -> Option<Value> {
        self.script
            .lock()
            .unwrap()
            .documents
            .get(&kind)
            .and_then(|docs| docs.get(id))
            .cloned()
    }
}

#[async_trait]
impl<T: HierarchyEntity> EntityStore<T> for ScriptedStore {
    async fn create(&self, entity: &T) -> StoreResult<EntityId> {
        let mut script = self.script.lock().unwrap();
        script.take_failure()?;
        script.next_id += 1;
        let id = EntityId::from(script.next_id);
        let mut doc = serde_json::to_value(entity)?;
        if let Value::Object(map) = &mut doc {
            map.insert(fields::ID.to_string(), Value::String(id.to_string()));
        }
        script
            .documents
            .entry(T::KIND)
            .or_default()
            .insert(id.clone(), doc);
        script.record(T::KIND, id.clone(), ChangeKind::Created);
        Ok(id)
    }

    async fn update(&self, id: &EntityId, entity: &T) -> StoreResult<()> {
        let changes = serde_json::to_value(entity)?;
        EntityStore::<T>::patch(self, id, changes).await
    }

    async fn patch(&self, id: &EntityId, changes: Value) -> StoreResult<()> {
        let mut script = self.script.lock().unwrap();
        script.take_failure()?;
        let Some(Value::Object(doc)) = script
            .documents
            .get_mut(&T::KIND)
            .and_then(|docs| docs.get_mut(id))
        else {
            return Err(StoreError::NotFound {
                kind: T::KIND,
                id: id.clone(),
            });
        };
        if let Value::Object(changes) = changes {
            for (field, value) in changes {
                if field != fields::ID {
                    doc.insert(field, value);
                }
            }
        }
        script.record(T::KIND, id.clone(), ChangeKind::Updated);
        Ok(())
    }

    async fn delete(&self, id: &EntityId) -> StoreResult<()> {
        let mut script = self.script.lock().unwrap();
        script.take_failure()?;
        let removed = script
            .documents
            .get_mut(&T::KIND)
            .and_then(|docs| docs.remove(id))
            .is_some();
        if !removed {
            return Err(StoreError::NotFound {
                kind: T::KIND,
                id: id.clone(),
            });
        }
        script.record(T::KIND, id.clone(), ChangeKind::Deleted);
        Ok(())
    }

    async fn get_by_id(&self, id: &EntityId) -> StoreResult<Option<T>> {
        let mut script = self.script.lock().unwrap();
        script.take_failure()?;
        let doc = script
            .documents
            .get(&T::KIND)
            .and_then(|docs| docs.get(id))
            .cloned();
        doc.map(serde_json::from_value::<T>)
            .transpose()
            .map_err(Into::into)
    }

    async fn subscribe(&self, query: Query) -> StoreResult<Subscription<T>> {
        let subscription = {
            let mut script = self.script.lock().unwrap();
            script.take_failure()?;
            let (sink, subscription) = Subscription::<T>::channel(16);
            script.opened_total += 1;
            script.subscriptions.push(ScriptedSubscription {
                query,
                token: sink.token().clone(),
                sink: Box::new(sink),
            });
            subscription
        };
        self.opened.notify_waiters();
        Ok(subscription)
    }
}
