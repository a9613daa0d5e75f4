//! Subscription lifecycle manager.
//!
//! Each list the session shows lives in a [`Slot`]. A slot holds at most one
//! live subscription, identified by the [`SlotKey`] it was opened for and a
//! generation number that only ever grows. Cancelling a slot cancels its store
//! subscription on the spot and aborts the forwarder. A replacement forwarder
//! waits for its predecessor to be gone before it subscribes, so the store
//! never sees two subscriptions for one slot. Every [`Delivery`] carries the
//! generation it was produced under, so the session can drop anything a
//! replaced forwarder managed to queue before it died.

use crate::machine::Level;
use futures::StreamExt;
use habitat_hierarchy::{queries, HierarchyError, HierarchyRepository, HierarchyResult};
use habitat_model::{Block, City, Country, Flat, FlatParent, HierarchyEntity, Society, State, Tower};
use habitat_storage::{CancelToken, HierarchyStore, Query, Subscription};
use habitat_types::EntityId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// One candidate list of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Countries,
    States,
    Cities,
    Societies,
    Blocks,
    Towers,
    Flats,
}

impl Slot {
    pub const ALL: [Slot; 7] = [
        Slot::Countries,
        Slot::States,
        Slot::Cities,
        Slot::Societies,
        Slot::Blocks,
        Slot::Towers,
        Slot::Flats,
    ];

    /// The level of the entities this slot lists.
    pub fn level(self) -> Level {
        match self {
            Slot::Countries => Level::Country,
            Slot::States => Level::State,
            Slot::Cities => Level::City,
            Slot::Societies => Level::Society,
            Slot::Blocks | Slot::Towers => Level::Section,
            Slot::Flats => Level::Flat,
        }
    }
}

/// A slot together with the parent that scopes it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "slot", rename_all = "snake_case")]
pub enum SlotKey {
    Countries,
    States { country: EntityId },
    Cities { state: EntityId },
    Societies { city: EntityId },
    Blocks { society: EntityId },
    Towers { society: EntityId },
    Flats { parent: FlatParent },
}

impl SlotKey {
    pub fn slot(&self) -> Slot {
        match self {
            SlotKey::Countries => Slot::Countries,
            SlotKey::States { .. } => Slot::States,
            SlotKey::Cities { .. } => Slot::Cities,
            SlotKey::Societies { .. } => Slot::Societies,
            SlotKey::Blocks { .. } => Slot::Blocks,
            SlotKey::Towers { .. } => Slot::Towers,
            SlotKey::Flats { .. } => Slot::Flats,
        }
    }

    /// The store query this key subscribes to.
    pub fn query(&self) -> Query {
        match self {
            SlotKey::Countries => queries::countries(),
            SlotKey::States { country } => queries::states_of(country),
            SlotKey::Cities { state } => queries::cities_of(state),
            SlotKey::Societies { city } => queries::societies_of(city),
            SlotKey::Blocks { society } => queries::blocks_of(society),
            SlotKey::Towers { society } => queries::towers_of(society),
            SlotKey::Flats { parent } => queries::flats_under(parent),
        }
    }
}

/// New contents for one slot, or the error that ended its subscription.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotUpdate {
    Countries(Vec<Country>),
    States(Vec<State>),
    Cities(Vec<City>),
    Societies(Vec<Society>),
    Blocks(Vec<Block>),
    Towers(Vec<Tower>),
    Flats(Vec<Flat>),
    Failed(HierarchyError),
}

/// An update tagged with the slot instance that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub slot: Slot,
    pub generation: u64,
    pub update: SlotUpdate,
}

/// Entities that can fill a slot.
pub trait SlotItem: HierarchyEntity {
    fn into_update(items: Vec<Self>) -> SlotUpdate;
}

macro_rules! slot_item {
    ($($entity:ident => $variant:ident),* $(,)?) => {
        $(
            impl SlotItem for $entity {
                fn into_update(items: Vec<Self>) -> SlotUpdate {
                    SlotUpdate::$variant(items)
                }
            }
        )*
    };
}

slot_item! {
    Country => Countries,
    State => States,
    City => Cities,
    Society => Societies,
    Block => Blocks,
    Tower => Towers,
    Flat => Flats,
}

/// Cancellation state shared by a slot and its forwarder.
#[derive(Default)]
struct Link {
    cancelled: bool,
    token: Option<CancelToken>,
}

type SharedLink = Arc<Mutex<Link>>;

fn lock(link: &SharedLink) -> MutexGuard<'_, Link> {
    link.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Hands the store subscription's token to the slot.
/// Returns false, cancelling the subscription, if the slot was cancelled first.
fn attach(link: &SharedLink, token: CancelToken) -> bool {
    let mut link = lock(link);
    if link.cancelled {
        token.cancel();
        return false;
    }
    link.token = Some(token);
    true
}

struct Occupant {
    key: SlotKey,
    generation: u64,
    link: SharedLink,
    task: JoinHandle<()>,
}

impl Occupant {
    /// Cancels the store subscription now and aborts the forwarder.
    fn stop(self) -> JoinHandle<()> {
        {
            let mut link = lock(&self.link);
            link.cancelled = true;
            if let Some(token) = link.token.take() {
                token.cancel();
            }
        }
        self.task.abort();
        self.task
    }
}

/// Owns the forwarder task of every open slot.
pub struct SubscriptionManager<S> {
    repo: HierarchyRepository<S>,
    deliveries: mpsc::Sender<Delivery>,
    slots: HashMap<Slot, Occupant>,
    next_generation: u64,
}

impl<S: HierarchyStore> SubscriptionManager<S> {
    pub fn new(repo: HierarchyRepository<S>, deliveries: mpsc::Sender<Delivery>) -> Self {
        Self {
            repo,
            deliveries,
            slots: HashMap::new(),
            next_generation: 0,
        }
    }

    /// Installs a subscription for `key`, replacing whatever held its slot.
    /// Returns the new generation.
    pub fn open(&mut self, key: SlotKey) -> u64 {
        let slot = key.slot();
        let previous = self.take(slot);

        self.next_generation += 1;
        let generation = self.next_generation;
        debug!(?slot, generation, query = %key.query(), "opening slot");
        let link = SharedLink::default();
        let task = tokio::spawn(forward(
            self.repo.clone(),
            key.clone(),
            generation,
            self.deliveries.clone(),
            link.clone(),
            previous,
        ));
        self.slots.insert(
            slot,
            Occupant {
                key,
                generation,
                link,
                task,
            },
        );
        generation
    }

    /// Cancels the slot's subscription. Returns false if the slot was empty.
    pub fn cancel(&mut self, slot: Slot) -> bool {
        self.take(slot).is_some()
    }

    fn take(&mut self, slot: Slot) -> Option<JoinHandle<()>> {
        let occupant = self.slots.remove(&slot)?;
        trace!(?slot, generation = occupant.generation, "cancelling slot");
        Some(occupant.stop())
    }

    /// Whether `delivery` comes from the current occupant of its slot.
    pub fn accepts(&self, delivery: &Delivery) -> bool {
        self.slots
            .get(&delivery.slot)
            .is_some_and(|occupant| occupant.generation == delivery.generation)
    }

    /// Keys of all open slots, root first.
    pub fn active_keys(&self) -> Vec<SlotKey> {
        Slot::ALL
            .into_iter()
            .filter_map(|slot| self.slots.get(&slot).map(|o| o.key.clone()))
            .collect()
    }

    pub fn cancel_all(&mut self) {
        for slot in Slot::ALL {
            self.cancel(slot);
        }
    }
}

impl<S> Drop for SubscriptionManager<S> {
    fn drop(&mut self) {
        for (_, occupant) in self.slots.drain() {
            let _ = occupant.stop();
        }
    }
}

async fn forward<S: HierarchyStore>(
    repo: HierarchyRepository<S>,
    key: SlotKey,
    generation: u64,
    deliveries: mpsc::Sender<Delivery>,
    link: SharedLink,
    previous: Option<JoinHandle<()>>,
) {
    if let Some(previous) = previous {
        let _ = previous.await;
    }
    let slot = key.slot();
    let query = key.query();
    let out = Outlet {
        slot,
        generation,
        deliveries,
        link,
    };
    match key {
        SlotKey::Countries => pump::<Country>(repo.watch(query).await, out).await,
        SlotKey::States { .. } => pump::<State>(repo.watch(query).await, out).await,
        SlotKey::Cities { .. } => pump::<City>(repo.watch(query).await, out).await,
        SlotKey::Societies { .. } => pump::<Society>(repo.watch(query).await, out).await,
        SlotKey::Blocks { .. } => pump::<Block>(repo.watch(query).await, out).await,
        SlotKey::Towers { .. } => pump::<Tower>(repo.watch(query).await, out).await,
        SlotKey::Flats { .. } => pump::<Flat>(repo.watch(query).await, out).await,
    }
}

/// Where a forwarder sends its updates.
struct Outlet {
    slot: Slot,
    generation: u64,
    deliveries: mpsc::Sender<Delivery>,
    link: SharedLink,
}

impl Outlet {
    async fn send(&self, update: SlotUpdate) -> bool {
        let delivery = Delivery {
            slot: self.slot,
            generation: self.generation,
            update,
        };
        self.deliveries.send(delivery).await.is_ok()
    }
}

async fn pump<T: SlotItem>(opened: HierarchyResult<Subscription<T>>, out: Outlet) {
    let mut subscription = match opened {
        Ok(subscription) => subscription,
        Err(err) => {
            out.send(SlotUpdate::Failed(err)).await;
            return;
        }
    };
    if !attach(&out.link, subscription.token()) {
        return;
    }

    while let Some(item) = subscription.next().await {
        let update = match item {
            Ok(snapshot) => T::into_update(snapshot.items),
            Err(err) => SlotUpdate::Failed(err.into()),
        };
        if !out.send(update).await {
            break;
        }
    }
    trace!(slot = ?out.slot, generation = out.generation, "forwarder finished");
}
