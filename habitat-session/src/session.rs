//! The session actor.
//!
//! One task owns the [`SelectionMachine`] and the [`SubscriptionManager`];
//! nothing else writes to either. Handles talk to it over a command channel
//! and read the latest [`HierarchySnapshot`] from a watch channel. Forwarders
//! feed it deliveries, and mutations run in their own tasks so a slow store
//! call never holds up snapshot delivery.

use crate::config::{DeletePolicy, SessionConfig};
use crate::error::{SessionError, SessionResult};
use crate::machine::{HierarchySnapshot, Selection, SelectionEvent, SelectionMachine, Transition};
use crate::slots::{Delivery, SlotKey, SlotUpdate, SubscriptionManager};
use habitat_hierarchy::{HierarchyRepository, HierarchyResult};
use habitat_model::{EntityKind, Record};
use habitat_storage::HierarchyStore;
use habitat_types::EntityId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, trace, warn};

/// A write requested through the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Mutation {
    Add { record: Record },
    Update { record: Record },
    Delete { kind: EntityKind, id: EntityId },
}

/// Anything a consumer can submit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEvent {
    Select(SelectionEvent),
    Mutate(Mutation),
}

impl From<SelectionEvent> for SessionEvent {
    fn from(event: SelectionEvent) -> Self {
        SessionEvent::Select(event)
    }
}

impl From<Mutation> for SessionEvent {
    fn from(mutation: Mutation) -> Self {
        SessionEvent::Mutate(mutation)
    }
}

type Ack = oneshot::Sender<Arc<HierarchySnapshot>>;

enum Command {
    Submit { event: SessionEvent, ack: Ack },
    ActiveSlots { reply: oneshot::Sender<Vec<SlotKey>> },
    Shutdown,
}

struct Outcome {
    mutation: Mutation,
    result: HierarchyResult<()>,
    ack: Ack,
}

/// Entry point for starting sessions.
pub struct Session;

impl Session {
    /// Starts a session over `store` and opens the root subscription.
    ///
    /// Must be called inside a tokio runtime.
    pub fn spawn<S: HierarchyStore>(store: Arc<S>, config: SessionConfig) -> SessionHandle {
        let (command_tx, command_rx) = mpsc::channel(config.command_buffer.max(1));
        let (delivery_tx, delivery_rx) = mpsc::channel(config.delivery_buffer.max(1));
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        let machine = SelectionMachine::new();
        let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(machine.snapshot().clone()));

        let repo = HierarchyRepository::new(store);
        let actor = Actor {
            slots: SubscriptionManager::new(repo.clone(), delivery_tx),
            repo,
            machine,
            config,
            snapshots: snapshot_tx,
            commands: command_rx,
            deliveries: delivery_rx,
            outcome_tx,
            outcomes: outcome_rx,
        };
        tokio::spawn(actor.run());

        SessionHandle {
            commands: command_tx,
            snapshots: snapshot_rx,
        }
    }
}

/// Cloneable handle to a running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<Arc<HierarchySnapshot>>,
}

impl SessionHandle {
    /// Applies an event and returns the snapshot right after it took effect.
    ///
    /// Selections take effect immediately; their lists arrive later. A
    /// mutation takes effect once the store has answered. Failures show up
    /// in the returned snapshot's `last_error`.
    pub async fn submit(
        &self,
        event: impl Into<SessionEvent>,
    ) -> SessionResult<Arc<HierarchySnapshot>> {
        let (ack, done) = oneshot::channel();
        self.commands
            .send(Command::Submit {
                event: event.into(),
                ack,
            })
            .await
            .map_err(|_| SessionError::Closed)?;
        done.await.map_err(|_| SessionError::Closed)
    }

    /// The latest published snapshot.
    pub fn current_snapshot(&self) -> Arc<HierarchySnapshot> {
        self.snapshots.borrow().clone()
    }

    /// A receiver that sees every published snapshot.
    pub fn watch(&self) -> watch::Receiver<Arc<HierarchySnapshot>> {
        self.snapshots.clone()
    }

    /// Waits until a published snapshot satisfies `predicate`.
    pub async fn wait_for(
        &self,
        predicate: impl FnMut(&Arc<HierarchySnapshot>) -> bool,
    ) -> SessionResult<Arc<HierarchySnapshot>> {
        let mut rx = self.snapshots.clone();
        let snapshot = rx
            .wait_for(predicate)
            .await
            .map_err(|_| SessionError::Closed)?
            .clone();
        Ok(snapshot)
    }

    /// Keys of the subscriptions currently open, root first.
    pub async fn active_slots(&self) -> SessionResult<Vec<SlotKey>> {
        let (reply, keys) = oneshot::channel();
        self.commands
            .send(Command::ActiveSlots { reply })
            .await
            .map_err(|_| SessionError::Closed)?;
        keys.await.map_err(|_| SessionError::Closed)
    }

    /// Stops the session and cancels all of its subscriptions.
    pub async fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown).await;
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Submit { event, .. } => f.debug_tuple("Submit").field(event).finish(),
            Command::ActiveSlots { .. } => f.write_str("ActiveSlots"),
            Command::Shutdown => f.write_str("Shutdown"),
        }
    }
}

struct Actor<S> {
    repo: HierarchyRepository<S>,
    machine: SelectionMachine,
    slots: SubscriptionManager<S>,
    config: SessionConfig,
    snapshots: watch::Sender<Arc<HierarchySnapshot>>,
    commands: mpsc::Receiver<Command>,
    deliveries: mpsc::Receiver<Delivery>,
    outcome_tx: mpsc::UnboundedSender<Outcome>,
    outcomes: mpsc::UnboundedReceiver<Outcome>,
}

impl<S: HierarchyStore> Actor<S> {
    async fn run(mut self) {
        info!("session started");
        let boot = self.machine.boot();
        self.carry_out(&boot);
        self.publish();

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Submit { event, ack }) => self.submit(event, ack),
                    Some(Command::ActiveSlots { reply }) => {
                        let _ = reply.send(self.slots.active_keys());
                    }
                    Some(Command::Shutdown) | None => break,
                },
                Some(delivery) = self.deliveries.recv() => self.on_delivery(delivery),
                Some(outcome) = self.outcomes.recv() => self.on_outcome(outcome),
            }
        }

        self.slots.cancel_all();
        info!("session stopped");
    }

    fn carry_out(&mut self, transition: &Transition) {
        for slot in &transition.cancel {
            self.slots.cancel(*slot);
        }
        for key in &transition.open {
            self.slots.open(key.clone());
        }
    }

    fn publish(&self) -> Arc<HierarchySnapshot> {
        let snapshot = Arc::new(self.machine.snapshot().clone());
        self.snapshots.send_replace(snapshot.clone());
        snapshot
    }

    fn submit(&mut self, event: SessionEvent, ack: Ack) {
        self.machine.clear_error();
        match event {
            SessionEvent::Select(event) => {
                let transition = self.machine.apply(event);
                self.carry_out(&transition);
                let _ = ack.send(self.publish());
            }
            SessionEvent::Mutate(mutation) => {
                self.publish();
                let repo = self.repo.clone();
                let selection = self.machine.selection().clone();
                let outcome_tx = self.outcome_tx.clone();
                tokio::spawn(async move {
                    let result = mutate(&repo, &mutation, &selection).await;
                    let _ = outcome_tx.send(Outcome {
                        mutation,
                        result,
                        ack,
                    });
                });
            }
        }
    }

    fn on_outcome(&mut self, outcome: Outcome) {
        match outcome.result {
            Ok(()) => {
                if let Mutation::Delete { kind, id } = &outcome.mutation
                    && self.config.delete_policy == DeletePolicy::ClearSelection
                    && let Some(transition) = self.machine.forget(*kind, id)
                {
                    self.carry_out(&transition);
                }
            }
            Err(err) => {
                warn!(mutation = ?outcome.mutation, "mutation failed: {err}");
                self.machine.record_error(err);
            }
        }
        let _ = outcome.ack.send(self.publish());
    }

    fn on_delivery(&mut self, delivery: Delivery) {
        if !self.slots.accepts(&delivery) {
            trace!(
                slot = ?delivery.slot,
                generation = delivery.generation,
                "dropping delivery from a replaced subscription"
            );
            return;
        }
        // A failed subscription is over; the slot stays empty until reopened.
        if matches!(delivery.update, SlotUpdate::Failed(_)) {
            self.slots.cancel(delivery.slot);
        }
        self.machine.deliver(delivery.slot, delivery.update);
        self.publish();
    }
}

async fn mutate<S: HierarchyStore>(
    repo: &HierarchyRepository<S>,
    mutation: &Mutation,
    selection: &Selection,
) -> HierarchyResult<()> {
    let ctx = selection.placement_context();
    match mutation {
        Mutation::Add { record } => {
            let id = repo.add_record(record, &ctx).await?;
            debug!(kind = %record.kind(), %id, "record added");
            Ok(())
        }
        Mutation::Update { record } => repo.update_record(record, &ctx).await,
        Mutation::Delete { kind, id } => repo.delete_kind(*kind, id).await,
    }
}
