//! Live subscriptions.
//!
//! A subscription is a channel of full-collection [`Snapshot`]s plus a shared
//! [`CancelToken`]. The store keeps the [`SnapshotSink`] end, the consumer the
//! [`Subscription`] end. Cancelling (or dropping the subscription) flips the
//! token: the consumer stops yielding immediately, and the producer notices on
//! its next send or while parked in [`SnapshotSink::closed`].

use crate::error::{StoreError, StoreResult};
use futures::Stream;
use std::future::poll_fn;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::{mpsc, Notify};

/// One full view of a query's result set.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<T> {
    /// Store revision the snapshot was read at.
    pub revision: u64,
    pub items: Vec<T>,
}

impl<T> Snapshot<T> {
    pub fn new(revision: u64, items: Vec<T>) -> Self {
        Self { revision, items }
    }
}

/// What a subscription yields: a snapshot, or a terminal error.
pub type SnapshotResult<T> = StoreResult<Snapshot<T>>;

#[derive(Debug, Default)]
struct CancelState {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Shared cancellation flag of one subscription.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    state: Arc<CancelState>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the subscription cancelled and wakes the producer.
    pub fn cancel(&self) {
        if !self.state.cancelled.swap(true, Ordering::SeqCst) {
            self.state.notify.notify_waiters();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once the token is cancelled.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.state.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Producer end, held by the store.
#[derive(Debug)]
pub struct SnapshotSink<T> {
    tx: mpsc::Sender<SnapshotResult<T>>,
    token: CancelToken,
}

impl<T> SnapshotSink<T> {
    /// Delivers a snapshot or error, waiting for buffer space.
    /// Returns false once the consumer is gone or cancelled.
    pub async fn send(&self, item: SnapshotResult<T>) -> bool {
        if self.is_closed() {
            return false;
        }
        tokio::select! {
            sent = self.tx.send(item) => sent.is_ok() && !self.token.is_cancelled(),
            _ = self.token.cancelled() => false,
        }
    }

    /// Non-blocking delivery. Returns false if cancelled, closed or full.
    pub fn try_send(&self, item: SnapshotResult<T>) -> bool {
        !self.is_closed() && self.tx.try_send(item).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.token.is_cancelled() || self.tx.is_closed()
    }

    /// Resolves when the consumer cancels or drops its end.
    pub async fn closed(&self) {
        tokio::select! {
            _ = self.tx.closed() => {}
            _ = self.token.cancelled() => {}
        }
    }

    pub fn token(&self) -> &CancelToken {
        &self.token
    }
}

/// Consumer end: a cancelable stream of snapshots.
///
/// Ends after the first error; errors are never followed by more data.
#[derive(Debug)]
pub struct Subscription<T> {
    rx: mpsc::Receiver<SnapshotResult<T>>,
    token: CancelToken,
    finished: bool,
}

// Only the receiver is polled; no field is structurally pinned.
impl<T> Unpin for Subscription<T> {}

impl<T> Subscription<T> {
    /// Creates a connected sink/subscription pair.
    pub fn channel(capacity: usize) -> (SnapshotSink<T>, Subscription<T>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let token = CancelToken::new();
        (
            SnapshotSink {
                tx,
                token: token.clone(),
            },
            Subscription {
                rx,
                token,
                finished: false,
            },
        )
    }

    /// A subscription that yields one error and ends.
    pub fn failed(error: StoreError) -> Self {
        let (sink, sub) = Self::channel(1);
        sink.try_send(Err(error));
        sub
    }

    /// Next snapshot, `None` once ended or cancelled.
    pub async fn recv(&mut self) -> Option<SnapshotResult<T>> {
        poll_fn(|cx| self.poll_snapshot(cx)).await
    }

    /// Stops delivery. After this returns no further item is yielded.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }

    fn poll_snapshot(&mut self, cx: &mut Context<'_>) -> Poll<Option<SnapshotResult<T>>> {
        if self.finished || self.token.is_cancelled() {
            return Poll::Ready(None);
        }
        match self.rx.poll_recv(cx) {
            Poll::Ready(Some(item)) => {
                if self.token.is_cancelled() {
                    return Poll::Ready(None);
                }
                if item.is_err() {
                    self.finished = true;
                }
                Poll::Ready(Some(item))
            }
            Poll::Ready(None) => {
                self.finished = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T> Stream for Subscription<T> {
    type Item = SnapshotResult<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().poll_snapshot(cx)
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
