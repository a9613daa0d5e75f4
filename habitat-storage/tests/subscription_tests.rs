use futures::StreamExt;
use habitat_storage::{Snapshot, StoreError, Subscription};

// ── Delivery ────────────────────────────────────────────────────

#[tokio::test]
async fn delivers_snapshots_in_order() {
    let (sink, mut sub) = Subscription::<u32>::channel(4);
    assert!(sink.send(Ok(Snapshot::new(1, vec![1]))).await);
    assert!(sink.send(Ok(Snapshot::new(2, vec![1, 2]))).await);

    assert_eq!(sub.recv().await, Some(Ok(Snapshot::new(1, vec![1]))));
    assert_eq!(sub.recv().await, Some(Ok(Snapshot::new(2, vec![1, 2]))));
}

#[tokio::test]
async fn error_is_terminal() {
    let (sink, mut sub) = Subscription::<u32>::channel(4);
    assert!(sink.try_send(Err(StoreError::Subscription("lost".into()))));
    assert!(sink.try_send(Ok(Snapshot::new(5, vec![5]))));

    assert_eq!(
        sub.recv().await,
        Some(Err(StoreError::Subscription("lost".into())))
    );
    assert_eq!(sub.recv().await, None);
}

#[tokio::test]
async fn failed_yields_one_error() {
    let mut sub = Subscription::<u32>::failed(StoreError::Unavailable("down".into()));
    assert!(matches!(sub.next().await, Some(Err(StoreError::Unavailable(_)))));
    assert!(sub.next().await.is_none());
}

#[tokio::test]
async fn ends_when_producer_drops() {
    let (sink, mut sub) = Subscription::<u32>::channel(1);
    drop(sink);
    assert_eq!(sub.recv().await, None);
}

// ── Cancellation ────────────────────────────────────────────────

#[tokio::test]
async fn cancel_discards_buffered_snapshots() {
    let (sink, mut sub) = Subscription::<u32>::channel(4);
    assert!(sink.try_send(Ok(Snapshot::new(1, vec![1]))));
    sub.cancel();

    assert!(sub.is_cancelled());
    assert_eq!(sub.recv().await, None);
    assert!(sink.is_closed());
    assert!(!sink.send(Ok(Snapshot::new(2, vec![]))).await);
}

#[tokio::test]
async fn dropping_subscription_wakes_producer() {
    let (sink, sub) = Subscription::<u32>::channel(1);
    let producer = tokio::spawn(async move {
        sink.closed().await;
        sink.is_closed()
    });
    drop(sub);
    assert!(producer.await.unwrap());
}

#[tokio::test]
async fn cancel_token_is_shared() {
    let (sink, sub) = Subscription::<u32>::channel(1);
    let token = sub.token();
    assert!(!sink.token().is_cancelled());
    token.cancel();
    assert!(sink.token().is_cancelled());
    assert!(sub.is_cancelled());
    token.cancelled().await;
}
