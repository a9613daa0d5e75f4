use habitat_model::{fields, Block, Country, EntityKind};
use habitat_storage::mock::ScriptedStore;
use habitat_storage::{EntityStore, Query, StoreError, Subscription};
use habitat_types::EntityId;

fn countries() -> Query {
    Query::all(EntityKind::Country)
}

#[tokio::test]
async fn ids_count_up_from_one() {
    let store = ScriptedStore::new();
    let first = store.create(&Country::new("India")).await.unwrap();
    let second = store.create(&Country::new("Nepal")).await.unwrap();
    assert_eq!(first, EntityId::from(1u64));
    assert_eq!(second, EntityId::from("2"));
    assert_eq!(store.changes().len(), 2);
}

#[tokio::test]
async fn emit_reaches_matching_subscriptions() {
    let store = ScriptedStore::new();
    let mut sub: Subscription<Country> = store.subscribe(countries()).await.unwrap();
    assert!(store.is_open(&countries()));

    assert_eq!(store.emit(&countries(), vec![Country::new("India")]), 1);
    let snapshot = sub.recv().await.unwrap().unwrap();
    assert_eq!(snapshot.items[0].name, "India");

    let blocks = Query::children(EntityKind::Block, fields::SOCIETY_ID, &EntityId::from("s1"));
    assert_eq!(store.emit::<Block>(&blocks, vec![]), 0);
}

#[tokio::test]
async fn cancelled_subscriptions_are_pruned() {
    let store = ScriptedStore::new();
    let sub: Subscription<Country> = store.subscribe(countries()).await.unwrap();
    sub.cancel();

    assert!(store.open_queries().is_empty());
    assert_eq!(store.emit(&countries(), vec![Country::new("India")]), 0);
    assert_eq!(store.opened_total(), 1);
}

#[tokio::test]
async fn fail_terminates_and_closes() {
    let store = ScriptedStore::new();
    let mut sub: Subscription<Country> = store.subscribe(countries()).await.unwrap();

    store.fail::<Country>(&countries(), StoreError::Subscription("reset".into()));
    assert!(matches!(sub.recv().await, Some(Err(StoreError::Subscription(_)))));
    assert!(sub.recv().await.is_none());
    assert!(!store.is_open(&countries()));
}

#[tokio::test]
async fn fail_next_hits_one_call() {
    let store = ScriptedStore::new();
    store.fail_next(StoreError::Unavailable("offline".into()));

    let err = store.create(&Country::new("India")).await.unwrap_err();
    assert!(matches!(err, StoreError::Unavailable(_)));
    store.create(&Country::new("India")).await.unwrap();
}

#[tokio::test]
async fn waits_for_late_subscription() {
    let store = std::sync::Arc::new(ScriptedStore::new());
    let waiter = {
        let store = store.clone();
        tokio::spawn(async move { store.wait_for_subscription(&countries()).await })
    };
    let _sub: Subscription<Country> = store.subscribe(countries()).await.unwrap();
    waiter.await.unwrap();
}
