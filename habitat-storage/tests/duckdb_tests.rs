#![cfg(feature = "duckdb")]

use habitat_model::{fields, Country, EntityKind, State, Tower};
use habitat_storage::{DocumentStore, EntityStore, Query, Subscription};
use habitat_types::EntityId;
use std::time::Duration;
use tokio::time::timeout;

#[tokio::test]
async fn crud_round_trip_in_memory() {
    let store = DocumentStore::duckdb_in_memory().unwrap();
    let id = store.create(&Country::new("India")).await.unwrap();

    store.update(&id, &Country::new("Bharat")).await.unwrap();
    let stored = EntityStore::<Country>::get_by_id(&store, &id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.name, "Bharat");

    EntityStore::<Country>::delete(&store, &id).await.unwrap();
    let gone = EntityStore::<Country>::get_by_id(&store, &id).await.unwrap();
    assert!(gone.is_none());
}

#[tokio::test]
async fn live_query_reads_optional_parent_fields() {
    let store = DocumentStore::duckdb_in_memory().unwrap();
    let society = EntityId::from("s1");
    store.create(&Tower::new("East", society.clone())).await.unwrap();
    store
        .create(&Tower::new("West", society.clone()).in_block(EntityId::from("b1")))
        .await
        .unwrap();

    let query = Query::children(EntityKind::Tower, fields::SOCIETY_ID, &society)
        .and_absent(fields::BLOCK_ID);
    let mut sub: Subscription<Tower> = store.subscribe(query).await.unwrap();
    let snapshot = timeout(Duration::from_secs(5), sub.recv())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let names: Vec<_> = snapshot.items.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["East"]);
}

#[tokio::test]
async fn documents_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("habitat.duckdb");

    let id = {
        let store = DocumentStore::open_duckdb(&path).unwrap();
        store
            .create(&State::new("Kerala", EntityId::from("in")))
            .await
            .unwrap()
    };

    let store = DocumentStore::open_duckdb(&path).unwrap();
    let stored = EntityStore::<State>::get_by_id(&store, &id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.name, "Kerala");
    assert_eq!(stored.country_id, EntityId::from("in"));
}
