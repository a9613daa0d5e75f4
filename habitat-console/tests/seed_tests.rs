use habitat_console::seed::{self, SeedFile, SeedReport};
use habitat_hierarchy::{queries, HierarchyError, HierarchyRepository};
use habitat_model::{Block, EntityKind, Flat, FlatStatus, HierarchyEntity, Society, Tower};
use habitat_storage::{EntityStore, MemoryStore, Query};
use pretty_assertions::assert_eq;
use std::sync::Arc;

const SEED: &str = r#"{
  "countries": [
    { "name": "India", "iso2": "IN", "iso3": "IND", "phone_code": "+91", "currency": "INR", "states": [
      { "name": "Karnataka", "code": "KA", "type": "state", "cities": [
        { "name": "Bengaluru", "societies": [
          { "name": "Palm Meadows",
            "flats": [ { "number": "G-01", "status": "occupied" } ],
            "blocks": [
              { "name": "A", "type": "residential",
                "flats": [ { "number": "A-101", "floor": 1, "type": "2BHK", "area": 1150.5 } ],
                "towers": [ { "name": "A-East" } ] }
            ],
            "towers": [ { "name": "T1", "flats": [ { "number": "T1-1203", "floor": 12 } ] } ] }
        ] }
      ] }
    ] }
  ]
}"#;

fn repo() -> (Arc<MemoryStore>, HierarchyRepository<MemoryStore>) {
    let store = Arc::new(MemoryStore::in_memory());
    (store.clone(), HierarchyRepository::new(store))
}

async fn all<T: HierarchyEntity>(store: &MemoryStore, query: Query) -> Vec<T>
where
    MemoryStore: EntityStore<T>,
{
    let mut sub = <MemoryStore as EntityStore<T>>::subscribe(store, query).await.unwrap();
    sub.recv().await.unwrap().unwrap().items
}

// ── Parsing ─────────────────────────────────────────────────────

#[test]
fn parse_fills_defaults() {
    let seed = SeedFile::parse(r#"{ "countries": [ { "name": "Nepal" } ] }"#).unwrap();
    assert_eq!(seed.countries.len(), 1);
    assert_eq!(seed.countries[0].iso2, "");
    assert!(seed.countries[0].states.is_empty());
}

#[test]
fn parse_empty_document() {
    let seed = SeedFile::parse("{}").unwrap();
    assert!(seed.countries.is_empty());
}

#[test]
fn parse_rejects_nameless_country() {
    assert!(SeedFile::parse(r#"{ "countries": [ { "iso2": "IN" } ] }"#).is_err());
}

// ── Loading ─────────────────────────────────────────────────────

#[tokio::test]
async fn load_counts_every_kind() {
    let (_store, repo) = repo();
    let report = seed::load(&repo, &SeedFile::parse(SEED).unwrap()).await.unwrap();

    assert_eq!(report.get(EntityKind::Country), 1);
    assert_eq!(report.get(EntityKind::State), 1);
    assert_eq!(report.get(EntityKind::City), 1);
    assert_eq!(report.get(EntityKind::Society), 1);
    assert_eq!(report.get(EntityKind::Block), 1);
    assert_eq!(report.get(EntityKind::Tower), 2);
    assert_eq!(report.get(EntityKind::Flat), 3);
    assert_eq!(report.total(), 10);
}

#[tokio::test]
async fn load_places_flats_exclusively() {
    let (store, repo) = repo();
    seed::load(&repo, &SeedFile::parse(SEED).unwrap()).await.unwrap();

    let societies: Vec<Society> = all(&store, Query::all(EntityKind::Society)).await;
    assert_eq!(societies.len(), 1);
    let society = &societies[0];
    assert!(!society.country_id.is_placeholder());

    let direct: Vec<Flat> = all(&store, queries::flats_of(&society.id)).await;
    assert_eq!(direct.len(), 1);
    assert_eq!(direct[0].number, "G-01");
    assert_eq!(direct[0].status, FlatStatus::Occupied);

    let blocks: Vec<Block> = all(&store, queries::blocks_of(&society.id)).await;
    let in_block: Vec<Flat> = all(&store, queries::flats_of_block(&blocks[0].id)).await;
    assert_eq!(in_block.len(), 1);
    assert_eq!(in_block[0].flat_type, "2BHK");
    assert_eq!(in_block[0].tower_id, None);

    let block_towers: Vec<Tower> = all(&store, queries::towers_of_block(&blocks[0].id)).await;
    assert_eq!(block_towers.len(), 1);
    assert_eq!(block_towers[0].name, "A-East");

    let towers: Vec<Tower> = all(&store, queries::towers_of(&society.id)).await;
    let t1 = towers.iter().find(|t| t.name == "T1").unwrap();
    let in_tower: Vec<Flat> = all(&store, queries::flats_of_tower(&t1.id)).await;
    assert_eq!(in_tower.len(), 1);
    assert_eq!(in_tower[0].block_id, None);
    assert_eq!(in_tower[0].society_id, society.id);
}

#[tokio::test]
async fn load_stops_at_store_failure() {
    let store = Arc::new(MemoryStore::in_memory());
    store.set_online(false);
    let repo = HierarchyRepository::new(store);

    let err = seed::load(&repo, &SeedFile::parse(SEED).unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, HierarchyError::StoreUnavailable { .. }));
}

// ── Report ──────────────────────────────────────────────────────

#[test]
fn empty_report_displays_nothing() {
    assert_eq!(SeedReport::default().to_string(), "nothing");
}

#[tokio::test]
async fn report_display_names_collections() {
    let (_store, repo) = repo();
    let seed =
        SeedFile::parse(r#"{ "countries": [ { "name": "Nepal" }, { "name": "Bhutan" } ] }"#)
            .unwrap();
    let report = seed::load(&repo, &seed).await.unwrap();
    assert_eq!(report.to_string(), "2 countries");
}
