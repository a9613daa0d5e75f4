use habitat_model::{fields, EntityKind};
use habitat_storage::{Filter, Query};
use habitat_types::EntityId;
use serde_json::json;

// ── Filters ─────────────────────────────────────────────────────

#[test]
fn eq_matches_string_and_integer_ids() {
    let filter = Filter::Eq {
        field: fields::SOCIETY_ID.to_string(),
        value: EntityId::from(42u64),
    };
    assert!(filter.matches(&json!({ "society_id": "42" })));
    assert!(filter.matches(&json!({ "society_id": 42 })));
    assert!(!filter.matches(&json!({ "society_id": "43" })));
    assert!(!filter.matches(&json!({})));
}

#[test]
fn absent_accepts_every_empty_form() {
    let filter = Filter::Absent {
        field: fields::BLOCK_ID.to_string(),
    };
    assert!(filter.matches(&json!({})));
    assert!(filter.matches(&json!({ "block_id": null })));
    assert!(filter.matches(&json!({ "block_id": "" })));
    assert!(filter.matches(&json!({ "block_id": 0 })));
    assert!(filter.matches(&json!({ "block_id": "0" })));
    assert!(!filter.matches(&json!({ "block_id": "b1" })));
    assert!(!filter.matches(&json!({ "block_id": 7 })));
}

// ── Queries ─────────────────────────────────────────────────────

#[test]
fn query_requires_all_filters() {
    let society = EntityId::from("s1");
    let query = Query::children(EntityKind::Flat, fields::SOCIETY_ID, &society)
        .and_absent(fields::BLOCK_ID)
        .and_absent(fields::TOWER_ID);

    assert!(query.matches(&json!({ "society_id": "s1", "block_id": null, "tower_id": null })));
    assert!(!query.matches(&json!({ "society_id": "s1", "block_id": "b1", "tower_id": null })));
    assert!(!query.matches(&json!({ "society_id": "s1", "tower_id": "t1" })));
    assert!(!query.matches(&json!({ "society_id": "s2" })));
}

#[test]
fn root_query_matches_everything() {
    let query = Query::all(EntityKind::Country);
    assert_eq!(query.collection(), "countries");
    assert!(query.matches(&json!({ "name": "India" })));
}

#[test]
fn queries_compare_by_value() {
    let a = Query::children(EntityKind::State, fields::COUNTRY_ID, &EntityId::from("c1"));
    let b = Query::children(EntityKind::State, fields::COUNTRY_ID, &EntityId::from("c1"));
    let c = Query::children(EntityKind::State, fields::COUNTRY_ID, &EntityId::from("c2"));
    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn display_reads_like_a_where_clause() {
    let query = Query::children(EntityKind::Tower, fields::SOCIETY_ID, &EntityId::from("s1"))
        .and_absent(fields::BLOCK_ID);
    assert_eq!(
        query.to_string(),
        "towers where society_id = s1 and block_id is absent"
    );
}
