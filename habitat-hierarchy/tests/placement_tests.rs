use habitat_hierarchy::{resolve_parent, HierarchyError, PlacementContext};
use habitat_model::{Block, FlatParent, Placement, Society, Tower};
use habitat_types::EntityId;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn society(id: &str) -> Society {
    Society {
        id: EntityId::from(id),
        name: format!("Society {id}"),
        ..Default::default()
    }
}

fn block(id: &str, society: &str) -> Block {
    Block {
        id: EntityId::from(id),
        ..Block::new(format!("Block {id}"), EntityId::from(society))
    }
}

fn tower(id: &str, society: &str) -> Tower {
    Tower {
        id: EntityId::from(id),
        ..Tower::new(format!("Tower {id}"), EntityId::from(society))
    }
}

// ── Priority ────────────────────────────────────────────────────

#[test]
fn society_only_places_directly() {
    let s = society("s1");
    let placement = resolve_parent(&PlacementContext::society(&s)).unwrap();
    assert_eq!(placement, Placement::society(EntityId::from("s1")));
}

#[test]
fn block_beats_society() {
    let s = society("s1");
    let b = block("b1", "s1");
    let placement = resolve_parent(&PlacementContext::society(&s).with_block(&b)).unwrap();
    assert_eq!(
        placement,
        Placement::block(EntityId::from("s1"), EntityId::from("b1"))
    );
}

#[test]
fn tower_beats_block() {
    let s = society("s1");
    let b = block("b1", "s1");
    let t = tower("t1", "s1");
    let ctx = PlacementContext::society(&s).with_block(&b).with_tower(&t);
    let placement = resolve_parent(&ctx).unwrap();
    assert_eq!(placement.parent(), FlatParent::Tower(EntityId::from("t1")));
    assert_eq!(placement.block_id, None);
}

#[test]
fn container_society_wins_over_selected_society() {
    let s = society("s1");
    let t = tower("t9", "s2");
    let placement = resolve_parent(&PlacementContext::society(&s).with_tower(&t)).unwrap();
    assert_eq!(placement.society_id, EntityId::from("s2"));
}

#[test]
fn nothing_selected_is_rejected() {
    let err = resolve_parent(&PlacementContext::default()).unwrap_err();
    assert!(matches!(err, HierarchyError::ValidationFailure { .. }));
}

// ── Invariant ───────────────────────────────────────────────────

fn id_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,6}"
}

proptest! {
    #[test]
    fn resolved_placement_is_always_exclusive(
        society_id in proptest::option::of(id_strategy()),
        block_parent in proptest::option::of((id_strategy(), id_strategy())),
        tower_parent in proptest::option::of((id_strategy(), id_strategy())),
    ) {
        let s = society_id.as_deref().map(society);
        let b = block_parent.as_ref().map(|(id, parent)| block(id, parent));
        let t = tower_parent.as_ref().map(|(id, parent)| tower(id, parent));
        let ctx = PlacementContext {
            society: s.as_ref(),
            block: b.as_ref(),
            tower: t.as_ref(),
        };

        match resolve_parent(&ctx) {
            Ok(placement) => {
                prop_assert!(placement.check().is_ok());
                prop_assert!(!(placement.block_id.is_some() && placement.tower_id.is_some()));
                if let Some(t) = &t {
                    prop_assert_eq!(&placement.tower_id, &Some(t.id.clone()));
                    prop_assert_eq!(&placement.society_id, &t.society_id);
                } else if let Some(b) = &b {
                    prop_assert_eq!(&placement.block_id, &Some(b.id.clone()));
                    prop_assert_eq!(&placement.society_id, &b.society_id);
                }
            }
            Err(_) => prop_assert!(s.is_none() && b.is_none() && t.is_none()),
        }
    }
}
