use habitat_hierarchy::HierarchyError;
use habitat_model::{
    Block, City, Country, EntityKind, Flat, FlatParent, Placement, Society, State, Tower,
};
use habitat_session::{
    Level, Section, SelectionEvent, SelectionMachine, Slot, SlotKey, SlotUpdate, Transition,
};
use habitat_types::EntityId;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn id(n: u64) -> EntityId {
    EntityId::from(n)
}

fn country(n: u64) -> Country {
    Country {
        id: id(n),
        ..Country::new(format!("Country {n}"))
    }
}

fn state(n: u64, country: u64) -> State {
    State {
        id: id(n),
        ..State::new(format!("State {n}"), id(country))
    }
}

fn city(n: u64, state: u64) -> City {
    City {
        id: id(n),
        ..City::new(format!("City {n}"), id(1), id(state))
    }
}

fn society(n: u64, city: u64) -> Society {
    Society {
        id: id(n),
        name: format!("Society {n}"),
        city_id: id(city),
        ..Default::default()
    }
}

fn block(n: u64, society: u64) -> Block {
    Block {
        id: id(n),
        ..Block::new(format!("Block {n}"), id(society))
    }
}

fn tower(n: u64, society: u64) -> Tower {
    Tower {
        id: id(n),
        ..Tower::new(format!("Tower {n}"), id(society))
    }
}

fn flat(n: u64, society: u64) -> Flat {
    Flat {
        id: id(n),
        ..Flat::new(format!("{n}"), 1).placed(Placement::society(id(society)))
    }
}

// ── Transitions ─────────────────────────────────────────────────

#[test]
fn boot_opens_countries() {
    let machine = SelectionMachine::new();
    assert_eq!(machine.boot().open, vec![SlotKey::Countries]);
    assert_eq!(machine.snapshot().selection.country, None);
}

#[test]
fn select_country_reopens_states() {
    let mut machine = SelectionMachine::new();
    let transition = machine.apply(SelectionEvent::SelectCountry(country(1)));
    assert_eq!(
        transition,
        Transition {
            cancel: vec![
                Slot::States,
                Slot::Cities,
                Slot::Societies,
                Slot::Blocks,
                Slot::Towers,
                Slot::Flats,
            ],
            open: vec![SlotKey::States { country: id(1) }],
        }
    );
    assert_eq!(machine.selection().country, Some(country(1)));
    assert_eq!(machine.selection().state, None);
}

#[test]
fn select_society_opens_three_slots() {
    let mut machine = SelectionMachine::new();
    let transition = machine.apply(SelectionEvent::SelectSociety(society(5, 3)));
    assert_eq!(transition.cancel, vec![Slot::Blocks, Slot::Towers, Slot::Flats]);
    assert_eq!(
        transition.open,
        vec![
            SlotKey::Blocks { society: id(5) },
            SlotKey::Towers { society: id(5) },
            SlotKey::Flats {
                parent: FlatParent::Society(id(5)),
            },
        ]
    );
}

#[test]
fn block_and_tower_replace_each_other() {
    let mut machine = SelectionMachine::new();
    machine.apply(SelectionEvent::SelectSociety(society(5, 3)));
    machine.deliver(Slot::Blocks, SlotUpdate::Blocks(vec![block(7, 5)]));

    let transition = machine.apply(SelectionEvent::SelectBlock(block(7, 5)));
    assert_eq!(transition.cancel, vec![Slot::Flats]);
    assert_eq!(
        transition.open,
        vec![SlotKey::Flats {
            parent: FlatParent::Block(id(7)),
        }]
    );

    machine.apply(SelectionEvent::SelectTower(tower(8, 5)));
    assert_eq!(machine.selection().section, Some(Section::Tower(tower(8, 5))));
    // Sibling lists survive a section change.
    assert_eq!(machine.snapshot().blocks, vec![block(7, 5)]);
}

#[test]
fn select_flat_is_a_leaf() {
    let mut machine = SelectionMachine::new();
    machine.apply(SelectionEvent::SelectSociety(society(5, 3)));
    let transition = machine.apply(SelectionEvent::SelectFlat(flat(40, 5)));
    assert!(transition.is_empty());
    assert_eq!(machine.selection().flat.as_ref().map(|f| f.id.clone()), Some(id(40)));
}

#[test]
fn deselect_section_returns_to_society_flats() {
    let mut machine = SelectionMachine::new();
    machine.apply(SelectionEvent::SelectSociety(society(5, 3)));
    machine.apply(SelectionEvent::SelectBlock(block(7, 5)));
    machine.deliver(Slot::Flats, SlotUpdate::Flats(vec![flat(41, 5)]));

    let transition = machine.apply(SelectionEvent::Deselect(Level::Section));
    assert_eq!(transition.cancel, vec![Slot::Flats]);
    assert_eq!(
        transition.open,
        vec![SlotKey::Flats {
            parent: FlatParent::Society(id(5)),
        }]
    );
    assert_eq!(machine.selection().section, None);
    assert!(machine.snapshot().flats.is_empty());
}

#[test]
fn deselect_country_clears_everything_but_countries() {
    let mut machine = SelectionMachine::new();
    machine.deliver(Slot::Countries, SlotUpdate::Countries(vec![country(1)]));
    machine.apply(SelectionEvent::SelectCountry(country(1)));
    machine.deliver(Slot::States, SlotUpdate::States(vec![state(10, 1)]));

    let transition = machine.apply(SelectionEvent::Deselect(Level::Country));
    assert!(transition.open.is_empty());
    assert_eq!(machine.selection().country, None);
    assert!(machine.snapshot().states.is_empty());
    assert_eq!(machine.snapshot().countries, vec![country(1)]);
}

// ── Deliveries ──────────────────────────────────────────────────

#[test]
fn delivery_replaces_list_and_refreshes_selection() {
    let mut machine = SelectionMachine::new();
    machine.apply(SelectionEvent::SelectCountry(country(1)));
    machine.apply(SelectionEvent::SelectState(state(10, 1)));

    let mut renamed = state(10, 1);
    renamed.name = "Renamed".into();
    machine.deliver(Slot::States, SlotUpdate::States(vec![renamed.clone(), state(11, 1)]));

    assert_eq!(machine.snapshot().states.len(), 2);
    assert_eq!(machine.selection().state, Some(renamed));
}

#[test]
fn failed_delivery_keeps_selection_and_records_error() {
    let mut machine = SelectionMachine::new();
    machine.apply(SelectionEvent::SelectCountry(country(1)));
    let err = HierarchyError::SubscriptionError {
        message: "reset".into(),
    };
    machine.deliver(Slot::States, SlotUpdate::Failed(err.clone()));

    assert_eq!(machine.snapshot().last_error, Some(err));
    assert_eq!(machine.selection().country, Some(country(1)));
    machine.clear_error();
    assert_eq!(machine.snapshot().last_error, None);
}

#[test]
fn mismatched_update_is_ignored() {
    let mut machine = SelectionMachine::new();
    let before = machine.snapshot().version;
    machine.deliver(Slot::States, SlotUpdate::Countries(vec![country(1)]));
    assert!(machine.snapshot().countries.is_empty());
    assert_eq!(machine.snapshot().version, before);
}

#[test]
fn version_grows_with_every_change() {
    let mut machine = SelectionMachine::new();
    let v0 = machine.snapshot().version;
    machine.apply(SelectionEvent::SelectCountry(country(1)));
    let v1 = machine.snapshot().version;
    machine.deliver(Slot::States, SlotUpdate::States(vec![]));
    assert!(v1 > v0);
    assert!(machine.snapshot().version > v1);
}

#[test]
fn forget_only_matches_the_selected_kind() {
    let mut machine = SelectionMachine::new();
    machine.apply(SelectionEvent::SelectSociety(society(5, 3)));
    machine.apply(SelectionEvent::SelectBlock(block(7, 5)));

    assert!(machine.forget(EntityKind::Tower, &id(7)).is_none());
    assert!(machine.forget(EntityKind::Block, &id(99)).is_none());
    let transition = machine.forget(EntityKind::Block, &id(7)).unwrap();
    assert_eq!(
        transition.open,
        vec![SlotKey::Flats {
            parent: FlatParent::Society(id(5)),
        }]
    );
    assert_eq!(machine.selection().section, None);
}

#[test]
fn placement_context_follows_section() {
    let mut machine = SelectionMachine::new();
    machine.apply(SelectionEvent::SelectSociety(society(5, 3)));
    machine.apply(SelectionEvent::SelectTower(tower(8, 5)));

    let ctx = machine.snapshot().placement_context();
    assert_eq!(ctx.society.map(|s| s.id.clone()), Some(id(5)));
    assert_eq!(ctx.tower.map(|t| t.id.clone()), Some(id(8)));
    assert!(ctx.block.is_none());
}

// ── Cascade-clear ───────────────────────────────────────────────

fn select_at(level: Level, n: u64) -> SelectionEvent {
    match level {
        Level::Country => SelectionEvent::SelectCountry(country(n)),
        Level::State => SelectionEvent::SelectState(state(n, 1)),
        Level::City => SelectionEvent::SelectCity(city(n, 1)),
        Level::Society => SelectionEvent::SelectSociety(society(n, 1)),
        Level::Section if n % 2 == 0 => SelectionEvent::SelectBlock(block(n, 1)),
        Level::Section => SelectionEvent::SelectTower(tower(n, 1)),
        Level::Flat => SelectionEvent::SelectFlat(flat(n, 1)),
    }
}

fn fill(slot: Slot, n: u64) -> SlotUpdate {
    match slot {
        Slot::Countries => SlotUpdate::Countries(vec![country(n)]),
        Slot::States => SlotUpdate::States(vec![state(n, 1)]),
        Slot::Cities => SlotUpdate::Cities(vec![city(n, 1)]),
        Slot::Societies => SlotUpdate::Societies(vec![society(n, 1)]),
        Slot::Blocks => SlotUpdate::Blocks(vec![block(n, 1)]),
        Slot::Towers => SlotUpdate::Towers(vec![tower(n, 1)]),
        Slot::Flats => SlotUpdate::Flats(vec![flat(n, 1)]),
    }
}

#[derive(Debug, Clone)]
enum Step {
    Select(Level, u64),
    Deliver(Slot, u64),
    Deselect(Level),
}

fn level_strategy() -> impl Strategy<Value = Level> {
    proptest::sample::select(Level::ALL.to_vec())
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        (level_strategy(), 1u64..50).prop_map(|(l, n)| Step::Select(l, n)),
        (proptest::sample::select(Slot::ALL.to_vec()), 1u64..50)
            .prop_map(|(s, n)| Step::Deliver(s, n)),
        level_strategy().prop_map(Step::Deselect),
    ]
}

proptest! {
    #[test]
    fn selecting_clears_everything_below(
        history in proptest::collection::vec(step_strategy(), 0..40),
        level in level_strategy(),
        n in 1u64..50,
    ) {
        let mut machine = SelectionMachine::new();
        for step in history {
            match step {
                Step::Select(l, k) => { machine.apply(select_at(l, k)); }
                Step::Deliver(s, k) => machine.deliver(s, fill(s, k)),
                Step::Deselect(l) => { machine.apply(SelectionEvent::Deselect(l)); }
            }
        }

        let transition = machine.apply(select_at(level, n));

        let snapshot = machine.snapshot();
        prop_assert!(snapshot.selection.is_set(level));
        for below in Level::ALL.into_iter().filter(|l| *l > level) {
            prop_assert!(!snapshot.selection.is_set(below));
        }
        for slot in Slot::ALL.into_iter().filter(|s| s.level() > level) {
            prop_assert_eq!(snapshot.list_len(slot), 0);
            prop_assert!(transition.cancel.contains(&slot));
        }
        // Every opened slot lists entities directly under the new selection.
        for key in &transition.open {
            prop_assert!(key.slot().level() > level);
        }
    }
}
