//! Selection state machine.
//!
//! Pure and synchronous: it owns the selected path and the candidate lists,
//! and answers every event with the [`Transition`] the subscription manager
//! has to carry out. All cascades go through [`SelectionMachine::clear_below`].

use crate::slots::{Slot, SlotKey, SlotUpdate};
use habitat_hierarchy::{HierarchyError, PlacementContext};
use habitat_model::{
    Block, City, Country, EntityKind, Flat, FlatParent, HierarchyEntity, Society, State, Tower,
};
use habitat_types::EntityId;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Depth in the selection path. Blocks and towers share the `Section` level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Country,
    State,
    City,
    Society,
    Section,
    Flat,
}

impl Level {
    pub const ALL: [Level; 6] = [
        Level::Country,
        Level::State,
        Level::City,
        Level::Society,
        Level::Section,
        Level::Flat,
    ];

    /// The level an entity kind is selected at.
    pub fn of(kind: EntityKind) -> Level {
        match kind {
            EntityKind::Country => Level::Country,
            EntityKind::State => Level::State,
            EntityKind::City => Level::City,
            EntityKind::Society => Level::Society,
            EntityKind::Block | EntityKind::Tower => Level::Section,
            EntityKind::Flat => Level::Flat,
        }
    }
}

/// The selected block or tower of a society.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "entity", rename_all = "snake_case")]
pub enum Section {
    Block(Block),
    Tower(Tower),
}

impl Section {
    pub fn id(&self) -> &EntityId {
        match self {
            Section::Block(b) => &b.id,
            Section::Tower(t) => &t.id,
        }
    }

    pub fn society_id(&self) -> &EntityId {
        match self {
            Section::Block(b) => &b.society_id,
            Section::Tower(t) => &t.society_id,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Section::Block(_) => EntityKind::Block,
            Section::Tower(_) => EntityKind::Tower,
        }
    }

    pub fn flat_parent(&self) -> FlatParent {
        match self {
            Section::Block(b) => FlatParent::Block(b.id.clone()),
            Section::Tower(t) => FlatParent::Tower(t.id.clone()),
        }
    }
}

/// The drilled-into path, root first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub country: Option<Country>,
    pub state: Option<State>,
    pub city: Option<City>,
    pub society: Option<Society>,
    pub section: Option<Section>,
    pub flat: Option<Flat>,
}

impl Selection {
    pub fn is_set(&self, level: Level) -> bool {
        self.id_at(level).is_some()
    }

    pub fn id_at(&self, level: Level) -> Option<&EntityId> {
        match level {
            Level::Country => self.country.as_ref().map(|e| &e.id),
            Level::State => self.state.as_ref().map(|e| &e.id),
            Level::City => self.city.as_ref().map(|e| &e.id),
            Level::Society => self.society.as_ref().map(|e| &e.id),
            Level::Section => self.section.as_ref().map(Section::id),
            Level::Flat => self.flat.as_ref().map(|e| &e.id),
        }
    }

    fn unset(&mut self, level: Level) {
        match level {
            Level::Country => self.country = None,
            Level::State => self.state = None,
            Level::City => self.city = None,
            Level::Society => self.society = None,
            Level::Section => self.section = None,
            Level::Flat => self.flat = None,
        }
    }

    /// Whether `kind`/`id` is what is selected at its level.
    pub fn holds(&self, kind: EntityKind, id: &EntityId) -> bool {
        match kind {
            EntityKind::Block | EntityKind::Tower => self
                .section
                .as_ref()
                .is_some_and(|s| s.kind() == kind && s.id() == id),
            _ => self.id_at(Level::of(kind)) == Some(id),
        }
    }

    /// Where a flat created now would go.
    pub fn placement_context(&self) -> PlacementContext<'_> {
        PlacementContext {
            society: self.society.as_ref(),
            block: match &self.section {
                Some(Section::Block(b)) => Some(b),
                _ => None,
            },
            tower: match &self.section {
                Some(Section::Tower(t)) => Some(t),
                _ => None,
            },
        }
    }

    /// The container whose flats are listed.
    pub fn flat_parent(&self) -> Option<FlatParent> {
        match (&self.section, &self.society) {
            (Some(section), _) => Some(section.flat_parent()),
            (None, Some(society)) => Some(FlatParent::Society(society.id.clone())),
            (None, None) => None,
        }
    }
}

/// What consumers see: the path, the lists, and the latest error.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HierarchySnapshot {
    pub selection: Selection,
    pub countries: Vec<Country>,
    pub states: Vec<State>,
    pub cities: Vec<City>,
    pub societies: Vec<Society>,
    pub blocks: Vec<Block>,
    pub towers: Vec<Tower>,
    pub flats: Vec<Flat>,
    pub last_error: Option<HierarchyError>,
    /// Bumped on every change.
    pub version: u64,
}

impl HierarchySnapshot {
    pub fn placement_context(&self) -> PlacementContext<'_> {
        self.selection.placement_context()
    }

    /// Number of entries in a slot's list.
    pub fn list_len(&self, slot: Slot) -> usize {
        match slot {
            Slot::Countries => self.countries.len(),
            Slot::States => self.states.len(),
            Slot::Cities => self.cities.len(),
            Slot::Societies => self.societies.len(),
            Slot::Blocks => self.blocks.len(),
            Slot::Towers => self.towers.len(),
            Slot::Flats => self.flats.len(),
        }
    }

    fn clear_list(&mut self, slot: Slot) {
        match slot {
            Slot::Countries => self.countries.clear(),
            Slot::States => self.states.clear(),
            Slot::Cities => self.cities.clear(),
            Slot::Societies => self.societies.clear(),
            Slot::Blocks => self.blocks.clear(),
            Slot::Towers => self.towers.clear(),
            Slot::Flats => self.flats.clear(),
        }
    }
}

/// Input to the machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "entity", rename_all = "snake_case")]
pub enum SelectionEvent {
    SelectCountry(Country),
    SelectState(State),
    SelectCity(City),
    SelectSociety(Society),
    SelectBlock(Block),
    SelectTower(Tower),
    SelectFlat(Flat),
    /// Clears the selection at a level and everything below it.
    Deselect(Level),
}

/// Subscription work caused by one event: cancel first, then open.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transition {
    pub cancel: Vec<Slot>,
    pub open: Vec<SlotKey>,
}

impl Transition {
    pub fn is_empty(&self) -> bool {
        self.cancel.is_empty() && self.open.is_empty()
    }
}

fn check_parent(kind: EntityKind, declared: &EntityId, selected: Option<&EntityId>) {
    if let Some(selected) = selected
        && selected != declared
    {
        warn!(
            %kind,
            %declared,
            %selected,
            "selected entity does not belong to the selected parent"
        );
    }
}

/// Owns the snapshot and applies events to it.
#[derive(Debug, Default)]
pub struct SelectionMachine {
    snapshot: HierarchySnapshot,
}

impl SelectionMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> &HierarchySnapshot {
        &self.snapshot
    }

    pub fn selection(&self) -> &Selection {
        &self.snapshot.selection
    }

    /// The subscriptions a fresh session starts with.
    pub fn boot(&self) -> Transition {
        Transition {
            cancel: Vec::new(),
            open: vec![SlotKey::Countries],
        }
    }

    /// Clears every selection below `level` and every list of entities below
    /// `level`. Returns the slots whose subscriptions must go.
    pub fn clear_below(&mut self, level: Level) -> Vec<Slot> {
        for below in Level::ALL.into_iter().filter(|l| *l > level) {
            self.snapshot.selection.unset(below);
        }
        let cleared: Vec<Slot> = Slot::ALL
            .into_iter()
            .filter(|slot| slot.level() > level)
            .collect();
        for slot in &cleared {
            self.snapshot.clear_list(*slot);
        }
        cleared
    }

    pub fn apply(&mut self, event: SelectionEvent) -> Transition {
        debug!(?event, "selection event");
        let transition = match event {
            SelectionEvent::SelectCountry(country) => {
                let cancel = self.clear_below(Level::Country);
                let open = vec![SlotKey::States {
                    country: country.id.clone(),
                }];
                self.snapshot.selection.country = Some(country);
                Transition { cancel, open }
            }
            SelectionEvent::SelectState(state) => {
                check_parent(
                    EntityKind::State,
                    &state.country_id,
                    self.selection().id_at(Level::Country),
                );
                let cancel = self.clear_below(Level::State);
                let open = vec![SlotKey::Cities {
                    state: state.id.clone(),
                }];
                self.snapshot.selection.state = Some(state);
                Transition { cancel, open }
            }
            SelectionEvent::SelectCity(city) => {
                check_parent(
                    EntityKind::City,
                    &city.state_id,
                    self.selection().id_at(Level::State),
                );
                let cancel = self.clear_below(Level::City);
                let open = vec![SlotKey::Societies {
                    city: city.id.clone(),
                }];
                self.snapshot.selection.city = Some(city);
                Transition { cancel, open }
            }
            SelectionEvent::SelectSociety(society) => {
                check_parent(
                    EntityKind::Society,
                    &society.city_id,
                    self.selection().id_at(Level::City),
                );
                let cancel = self.clear_below(Level::Society);
                let id = society.id.clone();
                let open = vec![
                    SlotKey::Blocks {
                        society: id.clone(),
                    },
                    SlotKey::Towers {
                        society: id.clone(),
                    },
                    SlotKey::Flats {
                        parent: FlatParent::Society(id),
                    },
                ];
                self.snapshot.selection.society = Some(society);
                Transition { cancel, open }
            }
            SelectionEvent::SelectBlock(block) => self.select_section(Section::Block(block)),
            SelectionEvent::SelectTower(tower) => self.select_section(Section::Tower(tower)),
            SelectionEvent::SelectFlat(flat) => {
                if let Some(parent) = self.selection().flat_parent()
                    && flat.placement().parent() != parent
                {
                    warn!(flat = %flat.id, ?parent, "selected flat is not in the listed container");
                }
                let cancel = self.clear_below(Level::Flat);
                self.snapshot.selection.flat = Some(flat);
                Transition {
                    cancel,
                    open: Vec::new(),
                }
            }
            SelectionEvent::Deselect(level) => self.deselect(level),
        };
        self.snapshot.version += 1;
        transition
    }

    fn select_section(&mut self, section: Section) -> Transition {
        check_parent(
            section.kind(),
            section.society_id(),
            self.selection().id_at(Level::Society),
        );
        let cancel = self.clear_below(Level::Section);
        let open = vec![SlotKey::Flats {
            parent: section.flat_parent(),
        }];
        self.snapshot.selection.section = Some(section);
        Transition { cancel, open }
    }

    fn deselect(&mut self, level: Level) -> Transition {
        let cancel = self.clear_below(level);
        self.snapshot.selection.unset(level);
        let mut open = Vec::new();
        if level == Level::Section
            && let Some(society) = &self.snapshot.selection.society
        {
            open.push(SlotKey::Flats {
                parent: FlatParent::Society(society.id.clone()),
            });
        }
        Transition { cancel, open }
    }

    /// Deselects `kind`/`id` if it is currently selected.
    pub fn forget(&mut self, kind: EntityKind, id: &EntityId) -> Option<Transition> {
        if !self.selection().holds(kind, id) {
            return None;
        }
        debug!(%kind, %id, "deleted entity was selected; deselecting");
        Some(self.apply(SelectionEvent::Deselect(Level::of(kind))))
    }

    /// Replaces a slot's list with fresh contents.
    pub fn deliver(&mut self, slot: Slot, update: SlotUpdate) {
        let snapshot = &mut self.snapshot;
        match (slot, update) {
            (_, SlotUpdate::Failed(err)) => {
                warn!(?slot, "subscription failed: {err}");
                snapshot.last_error = Some(err);
            }
            (Slot::Countries, SlotUpdate::Countries(items)) => {
                refresh(&mut snapshot.selection.country, &items);
                snapshot.countries = items;
            }
            (Slot::States, SlotUpdate::States(items)) => {
                refresh(&mut snapshot.selection.state, &items);
                snapshot.states = items;
            }
            (Slot::Cities, SlotUpdate::Cities(items)) => {
                refresh(&mut snapshot.selection.city, &items);
                snapshot.cities = items;
            }
            (Slot::Societies, SlotUpdate::Societies(items)) => {
                refresh(&mut snapshot.selection.society, &items);
                snapshot.societies = items;
            }
            (Slot::Blocks, SlotUpdate::Blocks(items)) => {
                if let Some(Section::Block(selected)) = &mut snapshot.selection.section
                    && let Some(fresh) = items.iter().find(|b| b.id == selected.id)
                {
                    *selected = fresh.clone();
                }
                snapshot.blocks = items;
            }
            (Slot::Towers, SlotUpdate::Towers(items)) => {
                if let Some(Section::Tower(selected)) = &mut snapshot.selection.section
                    && let Some(fresh) = items.iter().find(|t| t.id == selected.id)
                {
                    *selected = fresh.clone();
                }
                snapshot.towers = items;
            }
            (Slot::Flats, SlotUpdate::Flats(items)) => {
                refresh(&mut snapshot.selection.flat, &items);
                snapshot.flats = items;
            }
            (slot, update) => {
                warn!(?slot, ?update, "update does not fit slot; ignored");
                return;
            }
        }
        snapshot.version += 1;
    }

    pub fn record_error(&mut self, err: HierarchyError) {
        self.snapshot.last_error = Some(err);
        self.snapshot.version += 1;
    }

    pub fn clear_error(&mut self) {
        if self.snapshot.last_error.take().is_some() {
            self.snapshot.version += 1;
        }
    }
}

/// Keeps a selected entity in step with the list it came from.
fn refresh<T: HierarchyEntity>(selected: &mut Option<T>, items: &[T]) {
    if let Some(current) = selected
        && let Some(fresh) = items.iter().find(|item| item.id() == current.id())
    {
        *current = fresh.clone();
    }
}
