//! Nested JSON seed files.
//!
//! A seed mirrors the hierarchy: countries hold states, states hold cities,
//! and so on down to flats. Parent ids are never written by hand; they come
//! from the ids the store assigns while the tree is walked, and every flat is
//! placed through the placement resolver.
//!
//! ```json
//! { "countries": [ { "name": "India", "iso2": "IN", "states": [
//!     { "name": "Karnataka", "cities": [
//!       { "name": "Bengaluru", "societies": [
//!         { "name": "Palm Meadows",
//!           "flats":  [ { "number": "G-01" } ],
//!           "blocks": [ { "name": "A", "flats": [ { "number": "A-101", "floor": 1 } ] } ],
//!           "towers": [ { "name": "T1", "flats": [ { "number": "T1-1203", "floor": 12 } ] } ] }
//! ] } ] } ] } ] }
//! ```

use habitat_hierarchy::{HierarchyRepository, HierarchyResult, PlacementContext};
use habitat_model::{Block, City, Country, EntityKind, Flat, FlatStatus, Society, State, Tower};
use habitat_storage::HierarchyStore;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub countries: Vec<CountrySeed>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CountrySeed {
    pub name: String,
    #[serde(default)]
    pub iso2: String,
    #[serde(default)]
    pub iso3: String,
    #[serde(default)]
    pub phone_code: String,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub states: Vec<StateSeed>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StateSeed {
    pub name: String,
    #[serde(default)]
    pub code: String,
    #[serde(rename = "type", default)]
    pub state_type: String,
    #[serde(default)]
    pub cities: Vec<CitySeed>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CitySeed {
    pub name: String,
    #[serde(default)]
    pub societies: Vec<SocietySeed>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SocietySeed {
    pub name: String,
    #[serde(default)]
    pub blocks: Vec<BlockSeed>,
    #[serde(default)]
    pub towers: Vec<TowerSeed>,
    /// Flats directly under the society.
    #[serde(default)]
    pub flats: Vec<FlatSeed>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockSeed {
    pub name: String,
    #[serde(rename = "type", default)]
    pub block_type: String,
    /// Towers inside this block.
    #[serde(default)]
    pub towers: Vec<TowerSeed>,
    #[serde(default)]
    pub flats: Vec<FlatSeed>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TowerSeed {
    pub name: String,
    #[serde(default)]
    pub flats: Vec<FlatSeed>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FlatSeed {
    pub number: String,
    #[serde(default)]
    pub floor: i32,
    #[serde(rename = "type", default)]
    pub flat_type: String,
    #[serde(default)]
    pub area: f64,
    #[serde(default)]
    pub status: FlatStatus,
}

impl FlatSeed {
    fn to_flat(&self) -> Flat {
        Flat {
            flat_type: self.flat_type.clone(),
            area: self.area,
            status: self.status,
            ..Flat::new(self.number.clone(), self.floor)
        }
    }
}

impl SeedFile {
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

/// How many entities of each kind a seed created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub created: BTreeMap<EntityKind, usize>,
}

impl SeedReport {
    fn count(&mut self, kind: EntityKind) {
        *self.created.entry(kind).or_default() += 1;
    }

    pub fn get(&self, kind: EntityKind) -> usize {
        self.created.get(&kind).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.created.values().sum()
    }
}

impl fmt::Display for SeedReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .created
            .iter()
            .map(|(kind, n)| format!("{n} {}", kind.collection()))
            .collect();
        if parts.is_empty() {
            f.write_str("nothing")
        } else {
            f.write_str(&parts.join(", "))
        }
    }
}

/// Writes the whole seed tree through the repository.
///
/// Stops at the first failure; whatever was written before it stays.
pub async fn load<S: HierarchyStore>(
    repo: &HierarchyRepository<S>,
    seed: &SeedFile,
) -> HierarchyResult<SeedReport> {
    let mut report = SeedReport::default();
    for country_seed in &seed.countries {
        let mut country = Country {
            iso2: country_seed.iso2.clone(),
            iso3: country_seed.iso3.clone(),
            phone_code: country_seed.phone_code.clone(),
            currency: country_seed.currency.clone(),
            ..Country::new(country_seed.name.clone())
        };
        country.id = repo.add_country(&country).await?;
        report.count(EntityKind::Country);

        for state_seed in &country_seed.states {
            let mut state = State {
                code: state_seed.code.clone(),
                state_type: state_seed.state_type.clone(),
                ..State::new(state_seed.name.clone(), country.id.clone())
            };
            state.id = repo.add_state(&state).await?;
            report.count(EntityKind::State);

            for city_seed in &state_seed.cities {
                let mut city =
                    City::new(city_seed.name.clone(), country.id.clone(), state.id.clone());
                city.id = repo.add_city(&city).await?;
                report.count(EntityKind::City);

                for society_seed in &city_seed.societies {
                    load_society(repo, &city, society_seed, &mut report).await?;
                }
            }
        }
    }
    debug!(total = report.total(), "seed loaded");
    Ok(report)
}

async fn load_society<S: HierarchyStore>(
    repo: &HierarchyRepository<S>,
    city: &City,
    seed: &SocietySeed,
    report: &mut SeedReport,
) -> HierarchyResult<()> {
    let mut society = Society::new(seed.name.clone(), city);
    society.id = repo.add_society(&society).await?;
    report.count(EntityKind::Society);

    let ctx = PlacementContext::society(&society);
    add_flats(repo, &seed.flats, &ctx, report).await?;

    for block_seed in &seed.blocks {
        let mut block = Block {
            block_type: block_seed.block_type.clone(),
            ..Block::new(block_seed.name.clone(), society.id.clone())
        };
        block.id = repo.add_block(&block).await?;
        report.count(EntityKind::Block);
        add_flats(repo, &block_seed.flats, &ctx.with_block(&block), report).await?;

        for tower_seed in &block_seed.towers {
            let tower = Tower::new(tower_seed.name.clone(), society.id.clone())
                .in_block(block.id.clone());
            load_tower(repo, tower, tower_seed, &ctx, report).await?;
        }
    }

    for tower_seed in &seed.towers {
        let tower = Tower::new(tower_seed.name.clone(), society.id.clone());
        load_tower(repo, tower, tower_seed, &ctx, report).await?;
    }
    Ok(())
}

async fn load_tower<S: HierarchyStore>(
    repo: &HierarchyRepository<S>,
    mut tower: Tower,
    seed: &TowerSeed,
    ctx: &PlacementContext<'_>,
    report: &mut SeedReport,
) -> HierarchyResult<()> {
    tower.id = repo.add_tower(&tower).await?;
    report.count(EntityKind::Tower);
    add_flats(repo, &seed.flats, &ctx.with_tower(&tower), report).await
}

async fn add_flats<S: HierarchyStore>(
    repo: &HierarchyRepository<S>,
    flats: &[FlatSeed],
    ctx: &PlacementContext<'_>,
    report: &mut SeedReport,
) -> HierarchyResult<()> {
    for flat in flats {
        repo.add_flat(&flat.to_flat(), ctx).await?;
        report.count(EntityKind::Flat);
    }
    Ok(())
}
