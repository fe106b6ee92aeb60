//! Level assembly.
//!
//! The assembler is a pure merge of terrain, entities and config-derived
//! metadata into a [`Level`]. A level's terrain and entity list cannot be
//! changed after assembly; later consumers may only add entries to the
//! metadata's `extra` map through [`Level::annotate`].

use std::collections::{BTreeMap, BTreeSet};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{EntityType, GenerationConfig};
use crate::error::{GenerationError, Result};
use crate::grid::{TileGrid, TileType};
use crate::placement::{PlacedEntity, PlacementWarning};
use crate::random::Seed;

/// Descriptive data recorded alongside a level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelMetadata {
    /// Wall-clock assembly time, Unix milliseconds.
    pub generated_at_ms: u64,
    /// Algorithm tag as configured.
    pub algorithm: String,
    /// Seed the level was generated from.
    pub seed: Seed,
    /// Grid width.
    pub width: u32,
    /// Grid height.
    pub height: u32,
    /// Cells per tile type; absent types have no entry.
    pub tile_counts: BTreeMap<TileType, usize>,
    /// Placed entities per type; absent types have no entry.
    pub entity_counts: BTreeMap<EntityType, usize>,
    /// Victory conditions from the config.
    pub victory_conditions: BTreeSet<String>,
    /// Rendered placement warnings, in placement order.
    pub placement_warnings: Vec<String>,
    /// Free-form annotations from downstream consumers.
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

/// A generated level: terrain, entities, metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    terrain: TileGrid,
    entities: Vec<PlacedEntity>,
    metadata: LevelMetadata,
}

impl Level {
    /// The tile grid.
    #[must_use]
    pub const fn terrain(&self) -> &TileGrid {
        &self.terrain
    }

    /// Placed entities in placement order.
    #[must_use]
    pub fn entities(&self) -> &[PlacedEntity] {
        &self.entities
    }

    /// Recorded metadata.
    #[must_use]
    pub const fn metadata(&self) -> &LevelMetadata {
        &self.metadata
    }

    /// First Player entity, if any.
    #[must_use]
    pub fn player(&self) -> Option<&PlacedEntity> {
        self.entities
            .iter()
            .find(|e| e.entity_type == EntityType::Player)
    }

    /// Entities of one type.
    pub fn entities_of(&self, entity_type: EntityType) -> impl Iterator<Item = &PlacedEntity> + '_ {
        self.entities
            .iter()
            .filter(move |e| e.entity_type == entity_type)
    }

    /// Number of entities of one type.
    #[must_use]
    pub fn count_of(&self, entity_type: EntityType) -> usize {
        self.entities_of(entity_type).count()
    }

    /// Add or replace an `extra` metadata entry.
    pub fn annotate(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.extra.insert(key.into(), value.into());
    }

    /// Copy of this level carrying a different entity list. Metadata counts
    /// are recomputed; everything else is kept.
    #[must_use]
    pub fn with_entities(&self, entities: Vec<PlacedEntity>) -> Self {
        let mut metadata = self.metadata.clone();
        metadata.entity_counts = entity_counts(&entities);
        Self {
            terrain: self.terrain.clone(),
            entities,
            metadata,
        }
    }

    /// Deterministic encoding of everything except the assembly timestamp.
    ///
    /// Two runs with the same config and seed produce equal bytes.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>> {
        let mut metadata = self.metadata.clone();
        metadata.generated_at_ms = 0;
        bincode::serialize(&(&self.terrain, &self.entities, &metadata))
            .map_err(|e| GenerationError::Serialization(e.to_string()))
    }
}

/// Builds [`Level`] values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LevelAssembler {
    timestamp: Option<u64>,
}

impl LevelAssembler {
    /// Assembler stamping levels with the current time.
    #[must_use]
    pub const fn new() -> Self {
        Self { timestamp: None }
    }

    /// Stamp every level with a fixed time instead of the clock.
    #[must_use]
    pub const fn with_timestamp(mut self, unix_ms: u64) -> Self {
        self.timestamp = Some(unix_ms);
        self
    }

    /// Merge terrain and entities into a level.
    ///
    /// Fails with [`GenerationError::DimensionMismatch`] when the grid size
    /// differs from the config.
    pub fn assemble(
        &self,
        grid: &TileGrid,
        entities: &[PlacedEntity],
        config: &GenerationConfig,
    ) -> Result<Level> {
        self.assemble_with_warnings(grid, entities, &[], config)
    }

    /// [`Self::assemble`], also recording placement warnings in metadata.
    pub fn assemble_with_warnings(
        &self,
        grid: &TileGrid,
        entities: &[PlacedEntity],
        warnings: &[PlacementWarning],
        config: &GenerationConfig,
    ) -> Result<Level> {
        if grid.width() != config.width || grid.height() != config.height {
            return Err(GenerationError::DimensionMismatch {
                grid_width: grid.width(),
                grid_height: grid.height(),
                config_width: config.width,
                config_height: config.height,
            });
        }

        let metadata = LevelMetadata {
            generated_at_ms: self.timestamp.unwrap_or_else(now_ms),
            algorithm: config.algorithm.clone(),
            seed: config.seed,
            width: grid.width(),
            height: grid.height(),
            tile_counts: grid.tile_counts(),
            entity_counts: entity_counts(entities),
            victory_conditions: config.victory_conditions.clone(),
            placement_warnings: warnings.iter().map(ToString::to_string).collect(),
            extra: BTreeMap::new(),
        };

        debug!(
            algorithm = %metadata.algorithm,
            seed = metadata.seed,
            entities = entities.len(),
            warnings = warnings.len(),
            "Level assembled"
        );

        Ok(Level {
            terrain: grid.clone(),
            entities: entities.to_vec(),
            metadata,
        })
    }
}

fn entity_counts(entities: &[PlacedEntity]) -> BTreeMap<EntityType, usize> {
    let mut counts = BTreeMap::new();
    for entity in entities {
        *counts.entry(entity.entity_type).or_insert(0) += 1;
    }
    counts
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Position;

    fn sample() -> (TileGrid, Vec<PlacedEntity>, GenerationConfig) {
        let grid = TileGrid::filled(12, 10, TileType::Ground);
        let entities = vec![
            PlacedEntity::new(EntityType::Player, Position::new(1, 1)),
            PlacedEntity::new(EntityType::Enemy, Position::new(5, 5)),
            PlacedEntity::new(EntityType::Enemy, Position::new(8, 2)),
        ];
        let config = GenerationConfig::new(12, 10, "noise")
            .with_seed(99)
            .with_victory_condition("defeat_all_enemies");
        (grid, entities, config)
    }

    #[test]
    fn metadata_summarises_inputs() {
        let (grid, entities, config) = sample();
        let level = LevelAssembler::new()
            .with_timestamp(1_700_000_000_000)
            .assemble(&grid, &entities, &config)
            .unwrap();
        let meta = level.metadata();
        assert_eq!(meta.generated_at_ms, 1_700_000_000_000);
        assert_eq!(meta.algorithm, "noise");
        assert_eq!(meta.seed, 99);
        assert_eq!((meta.width, meta.height), (12, 10));
        assert_eq!(meta.tile_counts.get(&TileType::Ground), Some(&120));
        assert_eq!(meta.entity_counts.get(&EntityType::Enemy), Some(&2));
        assert!(meta.victory_conditions.contains("defeat_all_enemies"));
        assert_eq!(level.count_of(EntityType::Player), 1);
    }

    #[test]
    fn size_disagreement_is_rejected() {
        let (_, entities, config) = sample();
        let grid = TileGrid::filled(11, 10, TileType::Ground);
        let err = LevelAssembler::new()
            .assemble(&grid, &entities, &config)
            .unwrap_err();
        assert!(matches!(err, GenerationError::DimensionMismatch { grid_width: 11, .. }));
    }

    #[test]
    fn warnings_are_recorded() {
        let (grid, entities, config) = sample();
        let warning = PlacementWarning {
            entity_type: EntityType::Item,
            instance: 0,
            requested: 1,
            attempts: 100,
        };
        let level = LevelAssembler::new()
            .assemble_with_warnings(&grid, &entities, &[warning], &config)
            .unwrap();
        assert_eq!(level.metadata().placement_warnings.len(), 1);
        assert!(level.metadata().placement_warnings[0].contains("Item"));
    }

    #[test]
    fn canonical_bytes_ignore_the_timestamp() {
        let (grid, entities, config) = sample();
        let a = LevelAssembler::new()
            .with_timestamp(1)
            .assemble(&grid, &entities, &config)
            .unwrap();
        let b = LevelAssembler::new()
            .with_timestamp(2)
            .assemble(&grid, &entities, &config)
            .unwrap();
        assert_ne!(a, b);
        assert_eq!(a.canonical_bytes().unwrap(), b.canonical_bytes().unwrap());
    }

    #[test]
    fn annotations_touch_only_extra() {
        let (grid, entities, config) = sample();
        let mut level = LevelAssembler::new().assemble(&grid, &entities, &config).unwrap();
        let before = level.canonical_bytes().unwrap();
        level.annotate("theme", "crypt");
        assert_eq!(level.metadata().extra.get("theme").map(String::as_str), Some("crypt"));
        assert_eq!(level.entities(), entities.as_slice());
        assert_ne!(level.canonical_bytes().unwrap(), before);
    }

    #[test]
    fn with_entities_recounts() {
        let (grid, entities, config) = sample();
        let level = LevelAssembler::new().assemble(&grid, &entities, &config).unwrap();
        let trimmed = level.with_entities(entities[..2].to_vec());
        assert_eq!(trimmed.metadata().entity_counts.get(&EntityType::Enemy), Some(&1));
        assert_eq!(trimmed.terrain(), level.terrain());
    }
}
