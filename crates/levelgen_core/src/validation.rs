//! Playability and quality checks.
//!
//! Validation is advisory: it never fails. A level that cannot be played
//! comes back as a [`ValidationResult`] with `playable == false` and the
//! reasons in `issues`, so the caller decides whether to reseed, relax the
//! config or keep the level.
//!
//! A level is playable when
//! - exactly one Player exists,
//! - every entity type a known victory condition depends on is present,
//! - every non-Obstacle entity lies in the Player's flood-fill region.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::assembly::Level;
use crate::config::EntityType;
use crate::placement::PlacedEntity;
use crate::reachability::Reachability;

/// Victory conditions the validator understands and the entity type each
/// one needs at least one of.
pub const VICTORY_REQUIREMENTS: [(&str, EntityType); 6] = [
    ("reach_exit", EntityType::Exit),
    ("collect_all_items", EntityType::Item),
    ("defeat_all_enemies", EntityType::Enemy),
    ("reach_checkpoint", EntityType::Checkpoint),
    ("activate_all_triggers", EntityType::Trigger),
    ("talk_to_npc", EntityType::Npc),
];

/// Entity type required by a victory condition, or `None` if the condition
/// is unknown.
#[must_use]
pub fn victory_requirement(condition: &str) -> Option<EntityType> {
    VICTORY_REQUIREMENTS
        .iter()
        .find(|(name, _)| *name == condition)
        .map(|&(_, entity_type)| entity_type)
}

/// Outcome of [`LevelValidator::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Whether the level can be completed.
    pub playable: bool,
    /// Composite quality in `[0, 1]`.
    pub quality_score: f64,
    /// Human-readable findings, blocking ones first.
    pub issues: Vec<String>,
}

/// Weights and target bands for the quality score.
///
/// A ratio inside its band scores 1. Below the band it scores
/// `value / low`; above it, `high / value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityWeights {
    /// Weight of the walkable-tile ratio.
    pub navigability: f64,
    /// Weight of the entities-per-tile ratio.
    pub density: f64,
    /// Weight of the connectivity component.
    pub connectivity: f64,
    /// Target band for walkable tiles / total tiles.
    pub navigability_band: (f64, f64),
    /// Target band for entities / total tiles.
    pub density_band: (f64, f64),
}

impl Default for QualityWeights {
    fn default() -> Self {
        Self {
            navigability: 0.4,
            density: 0.25,
            connectivity: 0.35,
            navigability_band: (0.35, 0.75),
            density_band: (0.002, 0.03),
        }
    }
}

impl QualityWeights {
    fn total(&self) -> f64 {
        self.navigability + self.density + self.connectivity
    }
}

/// Checks levels for playability and scores them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LevelValidator {
    weights: QualityWeights,
}

impl LevelValidator {
    /// Validator with default weights.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validator with custom weights.
    ///
    /// # Panics
    ///
    /// Panics if a weight is negative or all weights are zero.
    #[must_use]
    pub fn with_weights(weights: QualityWeights) -> Self {
        assert!(
            weights.navigability >= 0.0 && weights.density >= 0.0 && weights.connectivity >= 0.0,
            "quality weights must be non-negative"
        );
        assert!(weights.total() > 0.0, "quality weights must not all be zero");
        Self { weights }
    }

    /// Active weights.
    #[must_use]
    pub const fn weights(&self) -> &QualityWeights {
        &self.weights
    }

    /// Whether `level` can be completed.
    #[must_use]
    pub fn is_playable(&self, level: &Level) -> bool {
        Inspection::of(level).blocking.is_empty()
    }

    /// Playability, quality and issues in one pass.
    #[must_use]
    pub fn validate(&self, level: &Level) -> ValidationResult {
        let inspection = Inspection::of(level);
        let quality_score = self.score(level, &inspection);
        let playable = inspection.blocking.is_empty();

        debug!(
            playable,
            quality_score,
            issues = inspection.blocking.len() + inspection.advisory.len(),
            "Level validated"
        );

        let mut issues = inspection.blocking;
        issues.extend(inspection.advisory);
        ValidationResult {
            playable,
            quality_score,
            issues,
        }
    }

    /// Quality score in `[0, 1]`. Deterministic for a given level, and never
    /// raised by making more entities unreachable.
    #[must_use]
    pub fn evaluate_quality(&self, level: &Level) -> f64 {
        self.score(level, &Inspection::of(level))
    }

    /// Flood fill from the first Player, if there is one.
    #[must_use]
    pub fn reachability(level: &Level) -> Option<Reachability> {
        level
            .player()
            .map(|player| Reachability::flood_fill(level.terrain(), player.position))
    }

    fn score(&self, level: &Level, inspection: &Inspection) -> f64 {
        let grid = level.terrain();
        let cells = grid.cell_count() as f64;

        let walkable_ratio = grid.walkable_count() as f64 / cells;
        let total = level.entities().len();
        let reached = total - inspection.unreachable;
        let (nav_low, nav_high) = self.weights.navigability_band;
        let (den_low, den_high) = self.weights.density_band;

        let navigability = band_score(walkable_ratio, nav_low, nav_high);
        // Unreachable entities may only pull density down: the worse of the
        // reached-only and all-entity scores is kept.
        let density = band_score(reached as f64 / cells, den_low, den_high)
            .min(band_score(total as f64 / cells, den_low, den_high));
        let connectivity = if inspection.checked == 0 || inspection.unreachable == 0 {
            1.0
        } else {
            let reachable = (inspection.checked - inspection.unreachable) as f64;
            0.5 * reachable / inspection.checked as f64
        };

        let weighted = self.weights.navigability * navigability
            + self.weights.density * density
            + self.weights.connectivity * connectivity;
        (weighted / self.weights.total()).clamp(0.0, 1.0)
    }
}

fn band_score(value: f64, low: f64, high: f64) -> f64 {
    if value < low {
        if low <= 0.0 {
            1.0
        } else {
            value / low
        }
    } else if value > high {
        if value <= 0.0 {
            1.0
        } else {
            high / value
        }
    } else {
        1.0
    }
}

/// Findings shared by every validator entry point.
struct Inspection {
    blocking: Vec<String>,
    advisory: Vec<String>,
    /// Non-Obstacle entities checked for reachability.
    checked: usize,
    unreachable: usize,
}

impl Inspection {
    fn of(level: &Level) -> Self {
        let mut blocking = Vec::new();
        let mut advisory = Vec::new();

        let players = level.count_of(EntityType::Player);
        match players {
            0 => blocking.push("Level has no Player entity".to_string()),
            1 => {}
            n => blocking.push(format!("Level has {n} Player entities; expected exactly 1")),
        }

        for condition in &level.metadata().victory_conditions {
            match victory_requirement(condition) {
                Some(required) if level.count_of(required) == 0 => blocking.push(format!(
                    "Victory condition '{condition}' requires at least one {required}, but none was placed"
                )),
                Some(_) => {}
                None => advisory.push(format!(
                    "Unknown victory condition '{condition}' was not checked"
                )),
            }
        }

        let reach = LevelValidator::reachability(level);
        let mut checked = 0;
        let mut unreachable = 0;
        for entity in level.entities() {
            if !entity.entity_type.requires_walkable() {
                continue;
            }
            checked += 1;
            if !is_reached(reach.as_ref(), entity) {
                unreachable += 1;
                blocking.push(format!(
                    "Entity {} at {} is unreachable",
                    entity.entity_type, entity.position
                ));
            }
        }

        Self {
            blocking,
            advisory,
            checked,
            unreachable,
        }
    }
}

fn is_reached(reach: Option<&Reachability>, entity: &PlacedEntity) -> bool {
    reach.is_some_and(|r| r.contains(entity.position))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::LevelAssembler;
    use crate::config::GenerationConfig;
    use crate::grid::{Position, TileGrid, TileType};

    /// 20x10 room split by a wall at x = 10.
    fn split_room() -> TileGrid {
        let mut grid = TileGrid::filled(20, 10, TileType::Ground);
        for y in 0..10 {
            grid.set(Position::new(10, y), TileType::Wall);
        }
        grid
    }

    fn level(grid: &TileGrid, entities: &[(EntityType, i32, i32)], victory: &[&str]) -> Level {
        let entities: Vec<PlacedEntity> = entities
            .iter()
            .map(|&(t, x, y)| PlacedEntity::new(t, Position::new(x, y)))
            .collect();
        let config = victory.iter().fold(
            GenerationConfig::new(grid.width(), grid.height(), "noise"),
            |c, v| c.with_victory_condition(v),
        );
        LevelAssembler::new()
            .with_timestamp(0)
            .assemble(grid, &entities, &config)
            .unwrap()
    }

    #[test]
    fn connected_level_is_playable() {
        let grid = split_room();
        let level = level(
            &grid,
            &[(EntityType::Player, 1, 1), (EntityType::Exit, 8, 8)],
            &["reach_exit"],
        );
        let result = LevelValidator::new().validate(&level);
        assert!(result.playable, "{:?}", result.issues);
        assert!(result.issues.is_empty());
    }

    #[test]
    fn unreachable_entity_is_reported_with_position() {
        let grid = split_room();
        let level = level(
            &grid,
            &[(EntityType::Player, 1, 1), (EntityType::Enemy, 15, 4)],
            &[],
        );
        let result = LevelValidator::new().validate(&level);
        assert!(!result.playable);
        assert_eq!(result.issues, vec!["Entity Enemy at (15,4) is unreachable"]);
    }

    #[test]
    fn obstacles_need_not_be_reachable() {
        let grid = split_room();
        let level = level(
            &grid,
            &[(EntityType::Player, 1, 1), (EntityType::Obstacle, 10, 3)],
            &[],
        );
        assert!(LevelValidator::new().is_playable(&level));
    }

    #[test]
    fn player_count_must_be_one() {
        let grid = split_room();
        let none = level(&grid, &[(EntityType::Item, 1, 1)], &[]);
        assert!(!LevelValidator::new().is_playable(&none));

        let two = level(
            &grid,
            &[(EntityType::Player, 1, 1), (EntityType::Player, 2, 2)],
            &[],
        );
        let result = LevelValidator::new().validate(&two);
        assert!(!result.playable);
        assert!(result.issues[0].contains("2 Player"));
    }

    #[test]
    fn missing_victory_entity_names_its_type() {
        let grid = split_room();
        let level = level(&grid, &[(EntityType::Player, 1, 1)], &["collect_all_items"]);
        let result = LevelValidator::new().validate(&level);
        assert!(!result.playable);
        assert!(result.issues.iter().any(|i| i.contains("Item")));
    }

    #[test]
    fn unknown_victory_condition_is_advisory() {
        let grid = split_room();
        let level = level(&grid, &[(EntityType::Player, 1, 1)], &["win_the_lottery"]);
        let result = LevelValidator::new().validate(&level);
        assert!(result.playable);
        assert_eq!(result.issues.len(), 1);
        assert!(result.issues[0].contains("win_the_lottery"));
    }

    #[test]
    fn quality_drops_as_entities_become_unreachable() {
        let grid = split_room();
        let validator = LevelValidator::new();
        let mut previous = f64::INFINITY;
        for unreachable in 0..4 {
            let mut entities = vec![(EntityType::Player, 1, 1)];
            for i in 0..4 {
                let x = if i < unreachable { 15 } else { 5 };
                entities.push((EntityType::Enemy, x, 2 + i));
            }
            let score = validator.evaluate_quality(&level(&grid, &entities, &[]));
            assert!((0.0..=1.0).contains(&score));
            assert!(score <= previous, "{unreachable} unreachable raised score to {score}");
            previous = score;
        }
    }

    #[test]
    fn unreachable_additions_never_raise_sparse_quality() {
        // Large and sparse, so density sits below its band.
        let mut grid = TileGrid::filled(100, 100, TileType::Ground);
        for y in 0..100 {
            grid.set(Position::new(50, y), TileType::Wall);
        }
        let validator = LevelValidator::new();
        let mut entities = vec![(EntityType::Player, 1, 1)];
        entities.extend((0..15).map(|i| (EntityType::Enemy, 10 + i, 20)));

        let mut previous = validator.evaluate_quality(&level(&grid, &entities, &[]));
        for extra in 0..6 {
            entities.push((EntityType::Enemy, 60 + extra, 40));
            let score = validator.evaluate_quality(&level(&grid, &entities, &[]));
            assert!(
                score <= previous,
                "{} unreachable raised score from {previous} to {score}",
                extra + 1
            );
            previous = score;
        }
    }

    #[test]
    fn quality_drops_as_entities_become_unreachable_in_a_crowded_level() {
        // 20 entities on 200 cells is well above the density band.
        let grid = split_room();
        let validator = LevelValidator::new();
        let mut previous = f64::INFINITY;
        for unreachable in 0..19 {
            let mut entities = vec![(EntityType::Player, 0, 9)];
            for i in 0..19 {
                let x = if i < unreachable { 11 + i % 9 } else { i % 9 };
                entities.push((EntityType::Enemy, x, i / 9));
            }
            let score = validator.evaluate_quality(&level(&grid, &entities, &[]));
            assert!(score <= previous, "{unreachable} unreachable raised score to {score}");
            previous = score;
        }
    }

    #[test]
    fn band_scoring_penalises_both_sides() {
        assert_eq!(band_score(0.5, 0.35, 0.75), 1.0);
        assert!(band_score(0.1, 0.35, 0.75) < 1.0);
        assert!(band_score(1.0, 0.35, 0.75) < 1.0);
    }

    #[test]
    fn quality_is_deterministic() {
        let grid = split_room();
        let level = level(&grid, &[(EntityType::Player, 1, 1)], &[]);
        let validator = LevelValidator::new();
        assert_eq!(
            validator.evaluate_quality(&level).to_bits(),
            validator.evaluate_quality(&level).to_bits()
        );
    }

    #[test]
    #[should_panic(expected = "non-negative")]
    fn negative_weights_are_rejected() {
        let _ = LevelValidator::with_weights(QualityWeights {
            density: -1.0,
            ..QualityWeights::default()
        });
    }

    #[test]
    fn victory_table_lookup() {
        assert_eq!(victory_requirement("reach_exit"), Some(EntityType::Exit));
        assert_eq!(victory_requirement("talk_to_npc"), Some(EntityType::Npc));
        assert_eq!(victory_requirement("nope"), None);
    }
}
