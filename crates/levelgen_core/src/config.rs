//! Generation configuration.
//!
//! A [`GenerationConfig`] is handed to the pipeline already structurally
//! validated by the caller's configuration layer. The core does not re-check
//! dimensions or counts; it only asserts the placement distance contract
//! where it relies on it.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::random::Seed;

/// Kinds of entity the placer can put on a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityType {
    /// The player start. Exactly one per playable level.
    Player,
    /// Hostile actor.
    Enemy,
    /// Collectible.
    Item,
    /// Temporary boost.
    PowerUp,
    /// Non-player character.
    #[serde(rename = "NPC")]
    Npc,
    /// Level exit.
    Exit,
    /// Respawn point.
    Checkpoint,
    /// Blocking prop; the only type allowed off walkable tiles.
    Obstacle,
    /// Scripted trigger volume.
    Trigger,
}

impl EntityType {
    /// Order in which placement specs are processed, whatever their order in
    /// the config. Player comes first because distance-to-player checks and
    /// the `far_from_player` strategy need it.
    pub const PLACEMENT_ORDER: [Self; 9] = [
        Self::Player,
        Self::Exit,
        Self::Checkpoint,
        Self::Enemy,
        Self::Item,
        Self::PowerUp,
        Self::Npc,
        Self::Obstacle,
        Self::Trigger,
    ];

    /// Position of this type in [`Self::PLACEMENT_ORDER`].
    #[must_use]
    pub fn placement_rank(self) -> usize {
        Self::PLACEMENT_ORDER
            .iter()
            .position(|&t| t == self)
            .unwrap_or(Self::PLACEMENT_ORDER.len())
    }

    /// Whether entities of this type must stand on a walkable tile and be
    /// reachable from the player.
    #[must_use]
    pub const fn requires_walkable(self) -> bool {
        !matches!(self, Self::Obstacle)
    }

    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Player => "Player",
            Self::Enemy => "Enemy",
            Self::Item => "Item",
            Self::PowerUp => "PowerUp",
            Self::Npc => "NPC",
            Self::Exit => "Exit",
            Self::Checkpoint => "Checkpoint",
            Self::Obstacle => "Obstacle",
            Self::Trigger => "Trigger",
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Heuristic that decides where candidates for an entity type are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementStrategy {
    /// Uniform over walkable cells.
    #[default]
    Random,
    /// Around an anchor cell, within a radius that shrinks as attempts fail.
    Clustered,
    /// Away from entities of the same type already placed.
    Spread,
    /// Walkable cells touching at least one wall.
    NearWalls,
    /// Towards the grid centre.
    Center,
    /// As far from the player as possible.
    FarFromPlayer,
    /// Towards the quadrant corners, cycling per instance.
    Corners,
}

impl PlacementStrategy {
    /// Config tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Random => "random",
            Self::Clustered => "clustered",
            Self::Spread => "spread",
            Self::NearWalls => "near_walls",
            Self::Center => "center",
            Self::FarFromPlayer => "far_from_player",
            Self::Corners => "corners",
        }
    }
}

/// How many of one entity type to place, and under which constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementSpec {
    /// Type to place.
    pub entity_type: EntityType,
    /// Number of instances requested.
    pub count: u32,
    /// Minimum distance from every entity already placed.
    #[serde(default)]
    pub min_distance: f64,
    /// Maximum distance from the player; `None` leaves it unconstrained.
    #[serde(default)]
    pub max_distance_from_player: Option<f64>,
    /// Candidate selection heuristic.
    #[serde(default)]
    pub placement_strategy: PlacementStrategy,
}

impl PlacementSpec {
    /// Request `count` entities with no distance constraints, placed randomly.
    #[must_use]
    pub fn new(entity_type: EntityType, count: u32) -> Self {
        Self {
            entity_type,
            count,
            min_distance: 0.0,
            max_distance_from_player: None,
            placement_strategy: PlacementStrategy::Random,
        }
    }

    /// Set the minimum distance from other entities.
    #[must_use]
    pub fn with_min_distance(mut self, distance: f64) -> Self {
        self.min_distance = distance;
        self
    }

    /// Set the maximum distance from the player.
    #[must_use]
    pub fn with_max_distance_from_player(mut self, distance: f64) -> Self {
        self.max_distance_from_player = Some(distance);
        self
    }

    /// Set the placement strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: PlacementStrategy) -> Self {
        self.placement_strategy = strategy;
        self
    }

    /// Assert the distance contract the placer relies on.
    ///
    /// # Panics
    ///
    /// Panics if a distance is negative or NaN, or if `min_distance` exceeds
    /// `max_distance_from_player`. The configuration layer rejects these
    /// before the pipeline runs, so reaching this is a caller bug.
    pub fn assert_contract(&self) {
        assert!(
            self.min_distance >= 0.0,
            "{} min_distance must be non-negative, got {}",
            self.entity_type,
            self.min_distance
        );
        if let Some(max) = self.max_distance_from_player {
            assert!(
                self.min_distance <= max,
                "{} min_distance {} exceeds max_distance_from_player {}",
                self.entity_type,
                self.min_distance,
                max
            );
        }
    }
}

/// Complete generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Grid width in cells.
    pub width: u32,
    /// Grid height in cells.
    pub height: u32,
    /// Seed for every stochastic decision.
    pub seed: Seed,
    /// Terrain algorithm tag (`noise`, `cellular_automata`, `maze`).
    pub algorithm: String,
    /// Algorithm-specific numeric parameters; missing keys use defaults.
    #[serde(default)]
    pub algorithm_parameters: BTreeMap<String, f64>,
    /// Entity requirements.
    #[serde(default)]
    pub placement_specs: Vec<PlacementSpec>,
    /// Victory condition tags (`reach_exit`, `collect_all_items`, ...).
    #[serde(default)]
    pub victory_conditions: BTreeSet<String>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self::cave()
    }
}

impl GenerationConfig {
    /// Bare config with no entities or victory conditions.
    #[must_use]
    pub fn new(width: u32, height: u32, algorithm: &str) -> Self {
        Self {
            width,
            height,
            seed: 12345,
            algorithm: algorithm.to_string(),
            algorithm_parameters: BTreeMap::new(),
            placement_specs: Vec::new(),
            victory_conditions: BTreeSet::new(),
        }
    }

    /// Cave level: cellular automata, a player, an exit, and some enemies
    /// and items.
    #[must_use]
    pub fn cave() -> Self {
        Self::new(48, 32, "cellular_automata")
            .with_placement(PlacementSpec::new(EntityType::Player, 1))
            .with_placement(
                PlacementSpec::new(EntityType::Exit, 1)
                    .with_min_distance(10.0)
                    .with_strategy(PlacementStrategy::FarFromPlayer),
            )
            .with_placement(
                PlacementSpec::new(EntityType::Enemy, 6)
                    .with_min_distance(3.0)
                    .with_strategy(PlacementStrategy::Spread),
            )
            .with_placement(
                PlacementSpec::new(EntityType::Item, 4)
                    .with_min_distance(2.0)
                    .with_strategy(PlacementStrategy::NearWalls),
            )
            .with_victory_condition("reach_exit")
    }

    /// Maze level: player in one corner, exit as far away as possible.
    #[must_use]
    pub fn maze() -> Self {
        Self::new(41, 31, "maze")
            .with_placement(
                PlacementSpec::new(EntityType::Player, 1).with_strategy(PlacementStrategy::Corners),
            )
            .with_placement(
                PlacementSpec::new(EntityType::Exit, 1)
                    .with_strategy(PlacementStrategy::FarFromPlayer),
            )
            .with_placement(
                PlacementSpec::new(EntityType::Item, 5)
                    .with_min_distance(4.0)
                    .with_strategy(PlacementStrategy::Spread),
            )
            .with_victory_condition("reach_exit")
            .with_victory_condition("collect_all_items")
    }

    /// Open overworld: noise terrain with clustered enemies and a central NPC.
    #[must_use]
    pub fn overworld() -> Self {
        Self::new(64, 48, "noise")
            .with_placement(
                PlacementSpec::new(EntityType::Player, 1).with_strategy(PlacementStrategy::Center),
            )
            .with_placement(
                PlacementSpec::new(EntityType::Npc, 2)
                    .with_min_distance(2.0)
                    .with_max_distance_from_player(12.0),
            )
            .with_placement(
                PlacementSpec::new(EntityType::Enemy, 8)
                    .with_min_distance(1.5)
                    .with_strategy(PlacementStrategy::Clustered),
            )
            .with_placement(
                PlacementSpec::new(EntityType::Checkpoint, 4)
                    .with_strategy(PlacementStrategy::Corners),
            )
            .with_placement(PlacementSpec::new(EntityType::Obstacle, 6))
            .with_victory_condition("defeat_all_enemies")
    }

    /// Set the seed.
    #[must_use]
    pub fn with_seed(mut self, seed: Seed) -> Self {
        self.seed = seed;
        self
    }

    /// Set the dimensions.
    #[must_use]
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the terrain algorithm tag.
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: &str) -> Self {
        self.algorithm = algorithm.to_string();
        self
    }

    /// Set one algorithm parameter.
    #[must_use]
    pub fn with_parameter(mut self, name: &str, value: f64) -> Self {
        self.algorithm_parameters.insert(name.to_string(), value);
        self
    }

    /// Append a placement requirement.
    #[must_use]
    pub fn with_placement(mut self, spec: PlacementSpec) -> Self {
        self.placement_specs.push(spec);
        self
    }

    /// Add a victory condition tag.
    #[must_use]
    pub fn with_victory_condition(mut self, condition: &str) -> Self {
        self.victory_conditions.insert(condition.to_string());
        self
    }

    /// Look up an algorithm parameter.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<f64> {
        self.algorithm_parameters.get(name).copied()
    }

    /// Total entity instances requested across all specs.
    #[must_use]
    pub fn requested_entities(&self) -> u64 {
        self.placement_specs.iter().map(|s| u64::from(s.count)).sum()
    }
}
