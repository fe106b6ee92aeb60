//! Constraint-based entity placement.
//!
//! Specs are processed in [`EntityType::PLACEMENT_ORDER`], so the player
//! always exists before anything that measures distance to it. Each instance
//! gets a bounded number of candidate draws; an instance that finds no
//! acceptable cell is skipped and reported as a [`PlacementWarning`] instead
//! of failing the run.
//!
//! A candidate is accepted when:
//! - it is walkable (Obstacles only need a non-Wall cell),
//! - no entity occupies it,
//! - it is at least `min_distance` from every entity already placed,
//! - it is within `max_distance_from_player` of the player, once a player
//!   exists.
//!
//! Every attempt spends a fixed number of draws for its strategy, so for a
//! fixed grid, config and seed the same entities land in the same cells in
//! the same order.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{EntityType, GenerationConfig, PlacementSpec, PlacementStrategy};
use crate::grid::{Position, TileGrid, TileType};
use crate::random::{SeededRng, Seed, Stage};

/// Smallest radius a cluster shrinks to.
const MIN_CLUSTER_RADIUS: f64 = 2.0;

/// An entity placed on the grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedEntity {
    /// What was placed.
    pub entity_type: EntityType,
    /// Cell it occupies.
    pub position: Position,
    /// Free-form annotations for themes and exporters. The core only writes
    /// the `strategy` key.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl PlacedEntity {
    /// Entity with no properties.
    #[must_use]
    pub fn new(entity_type: EntityType, position: Position) -> Self {
        Self {
            entity_type,
            position,
            properties: BTreeMap::new(),
        }
    }

    /// Attach a property.
    #[must_use]
    pub fn with_property(mut self, key: &str, value: &str) -> Self {
        self.properties.insert(key.to_string(), value.to_string());
        self
    }
}

/// One entity instance that could not be placed within the retry budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementWarning {
    /// Type of the skipped entity.
    pub entity_type: EntityType,
    /// Zero-based instance index within its spec.
    pub instance: u32,
    /// Instances the spec asked for.
    pub requested: u32,
    /// Candidate draws made before giving up.
    pub attempts: u32,
}

impl std::fmt::Display for PlacementWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Could not place {} {} of {} after {} attempts",
            self.entity_type,
            self.instance + 1,
            self.requested,
            self.attempts
        )
    }
}

/// Entities placed plus the instances that were skipped.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlacementOutcome {
    /// Placed entities in placement order.
    pub entities: Vec<PlacedEntity>,
    /// One warning per skipped instance.
    pub warnings: Vec<PlacementWarning>,
}

impl PlacementOutcome {
    /// Split into entities and warnings.
    #[must_use]
    pub fn into_parts(self) -> (Vec<PlacedEntity>, Vec<PlacementWarning>) {
        (self.entities, self.warnings)
    }
}

/// Places entities on a finished grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityPlacer {
    max_attempts: u32,
    samples_per_attempt: u32,
}

impl Default for EntityPlacer {
    fn default() -> Self {
        Self {
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            samples_per_attempt: Self::DEFAULT_SAMPLES_PER_ATTEMPT,
        }
    }
}

impl EntityPlacer {
    /// Candidate draws per entity instance before it is skipped.
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 100;
    /// Samples a biased strategy compares per attempt.
    pub const DEFAULT_SAMPLES_PER_ATTEMPT: u32 = 8;

    /// Placer with default budgets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-instance retry budget. Zero skips every instance.
    #[must_use]
    pub const fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set how many samples biased strategies compare per attempt (min 1).
    #[must_use]
    pub fn with_samples_per_attempt(mut self, samples: u32) -> Self {
        self.samples_per_attempt = samples.max(1);
        self
    }

    /// Per-instance retry budget.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Place every entity `config` requests on `grid`.
    ///
    /// # Panics
    ///
    /// Panics if a spec breaks the distance contract (see
    /// [`PlacementSpec::assert_contract`]).
    #[must_use]
    pub fn place(
        &self,
        grid: &TileGrid,
        config: &GenerationConfig,
        seed: Seed,
    ) -> PlacementOutcome {
        let mut specs: Vec<&PlacementSpec> = config.placement_specs.iter().collect();
        specs.sort_by_key(|spec| spec.entity_type.placement_rank());

        let mut rng = SeededRng::for_stage(seed, Stage::Placement);
        let mut state = PlacementState::default();
        let mut warnings = Vec::new();

        for spec in specs {
            spec.assert_contract();
            self.place_spec(grid, spec, &mut rng, &mut state, &mut warnings);
        }

        debug!(
            placed = state.entities.len(),
            skipped = warnings.len(),
            "Entities placed"
        );
        PlacementOutcome {
            entities: state.entities,
            warnings,
        }
    }

    fn place_spec(
        &self,
        grid: &TileGrid,
        spec: &PlacementSpec,
        rng: &mut SeededRng,
        state: &mut PlacementState,
        warnings: &mut Vec<PlacementWarning>,
    ) {
        let pool = candidate_pool(grid, spec);
        if pool.is_empty() {
            for instance in 0..spec.count {
                record_shortfall(warnings, spec, instance, 0);
            }
            return;
        }

        let cluster = (spec.placement_strategy == PlacementStrategy::Clustered)
            .then(|| Cluster::around(pool[rng.next_index(pool.len())], &pool, grid));

        for instance in 0..spec.count {
            let mut placed = None;
            for attempt in 0..self.max_attempts {
                let candidate =
                    self.draw(grid, spec, &pool, cluster.as_ref(), attempt, instance, state, rng);
                if accepts(grid, spec, candidate, state) {
                    placed = Some(candidate);
                    break;
                }
            }

            match placed {
                Some(position) => state.push(
                    PlacedEntity::new(spec.entity_type, position)
                        .with_property("strategy", spec.placement_strategy.as_str()),
                ),
                None => record_shortfall(warnings, spec, instance, self.max_attempts),
            }
        }
    }

    fn draw(
        &self,
        grid: &TileGrid,
        spec: &PlacementSpec,
        pool: &[Position],
        cluster: Option<&Cluster>,
        attempt: u32,
        instance: u32,
        state: &PlacementState,
        rng: &mut SeededRng,
    ) -> Position {
        match spec.placement_strategy {
            PlacementStrategy::Random | PlacementStrategy::NearWalls => {
                pool[rng.next_index(pool.len())]
            }
            PlacementStrategy::Clustered => match cluster {
                Some(cluster) => cluster.draw(attempt, self.max_attempts, rng),
                None => pool[rng.next_index(pool.len())],
            },
            PlacementStrategy::Spread => self.tournament(pool, rng, |p| {
                state
                    .of_type(spec.entity_type)
                    .map(|other| p.distance(other))
                    .fold(f64::INFINITY, f64::min)
            }),
            PlacementStrategy::Center => {
                let center = grid.center();
                self.tournament(pool, rng, |p| -p.distance(center))
            }
            PlacementStrategy::FarFromPlayer => {
                let player = state.player;
                self.tournament(pool, rng, |p| player.map_or(0.0, |pl| p.distance(pl)))
            }
            PlacementStrategy::Corners => {
                let corner = quadrant_corner(grid, instance);
                self.tournament(pool, rng, |p| -p.distance(corner))
            }
        }
    }

    /// Draw `samples_per_attempt` cells and keep the highest-scoring one;
    /// ties keep the earliest sample.
    fn tournament(
        &self,
        pool: &[Position],
        rng: &mut SeededRng,
        score: impl Fn(Position) -> f64,
    ) -> Position {
        let mut best = pool[rng.next_index(pool.len())];
        let mut best_score = score(best);
        for _ in 1..self.samples_per_attempt {
            let sample = pool[rng.next_index(pool.len())];
            let sample_score = score(sample);
            if sample_score > best_score {
                best = sample;
                best_score = sample_score;
            }
        }
        best
    }
}

/// Place with the default budgets.
///
/// # Panics
///
/// Panics if a spec breaks the distance contract.
#[must_use]
pub fn place(grid: &TileGrid, config: &GenerationConfig, seed: Seed) -> PlacementOutcome {
    EntityPlacer::default().place(grid, config, seed)
}

#[derive(Debug, Default)]
struct PlacementState {
    entities: Vec<PlacedEntity>,
    occupied: HashSet<Position>,
    player: Option<Position>,
}

impl PlacementState {
    fn push(&mut self, entity: PlacedEntity) {
        if entity.entity_type == EntityType::Player && self.player.is_none() {
            self.player = Some(entity.position);
        }
        self.occupied.insert(entity.position);
        self.entities.push(entity);
    }

    fn of_type(&self, entity_type: EntityType) -> impl Iterator<Item = Position> + '_ {
        self.entities
            .iter()
            .filter(move |e| e.entity_type == entity_type)
            .map(|e| e.position)
    }
}

/// Cells sorted by distance from an anchor, so "within radius r" is a prefix.
#[derive(Debug)]
struct Cluster {
    by_distance: Vec<(f64, Position)>,
    initial_radius: f64,
}

impl Cluster {
    fn around(anchor: Position, pool: &[Position], grid: &TileGrid) -> Self {
        let mut by_distance: Vec<(f64, Position)> =
            pool.iter().map(|&p| (p.distance(anchor), p)).collect();
        by_distance.sort_by(|a, b| {
            a.0.total_cmp(&b.0)
                .then_with(|| (a.1.y, a.1.x).cmp(&(b.1.y, b.1.x)))
        });
        let initial_radius =
            (f64::from(grid.width().min(grid.height())) / 4.0).max(MIN_CLUSTER_RADIUS);
        Self {
            by_distance,
            initial_radius,
        }
    }

    fn draw(&self, attempt: u32, max_attempts: u32, rng: &mut SeededRng) -> Position {
        let progress = f64::from(attempt) / f64::from(max_attempts.max(1));
        let radius = (self.initial_radius * (1.0 - progress)).max(MIN_CLUSTER_RADIUS);
        let within = self
            .by_distance
            .partition_point(|(distance, _)| *distance <= radius)
            .max(1);
        self.by_distance[rng.next_index(within)].1
    }
}

fn candidate_pool(grid: &TileGrid, spec: &PlacementSpec) -> Vec<Position> {
    let base: Vec<Position> = if spec.entity_type.requires_walkable() {
        grid.walkable_positions()
    } else {
        grid.positions()
            .filter(|&p| grid.get(p) != TileType::Wall)
            .collect()
    };

    if spec.placement_strategy != PlacementStrategy::NearWalls {
        return base;
    }
    let near_walls: Vec<Position> = base
        .iter()
        .copied()
        .filter(|&p| grid.wall_neighbors(p) > 0)
        .collect();
    if near_walls.is_empty() {
        base
    } else {
        near_walls
    }
}

/// Quadrant corners in clockwise order from the top-left.
fn quadrant_corner(grid: &TileGrid, instance: u32) -> Position {
    let right = grid.width() as i32 - 1;
    let bottom = grid.height() as i32 - 1;
    match instance % 4 {
        0 => Position::new(0, 0),
        1 => Position::new(right, 0),
        2 => Position::new(right, bottom),
        _ => Position::new(0, bottom),
    }
}

fn accepts(
    grid: &TileGrid,
    spec: &PlacementSpec,
    candidate: Position,
    state: &PlacementState,
) -> bool {
    if !grid.in_bounds(candidate) {
        return false;
    }
    if spec.entity_type.requires_walkable() && !grid.is_walkable(candidate) {
        return false;
    }
    if state.occupied.contains(&candidate) {
        return false;
    }
    if state
        .entities
        .iter()
        .any(|e| e.position.distance(candidate) < spec.min_distance)
    {
        return false;
    }
    match (spec.max_distance_from_player, state.player) {
        (Some(max), Some(player)) if spec.entity_type != EntityType::Player => {
            player.distance(candidate) <= max
        }
        _ => true,
    }
}

fn record_shortfall(
    warnings: &mut Vec<PlacementWarning>,
    spec: &PlacementSpec,
    instance: u32,
    attempts: u32,
) {
    let warning = PlacementWarning {
        entity_type: spec.entity_type,
        instance,
        requested: spec.count,
        attempts,
    };
    warn!(
        entity_type = %spec.entity_type,
        instance,
        attempts,
        "Entity placement skipped: {warning}"
    );
    warnings.push(warning);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_room(width: u32, height: u32) -> TileGrid {
        let mut grid = TileGrid::filled(width, height, TileType::Ground);
        for x in 0..width as i32 {
            grid.set(Position::new(x, 0), TileType::Wall);
            grid.set(Position::new(x, height as i32 - 1), TileType::Wall);
        }
        for y in 0..height as i32 {
            grid.set(Position::new(0, y), TileType::Wall);
            grid.set(Position::new(width as i32 - 1, y), TileType::Wall);
        }
        grid
    }

    fn config_with(specs: Vec<PlacementSpec>) -> GenerationConfig {
        specs
            .into_iter()
            .fold(GenerationConfig::new(20, 20, "noise"), |c, s| c.with_placement(s))
    }

    #[test]
    fn player_is_placed_first_regardless_of_config_order() {
        let grid = open_room(20, 20);
        let config = config_with(vec![
            PlacementSpec::new(EntityType::Enemy, 3),
            PlacementSpec::new(EntityType::Exit, 1),
            PlacementSpec::new(EntityType::Player, 1),
        ]);
        let outcome = place(&grid, &config, 1);
        let types: Vec<EntityType> = outcome.entities.iter().map(|e| e.entity_type).collect();
        assert_eq!(
            types,
            vec![
                EntityType::Player,
                EntityType::Exit,
                EntityType::Enemy,
                EntityType::Enemy,
                EntityType::Enemy
            ]
        );
    }

    #[test]
    fn placed_entities_stand_on_walkable_unique_cells() {
        let grid = open_room(16, 12);
        let config = config_with(vec![
            PlacementSpec::new(EntityType::Player, 1),
            PlacementSpec::new(EntityType::Item, 20),
        ]);
        let outcome = place(&grid, &config, 3);
        let mut seen = HashSet::new();
        for entity in &outcome.entities {
            assert!(grid.is_walkable(entity.position));
            assert!(seen.insert(entity.position), "two entities share a cell");
        }
    }

    #[test]
    fn min_distance_is_respected() {
        let grid = open_room(30, 30);
        let config = config_with(vec![PlacementSpec::new(EntityType::Enemy, 10)
            .with_min_distance(5.0)
            .with_strategy(PlacementStrategy::Spread)]);
        let outcome = place(&grid, &config, 21);
        for (i, a) in outcome.entities.iter().enumerate() {
            for b in &outcome.entities[i + 1..] {
                assert!(a.position.distance(b.position) >= 5.0);
            }
        }
    }

    #[test]
    fn max_distance_from_player_is_respected() {
        let grid = open_room(40, 40);
        let config = config_with(vec![
            PlacementSpec::new(EntityType::Player, 1).with_strategy(PlacementStrategy::Center),
            PlacementSpec::new(EntityType::Npc, 5).with_max_distance_from_player(6.0),
        ]);
        let outcome = place(&grid, &config, 8);
        let player = outcome.entities[0].position;
        for npc in outcome.entities.iter().skip(1) {
            assert!(player.distance(npc.position) <= 6.0);
        }
    }

    #[test]
    fn impossible_requests_are_skipped_with_warnings() {
        let grid = open_room(8, 8);
        let config = config_with(vec![
            PlacementSpec::new(EntityType::Enemy, 5).with_min_distance(50.0)
        ]);
        let outcome = place(&grid, &config, 2);
        // The first enemy has nothing to keep away from.
        assert_eq!(outcome.entities.len(), 1);
        assert_eq!(outcome.warnings.len(), 4);
        assert_eq!(outcome.warnings[0].instance, 1);
        assert_eq!(outcome.warnings[0].attempts, EntityPlacer::DEFAULT_MAX_ATTEMPTS);
        assert!(outcome.warnings[0].to_string().contains("Enemy 2 of 5"));
    }

    #[test]
    fn zero_attempt_budget_skips_everything() {
        let grid = open_room(10, 10);
        let config = config_with(vec![PlacementSpec::new(EntityType::Player, 1)]);
        let outcome = EntityPlacer::new().with_max_attempts(0).place(&grid, &config, 1);
        assert!(outcome.entities.is_empty());
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[test]
    fn solid_grid_warns_without_drawing() {
        let grid = TileGrid::filled(10, 10, TileType::Wall);
        let config = config_with(vec![
            PlacementSpec::new(EntityType::Player, 1),
            PlacementSpec::new(EntityType::Obstacle, 2),
        ]);
        let outcome = place(&grid, &config, 1);
        assert!(outcome.entities.is_empty());
        assert_eq!(outcome.warnings.len(), 3);
        assert!(outcome.warnings.iter().all(|w| w.attempts == 0));
    }

    #[test]
    fn obstacles_may_sit_on_non_walkable_tiles() {
        let grid = TileGrid::filled(10, 10, TileType::Water);
        let config = config_with(vec![PlacementSpec::new(EntityType::Obstacle, 3)]);
        let outcome = place(&grid, &config, 4);
        assert_eq!(outcome.entities.len(), 3);
        assert!(outcome
            .entities
            .iter()
            .all(|e| grid.get(e.position) == TileType::Water));
    }

    #[test]
    fn near_walls_prefers_cells_touching_walls() {
        let grid = open_room(30, 30);
        let config = config_with(vec![PlacementSpec::new(EntityType::Item, 10)
            .with_strategy(PlacementStrategy::NearWalls)]);
        let outcome = place(&grid, &config, 6);
        assert_eq!(outcome.entities.len(), 10);
        for item in &outcome.entities {
            assert!(grid.wall_neighbors(item.position) > 0);
        }
    }

    #[test]
    fn far_from_player_lands_farther_than_random_on_average() {
        let grid = open_room(40, 40);
        let mut far_total = 0.0;
        let mut random_total = 0.0;
        for seed in 0..20 {
            for (strategy, total) in [
                (PlacementStrategy::FarFromPlayer, &mut far_total),
                (PlacementStrategy::Random, &mut random_total),
            ] {
                let config = config_with(vec![
                    PlacementSpec::new(EntityType::Player, 1),
                    PlacementSpec::new(EntityType::Exit, 1).with_strategy(strategy),
                ]);
                let outcome = place(&grid, &config, seed);
                *total += outcome.entities[0]
                    .position
                    .distance(outcome.entities[1].position);
            }
        }
        assert!(far_total > random_total);
    }

    #[test]
    fn corners_cycle_through_quadrants() {
        let grid = open_room(40, 40);
        let config = config_with(vec![PlacementSpec::new(EntityType::Checkpoint, 4)
            .with_strategy(PlacementStrategy::Corners)]);
        let outcome = EntityPlacer::new()
            .with_samples_per_attempt(400)
            .place(&grid, &config, 12);
        assert_eq!(outcome.entities.len(), 4);
        let quadrants: Vec<(bool, bool)> = outcome
            .entities
            .iter()
            .map(|e| (e.position.x >= 20, e.position.y >= 20))
            .collect();
        assert_eq!(
            quadrants,
            vec![(false, false), (true, false), (true, true), (false, true)]
        );
    }

    #[test]
    fn clustered_entities_stay_close_together() {
        let grid = open_room(60, 60);
        let config = config_with(vec![PlacementSpec::new(EntityType::Enemy, 6)
            .with_strategy(PlacementStrategy::Clustered)]);
        let outcome = place(&grid, &config, 30);
        assert_eq!(outcome.entities.len(), 6);
        let first = outcome.entities[0].position;
        for enemy in &outcome.entities {
            // Twice the initial radius (60 / 4).
            assert!(enemy.position.distance(first) <= 30.0);
        }
    }

    #[test]
    fn placement_is_deterministic() {
        let grid = open_room(25, 25);
        let config = GenerationConfig::cave();
        assert_eq!(place(&grid, &config, 77), place(&grid, &config, 77));
    }
}
