//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the generation pipeline
//! produces identical levels given identical inputs.
//!
//! # Testing Strategy
//!
//! A level must be a pure function of its config and seed. Sources of
//! non-determinism to guard against:
//!
//! - **Process-wide randomness**: every stage draws from its own
//!   [`levelgen_core::random::SeededRng`]; nothing reads a global RNG.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Anything that feeds the output iterates `Vec`s or `BTree*` collections.
//!
//! - **Wall-clock time**: the assembly timestamp is excluded from
//!   [`Level::canonical_bytes`]; harness runs pin it anyway.
//!
//! - **Thread scheduling**: runs share no state, so parallel runs must
//!   agree with sequential ones.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use levelgen_core::assembly::{Level, LevelAssembler};
use levelgen_core::config::GenerationConfig;
use levelgen_core::error::Result;
use levelgen_core::pipeline::LevelPipeline;
use levelgen_core::placement;
use levelgen_core::terrain;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Digest of each run's output.
    pub digests: Vec<u64>,
}

impl DeterminismResult {
    /// All distinct digests (one for a deterministic generator).
    #[must_use]
    pub fn unique_digests(&self) -> Vec<u64> {
        let mut unique = self.digests.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that every run agreed, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different digests.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            panic!(
                "Generation is non-deterministic!\n\
                 Runs: {}\n\
                 Unique digests: {} (expected 1)\n\
                 All digests: {:?}",
                self.digests.len(),
                self.unique_digests().len(),
                self.digests
            );
        }
    }
}

/// Produce a value `runs` times and compare digests.
///
/// # Example
///
/// ```
/// use levelgen_test_utils::determinism::{compute_hash, verify_determinism};
///
/// let result = verify_determinism(3, || vec![1, 2, 3], compute_hash);
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<T, Produce, Digest>(
    runs: usize,
    produce: Produce,
    digest: Digest,
) -> DeterminismResult
where
    Produce: Fn() -> T,
    Digest: Fn(&T) -> u64,
{
    let digests: Vec<u64> = (0..runs).map(|_| digest(&produce())).collect();
    let is_deterministic = digests.windows(2).all(|w| w[0] == w[1]);
    DeterminismResult {
        is_deterministic,
        digests,
    }
}

/// Pipeline with a pinned timestamp.
#[must_use]
pub fn fixed_clock_pipeline() -> LevelPipeline {
    LevelPipeline::new().with_assembler(LevelAssembler::new().with_timestamp(0))
}

/// Digest of a level's canonical encoding.
pub fn level_digest(level: &Level) -> Result<u64> {
    Ok(compute_hash(&level.canonical_bytes()?))
}

/// Run the full pipeline `runs` times on `config` and compare levels.
pub fn verify_pipeline_determinism(
    config: &GenerationConfig,
    runs: usize,
) -> Result<DeterminismResult> {
    let pipeline = fixed_clock_pipeline();
    let mut digests = Vec::with_capacity(runs);
    for _ in 0..runs {
        let report = pipeline.run(config)?;
        digests.push(level_digest(&report.level)?);
    }
    let is_deterministic = digests.windows(2).all(|w| w[0] == w[1]);
    Ok(DeterminismResult {
        is_deterministic,
        digests,
    })
}

/// Run the pipeline on `threads` scoped threads at once and collect level
/// digests. A panic on any thread is resumed on the caller.
pub fn run_parallel_pipelines(
    config: &GenerationConfig,
    threads: usize,
) -> Result<DeterminismResult> {
    let digests = thread::scope(|s| {
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                s.spawn(|| {
                    let report = fixed_clock_pipeline().run(config)?;
                    level_digest(&report.level)
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
            .collect::<Result<Vec<u64>>>()
    })?;

    let is_deterministic = digests.windows(2).all(|w| w[0] == w[1]);
    Ok(DeterminismResult {
        is_deterministic,
        digests,
    })
}

/// Generate twice and report the first stage whose output differs.
///
/// Returns `Ok(None)` when both runs agree everywhere.
pub fn find_first_divergence(config: &GenerationConfig) -> Result<Option<&'static str>> {
    let first_grid = terrain::generate(config, config.seed)?;
    let second_grid = terrain::generate(config, config.seed)?;
    if first_grid != second_grid {
        return Ok(Some("terrain"));
    }

    let first_placed = placement::place(&first_grid, config, config.seed);
    let second_placed = placement::place(&second_grid, config, config.seed);
    if first_placed != second_placed {
        return Ok(Some("placement"));
    }

    let pipeline = fixed_clock_pipeline();
    let first = pipeline.run(config)?;
    let second = pipeline.run(config)?;
    if first.level.canonical_bytes()? != second.level.canonical_bytes()? {
        return Ok(Some("assembly"));
    }
    if first.validation != second.validation {
        return Ok(Some("validation"));
    }
    Ok(None)
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for configs, seeds and grids.
pub mod strategies {
    use levelgen_core::config::{EntityType, GenerationConfig, PlacementSpec, PlacementStrategy};
    use levelgen_core::grid::{Position, TileGrid, TileType};
    use levelgen_core::random::Seed;
    use proptest::prelude::*;

    /// Any seed.
    pub fn arb_seed() -> impl Strategy<Value = Seed> {
        any::<i32>()
    }

    /// One of the supported algorithm tags.
    pub fn arb_algorithm() -> impl Strategy<Value = &'static str> {
        prop_oneof![Just("noise"), Just("cellular_automata"), Just("maze")]
    }

    /// Any tile type.
    pub fn arb_tile() -> impl Strategy<Value = TileType> {
        proptest::sample::select(TileType::ALL.to_vec())
    }

    /// Any entity type.
    pub fn arb_entity_type() -> impl Strategy<Value = EntityType> {
        proptest::sample::select(EntityType::PLACEMENT_ORDER.to_vec())
    }

    /// Any placement strategy.
    pub fn arb_strategy() -> impl Strategy<Value = PlacementStrategy> {
        prop_oneof![
            Just(PlacementStrategy::Random),
            Just(PlacementStrategy::Clustered),
            Just(PlacementStrategy::Spread),
            Just(PlacementStrategy::NearWalls),
            Just(PlacementStrategy::Center),
            Just(PlacementStrategy::FarFromPlayer),
            Just(PlacementStrategy::Corners),
        ]
    }

    /// A spec that satisfies the distance contract.
    pub fn arb_placement_spec() -> impl Strategy<Value = PlacementSpec> {
        (
            arb_entity_type(),
            0u32..6,
            0.0f64..4.0,
            proptest::option::of(0.0f64..20.0),
            arb_strategy(),
        )
            .prop_map(|(entity_type, count, min_distance, slack, strategy)| {
                let spec = PlacementSpec::new(entity_type, count)
                    .with_min_distance(min_distance)
                    .with_strategy(strategy);
                match slack {
                    Some(slack) => spec.with_max_distance_from_player(min_distance + slack),
                    None => spec,
                }
            })
    }

    /// A structurally valid config: dimensions 10..48, a Player, and up to
    /// four more specs.
    pub fn arb_config() -> impl Strategy<Value = GenerationConfig> {
        (
            10u32..48,
            10u32..48,
            arb_seed(),
            arb_algorithm(),
            proptest::collection::vec(arb_placement_spec(), 0..4),
            proptest::sample::subsequence(
                vec!["reach_exit", "collect_all_items", "defeat_all_enemies"],
                0..=2,
            ),
        )
            .prop_map(|(width, height, seed, algorithm, specs, victory)| {
                let base = GenerationConfig::new(width, height, algorithm)
                    .with_seed(seed)
                    .with_placement(PlacementSpec::new(EntityType::Player, 1));
                let with_specs = specs.into_iter().fold(base, GenerationConfig::with_placement);
                victory
                    .into_iter()
                    .fold(with_specs, GenerationConfig::with_victory_condition)
            })
    }

    /// A grid of random tiles up to `max_side` on each side.
    pub fn arb_grid(max_side: u32) -> impl Strategy<Value = TileGrid> {
        (1..=max_side, 1..=max_side).prop_flat_map(|(width, height)| {
            proptest::collection::vec(arb_tile(), (width * height) as usize).prop_map(
                move |tiles| {
                    TileGrid::from_tiles(width, height, tiles)
                        .unwrap_or_else(|| TileGrid::new(width, height))
                },
            )
        })
    }

    /// A position within `margin` cells of a `width` x `height` grid, so
    /// roughly half land out of bounds.
    pub fn arb_position_around(
        width: u32,
        height: u32,
        margin: i32,
    ) -> impl Strategy<Value = Position> {
        (
            -margin..width as i32 + margin,
            -margin..height as i32 + margin,
        )
            .prop_map(|(x, y)| Position::new(x, y))
    }
}
