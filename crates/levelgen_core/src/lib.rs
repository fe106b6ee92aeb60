//! # Levelgen Core
//!
//! Deterministic 2D level generation.
//!
//! This crate contains **only** the generation pipeline:
//! - No IO
//! - No process-wide randomness (every run seeds its own [`random::SeededRng`])
//! - No shared mutable state between runs
//!
//! A run flows strictly one way:
//!
//! ```text
//! GenerationConfig ─▶ terrain ─▶ placement ─▶ assembly ─▶ validation
//! ```
//!
//! The same config and seed always give the same [`assembly::Level`],
//! byte for byte ([`assembly::Level::canonical_bytes`]).
//!
//! ## Crate Structure
//!
//! - [`random`] - Seeded PCG stream, one per pipeline stage
//! - [`grid`] - Tile and position model
//! - [`config`] - Generation requests and presets
//! - [`terrain`] - Noise, cellular-automata and maze generators
//! - [`placement`] - Constraint-based entity placement
//! - [`assembly`] - Immutable level value and metadata
//! - [`reachability`] - Flood fill over walkable tiles
//! - [`validation`] - Playability and quality scoring
//! - [`pipeline`] - Stage orchestration with cooperative cancellation

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod assembly;
pub mod config;
pub mod error;
pub mod grid;
pub mod pipeline;
pub mod placement;
pub mod random;
pub mod reachability;
pub mod terrain;
pub mod validation;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::assembly::{Level, LevelAssembler, LevelMetadata};
    pub use crate::config::{EntityType, GenerationConfig, PlacementSpec, PlacementStrategy};
    pub use crate::error::{GenerationError, Result};
    pub use crate::grid::{Position, TileGrid, TileType};
    pub use crate::pipeline::{CancellationToken, GenerationReport, LevelPipeline};
    pub use crate::placement::{EntityPlacer, PlacedEntity, PlacementOutcome, PlacementWarning};
    pub use crate::random::{Seed, SeededRng, Stage};
    pub use crate::reachability::Reachability;
    pub use crate::terrain::TerrainAlgorithm;
    pub use crate::validation::{LevelValidator, QualityWeights, ValidationResult};
}
