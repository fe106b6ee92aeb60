//! Terrain synthesis.
//!
//! The algorithm set is closed: a config's algorithm tag resolves to one
//! [`TerrainAlgorithm`] variant with its parameters already read and checked,
//! and [`TerrainAlgorithm::generate`] dispatches with an exhaustive match.
//!
//! | Tag | Variant | Parameters (defaults) |
//! |---|---|---|
//! | `noise`, `perlin` | [`TerrainAlgorithm::Noise`] | `scale` 16, `octaves` 4, `persistence` 0.5, `lacunarity` 2, elevation bands |
//! | `cellular_automata`, `cellular`, `cave` | [`TerrainAlgorithm::CellularAutomata`] | `wallProbability` 0.45, `iterations` 5, `birthLimit` 4, `deathLimit` 3, `keepLargestRegion` 1 |
//! | `maze` | [`TerrainAlgorithm::Maze`] | `loopProbability` 0 |

mod cellular;
mod maze;
mod noise;
mod params;

use serde::{Deserialize, Serialize};

use crate::config::GenerationConfig;
use crate::error::{GenerationError, Result};
use crate::grid::TileGrid;
use crate::random::{SeededRng, Seed, Stage};

pub use cellular::CellularParams;
pub use maze::MazeParams;
pub use noise::{NoiseParams, PerlinNoise};

use params::ParamReader;

/// A terrain generator with its parameters resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TerrainAlgorithm {
    /// Fractal gradient noise thresholded into elevation bands.
    Noise(NoiseParams),
    /// Random fill smoothed into caves.
    CellularAutomata(CellularParams),
    /// Recursive-backtracker maze on even coordinates.
    Maze(MazeParams),
}

impl TerrainAlgorithm {
    /// Resolve the algorithm tag and parameters of `config`.
    ///
    /// Tags are matched case-insensitively with `-` treated as `_`.
    pub fn from_config(config: &GenerationConfig) -> Result<Self> {
        let tag = config.algorithm.trim().to_ascii_lowercase().replace('-', "_");
        match tag.as_str() {
            "noise" | "perlin" => {
                let reader = ParamReader::new(NoiseParams::TAG, &config.algorithm_parameters);
                Ok(Self::Noise(NoiseParams::read(&reader)?))
            }
            "cellular_automata" | "cellular" | "cave" => {
                let reader = ParamReader::new(CellularParams::TAG, &config.algorithm_parameters);
                Ok(Self::CellularAutomata(CellularParams::read(&reader)?))
            }
            "maze" => {
                let reader = ParamReader::new(MazeParams::TAG, &config.algorithm_parameters);
                Ok(Self::Maze(MazeParams::read(&reader)?))
            }
            _ => Err(GenerationError::UnsupportedAlgorithm(config.algorithm.clone())),
        }
    }

    /// Canonical tag.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Noise(_) => NoiseParams::TAG,
            Self::CellularAutomata(_) => CellularParams::TAG,
            Self::Maze(_) => MazeParams::TAG,
        }
    }

    /// Smallest (width, height) the algorithm accepts.
    #[must_use]
    pub const fn min_dimensions(&self) -> (u32, u32) {
        match self {
            Self::Noise(_) => (1, 1),
            Self::CellularAutomata(_) | Self::Maze(_) => (3, 3),
        }
    }

    /// Generate a `width` x `height` grid.
    pub fn generate(&self, width: u32, height: u32, seed: Seed) -> Result<TileGrid> {
        let (min_width, min_height) = self.min_dimensions();
        if width < min_width || height < min_height {
            return Err(GenerationError::InvalidDimensions {
                algorithm: self.tag().to_string(),
                width,
                height,
                min_width,
                min_height,
            });
        }

        let mut rng = SeededRng::for_stage(seed, Stage::Terrain);
        let grid = match self {
            Self::Noise(params) => noise::generate(params, width, height, &mut rng),
            Self::CellularAutomata(params) => cellular::generate(params, width, height, &mut rng),
            Self::Maze(params) => maze::generate(params, width, height, &mut rng),
        };

        debug_assert_eq!((grid.width(), grid.height()), (width, height));
        tracing::debug!(
            algorithm = self.tag(),
            width,
            height,
            seed,
            walkable = grid.walkable_count(),
            "Terrain generated"
        );
        Ok(grid)
    }
}

/// Generate the terrain for `config` with `seed`.
///
/// Deterministic: identical inputs produce identical grids, and the grid is
/// always exactly `config.width` x `config.height`.
pub fn generate(config: &GenerationConfig, seed: Seed) -> Result<TileGrid> {
    TerrainAlgorithm::from_config(config)?.generate(config.width, config.height, seed)
}
