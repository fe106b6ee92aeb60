//! Cellular automata caves.
//!
//! Random wall fill followed by majority-rule smoothing. Border cells are
//! forced to Wall after the fill and after every smoothing round so the cave
//! is always sealed.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::grid::{Position, TileGrid, TileType};
use crate::random::SeededRng;
use crate::reachability::walkable_regions;

use super::params::ParamReader;

/// Parameters for [`super::TerrainAlgorithm::CellularAutomata`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellularParams {
    /// Probability that a cell starts as Wall.
    pub wall_probability: f64,
    /// Number of smoothing rounds.
    pub iterations: u32,
    /// A cell becomes Wall when more than this many neighbours are walls.
    pub birth_limit: u8,
    /// A cell becomes Ground when fewer than this many neighbours are walls.
    pub death_limit: u8,
    /// Fill every open region except the largest with Wall.
    pub keep_largest_region: bool,
}

impl Default for CellularParams {
    fn default() -> Self {
        Self {
            wall_probability: 0.45,
            iterations: 5,
            birth_limit: 4,
            death_limit: 3,
            keep_largest_region: true,
        }
    }
}

impl CellularParams {
    pub(super) const TAG: &'static str = "cellular_automata";

    pub(super) fn read(reader: &ParamReader<'_>) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            wall_probability: reader.float(
                "wallProbability",
                defaults.wall_probability,
                0.0..=1.0,
            )?,
            iterations: reader.integer("iterations", defaults.iterations, 0..=100)?,
            birth_limit: reader.integer("birthLimit", u32::from(defaults.birth_limit), 0..=8)?
                as u8,
            death_limit: reader.integer("deathLimit", u32::from(defaults.death_limit), 0..=8)?
                as u8,
            keep_largest_region: reader.flag("keepLargestRegion", defaults.keep_largest_region)?,
        })
    }

    /// Next state of a cell given its current tile and wall-neighbour count.
    #[must_use]
    pub fn step(&self, current: TileType, wall_neighbors: u8) -> TileType {
        if wall_neighbors > self.birth_limit {
            TileType::Wall
        } else if wall_neighbors < self.death_limit {
            TileType::Ground
        } else {
            current
        }
    }
}

pub(super) fn generate(
    params: &CellularParams,
    width: u32,
    height: u32,
    rng: &mut SeededRng,
) -> TileGrid {
    let mut grid = TileGrid::new(width, height);
    for y in 0..height as i32 {
        for x in 0..width as i32 {
            let tile = if rng.chance(params.wall_probability) {
                TileType::Wall
            } else {
                TileType::Ground
            };
            grid.set(Position::new(x, y), tile);
        }
    }
    seal_border(&mut grid);

    for _ in 0..params.iterations {
        let mut next = grid.clone();
        for pos in grid.positions() {
            next.set(pos, params.step(grid.get(pos), grid.wall_neighbors(pos)));
        }
        seal_border(&mut next);
        grid = next;
    }

    if params.keep_largest_region {
        for region in walkable_regions(&grid).iter().skip(1) {
            for &pos in region {
                grid.set(pos, TileType::Wall);
            }
        }
    }

    grid
}

fn seal_border(grid: &mut TileGrid) {
    let right = grid.width() as i32 - 1;
    let bottom = grid.height() as i32 - 1;
    for x in 0..=right {
        grid.set(Position::new(x, 0), TileType::Wall);
        grid.set(Position::new(x, bottom), TileType::Wall);
    }
    for y in 0..=bottom {
        grid.set(Position::new(0, y), TileType::Wall);
        grid.set(Position::new(right, y), TileType::Wall);
    }
}
