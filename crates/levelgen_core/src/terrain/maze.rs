//! Maze terrain.
//!
//! Cells with both coordinates even are maze rooms; cells with exactly one
//! odd coordinate are the walls between two rooms and get opened while
//! carving; cells with both coordinates odd are pillars and always stay Wall.
//! A depth-first backtracker visits every room, so every floor cell is
//! connected to every other. `loopProbability` then opens some remaining
//! walls to add alternative routes.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::grid::{Position, TileGrid, TileType};
use crate::random::SeededRng;

use super::params::ParamReader;

/// Parameters for [`super::TerrainAlgorithm::Maze`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MazeParams {
    /// Chance of opening each wall left standing between two rooms.
    /// Zero gives a perfect maze.
    pub loop_probability: f64,
}

impl MazeParams {
    pub(super) const TAG: &'static str = "maze";

    pub(super) fn read(reader: &ParamReader<'_>) -> Result<Self> {
        Ok(Self {
            loop_probability: reader.float("loopProbability", 0.0, 0.0..=1.0)?,
        })
    }
}

const DIRECTIONS: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];

pub(super) fn generate(
    params: &MazeParams,
    width: u32,
    height: u32,
    rng: &mut SeededRng,
) -> TileGrid {
    let mut grid = TileGrid::filled(width, height, TileType::Wall);
    let rooms_x = (width as i32 + 1) / 2;
    let rooms_y = (height as i32 + 1) / 2;
    let mut visited = vec![false; (rooms_x * rooms_y) as usize];
    let room_index = |x: i32, y: i32| (y * rooms_x + x) as usize;

    let start = (rng.next_range(0, rooms_x), rng.next_range(0, rooms_y));
    visited[room_index(start.0, start.1)] = true;
    grid.set(Position::new(start.0 * 2, start.1 * 2), TileType::Ground);
    let mut stack = vec![start];

    while let Some(&(x, y)) = stack.last() {
        let mut neighbors = Vec::with_capacity(4);
        for (dx, dy) in DIRECTIONS {
            let nx = x + dx;
            let ny = y + dy;
            if nx >= 0 && ny >= 0 && nx < rooms_x && ny < rooms_y && !visited[room_index(nx, ny)]
            {
                neighbors.push((nx, ny));
            }
        }

        if neighbors.is_empty() {
            stack.pop();
            continue;
        }

        let (nx, ny) = neighbors[rng.next_index(neighbors.len())];
        visited[room_index(nx, ny)] = true;
        grid.set(Position::new(nx * 2, ny * 2), TileType::Ground);
        grid.set(Position::new(x + nx, y + ny), TileType::Ground);
        stack.push((nx, ny));
    }

    if params.loop_probability > 0.0 {
        open_loops(&mut grid, params.loop_probability, rng);
    }

    grid
}

/// Open standing walls that separate two rooms, one draw per candidate.
fn open_loops(grid: &mut TileGrid, probability: f64, rng: &mut SeededRng) {
    let candidates: Vec<Position> = grid
        .positions()
        .filter(|&p| grid.get(p) == TileType::Wall && separates_rooms(grid, p))
        .collect();
    for pos in candidates {
        if rng.chance(probability) {
            grid.set(pos, TileType::Ground);
        }
    }
}

fn separates_rooms(grid: &TileGrid, pos: Position) -> bool {
    let odd_x = pos.x % 2 == 1;
    let odd_y = pos.y % 2 == 1;
    let (a, b) = match (odd_x, odd_y) {
        (true, false) => (
            Position::new(pos.x - 1, pos.y),
            Position::new(pos.x + 1, pos.y),
        ),
        (false, true) => (
            Position::new(pos.x, pos.y - 1),
            Position::new(pos.x, pos.y + 1),
        ),
        _ => return false,
    };
    grid.get(a) == TileType::Ground && grid.get(b) == TileType::Ground
}
