//! Breadth-first flood fill over walkable tiles.

use std::collections::VecDeque;

use crate::grid::{Position, TileGrid};

/// Set of cells reachable from a start cell by 4-neighbour steps over
/// walkable tiles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reachability {
    width: u32,
    reached: Vec<bool>,
    count: usize,
}

impl Reachability {
    /// Flood fill from `start`. A non-walkable or out-of-bounds start
    /// reaches nothing.
    #[must_use]
    pub fn flood_fill(grid: &TileGrid, start: Position) -> Self {
        let width = grid.width();
        let mut reached = vec![false; grid.cell_count()];
        let mut count = 0;

        if grid.is_walkable(start) {
            let mut open = VecDeque::from([start]);
            reached[cell_index(width, start)] = true;
            count = 1;

            while let Some(pos) = open.pop_front() {
                for next in pos.neighbors4() {
                    if !grid.is_walkable(next) {
                        continue;
                    }
                    let index = cell_index(width, next);
                    if reached[index] {
                        continue;
                    }
                    reached[index] = true;
                    count += 1;
                    open.push_back(next);
                }
            }
        }

        Self {
            width,
            reached,
            count,
        }
    }

    /// Whether `pos` was reached.
    #[must_use]
    pub fn contains(&self, pos: Position) -> bool {
        if pos.x < 0 || pos.y < 0 || pos.x as u32 >= self.width {
            return false;
        }
        self.reached
            .get(cell_index(self.width, pos))
            .copied()
            .unwrap_or(false)
    }

    /// Number of reached cells.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.count
    }

    /// True when nothing was reached.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Split the walkable cells of `grid` into 4-connected regions, largest
/// first. Ties keep row-major discovery order.
#[must_use]
pub fn walkable_regions(grid: &TileGrid) -> Vec<Vec<Position>> {
    let width = grid.width();
    let mut assigned = vec![false; grid.cell_count()];
    let mut regions = Vec::new();

    for start in grid.positions() {
        if !grid.is_walkable(start) || assigned[cell_index(width, start)] {
            continue;
        }
        let mut region = Vec::new();
        let mut open = VecDeque::from([start]);
        assigned[cell_index(width, start)] = true;
        while let Some(pos) = open.pop_front() {
            region.push(pos);
            for next in pos.neighbors4() {
                if grid.is_walkable(next) && !assigned[cell_index(width, next)] {
                    assigned[cell_index(width, next)] = true;
                    open.push_back(next);
                }
            }
        }
        regions.push(region);
    }

    regions.sort_by(|a, b| b.len().cmp(&a.len()));
    regions
}

#[inline]
fn cell_index(width: u32, pos: Position) -> usize {
    (pos.y as usize) * (width as usize) + (pos.x as usize)
}
