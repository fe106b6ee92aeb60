//! Tile grid model shared by every pipeline stage.
//!
//! Reads outside the grid return [`TileType::Wall`], so the grid behaves as if
//! surrounded by an implicit boundary and neighbourhood scans never need
//! special edge handling.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Terrain tile kinds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub enum TileType {
    /// Unset cell.
    #[default]
    Empty,
    /// Bare floor.
    Ground,
    /// Impassable wall.
    Wall,
    /// Water.
    Water,
    /// Grass.
    Grass,
    /// Rock floor; not walkable.
    Stone,
    /// Sand.
    Sand,
    /// Lava.
    Lava,
    /// Ice.
    Ice,
}

impl TileType {
    /// Every tile kind, in declaration order.
    pub const ALL: [Self; 9] = [
        Self::Empty,
        Self::Ground,
        Self::Wall,
        Self::Water,
        Self::Grass,
        Self::Stone,
        Self::Sand,
        Self::Lava,
        Self::Ice,
    ];

    /// Returns true if an entity may stand on this tile.
    #[must_use]
    pub const fn is_walkable(self) -> bool {
        matches!(self, Self::Ground | Self::Grass | Self::Sand)
    }
}

/// Integer grid coordinate. May lie outside a grid.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Position {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl Position {
    /// Create a position.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance in cells.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        let dx = f64::from(self.x) - f64::from(other.x);
        let dy = f64::from(self.y) - f64::from(other.y);
        dx.hypot(dy)
    }

    /// Manhattan distance in cells.
    #[must_use]
    pub const fn manhattan(self, other: Self) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// The four orthogonal neighbours: up, right, down, left.
    #[must_use]
    pub const fn neighbors4(self) -> [Self; 4] {
        [
            Self::new(self.x, self.y - 1),
            Self::new(self.x + 1, self.y),
            Self::new(self.x, self.y + 1),
            Self::new(self.x - 1, self.y),
        ]
    }

    /// The eight surrounding cells, row-major.
    #[must_use]
    pub const fn neighbors8(self) -> [Self; 8] {
        [
            Self::new(self.x - 1, self.y - 1),
            Self::new(self.x, self.y - 1),
            Self::new(self.x + 1, self.y - 1),
            Self::new(self.x - 1, self.y),
            Self::new(self.x + 1, self.y),
            Self::new(self.x - 1, self.y + 1),
            Self::new(self.x, self.y + 1),
            Self::new(self.x + 1, self.y + 1),
        ]
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

/// Rectangular tile grid with fixed dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileGrid {
    /// Grid width in cells.
    width: u32,
    /// Grid height in cells.
    height: u32,
    /// Tile data stored in row-major order.
    tiles: Vec<TileType>,
}

impl TileGrid {
    /// Create a grid with every cell set to [`TileType::Empty`].
    ///
    /// # Panics
    ///
    /// Panics if `width` or `height` is zero.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, TileType::Empty)
    }

    /// Create a grid with every cell set to `tile`.
    ///
    /// # Panics
    ///
    /// Panics if `width` or `height` is zero.
    #[must_use]
    pub fn filled(width: u32, height: u32, tile: TileType) -> Self {
        assert!(width > 0, "TileGrid width must be positive");
        assert!(height > 0, "TileGrid height must be positive");

        Self {
            width,
            height,
            tiles: vec![tile; (width as usize) * (height as usize)],
        }
    }

    /// Build a grid from row-major tiles. Returns `None` if the tile count
    /// does not match the dimensions or a dimension is zero.
    #[must_use]
    pub fn from_tiles(width: u32, height: u32, tiles: Vec<TileType>) -> Option<Self> {
        if width == 0 || height == 0 || tiles.len() != (width as usize) * (height as usize) {
            return None;
        }
        Some(Self {
            width,
            height,
            tiles,
        })
    }

    /// Grid width in cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Grid height in cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Total number of cells.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.tiles.len()
    }

    /// Row-major tile data.
    #[must_use]
    pub fn tiles(&self) -> &[TileType] {
        &self.tiles
    }

    #[inline]
    fn index(&self, pos: Position) -> Option<usize> {
        if self.in_bounds(pos) {
            Some((pos.y as usize) * (self.width as usize) + (pos.x as usize))
        } else {
            None
        }
    }

    /// Check if a position is within grid bounds.
    #[must_use]
    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as u32) < self.width && (pos.y as u32) < self.height
    }

    /// Tile at `pos`; out-of-bounds reads return [`TileType::Wall`].
    #[must_use]
    pub fn get(&self, pos: Position) -> TileType {
        self.index(pos).map_or(TileType::Wall, |i| self.tiles[i])
    }

    /// Set the tile at `pos`. Returns `false` if out of bounds.
    pub fn set(&mut self, pos: Position, tile: TileType) -> bool {
        match self.index(pos) {
            Some(i) => {
                self.tiles[i] = tile;
                true
            }
            None => false,
        }
    }

    /// Check if the tile at `pos` is walkable. Out of bounds is never walkable.
    #[must_use]
    pub fn is_walkable(&self, pos: Position) -> bool {
        self.get(pos).is_walkable()
    }

    /// Number of [`TileType::Wall`] cells in the 8-neighbourhood of `pos`,
    /// counting out-of-bounds cells as walls.
    #[must_use]
    pub fn wall_neighbors(&self, pos: Position) -> u8 {
        pos.neighbors8()
            .iter()
            .filter(|&&n| self.get(n) == TileType::Wall)
            .count() as u8
    }

    /// All positions in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        let width = self.width as i32;
        (0..self.tiles.len()).map(move |i| Position::new(i as i32 % width, i as i32 / width))
    }

    /// Walkable positions in row-major order.
    #[must_use]
    pub fn walkable_positions(&self) -> Vec<Position> {
        self.positions().filter(|&p| self.is_walkable(p)).collect()
    }

    /// Number of walkable cells.
    #[must_use]
    pub fn walkable_count(&self) -> usize {
        self.tiles.iter().filter(|t| t.is_walkable()).count()
    }

    /// Number of cells holding `tile`.
    #[must_use]
    pub fn count(&self, tile: TileType) -> usize {
        self.tiles.iter().filter(|&&t| t == tile).count()
    }

    /// Per-kind tile counts; kinds with no cells are omitted.
    #[must_use]
    pub fn tile_counts(&self) -> BTreeMap<TileType, usize> {
        let mut counts = BTreeMap::new();
        for &tile in &self.tiles {
            *counts.entry(tile).or_insert(0) += 1;
        }
        counts
    }

    /// Geometric centre of the grid.
    #[must_use]
    pub const fn center(&self) -> Position {
        Position::new((self.width / 2) as i32, (self.height / 2) as i32)
    }
}
