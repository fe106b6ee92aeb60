//! Test fixtures and helpers.
//!
//! Hand-drawn grids and levels for consistent testing. Maps are written as
//! text, one row per line:
//!
//! | Char | Tile |    | Char | Entity (on Ground) |
//! |---|---|---|---|---|
//! | `#` | Wall | | `P` | Player |
//! | `.` | Ground | | `E` | Enemy |
//! | `,` | Grass | | `I` | Item |
//! | `:` | Sand | | `U` | PowerUp |
//! | `~` | Water | | `N` | NPC |
//! | `^` | Stone | | `X` | Exit |
//! | `%` | Lava | | `C` | Checkpoint |
//! | `*` | Ice | | `O` | Obstacle |
//! | `_` | Empty | | `T` | Trigger |

use levelgen_core::assembly::{Level, LevelAssembler};
use levelgen_core::config::{EntityType, GenerationConfig, PlacementSpec, PlacementStrategy};
use levelgen_core::grid::{Position, TileGrid, TileType};
use levelgen_core::placement::PlacedEntity;

/// Walled rectangle with a Ground interior.
#[must_use]
pub fn open_room(width: u32, height: u32) -> TileGrid {
    let mut grid = TileGrid::filled(width, height, TileType::Ground);
    let right = width as i32 - 1;
    let bottom = height as i32 - 1;
    for x in 0..=right {
        grid.set(Position::new(x, 0), TileType::Wall);
        grid.set(Position::new(x, bottom), TileType::Wall);
    }
    for y in 0..=bottom {
        grid.set(Position::new(0, y), TileType::Wall);
        grid.set(Position::new(right, y), TileType::Wall);
    }
    grid
}

fn tile_for(c: char) -> Option<TileType> {
    Some(match c {
        '#' => TileType::Wall,
        '.' => TileType::Ground,
        ',' => TileType::Grass,
        ':' => TileType::Sand,
        '~' => TileType::Water,
        '^' => TileType::Stone,
        '%' => TileType::Lava,
        '*' => TileType::Ice,
        '_' => TileType::Empty,
        _ => return None,
    })
}

fn entity_for(c: char) -> Option<EntityType> {
    Some(match c {
        'P' => EntityType::Player,
        'E' => EntityType::Enemy,
        'I' => EntityType::Item,
        'U' => EntityType::PowerUp,
        'N' => EntityType::Npc,
        'X' => EntityType::Exit,
        'C' => EntityType::Checkpoint,
        'O' => EntityType::Obstacle,
        'T' => EntityType::Trigger,
        _ => return None,
    })
}

/// Parse a text map into a grid and the entities drawn on it, in row-major
/// order. Leading and trailing blank lines and indentation are ignored.
///
/// # Panics
///
/// Panics on ragged rows or unknown characters.
#[must_use]
pub fn parse_map(map: &str) -> (TileGrid, Vec<PlacedEntity>) {
    let rows: Vec<&str> = map
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    assert!(!rows.is_empty(), "map is empty");
    let width = rows[0].chars().count();

    let mut tiles = Vec::with_capacity(width * rows.len());
    let mut entities = Vec::new();
    for (y, row) in rows.iter().enumerate() {
        assert_eq!(row.chars().count(), width, "row {y} is ragged");
        for (x, c) in row.chars().enumerate() {
            if let Some(entity_type) = entity_for(c) {
                entities.push(PlacedEntity::new(
                    entity_type,
                    Position::new(x as i32, y as i32),
                ));
                tiles.push(TileType::Ground);
            } else if let Some(tile) = tile_for(c) {
                tiles.push(tile);
            } else {
                panic!("unknown map character {c:?} at ({x},{y})");
            }
        }
    }

    let grid = TileGrid::from_tiles(width as u32, rows.len() as u32, tiles);
    (grid.unwrap_or_else(|| panic!("map tiles do not fill the grid")), entities)
}

/// Parse a text map into a grid, ignoring entity characters.
#[must_use]
pub fn grid_from_map(map: &str) -> TileGrid {
    parse_map(map).0
}

/// Assemble a level from a text map with a pinned timestamp.
///
/// # Panics
///
/// Panics on a malformed map.
#[must_use]
pub fn level_from_map(map: &str, victory_conditions: &[&str]) -> Level {
    let (grid, entities) = parse_map(map);
    let config = victory_conditions.iter().fold(
        GenerationConfig::new(grid.width(), grid.height(), "fixture"),
        |config, condition| config.with_victory_condition(condition),
    );
    match LevelAssembler::new()
        .with_timestamp(0)
        .assemble(&grid, &entities, &config)
    {
        Ok(level) => level,
        Err(err) => panic!("fixture level failed to assemble: {err}"),
    }
}

/// Small config with a Player and `enemies` randomly placed Enemies.
#[must_use]
pub fn small_config(algorithm: &str, enemies: u32) -> GenerationConfig {
    GenerationConfig::new(24, 24, algorithm)
        .with_placement(PlacementSpec::new(EntityType::Player, 1))
        .with_placement(
            PlacementSpec::new(EntityType::Enemy, enemies)
                .with_min_distance(2.0)
                .with_strategy(PlacementStrategy::Spread),
        )
}
