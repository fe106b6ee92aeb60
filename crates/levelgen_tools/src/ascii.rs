//! ASCII rendering of generated levels.

use std::collections::BTreeMap;
use std::fmt::Write;

use levelgen_core::assembly::Level;
use levelgen_core::config::EntityType;
use levelgen_core::grid::{Position, TileType};

/// ANSI color codes.
mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const BLUE: &str = "\x1b[34m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const RED: &str = "\x1b[31m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";
}

/// ASCII rendering options.
#[derive(Debug, Clone)]
pub struct AsciiConfig {
    /// Append a legend of the glyphs in use.
    pub show_legend: bool,
    /// Use colored output (ANSI).
    pub use_color: bool,
}

impl Default for AsciiConfig {
    fn default() -> Self {
        Self {
            show_legend: true,
            use_color: true,
        }
    }
}

/// Glyph for a tile.
#[must_use]
pub const fn tile_char(tile: TileType) -> char {
    match tile {
        TileType::Empty => ' ',
        TileType::Ground => '.',
        TileType::Wall => '#',
        TileType::Water => '~',
        TileType::Grass => ',',
        TileType::Stone => '^',
        TileType::Sand => ':',
        TileType::Lava => '%',
        TileType::Ice => '*',
    }
}

/// Glyph for an entity.
#[must_use]
pub const fn entity_char(entity_type: EntityType) -> char {
    match entity_type {
        EntityType::Player => '@',
        EntityType::Enemy => 'E',
        EntityType::Item => '$',
        EntityType::PowerUp => '+',
        EntityType::Npc => 'N',
        EntityType::Exit => '>',
        EntityType::Checkpoint => 'C',
        EntityType::Obstacle => 'O',
        EntityType::Trigger => 'T',
    }
}

fn tile_color(tile: TileType) -> &'static str {
    match tile {
        TileType::Water | TileType::Ice => colors::BLUE,
        TileType::Grass => colors::GREEN,
        TileType::Sand => colors::YELLOW,
        TileType::Lava => colors::RED,
        TileType::Wall | TileType::Stone => colors::GRAY,
        TileType::Empty | TileType::Ground => "",
    }
}

fn entity_color(entity_type: EntityType) -> &'static str {
    match entity_type {
        EntityType::Player => colors::CYAN,
        EntityType::Enemy => colors::RED,
        EntityType::Item | EntityType::PowerUp => colors::YELLOW,
        _ => colors::GREEN,
    }
}

/// Render `level` one character per cell. Where entities share a cell the
/// last one placed wins.
#[must_use]
pub fn render_level(level: &Level, config: &AsciiConfig) -> String {
    let grid = level.terrain();
    let mut overlay: BTreeMap<Position, EntityType> = BTreeMap::new();
    for entity in level.entities() {
        overlay.insert(entity.position, entity.entity_type);
    }

    let mut output = String::with_capacity(grid.cell_count() * 2);
    for y in 0..grid.height() as i32 {
        for x in 0..grid.width() as i32 {
            let pos = Position::new(x, y);
            let (glyph, color) = match overlay.get(&pos) {
                Some(&entity_type) => (entity_char(entity_type), entity_color(entity_type)),
                None => {
                    let tile = grid.get(pos);
                    (tile_char(tile), tile_color(tile))
                }
            };
            if config.use_color && !color.is_empty() {
                let _ = write!(output, "{}{color}{glyph}{}", colors::BOLD, colors::RESET);
            } else {
                output.push(glyph);
            }
        }
        output.push('\n');
    }

    if config.show_legend {
        output.push_str(&render_legend(level));
    }
    output
}

/// Legend for the tiles and entities present in `level`, with counts.
#[must_use]
pub fn render_legend(level: &Level) -> String {
    let meta = level.metadata();
    let mut legend = String::from("Legend:");
    for (tile, count) in &meta.tile_counts {
        let _ = write!(legend, " {}={tile:?}({count})", tile_char(*tile));
    }
    if !meta.entity_counts.is_empty() {
        legend.push_str("\nEntities:");
        for (entity_type, count) in &meta.entity_counts {
            let _ = write!(legend, " {}={entity_type}({count})", entity_char(*entity_type));
        }
    }
    legend.push('\n');
    legend
}
