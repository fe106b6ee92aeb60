//! Fractal Perlin noise terrain.
//!
//! Samples octaved 2D gradient noise over the grid, normalises it to
//! `[0, 1]`, and buckets each sample into an elevation band:
//!
//! ```text
//! 0 ── Water ── waterLevel ── Sand ── sandLevel ── Grass ── grassLevel
//!   ── Ground ── groundLevel ── Stone ── stoneLevel ── Wall ── 1
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::grid::{Position, TileGrid, TileType};
use crate::random::SeededRng;

use super::params::ParamReader;

/// Parameters for [`super::TerrainAlgorithm::Noise`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoiseParams {
    /// Cells per noise unit at the first octave. Larger values give broader
    /// features.
    pub scale: f64,
    /// Number of octaves summed.
    pub octaves: u32,
    /// Amplitude multiplier per octave.
    pub persistence: f64,
    /// Frequency multiplier per octave.
    pub lacunarity: f64,
    /// Upper bound of the Water band.
    pub water_level: f64,
    /// Upper bound of the Sand band.
    pub sand_level: f64,
    /// Upper bound of the Grass band.
    pub grass_level: f64,
    /// Upper bound of the Ground band.
    pub ground_level: f64,
    /// Upper bound of the Stone band; everything above is Wall.
    pub stone_level: f64,
}

impl Default for NoiseParams {
    fn default() -> Self {
        Self {
            scale: 16.0,
            octaves: 4,
            persistence: 0.5,
            lacunarity: 2.0,
            water_level: 0.40,
            sand_level: 0.44,
            grass_level: 0.54,
            ground_level: 0.60,
            stone_level: 0.64,
        }
    }
}

impl NoiseParams {
    pub(super) const TAG: &'static str = "noise";

    pub(super) fn read(reader: &ParamReader<'_>) -> Result<Self> {
        let defaults = Self::default();
        let params = Self {
            scale: reader.float("scale", defaults.scale, 0.01..=10_000.0)?,
            octaves: reader.integer("octaves", defaults.octaves, 1..=12)?,
            persistence: reader.float("persistence", defaults.persistence, 0.0..=1.0)?,
            lacunarity: reader.float("lacunarity", defaults.lacunarity, 1.0..=8.0)?,
            water_level: reader.float("waterLevel", defaults.water_level, 0.0..=1.0)?,
            sand_level: reader.float("sandLevel", defaults.sand_level, 0.0..=1.0)?,
            grass_level: reader.float("grassLevel", defaults.grass_level, 0.0..=1.0)?,
            ground_level: reader.float("groundLevel", defaults.ground_level, 0.0..=1.0)?,
            stone_level: reader.float("stoneLevel", defaults.stone_level, 0.0..=1.0)?,
        };

        let bands = [
            ("sandLevel", params.water_level, params.sand_level),
            ("grassLevel", params.sand_level, params.grass_level),
            ("groundLevel", params.grass_level, params.ground_level),
            ("stoneLevel", params.ground_level, params.stone_level),
        ];
        for (name, lower, value) in bands {
            if value < lower {
                return Err(reader.invalid(
                    name,
                    value,
                    format!("elevation bands must ascend; previous band ends at {lower}"),
                ));
            }
        }
        Ok(params)
    }

    /// Tile for a normalised elevation in `[0, 1]`.
    #[must_use]
    pub fn classify(&self, elevation: f64) -> TileType {
        if elevation < self.water_level {
            TileType::Water
        } else if elevation < self.sand_level {
            TileType::Sand
        } else if elevation < self.grass_level {
            TileType::Grass
        } else if elevation < self.ground_level {
            TileType::Ground
        } else if elevation < self.stone_level {
            TileType::Stone
        } else {
            TileType::Wall
        }
    }
}

/// 2D Perlin gradient noise with a seeded permutation table.
#[derive(Debug, Clone)]
pub struct PerlinNoise {
    /// 256-entry permutation, doubled to avoid index wrapping.
    perm: [u8; 512],
}

impl PerlinNoise {
    /// Build the permutation table from `rng` (255 draws).
    #[must_use]
    pub fn new(rng: &mut SeededRng) -> Self {
        let mut base: [u8; 256] = std::array::from_fn(|i| i as u8);
        rng.shuffle(&mut base);

        let mut perm = [0u8; 512];
        perm[..256].copy_from_slice(&base);
        perm[256..].copy_from_slice(&base);
        Self { perm }
    }

    /// Raw noise at `(x, y)`, roughly in `[-1, 1]`; zero on integer lattice
    /// points.
    #[must_use]
    pub fn sample(&self, x: f64, y: f64) -> f64 {
        let x_floor = x.floor();
        let y_floor = y.floor();
        let xi = (x_floor as i64 & 255) as usize;
        let yi = (y_floor as i64 & 255) as usize;
        let xf = x - x_floor;
        let yf = y - y_floor;

        let u = fade(xf);
        let v = fade(yf);

        let aa = self.perm[self.perm[xi] as usize + yi];
        let ab = self.perm[self.perm[xi] as usize + yi + 1];
        let ba = self.perm[self.perm[xi + 1] as usize + yi];
        let bb = self.perm[self.perm[xi + 1] as usize + yi + 1];

        let bottom = lerp(grad(aa, xf, yf), grad(ba, xf - 1.0, yf), u);
        let top = lerp(grad(ab, xf, yf - 1.0), grad(bb, xf - 1.0, yf - 1.0), u);
        lerp(bottom, top, v)
    }

    /// Octaved noise normalised to `[0, 1]`.
    #[must_use]
    pub fn fractal(&self, x: f64, y: f64, octaves: u32, persistence: f64, lacunarity: f64) -> f64 {
        let mut total = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = 1.0;
        let mut max_amplitude = 0.0;

        for _ in 0..octaves {
            total += self.sample(x * frequency, y * frequency) * amplitude;
            max_amplitude += amplitude;
            amplitude *= persistence;
            frequency *= lacunarity;
        }

        if max_amplitude <= 0.0 {
            return 0.5;
        }
        ((total / max_amplitude + 1.0) * 0.5).clamp(0.0, 1.0)
    }
}

#[inline]
fn fade(t: f64) -> f64 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

#[inline]
fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + t * (b - a)
}

#[inline]
fn grad(hash: u8, x: f64, y: f64) -> f64 {
    match hash & 7 {
        0 => x + y,
        1 => -x + y,
        2 => x - y,
        3 => -x - y,
        4 => x,
        5 => -x,
        6 => y,
        _ => -y,
    }
}

pub(super) fn generate(
    params: &NoiseParams,
    width: u32,
    height: u32,
    rng: &mut SeededRng,
) -> TileGrid {
    let noise = PerlinNoise::new(rng);
    // Seeded sampling offset keeps grid cells off the zero-valued lattice and
    // moves the sampled window when only the seed changes.
    let offset_x = rng.next_float() * 256.0;
    let offset_y = rng.next_float() * 256.0;

    let mut grid = TileGrid::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let nx = (f64::from(x) + 0.5) / params.scale + offset_x;
            let ny = (f64::from(y) + 0.5) / params.scale + offset_y;
            let elevation = noise.fractal(
                nx,
                ny,
                params.octaves,
                params.persistence,
                params.lacunarity,
            );
            grid.set(Position::new(x as i32, y as i32), params.classify(elevation));
        }
    }
    grid
}
