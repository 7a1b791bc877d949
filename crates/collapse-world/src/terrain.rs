use collapse_geom::{CHUNK_SIZE, ChunkCoord};
use fastnoise_lite::{FastNoiseLite, NoiseType};
use serde::Deserialize;

use crate::block::Block;
use crate::chunk::ChunkBuf;

/// Height-map terrain used to populate the in-memory world.
#[derive(Clone, Debug, Deserialize)]
pub struct TerrainParams {
    #[serde(default = "default_seed")]
    pub seed: i32,
    #[serde(default = "default_frequency")]
    pub frequency: f32,
    #[serde(default = "default_base_height")]
    pub base_height: i32,
    #[serde(default = "default_amplitude")]
    pub amplitude: f32,
    #[serde(default = "default_sea_level")]
    pub sea_level: i32,
    #[serde(default = "default_topsoil")]
    pub topsoil: i32,
}

fn default_seed() -> i32 {
    1337
}
fn default_frequency() -> f32 {
    0.02
}
fn default_base_height() -> i32 {
    40
}
fn default_amplitude() -> f32 {
    14.0
}
fn default_sea_level() -> i32 {
    36
}
fn default_topsoil() -> i32 {
    3
}

impl Default for TerrainParams {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            frequency: default_frequency(),
            base_height: default_base_height(),
            amplitude: default_amplitude(),
            sea_level: default_sea_level(),
            topsoil: default_topsoil(),
        }
    }
}

impl TerrainParams {
    /// Flat terrain without noise: stone up to `height`, no water.
    pub fn flat(height: i32) -> Self {
        Self {
            amplitude: 0.0,
            base_height: height,
            sea_level: i32::MIN,
            topsoil: 0,
            ..Self::default()
        }
    }

    fn make_noise(&self) -> FastNoiseLite {
        let mut n = FastNoiseLite::with_seed(self.seed);
        n.set_noise_type(Some(NoiseType::OpenSimplex2));
        n.set_frequency(Some(self.frequency));
        n
    }
}

/// Generates one partition. The bottom layer is bedrock, columns are stone
/// with a dirt/grass (or sand below sea level) cap, and water fills up to
/// the sea level.
pub fn generate_chunk(params: &TerrainParams, coord: ChunkCoord, min_y: i32, max_y: i32) -> ChunkBuf {
    let sy = (max_y - min_y + 1).max(1) as usize;
    let mut buf = ChunkBuf::new_air(coord, min_y, sy);
    let noise = params.make_noise();
    for lz in 0..CHUNK_SIZE {
        for lx in 0..CHUNK_SIZE {
            let wx = coord.origin_x() + lx;
            let wz = coord.origin_z() + lz;
            let h = if params.amplitude == 0.0 {
                params.base_height
            } else {
                let n = noise.get_noise_2d(wx as f32, wz as f32);
                params.base_height + (n * params.amplitude).round() as i32
            };
            let h = h.clamp(min_y, max_y);
            let underwater = h < params.sea_level;
            for wy in min_y..=max_y {
                let b = if wy == min_y {
                    Block::BEDROCK
                } else if wy <= h {
                    if wy > h - params.topsoil {
                        if underwater {
                            Block::SAND
                        } else if wy == h {
                            Block::GRASS
                        } else {
                            Block::DIRT
                        }
                    } else {
                        Block::STONE
                    }
                } else if wy <= params.sea_level {
                    Block::WATER
                } else {
                    continue;
                };
                buf.set_local(lx as usize, (wy - min_y) as usize, lz as usize, b);
            }
        }
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_terrain_layers() {
        let buf = generate_chunk(&TerrainParams::flat(5), ChunkCoord::new(2, -1), 0, 15);
        assert_eq!(buf.get_world(32, 0, -16), Some(Block::BEDROCK));
        assert_eq!(buf.get_world(40, 5, -10), Some(Block::STONE));
        assert_eq!(buf.get_world(40, 6, -10), Some(Block::AIR));
        assert_eq!(buf.count_non_air(), 16 * 16 * 6);
    }

    #[test]
    fn water_sits_on_top_of_low_columns() {
        let params = TerrainParams {
            amplitude: 0.0,
            base_height: 4,
            sea_level: 8,
            ..TerrainParams::default()
        };
        let buf = generate_chunk(&params, ChunkCoord::new(0, 0), 0, 15);
        assert_eq!(buf.get_world(3, 4, 3), Some(Block::SAND));
        assert_eq!(buf.get_world(3, 8, 3), Some(Block::WATER));
        assert_eq!(buf.get_world(3, 9, 3), Some(Block::AIR));
    }

    #[test]
    fn generation_is_deterministic() {
        let p = TerrainParams::default();
        let a = generate_chunk(&p, ChunkCoord::new(5, 5), 0, 95);
        let b = generate_chunk(&p, ChunkCoord::new(5, 5), 0, 95);
        assert_eq!(a.blocks, b.blocks);
    }
}
