use collapse_geom::{CHUNK_SIZE, ChunkCoord};

use crate::block::Block;

const SIDE: usize = CHUNK_SIZE as usize;

/// Dense block storage for one partition, `16 x height x 16`.
#[derive(Clone, Debug)]
pub struct ChunkBuf {
    pub coord: ChunkCoord,
    pub min_y: i32,
    pub sy: usize,
    pub blocks: Vec<Block>,
}

impl ChunkBuf {
    pub fn new_air(coord: ChunkCoord, min_y: i32, sy: usize) -> Self {
        Self {
            coord,
            min_y,
            sy,
            blocks: vec![Block::AIR; SIDE * SIDE * sy],
        }
    }

    pub fn from_blocks_local(coord: ChunkCoord, min_y: i32, sy: usize, blocks: Vec<Block>) -> Self {
        let mut b = blocks;
        let expect = SIDE * SIDE * sy;
        if b.len() != expect {
            b.resize(expect, Block::AIR);
        }
        Self {
            coord,
            min_y,
            sy,
            blocks: b,
        }
    }

    #[inline]
    pub fn idx(&self, x: usize, y: usize, z: usize) -> usize {
        (y * SIDE + z) * SIDE + x
    }

    #[inline]
    pub fn get_local(&self, x: usize, y: usize, z: usize) -> Block {
        self.blocks[self.idx(x, y, z)]
    }

    #[inline]
    pub fn set_local(&mut self, x: usize, y: usize, z: usize, b: Block) {
        let i = self.idx(x, y, z);
        self.blocks[i] = b;
    }

    #[inline]
    fn local(&self, wx: i32, wy: i32, wz: i32) -> Option<(usize, usize, usize)> {
        let lx = wx - self.coord.origin_x();
        let ly = wy - self.min_y;
        let lz = wz - self.coord.origin_z();
        if lx < 0 || lz < 0 || ly < 0 || lx >= CHUNK_SIZE || lz >= CHUNK_SIZE || ly as usize >= self.sy {
            return None;
        }
        Some((lx as usize, ly as usize, lz as usize))
    }

    #[inline]
    pub fn contains_world(&self, wx: i32, wy: i32, wz: i32) -> bool {
        self.local(wx, wy, wz).is_some()
    }

    #[inline]
    pub fn get_world(&self, wx: i32, wy: i32, wz: i32) -> Option<Block> {
        self.local(wx, wy, wz).map(|(x, y, z)| self.get_local(x, y, z))
    }

    /// Writes `b` at a world position. Returns the previous block, or
    /// `None` if the position is not in this chunk.
    pub fn set_world(&mut self, wx: i32, wy: i32, wz: i32, b: Block) -> Option<Block> {
        let (x, y, z) = self.local(wx, wy, wz)?;
        let i = self.idx(x, y, z);
        Some(std::mem::replace(&mut self.blocks[i], b))
    }

    #[inline]
    pub fn has_non_air(&self) -> bool {
        self.blocks.iter().any(|b| !b.is_air())
    }

    pub fn count_non_air(&self) -> usize {
        self.blocks.iter().filter(|b| !b.is_air()).count()
    }
}
