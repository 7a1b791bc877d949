use serde::{Deserialize, Serialize};

/// Stored voxel: palette id plus a free state word.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Block {
    pub id: u16,
    pub state: u16,
}

impl Block {
    pub const AIR: Block = Block { id: 0, state: 0 };
    pub const STONE: Block = Block { id: 1, state: 0 };
    pub const DIRT: Block = Block { id: 2, state: 0 };
    pub const GRASS: Block = Block { id: 3, state: 0 };
    pub const SAND: Block = Block { id: 4, state: 0 };
    pub const WATER: Block = Block { id: 5, state: 0 };
    pub const LAVA: Block = Block { id: 6, state: 0 };
    pub const BEDROCK: Block = Block { id: 7, state: 0 };

    #[inline]
    pub fn is_air(self) -> bool {
        self.id == Self::AIR.id
    }

    pub fn voxel_state(self) -> VoxelState {
        match self.id {
            0 => VoxelState::Air,
            5 | 6 => VoxelState::Fluid { id: self.id },
            7 => VoxelState::Unbreakable { id: self.id },
            id => VoxelState::Solid { id },
        }
    }
}

/// What a scan needs to know about a voxel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoxelState {
    Air,
    Solid { id: u16 },
    Fluid { id: u16 },
    Unbreakable { id: u16 },
}
