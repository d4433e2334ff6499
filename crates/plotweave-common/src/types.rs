use serde::{Deserialize, Serialize};
use std::fmt;

pub type Result<T> = std::result::Result<T, crate::error::PlotError>;

/// Grid cell of a plot area. Unbounded in both directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlotId {
    pub x: i32,
    pub z: i32,
}

impl PlotId {
    pub const fn new(x: i32, z: i32) -> Self {
        PlotId { x, z }
    }

    pub fn neighbor(&self, direction: Direction) -> PlotId {
        let (dx, dz) = direction.offset();
        PlotId::new(self.x.wrapping_add(dx), self.z.wrapping_add(dz))
    }
}

impl fmt::Display for PlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};{}", self.x, self.z)
    }
}

/// Cardinal directions. North is -z, east is +x.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    pub fn offset(&self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::East => (1, 0),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
        }
    }

    pub fn opposite(&self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
        }
    }

    /// Bit used for this direction in a merge bitset.
    pub fn bit(&self) -> u8 {
        match self {
            Direction::North => 0b0001,
            Direction::East => 0b0010,
            Direction::South => 0b0100,
            Direction::West => 0b1000,
        }
    }
}

/// Chunk position in 16x16 column units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkCoord {
    pub x: i32,
    pub z: i32,
}

impl ChunkCoord {
    pub const fn new(x: i32, z: i32) -> Self {
        ChunkCoord { x, z }
    }

    pub fn containing(world_x: i32, world_z: i32) -> Self {
        ChunkCoord::new(world_x >> 4, world_z >> 4)
    }

    pub fn min_block_x(&self) -> i32 {
        self.x << 4
    }

    pub fn min_block_z(&self) -> i32 {
        self.z << 4
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.x, self.z)
    }
}
