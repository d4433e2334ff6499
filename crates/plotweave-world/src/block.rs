use once_cell::sync::Lazy;
use plotweave_common::{PlotError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Block names known to the generator. The index is the block type id.
pub static GLOBAL_PALETTE: &[&str] = &[
    "minecraft:air",
    "minecraft:stone",
    "minecraft:granite",
    "minecraft:diorite",
    "minecraft:andesite",
    "minecraft:grass_block",
    "minecraft:dirt",
    "minecraft:cobblestone",
    "minecraft:oak_planks",
    "minecraft:bedrock",
    "minecraft:water",
    "minecraft:lava",
    "minecraft:sand",
    "minecraft:gravel",
    "minecraft:gold_block",
    "minecraft:iron_block",
    "minecraft:diamond_block",
    "minecraft:quartz_block",
    "minecraft:smooth_stone",
    "minecraft:stone_slab",
    "minecraft:smooth_stone_slab",
    "minecraft:stone_bricks",
    "minecraft:sandstone",
    "minecraft:glass",
    "minecraft:white_wool",
    "minecraft:snow_block",
    "minecraft:clay",
    "minecraft:terracotta",
    "minecraft:obsidian",
    "minecraft:netherrack",
    "minecraft:end_stone",
    "minecraft:bricks",
    "minecraft:oak_log",
    "minecraft:spruce_planks",
    "minecraft:podzol",
    "minecraft:mycelium",
    "minecraft:polished_andesite",
    "minecraft:red_sand",
    "minecraft:black_concrete",
    "minecraft:white_concrete",
    "minecraft:dirt_path",
];

static NAME_TO_TYPE: Lazy<HashMap<&'static str, u16>> = Lazy::new(|| {
    GLOBAL_PALETTE
        .iter()
        .enumerate()
        .map(|(id, name)| (*name, id as u16))
        .collect()
});

/// Biome ids by name
static BIOMES: &[(&str, i32)] = &[
    ("ocean", 0),
    ("plains", 1),
    ("desert", 2),
    ("mountains", 3),
    ("forest", 4),
    ("taiga", 5),
    ("swamp", 6),
    ("river", 7),
    ("beach", 16),
    ("jungle", 21),
    ("savanna", 35),
    ("the_void", 127),
];

pub fn biome_id(name: &str) -> Option<i32> {
    let name = name.strip_prefix("minecraft:").unwrap_or(name);
    BIOMES
        .iter()
        .find(|(biome, _)| biome.eq_ignore_ascii_case(name))
        .map(|(_, id)| *id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct BlockState {
    pub block_type: u16,
}

impl BlockState {
    pub const AIR: BlockState = BlockState::new(0);
    pub const STONE: BlockState = BlockState::new(1);
    pub const GRASS_BLOCK: BlockState = BlockState::new(5);
    pub const DIRT: BlockState = BlockState::new(6);
    pub const BEDROCK: BlockState = BlockState::new(9);
    pub const QUARTZ_BLOCK: BlockState = BlockState::new(17);
    pub const STONE_SLAB: BlockState = BlockState::new(19);

    pub const fn new(block_type: u16) -> Self {
        BlockState { block_type }
    }

    pub fn is_air(&self) -> bool {
        self.block_type == 0
    }

    /// Looks up a block by name, with or without the `minecraft:` namespace
    pub fn from_name(name: &str) -> Option<BlockState> {
        let name = name.trim().to_ascii_lowercase();
        let key = if name.contains(':') {
            name
        } else {
            format!("minecraft:{}", name)
        };
        NAME_TO_TYPE.get(key.as_str()).map(|id| BlockState::new(*id))
    }

    pub fn name(&self) -> &'static str {
        GLOBAL_PALETTE
            .get(self.block_type as usize)
            .copied()
            .unwrap_or("minecraft:air")
    }
}

impl fmt::Display for BlockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Weighted set of blocks used to fill one layer kind (floor, main, wall...).
///
/// Selection hashes the world position, so a bucket always yields the same
/// block for the same coordinate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BlockBucket {
    entries: Vec<(BlockState, u32)>,
    total_weight: u32,
}

impl BlockBucket {
    pub fn single(state: BlockState) -> Self {
        BlockBucket {
            entries: vec![(state, 1)],
            total_weight: 1,
        }
    }

    /// Parses `name[:weight],name[:weight]...`
    pub fn parse(input: &str) -> Result<Self> {
        let mut entries = Vec::new();
        for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (name, weight) = match part.rsplit_once(':') {
                Some((name, weight)) if weight.chars().all(|c| c.is_ascii_digit()) => {
                    let weight = weight.parse::<u32>().map_err(|_| {
                        PlotError::ConfigurationError(format!("invalid weight in '{}'", part))
                    })?;
                    (name, weight)
                }
                _ => (part, 1),
            };
            if weight == 0 {
                return Err(PlotError::ConfigurationError(format!(
                    "block '{}' has zero weight",
                    name
                )));
            }
            let state = BlockState::from_name(name).ok_or_else(|| {
                PlotError::ConfigurationError(format!("unknown block '{}'", name))
            })?;
            entries.push((state, weight));
        }
        if entries.is_empty() {
            return Err(PlotError::ConfigurationError(format!(
                "empty block bucket '{}'",
                input
            )));
        }
        let total_weight = entries.iter().map(|(_, w)| *w).sum();
        Ok(BlockBucket {
            entries,
            total_weight,
        })
    }

    pub fn is_single(&self) -> bool {
        self.entries.len() == 1
    }

    pub fn pick(&self, x: i32, y: i32, z: i32) -> BlockState {
        if self.is_single() {
            return self.entries[0].0;
        }
        let mut roll = coordinate_hash(x, y, z) % self.total_weight;
        for (state, weight) in &self.entries {
            if roll < *weight {
                return *state;
            }
            roll -= weight;
        }
        self.entries[self.entries.len() - 1].0
    }

    pub fn states(&self) -> impl Iterator<Item = BlockState> + '_ {
        self.entries.iter().map(|(state, _)| *state)
    }
}

impl TryFrom<String> for BlockBucket {
    type Error = PlotError;

    fn try_from(value: String) -> Result<Self> {
        BlockBucket::parse(&value)
    }
}

impl From<BlockBucket> for String {
    fn from(bucket: BlockBucket) -> Self {
        bucket.to_string()
    }
}

impl fmt::Display for BlockBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (state, weight)) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            if *weight == 1 {
                write!(f, "{}", state)?;
            } else {
                write!(f, "{}:{}", state, weight)?;
            }
        }
        Ok(())
    }
}

fn coordinate_hash(x: i32, y: i32, z: i32) -> u32 {
    let mut h = (x as u32).wrapping_mul(0x9E37_79B1)
        ^ (y as u32).wrapping_mul(0x85EB_CA77)
        ^ (z as u32).wrapping_mul(0xC2B2_AE3D);
    h ^= h >> 15;
    h = h.wrapping_mul(0x2C1B_3C6D);
    h ^= h >> 12;
    h
}
