use crate::block::BlockState;
use byteorder::{BigEndian, WriteBytesExt};
use plotweave_common::{ChunkCoord, PlotError, Result};

pub const SECTION_COUNT: usize = 16;
pub const WORLD_HEIGHT: i32 = (SECTION_COUNT * 16) as i32;
const COLUMNS: usize = 16 * 16;
const BLOCKS_PER_SECTION: usize = 16 * 16 * 16;
const MIN_BITS_PER_BLOCK: u8 = 4;

/// Write surface shared by chunk buffers. Coordinates are chunk-local.
pub trait ChunkWriter {
    fn set_block(&mut self, x: i32, y: i32, z: i32, state: BlockState) -> Result<()>;

    fn set_biome(&mut self, x: i32, z: i32, biome: i32) -> Result<()>;

    /// Resets a whole column to air
    fn clear_column(&mut self, x: i32, z: i32) -> Result<()> {
        for y in 0..WORLD_HEIGHT {
            self.set_block(x, y, z, BlockState::AIR)?;
        }
        Ok(())
    }
}

/// Block and biome content of one chunk. Sections are allocated on first write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnBuffer {
    coord: ChunkCoord,
    sections: [Option<ChunkSection>; SECTION_COUNT],
    biomes: [Option<i32>; COLUMNS],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSection {
    block_count: u16,
    bits_per_block: u8,
    palette: Vec<BlockState>,
    data: Vec<u64>, // Packed palette indices, no value spans two longs
}

// Helper function to write VarInts
fn write_varint(buffer: &mut Vec<u8>, value: i32) {
    let mut value = value as u32;
    loop {
        let mut temp = (value & 0b0111_1111) as u8;
        value >>= 7;
        if value != 0 {
            temp |= 0b1000_0000;
        }
        buffer.push(temp);
        if value == 0 {
            break;
        }
    }
}

fn check_local(x: i32, y: i32, z: i32) -> Result<()> {
    if (0..16).contains(&x) && (0..WORLD_HEIGHT).contains(&y) && (0..16).contains(&z) {
        Ok(())
    } else {
        Err(PlotError::BufferMisuse { x, y, z })
    }
}

impl ColumnBuffer {
    pub fn new(coord: ChunkCoord) -> Self {
        ColumnBuffer {
            coord,
            sections: Default::default(),
            biomes: [None; COLUMNS],
        }
    }

    pub fn coord(&self) -> ChunkCoord {
        self.coord
    }

    pub fn get_section(&self, section_y: usize) -> Option<&ChunkSection> {
        self.sections.get(section_y)?.as_ref()
    }

    fn get_section_mut(&mut self, section_y: usize) -> Option<&mut ChunkSection> {
        let slot = self.sections.get_mut(section_y)?;
        Some(slot.get_or_insert_with(ChunkSection::new))
    }

    /// Number of sections that have been written to
    pub fn allocated_sections(&self) -> usize {
        self.sections.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.sections
            .iter()
            .flatten()
            .all(|section| section.block_count == 0)
            && self.biomes.iter().all(Option::is_none)
    }

    /// Returns `None` for positions outside the chunk
    pub fn get_block(&self, x: i32, y: i32, z: i32) -> Option<BlockState> {
        check_local(x, y, z).ok()?;
        let (x, z) = (x as usize, z as usize);
        Some(
            self.get_section((y >> 4) as usize)
                .map(|section| section.get_block_state_at(x, (y & 15) as usize, z))
                .unwrap_or(BlockState::AIR),
        )
    }

    pub fn get_biome(&self, x: i32, z: i32) -> Option<i32> {
        check_local(x, 0, z).ok()?;
        self.biomes[(z * 16 + x) as usize]
    }

    pub fn non_air_blocks(&self) -> usize {
        self.sections
            .iter()
            .flatten()
            .map(|section| section.block_count as usize)
            .sum()
    }

    /// Y of the highest non-air block in a column
    pub fn highest_block(&self, x: i32, z: i32) -> Option<i32> {
        check_local(x, 0, z).ok()?;
        for section_y in (0..SECTION_COUNT).rev() {
            let Some(section) = self.get_section(section_y) else {
                continue;
            };
            if section.block_count == 0 {
                continue;
            }
            for y in (0..16).rev() {
                if !section
                    .get_block_state_at(x as usize, y, z as usize)
                    .is_air()
                {
                    return Some((section_y * 16 + y) as i32);
                }
            }
        }
        None
    }

    /// Copies every non-air block and every set biome of `other` over this buffer
    pub fn overlay(&mut self, other: &ColumnBuffer) {
        for (section_y, section) in other.sections.iter().enumerate() {
            let Some(section) = section.as_ref().filter(|s| s.block_count > 0) else {
                continue;
            };
            let Some(target) = self.get_section_mut(section_y) else {
                continue;
            };
            for y in 0..16 {
                for z in 0..16 {
                    for x in 0..16 {
                        let state = section.get_block_state_at(x, y, z);
                        if !state.is_air() {
                            target.set_block_state_at(x, y, z, state);
                        }
                    }
                }
            }
        }
        for (index, biome) in other.biomes.iter().enumerate() {
            if biome.is_some() {
                self.biomes[index] = *biome;
            }
        }
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();

        // 1. Chunk X and Z
        buffer.write_i32::<BigEndian>(self.coord.x)?;
        buffer.write_i32::<BigEndian>(self.coord.z)?;

        // 2. Section mask
        let mut section_mask = 0u16;
        for (section_y, section) in self.sections.iter().enumerate() {
            if section.is_some() {
                section_mask |= 1 << section_y;
            }
        }
        buffer.write_u16::<BigEndian>(section_mask)?;

        // 3. Sections
        for section in self.sections.iter().flatten() {
            section.serialize(&mut buffer)?;
        }

        // 4. Biomes, -1 where nothing was written
        for biome in &self.biomes {
            buffer.write_i32::<BigEndian>(biome.unwrap_or(-1))?;
        }

        Ok(buffer)
    }
}

impl ChunkWriter for ColumnBuffer {
    fn set_block(&mut self, x: i32, y: i32, z: i32, state: BlockState) -> Result<()> {
        check_local(x, y, z)?;
        let section_y = (y >> 4) as usize;
        if state.is_air() && self.get_section(section_y).is_none() {
            return Ok(());
        }
        if let Some(section) = self.get_section_mut(section_y) {
            section.set_block_state_at(x as usize, (y & 15) as usize, z as usize, state);
        }
        Ok(())
    }

    fn set_biome(&mut self, x: i32, z: i32, biome: i32) -> Result<()> {
        check_local(x, 0, z)?;
        self.biomes[(z * 16 + x) as usize] = Some(biome);
        Ok(())
    }

    fn clear_column(&mut self, x: i32, z: i32) -> Result<()> {
        check_local(x, 0, z)?;
        for section in self.sections.iter_mut().flatten() {
            for y in 0..16 {
                section.set_block_state_at(x as usize, y, z as usize, BlockState::AIR);
            }
        }
        Ok(())
    }
}

impl ChunkSection {
    pub fn new() -> Self {
        ChunkSection {
            block_count: 0,
            bits_per_block: MIN_BITS_PER_BLOCK,
            palette: vec![BlockState::AIR],
            data: vec![0; Self::longs_needed(MIN_BITS_PER_BLOCK)],
        }
    }

    fn longs_needed(bits_per_block: u8) -> usize {
        let per_long = 64 / bits_per_block as usize;
        BLOCKS_PER_SECTION.div_ceil(per_long)
    }

    pub fn block_count(&self) -> u16 {
        self.block_count
    }

    pub fn palette(&self) -> &[BlockState] {
        &self.palette
    }

    fn read_index(&self, block_number: usize) -> usize {
        let per_long = 64 / self.bits_per_block as usize;
        let long = self.data[block_number / per_long];
        let offset = (block_number % per_long) * self.bits_per_block as usize;
        let mask = (1u64 << self.bits_per_block) - 1;
        ((long >> offset) & mask) as usize
    }

    fn write_index(&mut self, block_number: usize, index: usize) {
        let per_long = 64 / self.bits_per_block as usize;
        let offset = (block_number % per_long) * self.bits_per_block as usize;
        let mask = (1u64 << self.bits_per_block) - 1;
        let long = &mut self.data[block_number / per_long];
        *long &= !(mask << offset); // Clear existing bits
        *long |= (index as u64 & mask) << offset;
    }

    pub fn get_block_state_at(&self, x: usize, y: usize, z: usize) -> BlockState {
        let block_number = (y << 8) | (z << 4) | x;
        self.palette[self.read_index(block_number)]
    }

    pub fn set_block_state_at(&mut self, x: usize, y: usize, z: usize, state: BlockState) {
        let block_number = (y << 8) | (z << 4) | x;
        let previous = self.palette[self.read_index(block_number)];
        if previous == state {
            return;
        }
        let index = self.palette_index(state);
        self.write_index(block_number, index);

        if state.is_air() {
            self.block_count -= 1;
        } else if previous.is_air() {
            self.block_count += 1;
        }
    }

    /// Index of `state` in the palette, growing the storage when it no longer fits
    fn palette_index(&mut self, state: BlockState) -> usize {
        if let Some(index) = self.palette.iter().position(|s| *s == state) {
            return index;
        }
        self.palette.push(state);
        let needed = self.palette.len();
        if needed > 1 << self.bits_per_block {
            self.resize(self.bits_per_block + 1);
        }
        needed - 1
    }

    fn resize(&mut self, bits_per_block: u8) {
        let indices: Vec<usize> = (0..BLOCKS_PER_SECTION)
            .map(|block_number| self.read_index(block_number))
            .collect();
        self.bits_per_block = bits_per_block;
        self.data = vec![0; Self::longs_needed(bits_per_block)];
        for (block_number, index) in indices.into_iter().enumerate() {
            self.write_index(block_number, index);
        }
    }

    pub fn serialize(&self, buffer: &mut Vec<u8>) -> Result<()> {
        buffer.write_u16::<BigEndian>(self.block_count)?;
        buffer.write_u8(self.bits_per_block)?;

        write_varint(buffer, self.palette.len() as i32);
        for state in &self.palette {
            write_varint(buffer, state.block_type as i32);
        }

        write_varint(buffer, self.data.len() as i32);
        for &long in &self.data {
            buffer.write_u64::<BigEndian>(long)?;
        }
        Ok(())
    }
}

impl Default for ChunkSection {
    fn default() -> Self {
        ChunkSection::new()
    }
}
