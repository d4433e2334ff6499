use crate::area::{PlotArea, TerrainMode};
use crate::block::BlockState;
use crate::chunk::{ChunkWriter, ColumnBuffer};
use crate::layout::{is_claimed, Classification};
use crate::merge::{classify_merged, MergeLookup};
use plotweave_common::{ChunkCoord, Result};

/// What happens to columns the layout takes over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    /// The buffer is fresh, columns are written as is
    Fresh,
    /// The buffer holds other content which is cleared from owned columns first
    Overwrite,
}

/// Whether the layout owns a column under the area's terrain mode
pub fn owns_column(area: &PlotArea, classification: &Classification) -> bool {
    match (area.terrain(), classification) {
        (_, Classification::Plot(_)) => true,
        (TerrainMode::None, _) => true,
        (TerrainMode::Partial, Classification::Wall(..)) => true,
        _ => false,
    }
}

/// Builds the full content of one chunk of an area.
pub fn materialize<M: MergeLookup + ?Sized>(
    area: &PlotArea,
    coord: ChunkCoord,
    merges: &M,
) -> Result<ColumnBuffer> {
    let mut buffer = ColumnBuffer::new(coord);
    materialize_into(area, coord, merges, &mut buffer, Fill::Fresh)?;
    Ok(buffer)
}

/// Writes the layout of one chunk into `out`. Returns the number of columns written.
pub fn materialize_into<W, M>(
    area: &PlotArea,
    coord: ChunkCoord,
    merges: &M,
    out: &mut W,
    fill: Fill,
) -> Result<usize>
where
    W: ChunkWriter + ?Sized,
    M: MergeLookup + ?Sized,
{
    // Partial terrain keeps the host's biomes
    let write_biome = area.terrain() != TerrainMode::Partial;
    let mut written = 0;
    for local_z in 0..16 {
        for local_x in 0..16 {
            let world_x = coord.min_block_x() + local_x;
            let world_z = coord.min_block_z() + local_z;
            if !is_claimed(area, world_x, world_z) {
                continue;
            }
            let classification = classify_merged(area, merges, world_x, world_z);
            if !owns_column(area, &classification) {
                continue;
            }
            if fill == Fill::Overwrite {
                out.clear_column(local_x, local_z)?;
            }
            fill_column(area, &classification, (world_x, world_z), (local_x, local_z), out)?;
            if write_biome {
                out.set_biome(local_x, local_z, area.biome())?;
            }
            written += 1;
        }
    }
    Ok(written)
}

fn fill_column<W: ChunkWriter + ?Sized>(
    area: &PlotArea,
    classification: &Classification,
    (world_x, world_z): (i32, i32),
    (x, z): (i32, i32),
    out: &mut W,
) -> Result<()> {
    if area.bedrock() {
        out.set_block(x, 0, z, BlockState::BEDROCK)?;
    }
    match classification {
        Classification::Plot(_) => {
            for y in 1..area.plot_height() {
                out.set_block(x, y, z, area.main().pick(world_x, y, world_z))?;
            }
            let top = area.plot_height();
            out.set_block(x, top, z, area.floor().pick(world_x, top, world_z))?;
        }
        Classification::Road => {
            for y in 1..=area.road_height() {
                out.set_block(x, y, z, area.road().pick(world_x, y, world_z))?;
            }
        }
        Classification::Wall(..) => {
            for y in 1..area.wall_height() {
                out.set_block(x, y, z, area.wall_filling().pick(world_x, y, world_z))?;
            }
            let top = area.wall_height();
            out.set_block(x, top, z, area.wall_border().pick(world_x, top, world_z))?;
        }
    }
    Ok(())
}
