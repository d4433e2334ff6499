//! Grid math mapping world columns onto plots, roads and walls.
//!
//! Each axis repeats with a period of `plot_size + road_width`. Within one
//! period the first `road_width` columns form the gap that precedes the
//! cell's plot body: its first column is the far wall of the previous plot,
//! its last column is the near wall of this cell's plot and everything in
//! between is road. The grid is shifted by half a road width so the lines
//! `road_offset + k * period` run through the middle of the roads.

use crate::area::PlotArea;
use plotweave_common::{Direction, PlotId};

/// Position inside the gap between plot `n` and plot `n + 1` on one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapPart {
    /// Wall on the far (east/south) edge of plot `n`
    LowWall,
    Road,
    /// Wall on the near (west/north) edge of plot `n + 1`
    HighWall,
}

/// Classification of one coordinate along a single axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisBand {
    /// Inside the plot body of the given cell
    Plot(i32),
    /// In the gap following the plot body of the given cell
    Gap(i32, GapPart),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WallSegment {
    /// Straight wall along one edge of the owning plot
    Edge(Direction),
    /// Corner where the owning plot's x-facing and z-facing walls meet
    Corner(Direction, Direction),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Plot(PlotId),
    Road,
    Wall(PlotId, WallSegment),
}

impl Classification {
    pub fn is_plot(&self) -> bool {
        matches!(self, Classification::Plot(_))
    }

    pub fn is_road(&self) -> bool {
        matches!(self, Classification::Road)
    }

    pub fn is_wall(&self) -> bool {
        matches!(self, Classification::Wall(..))
    }
}

fn axis_band(area: &PlotArea, world: i32, offset: i32) -> AxisBand {
    let period = area.period() as i64;
    let road_width = area.road_width() as i64;
    let shifted = world as i64 - offset as i64 + road_width / 2;
    let local = shifted.rem_euclid(period);

    if local >= road_width {
        return AxisBand::Plot(shifted.div_euclid(period) as i32);
    }
    let part = if local == road_width - 1 {
        GapPart::HighWall
    } else if local == 0 {
        GapPart::LowWall
    } else {
        GapPart::Road
    };
    AxisBand::Gap((shifted.div_euclid(period) - 1) as i32, part)
}

/// Per-axis bands of a world column
pub fn axis_bands(area: &PlotArea, world_x: i32, world_z: i32) -> (AxisBand, AxisBand) {
    (
        axis_band(area, world_x, area.road_offset_x()),
        axis_band(area, world_z, area.road_offset_z()),
    )
}

fn x_wall(previous: i32, part: GapPart) -> (i32, Direction) {
    match part {
        GapPart::LowWall => (previous, Direction::East),
        _ => (previous + 1, Direction::West),
    }
}

fn z_wall(previous: i32, part: GapPart) -> (i32, Direction) {
    match part {
        GapPart::LowWall => (previous, Direction::South),
        _ => (previous + 1, Direction::North),
    }
}

/// Classifies a world column by geometry alone, ignoring merges.
pub fn classify(area: &PlotArea, world_x: i32, world_z: i32) -> Classification {
    match axis_bands(area, world_x, world_z) {
        (AxisBand::Plot(x), AxisBand::Plot(z)) => Classification::Plot(PlotId::new(x, z)),
        (AxisBand::Gap(_, GapPart::Road), _) | (_, AxisBand::Gap(_, GapPart::Road)) => {
            Classification::Road
        }
        (AxisBand::Gap(previous, part), AxisBand::Plot(z)) => {
            let (x, direction) = x_wall(previous, part);
            Classification::Wall(PlotId::new(x, z), WallSegment::Edge(direction))
        }
        (AxisBand::Plot(x), AxisBand::Gap(previous, part)) => {
            let (z, direction) = z_wall(previous, part);
            Classification::Wall(PlotId::new(x, z), WallSegment::Edge(direction))
        }
        (AxisBand::Gap(previous_x, part_x), AxisBand::Gap(previous_z, part_z)) => {
            let (x, x_direction) = x_wall(previous_x, part_x);
            let (z, z_direction) = z_wall(previous_z, part_z);
            Classification::Wall(
                PlotId::new(x, z),
                WallSegment::Corner(x_direction, z_direction),
            )
        }
    }
}

/// Plot whose body contains the column, if any
pub fn plot_at(area: &PlotArea, world_x: i32, world_z: i32) -> Option<PlotId> {
    match classify(area, world_x, world_z) {
        Classification::Plot(id) => Some(id),
        _ => None,
    }
}

fn cell_start(area: &PlotArea, cell: i32, offset: i32) -> i32 {
    cell.wrapping_mul(area.period())
        .wrapping_add(offset)
        .wrapping_sub(area.road_width() / 2)
}

/// World column of the first gap column of a cell.
///
/// Cells beyond the world's coordinate range wrap around instead of overflowing.
pub fn cell_origin(area: &PlotArea, id: PlotId) -> (i32, i32) {
    (
        cell_start(area, id.x, area.road_offset_x()),
        cell_start(area, id.z, area.road_offset_z()),
    )
}

/// Lowest corner of a plot body
pub fn plot_bottom(area: &PlotArea, id: PlotId) -> (i32, i32) {
    let (x, z) = cell_origin(area, id);
    (x.wrapping_add(area.road_width()), z.wrapping_add(area.road_width()))
}

/// Highest corner of a plot body, inclusive
pub fn plot_top(area: &PlotArea, id: PlotId) -> (i32, i32) {
    let (x, z) = cell_origin(area, id);
    let span = area.period() - 1;
    (x.wrapping_add(span), z.wrapping_add(span))
}

/// Whether the area claims a column. Unbounded areas claim everything,
/// bounded ones their plot cells plus the gaps on every side of them.
pub fn is_claimed(area: &PlotArea, world_x: i32, world_z: i32) -> bool {
    let Some((min, max)) = area.bounds() else {
        return true;
    };
    let (band_x, band_z) = axis_bands(area, world_x, world_z);
    let within = |band: AxisBand, min: i32, max: i32| match band {
        AxisBand::Plot(cell) => (min..=max).contains(&cell),
        AxisBand::Gap(previous, _) => {
            (min as i64 - 1..=max as i64).contains(&(previous as i64))
        }
    };
    within(band_x, min.x, max.x) && within(band_z, min.z, max.z)
}
