use crate::area::PlotArea;
use crate::layout::{axis_bands, classify, AxisBand, Classification, GapPart, WallSegment};
use plotweave_common::{Direction, PlotId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which neighbours a plot is fused with, one bit per direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct MergeState {
    bits: u8,
}

impl MergeState {
    pub const NONE: MergeState = MergeState { bits: 0 };

    pub fn new(north: bool, east: bool, south: bool, west: bool) -> Self {
        let mut state = MergeState::NONE;
        for (flag, direction) in [north, east, south, west].into_iter().zip(Direction::ALL) {
            if flag {
                state = state.with(direction);
            }
        }
        state
    }

    pub fn from_bits(bits: u8) -> Self {
        MergeState { bits: bits & 0b1111 }
    }

    pub fn bits(&self) -> u8 {
        self.bits
    }

    pub fn with(self, direction: Direction) -> Self {
        MergeState {
            bits: self.bits | direction.bit(),
        }
    }

    pub fn without(self, direction: Direction) -> Self {
        MergeState {
            bits: self.bits & !direction.bit(),
        }
    }

    pub fn is_merged(&self, direction: Direction) -> bool {
        self.bits & direction.bit() != 0
    }

    pub fn any(&self) -> bool {
        self.bits != 0
    }
}

/// Read-only source of merge states while a chunk is generated.
pub trait MergeLookup {
    fn merge_state(&self, id: PlotId) -> MergeState;
}

/// Lookup for areas without any merged plots
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMerges;

impl MergeLookup for NoMerges {
    fn merge_state(&self, _id: PlotId) -> MergeState {
        MergeState::NONE
    }
}

impl MergeLookup for HashMap<PlotId, MergeState> {
    fn merge_state(&self, id: PlotId) -> MergeState {
        self.get(&id).copied().unwrap_or_default()
    }
}

/// A plot counts as merged towards a direction only when both plots are in range.
pub fn is_merged<M: MergeLookup + ?Sized>(
    area: &PlotArea,
    merges: &M,
    id: PlotId,
    direction: Direction,
) -> bool {
    merges.merge_state(id).is_merged(direction)
        && area.contains(id)
        && area.contains(id.neighbor(direction))
}

/// Whether the wall of `owner` facing `neighbor` disappears because the two are merged.
pub fn is_wall_suppressed<M: MergeLookup + ?Sized>(
    area: &PlotArea,
    merges: &M,
    owner: PlotId,
    neighbor: PlotId,
    direction: Direction,
) -> bool {
    owner.neighbor(direction) == neighbor && is_merged(area, merges, owner, direction)
}

/// Classifies a world column with merged plots fused into one parcel.
///
/// Walls and roads between two merged plots become plot, wall lines are
/// carried across the road where two merged plots share an outer edge, and a
/// road crossing only turns into plot when all four plots around it are merged.
pub fn classify_merged<M: MergeLookup + ?Sized>(
    area: &PlotArea,
    merges: &M,
    world_x: i32,
    world_z: i32,
) -> Classification {
    let merged = |id: PlotId, direction: Direction| is_merged(area, merges, id, direction);

    match axis_bands(area, world_x, world_z) {
        (AxisBand::Plot(x), AxisBand::Plot(z)) => Classification::Plot(PlotId::new(x, z)),
        (AxisBand::Gap(previous, _), AxisBand::Plot(z)) => {
            let west = PlotId::new(previous, z);
            if merged(west, Direction::East) {
                Classification::Plot(west)
            } else {
                classify(area, world_x, world_z)
            }
        }
        (AxisBand::Plot(x), AxisBand::Gap(previous, _)) => {
            let north = PlotId::new(x, previous);
            if merged(north, Direction::South) {
                Classification::Plot(north)
            } else {
                classify(area, world_x, world_z)
            }
        }
        (AxisBand::Gap(previous_x, part_x), AxisBand::Gap(previous_z, part_z)) => {
            let a = PlotId::new(previous_x, previous_z);
            let b = a.neighbor(Direction::East);
            let c = a.neighbor(Direction::South);
            let d = b.neighbor(Direction::South);
            if merged(a, Direction::East)
                && merged(a, Direction::South)
                && merged(b, Direction::South)
                && merged(c, Direction::East)
            {
                return Classification::Plot(a);
            }

            match (part_x, part_z) {
                (GapPart::Road, GapPart::Road) => Classification::Road,
                (GapPart::Road, part_z) => {
                    // Wall line running east-west across the road
                    let (left, right, direction) = match part_z {
                        GapPart::LowWall => (a, b, Direction::South),
                        _ => (c, d, Direction::North),
                    };
                    if !merged(left, Direction::East) {
                        Classification::Road
                    } else if merged(left, direction) && merged(right, direction) {
                        Classification::Plot(left)
                    } else {
                        Classification::Wall(left, WallSegment::Edge(direction))
                    }
                }
                (part_x, GapPart::Road) => {
                    // Wall line running north-south across the road
                    let (top, bottom, direction) = match part_x {
                        GapPart::LowWall => (a, c, Direction::East),
                        _ => (b, d, Direction::West),
                    };
                    if !merged(top, Direction::South) {
                        Classification::Road
                    } else if merged(top, direction) && merged(bottom, direction) {
                        Classification::Plot(top)
                    } else {
                        Classification::Wall(top, WallSegment::Edge(direction))
                    }
                }
                (part_x, part_z) => {
                    let (owner, x_direction, z_direction) = match (part_x, part_z) {
                        (GapPart::LowWall, GapPart::LowWall) => {
                            (a, Direction::East, Direction::South)
                        }
                        (_, GapPart::LowWall) => (b, Direction::West, Direction::South),
                        (GapPart::LowWall, _) => (c, Direction::East, Direction::North),
                        _ => (d, Direction::West, Direction::North),
                    };
                    if merged(owner, x_direction) && merged(owner, z_direction) {
                        Classification::Plot(owner)
                    } else {
                        Classification::Wall(
                            owner,
                            WallSegment::Corner(x_direction, z_direction),
                        )
                    }
                }
            }
        }
    }
}
