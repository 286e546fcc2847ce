//! Eight-way grid directions.
use bevy::math::IVec2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Dir {
    NORTH = 0,
    EAST = 1,
    SOUTH = 2,
    WEST = 3,
    NORTHEAST = 4,
    SOUTHEAST = 5,
    SOUTHWEST = 6,
    NORTHWEST = 7,
}

pub use self::Dir::*;

impl Dir {
    pub fn cardinal() -> std::iter::Copied<std::slice::Iter<'static, Dir>> {
        [NORTH, EAST, SOUTH, WEST].iter().copied()
    }

    pub fn ordinal() -> std::iter::Copied<std::slice::Iter<'static, Dir>> {
        [NORTHEAST, SOUTHEAST, SOUTHWEST, NORTHWEST].iter().copied()
    }

    pub fn all() -> std::iter::Copied<std::slice::Iter<'static, Dir>> {
        [
            NORTH, EAST, SOUTH, WEST, NORTHEAST, SOUTHEAST, SOUTHWEST, NORTHWEST,
        ]
        .iter()
        .copied()
    }

    /// Bit of this direction in a neighbor mask.
    pub fn bit(self) -> u8 {
        1 << self as u8
    }

    pub fn vector(self) -> IVec2 {
        match self {
            NORTH => IVec2::new(0, 1),
            EAST => IVec2::new(1, 0),
            SOUTH => IVec2::new(0, -1),
            WEST => IVec2::new(-1, 0),
            NORTHEAST => IVec2::new(1, 1),
            SOUTHEAST => IVec2::new(1, -1),
            SOUTHWEST => IVec2::new(-1, -1),
            NORTHWEST => IVec2::new(-1, 1),
        }
    }

    /// The direction of a single grid step, if `step` is one.
    pub fn from_vector(step: IVec2) -> Option<Dir> {
        Dir::all().find(|dir| dir.vector() == step)
    }

    /// The two cardinal directions flanking a diagonal.
    pub fn flanking(self) -> Option<(Dir, Dir)> {
        match self {
            NORTHEAST => Some((NORTH, EAST)),
            SOUTHEAST => Some((SOUTH, EAST)),
            SOUTHWEST => Some((SOUTH, WEST)),
            NORTHWEST => Some((NORTH, WEST)),
            _ => None,
        }
    }
}
