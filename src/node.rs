//! This module defines the [`Node`] struct, a single cell of the pathfinding [`crate::grid::Grid`].
use bevy::math::UVec2;

use crate::{map::TileType, MAX_PENALTY};

/// Traversability class of a [`Node`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NodeType {
    /// Freely traversable.
    Open,
    /// Traversable at a cost, the terrain can be shot away.
    Breakable,
    /// Never traversable.
    Impassable,
}

/// Which penalty field a search should use.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PathPreference {
    /// Agents that would rather shoot through walls than drive around them.
    BreakWalls,
    #[default]
    DriveAround,
}

impl From<bool> for PathPreference {
    fn from(prefer_break_walls: bool) -> Self {
        if prefer_break_walls {
            PathPreference::BreakWalls
        } else {
            PathPreference::DriveAround
        }
    }
}

/// A pair of movement penalties, one per [`PathPreference`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Penalties {
    pub break_walls: u32,
    pub drive_around: u32,
}

impl Penalties {
    pub const ZERO: Penalties = Penalties::new(0, 0);
    pub const MAX: Penalties = Penalties::new(MAX_PENALTY, MAX_PENALTY);

    pub const fn new(break_walls: u32, drive_around: u32) -> Self {
        Penalties {
            break_walls,
            drive_around,
        }
    }

    pub fn get(&self, preference: PathPreference) -> u32 {
        match preference {
            PathPreference::BreakWalls => self.break_walls,
            PathPreference::DriveAround => self.drive_around,
        }
    }
}

/// Classification and raw penalties for a map tile.
pub fn classify_tile(tile: TileType) -> (NodeType, Penalties) {
    match tile {
        TileType::Ground
        | TileType::Ice
        | TileType::Woods
        | TileType::EnemySpawn
        | TileType::PlayerSpawn => (NodeType::Open, Penalties::ZERO),
        TileType::WeakWall | TileType::BasePosition => {
            (NodeType::Breakable, Penalties::new(5, 40))
        }
        TileType::StrongWall => (NodeType::Breakable, Penalties::new(20, MAX_PENALTY)),
        TileType::Water => (NodeType::Impassable, Penalties::MAX),
    }
}

/// One cell of the grid.
///
/// Holds the terrain class and the raw and smoothed penalties. Per-search A* state is kept
/// outside the node so consecutive searches never observe each other's bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub(crate) node_type: NodeType,
    pub(crate) grid_position: UVec2,
    pub(crate) raw_penalties: Penalties,
    pub(crate) penalties: Penalties,
}

impl Node {
    pub(crate) fn new(node_type: NodeType, grid_position: UVec2, raw_penalties: Penalties) -> Self {
        Node {
            node_type,
            grid_position,
            raw_penalties,
            penalties: raw_penalties,
        }
    }

    pub(crate) fn from_tile(tile: TileType, grid_position: UVec2) -> Self {
        let (node_type, raw_penalties) = classify_tile(tile);
        Node::new(node_type, grid_position, raw_penalties)
    }

    /// A border node outside the playable map.
    pub(crate) fn border(grid_position: UVec2) -> Self {
        Node::new(NodeType::Impassable, grid_position, Penalties::MAX)
    }

    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    pub fn grid_position(&self) -> UVec2 {
        self.grid_position
    }

    pub fn is_impassable(&self) -> bool {
        self.node_type == NodeType::Impassable
    }

    pub fn raw_penalties(&self) -> Penalties {
        self.raw_penalties
    }

    /// Smoothed penalties, the values A* adds to the step cost.
    pub fn penalties(&self) -> Penalties {
        self.penalties
    }

    pub fn prefer_break_walls_penalty(&self) -> u32 {
        self.penalties.break_walls
    }

    pub fn prefer_drive_around_penalty(&self) -> u32 {
        self.penalties.drive_around
    }

    pub fn penalty(&self, preference: PathPreference) -> u32 {
        self.penalties.get(preference)
    }

    /// Turns a breakable node into open ground. Other node types are left untouched.
    pub(crate) fn break_open(&mut self) -> bool {
        if self.node_type != NodeType::Breakable {
            return false;
        }

        self.node_type = NodeType::Open;
        self.raw_penalties = Penalties::ZERO;
        self.penalties = Penalties::ZERO;
        true
    }
}
