//! Weighted grid pathfinding for tank AI.
//!
//! A [`grid::Grid`] is built from a tile [`map::Map`], its movement penalties are smoothed with a
//! box blur, and [`pathfind::PathFinder`] runs A* over it to produce simplified [`path::Path`]s.
//! [`request::PathRequestManager`] serializes requests so at most one search runs per frame.
use std::cmp::Ordering;

mod astar;
pub mod debug;
pub mod dir;
pub mod filter;
pub mod grid;
pub mod heap;
mod macros;
pub mod map;
pub mod node;
pub mod path;
pub mod pathfind;
pub mod plugin;
pub mod request;

pub mod prelude {
    pub use crate::debug::{PathfindingDebugConfig, PathfindingDebugPlugin};
    pub use crate::dir::Dir;
    pub use crate::filter::{NeighborFilter, NoCornerClipping, NoCornerCutting};
    pub use crate::grid::{Grid, GridError, GridSettings, GridSettingsBuilder};
    pub use crate::heap::{Heap, HeapItem};
    pub use crate::map::{Map, MapError, TileType};
    pub use crate::node::{Node, NodeType, PathPreference, Penalties};
    pub use crate::path::Path;
    pub use crate::pathfind::PathFinder;
    pub use crate::plugin::{MapObstacleBroken, PathfindingPlugin, PathingSet};
    pub use crate::request::{PathRequestError, PathRequestManager, PathRequestSettings, RequestId};
    pub use crate::{ALIGNED_COST, DIAGONAL_COST, MAX_PENALTY};
}

/// Flat index of a cell in the [`grid::Grid`].
pub type NodeId = usize;

/// Cost of a single horizontal or vertical step.
pub const ALIGNED_COST: u32 = 10;
/// Cost of a single diagonal step.
pub const DIAGONAL_COST: u32 = 14;
/// Penalty assigned to impassable terrain and the grid border.
pub const MAX_PENALTY: u32 = 100;

/// Open set entry for A*. Ordered so the greatest value is the cheapest node.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SmallestCostHolder {
    pub(crate) estimated_cost: u32,
    pub(crate) heuristic: u32,
    pub(crate) index: NodeId,
}

impl PartialEq for SmallestCostHolder {
    fn eq(&self, other: &Self) -> bool {
        self.estimated_cost.eq(&other.estimated_cost) && self.heuristic.eq(&other.heuristic)
    }
}

impl Eq for SmallestCostHolder {}

impl PartialOrd for SmallestCostHolder {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SmallestCostHolder {
    fn cmp(&self, other: &Self) -> Ordering {
        match other.estimated_cost.cmp(&self.estimated_cost) {
            Ordering::Equal => other.heuristic.cmp(&self.heuristic),
            s => s,
        }
    }
}

impl heap::HeapItem for SmallestCostHolder {
    fn heap_key(&self) -> usize {
        self.index
    }
}
