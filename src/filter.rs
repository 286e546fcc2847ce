//! This module defines some preset `NeighborFilter`s for filtering neighbors based on specific movement rules.
use bevy::math::{IVec2, UVec2};
use ndarray::ArrayView2;
use std::fmt::Debug;

use crate::{dir::Dir, node::Node};

/// [`NeighborFilter`] trait to add custom filtering logic to the neighbors returned by [`crate::grid::Grid::neighbors()`].
/// Add a filter to the grid settings with [`crate::grid::GridSettingsBuilder::add_neighbor_filter()`].
///
/// `mask` holds one [`Dir::bit()`] per candidate neighbor. Return the mask with disallowed directions cleared.
pub trait NeighborFilter: Debug {
    fn filter(&self, pos: UVec2, mask: u8, grid: &ArrayView2<Node>) -> u8;
}

fn is_blocked(grid: &ArrayView2<Node>, cell: IVec2) -> bool {
    let shape = grid.shape();
    if cell.x < 0 || cell.y < 0 || cell.x >= shape[0] as i32 || cell.y >= shape[1] as i32 {
        return true;
    }

    grid[[cell.x as usize, cell.y as usize]].is_impassable()
}

/// Disallow diagonal movement if both adjacent cardinals in the direction of movement are impassable.
/// Prevents agents from slipping between two wall corners like this where x is a wall:
/// |x|/|
/// |/|x|
#[derive(Copy, Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NoCornerClipping;

impl NeighborFilter for NoCornerClipping {
    fn filter(&self, pos: UVec2, mut mask: u8, grid: &ArrayView2<Node>) -> u8 {
        let origin = pos.as_ivec2();

        for dir in Dir::ordinal() {
            if mask & dir.bit() == 0 {
                continue;
            }

            let Some((a, b)) = dir.flanking() else {
                continue;
            };

            if is_blocked(grid, origin + a.vector()) && is_blocked(grid, origin + b.vector()) {
                mask &= !dir.bit();
            }
        }

        mask
    }
}

/// Disallow diagonal movement if *any* adjacent cardinal in the direction of movement is impassable.
/// Prevents cutting around corners like this where x is the wall:
/// |x|/|
/// |/| |
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NoCornerCutting;

impl NeighborFilter for NoCornerCutting {
    fn filter(&self, pos: UVec2, mut mask: u8, grid: &ArrayView2<Node>) -> u8 {
        let origin = pos.as_ivec2();

        for dir in Dir::ordinal() {
            if mask & dir.bit() == 0 {
                continue;
            }

            let Some((a, b)) = dir.flanking() else {
                continue;
            };

            if is_blocked(grid, origin + a.vector()) || is_blocked(grid, origin + b.vector()) {
                mask &= !dir.bit();
            }
        }

        mask
    }
}
