//! This module defines the [`Path`] component returned by [`crate::pathfind::PathFinder`].
use bevy::math::{IVec2, UVec2, Vec2, Vec3};
use bevy::prelude::Component;
use bevy::reflect::Reflect;

use crate::grid::Grid;

/// A simplified path: one waypoint per change of direction, plus the goal.
///
/// `points[i]` is the world position of waypoint `i` and `directions[i]` is the grid step taken while
/// arriving at it, so every waypoint is reached by repeating a single step from the previous one
/// (or from the start cell for the first waypoint). The start cell itself is not a waypoint.
///
/// The content is immutable. The cursor only moves forward, [`Path::reset`] rewinds it.
#[derive(Debug, Clone, Component, Reflect)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Path {
    points: Vec<Vec3>,
    directions: Vec<Vec2>,
    cells: Vec<UVec2>,
    cost: u32,
    current_index: usize,
}

impl Path {
    /// Collapses a raw cell chain, start first, into waypoints.
    pub(crate) fn from_cells(grid: &Grid, chain: &[UVec2], cost: u32) -> Self {
        let mut cells = Vec::new();
        let mut steps = Vec::new();

        for (k, pair) in chain.windows(2).enumerate() {
            let step = pair[1].as_ivec2() - pair[0].as_ivec2();
            let next = chain
                .get(k + 2)
                .map(|after| after.as_ivec2() - pair[1].as_ivec2());

            if next != Some(step) {
                cells.push(pair[1]);
                steps.push(step);
            }
        }

        if cells.is_empty() {
            if let Some(&goal) = chain.last() {
                cells.push(goal);
                steps.push(IVec2::ZERO);
            }
        }

        Path {
            points: cells.iter().map(|&cell| grid.node_world_position(cell)).collect(),
            directions: steps.iter().map(|step| step.as_vec2()).collect(),
            cells,
            cost,
            current_index: 0,
        }
    }

    /// World positions of the waypoints.
    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    /// Grid step used to reach each waypoint, components in `-1..=1`.
    pub fn directions(&self) -> &[Vec2] {
        &self.directions
    }

    /// Grid cells of the waypoints.
    pub fn cells(&self) -> &[UVec2] {
        &self.cells
    }

    /// Total movement cost: step costs plus the penalties of every entered cell.
    pub fn cost(&self) -> u32 {
        self.cost
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_point(&self) -> Option<Vec3> {
        self.points.get(self.current_index).copied()
    }

    pub fn current_direction(&self) -> Option<Vec2> {
        self.directions.get(self.current_index).copied()
    }

    pub fn current_cell(&self) -> Option<UVec2> {
        self.cells.get(self.current_index).copied()
    }

    /// Advances the cursor. Returns `false`, leaving the cursor in place, at the last waypoint.
    pub fn move_next(&mut self) -> bool {
        if self.current_index + 1 >= self.points.len() {
            return false;
        }

        self.current_index += 1;
        true
    }

    /// Rewinds the cursor to the first waypoint.
    pub fn reset(&mut self) {
        self.current_index = 0;
    }

    /// Returns true if `cell` is one of the waypoints.
    pub fn is_position_in_path(&self, cell: UVec2) -> bool {
        self.cells.contains(&cell)
    }

    /// Walks the waypoints step by step from `start`, recovering every cell of the searched chain.
    ///
    /// `start` is included as the first cell.
    pub fn expand(&self, start: UVec2) -> Vec<UVec2> {
        let mut cells = vec![start];
        let mut current = start.as_ivec2();

        for (&waypoint, direction) in self.cells.iter().zip(&self.directions) {
            let step = direction.as_ivec2();
            let target = waypoint.as_ivec2();

            if step == IVec2::ZERO {
                continue;
            }

            while current != target {
                current += step;
                cells.push(current.as_uvec2());
            }
        }

        cells
    }
}

impl PartialEq for Path {
    fn eq(&self, other: &Self) -> bool {
        self.cells == other.cells && self.directions == other.directions && self.cost == other.cost
    }
}

impl Eq for Path {}

impl IntoIterator for Path {
    type Item = Vec3;
    type IntoIter = std::vec::IntoIter<Vec3>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.into_iter()
    }
}
