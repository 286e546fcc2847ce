//! This module defines [`PathFinder`], the entry point for running a search on a [`Grid`].
use bevy::{
    log,
    math::{UVec2, Vec3},
};

use crate::{
    astar::{astar_grid, SearchSpace},
    grid::Grid,
    node::PathPreference,
    path::Path,
};

/// Runs A* over a [`Grid`] and simplifies the result into a [`Path`].
///
/// Owns the search working memory so repeated searches don't reallocate. The finder holds no
/// grid state, one instance can serve any grid.
///
/// ```rust
/// use bevy::prelude::*;
/// use tank_pathing::prelude::*;
///
/// let grid = Grid::new(&Map::new(8), &GridSettings::default());
/// let mut finder = PathFinder::new(&grid);
///
/// let start = grid.node_world_position(UVec2::new(3, 3));
/// let end = grid.node_world_position(UVec2::new(20, 12));
/// let path = finder.find_path(&grid, start, end, PathPreference::DriveAround);
///
/// assert!(path.is_some());
/// ```
#[derive(Debug, Clone)]
pub struct PathFinder {
    space: SearchSpace,
}

impl PathFinder {
    pub fn new(grid: &Grid) -> Self {
        PathFinder {
            space: SearchSpace::new(grid.len()),
        }
    }

    /// Finds a path between two world positions. The y component is ignored.
    ///
    /// Positions outside the grid are clamped to the nearest cell. Returns `None` when the goal can't
    /// be reached.
    pub fn find_path(
        &mut self,
        grid: &Grid,
        start: Vec3,
        end: Vec3,
        preference: PathPreference,
    ) -> Option<Path> {
        let start = grid.node_index_from_world_point(start);
        let end = grid.node_index_from_world_point(end);

        self.find_path_between(grid, start, end, preference)
    }

    /// Finds a path between two grid cells.
    pub fn find_path_between(
        &mut self,
        grid: &Grid,
        start: UVec2,
        end: UVec2,
        preference: PathPreference,
    ) -> Option<Path> {
        let raw = crate::timed!("A* search", {
            astar_grid(grid, &mut self.space, start, end, preference)
        });

        match raw {
            Some(raw) => Some(Path::from_cells(grid, &raw.cells, raw.cost)),
            None => {
                log::debug!("No path from {:?} to {:?}", start, end);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, Rng, SeedableRng};

    use super::*;
    use crate::{
        dir::Dir,
        grid::{GridSettings, GridSettingsBuilder},
        map::{Map, TileType},
        node::NodeType,
        DIAGONAL_COST,
    };

    fn exact_grid(map: &Map, blur_radius: u32) -> Grid {
        Grid::new(
            map,
            &GridSettingsBuilder::new()
                .resolution(1)
                .edge_margin(0)
                .blur_radius(blur_radius)
                .build(),
        )
    }

    fn diagonal_wall(size: u32) -> Map {
        let mut map = Map::new(size);
        for i in 0..size {
            map.set_tile(i, size - 1 - i, TileType::Water);
        }
        map
    }

    fn assert_walkable(grid: &Grid, cells: &[UVec2]) {
        for pair in cells.windows(2) {
            let step = pair[1].as_ivec2() - pair[0].as_ivec2();
            let dir = Dir::from_vector(step).expect("consecutive cells must be adjacent");
            assert!(grid.is_traversable(pair[1]), "{:?} is impassable", pair[1]);

            if let Some((a, b)) = dir.flanking() {
                let blocked = |d: Dir| {
                    let cell = pair[0].as_ivec2() + d.vector();
                    cell.min_element() < 0 || !grid.is_traversable(cell.as_uvec2())
                };
                assert!(
                    !(blocked(a) && blocked(b)),
                    "diagonal step {:?} -> {:?} clips a corner",
                    pair[0],
                    pair[1]
                );
            }
        }
    }

    #[test]
    fn test_find_path_detours_around_gapped_wall() {
        let mut map = diagonal_wall(10);
        map.set_tile(9, 0, TileType::Ground);
        let grid = exact_grid(&map, 0);
        let mut finder = PathFinder::new(&grid);

        let start = UVec2::new(0, 0);
        let goal = UVec2::new(9, 9);
        let path = finder
            .find_path_between(&grid, start, goal, PathPreference::DriveAround)
            .unwrap();

        assert!(!path.is_empty());
        assert!(path.cost() > 9 * DIAGONAL_COST);
        assert_eq!(*path.cells().last().unwrap(), goal);

        let walked = path.expand(start);
        assert_walkable(&grid, &walked);
        for cell in walked {
            assert_ne!(cell.x + cell.y, 9, "{cell:?} sits on the wall");
        }
    }

    #[test]
    fn test_find_path_full_wall_is_unreachable() {
        let grid = exact_grid(&diagonal_wall(10), 0);
        let mut finder = PathFinder::new(&grid);

        for preference in [PathPreference::BreakWalls, PathPreference::DriveAround] {
            assert_eq!(
                finder.find_path_between(&grid, UVec2::ZERO, UVec2::new(9, 9), preference),
                None
            );
        }
    }

    #[test]
    fn test_find_path_world_points() {
        let map = Map::mock(16);
        let grid = Grid::new(&map, &GridSettings::default());
        let mut finder = PathFinder::new(&grid);

        let start_cell = UVec2::new(6, 6);
        let goal_cell = UVec2::new(44, 47);
        let start = grid.node_world_position(start_cell);
        let end = grid.node_world_position(goal_cell) + Vec3::Y * 5.0;

        let path = finder
            .find_path(&grid, start, end, PathPreference::BreakWalls)
            .unwrap();

        assert_eq!(path.cells().last(), Some(&goal_cell));
        assert_eq!(path.points().last(), Some(&grid.node_world_position(goal_cell)));
        assert!(path.points().iter().all(|point| point.y == 0.0));
        assert_eq!(
            Some(path),
            finder.find_path_between(&grid, start_cell, goal_cell, PathPreference::BreakWalls)
        );
    }

    #[test]
    fn test_find_path_single_cell_grid_clamps() {
        let grid = exact_grid(&Map::new(1), 0);
        let mut finder = PathFinder::new(&grid);

        let path = finder
            .find_path(
                &grid,
                Vec3::new(-50.0, 0.0, -50.0),
                Vec3::new(50.0, 0.0, 50.0),
                PathPreference::DriveAround,
            )
            .unwrap();

        assert_eq!(path.cells(), &[UVec2::ZERO]);
        assert_eq!(path.cost(), 0);
    }

    #[test]
    fn test_find_path_is_deterministic() {
        let grid = Grid::new(&Map::mock(20), &GridSettings::default());
        let mut finder = PathFinder::new(&grid);
        let mut fresh = PathFinder::new(&grid);

        let start = UVec2::new(4, 60);
        let goal = UVec2::new(58, 4);

        let first = finder.find_path_between(&grid, start, goal, PathPreference::DriveAround);
        let second = finder.find_path_between(&grid, start, goal, PathPreference::DriveAround);
        let third = fresh.find_path_between(&grid, start, goal, PathPreference::DriveAround);

        assert!(first.is_some());
        assert_eq!(first, second);
        assert_eq!(first, third);
    }

    #[test]
    fn test_find_path_random_endpoints_stay_walkable() {
        let grid = Grid::new(&Map::mock(16), &GridSettings::default());
        let mut finder = PathFinder::new(&grid);
        let mut rng = StdRng::seed_from_u64(3);

        let mut found = 0;
        for _ in 0..50 {
            let start = UVec2::new(rng.random_range(0..grid.size()), rng.random_range(0..grid.size()));
            let goal = UVec2::new(rng.random_range(0..grid.size()), rng.random_range(0..grid.size()));
            let preference = PathPreference::from(rng.random_bool(0.5));

            let Some(path) = finder.find_path_between(&grid, start, goal, preference) else {
                continue;
            };

            found += 1;
            let walked = path.expand(start);
            assert_eq!(walked.last(), Some(&goal));
            assert_walkable(&grid, &walked);
            assert!(path.cells().iter().all(|&cell| grid.is_traversable(cell)));
        }

        assert!(found > 0);
    }

    #[test]
    fn test_obstacle_break_opens_route() {
        // A river with a single weak wall crossing.
        let mut map = Map::new(8);
        for x in 0..8 {
            map.set_tile(x, 4, TileType::Water);
        }
        map.set_tile(3, 4, TileType::WeakWall);

        let mut grid = exact_grid(&map, 1);
        let mut finder = PathFinder::new(&grid);
        let start = UVec2::new(3, 0);
        let goal = UVec2::new(3, 7);
        let crossing = UVec2::new(3, 4);

        let before = finder
            .find_path_between(&grid, start, goal, PathPreference::DriveAround)
            .unwrap();
        assert!(before.expand(start).contains(&crossing));
        assert_eq!(grid.node(crossing).unwrap().node_type(), NodeType::Breakable);

        grid.on_map_obstacle_break(3, 4).unwrap();

        let after = finder
            .find_path_between(&grid, start, goal, PathPreference::DriveAround)
            .unwrap();
        assert!(after.expand(start).contains(&crossing));
        assert_eq!(grid.node(crossing).unwrap().node_type(), NodeType::Open);
        assert!(after.cost() < before.cost());
    }

    #[test]
    fn test_break_walls_preference_is_cheaper_through_walls() {
        let grid = Grid::new(&Map::mock(16), &GridSettings::default());
        let mut finder = PathFinder::new(&grid);

        // Across the wall bands in the middle of the mock map.
        let start = UVec2::new(25, 8);
        let goal = UVec2::new(25, 44);

        let breaking = finder
            .find_path_between(&grid, start, goal, PathPreference::BreakWalls)
            .unwrap();
        let avoiding = finder
            .find_path_between(&grid, start, goal, PathPreference::DriveAround)
            .unwrap();

        assert!(breaking.cost() <= avoiding.cost());
    }
}
