//! A* over a [`Grid`].
use bevy::{log, math::UVec2};
use rustc_hash::FxHashSet;

use crate::{
    grid::Grid, heap::Heap, node::PathPreference, NodeId, SmallestCostHolder, ALIGNED_COST,
    DIAGONAL_COST,
};

/// Octile distance between two cells using [`ALIGNED_COST`] and [`DIAGONAL_COST`].
pub(crate) fn octile_distance(a: UVec2, b: UVec2) -> u32 {
    let dx = a.x.abs_diff(b.x);
    let dy = a.y.abs_diff(b.y);

    let min = dx.min(dy);
    let max = dx.max(dy);

    min * DIAGONAL_COST + (max - min) * ALIGNED_COST
}

/// Cells from start to goal, both included, and the cost of walking them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawPath {
    pub(crate) cells: Vec<UVec2>,
    pub(crate) cost: u32,
}

#[derive(Debug, Clone, Copy, Default)]
struct NodeScratch {
    generation: u32,
    g_cost: u32,
    parent: Option<NodeId>,
}

/// Working memory for A*, reused between searches.
///
/// Scratch entries are stamped with the generation of the search that wrote them; entries from an
/// older generation read as unvisited, so nothing from a previous search leaks into the next one.
#[derive(Debug, Clone)]
pub(crate) struct SearchSpace {
    scratch: Vec<NodeScratch>,
    open: Heap<SmallestCostHolder>,
    closed: FxHashSet<NodeId>,
    generation: u32,
}

impl SearchSpace {
    pub(crate) fn new(capacity: usize) -> Self {
        SearchSpace {
            scratch: vec![NodeScratch::default(); capacity],
            open: Heap::with_capacity(capacity),
            closed: FxHashSet::default(),
            generation: 0,
        }
    }

    /// Starts a new search over `capacity` nodes.
    fn begin(&mut self, capacity: usize) {
        self.open.clear();
        self.closed.clear();

        if self.scratch.len() != capacity {
            self.scratch = vec![NodeScratch::default(); capacity];
            self.open.reset_capacity(capacity);
            self.generation = 0;
        }

        self.generation = match self.generation.checked_add(1) {
            Some(generation) => generation,
            None => {
                self.scratch.fill(NodeScratch::default());
                1
            }
        };
    }

    fn get(&self, id: NodeId) -> Option<&NodeScratch> {
        self.scratch
            .get(id)
            .filter(|scratch| scratch.generation == self.generation)
    }

    fn set(&mut self, id: NodeId, g_cost: u32, parent: Option<NodeId>) {
        self.scratch[id] = NodeScratch {
            generation: self.generation,
            g_cost,
            parent,
        };
    }

    fn retrace(&self, grid: &Grid, goal: NodeId) -> Option<RawPath> {
        let cost = self.get(goal)?.g_cost;
        let mut cells = vec![];
        let mut current = Some(goal);

        while let Some(id) = current {
            cells.push(grid.position_of(id));
            current = self.get(id)?.parent;
        }

        cells.reverse();
        Some(RawPath { cells, cost })
    }
}

/// A* search from `start` to `goal`.
///
/// The cost of entering a node is the octile step cost plus the node's smoothed penalty for
/// `preference`. Impassable nodes are never entered. Returns `None` if the goal can't be reached.
pub(crate) fn astar_grid(
    grid: &Grid,
    space: &mut SearchSpace,
    start: UVec2,
    goal: UVec2,
    preference: PathPreference,
) -> Option<RawPath> {
    if !grid.in_bounds(start) || !grid.in_bounds(goal) {
        log::warn!("Search endpoints out of bounds: {:?} -> {:?}", start, goal);
        return None;
    }

    if !grid.is_traversable(goal) {
        log::debug!("Goal {:?} is impassable", goal);
        return None;
    }

    space.begin(grid.len());

    let start_id = grid.index_of(start);
    let goal_id = grid.index_of(goal);

    space.set(start_id, 0, None);
    let h = octile_distance(start, goal);
    space.open.add(SmallestCostHolder {
        estimated_cost: h,
        heuristic: h,
        index: start_id,
    });

    while let Some(SmallestCostHolder { index, .. }) = space.open.pop_first() {
        space.closed.insert(index);

        if index == goal_id {
            return space.retrace(grid, goal_id);
        }

        let current_pos = grid.position_of(index);
        let current_cost = match space.get(index) {
            Some(scratch) => scratch.g_cost,
            None => continue,
        };

        for neighbor in grid.neighbors(current_pos) {
            let neighbor_id = grid.index_of(neighbor);
            let node = grid.node_at(neighbor_id);

            if node.is_impassable() || space.closed.contains(&neighbor_id) {
                continue;
            }

            let new_cost = current_cost
                + octile_distance(current_pos, neighbor)
                + node.penalty(preference);

            let in_open = space.open.contains(neighbor_id);
            let improves = match space.get(neighbor_id) {
                Some(scratch) if in_open => new_cost < scratch.g_cost,
                _ => true,
            };

            if !improves {
                continue;
            }

            let h = octile_distance(neighbor, goal);
            space.set(neighbor_id, new_cost, Some(index));

            let holder = SmallestCostHolder {
                estimated_cost: new_cost + h,
                heuristic: h,
                index: neighbor_id,
            };

            if in_open {
                space.open.refresh_item(holder);
            } else {
                space.open.add(holder);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use std::{cmp::Reverse, collections::BinaryHeap};

    use rand::{rngs::StdRng, Rng, SeedableRng};

    use super::*;
    use crate::{
        grid::GridSettingsBuilder,
        map::{Map, TileType},
        node::NodeType,
    };

    fn exact_grid(map: &Map) -> Grid {
        Grid::new(
            map,
            &GridSettingsBuilder::new()
                .resolution(1)
                .edge_margin(0)
                .blur_radius(0)
                .build(),
        )
    }

    fn search(grid: &Grid, start: UVec2, goal: UVec2, preference: PathPreference) -> Option<RawPath> {
        let mut space = SearchSpace::new(grid.len());
        astar_grid(grid, &mut space, start, goal, preference)
    }

    // Exhaustive Dijkstra over the same move rules and cost model.
    fn brute_force_cost(grid: &Grid, start: UVec2, goal: UVec2, preference: PathPreference) -> Option<u32> {
        let mut best = vec![u32::MAX; grid.len()];
        let mut queue = BinaryHeap::new();
        best[grid.index_of(start)] = 0;
        queue.push(Reverse((0u32, grid.index_of(start))));

        while let Some(Reverse((cost, id))) = queue.pop() {
            if cost > best[id] {
                continue;
            }

            let pos = grid.position_of(id);
            for neighbor in grid.neighbors(pos) {
                let node = grid.node(neighbor).unwrap();
                if node.is_impassable() {
                    continue;
                }

                let next = cost + octile_distance(pos, neighbor) + node.penalty(preference);
                let nid = grid.index_of(neighbor);
                if next < best[nid] {
                    best[nid] = next;
                    queue.push(Reverse((next, nid)));
                }
            }
        }

        let goal_cost = best[grid.index_of(goal)];
        (goal_cost != u32::MAX).then_some(goal_cost)
    }

    fn path_cost(grid: &Grid, path: &RawPath, preference: PathPreference) -> u32 {
        path.cells
            .windows(2)
            .map(|step| {
                octile_distance(step[0], step[1]) + grid.node(step[1]).unwrap().penalty(preference)
            })
            .sum()
    }

    #[test]
    fn test_octile_distance() {
        assert_eq!(octile_distance(UVec2::ZERO, UVec2::ZERO), 0);
        assert_eq!(octile_distance(UVec2::ZERO, UVec2::new(3, 0)), 30);
        assert_eq!(octile_distance(UVec2::ZERO, UVec2::new(2, 2)), 28);
        assert_eq!(octile_distance(UVec2::new(5, 1), UVec2::new(1, 3)), 48);
    }

    #[test]
    fn test_astar_open_grid() {
        let grid = exact_grid(&Map::new(8));
        let path = search(&grid, UVec2::ZERO, UVec2::new(7, 7), PathPreference::DriveAround).unwrap();

        assert_eq!(path.cost, 7 * DIAGONAL_COST);
        assert_eq!(path.cells.len(), 8);
        assert_eq!(path.cells[0], UVec2::ZERO);
        assert_eq!(*path.cells.last().unwrap(), UVec2::new(7, 7));
    }

    #[test]
    fn test_astar_start_is_goal() {
        let grid = exact_grid(&Map::new(4));
        let path = search(&grid, UVec2::ONE, UVec2::ONE, PathPreference::DriveAround).unwrap();

        assert_eq!(path.cells, vec![UVec2::ONE]);
        assert_eq!(path.cost, 0);
    }

    #[test]
    fn test_astar_avoids_impassable() {
        let map = Map::parse(
            "
            .....
            .....
            ~~~~.
            .....
            .....
            ",
        )
        .unwrap();
        let grid = exact_grid(&map);
        let path = search(&grid, UVec2::new(0, 0), UVec2::new(0, 4), PathPreference::DriveAround).unwrap();

        assert!(path.cells.iter().all(|&cell| grid.is_traversable(cell)));
        assert!(path.cells.contains(&UVec2::new(4, 2)));
        assert_eq!(path_cost(&grid, &path, PathPreference::DriveAround), path.cost);
    }

    #[test]
    fn test_astar_unreachable_returns_none() {
        // A full diagonal of water splits the grid, and the corner rule closes the diagonal gaps.
        let mut map = Map::new(10);
        for i in 0..10 {
            map.set_tile(i, 9 - i, TileType::Water);
        }
        let grid = exact_grid(&map);

        assert_eq!(
            search(&grid, UVec2::ZERO, UVec2::new(9, 9), PathPreference::DriveAround),
            None
        );
        assert_eq!(
            search(&grid, UVec2::ZERO, UVec2::new(9, 9), PathPreference::BreakWalls),
            None
        );
    }

    #[test]
    fn test_astar_impassable_goal() {
        let map = Map::parse("..\n.~").unwrap();
        let grid = exact_grid(&map);

        assert_eq!(
            search(&grid, UVec2::new(0, 0), UVec2::new(1, 0), PathPreference::DriveAround),
            None
        );
    }

    #[test]
    fn test_astar_preference_changes_route() {
        // A strong wall band with a gap at the east end.
        let mut map = Map::new(7);
        for x in 0..6 {
            map.set_tile(x, 2, TileType::StrongWall);
        }
        let grid = exact_grid(&map);

        let start = UVec2::new(0, 0);
        let goal = UVec2::new(0, 4);

        let around = search(&grid, start, goal, PathPreference::DriveAround).unwrap();
        let through = search(&grid, start, goal, PathPreference::BreakWalls).unwrap();

        let crosses_wall = |path: &RawPath| {
            path.cells
                .iter()
                .any(|&c| grid.node(c).unwrap().node_type() == NodeType::Breakable)
        };

        assert!(!crosses_wall(&around));
        assert!(crosses_wall(&through));
        assert!(through.cost < around.cost);
    }

    #[test]
    fn test_astar_is_deterministic_and_reusable() {
        let map = Map::mock(16);
        let grid = Grid::new(&map, &Default::default());
        let mut space = SearchSpace::new(grid.len());

        let start = UVec2::new(5, 5);
        let goal = UVec2::new(40, 45);

        let first = astar_grid(&grid, &mut space, start, goal, PathPreference::DriveAround);
        // An unrelated search in between must not affect the next result.
        let _ = astar_grid(&grid, &mut space, goal, UVec2::new(10, 40), PathPreference::BreakWalls);
        let second = astar_grid(&grid, &mut space, start, goal, PathPreference::DriveAround);

        assert!(first.is_some());
        assert_eq!(first, second);
        assert_eq!(first, search(&grid, start, goal, PathPreference::DriveAround));
    }

    #[test]
    fn test_astar_matches_brute_force_on_random_grids() {
        let mut rng = StdRng::seed_from_u64(42);
        let tiles = [
            TileType::Ground,
            TileType::Ground,
            TileType::Ground,
            TileType::WeakWall,
            TileType::StrongWall,
            TileType::Water,
        ];

        for round in 0..40 {
            let size = 6 + round % 5;
            let mut map = Map::new(size);
            for y in 0..size {
                for x in 0..size {
                    map.set_tile(x, y, tiles[rng.random_range(0..tiles.len())]);
                }
            }

            let blur = round % 3;
            let grid = Grid::new(
                &map,
                &GridSettingsBuilder::new()
                    .resolution(1)
                    .edge_margin(round % 2)
                    .blur_radius(blur)
                    .build(),
            );

            let mut space = SearchSpace::new(grid.len());
            for _ in 0..5 {
                let start = UVec2::new(rng.random_range(0..grid.size()), rng.random_range(0..grid.size()));
                let goal = UVec2::new(rng.random_range(0..grid.size()), rng.random_range(0..grid.size()));

                for preference in [PathPreference::BreakWalls, PathPreference::DriveAround] {
                    let found = astar_grid(&grid, &mut space, start, goal, preference);
                    let expected = if grid.is_traversable(goal) {
                        brute_force_cost(&grid, start, goal, preference)
                    } else {
                        None
                    };

                    assert_eq!(found.as_ref().map(|p| p.cost), expected, "round {round} {start:?} -> {goal:?}");

                    if let Some(path) = found {
                        assert_eq!(path.cells[0], start);
                        assert_eq!(*path.cells.last().unwrap(), goal);
                        assert_eq!(path_cost(&grid, &path, preference), path.cost);
                        assert!(path.cells.iter().skip(1).all(|&c| grid.is_traversable(c)));
                    }
                }
            }
        }
    }
}
