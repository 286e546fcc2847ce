//! This module contains the [`Grid`], the weighted node field every search runs over.
use std::sync::Arc;

use bevy::{
    log::{info, warn},
    math::{UVec2, Vec3},
};
use ndarray::{Array2, ArrayView1, ArrayView2, ArrayViewMut1, ArrayViewMut2, Axis, Zip};
use smallvec::SmallVec;
use thiserror::Error;

use crate::{
    dir::Dir,
    filter::{NeighborFilter, NoCornerClipping},
    map::Map,
    node::{Node, NodeType, Penalties},
    NodeId,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    #[error("tile ({x}, {y}) is outside the {size}x{size} map")]
    TileOutOfBounds { x: u32, y: u32, size: u32 },
}

/// Holder for internal grid settings. Build one with [`GridSettingsBuilder`].
#[derive(Clone, Debug)]
pub struct GridSettings(pub(crate) GridInternalSettings);

/// Builder for [`GridSettings`].
///
/// Example usage:
/// ```
/// use tank_pathing::prelude::*;
///
/// let settings = GridSettingsBuilder::new()
///     .resolution(3)
///     .edge_margin(2)
///     .blur_radius(2)
///     .build();
///
/// let grid = Grid::new(&Map::mock(32), &settings);
/// assert_eq!(grid.size(), 32 * 3 + 4);
/// ```
#[derive(Clone, Debug)]
pub struct GridSettingsBuilder {
    resolution: u32,
    edge_margin: u32,
    blur_radius: u32,
    tile_scale: f32,
    filters: Vec<Arc<dyn NeighborFilter + Send + Sync + 'static>>,
}

impl Default for GridSettingsBuilder {
    fn default() -> Self {
        GridSettingsBuilder {
            resolution: 3,
            edge_margin: 2,
            blur_radius: 2,
            tile_scale: Map::SCALE,
            filters: vec![Arc::new(NoCornerClipping)],
        }
    }
}

impl GridSettingsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pathfinding cells along each side of one map tile.
    /// Must be at least 1.
    pub fn resolution(mut self, resolution: u32) -> Self {
        if resolution < 1 {
            panic!("Resolution must be at least 1");
        }

        self.resolution = resolution;
        self
    }

    /// Width in cells of the impassable border around the map.
    pub fn edge_margin(mut self, edge_margin: u32) -> Self {
        self.edge_margin = edge_margin;
        self
    }

    /// Radius in cells of the box blur applied to the penalty fields. 0 disables smoothing.
    pub fn blur_radius(mut self, blur_radius: u32) -> Self {
        self.blur_radius = blur_radius;
        self
    }

    /// World units covered by one map tile.
    pub fn tile_scale(mut self, tile_scale: f32) -> Self {
        if !(tile_scale > 0.0) {
            panic!("Tile scale must be positive");
        }

        self.tile_scale = tile_scale;
        self
    }

    /// Adds a [`NeighborFilter`] applied when computing neighbors, after the ones already added.
    pub fn add_neighbor_filter<F>(mut self, filter: F) -> Self
    where
        F: NeighborFilter + Send + Sync + 'static,
    {
        self.filters.push(Arc::new(filter));
        self
    }

    /// Removes every neighbor filter, including the default [`NoCornerClipping`].
    pub fn clear_neighbor_filters(mut self) -> Self {
        self.filters.clear();
        self
    }

    pub fn build(self) -> GridSettings {
        GridSettings(GridInternalSettings {
            resolution: self.resolution,
            edge_margin: self.edge_margin,
            blur_radius: self.blur_radius,
            tile_scale: self.tile_scale,
            filters: self.filters,
        })
    }
}

impl Default for GridSettings {
    fn default() -> Self {
        GridSettingsBuilder::default().build()
    }
}

#[derive(Clone, Debug)]
pub(crate) struct GridInternalSettings {
    pub(crate) resolution: u32,
    pub(crate) edge_margin: u32,
    pub(crate) blur_radius: u32,
    pub(crate) tile_scale: f32,
    pub(crate) filters: Vec<Arc<dyn NeighborFilter + Send + Sync + 'static>>,
}

/// The pathfinding grid for one loaded level.
///
/// Every map tile is split into `resolution x resolution` nodes and the map is surrounded by
/// `edge_margin` rows of impassable nodes, so a side is `map_size * resolution + 2 * edge_margin` nodes long.
/// Nodes are indexed `[x, y]` with `y` following the world `z` axis.
#[derive(Debug, Clone)]
pub struct Grid {
    settings: GridInternalSettings,
    map_size: u32,
    size: u32,
    nodes: Array2<Node>,
}

impl Grid {
    /// Builds the grid for `map` and smooths its penalty fields.
    pub fn new(map: &Map, settings: &GridSettings) -> Self {
        let settings = settings.0.clone();
        let map_size = map.size();
        let size = map_size * settings.resolution + 2 * settings.edge_margin;

        let nodes = crate::timed!("Built grid nodes", {
            Array2::from_shape_fn((size as usize, size as usize), |(x, y)| {
                let pos = UVec2::new(x as u32, y as u32);
                match tile_for(pos, settings.resolution, settings.edge_margin, map_size)
                    .and_then(|tile| map.tile(tile.x, tile.y))
                {
                    Some(tile) => Node::from_tile(tile, pos),
                    None => Node::border(pos),
                }
            })
        });

        let mut grid = Grid {
            settings,
            map_size,
            size,
            nodes,
        };
        grid.blur_node_weights();

        info!(
            "Built {}x{} pathfinding grid from a {}x{} map",
            size, size, map_size, map_size
        );

        grid
    }

    /// Nodes along one side of the grid.
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn dimensions(&self) -> UVec2 {
        UVec2::splat(self.size)
    }

    /// Total number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Tiles along one side of the source map.
    pub fn map_size(&self) -> u32 {
        self.map_size
    }

    pub fn resolution(&self) -> u32 {
        self.settings.resolution
    }

    pub fn edge_margin(&self) -> u32 {
        self.settings.edge_margin
    }

    pub fn blur_radius(&self) -> u32 {
        self.settings.blur_radius
    }

    /// World units covered by one node.
    pub fn cell_size(&self) -> f32 {
        self.settings.tile_scale / self.settings.resolution as f32
    }

    /// Returns an [`ndarray::ArrayView2<Node>`] for read-only access to the grid data.
    pub fn view(&self) -> ArrayView2<Node> {
        self.nodes.view()
    }

    pub fn in_bounds(&self, pos: UVec2) -> bool {
        pos.x < self.size && pos.y < self.size
    }

    pub fn node(&self, pos: UVec2) -> Option<&Node> {
        self.nodes.get([pos.x as usize, pos.y as usize])
    }

    pub(crate) fn node_at(&self, id: NodeId) -> &Node {
        &self.nodes[self.index_to_array(id)]
    }

    pub fn index_of(&self, pos: UVec2) -> NodeId {
        pos.y as usize * self.size as usize + pos.x as usize
    }

    pub fn position_of(&self, id: NodeId) -> UVec2 {
        let size = self.size as usize;
        UVec2::new((id % size) as u32, (id / size) as u32)
    }

    fn index_to_array(&self, id: NodeId) -> [usize; 2] {
        let size = self.size as usize;
        [id % size, id / size]
    }

    /// The map tile a node was built from, `None` for border nodes.
    pub fn tile_of(&self, pos: UVec2) -> Option<UVec2> {
        tile_for(
            pos,
            self.settings.resolution,
            self.settings.edge_margin,
            self.map_size,
        )
    }

    /// Converts a world position to the index of the node containing it.
    /// Positions outside the grid are clamped to the nearest border node.
    pub fn node_index_from_world_point(&self, world: Vec3) -> UVec2 {
        let cell = self.cell_size();
        let margin = self.settings.edge_margin as i64;
        let max = self.size as i64 - 1;

        let to_index = |v: f32| {
            let index = (v / cell).floor() as i64 + margin;
            index.clamp(0, max) as u32
        };

        UVec2::new(to_index(world.x), to_index(world.z))
    }

    pub fn node_from_world_point(&self, world: Vec3) -> &Node {
        let pos = self.node_index_from_world_point(world);
        &self.nodes[[pos.x as usize, pos.y as usize]]
    }

    /// World position of a node's center, on the `y = 0` plane.
    pub fn node_world_position(&self, pos: UVec2) -> Vec3 {
        let cell = self.cell_size();
        let margin = self.settings.edge_margin as f32;

        Vec3::new(
            (pos.x as f32 - margin + 0.5) * cell,
            0.0,
            (pos.y as f32 - margin + 0.5) * cell,
        )
    }

    pub fn is_traversable(&self, pos: UVec2) -> bool {
        self.node(pos).is_some_and(|node| !node.is_impassable())
    }

    /// Returns the in-bounds neighbors of `pos` that pass every configured [`NeighborFilter`].
    /// Impassable neighbors are included; with the default [`NoCornerClipping`] filter a diagonal is
    /// only included when at least one of its two flanking cardinals is traversable.
    pub fn neighbors(&self, pos: UVec2) -> SmallVec<[UVec2; 8]> {
        let origin = pos.as_ivec2();
        let size = self.size as i32;

        let mut mask = 0u8;
        for dir in Dir::all() {
            let n = origin + dir.vector();
            if n.x >= 0 && n.y >= 0 && n.x < size && n.y < size {
                mask |= dir.bit();
            }
        }

        let view = self.nodes.view();
        for filter in self.settings.filters.iter() {
            mask = filter.filter(pos, mask, &view);
        }

        Dir::all()
            .filter(|dir| mask & dir.bit() != 0)
            .map(|dir| (origin + dir.vector()).as_uvec2())
            .collect()
    }

    /// Recomputes the smoothed penalties of every node from the raw penalties.
    ///
    /// Runs a separable box blur of `blur_radius` over both penalty fields. Impassable nodes keep
    /// their raw penalty.
    pub fn blur_node_weights(&mut self) {
        let radius = self.settings.blur_radius as usize;

        let break_walls = crate::timed!("Blurred break walls penalties", {
            box_blur(&self.nodes.map(|node| node.raw_penalties.break_walls), radius)
        });
        let drive_around = crate::timed!("Blurred drive around penalties", {
            box_blur(&self.nodes.map(|node| node.raw_penalties.drive_around), radius)
        });

        Zip::from(&mut self.nodes)
            .and(&break_walls)
            .and(&drive_around)
            .for_each(|node, &break_walls, &drive_around| {
                node.penalties = if node.is_impassable() {
                    node.raw_penalties
                } else {
                    Penalties::new(break_walls, drive_around)
                };
            });
    }

    /// Clears the breakable terrain of map tile (`tile_x`, `tile_y`) and re-blurs the penalty fields.
    ///
    /// All `resolution²` nodes of the tile become [`NodeType::Open`] with zero penalty.
    /// Impassable nodes are never changed.
    pub fn on_map_obstacle_break(&mut self, tile_x: u32, tile_y: u32) -> Result<(), GridError> {
        if tile_x >= self.map_size || tile_y >= self.map_size {
            warn!(
                "Ignoring obstacle break outside the map at ({}, {})",
                tile_x, tile_y
            );
            return Err(GridError::TileOutOfBounds {
                x: tile_x,
                y: tile_y,
                size: self.map_size,
            });
        }

        let resolution = self.settings.resolution;
        let min = UVec2::new(tile_x, tile_y) * resolution + UVec2::splat(self.settings.edge_margin);

        let mut opened = 0;
        for y in min.y..min.y + resolution {
            for x in min.x..min.x + resolution {
                if self.nodes[[x as usize, y as usize]].break_open() {
                    opened += 1;
                }
            }
        }

        self.blur_node_weights();

        info!(
            "Obstacle at tile ({}, {}) broken, opened {} nodes and re-blurred",
            tile_x, tile_y, opened
        );

        Ok(())
    }

    /// Number of nodes of each type, for debug overlays and tests.
    pub fn count(&self, node_type: NodeType) -> usize {
        self.nodes
            .iter()
            .filter(|node| node.node_type == node_type)
            .count()
    }
}

fn tile_for(pos: UVec2, resolution: u32, edge_margin: u32, map_size: u32) -> Option<UVec2> {
    let playable = map_size * resolution;
    if pos.x < edge_margin || pos.y < edge_margin {
        return None;
    }

    let local = pos - UVec2::splat(edge_margin);
    if local.x >= playable || local.y >= playable {
        return None;
    }

    Some(local / resolution)
}

/// Separable box blur of `field` with a `(2 * radius + 1)²` kernel, clamping at the edges.
/// Each pass keeps a running sum, so the cost does not depend on the radius.
pub(crate) fn box_blur(field: &Array2<u32>, radius: usize) -> Array2<u32> {
    if radius == 0 || field.is_empty() {
        return field.clone();
    }

    let mut horizontal = Array2::zeros(field.raw_dim());
    blur_lanes(field.view(), horizontal.view_mut(), Axis(0), radius);

    let mut vertical = Array2::zeros(field.raw_dim());
    blur_lanes(horizontal.view(), vertical.view_mut(), Axis(1), radius);

    let kernel = (2 * radius + 1) as f32;
    let area = kernel * kernel;
    vertical.mapv_into(|sum: u32| (sum as f32 / area).round() as u32)
}

fn blur_lanes(input: ArrayView2<u32>, mut output: ArrayViewMut2<u32>, axis: Axis, radius: usize) {
    let zip = Zip::from(output.lanes_mut(axis)).and(input.lanes(axis));

    #[cfg(feature = "parallel")]
    zip.par_for_each(|output, input| running_sum(input, output, radius));

    #[cfg(not(feature = "parallel"))]
    zip.for_each(|output, input| running_sum(input, output, radius));
}

fn running_sum(input: ArrayView1<u32>, mut output: ArrayViewMut1<u32>, radius: usize) {
    let len = input.len();
    if len == 0 {
        return;
    }

    let last = len as isize - 1;
    let radius = radius as isize;
    let sample = |i: isize| input[i.clamp(0, last) as usize];

    let mut sum: u32 = (-radius..=radius).map(sample).sum();
    output[0] = sum;

    for i in 1..len as isize {
        sum = sum - sample(i - radius - 1) + sample(i + radius);
        output[i as usize] = sum;
    }
}
