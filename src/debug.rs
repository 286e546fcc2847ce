//! This module contains some tools to help you debug your application.
//!
//! [`PathfindingDebugPlugin`] draws the pathfinding grid of the active [`PathRequestManager`] and every
//! [`Path`] component with [`Gizmos`].
use std::f32::consts::FRAC_PI_2;

use bevy::{color::palettes::css, prelude::*};

use crate::{
    node::{Node, NodeType, PathPreference},
    path::Path,
    request::PathRequestManager,
    MAX_PENALTY,
};

/// Debug [Gizmos] configuration
#[derive(Resource, Clone, Debug)]
pub struct PathfindingDebugConfig {
    pub draw_grid: bool,
    pub draw_paths: bool,
    /// Shade cells by their smoothed penalty for this preference instead of by node type.
    pub penalty: Option<PathPreference>,
    /// Height above the ground the overlay is drawn at.
    pub height: f32,
    pub path_color: Color,
}

impl Default for PathfindingDebugConfig {
    fn default() -> Self {
        PathfindingDebugConfig {
            draw_grid: true,
            draw_paths: true,
            penalty: Some(PathPreference::DriveAround),
            height: 0.05,
            path_color: Color::Srgba(css::RED),
        }
    }
}

#[derive(Clone, Default)]
pub struct PathfindingDebugPlugin {
    /// Debug gizmos configuration
    pub config: PathfindingDebugConfig,
}

impl Plugin for PathfindingDebugPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(self.config.clone())
            .add_systems(Update, (draw_debug_grid, draw_debug_paths));
    }
}

fn node_color(node: &Node, penalty: Option<PathPreference>) -> Color {
    match (node.node_type(), penalty) {
        (NodeType::Impassable, _) => Color::BLACK,
        (_, Some(preference)) => {
            let t = node.penalty(preference).min(MAX_PENALTY) as f32 / MAX_PENALTY as f32;
            Color::srgb(t, 1.0 - t, 0.0)
        }
        (NodeType::Open, None) => Color::Srgba(css::WHITE),
        (NodeType::Breakable, None) => Color::Srgba(css::ORANGE),
    }
}

fn draw_debug_grid(
    config: Res<PathfindingDebugConfig>,
    manager: Option<Res<PathRequestManager>>,
    mut gizmos: Gizmos,
) {
    if !config.draw_grid {
        return;
    }

    let Some(manager) = manager else {
        return;
    };

    let grid = manager.grid();
    // Slightly smaller than a cell so neighbors don't share edges.
    let size = Vec2::splat(grid.cell_size() * 0.9);
    let rotation = Quat::from_rotation_x(FRAC_PI_2);

    for node in grid.view().iter() {
        let center = grid.node_world_position(node.grid_position()) + Vec3::Y * config.height;
        gizmos.rect(
            Isometry3d::new(center, rotation),
            size,
            node_color(node, config.penalty),
        );
    }
}

fn draw_debug_paths(
    config: Res<PathfindingDebugConfig>,
    manager: Option<Res<PathRequestManager>>,
    query: Query<&Path>,
    mut gizmos: Gizmos,
) {
    if !config.draw_paths {
        return;
    }

    let radius = manager
        .map(|manager| manager.grid().cell_size() * 0.5)
        .unwrap_or(0.25);
    let lift = Vec3::Y * config.height * 2.0;
    let rotation = Quat::from_rotation_x(FRAC_PI_2);

    for path in query.iter() {
        gizmos.linestrip(path.points().iter().map(|&point| point + lift), config.path_color);

        if let Some(current) = path.current_point() {
            gizmos.circle(Isometry3d::new(current + lift, rotation), radius, config.path_color);
        }
    }
}
