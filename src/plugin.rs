//! Bevy integration: obstacle events and the per-frame scheduler tick.
use bevy::{log, prelude::*};

use crate::request::PathRequestManager;

/// Sent by destructible terrain when the map tile at `tile` has been destroyed.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapObstacleBroken {
    pub tile: UVec2,
}

/// Applies [`MapObstacleBroken`] events and ticks the [`PathRequestManager`] once per frame.
///
/// The manager is a resource inserted when a level loads and removed when it unloads; both systems
/// do nothing while it is absent.
#[derive(Default)]
pub struct PathfindingPlugin;

impl Plugin for PathfindingPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<MapObstacleBroken>().add_systems(
            PreUpdate,
            (apply_obstacle_breaks, tick_path_requests)
                .chain()
                .in_set(PathingSet),
        );
    }
}

#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathingSet;

fn apply_obstacle_breaks(
    mut events: EventReader<MapObstacleBroken>,
    manager: Option<ResMut<PathRequestManager>>,
) {
    let Some(mut manager) = manager else {
        events.clear();
        return;
    };

    for event in events.read() {
        if let Err(err) = manager.on_map_obstacle_break(event.tile.x, event.tile.y) {
            log::debug!("Obstacle break skipped: {}", err);
        }
    }
}

fn tick_path_requests(manager: Option<ResMut<PathRequestManager>>) {
    if let Some(mut manager) = manager {
        manager.tick();
    }
}
