//! Frame-throttled path request scheduling.
//!
//! [`PathRequestManager`] runs at most one search per tick. Requests are served in submission order,
//! the first one as soon as it is submitted if nothing ran this tick, the rest one per
//! [`PathRequestManager::tick`].
use std::{collections::VecDeque, fmt};

use bevy::{
    log,
    math::Vec3,
    prelude::Resource,
};
use thiserror::Error;

use crate::{
    grid::{Grid, GridError},
    node::PathPreference,
    path::Path,
    pathfind::PathFinder,
};

/// Receives the search result. `None` means the goal is currently unreachable.
pub type PathCallback = Box<dyn FnOnce(Option<Path>) + Send + Sync + 'static>;

/// Handle of a submitted request, increasing in submission order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl RequestId {
    pub fn get(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathRequestError {
    #[error("path request queue is full ({max} pending)")]
    QueueFull { max: usize },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PathRequestSettings {
    /// Maximum number of requests waiting for a tick. `None` is unbounded.
    pub max_pending: Option<usize>,
}

struct PathRequest {
    id: RequestId,
    start: Vec3,
    end: Vec3,
    preference: PathPreference,
    callback: PathCallback,
}

impl fmt::Debug for PathRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathRequest")
            .field("id", &self.id)
            .field("start", &self.start)
            .field("end", &self.end)
            .field("preference", &self.preference)
            .finish_non_exhaustive()
    }
}

/// Owns the level's [`Grid`] and serializes searches over it.
///
/// Inserting the resource loads a level, removing it unloads the level and drops every
/// queued request without calling it back.
#[derive(Resource, Debug)]
pub struct PathRequestManager {
    grid: Grid,
    finder: PathFinder,
    queue: VecDeque<PathRequest>,
    in_flight: bool,
    next_id: u64,
    settings: PathRequestSettings,
}

impl PathRequestManager {
    pub fn new(grid: Grid, settings: PathRequestSettings) -> Self {
        let finder = PathFinder::new(&grid);

        PathRequestManager {
            grid,
            finder,
            queue: VecDeque::new(),
            in_flight: false,
            next_id: 0,
            settings,
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn settings(&self) -> &PathRequestSettings {
        &self.settings
    }

    /// Requests waiting for a tick.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// True once a search ran this tick. Further requests wait for [`PathRequestManager::tick`].
    pub fn is_processing(&self) -> bool {
        self.in_flight
    }

    /// Queues a search from `start` to `end`, world positions with y ignored.
    ///
    /// If no search ran this tick the request is served immediately and `callback` is invoked before
    /// this returns.
    pub fn request_path<F>(
        &mut self,
        start: Vec3,
        end: Vec3,
        preference: PathPreference,
        callback: F,
    ) -> Result<RequestId, PathRequestError>
    where
        F: FnOnce(Option<Path>) + Send + Sync + 'static,
    {
        if let Some(max) = self.settings.max_pending {
            if self.in_flight && self.queue.len() >= max {
                log::warn!(
                    "Dropping path request {:?} -> {:?}, {} requests already pending",
                    start,
                    end,
                    max
                );
                return Err(PathRequestError::QueueFull { max });
            }
        }

        let id = RequestId(self.next_id);
        self.next_id += 1;

        log::debug!("Path request {:?} queued: {:?} -> {:?}", id, start, end);

        self.queue.push_back(PathRequest {
            id,
            start,
            end,
            preference,
            callback: Box::new(callback),
        });

        self.try_process_next();
        Ok(id)
    }

    /// Removes a request that hasn't been served yet. Its callback is dropped without being called.
    ///
    /// Returns `false` if the request already ran or was never submitted.
    pub fn cancel(&mut self, id: RequestId) -> bool {
        let Some(index) = self.queue.iter().position(|request| request.id == id) else {
            return false;
        };

        self.queue.remove(index);
        log::debug!("Path request {:?} cancelled", id);
        true
    }

    /// Marks a frame boundary and serves the next queued request, if any.
    pub fn tick(&mut self) {
        self.in_flight = false;
        self.try_process_next();
    }

    /// Forwards to [`Grid::on_map_obstacle_break`]. Later searches see the updated penalties.
    pub fn on_map_obstacle_break(&mut self, tile_x: u32, tile_y: u32) -> Result<(), GridError> {
        self.grid.on_map_obstacle_break(tile_x, tile_y)
    }

    fn try_process_next(&mut self) {
        if self.in_flight {
            return;
        }

        let Some(request) = self.queue.pop_front() else {
            return;
        };

        self.in_flight = true;

        let path = self
            .finder
            .find_path(&self.grid, request.start, request.end, request.preference);

        log::debug!(
            "Path request {:?} served, found: {}",
            request.id,
            path.is_some()
        );

        (request.callback)(path);
    }
}
