//! The tile [`Map`] a level is loaded from.
use std::fmt;

use bevy::math::UVec2;
use ndarray::Array2;
use strum::EnumIter;
use thiserror::Error;

/// Terrain of a single map tile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TileType {
    #[default]
    Ground,
    WeakWall,
    StrongWall,
    Water,
    Ice,
    Woods,
    PlayerSpawn,
    EnemySpawn,
    BasePosition,
}

impl TileType {
    /// Character used for this tile by [`Map::parse`] and the [`Map`] `Display` impl.
    pub fn as_char(self) -> char {
        match self {
            TileType::Ground => '.',
            TileType::WeakWall => 'w',
            TileType::StrongWall => 'S',
            TileType::Water => '~',
            TileType::Ice => 'i',
            TileType::Woods => 'T',
            TileType::PlayerSpawn => 'P',
            TileType::EnemySpawn => 'E',
            TileType::BasePosition => 'B',
        }
    }

    pub fn from_char(c: char) -> Option<TileType> {
        let tile = match c {
            '.' => TileType::Ground,
            'w' => TileType::WeakWall,
            'S' => TileType::StrongWall,
            '~' => TileType::Water,
            'i' => TileType::Ice,
            'T' => TileType::Woods,
            'P' => TileType::PlayerSpawn,
            'E' => TileType::EnemySpawn,
            'B' => TileType::BasePosition,
            _ => return None,
        };

        Some(tile)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MapError {
    #[error("map has no tiles")]
    Empty,
    #[error("map must be square, got {width}x{height}")]
    NotSquare { width: usize, height: usize },
    #[error("row {row} has {len} tiles, expected {expected}")]
    RaggedRow {
        row: usize,
        len: usize,
        expected: usize,
    },
    #[error("unknown tile {tile:?} at row {row}, column {column}")]
    UnknownTile {
        tile: char,
        row: usize,
        column: usize,
    },
}

/// A square grid of [`TileType`]s indexed `[x, y]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Map {
    size: u32,
    tiles: Array2<TileType>,
}

impl Map {
    /// World units covered by one tile.
    pub const SCALE: f32 = 2.0;

    /// An all [`TileType::Ground`] map.
    ///
    /// # Panics
    /// When `size` is 0.
    pub fn new(size: u32) -> Self {
        assert!(size >= 1, "Map size must be at least 1");

        Map {
            size,
            tiles: Array2::from_elem((size as usize, size as usize), TileType::Ground),
        }
    }

    pub fn from_tiles(tiles: Array2<TileType>) -> Result<Self, MapError> {
        let (width, height) = tiles.dim();

        if width == 0 || height == 0 {
            return Err(MapError::Empty);
        }

        if width != height {
            return Err(MapError::NotSquare { width, height });
        }

        Ok(Map {
            size: width as u32,
            tiles,
        })
    }

    /// Parses a map drawn with [`TileType::as_char`] characters.
    /// The first line is the northern (highest `y`) row. Blank lines and surrounding whitespace are ignored.
    pub fn parse(text: &str) -> Result<Self, MapError> {
        let rows: Vec<Vec<char>> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| line.chars().collect())
            .collect();

        let height = rows.len();
        let width = rows.first().map(Vec::len).ok_or(MapError::Empty)?;

        if let Some((row, len)) = rows
            .iter()
            .map(Vec::len)
            .enumerate()
            .find(|&(_, len)| len != width)
        {
            return Err(MapError::RaggedRow {
                row,
                len,
                expected: width,
            });
        }

        if width != height {
            return Err(MapError::NotSquare { width, height });
        }

        let mut tiles = Array2::from_elem((width, height), TileType::Ground);
        for (row, line) in rows.iter().enumerate() {
            let y = height - 1 - row;
            for (column, &c) in line.iter().enumerate() {
                tiles[[column, y]] =
                    TileType::from_char(c).ok_or(MapError::UnknownTile { tile: c, row, column })?;
            }
        }

        Map::from_tiles(tiles)
    }

    /// The stock test level: bands of woods and walls across the middle, four water ponds,
    /// two enemy spawns, a player spawn and a walled-in base.
    pub fn mock(size: u32) -> Self {
        assert!(size >= 10, "Mock map size must be at least 10");

        let mut map = Map::new(size);
        let s = size;
        let y = s / 2;

        for x in 0..s {
            map.set_tile(x, y - 3, TileType::Woods);
            map.set_tile(x, y - 2, TileType::Woods);
            map.set_tile(x, y - 1, TileType::WeakWall);
            map.set_tile(x, y, TileType::WeakWall);
            map.set_tile(x, y + 1, TileType::StrongWall);
            map.set_tile(x, y + 2, TileType::StrongWall);
        }

        for (px, py) in [(3, 3), (s - 5, 3), (3, s - 5), (s - 5, s - 5)] {
            for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                map.set_tile(px + dx, py + dy, TileType::Water);
            }
        }

        map.set_tile(0, s - 2, TileType::EnemySpawn);
        map.set_tile(s - 2, s - 2, TileType::EnemySpawn);
        map.set_tile(s / 2 - 1, s / 4 - 1, TileType::PlayerSpawn);

        for yy in 0..4 {
            for xx in 0..4 {
                map.set_tile(xx + s / 2 - 2, yy, TileType::StrongWall);
            }
        }

        for (bx, by) in [(s / 2 - 1, 1), (s / 2, 1), (s / 2 - 1, 2), (s / 2, 2)] {
            map.set_tile(bx, by, TileType::BasePosition);
        }

        map
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn in_bounds(&self, x: u32, y: u32) -> bool {
        x < self.size && y < self.size
    }

    pub fn tile(&self, x: u32, y: u32) -> Option<TileType> {
        self.tiles.get([x as usize, y as usize]).copied()
    }

    pub fn set_tile(&mut self, x: u32, y: u32, tile: TileType) {
        if !self.in_bounds(x, y) {
            panic!("Attempted to set tile at out-of-bounds position ({x}, {y})");
        }

        self.tiles[[x as usize, y as usize]] = tile;
    }

    /// Positions of every tile of the given type, row by row from `y = 0`.
    pub fn positions_of(&self, tile: TileType) -> Vec<UVec2> {
        let mut positions = Vec::new();
        for y in 0..self.size {
            for x in 0..self.size {
                if self.tiles[[x as usize, y as usize]] == tile {
                    positions.push(UVec2::new(x, y));
                }
            }
        }

        positions
    }
}

impl fmt::Display for Map {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in (0..self.size as usize).rev() {
            for x in 0..self.size as usize {
                write!(f, "{}", self.tiles[[x, y]].as_char())?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}
