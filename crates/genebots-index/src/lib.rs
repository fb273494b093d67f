//! Occupancy indexing for the GeneBots grid world.
//!
//! The grid is a reverse lookup only: it maps a cell to the key of the entity standing
//! on it and never owns the entity itself.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors emitted by occupancy index construction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IndexError {
    /// Indicates configuration values that cannot be used (e.g., zero-sized grid).
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

/// Integer cell coordinates.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

impl GridPos {
    /// Construct a new cell coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Raw offset without any boundary handling.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// Dense `width * height` grid holding at most one key per cell.
#[derive(Debug, Clone)]
pub struct OccupancyGrid<K> {
    width: u32,
    height: u32,
    cells: Vec<Option<K>>,
}

impl<K: Copy + Eq> OccupancyGrid<K> {
    /// Create an empty grid.
    pub fn new(width: u32, height: u32) -> Result<Self, IndexError> {
        if width == 0 || height == 0 {
            return Err(IndexError::InvalidConfig(
                "grid dimensions must be non-zero",
            ));
        }
        if width > i32::MAX as u32 || height > i32::MAX as u32 {
            return Err(IndexError::InvalidConfig(
                "grid dimensions must fit in i32 coordinates",
            ));
        }
        Ok(Self {
            width,
            height,
            cells: vec![None; (width as usize) * (height as usize)],
        })
    }

    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Returns true when `pos` lies inside the grid.
    #[must_use]
    pub fn contains(&self, pos: GridPos) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as u32) < self.width && (pos.y as u32) < self.height
    }

    #[inline]
    fn offset_of(&self, pos: GridPos) -> Option<usize> {
        if self.contains(pos) {
            Some((pos.y as usize) * (self.width as usize) + (pos.x as usize))
        } else {
            None
        }
    }

    /// Key stored at `pos`; `None` for empty cells and anything outside the grid.
    #[must_use]
    pub fn get(&self, pos: GridPos) -> Option<K> {
        self.offset_of(pos).and_then(|idx| self.cells[idx])
    }

    /// Returns true if `pos` is inside the grid and unoccupied.
    #[must_use]
    pub fn is_vacant(&self, pos: GridPos) -> bool {
        self.offset_of(pos)
            .is_some_and(|idx| self.cells[idx].is_none())
    }

    /// Store `key` at `pos`, returning the previous occupant. Out-of-bounds writes are ignored.
    pub fn insert(&mut self, pos: GridPos, key: K) -> Option<K> {
        let idx = self.offset_of(pos)?;
        self.cells[idx].replace(key)
    }

    /// Clear `pos` only if it currently holds `key`.
    pub fn remove_if(&mut self, pos: GridPos, key: K) -> bool {
        match self.offset_of(pos) {
            Some(idx) if self.cells[idx] == Some(key) => {
                self.cells[idx] = None;
                true
            }
            _ => false,
        }
    }

    /// Move `key` from `from` to `to` in one operation.
    pub fn relocate(&mut self, key: K, from: GridPos, to: GridPos) {
        self.remove_if(from, key);
        self.insert(to, key);
    }

    /// Drop every occupant.
    pub fn clear(&mut self) {
        self.cells.fill(None);
    }

    /// Number of occupied cells.
    #[must_use]
    pub fn occupied(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_some()).count()
    }

    /// Iterate over `(position, key)` pairs for every occupied cell in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (GridPos, K)> + '_ {
        let width = self.width as usize;
        self.cells.iter().enumerate().filter_map(move |(idx, cell)| {
            cell.map(|key| {
                (
                    GridPos::new((idx % width) as i32, (idx / width) as i32),
                    key,
                )
            })
        })
    }

    /// Resolve a neighbouring cell: the left/right edges are solid walls, the top/bottom
    /// edges wrap around. Returns `None` when the step would cross a wall.
    #[must_use]
    pub fn neighbor(&self, pos: GridPos, dx: i32, dy: i32) -> Option<GridPos> {
        let target = pos.offset(dx, dy);
        if target.x < 0 || target.x >= self.width as i32 {
            return None;
        }
        let height = self.height as i32;
        Some(GridPos::new(target.x, target.y.rem_euclid(height)))
    }
}
