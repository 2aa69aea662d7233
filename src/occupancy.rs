//! Tile occupancy: shape validity, wall derivation, and the blocker set.
//!
//! Movement and placement commands are validated against this model before
//! any state mutation or network send happens.

use std::collections::HashSet;

use crate::types::{FurnitureItem, RoomDescriptor, TilePoint};

/// Occupancy rules for one loaded room.
///
/// The blocker set is a side table rebuilt whenever the room is (re)loaded
/// or the furniture collection is replaced — wall tiles plus wall-class
/// furniture colliders.
#[derive(Debug, Clone, Default)]
pub struct OccupancyModel {
    cols: i32,
    rows: i32,
    mask: Option<Vec<Vec<u8>>>,
    blocked: HashSet<TilePoint>,
}

impl OccupancyModel {
    pub fn for_room(room: &RoomDescriptor) -> Self {
        Self {
            cols: room.cols,
            rows: room.rows,
            mask: room.mask.clone(),
            blocked: HashSet::new(),
        }
    }

    /// Is the tile part of the room's floor?
    ///
    /// With an explicit mask, a tile is valid iff it is within mask bounds
    /// and the mask value is 1; otherwise validity is the rectangular bound
    /// check.
    pub fn inside_room(&self, tile: TilePoint) -> bool {
        if let Some(mask) = &self.mask {
            if tile.ty < 0 || tile.ty as usize >= mask.len() {
                return false;
            }
            let row = &mask[tile.ty as usize];
            if tile.tx < 0 || tile.tx as usize >= row.len() {
                return false;
            }
            return row[tile.tx as usize] == 1;
        }
        tile.tx >= 0 && tile.ty >= 0 && tile.tx < self.cols && tile.ty < self.rows
    }

    /// Is the tile on the room boundary (wall ring)?
    ///
    /// Mask rooms degrade to the rectangular min/max rule here, which can
    /// miss boundary tiles of non-convex layouts.
    pub fn is_edge_tile(&self, tile: TilePoint) -> bool {
        self.inside_room(tile)
            && (tile.tx == 0
                || tile.ty == 0
                || tile.tx == self.cols - 1
                || tile.ty == self.rows - 1)
    }

    /// Rebuild the blocker set from wall tiles and the current furniture.
    pub fn rebuild_blockers<'a>(&mut self, furniture: impl Iterator<Item = &'a FurnitureItem>) {
        self.blocked.clear();
        for ty in 0..self.rows {
            for tx in 0..self.cols {
                let tile = TilePoint::new(tx, ty);
                if self.is_edge_tile(tile) {
                    self.blocked.insert(tile);
                }
            }
        }
        for item in furniture {
            if item.is_blocking() && !item.is_dragging() {
                self.blocked.insert(item.tile);
            }
        }
    }

    pub fn is_blocked(&self, tile: TilePoint) -> bool {
        self.blocked.contains(&tile)
    }

    /// Combined placement/movement check: on the floor and not blocked.
    pub fn allows(&self, tile: TilePoint) -> bool {
        self.inside_room(tile) && !self.is_blocked(tile)
    }

    pub fn blocker_count(&self) -> usize {
        self.blocked.len()
    }

    /// Clamp a tile into the rectangular bounds (used to snap the initial
    /// ghost position of a palette drag into the room).
    pub fn clamp(&self, tile: TilePoint) -> TilePoint {
        TilePoint::new(
            tile.tx.clamp(0, (self.cols - 1).max(0)),
            tile.ty.clamp(0, (self.rows - 1).max(0)),
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
