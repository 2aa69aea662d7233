//! Isometric projection between grid tiles and screen coordinates.
//!
//! Pure math, no state beyond the projection parameters. The inverse solves
//! the 2×2 linear system exactly and rounds to the nearest tile, so
//! `screen_to_tile(tile_to_screen(t)) == t` for every integer tile — this is
//! what makes click-to-tile and drag-to-tile feel precise.

use crate::types::{ClientConfig, TilePoint};

/// Projection parameters for one room view.
///
/// Replaced (or re-offset) when a new room template is loaded; the embedder
/// typically derives the origin from its viewport size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IsoProjection {
    /// Tile diamond width in pixels.
    pub tile_w: f32,
    /// Tile diamond height in pixels.
    pub tile_h: f32,
    /// Screen position of tile (0,0).
    pub origin_x: f32,
    pub origin_y: f32,
}

impl Default for IsoProjection {
    fn default() -> Self {
        Self {
            tile_w: 64.0,
            tile_h: 32.0,
            origin_x: 0.0,
            origin_y: 0.0,
        }
    }
}

impl IsoProjection {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            tile_w: config.tile_w,
            tile_h: config.tile_h,
            origin_x: config.origin_x,
            origin_y: config.origin_y,
        }
    }

    pub fn set_origin(&mut self, x: f32, y: f32) {
        self.origin_x = x;
        self.origin_y = y;
    }

    /// Project a tile onto the screen (centre of the tile diamond).
    pub fn tile_to_screen(&self, tile: TilePoint) -> (f32, f32) {
        let x = (tile.tx - tile.ty) as f32 * (self.tile_w / 2.0) + self.origin_x;
        let y = (tile.tx + tile.ty) as f32 * (self.tile_h / 2.0) + self.origin_y;
        (x, y)
    }

    /// Invert the projection, snapping to the nearest tile.
    pub fn screen_to_tile(&self, x: f32, y: f32) -> TilePoint {
        let a = (x - self.origin_x) / (self.tile_w / 2.0);
        let b = (y - self.origin_y) / (self.tile_h / 2.0);
        TilePoint::new(
            ((a + b) / 2.0).round() as i32,
            ((b - a) / 2.0).round() as i32,
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
