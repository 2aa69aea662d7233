//! Core room types shared across all modules.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Tile addressing
// ---------------------------------------------------------------------------

/// One discrete cell of a room's logical grid.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct TilePoint {
    pub tx: i32,
    pub ty: i32,
}

impl TilePoint {
    pub fn new(tx: i32, ty: i32) -> Self {
        Self { tx, ty }
    }
}

impl std::fmt::Display for TilePoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{})", self.tx, self.ty)
    }
}

// ---------------------------------------------------------------------------
// Room descriptor
// ---------------------------------------------------------------------------

/// Shape and identity of the currently loaded room.
///
/// Immutable once loaded — switching rooms replaces the whole descriptor.
/// `mask`, when present, overrides rectangular-bounds occupancy (row-major
/// 0/1, indexed `mask[ty][tx]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomDescriptor {
    pub id: i64,
    pub name: String,
    pub cols: i32,
    pub rows: i32,
    pub mask: Option<Vec<Vec<u8>>>,
}

impl RoomDescriptor {
    /// A rectangular room with no explicit tile mask.
    pub fn rect(id: i64, name: impl Into<String>, cols: i32, rows: i32) -> Self {
        Self {
            id,
            name: name.into(),
            cols,
            rows,
            mask: None,
        }
    }

    /// The 10×10 placeholder used when a room is joined by name before its
    /// template has been fetched.
    pub fn unloaded(name: impl Into<String>) -> Self {
        Self::rect(-1, name, 10, 10)
    }

    pub fn center(&self) -> TilePoint {
        TilePoint::new(self.cols / 2, self.rows / 2)
    }
}

// ---------------------------------------------------------------------------
// Furniture
// ---------------------------------------------------------------------------

/// Lifecycle state of one furniture item.
///
/// `Dragging` positions are local-only and never sent to the peer; `origin`
/// is the settled tile to revert to if the drop is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FurnitureState {
    Settled,
    Dragging { origin: TilePoint },
}

#[derive(Debug, Clone)]
pub struct FurnitureItem {
    /// Stable identifier. Client-generated (`f…`) for local creations,
    /// `dbid_<id>` for records that arrived with only a durable server id.
    pub uid: String,
    /// Durable server id, once the server has assigned one.
    pub db_id: Option<i64>,
    pub proto_id: String,
    pub tile: TilePoint,
    pub color: Option<u32>,
    pub state: FurnitureState,
}

impl FurnitureItem {
    pub fn new(uid: impl Into<String>, proto_id: impl Into<String>, tile: TilePoint) -> Self {
        Self {
            uid: uid.into(),
            db_id: None,
            proto_id: proto_id.into(),
            tile,
            color: None,
            state: FurnitureState::Settled,
        }
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, FurnitureState::Dragging { .. })
    }

    /// Wall-class furniture blocks its tile for movement and placement.
    pub fn is_blocking(&self) -> bool {
        self.proto_id.contains("wall")
    }
}

// ---------------------------------------------------------------------------
// Players
// ---------------------------------------------------------------------------

/// A live participant in the room.
///
/// While `moving` is true the *logical* tile already reflects the movement
/// destination, even though the visual position is still interpolating.
/// A second move command issued mid-animation therefore targets the correct
/// origin.
#[derive(Debug, Clone)]
pub struct PlayerEntity {
    pub username: String,
    pub tile: TilePoint,
    pub moving: bool,
}

impl PlayerEntity {
    pub fn new(username: impl Into<String>, tile: TilePoint) -> Self {
        Self {
            username: username.into(),
            tile,
            moving: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Client config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Websocket URL of the room server.
    pub server_url: String,
    /// Username attributed to the self player.
    pub username: String,
    /// Room to join on connect.
    pub room: String,
    /// Isometric tile footprint in pixels.
    pub tile_w: f32,
    pub tile_h: f32,
    /// Screen offset of tile (0,0).
    pub origin_x: f32,
    pub origin_y: f32,
    /// Deadline for correlated request/response calls.
    pub request_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "ws://localhost:9001".into(),
            username: "You".into(),
            room: "Lobby".into(),
            tile_w: 64.0,
            tile_h: 32.0,
            origin_x: 0.0,
            origin_y: 50.0,
            request_timeout_ms: 5000,
        }
    }
}
