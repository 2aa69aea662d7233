//! Semantic events delivered to the embedding renderer/UI layer.
//!
//! The store is the source of truth the renderer reads from; these events
//! tell it *when* to look. Consumers receive them through the channel
//! returned by [`crate::client::RoomClient`] construction.

use crate::types::TilePoint;

/// A single semantic client event.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    // ------------------------------------------------------------------
    // Connection lifecycle
    // ------------------------------------------------------------------
    /// Socket closed or errored. No automatic reconnect follows.
    Disconnected { reason: String },

    // ------------------------------------------------------------------
    // Room lifecycle
    // ------------------------------------------------------------------
    /// A room template finished loading; the store now holds its
    /// descriptor and furniture.
    RoomLoaded {
        id: i64,
        name: String,
        cols: i32,
        rows: i32,
    },
    /// The entire furniture collection was replaced (full-state resync).
    FurnitureReplaced { count: usize },

    // ------------------------------------------------------------------
    // Furniture
    // ------------------------------------------------------------------
    FurnitureCreated { uid: String, tile: TilePoint },
    FurnitureMoved { uid: String, tile: TilePoint },

    // ------------------------------------------------------------------
    // Players
    // ------------------------------------------------------------------
    PlayerSpawned { username: String, tile: TilePoint },
    /// Logical position changed; the renderer interpolates the visual.
    PlayerMoved { username: String, tile: TilePoint },
    PlayerRemoved { username: String },

    // ------------------------------------------------------------------
    // Legacy text
    // ------------------------------------------------------------------
    /// Room chat line (either discipline may carry chat).
    Chat { from: String, text: String },
    /// Server status/log line (login results, join confirmations…).
    Status { line: String },
}
