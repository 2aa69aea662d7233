//! Parlor — client-side sync engine for shared isometric rooms.
//!
//! Keeps an optimistically-updated local model of a persistent 2D room
//! (furniture + live players) consistent with an authoritative server over
//! a single duplex text socket that multiplexes correlated request/reply
//! calls, typed broadcast events, and an unframed legacy chat protocol.
//!
//! ## Architecture
//!
//! ```text
//! RoomClient  (client.rs)          ← aggregate, lifecycle operations
//!   ├── ConnectionSession (session.rs) ← send-or-drop, open state
//!   │     └── net.rs                   ← websocket reader/writer tasks
//!   ├── RequestCorrelator (correlate.rs) ← reqId matching + timeouts
//!   ├── router.rs                    ← frame classification
//!   └── RoomStateStore (store.rs)    ← room/furniture/players shadow
//!         ├── OccupancyModel (occupancy.rs) ← floor validity + blockers
//!         └── IsoProjection  (iso.rs)       ← tile ↔ screen transform
//! ```
//!
//! Wire shapes live in [`protocol`]; the semantic event stream the
//! embedding renderer consumes lives in [`events`].

pub mod correlate;
pub mod error;
pub mod events;
pub mod iso;
pub mod occupancy;
pub mod protocol;
pub mod router;
pub mod session;
pub mod store;
pub mod types;

pub mod client;

// Native transport requires the `net` feature.
#[cfg(feature = "net")]
pub mod net;

// Convenience re-exports
pub use client::RoomClient;
pub use error::ClientError;
pub use events::ClientEvent;
pub use iso::IsoProjection;
pub use occupancy::OccupancyModel;
pub use session::{ConnectionSession, SocketEvent};
pub use store::{FurnitureChange, RoomStateStore};
pub use types::{ClientConfig, FurnitureItem, PlayerEntity, RoomDescriptor, TilePoint};
