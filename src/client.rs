//! `RoomClient` — the aggregate that owns one connection's worth of state.
//!
//! ## Control flow
//!
//! ```text
//! UI gesture (click / drag / chat)
//!   RoomClient method
//!     validates via OccupancyModel + IsoProjection
//!     commits through RoomStateStore
//!     sends a typed command through ConnectionSession
//!
//! inbound socket frame
//!   pump task (one per connection, delivery order preserved)
//!     router::classify
//!       reply  → RequestCorrelator
//!       event  → RoomStateStore reconciliation
//!       text   → status log / chat event
//! ```
//!
//! The store is the single source of truth the renderer reads from;
//! [`ClientEvent`]s tell it when to look. All shared state sits behind a
//! `parking_lot::Mutex` — mutation happens on one UI call or one inbound
//! frame at a time, never concurrently mid-operation.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::correlate::{IdGenerator, RequestCorrelator};
use crate::error::{ClientError, Result};
use crate::events::ClientEvent;
use crate::iso::IsoProjection;
use crate::protocol::{legacy, Command, Event, FurnitureRecord, TemplateRecord, TemplateSummary};
use crate::router::{self, Inbound};
use crate::session::{ConnectionSession, SocketEvent};
use crate::store::{FurnitureChange, RoomStateStore};
use crate::types::{ClientConfig, FurnitureItem, RoomDescriptor, TilePoint};

pub struct RoomClient {
    config: ClientConfig,
    session: ConnectionSession,
    correlator: RequestCorrelator,
    store: Mutex<RoomStateStore>,
    projection: Mutex<IsoProjection>,
    uids: IdGenerator,
    events: mpsc::UnboundedSender<ClientEvent>,
}

impl RoomClient {
    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    /// Build a client over an existing session (tests and embedders that
    /// bring their own transport). The returned receiver carries the
    /// semantic event stream.
    pub fn new(
        config: ClientConfig,
        session: ConnectionSession,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<ClientEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let store = RoomStateStore::new(config.username.clone());
        let projection = IsoProjection::from_config(&config);
        let client = Arc::new(Self {
            config,
            session,
            correlator: RequestCorrelator::new(),
            store: Mutex::new(store),
            projection: Mutex::new(projection),
            uids: IdGenerator::new(),
            events: events_tx,
        });
        (client, events_rx)
    }

    /// Connect to the configured server and start the frame pump.
    #[cfg(feature = "net")]
    pub async fn connect(
        config: ClientConfig,
    ) -> anyhow::Result<(Arc<Self>, mpsc::UnboundedReceiver<ClientEvent>)> {
        let (session, socket_rx) = crate::net::connect(&config.server_url).await?;
        let (client, events_rx) = Self::new(config, session);
        client.spawn_pump(socket_rx);
        Ok((client, events_rx))
    }

    /// Spawn the inbound pump: a single consumer task, so frames are
    /// processed exactly in the order the transport delivered them.
    pub fn spawn_pump(self: &Arc<Self>, mut socket_rx: mpsc::UnboundedReceiver<SocketEvent>) {
        let client = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(event) = socket_rx.recv().await {
                let closed = matches!(event, SocketEvent::Closed { .. });
                client.handle_socket_event(event);
                if closed {
                    break;
                }
            }
        });
    }

    // -----------------------------------------------------------------------
    // Inbound dispatch
    // -----------------------------------------------------------------------

    pub fn handle_socket_event(&self, event: SocketEvent) {
        match event {
            SocketEvent::Frame(raw) => self.handle_frame(&raw),
            SocketEvent::Closed { reason } => {
                log::warn!("socket closed: {reason}");
                self.session.mark_closed();
                // Fail outstanding calls now rather than letting them time
                // out silently.
                self.correlator.reject_all(&reason);
                self.emit(ClientEvent::Disconnected { reason });
            }
        }
    }

    /// Classify and dispatch one inbound text frame.
    pub fn handle_frame(&self, raw: &str) {
        match router::classify(raw) {
            Inbound::Reply { req_id, data } => {
                self.correlator.resolve(&req_id, data);
            }
            Inbound::Event(event) => self.apply_event(event),
            Inbound::Status(line) => {
                log::info!("server: {line}");
                self.emit(ClientEvent::Status { line });
            }
            Inbound::Chat { from, text } => {
                self.emit(ClientEvent::Chat { from, text });
            }
            Inbound::Ignored => {}
        }
    }

    fn apply_event(&self, event: Event) {
        match event {
            Event::RoomTemplates { data } => {
                log::debug!("room template list broadcast ({} entries)", data.len());
            }
            Event::RoomTemplate { .. } => {
                // Template details only matter as correlated replies.
            }
            Event::RoomFurniture { data } => {
                let count = self.store.lock().replace_furniture(data);
                self.emit(ClientEvent::FurnitureReplaced { count });
            }
            Event::RoomState { room, furniture } => {
                let mut store = self.store.lock();
                if !store.is_current_room(&room) {
                    log::debug!("ignoring ROOM_STATE for other room '{room}'");
                    return;
                }
                let count = store.replace_furniture(furniture);
                drop(store);
                log::info!("room state resynced from server ({count} items)");
                self.emit(ClientEvent::FurnitureReplaced { count });
            }
            Event::FurnitureUpdated { room, furniture } => {
                let mut store = self.store.lock();
                if !store.is_current_room(&room) {
                    return;
                }
                let change = store.apply_furniture_update(&furniture);
                drop(store);
                match change {
                    FurnitureChange::Moved(uid) => {
                        self.emit(ClientEvent::FurnitureMoved {
                            uid,
                            tile: furniture.tile(),
                        });
                    }
                    FurnitureChange::Created(uid) => {
                        self.emit(ClientEvent::FurnitureCreated {
                            uid,
                            tile: furniture.tile(),
                        });
                    }
                    FurnitureChange::Ignored => {}
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Correlated calls
    // -----------------------------------------------------------------------

    /// Issue a correlated request and await its reply `data`.
    ///
    /// Replies may resolve out of issuance order; each call only ever sees
    /// its own. Fails fast when the session is not open.
    pub async fn call(&self, command: Command) -> Result<Value> {
        if !self.session.is_open() {
            return Err(ClientError::NotConnected);
        }
        let req_id = self.correlator.next_req_id();
        let mut payload = serde_json::to_value(&command)?;
        payload["reqId"] = Value::String(req_id.clone());

        let rx = self.correlator.register(&req_id);
        self.session.send(&payload.to_string());

        let deadline = Duration::from_millis(self.config.request_timeout_ms);
        self.correlator.wait(req_id, rx, deadline).await
    }

    /// Send a fire-and-forget typed command.
    pub fn send_command(&self, command: &Command) {
        match serde_json::to_string(command) {
            Ok(frame) => self.session.send(&frame),
            Err(e) => log::warn!("failed to serialize command: {e}"),
        }
    }

    // -----------------------------------------------------------------------
    // Room loading
    // -----------------------------------------------------------------------

    pub async fn fetch_room_templates(&self) -> Result<Vec<TemplateSummary>> {
        let data = self.call(Command::GetRoomTemplates).await?;
        Ok(serde_json::from_value(data)?)
    }

    /// Load a room template: fetch its record, replace the room descriptor
    /// (mask layouts included), then hydrate the furniture collection.
    pub async fn load_room_template(&self, template_id: i64) -> Result<()> {
        let data = self.call(Command::GetRoomTemplate { template_id }).await?;
        let template: TemplateRecord = serde_json::from_value(data)?;

        let descriptor = RoomDescriptor {
            id: template.id,
            name: template.name.clone(),
            cols: template.width.unwrap_or(10),
            rows: template.height.unwrap_or(10),
            mask: template.layout(),
        };
        let (id, name, cols, rows) = (
            descriptor.id,
            descriptor.name.clone(),
            descriptor.cols,
            descriptor.rows,
        );
        self.store.lock().load_room(descriptor);

        let data = self.call(Command::GetRoomFurniture { room_id: id }).await?;
        let records: Vec<FurnitureRecord> = match serde_json::from_value(data) {
            Ok(records) => records,
            Err(e) => {
                log::warn!("unreadable furniture list for room '{name}': {e}");
                Vec::new()
            }
        };
        let count = self.store.lock().replace_furniture(records);

        log::info!("loaded room template '{name}' ({cols}x{rows}, {count} items)");
        self.emit(ClientEvent::RoomLoaded {
            id,
            name,
            cols,
            rows,
        });
        Ok(())
    }

    /// Join a room by name over the legacy protocol and subscribe to its
    /// broadcasts. Until a template is loaded the room gets the default
    /// 10×10 rectangular shape.
    pub fn join_room(&self, room: &str) {
        self.session.send(&legacy::join(room));
        self.send_command(&Command::SubscribeRoom { room: room.into() });
        self.store.lock().load_room(RoomDescriptor::unloaded(room));
        self.emit(ClientEvent::RoomLoaded {
            id: -1,
            name: room.to_string(),
            cols: 10,
            rows: 10,
        });
    }

    pub fn leave_room(&self) {
        self.session.send(&legacy::leave());
    }

    // -----------------------------------------------------------------------
    // Legacy account / chat surface
    // -----------------------------------------------------------------------

    pub fn login(&self, username: &str, password: &str) {
        self.session.send(&legacy::login(username, password));
    }

    pub fn register_account(&self, username: &str, email: &str, password: &str) {
        self.session.send(&legacy::register(username, email, password));
    }

    pub fn check_email(&self, email: &str) {
        self.session.send(&legacy::check_email(email));
    }

    pub fn check_username(&self, username: &str) {
        self.session.send(&legacy::check_username(username));
    }

    /// Admin command: disconnect another user.
    pub fn kick(&self, username: &str) {
        self.session.send(&legacy::kick(username));
    }

    /// Room chat goes out as raw text — no framing at all.
    pub fn send_chat(&self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        self.session.send(text);
    }

    // -----------------------------------------------------------------------
    // Player movement (EntityLifecycle)
    // -----------------------------------------------------------------------

    /// Spawn the self player. Usually called once after connect.
    pub fn spawn_self(&self, tile: TilePoint) {
        let mut store = self.store.lock();
        let name = store.self_name().to_string();
        if store.spawn_player(&name, tile) {
            drop(store);
            self.emit(ClientEvent::PlayerSpawned {
                username: name,
                tile,
            });
        }
    }

    pub fn spawn_player(&self, username: &str, tile: TilePoint) {
        if self.store.lock().spawn_player(username, tile) {
            self.emit(ClientEvent::PlayerSpawned {
                username: username.to_string(),
                tile,
            });
        }
    }

    pub fn remove_player(&self, username: &str) {
        if self.store.lock().remove_player(username) {
            self.emit(ClientEvent::PlayerRemoved {
                username: username.to_string(),
            });
        }
    }

    /// Move any player's logical position (no network send).
    ///
    /// Rejected without mutation when the target tile is outside the room
    /// or blocked; a move issued mid-animation supersedes the previous
    /// intent from the logical tile.
    pub fn move_player(&self, username: &str, tile: TilePoint) -> bool {
        let mut store = self.store.lock();
        if !store.occupancy().allows(tile) {
            log::info!("cannot move {username} to {tile}: outside room or blocked");
            return false;
        }
        if !store.move_player(username, tile) {
            return false;
        }
        drop(store);
        self.emit(ClientEvent::PlayerMoved {
            username: username.to_string(),
            tile,
        });
        true
    }

    /// Handle a tile click: optimistically walk the self player there and
    /// notify the server. No mutation and no send when the tile fails
    /// occupancy.
    pub fn click_tile(&self, tile: TilePoint) -> bool {
        let (room, name) = {
            let store = self.store.lock();
            let Some(room) = store.room_name() else {
                return false;
            };
            (room.to_string(), store.self_name().to_string())
        };
        if !self.move_player(&name, tile) {
            return false;
        }
        self.send_command(&Command::TileClick {
            room,
            tx: tile.tx,
            ty: tile.ty,
        });
        true
    }

    /// Screen-space variant of [`Self::click_tile`].
    pub fn click_screen(&self, x: f32, y: f32) -> bool {
        let tile = self.projection.lock().screen_to_tile(x, y);
        self.click_tile(tile)
    }

    /// The renderer reports that a walk animation finished.
    pub fn finish_player_move(&self, username: &str) {
        self.store.lock().finish_player_move(username);
    }

    // -----------------------------------------------------------------------
    // Furniture lifecycle (EntityLifecycle)
    // -----------------------------------------------------------------------

    /// Create a new furniture item at `tile` (the drop end of a palette
    /// drag). Commits locally and sends `CREATE_FURNITURE`; returns the new
    /// uid, or `None` if the tile fails occupancy (ghost discarded).
    pub fn place_furniture(
        &self,
        proto_id: &str,
        tile: TilePoint,
        color: Option<u32>,
    ) -> Option<String> {
        let mut store = self.store.lock();
        let room = store.room_name()?.to_string();
        if !store.occupancy().allows(tile) {
            log::info!("cannot place {proto_id} at {tile}: outside room or blocked");
            return None;
        }
        let uid = self.uids.next("f");
        let mut item = FurnitureItem::new(uid.clone(), proto_id, tile);
        item.color = color;
        store.insert_local_furniture(item);
        drop(store);

        self.emit(ClientEvent::FurnitureCreated {
            uid: uid.clone(),
            tile,
        });
        self.send_command(&Command::CreateFurniture {
            room,
            uid: uid.clone(),
            proto_id: proto_id.to_string(),
            tx: tile.tx,
            ty: tile.ty,
            color,
        });
        log::info!("placed {proto_id} at {tile}");
        Some(uid)
    }

    /// Start dragging an existing item. Local-only until the drop.
    pub fn start_drag(&self, uid: &str) -> bool {
        self.store.lock().begin_drag(uid)
    }

    /// Track the drag ghost; the tentative tile follows the pointer only
    /// while it stays on the floor.
    pub fn drag_to(&self, uid: &str, tile: TilePoint) -> bool {
        self.store.lock().drag_to(uid, tile)
    }

    /// Screen-space variant of [`Self::drag_to`].
    pub fn drag_to_screen(&self, uid: &str, x: f32, y: f32) -> bool {
        let tile = self.projection.lock().screen_to_tile(x, y);
        self.drag_to(uid, tile)
    }

    /// Drop a dragged item at `tile`.
    ///
    /// A valid target commits locally and sends `UPDATE_FURNITURE`; a tile
    /// that fails occupancy reverts the item to its pre-drag tile with no
    /// network send.
    pub fn drop_furniture(&self, uid: &str, tile: TilePoint) -> bool {
        let mut store = self.store.lock();
        let Some(room) = store.room_name().map(str::to_string) else {
            store.revert_drag(uid);
            return false;
        };
        if !store.get_furniture(uid).is_some_and(|f| f.is_dragging()) {
            return false;
        }
        if !store.occupancy().allows(tile) {
            if let Some(origin) = store.revert_drag(uid) {
                log::info!("drop rejected at {tile} – reverting {uid} to {origin}");
            }
            return false;
        }
        store.commit_drop(uid, tile);
        drop(store);

        self.emit(ClientEvent::FurnitureMoved {
            uid: uid.to_string(),
            tile,
        });
        self.send_command(&Command::UpdateFurniture {
            room,
            uid: uid.to_string(),
            tx: tile.tx,
            ty: tile.ty,
        });
        true
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_open()
    }

    /// Shared store handle — the renderer reads world state from here.
    pub fn store(&self) -> &Mutex<RoomStateStore> {
        &self.store
    }

    pub fn projection(&self) -> IsoProjection {
        *self.projection.lock()
    }

    /// Re-anchor the projection (e.g. after a viewport resize or room
    /// load).
    pub fn set_view_origin(&self, x: f32, y: f32) {
        self.projection.lock().set_origin(x, y);
    }

    pub fn pending_requests(&self) -> usize {
        self.correlator.pending_count()
    }

    fn emit(&self, event: ClientEvent) {
        // A dropped receiver just means nobody is rendering.
        let _ = self.events.send(event);
    }
}
