//! `RoomStateStore` — local authoritative-shadow of the room.
//!
//! Owns the room descriptor, the furniture collection and the player map.
//! All mutation goes through the commit operations here; the lifecycle
//! layer never holds separate copies. Locally-optimistic edits are applied
//! immediately and later either confirmed in place or overwritten by an
//! authoritative broadcast.

use std::collections::HashMap;

use crate::occupancy::OccupancyModel;
use crate::protocol::FurnitureRecord;
use crate::types::{FurnitureItem, FurnitureState, PlayerEntity, RoomDescriptor, TilePoint};

/// What applying a `FURNITURE_UPDATED` broadcast did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FurnitureChange {
    /// Unknown id — a fresh item was created.
    Created(String),
    /// The id already existed — coordinates were overwritten in place.
    /// This is what keeps server echoes of our own moves from producing
    /// duplicate entities.
    Moved(String),
    /// Record carried no usable identifier.
    Ignored,
}

#[derive(Default)]
pub struct RoomStateStore {
    room: Option<RoomDescriptor>,
    occupancy: OccupancyModel,
    furniture: HashMap<String, FurnitureItem>,
    players: HashMap<String, PlayerEntity>,
    self_name: String,
}

impl RoomStateStore {
    pub fn new(self_name: impl Into<String>) -> Self {
        Self {
            self_name: self_name.into(),
            ..Default::default()
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn room(&self) -> Option<&RoomDescriptor> {
        self.room.as_ref()
    }

    pub fn room_name(&self) -> Option<&str> {
        self.room.as_ref().map(|r| r.name.as_str())
    }

    pub fn is_current_room(&self, name: &str) -> bool {
        self.room_name() == Some(name)
    }

    pub fn occupancy(&self) -> &OccupancyModel {
        &self.occupancy
    }

    pub fn furniture(&self) -> impl Iterator<Item = &FurnitureItem> {
        self.furniture.values()
    }

    pub fn furniture_count(&self) -> usize {
        self.furniture.len()
    }

    pub fn get_furniture(&self, uid: &str) -> Option<&FurnitureItem> {
        self.furniture.get(uid)
    }

    pub fn player(&self, username: &str) -> Option<&PlayerEntity> {
        self.players.get(username)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn self_name(&self) -> &str {
        &self.self_name
    }

    // -----------------------------------------------------------------------
    // Room lifecycle
    // -----------------------------------------------------------------------

    /// Replace the current room wholesale. Furniture is torn down; players
    /// persist (the server re-announces presence through chat lines).
    pub fn load_room(&mut self, room: RoomDescriptor) {
        self.occupancy = OccupancyModel::for_room(&room);
        self.room = Some(room);
        self.furniture.clear();
        self.rebuild_blockers();
    }

    /// Replace the entire furniture collection (room furniture fetch or a
    /// `ROOM_STATE` resynchronization).
    pub fn replace_furniture(&mut self, records: Vec<FurnitureRecord>) -> usize {
        self.furniture.clear();
        for record in records {
            let Some(uid) = record.resolved_uid() else {
                log::warn!("furniture record without uid or id – skipped");
                continue;
            };
            let mut item = FurnitureItem::new(uid.clone(), record.resolved_proto(), record.tile());
            item.db_id = record.id;
            item.color = record.color;
            self.furniture.insert(uid, item);
        }
        self.rebuild_blockers();
        self.furniture.len()
    }

    /// Apply an incremental `FURNITURE_UPDATED` record.
    ///
    /// An item is matched by `uid` *or* by durable id — the two may
    /// coexist as aliases for the same piece. On match only the
    /// coordinates move; on miss a new item is created.
    pub fn apply_furniture_update(&mut self, record: &FurnitureRecord) -> FurnitureChange {
        let matched = self.find_alias(record);

        let change = if let Some(uid) = matched {
            let item = self.furniture.get_mut(&uid).expect("alias points at live item");
            item.tile = record.tile();
            if item.db_id.is_none() {
                item.db_id = record.id;
            }
            FurnitureChange::Moved(uid)
        } else {
            let Some(uid) = record.resolved_uid() else {
                log::warn!("furniture update without uid or id – ignored");
                return FurnitureChange::Ignored;
            };
            let mut item = FurnitureItem::new(uid.clone(), record.resolved_proto(), record.tile());
            item.db_id = record.id;
            item.color = record.color;
            self.furniture.insert(uid.clone(), item);
            FurnitureChange::Created(uid)
        };

        self.rebuild_blockers();
        change
    }

    fn find_alias(&self, record: &FurnitureRecord) -> Option<String> {
        if let Some(uid) = &record.uid {
            if self.furniture.contains_key(uid) {
                return Some(uid.clone());
            }
        }
        if let Some(id) = record.id {
            if let Some(item) = self.furniture.values().find(|f| f.db_id == Some(id)) {
                return Some(item.uid.clone());
            }
            let alias = format!("dbid_{id}");
            if self.furniture.contains_key(&alias) {
                return Some(alias);
            }
        }
        None
    }

    /// Insert a locally-created item (already committed to a tile).
    pub fn insert_local_furniture(&mut self, item: FurnitureItem) {
        self.furniture.insert(item.uid.clone(), item);
        self.rebuild_blockers();
    }

    // -----------------------------------------------------------------------
    // Furniture drag lifecycle
    // -----------------------------------------------------------------------

    /// Enter the dragging state. Fails if the item is unknown or already
    /// dragging. Blockers are rebuilt so a dragged wall piece stops
    /// blocking its own origin tile.
    pub fn begin_drag(&mut self, uid: &str) -> bool {
        let started = match self.furniture.get_mut(uid) {
            Some(item) if !item.is_dragging() => {
                item.state = FurnitureState::Dragging { origin: item.tile };
                true
            }
            _ => false,
        };
        if started {
            self.rebuild_blockers();
        }
        started
    }

    /// Track the drag ghost. The tentative tile only follows the pointer
    /// while it stays on the floor, so the last valid tile is what a drop
    /// commits to. Local-only — nothing is sent while dragging.
    pub fn drag_to(&mut self, uid: &str, tile: TilePoint) -> bool {
        if !self.occupancy.inside_room(tile) {
            return false;
        }
        match self.furniture.get_mut(uid) {
            Some(item) if item.is_dragging() => {
                item.tile = tile;
                true
            }
            _ => false,
        }
    }

    /// Commit a drop at `tile` and settle the item.
    pub fn commit_drop(&mut self, uid: &str, tile: TilePoint) -> bool {
        let committed = match self.furniture.get_mut(uid) {
            Some(item) if item.is_dragging() => {
                item.tile = tile;
                item.state = FurnitureState::Settled;
                true
            }
            _ => false,
        };
        if committed {
            self.rebuild_blockers();
        }
        committed
    }

    /// Abort a drag, restoring the pre-drag tile.
    pub fn revert_drag(&mut self, uid: &str) -> Option<TilePoint> {
        let origin = {
            let item = self.furniture.get_mut(uid)?;
            match item.state {
                FurnitureState::Dragging { origin } => {
                    item.tile = origin;
                    item.state = FurnitureState::Settled;
                    Some(origin)
                }
                FurnitureState::Settled => None,
            }
        };
        if origin.is_some() {
            self.rebuild_blockers();
        }
        origin
    }

    // -----------------------------------------------------------------------
    // Players
    // -----------------------------------------------------------------------

    /// Add a player. A second spawn for the same name is a no-op.
    pub fn spawn_player(&mut self, username: &str, tile: TilePoint) -> bool {
        if self.players.contains_key(username) {
            return false;
        }
        self.players
            .insert(username.to_string(), PlayerEntity::new(username, tile));
        true
    }

    /// Commit a movement intent: the logical tile moves immediately and the
    /// in-progress flag is raised. A move issued while one is already in
    /// progress supersedes it — at most one active intent per player.
    pub fn move_player(&mut self, username: &str, tile: TilePoint) -> bool {
        match self.players.get_mut(username) {
            Some(player) => {
                player.tile = tile;
                player.moving = true;
                true
            }
            None => false,
        }
    }

    /// Movement animation finished (reported by the renderer).
    pub fn finish_player_move(&mut self, username: &str) {
        if let Some(player) = self.players.get_mut(username) {
            player.moving = false;
        }
    }

    pub fn remove_player(&mut self, username: &str) -> bool {
        self.players.remove(username).is_some()
    }

    // -----------------------------------------------------------------------
    // Blockers
    // -----------------------------------------------------------------------

    /// Rebuild the occupancy blocker set from the wall ring and the settled
    /// furniture — the moral equivalent of redrawing the room.
    pub fn rebuild_blockers(&mut self) {
        self.occupancy.rebuild_blockers(self.furniture.values());
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn record(uid: Option<&str>, id: Option<i64>, tx: i32, ty: i32) -> FurnitureRecord {
        FurnitureRecord {
            uid: uid.map(str::to_string),
            id,
            proto_id: Some("chair".into()),
            name: None,
            sprite_path: None,
            tx,
            ty,
            rotation: None,
            scale: None,
            interactable: None,
            color: None,
        }
    }

    fn store_with_room() -> RoomStateStore {
        let mut store = RoomStateStore::new("You");
        store.load_room(RoomDescriptor::rect(1, "Lobby", 10, 10));
        store
    }

    // ---------------------------------------------------------------
    // Reconciliation
    // ---------------------------------------------------------------

    #[test]
    fn update_for_known_uid_moves_in_place() {
        let mut store = store_with_room();
        store.insert_local_furniture(FurnitureItem::new("f1", "chair", TilePoint::new(2, 2)));

        let change = store.apply_furniture_update(&record(Some("f1"), None, 5, 5));
        assert_eq!(change, FurnitureChange::Moved("f1".into()));
        assert_eq!(store.furniture_count(), 1, "no duplicate from the echo");
        assert_eq!(store.get_furniture("f1").unwrap().tile, TilePoint::new(5, 5));
    }

    #[test]
    fn update_for_unknown_uid_creates_exactly_one() {
        let mut store = store_with_room();
        let change = store.apply_furniture_update(&record(Some("f9"), None, 3, 3));
        assert_eq!(change, FurnitureChange::Created("f9".into()));
        assert_eq!(store.furniture_count(), 1);
    }

    #[test]
    fn update_matches_by_durable_id_alias() {
        let mut store = store_with_room();
        let mut item = FurnitureItem::new("f1", "chair", TilePoint::new(2, 2));
        item.db_id = Some(42);
        store.insert_local_furniture(item);

        // Echo comes back keyed only by the durable id.
        let change = store.apply_furniture_update(&record(None, Some(42), 6, 6));
        assert_eq!(change, FurnitureChange::Moved("f1".into()));
        assert_eq!(store.furniture_count(), 1);
        assert_eq!(store.get_furniture("f1").unwrap().tile, TilePoint::new(6, 6));
    }

    #[test]
    fn update_backfills_durable_id() {
        let mut store = store_with_room();
        store.insert_local_furniture(FurnitureItem::new("f1", "chair", TilePoint::new(2, 2)));
        store.apply_furniture_update(&record(Some("f1"), Some(7), 2, 2));
        assert_eq!(store.get_furniture("f1").unwrap().db_id, Some(7));
    }

    #[test]
    fn replace_furniture_tears_down_everything() {
        let mut store = store_with_room();
        store.insert_local_furniture(FurnitureItem::new("f1", "chair", TilePoint::new(2, 2)));
        store.insert_local_furniture(FurnitureItem::new("f2", "bed", TilePoint::new(3, 3)));

        let n = store.replace_furniture(vec![record(None, Some(1), 4, 4)]);
        assert_eq!(n, 1);
        assert_eq!(store.furniture_count(), 1);
        assert!(store.get_furniture("f1").is_none());
        assert!(store.get_furniture("dbid_1").is_some());
    }

    #[test]
    fn record_without_any_id_is_ignored() {
        let mut store = store_with_room();
        let change = store.apply_furniture_update(&record(None, None, 1, 1));
        assert_eq!(change, FurnitureChange::Ignored);
        assert_eq!(store.furniture_count(), 0);
    }

    // ---------------------------------------------------------------
    // Drag lifecycle
    // ---------------------------------------------------------------

    #[test]
    fn drag_commit_settles_at_new_tile() {
        let mut store = store_with_room();
        store.insert_local_furniture(FurnitureItem::new("f1", "chair", TilePoint::new(2, 2)));

        assert!(store.begin_drag("f1"));
        assert!(store.drag_to("f1", TilePoint::new(4, 4)));
        assert!(store.commit_drop("f1", TilePoint::new(4, 4)));

        let item = store.get_furniture("f1").unwrap();
        assert_eq!(item.tile, TilePoint::new(4, 4));
        assert!(!item.is_dragging());
    }

    #[test]
    fn drag_outside_room_does_not_move_tentative_tile() {
        let mut store = store_with_room();
        store.insert_local_furniture(FurnitureItem::new("f1", "chair", TilePoint::new(2, 2)));
        store.begin_drag("f1");
        assert!(!store.drag_to("f1", TilePoint::new(40, 40)));
        assert_eq!(store.get_furniture("f1").unwrap().tile, TilePoint::new(2, 2));
    }

    #[test]
    fn revert_restores_pre_drag_tile() {
        let mut store = store_with_room();
        store.insert_local_furniture(FurnitureItem::new("f1", "chair", TilePoint::new(2, 2)));
        store.begin_drag("f1");
        store.drag_to("f1", TilePoint::new(5, 5));

        assert_eq!(store.revert_drag("f1"), Some(TilePoint::new(2, 2)));
        let item = store.get_furniture("f1").unwrap();
        assert_eq!(item.tile, TilePoint::new(2, 2));
        assert!(!item.is_dragging());
    }

    #[test]
    fn begin_drag_twice_fails() {
        let mut store = store_with_room();
        store.insert_local_furniture(FurnitureItem::new("f1", "chair", TilePoint::new(2, 2)));
        assert!(store.begin_drag("f1"));
        assert!(!store.begin_drag("f1"));
    }

    // ---------------------------------------------------------------
    // Players
    // ---------------------------------------------------------------

    #[test]
    fn spawn_twice_is_noop() {
        let mut store = store_with_room();
        assert!(store.spawn_player("You", TilePoint::new(3, 7)));
        assert!(!store.spawn_player("You", TilePoint::new(0, 0)));
        assert_eq!(store.player("You").unwrap().tile, TilePoint::new(3, 7));
    }

    #[test]
    fn second_move_supersedes_from_logical_tile() {
        let mut store = store_with_room();
        store.spawn_player("You", TilePoint::new(3, 7));

        assert!(store.move_player("You", TilePoint::new(5, 5)));
        let p = store.player("You").unwrap();
        assert!(p.moving);
        assert_eq!(p.tile, TilePoint::new(5, 5), "logical tile moves immediately");

        // Mid-animation, a second intent supersedes the first.
        assert!(store.move_player("You", TilePoint::new(6, 6)));
        let p = store.player("You").unwrap();
        assert!(p.moving);
        assert_eq!(p.tile, TilePoint::new(6, 6));

        store.finish_player_move("You");
        assert!(!store.player("You").unwrap().moving);
    }

    #[test]
    fn room_load_clears_furniture_but_keeps_players() {
        let mut store = store_with_room();
        store.spawn_player("You", TilePoint::new(3, 7));
        store.insert_local_furniture(FurnitureItem::new("f1", "chair", TilePoint::new(2, 2)));

        store.load_room(RoomDescriptor::rect(2, "Cave", 8, 8));
        assert_eq!(store.furniture_count(), 0);
        assert_eq!(store.player_count(), 1);
        assert_eq!(store.room_name(), Some("Cave"));
    }
}
