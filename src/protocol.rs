//! Room server wire protocol.
//!
//! This module owns **every message that crosses the socket boundary**
//! between the client and the room server.
//!
//! ## Message disciplines
//!
//! One text-frame socket multiplexes three disciplines:
//!
//! | Discipline        | Framing        | Direction       | Matched by        |
//! |-------------------|----------------|-----------------|-------------------|
//! | correlated call   | JSON + `reqId` | request/reply   | `reqId` echo      |
//! | typed broadcast   | JSON + `type`  | server → client | `type` tag        |
//! | legacy text       | none           | both            | leading glyph / `:` |
//!
//! ## Design rules
//!
//! 1. Field spellings match the wire exactly (`reqId`, `templateId`,
//!    `roomId`, `proto_id`) — the server predates this client.
//! 2. Any JSON frame carrying `reqId` is a correlated reply, never a
//!    broadcast, regardless of `type`.
//! 3. Optional fields are enumerated here and validated at the router
//!    boundary, not inside the state store.

use serde::{Deserialize, Serialize};

use crate::types::TilePoint;

// ---------------------------------------------------------------------------
// Outbound commands (client → server, JSON)
// ---------------------------------------------------------------------------

/// A typed outbound command.
///
/// Correlated requests get their `reqId` attached by the correlator after
/// serialization; fire-and-forget commands are sent as-is.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    /// Reply data: sequence of [`TemplateSummary`].
    GetRoomTemplates,
    /// Reply data: one [`TemplateRecord`].
    GetRoomTemplate {
        #[serde(rename = "templateId")]
        template_id: i64,
    },
    /// Reply data: sequence of [`FurnitureRecord`].
    GetRoomFurniture {
        #[serde(rename = "roomId")]
        room_id: i64,
    },
    SubscribeRoom {
        room: String,
    },
    TileClick {
        room: String,
        tx: i32,
        ty: i32,
    },
    CreateFurniture {
        room: String,
        uid: String,
        proto_id: String,
        tx: i32,
        ty: i32,
        #[serde(skip_serializing_if = "Option::is_none")]
        color: Option<u32>,
    },
    UpdateFurniture {
        room: String,
        uid: String,
        tx: i32,
        ty: i32,
    },
}

// ---------------------------------------------------------------------------
// Inbound broadcast events (server → client, JSON)
// ---------------------------------------------------------------------------

/// A typed broadcast event. Unrecognized `type` tags fail deserialization
/// and are logged and ignored by the router.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Event {
    RoomTemplates {
        #[serde(default)]
        data: Vec<TemplateSummary>,
    },
    RoomTemplate {
        #[serde(default)]
        data: Option<TemplateRecord>,
    },
    RoomFurniture {
        #[serde(default)]
        data: Vec<FurnitureRecord>,
    },
    /// Full-state resynchronization: replaces the entire furniture
    /// collection of the named room.
    RoomState {
        room: String,
        #[serde(default)]
        furniture: Vec<FurnitureRecord>,
    },
    /// Incremental update, including server echoes of this client's own
    /// `CREATE_FURNITURE` / `UPDATE_FURNITURE` commands.
    FurnitureUpdated {
        room: String,
        furniture: FurnitureRecord,
    },
}

// ---------------------------------------------------------------------------
// Reply payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateSummary {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateRecord {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub width: Option<i32>,
    #[serde(default)]
    pub height: Option<i32>,
    #[serde(default)]
    pub skew_angle: Option<f32>,
    /// String-encoded `{"tiles": [[0|1,…],…]}`; absent for plain
    /// rectangular rooms.
    #[serde(default)]
    pub default_layout_json: Option<String>,
}

impl TemplateRecord {
    /// Decode the embedded layout mask, if any.
    ///
    /// Invalid layout JSON is logged and treated as absent — the room then
    /// falls back to rectangular bounds.
    pub fn layout(&self) -> Option<Vec<Vec<u8>>> {
        let raw = self.default_layout_json.as_deref()?;
        match serde_json::from_str::<TileMask>(raw) {
            Ok(mask) => Some(mask.tiles),
            Err(e) => {
                log::warn!("invalid layout JSON for template '{}': {}", self.name, e);
                None
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TileMask {
    pub tiles: Vec<Vec<u8>>,
}

/// One furniture record as the server sends it.
///
/// Records originating from this client carry `uid`; records hydrated from
/// the database may carry only `id` (and `name` instead of `proto_id`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FurnitureRecord {
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub proto_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub sprite_path: Option<String>,
    pub tx: i32,
    pub ty: i32,
    #[serde(default)]
    pub rotation: Option<f32>,
    #[serde(default)]
    pub scale: Option<f32>,
    #[serde(default)]
    pub interactable: Option<bool>,
    #[serde(default)]
    pub color: Option<u32>,
}

impl FurnitureRecord {
    /// The stable identifier this record keys on: `uid` when present,
    /// otherwise the durable-id alias `dbid_<id>`.
    pub fn resolved_uid(&self) -> Option<String> {
        if let Some(uid) = &self.uid {
            return Some(uid.clone());
        }
        self.id.map(|id| format!("dbid_{id}"))
    }

    pub fn resolved_proto(&self) -> String {
        self.proto_id
            .clone()
            .or_else(|| self.name.clone())
            .unwrap_or_default()
    }

    pub fn tile(&self) -> TilePoint {
        TilePoint::new(self.tx, self.ty)
    }
}

// ---------------------------------------------------------------------------
// Legacy plain-text sub-protocol
// ---------------------------------------------------------------------------

/// The unframed text discipline: slash-commands out, status/chat lines in.
pub mod legacy {
    /// Sender attributed to colon-less plain-text lines.
    pub const UNKNOWN_SENDER: &str = "unknown";

    /// Leading glyphs that mark a server status/log line.
    pub const STATUS_MARKERS: [&str; 3] = ["✅", "❌", "⚠️"];

    /// A classified inbound plain-text line.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum TextLine {
        /// Server status/log line (login results, join confirmations…).
        Status(String),
        /// Room chat, `"username: message"` on the wire.
        Chat { from: String, text: String },
    }

    /// Classify a non-JSON frame. Returns `None` for blank lines.
    pub fn classify_line(raw: &str) -> Option<TextLine> {
        let line = raw.trim();
        if line.is_empty() {
            return None;
        }
        if STATUS_MARKERS.iter().any(|m| line.starts_with(m)) {
            return Some(TextLine::Status(line.to_string()));
        }
        Some(match line.split_once(':') {
            Some((from, text)) => TextLine::Chat {
                from: from.trim().to_string(),
                text: text.trim().to_string(),
            },
            None => TextLine::Chat {
                from: UNKNOWN_SENDER.to_string(),
                text: line.to_string(),
            },
        })
    }

    // -- outbound command builders (raw, unframed) --------------------------

    pub fn join(room: &str) -> String {
        format!("/join {room}")
    }

    pub fn leave() -> String {
        "/leave".to_string()
    }

    pub fn login(username: &str, password: &str) -> String {
        format!("/login {username} {password}")
    }

    pub fn register(username: &str, email: &str, password: &str) -> String {
        format!("/register {username} {email} {password}")
    }

    pub fn check_email(email: &str) -> String {
        format!("/check_email {email}")
    }

    pub fn check_username(username: &str) -> String {
        format!("/check_username {username}")
    }

    pub fn kick(username: &str) -> String {
        format!("/kick {username}")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ---------------------------------------------------------------
    // Command serialization — exact wire spellings
    // ---------------------------------------------------------------

    #[test]
    fn get_room_template_uses_camel_case_fields() {
        let v = serde_json::to_value(Command::GetRoomTemplate { template_id: 7 }).unwrap();
        assert_eq!(v["type"], "GET_ROOM_TEMPLATE");
        assert_eq!(v["templateId"], 7);
    }

    #[test]
    fn get_room_furniture_uses_room_id() {
        let v = serde_json::to_value(Command::GetRoomFurniture { room_id: 3 }).unwrap();
        assert_eq!(v["type"], "GET_ROOM_FURNITURE");
        assert_eq!(v["roomId"], 3);
    }

    #[test]
    fn create_furniture_keeps_snake_case_proto_id() {
        let v = serde_json::to_value(Command::CreateFurniture {
            room: "Lobby".into(),
            uid: "f1_1".into(),
            proto_id: "chair".into(),
            tx: 2,
            ty: 2,
            color: None,
        })
        .unwrap();
        assert_eq!(v["type"], "CREATE_FURNITURE");
        assert_eq!(v["proto_id"], "chair");
        assert!(v.get("color").is_none(), "absent color must not serialize");
    }

    #[test]
    fn tile_click_shape() {
        let v = serde_json::to_value(Command::TileClick {
            room: "Lobby".into(),
            tx: 4,
            ty: 5,
        })
        .unwrap();
        assert_eq!(v["type"], "TILE_CLICK");
        assert_eq!(v["room"], "Lobby");
        assert_eq!(v["tx"], 4);
        assert_eq!(v["ty"], 5);
    }

    // ---------------------------------------------------------------
    // Event deserialization
    // ---------------------------------------------------------------

    #[test]
    fn room_state_parses() {
        let ev: Event = serde_json::from_str(
            r#"{"type":"ROOM_STATE","room":"Lobby","furniture":[{"uid":"f1","proto_id":"chair","tx":1,"ty":2}]}"#,
        )
        .unwrap();
        match ev {
            Event::RoomState { room, furniture } => {
                assert_eq!(room, "Lobby");
                assert_eq!(furniture.len(), 1);
                assert_eq!(furniture[0].tile(), TilePoint::new(1, 2));
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn furniture_updated_parses_db_record() {
        let ev: Event = serde_json::from_str(
            r#"{"type":"FURNITURE_UPDATED","room":"Lobby","furniture":{"id":9,"name":"bed","tx":3,"ty":4}}"#,
        )
        .unwrap();
        match ev {
            Event::FurnitureUpdated { furniture, .. } => {
                assert_eq!(furniture.resolved_uid().as_deref(), Some("dbid_9"));
                assert_eq!(furniture.resolved_proto(), "bed");
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn unknown_type_fails_to_parse() {
        assert!(serde_json::from_str::<Event>(r#"{"type":"MYSTERY","data":1}"#).is_err());
    }

    // ---------------------------------------------------------------
    // Layout decoding
    // ---------------------------------------------------------------

    #[test]
    fn template_layout_decodes() {
        let tpl = TemplateRecord {
            id: 1,
            name: "cave".into(),
            width: Some(4),
            height: Some(3),
            skew_angle: None,
            default_layout_json: Some(r#"{"tiles":[[1,1],[1,0]]}"#.into()),
        };
        assert_eq!(tpl.layout(), Some(vec![vec![1, 1], vec![1, 0]]));
    }

    #[test]
    fn invalid_layout_json_is_absent() {
        let tpl = TemplateRecord {
            id: 1,
            name: "broken".into(),
            width: None,
            height: None,
            skew_angle: None,
            default_layout_json: Some("not json".into()),
        };
        assert_eq!(tpl.layout(), None);
    }

    // ---------------------------------------------------------------
    // Legacy text classification
    // ---------------------------------------------------------------

    #[test]
    fn status_lines_by_leading_glyph() {
        assert_eq!(
            legacy::classify_line("✅ Joined room: Lobby"),
            Some(legacy::TextLine::Status("✅ Joined room: Lobby".into()))
        );
        assert_eq!(
            legacy::classify_line("❌ Invalid credentials"),
            Some(legacy::TextLine::Status("❌ Invalid credentials".into()))
        );
    }

    #[test]
    fn chat_splits_on_first_colon() {
        assert_eq!(
            legacy::classify_line("dame: hello: world"),
            Some(legacy::TextLine::Chat {
                from: "dame".into(),
                text: "hello: world".into()
            })
        );
    }

    #[test]
    fn colonless_lines_get_the_sentinel_sender() {
        assert_eq!(
            legacy::classify_line("dame has joined the room."),
            Some(legacy::TextLine::Chat {
                from: legacy::UNKNOWN_SENDER.into(),
                text: "dame has joined the room.".into()
            })
        );
    }

    #[test]
    fn blank_lines_are_dropped() {
        assert_eq!(legacy::classify_line("   "), None);
    }

    #[test]
    fn legacy_command_builders() {
        assert_eq!(legacy::join("Lobby"), "/join Lobby");
        assert_eq!(legacy::login("dame", "pw"), "/login dame pw");
        assert_eq!(
            legacy::register("dame", "d@e.com", "pw"),
            "/register dame d@e.com pw"
        );
        assert_eq!(legacy::check_email("d@e.com"), "/check_email d@e.com");
        assert_eq!(legacy::check_username("dame"), "/check_username dame");
    }
}
