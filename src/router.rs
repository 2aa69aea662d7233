//! Inbound frame classification.
//!
//! Every frame the transport delivers goes through [`classify`] exactly
//! once, in delivery order. The two-tier scheme is load-bearing: the
//! protocol deliberately mixes structured control messages and free-text
//! chat on one channel, so a JSON parse failure is an expected path, never
//! an error.

use serde_json::Value;

use crate::protocol::{legacy, Event};

/// A classified inbound frame, ready for dispatch.
#[derive(Debug)]
pub enum Inbound {
    /// Correlated reply — matched to a pending request by `reqId`.
    Reply { req_id: String, data: Value },
    /// Typed broadcast event.
    Event(Event),
    /// Legacy status/log line.
    Status(String),
    /// Legacy room chat.
    Chat { from: String, text: String },
    /// Dropped: blank line, untyped JSON, or unrecognized event type.
    Ignored,
}

/// Classify a raw text frame.
///
/// Order matters: a `reqId` makes a frame a reply regardless of any `type`
/// field it also carries.
pub fn classify(raw: &str) -> Inbound {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => classify_json(value),
        Err(_) => classify_text(raw),
    }
}

fn classify_json(value: Value) -> Inbound {
    if let Some(req_id) = value.get("reqId").and_then(Value::as_str) {
        let req_id = req_id.to_string();
        let data = value.get("data").cloned().unwrap_or(Value::Null);
        return Inbound::Reply { req_id, data };
    }

    if value.get("type").is_some() {
        return match serde_json::from_value::<Event>(value.clone()) {
            Ok(event) => Inbound::Event(event),
            Err(e) => {
                log::info!(
                    "ignoring unrecognized event {}: {e}",
                    value.get("type").and_then(Value::as_str).unwrap_or("?")
                );
                Inbound::Ignored
            }
        };
    }

    log::debug!("ignoring untyped JSON frame");
    Inbound::Ignored
}

fn classify_text(raw: &str) -> Inbound {
    match legacy::classify_line(raw) {
        Some(legacy::TextLine::Status(line)) => Inbound::Status(line),
        Some(legacy::TextLine::Chat { from, text }) => Inbound::Chat { from, text },
        None => Inbound::Ignored,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
