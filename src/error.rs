//! Error taxonomy for caller-facing operations.
//!
//! Only correlated calls surface errors to the caller; everything else
//! (malformed inbound frames, rejected placements, sends while closed) is
//! handled in place and logged.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// No reply arrived within the per-call deadline.
    #[error("request {req_id} timed out")]
    Timeout { req_id: String },

    /// The socket closed while the call was outstanding.
    #[error("connection closed: {0}")]
    Closed(String),

    /// A call was issued against a session that is not open.
    #[error("not connected")]
    NotConnected,

    #[error("protocol error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ClientError>;
