//! Socket session: open-state tracking and send-or-drop semantics.
//!
//! The session does not queue frames until the socket opens — a send
//! against a non-open session is dropped with a logged warning, and the
//! caller does not get to retry automatically. Reconnection is the
//! surrounding application's concern.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;

/// What the transport reader surfaces to the frame pump.
#[derive(Debug, Clone)]
pub enum SocketEvent {
    /// One inbound text frame, in delivery order.
    Frame(String),
    /// The socket closed or errored; `reason` is human-readable.
    Closed { reason: String },
}

/// Outbound half of one socket connection.
///
/// Created open (the transport hands it over after the handshake) and
/// marked closed by the frame pump when the reader reports closure.
pub struct ConnectionSession {
    outgoing: mpsc::UnboundedSender<String>,
    open: AtomicBool,
}

impl ConnectionSession {
    pub fn new(outgoing: mpsc::UnboundedSender<String>) -> Self {
        Self {
            outgoing,
            open: AtomicBool::new(true),
        }
    }

    /// An in-memory session plus the receiving end of its outbound queue.
    /// Used by tests and by embedders that bring their own transport.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    /// Send one text frame, or drop it with a warning if the socket is not
    /// open.
    pub fn send(&self, frame: &str) {
        if !self.is_open() {
            log::warn!("socket not open – dropping outbound frame: {frame}");
            return;
        }
        if self.outgoing.send(frame.to_string()).is_err() {
            log::warn!("outbound queue gone – dropping frame: {frame}");
            self.mark_closed();
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    pub fn mark_closed(&self) {
        self.open.store(false, Ordering::Release);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_flow_while_open() {
        let (session, mut rx) = ConnectionSession::channel();
        session.send("hello");
        assert_eq!(rx.try_recv().unwrap(), "hello");
    }

    #[test]
    fn sends_while_closed_are_dropped() {
        let (session, mut rx) = ConnectionSession::channel();
        session.mark_closed();
        session.send("late frame");
        assert!(rx.try_recv().is_err());
    }
}
