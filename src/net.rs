//! Native websocket transport.
//!
//! Splits the socket into a writer task draining the session's outbound
//! queue and a reader task surfacing [`SocketEvent`]s in delivery order.
//! Everything above this module is transport-agnostic.

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use crate::session::{ConnectionSession, SocketEvent};

/// Open a websocket to the room server.
///
/// Returns the outbound session and the inbound socket-event stream once
/// the handshake has completed.
pub async fn connect(
    server_url: &str,
) -> Result<(ConnectionSession, mpsc::UnboundedReceiver<SocketEvent>)> {
    let url = Url::parse(server_url).context("invalid server url")?;
    let (ws, _) = connect_async(url.as_str())
        .await
        .context("websocket handshake failed")?;
    log::info!("connected to {url}");

    let (mut ws_write, mut ws_read) = ws.split();

    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
    let (in_tx, in_rx) = mpsc::unbounded_channel::<SocketEvent>();

    // Writer: session outbound queue → socket.
    tokio::spawn(async move {
        while let Some(frame) = out_rx.recv().await {
            if let Err(e) = ws_write.send(Message::Text(frame)).await {
                log::warn!("websocket send failed: {e}");
                break;
            }
        }
        let _ = ws_write.close().await;
    });

    // Reader: socket → socket-event stream, closure folded into one event.
    tokio::spawn(async move {
        while let Some(msg) = ws_read.next().await {
            match msg {
                Ok(m) if m.is_text() => {
                    if let Ok(text) = m.into_text() {
                        let _ = in_tx.send(SocketEvent::Frame(text));
                    }
                }
                Ok(m) if m.is_close() => {
                    let _ = in_tx.send(SocketEvent::Closed {
                        reason: "server closed the connection".into(),
                    });
                    return;
                }
                Ok(_) => {} // binary/ping/pong – nothing for us
                Err(e) => {
                    let _ = in_tx.send(SocketEvent::Closed {
                        reason: e.to_string(),
                    });
                    return;
                }
            }
        }
        let _ = in_tx.send(SocketEvent::Closed {
            reason: "stream ended".into(),
        });
    });

    Ok((ConnectionSession::new(out_tx), in_rx))
}
