//! WebSocket connection management
//!
//! One [`SocketHandle`] owns exactly one WebSocket connection for its whole
//! life. "Reconnect" never touches an existing handle: the session opens a
//! brand-new connection with a fresh [`ConnectionId`] and drops the old
//! handle. Events from a replaced connection still arrive tagged with the
//! old id, and the state machine ignores them.
//!
//! The background task mirrors the read/write select loop of a long-lived
//! client: incoming text frames and outgoing commands are multiplexed, and
//! every exit path emits exactly one `Closed` event.

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;

use elmlink_core::prelude::*;

/// Identity of one connection attempt.
///
/// Monotonically increasing per session; never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl ConnectionId {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ws#{}", self.0)
    }
}

/// Transport lifecycle events, forwarded into the session's dispatch loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    /// The connection is open and ready
    Opened { id: ConnectionId },
    /// A text frame arrived
    Received { id: ConnectionId, payload: String },
    /// The connection is gone (handshake failure, close frame, read or
    /// write error, or an explicit `close()`)
    Closed { id: ConnectionId },
}

/// Frames queued from the session to the writer half
enum OutboundFrame {
    Text(String),
    Close,
}

/// Handle to one live WebSocket connection.
///
/// Dropping the handle closes the connection (the writer channel closes and
/// the background task sends a Close frame and exits).
#[derive(Debug)]
pub struct SocketHandle {
    id: ConnectionId,
    out_tx: mpsc::UnboundedSender<OutboundFrame>,
}

impl SocketHandle {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queue a text frame to the server.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`] if the background task has already
    /// exited; the session will receive (or has received) a `Closed` event
    /// for this connection, so callers can treat the error as advisory.
    pub fn send(&self, text: String) -> Result<()> {
        self.out_tx
            .send(OutboundFrame::Text(text))
            .map_err(|_| Error::ChannelClosed)
    }

    /// Ask the background task to close the connection gracefully
    pub fn close(&self) {
        let _ = self.out_tx.send(OutboundFrame::Close);
    }
}

/// Open a new connection to `url`.
///
/// Returns immediately; the handshake happens on a background task. The
/// task reports `Opened`, then `Received` per text frame, then exactly one
/// `Closed`, or just `Closed` if the handshake fails.
pub fn open(
    id: ConnectionId,
    url: String,
    events: mpsc::UnboundedSender<SocketEvent>,
) -> SocketHandle {
    let (out_tx, out_rx) = mpsc::unbounded_channel();
    tokio::spawn(run_socket_task(id, url, out_rx, events));
    SocketHandle { id, out_tx }
}

/// Background task owning one connection from handshake to close
async fn run_socket_task(
    id: ConnectionId,
    url: String,
    mut out_rx: mpsc::UnboundedReceiver<OutboundFrame>,
    events: mpsc::UnboundedSender<SocketEvent>,
) {
    let ws_stream = match connect_async(&url).await {
        Ok((ws_stream, _response)) => ws_stream,
        Err(err) => {
            debug!("{id}: connect failed: {err}");
            let _ = events.send(SocketEvent::Closed { id });
            return;
        }
    };

    debug!("{id}: connected");
    if events.send(SocketEvent::Opened { id }).is_err() {
        // Session is gone; nothing to report to.
        return;
    }

    let (mut ws_sink, mut ws_read) = ws_stream.split();

    loop {
        tokio::select! {
            // ── Incoming WebSocket frame ─────────────────────────────────
            frame = ws_read.next() => {
                match frame {
                    Some(Ok(WsMessage::Text(text))) => {
                        let _ = events.send(SocketEvent::Received {
                            id,
                            payload: text.to_string(),
                        });
                    }
                    Some(Ok(WsMessage::Close(_))) => {
                        debug!("{id}: received Close frame");
                        break;
                    }
                    Some(Ok(_)) => {
                        // Ping/Pong/Binary — ignore
                    }
                    Some(Err(err)) => {
                        warn!("{id}: read error: {err}");
                        break;
                    }
                    None => {
                        debug!("{id}: stream ended");
                        break;
                    }
                }
            }

            // ── Outgoing frame from the session ──────────────────────────
            frame = out_rx.recv() => {
                match frame {
                    Some(OutboundFrame::Text(text)) => {
                        if let Err(err) = ws_sink.send(WsMessage::Text(text.into())).await {
                            warn!("{id}: write error: {err}");
                            break;
                        }
                    }
                    Some(OutboundFrame::Close) | None => {
                        // Explicit close, or the handle was dropped.
                        let _ = ws_sink.send(WsMessage::Close(None)).await;
                        let _ = ws_sink.close().await;
                        break;
                    }
                }
            }
        }
    }

    let _ = events.send(SocketEvent::Closed { id });
    debug!("{id}: task exiting");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_never_reused() {
        let first = ConnectionId(1);
        let second = first.next();
        assert_ne!(first, second);
        assert!(second > first);
    }

    #[test]
    fn test_connection_id_display() {
        assert_eq!(ConnectionId(7).to_string(), "ws#7");
    }

    #[tokio::test]
    async fn test_unreachable_server_reports_closed() {
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        // Port 1 is never listening.
        let handle = open(
            ConnectionId(1),
            "ws://127.0.0.1:1/".to_string(),
            events_tx,
        );
        assert_eq!(handle.id(), ConnectionId(1));

        let event = events_rx.recv().await.unwrap();
        assert_eq!(event, SocketEvent::Closed { id: ConnectionId(1) });
    }

    #[tokio::test]
    async fn test_send_after_task_exit_is_channel_closed() {
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let handle = open(
            ConnectionId(2),
            "ws://127.0.0.1:1/".to_string(),
            events_tx,
        );
        // Wait for the task to die, then the channel is closed.
        let _ = events_rx.recv().await;
        let err = handle.send("hello".to_string()).unwrap_err();
        assert!(matches!(err, Error::ChannelClosed));
    }
}
