//! Message types for the session runtime

use elmlink_client::socket::{ConnectionId, SocketEvent};
use elmlink_core::types::{
    BrowserUiPosition, CompilationMode, ErrorLocation, IdleReason,
};

use crate::swap::EvalOutcome;

/// All possible messages in a session's dispatch loop
#[derive(Debug, Clone)]
pub enum Message {
    // ─────────────────────────────────────────────────────────
    // Transport Messages
    // ─────────────────────────────────────────────────────────
    /// The WebSocket finished its handshake
    SocketOpened { id: ConnectionId },
    /// The WebSocket is gone (handshake failure, close, or error)
    SocketClosed { id: ConnectionId },
    /// A text frame arrived
    SocketReceived { id: ConnectionId, payload: String },

    // ─────────────────────────────────────────────────────────
    // Timer Messages
    // ─────────────────────────────────────────────────────────
    /// The reconnect sleep ran out (elapsed time is re-validated; the
    /// timer itself is never cancelled)
    ReconnectSleepFinished { attempt: u32 },
    /// The user asked to reconnect immediately
    PressedReconnectNow,
    /// The liveness probe went unacknowledged
    LivenessTimedOut,

    // ─────────────────────────────────────────────────────────
    // Page Messages
    // ─────────────────────────────────────────────────────────
    /// The page (tab/window) gained focus
    PageFocused,
    /// The page became visible or hidden
    PageVisibilityChanged { visible: bool },

    // ─────────────────────────────────────────────────────────
    // Async Completion Messages
    // ─────────────────────────────────────────────────────────
    /// The hot-swap attempt finished
    EvalFinished { outcome: EvalOutcome },
    /// The stylesheet reconciliation pass finished
    CssReloadFinished { changed: bool },
    /// A settled state was reached (dispatched by the idle-reached command)
    IdleReached { reason: IdleReason },

    // ─────────────────────────────────────────────────────────
    // UI Intents
    // ─────────────────────────────────────────────────────────
    /// The user picked a different compilation mode
    ChangedCompilationMode { mode: CompilationMode },
    /// The user moved the browser UI to another corner
    ChangedBrowserUiPosition { position: BrowserUiPosition },
    /// The user expanded or collapsed the browser UI
    ToggledUiExpanded,
    /// The user opened or closed the error overlay
    ToggledErrorOverlay { open: bool },
    /// The user expanded or collapsed one overlay entry
    ToggledOverlayEntry { key: String, expanded: bool },
    /// The user clicked an error location
    PressedOpenEditor { location: ErrorLocation },
}

impl From<SocketEvent> for Message {
    fn from(event: SocketEvent) -> Self {
        match event {
            SocketEvent::Opened { id } => Message::SocketOpened { id },
            SocketEvent::Received { id, payload } => Message::SocketReceived { id, payload },
            SocketEvent::Closed { id } => Message::SocketClosed { id },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_events_convert_to_messages() {
        let id = ConnectionId(3);
        assert!(matches!(
            Message::from(SocketEvent::Opened { id }),
            Message::SocketOpened { id: ConnectionId(3) }
        ));
        assert!(matches!(
            Message::from(SocketEvent::Closed { id }),
            Message::SocketClosed { id: ConnectionId(3) }
        ));
        match Message::from(SocketEvent::Received {
            id,
            payload: "x".to_string(),
        }) {
            Message::SocketReceived { id, payload } => {
                assert_eq!(id, ConnectionId(3));
                assert_eq!(payload, "x");
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }
}
