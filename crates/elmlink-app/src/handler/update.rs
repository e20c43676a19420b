//! Main update function - the session state machine's transition table

use crate::message::Message;
use crate::model::Model;

use super::{connection, eval, server, ui, UpdateResult};

/// Process a message and update the model.
///
/// Pure with respect to side effects: every effect is returned as a
/// command for the session's command runner. Events carrying a
/// [`ConnectionId`](elmlink_client::socket::ConnectionId) that is not the
/// model's current connection are stale (the transport was replaced) and
/// ignored.
pub fn update(model: &mut Model, message: Message) -> UpdateResult {
    match message {
        // ─────────────────────────────────────────────────────────
        // Transport Messages
        // ─────────────────────────────────────────────────────────
        Message::SocketOpened { id } => connection::handle_socket_opened(model, id),

        Message::SocketClosed { id } => connection::handle_socket_closed(model, id),

        Message::SocketReceived { id, payload } => server::handle_payload(model, id, &payload),

        // ─────────────────────────────────────────────────────────
        // Timer Messages
        // ─────────────────────────────────────────────────────────
        Message::ReconnectSleepFinished { attempt: _ } => {
            connection::handle_reconnect_attempt(model)
        }

        Message::PressedReconnectNow => connection::handle_reconnect_attempt(model),

        Message::LivenessTimedOut => connection::handle_liveness_timeout(model),

        // ─────────────────────────────────────────────────────────
        // Page Messages
        // ─────────────────────────────────────────────────────────
        Message::PageFocused => ui::handle_page_focused(model),

        Message::PageVisibilityChanged { visible } => {
            ui::handle_visibility_changed(model, visible)
        }

        // ─────────────────────────────────────────────────────────
        // Async Completion Messages
        // ─────────────────────────────────────────────────────────
        Message::EvalFinished { outcome } => eval::handle_eval_finished(model, outcome),

        Message::CssReloadFinished { changed } => eval::handle_css_reload_finished(changed),

        Message::IdleReached { reason } => eval::handle_idle_reached(model, reason),

        // ─────────────────────────────────────────────────────────
        // UI Intents
        // ─────────────────────────────────────────────────────────
        Message::ChangedCompilationMode { mode } => {
            ui::handle_changed_compilation_mode(model, mode)
        }

        Message::ChangedBrowserUiPosition { position } => {
            ui::handle_changed_position(model, position)
        }

        Message::ToggledUiExpanded => ui::handle_toggled_ui_expanded(model),

        Message::ToggledErrorOverlay { open } => ui::handle_toggled_error_overlay(model, open),

        Message::ToggledOverlayEntry { key, expanded } => {
            ui::handle_toggled_overlay_entry(model, &key, expanded)
        }

        Message::PressedOpenEditor { location } => {
            ui::handle_pressed_open_editor(model, &location)
        }
    }
}
