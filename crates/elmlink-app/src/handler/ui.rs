//! Page focus and UI-originated intents

use chrono::Utc;

use elmlink_core::protocol::ClientMessage;
use elmlink_core::types::{BrowserUiPosition, CompilationMode, ErrorLocation};

use crate::model::{Model, Status};

use super::{Cmd, UpdateResult};

/// The page gained focus: probe the connection.
///
/// Runs in every status that can talk to the server (`Idle`, `Busy`, and
/// `CompileError` alike), because a silently-dead connection looks exactly
/// like a healthy idle one until probed. Without a send capability there is
/// no connection to probe (a reconnect cycle is already running).
pub(crate) fn handle_page_focused(model: &mut Model) -> UpdateResult {
    let Some(key) = model.send_key() else {
        return UpdateResult::none();
    };
    UpdateResult::commands(vec![
        Cmd::Send(key.permit(ClientMessage::FocusedTab)),
        Cmd::StartLivenessTimer,
    ])
}

/// Visibility changes: becoming visible is treated like a focus (mobile
/// browsers fire no focus event when a backgrounded tab returns)
pub(crate) fn handle_visibility_changed(model: &mut Model, visible: bool) -> UpdateResult {
    if visible {
        handle_page_focused(model)
    } else {
        UpdateResult::none()
    }
}

/// The user picked a different compilation mode. The server recompiles and
/// pushes `Busy`, then the new code; the model's own mode only changes when
/// that code is actually running.
pub(crate) fn handle_changed_compilation_mode(
    model: &mut Model,
    mode: CompilationMode,
) -> UpdateResult {
    let Some(key) = model.send_key() else {
        return UpdateResult::none();
    };
    UpdateResult::command(Cmd::Send(key.permit(ClientMessage::ChangedCompilationMode {
        compilation_mode: mode,
    })))
}

/// The user moved the browser UI to another corner
pub(crate) fn handle_changed_position(
    model: &mut Model,
    position: BrowserUiPosition,
) -> UpdateResult {
    model.browser_ui_position = position;
    model.last_position_change = Some(Utc::now());

    let mut commands = Vec::new();
    if let Some(key) = model.send_key() {
        commands.push(Cmd::Send(key.permit(
            ClientMessage::ChangedBrowserUiPosition {
                browser_ui_position: position,
            },
        )));
    }
    commands.push(Cmd::RepositionUi { position });
    commands.push(Cmd::Render);
    UpdateResult::commands(commands)
}

pub(crate) fn handle_toggled_ui_expanded(model: &mut Model) -> UpdateResult {
    model.ui_expanded = !model.ui_expanded;
    UpdateResult::command(Cmd::Render)
}

/// The user opened or closed the error overlay; the server persists the
/// preference across recompiles
pub(crate) fn handle_toggled_error_overlay(model: &mut Model, open: bool) -> UpdateResult {
    match &mut model.status {
        Status::CompileError { overlay, .. } => overlay.open = open,
        Status::Busy {
            overlay: Some(overlay),
            ..
        } => overlay.open = open,
        _ => return UpdateResult::none(),
    }

    let mut commands = Vec::new();
    if let Some(key) = model.send_key() {
        commands.push(Cmd::Send(
            key.permit(ClientMessage::ChangedOpenErrorOverlay { open }),
        ));
    }
    commands.push(Cmd::Render);
    UpdateResult::commands(commands)
}

pub(crate) fn handle_toggled_overlay_entry(
    model: &mut Model,
    key: &str,
    expanded: bool,
) -> UpdateResult {
    match &mut model.status {
        Status::CompileError { overlay, .. } => overlay.set_expanded(key, expanded),
        Status::Busy {
            overlay: Some(overlay),
            ..
        } => overlay.set_expanded(key, expanded),
        _ => return UpdateResult::none(),
    }
    UpdateResult::command(Cmd::Render)
}

/// The user clicked an error location
pub(crate) fn handle_pressed_open_editor(
    model: &mut Model,
    location: &ErrorLocation,
) -> UpdateResult {
    let Some(key) = model.send_key() else {
        return UpdateResult::none();
    };
    UpdateResult::command(Cmd::Send(key.permit(ClientMessage::PressedOpenEditor {
        file: location.file.clone(),
        line: location.line,
        column: location.column,
    })))
}
