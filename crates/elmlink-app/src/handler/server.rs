//! Handlers for decoded server messages

use tracing::{debug, warn};

use elmlink_client::codec::decode_server_message;
use elmlink_client::socket::ConnectionId;
use elmlink_core::protocol::{ServerMessage, ServerStatus};
use elmlink_core::types::{
    BrowserUiPosition, CompilationMode, CompileErrorReport, ErrorColors, IdleReason,
};

use crate::model::{Model, PendingCompile, ReloadWaitState, Status};
use crate::overlay::ErrorOverlay;
use crate::swap::ReloadReason;

use super::{Cmd, UpdateResult};

/// A text frame arrived on the transport
pub(crate) fn handle_payload(model: &mut Model, id: ConnectionId, payload: &str) -> UpdateResult {
    if id != model.connection {
        debug!("ignoring payload from stale {id}");
        return UpdateResult::none();
    }

    match decode_server_message(payload) {
        Ok(message) => handle_server_message(model, message),
        Err(err) => {
            // Protocol errors are non-fatal: surface the raw diagnostic and
            // force the UI open, but stay connected.
            warn!(target_name = %model.target_name, "malformed payload: {err}");
            model.status = Status::UnexpectedError {
                message: err.to_string(),
            };
            model.ui_expanded = true;
            UpdateResult::commands(vec![
                Cmd::ReachIdle {
                    reason: IdleReason::UnexpectedError,
                },
                Cmd::Render,
            ])
        }
    }
}

fn handle_server_message(model: &mut Model, message: ServerMessage) -> UpdateResult {
    match message {
        ServerMessage::FocusedTabAcknowledged => UpdateResult::command(Cmd::StopLivenessTimer),

        ServerMessage::StatusChanged { status } => handle_status_changed(model, status),

        ServerMessage::SuccessfullyCompiled {
            code,
            elm_compiled_timestamp,
            compilation_mode,
            browser_ui_position,
        } => handle_successfully_compiled(
            model,
            code,
            elm_compiled_timestamp,
            compilation_mode,
            browser_ui_position,
        ),

        ServerMessage::SuccessfullyCompiledButRecordFieldsChanged => {
            enter_waiting_for_reload(model, vec![ReloadReason::RecordFieldsChanged])
        }

        ServerMessage::OpenEditorFailed { error } => {
            if let Status::CompileError {
                open_editor_error, ..
            } = &mut model.status
            {
                *open_editor_error = Some(error);
                model.ui_expanded = true;
                UpdateResult::command(Cmd::Render)
            } else {
                debug!("OpenEditorFailed outside CompileError: {error}");
                UpdateResult::none()
            }
        }
    }
}

fn handle_status_changed(model: &mut Model, status: ServerStatus) -> UpdateResult {
    match status {
        ServerStatus::AlreadyUpToDate => {
            model.status = Status::idle();
            UpdateResult::commands(vec![
                Cmd::ReachIdle {
                    reason: IdleReason::AlreadyUpToDate,
                },
                Cmd::Render,
            ])
        }

        ServerStatus::Busy => {
            let overlay = model.status.overlay().cloned();
            model.status = Status::busy(overlay);
            UpdateResult::command(Cmd::Render)
        }

        ServerStatus::CompileError { errors, colors } => {
            handle_compile_error(model, &errors, &colors)
        }

        ServerStatus::ClientError { message } => {
            warn!(target_name = %model.target_name, "server rejected us: {message}");
            model.status = Status::UnexpectedError { message };
            model.ui_expanded = true;
            UpdateResult::commands(vec![
                Cmd::ReachIdle {
                    reason: IdleReason::UnexpectedError,
                },
                Cmd::Render,
            ])
        }

        ServerStatus::ElmJsonError { error } => {
            model.status = Status::ElmJsonError { message: error };
            UpdateResult::commands(vec![
                Cmd::ReachIdle {
                    reason: IdleReason::ElmJsonError,
                },
                Cmd::Render,
            ])
        }
    }
}

fn handle_compile_error(
    model: &mut Model,
    errors: &[CompileErrorReport],
    colors: &ErrorColors,
) -> UpdateResult {
    // Merge into the existing overlay so entries the user expanded stay
    // expanded across recompiles (and across targets reporting the same
    // error).
    let overlay = match model.status.overlay() {
        Some(existing) => existing.merged_with(errors, colors),
        None => ErrorOverlay::from_reports(errors, colors),
    };
    model.status = Status::compile_error(overlay);
    UpdateResult::commands(vec![
        Cmd::ReachIdle {
            reason: IdleReason::CompileError,
        },
        Cmd::Render,
    ])
}

fn handle_successfully_compiled(
    model: &mut Model,
    code: String,
    elm_compiled_timestamp: i64,
    compilation_mode: CompilationMode,
    browser_ui_position: BrowserUiPosition,
) -> UpdateResult {
    if model.send_key().is_none() {
        debug!("dropping compiled code outside a connected status");
        return UpdateResult::none();
    }

    // Hot-swapping across compilation modes would mix incompatible
    // runtimes; the page must reload into the new mode instead. Proxy code
    // is the placeholder before any real compile, so anything may replace
    // it.
    if model.compilation_mode != CompilationMode::Proxy
        && model.compilation_mode != compilation_mode
    {
        return enter_waiting_for_reload(
            model,
            vec![ReloadReason::ModeChanged {
                from: model.compilation_mode,
                to: compilation_mode,
            }],
        );
    }

    // The position is only a UI hint and applies immediately; timestamp
    // and mode describe running code, so they stay pending until the swap
    // actually succeeds.
    model.browser_ui_position = browser_ui_position;
    model.pending_compile = Some(PendingCompile {
        timestamp: elm_compiled_timestamp,
        mode: compilation_mode,
    });
    UpdateResult::commands(vec![Cmd::Eval { code }, Cmd::Render])
}

pub(crate) fn enter_waiting_for_reload(
    model: &mut Model,
    reasons: Vec<ReloadReason>,
) -> UpdateResult {
    model.status = Status::WaitingForReload {
        reasons,
        state: ReloadWaitState::Pending,
    };
    UpdateResult::commands(vec![
        Cmd::ReachIdle {
            reason: IdleReason::WaitingForReload,
        },
        Cmd::Render,
    ])
}
