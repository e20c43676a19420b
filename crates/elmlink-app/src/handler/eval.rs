//! Hot-swap outcomes, idle-reached, reload-loop detection

use tracing::{info, warn};

use elmlink_core::types::IdleReason;

use crate::model::{Model, ReloadWaitState, Status};
use crate::swap::EvalOutcome;

use super::server::enter_waiting_for_reload;
use super::{Cmd, UpdateResult};

/// The hot-swap attempt finished
pub(crate) fn handle_eval_finished(model: &mut Model, outcome: EvalOutcome) -> UpdateResult {
    match outcome {
        EvalOutcome::Swapped => {
            // The pending compile is live now: the running code's
            // timestamp and mode advance.
            if let Some(pending) = model.pending_compile.take() {
                model.elm_compiled_timestamp = pending.timestamp;
                model.compilation_mode = pending.mode;
            }
            model.status = Status::idle();
            UpdateResult::commands(vec![
                Cmd::ReachIdle {
                    reason: IdleReason::EvalSucceeded,
                },
                Cmd::ReloadCss,
                Cmd::Render,
            ])
        }

        EvalOutcome::NeedsReload(reasons) => {
            // The swap did not apply; the running code is still the old
            // compile.
            model.pending_compile = None;
            info!(
                target_name = %model.target_name,
                "hot swap not possible: {}",
                reasons
                    .iter()
                    .map(|reason| reason.to_string())
                    .collect::<Vec<_>>()
                    .join("; ")
            );
            enter_waiting_for_reload(model, reasons)
        }

        EvalOutcome::SyntaxError(message) => {
            // The other evaluation path may parse this artifact; flip the
            // strategy so the next compile tries it first.
            model.pending_compile = None;
            warn!(target_name = %model.target_name, "eval syntax error: {message}");
            model.eval_strategy = model.eval_strategy.flipped();
            model.status = Status::EvalError;
            model.ui_expanded = true;
            UpdateResult::commands(vec![
                Cmd::ReachIdle {
                    reason: IdleReason::EvalErrored,
                },
                Cmd::Render,
            ])
        }
    }
}

/// A settled state was reached.
///
/// Only `WaitingForReload` has work to do here: validate the pending
/// reload. If the compile timestamp is unchanged from the one recorded
/// before the previous forced reload, that reload never delivered new code
/// that is a reload loop. Reloading again would spin forever, so the session
/// surfaces "reload trouble" instead and forces the UI open.
pub(crate) fn handle_idle_reached(model: &mut Model, _reason: IdleReason) -> UpdateResult {
    let Status::WaitingForReload { reasons, state } = &mut model.status else {
        return UpdateResult::none();
    };
    if *state != ReloadWaitState::Pending {
        return UpdateResult::none();
    }

    if model.elm_compiled_timestamp_before_reload == Some(model.elm_compiled_timestamp) {
        warn!(
            target_name = %model.target_name,
            "compile timestamp unchanged after reload ({}): reload trouble",
            model.elm_compiled_timestamp
        );
        *state = ReloadWaitState::ReloadTrouble;
        model.ui_expanded = true;
        return UpdateResult::command(Cmd::Render);
    }

    *state = ReloadWaitState::Requested;
    let reasons = reasons.iter().map(|reason| reason.to_string()).collect();
    UpdateResult::command(Cmd::RequestReload { reasons })
}

/// Stylesheet reconciliation finished (best-effort; nothing to do but
/// re-render when something changed)
pub(crate) fn handle_css_reload_finished(changed: bool) -> UpdateResult {
    if changed {
        UpdateResult::command(Cmd::Render)
    } else {
        UpdateResult::none()
    }
}
