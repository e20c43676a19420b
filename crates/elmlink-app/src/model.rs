//! Session model and status vocabulary
//!
//! One [`Model`] per target. Exactly one [`Status`] is active at a time,
//! and only the statuses that can meaningfully talk to the server hold a
//! [`SendKey`], the unforgeable proof required to construct a send
//! command. The key can only be minted inside this crate, so no code path
//! can send a protocol message while the connection is in a state that
//! could not receive one.

use std::time::Instant;

use chrono::{DateTime, Utc};

use elmlink_client::socket::ConnectionId;
use elmlink_core::protocol::ClientMessage;
use elmlink_core::types::{BrowserUiPosition, CompilationMode};

use crate::overlay::ErrorOverlay;
use crate::swap::{EvalStrategy, ReloadReason};

/// Grace window after the user repositions the browser UI during which the
/// success flash is suppressed (so the UI doesn't pulse right under the
/// cursor).
pub const POSITION_CHANGE_GRACE_MS: i64 = 2000;

/// Proof that the current status permits sending a protocol message.
///
/// Obtainable only by pattern-matching on a [`Status`] that carries one;
/// minted exclusively by this crate's own status constructors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendKey {
    _mint: (),
}

impl SendKey {
    pub(crate) fn mint() -> Self {
        Self { _mint: () }
    }

    /// The only way to build the payload of a send command
    pub fn permit(&self, message: ClientMessage) -> SendPermit {
        SendPermit { message }
    }
}

/// A protocol message plus the proof it was constructed with a live key
#[derive(Debug, Clone, PartialEq)]
pub struct SendPermit {
    message: ClientMessage,
}

impl SendPermit {
    pub fn message(&self) -> &ClientMessage {
        &self.message
    }
}

/// Where a `WaitingForReload` session is in the reload handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadWaitState {
    /// Just entered; the idle-reached pass has not validated it yet
    Pending,
    /// Validated and recorded in the reload registry; waiting for every
    /// other target to decide
    Requested,
    /// Reload-loop detected: a previous forced reload did not actually
    /// deliver new code, so reloading again would spin forever. Surfaced
    /// instead of silently reloading.
    ReloadTrouble,
}

/// Connection-lifecycle state; exactly one active at a time
#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    /// Opening a transport (attempt counter carries across retries)
    Connecting { attempt: u32 },
    /// Connected; the server is compiling or hasn't reported yet
    Busy {
        send_key: SendKey,
        overlay: Option<ErrorOverlay>,
    },
    /// Connected and fully up to date
    Idle { send_key: SendKey },
    /// The server reported compile errors; still connected
    CompileError {
        send_key: SendKey,
        overlay: ErrorOverlay,
        open_editor_error: Option<String>,
    },
    /// The project's elm.json is broken
    ElmJsonError { message: String },
    /// Evaluating compiled code failed with a syntax error
    EvalError,
    /// A malformed payload or a server-reported client error
    UnexpectedError { message: String },
    /// Waiting out the backoff before the next connection attempt
    SleepingBeforeReconnect { attempt: u32, slept_at: Instant },
    /// New code needs a full page reload to apply
    WaitingForReload {
        reasons: Vec<ReloadReason>,
        state: ReloadWaitState,
    },
}

impl Status {
    pub(crate) fn busy(overlay: Option<ErrorOverlay>) -> Self {
        Status::Busy {
            send_key: SendKey::mint(),
            overlay,
        }
    }

    pub(crate) fn idle() -> Self {
        Status::Idle {
            send_key: SendKey::mint(),
        }
    }

    pub(crate) fn compile_error(overlay: ErrorOverlay) -> Self {
        Status::CompileError {
            send_key: SendKey::mint(),
            overlay,
            open_editor_error: None,
        }
    }

    pub(crate) fn sleeping(attempt: u32) -> Self {
        Status::SleepingBeforeReconnect {
            attempt,
            slept_at: Instant::now(),
        }
    }

    /// The send capability, if this status holds one
    pub fn send_key(&self) -> Option<&SendKey> {
        match self {
            Status::Busy { send_key, .. }
            | Status::Idle { send_key }
            | Status::CompileError { send_key, .. } => Some(send_key),
            _ => None,
        }
    }

    /// The error overlay, if this status carries one
    pub fn overlay(&self) -> Option<&ErrorOverlay> {
        match self {
            Status::Busy {
                overlay: Some(overlay),
                ..
            } => Some(overlay),
            Status::CompileError { overlay, .. } => Some(overlay),
            _ => None,
        }
    }

    pub fn is_reload_trouble(&self) -> bool {
        matches!(
            self,
            Status::WaitingForReload {
                state: ReloadWaitState::ReloadTrouble,
                ..
            }
        )
    }
}

/// A compile whose code is being evaluated but is not live yet.
///
/// The model's own `elm_compiled_timestamp`/`compilation_mode` always
/// describe the *running* code; they only advance when the swap succeeds.
/// If the swap fails, the running code is still the old compile, which is
/// exactly what reload-loop detection must compare against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingCompile {
    pub timestamp: i64,
    pub mode: CompilationMode,
}

/// The whole per-target session model
#[derive(Debug, Clone)]
pub struct Model {
    pub target_name: String,
    pub status: Status,
    /// Mode the *running* code was compiled with (`Proxy` before any real
    /// compile)
    pub compilation_mode: CompilationMode,
    pub browser_ui_position: BrowserUiPosition,
    pub last_position_change: Option<DateTime<Utc>>,
    /// Timestamp of the compile the running code came from
    pub elm_compiled_timestamp: i64,
    /// Timestamp recorded just before the previous forced reload. Set once
    /// at startup from persisted storage, never reset during the session.
    /// It is the reference point for reload-loop detection.
    pub elm_compiled_timestamp_before_reload: Option<i64>,
    pub ui_expanded: bool,
    /// Identity of the current transport; events from any other connection
    /// are stale and ignored
    pub connection: ConnectionId,
    /// Current code-evaluation strategy (flips on syntax failure)
    pub eval_strategy: EvalStrategy,
    /// Compile being evaluated right now, if any
    pub pending_compile: Option<PendingCompile>,
}

impl Model {
    pub fn new(target_name: impl Into<String>, before_reload: Option<i64>) -> Self {
        Self {
            target_name: target_name.into(),
            status: Status::Connecting { attempt: 1 },
            compilation_mode: CompilationMode::Proxy,
            browser_ui_position: BrowserUiPosition::default(),
            last_position_change: None,
            elm_compiled_timestamp: 0,
            elm_compiled_timestamp_before_reload: before_reload,
            ui_expanded: false,
            connection: ConnectionId(1),
            eval_strategy: EvalStrategy::default(),
            pending_compile: None,
        }
    }

    pub fn send_key(&self) -> Option<&SendKey> {
        self.status.send_key()
    }

    /// Whether the success flash should be suppressed because the user just
    /// repositioned the UI
    pub fn within_position_change_grace(&self, now: DateTime<Utc>) -> bool {
        match self.last_position_change {
            Some(changed_at) => {
                (now - changed_at).num_milliseconds() < POSITION_CHANGE_GRACE_MS
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    #[test]
    fn test_only_connected_statuses_hold_a_send_key() {
        assert!(Status::idle().send_key().is_some());
        assert!(Status::busy(None).send_key().is_some());
        assert!(Status::compile_error(ErrorOverlay::default())
            .send_key()
            .is_some());

        assert!(Status::Connecting { attempt: 1 }.send_key().is_none());
        assert!(Status::sleeping(1).send_key().is_none());
        assert!(Status::EvalError.send_key().is_none());
        assert!(Status::WaitingForReload {
            reasons: vec![],
            state: ReloadWaitState::Pending,
        }
        .send_key()
        .is_none());
    }

    #[test]
    fn test_new_model_starts_connecting_in_proxy_mode() {
        let model = Model::new("app", None);
        assert!(matches!(model.status, Status::Connecting { attempt: 1 }));
        assert_eq!(model.compilation_mode, CompilationMode::Proxy);
        assert_eq!(model.elm_compiled_timestamp, 0);
    }

    #[test]
    fn test_before_reload_timestamp_comes_from_storage() {
        let model = Model::new("app", Some(123));
        assert_eq!(model.elm_compiled_timestamp_before_reload, Some(123));
    }

    #[test]
    fn test_position_change_grace_window() {
        let mut model = Model::new("app", None);
        let now = Utc::now();
        assert!(!model.within_position_change_grace(now));

        model.last_position_change = Some(now);
        assert!(model.within_position_change_grace(now));
        assert!(!model
            .within_position_change_grace(now + TimeDelta::milliseconds(POSITION_CHANGE_GRACE_MS)));
    }

    #[test]
    fn test_reload_trouble_is_distinguishable() {
        let waiting = Status::WaitingForReload {
            reasons: vec![],
            state: ReloadWaitState::Pending,
        };
        assert!(!waiting.is_reload_trouble());

        let trouble = Status::WaitingForReload {
            reasons: vec![],
            state: ReloadWaitState::ReloadTrouble,
        };
        assert!(trouble.is_reload_trouble());
    }
}
