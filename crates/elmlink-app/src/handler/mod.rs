//! Handler module - the session update function and its submodules
//!
//! Organized into submodules:
//! - `update`: Main update() function and message dispatch
//! - `connection`: Transport lifecycle, backoff, liveness timeout
//! - `server`: Decoded server-message handling
//! - `eval`: Hot-swap outcomes, idle-reached, reload-loop detection
//! - `ui`: Page focus and UI-originated intents

pub(crate) mod connection;
pub(crate) mod eval;
pub(crate) mod server;
pub(crate) mod ui;
pub(crate) mod update;


use elmlink_client::socket::ConnectionId;
use elmlink_core::types::{BrowserUiPosition, IdleReason};

use crate::model::SendPermit;

// Re-export main entry point
pub use connection::backoff_millis;
pub use update::update;

/// Side effects requested by the update function, executed in order by the
/// session's command runner
#[derive(Debug, Clone, PartialEq)]
pub enum Cmd {
    /// Re-render the browser UI from the current model
    Render,

    /// Send a protocol message. The payload can only be constructed
    /// through a live send capability (`SendKey::permit`).
    Send(SendPermit),

    /// Attempt to hot-swap freshly compiled code into the running program
    /// (asynchronous; completes as `Message::EvalFinished`)
    Eval { code: String },

    /// Open a brand-new transport connection with this identity. Any
    /// previous connection handle is closed and never reused.
    OpenConnection { id: ConnectionId, attempt: u32 },

    /// Sleep, then dispatch `ReconnectSleepFinished`. The sleep is never
    /// cancelled, elapsed time is re-validated when it fires
    SleepBeforeReconnect { attempt: u32, millis: u64 },

    /// Arm the liveness timeout for the focus probe
    StartLivenessTimer,

    /// Cancel the liveness timeout (acknowledgement arrived)
    StopLivenessTimer,

    /// A settled state was reached: invoke the idle-reached hook, dispatch
    /// `IdleReached`, and give the reload coordinator a chance to run
    ReachIdle { reason: IdleReason },

    /// Move the browser UI to another corner
    RepositionUi { position: BrowserUiPosition },

    /// Re-fetch and reconcile every registered stylesheet (asynchronous;
    /// completes as `Message::CssReloadFinished`; fetch errors are
    /// swallowed per file)
    ReloadCss,

    /// This target's reload request is validated and recorded; run the
    /// cross-target coordinator check
    RequestReload { reasons: Vec<String> },
}

/// Result of processing a message
#[derive(Debug, Default)]
pub struct UpdateResult {
    /// Commands to execute, in order
    pub commands: Vec<Cmd>,
}

impl UpdateResult {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn command(command: Cmd) -> Self {
        Self {
            commands: vec![command],
        }
    }

    pub fn commands(commands: Vec<Cmd>) -> Self {
        Self { commands }
    }
}
