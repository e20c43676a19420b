//! Session wiring: one dispatch runtime per target
//!
//! [`run_session`] instantiates the generic dispatch runtime with the
//! session model, the update function, and a command runner that owns the
//! session's mutable resources (the current socket handle, the liveness
//! timer) and its injected collaborators (render, hot-swap, CSS fetcher,
//! host page).
//!
//! The [`SharedContext`] is the only state shared across targets on one
//! host page: the reload registry and the persisted-state store. It is
//! constructed explicitly by the embedder ([`SharedContext::init`] consumes
//! the persisted state exactly once) and passed to every session; each
//! session registers itself on start and deregisters on its own end.

use std::ops::ControlFlow;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use elmlink_client::address::{ConnectParams, ServerAddress};
use elmlink_client::codec::encode_client_message;
use elmlink_client::liveness::{LivenessTimer, FOCUS_ACK_TIMEOUT};
use elmlink_client::socket::{self, SocketEvent, SocketHandle};
use elmlink_core::prelude::*;
use elmlink_core::types::{BrowserUiPosition, IdleReason};
use elmlink_css::{parse_stylesheet, reconcile_text, Stylesheet};

use crate::handler::{self, Cmd};
use crate::message::Message;
use crate::model::{Model, ReloadWaitState, Status};
use crate::persist::{PersistedState, StateStore};
use crate::registry::{ReloadRegistry, ReloadVerdict};
use crate::runtime::{self, Dispatcher};
use crate::swap::{EvalOutcome, HotSwap, ReloadReason};

// ─────────────────────────────────────────────────────────
// Collaborator seams
// ─────────────────────────────────────────────────────────

/// Pure, replaceable presentation of the current model; no state of its own
pub trait Render: Send {
    fn render(&mut self, model: &Model);
}

/// The host page: the one thing that can move the browser UI or actually
/// reload
pub trait HostPage: Send + Sync {
    fn reposition_ui(&self, position: BrowserUiPosition);
    fn reload(&self, message: &str);
}

/// Fetches replacement CSS text for a registered stylesheet.
///
/// Errors are swallowed per file by the reconciliation pass.
pub trait FetchCss: Send + Sync {
    fn fetch(&self, href: &str) -> Result<String>;
}

/// Called every time the session reaches a settled state
pub type IdleHook = Box<dyn FnMut(IdleReason) + Send>;

/// Everything a session consumes but does not own
pub struct Collaborators {
    pub render: Box<dyn Render>,
    pub swap: Arc<Mutex<dyn HotSwap>>,
    pub fetch_css: Arc<dyn FetchCss>,
    pub page: Arc<dyn HostPage>,
    pub idle_hook: IdleHook,
    pub stylesheets: SharedStylesheets,
}

// ─────────────────────────────────────────────────────────
// Shared context
// ─────────────────────────────────────────────────────────

/// State shared by every target on one host page
#[derive(Debug, Clone)]
pub struct SharedContext {
    pub registry: ReloadRegistry,
    pub store: StateStore,
    /// State consumed from the previous page load (reload message and
    /// per-target timestamps); read exactly once, at init
    pub persisted: PersistedState,
}

impl SharedContext {
    /// Initialize the page-wide context, consuming persisted state.
    ///
    /// Call once per page load, before starting any session.
    pub fn init(store: StateStore) -> Self {
        let persisted = store.take();
        if let Some(message) = &persisted.reload_message {
            info!("previous session reloaded the page: {message}");
        }
        Self {
            registry: ReloadRegistry::new(),
            store,
            persisted,
        }
    }
}

// ─────────────────────────────────────────────────────────
// Live stylesheets
// ─────────────────────────────────────────────────────────

/// One stylesheet the page has loaded
#[derive(Debug, Clone)]
pub struct LinkedStylesheet {
    pub href: String,
    pub sheet: Stylesheet,
}

/// The page's live stylesheets, shared with the CSS reload task
#[derive(Debug, Clone, Default)]
pub struct SharedStylesheets {
    inner: Arc<Mutex<Vec<LinkedStylesheet>>>,
}

impl SharedStylesheets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a stylesheet with its initially loaded text
    pub fn register(&self, href: impl Into<String>, initial_text: &str) {
        self.lock().push(LinkedStylesheet {
            href: href.into(),
            sheet: parse_stylesheet(initial_text),
        });
    }

    pub fn hrefs(&self) -> Vec<String> {
        self.lock().iter().map(|linked| linked.href.clone()).collect()
    }

    /// Access one live sheet (devtool-style edits, assertions in tests)
    pub fn with_sheet<R>(
        &self,
        href: &str,
        access: impl FnOnce(&mut Stylesheet) -> R,
    ) -> Option<R> {
        let mut sheets = self.lock();
        sheets
            .iter_mut()
            .find(|linked| linked.href == href)
            .map(|linked| access(&mut linked.sheet))
    }

    /// Re-fetch every sheet and reconcile it in place.
    ///
    /// Best-effort: a failed fetch leaves that sheet untouched and reports
    /// no change for it.
    pub fn refresh_all(&self, fetcher: &dyn FetchCss) -> bool {
        let mut changed = false;
        for href in self.hrefs() {
            match fetcher.fetch(&href) {
                Ok(text) => {
                    changed |= self
                        .with_sheet(&href, |sheet| reconcile_text(sheet, &text))
                        .unwrap_or(false);
                }
                Err(err) => {
                    debug!("css fetch for {href} failed (ignored): {err}");
                }
            }
        }
        changed
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<LinkedStylesheet>> {
        self.inner.lock().unwrap_or_else(|err| err.into_inner())
    }
}

// ─────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────

/// Per-target connection parameters
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub target_name: String,
    pub address: ServerAddress,
    pub token: Option<String>,
    /// Timestamp embedded in the code the page is currently running
    /// (0 for proxy code)
    pub initial_compiled_timestamp: i64,
}

/// The terminal outcome of a session: this target's runtime triggered the
/// coordinated page reload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEnd {
    pub reload_message: String,
}

/// The reload verdict a model implies; written to the registry after every
/// update
fn verdict_for(model: &Model) -> ReloadVerdict {
    match &model.status {
        // Undecided: new code (or a reload request) could still arrive any
        // moment.
        Status::Connecting { .. }
        | Status::SleepingBeforeReconnect { .. }
        | Status::Busy { .. } => ReloadVerdict::MightWantToReload,

        Status::Idle { .. }
        | Status::CompileError { .. }
        | Status::ElmJsonError { .. }
        | Status::EvalError
        | Status::UnexpectedError { .. } => ReloadVerdict::NoReloadWanted,

        Status::WaitingForReload { reasons, state } => match state {
            // Not validated yet: still counts as undecided so no other
            // target reloads the page out from under the validation.
            ReloadWaitState::Pending => ReloadVerdict::MightWantToReload,
            ReloadWaitState::Requested => ReloadVerdict::ReloadRequested {
                reasons: reasons.iter().map(ReloadReason::to_string).collect(),
            },
            // Gave up: reloading again would loop.
            ReloadWaitState::ReloadTrouble => ReloadVerdict::NoReloadWanted,
        },
    }
}

/// Run one target's session to its terminal outcome.
///
/// `page_events` is the embedder's way into the loop: focus and visibility
/// changes and UI intents arrive through it and are processed in dispatch
/// order with everything else.
///
/// Returns when this target's runtime decided the coordinated reload.
/// Sessions that did not initiate the reload are torn down externally with
/// the page.
pub async fn run_session(
    config: SessionConfig,
    shared: SharedContext,
    mut collaborators: Collaborators,
    page_events: mpsc::UnboundedReceiver<Message>,
) -> SessionEnd {
    let target_name = config.target_name.clone();
    shared.registry.register(&target_name);

    let before_reload = shared
        .persisted
        .compiled_timestamps
        .get(&target_name)
        .copied();
    let mut model = Model::new(&target_name, before_reload);
    model.elm_compiled_timestamp = config.initial_compiled_timestamp;

    let (socket_tx, socket_rx) = mpsc::unbounded_channel::<SocketEvent>();
    let mut current_socket: Option<SocketHandle> = None;
    let liveness = LivenessTimer::new();

    let registry = shared.registry.clone();
    let registry_target = target_name.clone();

    let end = runtime::run(
        model,
        move |dispatcher, model: &mut Model| {
            // Pump transport events into the dispatch loop.
            let pump = dispatcher.clone();
            let mut socket_rx = socket_rx;
            tokio::spawn(async move {
                while let Some(event) = socket_rx.recv().await {
                    pump.dispatch(Message::from(event));
                }
            });
            // And the embedder's page events.
            let pump = dispatcher.clone();
            let mut page_events = page_events;
            tokio::spawn(async move {
                while let Some(message) = page_events.recv().await {
                    pump.dispatch(message);
                }
            });
            vec![
                Cmd::OpenConnection {
                    id: model.connection,
                    attempt: 1,
                },
                Cmd::Render,
            ]
        },
        |model, message| {
            let result = handler::update(model, message);
            // Every model change republishes this target's verdict; each
            // runtime writes only its own key.
            registry.set(&registry_target, verdict_for(model));
            result.commands
        },
        |model, command, dispatcher| {
            run_command(
                model,
                command,
                dispatcher,
                &config,
                &shared,
                &mut current_socket,
                &socket_tx,
                &liveness,
                &mut collaborators,
            )
        },
    )
    .await;

    shared.registry.deregister(&target_name);
    end
}

#[allow(clippy::too_many_arguments)]
fn run_command(
    model: &mut Model,
    command: Cmd,
    dispatcher: &Dispatcher<Message>,
    config: &SessionConfig,
    shared: &SharedContext,
    current_socket: &mut Option<SocketHandle>,
    socket_events: &mpsc::UnboundedSender<SocketEvent>,
    liveness: &LivenessTimer,
    collaborators: &mut Collaborators,
) -> ControlFlow<SessionEnd> {
    match command {
        Cmd::Render => {
            collaborators.render.render(model);
            ControlFlow::Continue(())
        }

        Cmd::Send(permit) => {
            match current_socket.as_ref() {
                Some(handle) => match encode_client_message(permit.message()) {
                    Ok(text) => {
                        // A failed send means the socket task already died;
                        // its Closed event drives the reconnect.
                        if handle.send(text).is_err() {
                            debug!("send on dead {}", handle.id());
                        }
                    }
                    Err(err) => warn!("could not encode message: {err}"),
                },
                None => debug!("send with no open connection"),
            }
            ControlFlow::Continue(())
        }

        Cmd::Eval { code } => {
            let swap = Arc::clone(&collaborators.swap);
            let mode = model.compilation_mode;
            let strategy = model.eval_strategy;
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move {
                let outcome = tokio::task::spawn_blocking(move || {
                    let mut swap = swap.lock().unwrap_or_else(|err| err.into_inner());
                    swap.attempt(&code, mode, strategy)
                })
                .await
                .unwrap_or_else(|err| {
                    EvalOutcome::NeedsReload(vec![ReloadReason::PatchFailed {
                        message: format!("eval task failed: {err}"),
                    }])
                });
                dispatcher.dispatch(Message::EvalFinished { outcome });
            });
            ControlFlow::Continue(())
        }

        Cmd::OpenConnection { id, attempt } => {
            // Replace, never reuse: the old handle is closed and any late
            // events from it are stale.
            if let Some(old) = current_socket.take() {
                old.close();
            }
            let params = ConnectParams {
                version: env!("CARGO_PKG_VERSION").to_string(),
                token: config.token.clone(),
                target_name: config.target_name.clone(),
                elm_compiled_timestamp: model.elm_compiled_timestamp,
            };
            match config.address.to_url(&params) {
                Ok(url) => {
                    debug!("{id}: connecting (attempt {attempt})");
                    *current_socket =
                        Some(socket::open(id, url.to_string(), socket_events.clone()));
                }
                Err(err) => {
                    error!("cannot build server address: {err}");
                    // Feed the failure through the normal close path so the
                    // backoff loop owns the retry.
                    let _ = socket_events.send(SocketEvent::Closed { id });
                }
            }
            ControlFlow::Continue(())
        }

        Cmd::SleepBeforeReconnect { attempt, millis } => {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(millis)).await;
                dispatcher.dispatch(Message::ReconnectSleepFinished { attempt });
            });
            ControlFlow::Continue(())
        }

        Cmd::StartLivenessTimer => {
            let dispatcher = dispatcher.clone();
            liveness.arm(FOCUS_ACK_TIMEOUT, move || {
                dispatcher.dispatch(Message::LivenessTimedOut);
            });
            ControlFlow::Continue(())
        }

        Cmd::StopLivenessTimer => {
            liveness.disarm();
            ControlFlow::Continue(())
        }

        Cmd::ReachIdle { reason } => {
            (collaborators.idle_hook)(reason);
            dispatcher.dispatch(Message::IdleReached { reason });
            // Another target may be blocked on us settling.
            finish_reload_if_decided(shared, collaborators)
        }

        Cmd::RepositionUi { position } => {
            collaborators.page.reposition_ui(position);
            ControlFlow::Continue(())
        }

        Cmd::ReloadCss => {
            let stylesheets = collaborators.stylesheets.clone();
            let fetcher = Arc::clone(&collaborators.fetch_css);
            let dispatcher = dispatcher.clone();
            tokio::task::spawn_blocking(move || {
                let changed = stylesheets.refresh_all(fetcher.as_ref());
                dispatcher.dispatch(Message::CssReloadFinished { changed });
            });
            ControlFlow::Continue(())
        }

        Cmd::RequestReload { reasons: _ } => {
            // Written immediately before the reload so the next startup can
            // detect a reload loop.
            if let Err(err) = shared
                .store
                .record_timestamp(&config.target_name, model.elm_compiled_timestamp)
            {
                warn!("could not persist reload timestamp: {err}");
            }
            finish_reload_if_decided(shared, collaborators)
        }
    }
}

/// Run the cross-target coordinator check; on a decision, persist the
/// reload message and ask the host page to reload.
fn finish_reload_if_decided(
    shared: &SharedContext,
    collaborators: &Collaborators,
) -> ControlFlow<SessionEnd> {
    let Some(decision) = shared.registry.check() else {
        return ControlFlow::Continue(());
    };

    let mut message = String::from("The page is being reloaded because:");
    for reason in &decision.reasons {
        message.push_str("\n- ");
        message.push_str(reason);
    }
    if let Err(err) = shared.store.record_reload_message(&message) {
        warn!("could not persist reload message: {err}");
    }
    info!("{message}");
    collaborators.page.reload(&message);
    ControlFlow::Break(SessionEnd {
        reload_message: message,
    })
}
