//! elm-link - keep running Elm applications connected to their build server
//!
//! This is the binary entry point: a headless client that runs one session
//! per target against a build server, hot-applying compiled code and CSS
//! and reporting status to the log. All logic lives in the library crates.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use clap::Parser;
use tracing::{debug, info, warn};

use elmlink_app::session::{
    run_session, Collaborators, FetchCss, HostPage, Render, SessionConfig, SharedContext,
    SharedStylesheets,
};
use elmlink_app::swap::{EvalOutcome, EvalStrategy, HotSwap, ProgramHandle};
use elmlink_app::{load_settings, Message, Model, StateStore, Status};
use elmlink_client::address::ServerAddress;
use elmlink_core::types::{BrowserUiPosition, CompilationMode};
use elmlink_core::Result;

/// elm-link - live-development session runtime for compiled Elm applications
#[derive(Parser, Debug)]
#[command(name = "elmlink")]
#[command(about = "Keep running Elm applications connected to their build server", long_about = None)]
struct Args {
    /// Target names to run sessions for (defaults to every configured target)
    #[arg(value_name = "TARGET")]
    targets: Vec<String>,

    /// Project directory containing elm-link.toml
    #[arg(long, value_name = "PATH")]
    project: Option<PathBuf>,

    /// Build server host (overrides the config file)
    #[arg(long)]
    host: Option<String>,

    /// Build server port (overrides the config file)
    #[arg(long)]
    port: Option<u16>,

    /// Shared secret token (overrides the config file)
    #[arg(long)]
    token: Option<String>,

    /// Connect with wss:// instead of ws://
    #[arg(long)]
    secure: bool,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    elmlink_core::logging::init()?;
    let args = Args::parse();

    let project = match args.project {
        Some(path) => path,
        None => std::env::current_dir()?,
    };

    let mut settings = load_settings(&project)?;
    if let Some(host) = args.host {
        settings.server.host = host;
    }
    if let Some(port) = args.port {
        settings.server.port = port;
    }
    if let Some(token) = args.token {
        settings.server.token = Some(token);
    }
    if args.secure {
        settings.server.secure = true;
    }

    // Explicit targets win; otherwise run everything the config names.
    let targets: Vec<(String, Vec<String>)> = if args.targets.is_empty() {
        settings
            .targets
            .iter()
            .map(|target| (target.name.clone(), target.stylesheets.clone()))
            .collect()
    } else {
        args.targets
            .iter()
            .map(|name| {
                let stylesheets = settings
                    .targets
                    .iter()
                    .find(|target| &target.name == name)
                    .map(|target| target.stylesheets.clone())
                    .unwrap_or_default();
                (name.clone(), stylesheets)
            })
            .collect()
    };
    if targets.is_empty() {
        eprintln!("No targets to run.");
        eprintln!("Pass target names as arguments, or add [[targets]] to elm-link.toml.");
        std::process::exit(1);
    }

    let address = ServerAddress {
        secure: settings.server.secure,
        host: settings.server.host.clone(),
        port: settings.server.port,
        path: settings.server.path.clone(),
    };

    let shared = SharedContext::init(StateStore::in_dir(project.join(".elm-link")));
    let reload_notify = Arc::new(tokio::sync::Notify::new());

    let mut sessions = Vec::new();
    let mut page_event_senders = Vec::new();
    for (name, stylesheet_hrefs) in targets {
        let stylesheets = SharedStylesheets::new();
        for href in &stylesheet_hrefs {
            match std::fs::read_to_string(project.join(href)) {
                Ok(text) => stylesheets.register(href.clone(), &text),
                Err(err) => warn!("could not load stylesheet {href}: {err}"),
            }
        }

        let collaborators = Collaborators {
            render: Box::new(TracingRender::new(&name)),
            swap: Arc::new(Mutex::new(LoggingSwap::new(&name))),
            fetch_css: Arc::new(FileFetch {
                root: project.clone(),
            }),
            page: Arc::new(NotifyPage {
                notify: Arc::clone(&reload_notify),
            }),
            idle_hook: Box::new({
                let name = name.clone();
                move |reason| debug!(target_name = %name, "settled: {reason:?}")
            }),
            stylesheets,
        };

        let config = SessionConfig {
            target_name: name.clone(),
            address: address.clone(),
            token: settings.server.token.clone(),
            initial_compiled_timestamp: 0,
        };

        let (page_events_tx, page_events_rx) = tokio::sync::mpsc::unbounded_channel::<Message>();
        page_event_senders.push(page_events_tx);
        info!("starting session for target {name}");
        sessions.push(tokio::spawn(run_session(
            config,
            shared.clone(),
            collaborators,
            page_events_rx,
        )));
    }

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted, shutting down");
        }
        _ = reload_notify.notified() => {
            info!("a coordinated reload was requested; a browser page would reload now");
        }
    }

    for session in &sessions {
        session.abort();
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────
// Headless collaborators
// ─────────────────────────────────────────────────────────

/// Render collaborator that reports status transitions to the log
struct TracingRender {
    target_name: String,
    last: Option<String>,
}

impl TracingRender {
    fn new(target_name: &str) -> Self {
        Self {
            target_name: target_name.to_string(),
            last: None,
        }
    }
}

impl Render for TracingRender {
    fn render(&mut self, model: &Model) {
        let line = status_line(model);
        if self.last.as_deref() != Some(line.as_str()) {
            info!(target_name = %self.target_name, "{line}");
            self.last = Some(line);
        }
    }
}

fn status_line(model: &Model) -> String {
    match &model.status {
        Status::Connecting { attempt } => format!("connecting (attempt {attempt})"),
        Status::SleepingBeforeReconnect { attempt, .. } => {
            format!("waiting to reconnect (attempt {attempt})")
        }
        Status::Busy { .. } => "compiling".to_string(),
        Status::Idle { .. } => format!(
            "up to date ({} mode, compiled at {})",
            model.compilation_mode, model.elm_compiled_timestamp
        ),
        Status::CompileError { overlay, .. } => {
            format!("{} compile error(s)", overlay.entries.len())
        }
        Status::ElmJsonError { .. } => "elm.json is broken".to_string(),
        Status::EvalError => "could not evaluate compiled code".to_string(),
        Status::UnexpectedError { message } => format!("unexpected error: {message}"),
        Status::WaitingForReload { .. } if model.status.is_reload_trouble() => {
            "reload trouble: the last reload did not deliver new code".to_string()
        }
        Status::WaitingForReload { .. } => "waiting for page reload".to_string(),
    }
}

/// Hot-swap collaborator for headless runs: accepts every swap and tracks
/// the program handle becoming ready after the first one
struct LoggingSwap {
    target_name: String,
    program: ProgramHandle<u64>,
}

impl LoggingSwap {
    fn new(target_name: &str) -> Self {
        Self {
            target_name: target_name.to_string(),
            program: ProgramHandle::NotReady,
        }
    }
}

impl HotSwap for LoggingSwap {
    fn attempt(
        &mut self,
        code: &str,
        mode: CompilationMode,
        strategy: EvalStrategy,
    ) -> EvalOutcome {
        let swaps = self.program.ready().copied().unwrap_or(0) + 1;
        self.program = ProgramHandle::Ready(swaps);
        info!(
            target_name = %self.target_name,
            "applied compiled code: {} bytes, {mode} mode, {strategy:?} (swap #{swaps})",
            code.len()
        );
        EvalOutcome::Swapped
    }
}

/// CSS fetcher reading stylesheet files from the project directory
struct FileFetch {
    root: PathBuf,
}

impl FetchCss for FileFetch {
    fn fetch(&self, href: &str) -> Result<String> {
        std::fs::read_to_string(self.root.join(href)).map_err(Into::into)
    }
}

/// Host page stand-in: reloading a headless client means telling the main
/// loop to exit
struct NotifyPage {
    notify: Arc<tokio::sync::Notify>,
}

impl HostPage for NotifyPage {
    fn reposition_ui(&self, position: BrowserUiPosition) {
        debug!("browser UI would move to {position:?}");
    }

    fn reload(&self, message: &str) {
        warn!("{message}");
        self.notify.notify_waiters();
    }
}
