//! # elmlink-app - Session Runtime
//!
//! The heart of elm-link: one session per target, driven by a generic
//! dispatch runtime.
//!
//! ## Public API
//!
//! ### Runtime (`runtime`)
//! - [`runtime::run`] - Generic single-consumer message loop
//! - [`runtime::Dispatcher`] - Handle for feeding messages into a loop
//!
//! ### State Machine (`model`, `message`, `handler`)
//! - [`Model`], [`Status`] - Session model and status vocabulary
//! - [`SendKey`] - Unforgeable proof that sending is currently possible
//! - [`Message`] - Every event a session can process
//! - [`handler::update`] - The transition function
//! - [`handler::Cmd`] - Side effects requested by transitions
//!
//! ### Coordination (`registry`, `persist`)
//! - [`ReloadRegistry`] - Cross-target reload verdicts and the single
//!   coordinated reload decision
//! - [`StateStore`] - State surviving a full page reload (reload-loop
//!   detection)
//!
//! ### Seams (`swap`, `session`)
//! - [`HotSwap`], [`EvalStrategy`], [`ProgramHandle`] - The hot-swap
//!   capability
//! - [`session::run_session`] - Wire a session together and run it
//! - [`session::Collaborators`] - Render / swap / CSS-fetch / host-page
//!   injection points

pub mod config;
pub mod handler;
pub mod message;
pub mod model;
pub mod overlay;
pub mod persist;
pub mod registry;
pub mod runtime;
pub mod session;
pub mod swap;

pub use config::{load_settings, Settings, CONFIG_FILE_NAME};
pub use handler::{backoff_millis, update, Cmd, UpdateResult};
pub use message::Message;
pub use model::{Model, PendingCompile, ReloadWaitState, SendKey, SendPermit, Status};
pub use overlay::{ErrorOverlay, OverlayEntry};
pub use persist::{PersistedState, StateStore};
pub use registry::{ReloadDecision, ReloadRegistry, ReloadVerdict};
pub use session::{
    run_session, Collaborators, FetchCss, HostPage, LinkedStylesheet, Render, SessionConfig,
    SessionEnd, SharedContext, SharedStylesheets,
};
pub use swap::{EvalOutcome, EvalStrategy, HotSwap, ProgramHandle, ReloadReason};
