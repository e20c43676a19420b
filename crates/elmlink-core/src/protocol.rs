//! Session protocol message definitions
//!
//! These are the typed forms of everything that crosses the WebSocket in
//! either direction. Framing (including the special large-code framing) is
//! handled by `elmlink-client`; this module only defines the vocabulary.

use serde::{Deserialize, Serialize};

use crate::types::{BrowserUiPosition, CompilationMode, CompileErrorReport, ErrorColors};

// ─────────────────────────────────────────────────────────
// Server → Client
// ─────────────────────────────────────────────────────────

/// Compilation status pushed by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tag", rename_all_fields = "camelCase")]
pub enum ServerStatus {
    /// The code the page is running is already the latest compile
    AlreadyUpToDate,
    /// The server is compiling (or queued behind another target)
    Busy,
    /// Compilation failed; full error reports for the overlay
    CompileError {
        errors: Vec<CompileErrorReport>,
        #[serde(default)]
        colors: ErrorColors,
    },
    /// The server rejected something this client sent
    ClientError { message: String },
    /// The project's elm.json is broken; nothing can compile
    ElmJsonError { error: String },
}

/// A fully typed message from the build server.
///
/// `SuccessfullyCompiled` is never serialized as plain JSON on the wire:
/// its `code` field can be megabytes, so the codec frames it as a JSON
/// header plus the raw code (see `elmlink-client::codec`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tag", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Reply to our `FocusedTab` liveness probe
    FocusedTabAcknowledged,
    /// Compilation status changed
    StatusChanged { status: ServerStatus },
    /// A compile finished; `code` is the full compiled program
    SuccessfullyCompiled {
        code: String,
        elm_compiled_timestamp: i64,
        compilation_mode: CompilationMode,
        browser_ui_position: BrowserUiPosition,
    },
    /// Compile finished, but record field names changed (optimize mode
    /// mangles them), so hot-swapping would mix incompatible accessors
    SuccessfullyCompiledButRecordFieldsChanged,
    /// The server failed to open the user's editor at an error location
    OpenEditorFailed { error: String },
}

// ─────────────────────────────────────────────────────────
// Client → Server
// ─────────────────────────────────────────────────────────

/// A fully typed message to the build server.
///
/// Constructing a send command for one of these requires a live send
/// capability; see `elmlink-app`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tag", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Lightweight liveness probe, sent on page focus
    FocusedTab,
    /// The user picked a different compilation mode
    ChangedCompilationMode { compilation_mode: CompilationMode },
    /// The user moved the browser UI to another corner
    ChangedBrowserUiPosition {
        browser_ui_position: BrowserUiPosition,
    },
    /// The user opened or closed the error overlay
    ChangedOpenErrorOverlay { open: bool },
    /// The user clicked an error location
    PressedOpenEditor { file: String, line: u32, column: u32 },
}
