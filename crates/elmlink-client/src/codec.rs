//! Wire framing for session protocol messages
//!
//! Every message is a single WebSocket text frame. Almost all of them are
//! plain JSON, serialized straight from the types in
//! `elmlink_core::protocol`. The one exception is `SuccessfullyCompiled`:
//! its `code` field is the entire compiled program (often megabytes), and
//! JSON-escaping it would force a second full pass over the payload on both
//! ends. Instead it is framed as:
//!
//! ```text
//! #<JSON header without the code field>\n<raw code bytes>
//! ```
//!
//! The `#` sentinel is part of the wire contract: JSON documents never begin
//! with `#`, so the two framings are unambiguous.

use serde::{Deserialize, Serialize};

use elmlink_core::prelude::*;
use elmlink_core::types::{BrowserUiPosition, CompilationMode};
use elmlink_core::{ClientMessage, ServerMessage};

/// Leading byte that marks a code-framed payload
pub const CODE_SENTINEL: char = '#';

/// Header of a code-framed payload: `SuccessfullyCompiled` minus `code`.
///
/// A single-variant tagged enum so the header carries the same `tag` field
/// as every other message on the wire.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "tag", rename_all_fields = "camelCase")]
enum CompiledHeader {
    SuccessfullyCompiled {
        elm_compiled_timestamp: i64,
        compilation_mode: CompilationMode,
        browser_ui_position: BrowserUiPosition,
    },
}

/// Decode a payload from the server into a typed message.
///
/// # Errors
///
/// Returns [`Error::Protocol`] for any malformed payload: a code frame with
/// no newline, an unparseable header, or invalid JSON. The caller surfaces
/// these as the non-fatal `UnexpectedError` status.
pub fn decode_server_message(payload: &str) -> Result<ServerMessage> {
    if let Some(rest) = payload.strip_prefix(CODE_SENTINEL) {
        let (header, code) = rest.split_once('\n').ok_or_else(|| {
            Error::protocol(format!(
                "code frame has no newline separator: {}",
                snippet(payload)
            ))
        })?;
        let CompiledHeader::SuccessfullyCompiled {
            elm_compiled_timestamp,
            compilation_mode,
            browser_ui_position,
        } = serde_json::from_str(header).map_err(|err| {
            Error::protocol(format!("bad code frame header: {err}: {}", snippet(header)))
        })?;
        return Ok(ServerMessage::SuccessfullyCompiled {
            code: code.to_string(),
            elm_compiled_timestamp,
            compilation_mode,
            browser_ui_position,
        });
    }

    serde_json::from_str(payload)
        .map_err(|err| Error::protocol(format!("bad message: {err}: {}", snippet(payload))))
}

/// Encode a server message to its wire form.
///
/// The inverse of [`decode_server_message`]: decoding then re-encoding a
/// code-framed payload reproduces it byte for byte, whatever newlines the
/// code contains.
///
/// # Errors
///
/// Returns [`Error::Json`] if serialization fails (practically impossible
/// for these types).
pub fn encode_server_message(message: &ServerMessage) -> Result<String> {
    match message {
        ServerMessage::SuccessfullyCompiled {
            code,
            elm_compiled_timestamp,
            compilation_mode,
            browser_ui_position,
        } => {
            let header = serde_json::to_string(&CompiledHeader::SuccessfullyCompiled {
                elm_compiled_timestamp: *elm_compiled_timestamp,
                compilation_mode: *compilation_mode,
                browser_ui_position: *browser_ui_position,
            })?;
            Ok(format!("{CODE_SENTINEL}{header}\n{code}"))
        }
        other => Ok(serde_json::to_string(other)?),
    }
}

/// Encode a client message to its wire form (always plain JSON).
///
/// # Errors
///
/// Returns [`Error::Json`] if serialization fails.
pub fn encode_client_message(message: &ClientMessage) -> Result<String> {
    Ok(serde_json::to_string(message)?)
}

/// Decode a payload from a client into a typed message.
///
/// # Errors
///
/// Returns [`Error::Protocol`] for malformed payloads.
pub fn decode_client_message(payload: &str) -> Result<ClientMessage> {
    serde_json::from_str(payload)
        .map_err(|err| Error::protocol(format!("bad message: {err}: {}", snippet(payload))))
}

/// Truncate a raw payload for use in diagnostics
fn snippet(raw: &str) -> &str {
    let end = raw
        .char_indices()
        .take(120)
        .last()
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);
    &raw[..end]
}
