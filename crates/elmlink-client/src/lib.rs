//! # elmlink-client - Transport Layer
//!
//! Everything that touches the wire for an elm-link session:
//!
//! - [`address`] - building the `ws(s)://` connection URL with identifying
//!   query parameters
//! - [`socket`] - one background task per WebSocket connection, surfacing
//!   `Opened`/`Received`/`Closed` events tagged with a [`ConnectionId`]
//! - [`codec`] - wire framing, including the sentinel-framed large-code
//!   payload for `SuccessfullyCompiled`
//! - [`liveness`] - the focus-probe timeout that detects silently-dead
//!   connections
//!
//! Reconnection *policy* (backoff, attempt counting) deliberately lives in
//! `elmlink-app`: this crate only knows how to open a brand-new connection
//! and report what happens to it.

pub mod address;
pub mod codec;
pub mod liveness;
pub mod socket;

pub use address::{ConnectParams, ServerAddress};
pub use codec::{
    decode_client_message, decode_server_message, encode_client_message, encode_server_message,
    CODE_SENTINEL,
};
pub use liveness::{LivenessTimer, FOCUS_ACK_TIMEOUT};
pub use socket::{open, ConnectionId, SocketEvent, SocketHandle};
