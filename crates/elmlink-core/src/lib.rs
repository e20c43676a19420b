//! # elmlink-core - Core Domain Types
//!
//! Foundation crate for elm-link. Provides domain types, error handling, the
//! session protocol vocabulary, and logging bootstrap.
//!
//! This crate has **zero internal dependencies** -- it only depends on external
//! crates (serde, chrono, thiserror, tracing).
//!
//! ## Public API
//!
//! ### Domain Types (`types`)
//! - [`CompilationMode`] - How a target's running code was compiled
//! - [`BrowserUiPosition`] - Corner the browser UI is docked in
//! - [`CompileErrorReport`], [`ErrorColors`], [`ErrorLocation`] - Server error payloads
//! - [`IdleReason`] - Why a session reached a settled state
//!
//! ### Protocol (`protocol`)
//! - [`ServerMessage`], [`ServerStatus`] - Typed server → client messages
//! - [`ClientMessage`] - Typed client → server messages
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Custom error enum with `fatal` vs `recoverable` classification
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding error context
//!
//! ## Prelude
//!
//! Import commonly used types with:
//! ```rust
//! use elmlink_core::prelude::*;
//! ```

pub mod error;
pub mod logging;
pub mod prelude;
pub mod protocol;
pub mod types;

// Re-export commonly used types at crate root for convenience
pub use error::{Error, Result, ResultExt};
pub use protocol::{ClientMessage, ServerMessage, ServerStatus};
pub use types::{
    BrowserUiPosition, CompilationMode, CompileErrorReport, ErrorColors, ErrorLocation, IdleReason,
};
