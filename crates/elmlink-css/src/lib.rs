//! # elmlink-css - Stylesheet Hot Patching
//!
//! A mutable stylesheet object model ([`model`]), a small error-tolerant
//! parser ([`parse`]), and the minimal-diff reconciler ([`reconcile`]) that
//! updates a live sheet to match freshly compiled CSS while preserving
//! edits the developer made live in devtools.
//!
//! The reconciler is "good enough, not maximal": style rules are diffed at
//! declaration granularity, nested containers recurse when their condition
//! is unchanged, and everything else falls back to a wholesale replace at
//! the same index.

pub mod model;
pub mod parse;
pub mod reconcile;

pub use model::{
    ConditionalKind, ConditionalRule, CssRule, Declaration, ImportRule, OtherRule, StyleRule,
    Stylesheet,
};
pub use parse::parse_stylesheet;
pub use reconcile::{reconcile, reconcile_text};
