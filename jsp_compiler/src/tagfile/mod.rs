//! Tag files
//!
//! A tag file is a template that implements a custom tag. Its interface is
//! read from its directives ([`directives`]); its handler is obtained by
//! compiling it on first use ([`loader`]), with the per-context state kept
//! in the [`registry`].

pub mod directives;
pub mod loader;
pub mod registry;

pub use registry::{ChainGuard, CompileChain, HandlerRef, TagFileEntry, TagFileRegistry};
