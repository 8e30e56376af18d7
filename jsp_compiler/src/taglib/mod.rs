//! Tag libraries
//!
//! Metadata records, descriptor inputs, extension hooks, and the two ways a
//! taglib directive finds its library: an explicit descriptor located by
//! URI ([`resolver`]) or an implicit library over a tag directory
//! ([`implicit`]).

mod info;

pub mod descriptor;
pub mod extra;
pub mod implicit;
pub mod resolver;

pub use info::*;
