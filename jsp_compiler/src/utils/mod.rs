//! Shared primitives used by every stage of the compiler: source marks and
//! context-relative path helpers.

pub mod mark;
pub mod paths;

pub use mark::{Mark, SourceMap};
pub use paths::UriType;
