//! Translation front-end for JSP pages and tag files
//!
//! Sources are parsed into a node tree, validated against their directives,
//! standard-action and tag-library contracts, linked to the tag files they
//! use and finally handed to tag plugins. Code generation is not part of
//! this crate.

#[macro_use]
pub mod logging;

pub mod batch;
pub mod config;
pub mod context;
pub mod el;
pub mod errors;
pub mod nodes;
pub mod page_info;
pub mod parser;
pub mod pipeline;
pub mod plugin;
pub mod reader;
pub mod resources;
pub mod tagfile;
pub mod taglib;
pub mod utils;
pub mod validation;

pub use batch::{BatchConfig, BatchError, BatchResults};
pub use config::CompilerOptions;
pub use context::CompilationContext;
pub use errors::{JspError, JspResult};
pub use pipeline::{compile_page, compile_tag_file, CompiledUnit, PipelineError};
pub use resources::{FsResources, MemoryResources, ResourceProvider};
