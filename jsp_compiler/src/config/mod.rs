//! Configuration module for the JSP compiler
//!
//! `constants` holds fixed limits and conventions; `runtime` holds the
//! user-adjustable preferences that are threaded explicitly through the
//! compilation context.

pub mod constants;
pub mod runtime;

pub use constants::compile_time;
pub use runtime::{
    BatchPreferences, CompilerOptions, ConfigError, LoggingPreferences, RuntimeConfig,
};
