// RUNTIME PREFERENCES (User Experience)

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read configuration file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration file '{path}': {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Options that shape how a single page or tag file is translated.
///
/// Values are carried by the compilation context and handed to the parser
/// controller; nothing here is read from process-wide state after startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CompilerOptions {
    /// Attributes must be separated by whitespace
    pub strict_whitespace: bool,

    /// Quotes inside attribute values must be escaped
    pub strict_quote_escaping: bool,

    /// An unbound `prefix:name` tag is an error instead of template text
    pub error_on_undeclared_namespace: bool,

    /// Default for `isELIgnored` when no directive sets it
    pub is_el_ignored: bool,

    /// Default for `deferredSyntaxAllowedAsLiteral`
    pub deferred_syntax_allowed_as_literal: bool,

    /// Default for `trimDirectiveWhitespaces`
    pub trim_directive_whitespaces: bool,

    /// Encoding imposed by configuration (property-group level)
    pub default_page_encoding: Option<String>,

    /// Resources included before every top-level page
    pub include_prelude: Vec<String>,

    /// Resources included after every top-level page
    pub include_coda: Vec<String>,

    /// Force the XML syntax for every page
    pub is_xml_syntax: bool,

    /// `useBean` class attribute must name a known class
    pub error_on_use_bean_invalid_class_attribute: bool,

    /// Report full resource URLs instead of context-relative paths
    pub jspc_mode: bool,

    /// Apply tag plugins after validation
    pub enable_tag_plugins: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            strict_whitespace: env::var("JSP_STRICT_WHITESPACE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            strict_quote_escaping: env::var("JSP_STRICT_QUOTE_ESCAPING")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            error_on_undeclared_namespace: env::var("JSP_ERROR_ON_UNDECLARED_NAMESPACE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            is_el_ignored: env::var("JSP_IS_EL_IGNORED")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            deferred_syntax_allowed_as_literal: env::var("JSP_DEFERRED_SYNTAX_ALLOWED_AS_LITERAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            trim_directive_whitespaces: env::var("JSP_TRIM_DIRECTIVE_WHITESPACES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            default_page_encoding: env::var("JSP_DEFAULT_PAGE_ENCODING")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            include_prelude: env::var("JSP_INCLUDE_PRELUDE")
                .ok()
                .map(|v| split_list(&v))
                .unwrap_or_default(),
            include_coda: env::var("JSP_INCLUDE_CODA")
                .ok()
                .map(|v| split_list(&v))
                .unwrap_or_default(),
            is_xml_syntax: env::var("JSP_IS_XML_SYNTAX")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            error_on_use_bean_invalid_class_attribute: env::var(
                "JSP_ERROR_ON_USE_BEAN_INVALID_CLASS_ATTRIBUTE",
            )
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(true),
            jspc_mode: env::var("JSP_JSPC_MODE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            enable_tag_plugins: env::var("JSP_ENABLE_TAG_PLUGINS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LoggingPreferences {
    /// Whether to use structured JSON logging (user preference)
    pub use_structured_logging: bool,

    /// Whether to enable console output (user preference)
    pub enable_console_logging: bool,

    /// User preferred minimum log level
    pub min_log_level: LogLevel,

    /// Whether to include timing events in logs
    pub log_performance_events: bool,

    /// Whether to enable cargo-style error reporting
    pub enable_cargo_style_output: bool,

    /// Whether to include file context in log messages
    pub include_file_context: bool,
}

impl Default for LoggingPreferences {
    fn default() -> Self {
        Self {
            use_structured_logging: env::var("JSP_LOGGING_USE_STRUCTURED")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            enable_console_logging: env::var("JSP_LOGGING_ENABLE_CONSOLE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            min_log_level: env::var("JSP_LOGGING_MIN_LEVEL")
                .ok()
                .and_then(|v| parse_log_level(&v))
                .unwrap_or(LogLevel::Info),
            log_performance_events: env::var("JSP_LOGGING_LOG_PERFORMANCE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            enable_cargo_style_output: env::var("JSP_LOGGING_CARGO_STYLE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            include_file_context: env::var("JSP_LOGGING_INCLUDE_FILE_CONTEXT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BatchPreferences {
    /// Worker threads (0 selects the available parallelism)
    pub threads: usize,

    /// Stop scheduling new pages after the first failure
    pub fail_fast: bool,

    /// Descend into sub-directories of the web root
    pub recursive: bool,

    /// Print progress while compiling
    pub progress_reporting: bool,
}

impl Default for BatchPreferences {
    fn default() -> Self {
        Self {
            threads: env::var("JSP_BATCH_THREADS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            fail_fast: env::var("JSP_BATCH_FAIL_FAST")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            recursive: env::var("JSP_BATCH_RECURSIVE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            progress_reporting: env::var("JSP_BATCH_PROGRESS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error = 0,
    Warning = 1,
    Info = 2,
    Debug = 3,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warning => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }

    /// Convert to events::LogLevel for compatibility
    pub fn to_events_log_level(&self) -> crate::logging::events::LogLevel {
        match self {
            LogLevel::Error => crate::logging::events::LogLevel::Error,
            LogLevel::Warning => crate::logging::events::LogLevel::Warning,
            LogLevel::Info => crate::logging::events::LogLevel::Info,
            LogLevel::Debug => crate::logging::events::LogLevel::Debug,
        }
    }
}

/// Parse log level from string (used for environment variables)
fn parse_log_level(level: &str) -> Option<LogLevel> {
    match level.to_lowercase().as_str() {
        "error" | "0" => Some(LogLevel::Error),
        "warning" | "warn" | "1" => Some(LogLevel::Warning),
        "info" | "2" => Some(LogLevel::Info),
        "debug" | "3" => Some(LogLevel::Debug),
        _ => None,
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub compiler: CompilerOptions,
    pub logging: LoggingPreferences,
    pub batch: BatchPreferences,
}

impl RuntimeConfig {
    /// Parse a TOML document; missing keys fall back to environment defaults.
    pub fn from_toml_str(source: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: RuntimeConfig = toml::from_str(source).map_err(|e| ConfigError::Parse {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source, path)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for entry in self
            .compiler
            .include_prelude
            .iter()
            .chain(self.compiler.include_coda.iter())
        {
            if !entry.starts_with('/') {
                return Err(ConfigError::InvalidValue {
                    key: "include-prelude/include-coda".to_string(),
                    message: format!("'{}' must be a context-relative path", entry),
                });
            }
        }
        if let Some(enc) = &self.compiler.default_page_encoding {
            if enc.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: "default-page-encoding".to_string(),
                    message: "encoding name cannot be empty".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Environment variable names for configuration
pub mod env_vars {
    // Compiler
    pub const STRICT_WHITESPACE: &str = "JSP_STRICT_WHITESPACE";
    pub const STRICT_QUOTE_ESCAPING: &str = "JSP_STRICT_QUOTE_ESCAPING";
    pub const ERROR_ON_UNDECLARED_NAMESPACE: &str = "JSP_ERROR_ON_UNDECLARED_NAMESPACE";
    pub const IS_EL_IGNORED: &str = "JSP_IS_EL_IGNORED";
    pub const DEFERRED_SYNTAX_ALLOWED_AS_LITERAL: &str = "JSP_DEFERRED_SYNTAX_ALLOWED_AS_LITERAL";
    pub const TRIM_DIRECTIVE_WHITESPACES: &str = "JSP_TRIM_DIRECTIVE_WHITESPACES";
    pub const DEFAULT_PAGE_ENCODING: &str = "JSP_DEFAULT_PAGE_ENCODING";
    pub const INCLUDE_PRELUDE: &str = "JSP_INCLUDE_PRELUDE";
    pub const INCLUDE_CODA: &str = "JSP_INCLUDE_CODA";
    pub const IS_XML_SYNTAX: &str = "JSP_IS_XML_SYNTAX";
    pub const ERROR_ON_USE_BEAN_INVALID_CLASS_ATTRIBUTE: &str =
        "JSP_ERROR_ON_USE_BEAN_INVALID_CLASS_ATTRIBUTE";
    pub const JSPC_MODE: &str = "JSP_JSPC_MODE";
    pub const ENABLE_TAG_PLUGINS: &str = "JSP_ENABLE_TAG_PLUGINS";

    // Logging
    pub const LOGGING_USE_STRUCTURED: &str = "JSP_LOGGING_USE_STRUCTURED";
    pub const LOGGING_ENABLE_CONSOLE: &str = "JSP_LOGGING_ENABLE_CONSOLE";
    pub const LOGGING_MIN_LEVEL: &str = "JSP_LOGGING_MIN_LEVEL";
    pub const LOGGING_LOG_PERFORMANCE: &str = "JSP_LOGGING_LOG_PERFORMANCE";
    pub const LOGGING_CARGO_STYLE: &str = "JSP_LOGGING_CARGO_STYLE";
    pub const LOGGING_INCLUDE_FILE_CONTEXT: &str = "JSP_LOGGING_INCLUDE_FILE_CONTEXT";

    // Batch
    pub const BATCH_THREADS: &str = "JSP_BATCH_THREADS";
    pub const BATCH_FAIL_FAST: &str = "JSP_BATCH_FAIL_FAST";
    pub const BATCH_RECURSIVE: &str = "JSP_BATCH_RECURSIVE";
    pub const BATCH_PROGRESS: &str = "JSP_BATCH_PROGRESS";
}
