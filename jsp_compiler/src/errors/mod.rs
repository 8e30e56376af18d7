//! Translation errors and the error dispatcher
//!
//! Every template-level diagnostic goes through an [`ErrorDispatcher`], which
//! renders the location, logs the event with its code and builds the
//! [`JspError`] the caller propagates. A dispatcher can also hold deferred
//! findings so a pass surfaces several of them at once.

pub mod mapping;
pub mod messages;

pub use mapping::{map_compile_error, JavacErrorDetail};

use crate::logging::{codes, Code};
use crate::utils::Mark;
use crate::log_error;
use std::fmt;

pub type JspResult<T> = Result<T, JspError>;

/// Location of a diagnostic as reported to users
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorLocation {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl ErrorLocation {
    pub fn from_mark(mark: &Mark, jspc_mode: bool) -> Self {
        Self {
            file: mark.display_name(jspc_mode).to_string(),
            line: mark.line(),
            column: mark.column(),
        }
    }
}

impl fmt::Display for ErrorLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (line: {}, column: {})", self.file, self.line, self.column)
    }
}

fn render_translation(location: &Option<ErrorLocation>, message: &str) -> String {
    match location {
        Some(location) => format!("{} {}", location, message),
        None => message.to_string(),
    }
}

fn render_multiple(errors: &[JspError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_compile(details: &[JavacErrorDetail]) -> String {
    let mut out = messages::failed_class_compilation();
    for detail in details {
        out.push_str("\n\n");
        out.push_str(&detail.to_string());
    }
    out
}

/// The translation failure of one compiled unit
#[derive(Debug, Clone, thiserror::Error)]
pub enum JspError {
    #[error("{}", render_translation(.location, .message))]
    Translation {
        code: Code,
        message: String,
        location: Option<ErrorLocation>,
        mark: Option<Mark>,
        cause: Option<String>,
    },

    /// Several findings collected by one pass
    #[error("{}", render_multiple(.errors))]
    Multiple { errors: Vec<JspError> },

    /// Downstream compile errors mapped back onto the template
    #[error("{}", render_compile(.details))]
    Compile { details: Vec<JavacErrorDetail> },
}

impl JspError {
    pub fn error_code(&self) -> Code {
        match self {
            Self::Translation { code, .. } => *code,
            Self::Multiple { errors } => errors
                .first()
                .map(JspError::error_code)
                .unwrap_or(codes::system::INTERNAL_ERROR),
            Self::Compile { .. } => codes::mapping::COMPILE_ERRORS,
        }
    }

    pub fn mark(&self) -> Option<&Mark> {
        match self {
            Self::Translation { mark, .. } => mark.as_ref(),
            Self::Multiple { errors } => errors.first().and_then(JspError::mark),
            Self::Compile { details } => details.first().and_then(|d| d.mark.as_ref()),
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::Translation { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Every single finding, flattening batches
    pub fn findings(&self) -> Vec<&JspError> {
        match self {
            Self::Multiple { errors } => errors.iter().flat_map(JspError::findings).collect(),
            other => vec![other],
        }
    }

    /// Whether this error, or any batched finding, carries `code`
    pub fn has_code(&self, code: Code) -> bool {
        self.findings().iter().any(|e| e.error_code() == code)
    }

    pub fn severity(&self) -> codes::Severity {
        codes::get_severity(self.error_code().as_str())
    }
}

/// Central sink for translation diagnostics of one unit
#[derive(Debug, Default)]
pub struct ErrorDispatcher {
    jspc_mode: bool,
    deferred: Vec<JspError>,
}

impl ErrorDispatcher {
    pub fn new(jspc_mode: bool) -> Self {
        Self {
            jspc_mode,
            deferred: Vec::new(),
        }
    }

    pub fn jspc_mode(&self) -> bool {
        self.jspc_mode
    }

    /// Build and log a translation error
    pub fn error(&self, code: Code, mark: Option<&Mark>, message: impl Into<String>) -> JspError {
        self.build(code, mark, message.into(), None)
    }

    /// Like [`ErrorDispatcher::error`], keeping the text of an underlying cause
    pub fn error_with_cause(
        &self,
        code: Code,
        mark: Option<&Mark>,
        message: impl Into<String>,
        cause: &dyn std::error::Error,
    ) -> JspError {
        self.build(code, mark, message.into(), Some(cause.to_string()))
    }

    fn build(
        &self,
        code: Code,
        mark: Option<&Mark>,
        message: String,
        cause: Option<String>,
    ) -> JspError {
        match &cause {
            Some(cause) => log_error!(code, &message, mark = mark, "cause" => cause),
            None => log_error!(code, &message, mark = mark),
        }
        JspError::Translation {
            code,
            location: mark.map(|m| ErrorLocation::from_mark(m, self.jspc_mode)),
            mark: mark.cloned(),
            message,
            cause,
        }
    }

    /// Fail immediately
    pub fn fail<T>(&self, code: Code, mark: Option<&Mark>, message: impl Into<String>) -> JspResult<T> {
        Err(self.error(code, mark, message))
    }

    /// Record a finding and keep going
    pub fn defer(&mut self, code: Code, mark: Option<&Mark>, message: impl Into<String>) {
        let error = self.error(code, mark, message);
        self.deferred.push(error);
    }

    /// Record an already built error and keep going
    pub fn defer_error(&mut self, error: JspError) {
        match error {
            JspError::Multiple { errors } => self.deferred.extend(errors),
            other => self.deferred.push(other),
        }
    }

    pub fn has_deferred(&self) -> bool {
        !self.deferred.is_empty()
    }

    pub fn deferred_count(&self) -> usize {
        self.deferred.len()
    }

    /// Surface everything deferred so far; one finding is returned as is
    pub fn finish(&mut self) -> JspResult<()> {
        let mut errors = std::mem::take(&mut self.deferred);
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(JspError::Multiple { errors }),
        }
    }

    /// Report a batch of mapped downstream compile errors
    pub fn javac_errors(&self, details: Vec<JavacErrorDetail>) -> JspError {
        for detail in &details {
            log_error!(
                codes::mapping::COMPILE_ERRORS,
                &detail.error_message,
                mark = detail.mark.as_ref(),
                "java_line" => detail.java_line
            );
        }
        JspError::Compile { details }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_translation_error_location() {
        let _ = crate::logging::init_global_logging();
        let dispatcher = ErrorDispatcher::new(false);
        let mark = Mark::new("/index.jsp", 3, 7).with_resource_url("file:/srv/app/index.jsp");
        let err = dispatcher.error(
            codes::lexical::MISSING_QUOTE,
            Some(&mark),
            messages::missing_quote(),
        );
        assert_eq!(
            err.to_string(),
            "/index.jsp (line: 3, column: 7) Quote symbol expected"
        );
        assert_eq!(err.error_code(), codes::lexical::MISSING_QUOTE);

        let jspc = ErrorDispatcher::new(true);
        let err = jspc.error(codes::lexical::MISSING_QUOTE, Some(&mark), "x");
        assert_matches!(err, JspError::Translation { location: Some(ref l), .. } if l.file == "file:/srv/app/index.jsp");
    }

    #[test]
    fn test_error_without_location() {
        let _ = crate::logging::init_global_logging();
        let dispatcher = ErrorDispatcher::new(false);
        let err = dispatcher.error(codes::resources::RESOURCE_NOT_FOUND, None, "File \"/x.jsp\" not found");
        assert_eq!(err.to_string(), "File \"/x.jsp\" not found");
        assert!(err.mark().is_none());
    }

    #[test]
    fn test_deferred_findings_are_batched() {
        let _ = crate::logging::init_global_logging();
        let mut dispatcher = ErrorDispatcher::new(false);
        assert!(dispatcher.finish().is_ok());

        let mark = Mark::new("/a.jsp", 1, 1);
        dispatcher.defer(codes::syntax::SCRIPTING_NOT_ALLOWED, Some(&mark), "one");
        dispatcher.defer(codes::syntax::UNBALANCED_END_TAG, Some(&mark), "two");
        assert_eq!(dispatcher.deferred_count(), 2);

        let err = dispatcher.finish().unwrap_err();
        assert_matches!(err, JspError::Multiple { ref errors } if errors.len() == 2);
        assert_eq!(err.error_code(), codes::syntax::SCRIPTING_NOT_ALLOWED);
        assert!(err.has_code(codes::syntax::UNBALANCED_END_TAG));
        assert!(!dispatcher.has_deferred());
    }

    #[test]
    fn test_single_deferred_finding_is_unwrapped() {
        let _ = crate::logging::init_global_logging();
        let mut dispatcher = ErrorDispatcher::new(false);
        dispatcher.defer(codes::syntax::DUPLICATE_ATTRIBUTE, None, "dup");
        assert_matches!(dispatcher.finish(), Err(JspError::Translation { .. }));
    }
}
