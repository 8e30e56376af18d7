use crate::errors::JspError;
use crate::logging::{codes, Code};

/// Pipeline processing errors
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("{0}")]
    Translation(#[from] JspError),

    #[error("Pipeline error: {message}")]
    Pipeline { message: String },
}

impl PipelineError {
    pub fn pipeline_error(message: &str) -> Self {
        Self::Pipeline {
            message: message.to_string(),
        }
    }

    pub fn error_code(&self) -> Code {
        match self {
            Self::Translation(error) => error.error_code(),
            Self::Pipeline { .. } => codes::system::INTERNAL_ERROR,
        }
    }

    /// The translation error, when the unit failed on its template
    pub fn translation(&self) -> Option<&JspError> {
        match self {
            Self::Translation(error) => Some(error),
            Self::Pipeline { .. } => None,
        }
    }
}
