//! Template parser
//!
//! Turns standard-syntax JSP sources into a node [`Tree`](crate::nodes::Tree).
//! The [`ParserController`] owns file loading, encoding detection and the
//! include stack; the grammar itself lives in `grammar` and `attributes`.

mod attributes;
mod controller;
pub mod encoding;
mod grammar;

pub use attributes::unquote;
pub use controller::ParserController;

use crate::taglib::BodyContent;

/// How the body of an element is parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyType {
    Empty,
    Jsp,
    Scriptless,
    TagDependent,
    /// Template text and expressions only
    Template,
    /// `jsp:param` elements only
    Param,
    /// `jsp:params` and `jsp:fallback` only
    Plugin,
}

impl From<BodyContent> for BodyType {
    fn from(content: BodyContent) -> Self {
        match content {
            BodyContent::Empty => Self::Empty,
            BodyContent::Jsp => Self::Jsp,
            BodyContent::Scriptless => Self::Scriptless,
            BodyContent::TagDependent => Self::TagDependent,
        }
    }
}

/// What the element loop accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ElementMode {
    Jsp,
    Scriptless,
    TemplateText,
}

#[cfg(test)]
mod tests;
