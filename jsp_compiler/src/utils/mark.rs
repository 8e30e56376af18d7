//! Source positions for template files
//!
//! A [`Mark`] is the provenance attached to every node and diagnostic. Marks
//! are produced by the scanning reader; all other components treat them as
//! opaque handles.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// An immutable position in a template source.
///
/// Equality only considers the file identity, line, column and resource URL.
/// The character offset is an implementation detail of the reader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mark {
    file: Arc<str>,
    line: u32,
    column: u32,
    #[serde(skip)]
    offset: usize,
    resource_url: Option<Arc<str>>,
}

impl Mark {
    /// Create a mark at a given 1-based line and column
    pub fn new(file: impl Into<Arc<str>>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
            offset: 0,
            resource_url: None,
        }
    }

    /// First character of a file
    pub fn start_of(file: impl Into<Arc<str>>) -> Self {
        Self::new(file, 1, 1)
    }

    pub(crate) fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_resource_url(mut self, url: impl Into<Arc<str>>) -> Self {
        self.resource_url = Some(url.into());
        self
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub(crate) fn file_arc(&self) -> &Arc<str> {
        &self.file
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn column(&self) -> u32 {
        self.column
    }

    pub(crate) fn offset(&self) -> usize {
        self.offset
    }

    pub fn resource_url(&self) -> Option<&str> {
        self.resource_url.as_deref()
    }

    /// Same location with the line replaced, used by compile-error mapping
    pub fn at_line(&self, line: u32) -> Self {
        let mut mark = self.clone();
        mark.line = line;
        mark
    }

    /// Location text: the resource URL in jspc mode, the context path otherwise
    pub fn display_name(&self, prefer_url: bool) -> &str {
        if prefer_url {
            self.resource_url.as_deref().unwrap_or(&self.file)
        } else {
            &self.file
        }
    }
}

impl PartialEq for Mark {
    fn eq(&self, other: &Self) -> bool {
        self.file == other.file
            && self.line == other.line
            && self.column == other.column
            && self.resource_url == other.resource_url
    }
}

impl Eq for Mark {}

impl Hash for Mark {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.file.hash(state);
        self.line.hash(state);
        self.column.hash(state);
        self.resource_url.hash(state);
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({},{})", self.file, self.line, self.column)
    }
}

/// Line index over a source text, used to render diagnostics with context
#[derive(Debug, Clone)]
pub struct SourceMap {
    /// The original source text
    pub source: String,
    /// Byte offsets of line starts
    line_starts: Vec<usize>,
}

impl SourceMap {
    pub fn new(source: String) -> Self {
        let mut line_starts = vec![0];
        for (offset, ch) in source.char_indices() {
            if ch == '\n' {
                line_starts.push(offset + 1);
            }
        }
        Self {
            source,
            line_starts,
        }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Get a line of text by line number (1-based)
    pub fn get_line(&self, line_num: u32) -> Option<&str> {
        if line_num == 0 {
            return None;
        }

        let line_idx = (line_num - 1) as usize;
        if line_idx >= self.line_starts.len() {
            return None;
        }

        let start = self.line_starts[line_idx];
        let end = if line_idx + 1 < self.line_starts.len() {
            self.line_starts[line_idx + 1] - 1
        } else {
            self.source.len()
        };

        Some(self.source[start..end].trim_end_matches('\r'))
    }

    /// Format an error message with source context
    pub fn format_error(&self, mark: &Mark, message: &str) -> String {
        let mut result = String::new();

        result.push_str(&format!("error: {}\n", message));
        result.push_str(&format!(
            "  --> {}:{}:{}\n",
            mark.file(),
            mark.line(),
            mark.column()
        ));

        if let Some(line) = self.get_line(mark.line()) {
            let line_num_str = format!("{}", mark.line());
            let padding = " ".repeat(line_num_str.len());

            result.push_str(&format!("   {} |\n", padding));
            result.push_str(&format!("{} | {}\n", line_num_str, line));

            let mut underline = String::new();
            underline.push_str(&format!("   {} | ", padding));
            for _ in 1..mark.column() {
                underline.push(' ');
            }
            underline.push('^');

            result.push_str(&underline);
            result.push('\n');
        }

        result
    }
}
