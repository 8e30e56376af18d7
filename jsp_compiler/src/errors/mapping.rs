//! Mapping of generated-source compile errors back onto the template

use super::messages;
use crate::logging::codes;
use crate::nodes::{NodeKind, Tree};
use crate::utils::{Mark, SourceMap};
use crate::log_warning;
use std::fmt;

/// Lines of template source shown around a mapped error
const EXTRACT_CONTEXT_LINES: u32 = 3;

/// One downstream compile error with its template location when known
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JavacErrorDetail {
    pub java_file: String,
    pub java_line: u32,
    pub jsp_file: Option<String>,
    pub jsp_line: Option<u32>,
    pub error_message: String,
    pub jsp_extract: Option<String>,
    /// Start of the node the error was attributed to, at the mapped line
    pub mark: Option<Mark>,
    /// The line is exact (scriptlets map one to one)
    pub exact: bool,
}

impl fmt::Display for JavacErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.jsp_file, self.jsp_line) {
            (Some(file), Some(line)) => {
                writeln!(f, "{}", messages::error_in_jsp_file(line, file))?;
                write!(f, "{}", self.error_message)?;
                if let Some(extract) = &self.jsp_extract {
                    write!(f, "\n{}", extract)?;
                }
                Ok(())
            }
            _ => {
                writeln!(f, "{}", messages::error_in_java_file(self.java_line))?;
                write!(f, "{}", self.error_message)
            }
        }
    }
}

/// Attribute a generated-source line to the innermost node whose recorded
/// range contains it.
///
/// Scriptlets have a line-for-line correspondence with their source, so the
/// exact template line is recomputed; any other node yields its start line.
/// When no node matches, the detail only carries the generated line.
pub fn map_compile_error(
    tree: &Tree,
    java_file: &str,
    java_line: u32,
    message: &str,
    source: Option<&SourceMap>,
) -> JavacErrorDetail {
    let found = tree
        .preorder(tree.root())
        .into_iter()
        .filter(|id| tree.node(*id).contains_java_line(java_line))
        .last();

    let located = found.and_then(|id| {
        let node = tree.node(id);
        let start = node.mark()?;
        let (line, exact) = match node.kind {
            NodeKind::Scriptlet { .. } => (
                start.line() + java_line.saturating_sub(node.begin_java_line),
                true,
            ),
            _ => (start.line(), false),
        };
        Some((start.at_line(line), exact))
    });

    match located {
        Some((mark, exact)) => JavacErrorDetail {
            java_file: java_file.to_string(),
            java_line,
            jsp_file: Some(mark.file().to_string()),
            jsp_line: Some(mark.line()),
            error_message: message.to_string(),
            jsp_extract: source.map(|s| extract(s, mark.line())),
            mark: Some(mark),
            exact,
        },
        None => {
            log_warning!(
                codes::mapping::UNMAPPED_COMPILE_ERROR,
                &format!("Line {} of {} does not map to any template node", java_line, java_file),
                mark = None
            );
            JavacErrorDetail {
                java_file: java_file.to_string(),
                java_line,
                jsp_file: None,
                jsp_line: None,
                error_message: message.to_string(),
                jsp_extract: None,
                mark: None,
                exact: false,
            }
        }
    }
}

/// Numbered source lines around `line`
fn extract(source: &SourceMap, line: u32) -> String {
    let first = line.saturating_sub(EXTRACT_CONTEXT_LINES).max(1);
    let last = line + EXTRACT_CONTEXT_LINES;
    (first..=last)
        .filter_map(|n| source.get_line(n).map(|text| format!("{}: {}", n, text)))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::{Attributes, RootData};

    fn mapped_tree() -> Tree {
        let mut tree = Tree::new(RootData::default(), Mark::start_of("/page.jsp"));
        let root = tree.root();
        let text = tree.add(
            root,
            NodeKind::TemplateText { text: "<p>".to_string() },
            Mark::new("/page.jsp", 1, 1),
            Attributes::new(),
        );
        let scriptlet = tree.add(
            root,
            NodeKind::Scriptlet { text: "\nint a = 1;\nint b = ;\n".to_string() },
            Mark::new("/page.jsp", 2, 1),
            Attributes::new(),
        );
        let root_node = tree.node_mut(root);
        root_node.begin_java_line = 1;
        root_node.end_java_line = 100;
        let node = tree.node_mut(text);
        node.begin_java_line = 40;
        node.end_java_line = 41;
        let node = tree.node_mut(scriptlet);
        node.begin_java_line = 50;
        node.end_java_line = 54;
        tree
    }

    #[test]
    fn test_scriptlet_line_is_exact() {
        let tree = mapped_tree();
        let source = SourceMap::new("<p>\n<%\nint a = 1;\nint b = ;\n%>".to_string());
        let detail = map_compile_error(&tree, "page_jsp.java", 52, "illegal start", Some(&source));
        assert_eq!(detail.jsp_line, Some(4));
        assert!(detail.exact);
        assert!(detail.jsp_extract.as_deref().unwrap_or("").contains("4: int b = ;"));
        assert!(detail.to_string().starts_with("An error occurred at line: 4 in the jsp file: /page.jsp"));
    }

    #[test]
    fn test_innermost_node_wins() {
        let tree = mapped_tree();
        let detail = map_compile_error(&tree, "page_jsp.java", 40, "bad", None);
        assert_eq!(detail.jsp_line, Some(1));
        assert!(!detail.exact);

        let outer = map_compile_error(&tree, "page_jsp.java", 10, "bad", None);
        assert_eq!(outer.jsp_line, Some(1));
    }

    #[test]
    fn test_unmapped_line_degrades() {
        let _ = crate::logging::init_global_logging();
        let tree = mapped_tree();
        let detail = map_compile_error(&tree, "page_jsp.java", 500, "missing brace", None);
        assert_eq!(detail.jsp_line, None);
        assert_eq!(detail.java_line, 500);
        assert!(detail
            .to_string()
            .starts_with("An error occurred at line: 500 in the generated java file"));
    }
}
