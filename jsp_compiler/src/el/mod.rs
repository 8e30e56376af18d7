//! Expression language support
//!
//! Splits attribute values and template text into literal text and
//! `${..}` / `#{..}` spans, and parses each span into a small expression
//! tree. The tree is only used for translation-time checks: syntax, and the
//! resolution of function calls against tag libraries.

pub mod lexer;
pub mod parser;

pub use parser::{parse_expression, Expr, FunctionCall, ResolvedFunction};

use crate::logging::{codes, Code};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ElError {
    #[error("Failed to parse the expression [{expression}]: {message} at position {position}")]
    Syntax {
        expression: String,
        position: usize,
        message: String,
    },

    #[error("The expression starting with {opener} is not terminated")]
    Unterminated { opener: String },
}

impl ElError {
    pub fn syntax(expression: &str, position: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            expression: expression.to_string(),
            position,
            message: message.into(),
        }
    }

    pub fn error_code(&self) -> Code {
        codes::expression::EL_SYNTAX
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElNode {
    Text(String),
    Expression {
        /// `$` or `#`
        delimiter: char,
        /// Body as written, without the delimiters
        text: String,
        expr: Expr,
    },
}

/// A parsed attribute value or text span
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ElNodes(pub Vec<ElNode>);

impl ElNodes {
    pub fn iter(&self) -> std::slice::Iter<'_, ElNode> {
        self.0.iter()
    }

    pub fn has_immediate(&self) -> bool {
        self.0
            .iter()
            .any(|n| matches!(n, ElNode::Expression { delimiter: '$', .. }))
    }

    pub fn has_deferred(&self) -> bool {
        self.0
            .iter()
            .any(|n| matches!(n, ElNode::Expression { delimiter: '#', .. }))
    }

    /// No expression spans at all
    pub fn is_literal(&self) -> bool {
        self.0.iter().all(|n| matches!(n, ElNode::Text(_)))
    }

    /// Concatenated literal text, with escapes already removed
    pub fn literal_text(&self) -> String {
        self.0
            .iter()
            .filter_map(|n| match n {
                ElNode::Text(text) => Some(text.as_str()),
                ElNode::Expression { .. } => None,
            })
            .collect()
    }

    pub fn functions(&self) -> Vec<&FunctionCall> {
        let mut calls = Vec::new();
        for node in &self.0 {
            if let ElNode::Expression { expr, .. } = node {
                expr.for_each_function(&mut |call| calls.push(call));
            }
        }
        calls
    }

    pub fn for_each_function_mut(&mut self, visit: &mut impl FnMut(&mut FunctionCall)) {
        for node in &mut self.0 {
            if let ElNode::Expression { expr, .. } = node {
                expr.for_each_function_mut(visit);
            }
        }
    }
}

/// Parse a single expression body that the template parser already isolated
pub fn parse_single(delimiter: char, text: &str) -> Result<ElNodes, ElError> {
    let expr = parse_expression(text)?;
    Ok(ElNodes(vec![ElNode::Expression {
        delimiter,
        text: text.to_string(),
        expr,
    }]))
}

/// Split `input` into text and expressions and parse every expression.
///
/// `\$` and `\#` produce the literal character. When
/// `deferred_as_literal` is set, `#{` is plain text.
pub fn parse_template(input: &str, deferred_as_literal: bool) -> Result<ElNodes, ElError> {
    let chars: Vec<char> = input.chars().collect();
    let mut nodes = Vec::new();
    let mut text = String::new();
    let mut pos = 0;

    while pos < chars.len() {
        let ch = chars[pos];
        let next = chars.get(pos + 1).copied();
        if ch == '\\' {
            match next {
                Some(escaped @ '$') => {
                    text.push(escaped);
                    pos += 2;
                }
                Some(escaped @ '#') if !deferred_as_literal => {
                    text.push(escaped);
                    pos += 2;
                }
                _ => {
                    text.push('\\');
                    pos += 1;
                }
            }
            continue;
        }
        let opens = next == Some('{') && (ch == '$' || (ch == '#' && !deferred_as_literal));
        if !opens {
            text.push(ch);
            pos += 1;
            continue;
        }

        let body_start = pos + 2;
        let body_end = find_expression_end(&chars, body_start).ok_or_else(|| {
            ElError::Unterminated {
                opener: format!("{}{{", ch),
            }
        })?;
        if !text.is_empty() {
            nodes.push(ElNode::Text(std::mem::take(&mut text)));
        }
        let body: String = chars[body_start..body_end].iter().collect();
        let expr = parse_expression(&body)?;
        nodes.push(ElNode::Expression {
            delimiter: ch,
            text: body,
            expr,
        });
        pos = body_end + 1;
    }
    if !text.is_empty() {
        nodes.push(ElNode::Text(text));
    }
    Ok(ElNodes(nodes))
}

/// Index of the `}` closing an expression whose body starts at `start`
fn find_expression_end(chars: &[char], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut pos = start;
    while pos < chars.len() {
        let ch = chars[pos];
        match quote {
            Some(q) => {
                if ch == '\\' {
                    pos += 1;
                } else if ch == q {
                    quote = None;
                }
            }
            None => match ch {
                '\'' | '"' => quote = Some(ch),
                '{' => depth += 1,
                '}' if depth == 0 => return Some(pos),
                '}' => depth -= 1,
                _ => {}
            },
        }
        pos += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_split_text_and_expressions() {
        let nodes = parse_template("Hello ${user.name}, you have #{cart.size} items", false).unwrap();
        assert_eq!(nodes.0.len(), 5);
        assert!(nodes.has_immediate());
        assert!(nodes.has_deferred());
        assert_eq!(nodes.literal_text(), "Hello , you have  items");
    }

    #[test]
    fn test_escaped_delimiters_are_text() {
        let nodes = parse_template(r"cost \${price}", false).unwrap();
        assert!(nodes.is_literal());
        assert_eq!(nodes.literal_text(), "cost ${price}");
    }

    #[test]
    fn test_deferred_as_literal() {
        let nodes = parse_template("#{not.parsed ~}", true).unwrap();
        assert!(nodes.is_literal());
        assert!(!nodes.has_deferred());
    }

    #[test]
    fn test_braces_inside_strings() {
        let nodes = parse_template("${'}' == x}", false).unwrap();
        assert_eq!(nodes.0.len(), 1);
        assert_matches!(&nodes.0[0], ElNode::Expression { text, .. } if text == "'}' == x");
    }

    #[test]
    fn test_errors() {
        assert_matches!(
            parse_template("${open", false),
            Err(ElError::Unterminated { .. })
        );
        assert_matches!(
            parse_template("${a +}", false),
            Err(ElError::Syntax { .. })
        );
    }

    #[test]
    fn test_function_collection() {
        let mut nodes = parse_template("${fn:trim(a)} and ${f:x(fn:len(b))}", false).unwrap();
        let names: Vec<String> = nodes.functions().iter().map(|f| f.qualified_name()).collect();
        assert_eq!(names, vec!["fn:trim", "f:x", "fn:len"]);

        nodes.for_each_function_mut(&mut |call| {
            call.resolved = Some(ResolvedFunction {
                uri: "u".to_string(),
                class_name: "C".to_string(),
                method_name: call.name.clone(),
                parameters: Vec::new(),
                return_type: "void".to_string(),
            })
        });
        assert!(nodes.functions().iter().all(|f| f.resolved.is_some()));
    }
}
