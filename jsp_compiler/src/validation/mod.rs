//! Translation-time validation
//!
//! Pass 1 ([`validate_directives`]) applies directive values to the
//! [`PageInfo`] and rejects conflicting or malformed ones. Pass 2
//! ([`validate`]) checks every standard action and custom tag against its
//! attribute contract, parses expression-language spans and resolves the
//! functions they call, then runs the tag library validators and the
//! `TagExtraInfo` hooks.

mod actions;
mod custom_tags;
pub mod directives;
pub mod functions;
mod library;

pub use directives::validate_directives;

use crate::context::CompilationContext;
use crate::el::{self, ElNodes};
use crate::errors::{messages, ErrorDispatcher, JspResult};
use crate::logging::codes::{attribute, expression, success};
use crate::nodes::{AttributeValue, NodeId, NodeKind, Tree};
use crate::page_info::PageInfo;
use crate::utils::Mark;
use crate::log_performance;
use std::time::Instant;

/// Pass 2 over a parsed unit whose directives already passed pass 1
pub fn validate(
    ctx: &CompilationContext,
    path: &str,
    tree: &mut Tree,
    page_info: &mut PageInfo,
    err: &mut ErrorDispatcher,
) -> JspResult<()> {
    let started = Instant::now();
    if page_info.el_ignored {
        restore_ignored_expressions(tree);
    }

    let mut checked = 0usize;
    for id in tree.preorder(tree.root()) {
        let step = match &tree.node(id).kind {
            NodeKind::ElExpression { .. } => Step::Expression,
            NodeKind::CustomTag(_) => Step::CustomTag,
            kind if actions::is_standard_action(kind) => Step::Action,
            _ => continue,
        };
        match step {
            Step::Expression => template_expression(ctx, tree, id, page_info, err)?,
            Step::CustomTag => custom_tags::check(ctx, tree, id, page_info, err)?,
            Step::Action => actions::check(ctx, tree, id, page_info, err)?,
        }
        checked += 1;
    }

    library::run_library_validators(ctx, path, tree, page_info, err)?;
    library::run_tag_extra_info(ctx, tree, err)?;
    err.finish()?;

    log_performance!(success::VALIDATION_COMPLETE, "Validation complete",
        duration = started.elapsed(),
        "path" => path,
        "checked" => checked
    );
    Ok(())
}

enum Step {
    Expression,
    CustomTag,
    Action,
}

/// Turn expressions back into text once a page directive switched EL off
fn restore_ignored_expressions(tree: &mut Tree) {
    for id in tree.preorder(tree.root()) {
        let node = tree.node_mut(id);
        if let NodeKind::ElExpression { delimiter, text, .. } = &node.kind {
            let literal = format!("{}{{{}}}", delimiter, text);
            node.kind = NodeKind::TemplateText { text: literal };
        }
    }
}

fn template_expression(
    ctx: &CompilationContext,
    tree: &mut Tree,
    id: NodeId,
    page_info: &PageInfo,
    err: &ErrorDispatcher,
) -> JspResult<()> {
    let mark = tree.node(id).mark().cloned();
    let (delimiter, text) = match &tree.node(id).kind {
        NodeKind::ElExpression { delimiter, text, .. } => (*delimiter, text.clone()),
        _ => return Ok(()),
    };
    if delimiter == '#' && page_info.deferred_syntax_allowed_as_literal {
        tree.node_mut(id).kind = NodeKind::TemplateText {
            text: format!("#{{{}}}", text),
        };
        return Ok(());
    }
    if delimiter == '#' {
        return err.fail(
            expression::DEFERRED_IN_TEMPLATE_TEXT,
            mark.as_ref(),
            messages::deferred_in_template_text(),
        );
    }
    let mut nodes = el::parse_single(delimiter, &text).map_err(|e| {
        err.error_with_cause(
            e.error_code(),
            mark.as_ref(),
            messages::invalid_expression(&format!("{}{{{}}}", delimiter, text)),
            &e,
        )
    })?;
    functions::resolve(ctx, &mut nodes, page_info, mark.as_ref(), err)?;
    if let NodeKind::ElExpression { el, .. } = &mut tree.node_mut(id).kind {
        *el = Some(nodes);
    }
    Ok(())
}

/// A raw attribute value classified as literal, scripting or EL
#[derive(Debug, Clone)]
pub(crate) struct ClassifiedValue {
    pub value: AttributeValue,
    pub el: Option<ElNodes>,
}

impl ClassifiedValue {
    pub fn is_expression(&self) -> bool {
        matches!(
            self.value,
            AttributeValue::Scripting(_) | AttributeValue::El { .. }
        )
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self.value, AttributeValue::El { deferred: true, .. })
    }

    /// Literal text, escapes removed
    pub fn literal(&self) -> Option<&str> {
        match &self.value {
            AttributeValue::Literal(text) => Some(text),
            _ => None,
        }
    }
}

/// Classify an attribute value as written.
///
/// `<%= .. %>` is a scripting value; otherwise the value is split into EL
/// spans, `#{` counting as text when `deferred_as_literal` is set. A value
/// with no spans is a literal with its `\$` / `\#` escapes removed.
pub(crate) fn classify_value(
    raw: &str,
    page_info: &PageInfo,
    deferred_as_literal: bool,
    mark: Option<&Mark>,
    err: &ErrorDispatcher,
) -> JspResult<ClassifiedValue> {
    if let Some(code) = raw.strip_prefix("<%=").and_then(|v| v.strip_suffix("%>")) {
        return Ok(ClassifiedValue {
            value: AttributeValue::Scripting(code.trim().to_string()),
            el: None,
        });
    }
    if page_info.el_ignored {
        return Ok(ClassifiedValue {
            value: AttributeValue::Literal(raw.to_string()),
            el: None,
        });
    }

    let nodes = el::parse_template(raw, deferred_as_literal).map_err(|e| {
        err.error_with_cause(e.error_code(), mark, messages::invalid_expression(raw), &e)
    })?;
    if nodes.is_literal() {
        return Ok(ClassifiedValue {
            value: AttributeValue::Literal(nodes.literal_text()),
            el: None,
        });
    }
    if nodes.has_immediate() && nodes.has_deferred() {
        return err.fail(attribute::MIXED_EL_DELIMITERS, mark, messages::both_el_types());
    }
    Ok(ClassifiedValue {
        value: AttributeValue::El {
            text: raw.to_string(),
            deferred: nodes.has_deferred(),
        },
        el: Some(nodes),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompilerOptions;
    use crate::logging::codes::syntax;
    use crate::parser::ParserController;
    use crate::resources::MemoryResources;
    use assert_matches::assert_matches;
    use std::sync::Arc;

    fn page_info() -> PageInfo {
        PageInfo::new(&CompilerOptions::default(), false)
    }

    fn classify(raw: &str) -> JspResult<ClassifiedValue> {
        let _ = crate::logging::init_global_logging();
        classify_value(raw, &page_info(), false, None, &ErrorDispatcher::new(false))
    }

    #[test]
    fn test_classify_values() {
        assert_matches!(classify("plain").unwrap().value, AttributeValue::Literal(ref t) if t == "plain");
        assert_matches!(classify(r"\${x}").unwrap().value, AttributeValue::Literal(ref t) if t == "${x}");
        assert_matches!(classify("<%= a + b %>").unwrap().value, AttributeValue::Scripting(ref c) if c == "a + b");

        let immediate = classify("id-${x}").unwrap();
        assert!(immediate.is_expression());
        assert!(!immediate.is_deferred());
        assert!(immediate.el.is_some());

        assert!(classify("#{bean.action}").unwrap().is_deferred());
    }

    #[test]
    fn test_mixed_delimiters_are_rejected() {
        let error = classify("${a}#{b}").unwrap_err();
        assert_eq!(error.error_code(), attribute::MIXED_EL_DELIMITERS);
        let error = classify("${a +}").unwrap_err();
        assert_eq!(error.error_code(), expression::EL_SYNTAX);
    }

    fn run(source: &str) -> JspResult<(Tree, PageInfo)> {
        let _ = crate::logging::init_global_logging();
        let ctx = CompilationContext::new(
            CompilerOptions::default(),
            Arc::new(MemoryResources::new().with("/p.jsp", source.to_string())),
        );
        let mut page_info = PageInfo::new(ctx.options(), false);
        let mut err = ErrorDispatcher::new(false);
        let mut tree = ParserController::new(&ctx, false).parse("/p.jsp", &mut page_info, &mut err)?;
        validate_directives(&ctx, &tree, &mut page_info, &mut err)?;
        validate(&ctx, "/p.jsp", &mut tree, &mut page_info, &mut err)?;
        Ok((tree, page_info))
    }

    #[test]
    fn test_template_expressions_are_parsed() {
        let (tree, _) = run("Hi ${user.name}!").unwrap();
        let parsed = tree.preorder(tree.root()).into_iter().any(|id| {
            matches!(&tree.node(id).kind, NodeKind::ElExpression { el: Some(_), .. })
        });
        assert!(parsed);
    }

    #[test]
    fn test_deferred_expression_in_template_text() {
        let error = run("Total: #{cart.total}").unwrap_err();
        assert_eq!(error.error_code(), expression::DEFERRED_IN_TEMPLATE_TEXT);

        assert!(run("<%@ page deferredSyntaxAllowedAsLiteral=\"true\" %>#{x}").is_ok());
    }

    #[test]
    fn test_page_directive_can_switch_el_off() {
        let (tree, page_info) = run("<%@ page isELIgnored=\"true\" %>${a +}").unwrap();
        assert!(page_info.el_ignored);
        let texts: Vec<&str> = tree
            .preorder(tree.root())
            .into_iter()
            .filter_map(|id| match &tree.node(id).kind {
                NodeKind::TemplateText { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert!(texts.contains(&"${a +}"));
    }

    #[test]
    fn test_invalid_template_expression() {
        let error = run("${a +}").unwrap_err();
        assert_eq!(error.error_code(), expression::EL_SYNTAX);
    }

    #[test]
    fn test_unknown_action_attribute_reaches_pass_two() {
        let error = run("<jsp:include page=\"a.jsp\" flsh=\"true\"/>").unwrap_err();
        assert_eq!(error.error_code(), attribute::UNKNOWN_ATTRIBUTE);
        assert_ne!(error.error_code(), syntax::INVALID_STANDARD_ACTION);
    }
}
