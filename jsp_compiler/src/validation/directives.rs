//! Pass 1: directive values
//!
//! Each page or tag directive attribute keeps its first value for the whole
//! unit; a later occurrence must repeat it exactly. `import` lists are the
//! exception and accumulate, and `pageEncoding` is tracked per source file.
//! Declared encodings must also agree with the configured encoding and with
//! a byte-order mark.

use crate::config::compile_time::page::{DEFAULT_PAGE_ENCODING, SCRIPTING_LANGUAGE};
use crate::context::CompilationContext;
use crate::errors::{messages, ErrorDispatcher, JspResult};
use crate::logging::codes::{attribute, directive, success};
use crate::nodes::{Node, NodeId, NodeKind, RootData, Tree};
use crate::page_info::PageInfo;
use crate::parser::encoding::same_encoding;
use crate::log_success;

const PAGE_DIRECTIVE_ATTRIBUTES: &[&str] = &[
    "language",
    "extends",
    "import",
    "session",
    "buffer",
    "autoFlush",
    "isThreadSafe",
    "info",
    "errorPage",
    "isErrorPage",
    "contentType",
    "pageEncoding",
    "isELIgnored",
    "deferredSyntaxAllowedAsLiteral",
    "trimDirectiveWhitespaces",
    "errorOnELNotFound",
];

const INCLUDE_DIRECTIVE_ATTRIBUTES: &[&str] = &["file"];

const TAGLIB_DIRECTIVE_ATTRIBUTES: &[&str] = &["prefix", "uri", "tagdir"];

/// Tag directive attributes that shape translation of the tag file body
const TAG_TRANSLATION_ATTRIBUTES: &[&str] = &[
    "language",
    "pageEncoding",
    "isELIgnored",
    "deferredSyntaxAllowedAsLiteral",
    "trimDirectiveWhitespaces",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Directive {
    Page,
    Tag,
}

impl Directive {
    fn label(self) -> &'static str {
        match self {
            Self::Page => "Page",
            Self::Tag => "Tag",
        }
    }

    fn conflict(self, name: &str, old: &str, new: &str) -> String {
        match self {
            Self::Page => messages::conflicting_page_directive(name, old, new),
            Self::Tag => messages::conflicting_tag_directive(name, old, new),
        }
    }

    fn invalid_value(self, what: &str) -> String {
        match self {
            Self::Page => messages::invalid_page_directive_value(what),
            Self::Tag => messages::invalid_tag_directive_value(what),
        }
    }
}

/// Apply the directives of `tree` to `page_info`
pub fn validate_directives(
    _ctx: &CompilationContext,
    tree: &Tree,
    page_info: &mut PageInfo,
    err: &mut ErrorDispatcher,
) -> JspResult<()> {
    let mut directives = 0usize;
    for id in tree.preorder(tree.root()) {
        let node = tree.node(id);
        match &node.kind {
            NodeKind::PageDirective { imports } => {
                check_names(node, "page directive", PAGE_DIRECTIVE_ATTRIBUTES, err)?;
                apply(tree, id, Directive::Page, page_info, err)?;
                imports.iter().for_each(|list| page_info.add_imports(list));
            }
            NodeKind::TagDirective { imports } => {
                apply(tree, id, Directive::Tag, page_info, err)?;
                imports.iter().for_each(|list| page_info.add_imports(list));
            }
            NodeKind::IncludeDirective => {
                check_names(node, "include directive", INCLUDE_DIRECTIVE_ATTRIBUTES, err)?;
                if node.attr("file").is_none() {
                    return err.fail(
                        attribute::MISSING_ATTRIBUTE,
                        node.mark(),
                        messages::missing_mandatory_attribute("include directive", "file"),
                    );
                }
            }
            NodeKind::TaglibDirective => {
                check_names(node, "taglib directive", TAGLIB_DIRECTIVE_ATTRIBUTES, err)?;
            }
            _ => continue,
        }
        directives += 1;
    }

    if page_info.buffer_kb.is_none() && !page_info.auto_flush {
        return err.fail(
            directive::INVALID_DIRECTIVE_VALUE,
            tree.node(tree.root()).mark(),
            messages::auto_flush_without_buffer(),
        );
    }

    let root = tree.root_data().cloned().unwrap_or_default();
    if page_info.page_encoding.is_none() {
        page_info.page_encoding = Some(root.page_encoding.clone());
    }
    if !page_info.is_tag_file && page_info.content_type.is_none() {
        page_info.content_type = Some(default_content_type(&root, page_info));
    }

    log_success!(success::DIRECTIVE_VALIDATION_PASSED, "Directive validation passed",
        "directives" => directives,
        "encoding" => page_info.page_encoding.as_deref().unwrap_or(DEFAULT_PAGE_ENCODING)
    );
    Ok(())
}

fn check_names(node: &Node, element: &str, valid: &[&str], err: &ErrorDispatcher) -> JspResult<()> {
    for attr in &node.attrs {
        if !valid.contains(&attr.qname.as_str()) {
            return err.fail(
                attribute::UNKNOWN_ATTRIBUTE,
                node.mark(),
                messages::invalid_attribute(element, &attr.qname),
            );
        }
    }
    Ok(())
}

fn apply(
    tree: &Tree,
    id: NodeId,
    kind: Directive,
    page_info: &mut PageInfo,
    err: &ErrorDispatcher,
) -> JspResult<()> {
    let node = tree.node(id);
    for attr in &node.attrs {
        let name = attr.qname.as_str();
        if name == "import" {
            continue;
        }
        if kind == Directive::Tag && !TAG_TRANSLATION_ATTRIBUTES.contains(&name) {
            continue;
        }
        let value = attr.value.trim();
        let earlier = if name == "pageEncoding" {
            page_info.record_page_encoding(enclosing_root_id(tree, id), value)
        } else {
            page_info.record_directive_value(name, value)
        };
        if let Some(old) = earlier {
            return err.fail(
                directive::CONFLICTING_DIRECTIVE,
                node.mark(),
                kind.conflict(name, &old, value),
            );
        }
        set_value(tree, id, kind, name, value, page_info, err)?;
    }
    Ok(())
}

fn set_value(
    tree: &Tree,
    id: NodeId,
    kind: Directive,
    name: &str,
    value: &str,
    page_info: &mut PageInfo,
    err: &ErrorDispatcher,
) -> JspResult<()> {
    let node = tree.node(id);
    let invalid = |what: &str| {
        err.fail::<()>(
            directive::INVALID_DIRECTIVE_VALUE,
            node.mark(),
            kind.invalid_value(what),
        )
    };
    let flag = |what: &str| -> JspResult<bool> {
        match value.to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(err.error(
                directive::INVALID_DIRECTIVE_VALUE,
                node.mark(),
                kind.invalid_value(what),
            )),
        }
    };

    match name {
        "language" if value != SCRIPTING_LANGUAGE => {
            return err.fail(
                directive::INVALID_DIRECTIVE_VALUE,
                node.mark(),
                messages::unsupported_language(kind.label()),
            )
        }
        "language" => page_info.language = value.to_string(),
        "extends" => page_info.extends = Some(value.to_string()),
        "contentType" => page_info.content_type = Some(value.to_string()),
        "session" => page_info.session = flag("session")?,
        "buffer" => page_info.buffer_kb = parse_buffer(value).ok_or_else(|| {
            err.error(
                directive::INVALID_DIRECTIVE_VALUE,
                node.mark(),
                messages::invalid_buffer_size(),
            )
        })?,
        "autoFlush" => page_info.auto_flush = flag("autoFlush")?,
        "isThreadSafe" => page_info.is_thread_safe = flag("isThreadSafe")?,
        "info" => page_info.info = Some(value.to_string()),
        "errorPage" => page_info.error_page = Some(value.to_string()),
        "isErrorPage" => page_info.is_error_page = flag("isErrorPage")?,
        "isELIgnored" => page_info.el_ignored = flag("isELIgnored")?,
        "deferredSyntaxAllowedAsLiteral" => {
            page_info.deferred_syntax_allowed_as_literal =
                flag("deferredSyntaxAllowedAsLiteral")?
        }
        "trimDirectiveWhitespaces" => {
            page_info.trim_directive_whitespaces = flag("trimDirectiveWhitespaces")?
        }
        "errorOnELNotFound" => {
            flag("errorOnELNotFound")?;
        }
        "pageEncoding" => {
            check_encoding(tree, id, value, err)?;
            if enclosing_root_id(tree, id) == tree.root() {
                page_info.page_encoding = Some(value.to_string());
            }
        }
        _ => return invalid(name),
    }
    Ok(())
}

/// `none` or `<n>kb`
fn parse_buffer(value: &str) -> Option<Option<usize>> {
    if value.eq_ignore_ascii_case("none") {
        return Some(None);
    }
    let digits = value.strip_suffix("kb")?;
    digits.parse::<usize>().ok().map(Some)
}

/// A directive's encoding must match the configured one and a byte-order
/// mark of the file holding the directive
fn check_encoding(tree: &Tree, id: NodeId, declared: &str, err: &ErrorDispatcher) -> JspResult<()> {
    let root = enclosing_root(tree, id);
    let mark = tree.node(id).mark();
    if let Some(config) = &root.config_encoding {
        if !same_encoding(config, declared) {
            return err.fail(
                directive::ENCODING_MISMATCH,
                mark,
                messages::page_encoding_conflict_config(config, declared),
            );
        }
    }
    if root.is_bom_present && !same_encoding(&root.page_encoding, declared) {
        return err.fail(
            directive::ENCODING_MISMATCH,
            mark,
            messages::page_encoding_conflict_prolog(&root.page_encoding, declared),
        );
    }
    Ok(())
}

fn enclosing_root_id(tree: &Tree, id: NodeId) -> NodeId {
    tree.ancestor(id, |node| matches!(node.kind, NodeKind::Root(_)))
        .unwrap_or_else(|| tree.root())
}

fn enclosing_root(tree: &Tree, id: NodeId) -> RootData {
    match &tree.node(enclosing_root_id(tree, id)).kind {
        NodeKind::Root(data) => data.clone(),
        _ => RootData::default(),
    }
}

/// `text/html`, with a charset when the page is not in the default encoding
fn default_content_type(root: &RootData, page_info: &PageInfo) -> String {
    let base = if root.is_xml_syntax { "text/xml" } else { "text/html" };
    match page_info.page_encoding.as_deref() {
        Some(encoding) if !root.is_default_page_encoding || encoding != root.page_encoding => {
            format!("{};charset={}", base, encoding)
        }
        _ => base.to_string(),
    }
}
