//! Library-level validation hooks

use crate::context::CompilationContext;
use crate::errors::{messages, ErrorDispatcher, JspResult};
use crate::logging::codes::attribute;
use crate::nodes::Tree;
use crate::page_info::PageInfo;
use crate::taglib::extra::PageData;
use crate::utils::Mark;
use crate::log_debug;

/// Run each used library's validator once over the whole unit.
///
/// Messages from every library are gathered into a single error.
pub(super) fn run_library_validators(
    ctx: &CompilationContext,
    path: &str,
    tree: &Tree,
    page_info: &PageInfo,
    err: &ErrorDispatcher,
) -> JspResult<()> {
    let page = PageData {
        path,
        tree,
        page_info,
    };
    let mut report = Vec::new();

    for (uri, library) in page_info.taglibs() {
        let Some(validator_info) = &library.validator else {
            continue;
        };
        let Some(validator) = ctx.validator(&validator_info.validator_class) else {
            continue;
        };
        let prefix = page_info
            .prefixes()
            .find(|(_, bound)| *bound == uri)
            .map(|(prefix, _)| prefix)
            .unwrap_or(library.header.short_name.as_str());

        let found = validator.validate(prefix, uri, &page, &validator_info.init_params);
        log_debug!("Ran tag library validator",
            "uri" => uri,
            "class" => &validator_info.validator_class,
            "messages" => found.len()
        );
        if found.is_empty() {
            continue;
        }
        report.push(messages::error_validating_taglibrary(uri, path));
        report.extend(found.iter().map(ToString::to_string));
    }

    if report.is_empty() {
        return Ok(());
    }
    err.fail(
        attribute::TAG_VALIDATION_FAILED,
        root_mark(tree).as_ref(),
        report.join("\n"),
    )
}

/// Give every custom tag's `TagExtraInfo` a chance to reject its attributes
pub(super) fn run_tag_extra_info(
    ctx: &CompilationContext,
    tree: &Tree,
    err: &ErrorDispatcher,
) -> JspResult<()> {
    let mut report = Vec::new();
    let mut first_mark = None;

    for id in tree.preorder(tree.root()) {
        let node = tree.node(id);
        let Some(tag) = node.custom_tag() else {
            continue;
        };
        let (Some(class), Some(data)) = (tag.tag_info.tei_class.as_deref(), &tag.tag_data) else {
            continue;
        };
        let Some(tei) = ctx.tag_extra_info(class) else {
            continue;
        };
        let found = tei.validate(data);
        if found.is_empty() {
            continue;
        }
        if first_mark.is_none() {
            first_mark = node.mark().cloned();
        }
        report.push(messages::error_validating_tag(&tag.qname));
        report.extend(found.iter().map(ToString::to_string));
    }

    if report.is_empty() {
        return Ok(());
    }
    err.fail(
        attribute::TAG_VALIDATION_FAILED,
        first_mark.as_ref(),
        report.join("\n"),
    )
}

fn root_mark(tree: &Tree) -> Option<Mark> {
    tree.node(tree.root()).mark().cloned()
}
