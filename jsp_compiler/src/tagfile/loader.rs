//! Handler references for the tag files a unit uses
//!
//! Every custom tag backed by a tag file gets a [`HandlerRef`]. A tag file is
//! compiled at most once per context and the result is kept in its registry
//! entry. A tag file that is already being compiled further up the current
//! [`CompileChain`] gets a prototype instead: its directives are read and a
//! throwaway handler is returned, which ends the recursion.

use super::{CompileChain, HandlerRef};
use crate::context::CompilationContext;
use crate::errors::{messages, ErrorDispatcher, JspResult};
use crate::logging::codes::{success, tagfile};
use crate::nodes::{NodeId, Tree};
use crate::page_info::PageInfo;
use crate::parser::ParserController;
use crate::pipeline;
use crate::taglib::TagFileInfo;
use crate::utils::Mark;
use crate::{log_error, log_success};
use std::sync::Arc;

/// Attach a handler to every tag-file-backed custom tag in `tree` and fold
/// the handlers' dependencies into `page_info`. Returns the handlers in
/// document order.
pub fn load_tag_files(
    ctx: &CompilationContext,
    tree: &mut Tree,
    page_info: &mut PageInfo,
    chain: &mut CompileChain,
    err: &ErrorDispatcher,
) -> JspResult<Vec<HandlerRef>> {
    let tags: Vec<(NodeId, Arc<TagFileInfo>, Option<Mark>)> = tree
        .preorder(tree.root())
        .into_iter()
        .filter_map(|id| {
            let node = tree.node(id);
            let file = node.custom_tag()?.tag_file.clone()?;
            Some((id, file, node.mark().cloned()))
        })
        .collect();

    let mut handlers = Vec::with_capacity(tags.len());
    for (id, file, mark) in tags {
        page_info.add_dependant(&file.path, ctx.resources().last_modified(&file.path));
        let handler = load(ctx, &file, chain, mark.as_ref(), err)?;
        for (path, stamp) in &handler.dependencies {
            page_info.add_dependant(path, *stamp);
        }
        if let Some(data) = tree.node_mut(id).custom_tag_mut() {
            data.handler = Some(handler.clone());
        }
        handlers.push(handler);
    }
    Ok(handlers)
}

fn load(
    ctx: &CompilationContext,
    file: &TagFileInfo,
    chain: &mut CompileChain,
    at: Option<&Mark>,
    err: &ErrorDispatcher,
) -> JspResult<HandlerRef> {
    if chain.is_active(&file.path) {
        let handler = prototype(ctx, file, err)?;
        chain.record_prototype(handler.clone());
        return Ok(handler);
    }

    let entry = ctx.tag_files().find_or_create(&file.path);
    if let Some(handler) = entry.handler() {
        return Ok(handler);
    }

    let unit = {
        let mut guard = chain.enter(&file.path);
        pipeline::translate_tag_file(ctx, file, &mut guard)
    };
    let unit = match unit {
        Ok(unit) => unit,
        Err(error) => {
            log_error!(tagfile::TAG_FILE_COMPILE_FAILED, &messages::tag_file_compile_failed(&file.path),
                mark = at,
                "cause" => error.error_code()
            );
            return Err(error);
        }
    };
    entry.record_compilation();
    match unit.handler {
        Some(handler) => Ok(entry.store(handler)),
        None => err.fail(
            tagfile::TAG_FILE_COMPILE_FAILED,
            at,
            messages::tag_file_compile_failed(&file.path),
        ),
    }
}

/// Read only the directives of a tag file already being compiled and hand
/// back a handler marked as a prototype
fn prototype(
    ctx: &CompilationContext,
    file: &TagFileInfo,
    err: &ErrorDispatcher,
) -> JspResult<HandlerRef> {
    let mut page_info = PageInfo::new(ctx.options(), true);
    let mut inner = ErrorDispatcher::new(err.jspc_mode());
    ParserController::new(ctx, true)
        .directives_only()
        .parse(&file.path, &mut page_info, &mut inner)?;

    let mut dependencies = page_info.dependants().clone();
    dependencies.insert(file.path.clone(), ctx.resources().last_modified(&file.path));
    log_success!(success::PROTOTYPE_COMPILED, "Prototype handler created",
        "path" => &file.path
    );
    Ok(HandlerRef {
        class_name: file.tag_info.tag_class_name.clone(),
        path: file.path.clone(),
        prototype: true,
        dependencies,
    })
}
