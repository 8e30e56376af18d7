//! End-to-end translation of one unit
//!
//! parse -> directive validation -> semantic validation -> tag-file loading
//! -> tag plugins. Every unit runs inside its own logging file context so
//! the events it emits are attributed to it.

mod error;
mod result;

pub use error::PipelineError;
pub use result::CompiledUnit;

use crate::config::compile_time::resources::{TAG_DIR_ROOT, TAG_FILE_SUFFIX, TAG_FILE_XML_SUFFIX};
use crate::context::CompilationContext;
use crate::errors::{messages, ErrorDispatcher, JspResult};
use crate::logging;
use crate::logging::codes::{resolution, success};
use crate::page_info::PageInfo;
use crate::parser::ParserController;
use crate::tagfile::{directives, loader, CompileChain, HandlerRef};
use crate::taglib::{implicit, LibraryHeader, TagFileInfo};
use crate::utils::{paths, Mark};
use crate::{plugin, validation};
use crate::{log_info, log_success};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Translate a page
pub fn compile_page(ctx: &CompilationContext, path: &str) -> Result<CompiledUnit, PipelineError> {
    logging::with_file_context(PathBuf::from(path), ctx.next_unit_id(), || {
        log_info!("Compiling page", "path" => path);
        let mut chain = CompileChain::new();
        let unit = translate(ctx, path, None, &mut chain)?;
        unit.log_success();
        Ok(unit)
    })
}

/// Translate a tag file on its own and store its handler in the context's
/// registry, as if a page had used it
pub fn compile_tag_file(
    ctx: &CompilationContext,
    path: &str,
) -> Result<CompiledUnit, PipelineError> {
    if !paths::has_suffix(path, &[TAG_FILE_SUFFIX, TAG_FILE_XML_SUFFIX]) {
        return Err(PipelineError::pipeline_error(&format!(
            "'{}' is not a tag file",
            path
        )));
    }

    logging::with_file_context(PathBuf::from(path), ctx.next_unit_id(), || {
        log_info!("Compiling tag file", "path" => path);
        let err = ErrorDispatcher::new(ctx.options().jspc_mode);
        let file = locate_tag_file(ctx, path, &err)?;

        let entry = ctx.tag_files().find_or_create(&file.path);
        let mut chain = CompileChain::new();
        let unit = {
            let mut guard = chain.enter(&file.path);
            translate_tag_file(ctx, &file, &mut guard)?
        };
        entry.record_compilation();
        if let Some(handler) = &unit.handler {
            entry.store(handler.clone());
        }
        unit.log_success();
        Ok(unit)
    })
}

/// Translate a tag file already known to be on `chain` and build its handler
pub(crate) fn translate_tag_file(
    ctx: &CompilationContext,
    file: &TagFileInfo,
    chain: &mut CompileChain,
) -> JspResult<CompiledUnit> {
    logging::with_file_context(PathBuf::from(&file.path), ctx.next_unit_id(), || {
        let mut unit = translate(ctx, &file.path, Some(file), chain)?;

        let mut dependencies = unit.page_info.dependants().clone();
        dependencies.insert(file.path.clone(), ctx.resources().last_modified(&file.path));
        unit.handler = Some(HandlerRef {
            class_name: file.tag_info.tag_class_name.clone(),
            path: file.path.clone(),
            prototype: false,
            dependencies,
        });

        log_success!(success::TAG_FILE_COMPILED, "Tag file compiled",
            "path" => &file.path,
            "class" => &file.tag_info.tag_class_name,
            "depth" => chain.depth()
        );
        Ok(unit)
    })
}

fn translate(
    ctx: &CompilationContext,
    path: &str,
    tag_file: Option<&TagFileInfo>,
    chain: &mut CompileChain,
) -> JspResult<CompiledUnit> {
    let started = Instant::now();
    let is_tag_file = tag_file.is_some();
    let mut page_info = PageInfo::new(ctx.options(), is_tag_file);
    let mut err = ErrorDispatcher::new(ctx.options().jspc_mode);

    let mut tree = ParserController::new(ctx, is_tag_file).parse(path, &mut page_info, &mut err)?;
    validation::validate_directives(ctx, &tree, &mut page_info, &mut err)?;
    validation::validate(ctx, path, &mut tree, &mut page_info, &mut err)?;
    let handlers = loader::load_tag_files(ctx, &mut tree, &mut page_info, chain, &err)?;
    if ctx.options().enable_tag_plugins {
        plugin::apply(ctx, &mut tree, &mut page_info, &err)?;
    }

    Ok(CompiledUnit {
        path: path.to_string(),
        tree,
        page_info,
        tag_info: tag_file.map(|file| file.tag_info.clone()),
        handler: None,
        handlers,
        prototypes: chain.prototypes().to_vec(),
        duration: started.elapsed(),
    })
}

/// Interface of a tag file addressed by path rather than through a taglib
fn locate_tag_file(
    ctx: &CompilationContext,
    path: &str,
    err: &ErrorDispatcher,
) -> JspResult<Arc<TagFileInfo>> {
    let at = Mark::start_of(path);
    let name = paths::file_stem(path);

    if path.starts_with(&format!("{}/", TAG_DIR_ROOT)) {
        let dir = paths::parent_dir(path);
        let library = implicit::load(ctx, dir, &at, err)?;
        return match directives::lookup(ctx, &library, name, &at, err)? {
            Some(file) => Ok(file),
            None => err.fail(
                resolution::TAG_FILE_NOT_FOUND,
                Some(&at),
                messages::file_not_found(path),
            ),
        };
    }

    if !ctx.resources().exists(path) {
        return err.fail(
            resolution::TAG_FILE_NOT_FOUND,
            Some(&at),
            messages::file_not_found(path),
        );
    }
    // Packaged tag files outside a descriptor get a library of their own
    let header = LibraryHeader {
        uri: path.to_string(),
        short_name: name.to_string(),
        tlib_version: "1.0".to_string(),
        required_version: "2.0".to_string(),
        info: None,
    };
    let tag_info = directives::extract(ctx, &header, name, path, err)?;
    Ok(Arc::new(TagFileInfo {
        name: name.to_string(),
        path: path.to_string(),
        tag_info: Arc::new(tag_info),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompilerOptions;
    use crate::logging::codes::{directive, syntax};
    use crate::resources::MemoryResources;
    use assert_matches::assert_matches;

    fn context(resources: MemoryResources) -> CompilationContext {
        let _ = crate::logging::init_global_logging();
        CompilationContext::new(CompilerOptions::default(), Arc::new(resources))
    }

    #[test]
    fn test_compile_page_returns_tree_and_page_info() {
        let ctx = context(MemoryResources::new().with(
            "/index.jsp",
            "<%@ page import=\"java.util.*\" session=\"false\" %>Hello ${name}",
        ));
        let unit = compile_page(&ctx, "/index.jsp").unwrap();
        assert_eq!(unit.path, "/index.jsp");
        assert!(!unit.is_tag_file());
        assert!(unit.handler.is_none());
        assert!(unit.handlers.is_empty());
        assert!(unit.prototypes.is_empty());
        assert!(!unit.page_info.session);
        assert!(unit.page_info.imports().iter().any(|i| i == "java.util.*"));
        assert!(unit.tree.len() > 2);
    }

    #[test]
    fn test_translation_failure_is_reported() {
        let ctx = context(MemoryResources::new().with(
            "/index.jsp",
            "<%@ page session=\"true\" %><%@ page session=\"false\" %>",
        ));
        let error = compile_page(&ctx, "/index.jsp").unwrap_err();
        assert_eq!(error.error_code(), directive::CONFLICTING_DIRECTIVE);
        assert_matches!(error, PipelineError::Translation(_));
    }

    #[test]
    fn test_missing_page() {
        let ctx = context(MemoryResources::new());
        let error = compile_page(&ctx, "/nowhere.jsp").unwrap_err();
        assert!(error.translation().is_some());
    }

    #[test]
    fn test_compile_tag_file_directly() {
        let ctx = context(MemoryResources::new().with(
            "/WEB-INF/tags/greet.tag",
            "<%@ attribute name=\"who\" required=\"true\" %>Hello ${who}",
        ));
        let unit = compile_tag_file(&ctx, "/WEB-INF/tags/greet.tag").unwrap();
        assert!(unit.is_tag_file());
        let handler = unit.handler.clone().unwrap();
        assert_eq!(handler.class_name, "org.apache.jsp.tag.web.greet_tag");
        assert!(!handler.prototype);
        assert!(handler.dependencies.contains_key("/WEB-INF/tags/greet.tag"));
        let info = unit.tag_info.as_ref().unwrap();
        assert!(info.attribute("who").is_some_and(|a| a.required));

        let entry = ctx.tag_files().get("/WEB-INF/tags/greet.tag").unwrap();
        assert_eq!(entry.handler(), Some(handler));
        assert_eq!(entry.compilations(), 1);
    }

    #[test]
    fn test_compile_tag_file_rejects_pages() {
        let ctx = context(MemoryResources::new().with("/index.jsp", "x"));
        assert_matches!(
            compile_tag_file(&ctx, "/index.jsp"),
            Err(PipelineError::Pipeline { .. })
        );
    }

    #[test]
    fn test_page_directive_in_tag_file_is_rejected() {
        let ctx = context(
            MemoryResources::new().with("/WEB-INF/tags/bad.tag", "<%@ page session=\"false\" %>"),
        );
        let error = compile_tag_file(&ctx, "/WEB-INF/tags/bad.tag").unwrap_err();
        assert_eq!(error.error_code(), syntax::DIRECTIVE_NOT_ALLOWED);
    }
}
