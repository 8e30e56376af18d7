//! Implicit tag libraries over a tag directory
//!
//! `<%@ taglib tagdir="/WEB-INF/tags/x" %>` names a library with one tag per
//! `.tag`/`.tagx` file in that directory. An optional `implicit.toml` in the
//! directory may override the library versions:
//!
//! ```toml
//! jsp-version = "2.1"
//! tlib-version = "1.2"
//! short-name = "ignored"
//! ```
//!
//! Tag-file interfaces are not read here; they are extracted on first
//! lookup and cached on the library.

use super::{LibraryHeader, TagLibraryInfo};
use crate::config::compile_time::resources::{
    IMPLICIT_MANIFEST_NAME, TAG_DIR_ROOT, TAG_FILE_SUFFIX, TAG_FILE_XML_SUFFIX,
};
use crate::config::compile_time::syntax::TAG_DIR_URN_PREFIX;
use crate::context::CompilationContext;
use crate::errors::{messages, ErrorDispatcher, JspResult};
use crate::logging::codes::{resolution, success, tagfile};
use crate::utils::{paths, Mark};
use crate::log_success;
use std::collections::BTreeMap;
use std::sync::Arc;

const DEFAULT_SHORT_NAME: &str = "tags";
const DEFAULT_TLIB_VERSION: &str = "1.0";
const DEFAULT_JSP_VERSION: &str = "2.0";

/// Load (or fetch from the run cache) the implicit library for `tag_dir`
pub fn load(
    ctx: &CompilationContext,
    tag_dir: &str,
    at: &Mark,
    err: &ErrorDispatcher,
) -> JspResult<Arc<TagLibraryInfo>> {
    let dir = match paths::normalize(tag_dir) {
        Some(dir) if dir.trim_end_matches('/') == TAG_DIR_ROOT => TAG_DIR_ROOT.to_string(),
        Some(dir) if dir.starts_with(&format!("{}/", TAG_DIR_ROOT)) => {
            dir.trim_end_matches('/').to_string()
        }
        _ => {
            return err.fail(
                resolution::INVALID_TAGLIB_DESCRIPTOR,
                Some(at),
                messages::invalid_tag_file_directory(tag_dir),
            )
        }
    };

    let key = format!("{}{}", TAG_DIR_URN_PREFIX, dir);
    if let Some(library) = ctx.cached_library(&key) {
        return Ok(library);
    }

    let mut header = LibraryHeader {
        uri: key.clone(),
        short_name: short_name_for(&dir),
        tlib_version: DEFAULT_TLIB_VERSION.to_string(),
        required_version: DEFAULT_JSP_VERSION.to_string(),
        info: None,
    };

    let mut tag_files = BTreeMap::new();
    for path in ctx.resources().list_dir(&dir) {
        if paths::has_suffix(&path, &[TAG_FILE_SUFFIX, TAG_FILE_XML_SUFFIX]) {
            tag_files.insert(paths::file_stem(&path).to_string(), path);
        }
    }

    let manifest_path = format!("{}/{}", dir, IMPLICIT_MANIFEST_NAME);
    let manifest = if ctx.resources().exists(&manifest_path) {
        apply_manifest(ctx, &manifest_path, &mut header, at, err)?;
        Some(manifest_path)
    } else {
        None
    };

    log_success!(success::TAGLIB_RESOLVED, "Implicit tag library loaded",
        "dir" => &dir,
        "tag_files" => tag_files.len()
    );
    let library = TagLibraryInfo::implicit(header, dir, tag_files, manifest);
    Ok(ctx.cache_library(&key, Arc::new(library)))
}

/// `tags` for the root tag directory, otherwise the sub-path with `/`
/// replaced by `-`
fn short_name_for(dir: &str) -> String {
    if dir == TAG_DIR_ROOT {
        DEFAULT_SHORT_NAME.to_string()
    } else {
        dir[TAG_DIR_ROOT.len()..].replace('/', "-")
    }
}

fn apply_manifest(
    ctx: &CompilationContext,
    path: &str,
    header: &mut LibraryHeader,
    at: &Mark,
    err: &ErrorDispatcher,
) -> JspResult<()> {
    let invalid = || {
        err.error(
            tagfile::INVALID_IMPLICIT_MANIFEST,
            Some(at),
            messages::invalid_implicit_tld(path),
        )
    };

    let bytes = ctx.resources().read(path).map_err(|e| {
        err.error_with_cause(e.error_code(), Some(at), messages::invalid_implicit_tld(path), &e)
    })?;
    let text = String::from_utf8(bytes).map_err(|_| invalid())?;
    let table = toml::from_str::<toml::Table>(&text).map_err(|e| {
        err.error_with_cause(
            tagfile::INVALID_IMPLICIT_MANIFEST,
            Some(at),
            messages::invalid_implicit_tld(path),
            &e,
        )
    })?;

    for (key, value) in &table {
        let value = match value {
            toml::Value::String(s) => s.trim().to_string(),
            toml::Value::Float(f) => f.to_string(),
            toml::Value::Integer(i) => i.to_string(),
            _ => return Err(invalid()),
        };
        match key.as_str() {
            "jsp-version" => header.required_version = value,
            "tlib-version" => header.tlib_version = value,
            // Accepted for compatibility; the name is always derived from the directory
            "short-name" => {}
            other => {
                return err.fail(
                    tagfile::INVALID_IMPLICIT_MANIFEST,
                    Some(at),
                    messages::unknown_implicit_tld_key(path, other),
                )
            }
        }
    }

    match header.required_version.parse::<f64>() {
        Ok(version) if version >= 2.0 => Ok(()),
        _ => err.fail(
            tagfile::INVALID_IMPLICIT_MANIFEST,
            Some(at),
            messages::invalid_implicit_tld_version(path),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompilerOptions;
    use crate::resources::MemoryResources;

    fn context(resources: MemoryResources) -> CompilationContext {
        CompilationContext::new(CompilerOptions::default(), Arc::new(resources))
    }

    fn load_dir(ctx: &CompilationContext, dir: &str) -> JspResult<Arc<TagLibraryInfo>> {
        let _ = crate::logging::init_global_logging();
        load(ctx, dir, &Mark::new("/index.jsp", 1, 1), &ErrorDispatcher::new(false))
    }

    #[test]
    fn test_directory_listing_and_short_names() {
        let ctx = context(
            MemoryResources::new()
                .with("/WEB-INF/tags/hello.tag", "Hello")
                .with("/WEB-INF/tags/page.tagx", "<jsp:root/>")
                .with("/WEB-INF/tags/readme.txt", "not a tag")
                .with("/WEB-INF/tags/ui/forms/input.tag", "<input/>"),
        );

        let root = load_dir(&ctx, "/WEB-INF/tags/").unwrap();
        assert_eq!(root.header.short_name, "tags");
        assert_eq!(root.tag_file_names(), vec!["hello", "page"]);
        assert_eq!(root.tag_file_path("hello"), Some("/WEB-INF/tags/hello.tag"));
        assert!(root.is_implicit());
        assert!(root.manifest.is_none());
        assert_eq!(root.header.required_version, "2.0");

        let nested = load_dir(&ctx, "/WEB-INF/tags/ui/forms").unwrap();
        assert_eq!(nested.header.short_name, "-ui-forms");
        assert_eq!(nested.tag_file_names(), vec!["input"]);
    }

    #[test]
    fn test_library_is_cached_by_directory() {
        let ctx = context(MemoryResources::new().with("/WEB-INF/tags/a.tag", "a"));
        let first = load_dir(&ctx, "/WEB-INF/tags").unwrap();
        let second = load_dir(&ctx, "/WEB-INF/tags/").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_directory_outside_tag_root_is_rejected() {
        let ctx = context(MemoryResources::new());
        for dir in ["/tags", "/WEB-INF/tagsmore", "/WEB-INF/tags/../lib"] {
            let err = load_dir(&ctx, dir).unwrap_err();
            assert_eq!(err.error_code(), resolution::INVALID_TAGLIB_DESCRIPTOR, "{}", dir);
        }
    }

    #[test]
    fn test_manifest_overrides_versions() {
        let ctx = context(
            MemoryResources::new()
                .with("/WEB-INF/tags/x.tag", "x")
                .with(
                    "/WEB-INF/tags/implicit.toml",
                    "jsp-version = \"2.1\"\ntlib-version = \"3.0\"\nshort-name = \"other\"\n",
                ),
        );
        let library = load_dir(&ctx, "/WEB-INF/tags").unwrap();
        assert_eq!(library.header.required_version, "2.1");
        assert_eq!(library.header.tlib_version, "3.0");
        assert_eq!(library.header.short_name, "tags");
        assert_eq!(library.manifest.as_deref(), Some("/WEB-INF/tags/implicit.toml"));
    }

    #[test]
    fn test_bad_manifests() {
        let cases = [
            "jsp-version = \"1.2\"",
            "jsp-version = \"two\"",
            "description = \"x\"",
            "jsp-version = [",
        ];
        for manifest in cases {
            let ctx = context(
                MemoryResources::new().with("/WEB-INF/tags/implicit.toml", manifest),
            );
            let err = load_dir(&ctx, "/WEB-INF/tags").unwrap_err();
            assert_eq!(err.error_code(), tagfile::INVALID_IMPLICIT_MANIFEST, "{}", manifest);
        }
    }

    #[test]
    fn test_numeric_version_is_accepted() {
        let ctx = context(MemoryResources::new().with("/WEB-INF/tags/implicit.toml", "jsp-version = 2.1"));
        let library = load_dir(&ctx, "/WEB-INF/tags").unwrap();
        assert_eq!(library.header.required_version, "2.1");
    }
}
