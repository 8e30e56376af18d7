//! Explicit tag libraries located by URI
//!
//! A taglib `uri` is classified first. Absolute URIs must match a registered
//! descriptor by its public URI; context-relative ones are resolved against
//! the referring file and matched by URI or by descriptor location. The
//! chosen descriptor is projected into a [`TagLibraryInfo`] once per run and
//! cached on the context.

use super::descriptor::{AttributeDescriptor, TagDescriptor, TagLibraryDescriptor, VariableDescriptor};
use super::{
    BodyContent, FunctionInfo, LibraryHeader, TagAttributeInfo, TagFileInfo, TagInfo,
    TagLibraryInfo, TagVariableInfo, ValidatorInfo, VariableScope, DEFAULT_METHOD_SIGNATURE,
    FRAGMENT_TYPE, METHOD_EXPRESSION_TYPE, OBJECT_TYPE, STRING_TYPE, VALUE_EXPRESSION_TYPE,
};
use crate::config::compile_time::resources::{META_INF_TAG_DIR_ROOT, TAG_DIR_ROOT};
use crate::context::CompilationContext;
use crate::errors::{messages, ErrorDispatcher, JspResult};
use crate::logging::codes::{resolution, success};
use crate::tagfile::directives;
use crate::utils::{paths, Mark, UriType};
use crate::log_success;
use std::collections::HashSet;
use std::sync::Arc;

/// Type names a JSP 1.2 descriptor may give without their package
const SHORT_TYPE_NAMES: &[&str] = &[
    "Boolean", "Byte", "Character", "Double", "Float", "Integer", "Long", "Object", "Short",
    "String",
];

/// Resolve the library a taglib directive in `referrer` names by `uri`
pub fn resolve(
    ctx: &CompilationContext,
    uri: &str,
    referrer: &str,
    at: &Mark,
    err: &ErrorDispatcher,
) -> JspResult<Arc<TagLibraryInfo>> {
    let (key, descriptor) = locate(ctx, uri, referrer, at, err)?;
    if let Some(library) = ctx.cached_library(&key) {
        return Ok(library);
    }

    let library = project(ctx, &descriptor, &key, at, err)?;
    log_success!(success::TAGLIB_RESOLVED, "Tag library resolved",
        "uri" => uri,
        "tags" => library.tags.len(),
        "tag_files" => library.tag_file_names().len(),
        "functions" => library.functions.len()
    );
    Ok(ctx.cache_library(&key, Arc::new(library)))
}

/// Find the descriptor for `uri` and the key it is cached under
fn locate(
    ctx: &CompilationContext,
    uri: &str,
    referrer: &str,
    at: &Mark,
    err: &ErrorDispatcher,
) -> JspResult<(String, Arc<TagLibraryDescriptor>)> {
    if let Some(descriptor) = ctx.descriptor_for_uri(uri) {
        return Ok((uri.to_string(), descriptor.clone()));
    }

    let location = match paths::uri_type(uri) {
        UriType::Absolute => {
            return err.fail(
                resolution::TAGLIB_NOT_FOUND,
                Some(at),
                messages::unresolvable_absolute_uri(uri),
            )
        }
        UriType::RootRelative => paths::normalize(uri),
        UriType::Relative => paths::resolve(referrer, uri),
    };
    let found = location.and_then(|path| {
        ctx.descriptor_for_uri(&path)
            .or_else(|| ctx.descriptor_at(&path))
            .map(|descriptor| (path, descriptor.clone()))
    });
    match found {
        Some(found) => Ok(found),
        None => err.fail(
            resolution::TAGLIB_NOT_FOUND,
            Some(at),
            messages::file_not_found(uri),
        ),
    }
}

/// Build the library record a descriptor describes
fn project(
    ctx: &CompilationContext,
    descriptor: &TagLibraryDescriptor,
    key: &str,
    at: &Mark,
    err: &ErrorDispatcher,
) -> JspResult<TagLibraryInfo> {
    let missing = |element: &str| {
        err.fail(
            resolution::INVALID_TAGLIB_DESCRIPTOR,
            Some(at),
            messages::missing_required_tld_element(element, key),
        )
    };
    let Some(tlib_version) = descriptor.tlib_version.clone() else {
        return missing("tlib-version");
    };
    let Some(jsp_version) = descriptor.jsp_version.clone() else {
        return missing("jsp-version");
    };

    let header = LibraryHeader {
        uri: descriptor.uri.clone().unwrap_or_else(|| key.to_string()),
        short_name: descriptor.short_name.clone().unwrap_or_default(),
        tlib_version,
        required_version: jsp_version,
        info: descriptor.info.clone(),
    };

    let validator = match &descriptor.validator {
        Some(v) if !v.validator_class.is_empty() => {
            if ctx.validator(&v.validator_class).is_none() {
                return err.fail(
                    resolution::HANDLER_CLASS_NOT_FOUND,
                    Some(at),
                    messages::error_loading_tag_library_validator(&v.validator_class),
                );
            }
            Some(ValidatorInfo {
                validator_class: v.validator_class.clone(),
                init_params: v.init_params.clone(),
            })
        }
        _ => None,
    };

    let tags = descriptor
        .tags
        .iter()
        .map(|tag| project_tag(ctx, tag, &header, at, err).map(Arc::new))
        .collect::<JspResult<Vec<_>>>()?;

    let mut tag_files = Vec::with_capacity(descriptor.tag_files.len());
    for file in &descriptor.tag_files {
        let path = file.path.as_str();
        if !path.starts_with(TAG_DIR_ROOT) && !path.starts_with(META_INF_TAG_DIR_ROOT) {
            return err.fail(
                resolution::INVALID_TAGLIB_DESCRIPTOR,
                Some(at),
                messages::invalid_tag_file_directory(path),
            );
        }
        let tag_info = directives::extract(ctx, &header, &file.name, path, err)?;
        tag_files.push(Arc::new(TagFileInfo {
            name: file.name.clone(),
            path: path.to_string(),
            tag_info: Arc::new(tag_info),
        }));
    }

    let mut seen = HashSet::new();
    let mut functions = Vec::with_capacity(descriptor.functions.len());
    for function in &descriptor.functions {
        if !seen.insert(function.name.as_str()) {
            return err.fail(
                resolution::INVALID_TAGLIB_DESCRIPTOR,
                Some(at),
                messages::duplicate_function_name(&function.name, key),
            );
        }
        functions.push(FunctionInfo {
            name: function.name.clone(),
            function_class: function.function_class.clone(),
            function_signature: function.function_signature.clone(),
        });
    }

    Ok(TagLibraryInfo::explicit(
        header, key, tags, tag_files, functions, validator,
    ))
}

fn project_tag(
    ctx: &CompilationContext,
    tag: &TagDescriptor,
    header: &LibraryHeader,
    at: &Mark,
    err: &ErrorDispatcher,
) -> JspResult<TagInfo> {
    let body_content = match tag.body_content.as_deref() {
        None => BodyContent::Jsp,
        Some(value) => match BodyContent::parse(value) {
            Some(content) => content,
            None => {
                return err.fail(
                    resolution::INVALID_TAGLIB_DESCRIPTOR,
                    Some(at),
                    messages::invalid_body_content_in_descriptor(value, &tag.name),
                )
            }
        },
    };

    let tei_class = match tag.tei_class.as_deref() {
        Some(class) if !class.is_empty() => {
            if ctx.tag_extra_info(class).is_none() {
                return err.fail(
                    resolution::HANDLER_CLASS_NOT_FOUND,
                    Some(at),
                    messages::error_loading_tag_extra_info(class),
                );
            }
            Some(class.to_string())
        }
        _ => None,
    };

    let mut info = TagInfo::new(&tag.name, &tag.tag_class, body_content, header.clone());
    info.info = tag.info.clone();
    info.display_name = tag.display_name.clone();
    info.small_icon = tag.small_icon.clone();
    info.large_icon = tag.large_icon.clone();
    info.example = tag.example.clone();
    info.dynamic_attributes = tag.dynamic_attributes;
    info.tei_class = tei_class;
    for attribute in &tag.attributes {
        if (attribute.deferred_value || attribute.deferred_method)
            && header.predates_deferred_expressions()
        {
            return err.fail(
                resolution::INVALID_TAGLIB_DESCRIPTOR,
                Some(at),
                messages::deferred_attribute_in_old_library(&attribute.name, &header.uri),
            );
        }
        info.attributes.push(project_attribute(attribute, &header.required_version));
    }
    info.variables = tag.variables.iter().map(project_variable).collect();
    Ok(info)
}

/// Attribute typing: deferred and fragment attributes have fixed types,
/// literal-only attributes are strings
fn project_attribute(attribute: &AttributeDescriptor, jsp_version: &str) -> TagAttributeInfo {
    let mut type_name = attribute.type_name.as_deref().map(|t| {
        if jsp_version.trim() == "1.2" && SHORT_TYPE_NAMES.contains(&t) {
            format!("java.lang.{}", t)
        } else {
            t.to_string()
        }
    });
    let mut rtexprvalue = attribute.rtexprvalue;
    let mut expected_type_name = None;
    let mut method_signature = None;

    if attribute.deferred_value {
        type_name = Some(VALUE_EXPRESSION_TYPE.to_string());
        expected_type_name = Some(
            attribute
                .expected_type
                .as_deref()
                .map_or(OBJECT_TYPE, str::trim)
                .to_string(),
        );
    }
    if attribute.deferred_method {
        type_name = Some(METHOD_EXPRESSION_TYPE.to_string());
        method_signature = Some(
            attribute
                .method_signature
                .as_deref()
                .map_or(DEFAULT_METHOD_SIGNATURE, str::trim)
                .to_string(),
        );
    }
    if attribute.fragment {
        type_name = Some(FRAGMENT_TYPE.to_string());
        rtexprvalue = true;
    }

    TagAttributeInfo {
        name: attribute.name.clone(),
        required: attribute.required,
        type_name: type_name.unwrap_or_else(|| STRING_TYPE.to_string()),
        rtexprvalue,
        fragment: attribute.fragment,
        description: attribute.description.clone(),
        deferred_value: attribute.deferred_value,
        deferred_method: attribute.deferred_method,
        expected_type_name,
        method_signature,
    }
}

fn project_variable(variable: &VariableDescriptor) -> TagVariableInfo {
    TagVariableInfo {
        name_given: variable.name_given.clone(),
        name_from_attribute: variable.name_from_attribute.clone(),
        class_name: variable
            .variable_class
            .clone()
            .unwrap_or_else(|| STRING_TYPE.to_string()),
        declare: variable.declare.unwrap_or(true),
        scope: variable
            .scope
            .as_deref()
            .and_then(VariableScope::parse)
            .unwrap_or(VariableScope::Nested),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompilerOptions;
    use crate::logging::codes::resolution;
    use crate::resources::MemoryResources;
    use crate::taglib::descriptor::{FunctionDescriptor, TagFileDescriptor};
    use crate::taglib::extra::TagExtraInfo;

    struct NoopTei;
    impl TagExtraInfo for NoopTei {}

    fn descriptor() -> TagLibraryDescriptor {
        TagLibraryDescriptor {
            uri: Some("http://example.com/ui".to_string()),
            location: Some("/WEB-INF/ui.tld".to_string()),
            tlib_version: Some("1.0".to_string()),
            jsp_version: Some("2.1".to_string()),
            short_name: Some("ui".to_string()),
            tags: vec![TagDescriptor {
                name: "panel".to_string(),
                tag_class: "ui.PanelTag".to_string(),
                attributes: vec![
                    AttributeDescriptor {
                        name: "title".to_string(),
                        required: true,
                        ..Default::default()
                    },
                    AttributeDescriptor {
                        name: "body".to_string(),
                        fragment: true,
                        ..Default::default()
                    },
                    AttributeDescriptor {
                        name: "value".to_string(),
                        deferred_value: true,
                        ..Default::default()
                    },
                ],
                variables: vec![VariableDescriptor {
                    name_given: Some("row".to_string()),
                    scope: Some("AT_END".to_string()),
                    ..Default::default()
                }],
                ..Default::default()
            }],
            functions: vec![FunctionDescriptor {
                name: "upper".to_string(),
                function_class: "ui.Fn".to_string(),
                function_signature: "java.lang.String upper(java.lang.String)".to_string(),
            }],
            ..Default::default()
        }
    }

    fn context(descriptor: TagLibraryDescriptor, resources: MemoryResources) -> CompilationContext {
        CompilationContext::new(CompilerOptions::default(), Arc::new(resources))
            .with_descriptor(descriptor)
    }

    fn resolve_in(ctx: &CompilationContext, uri: &str) -> JspResult<Arc<TagLibraryInfo>> {
        let _ = crate::logging::init_global_logging();
        let at = Mark::new("/pages/index.jsp", 1, 1);
        resolve(ctx, uri, "/pages/index.jsp", &at, &ErrorDispatcher::new(false))
    }

    #[test]
    fn test_projection_of_attributes_and_variables() {
        let ctx = context(descriptor(), MemoryResources::new());
        let library = resolve_in(&ctx, "http://example.com/ui").unwrap();
        let panel = library.tag("panel").unwrap();

        assert_eq!(panel.body_content, BodyContent::Jsp);
        assert_eq!(panel.attribute("title").unwrap().type_name, STRING_TYPE);
        let body = panel.attribute("body").unwrap();
        assert!(body.rtexprvalue);
        assert_eq!(body.type_name, FRAGMENT_TYPE);
        let value = panel.attribute("value").unwrap();
        assert_eq!(value.type_name, VALUE_EXPRESSION_TYPE);
        assert_eq!(value.expected_type_name.as_deref(), Some(OBJECT_TYPE));
        assert_eq!(panel.variables[0].scope, VariableScope::AtEnd);
        assert_eq!(panel.variables[0].class_name, STRING_TYPE);
        assert!(library.function("upper").is_some());
    }

    #[test]
    fn test_library_is_cached_per_key() {
        let ctx = context(descriptor(), MemoryResources::new());
        let first = resolve_in(&ctx, "http://example.com/ui").unwrap();
        let second = resolve_in(&ctx, "http://example.com/ui").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_relative_uri_resolves_to_location() {
        let ctx = context(descriptor(), MemoryResources::new());
        let library = resolve_in(&ctx, "../WEB-INF/ui.tld").unwrap();
        assert_eq!(library.uri(), "http://example.com/ui");
        assert_eq!(library.location, "/WEB-INF/ui.tld");
        assert!(resolve_in(&ctx, "/WEB-INF/./ui.tld").is_ok());
    }

    #[test]
    fn test_unknown_uris() {
        let ctx = context(descriptor(), MemoryResources::new());
        let err = resolve_in(&ctx, "http://example.com/missing").unwrap_err();
        assert_eq!(err.error_code(), resolution::TAGLIB_NOT_FOUND);
        assert!(err.message().contains("cannot be resolved"));
        let err = resolve_in(&ctx, "/WEB-INF/missing.tld").unwrap_err();
        assert_eq!(err.error_code(), resolution::TAGLIB_NOT_FOUND);
    }

    #[test]
    fn test_short_type_names_widened_for_old_libraries() {
        let mut old = descriptor();
        old.jsp_version = Some("1.2".to_string());
        old.tags[0].attributes = vec![AttributeDescriptor {
            name: "count".to_string(),
            rtexprvalue: true,
            type_name: Some("Integer".to_string()),
            ..Default::default()
        }];
        let ctx = context(old, MemoryResources::new());
        let library = resolve_in(&ctx, "http://example.com/ui").unwrap();
        let count = library.tag("panel").unwrap().attribute("count").unwrap();
        assert_eq!(count.type_name, "java.lang.Integer");
    }

    #[test]
    fn test_descriptor_defects() {
        let mut no_version = descriptor();
        no_version.jsp_version = None;
        let err = resolve_in(&context(no_version, MemoryResources::new()), "http://example.com/ui")
            .unwrap_err();
        assert!(err.message().contains("jsp-version"));

        let mut duplicate = descriptor();
        let function = duplicate.functions[0].clone();
        duplicate.functions.push(function);
        let err = resolve_in(&context(duplicate, MemoryResources::new()), "http://example.com/ui")
            .unwrap_err();
        assert_eq!(err.error_code(), resolution::INVALID_TAGLIB_DESCRIPTOR);

        let mut old = descriptor();
        old.jsp_version = Some("2.0".to_string());
        let err = resolve_in(&context(old, MemoryResources::new()), "http://example.com/ui")
            .unwrap_err();
        assert!(err.message().contains("too old"));

        let mut misplaced = descriptor();
        misplaced.tag_files = vec![TagFileDescriptor {
            name: "price".to_string(),
            path: "/tags/price.tag".to_string(),
        }];
        let err = resolve_in(&context(misplaced, MemoryResources::new()), "http://example.com/ui")
            .unwrap_err();
        assert_eq!(err.error_code(), resolution::INVALID_TAGLIB_DESCRIPTOR);
    }

    #[test]
    fn test_extension_classes_come_from_registries() {
        let mut with_tei = descriptor();
        with_tei.tags[0].tei_class = Some("ui.PanelTei".to_string());
        let ctx = context(with_tei.clone(), MemoryResources::new());
        let err = resolve_in(&ctx, "http://example.com/ui").unwrap_err();
        assert_eq!(err.error_code(), resolution::HANDLER_CLASS_NOT_FOUND);

        let ctx = context(with_tei, MemoryResources::new())
            .with_tag_extra_info("ui.PanelTei", Arc::new(NoopTei));
        let library = resolve_in(&ctx, "http://example.com/ui").unwrap();
        assert_eq!(library.tag("panel").unwrap().tei_class.as_deref(), Some("ui.PanelTei"));
    }

    #[test]
    fn test_declared_tag_files_are_extracted() {
        let mut with_files = descriptor();
        with_files.tag_files = vec![TagFileDescriptor {
            name: "price".to_string(),
            path: "/WEB-INF/tags/price.tag".to_string(),
        }];
        let resources = MemoryResources::new().with(
            "/WEB-INF/tags/price.tag",
            "<%@ tag body-content=\"empty\" %><%@ attribute name=\"amount\" required=\"true\" %>${amount}",
        );
        let ctx = context(with_files, resources);
        let library = resolve_in(&ctx, "http://example.com/ui").unwrap();
        let price = library.cached_tag_file("price").unwrap();
        assert_eq!(price.tag_info.body_content, BodyContent::Empty);
        assert!(price.tag_info.attribute("amount").unwrap().required);
        assert_eq!(price.tag_info.tag_class_name, "org.apache.jsp.tag.web.price_tag");
    }
}
