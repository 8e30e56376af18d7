//! Tag-file interfaces read from directives
//!
//! Only the directives of a tag file are parsed. The `tag`, `attribute` and
//! `variable` directives are folded into a [`TagInfo`]:
//!
//! - `tag` sets the body content, the dynamic-attributes map and the
//!   descriptive fields; descriptive values may repeat but never change
//! - `attribute` adds a [`TagAttributeInfo`] typed by its fragment and
//!   deferred flags
//! - `variable` adds a [`TagVariableInfo`] named either directly or by an
//!   attribute plus alias
//!
//! Attribute names, given variable names and aliases share one namespace.
//! A dynamic-attributes name may be repeated by later tag directives.

use crate::config::compile_time::resources::{META_INF_TAG_DIR_ROOT, TAG_DIR_ROOT};
use crate::config::compile_time::syntax::{TAG_FILE_PACKAGE_META, TAG_FILE_PACKAGE_WEB};
use crate::context::CompilationContext;
use crate::errors::{messages, ErrorDispatcher, JspResult};
use crate::logging::codes::{resolution, tagfile};
use crate::logging::Code;
use crate::nodes::{Node, NodeKind};
use crate::page_info::PageInfo;
use crate::parser::ParserController;
use crate::taglib::{
    BodyContent, LibraryHeader, TagAttributeInfo, TagFileInfo, TagInfo, TagLibraryInfo,
    TagVariableInfo, VariableScope, DEFAULT_METHOD_SIGNATURE, FRAGMENT_TYPE,
    METHOD_EXPRESSION_TYPE, OBJECT_TYPE, STRING_TYPE, VALUE_EXPRESSION_TYPE,
};
use crate::utils::Mark;
use crate::log_debug;
use std::collections::HashMap;
use std::sync::Arc;

const TAG_DIRECTIVE_ATTRIBUTES: &[&str] = &[
    "display-name",
    "body-content",
    "dynamic-attributes",
    "small-icon",
    "large-icon",
    "description",
    "example",
    "pageEncoding",
    "language",
    "import",
    "deferredSyntaxAllowedAsLiteral",
    "trimDirectiveWhitespaces",
    "isELIgnored",
    "errorOnELNotFound",
];

/// Tag directive attributes that may repeat only with the same value
const SINGLE_VALUED_TAG_ATTRIBUTES: &[&str] = &[
    "body-content",
    "dynamic-attributes",
    "small-icon",
    "large-icon",
    "description",
    "display-name",
    "example",
];

const ATTRIBUTE_DIRECTIVE_ATTRIBUTES: &[&str] = &[
    "name",
    "required",
    "fragment",
    "rtexprvalue",
    "type",
    "deferredValue",
    "deferredValueType",
    "deferredMethod",
    "deferredMethodSignature",
    "description",
];

const VARIABLE_DIRECTIVE_ATTRIBUTES: &[&str] = &[
    "name-given",
    "name-from-attribute",
    "alias",
    "variable-class",
    "scope",
    "declare",
    "description",
];

const JAVA_KEYWORDS: &[&str] = &[
    "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
    "continue", "default", "do", "double", "else", "enum", "extends", "false", "final",
    "finally", "float", "for", "goto", "if", "implements", "import", "instanceof", "int",
    "interface", "long", "native", "new", "null", "package", "private", "protected", "public",
    "return", "short", "static", "strictfp", "super", "switch", "synchronized", "this", "throw",
    "throws", "transient", "true", "try", "void", "volatile", "while",
];

/// Interface of the tag file `name` in `library`, extracting and caching it
/// on first use
pub fn lookup(
    ctx: &CompilationContext,
    library: &TagLibraryInfo,
    name: &str,
    at: &Mark,
    err: &ErrorDispatcher,
) -> JspResult<Option<Arc<TagFileInfo>>> {
    if let Some(info) = library.cached_tag_file(name) {
        return Ok(Some(info));
    }
    let Some(path) = library.tag_file_path(name) else {
        return Ok(None);
    };
    if !ctx.resources().exists(path) {
        return err.fail(
            resolution::TAG_FILE_NOT_FOUND,
            Some(at),
            messages::file_not_found(path),
        );
    }
    let tag_info = extract(ctx, &library.header, name, path, err)?;
    Ok(Some(library.cache_tag_file(TagFileInfo {
        name: name.to_string(),
        path: path.to_string(),
        tag_info: Arc::new(tag_info),
    })))
}

/// Parse the directives of the tag file at `path` into the interface of
/// tag `name`
pub fn extract(
    ctx: &CompilationContext,
    header: &LibraryHeader,
    name: &str,
    path: &str,
    err: &ErrorDispatcher,
) -> JspResult<TagInfo> {
    let Some(class_name) = handler_class_name(path) else {
        return err.fail(
            resolution::INVALID_TAGLIB_DESCRIPTOR,
            None,
            messages::invalid_tag_file_directory(path),
        );
    };

    let mut page_info = PageInfo::new(ctx.options(), true);
    let mut inner = ErrorDispatcher::new(err.jspc_mode());
    let tree = ParserController::new(ctx, true)
        .directives_only()
        .parse(path, &mut page_info, &mut inner)?;

    let mut builder = InterfaceBuilder::new(header, path, err);
    for id in tree.preorder(tree.root()) {
        let node = tree.node(id);
        match node.kind {
            NodeKind::TagDirective { .. } => builder.tag_directive(node)?,
            NodeKind::AttributeDirective => builder.attribute_directive(node)?,
            NodeKind::VariableDirective => builder.variable_directive(node)?,
            _ => {}
        }
    }
    builder.check_names_from_attributes()?;

    let info = builder.build(name, class_name);
    log_debug!("Tag file interface extracted",
        "path" => path,
        "attributes" => info.attributes.len(),
        "variables" => info.variables.len()
    );
    Ok(info)
}

/// Handler class for a tag file under `/WEB-INF/tags/` or `/META-INF/tags/`,
/// e.g. `/WEB-INF/tags/ui/price.tag` becomes `org.apache.jsp.tag.web.ui.price_tag`
pub fn handler_class_name(path: &str) -> Option<String> {
    let web_root = format!("{}/", TAG_DIR_ROOT);
    let meta_root = format!("{}/", META_INF_TAG_DIR_ROOT);
    let (package, relative) = if let Some(index) = path.find(&web_root) {
        (TAG_FILE_PACKAGE_WEB, &path[index + web_root.len()..])
    } else if let Some(index) = path.find(&meta_root) {
        (TAG_FILE_PACKAGE_META, &path[index + meta_root.len()..])
    } else {
        return None;
    };
    if relative.is_empty() {
        return None;
    }

    let mut class_name = package.to_string();
    for segment in relative.split('/').filter(|s| !s.is_empty()) {
        class_name.push('.');
        class_name.push_str(&java_identifier(segment));
    }
    Some(class_name)
}

/// Mangle `text` into a Java identifier: `.` becomes `_`, other invalid
/// characters (and `_` itself) become `_` plus four hex digits
pub fn java_identifier(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 4);
    if !text.chars().next().is_some_and(is_identifier_start) {
        out.push('_');
    }
    for c in text.chars() {
        if c == '.' {
            out.push('_');
        } else if c != '_' && is_identifier_part(c) {
            out.push(c);
        } else {
            out.push_str(&format!("_{:04x}", c as u32));
        }
    }
    if JAVA_KEYWORDS.contains(&out.as_str()) {
        out.push('_');
    }
    out
}

fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_identifier_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// `true` and `yes` in any case
fn truthy(value: &str) -> bool {
    let value = value.trim();
    value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("yes")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NameKind {
    Attribute,
    VariableGiven,
    VariableAlias,
    VariableFromAttribute,
    DynamicAttributes,
}

impl NameKind {
    fn label(self) -> &'static str {
        match self {
            Self::Attribute => "attribute name",
            Self::VariableGiven => "variable name-given",
            Self::VariableAlias => "variable alias",
            Self::VariableFromAttribute => "variable name-from-attribute",
            Self::DynamicAttributes => "tag dynamic-attributes",
        }
    }
}

#[derive(Debug, Clone)]
struct NameEntry {
    kind: NameKind,
    mark: Mark,
    /// Index into the declared attributes for attribute names
    attribute: Option<usize>,
}

/// Accumulates one tag file's interface while its directives are visited
struct InterfaceBuilder<'a> {
    header: &'a LibraryHeader,
    path: &'a str,
    err: &'a ErrorDispatcher,
    tag_values: HashMap<&'static str, String>,
    body_content: Option<BodyContent>,
    dynamic_attributes: Option<String>,
    attributes: Vec<TagAttributeInfo>,
    variables: Vec<TagVariableInfo>,
    names: HashMap<String, NameEntry>,
    names_from_attributes: Vec<(String, NameEntry)>,
}

impl<'a> InterfaceBuilder<'a> {
    fn new(header: &'a LibraryHeader, path: &'a str, err: &'a ErrorDispatcher) -> Self {
        Self {
            header,
            path,
            err,
            tag_values: HashMap::new(),
            body_content: None,
            dynamic_attributes: None,
            attributes: Vec::new(),
            variables: Vec::new(),
            names: HashMap::new(),
            names_from_attributes: Vec::new(),
        }
    }

    fn fail<T>(&self, code: Code, node: &Node, message: String) -> JspResult<T> {
        self.err.fail(code, node.mark(), message)
    }

    fn check_attribute_names(
        &self,
        node: &Node,
        code: Code,
        element: &str,
        valid: &[&str],
    ) -> JspResult<()> {
        for attribute in &node.attrs {
            if !valid.contains(&attribute.qname.as_str()) {
                return self.fail(code, node, messages::invalid_attribute(element, &attribute.qname));
            }
        }
        Ok(())
    }

    fn tag_directive(&mut self, node: &Node) -> JspResult<()> {
        self.check_attribute_names(
            node,
            tagfile::INVALID_TAG_DIRECTIVE,
            "Tag directive",
            TAG_DIRECTIVE_ATTRIBUTES,
        )?;

        for &name in SINGLE_VALUED_TAG_ATTRIBUTES {
            let Some(value) = node.attr(name) else {
                continue;
            };
            match self.tag_values.get(name) {
                Some(old) if old != value => {
                    let message = messages::conflicting_tag_directive(name, old, value);
                    return self.fail(tagfile::INVALID_TAG_DIRECTIVE, node, message);
                }
                Some(_) => {}
                None => {
                    self.tag_values.insert(name, value.to_string());
                }
            }
        }

        if let Some(value) = node.attr("body-content") {
            match BodyContent::parse(value) {
                Some(content @ (BodyContent::Empty | BodyContent::TagDependent | BodyContent::Scriptless)) => {
                    self.body_content = Some(content)
                }
                _ => {
                    return self.fail(
                        tagfile::INVALID_TAG_DIRECTIVE,
                        node,
                        messages::invalid_body_content_in_tag_directive(value),
                    )
                }
            }
        }

        if let Some(value) = node.attr("dynamic-attributes") {
            self.check_unique_name(value, NameKind::DynamicAttributes, node, None)?;
            self.dynamic_attributes = Some(value.to_string());
        }
        Ok(())
    }

    fn attribute_directive(&mut self, node: &Node) -> JspResult<()> {
        self.check_attribute_names(
            node,
            tagfile::INVALID_ATTRIBUTE_DIRECTIVE,
            "Attribute directive",
            ATTRIBUTE_DIRECTIVE_ATTRIBUTES,
        )?;
        let Some(name) = node.attr("name") else {
            return self.fail(
                tagfile::INVALID_ATTRIBUTE_DIRECTIVE,
                node,
                messages::missing_mandatory_attribute("Attribute directive", "name"),
            );
        };
        let invalid = |message: String| self.fail(tagfile::INVALID_ATTRIBUTE_DIRECTIVE, node, message);

        let required = node.attr("required").is_some_and(truthy);
        let fragment = node.attr("fragment").is_some_and(truthy);
        let rtexprvalue_given = node.attr("rtexprvalue");
        let type_given = node.attr("type").map(str::trim);

        let mut deferred_value = node.attr("deferredValue").is_some_and(truthy);
        let expected_type = match node.attr("deferredValueType") {
            Some(_) if node.attr("deferredValue").is_some() && !deferred_value => {
                return invalid(messages::value_type_without_deferred_value())
            }
            Some(value_type) => {
                deferred_value = true;
                Some(value_type.trim().to_string())
            }
            None if deferred_value => Some(OBJECT_TYPE.to_string()),
            None => None,
        };

        let mut deferred_method = node.attr("deferredMethod").is_some_and(truthy);
        let signature = match node.attr("deferredMethodSignature") {
            Some(_) if node.attr("deferredMethod").is_some() && !deferred_method => {
                return invalid(messages::method_signature_without_deferred_method())
            }
            Some(signature) => {
                deferred_method = true;
                Some(signature.trim().to_string())
            }
            None if deferred_method => Some(DEFAULT_METHOD_SIGNATURE.replace("method", name)),
            None => None,
        };

        if deferred_value && deferred_method {
            return invalid(messages::both_deferred_value_and_method());
        }
        if fragment {
            if type_given.is_some() {
                return invalid(messages::fragment_with_type());
            }
            if rtexprvalue_given.is_some() {
                return invalid(messages::fragment_with_rtexprvalue());
            }
        }
        if (deferred_value || deferred_method) && self.header.predates_deferred_expressions() {
            return invalid(messages::invalid_tag_file_jsp_version(self.path));
        }

        let type_name = if fragment {
            FRAGMENT_TYPE.to_string()
        } else if deferred_value {
            VALUE_EXPRESSION_TYPE.to_string()
        } else if deferred_method {
            METHOD_EXPRESSION_TYPE.to_string()
        } else {
            type_given.unwrap_or(STRING_TYPE).to_string()
        };
        let rtexprvalue = fragment || rtexprvalue_given.map_or(true, truthy);

        let index = self.attributes.len();
        self.check_unique_name(name, NameKind::Attribute, node, Some(index))?;
        self.attributes.push(TagAttributeInfo {
            name: name.to_string(),
            required,
            type_name,
            rtexprvalue,
            fragment,
            description: node.attr("description").map(str::to_string),
            deferred_value,
            deferred_method,
            expected_type_name: expected_type,
            method_signature: signature,
        });
        Ok(())
    }

    fn variable_directive(&mut self, node: &Node) -> JspResult<()> {
        self.check_attribute_names(
            node,
            tagfile::INVALID_VARIABLE_DIRECTIVE,
            "Variable directive",
            VARIABLE_DIRECTIVE_ATTRIBUTES,
        )?;
        let invalid = |message: String| self.fail(tagfile::INVALID_VARIABLE_DIRECTIVE, node, message);

        let name_given = node.attr("name-given");
        let name_from_attribute = node.attr("name-from-attribute");
        let alias = node.attr("alias");
        match (name_given, name_from_attribute) {
            (None, None) => return invalid(messages::variable_needs_a_name()),
            (Some(_), Some(_)) => return invalid(messages::variable_has_both_names()),
            _ => {}
        }
        if alias.is_some() != name_from_attribute.is_some() {
            return invalid(messages::variable_alias_mismatch());
        }

        let scope = match node.attr("scope") {
            None => VariableScope::Nested,
            Some(value) => match VariableScope::parse(value) {
                Some(scope) => scope,
                None => return invalid(messages::invalid_scope(value)),
            },
        };
        let class_name = node
            .attr("variable-class")
            .map(|c| c.trim().to_string())
            .unwrap_or_else(|| STRING_TYPE.to_string());
        let declare = node.attr("declare").map_or(true, truthy);

        let given = match (name_from_attribute, alias) {
            (Some(from), Some(alias)) => {
                self.check_unique_name(from, NameKind::VariableFromAttribute, node, None)?;
                self.check_unique_name(alias, NameKind::VariableAlias, node, None)?;
                alias
            }
            _ => {
                let given = name_given.unwrap_or_default();
                self.check_unique_name(given, NameKind::VariableGiven, node, None)?;
                given
            }
        };

        self.variables.push(TagVariableInfo {
            name_given: Some(given.to_string()),
            name_from_attribute: name_from_attribute.map(str::to_string),
            class_name,
            declare,
            scope,
        });
        Ok(())
    }

    fn check_unique_name(
        &mut self,
        name: &str,
        kind: NameKind,
        node: &Node,
        attribute: Option<usize>,
    ) -> JspResult<()> {
        let mark = node.mark().cloned().unwrap_or_else(|| Mark::start_of(self.path));
        let entry = NameEntry { kind, mark, attribute };

        if kind == NameKind::VariableFromAttribute {
            if let Some((_, previous)) = self.names_from_attributes.iter().find(|(n, _)| n == name) {
                let message = messages::duplicate_names(kind.label(), previous.kind.label(), previous.mark.line());
                return self.fail(tagfile::DUPLICATE_NAME, node, message);
            }
            self.names_from_attributes.push((name.to_string(), entry));
            return Ok(());
        }

        match self.names.get(name) {
            Some(previous)
                if kind == NameKind::DynamicAttributes
                    && previous.kind == NameKind::DynamicAttributes => {}
            Some(previous) => {
                let message = messages::duplicate_names(kind.label(), previous.kind.label(), previous.mark.line());
                return self.fail(tagfile::DUPLICATE_NAME, node, message);
            }
            None => {
                self.names.insert(name.to_string(), entry);
            }
        }
        Ok(())
    }

    /// Every name-from-attribute must name a required, literal-only String
    /// attribute
    fn check_names_from_attributes(&self) -> JspResult<()> {
        for (name, from) in &self.names_from_attributes {
            let declared = self
                .names
                .get(name)
                .and_then(|entry| entry.attribute.map(|index| (entry, &self.attributes[index])));
            let Some((entry, attribute)) = declared else {
                return self.err.fail(
                    tagfile::NAME_FROM_ATTRIBUTE_INVALID,
                    Some(&from.mark),
                    messages::cannot_find_attribute(name),
                );
            };
            if attribute.type_name != STRING_TYPE || !attribute.required || attribute.rtexprvalue {
                return self.err.fail(
                    tagfile::NAME_FROM_ATTRIBUTE_INVALID,
                    Some(&from.mark),
                    messages::invalid_name_from_attribute(entry.mark.line(), name),
                );
            }
        }
        Ok(())
    }

    fn build(self, name: &str, class_name: String) -> TagInfo {
        let mut info = TagInfo::new(
            name,
            class_name,
            self.body_content.unwrap_or(BodyContent::Scriptless),
            self.header.clone(),
        );
        let mut values = self.tag_values;
        info.info = values.remove("description");
        info.display_name = values.remove("display-name");
        info.small_icon = values.remove("small-icon");
        info.large_icon = values.remove("large-icon");
        info.example = values.remove("example");
        info.attributes = self.attributes;
        info.variables = self.variables;
        info.dynamic_attributes = self.dynamic_attributes.is_some();
        info.dynamic_attributes_map_name = self.dynamic_attributes;
        info
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompilerOptions;
    use crate::resources::MemoryResources;
    use std::collections::BTreeMap;

    fn header(version: &str) -> LibraryHeader {
        LibraryHeader {
            uri: "urn:jsptagdir:/WEB-INF/tags".to_string(),
            short_name: "tags".to_string(),
            tlib_version: "1.0".to_string(),
            required_version: version.to_string(),
            info: None,
        }
    }

    fn extract_source(source: &str) -> JspResult<TagInfo> {
        extract_with(source, "2.1")
    }

    fn extract_with(source: &str, version: &str) -> JspResult<TagInfo> {
        let _ = crate::logging::init_global_logging();
        let ctx = CompilationContext::new(
            CompilerOptions::default(),
            Arc::new(MemoryResources::new().with("/WEB-INF/tags/t.tag", source)),
        );
        extract(&ctx, &header(version), "t", "/WEB-INF/tags/t.tag", &ErrorDispatcher::new(false))
    }

    #[test]
    fn test_defaults_for_an_empty_tag_file() {
        let info = extract_source("just text").unwrap();
        assert_eq!(info.body_content, BodyContent::Scriptless);
        assert_eq!(info.tag_class_name, "org.apache.jsp.tag.web.t_tag");
        assert!(info.attributes.is_empty());
        assert!(!info.has_dynamic_attributes());
    }

    #[test]
    fn test_tag_directive_fields() {
        let info = extract_source(
            "<%@ tag body-content=\"tagdependent\" dynamic-attributes=\"extras\" description=\"A tag\" %>\
             <%@ tag description=\"A tag\" import=\"java.util.*\" %>",
        )
        .unwrap();
        assert_eq!(info.body_content, BodyContent::TagDependent);
        assert_eq!(info.dynamic_attributes_map_name.as_deref(), Some("extras"));
        assert_eq!(info.info.as_deref(), Some("A tag"));
    }

    #[test]
    fn test_tag_directive_conflicts_and_bad_values() {
        let err = extract_source("<%@ tag description=\"a\" %><%@ tag description=\"b\" %>").unwrap_err();
        assert_eq!(err.error_code(), tagfile::INVALID_TAG_DIRECTIVE);
        assert!(err.message().contains("old: a, new: b"));

        let err = extract_source("<%@ tag body-content=\"JSP\" %>").unwrap_err();
        assert_eq!(err.error_code(), tagfile::INVALID_TAG_DIRECTIVE);

        let err = extract_source("<%@ tag session=\"true\" %>").unwrap_err();
        assert_eq!(err.error_code(), tagfile::INVALID_TAG_DIRECTIVE);
    }

    #[test]
    fn test_attribute_typing() {
        let info = extract_source(
            "<%@ attribute name=\"plain\" %>\
             <%@ attribute name=\"count\" type=\"java.lang.Integer\" rtexprvalue=\"false\" required=\"yes\" %>\
             <%@ attribute name=\"body\" fragment=\"true\" %>\
             <%@ attribute name=\"value\" deferredValueType=\"java.util.Date\" %>\
             <%@ attribute name=\"action\" deferredMethod=\"true\" %>",
        )
        .unwrap();

        let plain = info.attribute("plain").unwrap();
        assert_eq!(plain.type_name, STRING_TYPE);
        assert!(plain.rtexprvalue);
        assert!(!plain.required);

        let count = info.attribute("count").unwrap();
        assert_eq!(count.type_name, "java.lang.Integer");
        assert!(!count.rtexprvalue);
        assert!(count.required);

        let body = info.attribute("body").unwrap();
        assert_eq!(body.type_name, FRAGMENT_TYPE);
        assert!(body.fragment && body.rtexprvalue);

        let value = info.attribute("value").unwrap();
        assert!(value.deferred_value);
        assert_eq!(value.type_name, VALUE_EXPRESSION_TYPE);
        assert_eq!(value.expected_type_name.as_deref(), Some("java.util.Date"));

        let action = info.attribute("action").unwrap();
        assert_eq!(action.type_name, METHOD_EXPRESSION_TYPE);
        assert_eq!(action.method_signature.as_deref(), Some("java.lang.Object action()"));
    }

    #[test]
    fn test_attribute_directive_errors() {
        let cases = [
            "<%@ attribute required=\"true\" %>",
            "<%@ attribute name=\"a\" color=\"red\" %>",
            "<%@ attribute name=\"a\" deferredValue=\"false\" deferredValueType=\"X\" %>",
            "<%@ attribute name=\"a\" deferredMethod=\"false\" deferredMethodSignature=\"void f()\" %>",
            "<%@ attribute name=\"a\" deferredValue=\"true\" deferredMethod=\"true\" %>",
            "<%@ attribute name=\"a\" fragment=\"true\" type=\"java.lang.String\" %>",
            "<%@ attribute name=\"a\" fragment=\"true\" rtexprvalue=\"true\" %>",
        ];
        for source in cases {
            let err = extract_source(source).unwrap_err();
            assert_eq!(err.error_code(), tagfile::INVALID_ATTRIBUTE_DIRECTIVE, "{}", source);
        }
    }

    #[test]
    fn test_deferred_attributes_need_a_recent_library() {
        let err = extract_with("<%@ attribute name=\"a\" deferredValue=\"true\" %>", "2.0").unwrap_err();
        assert!(err.message().contains("Invalid JSP version"));
        assert!(extract_with("<%@ attribute name=\"a\" %>", "2.0").is_ok());
    }

    #[test]
    fn test_variable_directives() {
        let info = extract_source(
            "<%@ attribute name=\"var\" required=\"true\" rtexprvalue=\"false\" %>\
             <%@ variable name-given=\"total\" variable-class=\"java.lang.Long\" scope=\"AT_END\" %>\
             <%@ variable name-from-attribute=\"var\" alias=\"result\" declare=\"false\" %>",
        )
        .unwrap();
        assert_eq!(info.variables.len(), 2);
        assert_eq!(info.variables[0].name_given.as_deref(), Some("total"));
        assert_eq!(info.variables[0].class_name, "java.lang.Long");
        assert_eq!(info.variables[0].scope, VariableScope::AtEnd);
        assert!(info.variables[0].declare);
        assert_eq!(info.variables[1].name_given.as_deref(), Some("result"));
        assert_eq!(info.variables[1].name_from_attribute.as_deref(), Some("var"));
        assert!(!info.variables[1].declare);
    }

    #[test]
    fn test_variable_directive_errors() {
        let cases = [
            "<%@ variable scope=\"NESTED\" %>",
            "<%@ variable name-given=\"a\" name-from-attribute=\"b\" alias=\"c\" %>",
            "<%@ variable name-given=\"a\" alias=\"c\" %>",
            "<%@ variable name-from-attribute=\"b\" %>",
            "<%@ variable name-given=\"a\" scope=\"page\" %>",
        ];
        for source in cases {
            let err = extract_source(source).unwrap_err();
            assert_eq!(err.error_code(), tagfile::INVALID_VARIABLE_DIRECTIVE, "{}", source);
        }
    }

    #[test]
    fn test_name_from_attribute_post_check() {
        let missing = "<%@ variable name-from-attribute=\"var\" alias=\"result\" %>";
        let err = extract_source(missing).unwrap_err();
        assert_eq!(err.error_code(), tagfile::NAME_FROM_ATTRIBUTE_INVALID);

        for attribute in [
            "<%@ attribute name=\"var\" rtexprvalue=\"false\" %>",
            "<%@ attribute name=\"var\" required=\"true\" %>",
            "<%@ attribute name=\"var\" required=\"true\" rtexprvalue=\"false\" type=\"java.lang.Integer\" %>",
        ] {
            let source = format!("{}{}", attribute, missing);
            let err = extract_source(&source).unwrap_err();
            assert_eq!(err.error_code(), tagfile::NAME_FROM_ATTRIBUTE_INVALID, "{}", attribute);
            assert!(err.message().contains("line 1"));
        }
    }

    #[test]
    fn test_unique_names_across_directives() {
        let duplicates = [
            "<%@ attribute name=\"a\" %>\n<%@ attribute name=\"a\" %>",
            "<%@ variable name-given=\"v\" %>\n<%@ variable name-given=\"v\" %>",
            "<%@ attribute name=\"x\" %>\n<%@ variable name-given=\"x\" %>",
            "<%@ tag dynamic-attributes=\"d\" %>\n<%@ attribute name=\"d\" %>",
            "<%@ attribute name=\"n\" required=\"true\" rtexprvalue=\"false\" %>\
             <%@ attribute name=\"k\" required=\"true\" rtexprvalue=\"false\" %>\
             <%@ variable name-from-attribute=\"n\" alias=\"n2\" %>\n\
             <%@ variable name-from-attribute=\"k\" alias=\"n2\" %>",
        ];
        for source in duplicates {
            let err = extract_source(source).unwrap_err();
            assert_eq!(err.error_code(), tagfile::DUPLICATE_NAME, "{}", source);
            assert!(err.message().contains("line 1"), "{}", err.message());
        }

        let repeated_dynamic = "<%@ tag dynamic-attributes=\"d\" %>\n<%@ tag dynamic-attributes=\"d\" %>";
        assert!(extract_source(repeated_dynamic).is_ok());
    }

    #[test]
    fn test_handler_class_names() {
        assert_eq!(
            handler_class_name("/WEB-INF/tags/ui/price.tag").as_deref(),
            Some("org.apache.jsp.tag.web.ui.price_tag")
        );
        assert_eq!(
            handler_class_name("/META-INF/tags/my-tag.tagx").as_deref(),
            Some("org.apache.jsp.tag.meta.my_002dtag_tagx")
        );
        assert_eq!(
            handler_class_name("/WEB-INF/tags/1st/new.tag").as_deref(),
            Some("org.apache.jsp.tag.web._1st.new_tag")
        );
        assert_eq!(handler_class_name("/tags/x.tag"), None);
        assert_eq!(java_identifier("class"), "class_");
        assert_eq!(java_identifier("my_tag"), "my_005ftag");
    }

    #[test]
    fn test_lookup_extracts_once_and_caches() {
        let _ = crate::logging::init_global_logging();
        let ctx = CompilationContext::new(
            CompilerOptions::default(),
            Arc::new(MemoryResources::new().with("/WEB-INF/tags/hello.tag", "<%@ attribute name=\"who\" %>")),
        );
        let mut paths = BTreeMap::new();
        paths.insert("hello".to_string(), "/WEB-INF/tags/hello.tag".to_string());
        paths.insert("gone".to_string(), "/WEB-INF/tags/gone.tag".to_string());
        let library = TagLibraryInfo::implicit(header("2.0"), "/WEB-INF/tags", paths, None);
        let err = ErrorDispatcher::new(false);
        let at = Mark::new("/index.jsp", 1, 1);

        let first = lookup(&ctx, &library, "hello", &at, &err).unwrap().unwrap();
        let second = lookup(&ctx, &library, "hello", &at, &err).unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(first.tag_info.attribute("who").is_some());

        assert!(lookup(&ctx, &library, "missing", &at, &err).unwrap().is_none());
        let gone = lookup(&ctx, &library, "gone", &at, &err).unwrap_err();
        assert_eq!(gone.error_code(), resolution::TAG_FILE_NOT_FOUND);
    }
}
