//! Custom tag attribute contracts
//!
//! Attributes are matched against the tag's declared attributes by local
//! name; a namespace-qualified attribute only matches when its namespace is
//! the tag's own. Anything unmatched is a dynamic attribute, allowed only
//! for tags that accept them.

use super::functions::{self, is_loadable};
use super::{classify_value, ClassifiedValue};
use crate::context::CompilationContext;
use crate::errors::{messages, ErrorDispatcher, JspResult};
use crate::logging::codes::{attribute, syntax};
use crate::logging::Code;
use crate::nodes::{Attribute, AttributeValue, JspAttribute, NodeId, NodeKind, Tree};
use crate::page_info::PageInfo;
use crate::taglib::extra::{TagData, TagDataValue, VariableInfo};
use crate::taglib::{
    BodyContent, TagAttributeInfo, TagInfo, FRAGMENT_TYPE, OBJECT_TYPE,
};
use crate::utils::Mark;
use std::sync::Arc;

struct Tag<'a> {
    qname: String,
    local_name: String,
    prefix: String,
    uri: String,
    info: Arc<TagInfo>,
    mark: Option<Mark>,
    err: &'a ErrorDispatcher,
}

impl Tag<'_> {
    fn fail(&self, code: Code, message: String) -> JspResult<()> {
        self.err.fail(code, self.mark.as_ref(), message)
    }

    /// Declared attribute a plain attribute refers to
    fn declared_for(&self, attr: &Attribute) -> Option<&TagAttributeInfo> {
        let own_namespace = attr.uri.as_deref().map_or(true, |uri| uri.is_empty() || uri == self.uri);
        if !own_namespace {
            return None;
        }
        self.info.attribute(&attr.local_name)
    }

    /// Declared attribute a `jsp:attribute` refers to; matched on prefix since
    /// its name is not namespace-resolved
    fn declared_for_named(&self, prefix: Option<&str>, local_name: &str) -> Option<&TagAttributeInfo> {
        let own_prefix = prefix.map_or(true, |p| p.is_empty() || p == self.prefix);
        if !own_prefix {
            return None;
        }
        self.info.attribute(local_name)
    }
}

struct Named {
    id: NodeId,
    name: String,
    prefix: Option<String>,
    local_name: String,
}

pub(super) fn check(
    ctx: &CompilationContext,
    tree: &mut Tree,
    id: NodeId,
    page_info: &PageInfo,
    err: &ErrorDispatcher,
) -> JspResult<()> {
    let node = tree.node(id);
    let Some(data) = node.custom_tag() else {
        return Ok(());
    };
    let tag = Tag {
        qname: data.qname.clone(),
        local_name: data.local_name.clone(),
        prefix: data.prefix.clone(),
        uri: data.uri.clone(),
        info: data.tag_info.clone(),
        mark: node.mark().cloned(),
        err,
    };
    let implements_simple_tag = data.implements_simple_tag;
    let implements_dynamic_attributes = data.implements_dynamic_attributes;
    let attrs: Vec<Attribute> = node
        .attrs
        .iter()
        .filter(|a| !a.qname.starts_with("xmlns"))
        .cloned()
        .collect();
    let named: Vec<Named> = tree
        .named_attributes(id)
        .into_iter()
        .filter_map(|child| match &tree.node(child).kind {
            NodeKind::NamedAttribute(data) => Some(Named {
                id: child,
                name: data.name.clone(),
                prefix: data.prefix.clone(),
                local_name: data.local_name.clone(),
            }),
            _ => None,
        })
        .collect();

    if implements_simple_tag && tag.info.body_content == BodyContent::Jsp {
        tag.fail(
            syntax::INVALID_BODY,
            messages::invalid_simple_tag_body_content(&tag.info.tag_class_name),
        )?;
    }
    if tag.info.has_dynamic_attributes() && !implements_dynamic_attributes {
        tag.fail(
            attribute::DYNAMIC_ATTRIBUTES_UNSUPPORTED,
            messages::unimplemented_dynamic_attributes(&tag.qname),
        )?;
    }

    for declared in &tag.info.attributes {
        let plain = attrs
            .iter()
            .any(|a| tag.declared_for(a).is_some_and(|d| d.name == declared.name));
        let nested = named.iter().any(|n| {
            tag.declared_for_named(n.prefix.as_deref(), &n.local_name)
                .is_some_and(|d| d.name == declared.name)
        });
        if declared.required && !plain && !nested {
            tag.fail(
                attribute::MISSING_ATTRIBUTE,
                messages::missing_mandatory_attribute(&tag.local_name, &declared.name),
            )?;
        }
        if plain && nested {
            tag.fail(
                attribute::ATTRIBUTE_SPECIFIED_TWICE,
                messages::attribute_specified_twice(&declared.name),
            )?;
        }
    }

    let deferred_as_literal =
        page_info.deferred_syntax_allowed_as_literal || tag.info.library.predates_deferred_expressions();
    let mut tag_data = TagData::new();
    let mut jsp_attributes = Vec::with_capacity(attrs.len() + named.len());

    for attr in &attrs {
        let classified = classify_value(&attr.value, page_info, deferred_as_literal, tag.mark.as_ref(), err)?;
        tag_data.insert(
            &attr.qname,
            match classified.literal() {
                Some(text) => TagDataValue::Literal(text.to_string()),
                None => TagDataValue::RequestTime,
            },
        );
        let jsp_attribute = match tag.declared_for(attr) {
            Some(declared) => declared_value(ctx, &tag, attr, declared, classified, page_info)?,
            None => dynamic_value(ctx, &tag, attr, classified, page_info)?,
        };
        jsp_attributes.push(jsp_attribute);
    }

    for attr in &named {
        let declared = tag.declared_for_named(attr.prefix.as_deref(), &attr.local_name);
        if declared.is_none() && !tag.info.has_dynamic_attributes() {
            tag.fail(
                attribute::UNKNOWN_ATTRIBUTE,
                messages::invalid_attribute_for_tag(&attr.name, &tag.local_name),
            )?;
        }
        let value = match tree.literal_body(attr.id) {
            Some(text) => TagDataValue::Literal(text),
            None => TagDataValue::RequestTime,
        };
        tag_data.insert(&attr.name, value);
        jsp_attributes.push(JspAttribute {
            qname: attr.name.clone(),
            uri: None,
            local_name: attr.local_name.clone(),
            value: AttributeValue::Named(attr.id),
            expected_type: Some(match declared {
                Some(d) if d.fragment => FRAGMENT_TYPE.to_string(),
                Some(d) => d.type_name.clone(),
                None => OBJECT_TYPE.to_string(),
            }),
            el: None,
            is_dynamic: declared.is_none(),
        });
    }

    let variable_infos = variable_infos(ctx, &tag, &tag_data)?;

    let node = tree.node_mut(id);
    node.jsp_attributes = jsp_attributes;
    if let Some(data) = node.custom_tag_mut() {
        data.tag_data = Some(tag_data);
        data.variable_infos = variable_infos;
    }
    Ok(())
}

fn declared_value(
    ctx: &CompilationContext,
    tag: &Tag<'_>,
    attr: &Attribute,
    declared: &TagAttributeInfo,
    classified: ClassifiedValue,
    page_info: &PageInfo,
) -> JspResult<JspAttribute> {
    let expression = classified.is_expression();
    let deferred = classified.is_deferred();

    if expression && deferred && !declared.deferred_value && !declared.deferred_method {
        tag.fail(attribute::EXPRESSION_NOT_ALLOWED, messages::no_expression_allowed(&declared.name))?;
    }
    if expression && !deferred && !declared.rtexprvalue {
        tag.fail(attribute::EXPRESSION_NOT_ALLOWED, messages::no_expression_allowed(&declared.name))?;
    }

    let expected_type = if declared.fragment {
        FRAGMENT_TYPE.to_string()
    } else if expression {
        declared.type_name.clone()
    } else {
        literal_target_type(declared).unwrap_or_else(|| declared.type_name.clone())
    };

    if let Some(literal) = classified.literal() {
        if declared.deferred_method && declared.method_return_type() == Some("void") {
            tag.fail(
                attribute::VOID_DEFERRED_LITERAL,
                messages::literal_with_void_deferred_method(&declared.name),
            )?;
        }
        if declared.deferred_value || declared.deferred_method {
            check_coercion(ctx, tag, declared, &expected_type, literal)?;
        }
    } else if expression && !is_loadable(ctx, &expected_type) {
        tag.fail(
            attribute::UNKNOWN_ATTRIBUTE_TYPE,
            messages::unknown_attribute_type(&expected_type, &declared.name),
        )?;
    }

    let ClassifiedValue { value, el } = classified;
    let el = resolve_functions(ctx, el, page_info, tag)?;
    Ok(JspAttribute {
        qname: attr.qname.clone(),
        uri: attr.uri.clone(),
        local_name: attr.local_name.clone(),
        value,
        expected_type: Some(expected_type),
        el,
        is_dynamic: false,
    })
}

fn dynamic_value(
    ctx: &CompilationContext,
    tag: &Tag<'_>,
    attr: &Attribute,
    classified: ClassifiedValue,
    page_info: &PageInfo,
) -> JspResult<JspAttribute> {
    if !tag.info.has_dynamic_attributes() {
        tag.fail(
            attribute::UNKNOWN_ATTRIBUTE,
            messages::invalid_attribute_for_tag(&attr.qname, &tag.local_name),
        )?;
    }
    let ClassifiedValue { value, el } = classified;
    let el = resolve_functions(ctx, el, page_info, tag)?;
    Ok(JspAttribute {
        qname: attr.qname.clone(),
        uri: attr.uri.clone(),
        local_name: attr.local_name.clone(),
        value,
        expected_type: Some(OBJECT_TYPE.to_string()),
        el,
        is_dynamic: true,
    })
}

fn resolve_functions(
    ctx: &CompilationContext,
    el: Option<crate::el::ElNodes>,
    page_info: &PageInfo,
    tag: &Tag<'_>,
) -> JspResult<Option<crate::el::ElNodes>> {
    match el {
        Some(mut nodes) => {
            functions::resolve(ctx, &mut nodes, page_info, tag.mark.as_ref(), tag.err)?;
            Ok(Some(nodes))
        }
        None => Ok(None),
    }
}

/// Type a literal must coerce to: the deferred value's expected type or the
/// deferred method's return type
fn literal_target_type(declared: &TagAttributeInfo) -> Option<String> {
    if declared.deferred_value {
        return Some(
            declared
                .expected_type_name
                .clone()
                .unwrap_or_else(|| OBJECT_TYPE.to_string()),
        );
    }
    if declared.deferred_method {
        return Some(
            declared
                .method_return_type()
                .unwrap_or(OBJECT_TYPE)
                .to_string(),
        );
    }
    None
}

fn check_coercion(
    ctx: &CompilationContext,
    tag: &Tag<'_>,
    declared: &TagAttributeInfo,
    expected_type: &str,
    literal: &str,
) -> JspResult<()> {
    if expected_type == "void" {
        return Ok(());
    }
    if !is_loadable(ctx, expected_type) {
        return tag.fail(
            attribute::UNKNOWN_ATTRIBUTE_TYPE,
            messages::unknown_attribute_type(expected_type, &declared.name),
        );
    }
    if !coerces(literal, expected_type) {
        return tag.fail(
            attribute::LITERAL_NOT_COERCIBLE,
            messages::error_coercing_attribute(&declared.name, expected_type, literal),
        );
    }
    Ok(())
}

/// Whether EL coercion of a string literal to `type_name` can succeed.
/// Types without a string coercion rule are accepted as they are.
fn coerces(literal: &str, type_name: &str) -> bool {
    let value = literal.trim();
    match type_name {
        "byte" | "short" | "int" | "long" | "java.lang.Byte" | "java.lang.Short"
        | "java.lang.Integer" | "java.lang.Long" | "java.math.BigInteger" => {
            value.is_empty() || value.parse::<i128>().is_ok()
        }
        "float" | "double" | "java.lang.Float" | "java.lang.Double" | "java.math.BigDecimal"
        | "java.lang.Number" => value.is_empty() || value.parse::<f64>().is_ok(),
        _ => true,
    }
}

/// Scripting variables: from the tag's extra-info hook or its declared
/// variables, never both
fn variable_infos(ctx: &CompilationContext, tag: &Tag<'_>, data: &TagData) -> JspResult<Vec<VariableInfo>> {
    let from_hook = tag
        .info
        .tei_class
        .as_deref()
        .and_then(|class| ctx.tag_extra_info(class))
        .map(|tei| tei.variable_info(data))
        .unwrap_or_default();
    if !from_hook.is_empty() {
        if !tag.info.variables.is_empty() {
            tag.fail(
                attribute::TAG_VALIDATION_FAILED,
                messages::tei_with_variable_subelements(&tag.qname),
            )?;
        }
        return Ok(from_hook);
    }

    Ok(tag
        .info
        .variables
        .iter()
        .filter_map(|variable| {
            let name = match (&variable.name_given, &variable.name_from_attribute) {
                (Some(given), _) => given.clone(),
                (None, Some(attribute)) => data.attribute_string(attribute)?.to_string(),
                (None, None) => return None,
            };
            Some(VariableInfo {
                name,
                class_name: variable.class_name.clone(),
                declare: variable.declare,
                scope: variable.scope,
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompilerOptions;
    use crate::context::ClassInfo;
    use crate::parser::ParserController;
    use crate::resources::MemoryResources;
    use crate::taglib::descriptor::{AttributeDescriptor, TagDescriptor, TagLibraryDescriptor, VariableDescriptor};
    use crate::taglib::extra::TagExtraInfo;
    use crate::taglib::{DYNAMIC_ATTRIBUTES_INTERFACE, SIMPLE_TAG_INTERFACE};
    use crate::validation::{validate, validate_directives};

    const TAGLIB: &str = "<%@ taglib prefix=\"ui\" uri=\"http://example.com/ui\" %>";

    fn attribute(name: &str) -> AttributeDescriptor {
        AttributeDescriptor {
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn descriptor(jsp_version: &str) -> TagLibraryDescriptor {
        let mut descriptor = TagLibraryDescriptor {
            uri: Some("http://example.com/ui".to_string()),
            tlib_version: Some("1.0".to_string()),
            jsp_version: Some(jsp_version.to_string()),
            short_name: Some("ui".to_string()),
            tags: vec![
                TagDescriptor {
                    name: "panel".to_string(),
                    tag_class: "ui.PanelTag".to_string(),
                    body_content: Some("scriptless".to_string()),
                    attributes: vec![
                        AttributeDescriptor { required: true, ..attribute("x") },
                        AttributeDescriptor { rtexprvalue: true, ..attribute("title") },
                        AttributeDescriptor {
                            rtexprvalue: true,
                            type_name: Some("int".to_string()),
                            ..attribute("width")
                        },
                        AttributeDescriptor {
                            deferred_value: true,
                            expected_type: Some("java.lang.Integer".to_string()),
                            ..attribute("size")
                        },
                        AttributeDescriptor {
                            deferred_method: true,
                            method_signature: Some("void close()".to_string()),
                            ..attribute("onClose")
                        },
                        AttributeDescriptor {
                            deferred_value: true,
                            expected_type: Some("app.Unknown".to_string()),
                            ..attribute("model")
                        },
                    ],
                    variables: vec![VariableDescriptor {
                        name_from_attribute: Some("x".to_string()),
                        ..Default::default()
                    }],
                    ..Default::default()
                },
                TagDescriptor {
                    name: "simple".to_string(),
                    tag_class: "ui.SimpleTag".to_string(),
                    body_content: Some("JSP".to_string()),
                    ..Default::default()
                },
                TagDescriptor {
                    name: "open".to_string(),
                    tag_class: "ui.OpenTag".to_string(),
                    dynamic_attributes: true,
                    ..Default::default()
                },
                TagDescriptor {
                    name: "closed".to_string(),
                    tag_class: "ui.ClosedTag".to_string(),
                    dynamic_attributes: true,
                    ..Default::default()
                },
                TagDescriptor {
                    name: "counted".to_string(),
                    tag_class: "ui.PanelTag".to_string(),
                    tei_class: Some("ui.CountedInfo".to_string()),
                    attributes: vec![attribute("var")],
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        if jsp_version != "2.1" {
            for tag in &mut descriptor.tags {
                tag.attributes.retain(|a| !a.deferred_value && !a.deferred_method);
            }
        }
        descriptor
    }

    struct CountedInfo;

    impl TagExtraInfo for CountedInfo {
        fn variable_info(&self, data: &TagData) -> Vec<VariableInfo> {
            data.attribute_string("var")
                .map(|name| VariableInfo {
                    name: name.to_string(),
                    class_name: "java.lang.Integer".to_string(),
                    declare: true,
                    scope: crate::taglib::VariableScope::Nested,
                })
                .into_iter()
                .collect()
        }
    }

    fn context_for(jsp_version: &str, body: &str) -> CompilationContext {
        CompilationContext::new(
            CompilerOptions::default(),
            Arc::new(MemoryResources::new().with("/p.jsp", format!("{}{}", TAGLIB, body))),
        )
        .with_descriptor(descriptor(jsp_version))
        .with_class(ClassInfo::new("ui.PanelTag"))
        .with_class(ClassInfo::new("ui.SimpleTag").implementing(SIMPLE_TAG_INTERFACE))
        .with_class(ClassInfo::new("ui.OpenTag").implementing(DYNAMIC_ATTRIBUTES_INTERFACE))
        .with_class(ClassInfo::new("ui.ClosedTag"))
        .with_tag_extra_info("ui.CountedInfo", Arc::new(CountedInfo))
    }

    fn run_with(jsp_version: &str, body: &str) -> JspResult<Tree> {
        let _ = crate::logging::init_global_logging();
        let ctx = context_for(jsp_version, body);
        let mut page_info = PageInfo::new(ctx.options(), false);
        let mut err = ErrorDispatcher::new(false);
        let mut tree = ParserController::new(&ctx, false).parse("/p.jsp", &mut page_info, &mut err)?;
        validate_directives(&ctx, &tree, &mut page_info, &mut err)?;
        validate(&ctx, "/p.jsp", &mut tree, &mut page_info, &mut err)?;
        Ok(tree)
    }

    fn run(body: &str) -> JspResult<Tree> {
        run_with("2.1", body)
    }

    fn first_tag(tree: &Tree) -> &crate::nodes::Node {
        tree.preorder(tree.root())
            .into_iter()
            .map(|id| tree.node(id))
            .find(|node| node.custom_tag().is_some())
            .unwrap()
    }

    #[test]
    fn test_plain_and_named_attribute_are_exclusive() {
        let error = run("<ui:panel x=\"1\"><jsp:attribute name=\"x\">2</jsp:attribute></ui:panel>").unwrap_err();
        assert_eq!(error.error_code(), attribute::ATTRIBUTE_SPECIFIED_TWICE);

        run("<ui:panel x=\"1\"/>").unwrap();
        run("<ui:panel><jsp:attribute name=\"x\">2</jsp:attribute></ui:panel>").unwrap();
    }

    #[test]
    fn test_required_attribute() {
        let error = run("<ui:panel title=\"t\"/>").unwrap_err();
        assert_eq!(error.error_code(), attribute::MISSING_ATTRIBUTE);
        assert!(error.message().contains("x"));
    }

    #[test]
    fn test_expression_rules() {
        let cases = [
            ("<ui:panel x=\"${a}\"/>", attribute::EXPRESSION_NOT_ALLOWED),
            ("<ui:panel x=\"<%= a %>\"/>", attribute::EXPRESSION_NOT_ALLOWED),
            ("<ui:panel x=\"1\" title=\"#{a}\"/>", attribute::EXPRESSION_NOT_ALLOWED),
            ("<ui:panel x=\"1\" size=\"${a}\"/>", attribute::EXPRESSION_NOT_ALLOWED),
            ("<ui:panel x=\"1\" title=\"${a}#{b}\"/>", attribute::MIXED_EL_DELIMITERS),
            ("<ui:panel x=\"1\" onClose=\"done\"/>", attribute::VOID_DEFERRED_LITERAL),
            ("<ui:panel x=\"1\" size=\"ten\"/>", attribute::LITERAL_NOT_COERCIBLE),
            ("<ui:panel x=\"1\" model=\"m\"/>", attribute::UNKNOWN_ATTRIBUTE_TYPE),
            ("<ui:panel x=\"1\" colour=\"red\"/>", attribute::UNKNOWN_ATTRIBUTE),
        ];
        for (body, code) in cases {
            let error = run(body).unwrap_err();
            assert_eq!(error.error_code(), code, "{}", body);
        }
    }

    #[test]
    fn test_accepted_values() {
        let tree = run("<ui:panel x=\"1\" title=\"${t}\" width=\"<%= w %>\" size=\"12\" onClose=\"#{bean.close}\"/>")
            .unwrap();
        let node = first_tag(&tree);
        let size = node.jsp_attributes.iter().find(|a| a.local_name == "size").unwrap();
        assert!(size.is_literal());
        assert_eq!(size.expected_type.as_deref(), Some("java.lang.Integer"));
        let title = node.jsp_attributes.iter().find(|a| a.local_name == "title").unwrap();
        assert!(title.el.is_some());

        let data = node.custom_tag().unwrap().tag_data.clone().unwrap();
        assert_eq!(data.attribute_string("x"), Some("1"));
        assert!(data.is_request_time("title"));
    }

    #[test]
    fn test_old_libraries_treat_deferred_syntax_as_text() {
        let tree = run_with("2.0", "<ui:panel x=\"1\" title=\"#{a}\"/>").unwrap();
        let node = first_tag(&tree);
        let title = node.jsp_attributes.iter().find(|a| a.local_name == "title").unwrap();
        assert!(matches!(title.value, AttributeValue::Literal(ref v) if v == "#{a}"));
    }

    #[test]
    fn test_simple_tag_with_jsp_body() {
        let error = run("<ui:simple>x</ui:simple>").unwrap_err();
        assert_eq!(error.error_code(), syntax::INVALID_BODY);
    }

    #[test]
    fn test_dynamic_attributes() {
        let tree = run("<ui:open anything=\"${x}\"/>").unwrap();
        let node = first_tag(&tree);
        assert!(node.jsp_attributes[0].is_dynamic);

        let error = run("<ui:closed anything=\"1\"/>").unwrap_err();
        assert_eq!(error.error_code(), attribute::DYNAMIC_ATTRIBUTES_UNSUPPORTED);
    }

    #[test]
    fn test_variables_from_declarations_and_hooks() {
        let tree = run("<ui:panel x=\"row\"/>").unwrap();
        let variables = &first_tag(&tree).custom_tag().unwrap().variable_infos;
        assert_eq!(variables.len(), 1);
        assert_eq!(variables[0].name, "row");

        let tree = run("<ui:counted var=\"n\"/>").unwrap();
        let variables = &first_tag(&tree).custom_tag().unwrap().variable_infos;
        assert_eq!(variables[0].name, "n");
        assert_eq!(variables[0].class_name, "java.lang.Integer");
    }

    #[test]
    fn test_named_attribute_tag_data() {
        let tree = run("<ui:panel><jsp:attribute name=\"x\">lit</jsp:attribute><jsp:attribute name=\"title\">${t}</jsp:attribute></ui:panel>")
            .unwrap();
        let data = first_tag(&tree).custom_tag().unwrap().tag_data.clone().unwrap();
        assert_eq!(data.attribute_string("x"), Some("lit"));
        assert!(data.is_request_time("title"));
    }
}
