//! Standard action attribute contracts

use super::{classify_value, functions, ClassifiedValue};
use crate::context::CompilationContext;
use crate::errors::{messages, ErrorDispatcher, JspResult};
use crate::logging::codes::{attribute, syntax};
use crate::nodes::{Attribute, AttributeValue, JspAttribute, NodeId, NodeKind, Tree};
use crate::page_info::PageInfo;
use crate::taglib::{OBJECT_TYPE, STRING_TYPE};
use crate::utils::Mark;

#[derive(Debug, Clone, Copy)]
struct ValidAttribute {
    name: &'static str,
    required: bool,
    rtexprvalue: bool,
}

const fn optional(name: &'static str) -> ValidAttribute {
    ValidAttribute { name, required: false, rtexprvalue: false }
}

const fn required(name: &'static str) -> ValidAttribute {
    ValidAttribute { name, required: true, rtexprvalue: false }
}

const fn runtime(name: &'static str, required: bool) -> ValidAttribute {
    ValidAttribute { name, required, rtexprvalue: true }
}

const INCLUDE: &[ValidAttribute] = &[runtime("page", true), optional("flush")];
const FORWARD: &[ValidAttribute] = &[runtime("page", true)];
const PARAM: &[ValidAttribute] = &[required("name"), runtime("value", true)];
const GET_PROPERTY: &[ValidAttribute] = &[required("name"), required("property")];
const SET_PROPERTY: &[ValidAttribute] = &[
    required("name"),
    required("property"),
    runtime("value", false),
    optional("param"),
];
const USE_BEAN: &[ValidAttribute] = &[
    required("id"),
    optional("scope"),
    optional("class"),
    optional("type"),
    runtime("beanName", false),
];
// type and code get their own messages when missing
const PLUGIN: &[ValidAttribute] = &[
    optional("type"),
    optional("code"),
    optional("codebase"),
    optional("align"),
    optional("archive"),
    runtime("height", false),
    optional("hspace"),
    optional("jreversion"),
    optional("name"),
    optional("vspace"),
    runtime("width", false),
    optional("nspluginurl"),
    optional("iepluginurl"),
];
const NAMED_ATTRIBUTE: &[ValidAttribute] = &[required("name"), runtime("omit", false), optional("trim")];
const INVOKE: &[ValidAttribute] = &[
    required("fragment"),
    optional("var"),
    optional("varReader"),
    optional("scope"),
];
const DO_BODY: &[ValidAttribute] = &[optional("var"), optional("varReader"), optional("scope")];
const OUTPUT: &[ValidAttribute] = &[
    optional("omit-xml-declaration"),
    optional("doctype-root-element"),
    optional("doctype-public"),
    optional("doctype-system"),
];
const NONE: &[ValidAttribute] = &[];

const SCOPES: &[&str] = &["page", "request", "session", "application"];

pub(super) fn is_standard_action(kind: &NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::IncludeAction
            | NodeKind::ForwardAction
            | NodeKind::ParamAction
            | NodeKind::ParamsAction
            | NodeKind::UseBean
            | NodeKind::SetProperty
            | NodeKind::GetProperty
            | NodeKind::PlugIn
            | NodeKind::FallBack
            | NodeKind::InvokeAction
            | NodeKind::DoBodyAction
            | NodeKind::JspElement
            | NodeKind::JspBody
            | NodeKind::NamedAttribute(_)
            | NodeKind::JspOutput
    )
}

/// Attribute table of an action; `None` for `jsp:element`, which takes any
fn table(kind: &NodeKind) -> Option<&'static [ValidAttribute]> {
    Some(match kind {
        NodeKind::IncludeAction => INCLUDE,
        NodeKind::ForwardAction => FORWARD,
        NodeKind::ParamAction => PARAM,
        NodeKind::UseBean => USE_BEAN,
        NodeKind::SetProperty => SET_PROPERTY,
        NodeKind::GetProperty => GET_PROPERTY,
        NodeKind::PlugIn => PLUGIN,
        NodeKind::InvokeAction => INVOKE,
        NodeKind::DoBodyAction => DO_BODY,
        NodeKind::NamedAttribute(_) => NAMED_ATTRIBUTE,
        NodeKind::JspOutput => OUTPUT,
        NodeKind::JspElement => return None,
        _ => NONE,
    })
}

/// One action being checked, with what the checks keep looking up
struct Action<'a> {
    name: String,
    mark: Option<Mark>,
    attrs: Vec<Attribute>,
    named: Vec<(String, NodeId)>,
    err: &'a ErrorDispatcher,
}

impl Action<'_> {
    fn mark(&self) -> Option<&Mark> {
        self.mark.as_ref()
    }

    fn text(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.local_name == name)
            .map(|a| a.value.as_str())
    }

    /// Supplied either as a plain attribute or through `jsp:attribute`
    fn supplied(&self, name: &str) -> bool {
        self.text(name).is_some() || self.named.iter().any(|(n, _)| n == name)
    }

    fn fail(&self, code: crate::logging::Code, message: String) -> JspResult<()> {
        self.err.fail(code, self.mark(), message)
    }
}

pub(super) fn check(
    ctx: &CompilationContext,
    tree: &mut Tree,
    id: NodeId,
    page_info: &mut PageInfo,
    err: &ErrorDispatcher,
) -> JspResult<()> {
    let node = tree.node(id);
    let kind = node.kind.clone();
    let action = Action {
        name: kind.name().to_string(),
        mark: node.mark().cloned(),
        attrs: node.attrs.iter().cloned().collect(),
        named: tree
            .named_attributes(id)
            .into_iter()
            .filter_map(|child| match &tree.node(child).kind {
                NodeKind::NamedAttribute(data) => Some((data.local_name.clone(), child)),
                _ => None,
            })
            .collect(),
        err,
    };

    let jsp_attributes = match table(&kind) {
        Some(valid) => check_table(ctx, &action, valid, page_info)?,
        None => check_element(ctx, &action, page_info)?,
    };

    match &kind {
        NodeKind::ParamsAction => check_params(tree, id, &action)?,
        NodeKind::SetProperty => check_set_property(&action)?,
        NodeKind::UseBean => check_use_bean(ctx, &action, page_info)?,
        NodeKind::PlugIn => check_plugin(&action)?,
        NodeKind::JspOutput => check_output(tree, id, &action, page_info)?,
        NodeKind::InvokeAction | NodeKind::DoBodyAction => check_var(&action)?,
        _ => {}
    }

    tree.node_mut(id).jsp_attributes = jsp_attributes;
    Ok(())
}

fn check_table(
    ctx: &CompilationContext,
    action: &Action<'_>,
    valid: &[ValidAttribute],
    page_info: &PageInfo,
) -> JspResult<Vec<JspAttribute>> {
    let known = |name: &str| valid.iter().find(|v| v.name == name);

    for attr in &action.attrs {
        if known(&attr.local_name).is_none() {
            action.fail(
                attribute::UNKNOWN_ATTRIBUTE,
                messages::invalid_attribute(&action.name, &attr.qname),
            )?;
        }
    }
    for (name, _) in &action.named {
        if known(name).is_none() {
            action.fail(attribute::UNKNOWN_ATTRIBUTE, messages::invalid_attribute(&action.name, name))?;
        }
        if action.text(name).is_some() {
            action.fail(attribute::ATTRIBUTE_SPECIFIED_TWICE, messages::attribute_specified_twice(name))?;
        }
    }
    for required in valid.iter().filter(|v| v.required) {
        if !action.supplied(required.name) {
            action.fail(
                attribute::MISSING_ATTRIBUTE,
                messages::missing_mandatory_attribute(&action.name, required.name),
            )?;
        }
    }

    let mut out = Vec::with_capacity(action.attrs.len() + action.named.len());
    for attr in &action.attrs {
        let rtexprvalue = known(&attr.local_name).is_some_and(|v| v.rtexprvalue);
        out.push(evaluate(ctx, action, attr, rtexprvalue, STRING_TYPE, page_info)?);
    }
    out.extend(action.named.iter().map(|(name, child)| named(name, *child)));
    Ok(out)
}

/// `jsp:element` takes any attribute; `name` is mandatory
fn check_element(
    ctx: &CompilationContext,
    action: &Action<'_>,
    page_info: &PageInfo,
) -> JspResult<Vec<JspAttribute>> {
    if !action.supplied("name") {
        action.fail(attribute::MISSING_ATTRIBUTE, messages::missing_mandatory_name_attribute())?;
    }
    for (name, _) in &action.named {
        if action.text(name).is_some() {
            action.fail(attribute::ATTRIBUTE_SPECIFIED_TWICE, messages::attribute_specified_twice(name))?;
        }
    }
    let mut out = Vec::with_capacity(action.attrs.len() + action.named.len());
    for attr in &action.attrs {
        let expected = if attr.local_name == "name" { STRING_TYPE } else { OBJECT_TYPE };
        out.push(evaluate(ctx, action, attr, true, expected, page_info)?);
    }
    out.extend(action.named.iter().map(|(name, child)| named(name, *child)));
    Ok(out)
}

fn evaluate(
    ctx: &CompilationContext,
    action: &Action<'_>,
    attr: &Attribute,
    rtexprvalue: bool,
    expected: &str,
    page_info: &PageInfo,
) -> JspResult<JspAttribute> {
    let ClassifiedValue { value, el } = classify_value(
        &attr.value,
        page_info,
        page_info.deferred_syntax_allowed_as_literal,
        action.mark(),
        action.err,
    )?;
    let is_expression = !matches!(value, AttributeValue::Literal(_));
    let is_deferred = matches!(value, AttributeValue::El { deferred: true, .. });
    if is_expression && (!rtexprvalue || is_deferred) {
        action.fail(
            attribute::EXPRESSION_NOT_ALLOWED,
            messages::no_expression_allowed_in_action(&attr.qname, &action.name),
        )?;
    }
    let el = match el {
        Some(mut nodes) => {
            functions::resolve(ctx, &mut nodes, page_info, action.mark(), action.err)?;
            Some(nodes)
        }
        None => None,
    };
    Ok(JspAttribute {
        qname: attr.qname.clone(),
        uri: attr.uri.clone(),
        local_name: attr.local_name.clone(),
        value,
        expected_type: Some(expected.to_string()),
        el,
        is_dynamic: false,
    })
}

fn named(name: &str, child: NodeId) -> JspAttribute {
    JspAttribute {
        qname: name.to_string(),
        uri: None,
        local_name: name.to_string(),
        value: AttributeValue::Named(child),
        expected_type: None,
        el: None,
        is_dynamic: false,
    }
}

fn check_params(tree: &Tree, id: NodeId, action: &Action<'_>) -> JspResult<()> {
    let has_param = tree
        .children(id)
        .iter()
        .any(|c| matches!(tree.node(*c).kind, NodeKind::ParamAction));
    if !has_param {
        action.fail(syntax::INVALID_BODY, messages::invalid_empty_jsp_params())?;
    }
    Ok(())
}

fn check_set_property(action: &Action<'_>) -> JspResult<()> {
    let has_param = action.text("param").is_some();
    let has_value = action.supplied("value");
    if action.text("property") == Some("*") {
        if has_param || has_value {
            action.fail(attribute::INVALID_ACTION_USAGE, messages::invalid_set_property())?;
        }
    } else if has_param && has_value {
        action.fail(attribute::INVALID_ACTION_USAGE, messages::invalid_set_property_either_param())?;
    }
    Ok(())
}

fn check_use_bean(
    ctx: &CompilationContext,
    action: &Action<'_>,
    page_info: &mut PageInfo,
) -> JspResult<()> {
    let scope = action.text("scope");
    check_scope(action, scope)?;

    let id = action.text("id").unwrap_or_default();
    let class = action.text("class");
    let type_name = action.text("type");
    let Some(bean_type) = class.or(type_name) else {
        return action.fail(attribute::INVALID_ACTION_USAGE, messages::missing_use_bean_type());
    };
    if !page_info.add_bean(id, bean_type) {
        action.fail(attribute::INVALID_ACTION_USAGE, messages::duplicate_use_bean_name(id))?;
    }
    if scope == Some("session") && !page_info.session {
        action.fail(attribute::INVALID_ACTION_USAGE, messages::session_scope_without_session())?;
    }
    if class.is_some() && action.supplied("beanName") {
        action.fail(attribute::INVALID_ACTION_USAGE, messages::use_bean_class_and_bean_name())?;
    }
    if let Some(class) = class {
        if ctx.options().error_on_use_bean_invalid_class_attribute && !ctx.classes().exists(class) {
            action.fail(attribute::INVALID_ACTION_USAGE, messages::invalid_use_bean_class(class))?;
        }
    }
    Ok(())
}

fn check_plugin(action: &Action<'_>) -> JspResult<()> {
    let Some(plugin_type) = action.text("type") else {
        return action.fail(attribute::MISSING_ATTRIBUTE, messages::missing_plugin_type());
    };
    if plugin_type != "bean" && plugin_type != "applet" {
        action.fail(attribute::INVALID_ACTION_USAGE, messages::bad_plugin_type(plugin_type))?;
    }
    if action.text("code").is_none() {
        action.fail(attribute::MISSING_ATTRIBUTE, messages::missing_plugin_code())?;
    }
    Ok(())
}

fn check_output(
    tree: &Tree,
    id: NodeId,
    action: &Action<'_>,
    page_info: &mut PageInfo,
) -> JspResult<()> {
    let has_body = tree.children(id).iter().any(|c| match &tree.node(*c).kind {
        NodeKind::TemplateText { text } => !text.trim().is_empty(),
        _ => true,
    });
    if has_body {
        action.fail(syntax::INVALID_BODY, messages::jsp_output_body())?;
    }

    let omit = action.text("omit-xml-declaration");
    let root = action.text("doctype-root-element");
    let public = action.text("doctype-public");
    let system = action.text("doctype-system");

    let previous = [
        ("omit-xml-declaration", omit, &page_info.omit_xml_declaration),
        ("doctype-root-element", root, &page_info.doctype_name),
        ("doctype-public", public, &page_info.doctype_public),
        ("doctype-system", system, &page_info.doctype_system),
    ];
    for (name, new, old) in previous {
        if let (Some(new), Some(old)) = (new, old) {
            if new != old.as_str() {
                action.fail(
                    attribute::INVALID_ACTION_USAGE,
                    messages::jsp_output_conflict(name, old, new),
                )?;
            }
        }
    }

    if root.is_some() != system.is_some() {
        action.fail(attribute::INVALID_ACTION_USAGE, messages::jsp_output_doctype())?;
    }
    if public.is_some() && system.is_none() {
        action.fail(attribute::INVALID_ACTION_USAGE, messages::jsp_output_missing_doctype())?;
    }

    let set = |slot: &mut Option<String>, value: Option<&str>| {
        if let Some(value) = value {
            *slot = Some(value.to_string());
        }
    };
    set(&mut page_info.omit_xml_declaration, omit);
    set(&mut page_info.doctype_name, root);
    set(&mut page_info.doctype_public, public);
    set(&mut page_info.doctype_system, system);
    Ok(())
}

/// `jsp:invoke` and `jsp:doBody`
fn check_var(action: &Action<'_>) -> JspResult<()> {
    let scope = action.text("scope");
    check_scope(action, scope)?;
    let var = action.text("var");
    let var_reader = action.text("varReader");
    if scope.is_some() && var.is_none() && var_reader.is_none() {
        action.fail(attribute::MISSING_ATTRIBUTE, messages::missing_var_attribute())?;
    }
    if var.is_some() && var_reader.is_some() {
        action.fail(attribute::INVALID_ACTION_USAGE, messages::both_var_attributes())?;
    }
    Ok(())
}

fn check_scope(action: &Action<'_>, scope: Option<&str>) -> JspResult<()> {
    match scope {
        Some(scope) if !SCOPES.contains(&scope) => {
            action.fail(attribute::INVALID_ACTION_USAGE, messages::invalid_scope(scope))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompilerOptions;
    use crate::context::ClassInfo;
    use crate::parser::ParserController;
    use crate::resources::MemoryResources;
    use crate::validation::{validate, validate_directives};
    use std::sync::Arc;

    fn run_in(ctx: &CompilationContext, path: &str, is_tag_file: bool) -> JspResult<(Tree, PageInfo)> {
        let _ = crate::logging::init_global_logging();
        let mut page_info = PageInfo::new(ctx.options(), is_tag_file);
        let mut err = ErrorDispatcher::new(false);
        let mut tree = ParserController::new(ctx, is_tag_file).parse(path, &mut page_info, &mut err)?;
        validate_directives(ctx, &tree, &mut page_info, &mut err)?;
        validate(ctx, path, &mut tree, &mut page_info, &mut err)?;
        Ok((tree, page_info))
    }

    fn context(source: &str) -> CompilationContext {
        CompilationContext::new(
            CompilerOptions::default(),
            Arc::new(MemoryResources::new().with("/p.jsp", source.to_string())),
        )
        .with_class(ClassInfo::new("app.Cart"))
    }

    fn run(source: &str) -> JspResult<(Tree, PageInfo)> {
        run_in(&context(source), "/p.jsp", false)
    }

    fn attributes_of(tree: &Tree, predicate: impl Fn(&NodeKind) -> bool) -> Vec<JspAttribute> {
        tree.preorder(tree.root())
            .into_iter()
            .find(|id| predicate(&tree.node(*id).kind))
            .map(|id| tree.node(id).jsp_attributes.clone())
            .unwrap_or_default()
    }

    #[test]
    fn test_valid_actions() {
        let sources = [
            "<jsp:include page=\"a.jsp\" flush=\"true\"/>",
            "<jsp:include page=\"${next}\"><jsp:param name=\"x\" value=\"<%= 1 %>\"/></jsp:include>",
            "<jsp:forward page=\"b.jsp\"/>",
            "<jsp:useBean id=\"cart\" class=\"app.Cart\" scope=\"request\"/>",
            "<jsp:useBean id=\"cart\" type=\"app.Cart\" beanName=\"${name}\"/>",
            "<jsp:useBean id=\"cart\" class=\"app.Cart\"/><jsp:setProperty name=\"cart\" property=\"*\"/>",
            "<jsp:useBean id=\"cart\" class=\"app.Cart\"/><jsp:getProperty name=\"cart\" property=\"total\"/>",
            "<jsp:plugin type=\"applet\" code=\"Clock.class\" width=\"${w}\"><jsp:fallback>no</jsp:fallback></jsp:plugin>",
            "<jsp:element name=\"h${level}\" class=\"title\">Hi</jsp:element>",
            "<jsp:output doctype-root-element=\"html\" doctype-system=\"about:legacy-compat\"/>",
        ];
        for source in sources {
            run(source).unwrap_or_else(|e| panic!("{}: {}", source, e));
        }
    }

    #[test]
    fn test_action_errors() {
        let cases = [
            ("<jsp:forward/>", attribute::MISSING_ATTRIBUTE),
            ("<jsp:getProperty name=\"x\" property=\"y\" scope=\"page\"/>", attribute::UNKNOWN_ATTRIBUTE),
            ("<jsp:include page=\"a.jsp\"><jsp:param name=\"${n}\" value=\"v\"/></jsp:include>", attribute::EXPRESSION_NOT_ALLOWED),
            ("<jsp:include page=\"a.jsp\" flush=\"${f}\"/>", attribute::EXPRESSION_NOT_ALLOWED),
            ("<jsp:include page=\"#{p}\"/>", attribute::EXPRESSION_NOT_ALLOWED),
            ("<jsp:setProperty name=\"c\" property=\"*\" value=\"1\"/>", attribute::INVALID_ACTION_USAGE),
            ("<jsp:setProperty name=\"c\" property=\"total\" param=\"t\" value=\"1\"/>", attribute::INVALID_ACTION_USAGE),
            ("<jsp:useBean id=\"c\"/>", attribute::INVALID_ACTION_USAGE),
            ("<jsp:useBean id=\"c\" class=\"app.Cart\"/><jsp:useBean id=\"c\" class=\"app.Cart\"/>", attribute::INVALID_ACTION_USAGE),
            ("<jsp:useBean id=\"c\" class=\"app.Cart\" beanName=\"x\"/>", attribute::INVALID_ACTION_USAGE),
            ("<jsp:useBean id=\"c\" class=\"app.Missing\"/>", attribute::INVALID_ACTION_USAGE),
            ("<jsp:useBean id=\"c\" class=\"app.Cart\" scope=\"galaxy\"/>", attribute::INVALID_ACTION_USAGE),
            ("<%@ page session=\"false\" %><jsp:useBean id=\"c\" class=\"app.Cart\" scope=\"session\"/>", attribute::INVALID_ACTION_USAGE),
            ("<jsp:plugin code=\"C.class\"/>", attribute::MISSING_ATTRIBUTE),
            ("<jsp:plugin type=\"movie\" code=\"C.class\"/>", attribute::INVALID_ACTION_USAGE),
            ("<jsp:plugin type=\"bean\"/>", attribute::MISSING_ATTRIBUTE),
            ("<jsp:element class=\"x\"/>", attribute::MISSING_ATTRIBUTE),
            ("<jsp:output doctype-root-element=\"html\"/>", attribute::INVALID_ACTION_USAGE),
            ("<jsp:output doctype-public=\"-//W3C//DTD\"/>", attribute::INVALID_ACTION_USAGE),
            ("<jsp:output omit-xml-declaration=\"yes\"/><jsp:output omit-xml-declaration=\"no\"/>", attribute::INVALID_ACTION_USAGE),
        ];
        for (source, code) in cases {
            let error = run(source).unwrap_err();
            assert_eq!(error.error_code(), code, "{}", source);
        }
    }

    #[test]
    fn test_plain_and_named_attribute_are_exclusive() {
        let both = "<jsp:include page=\"a.jsp\"><jsp:attribute name=\"page\">b.jsp</jsp:attribute></jsp:include>";
        let error = run(both).unwrap_err();
        assert_eq!(error.error_code(), attribute::ATTRIBUTE_SPECIFIED_TWICE);

        let (tree, _) = run("<jsp:include page=\"a.jsp\"/>").unwrap();
        let attrs = attributes_of(&tree, |k| matches!(k, NodeKind::IncludeAction));
        assert!(matches!(attrs[0].value, AttributeValue::Literal(ref v) if v == "a.jsp"));

        let (tree, _) =
            run("<jsp:include><jsp:attribute name=\"page\">b.jsp</jsp:attribute></jsp:include>").unwrap();
        let attrs = attributes_of(&tree, |k| matches!(k, NodeKind::IncludeAction));
        assert_eq!(attrs.len(), 1);
        assert!(matches!(attrs[0].value, AttributeValue::Named(_)));
    }

    #[test]
    fn test_attribute_values_are_classified() {
        let (tree, page_info) =
            run("<jsp:useBean id=\"cart\" class=\"app.Cart\"/><jsp:include page=\"${base}/x.jsp\" flush=\"true\"/>")
                .unwrap();
        assert_eq!(page_info.bean_type("cart"), Some("app.Cart"));
        let attrs = attributes_of(&tree, |k| matches!(k, NodeKind::IncludeAction));
        let page = attrs.iter().find(|a| a.local_name == "page").unwrap();
        assert!(page.is_expression());
        assert!(page.el.is_some());
        let flush = attrs.iter().find(|a| a.local_name == "flush").unwrap();
        assert!(flush.is_literal());
    }

    #[test]
    fn test_output_values_reach_page_info() {
        let (_, page_info) = run(
            "<jsp:output omit-xml-declaration=\"yes\"/><jsp:output omit-xml-declaration=\"yes\" doctype-root-element=\"html\" doctype-system=\"s.dtd\"/>",
        )
        .unwrap();
        assert_eq!(page_info.omit_xml_declaration.as_deref(), Some("yes"));
        assert_eq!(page_info.doctype_name.as_deref(), Some("html"));
        assert_eq!(page_info.doctype_system.as_deref(), Some("s.dtd"));
    }

    #[test]
    fn test_invoke_and_do_body_in_tag_files() {
        let cases = [
            ("<%@ attribute name=\"f\" fragment=\"true\" %><jsp:invoke fragment=\"f\" var=\"out\"/>", None),
            ("<jsp:doBody varReader=\"r\" scope=\"request\"/>", None),
            ("<jsp:doBody scope=\"request\"/>", Some(attribute::MISSING_ATTRIBUTE)),
            ("<jsp:doBody var=\"a\" varReader=\"b\"/>", Some(attribute::INVALID_ACTION_USAGE)),
            ("<jsp:doBody var=\"a\" scope=\"cosmos\"/>", Some(attribute::INVALID_ACTION_USAGE)),
            ("<jsp:invoke var=\"a\"/>", Some(attribute::MISSING_ATTRIBUTE)),
        ];
        for (source, expected) in cases {
            let ctx = CompilationContext::new(
                CompilerOptions::default(),
                Arc::new(MemoryResources::new().with("/WEB-INF/tags/t.tag", source.to_string())),
            );
            let result = run_in(&ctx, "/WEB-INF/tags/t.tag", true);
            match expected {
                None => assert!(result.is_ok(), "{}: {:?}", source, result.err()),
                Some(code) => assert_eq!(result.unwrap_err().error_code(), code, "{}", source),
            }
        }
    }
}
