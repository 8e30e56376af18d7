use super::ParserController;
use crate::config::CompilerOptions;
use crate::context::{ClassInfo, CompilationContext};
use crate::errors::{ErrorDispatcher, JspResult};
use crate::logging::codes::{lexical, resolution, resources, syntax};
use crate::nodes::{NodeKind, Tree};
use crate::page_info::PageInfo;
use crate::resources::MemoryResources;
use crate::taglib::descriptor::{TagDescriptor, TagLibraryDescriptor};
use std::sync::Arc;

fn nesting_library() -> TagLibraryDescriptor {
    let tag = |name: &str, body: &str| TagDescriptor {
        name: name.to_string(),
        tag_class: format!("nest.{}Tag", name),
        body_content: Some(body.to_string()),
        ..Default::default()
    };
    TagLibraryDescriptor {
        uri: Some("http://example.com/nest".to_string()),
        tlib_version: Some("1.0".to_string()),
        jsp_version: Some("2.1".to_string()),
        short_name: Some("nest".to_string()),
        tags: vec![tag("quiet", "scriptless"), tag("open", "JSP")],
        ..Default::default()
    }
}

fn context(files: &[(&str, &str)], options: CompilerOptions) -> CompilationContext {
    let resources = files
        .iter()
        .fold(MemoryResources::new(), |resources, (path, content)| {
            resources.with(path, content.to_string())
        });
    CompilationContext::new(options, Arc::new(resources))
        .with_descriptor(nesting_library())
        .with_class(ClassInfo::new("nest.quietTag"))
        .with_class(ClassInfo::new("nest.openTag"))
}

/// Parse `/p.jsp` out of `files`
fn parse_files(files: &[(&str, &str)], options: CompilerOptions) -> JspResult<Tree> {
    let _ = crate::logging::init_global_logging();
    let ctx = context(files, options);
    let mut page_info = PageInfo::new(ctx.options(), false);
    let mut err = ErrorDispatcher::new(false);
    ParserController::new(&ctx, false).parse("/p.jsp", &mut page_info, &mut err)
}

fn parse_with(source: &str, options: CompilerOptions) -> JspResult<Tree> {
    parse_files(&[("/p.jsp", source)], options)
}

fn parse(source: &str) -> JspResult<Tree> {
    parse_with(source, CompilerOptions::default())
}

fn top_level(tree: &Tree) -> Vec<&NodeKind> {
    tree.children(tree.root())
        .iter()
        .map(|id| &tree.node(*id).kind)
        .collect()
}

/// Reassemble the source of text and comment nodes
fn reassemble(tree: &Tree) -> String {
    tree.children(tree.root())
        .iter()
        .map(|id| match &tree.node(*id).kind {
            NodeKind::TemplateText { text } => text.clone(),
            NodeKind::Comment { text } => format!("<%--{}--%>", text),
            other => panic!("unexpected node {:?}", other),
        })
        .collect()
}

#[test]
fn test_text_and_comments_round_trip() {
    let sources = [
        "plain text",
        "<html>\n  <body class=\"x\">hi</body>\n</html>\n",
        "<%-- note --%>",
        "a<%-- one --%>b<%----%>c",
        "<p>5 < 6 & 7 > 3</p><%-- <b>not markup</b> --%>\n",
    ];
    for source in sources {
        let tree = parse(source).unwrap();
        assert_eq!(reassemble(&tree), source, "source {:?}", source);
    }
}

#[test]
fn test_text_breaks_before_markup_and_expressions() {
    let tree = parse("a<b>c${x}d").unwrap();
    let kinds = top_level(&tree);
    assert!(matches!(kinds[0], NodeKind::TemplateText { text } if text == "a"));
    assert!(matches!(kinds[1], NodeKind::TemplateText { text } if text == "<b>c"));
    assert!(matches!(kinds[2], NodeKind::ElExpression { .. }));
    assert!(matches!(kinds[3], NodeKind::TemplateText { text } if text == "d"));
    assert_eq!(kinds.len(), 4);
}

#[test]
fn test_escapes_in_template_text() {
    let tree = parse("cost \\${price} <\\% not code %>").unwrap();
    let text: String = tree
        .children(tree.root())
        .iter()
        .filter_map(|id| tree.node(*id).text().map(str::to_string))
        .collect();
    assert_eq!(text, "cost ${price} <% not code %>");
    assert!(top_level(&tree)
        .iter()
        .all(|kind| matches!(kind, NodeKind::TemplateText { .. })));
}

#[test]
fn test_scripting_elements() {
    let tree = parse("<%! int n; %><% n++; %><%= n %>").unwrap();
    let kinds = top_level(&tree);
    assert!(matches!(kinds[0], NodeKind::Declaration { text } if text == " int n; "));
    assert!(matches!(kinds[1], NodeKind::Scriptlet { text } if text == " n++; "));
    assert!(matches!(kinds[2], NodeKind::Expression { text } if text == " n "));
}

#[test]
fn test_scriptless_body_rejects_scripting() {
    let source = "<%@ taglib prefix=\"n\" uri=\"http://example.com/nest\" %>\
                  <n:quiet><% x(); %></n:quiet>";
    let error = parse(source).unwrap_err();
    assert_eq!(error.error_code(), syntax::SCRIPTING_NOT_ALLOWED);
}

#[test]
fn test_scriptless_propagates_through_jsp_bodies() {
    let nested = [
        "<n:quiet><n:open><% x(); %></n:open></n:quiet>",
        "<n:quiet><n:open><n:open><%= y %></n:open></n:open></n:quiet>",
        "<n:quiet><n:open><jsp:element name=\"p\"><%! int z; %></jsp:element></n:open></n:quiet>",
    ];
    for body in nested {
        let source = format!(
            "<%@ taglib prefix=\"n\" uri=\"http://example.com/nest\" %>{}",
            body
        );
        let error = parse(&source).unwrap_err();
        assert_eq!(error.error_code(), syntax::SCRIPTING_NOT_ALLOWED, "body {}", body);
    }
}

#[test]
fn test_jsp_body_outside_scriptless_allows_scripting() {
    let source = "<%@ taglib prefix=\"n\" uri=\"http://example.com/nest\" %>\
                  <n:quiet>${a}</n:quiet><n:open><% x(); %></n:open>";
    let tree = parse(source).unwrap();
    assert!(tree
        .preorder(tree.root())
        .iter()
        .any(|id| matches!(tree.node(*id).kind, NodeKind::Scriptlet { .. })));
}

#[test]
fn test_every_scriptless_violation_is_reported() {
    let source = "<%@ taglib prefix=\"n\" uri=\"http://example.com/nest\" %>\
                  <n:quiet><% a(); %>text<% b(); %></n:quiet>";
    match parse(source).unwrap_err() {
        crate::errors::JspError::Multiple { errors } => {
            assert_eq!(errors.len(), 2);
            assert!(errors
                .iter()
                .all(|e| e.error_code() == syntax::SCRIPTING_NOT_ALLOWED));
        }
        other => panic!("expected two findings, got {:?}", other),
    }
}

#[test]
fn test_unbound_prefix_is_text_by_default() {
    let tree = parse("<foo:bar/>").unwrap();
    let kinds = top_level(&tree);
    assert_eq!(kinds.len(), 1);
    assert!(matches!(kinds[0], NodeKind::TemplateText { text } if text == "<foo:bar/>"));
}

#[test]
fn test_unbound_prefix_is_an_error_when_strict() {
    let options = CompilerOptions {
        error_on_undeclared_namespace: true,
        ..CompilerOptions::default()
    };
    let error = parse_with("<foo:bar/>", options).unwrap_err();
    assert_eq!(error.error_code(), resolution::UNBOUND_PREFIX);
    assert_eq!(error.mark().map(|m| (m.line(), m.column())), Some((1, 1)));
    let message = error.message();
    assert!(message.contains("not bound"), "{}", message);
    assert!(message.contains("foo:bar"), "{}", message);
}

#[test]
fn test_prefix_used_as_text_cannot_be_bound_later() {
    let error = parse("<foo:bar/>\n<%@ taglib prefix=\"foo\" uri=\"http://example.com/nest\" %>")
        .unwrap_err();
    assert_eq!(error.error_code(), resolution::PREFIX_IN_USE);
    assert_eq!(error.mark().map(|m| (m.line(), m.column())), Some((2, 1)));
}

#[test]
fn test_prefix_cannot_be_rebound_to_another_library() {
    let source = "<%@ taglib prefix=\"n\" uri=\"http://example.com/nest\" %>\n\
                  <%@ taglib prefix=\"n\" uri=\"http://example.com/other\" %>";
    let error = parse(source).unwrap_err();
    assert_eq!(error.error_code(), resolution::PREFIX_REDEFINED);
    assert_eq!(error.mark().map(|m| (m.line(), m.column())), Some((2, 1)));
    assert!(error.message().contains("http://example.com/other"));

    let same = "<%@ taglib prefix=\"n\" uri=\"http://example.com/nest\" %>\
                <%@ taglib prefix=\"n\" uri=\"http://example.com/nest\" %>";
    assert!(parse(same).is_ok());
}

#[test]
fn test_include_cycles_are_rejected() {
    let direct = parse_files(
        &[("/p.jsp", "a<%@ include file=\"p.jsp\" %>")],
        CompilerOptions::default(),
    )
    .unwrap_err();
    assert_eq!(direct.error_code(), resources::INCLUDE_CYCLE);

    let indirect = parse_files(
        &[
            ("/p.jsp", "<%@ include file=\"q.jsp\" %>"),
            ("/q.jsp", "q<%@ include file=\"p.jsp\" %>"),
        ],
        CompilerOptions::default(),
    )
    .unwrap_err();
    assert_eq!(indirect.error_code(), resources::INCLUDE_CYCLE);
    assert!(indirect.message().contains("/p.jsp"));
    assert_eq!(indirect.mark().map(|m| m.file().to_string()).as_deref(), Some("/q.jsp"));
}

#[test]
fn test_diamond_includes_are_not_cycles() {
    let tree = parse_files(
        &[
            ("/p.jsp", "<%@ include file=\"a.jspf\" %><%@ include file=\"b.jspf\" %>"),
            ("/a.jspf", "<%@ include file=\"shared.jspf\" %>"),
            ("/b.jspf", "<%@ include file=\"shared.jspf\" %>"),
            ("/shared.jspf", "shared"),
        ],
        CompilerOptions::default(),
    )
    .unwrap();
    let roots = tree
        .preorder(tree.root())
        .into_iter()
        .filter(|id| matches!(tree.node(*id).kind, NodeKind::Root(_)))
        .count();
    assert_eq!(roots, 5);
}

#[test]
fn test_misplaced_and_unknown_actions() {
    let cases = [
        ("<jsp:param name=\"a\" value=\"b\"/>", syntax::MISPLACED_ACTION),
        ("<jsp:body>x</jsp:body>", syntax::MISPLACED_ACTION),
        ("<jsp:fallback>x</jsp:fallback>", syntax::MISPLACED_ACTION),
        ("<jsp:element name=\"a\"><jsp:output/></jsp:element>", syntax::MISPLACED_ACTION),
        ("<jsp:frobnicate/>", syntax::INVALID_STANDARD_ACTION),
        ("<jsp:invoke fragment=\"f\"/>", syntax::DIRECTIVE_NOT_ALLOWED),
        ("<jsp:doBody/>", syntax::DIRECTIVE_NOT_ALLOWED),
    ];
    for (source, code) in cases {
        let error = parse(source).unwrap_err();
        assert_eq!(error.error_code(), code, "source {}", source);
    }
}

#[test]
fn test_unterminated_constructs() {
    for source in ["<%-- open", "<% x();", "<%= y", "<%! int z;"] {
        let error = parse(source).unwrap_err();
        assert_eq!(error.error_code(), lexical::UNTERMINATED_CONSTRUCT, "source {}", source);
    }
}

#[test]
fn test_unbalanced_end_tags() {
    assert_eq!(
        parse("</jsp:include>").unwrap_err().error_code(),
        syntax::UNBALANCED_END_TAG
    );
    let source = "<%@ taglib prefix=\"n\" uri=\"http://example.com/nest\" %></n:open>";
    assert_eq!(parse(source).unwrap_err().error_code(), syntax::UNBALANCED_END_TAG);
    // end tags of unbound prefixes are plain text
    assert!(parse("</x:y>").is_ok());
}

#[test]
fn test_error_marks_point_at_the_construct() {
    let error = parse("line one\n  <jsp:frobnicate/>").unwrap_err();
    let mark = error.mark().unwrap();
    assert_eq!(mark.file(), "/p.jsp");
    assert_eq!(mark.line(), 2);
}
