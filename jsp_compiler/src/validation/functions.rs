//! EL function resolution
//!
//! A call `p:f(..)` is bound through the page's prefix map to a tag
//! library, then to the library's function entry, whose signature names the
//! class and method that implement it.

use crate::context::{CompilationContext, MethodLookup};
use crate::el::{ElNodes, FunctionCall, ResolvedFunction};
use crate::errors::{messages, ErrorDispatcher, JspResult};
use crate::logging::codes::resolution;
use crate::page_info::PageInfo;
use crate::taglib::FunctionInfo;
use crate::utils::Mark;

const PRIMITIVES: &[&str] = &[
    "boolean", "byte", "char", "short", "int", "long", "float", "double", "void",
];

/// A function signature split into its parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub return_type: String,
    pub method_name: String,
    pub parameters: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureError {
    MissingParen,
    Malformed,
}

/// Parse `ReturnType name(ParamType, ...)`
pub fn parse_signature(signature: &str) -> Result<Signature, SignatureError> {
    let signature = signature.trim();
    let open = signature.find('(').ok_or(SignatureError::MissingParen)?;
    let close = signature.rfind(')').ok_or(SignatureError::Malformed)?;
    if close < open || !signature[close + 1..].trim().is_empty() {
        return Err(SignatureError::Malformed);
    }

    let mut head = signature[..open].split_whitespace();
    let (Some(return_type), Some(method_name), None) = (head.next(), head.next(), head.next()) else {
        return Err(SignatureError::Malformed);
    };

    let params = signature[open + 1..close].trim();
    let parameters = if params.is_empty() {
        Vec::new()
    } else {
        params
            .split(',')
            .map(|p| {
                let p = p.trim();
                if p.is_empty() || p.contains(char::is_whitespace) {
                    Err(SignatureError::Malformed)
                } else {
                    Ok(p.to_string())
                }
            })
            .collect::<Result<Vec<_>, _>>()?
    };

    Ok(Signature {
        return_type: return_type.to_string(),
        method_name: method_name.to_string(),
        parameters,
    })
}

/// Resolve every function call in `nodes`, innermost arguments included
pub fn resolve(
    ctx: &CompilationContext,
    nodes: &mut ElNodes,
    page_info: &PageInfo,
    mark: Option<&Mark>,
    err: &ErrorDispatcher,
) -> JspResult<()> {
    let resolved = nodes
        .functions()
        .into_iter()
        .map(|call| resolve_call(ctx, call, page_info, mark, err))
        .collect::<JspResult<Vec<_>>>()?;

    let mut targets = resolved.into_iter();
    nodes.for_each_function_mut(&mut |call| call.resolved = targets.next());
    Ok(())
}

fn resolve_call(
    ctx: &CompilationContext,
    call: &FunctionCall,
    page_info: &PageInfo,
    mark: Option<&Mark>,
    err: &ErrorDispatcher,
) -> JspResult<ResolvedFunction> {
    let qualified = call.qualified_name();
    let Some(prefix) = call.prefix.as_deref() else {
        return err.fail(
            resolution::MISSING_FUNCTION_PREFIX,
            mark,
            messages::missing_function_prefix(&qualified),
        );
    };
    let Some((uri, library)) = page_info
        .uri_for_prefix(prefix)
        .and_then(|uri| page_info.taglib(uri).map(|library| (uri, library)))
    else {
        return err.fail(
            resolution::UNBOUND_PREFIX,
            mark,
            messages::unknown_function_prefix(prefix),
        );
    };
    let Some(function) = library.function(&call.name) else {
        return err.fail(
            resolution::UNKNOWN_FUNCTION,
            mark,
            messages::unknown_function(&qualified),
        );
    };

    let signature = parse_signature(&function.function_signature).map_err(|e| {
        let message = match e {
            SignatureError::MissingParen => {
                messages::invalid_function_signature_missing_paren(prefix, &call.name)
            }
            SignatureError::Malformed => messages::invalid_function_signature(prefix, &call.name),
        };
        err.error(resolution::INVALID_FUNCTION_SIGNATURE, mark, message)
    })?;

    check_classes(ctx, function, &signature, &qualified, mark, err)?;

    match ctx.classes().find_method(
        &function.function_class,
        &signature.method_name,
        &signature.parameters,
    ) {
        MethodLookup::Found => {}
        MethodLookup::ClassMissing => {
            return err.fail(
                resolution::FUNCTION_CLASS_NOT_FOUND,
                mark,
                messages::missing_function_class(&function.function_class, &qualified),
            )
        }
        MethodLookup::MethodMissing => {
            return err.fail(
                resolution::FUNCTION_METHOD_NOT_FOUND,
                mark,
                messages::missing_method_in_class(
                    &signature.method_name,
                    &qualified,
                    &function.function_class,
                ),
            )
        }
    }

    if call.args.len() != signature.parameters.len() {
        return err.fail(
            resolution::FUNCTION_METHOD_NOT_FOUND,
            mark,
            messages::function_arity_mismatch(&qualified, signature.parameters.len(), call.args.len()),
        );
    }

    Ok(ResolvedFunction {
        uri: uri.to_string(),
        class_name: function.function_class.clone(),
        method_name: signature.method_name,
        parameters: signature.parameters,
        return_type: signature.return_type,
    })
}

fn check_classes(
    ctx: &CompilationContext,
    function: &FunctionInfo,
    signature: &Signature,
    qualified: &str,
    mark: Option<&Mark>,
    err: &ErrorDispatcher,
) -> JspResult<()> {
    if !ctx.classes().exists(&function.function_class) {
        return err.fail(
            resolution::FUNCTION_CLASS_NOT_FOUND,
            mark,
            messages::missing_function_class(&function.function_class, qualified),
        );
    }
    let types = signature
        .parameters
        .iter()
        .chain(std::iter::once(&signature.return_type));
    for type_name in types {
        if !is_loadable(ctx, type_name) {
            return err.fail(
                resolution::FUNCTION_CLASS_NOT_FOUND,
                mark,
                messages::missing_signature_class(type_name, qualified),
            );
        }
    }
    Ok(())
}

/// Primitives and platform classes always load
pub(crate) fn is_loadable(ctx: &CompilationContext, type_name: &str) -> bool {
    let base = type_name.trim_end_matches("[]");
    PRIMITIVES.contains(&base)
        || base.starts_with("java.")
        || base.starts_with("javax.")
        || ctx.classes().exists(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompilerOptions;
    use crate::context::{ClassInfo, MethodInfo};
    use crate::el::ElNode;
    use crate::logging::codes::expression;
    use crate::nodes::{NodeKind, Tree};
    use crate::parser::ParserController;
    use crate::resources::MemoryResources;
    use crate::taglib::descriptor::{FunctionDescriptor, TagLibraryDescriptor};
    use crate::validation;
    use assert_matches::assert_matches;
    use std::sync::Arc;

    #[test]
    fn test_parse_signature() {
        let parsed = parse_signature(" java.lang.String upper( java.lang.String , int ) ").unwrap();
        assert_eq!(parsed.return_type, "java.lang.String");
        assert_eq!(parsed.method_name, "upper");
        assert_eq!(parsed.parameters, vec!["java.lang.String", "int"]);

        assert!(parse_signature("void reset()").unwrap().parameters.is_empty());
        assert_eq!(parse_signature("int size"), Err(SignatureError::MissingParen));
        assert_eq!(parse_signature("size(int)"), Err(SignatureError::Malformed));
        assert_eq!(parse_signature("int size(int,)"), Err(SignatureError::Malformed));
    }

    fn descriptor(signature: &str) -> TagLibraryDescriptor {
        TagLibraryDescriptor {
            uri: Some("http://example.com/fn".to_string()),
            tlib_version: Some("1.0".to_string()),
            jsp_version: Some("2.1".to_string()),
            short_name: Some("fn".to_string()),
            functions: vec![FunctionDescriptor {
                name: "upper".to_string(),
                function_class: "util.Text".to_string(),
                function_signature: signature.to_string(),
            }],
            ..Default::default()
        }
    }

    fn text_class() -> ClassInfo {
        ClassInfo::new("util.Text")
            .with_method(MethodInfo::new("upper", &["java.lang.String"], "java.lang.String"))
    }

    fn run(ctx: &CompilationContext) -> JspResult<Tree> {
        let _ = crate::logging::init_global_logging();
        let mut page_info = PageInfo::new(ctx.options(), false);
        let mut err = ErrorDispatcher::new(false);
        let mut tree = ParserController::new(ctx, false).parse("/p.jsp", &mut page_info, &mut err)?;
        validation::validate_directives(ctx, &tree, &mut page_info, &mut err)?;
        validation::validate(ctx, "/p.jsp", &mut tree, &mut page_info, &mut err)?;
        Ok(tree)
    }

    fn context(signature: &str, body: &str) -> CompilationContext {
        let source = format!("<%@ taglib prefix=\"f\" uri=\"http://example.com/fn\" %>{}", body);
        CompilationContext::new(
            CompilerOptions::default(),
            Arc::new(MemoryResources::new().with("/p.jsp", source)),
        )
        .with_descriptor(descriptor(signature))
        .with_class(text_class())
    }

    fn resolved(tree: &Tree) -> Vec<ResolvedFunction> {
        let mut out = Vec::new();
        for id in tree.preorder(tree.root()) {
            if let NodeKind::ElExpression { el: Some(nodes), .. } = &tree.node(id).kind {
                for node in nodes.iter() {
                    if let ElNode::Expression { expr, .. } = node {
                        expr.for_each_function(&mut |call| {
                            out.extend(call.resolved.clone());
                        });
                    }
                }
            }
        }
        out
    }

    #[test]
    fn test_function_resolves_to_method() {
        let body = "${f:upper(f:upper(name))}";
        let ctx = context("java.lang.String upper(java.lang.String)", body);
        let tree = run(&ctx).unwrap();
        let targets = resolved(&tree);
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].uri, "http://example.com/fn");
        assert_eq!(targets[0].class_name, "util.Text");
        assert_eq!(targets[0].method_name, "upper");
        assert_eq!(targets[0].return_type, "java.lang.String");
    }

    #[test]
    fn test_resolution_failures() {
        let signature = "java.lang.String upper(java.lang.String)";
        let cases = [
            ("${upper(name)}", resolution::MISSING_FUNCTION_PREFIX),
            ("${g:upper(name)}", resolution::UNBOUND_PREFIX),
            ("${f:lower(name)}", resolution::UNKNOWN_FUNCTION),
            ("${f:upper(a, b)}", resolution::FUNCTION_METHOD_NOT_FOUND),
        ];
        for (body, code) in cases {
            let ctx = context(signature, body);
            let error = run(&ctx).unwrap_err();
            assert_eq!(error.error_code(), code, "{}", body);
        }
    }

    #[test]
    fn test_bad_signatures() {
        let cases = [
            ("java.lang.String upper", resolution::INVALID_FUNCTION_SIGNATURE),
            ("java.lang.String upper(util.Missing)", resolution::FUNCTION_CLASS_NOT_FOUND),
            ("java.lang.String upper(int)", resolution::FUNCTION_METHOD_NOT_FOUND),
        ];
        for (signature, code) in cases {
            let ctx = context(signature, "${f:upper(x)}");
            let error = run(&ctx).unwrap_err();
            assert_eq!(error.error_code(), code, "{}", signature);
            assert_ne!(error.error_code(), expression::EL_SYNTAX);
        }
    }

    #[test]
    fn test_missing_message_names_the_method() {
        let ctx = context("java.lang.String upper(int)", "${f:upper(x)}");
        let error = run(&ctx).unwrap_err();
        assert_matches!(error.message(), ref m if m.contains("upper") && m.contains("util.Text"));
    }
}
