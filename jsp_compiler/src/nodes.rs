//! Node tree for one compiled unit
//!
//! Nodes live in an arena owned by [`Tree`] and refer to each other by
//! [`NodeId`]. The builder keeps every parent index and child list in step;
//! traversal is external through [`Tree::walk`] and [`Tree::preorder`].

use crate::el::ElNodes;
use crate::taglib::extra::{TagData, VariableInfo};
use crate::taglib::{TagFileInfo, TagInfo};
use crate::tagfile::HandlerRef;
use crate::utils::Mark;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// An attribute exactly as written in the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub qname: String,
    pub local_name: String,
    pub uri: Option<String>,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(Vec<Attribute>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, attribute: Attribute) {
        self.0.push(attribute);
    }

    /// Convenience for literal, un-namespaced attributes
    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.push(Attribute {
            qname: name.to_string(),
            local_name: name.to_string(),
            uri: None,
            value: value.to_string(),
        });
        self
    }

    pub fn get(&self, qname: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|a| a.qname == qname)
            .map(|a| a.value.as_str())
    }

    pub fn contains(&self, qname: &str) -> bool {
        self.0.iter().any(|a| a.qname == qname)
    }

    pub fn get_mut(&mut self, qname: &str) -> Option<&mut Attribute> {
        self.0.iter_mut().find(|a| a.qname == qname)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Attribute> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a Attributes {
    type Item = &'a Attribute;
    type IntoIter = std::slice::Iter<'a, Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// How an action attribute's value is supplied after validation
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Literal(String),
    /// `<%= expr %>`, stored without the delimiters
    Scripting(String),
    /// Value containing `${}` or `#{}` spans
    El { text: String, deferred: bool },
    /// Supplied by a nested `jsp:attribute`
    Named(NodeId),
}

/// A validated attribute of a standard action or custom tag
#[derive(Debug, Clone, PartialEq)]
pub struct JspAttribute {
    pub qname: String,
    pub uri: Option<String>,
    pub local_name: String,
    pub value: AttributeValue,
    pub expected_type: Option<String>,
    pub el: Option<ElNodes>,
    pub is_dynamic: bool,
}

impl JspAttribute {
    pub fn is_literal(&self) -> bool {
        matches!(self.value, AttributeValue::Literal(_))
    }

    pub fn is_expression(&self) -> bool {
        matches!(
            self.value,
            AttributeValue::Scripting(_) | AttributeValue::El { .. }
        )
    }
}

/// Per-file facts recorded on a root node
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RootData {
    pub page_encoding: String,
    pub config_encoding: Option<String>,
    pub is_default_page_encoding: bool,
    pub is_bom_present: bool,
    pub is_xml_syntax: bool,
    pub is_included: bool,
    pub is_tag_file: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamedAttributeData {
    pub name: String,
    pub prefix: Option<String>,
    pub local_name: String,
    pub trim: bool,
    pub omit: Option<String>,
    pub temporary_variable_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CustomTagData {
    pub qname: String,
    pub prefix: String,
    pub local_name: String,
    pub uri: String,
    pub tag_info: Arc<TagInfo>,
    pub tag_file: Option<Arc<TagFileInfo>>,
    /// Handler reference, filled in when tag files are loaded
    pub handler: Option<HandlerRef>,
    pub implements_simple_tag: bool,
    pub implements_dynamic_attributes: bool,
    pub tag_data: Option<TagData>,
    pub variable_infos: Vec<VariableInfo>,
    /// Plugin output placed before the body
    pub at_stag: Vec<NodeId>,
    /// Plugin output placed after the body
    pub at_etag: Vec<NodeId>,
    pub use_tag_plugin: bool,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Root(RootData),

    PageDirective { imports: Vec<String> },
    TagDirective { imports: Vec<String> },
    IncludeDirective,
    TaglibDirective,
    AttributeDirective,
    VariableDirective,

    Comment { text: String },
    Declaration { text: String },
    Scriptlet { text: String },
    Expression { text: String },
    ElExpression { delimiter: char, text: String, el: Option<ElNodes> },
    TemplateText { text: String },

    IncludeAction,
    ForwardAction,
    ParamAction,
    ParamsAction,
    UseBean,
    SetProperty,
    GetProperty,
    PlugIn,
    FallBack,
    InvokeAction,
    DoBodyAction,
    JspElement,
    JspBody,
    NamedAttribute(NamedAttributeData),
    JspOutput,

    CustomTag(Box<CustomTagData>),

    /// Placeholder a tag plugin uses to emit an attribute's value
    AttributeGenerator { name: String, tag: NodeId },
    /// Source fragment produced by a tag plugin
    GeneratedCode { text: String },
}

impl NodeKind {
    /// Name used in diagnostics
    pub fn name(&self) -> &str {
        match self {
            Self::Root(_) => "root",
            Self::PageDirective { .. } => "page directive",
            Self::TagDirective { .. } => "tag directive",
            Self::IncludeDirective => "include directive",
            Self::TaglibDirective => "taglib directive",
            Self::AttributeDirective => "attribute directive",
            Self::VariableDirective => "variable directive",
            Self::Comment { .. } => "comment",
            Self::Declaration { .. } => "declaration",
            Self::Scriptlet { .. } => "scriptlet",
            Self::Expression { .. } => "expression",
            Self::ElExpression { .. } => "EL expression",
            Self::TemplateText { .. } => "template text",
            Self::IncludeAction => "jsp:include",
            Self::ForwardAction => "jsp:forward",
            Self::ParamAction => "jsp:param",
            Self::ParamsAction => "jsp:params",
            Self::UseBean => "jsp:useBean",
            Self::SetProperty => "jsp:setProperty",
            Self::GetProperty => "jsp:getProperty",
            Self::PlugIn => "jsp:plugin",
            Self::FallBack => "jsp:fallback",
            Self::InvokeAction => "jsp:invoke",
            Self::DoBodyAction => "jsp:doBody",
            Self::JspElement => "jsp:element",
            Self::JspBody => "jsp:body",
            Self::NamedAttribute(_) => "jsp:attribute",
            Self::JspOutput => "jsp:output",
            Self::CustomTag(tag) => &tag.qname,
            Self::AttributeGenerator { .. } => "attribute generator",
            Self::GeneratedCode { .. } => "generated code",
        }
    }

    pub fn is_scripting(&self) -> bool {
        matches!(
            self,
            Self::Declaration { .. } | Self::Scriptlet { .. } | Self::Expression { .. }
        )
    }

    pub fn is_directive(&self) -> bool {
        matches!(
            self,
            Self::PageDirective { .. }
                | Self::TagDirective { .. }
                | Self::IncludeDirective
                | Self::TaglibDirective
                | Self::AttributeDirective
                | Self::VariableDirective
        )
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    /// Absent only for nodes synthesised by tag plugins
    pub start: Option<Mark>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    pub attrs: Attributes,
    pub jsp_attributes: Vec<JspAttribute>,
    /// Generated-source line range, filled in by the code generator
    pub begin_java_line: u32,
    pub end_java_line: u32,
}

impl Node {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn mark(&self) -> Option<&Mark> {
        self.start.as_ref()
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name)
    }

    pub fn custom_tag(&self) -> Option<&CustomTagData> {
        match &self.kind {
            NodeKind::CustomTag(data) => Some(data),
            _ => None,
        }
    }

    pub fn custom_tag_mut(&mut self) -> Option<&mut CustomTagData> {
        match &mut self.kind {
            NodeKind::CustomTag(data) => Some(data),
            _ => None,
        }
    }

    /// Literal text carried by text-like nodes
    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Comment { text }
            | NodeKind::Declaration { text }
            | NodeKind::Scriptlet { text }
            | NodeKind::Expression { text }
            | NodeKind::ElExpression { text, .. }
            | NodeKind::TemplateText { text }
            | NodeKind::GeneratedCode { text } => Some(text),
            _ => None,
        }
    }

    pub fn contains_java_line(&self, line: u32) -> bool {
        self.begin_java_line <= line && line < self.end_java_line
    }
}

/// Arena holding every node of one compiled unit
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Tree {
    pub fn new(root: RootData, start: Mark) -> Self {
        let node = Node {
            kind: NodeKind::Root(root),
            start: Some(start),
            parent: None,
            children: Vec::new(),
            attrs: Attributes::new(),
            jsp_attributes: Vec::new(),
            begin_java_line: 0,
            end_java_line: 0,
        };
        Self {
            nodes: vec![node],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn root_data(&self) -> Option<&RootData> {
        match &self.node(self.root).kind {
            NodeKind::Root(data) => Some(data),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Append a new node as the last child of `parent`
    pub fn add(
        &mut self,
        parent: NodeId,
        kind: NodeKind,
        start: Mark,
        attrs: Attributes,
    ) -> NodeId {
        let id = self.add_detached(kind, Some(start), attrs);
        self.attach(parent, id);
        id
    }

    /// Create a node outside the tree, to be attached later
    pub fn add_detached(&mut self, kind: NodeKind, start: Option<Mark>, attrs: Attributes) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            start,
            parent: None,
            children: Vec::new(),
            attrs,
            jsp_attributes: Vec::new(),
            begin_java_line: 0,
            end_java_line: 0,
        });
        id
    }

    /// Make a detached node the last child of `parent`.
    /// A node that already has a parent is moved.
    pub fn attach(&mut self, parent: NodeId, child: NodeId) {
        if let Some(old) = self.nodes[child.0].parent.take() {
            self.nodes[old.0].children.retain(|c| *c != child);
        }
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Remove every child of `parent`; the children become detached
    pub fn detach_children(&mut self, parent: NodeId) -> Vec<NodeId> {
        let children = std::mem::take(&mut self.nodes[parent.0].children);
        for child in &children {
            self.nodes[child.0].parent = None;
        }
        children
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Nearest ancestor (excluding `id`) satisfying `predicate`
    pub fn ancestor(&self, id: NodeId, predicate: impl Fn(&Node) -> bool) -> Option<NodeId> {
        let mut current = self.parent(id);
        while let Some(candidate) = current {
            if predicate(self.node(candidate)) {
                return Some(candidate);
            }
            current = self.parent(candidate);
        }
        None
    }

    /// Nodes reachable from `from`, parents before children, in document order
    pub fn preorder(&self, from: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    /// Visit `from` and its descendants in document order, stopping at the
    /// first error
    pub fn walk<E>(
        &self,
        from: NodeId,
        visit: &mut impl FnMut(&Tree, NodeId) -> Result<(), E>,
    ) -> Result<(), E> {
        visit(self, from)?;
        for child in self.children(from) {
            self.walk(*child, visit)?;
        }
        Ok(())
    }

    /// Direct `jsp:attribute` children of a node
    pub fn named_attributes(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|c| matches!(self.node(*c).kind, NodeKind::NamedAttribute(_)))
            .collect()
    }

    pub fn named_attribute(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.named_attributes(id).into_iter().find(|c| {
            matches!(&self.node(*c).kind, NodeKind::NamedAttribute(data) if data.name == name)
        })
    }

    /// Direct `jsp:body` child of a node
    pub fn body(&self, id: NodeId) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|c| matches!(self.node(*c).kind, NodeKind::JspBody))
    }

    /// Children other than `jsp:attribute`
    pub fn body_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|c| !matches!(self.node(*c).kind, NodeKind::NamedAttribute(_)))
            .collect()
    }

    /// Strip trailing whitespace from the last child if it is template text
    pub fn rtrim_last_text(&mut self, id: NodeId) {
        let Some(last) = self.children(id).last().copied() else {
            return;
        };
        if let NodeKind::TemplateText { text } = &mut self.node_mut(last).kind {
            let trimmed = text.trim_end_matches(|c: char| c <= ' ').len();
            text.truncate(trimmed);
        }
    }

    /// Concatenated literal text of a node's template-text children
    pub fn literal_body(&self, id: NodeId) -> Option<String> {
        let mut out = String::new();
        for child in self.children(id) {
            match &self.node(*child).kind {
                NodeKind::TemplateText { text } => out.push_str(text),
                _ => return None,
            }
        }
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> Tree {
        Tree::new(RootData::default(), Mark::start_of("/t.jsp"))
    }

    #[test]
    fn test_parent_links_follow_children() {
        let mut tree = tree();
        let root = tree.root();
        let mark = Mark::new("/t.jsp", 1, 1);
        let text = tree.add(
            root,
            NodeKind::TemplateText { text: "a".to_string() },
            mark.clone(),
            Attributes::new(),
        );
        let body = tree.add(root, NodeKind::JspBody, mark.clone(), Attributes::new());
        let inner = tree.add(
            body,
            NodeKind::TemplateText { text: "b".to_string() },
            mark,
            Attributes::new(),
        );

        assert_eq!(tree.children(root), &[text, body]);
        assert_eq!(tree.parent(inner), Some(body));
        assert_eq!(tree.preorder(root), vec![root, text, body, inner]);

        tree.attach(root, inner);
        assert!(tree.children(body).is_empty());
        assert_eq!(tree.parent(inner), Some(root));
    }

    #[test]
    fn test_walk_stops_on_error() {
        let mut tree = tree();
        let root = tree.root();
        for text in ["x", "stop", "y"] {
            tree.add(
                root,
                NodeKind::TemplateText { text: text.to_string() },
                Mark::start_of("/t.jsp"),
                Attributes::new(),
            );
        }
        let mut seen = Vec::new();
        let result = tree.walk(root, &mut |tree: &Tree, id| {
            let node = tree.node(id);
            if node.text() == Some("stop") {
                return Err("stopped");
            }
            seen.extend(node.text().map(str::to_string));
            Ok(())
        });
        assert_eq!(result, Err("stopped"));
        assert_eq!(seen, vec!["x".to_string()]);
    }

    #[test]
    fn test_rtrim_last_text() {
        let mut tree = tree();
        let root = tree.root();
        tree.add(
            root,
            NodeKind::TemplateText { text: "value \n\t".to_string() },
            Mark::start_of("/t.jsp"),
            Attributes::new(),
        );
        tree.rtrim_last_text(root);
        assert_eq!(tree.literal_body(root).as_deref(), Some("value"));
    }

    #[test]
    fn test_attributes_lookup() {
        let attrs = Attributes::new().with("file", "a.jsp").with("x", "1");
        assert_eq!(attrs.get("file"), Some("a.jsp"));
        assert!(attrs.contains("x"));
        assert!(!attrs.contains("y"));
        assert_eq!(attrs.len(), 2);
    }
}
