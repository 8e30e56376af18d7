//! Tag plugins
//!
//! A tag plugin replaces the generic handler invocation of a custom tag with
//! code of its own. Plugins are listed in a manifest that maps handler class
//! names to plugin class names:
//!
//! ```toml
//! [[tag-plugin]]
//! tag-class = "org.example.tags.IfTag"
//! plugin-class = "org.example.plugins.If"
//! ```
//!
//! Plugin classes resolve through the plugin registry on the
//! [`CompilationContext`]. After validation each custom tag whose handler
//! has a plugin gets a [`TagPluginContext`]; what the plugin emits lands in
//! the tag's before-body and after-body slots.

use crate::config::compile_time::resources::TAG_PLUGINS_MANIFEST;
use crate::context::CompilationContext;
use crate::errors::{messages, ErrorDispatcher, JspError, JspResult};
use crate::logging::codes::{plugin, success};
use crate::nodes::{AttributeValue, Attributes, NodeId, NodeKind, Tree};
use crate::page_info::PageInfo;
use crate::utils::Mark;
use serde_json::Value;
use crate::{log_debug, log_success};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

const ENTRY_KEY: &str = "tag-plugin";
const TAG_CLASS_KEY: &str = "tag-class";
const PLUGIN_CLASS_KEY: &str = "plugin-class";

pub trait TagPlugin: Send + Sync {
    fn do_tag(&self, ctx: &mut TagPluginContext<'_>);
}

/// Handler class name to plugin
#[derive(Default)]
pub struct PluginTable {
    plugins: HashMap<String, Arc<dyn TagPlugin>>,
}

impl fmt::Debug for PluginTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.plugins.keys()).finish()
    }
}

impl PluginTable {
    pub fn get(&self, tag_class: &str) -> Option<&Arc<dyn TagPlugin>> {
        self.plugins.get(tag_class)
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

/// Read the manifest; no manifest means no plugins
pub fn load_table(ctx: &CompilationContext, err: &ErrorDispatcher) -> Result<PluginTable, JspError> {
    let path = TAG_PLUGINS_MANIFEST;
    if !ctx.resources().exists(path) {
        return Ok(PluginTable::default());
    }
    let at = Mark::new(path, 1, 1);
    let invalid = |message: String| err.error(plugin::INVALID_PLUGIN_MANIFEST, Some(&at), message);

    let bytes = ctx.resources().read(path).map_err(|e| {
        err.error_with_cause(e.error_code(), Some(&at), messages::invalid_tag_plugin(path), &e)
    })?;
    let text = String::from_utf8(bytes).map_err(|_| invalid(messages::invalid_tag_plugin(path)))?;
    let root = toml::from_str::<toml::Table>(&text).map_err(|e| {
        err.error_with_cause(
            plugin::INVALID_PLUGIN_MANIFEST,
            Some(&at),
            messages::invalid_tag_plugin(path),
            &e,
        )
    })?;

    if root.keys().any(|key| key != ENTRY_KEY) {
        return Err(invalid(messages::wrong_root_element(path, ENTRY_KEY)));
    }
    let entries = match root.get(ENTRY_KEY) {
        None => return Ok(PluginTable::default()),
        Some(toml::Value::Array(entries)) => entries,
        Some(_) => return Err(invalid(messages::invalid_tag_plugin(path))),
    };

    let mut table = PluginTable::default();
    for entry in entries {
        let toml::Value::Table(entry) = entry else {
            return Err(invalid(messages::invalid_tag_plugin(path)));
        };
        if let Some(key) = entry
            .keys()
            .find(|key| *key != TAG_CLASS_KEY && *key != PLUGIN_CLASS_KEY)
        {
            return Err(invalid(messages::unknown_tag_plugin_key(path, key)));
        }
        let text_of = |key: &str| match entry.get(key) {
            Some(toml::Value::String(value)) if !value.trim().is_empty() => {
                Some(value.trim().to_string())
            }
            _ => None,
        };
        let (Some(tag_class), Some(plugin_class)) = (text_of(TAG_CLASS_KEY), text_of(PLUGIN_CLASS_KEY)) else {
            return Err(invalid(messages::invalid_tag_plugin(path)));
        };
        let Some(plugin) = ctx.plugin(&plugin_class) else {
            return Err(err.error(
                plugin::PLUGIN_NOT_FOUND,
                Some(&at),
                messages::tag_plugin_not_found(&plugin_class),
            ));
        };
        table.plugins.insert(tag_class, plugin);
    }

    log_debug!("Loaded tag plugin manifest", "path" => path, "plugins" => table.len());
    Ok(table)
}

/// Run plugins over every custom tag of `tree`; returns how many tags were
/// handed to a plugin
pub fn apply(
    ctx: &CompilationContext,
    tree: &mut Tree,
    page_info: &mut PageInfo,
    err: &ErrorDispatcher,
) -> JspResult<usize> {
    let table = ctx.plugin_table(|| load_table(ctx, err))?;
    if table.is_empty() {
        return Ok(0);
    }

    let mut plugin_attributes: HashMap<NodeId, BTreeMap<String, Value>> = HashMap::new();
    let mut applied = 0usize;
    for id in tree.preorder(tree.root()) {
        let Some(tag) = tree.node(id).custom_tag() else {
            continue;
        };
        let Some(plugin) = table.get(&tag.tag_info.tag_class_name).cloned() else {
            continue;
        };

        let parent = tree
            .parent(id)
            .filter(|parent| tree.node(*parent).custom_tag().is_some())
            .and_then(|parent| plugin_attributes.get(&parent))
            .cloned();
        let mut context = TagPluginContext::new(tree, page_info, id, parent);
        plugin.do_tag(&mut context);
        plugin_attributes.insert(id, context.attributes);
        applied += 1;
    }

    log_success!(success::PLUGINS_APPLIED, "Tag plugins applied",
        "plugins" => table.len(),
        "tags" => applied
    );
    Ok(applied)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    BeforeBody,
    AfterBody,
}

/// What a plugin sees of the tag it rewrites
pub struct TagPluginContext<'a> {
    tree: &'a mut Tree,
    page_info: &'a mut PageInfo,
    node: NodeId,
    mark: Option<Mark>,
    attributes: BTreeMap<String, Value>,
    parent: Option<BTreeMap<String, Value>>,
    placement: Placement,
}

impl<'a> TagPluginContext<'a> {
    fn new(
        tree: &'a mut Tree,
        page_info: &'a mut PageInfo,
        node: NodeId,
        parent: Option<BTreeMap<String, Value>>,
    ) -> Self {
        let mark = tree.node(node).mark().cloned();
        if let Some(tag) = tree.node_mut(node).custom_tag_mut() {
            tag.at_stag.clear();
            tag.at_etag.clear();
            tag.use_tag_plugin = true;
        }
        Self {
            tree,
            page_info,
            node,
            mark,
            attributes: BTreeMap::new(),
            parent,
            placement: Placement::BeforeBody,
        }
    }

    /// Whether the enclosing custom tag was itself handled by a plugin
    pub fn has_parent_context(&self) -> bool {
        self.parent.is_some()
    }

    /// Attribute the enclosing tag's plugin stored
    pub fn parent_attribute(&self, key: &str) -> Option<&Value> {
        self.parent.as_ref()?.get(key)
    }

    pub fn set_plugin_attribute(&mut self, key: &str, value: Value) {
        self.attributes.insert(key.to_string(), value);
    }

    pub fn plugin_attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// True when nothing in the tag's body is a scripting element
    pub fn is_scriptless(&self) -> bool {
        self.tree
            .preorder(self.node)
            .into_iter()
            .skip(1)
            .all(|id| !self.tree.node(id).kind.is_scripting())
    }

    pub fn is_attribute_specified(&self, name: &str) -> bool {
        self.find_attribute(name).is_some()
    }

    pub fn is_constant_attribute(&self, name: &str) -> bool {
        self.constant_attribute(name).is_some()
    }

    pub fn constant_attribute(&self, name: &str) -> Option<&str> {
        match &self.find_attribute(name)?.value {
            AttributeValue::Literal(text) => Some(text),
            _ => None,
        }
    }

    pub fn temporary_variable_name(&mut self) -> String {
        self.page_info.next_temporary_variable_name()
    }

    pub fn generate_import(&mut self, import: &str) {
        self.page_info.add_imports(import);
    }

    /// Emit a declaration unless one with the same id was already emitted
    /// anywhere in the unit
    pub fn generate_declaration(&mut self, id: &str, text: &str) {
        if self.page_info.add_plugin_declaration(id, text) {
            self.emit(NodeKind::Declaration {
                text: text.to_string(),
            });
        }
    }

    pub fn generate_source(&mut self, code: &str) {
        self.emit(NodeKind::GeneratedCode {
            text: code.to_string(),
        });
    }

    /// Emit the evaluated value of one of the tag's attributes
    pub fn generate_attribute(&mut self, name: &str) {
        self.emit(NodeKind::AttributeGenerator {
            name: name.to_string(),
            tag: self.node,
        });
    }

    /// Mark where the body goes; later output follows it
    pub fn generate_body(&mut self) {
        self.placement = Placement::AfterBody;
    }

    /// Fall back to the regular handler invocation
    pub fn dont_use_tag_plugin(&mut self) {
        if let Some(tag) = self.tree.node_mut(self.node).custom_tag_mut() {
            tag.use_tag_plugin = false;
        }
    }

    fn find_attribute(&self, name: &str) -> Option<&crate::nodes::JspAttribute> {
        self.tree
            .node(self.node)
            .jsp_attributes
            .iter()
            .find(|a| a.local_name == name || a.qname == name)
    }

    fn emit(&mut self, kind: NodeKind) {
        let id = self.tree.add_detached(kind, self.mark.clone(), Attributes::new());
        let placement = self.placement;
        if let Some(tag) = self.tree.node_mut(self.node).custom_tag_mut() {
            match placement {
                Placement::BeforeBody => tag.at_stag.push(id),
                Placement::AfterBody => tag.at_etag.push(id),
            }
        }
    }
}
