//! Page-wide facts collected while translating one unit
//!
//! A `PageInfo` is created per compiled page or tag file. The parser fills in
//! prefix bindings and libraries, pass 1 of the validator fills in directive
//! values, and the result is handed to the code generator with the tree.

use crate::config::compile_time::page::{DEFAULT_BUFFER_KB, SCRIPTING_LANGUAGE};
use crate::config::CompilerOptions;
use crate::nodes::NodeId;
use crate::taglib::TagLibraryInfo;
use crate::utils::Mark;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

const DEFAULT_IMPORTS: &[&str] = &[
    "javax.servlet.*",
    "javax.servlet.http.*",
    "javax.servlet.jsp.*",
];

#[derive(Debug, Clone)]
pub struct PageInfo {
    pub is_tag_file: bool,

    prefix_map: HashMap<String, String>,
    taglibs: BTreeMap<String, Arc<TagLibraryInfo>>,
    non_custom_tag_prefixes: HashMap<String, Mark>,
    imports: Vec<String>,
    dependants: BTreeMap<String, Option<i64>>,
    directive_values: HashMap<String, String>,
    /// `pageEncoding` per source file, keyed by its root node
    page_encodings: HashMap<NodeId, String>,
    beans: HashMap<String, String>,
    plugin_declaration_ids: HashSet<String>,
    plugin_declarations: Vec<String>,
    temporary_variable_count: usize,

    pub include_prelude: Vec<String>,
    pub include_coda: Vec<String>,

    pub language: String,
    pub extends: Option<String>,
    pub content_type: Option<String>,
    pub session: bool,
    /// Buffer size in kilobytes; `None` means unbuffered
    pub buffer_kb: Option<usize>,
    pub auto_flush: bool,
    pub is_thread_safe: bool,
    pub info: Option<String>,
    pub error_page: Option<String>,
    pub is_error_page: bool,
    pub page_encoding: Option<String>,
    pub el_ignored: bool,
    pub deferred_syntax_allowed_as_literal: bool,
    pub trim_directive_whitespaces: bool,
    pub error_on_undeclared_namespace: bool,
    pub scripting_invalid: bool,
    pub is_jsp_prefix_hijacked: bool,

    pub omit_xml_declaration: Option<String>,
    pub doctype_name: Option<String>,
    pub doctype_public: Option<String>,
    pub doctype_system: Option<String>,
}

impl PageInfo {
    pub fn new(options: &CompilerOptions, is_tag_file: bool) -> Self {
        Self {
            is_tag_file,
            prefix_map: HashMap::new(),
            taglibs: BTreeMap::new(),
            non_custom_tag_prefixes: HashMap::new(),
            imports: DEFAULT_IMPORTS.iter().map(|s| s.to_string()).collect(),
            dependants: BTreeMap::new(),
            directive_values: HashMap::new(),
            page_encodings: HashMap::new(),
            beans: HashMap::new(),
            plugin_declaration_ids: HashSet::new(),
            plugin_declarations: Vec::new(),
            temporary_variable_count: 0,
            include_prelude: options.include_prelude.clone(),
            include_coda: options.include_coda.clone(),
            language: SCRIPTING_LANGUAGE.to_string(),
            extends: None,
            content_type: None,
            session: true,
            buffer_kb: Some(DEFAULT_BUFFER_KB),
            auto_flush: true,
            is_thread_safe: true,
            info: None,
            error_page: None,
            is_error_page: false,
            page_encoding: None,
            el_ignored: options.is_el_ignored,
            deferred_syntax_allowed_as_literal: options.deferred_syntax_allowed_as_literal,
            trim_directive_whitespaces: options.trim_directive_whitespaces,
            error_on_undeclared_namespace: options.error_on_undeclared_namespace,
            scripting_invalid: false,
            is_jsp_prefix_hijacked: false,
            omit_xml_declaration: None,
            doctype_name: None,
            doctype_public: None,
            doctype_system: None,
        }
    }

    // Prefixes and libraries

    pub fn add_prefix_mapping(&mut self, prefix: &str, uri: &str) {
        self.prefix_map.insert(prefix.to_string(), uri.to_string());
    }

    pub fn uri_for_prefix(&self, prefix: &str) -> Option<&str> {
        self.prefix_map.get(prefix).map(String::as_str)
    }

    pub fn prefixes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.prefix_map.iter().map(|(p, u)| (p.as_str(), u.as_str()))
    }

    pub fn add_taglib(&mut self, uri: &str, library: Arc<TagLibraryInfo>) {
        self.taglibs.insert(uri.to_string(), library);
    }

    pub fn has_taglib(&self, uri: &str) -> bool {
        self.taglibs.contains_key(uri)
    }

    pub fn taglib(&self, uri: &str) -> Option<&Arc<TagLibraryInfo>> {
        self.taglibs.get(uri)
    }

    pub fn taglib_for_prefix(&self, prefix: &str) -> Option<&Arc<TagLibraryInfo>> {
        self.uri_for_prefix(prefix).and_then(|uri| self.taglib(uri))
    }

    pub fn taglibs(&self) -> impl Iterator<Item = (&str, &Arc<TagLibraryInfo>)> {
        self.taglibs.iter().map(|(uri, lib)| (uri.as_str(), lib))
    }

    /// Remember a prefix seen on something that is not a custom tag
    pub fn put_non_custom_tag_prefix(&mut self, prefix: &str, mark: Mark) {
        self.non_custom_tag_prefixes
            .entry(prefix.to_string())
            .or_insert(mark);
    }

    pub fn non_custom_tag_prefix(&self, prefix: &str) -> Option<&Mark> {
        self.non_custom_tag_prefixes.get(prefix)
    }

    // Imports and dependencies

    /// Add a comma-separated import list
    pub fn add_imports(&mut self, list: &str) {
        for import in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if !self.imports.iter().any(|i| i == import) {
                self.imports.push(import.to_string());
            }
        }
    }

    pub fn imports(&self) -> &[String] {
        &self.imports
    }

    pub fn add_dependant(&mut self, path: &str, last_modified: Option<i64>) {
        self.dependants.insert(path.to_string(), last_modified);
    }

    pub fn dependants(&self) -> &BTreeMap<String, Option<i64>> {
        &self.dependants
    }

    // Directive values

    /// Record the first value of a directive attribute.
    ///
    /// Returns the earlier value when `value` differs from it.
    pub fn record_directive_value(&mut self, name: &str, value: &str) -> Option<String> {
        match self.directive_values.get(name) {
            Some(old) if old != value => Some(old.clone()),
            Some(_) => None,
            None => {
                self.directive_values
                    .insert(name.to_string(), value.to_string());
                None
            }
        }
    }

    pub fn directive_value(&self, name: &str) -> Option<&str> {
        self.directive_values.get(name).map(String::as_str)
    }

    /// Like [`PageInfo::record_directive_value`] for `pageEncoding`, which
    /// is scoped to the file that declares it
    pub fn record_page_encoding(&mut self, root: NodeId, value: &str) -> Option<String> {
        match self.page_encodings.get(&root) {
            Some(old) if old != value => Some(old.clone()),
            Some(_) => None,
            None => {
                self.page_encodings.insert(root, value.to_string());
                None
            }
        }
    }

    // Beans, plugin output and temporaries

    /// Register a bean id; false when the id is already taken
    pub fn add_bean(&mut self, id: &str, type_name: &str) -> bool {
        if self.beans.contains_key(id) {
            return false;
        }
        self.beans.insert(id.to_string(), type_name.to_string());
        true
    }

    pub fn bean_type(&self, id: &str) -> Option<&str> {
        self.beans.get(id).map(String::as_str)
    }

    /// Add a declaration contributed by a tag plugin, once per id.
    /// Returns false when the id was already declared.
    pub fn add_plugin_declaration(&mut self, id: &str, text: &str) -> bool {
        let added = self.plugin_declaration_ids.insert(id.to_string());
        if added {
            self.plugin_declarations.push(text.to_string());
        }
        added
    }

    pub fn plugin_declarations(&self) -> &[String] {
        &self.plugin_declarations
    }

    pub fn next_temporary_variable_name(&mut self) -> String {
        self.temporary_variable_count += 1;
        format!("_jspx_temp{}", self.temporary_variable_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> CompilerOptions {
        CompilerOptions {
            is_el_ignored: false,
            ..CompilerOptions::default()
        }
    }

    #[test]
    fn test_directive_values_first_occurrence_wins() {
        let mut info = PageInfo::new(&options(), false);
        assert_eq!(info.record_directive_value("session", "false"), None);
        assert_eq!(info.record_directive_value("session", "false"), None);
        assert_eq!(
            info.record_directive_value("session", "true"),
            Some("false".to_string())
        );
        assert_eq!(info.directive_value("session"), Some("false"));
    }

    #[test]
    fn test_page_encoding_recorded_per_root() {
        let mut tree = crate::nodes::Tree::new(Default::default(), Mark::start_of("/p.jsp"));
        let page = tree.root();
        let included = tree.add(
            page,
            crate::nodes::NodeKind::Root(Default::default()),
            Mark::start_of("/inc.jspf"),
            Default::default(),
        );
        let mut info = PageInfo::new(&options(), false);
        assert_eq!(info.record_page_encoding(page, "UTF-8"), None);
        assert_eq!(info.record_page_encoding(included, "ISO-8859-1"), None);
        assert_eq!(info.record_page_encoding(page, "UTF-8"), None);
        assert_eq!(
            info.record_page_encoding(included, "UTF-8"),
            Some("ISO-8859-1".to_string())
        );
    }

    #[test]
    fn test_imports_accumulate_without_duplicates() {
        let mut info = PageInfo::new(&options(), false);
        info.add_imports("java.util.*, java.io.File");
        info.add_imports("java.util.*");
        let imports = info.imports();
        assert_eq!(imports.iter().filter(|i| *i == "java.util.*").count(), 1);
        assert!(imports.contains(&"java.io.File".to_string()));
        assert!(imports.contains(&"javax.servlet.jsp.*".to_string()));
    }

    #[test]
    fn test_beans_and_temporaries() {
        let mut info = PageInfo::new(&options(), false);
        assert!(info.add_bean("cart", "shop.Cart"));
        assert!(!info.add_bean("cart", "shop.Other"));
        assert_eq!(info.bean_type("cart"), Some("shop.Cart"));
        assert_eq!(info.next_temporary_variable_name(), "_jspx_temp1");
        assert_eq!(info.next_temporary_variable_name(), "_jspx_temp2");
    }

    #[test]
    fn test_non_custom_prefix_keeps_first_mark() {
        let mut info = PageInfo::new(&options(), false);
        info.put_non_custom_tag_prefix("foo", Mark::new("/a.jsp", 2, 1));
        info.put_non_custom_tag_prefix("foo", Mark::new("/a.jsp", 9, 1));
        assert_eq!(info.non_custom_tag_prefix("foo").map(Mark::line), Some(2));
    }

    #[test]
    fn test_plugin_declarations_deduplicated() {
        let mut info = PageInfo::new(&options(), false);
        assert!(info.add_plugin_declaration("helper", "int helper;"));
        assert!(!info.add_plugin_declaration("helper", "int helper;"));
        assert_eq!(info.plugin_declarations().len(), 1);
    }
}
