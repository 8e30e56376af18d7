//! Tag library metadata records
//!
//! These records are immutable once built. Explicit libraries are projected
//! from descriptors, implicit ones are assembled from a tag directory and
//! fill in their tag-file interfaces on first lookup.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex};

pub const SIMPLE_TAG_INTERFACE: &str = "javax.servlet.jsp.tagext.SimpleTag";
pub const DYNAMIC_ATTRIBUTES_INTERFACE: &str = "javax.servlet.jsp.tagext.DynamicAttributes";
pub const FRAGMENT_TYPE: &str = "javax.servlet.jsp.tagext.JspFragment";
pub const VALUE_EXPRESSION_TYPE: &str = "javax.el.ValueExpression";
pub const METHOD_EXPRESSION_TYPE: &str = "javax.el.MethodExpression";
pub const STRING_TYPE: &str = "java.lang.String";
pub const OBJECT_TYPE: &str = "java.lang.Object";
pub const DEFAULT_METHOD_SIGNATURE: &str = "java.lang.Object method()";

/// What a tag accepts between its start and end tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BodyContent {
    Empty,
    Jsp,
    Scriptless,
    TagDependent,
}

impl BodyContent {
    /// Case-insensitive parse of a descriptor or directive value
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "empty" => Some(Self::Empty),
            "jsp" => Some(Self::Jsp),
            "scriptless" => Some(Self::Scriptless),
            "tagdependent" => Some(Self::TagDependent),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Jsp => "JSP",
            Self::Scriptless => "scriptless",
            Self::TagDependent => "tagdependent",
        }
    }
}

impl fmt::Display for BodyContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Visibility of a scripting variable exported by a tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VariableScope {
    Nested,
    AtBegin,
    AtEnd,
}

impl VariableScope {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "NESTED" => Some(Self::Nested),
            "AT_BEGIN" => Some(Self::AtBegin),
            "AT_END" => Some(Self::AtEnd),
            _ => None,
        }
    }
}

/// Contract of one declared attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagAttributeInfo {
    pub name: String,
    pub required: bool,
    pub type_name: String,
    /// Accepts request-time values (`<%= %>` or `${}`)
    pub rtexprvalue: bool,
    pub fragment: bool,
    pub description: Option<String>,
    pub deferred_value: bool,
    pub deferred_method: bool,
    pub expected_type_name: Option<String>,
    pub method_signature: Option<String>,
}

impl TagAttributeInfo {
    /// A plain, optional, literal-only string attribute
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: false,
            type_name: STRING_TYPE.to_string(),
            rtexprvalue: false,
            fragment: false,
            description: None,
            deferred_value: false,
            deferred_method: false,
            expected_type_name: None,
            method_signature: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn rtexprvalue(mut self) -> Self {
        self.rtexprvalue = true;
        self
    }

    pub fn of_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = type_name.into();
        self
    }

    pub fn fragment(mut self) -> Self {
        self.fragment = true;
        self.rtexprvalue = true;
        self.type_name = FRAGMENT_TYPE.to_string();
        self
    }

    pub fn deferred_value(mut self, expected_type: Option<&str>) -> Self {
        self.deferred_value = true;
        self.type_name = VALUE_EXPRESSION_TYPE.to_string();
        self.expected_type_name = Some(expected_type.unwrap_or(OBJECT_TYPE).to_string());
        self
    }

    pub fn deferred_method(mut self, signature: Option<&str>) -> Self {
        self.deferred_method = true;
        self.type_name = METHOD_EXPRESSION_TYPE.to_string();
        self.method_signature = Some(signature.unwrap_or(DEFAULT_METHOD_SIGNATURE).to_string());
        self
    }

    /// Return type of a deferred-method signature (`void` for no value)
    pub fn method_return_type(&self) -> Option<&str> {
        let signature = self.method_signature.as_deref()?.trim();
        signature.split_whitespace().next()
    }
}

/// Scripting variable declared by a tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagVariableInfo {
    pub name_given: Option<String>,
    pub name_from_attribute: Option<String>,
    pub class_name: String,
    pub declare: bool,
    pub scope: VariableScope,
}

impl TagVariableInfo {
    pub fn given(name: impl Into<String>) -> Self {
        Self {
            name_given: Some(name.into()),
            name_from_attribute: None,
            class_name: STRING_TYPE.to_string(),
            declare: true,
            scope: VariableScope::Nested,
        }
    }
}

/// Library-level facts every tag carries a copy of
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LibraryHeader {
    pub uri: String,
    pub short_name: String,
    pub tlib_version: String,
    pub required_version: String,
    pub info: Option<String>,
}

impl LibraryHeader {
    /// Required container version as a number; unparsable values count as 2.0
    pub fn required_version_number(&self) -> f64 {
        self.required_version.trim().parse().unwrap_or(2.0)
    }

    /// Libraries older than 2.1 predate deferred expressions
    pub fn predates_deferred_expressions(&self) -> bool {
        self.required_version_number() < 2.1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagInfo {
    pub name: String,
    pub tag_class_name: String,
    pub body_content: BodyContent,
    pub info: Option<String>,
    pub library: LibraryHeader,
    pub display_name: Option<String>,
    pub small_icon: Option<String>,
    pub large_icon: Option<String>,
    pub example: Option<String>,
    pub attributes: Vec<TagAttributeInfo>,
    pub variables: Vec<TagVariableInfo>,
    pub dynamic_attributes: bool,
    pub tei_class: Option<String>,
    /// Variable receiving undeclared attributes, for tag files only
    pub dynamic_attributes_map_name: Option<String>,
}

impl TagInfo {
    pub fn new(
        name: impl Into<String>,
        tag_class_name: impl Into<String>,
        body_content: BodyContent,
        library: LibraryHeader,
    ) -> Self {
        Self {
            name: name.into(),
            tag_class_name: tag_class_name.into(),
            body_content,
            info: None,
            library,
            display_name: None,
            small_icon: None,
            large_icon: None,
            example: None,
            attributes: Vec::new(),
            variables: Vec::new(),
            dynamic_attributes: false,
            tei_class: None,
            dynamic_attributes_map_name: None,
        }
    }

    pub fn with_attribute(mut self, attribute: TagAttributeInfo) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn with_variable(mut self, variable: TagVariableInfo) -> Self {
        self.variables.push(variable);
        self
    }

    pub fn with_dynamic_attributes(mut self) -> Self {
        self.dynamic_attributes = true;
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&TagAttributeInfo> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn has_dynamic_attributes(&self) -> bool {
        self.dynamic_attributes || self.dynamic_attributes_map_name.is_some()
    }
}

/// A tag implemented by a tag file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagFileInfo {
    pub name: String,
    pub path: String,
    pub tag_info: Arc<TagInfo>,
}

/// EL function exported by a library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionInfo {
    pub name: String,
    pub function_class: String,
    pub function_signature: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidatorInfo {
    pub validator_class: String,
    pub init_params: BTreeMap<String, String>,
}

/// Where a library's tag files come from
#[derive(Debug)]
enum TagFileSource {
    /// Declared in the descriptor and extracted up front
    Declared(Vec<Arc<TagFileInfo>>),
    /// Found in a tag directory; interfaces are extracted on first use
    Directory {
        paths: BTreeMap<String, String>,
        cache: Mutex<HashMap<String, Arc<TagFileInfo>>>,
    },
}

/// A resolved tag library
#[derive(Debug)]
pub struct TagLibraryInfo {
    pub header: LibraryHeader,
    /// Descriptor location or tag directory
    pub location: String,
    pub tags: Vec<Arc<TagInfo>>,
    pub functions: Vec<FunctionInfo>,
    pub validator: Option<ValidatorInfo>,
    /// Implicit manifest, recorded as a dependency by every unit using it
    pub manifest: Option<String>,
    tag_files: TagFileSource,
}

impl TagLibraryInfo {
    pub fn explicit(
        header: LibraryHeader,
        location: impl Into<String>,
        tags: Vec<Arc<TagInfo>>,
        tag_files: Vec<Arc<TagFileInfo>>,
        functions: Vec<FunctionInfo>,
        validator: Option<ValidatorInfo>,
    ) -> Self {
        Self {
            header,
            location: location.into(),
            tags,
            functions,
            validator,
            manifest: None,
            tag_files: TagFileSource::Declared(tag_files),
        }
    }

    pub fn implicit(
        header: LibraryHeader,
        tag_dir: impl Into<String>,
        paths: BTreeMap<String, String>,
        manifest: Option<String>,
    ) -> Self {
        Self {
            header,
            location: tag_dir.into(),
            tags: Vec::new(),
            functions: Vec::new(),
            validator: None,
            manifest,
            tag_files: TagFileSource::Directory {
                paths,
                cache: Mutex::new(HashMap::new()),
            },
        }
    }

    pub fn uri(&self) -> &str {
        &self.header.uri
    }

    pub fn is_implicit(&self) -> bool {
        matches!(self.tag_files, TagFileSource::Directory { .. })
    }

    pub fn tag(&self, name: &str) -> Option<&Arc<TagInfo>> {
        self.tags.iter().find(|t| t.name == name)
    }

    pub fn function(&self, name: &str) -> Option<&FunctionInfo> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// Path of a tag file this library provides, declared or discovered
    pub fn tag_file_path(&self, name: &str) -> Option<&str> {
        match &self.tag_files {
            TagFileSource::Declared(files) => files
                .iter()
                .find(|f| f.name == name)
                .map(|f| f.path.as_str()),
            TagFileSource::Directory { paths, .. } => paths.get(name).map(String::as_str),
        }
    }

    /// Tag-file interface if it is already known
    pub fn cached_tag_file(&self, name: &str) -> Option<Arc<TagFileInfo>> {
        match &self.tag_files {
            TagFileSource::Declared(files) => files.iter().find(|f| f.name == name).cloned(),
            TagFileSource::Directory { cache, .. } => cache
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .get(name)
                .cloned(),
        }
    }

    /// Remember an extracted interface; the first one stored wins
    pub fn cache_tag_file(&self, info: TagFileInfo) -> Arc<TagFileInfo> {
        match &self.tag_files {
            TagFileSource::Declared(_) => Arc::new(info),
            TagFileSource::Directory { cache, .. } => cache
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .entry(info.name.clone())
                .or_insert_with(|| Arc::new(info))
                .clone(),
        }
    }

    /// Names of all tag files, in name order for directories
    pub fn tag_file_names(&self) -> Vec<String> {
        match &self.tag_files {
            TagFileSource::Declared(files) => files.iter().map(|f| f.name.clone()).collect(),
            TagFileSource::Directory { paths, .. } => paths.keys().cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(version: &str) -> LibraryHeader {
        LibraryHeader {
            uri: "http://example.com/ui".to_string(),
            short_name: "ui".to_string(),
            tlib_version: "1.0".to_string(),
            required_version: version.to_string(),
            info: None,
        }
    }

    #[test]
    fn test_body_content_parsing() {
        assert_eq!(BodyContent::parse("JSP"), Some(BodyContent::Jsp));
        assert_eq!(BodyContent::parse("TagDependent"), Some(BodyContent::TagDependent));
        assert_eq!(BodyContent::parse(" empty "), Some(BodyContent::Empty));
        assert_eq!(BodyContent::parse("html"), None);
    }

    #[test]
    fn test_attribute_builders() {
        let fragment = TagAttributeInfo::new("body").fragment();
        assert!(fragment.rtexprvalue);
        assert_eq!(fragment.type_name, FRAGMENT_TYPE);

        let method = TagAttributeInfo::new("action").deferred_method(Some("void run()"));
        assert_eq!(method.method_return_type(), Some("void"));

        let value = TagAttributeInfo::new("value").deferred_value(None);
        assert_eq!(value.expected_type_name.as_deref(), Some(OBJECT_TYPE));
    }

    #[test]
    fn test_library_version() {
        assert!(header("2.0").predates_deferred_expressions());
        assert!(!header("2.1").predates_deferred_expressions());
    }

    #[test]
    fn test_directory_cache_keeps_first_entry() {
        let mut paths = BTreeMap::new();
        paths.insert("hello".to_string(), "/WEB-INF/tags/hello.tag".to_string());
        let library = TagLibraryInfo::implicit(header("2.0"), "/WEB-INF/tags", paths, None);

        assert!(library.is_implicit());
        assert_eq!(library.tag_file_path("hello"), Some("/WEB-INF/tags/hello.tag"));
        assert!(library.cached_tag_file("hello").is_none());

        let make = |class: &str| TagFileInfo {
            name: "hello".to_string(),
            path: "/WEB-INF/tags/hello.tag".to_string(),
            tag_info: Arc::new(TagInfo::new("hello", class, BodyContent::Scriptless, header("2.0"))),
        };
        let first = library.cache_tag_file(make("first"));
        let second = library.cache_tag_file(make("second"));
        assert_eq!(first.tag_info.tag_class_name, "first");
        assert_eq!(second.tag_info.tag_class_name, "first");
    }
}
