//! Extension hooks a tag library can attach to its tags
//!
//! A `TagExtraInfo` describes scripting variables and validates one tag
//! invocation; a `TagLibraryValidator` looks at a whole unit once per
//! library it uses. Implementations are registered on the
//! [`CompilationContext`](crate::context::CompilationContext) under the class
//! names descriptors refer to.

use super::info::VariableScope;
use crate::nodes::Tree;
use crate::page_info::PageInfo;
use std::collections::BTreeMap;
use std::fmt;

/// Attribute value as seen by extension hooks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagDataValue {
    Literal(String),
    /// Only known at request time
    RequestTime,
}

/// Translation-time view of one custom tag's attributes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagData {
    values: BTreeMap<String, TagDataValue>,
}

impl TagData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: TagDataValue) {
        self.values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<&TagDataValue> {
        self.values.get(name)
    }

    /// Literal value of an attribute, if it has one
    pub fn attribute_string(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(TagDataValue::Literal(value)) => Some(value),
            _ => None,
        }
    }

    pub fn is_request_time(&self, name: &str) -> bool {
        matches!(self.values.get(name), Some(TagDataValue::RequestTime))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

/// A scripting variable exposed by a tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableInfo {
    pub name: String,
    pub class_name: String,
    pub declare: bool,
    pub scope: VariableScope,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationMessage {
    /// Id of the offending element, when the validator knows it
    pub id: Option<String>,
    pub message: String,
}

impl ValidationMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            id: None,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{}: {}", id, self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// What a library validator gets to inspect
pub struct PageData<'a> {
    pub path: &'a str,
    pub tree: &'a Tree,
    pub page_info: &'a PageInfo,
}

pub trait TagExtraInfo: Send + Sync {
    fn variable_info(&self, _data: &TagData) -> Vec<VariableInfo> {
        Vec::new()
    }

    fn validate(&self, _data: &TagData) -> Vec<ValidationMessage> {
        Vec::new()
    }
}

pub trait TagLibraryValidator: Send + Sync {
    fn validate(
        &self,
        prefix: &str,
        uri: &str,
        page: &PageData<'_>,
        init_params: &BTreeMap<String, String>,
    ) -> Vec<ValidationMessage>;
}
