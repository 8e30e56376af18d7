//! Pre-parsed tag library descriptors
//!
//! Descriptors reach the compiler as plain data, usually a JSON array handed
//! to `jspc --taglibs`. They are kept verbatim on the compilation context and
//! projected into [`TagLibraryInfo`](super::TagLibraryInfo) records the first
//! time a page references them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum DescriptorError {
    #[error("Cannot read tag library descriptors from '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid tag library descriptors: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TagLibraryDescriptor {
    /// Public URI pages use in taglib directives
    pub uri: Option<String>,
    /// Context-relative path of the descriptor itself
    pub location: Option<String>,
    pub tlib_version: Option<String>,
    pub jsp_version: Option<String>,
    pub short_name: Option<String>,
    pub info: Option<String>,
    pub tags: Vec<TagDescriptor>,
    pub tag_files: Vec<TagFileDescriptor>,
    pub functions: Vec<FunctionDescriptor>,
    pub validator: Option<ValidatorDescriptor>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TagDescriptor {
    pub name: String,
    pub tag_class: String,
    pub body_content: Option<String>,
    pub tei_class: Option<String>,
    pub info: Option<String>,
    pub display_name: Option<String>,
    pub small_icon: Option<String>,
    pub large_icon: Option<String>,
    pub example: Option<String>,
    pub dynamic_attributes: bool,
    pub attributes: Vec<AttributeDescriptor>,
    pub variables: Vec<VariableDescriptor>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct AttributeDescriptor {
    pub name: String,
    pub required: bool,
    pub rtexprvalue: bool,
    #[serde(rename = "type")]
    pub type_name: Option<String>,
    pub fragment: bool,
    pub description: Option<String>,
    pub deferred_value: bool,
    pub deferred_method: bool,
    pub expected_type: Option<String>,
    pub method_signature: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct VariableDescriptor {
    pub name_given: Option<String>,
    pub name_from_attribute: Option<String>,
    pub variable_class: Option<String>,
    pub declare: Option<bool>,
    pub scope: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TagFileDescriptor {
    pub name: String,
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FunctionDescriptor {
    pub name: String,
    pub function_class: String,
    pub function_signature: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ValidatorDescriptor {
    pub validator_class: String,
    pub init_params: BTreeMap<String, String>,
}

/// Parse a JSON array of descriptors
pub fn load_descriptors(json: &str) -> Result<Vec<TagLibraryDescriptor>, DescriptorError> {
    Ok(serde_json::from_str(json)?)
}

pub fn load_descriptor_file(path: &Path) -> Result<Vec<TagLibraryDescriptor>, DescriptorError> {
    let json = std::fs::read_to_string(path).map_err(|source| DescriptorError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_descriptors(&json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Write;

    const SAMPLE: &str = r#"[
        {
            "uri": "http://example.com/ui",
            "tlib-version": "1.1",
            "jsp-version": "2.1",
            "short-name": "ui",
            "tags": [
                {
                    "name": "panel",
                    "tag-class": "ui.PanelTag",
                    "body-content": "scriptless",
                    "attributes": [
                        { "name": "title", "required": true, "rtexprvalue": true },
                        { "name": "onClose", "deferred-method": true, "method-signature": "void close()" }
                    ],
                    "variables": [ { "name-given": "panelId", "scope": "AT_BEGIN" } ]
                }
            ],
            "tag-files": [ { "name": "price", "path": "/WEB-INF/tags/price.tag" } ],
            "functions": [
                { "name": "upper", "function-class": "ui.Fn", "function-signature": "java.lang.String upper(java.lang.String)" }
            ]
        }
    ]"#;

    #[test]
    fn test_load_descriptors() {
        let descriptors = load_descriptors(SAMPLE).unwrap();
        assert_eq!(descriptors.len(), 1);
        let library = &descriptors[0];
        assert_eq!(library.short_name.as_deref(), Some("ui"));
        assert_eq!(library.tags[0].attributes.len(), 2);
        assert!(library.tags[0].attributes[1].deferred_method);
        assert_eq!(library.tags[0].variables[0].scope.as_deref(), Some("AT_BEGIN"));
        assert_eq!(library.tag_files[0].path, "/WEB-INF/tags/price.tag");
        assert!(library.validator.is_none());
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let descriptors = load_descriptors(r#"[{ "tags": [ { "name": "x" } ] }]"#).unwrap();
        let tag = &descriptors[0].tags[0];
        assert_eq!(tag.tag_class, "");
        assert!(tag.body_content.is_none());
        assert!(!tag.dynamic_attributes);
        assert!(descriptors[0].tlib_version.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let descriptors = load_descriptor_file(file.path()).unwrap();
        assert_eq!(descriptors[0].uri.as_deref(), Some("http://example.com/ui"));

        assert_matches!(load_descriptors("{"), Err(DescriptorError::Json(_)));
        assert_matches!(
            load_descriptor_file(Path::new("/definitely/missing.json")),
            Err(DescriptorError::Io { .. })
        );
    }
}
