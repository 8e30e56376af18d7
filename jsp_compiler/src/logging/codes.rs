//! Consolidated error codes and classification system
//!
//! Single source of truth for all error codes, their metadata, and classification functions.
//! Codes are grouped by the compiler stage that raises them.

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// CODE WRAPPER TYPE
// ============================================================================

/// Universal code wrapper for both error and success codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Code(&'static str);

impl Code {
    pub const fn new(code: &'static str) -> Self {
        Self(code)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// ERROR CLASSIFICATION TYPES
// ============================================================================

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Critical = 0,
    High = 1,
    Medium = 2,
    Low = 3,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Critical" => Some(Severity::Critical),
            "High" => Some(Severity::High),
            "Medium" => Some(Severity::Medium),
            "Low" => Some(Severity::Low),
            _ => None,
        }
    }
}

/// Complete metadata for an error code
#[derive(Debug, Clone)]
pub struct ErrorMetadata {
    pub code: &'static str,
    pub category: &'static str,
    pub severity: Severity,
    pub recoverable: bool,
    pub requires_halt: bool,
    pub description: &'static str,
    pub recommended_action: &'static str,
}

impl ErrorMetadata {
    pub fn new(
        code: &'static str,
        category: &'static str,
        severity: Severity,
        recoverable: bool,
        requires_halt: bool,
        description: &'static str,
        recommended_action: &'static str,
    ) -> Self {
        Self {
            code,
            category,
            severity,
            recoverable,
            requires_halt,
            description,
            recommended_action,
        }
    }
}

// ============================================================================
// ERROR CODE CONSTANTS
// ============================================================================

/// System error codes
pub mod system {
    use super::Code;

    pub const INTERNAL_ERROR: Code = Code::new("ERR001");
    pub const INITIALIZATION_FAILURE: Code = Code::new("ERR002");
}

/// Resource access error codes
pub mod resources {
    use super::Code;

    pub const RESOURCE_NOT_FOUND: Code = Code::new("E005");
    pub const RESOURCE_UNREADABLE: Code = Code::new("E006");
    pub const SOURCE_TOO_LARGE: Code = Code::new("E007");
    pub const INVALID_ENCODING: Code = Code::new("E008");
    pub const INCLUDE_CYCLE: Code = Code::new("E009");
    pub const INCLUDE_TOO_DEEP: Code = Code::new("E010");
}

/// Lexical error codes (malformed or unterminated constructs)
pub mod lexical {
    use super::Code;

    pub const UNTERMINATED_CONSTRUCT: Code = Code::new("E020");
    pub const UNTERMINATED_ATTRIBUTE: Code = Code::new("E021");
    pub const MISSING_QUOTE: Code = Code::new("E022");
    pub const MISSING_EQUALS: Code = Code::new("E023");
    pub const MISSING_WHITESPACE: Code = Code::new("E024");
    pub const INVALID_ATTRIBUTE_NAME: Code = Code::new("E025");
}

/// Grammar error codes
pub mod syntax {
    use super::Code;

    pub const INVALID_DIRECTIVE: Code = Code::new("E040");
    pub const DIRECTIVE_NOT_ALLOWED: Code = Code::new("E041");
    pub const INVALID_STANDARD_ACTION: Code = Code::new("E042");
    pub const MISPLACED_ACTION: Code = Code::new("E043");
    pub const UNBALANCED_END_TAG: Code = Code::new("E044");
    pub const INVALID_BODY: Code = Code::new("E045");
    pub const SCRIPTING_NOT_ALLOWED: Code = Code::new("E046");
    pub const XML_SYNTAX_UNSUPPORTED: Code = Code::new("E047");
    pub const NESTING_TOO_DEEP: Code = Code::new("E048");
    pub const DUPLICATE_ATTRIBUTE: Code = Code::new("E049");
}

/// Directive consistency error codes
pub mod directive {
    use super::Code;

    pub const CONFLICTING_DIRECTIVE: Code = Code::new("E060");
    pub const DUPLICATE_DIRECTIVE_ATTRIBUTE: Code = Code::new("E061");
    pub const ENCODING_MISMATCH: Code = Code::new("E062");
    pub const INVALID_DIRECTIVE_VALUE: Code = Code::new("E063");
}

/// Name resolution error codes
pub mod resolution {
    use super::Code;

    pub const UNBOUND_PREFIX: Code = Code::new("E080");
    pub const UNKNOWN_TAG: Code = Code::new("E081");
    pub const TAGLIB_NOT_FOUND: Code = Code::new("E082");
    pub const TAG_FILE_NOT_FOUND: Code = Code::new("E083");
    pub const PREFIX_REDEFINED: Code = Code::new("E084");
    pub const PREFIX_IN_USE: Code = Code::new("E085");
    pub const UNKNOWN_FUNCTION: Code = Code::new("E086");
    pub const FUNCTION_CLASS_NOT_FOUND: Code = Code::new("E087");
    pub const FUNCTION_METHOD_NOT_FOUND: Code = Code::new("E088");
    pub const INVALID_FUNCTION_SIGNATURE: Code = Code::new("E089");
    pub const HANDLER_CLASS_NOT_FOUND: Code = Code::new("E090");
    pub const INVALID_TAGLIB_DESCRIPTOR: Code = Code::new("E091");
    pub const MISSING_FUNCTION_PREFIX: Code = Code::new("E092");
}

/// Attribute contract error codes
pub mod attribute {
    use super::Code;

    pub const MISSING_ATTRIBUTE: Code = Code::new("E100");
    pub const UNKNOWN_ATTRIBUTE: Code = Code::new("E101");
    pub const ATTRIBUTE_SPECIFIED_TWICE: Code = Code::new("E102");
    pub const EXPRESSION_NOT_ALLOWED: Code = Code::new("E103");
    pub const MIXED_EL_DELIMITERS: Code = Code::new("E104");
    pub const LITERAL_NOT_COERCIBLE: Code = Code::new("E105");
    pub const VOID_DEFERRED_LITERAL: Code = Code::new("E106");
    pub const DYNAMIC_ATTRIBUTES_UNSUPPORTED: Code = Code::new("E107");
    pub const INVALID_ACTION_USAGE: Code = Code::new("E108");
    pub const UNKNOWN_ATTRIBUTE_TYPE: Code = Code::new("E109");
    pub const TAG_VALIDATION_FAILED: Code = Code::new("E110");
}

/// Expression language error codes
pub mod expression {
    use super::Code;

    pub const EL_SYNTAX: Code = Code::new("E120");
    pub const DEFERRED_IN_TEMPLATE_TEXT: Code = Code::new("E121");
}

/// Tag file error codes
pub mod tagfile {
    use super::Code;

    pub const INVALID_TAG_DIRECTIVE: Code = Code::new("E140");
    pub const DUPLICATE_NAME: Code = Code::new("E141");
    pub const INVALID_VARIABLE_DIRECTIVE: Code = Code::new("E142");
    pub const INVALID_ATTRIBUTE_DIRECTIVE: Code = Code::new("E143");
    pub const NAME_FROM_ATTRIBUTE_INVALID: Code = Code::new("E144");
    pub const TAG_FILE_COMPILE_FAILED: Code = Code::new("E145");
    pub const INVALID_IMPLICIT_MANIFEST: Code = Code::new("E146");
}

/// Tag plugin error codes
pub mod plugin {
    use super::Code;

    pub const INVALID_PLUGIN_MANIFEST: Code = Code::new("E160");
    pub const PLUGIN_NOT_FOUND: Code = Code::new("E161");
}

/// Compile error mapping codes
pub mod mapping {
    use super::Code;

    pub const UNMAPPED_COMPILE_ERROR: Code = Code::new("W180");
    pub const COMPILE_ERRORS: Code = Code::new("E181");
}

// ============================================================================
// SUCCESS CODE CONSTANTS
// ============================================================================

/// Success codes
pub mod success {
    use super::Code;

    pub const OPERATION_COMPLETED_SUCCESSFULLY: Code = Code::new("I001");
    pub const SYSTEM_INITIALIZATION_COMPLETED: Code = Code::new("I004");
    pub const PAGE_COMPILED: Code = Code::new("I006");
    pub const BATCH_COMPLETE: Code = Code::new("I007");
    pub const RESOURCE_LOADED: Code = Code::new("I010");
    pub const PARSE_COMPLETE: Code = Code::new("I040");
    pub const DIRECTIVES_EXTRACTED: Code = Code::new("I041");
    pub const DIRECTIVE_VALIDATION_PASSED: Code = Code::new("I060");
    pub const TAGLIB_RESOLVED: Code = Code::new("I080");
    pub const VALIDATION_COMPLETE: Code = Code::new("I100");
    pub const TAG_FILE_COMPILED: Code = Code::new("I140");
    pub const PROTOTYPE_COMPILED: Code = Code::new("I141");
    pub const PLUGINS_APPLIED: Code = Code::new("I160");
}

// ============================================================================
// ERROR METADATA REGISTRY
// ============================================================================

/// Error metadata registry using OnceLock for thread safety
static ERROR_REGISTRY: OnceLock<HashMap<&'static str, ErrorMetadata>> = OnceLock::new();

/// Initialize and get the error registry
fn get_error_registry() -> &'static HashMap<&'static str, ErrorMetadata> {
    ERROR_REGISTRY.get_or_init(|| {
        let mut registry = HashMap::new();

        // System
        registry.insert(
            "ERR001",
            ErrorMetadata::new(
                "ERR001",
                "System",
                Severity::Critical,
                false,
                true,
                "Critical internal compiler error",
                "File a bug report with the failing template",
            ),
        );
        registry.insert(
            "ERR002",
            ErrorMetadata::new(
                "ERR002",
                "System",
                Severity::Critical,
                false,
                true,
                "Compiler initialization failure",
                "Check configuration and logging setup",
            ),
        );

        // Resources
        registry.insert(
            "E005",
            ErrorMetadata::new(
                "E005",
                "Resources",
                Severity::High,
                false,
                false,
                "Referenced resource does not exist",
                "Check the path relative to the web root",
            ),
        );
        registry.insert(
            "E006",
            ErrorMetadata::new(
                "E006",
                "Resources",
                Severity::High,
                false,
                false,
                "Resource could not be read",
                "Check file permissions",
            ),
        );
        registry.insert(
            "E007",
            ErrorMetadata::new(
                "E007",
                "Resources",
                Severity::Medium,
                false,
                false,
                "Template source exceeds the size limit",
                "Split the template into smaller includes",
            ),
        );
        registry.insert(
            "E008",
            ErrorMetadata::new(
                "E008",
                "Resources",
                Severity::Medium,
                false,
                false,
                "Template bytes are not valid for the page encoding",
                "Declare the correct pageEncoding or re-save the file",
            ),
        );
        registry.insert(
            "E009",
            ErrorMetadata::new(
                "E009",
                "Resources",
                Severity::High,
                false,
                false,
                "A file includes itself directly or transitively",
                "Remove the recursive include directive",
            ),
        );
        registry.insert(
            "E010",
            ErrorMetadata::new(
                "E010",
                "Resources",
                Severity::High,
                false,
                false,
                "Include directives nest too deeply",
                "Flatten the include hierarchy",
            ),
        );

        // Lexical
        registry.insert(
            "E020",
            ErrorMetadata::new(
                "E020",
                "Lexical",
                Severity::High,
                false,
                true,
                "Construct is not terminated before end of input",
                "Add the missing closing delimiter",
            ),
        );
        registry.insert(
            "E021",
            ErrorMetadata::new(
                "E021",
                "Lexical",
                Severity::High,
                false,
                true,
                "Attribute value is not terminated",
                "Close the quoted attribute value",
            ),
        );
        registry.insert(
            "E022",
            ErrorMetadata::new(
                "E022",
                "Lexical",
                Severity::High,
                false,
                true,
                "Attribute value is not quoted",
                "Quote the attribute value",
            ),
        );
        registry.insert(
            "E023",
            ErrorMetadata::new(
                "E023",
                "Lexical",
                Severity::High,
                false,
                true,
                "Attribute name is not followed by '='",
                "Add '=' between the attribute name and value",
            ),
        );
        registry.insert(
            "E024",
            ErrorMetadata::new(
                "E024",
                "Lexical",
                Severity::Medium,
                false,
                false,
                "Attributes are not separated by whitespace",
                "Insert whitespace between attributes",
            ),
        );
        registry.insert(
            "E025",
            ErrorMetadata::new(
                "E025",
                "Lexical",
                Severity::Medium,
                false,
                false,
                "Attribute name is malformed or uses an unbound prefix",
                "Fix the attribute name",
            ),
        );

        // Syntax
        registry.insert(
            "E040",
            ErrorMetadata::new(
                "E040",
                "Syntax",
                Severity::High,
                false,
                false,
                "Unknown directive",
                "Use page, include, taglib, tag, attribute or variable",
            ),
        );
        registry.insert(
            "E041",
            ErrorMetadata::new(
                "E041",
                "Syntax",
                Severity::High,
                false,
                false,
                "Directive is not legal in this kind of file",
                "Move the directive to a page or tag file as appropriate",
            ),
        );
        registry.insert(
            "E042",
            ErrorMetadata::new(
                "E042",
                "Syntax",
                Severity::High,
                false,
                false,
                "Unknown standard action",
                "Check the jsp: action name",
            ),
        );
        registry.insert(
            "E043",
            ErrorMetadata::new(
                "E043",
                "Syntax",
                Severity::High,
                false,
                false,
                "Action used outside of its legal parent",
                "Move the action into a valid parent element",
            ),
        );
        registry.insert(
            "E044",
            ErrorMetadata::new(
                "E044",
                "Syntax",
                Severity::High,
                false,
                false,
                "End tag without matching start tag",
                "Remove the end tag or add its start tag",
            ),
        );
        registry.insert(
            "E045",
            ErrorMetadata::new(
                "E045",
                "Syntax",
                Severity::High,
                false,
                false,
                "Element body does not match its declared body content",
                "Adjust the body to the declared content kind",
            ),
        );
        registry.insert(
            "E046",
            ErrorMetadata::new(
                "E046",
                "Syntax",
                Severity::High,
                false,
                false,
                "Scripting element inside a scriptless body",
                "Replace scripting with expression language or actions",
            ),
        );
        registry.insert(
            "E047",
            ErrorMetadata::new(
                "E047",
                "Syntax",
                Severity::High,
                false,
                true,
                "XML-syntax documents are not translated",
                "Use the standard syntax",
            ),
        );
        registry.insert(
            "E048",
            ErrorMetadata::new(
                "E048",
                "Syntax",
                Severity::High,
                false,
                true,
                "Elements nest deeper than the configured limit",
                "Reduce element nesting",
            ),
        );
        registry.insert(
            "E049",
            ErrorMetadata::new(
                "E049",
                "Syntax",
                Severity::Medium,
                false,
                false,
                "Attribute appears twice on one element",
                "Remove the duplicate attribute",
            ),
        );

        // Directive
        registry.insert(
            "E060",
            ErrorMetadata::new(
                "E060",
                "Directive",
                Severity::High,
                false,
                false,
                "Directive attribute repeated with a different value",
                "Use one consistent value for the attribute",
            ),
        );
        registry.insert(
            "E061",
            ErrorMetadata::new(
                "E061",
                "Directive",
                Severity::Medium,
                false,
                false,
                "Directive attribute may only appear once per file",
                "Remove the repeated attribute",
            ),
        );
        registry.insert(
            "E062",
            ErrorMetadata::new(
                "E062",
                "Directive",
                Severity::High,
                false,
                false,
                "Declared page encodings disagree",
                "Align pageEncoding with the configured or detected encoding",
            ),
        );
        registry.insert(
            "E063",
            ErrorMetadata::new(
                "E063",
                "Directive",
                Severity::Medium,
                false,
                false,
                "Directive attribute value is not valid",
                "Use a value accepted by the attribute",
            ),
        );

        // Resolution
        registry.insert(
            "E080",
            ErrorMetadata::new(
                "E080",
                "Resolution",
                Severity::High,
                false,
                false,
                "Tag prefix is not bound to a tag library",
                "Add a taglib directive for the prefix",
            ),
        );
        registry.insert(
            "E081",
            ErrorMetadata::new(
                "E081",
                "Resolution",
                Severity::High,
                false,
                false,
                "Tag is not declared by its library",
                "Check the tag name against the library",
            ),
        );
        registry.insert(
            "E082",
            ErrorMetadata::new(
                "E082",
                "Resolution",
                Severity::High,
                false,
                false,
                "Tag library cannot be resolved",
                "Register the descriptor or fix the uri",
            ),
        );
        registry.insert(
            "E083",
            ErrorMetadata::new(
                "E083",
                "Resolution",
                Severity::High,
                false,
                false,
                "Tag file cannot be found",
                "Check the tag file path",
            ),
        );
        registry.insert(
            "E084",
            ErrorMetadata::new(
                "E084",
                "Resolution",
                Severity::High,
                false,
                false,
                "Prefix rebound to a different library",
                "Use a distinct prefix",
            ),
        );
        registry.insert(
            "E085",
            ErrorMetadata::new(
                "E085",
                "Resolution",
                Severity::High,
                false,
                false,
                "Prefix was already used by a non-custom tag",
                "Choose another prefix",
            ),
        );
        registry.insert(
            "E086",
            ErrorMetadata::new(
                "E086",
                "Resolution",
                Severity::High,
                false,
                false,
                "Function is not declared by the bound library",
                "Check the function name",
            ),
        );
        registry.insert(
            "E087",
            ErrorMetadata::new(
                "E087",
                "Resolution",
                Severity::High,
                false,
                false,
                "Function class is not available",
                "Register the function class",
            ),
        );
        registry.insert(
            "E088",
            ErrorMetadata::new(
                "E088",
                "Resolution",
                Severity::High,
                false,
                false,
                "Function method is not available with the declared signature",
                "Fix the function signature",
            ),
        );
        registry.insert(
            "E089",
            ErrorMetadata::new(
                "E089",
                "Resolution",
                Severity::High,
                false,
                false,
                "Function signature is malformed",
                "Use 'ret name(type, ...)' form",
            ),
        );
        registry.insert(
            "E090",
            ErrorMetadata::new(
                "E090",
                "Resolution",
                Severity::High,
                false,
                false,
                "Tag handler class is not available",
                "Register the handler class",
            ),
        );
        registry.insert(
            "E091",
            ErrorMetadata::new(
                "E091",
                "Resolution",
                Severity::High,
                false,
                false,
                "Tag library descriptor is malformed",
                "Correct the descriptor",
            ),
        );
        registry.insert(
            "E092",
            ErrorMetadata::new(
                "E092",
                "Resolution",
                Severity::High,
                false,
                false,
                "Function call without a prefix",
                "Qualify the function with a bound prefix",
            ),
        );

        // Attribute
        registry.insert(
            "E100",
            ErrorMetadata::new(
                "E100",
                "Attribute",
                Severity::High,
                false,
                false,
                "Mandatory attribute is missing",
                "Supply the attribute",
            ),
        );
        registry.insert(
            "E101",
            ErrorMetadata::new(
                "E101",
                "Attribute",
                Severity::High,
                false,
                false,
                "Attribute is not accepted by the element",
                "Remove the attribute",
            ),
        );
        registry.insert(
            "E102",
            ErrorMetadata::new(
                "E102",
                "Attribute",
                Severity::High,
                false,
                false,
                "Attribute given both inline and as jsp:attribute",
                "Keep only one form",
            ),
        );
        registry.insert(
            "E103",
            ErrorMetadata::new(
                "E103",
                "Attribute",
                Severity::High,
                false,
                false,
                "Expression supplied for a literal-only attribute",
                "Use a literal value",
            ),
        );
        registry.insert(
            "E104",
            ErrorMetadata::new(
                "E104",
                "Attribute",
                Severity::High,
                false,
                false,
                "Attribute mixes ${} and #{} expressions",
                "Use a single expression flavor",
            ),
        );
        registry.insert(
            "E105",
            ErrorMetadata::new(
                "E105",
                "Attribute",
                Severity::Medium,
                false,
                false,
                "Literal cannot be coerced to the declared type",
                "Use a literal of the declared type",
            ),
        );
        registry.insert(
            "E106",
            ErrorMetadata::new(
                "E106",
                "Attribute",
                Severity::Medium,
                false,
                false,
                "Literal given for a void deferred method",
                "Use a method expression",
            ),
        );
        registry.insert(
            "E107",
            ErrorMetadata::new(
                "E107",
                "Attribute",
                Severity::High,
                false,
                false,
                "Tag declares dynamic attributes but the handler does not support them",
                "Implement dynamic attribute support",
            ),
        );
        registry.insert(
            "E108",
            ErrorMetadata::new(
                "E108",
                "Attribute",
                Severity::Medium,
                false,
                false,
                "Standard action attributes are inconsistent",
                "Follow the action's attribute rules",
            ),
        );
        registry.insert(
            "E109",
            ErrorMetadata::new(
                "E109",
                "Attribute",
                Severity::Medium,
                false,
                false,
                "Declared attribute type is unknown",
                "Register the type or fix the declaration",
            ),
        );
        registry.insert(
            "E110",
            ErrorMetadata::new(
                "E110",
                "Attribute",
                Severity::High,
                false,
                false,
                "Tag extra info or library validator rejected the page",
                "Address the validator messages",
            ),
        );

        // Expression
        registry.insert(
            "E120",
            ErrorMetadata::new(
                "E120",
                "Expression",
                Severity::High,
                false,
                false,
                "Expression language syntax error",
                "Fix the expression",
            ),
        );
        registry.insert(
            "E121",
            ErrorMetadata::new(
                "E121",
                "Expression",
                Severity::High,
                false,
                false,
                "#{...} used in template text",
                "Escape the delimiter or allow deferred syntax as literal",
            ),
        );

        // TagFile
        registry.insert(
            "E140",
            ErrorMetadata::new(
                "E140",
                "TagFile",
                Severity::High,
                false,
                false,
                "Tag directive is invalid",
                "Fix the tag directive",
            ),
        );
        registry.insert(
            "E141",
            ErrorMetadata::new(
                "E141",
                "TagFile",
                Severity::High,
                false,
                false,
                "Attribute or variable name declared twice",
                "Rename one of the declarations",
            ),
        );
        registry.insert(
            "E142",
            ErrorMetadata::new(
                "E142",
                "TagFile",
                Severity::High,
                false,
                false,
                "Variable directive is invalid",
                "Fix the variable directive",
            ),
        );
        registry.insert(
            "E143",
            ErrorMetadata::new(
                "E143",
                "TagFile",
                Severity::High,
                false,
                false,
                "Attribute directive is invalid",
                "Fix the attribute directive",
            ),
        );
        registry.insert(
            "E144",
            ErrorMetadata::new(
                "E144",
                "TagFile",
                Severity::High,
                false,
                false,
                "name-from-attribute refers to an unsuitable attribute",
                "Reference a required, static String attribute",
            ),
        );
        registry.insert(
            "E145",
            ErrorMetadata::new(
                "E145",
                "TagFile",
                Severity::High,
                false,
                false,
                "Tag file failed to compile",
                "Fix the errors reported for the tag file",
            ),
        );
        registry.insert(
            "E146",
            ErrorMetadata::new(
                "E146",
                "TagFile",
                Severity::Medium,
                false,
                false,
                "Implicit tag library manifest is invalid",
                "Fix implicit.toml",
            ),
        );

        // Plugin
        registry.insert(
            "E160",
            ErrorMetadata::new(
                "E160",
                "Plugin",
                Severity::High,
                false,
                false,
                "Tag plugin manifest is malformed",
                "Fix tagPlugins.toml",
            ),
        );
        registry.insert(
            "E161",
            ErrorMetadata::new(
                "E161",
                "Plugin",
                Severity::High,
                false,
                false,
                "Tag plugin implementation is not registered",
                "Register the plugin class",
            ),
        );

        // Mapping
        registry.insert(
            "W180",
            ErrorMetadata::new(
                "W180",
                "Mapping",
                Severity::Low,
                true,
                false,
                "Generated-code error could not be mapped to a template node",
                "Inspect the generated source line",
            ),
        );
        registry.insert(
            "E181",
            ErrorMetadata::new(
                "E181",
                "Mapping",
                Severity::High,
                false,
                false,
                "Generated code failed to compile",
                "Fix the reported template locations",
            ),
        );

        // Success codes
        registry.insert(
            "I001",
            ErrorMetadata::new(
                "I001",
                "General",
                Severity::Low,
                true,
                false,
                "Operation completed successfully",
                "No action required",
            ),
        );
        registry.insert(
            "I004",
            ErrorMetadata::new(
                "I004",
                "General",
                Severity::Low,
                true,
                false,
                "System initialization completed",
                "No action required",
            ),
        );
        registry.insert(
            "I006",
            ErrorMetadata::new(
                "I006",
                "General",
                Severity::Low,
                true,
                false,
                "Page compiled",
                "No action required",
            ),
        );
        registry.insert(
            "I007",
            ErrorMetadata::new(
                "I007",
                "General",
                Severity::Low,
                true,
                false,
                "Batch complete",
                "No action required",
            ),
        );
        registry.insert(
            "I010",
            ErrorMetadata::new(
                "I010",
                "Resources",
                Severity::Low,
                true,
                false,
                "Resource loaded",
                "No action required",
            ),
        );
        registry.insert(
            "I040",
            ErrorMetadata::new(
                "I040",
                "Syntax",
                Severity::Low,
                true,
                false,
                "Parse complete",
                "No action required",
            ),
        );
        registry.insert(
            "I041",
            ErrorMetadata::new(
                "I041",
                "Syntax",
                Severity::Low,
                true,
                false,
                "Directives extracted",
                "No action required",
            ),
        );
        registry.insert(
            "I060",
            ErrorMetadata::new(
                "I060",
                "Directive",
                Severity::Low,
                true,
                false,
                "Directive validation passed",
                "No action required",
            ),
        );
        registry.insert(
            "I080",
            ErrorMetadata::new(
                "I080",
                "Resolution",
                Severity::Low,
                true,
                false,
                "Taglib resolved",
                "No action required",
            ),
        );
        registry.insert(
            "I100",
            ErrorMetadata::new(
                "I100",
                "Attribute",
                Severity::Low,
                true,
                false,
                "Validation complete",
                "No action required",
            ),
        );
        registry.insert(
            "I140",
            ErrorMetadata::new(
                "I140",
                "TagFile",
                Severity::Low,
                true,
                false,
                "Tag file compiled",
                "No action required",
            ),
        );
        registry.insert(
            "I141",
            ErrorMetadata::new(
                "I141",
                "TagFile",
                Severity::Low,
                true,
                false,
                "Prototype compiled",
                "No action required",
            ),
        );
        registry.insert(
            "I160",
            ErrorMetadata::new(
                "I160",
                "Plugin",
                Severity::Low,
                true,
                false,
                "Plugins applied",
                "No action required",
            ),
        );

        registry
    })
}

// ============================================================================
// CLASSIFICATION FUNCTIONS
// ============================================================================

/// Get error metadata for a specific error code
pub fn get_error_metadata(code: &str) -> Option<&'static ErrorMetadata> {
    get_error_registry().get(code)
}

/// Get error severity from error code
pub fn get_severity(code: &str) -> Severity {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.severity)
        .unwrap_or(Severity::Medium)
}

/// Check if error is recoverable
pub fn is_recoverable(code: &str) -> bool {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.recoverable)
        .unwrap_or(true)
}

/// Check if error requires immediate halt
pub fn requires_halt(code: &str) -> bool {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.requires_halt)
        .unwrap_or(false)
}

/// Get human-readable description for error code
pub fn get_description(code: &str) -> &'static str {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.description)
        .unwrap_or("Unknown error")
}

/// Get recommended action for error code
pub fn get_action(code: &str) -> &'static str {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.recommended_action)
        .unwrap_or("No specific action available")
}

/// Get error category from error code
pub fn get_category(code: &str) -> &'static str {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.category)
        .unwrap_or("Unknown")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_stage_code_has_metadata() {
        for code in [
            system::INTERNAL_ERROR,
            resources::INCLUDE_CYCLE,
            lexical::UNTERMINATED_CONSTRUCT,
            syntax::SCRIPTING_NOT_ALLOWED,
            directive::CONFLICTING_DIRECTIVE,
            resolution::UNBOUND_PREFIX,
            attribute::ATTRIBUTE_SPECIFIED_TWICE,
            expression::EL_SYNTAX,
            tagfile::DUPLICATE_NAME,
            plugin::INVALID_PLUGIN_MANIFEST,
            mapping::UNMAPPED_COMPILE_ERROR,
            success::PAGE_COMPILED,
        ] {
            assert!(get_error_metadata(code.as_str()).is_some(), "{}", code);
        }
    }

    #[test]
    fn test_classification_defaults_for_unknown_code() {
        assert_eq!(get_severity("E999"), Severity::Medium);
        assert!(is_recoverable("E999"));
        assert!(!requires_halt("E999"));
        assert_eq!(get_category("E999"), "Unknown");
    }

    #[test]
    fn test_unterminated_constructs_halt() {
        assert!(requires_halt(lexical::UNTERMINATED_CONSTRUCT.as_str()));
        assert!(!requires_halt(directive::CONFLICTING_DIRECTIVE.as_str()));
        assert_eq!(get_category(tagfile::DUPLICATE_NAME.as_str()), "TagFile");
    }
}
