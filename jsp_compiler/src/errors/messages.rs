//! Diagnostic message catalogue
//!
//! Every translation diagnostic text is produced here so wording stays
//! consistent between the parser, the validator and the tag-file processor.

// Resources and includes

pub fn file_not_found(path: &str) -> String {
    format!("File \"{}\" not found", path)
}

pub fn error_reading_file(path: &str) -> String {
    format!("Error reading file \"{}\"", path)
}

pub fn error_including(path: &str) -> String {
    format!("Unable to include {}", path)
}

pub fn recursive_include(path: &str) -> String {
    format!("Recursive include of file {}", path)
}

pub fn include_too_deep(path: &str, max: usize) -> String {
    format!("Include of {} exceeds the maximum depth of {}", path, max)
}

pub fn xml_syntax_unsupported(path: &str) -> String {
    format!(
        "{} uses the XML syntax, which is not supported; use the standard syntax",
        path
    )
}

pub fn unsupported_encoding(encoding: &str) -> String {
    format!("Unsupported encoding: {}", encoding)
}

// Lexical

pub fn unterminated_tag(tag: &str) -> String {
    format!("Unterminated {} tag", tag)
}

pub fn unterminated_el(opener: &str) -> String {
    format!("The expression starting with {} is not terminated", opener)
}

pub fn unterminated_attribute(end: &str) -> String {
    format!("Attribute for {} is not properly terminated", end)
}

pub fn missing_equal() -> String {
    "Equal symbol expected".to_string()
}

pub fn missing_quote() -> String {
    "Quote symbol expected".to_string()
}

pub fn attribute_no_whitespace() -> String {
    "Attributes must be separated by whitespace".to_string()
}

pub fn missing_escaping(value: &str, quote: char) -> String {
    format!(
        "Attribute value {} is quoted with {} which must be escaped when used within the value",
        value, quote
    )
}

pub fn invalid_attribute_prefix(prefix: &str) -> String {
    format!(
        "The attribute prefix {} does not correspond to any imported tag library",
        prefix
    )
}

// Syntax

pub fn duplicate_attribute_in_element(name: &str) -> String {
    format!("Attribute \"{}\" appears more than once in the same element", name)
}

pub fn invalid_directive() -> String {
    "Invalid directive".to_string()
}

pub fn invalid_directive_in_tag_file(directive: &str) -> String {
    format!("{} directive cannot be used in a tag file", directive)
}

pub fn invalid_directive_in_page(directive: &str) -> String {
    format!("{} directive can only be used in a tag file", directive)
}

pub fn action_only_in_tag_file(action: &str) -> String {
    format!("{} can only be used in a tag file", action)
}

pub fn invalid_scripting_element() -> String {
    "Scripting elements are disallowed here".to_string()
}

pub fn invalid_template_text_body(what: &str) -> String {
    format!("{} not allowed in a template text body", what)
}

pub fn invalid_tag_in_template_text_body() -> String {
    "Custom tag is not allowed in a template text body".to_string()
}

pub fn unbalanced_end_tag(action: &str) -> String {
    format!("The end tag \"</{}\" is unbalanced", action)
}

pub fn invalid_standard_action() -> String {
    "Invalid standard action".to_string()
}

pub fn invalid_jsp_attribute() -> String {
    "jsp:attribute must be the subelement of a standard or custom action".to_string()
}

pub fn invalid_jsp_body() -> String {
    "jsp:body must be the subelement of a standard or custom action".to_string()
}

pub fn invalid_jsp_fallback() -> String {
    "jsp:fallback must be a direct child of jsp:plugin".to_string()
}

pub fn invalid_jsp_params() -> String {
    "jsp:params must be a direct child of jsp:plugin".to_string()
}

pub fn invalid_jsp_param() -> String {
    "The jsp:param action must not be used outside the jsp:include, jsp:forward, or jsp:params elements"
        .to_string()
}

pub fn missing_param_action() -> String {
    "Expecting \"jsp:param\" standard action with \"name\" and \"value\" attributes".to_string()
}

pub fn invalid_empty_body_tag(tag: &str) -> String {
    format!("The {} tag can only have jsp:attribute in its body", tag)
}

pub fn invalid_tag_body(tag: &str) -> String {
    format!(
        "Must use jsp:body to specify tag body for {} if jsp:attribute is used.",
        tag
    )
}

pub fn invalid_empty_tag_subelements(tag: &str) -> String {
    format!("According to TLD, tag {} must be empty, but is not", tag)
}

pub fn invalid_jsp_attribute_nesting() -> String {
    "A jsp:attribute standard action cannot be nested within another jsp:attribute standard action"
        .to_string()
}

pub fn invalid_jsp_body_nesting() -> String {
    "A jsp:body standard action cannot be nested within another jsp:body or jsp:attribute standard action"
        .to_string()
}

pub fn invalid_jsp_output() -> String {
    "jsp:output can only appear at the top level of a page or tag file".to_string()
}

pub fn jsp_text_bad_content() -> String {
    "<jsp:text> must not have any subelements".to_string()
}

pub fn nesting_too_deep(max: usize) -> String {
    format!("Tags are nested more than {} levels deep", max)
}

// Resolution

pub fn unknown_tag_prefix(tag: &str, prefix: &str) -> String {
    format!(
        "No tag \"{}\" defined in tag library imported with prefix \"{}\"",
        tag, prefix
    )
}

pub fn unbound_tag_prefix(tag: &str, prefix: &str) -> String {
    format!(
        "The prefix \"{}\" of tag \"{}:{}\" is not bound to any tag library",
        prefix, prefix, tag
    )
}

pub fn error_loading_tag_handler(class: &str, tag: &str) -> String {
    format!("Unable to load tag handler class \"{}\" for tag \"{}\"", class, tag)
}

pub fn prefix_already_in_use(prefix: &str, file: &str, line: u32) -> String {
    format!(
        "The prefix {} specified in this tag directive has been previously used by an action in file {} line {}",
        prefix, file, line
    )
}

pub fn prefix_redefinition(prefix: &str, uri: &str, previous: &str) -> String {
    format!(
        "Attempt to redefine the prefix {} to {}, when it was already defined as {} in the current scope",
        prefix, uri, previous
    )
}

pub fn unresolvable_absolute_uri(uri: &str) -> String {
    format!(
        "The absolute uri: {} cannot be resolved in either web.xml or the jar files deployed with this application",
        uri
    )
}

pub fn duplicate_function_name(function: &str, library: &str) -> String {
    format!("Duplicate function name {} in tag library {}", function, library)
}

pub fn missing_required_tld_element(element: &str, library: &str) -> String {
    format!("Mandatory TLD element {} missing in {}", element, library)
}

pub fn error_loading_tag_extra_info(class: &str) -> String {
    format!("Failed to load or instantiate TagExtraInfo class: {}", class)
}

pub fn error_loading_tag_library_validator(class: &str) -> String {
    format!("Failed to load or instantiate TagLibraryValidator class: {}", class)
}

pub fn deferred_attribute_in_old_library(attribute: &str, library: &str) -> String {
    format!(
        "Attribute {} declares a deferred expression, which tag library {} is too old to support",
        attribute, library
    )
}

pub fn invalid_body_content_in_descriptor(content: &str, tag: &str) -> String {
    format!("Invalid body-content ({}) declared for tag {}", content, tag)
}

pub fn invalid_tag_file_directory(dir: &str) -> String {
    format!("Tag file directory {} does not start with \"/WEB-INF/tags\"", dir)
}

pub fn invalid_implicit_tld(path: &str) -> String {
    format!("Invalid implicit TLD for tag file at {}", path)
}

pub fn unknown_implicit_tld_key(path: &str, key: &str) -> String {
    format!("Unknown entry '{}' in implicit TLD {}", key, path)
}

pub fn invalid_implicit_tld_version(path: &str) -> String {
    format!("Invalid JSP version defined in implicit TLD for tag file at {}", path)
}

pub fn missing_function_prefix(function: &str) -> String {
    format!(
        "The function {} must be used with a prefix when a default namespace is not specified",
        function
    )
}

pub fn unknown_function_prefix(prefix: &str) -> String {
    format!(
        "The function prefix {} does not correspond to any imported tag library",
        prefix
    )
}

pub fn unknown_function(function: &str) -> String {
    format!("The function {} cannot be located with the specified prefix", function)
}

pub fn invalid_function_signature(prefix: &str, function: &str) -> String {
    format!(
        "Invalid syntax for function signature in TLD. Tag Library: {}, Function: {}",
        prefix, function
    )
}

pub fn invalid_function_signature_missing_paren(prefix: &str, function: &str) -> String {
    format!(
        "Invalid syntax for function signature in TLD. Parenthesis '(' expected. Tag Library: {}, Function: {}",
        prefix, function
    )
}

pub fn missing_function_class(class: &str, function: &str) -> String {
    format!(
        "The class {} specified in TLD for the function {} cannot be found",
        class, function
    )
}

pub fn missing_signature_class(class: &str, function: &str) -> String {
    format!(
        "The class {} specified in the method signature in TLD for the function {} cannot be found",
        class, function
    )
}

pub fn missing_method_in_class(method: &str, function: &str, class: &str) -> String {
    format!(
        "Method \"{}\" for function \"{}\" not found in class \"{}\"",
        method, function, class
    )
}

pub fn function_arity_mismatch(function: &str, expected: usize, found: usize) -> String {
    format!(
        "The function {} expects {} argument(s) but was called with {}",
        function, expected, found
    )
}

// Directives

pub fn conflicting_page_directive(attribute: &str, old: &str, new: &str) -> String {
    format!(
        "Page directive: illegal to have multiple occurrences of '{}' with different values (old: {}, new: {})",
        attribute, old, new
    )
}

pub fn conflicting_tag_directive(attribute: &str, old: &str, new: &str) -> String {
    format!(
        "Tag directive: illegal to have multiple occurrences of the attribute \"{}\" with different values (old: {}, new: {})",
        attribute, old, new
    )
}

pub fn invalid_page_directive_value(what: &str) -> String {
    format!("Page directive: invalid value for {}", what)
}

pub fn invalid_tag_directive_value(what: &str) -> String {
    format!("Tag directive: invalid value for {}", what)
}

pub fn unsupported_language(directive: &str) -> String {
    format!("{} directive: invalid language attribute", directive)
}

pub fn invalid_buffer_size() -> String {
    "Page directive: invalid buffer size".to_string()
}

pub fn auto_flush_without_buffer() -> String {
    "Page directive auto flush cannot be used with a buffer".to_string()
}

pub fn page_encoding_conflict_config(config: &str, directive: &str) -> String {
    format!(
        "Page-encoding specified in jsp-property-group ({}) is different from that specified in page directive ({})",
        config, directive
    )
}

pub fn page_encoding_conflict_prolog(prolog: &str, directive: &str) -> String {
    format!(
        "Page-encoding specified in XML prolog ({}) is different from that specified in page directive ({})",
        prolog, directive
    )
}

pub fn taglib_missing_location() -> String {
    "Neither 'uri' nor 'tagdir' attribute specified".to_string()
}

pub fn taglib_conflicting_location() -> String {
    "Both 'uri' and 'tagdir' attributes specified".to_string()
}

// Tag files

pub fn invalid_body_content_in_tag_directive(content: &str) -> String {
    format!("Invalid body-content ({}) in tag directive", content)
}

pub fn value_type_without_deferred_value() -> String {
    "Cannot specify a value type if 'deferredValue' is not 'true'".to_string()
}

pub fn method_signature_without_deferred_method() -> String {
    "Cannot specify a method signature if 'deferredMethod' is not 'true'".to_string()
}

pub fn both_deferred_value_and_method() -> String {
    "'deferredValue' and 'deferredMethod' cannot be both 'true'".to_string()
}

pub fn fragment_with_type() -> String {
    "Cannot specify both 'fragment' and 'type' attributes. If 'fragment' is present, 'type' is fixed as 'javax.servlet.jsp.tagext.JspFragment'"
        .to_string()
}

pub fn fragment_with_rtexprvalue() -> String {
    "Cannot specify both 'fragment' and 'rtexprvalue' attributes. If 'fragment' is present, 'rtexprvalue' is fixed as 'true'"
        .to_string()
}

pub fn invalid_tag_file_jsp_version(path: &str) -> String {
    format!("Invalid JSP version defined for tag file at {}", path)
}

pub fn variable_needs_a_name() -> String {
    "Either name-given or name-from-attribute attribute must be specified in a variable directive"
        .to_string()
}

pub fn variable_has_both_names() -> String {
    "Cannot specify both name-given or name-from-attribute attributes in a variable directive"
        .to_string()
}

pub fn variable_alias_mismatch() -> String {
    "Both or none of the name-from-attribute and alias attributes must be specified in a variable directive"
        .to_string()
}

pub fn invalid_scope(scope: &str) -> String {
    format!("Invalid scope {} specified", scope)
}

pub fn duplicate_names(name: &str, previous: &str, line: u32) -> String {
    format!(
        "The value of {} and the value of {} in line {} are the same",
        name, previous, line
    )
}

pub fn cannot_find_attribute(name: &str) -> String {
    format!(
        "Cannot find an attribute directive with a name attribute with a value \"{}\", the value of this name-from-attribute attribute.",
        name
    )
}

pub fn invalid_name_from_attribute(line: u32, name: &str) -> String {
    format!(
        "The attribute directive (declared in line {} and whose name attribute is \"{}\", the value of this name-from-attribute attribute) must be of type java.lang.String, is \"required\" and not a \"rtexprvalue\".",
        line, name
    )
}

pub fn tag_file_compile_failed(path: &str) -> String {
    format!("Unable to compile tag file {}", path)
}

// Attributes and actions

pub fn missing_mandatory_attribute(element: &str, attribute: &str) -> String {
    format!("{}: Mandatory attribute {} missing", element, attribute)
}

pub fn invalid_attribute(element: &str, attribute: &str) -> String {
    format!("{} has invalid attribute: {}", element, attribute)
}

pub fn attribute_specified_twice(attribute: &str) -> String {
    format!(
        "The attribute {} specified in the standard or custom action also appears as the value of the name attribute in the enclosed jsp:attribute",
        attribute
    )
}

pub fn invalid_attribute_for_tag(attribute: &str, tag: &str) -> String {
    format!("Attribute {} invalid for tag {} according to TLD", attribute, tag)
}

pub fn no_expression_allowed(attribute: &str) -> String {
    format!(
        "According to TLD or attribute directive in tag file, attribute {} does not accept any expressions",
        attribute
    )
}

pub fn no_expression_allowed_in_action(attribute: &str, action: &str) -> String {
    format!(
        "The {} attribute of the {} standard action does not accept any expressions",
        attribute, action
    )
}

pub fn both_el_types() -> String {
    "Cannot use both ${} and #{} EL expressions in the same attribute value".to_string()
}

pub fn literal_with_void_deferred_method(attribute: &str) -> String {
    format!(
        "A literal value was specified for attribute {} that is defined as a deferred method with a return type of void. Literal values are not permitted in this case",
        attribute
    )
}

pub fn unknown_attribute_type(attribute_type: &str, attribute: &str) -> String {
    format!(
        "Unknown attribute type ({}) was declared for attribute {}",
        attribute_type, attribute
    )
}

pub fn error_coercing_attribute(attribute: &str, attribute_type: &str, value: &str) -> String {
    format!(
        "Cannot coerce value ({}) to type ({}) for attribute {}",
        value, attribute_type, attribute
    )
}

pub fn invalid_expression(value: &str) -> String {
    format!("{} contains invalid expression(s)", value)
}

pub fn deferred_in_template_text() -> String {
    "#{..} is not allowed in template text".to_string()
}

pub fn invalid_simple_tag_body_content(class: &str) -> String {
    format!(
        "The TLD for the class {} specifies an invalid body-content (JSP) for a SimpleTag",
        class
    )
}

pub fn unimplemented_dynamic_attributes(tag: &str) -> String {
    format!(
        "The {} tag declares that it accepts dynamic attributes but does not implement the required interface",
        tag
    )
}

pub fn tei_with_variable_subelements(tag: &str) -> String {
    format!(
        "Tag {} has one or more variable subelements and a TagExtraInfo class that returns one or more VariableInfo",
        tag
    )
}

pub fn error_validating_tag(tag: &str) -> String {
    format!("Validation error messages from TagExtraInfo for {}", tag)
}

pub fn error_validating_taglibrary(taglib: &str, page: &str) -> String {
    format!(
        "Validation error messages from TagLibraryValidator for {} in {}",
        taglib, page
    )
}

pub fn missing_mandatory_name_attribute() -> String {
    "Mandatory XML-style 'name' attribute missing".to_string()
}

pub fn invalid_empty_jsp_params() -> String {
    "jsp:params must contain at least one nested jsp:param".to_string()
}

pub fn invalid_set_property() -> String {
    "setProperty: can't have non-null value when property=*".to_string()
}

pub fn invalid_set_property_either_param() -> String {
    "setProperty: can't have non-null value with param".to_string()
}

pub fn missing_use_bean_type() -> String {
    "Missing type for useBean".to_string()
}

pub fn duplicate_use_bean_name(name: &str) -> String {
    format!("Duplicate bean name: {}", name)
}

pub fn session_scope_without_session() -> String {
    "Illegal for useBean to use session scope when JSP page declares (via page directive) that it does not participate in sessions"
        .to_string()
}

pub fn use_bean_class_and_bean_name() -> String {
    "Cannot use both class and beanName attributes in useBean".to_string()
}

pub fn invalid_use_bean_class(class: &str) -> String {
    format!("The value for the useBean class attribute {} is invalid", class)
}

pub fn missing_plugin_type() -> String {
    "Type not declared in plugin".to_string()
}

pub fn bad_plugin_type(plugin_type: &str) -> String {
    format!(
        "Illegal value {} for 'type' attribute in plugin: must be 'bean' or 'applet'",
        plugin_type
    )
}

pub fn missing_plugin_code() -> String {
    "Code not declared in plugin".to_string()
}

pub fn jsp_output_body() -> String {
    "<jsp:output> must not have a body".to_string()
}

pub fn jsp_output_conflict(attribute: &str, old: &str, new: &str) -> String {
    format!(
        "<jsp:output>: illegal to have multiple occurrences of \"{}\" with different values (old: {}, new: {})",
        attribute, old, new
    )
}

pub fn jsp_output_doctype() -> String {
    "<jsp:output>: 'doctype-root-element' and 'doctype-system' attributes must appear together"
        .to_string()
}

pub fn jsp_output_missing_doctype() -> String {
    "<jsp:output>: 'doctype-system' attribute must appear if 'doctype-public' attribute appears"
        .to_string()
}

pub fn missing_var_attribute() -> String {
    "Missing 'var' or 'varReader' attribute".to_string()
}

pub fn both_var_attributes() -> String {
    "Only one of 'var' or 'varReader' may be specified".to_string()
}

// Plugins

pub fn wrong_root_element(file: &str, element: &str) -> String {
    format!("Name of root element in {} different from {}", file, element)
}

pub fn invalid_tag_plugin(file: &str) -> String {
    format!("Invalid tag plugin {}", file)
}

pub fn unknown_tag_plugin_key(file: &str, key: &str) -> String {
    format!("Unknown entry '{}' in tag plugin manifest {}", key, file)
}

pub fn tag_plugin_not_found(class: &str) -> String {
    format!("Tag plugin class {} is not registered", class)
}

// Compile-error mapping

pub fn error_in_jsp_file(line: u32, file: &str) -> String {
    format!("An error occurred at line: {} in the jsp file: {}", line, file)
}

pub fn error_in_java_file(line: u32) -> String {
    format!("An error occurred at line: {} in the generated java file", line)
}

pub fn failed_class_compilation() -> String {
    "Unable to compile class for JSP".to_string()
}
