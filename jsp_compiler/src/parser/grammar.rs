//! Recursive-descent grammar for standard-syntax templates
//!
//! One `Parser` reads one source file. Includes are handed back to the
//! [`ParserController`], which opens the included file and runs a fresh
//! `Parser` over it, attaching its root under the include directive.

use super::{BodyType, ElementMode, ParserController};
use crate::config::compile_time::syntax::{JSP_PREFIX, MAX_TAG_NESTING_DEPTH, TAG_DIR_URN_PREFIX};
use crate::config::CompilerOptions;
use crate::context::CompilationContext;
use crate::errors::{messages, ErrorDispatcher, JspResult};
use crate::logging::codes::{attribute, lexical, resolution, syntax};
use crate::logging::Code;
use crate::nodes::{Attributes, CustomTagData, NamedAttributeData, NodeId, NodeKind, Tree};
use crate::page_info::PageInfo;
use crate::reader::JspReader;
use crate::taglib::{self, DYNAMIC_ATTRIBUTES_INTERFACE, SIMPLE_TAG_INTERFACE};
use crate::tagfile;
use crate::utils::Mark;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DirectiveKind {
    Page,
    Include,
    Taglib,
    Tag,
    Attribute,
    Variable,
}

impl DirectiveKind {
    fn name(self) -> &'static str {
        match self {
            Self::Page => "page",
            Self::Include => "include",
            Self::Taglib => "taglib",
            Self::Tag => "tag",
            Self::Attribute => "attribute",
            Self::Variable => "variable",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scripting {
    Declaration,
    Expression,
    Scriptlet,
}

impl Scripting {
    fn opener(self) -> &'static str {
        match self {
            Self::Declaration => "<%!",
            Self::Expression => "<%=",
            Self::Scriptlet => "<%",
        }
    }

    fn xml_tag(self) -> &'static str {
        match self {
            Self::Declaration => "jsp:declaration",
            Self::Expression => "jsp:expression",
            Self::Scriptlet => "jsp:scriptlet",
        }
    }

    fn node(self, text: String) -> NodeKind {
        match self {
            Self::Declaration => NodeKind::Declaration { text },
            Self::Expression => NodeKind::Expression { text },
            Self::Scriptlet => NodeKind::Scriptlet { text },
        }
    }
}

pub(crate) struct Parser<'p, 'c> {
    ctl: &'p mut ParserController<'c>,
    ctx: &'c CompilationContext,
    pub(super) reader: JspReader,
    tree: &'p mut Tree,
    pub(super) page_info: &'p mut PageInfo,
    pub(super) err: &'p mut ErrorDispatcher,
    is_tag_file: bool,
    directives_only: bool,
    scriptless_count: usize,
    depth: usize,
    /// Start of the element being parsed
    start: Mark,
}

impl<'p, 'c> Parser<'p, 'c> {
    pub(super) fn new(
        ctl: &'p mut ParserController<'c>,
        reader: JspReader,
        tree: &'p mut Tree,
        page_info: &'p mut PageInfo,
        err: &'p mut ErrorDispatcher,
    ) -> Self {
        let ctx = ctl.context();
        let is_tag_file = ctl.is_tag_file();
        let directives_only = ctl.is_directives_only();
        let start = reader.mark();
        Self {
            ctl,
            ctx,
            reader,
            tree,
            page_info,
            err,
            is_tag_file,
            directives_only,
            scriptless_count: 0,
            depth: 0,
            start,
        }
    }

    pub(super) fn options(&self) -> &'c CompilerOptions {
        self.ctx.options()
    }

    fn fail_at<T>(&self, code: Code, mark: &Mark, message: String) -> JspResult<T> {
        self.err.fail(code, Some(mark), message)
    }

    fn fail_here<T>(&self, code: Code, message: String) -> JspResult<T> {
        self.err.fail(code, Some(&self.reader.mark()), message)
    }

    fn unterminated<T>(&self, tag: &str) -> JspResult<T> {
        self.fail_at(
            lexical::UNTERMINATED_CONSTRUCT,
            &self.start,
            messages::unterminated_tag(tag),
        )
    }

    /// Parse the whole file into `root`. Preludes and codas are only added
    /// around a top-level page.
    pub(super) fn parse_root(mut self, root: NodeId, top_level: bool) -> JspResult<()> {
        let wrap = top_level && !self.is_tag_file && !self.directives_only;
        if wrap {
            let prelude = self.page_info.include_prelude.clone();
            for file in &prelude {
                self.add_include(root, file)?;
            }
        }

        while self.reader.has_more_input() {
            if self.directives_only {
                self.parse_file_directives(root)?;
            } else {
                self.parse_elements(root, ElementMode::Jsp)?;
            }
        }

        if wrap {
            let coda = self.page_info.include_coda.clone();
            for file in &coda {
                self.add_include(root, file)?;
            }
        }
        Ok(())
    }

    fn add_include(&mut self, parent: NodeId, file: &str) -> JspResult<()> {
        let mark = self.reader.mark();
        let node = self.tree.add(
            parent,
            NodeKind::IncludeDirective,
            mark.clone(),
            Attributes::new().with("file", file),
        );
        self.process_include(file, node, &mark)
    }

    fn process_include(&mut self, file: &str, node: NodeId, at: &Mark) -> JspResult<()> {
        self.ctl
            .parse_include(file, at, self.tree, node, self.page_info, self.err)
    }

    // Directives

    /// Only directives are kept; everything else is skipped
    fn parse_file_directives(&mut self, parent: NodeId) -> JspResult<()> {
        self.reader.skip_until("<");
        while self.reader.has_more_input() {
            self.start = self.reader.mark();
            if self.reader.matches("%--") {
                self.reader.skip_until("--%>");
            } else if self.reader.matches("%@") {
                self.parse_directive(parent)?;
            } else if self.reader.matches("jsp:directive.") {
                self.parse_xml_directive(parent)?;
            } else if self.reader.matches("%!")
                || self.reader.matches("%=")
                || self.reader.matches("%")
            {
                self.reader.skip_until("%>");
            }
            self.reader.skip_until("<");
        }
        Ok(())
    }

    fn match_directive_kind(&mut self) -> Option<DirectiveKind> {
        [
            DirectiveKind::Page,
            DirectiveKind::Include,
            DirectiveKind::Taglib,
            DirectiveKind::Tag,
            DirectiveKind::Attribute,
            DirectiveKind::Variable,
        ]
        .into_iter()
        .find(|kind| self.reader.matches(kind.name()))
    }

    /// `<%@ S? name attributes S? %>`
    fn parse_directive(&mut self, parent: NodeId) -> JspResult<()> {
        let start = self.start.clone();
        self.reader.skip_spaces();
        let Some(kind) = self.match_directive_kind() else {
            return self.fail_here(syntax::INVALID_DIRECTIVE, messages::invalid_directive());
        };
        let label = format!("<%@ {}", kind.name());
        self.parse_directive_body(parent, kind, &start, &label)?;

        self.reader.skip_spaces();
        if !self.reader.matches("%>") {
            return self.fail_at(
                lexical::UNTERMINATED_CONSTRUCT,
                &start,
                messages::unterminated_tag(&label),
            );
        }
        Ok(())
    }

    /// `<jsp:directive.name attributes S? (/> | > S? </jsp:directive.name>)`
    fn parse_xml_directive(&mut self, parent: NodeId) -> JspResult<()> {
        let start = self.start.clone();
        let kind = match self.match_directive_kind() {
            Some(DirectiveKind::Taglib) | None => {
                return self.fail_here(syntax::INVALID_DIRECTIVE, messages::invalid_directive())
            }
            Some(kind) => kind,
        };
        let label = format!("<jsp:directive.{}", kind.name());
        self.parse_directive_body(parent, kind, &start, &label)?;

        self.reader.skip_spaces();
        if self.reader.matches(">") {
            self.reader.skip_spaces();
            if !self.reader.matches_etag(&label[1..]) {
                return self.fail_at(
                    lexical::UNTERMINATED_CONSTRUCT,
                    &start,
                    messages::unterminated_tag(&label),
                );
            }
        } else if !self.reader.matches("/>") {
            return self.fail_at(
                lexical::UNTERMINATED_CONSTRUCT,
                &start,
                messages::unterminated_tag(&label),
            );
        }
        Ok(())
    }

    fn parse_directive_body(
        &mut self,
        parent: NodeId,
        kind: DirectiveKind,
        start: &Mark,
        label: &str,
    ) -> JspResult<()> {
        match kind {
            DirectiveKind::Page => {
                if self.is_tag_file {
                    return self.fail_here(
                        syntax::DIRECTIVE_NOT_ALLOWED,
                        messages::invalid_directive_in_tag_file(label),
                    );
                }
                let attrs = self.parse_attributes(true)?;
                let imports = imports_of(&attrs);
                self.tree
                    .add(parent, NodeKind::PageDirective { imports }, start.clone(), attrs);
            }
            DirectiveKind::Include => {
                let attrs = self.parse_attributes(false)?;
                let file = attrs.get("file").map(str::to_string);
                let node = self
                    .tree
                    .add(parent, NodeKind::IncludeDirective, start.clone(), attrs);
                if let Some(file) = file {
                    self.process_include(&file, node, start)?;
                }
            }
            DirectiveKind::Taglib if self.directives_only => self.bind_taglib_prefix()?,
            DirectiveKind::Taglib => self.parse_taglib_directive(parent, start)?,
            DirectiveKind::Tag | DirectiveKind::Attribute | DirectiveKind::Variable => {
                if !self.is_tag_file {
                    return self.fail_here(
                        syntax::DIRECTIVE_NOT_ALLOWED,
                        messages::invalid_directive_in_page(label),
                    );
                }
                let node = match kind {
                    DirectiveKind::Tag => {
                        let attrs = self.parse_attributes(true)?;
                        let imports = imports_of(&attrs);
                        (NodeKind::TagDirective { imports }, attrs)
                    }
                    DirectiveKind::Attribute => {
                        (NodeKind::AttributeDirective, self.parse_attributes(false)?)
                    }
                    _ => (NodeKind::VariableDirective, self.parse_attributes(false)?),
                };
                self.tree.add(parent, node.0, start.clone(), node.1);
            }
        }
        Ok(())
    }

    /// Directive-only parses record the binding but never load the library,
    /// so tag files used by a tag file are not pulled in early
    fn bind_taglib_prefix(&mut self) -> JspResult<()> {
        let attrs = self.parse_attributes(false)?;
        let key = match (attrs.get("uri"), attrs.get("tagdir")) {
            (Some(uri), None) => uri.to_string(),
            (None, Some(dir)) => format!("{}{}", TAG_DIR_URN_PREFIX, dir),
            _ => return Ok(()),
        };
        if let Some(prefix) = attrs.get("prefix") {
            self.page_info.add_prefix_mapping(prefix, &key);
        }
        Ok(())
    }

    fn parse_taglib_directive(&mut self, parent: NodeId, start: &Mark) -> JspResult<()> {
        let attrs = self.parse_attributes(false)?;
        if let Some(prefix) = attrs.get("prefix").map(str::to_string) {
            if let Some(used) = self.page_info.non_custom_tag_prefix(&prefix) {
                let message = messages::prefix_already_in_use(&prefix, used.file(), used.line());
                return self.fail_at(resolution::PREFIX_IN_USE, start, message);
            }

            let uri = attrs.get("uri").map(str::to_string);
            let tag_dir = attrs.get("tagdir").map(str::to_string);
            let key = match (&uri, &tag_dir) {
                (Some(uri), None) => uri.clone(),
                (None, Some(dir)) => format!("{}{}", TAG_DIR_URN_PREFIX, dir),
                (Some(_), Some(_)) => {
                    return self.fail_at(
                        syntax::INVALID_DIRECTIVE,
                        start,
                        messages::taglib_conflicting_location(),
                    )
                }
                (None, None) => {
                    return self.fail_at(
                        attribute::MISSING_ATTRIBUTE,
                        start,
                        messages::taglib_missing_location(),
                    )
                }
            };

            if let Some(previous) = self.page_info.uri_for_prefix(&prefix) {
                if previous != key {
                    let message = messages::prefix_redefinition(&prefix, &key, previous);
                    return self.fail_at(resolution::PREFIX_REDEFINED, start, message);
                }
            }

            if !self.page_info.has_taglib(&key) {
                let library = match &tag_dir {
                    Some(dir) => taglib::implicit::load(self.ctx, dir, start, self.err)?,
                    None => taglib::resolver::resolve(
                        self.ctx,
                        &key,
                        self.reader.file(),
                        start,
                        self.err,
                    )?,
                };
                self.page_info.add_taglib(&key, library);
            }
            self.page_info.add_prefix_mapping(&prefix, &key);

            let manifest = self
                .page_info
                .taglib(&key)
                .and_then(|library| library.manifest.clone());
            if let Some(manifest) = manifest {
                let stamp = self.ctx.resources().last_modified(&manifest);
                self.page_info.add_dependant(&manifest, stamp);
            }
            if prefix == JSP_PREFIX {
                self.page_info.is_jsp_prefix_hijacked = true;
            }
        }
        self.tree
            .add(parent, NodeKind::TaglibDirective, start.clone(), attrs);
        Ok(())
    }

    // Comments, scripting and expressions

    fn parse_comment(&mut self, parent: NodeId) -> JspResult<()> {
        let body = self.reader.mark();
        let Some(stop) = self.reader.skip_until("--%>") else {
            return self.unterminated("<%--");
        };
        let text = self.reader.get_text(&body, &stop);
        self.tree
            .add(parent, NodeKind::Comment { text }, self.start.clone(), Attributes::new());
        Ok(())
    }

    fn parse_scripting(&mut self, parent: NodeId, kind: Scripting) -> JspResult<()> {
        let body = self.reader.mark();
        let Some(stop) = self.reader.skip_until("%>") else {
            return self.unterminated(kind.opener());
        };
        let text = parse_script_text(&self.reader.get_text(&body, &stop));
        self.tree
            .add(parent, kind.node(text), self.start.clone(), Attributes::new());
        Ok(())
    }

    /// `<jsp:scriptlet>` and friends; CDATA sections become separate nodes
    fn parse_xml_scripting(&mut self, parent: NodeId, kind: Scripting) -> JspResult<()> {
        let label = format!("<{}>", kind.xml_tag());
        self.reader.skip_spaces();
        if self.reader.matches("/>") {
            return Ok(());
        }
        if !self.reader.matches(">") {
            return self.unterminated(&label);
        }
        loop {
            let body = self.reader.mark();
            let Some(stop) = self.reader.skip_until("<") else {
                return self.unterminated(&label);
            };
            let text = parse_script_text(&self.reader.get_text(&body, &stop));
            self.tree.add(parent, kind.node(text), body, Attributes::new());
            if !self.reader.matches("![CDATA[") {
                break;
            }
            let body = self.reader.mark();
            let Some(stop) = self.reader.skip_until("]]>") else {
                return self.unterminated("CDATA");
            };
            let text = parse_script_text(&self.reader.get_text(&body, &stop));
            self.tree.add(parent, kind.node(text), body, Attributes::new());
        }
        if !self.reader.matches_etag_without_less_than(kind.xml_tag()) {
            return self.unterminated(&label);
        }
        Ok(())
    }

    /// Expression body after its `${` or `#{` opener
    fn parse_el(&mut self, parent: NodeId, delimiter: char) -> JspResult<()> {
        let body = self.reader.mark();
        let Some(stop) = self.reader.skip_el_expression() else {
            return self.fail_at(
                lexical::UNTERMINATED_CONSTRUCT,
                &self.start,
                messages::unterminated_el(&format!("{}{{", delimiter)),
            );
        };
        let text = self.reader.get_text(&body, &stop);
        self.tree.add(
            parent,
            NodeKind::ElExpression {
                delimiter,
                text,
                el: None,
            },
            self.start.clone(),
            Attributes::new(),
        );
        Ok(())
    }

    // Template text

    fn parse_template_text(&mut self, parent: NodeId) {
        let el_enabled = !self.page_info.el_ignored;
        let deferred_literal = self.page_info.deferred_syntax_allowed_as_literal;
        let mut text = String::new();
        while let Some(ch) = self.reader.next_char() {
            match ch {
                '<' => {
                    if self.reader.matches("\\%") {
                        text.push_str("<%");
                    } else if text.is_empty() {
                        text.push('<');
                    } else {
                        self.reader.push_char();
                        break;
                    }
                }
                '\\' if el_enabled => {
                    let escapes_el = matches!(self.reader.peek_char(), Some('$' | '#'))
                        && self.reader.peek_char_at(1) == Some('{');
                    if escapes_el {
                        if let Some(opener) = self.reader.next_char() {
                            text.push(opener);
                        }
                        self.reader.next_char();
                        text.push('{');
                    } else {
                        text.push('\\');
                    }
                }
                '$' | '#'
                    if el_enabled
                        && (ch == '$' || !deferred_literal)
                        && self.reader.peek_char() == Some('{')
                        && !text.is_empty() =>
                {
                    self.reader.push_char();
                    break;
                }
                _ => text.push(ch),
            }
        }
        self.tree.add(
            parent,
            NodeKind::TemplateText { text },
            self.start.clone(),
            Attributes::new(),
        );
    }

    /// `<jsp:text>`: character data, CDATA sections and expressions only
    fn parse_xml_template_text(&mut self, parent: NodeId) -> JspResult<()> {
        let open = self.start.clone();
        self.reader.skip_spaces();
        if self.reader.matches("/>") {
            return Ok(());
        }
        if !self.reader.matches(">") {
            return self.unterminated("<jsp:text>");
        }

        let el_enabled = !self.page_info.el_ignored;
        let deferred_literal = self.page_info.deferred_syntax_allowed_as_literal;
        let mut text = String::new();
        let mut text_start = self.reader.mark();
        while let Some(ch) = self.reader.next_char() {
            match ch {
                '<' => {
                    if !self.reader.matches("![CDATA[") {
                        break;
                    }
                    let body = self.reader.mark();
                    let Some(stop) = self.reader.skip_until("]]>") else {
                        return self.unterminated("CDATA");
                    };
                    text.push_str(&self.reader.get_text(&body, &stop));
                }
                '\\' if el_enabled
                    && matches!(self.reader.peek_char(), Some('$' | '#'))
                    && self.reader.peek_char_at(1) == Some('{') =>
                {
                    if let Some(opener) = self.reader.next_char() {
                        text.push(opener);
                    }
                    self.reader.next_char();
                    text.push('{');
                }
                '$' | '#'
                    if el_enabled
                        && (ch == '$' || !deferred_literal)
                        && self.reader.peek_char() == Some('{') =>
                {
                    self.reader.next_char();
                    if !text.is_empty() {
                        let chunk = std::mem::take(&mut text);
                        self.tree.add(
                            parent,
                            NodeKind::TemplateText { text: chunk },
                            text_start.clone(),
                            Attributes::new(),
                        );
                    }
                    self.start = self.reader.mark();
                    self.parse_el(parent, ch)?;
                    self.start = open.clone();
                    text_start = self.reader.mark();
                }
                _ => text.push(ch),
            }
        }
        if !text.is_empty() {
            self.tree
                .add(parent, NodeKind::TemplateText { text }, text_start, Attributes::new());
        }

        if !self.reader.has_more_input() {
            return self.unterminated("<jsp:text>");
        }
        if !self.reader.matches_etag_without_less_than("jsp:text") {
            return self.fail_at(syntax::INVALID_BODY, &self.start, messages::jsp_text_bad_content());
        }
        Ok(())
    }

    fn check_unbalanced_end_tag(&mut self) -> JspResult<()> {
        if !self.reader.matches("</") {
            return Ok(());
        }
        if self.reader.matches("jsp:") {
            return self.fail_at(
                syntax::UNBALANCED_END_TAG,
                &self.start,
                messages::unbalanced_end_tag("jsp:"),
            );
        }
        let tag_name = self.reader.parse_token();
        let bound = tag_name
            .split_once(':')
            .is_some_and(|(prefix, _)| self.page_info.uri_for_prefix(prefix).is_some());
        if !bound {
            self.reader.reset(&self.start);
            return Ok(());
        }
        self.fail_at(
            syntax::UNBALANCED_END_TAG,
            &self.start,
            messages::unbalanced_end_tag(&tag_name),
        )
    }

    // Elements

    fn parse_elements(&mut self, parent: NodeId, mode: ElementMode) -> JspResult<()> {
        let mode = if mode == ElementMode::Jsp && self.scriptless_count > 0 {
            ElementMode::Scriptless
        } else {
            mode
        };
        if mode != ElementMode::Scriptless {
            return self.parse_element(parent, mode);
        }
        self.scriptless_count += 1;
        let result = self.parse_element(parent, mode);
        self.scriptless_count -= 1;
        result
    }

    fn match_scripting(&mut self) -> Option<(Scripting, bool)> {
        let forms = [
            ("<%!", Scripting::Declaration, false),
            ("<jsp:declaration", Scripting::Declaration, true),
            ("<%=", Scripting::Expression, false),
            ("<jsp:expression", Scripting::Expression, true),
            ("<%", Scripting::Scriptlet, false),
            ("<jsp:scriptlet", Scripting::Scriptlet, true),
        ];
        forms
            .into_iter()
            .find(|(opener, _, _)| self.reader.matches(opener))
            .map(|(_, kind, xml)| (kind, xml))
    }

    fn parse_element(&mut self, parent: NodeId, mode: ElementMode) -> JspResult<()> {
        self.start = self.reader.mark();
        let el_enabled = !self.page_info.el_ignored;
        let template_only = mode == ElementMode::TemplateText;

        if self.reader.matches("<%--") {
            return self.parse_comment(parent);
        }
        if self.reader.matches("<%@") {
            return self.parse_directive(parent);
        }
        if self.reader.matches("<jsp:directive.") {
            return self.parse_xml_directive(parent);
        }
        if let Some((kind, xml)) = self.match_scripting() {
            let opener = if xml {
                format!("<{}", kind.xml_tag())
            } else {
                kind.opener().to_string()
            };
            match mode {
                ElementMode::TemplateText => {
                    return self.fail_here(
                        syntax::INVALID_BODY,
                        messages::invalid_template_text_body(&opener),
                    )
                }
                ElementMode::Scriptless => self.err.defer(
                    syntax::SCRIPTING_NOT_ALLOWED,
                    Some(&self.reader.mark()),
                    messages::invalid_scripting_element(),
                ),
                ElementMode::Jsp => {}
            }
            return if xml {
                self.parse_xml_scripting(parent, kind)
            } else {
                self.parse_scripting(parent, kind)
            };
        }
        if self.reader.matches("<jsp:text") {
            if template_only {
                return self.fail_here(
                    syntax::INVALID_BODY,
                    messages::invalid_template_text_body("<jsp:text"),
                );
            }
            return self.parse_xml_template_text(parent);
        }
        let deferred_literal = self.page_info.deferred_syntax_allowed_as_literal;
        for (opener, delimiter) in [("${", '$'), ("#{", '#')] {
            if !el_enabled || (delimiter == '#' && deferred_literal) {
                continue;
            }
            if self.reader.matches(opener) {
                if template_only {
                    return self.fail_here(
                        syntax::INVALID_BODY,
                        messages::invalid_template_text_body(opener),
                    );
                }
                return self.parse_el(parent, delimiter);
            }
        }
        if self.reader.matches("<jsp:") {
            if template_only {
                return self.fail_here(
                    syntax::INVALID_BODY,
                    messages::invalid_template_text_body("<jsp:"),
                );
            }
            return self.parse_standard_action(parent);
        }
        if self.parse_custom_tag(parent)? {
            if template_only {
                return self.fail_at(
                    syntax::INVALID_BODY,
                    &self.start,
                    messages::invalid_tag_in_template_text_body(),
                );
            }
            return Ok(());
        }
        self.check_unbalanced_end_tag()?;
        self.parse_template_text(parent);
        Ok(())
    }

    // Standard actions

    fn parse_standard_action(&mut self, parent: NodeId) -> JspResult<()> {
        let here = self.reader.mark();
        if self.reader.matches("include") {
            self.parse_action(parent, NodeKind::IncludeAction, "jsp:include", Some(BodyType::Param))
        } else if self.reader.matches("forward") {
            self.parse_action(parent, NodeKind::ForwardAction, "jsp:forward", Some(BodyType::Param))
        } else if self.reader.matches("invoke") {
            self.require_tag_file("<jsp:invoke", &here)?;
            self.parse_action(parent, NodeKind::InvokeAction, "jsp:invoke", None)
        } else if self.reader.matches("doBody") {
            self.require_tag_file("<jsp:doBody", &here)?;
            self.parse_action(parent, NodeKind::DoBodyAction, "jsp:doBody", None)
        } else if self.reader.matches("getProperty") {
            self.parse_action(parent, NodeKind::GetProperty, "jsp:getProperty", Some(BodyType::Empty))
        } else if self.reader.matches("setProperty") {
            self.parse_action(parent, NodeKind::SetProperty, "jsp:setProperty", Some(BodyType::Empty))
        } else if self.reader.matches("useBean") {
            self.parse_action(parent, NodeKind::UseBean, "jsp:useBean", Some(BodyType::Jsp))
        } else if self.reader.matches("plugin") {
            self.parse_action(parent, NodeKind::PlugIn, "jsp:plugin", Some(BodyType::Plugin))
        } else if self.reader.matches("element") {
            self.parse_action(parent, NodeKind::JspElement, "jsp:element", Some(BodyType::Jsp))
        } else if self.reader.matches("output") {
            let top_level = matches!(self.tree.node(parent).kind, NodeKind::Root(_));
            if !top_level {
                return self.fail_at(syntax::MISPLACED_ACTION, &here, messages::invalid_jsp_output());
            }
            self.parse_action(parent, NodeKind::JspOutput, "jsp:output", None)
        } else {
            let misplaced = [
                ("attribute", messages::invalid_jsp_attribute as fn() -> String),
                ("body", messages::invalid_jsp_body),
                ("fallback", messages::invalid_jsp_fallback),
                ("params", messages::invalid_jsp_params),
                ("param", messages::invalid_jsp_param),
            ];
            for (name, message) in misplaced {
                if self.reader.matches(name) {
                    return self.fail_at(syntax::MISPLACED_ACTION, &here, message());
                }
            }
            self.fail_at(
                syntax::INVALID_STANDARD_ACTION,
                &here,
                messages::invalid_standard_action(),
            )
        }
    }

    fn require_tag_file(&self, action: &str, at: &Mark) -> JspResult<()> {
        if self.is_tag_file {
            Ok(())
        } else {
            self.fail_at(
                syntax::DIRECTIVE_NOT_ALLOWED,
                at,
                messages::action_only_in_tag_file(action),
            )
        }
    }

    /// Attributes, then an optional body of `body` type; `None` means the
    /// body may only hold `jsp:attribute` elements
    fn parse_action(
        &mut self,
        parent: NodeId,
        kind: NodeKind,
        tag: &str,
        body: Option<BodyType>,
    ) -> JspResult<()> {
        let start = self.start.clone();
        let attrs = self.parse_attributes(false)?;
        self.reader.skip_spaces();
        let node = self.tree.add(parent, kind, start, attrs);
        match body {
            Some(body_type) => self.parse_optional_body(node, tag, body_type),
            None => self.parse_empty_body(node, tag),
        }
    }

    // Custom tags

    fn parse_custom_tag(&mut self, parent: NodeId) -> JspResult<bool> {
        let start = self.start.clone();
        if self.reader.peek_char() != Some('<') {
            return Ok(false);
        }
        self.reader.next_char();
        let tag_name = self.reader.parse_token();
        let Some((prefix, short_name)) = tag_name.split_once(':') else {
            self.reader.reset(&start);
            return Ok(false);
        };

        let Some(uri) = self.page_info.uri_for_prefix(prefix).map(str::to_string) else {
            if self.page_info.error_on_undeclared_namespace {
                return self.fail_at(
                    resolution::UNBOUND_PREFIX,
                    &start,
                    messages::unbound_tag_prefix(short_name, prefix),
                );
            }
            self.reader.reset(&start);
            self.page_info
                .put_non_custom_tag_prefix(prefix, self.reader.mark());
            return Ok(false);
        };

        let Some(library) = self.page_info.taglib(&uri).cloned() else {
            return self.fail_at(
                resolution::UNKNOWN_TAG,
                &start,
                messages::unknown_tag_prefix(short_name, prefix),
            );
        };
        let tag_info = library.tag(short_name).cloned();
        let tag_file = match tag_info {
            Some(_) => None,
            None => tagfile::directives::lookup(self.ctx, &library, short_name, &start, self.err)?,
        };
        let (tag_info, implements_simple_tag, implements_dynamic_attributes) =
            match (&tag_info, &tag_file) {
                (Some(info), _) => {
                    let classes = self.ctx.classes();
                    if !classes.exists(&info.tag_class_name) {
                        return self.fail_at(
                            resolution::HANDLER_CLASS_NOT_FOUND,
                            &start,
                            messages::error_loading_tag_handler(&info.tag_class_name, &tag_name),
                        );
                    }
                    let simple = classes
                        .implements(&info.tag_class_name, SIMPLE_TAG_INTERFACE)
                        .unwrap_or(false);
                    let dynamic = classes
                        .implements(&info.tag_class_name, DYNAMIC_ATTRIBUTES_INTERFACE)
                        .unwrap_or(info.dynamic_attributes);
                    (info.clone(), simple, dynamic)
                }
                (None, Some(file)) => {
                    let stamp = self.ctx.resources().last_modified(&file.path);
                    self.page_info.add_dependant(&file.path, stamp);
                    let info = file.tag_info.clone();
                    let dynamic = info.has_dynamic_attributes();
                    (info, true, dynamic)
                }
                (None, None) => {
                    return self.fail_at(
                        resolution::UNKNOWN_TAG,
                        &start,
                        messages::unknown_tag_prefix(short_name, prefix),
                    )
                }
            };

        let attrs = self.parse_attributes(false)?;
        self.reader.skip_spaces();

        let body_type = BodyType::from(tag_info.body_content);
        let data = CustomTagData {
            qname: tag_name.clone(),
            prefix: prefix.to_string(),
            local_name: short_name.to_string(),
            uri,
            tag_info,
            tag_file,
            handler: None,
            implements_simple_tag,
            implements_dynamic_attributes,
            tag_data: None,
            variable_infos: Vec::new(),
            at_stag: Vec::new(),
            at_etag: Vec::new(),
            use_tag_plugin: false,
        };
        let node = self
            .tree
            .add(parent, NodeKind::CustomTag(Box::new(data)), start, attrs);
        if !self.reader.matches("/>") {
            self.parse_optional_body(node, &tag_name, body_type)?;
        }
        Ok(true)
    }

    // Bodies

    /// `/>` or `>` followed by the end tag; only `jsp:attribute` may appear
    /// in between
    fn parse_empty_body(&mut self, parent: NodeId, tag: &str) -> JspResult<()> {
        if self.reader.matches("/>") {
            return Ok(());
        }
        if !self.reader.matches(">") {
            return self.unterminated(&format!("<{}", tag));
        }
        if self.reader.matches_etag(tag) {
            return Ok(());
        }
        if self.reader.matches_optional_spaces_followed_by("<jsp:attribute") {
            self.parse_named_attributes(parent)?;
            if self.reader.matches_etag(tag) {
                return Ok(());
            }
        }
        self.fail_here(
            syntax::INVALID_BODY,
            messages::invalid_empty_body_tag(&format!("<{}", tag)),
        )
    }

    fn parse_optional_body(&mut self, parent: NodeId, tag: &str, body_type: BodyType) -> JspResult<()> {
        if self.reader.matches("/>") {
            return Ok(());
        }
        if !self.reader.matches(">") {
            return self.unterminated(&format!("<{}", tag));
        }
        if self.reader.matches_etag(tag) {
            return Ok(());
        }
        if !self.parse_jsp_attribute_and_body(parent, tag, body_type)? {
            self.parse_body(parent, tag, body_type)?;
        }
        Ok(())
    }

    fn parse_jsp_attribute_and_body(
        &mut self,
        parent: NodeId,
        tag: &str,
        body_type: BodyType,
    ) -> JspResult<bool> {
        let mut found = false;
        if self.reader.matches_optional_spaces_followed_by("<jsp:attribute") {
            self.parse_named_attributes(parent)?;
            found = true;
        }
        if self.reader.matches_optional_spaces_followed_by("<jsp:body") {
            self.parse_jsp_body(parent, body_type)?;
            self.reader.skip_spaces();
            if !self.reader.matches_etag(tag) {
                return self.unterminated(&format!("<{}", tag));
            }
            found = true;
        } else if found && !self.reader.matches_etag(tag) {
            return self.fail_here(
                syntax::INVALID_BODY,
                messages::invalid_tag_body(&format!("<{}", tag)),
            );
        }
        Ok(found)
    }

    fn parse_jsp_body(&mut self, parent: NodeId, body_type: BodyType) -> JspResult<()> {
        let start = self.reader.mark();
        let attrs = self.parse_attributes(false)?;
        let node = self.tree.add(parent, NodeKind::JspBody, start, attrs);
        self.reader.skip_spaces();
        if self.reader.matches("/>") {
            return Ok(());
        }
        if !self.reader.matches(">") {
            return self.unterminated("<jsp:body");
        }
        self.parse_body(node, "jsp:body", body_type)
    }

    fn parse_named_attributes(&mut self, parent: NodeId) -> JspResult<()> {
        loop {
            let start = self.reader.mark();
            let attrs = self.parse_attributes(false)?;
            let name = attrs.get("name").unwrap_or_default().to_string();
            let trim = attrs.get("trim").map_or(true, |v| v.trim() != "false");
            let omit = attrs.get("omit").map(str::to_string);
            let (prefix, local_name) = match name.split_once(':') {
                Some((prefix, local)) => (Some(prefix.to_string()), local.to_string()),
                None => (None, name.clone()),
            };
            let data = NamedAttributeData {
                name: name.clone(),
                prefix,
                local_name,
                trim,
                omit,
                temporary_variable_name: Some(self.page_info.next_temporary_variable_name()),
            };
            let node = self
                .tree
                .add(parent, NodeKind::NamedAttribute(data), start, attrs);

            self.reader.skip_spaces();
            if !self.reader.matches("/>") {
                if !self.reader.matches(">") {
                    return self.unterminated("<jsp:attribute");
                }
                if trim {
                    self.reader.skip_spaces();
                }
                let body_type = self.attribute_body_type(parent, &name);
                self.parse_body(node, "jsp:attribute", body_type)?;
                if trim {
                    self.tree.rtrim_last_text(node);
                }
            }

            self.reader.skip_spaces();
            if !self.reader.matches("<jsp:attribute") {
                return Ok(());
            }
        }
    }

    /// Body type of a `jsp:attribute` given the element it belongs to
    fn attribute_body_type(&self, parent: NodeId, name: &str) -> BodyType {
        let jsp_valued = match &self.tree.node(parent).kind {
            NodeKind::CustomTag(tag) => match tag.tag_info.attribute(name) {
                Some(declared) if declared.fragment => return BodyType::Scriptless,
                Some(declared) => declared.rtexprvalue,
                None => tag.implements_dynamic_attributes,
            },
            NodeKind::IncludeAction | NodeKind::ForwardAction => name == "page",
            NodeKind::SetProperty | NodeKind::ParamAction => name == "value",
            NodeKind::UseBean => name == "beanName",
            NodeKind::PlugIn => name == "width" || name == "height",
            NodeKind::JspElement => true,
            _ => false,
        };
        if jsp_valued {
            BodyType::Jsp
        } else {
            BodyType::Template
        }
    }

    fn parse_body(&mut self, parent: NodeId, tag: &str, body_type: BodyType) -> JspResult<()> {
        if self.depth >= MAX_TAG_NESTING_DEPTH {
            return self.fail_at(
                syntax::NESTING_TOO_DEEP,
                &self.start,
                messages::nesting_too_deep(MAX_TAG_NESTING_DEPTH),
            );
        }
        self.depth += 1;
        let result = self.parse_body_content(parent, tag, body_type);
        self.depth -= 1;
        result
    }

    fn parse_body_content(&mut self, parent: NodeId, tag: &str, body_type: BodyType) -> JspResult<()> {
        match body_type {
            BodyType::TagDependent => {
                let body = self.reader.mark();
                let Some(stop) = self.reader.skip_until_etag(tag) else {
                    return self.unterminated(&format!("<{}", tag));
                };
                let text = self.reader.get_text(&body, &stop);
                if !text.is_empty() {
                    self.tree
                        .add(parent, NodeKind::TemplateText { text }, body, Attributes::new());
                }
                Ok(())
            }
            BodyType::Empty => {
                if self.reader.matches_etag(tag) {
                    Ok(())
                } else {
                    self.fail_at(
                        syntax::INVALID_BODY,
                        &self.start,
                        messages::invalid_empty_tag_subelements(tag),
                    )
                }
            }
            BodyType::Plugin => {
                self.parse_plugin_tags(parent)?;
                if self.reader.matches_etag(tag) {
                    Ok(())
                } else {
                    self.unterminated(&format!("<{}", tag))
                }
            }
            BodyType::Jsp | BodyType::Scriptless | BodyType::Param | BodyType::Template => {
                let nested_in_action = tag == "jsp:body" || tag == "jsp:attribute";
                while self.reader.has_more_input() {
                    if self.reader.matches_etag(tag) {
                        return Ok(());
                    }
                    if nested_in_action {
                        if self.reader.matches("<jsp:attribute") {
                            return self.fail_here(
                                syntax::INVALID_BODY,
                                messages::invalid_jsp_attribute_nesting(),
                            );
                        }
                        if self.reader.matches("<jsp:body") {
                            return self.fail_here(
                                syntax::INVALID_BODY,
                                messages::invalid_jsp_body_nesting(),
                            );
                        }
                    }
                    match body_type {
                        BodyType::Jsp => self.parse_elements(parent, ElementMode::Jsp)?,
                        BodyType::Scriptless => self.parse_elements(parent, ElementMode::Scriptless)?,
                        BodyType::Param => {
                            self.reader.skip_spaces();
                            self.parse_param(parent)?;
                        }
                        _ => self.parse_elements(parent, ElementMode::TemplateText)?,
                    }
                }
                self.unterminated(&format!("<{}", tag))
            }
        }
    }

    fn parse_param(&mut self, parent: NodeId) -> JspResult<()> {
        self.start = self.reader.mark();
        if !self.reader.matches("<jsp:param") {
            return self.fail_here(syntax::INVALID_BODY, messages::missing_param_action());
        }
        let start = self.start.clone();
        let attrs = self.parse_attributes(false)?;
        self.reader.skip_spaces();
        let node = self.tree.add(parent, NodeKind::ParamAction, start, attrs);
        self.parse_empty_body(node, "jsp:param")?;
        self.reader.skip_spaces();
        Ok(())
    }

    fn parse_plugin_tags(&mut self, parent: NodeId) -> JspResult<()> {
        self.reader.skip_spaces();
        if self.reader.matches("<jsp:params") {
            let node = self.tree.add(
                parent,
                NodeKind::ParamsAction,
                self.reader.mark(),
                Attributes::new(),
            );
            self.parse_optional_body(node, "jsp:params", BodyType::Param)?;
            self.reader.skip_spaces();
        }
        if self.reader.matches("<jsp:fallback") {
            let node = self.tree.add(
                parent,
                NodeKind::FallBack,
                self.reader.mark(),
                Attributes::new(),
            );
            self.parse_optional_body(node, "jsp:fallback", BodyType::Template)?;
            self.reader.skip_spaces();
        }
        Ok(())
    }
}

fn imports_of(attrs: &Attributes) -> Vec<String> {
    attrs
        .iter()
        .filter(|a| a.qname == "import")
        .map(|a| a.value.clone())
        .collect()
}

/// Undo the `%\>` escape inside scripting text
fn parse_script_text(text: &str) -> String {
    text.replace("%\\>", "%>")
}
