//! File loading and include handling for the parser

use super::encoding::{decode, detect_bom, sniff_declared_encoding};
use super::grammar::Parser;
use crate::config::compile_time::page::DEFAULT_PAGE_ENCODING;
use crate::config::compile_time::resources::XML_SYNTAX_SUFFIXES;
use crate::config::compile_time::syntax::MAX_INCLUDE_DEPTH;
use crate::context::CompilationContext;
use crate::errors::{messages, ErrorDispatcher, JspResult};
use crate::logging::codes::{resources, success, syntax};
use crate::nodes::{Attributes, NodeId, NodeKind, RootData, Tree};
use crate::page_info::PageInfo;
use crate::reader::JspReader;
use crate::utils::{paths, Mark};
use crate::{log_debug, log_performance};
use std::time::Instant;

/// A decoded source file ready for parsing
struct Source {
    text: String,
    root: RootData,
    url: Option<String>,
}

/// Drives parsing of one translation unit and the files it includes
#[derive(Debug)]
pub struct ParserController<'c> {
    ctx: &'c CompilationContext,
    is_tag_file: bool,
    directives_only: bool,
    /// Files being parsed, outermost first
    open_files: Vec<String>,
}

impl<'c> ParserController<'c> {
    pub fn new(ctx: &'c CompilationContext, is_tag_file: bool) -> Self {
        Self {
            ctx,
            is_tag_file,
            directives_only: false,
            open_files: Vec::new(),
        }
    }

    /// Keep only directives; used to read a tag file's interface
    pub fn directives_only(mut self) -> Self {
        self.directives_only = true;
        self
    }

    pub fn context(&self) -> &'c CompilationContext {
        self.ctx
    }

    pub fn is_tag_file(&self) -> bool {
        self.is_tag_file
    }

    pub fn is_directives_only(&self) -> bool {
        self.directives_only
    }

    /// Parse a top-level page or tag file. Findings deferred while parsing
    /// are surfaced before the tree is returned.
    pub fn parse(
        &mut self,
        path: &str,
        page_info: &mut PageInfo,
        err: &mut ErrorDispatcher,
    ) -> JspResult<Tree> {
        let started = Instant::now();
        let source = self.load(path, None, None, err)?;
        let start = match &source.url {
            Some(url) => Mark::start_of(path).with_resource_url(url.as_str()),
            None => Mark::start_of(path),
        };
        let mut tree = Tree::new(source.root.clone(), start);
        let root = tree.root();
        self.parse_source(path, source, &mut tree, root, true, page_info, err)?;
        err.finish()?;

        let (code, what) = if self.directives_only {
            (success::DIRECTIVES_EXTRACTED, "Directives extracted")
        } else {
            (success::PARSE_COMPLETE, "Parse complete")
        };
        log_performance!(code, what, duration = started.elapsed(),
            "path" => path,
            "nodes" => tree.len()
        );
        Ok(tree)
    }

    /// Parse an included file under `parent`, resolving `file` against the
    /// file that holds the include
    pub(super) fn parse_include(
        &mut self,
        file: &str,
        at: &Mark,
        tree: &mut Tree,
        parent: NodeId,
        page_info: &mut PageInfo,
        err: &mut ErrorDispatcher,
    ) -> JspResult<()> {
        let Some(path) = paths::resolve(at.file(), file) else {
            return err.fail(
                resources::RESOURCE_NOT_FOUND,
                Some(at),
                messages::file_not_found(file),
            );
        };
        if self.open_files.iter().any(|open| *open == path) {
            return err.fail(
                resources::INCLUDE_CYCLE,
                Some(at),
                messages::recursive_include(&path),
            );
        }
        if self.open_files.len() >= MAX_INCLUDE_DEPTH {
            return err.fail(
                resources::INCLUDE_TOO_DEEP,
                Some(at),
                messages::include_too_deep(&path, MAX_INCLUDE_DEPTH),
            );
        }

        let inherited = enclosing_encoding(tree, parent);
        let mut source = self.load(&path, Some(at), inherited, err)?;
        source.root.is_included = true;
        page_info.add_dependant(&path, self.ctx.resources().last_modified(&path));

        let start = match &source.url {
            Some(url) => Mark::start_of(path.as_str()).with_resource_url(url.as_str()),
            None => Mark::start_of(path.as_str()),
        };
        let root = tree.add(
            parent,
            NodeKind::Root(source.root.clone()),
            start,
            Attributes::new(),
        );
        self.parse_source(&path, source, tree, root, false, page_info, err)
    }

    #[allow(clippy::too_many_arguments)]
    fn parse_source(
        &mut self,
        path: &str,
        source: Source,
        tree: &mut Tree,
        root: NodeId,
        top_level: bool,
        page_info: &mut PageInfo,
        err: &mut ErrorDispatcher,
    ) -> JspResult<()> {
        self.open_files.push(path.to_string());
        let reader = JspReader::new(path, &source.text).with_resource_url(source.url);
        let result = Parser::new(self, reader, tree, page_info, err).parse_root(root, top_level);
        self.open_files.pop();
        result
    }

    /// Read and decode a source file
    fn load(
        &self,
        path: &str,
        at: Option<&Mark>,
        inherited: Option<(String, bool)>,
        err: &ErrorDispatcher,
    ) -> JspResult<Source> {
        let options = self.ctx.options();
        if options.is_xml_syntax || paths::has_suffix(path, XML_SYNTAX_SUFFIXES) {
            return err.fail(
                syntax::XML_SYNTAX_UNSUPPORTED,
                at,
                messages::xml_syntax_unsupported(path),
            );
        }

        let bytes = self.ctx.resources().read(path).map_err(|e| {
            if e.is_not_found() {
                err.error(resources::RESOURCE_NOT_FOUND, at, messages::file_not_found(path))
            } else if at.is_some() {
                err.error_with_cause(e.error_code(), at, messages::error_including(path), &e)
            } else {
                err.error_with_cause(e.error_code(), at, messages::error_reading_file(path), &e)
            }
        })?;

        let config_encoding = options.default_page_encoding.clone();
        let (encoding, is_default, bom) = if let Some((encoding, len)) = detect_bom(&bytes) {
            (encoding.to_string(), false, Some(len))
        } else if let Some(configured) = &config_encoding {
            (configured.clone(), false, None)
        } else if let Some(declared) = sniff_declared_encoding(&bytes) {
            (declared, false, None)
        } else if let Some((encoding, is_default)) = inherited {
            (encoding, is_default, None)
        } else {
            (DEFAULT_PAGE_ENCODING.to_string(), true, None)
        };

        let body = &bytes[bom.unwrap_or(0)..];
        let Some(text) = decode(body, &encoding) else {
            return err.fail(
                resources::INVALID_ENCODING,
                at,
                messages::unsupported_encoding(&encoding),
            );
        };

        log_debug!("Loaded template source",
            "path" => path,
            "encoding" => &encoding,
            "bytes" => bytes.len()
        );

        Ok(Source {
            text,
            root: RootData {
                page_encoding: encoding,
                config_encoding,
                is_default_page_encoding: is_default,
                is_bom_present: bom.is_some(),
                is_xml_syntax: false,
                is_included: false,
                is_tag_file: self.is_tag_file,
            },
            url: self.ctx.resources().resource_url(path),
        })
    }
}

/// Encoding of the nearest enclosing file, for includes without their own
fn enclosing_encoding(tree: &Tree, from: NodeId) -> Option<(String, bool)> {
    let root = tree.ancestor(from, |node| matches!(node.kind, NodeKind::Root(_)))?;
    match &tree.node(root).kind {
        NodeKind::Root(data) => Some((data.page_encoding.clone(), data.is_default_page_encoding)),
        _ => None,
    }
}
