use crate::logging::codes::success;
use crate::nodes::Tree;
use crate::page_info::PageInfo;
use crate::tagfile::HandlerRef;
use crate::taglib::TagInfo;
use crate::log_success;
use std::sync::Arc;
use std::time::Duration;

/// One translated page or tag file, ready for code generation
#[derive(Debug)]
pub struct CompiledUnit {
    pub path: String,
    pub tree: Tree,
    pub page_info: PageInfo,
    /// Interface of the unit, for tag files
    pub tag_info: Option<Arc<TagInfo>>,
    /// Handler produced by a tag-file unit
    pub handler: Option<HandlerRef>,
    /// Handlers of the tag files the unit uses, in document order
    pub handlers: Vec<HandlerRef>,
    /// Cycle-breaking handlers built while compiling the unit; they are
    /// never stored and should be discarded with it
    pub prototypes: Vec<HandlerRef>,
    pub duration: Duration,
}

impl CompiledUnit {
    pub fn is_tag_file(&self) -> bool {
        self.page_info.is_tag_file
    }

    pub fn log_success(&self) {
        log_success!(success::PAGE_COMPILED, "Translation unit compiled",
            "path" => &self.path,
            "nodes" => self.tree.len(),
            "tag_files" => self.handlers.len(),
            "dependencies" => self.page_info.dependants().len(),
            "duration_ms" => format!("{:.2}", self.duration.as_secs_f64() * 1000.0)
        );
    }
}
