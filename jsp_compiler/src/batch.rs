//! Batch compilation of a web application
//!
//! Pages (`.jsp`, `.jspx`) are discovered under a web root and compiled on
//! worker threads that share one [`CompilationContext`], so a tag file used
//! by many pages is translated once.

use crate::config::compile_time::resources::PAGE_SUFFIXES;
use crate::config::BatchPreferences;
use crate::context::CompilationContext;
use crate::logging::codes;
use crate::pipeline::{self, CompiledUnit, PipelineError};
use crate::resources::FsResources;
use crate::utils::paths;
use crate::{log_debug, log_error, log_info, log_success, log_warning};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

/// Batch processing configuration
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub max_threads: usize,
    pub recursive: bool,
    pub max_files: Option<usize>,
    pub progress_reporting: bool,
    pub fail_fast: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self::from(&BatchPreferences::default())
    }
}

impl From<&BatchPreferences> for BatchConfig {
    fn from(preferences: &BatchPreferences) -> Self {
        let max_threads = match preferences.threads {
            0 => thread::available_parallelism()
                .map(|n| n.get().min(8))
                .unwrap_or(4),
            n => n,
        };
        Self {
            max_threads,
            recursive: preferences.recursive,
            max_files: None,
            progress_reporting: preferences.progress_reporting,
            fail_fast: preferences.fail_fast,
        }
    }
}

/// Outcome of a batch, in discovery order
#[derive(Debug, Default)]
pub struct BatchResults {
    pub compiled: Vec<CompiledUnit>,
    pub failed: Vec<(String, PipelineError)>,
    pub processing_duration: Duration,
    pub pages_discovered: usize,
    /// Pages not attempted because fail-fast stopped the batch
    pub pages_skipped: usize,
}

impl BatchResults {
    pub fn success_count(&self) -> usize {
        self.compiled.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failed.len()
    }

    pub fn pages_processed(&self) -> usize {
        self.compiled.len() + self.failed.len()
    }

    pub fn success_rate(&self) -> f64 {
        match self.pages_processed() {
            0 => 0.0,
            n => self.success_count() as f64 / n as f64,
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{} pages compiled, {} failed, {} skipped in {:.2}s",
            self.success_count(),
            self.failure_count(),
            self.pages_skipped,
            self.processing_duration.as_secs_f64()
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("Web root not found: {path}")]
    WebRootNotFound { path: String },

    #[error("No pages found under: {path}")]
    NoPagesFound { path: String },

    #[error("IO error while scanning {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Worker thread panicked while compiling")]
    WorkerPanicked,
}

/// Context-relative paths of every page under `webroot`, sorted
pub fn discover_pages(webroot: &Path, config: &BatchConfig) -> Result<Vec<String>, BatchError> {
    log_info!("Starting page discovery",
        "webroot" => webroot.display(),
        "recursive" => config.recursive
    );

    if !webroot.is_dir() {
        return Err(BatchError::WebRootNotFound {
            path: webroot.display().to_string(),
        });
    }

    let resources = FsResources::new(webroot);
    let mut files = Vec::new();
    visit(webroot, config.recursive, &mut files)?;

    let mut pages: Vec<String> = files
        .iter()
        .filter_map(|file| resources.context_path(file))
        .filter(|path| paths::has_suffix(path, PAGE_SUFFIXES))
        .collect();
    pages.sort();

    if let Some(max) = config.max_files {
        if pages.len() > max {
            log_warning!("Reached maximum page limit",
                "pages_found" => pages.len(),
                "limit" => max
            );
            pages.truncate(max);
        }
    }

    if pages.is_empty() {
        return Err(BatchError::NoPagesFound {
            path: webroot.display().to_string(),
        });
    }

    log_debug!("Page discovery completed", "pages" => pages.len());
    Ok(pages)
}

fn visit(dir: &Path, recursive: bool, files: &mut Vec<PathBuf>) -> Result<(), BatchError> {
    let io_error = |source| BatchError::Io {
        path: dir.display().to_string(),
        source,
    };
    for entry in fs::read_dir(dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        if path.is_dir() {
            if recursive {
                visit(&path, recursive, files)?;
            }
        } else if path.is_file() {
            files.push(path);
        }
    }
    Ok(())
}

/// Compile `pages` with `config.max_threads` workers sharing `ctx`
pub fn compile_pages(
    ctx: &CompilationContext,
    pages: &[String],
    config: &BatchConfig,
) -> Result<BatchResults, BatchError> {
    let started = Instant::now();
    let threads = config.max_threads.clamp(1, pages.len().max(1));
    log_info!("Starting batch compilation",
        "pages" => pages.len(),
        "threads" => threads
    );

    let next = AtomicUsize::new(0);
    let stop = AtomicBool::new(false);
    let outcomes: Mutex<Vec<Option<Result<CompiledUnit, PipelineError>>>> =
        Mutex::new((0..pages.len()).map(|_| None).collect());

    let worker = || loop {
        if stop.load(Ordering::Relaxed) {
            break;
        }
        let index = next.fetch_add(1, Ordering::Relaxed);
        let Some(page) = pages.get(index) else {
            break;
        };
        if config.progress_reporting {
            println!("   Compiling {} ({} of {})", page, index + 1, pages.len());
        }
        let outcome = pipeline::compile_page(ctx, page);
        if outcome.is_err() && config.fail_fast {
            stop.store(true, Ordering::Relaxed);
        }
        outcomes.lock().unwrap_or_else(|e| e.into_inner())[index] = Some(outcome);
    };

    if threads == 1 {
        worker();
    } else {
        let panicked = thread::scope(|scope| {
            let handles: Vec<_> = (0..threads).map(|_| scope.spawn(&worker)).collect();
            handles.into_iter().fold(false, |panicked, handle| handle.join().is_err() || panicked)
        });
        if panicked {
            return Err(BatchError::WorkerPanicked);
        }
    }

    let mut results = BatchResults {
        pages_discovered: pages.len(),
        ..Default::default()
    };
    let outcomes = outcomes.into_inner().unwrap_or_else(|e| e.into_inner());
    for (page, outcome) in pages.iter().zip(outcomes) {
        match outcome {
            Some(Ok(unit)) => results.compiled.push(unit),
            Some(Err(error)) => {
                log_error!(error.error_code(), "Page failed to compile",
                    "page" => page,
                    "error" => &error
                );
                results.failed.push((page.clone(), error));
            }
            None => results.pages_skipped += 1,
        }
    }
    if results.pages_skipped > 0 {
        log_warning!("Fail-fast stopped the batch", "skipped" => results.pages_skipped);
    }
    results.processing_duration = started.elapsed();

    log_success!(codes::success::BATCH_COMPLETE, "Batch compilation completed",
        "compiled" => results.success_count(),
        "failed" => results.failure_count(),
        "skipped" => results.pages_skipped,
        "duration_ms" => format!("{:.2}", results.processing_duration.as_secs_f64() * 1000.0)
    );
    Ok(results)
}

/// Discover and compile every page under `webroot`
pub fn compile_webroot(
    ctx: &CompilationContext,
    webroot: &Path,
    config: &BatchConfig,
) -> Result<BatchResults, BatchError> {
    let pages = discover_pages(webroot, config)?;
    compile_pages(ctx, &pages, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompilerOptions;
    use crate::logging::codes::directive;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn config(threads: usize) -> BatchConfig {
        BatchConfig {
            max_threads: threads,
            recursive: true,
            max_files: None,
            progress_reporting: false,
            fail_fast: false,
        }
    }

    fn write(root: &Path, path: &str, content: &str) {
        let file = root.join(path.trim_start_matches('/'));
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(file, content).unwrap();
    }

    fn context(root: &Path) -> CompilationContext {
        CompilationContext::new(CompilerOptions::default(), Arc::new(FsResources::new(root)))
    }

    #[test]
    fn test_discovery_finds_pages_only() {
        let dir = tempdir().unwrap();
        write(dir.path(), "/index.jsp", "hi");
        write(dir.path(), "/admin/users.jspx", "<jsp:root xmlns:jsp=\"http://java.sun.com/JSP/Page\" version=\"2.1\"/>");
        write(dir.path(), "/WEB-INF/tags/box.tag", "box");
        write(dir.path(), "/readme.txt", "text");

        let pages = discover_pages(dir.path(), &config(1)).unwrap();
        assert_eq!(pages, vec!["/admin/users.jspx", "/index.jsp"]);

        let shallow = BatchConfig {
            recursive: false,
            ..config(1)
        };
        assert_eq!(discover_pages(dir.path(), &shallow).unwrap(), vec!["/index.jsp"]);
    }

    #[test]
    fn test_discovery_errors() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            discover_pages(dir.path(), &config(1)),
            Err(BatchError::NoPagesFound { .. })
        ));
        assert!(matches!(
            discover_pages(&dir.path().join("missing"), &config(1)),
            Err(BatchError::WebRootNotFound { .. })
        ));
    }

    #[test]
    fn test_parallel_batch_shares_tag_files() {
        let _ = crate::logging::init_global_logging();
        let dir = tempdir().unwrap();
        write(dir.path(), "/WEB-INF/tags/box.tag", "<%@ attribute name=\"title\" %>[${title}]");
        for i in 0..6 {
            write(
                dir.path(),
                &format!("/p{}.jsp", i),
                "<%@ taglib prefix=\"t\" tagdir=\"/WEB-INF/tags\" %><t:box title=\"x\"/>",
            );
        }
        write(dir.path(), "/broken.jsp", "<jsp:include page=\"a.jsp\">");

        let ctx = context(dir.path());
        let results = compile_webroot(&ctx, dir.path(), &config(3)).unwrap();
        assert_eq!(results.success_count(), 6);
        assert_eq!(results.failure_count(), 1);
        assert_eq!(results.failed[0].0, "/broken.jsp");
        assert!(results.failed[0].1.translation().is_some());

        assert_eq!(ctx.tag_files().len(), 1);
        let entry = ctx.tag_files().get("/WEB-INF/tags/box.tag").unwrap();
        assert!(entry.handler().is_some_and(|h| !h.prototype));
    }

    #[test]
    fn test_fail_fast_skips_remaining_pages() {
        let _ = crate::logging::init_global_logging();
        let dir = tempdir().unwrap();
        write(dir.path(), "/a.jsp", "<%@ page buffer=\"none\" autoFlush=\"false\" %>");
        write(dir.path(), "/b.jsp", "ok");
        write(dir.path(), "/c.jsp", "ok");

        let ctx = context(dir.path());
        let config = BatchConfig {
            fail_fast: true,
            ..config(1)
        };
        let results = compile_webroot(&ctx, dir.path(), &config).unwrap();
        assert_eq!(results.failure_count(), 1);
        assert_eq!(results.pages_skipped, 2);
        assert_eq!(results.failed[0].1.error_code(), directive::INVALID_DIRECTIVE_VALUE);
    }
}
