//! Resource access for template sources
//!
//! Every page, include, tag file and manifest is addressed by a
//! context-relative path (`/WEB-INF/tags/x.tag`). A [`ResourceProvider`]
//! maps those paths onto a web root on disk or onto an in-memory table.

use crate::config::compile_time::resources::MAX_SOURCE_SIZE;
use crate::logging::{codes, Code};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::RwLock;

pub type ResourceResult<T> = Result<T, ResourceError>;

#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("Resource not found: {path}")]
    NotFound { path: String },

    #[error("Cannot read resource '{path}': {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Resource '{path}' is {size} bytes, larger than the {max} byte limit")]
    TooLarge { path: String, size: u64, max: u64 },

    #[error("Invalid resource path: {path}")]
    InvalidPath { path: String },
}

impl ResourceError {
    pub fn not_found(path: &str) -> Self {
        Self::NotFound {
            path: path.to_string(),
        }
    }

    pub fn invalid_path(path: &str) -> Self {
        Self::InvalidPath {
            path: path.to_string(),
        }
    }

    pub fn error_code(&self) -> Code {
        match self {
            Self::NotFound { .. } | Self::InvalidPath { .. } => {
                codes::resources::RESOURCE_NOT_FOUND
            }
            Self::Unreadable { .. } => codes::resources::RESOURCE_UNREADABLE,
            Self::TooLarge { .. } => codes::resources::SOURCE_TOO_LARGE,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::InvalidPath { .. })
    }

    pub fn path(&self) -> &str {
        match self {
            Self::NotFound { path }
            | Self::Unreadable { path, .. }
            | Self::TooLarge { path, .. }
            | Self::InvalidPath { path } => path,
        }
    }
}

/// Read-only view of the web application's resources
pub trait ResourceProvider: Send + Sync {
    /// Raw bytes of a resource
    fn read(&self, path: &str) -> ResourceResult<Vec<u8>>;

    fn exists(&self, path: &str) -> bool;

    /// Last modification time in milliseconds since the epoch
    fn last_modified(&self, path: &str) -> Option<i64>;

    /// Direct children of a directory, as full context-relative paths.
    /// Sub-directories end with `/`.
    fn list_dir(&self, dir: &str) -> Vec<String>;

    /// Absolute URL of a resource, used for locations in jspc mode
    fn resource_url(&self, path: &str) -> Option<String>;
}

/// Resources served from a web-application root directory
#[derive(Debug, Clone)]
pub struct FsResources {
    root: PathBuf,
}

impl FsResources {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a context-relative path below the root, refusing escapes
    fn locate(&self, path: &str) -> ResourceResult<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(ResourceError::invalid_path(path));
        }
        Ok(self.root.join(relative))
    }

    /// Context-relative form of a file below the root
    pub fn context_path(&self, file: &Path) -> Option<String> {
        let relative = file.strip_prefix(&self.root).ok()?;
        let mut out = String::new();
        for component in relative.components() {
            if let Component::Normal(part) = component {
                out.push('/');
                out.push_str(&part.to_string_lossy());
            }
        }
        if out.is_empty() {
            out.push('/');
        }
        Some(out)
    }
}

impl ResourceProvider for FsResources {
    fn read(&self, path: &str) -> ResourceResult<Vec<u8>> {
        let file = self.locate(path)?;
        let metadata = std::fs::metadata(&file).map_err(|source| match source.kind() {
            std::io::ErrorKind::NotFound => ResourceError::not_found(path),
            _ => ResourceError::Unreadable {
                path: path.to_string(),
                source,
            },
        })?;
        if !metadata.is_file() {
            return Err(ResourceError::not_found(path));
        }
        if metadata.len() > MAX_SOURCE_SIZE {
            return Err(ResourceError::TooLarge {
                path: path.to_string(),
                size: metadata.len(),
                max: MAX_SOURCE_SIZE,
            });
        }
        std::fs::read(&file).map_err(|source| ResourceError::Unreadable {
            path: path.to_string(),
            source,
        })
    }

    fn exists(&self, path: &str) -> bool {
        self.locate(path).map(|p| p.is_file()).unwrap_or(false)
    }

    fn last_modified(&self, path: &str) -> Option<i64> {
        let file = self.locate(path).ok()?;
        let modified = std::fs::metadata(file).ok()?.modified().ok()?;
        Some(chrono::DateTime::<chrono::Utc>::from(modified).timestamp_millis())
    }

    fn list_dir(&self, dir: &str) -> Vec<String> {
        let Ok(location) = self.locate(dir) else {
            return Vec::new();
        };
        let Ok(entries) = std::fs::read_dir(location) else {
            return Vec::new();
        };
        let base = if dir.ends_with('/') {
            dir.to_string()
        } else {
            format!("{}/", dir)
        };
        let mut children: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| {
                let name = entry.file_name().to_string_lossy().into_owned();
                if entry.path().is_dir() {
                    format!("{}{}/", base, name)
                } else {
                    format!("{}{}", base, name)
                }
            })
            .collect();
        children.sort();
        children
    }

    fn resource_url(&self, path: &str) -> Option<String> {
        let file = self.locate(path).ok()?;
        Some(format!("file:{}", file.display()))
    }
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    content: Vec<u8>,
    modified: i64,
}

/// In-memory resources for tests and embedding
#[derive(Debug, Default)]
pub struct MemoryResources {
    entries: RwLock<BTreeMap<String, MemoryEntry>>,
}

impl MemoryResources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`MemoryResources::add`]
    pub fn with(self, path: &str, content: impl Into<Vec<u8>>) -> Self {
        self.add(path, content);
        self
    }

    /// Add or replace a resource; the modification stamp is the current time
    pub fn add(&self, path: &str, content: impl Into<Vec<u8>>) {
        let entry = MemoryEntry {
            content: content.into(),
            modified: chrono::Utc::now().timestamp_millis(),
        };
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(path.to_string(), entry);
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResourceProvider for MemoryResources {
    fn read(&self, path: &str) -> ResourceResult<Vec<u8>> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(path)
            .map(|entry| entry.content.clone())
            .ok_or_else(|| ResourceError::not_found(path))
    }

    fn exists(&self, path: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(path)
    }

    fn last_modified(&self, path: &str) -> Option<i64> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(path)
            .map(|entry| entry.modified)
    }

    fn list_dir(&self, dir: &str) -> Vec<String> {
        let base = if dir.ends_with('/') {
            dir.to_string()
        } else {
            format!("{}/", dir)
        };
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let mut children: Vec<String> = Vec::new();
        for key in entries.keys() {
            let Some(rest) = key.strip_prefix(&base) else {
                continue;
            };
            let child = match rest.find('/') {
                Some(slash) => format!("{}{}", base, &rest[..=slash]),
                None => key.clone(),
            };
            if children.last() != Some(&child) {
                children.push(child);
            }
        }
        children.dedup();
        children
    }

    fn resource_url(&self, path: &str) -> Option<String> {
        Some(format!("memory:{}", path))
    }
}
