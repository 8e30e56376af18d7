//! Registry of tag-file compilation state
//!
//! Every tag file gets exactly one [`TagFileEntry`] per compilation context,
//! created under a single lock. Reentrancy is tracked separately by the
//! [`CompileChain`] each compile carries down its own call stack, so no lock
//! is held while a tag file is being compiled.

use std::collections::{BTreeMap, HashMap};
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Reference to the handler produced for a tag file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerRef {
    pub class_name: String,
    pub path: String,
    /// Throwaway instance compiled to break a reference cycle
    pub prototype: bool,
    /// Files the handler was built from, with their modification stamps
    pub dependencies: BTreeMap<String, Option<i64>>,
}

#[derive(Debug)]
pub struct TagFileEntry {
    path: String,
    handler: Mutex<Option<HandlerRef>>,
    compilations: AtomicUsize,
}

impl TagFileEntry {
    fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            handler: Mutex::new(None),
            compilations: AtomicUsize::new(0),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn handler(&self) -> Option<HandlerRef> {
        self.handler
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Store a finished handler; when another compile stored one first,
    /// that one is kept and returned
    pub fn store(&self, handler: HandlerRef) -> HandlerRef {
        self.handler
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get_or_insert(handler)
            .clone()
    }

    pub(crate) fn record_compilation(&self) {
        self.compilations.fetch_add(1, Ordering::Relaxed);
    }

    /// Full (non-prototype) compilations run for this entry
    pub fn compilations(&self) -> usize {
        self.compilations.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Default)]
pub struct TagFileRegistry {
    entries: Mutex<HashMap<String, Arc<TagFileEntry>>>,
}

impl TagFileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find_or_create(&self, path: &str) -> Arc<TagFileEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(path.to_string())
            .or_insert_with(|| Arc::new(TagFileEntry::new(path)))
            .clone()
    }

    pub fn get(&self, path: &str) -> Option<Arc<TagFileEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(path)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Tag files being compiled on the current call chain
#[derive(Debug, Default)]
pub struct CompileChain {
    active: Vec<String>,
    prototypes: Vec<HandlerRef>,
}

impl CompileChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self, path: &str) -> bool {
        self.active.iter().any(|p| p == path)
    }

    pub fn depth(&self) -> usize {
        self.active.len()
    }

    /// Mark `path` as being compiled until the guard is dropped
    pub fn enter(&mut self, path: &str) -> ChainGuard<'_> {
        self.active.push(path.to_string());
        ChainGuard { chain: self }
    }

    pub fn record_prototype(&mut self, handler: HandlerRef) {
        self.prototypes.push(handler);
    }

    /// Prototype handlers produced so far, to be discarded by the caller
    pub fn prototypes(&self) -> &[HandlerRef] {
        &self.prototypes
    }
}

pub struct ChainGuard<'a> {
    chain: &'a mut CompileChain,
}

impl Deref for ChainGuard<'_> {
    type Target = CompileChain;

    fn deref(&self) -> &CompileChain {
        self.chain
    }
}

impl DerefMut for ChainGuard<'_> {
    fn deref_mut(&mut self) -> &mut CompileChain {
        self.chain
    }
}

impl Drop for ChainGuard<'_> {
    fn drop(&mut self) {
        self.chain.active.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn handler(class: &str) -> HandlerRef {
        HandlerRef {
            class_name: class.to_string(),
            path: "/WEB-INF/tags/a.tag".to_string(),
            prototype: false,
            dependencies: BTreeMap::new(),
        }
    }

    #[test]
    fn test_one_entry_per_path_across_threads() {
        let registry = Arc::new(TagFileRegistry::new());
        let entries: Vec<Arc<TagFileEntry>> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                thread::spawn(move || registry.find_or_create("/WEB-INF/tags/a.tag"))
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect();
        assert_eq!(registry.len(), 1);
        assert!(entries.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn test_first_stored_handler_wins() {
        let entry = TagFileEntry::new("/WEB-INF/tags/a.tag");
        assert!(entry.handler().is_none());
        assert_eq!(entry.store(handler("First")).class_name, "First");
        assert_eq!(entry.store(handler("Second")).class_name, "First");
    }

    #[test]
    fn test_chain_guard_pops_on_every_exit() {
        let mut chain = CompileChain::new();
        {
            let mut outer = chain.enter("/a.tag");
            assert!(outer.is_active("/a.tag"));
            {
                let inner = outer.enter("/b.tag");
                assert_eq!(inner.depth(), 2);
            }
            assert!(!outer.is_active("/b.tag"));
            let failed: Result<(), ()> = (|| {
                let _guard = outer.enter("/c.tag");
                Err(())
            })();
            assert!(failed.is_err());
            assert_eq!(outer.depth(), 1);
        }
        assert_eq!(chain.depth(), 0);
    }
}
