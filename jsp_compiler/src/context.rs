//! Shared compilation context
//!
//! One `CompilationContext` serves every unit compiled in a run. It carries
//! the options, the resource provider, the pre-parsed tag library
//! descriptors and the registries that stand in for a class loader: known
//! classes, `TagExtraInfo` and validator implementations, and tag plugins.
//! It also owns the two caches shared across units, resolved libraries and
//! the tag-file registry.
//!
//! The context is `Send + Sync`; batch compilation shares it in an `Arc`.

use crate::config::CompilerOptions;
use crate::errors::JspError;
use crate::plugin::{PluginTable, TagPlugin};
use crate::resources::ResourceProvider;
use crate::taglib::descriptor::TagLibraryDescriptor;
use crate::taglib::extra::{TagExtraInfo, TagLibraryValidator};
use crate::taglib::TagLibraryInfo;
use crate::tagfile::TagFileRegistry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodInfo {
    pub name: String,
    /// Parameter type names, fully qualified or primitive
    pub params: Vec<String>,
    pub return_type: String,
}

impl MethodInfo {
    pub fn new(name: &str, params: &[&str], return_type: &str) -> Self {
        Self {
            name: name.to_string(),
            params: params.iter().map(|p| p.to_string()).collect(),
            return_type: return_type.to_string(),
        }
    }
}

/// What the compiler knows about one class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassInfo {
    pub name: String,
    pub interfaces: Vec<String>,
    pub methods: Vec<MethodInfo>,
    /// Methods are not enumerated; any method lookup succeeds
    pub open: bool,
}

impl ClassInfo {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            interfaces: Vec::new(),
            methods: Vec::new(),
            open: false,
        }
    }

    pub fn implementing(mut self, interface: &str) -> Self {
        self.interfaces.push(interface.to_string());
        self
    }

    pub fn with_method(mut self, method: MethodInfo) -> Self {
        self.methods.push(method);
        self
    }

    pub fn open(mut self) -> Self {
        self.open = true;
        self
    }

    pub fn implements(&self, interface: &str) -> bool {
        self.interfaces.iter().any(|i| i == interface)
    }
}

/// Outcome of a method lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodLookup {
    Found,
    ClassMissing,
    MethodMissing,
}

/// Classes visible to the compiled application.
///
/// In permissive mode every class name resolves, with unknown methods and
/// interfaces; this is what `jspc` uses when no class information is given.
#[derive(Debug, Clone, Default)]
pub struct ClassRegistry {
    classes: HashMap<String, ClassInfo>,
    permissive: bool,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn permissive() -> Self {
        Self {
            classes: HashMap::new(),
            permissive: true,
        }
    }

    pub fn is_permissive(&self) -> bool {
        self.permissive
    }

    pub fn add(&mut self, class: ClassInfo) {
        self.classes.insert(class.name.clone(), class);
    }

    pub fn get(&self, name: &str) -> Option<&ClassInfo> {
        self.classes.get(name)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.permissive || self.classes.contains_key(name)
    }

    /// `None` when the class is unknown to a permissive registry
    pub fn implements(&self, class: &str, interface: &str) -> Option<bool> {
        match self.classes.get(class) {
            Some(info) => Some(info.implements(interface)),
            None if self.permissive => None,
            None => Some(false),
        }
    }

    /// Look for a method with exactly these parameter types
    pub fn find_method(&self, class: &str, method: &str, params: &[String]) -> MethodLookup {
        let Some(info) = self.classes.get(class) else {
            return if self.permissive {
                MethodLookup::Found
            } else {
                MethodLookup::ClassMissing
            };
        };
        if info.open
            || info
                .methods
                .iter()
                .any(|m| m.name == method && m.params == params)
        {
            MethodLookup::Found
        } else {
            MethodLookup::MethodMissing
        }
    }
}

/// Everything shared by the units of one compilation run
pub struct CompilationContext {
    options: CompilerOptions,
    resources: Arc<dyn ResourceProvider>,
    descriptors_by_uri: HashMap<String, Arc<TagLibraryDescriptor>>,
    descriptors_by_location: HashMap<String, Arc<TagLibraryDescriptor>>,
    classes: ClassRegistry,
    tag_extra_infos: HashMap<String, Arc<dyn TagExtraInfo>>,
    validators: HashMap<String, Arc<dyn TagLibraryValidator>>,
    plugins: HashMap<String, Arc<dyn TagPlugin>>,
    libraries: Mutex<HashMap<String, Arc<TagLibraryInfo>>>,
    plugin_table: OnceLock<Result<Arc<PluginTable>, JspError>>,
    tag_files: TagFileRegistry,
    next_unit_id: AtomicUsize,
}

impl std::fmt::Debug for CompilationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompilationContext")
            .field("options", &self.options)
            .field("descriptors", &self.descriptors_by_uri.len())
            .field("classes", &self.classes)
            .field("tag_files", &self.tag_files)
            .finish_non_exhaustive()
    }
}

impl CompilationContext {
    pub fn new(options: CompilerOptions, resources: Arc<dyn ResourceProvider>) -> Self {
        Self {
            options,
            resources,
            descriptors_by_uri: HashMap::new(),
            descriptors_by_location: HashMap::new(),
            classes: ClassRegistry::new(),
            tag_extra_infos: HashMap::new(),
            validators: HashMap::new(),
            plugins: HashMap::new(),
            libraries: Mutex::new(HashMap::new()),
            plugin_table: OnceLock::new(),
            tag_files: TagFileRegistry::new(),
            next_unit_id: AtomicUsize::new(0),
        }
    }

    pub fn with_descriptor(mut self, descriptor: TagLibraryDescriptor) -> Self {
        let descriptor = Arc::new(descriptor);
        if let Some(uri) = &descriptor.uri {
            self.descriptors_by_uri.insert(uri.clone(), descriptor.clone());
        }
        if let Some(location) = &descriptor.location {
            self.descriptors_by_location
                .insert(location.clone(), descriptor.clone());
        }
        self
    }

    pub fn with_descriptors(self, descriptors: impl IntoIterator<Item = TagLibraryDescriptor>) -> Self {
        descriptors
            .into_iter()
            .fold(self, |ctx, descriptor| ctx.with_descriptor(descriptor))
    }

    pub fn with_classes(mut self, classes: ClassRegistry) -> Self {
        self.classes = classes;
        self
    }

    pub fn with_class(mut self, class: ClassInfo) -> Self {
        self.classes.add(class);
        self
    }

    pub fn with_tag_extra_info(mut self, class: &str, tei: Arc<dyn TagExtraInfo>) -> Self {
        self.tag_extra_infos.insert(class.to_string(), tei);
        self
    }

    pub fn with_validator(mut self, class: &str, validator: Arc<dyn TagLibraryValidator>) -> Self {
        self.validators.insert(class.to_string(), validator);
        self
    }

    pub fn with_plugin(mut self, class: &str, plugin: Arc<dyn TagPlugin>) -> Self {
        self.plugins.insert(class.to_string(), plugin);
        self
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn resources(&self) -> &dyn ResourceProvider {
        self.resources.as_ref()
    }

    pub fn classes(&self) -> &ClassRegistry {
        &self.classes
    }

    pub fn descriptor_for_uri(&self, uri: &str) -> Option<&Arc<TagLibraryDescriptor>> {
        self.descriptors_by_uri.get(uri)
    }

    pub fn descriptor_at(&self, location: &str) -> Option<&Arc<TagLibraryDescriptor>> {
        self.descriptors_by_location.get(location)
    }

    pub fn tag_extra_info(&self, class: &str) -> Option<Arc<dyn TagExtraInfo>> {
        self.tag_extra_infos.get(class).cloned()
    }

    pub fn validator(&self, class: &str) -> Option<Arc<dyn TagLibraryValidator>> {
        self.validators.get(class).cloned()
    }

    pub fn plugin(&self, class: &str) -> Option<Arc<dyn TagPlugin>> {
        self.plugins.get(class).cloned()
    }

    pub fn tag_files(&self) -> &TagFileRegistry {
        &self.tag_files
    }

    /// A library resolved earlier in this run
    pub fn cached_library(&self, key: &str) -> Option<Arc<TagLibraryInfo>> {
        self.libraries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    /// Cache a resolved library; when another unit got there first its
    /// instance is kept and returned
    pub fn cache_library(&self, key: &str, library: Arc<TagLibraryInfo>) -> Arc<TagLibraryInfo> {
        self.libraries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(key.to_string())
            .or_insert(library)
            .clone()
    }

    /// Plugin table, loaded from the manifest on first use
    pub fn plugin_table(
        &self,
        load: impl FnOnce() -> Result<PluginTable, JspError>,
    ) -> Result<Arc<PluginTable>, JspError> {
        self.plugin_table
            .get_or_init(|| load().map(Arc::new))
            .clone()
    }

    /// Id used to attribute log events to a unit
    pub fn next_unit_id(&self) -> usize {
        self.next_unit_id.fetch_add(1, Ordering::Relaxed)
    }
}
