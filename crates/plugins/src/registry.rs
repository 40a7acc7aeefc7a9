//! In-memory index of wrapper units found under a plugins root.
//!
//! A scan builds a fresh [`RegistryIndex`] and swaps it in whole, so readers
//! see either the previous index or the new one, never a mix.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::{Arc, RwLock},
};

use {
    svcplug_common::ServiceCatalog,
    svcplug_extract::parse_file_tasks,
    tracing::{debug, info, warn},
};

use crate::{
    discover::DiscoveryOptions,
    manifest::{ManifestRecord, ManifestStore},
    outcome::DispatchError,
    synth::WRAPPER_FILE,
    wrapper::{Plugin, PluginStatsSnapshot, PluginWrapper},
};

/// One indexed wrapper unit.
pub struct RegistryEntry {
    pub name: String,
    /// Tasks recorded for the wrapper at scan time.
    pub tasks: Vec<String>,
    pub wrapper_path: PathBuf,
    pub manifest: Option<ManifestRecord>,
    pub plugin: Arc<dyn Plugin>,
}

/// Immutable snapshot of the registry.
#[derive(Default)]
pub struct RegistryIndex {
    entries: BTreeMap<String, RegistryEntry>,
}

impl RegistryIndex {
    pub fn get(&self, unit: &str) -> Option<&RegistryEntry> {
        self.entries.get(unit)
    }

    pub fn contains(&self, unit: &str) -> bool {
        self.entries.contains_key(unit)
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn entries(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct PluginRegistry {
    catalog: ServiceCatalog,
    discovery: DiscoveryOptions,
    index: RwLock<Arc<RegistryIndex>>,
}

impl PluginRegistry {
    pub fn new(catalog: ServiceCatalog) -> Self {
        Self {
            catalog,
            discovery: DiscoveryOptions::default(),
            index: RwLock::new(Arc::new(RegistryIndex::default())),
        }
    }

    #[must_use]
    pub fn with_discovery(mut self, discovery: DiscoveryOptions) -> Self {
        self.discovery = discovery;
        self
    }

    pub fn catalog(&self) -> &ServiceCatalog {
        &self.catalog
    }

    /// Rebuild the index from `root` and install it.
    ///
    /// Units whose task list did not change keep their existing wrapper, and
    /// with it any loaded capability object.
    pub fn scan(&self, root: &Path) -> Arc<RegistryIndex> {
        let previous = self.snapshot();
        let mut entries = BTreeMap::new();

        match std::fs::read_dir(root) {
            Ok(dir_entries) => {
                for entry in dir_entries.flatten() {
                    let dir = entry.path();
                    if !dir.is_dir() {
                        continue;
                    }
                    let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                        continue;
                    };
                    if self.discovery.is_ignored(&name) {
                        continue;
                    }
                    if let Some(indexed) = self.index_dir(&name, &dir, &previous) {
                        entries.insert(name, indexed);
                    }
                }
            },
            Err(e) => warn!(?root, %e, "cannot read plugins root"),
        }

        let index = Arc::new(RegistryIndex { entries });
        *self.index.write().unwrap_or_else(|e| e.into_inner()) = Arc::clone(&index);
        info!(?root, units = index.len(), "plugin registry scanned");
        index
    }

    fn index_dir(&self, name: &str, dir: &Path, previous: &RegistryIndex) -> Option<RegistryEntry> {
        let wrapper_path = dir.join(WRAPPER_FILE);
        if !wrapper_path.is_file() {
            debug!(?dir, "no wrapper entry point, skipping");
            return None;
        }

        let manifest = match ManifestStore::in_dir(dir).load() {
            Ok(manifest) => manifest,
            Err(e) => {
                warn!(unit = name, error = %e, "ignoring unreadable manifest");
                None
            },
        };

        let tasks = match &manifest {
            Some(record) => {
                if record.name != name {
                    warn!(unit = name, manifest_name = %record.name, "manifest name differs from folder");
                }
                record.tasks.clone()
            },
            None => match parse_file_tasks(&wrapper_path) {
                Ok(extraction) => extraction.tasks,
                Err(e) => {
                    warn!(unit = name, ?wrapper_path, error = %e, "corrupt wrapper unit, skipping");
                    return None;
                },
            },
        };

        let plugin = match previous.get(name) {
            Some(prior) if prior.plugin.declared_tasks() == tasks.as_slice() => {
                Arc::clone(&prior.plugin)
            },
            _ => {
                if !self.catalog.contains(name) {
                    warn!(unit = name, "wrapper has no linked service unit");
                }
                Arc::new(PluginWrapper::new(name, tasks.clone(), self.catalog.factory(name)))
                    as Arc<dyn Plugin>
            },
        };

        Some(RegistryEntry {
            name: name.to_string(),
            tasks,
            wrapper_path,
            manifest,
            plugin,
        })
    }

    /// Current index.
    pub fn snapshot(&self) -> Arc<RegistryIndex> {
        Arc::clone(&*self.index.read().unwrap_or_else(|e| e.into_inner()))
    }

    /// `unit -> effective tasks`.
    pub fn list(&self) -> BTreeMap<String, Vec<String>> {
        self.snapshot()
            .entries()
            .map(|e| (e.name.clone(), e.plugin.tasks()))
            .collect()
    }

    pub fn resolve(&self, unit: &str) -> Result<Arc<dyn Plugin>, DispatchError> {
        self.snapshot()
            .get(unit)
            .map(|e| Arc::clone(&e.plugin))
            .ok_or_else(|| DispatchError::unknown_unit(unit))
    }

    pub fn stats(&self) -> BTreeMap<String, PluginStatsSnapshot> {
        self.snapshot()
            .entries()
            .map(|e| (e.name.clone(), e.plugin.stats()))
            .collect()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::synth::{Synthesis, Synthesizer},
    };

    fn write_wrapper(root: &Path, unit: &str, tasks: &[&str]) {
        let tasks: Vec<String> = tasks.iter().map(|s| s.to_string()).collect();
        let synth = Synthesizer::new(root);
        let Synthesis::Wrapper(artifacts) = synth.synthesize(unit, &tasks, true).unwrap() else {
            panic!("forced synthesis always yields a wrapper");
        };
        synth.write(&artifacts).unwrap();
    }

    #[test]
    fn scan_indexes_valid_dirs_and_skips_the_rest() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        write_wrapper(root, "echo", &["ping"]);
        write_wrapper(root, "dummy", &["ping", "echo"]);
        std::fs::create_dir_all(root.join("no_wrapper")).unwrap();
        std::fs::create_dir_all(root.join(".hidden")).unwrap();
        std::fs::write(root.join(".hidden/plugin.rs"), "pub const TASKS: &[&str] = &[\"x\"];")
            .unwrap();
        std::fs::create_dir_all(root.join("corrupt")).unwrap();
        std::fs::write(root.join("corrupt/plugin.rs"), "fn (").unwrap();
        std::fs::write(root.join("corrupt/manifest.json"), "{").unwrap();

        let registry = PluginRegistry::new(ServiceCatalog::new());
        let index = registry.scan(root);
        assert_eq!(index.names(), vec!["dummy", "echo"]);

        let listing = registry.list();
        assert_eq!(listing["echo"], vec!["ping"]);
        assert_eq!(listing["dummy"], vec!["ping", "echo"]);
    }

    #[test]
    fn wrapper_source_is_used_without_manifest() {
        let tmp = tempfile::tempdir().unwrap();
        write_wrapper(tmp.path(), "echo", &["ping"]);
        std::fs::remove_file(tmp.path().join("echo/manifest.json")).unwrap();

        let registry = PluginRegistry::new(ServiceCatalog::new());
        registry.scan(tmp.path());
        assert_eq!(registry.list()["echo"], vec!["ping"]);
        assert!(registry.snapshot().get("echo").unwrap().manifest.is_none());
    }

    #[test]
    fn deeply_nested_wrapper_is_skipped_without_hiding_siblings() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        write_wrapper(root, "echo", &["ping"]);
        write_wrapper(root, "dummy", &["ping", "echo"]);
        std::fs::create_dir_all(root.join("nested")).unwrap();
        let src = format!(
            "pub const TASKS: &[&str] = &[\"go\"];\nconst X: u8 = {}1{};",
            "(".repeat(3000),
            ")".repeat(3000)
        );
        std::fs::write(root.join("nested/plugin.rs"), src).unwrap();

        let registry = PluginRegistry::new(ServiceCatalog::new());
        let index = registry.scan(root);
        assert_eq!(index.names(), vec!["dummy", "echo"]);
    }

    #[test]
    fn missing_root_gives_empty_index() {
        let tmp = tempfile::tempdir().unwrap();
        let registry = PluginRegistry::new(ServiceCatalog::new());
        assert!(registry.scan(&tmp.path().join("absent")).is_empty());
        assert!(registry.list().is_empty());
    }

    #[test]
    fn resolve_unknown_unit() {
        let registry = PluginRegistry::new(ServiceCatalog::new());
        let err = registry.resolve("nope").err().unwrap();
        assert_eq!(err, DispatchError::unknown_unit("nope"));
    }

    #[test]
    fn rescan_replaces_changed_units_only() {
        let tmp = tempfile::tempdir().unwrap();
        write_wrapper(tmp.path(), "echo", &["ping"]);
        write_wrapper(tmp.path(), "dummy", &["ping"]);

        let registry = PluginRegistry::new(ServiceCatalog::new());
        registry.scan(tmp.path());
        let echo_before = registry.resolve("echo").unwrap();
        let dummy_before = registry.resolve("dummy").unwrap();

        write_wrapper(tmp.path(), "dummy", &["ping", "echo"]);
        std::fs::remove_dir_all(tmp.path().join("echo")).unwrap();
        write_wrapper(tmp.path(), "echo", &["ping"]);
        registry.scan(tmp.path());

        assert!(Arc::ptr_eq(&echo_before, &registry.resolve("echo").unwrap()));
        assert!(!Arc::ptr_eq(&dummy_before, &registry.resolve("dummy").unwrap()));
        assert_eq!(registry.list()["dummy"], vec!["ping", "echo"]);
    }
}
