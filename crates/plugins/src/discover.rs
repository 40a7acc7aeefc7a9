//! Discovery of implementation units under a services root.

use std::path::{Path, PathBuf};

use {serde::Serialize, tracing::warn};

pub const DEFAULT_ENTRY_FILES: &[&str] = &["service.rs", "mod.rs"];
pub const DEFAULT_IGNORE_DIRS: &[&str] = &["target", "build", "dist", "node_modules"];

/// One implementation unit: a directory holding an entry source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceUnit {
    pub name: String,
    pub dir: PathBuf,
    pub source_path: PathBuf,
}

impl ServiceUnit {
    /// Tasks statically declared by the unit's entry file.
    pub fn declared_tasks(&self) -> Vec<String> {
        svcplug_extract::extract_tasks_from_file(&self.source_path)
    }
}

/// Where to look and what to skip.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    pub entry_files: Vec<String>,
    pub ignore_dirs: Vec<String>,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            entry_files: DEFAULT_ENTRY_FILES.iter().map(|s| s.to_string()).collect(),
            ignore_dirs: DEFAULT_IGNORE_DIRS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl DiscoveryOptions {
    pub fn is_ignored(&self, dir_name: &str) -> bool {
        dir_name.starts_with('.') || self.ignore_dirs.iter().any(|d| d == dir_name)
    }
}

/// Immediate subdirectories of `root` that contain one of the entry files,
/// sorted by name. The first matching entry file wins.
pub fn discover_units(root: &Path, options: &DiscoveryOptions) -> Vec<ServiceUnit> {
    let entries = match std::fs::read_dir(root) {
        Ok(e) => e,
        Err(e) => {
            warn!(?root, %e, "cannot read services root");
            return Vec::new();
        },
    };

    let mut units: Vec<ServiceUnit> = entries
        .flatten()
        .filter_map(|entry| {
            let dir = entry.path();
            if !dir.is_dir() {
                return None;
            }
            let name = entry.file_name().to_str()?.to_string();
            if options.is_ignored(&name) {
                return None;
            }
            let source_path = options
                .entry_files
                .iter()
                .map(|f| dir.join(f))
                .find(|p| p.is_file())?;
            Some(ServiceUnit {
                name,
                dir,
                source_path,
            })
        })
        .collect();

    units.sort_by(|a, b| a.name.cmp(&b.name));
    units
}
