//! Wrapper synthesis.
//!
//! A wrapper is a small Rust module that names one service unit, lists its
//! tasks as a module-level literal and forwards every call to the unit
//! through the [`ServiceCatalog`](svcplug_common::ServiceCatalog). It never
//! contains unit logic, so regenerating it is always safe.

use std::{
    fmt::Write as _,
    path::{Path, PathBuf},
};

use {serde::Serialize, tracing::debug};

use crate::{
    error::{Error, Result},
    manifest::{DEFAULT_PROVIDER, ManifestRecord, ManifestStore, write_atomic},
};

pub const WRAPPER_FILE: &str = "plugin.rs";

/// Files produced for one unit, not yet on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrapperArtifacts {
    pub unit: String,
    pub wrapper_source: String,
    pub manifest: ManifestRecord,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Synthesis {
    Wrapper(WrapperArtifacts),
    /// Nothing was produced: the unit declares no tasks.
    Refused { unit: String },
}

pub struct Synthesizer {
    plugins_root: PathBuf,
    provider: String,
}

impl Synthesizer {
    pub fn new(plugins_root: impl Into<PathBuf>) -> Self {
        Self {
            plugins_root: plugins_root.into(),
            provider: DEFAULT_PROVIDER.into(),
        }
    }

    #[must_use]
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    pub fn plugins_root(&self) -> &Path {
        &self.plugins_root
    }

    pub fn unit_dir(&self, unit: &str) -> PathBuf {
        self.plugins_root.join(unit)
    }

    /// Produce the wrapper source and manifest for `unit`.
    ///
    /// An empty task list is refused unless `force_empty` is set; a forced
    /// empty wrapper inherits its tasks from the loaded unit at runtime.
    pub fn synthesize(&self, unit: &str, tasks: &[String], force_empty: bool) -> Result<Synthesis> {
        validate_unit_name(unit)?;
        if tasks.is_empty() && !force_empty {
            debug!(unit, "refusing to synthesize a wrapper without tasks");
            return Ok(Synthesis::Refused { unit: unit.into() });
        }

        let manifest = ManifestRecord::new(unit, tasks.to_vec()).with_provider(&self.provider);
        Ok(Synthesis::Wrapper(WrapperArtifacts {
            unit: unit.into(),
            wrapper_source: render_wrapper(unit, tasks),
            manifest,
        }))
    }

    /// Replace the contents of the unit's wrapper directory with `artifacts`.
    ///
    /// Every regular file already in the directory is removed first;
    /// subdirectories are left in place. Returns the wrapper path.
    pub fn write(&self, artifacts: &WrapperArtifacts) -> Result<PathBuf> {
        validate_unit_name(&artifacts.unit)?;
        let dir = self.unit_dir(&artifacts.unit);
        std::fs::create_dir_all(&dir)?;

        for entry in std::fs::read_dir(&dir)?.flatten() {
            let path = entry.path();
            if path.is_file() {
                std::fs::remove_file(&path)?;
            }
        }

        let wrapper_path = dir.join(WRAPPER_FILE);
        write_atomic(&wrapper_path, artifacts.wrapper_source.as_bytes())?;
        ManifestStore::in_dir(&dir).save(&artifacts.manifest)?;
        debug!(unit = %artifacts.unit, ?wrapper_path, "wrapper written");
        Ok(wrapper_path)
    }
}

/// Reject names that cannot be a single directory component.
pub fn validate_unit_name(name: &str) -> Result<()> {
    let reason = if name.is_empty() {
        "must not be empty"
    } else if name.starts_with('.') {
        "must not start with a dot"
    } else if name.contains(['/', '\\']) {
        "must not contain path separators"
    } else if name.contains(|c: char| c.is_control()) {
        "must not contain control characters"
    } else {
        return Ok(());
    };
    Err(Error::invalid_unit_name(name, reason))
}

fn render_wrapper(unit: &str, tasks: &[String]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "// Generated by `svcplug regenerate`. Do not edit.");
    let _ = writeln!(out, "//");
    let _ = writeln!(out, "// Forwards every task to the `{unit}` service unit.");
    out.push('\n');
    out.push_str("use svcplug_plugins::{PluginWrapper, ServiceCatalog};\n\n");
    let _ = writeln!(out, "pub const NAME: &str = {unit:?};");
    out.push('\n');

    if tasks.is_empty() {
        out.push_str("pub const TASKS: &[&str] = &[];\n");
    } else {
        out.push_str("pub const TASKS: &[&str] = &[\n");
        for task in tasks {
            let _ = writeln!(out, "    {task:?},");
        }
        out.push_str("];\n");
    }

    out.push_str(
        "\npub fn wrapper(catalog: &ServiceCatalog) -> PluginWrapper {\n    \
         PluginWrapper::from_catalog(NAME, TASKS, catalog)\n}\n",
    );
    out
}
