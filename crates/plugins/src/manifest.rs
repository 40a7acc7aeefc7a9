//! `manifest.json` records written beside each wrapper.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Context, Error, Result};

pub const MANIFEST_FILE: &str = "manifest.json";
pub const DEFAULT_PROVIDER: &str = "local";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    #[default]
    Plugin,
}

/// Metadata describing one generated wrapper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestRecord {
    pub name: String,
    #[serde(default)]
    pub kind: UnitKind,
    /// Folder of the wrapper, relative to the plugins root.
    #[serde(default)]
    pub folder: String,
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Wrapper entry file, relative to the plugins root.
    #[serde(default, alias = "code")]
    pub code_path: String,
    #[serde(default)]
    pub tasks: Vec<String>,
    /// Model or asset files the unit needs at load time.
    #[serde(default)]
    pub models: Vec<String>,
}

fn default_provider() -> String {
    DEFAULT_PROVIDER.into()
}

impl ManifestRecord {
    pub fn new(name: impl Into<String>, tasks: Vec<String>) -> Self {
        let name = name.into();
        Self {
            folder: name.clone(),
            code_path: format!("{name}/{}", crate::synth::WRAPPER_FILE),
            name,
            kind: UnitKind::Plugin,
            provider: default_provider(),
            tasks,
            models: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }
}

/// Reads and writes a single manifest file with atomic replacement.
pub struct ManifestStore {
    path: PathBuf,
}

impl ManifestStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Store for the manifest inside a wrapper directory.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(MANIFEST_FILE))
    }

    /// `Ok(None)` when the file does not exist. Malformed content is an
    /// [`Error::InvalidManifest`].
    pub fn load(&self) -> Result<Option<ManifestRecord>> {
        if !self.path.is_file() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        serde_json::from_str(&data)
            .map(Some)
            .map_err(|e| Error::invalid_manifest(&self.path, e.to_string()))
    }

    /// Save via temp file + rename.
    pub fn save(&self, record: &ManifestRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(record)?;
        write_atomic(&self.path, data.as_bytes())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

pub(crate) fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, data)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
