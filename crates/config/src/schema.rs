use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SvcplugConfig {
    pub paths: PathsConfig,
    pub discovery: DiscoveryConfig,
    pub regenerate: RegenerateConfig,
    pub services: ServicesConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Root holding one directory per implementation unit.
    pub services_dir: PathBuf,
    /// Root holding one directory per generated wrapper.
    pub plugins_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            services_dir: PathBuf::from("crates/services/src"),
            plugins_dir: PathBuf::from("plugins"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Entry file names tried in order inside each unit directory.
    pub entry_files: Vec<String>,
    /// Directory names never treated as units.
    pub ignore_dirs: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            entry_files: vec!["service.rs".into(), "mod.rs".into()],
            ignore_dirs: ["target", "build", "dist", "node_modules"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegenerateConfig {
    pub force_empty: bool,
    /// Value written to the `provider` field of every manifest.
    pub provider: String,
}

impl Default for RegenerateConfig {
    fn default() -> Self {
        Self {
            force_empty: false,
            provider: "local".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServicesConfig {
    /// Root for files read and written by the bundled units.
    pub uploads_dir: PathBuf,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            uploads_dir: PathBuf::from("uploads"),
        }
    }
}
