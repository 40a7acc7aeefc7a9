use std::path::{Path, PathBuf};

use {
    anyhow::Context,
    tracing::{debug, warn},
};

use crate::{
    env::{apply_env_overrides, expand_placeholders},
    schema::SvcplugConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "svcplug.toml",
    "svcplug.yaml",
    "svcplug.yml",
    "svcplug.json",
];

/// Load config from `path` (format chosen by extension), expanding
/// `${VAR}` placeholders first.
pub fn load_config(path: &Path) -> anyhow::Result<SvcplugConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_config(&expand_placeholders(&raw), path)
        .with_context(|| format!("failed to parse {}", path.display()))
}

/// Load from `explicit` if given, otherwise from the first standard
/// location, then apply environment overrides.
///
/// A missing or broken file falls back to defaults with a warning; an
/// explicit path that cannot be loaded is an error.
pub fn discover_and_load(explicit: Option<&Path>) -> anyhow::Result<SvcplugConfig> {
    let mut config = match explicit {
        Some(path) => load_config(path)?,
        None => match find_config_file() {
            Some(path) => {
                debug!(path = %path.display(), "loading config");
                load_config(&path).unwrap_or_else(|e| {
                    warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
                    SvcplugConfig::default()
                })
            },
            None => {
                debug!("no config file found, using defaults");
                SvcplugConfig::default()
            },
        },
    };
    apply_env_overrides(&mut config);
    Ok(config)
}

/// First existing config file in `./` or the user config directory.
pub fn find_config_file() -> Option<PathBuf> {
    let local = CONFIG_FILENAMES.iter().map(PathBuf::from);
    let user = config_dir()
        .into_iter()
        .flat_map(|dir| CONFIG_FILENAMES.iter().map(move |name| dir.join(name)));
    local.chain(user).find(|p| p.is_file())
}

/// User config directory (`~/.config/svcplug/` on Linux).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "svcplug").map(|d| d.config_dir().to_path_buf())
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<SvcplugConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_partial_sections_keep_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("svcplug.toml");
        std::fs::write(
            &path,
            "[paths]\nplugins_dir = \"out/plugins\"\n\n[regenerate]\nforce_empty = true\n",
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.paths.plugins_dir, PathBuf::from("out/plugins"));
        assert_eq!(config.paths.services_dir, PathBuf::from("crates/services/src"));
        assert!(config.regenerate.force_empty);
        assert_eq!(config.regenerate.provider, "local");
        assert_eq!(config.discovery.entry_files, vec!["service.rs", "mod.rs"]);
    }

    #[test]
    fn yaml_and_json_formats() {
        let tmp = tempfile::tempdir().unwrap();

        let yaml = tmp.path().join("svcplug.yaml");
        std::fs::write(&yaml, "services:\n  uploads_dir: /data/uploads\n").unwrap();
        assert_eq!(
            load_config(&yaml).unwrap().services.uploads_dir,
            PathBuf::from("/data/uploads")
        );

        let json = tmp.path().join("svcplug.json");
        std::fs::write(&json, r#"{"discovery": {"ignore_dirs": ["vendor"]}}"#).unwrap();
        assert_eq!(load_config(&json).unwrap().discovery.ignore_dirs, vec!["vendor"]);
    }

    #[test]
    fn unknown_extension_and_bad_content_fail() {
        let tmp = tempfile::tempdir().unwrap();
        let ini = tmp.path().join("svcplug.ini");
        std::fs::write(&ini, "x=1").unwrap();
        assert!(load_config(&ini).is_err());

        let broken = tmp.path().join("svcplug.toml");
        std::fs::write(&broken, "[paths\n").unwrap();
        assert!(load_config(&broken).is_err());
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(discover_and_load(Some(&tmp.path().join("absent.toml"))).is_err());
    }
}
