//! Environment integration: `${VAR}` expansion and `SVCPLUG_*` overrides.

use std::path::PathBuf;

use crate::schema::SvcplugConfig;

pub const SERVICES_DIR_VAR: &str = "SVCPLUG_SERVICES_DIR";
pub const PLUGINS_DIR_VAR: &str = "SVCPLUG_PLUGINS_DIR";
pub const UPLOADS_DIR_VAR: &str = "SVCPLUG_UPLOADS_DIR";

/// Expand `${VAR}` placeholders from the process environment.
pub fn expand_placeholders(input: &str) -> String {
    expand_with(input, |name| std::env::var(name).ok())
}

/// Placeholders that are unset, empty (`${}`) or unterminated are copied
/// through unchanged.
fn expand_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(len) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let name = &after[..len];
        match (!name.is_empty()).then(|| lookup(name)).flatten() {
            Some(value) => out.push_str(&value),
            None => out.push_str(&rest[start..start + 2 + len + 1]),
        }
        rest = &after[len + 1..];
    }

    out.push_str(rest);
    out
}

/// Apply `SVCPLUG_*_DIR` overrides from the process environment.
pub fn apply_env_overrides(config: &mut SvcplugConfig) {
    apply_overrides_with(config, |name| std::env::var(name).ok());
}

fn apply_overrides_with(config: &mut SvcplugConfig, lookup: impl Fn(&str) -> Option<String>) {
    let get = |name: &str| lookup(name).filter(|v| !v.is_empty()).map(PathBuf::from);

    if let Some(dir) = get(SERVICES_DIR_VAR) {
        config.paths.services_dir = dir;
    }
    if let Some(dir) = get(PLUGINS_DIR_VAR) {
        config.paths.plugins_dir = dir;
    }
    if let Some(dir) = get(UPLOADS_DIR_VAR) {
        config.services.uploads_dir = dir;
    }
}
