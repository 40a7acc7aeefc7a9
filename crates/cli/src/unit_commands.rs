//! Static inspection: `extract` and `units`.

use std::path::Path;

use {
    svcplug_config::SvcplugConfig,
    svcplug_extract::{ExtractError, Extraction, parse_file_tasks},
    svcplug_plugins::discover_units,
    tracing::warn,
};

use crate::discovery_options;

pub fn extract(file: &Path, json: bool) -> anyhow::Result<()> {
    let extraction = match parse_file_tasks(file) {
        Ok(extraction) => extraction,
        Err(e @ ExtractError::Read { .. }) => return Err(e.into()),
        Err(e) => {
            warn!(?file, error = %e, "source does not parse, no tasks");
            Extraction::default()
        },
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&extraction)?);
    } else {
        for task in &extraction.tasks {
            println!("{task}");
        }
    }
    Ok(())
}

pub fn units(config: &SvcplugConfig, json: bool) -> anyhow::Result<()> {
    let units = discover_units(&config.paths.services_dir, &discovery_options(config));

    if json {
        let entries: Vec<serde_json::Value> = units
            .iter()
            .map(|unit| {
                serde_json::json!({
                    "name": unit.name,
                    "source_path": unit.source_path,
                    "tasks": unit.declared_tasks(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if units.is_empty() {
        println!("no service units under {}", config.paths.services_dir.display());
    }
    for unit in &units {
        let tasks = unit.declared_tasks();
        let tasks = if tasks.is_empty() {
            "(none)".to_string()
        } else {
            tasks.join(", ")
        };
        println!("  {}: {tasks}  [{}]", unit.name, unit.source_path.display());
    }
    Ok(())
}
