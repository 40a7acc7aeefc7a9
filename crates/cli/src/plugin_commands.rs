//! `regenerate`, `list` and `dispatch`.

use {
    anyhow::Context,
    svcplug_config::SvcplugConfig,
    svcplug_plugins::{RegenerateOptions, Regenerator, Synthesizer, UnitReport},
};

use crate::{build_dispatcher, discovery_options};

pub fn regenerate(
    config: &SvcplugConfig,
    only: Vec<String>,
    force_empty: bool,
    json: bool,
) -> anyhow::Result<()> {
    let synthesizer =
        Synthesizer::new(&config.paths.plugins_dir).with_provider(&config.regenerate.provider);
    let regenerator = Regenerator::new(&config.paths.services_dir, synthesizer)
        .with_discovery(discovery_options(config));

    let report = regenerator.regenerate(&RegenerateOptions {
        only: (!only.is_empty()).then_some(only),
        force_empty: force_empty || config.regenerate.force_empty,
    });

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for entry in &report.units {
            match entry {
                UnitReport::Generated {
                    unit,
                    tasks,
                    wrapper_path,
                    ..
                } => println!("  + {unit}: {} -> {}", tasks.join(", "), wrapper_path.display()),
                UnitReport::Refused { unit } => println!("  - {unit}: no tasks found, skipped"),
                UnitReport::Failed { unit, error } => println!("  ! {unit}: {error}"),
            }
        }
        println!(
            "{} generated, {} skipped, {} failed",
            report.generated(),
            report.refused(),
            report.failed()
        );
    }

    if report.failed() > 0 {
        anyhow::bail!("{} unit(s) failed to regenerate", report.failed());
    }
    Ok(())
}

pub fn list(config: &SvcplugConfig, json: bool, stats: bool) -> anyhow::Result<()> {
    let dispatcher = build_dispatcher(config)?;
    let registry = dispatcher.registry();
    let listing = registry.list();

    if json {
        let value = if stats {
            let stats = registry.stats();
            let units: serde_json::Map<String, serde_json::Value> = listing
                .into_iter()
                .map(|(unit, tasks)| {
                    let entry = serde_json::json!({ "tasks": tasks, "stats": stats.get(&unit) });
                    (unit, entry)
                })
                .collect();
            serde_json::Value::Object(units)
        } else {
            serde_json::to_value(&listing)?
        };
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    if listing.is_empty() {
        println!("no plugins under {}", config.paths.plugins_dir.display());
        return Ok(());
    }
    for (unit, tasks) in &listing {
        let tasks = if tasks.is_empty() {
            "(inherits from unit)".to_string()
        } else {
            tasks.join(", ")
        };
        println!("  {unit}: {tasks}");
    }
    Ok(())
}

pub async fn dispatch(
    config: &SvcplugConfig,
    unit: &str,
    task: &str,
    payload: &str,
) -> anyhow::Result<()> {
    let payload: serde_json::Value =
        serde_json::from_str(payload).context("--payload is not valid JSON")?;
    let dispatcher = build_dispatcher(config)?;

    let outcome = dispatcher.dispatch_outcome(unit, task, payload).await;
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    if !outcome.ok {
        anyhow::bail!("dispatch of {unit}.{task} failed");
    }
    Ok(())
}
