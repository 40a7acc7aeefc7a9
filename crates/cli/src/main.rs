mod plugin_commands;
mod unit_commands;

use std::{path::PathBuf, sync::Arc};

use {
    clap::{Parser, Subcommand},
    svcplug_config::SvcplugConfig,
    svcplug_plugins::{DiscoveryOptions, Dispatcher, PluginRegistry},
    svcplug_services::UnitSettings,
    tracing::debug,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(
    name = "svcplug",
    about = "svcplug: discover service tasks, generate plugin wrappers, dispatch calls",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file to load instead of the standard locations.
    #[arg(long, global = true, env = "SVCPLUG_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    services_dir: Option<PathBuf>,

    #[arg(long, global = true)]
    plugins_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Regenerate plugin wrappers from the service units.
    Regenerate {
        /// Only regenerate these units.
        #[arg(long, num_args = 1..)]
        only: Vec<String>,
        /// Write wrappers even for units without declared tasks.
        #[arg(long)]
        force_empty: bool,
        #[arg(long)]
        json: bool,
    },
    /// List indexed plugins and their tasks.
    List {
        #[arg(long)]
        json: bool,
        /// Include per-unit call statistics.
        #[arg(long)]
        stats: bool,
    },
    /// Print the tasks statically declared in a source file.
    Extract {
        file: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Call a task and print the `{ok, result | error}` envelope.
    Dispatch {
        unit: String,
        task: String,
        /// JSON payload.
        #[arg(long, default_value = "{}")]
        payload: String,
    },
    /// List discovered service units and their declared tasks.
    Units {
        #[arg(long)]
        json: bool,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// Config file + environment, then command-line overrides.
fn resolve_config(cli: &Cli) -> anyhow::Result<SvcplugConfig> {
    let mut config = svcplug_config::discover_and_load(cli.config.as_deref())?;
    if let Some(dir) = &cli.services_dir {
        config.paths.services_dir = dir.clone();
    }
    if let Some(dir) = &cli.plugins_dir {
        config.paths.plugins_dir = dir.clone();
    }
    debug!(
        services_dir = %config.paths.services_dir.display(),
        plugins_dir = %config.paths.plugins_dir.display(),
        "configuration resolved"
    );
    Ok(config)
}

pub(crate) fn discovery_options(config: &SvcplugConfig) -> DiscoveryOptions {
    DiscoveryOptions {
        entry_files: config.discovery.entry_files.clone(),
        ignore_dirs: config.discovery.ignore_dirs.clone(),
    }
}

/// Composition root: link the bundled units, scan the plugins root.
pub(crate) fn build_dispatcher(config: &SvcplugConfig) -> anyhow::Result<Dispatcher> {
    let catalog = svcplug_services::catalog(&UnitSettings {
        uploads_dir: config.services.uploads_dir.clone(),
    })?;
    let registry = PluginRegistry::new(catalog).with_discovery(discovery_options(config));
    registry.scan(&config.paths.plugins_dir);
    Ok(Dispatcher::new(Arc::new(registry)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    debug!(version = env!("CARGO_PKG_VERSION"), "svcplug starting");
    let config = resolve_config(&cli)?;

    match cli.command {
        Commands::Regenerate {
            only,
            force_empty,
            json,
        } => plugin_commands::regenerate(&config, only, force_empty, json),
        Commands::List { json, stats } => plugin_commands::list(&config, json, stats),
        Commands::Dispatch {
            unit,
            task,
            payload,
        } => plugin_commands::dispatch(&config, &unit, &task, &payload).await,
        Commands::Extract { file, json } => unit_commands::extract(&file, json),
        Commands::Units { json } => unit_commands::units(&config, json),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_regenerate_with_only_list() {
        let cli = Cli::try_parse_from([
            "svcplug",
            "--plugins-dir",
            "out",
            "regenerate",
            "--only",
            "echo",
            "dummy",
            "--force-empty",
        ])
        .unwrap();
        assert_eq!(cli.plugins_dir, Some(PathBuf::from("out")));
        let Commands::Regenerate {
            only, force_empty, ..
        } = cli.command
        else {
            panic!("expected regenerate");
        };
        assert_eq!(only, vec!["echo", "dummy"]);
        assert!(force_empty);
    }

    #[test]
    fn dispatch_payload_defaults_to_empty_object() {
        let cli = Cli::try_parse_from(["svcplug", "dispatch", "echo", "ping"]).unwrap();
        let Commands::Dispatch { payload, .. } = cli.command else {
            panic!("expected dispatch");
        };
        assert_eq!(payload, "{}");
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let cli = Cli::try_parse_from([
            "svcplug",
            "--config",
            "/nonexistent/svcplug.toml",
            "units",
        ])
        .unwrap();
        assert!(resolve_config(&cli).is_err());
    }
}
