//! Plugin runtime: wrapper synthesis, the plugin registry and dispatch.
//!
//! Service units are turned into wrapper units by the [`Regenerator`], which
//! extracts each unit's task list and writes `plugin.rs` + `manifest.json`
//! under the plugins root. At runtime the [`PluginRegistry`] indexes those
//! wrappers and the [`Dispatcher`] routes `(unit, task, payload)` calls to
//! lazily loaded service instances.

pub mod discover;
pub mod dispatch;
pub mod error;
pub mod manifest;
pub mod outcome;
pub mod regenerate;
pub mod registry;
pub mod synth;
pub mod wrapper;

pub use {
    discover::{DiscoveryOptions, ServiceUnit, discover_units},
    dispatch::{DispatchRequest, Dispatcher},
    error::{Error, Result},
    manifest::{ManifestRecord, ManifestStore, UnitKind},
    outcome::{DispatchError, DispatchFailure, DispatchOutcome, FailureKind},
    regenerate::{RegenerateOptions, RegenerateReport, Regenerator, UnitReport},
    registry::{PluginRegistry, RegistryEntry, RegistryIndex},
    svcplug_common::ServiceCatalog,
    synth::{Synthesis, Synthesizer, WrapperArtifacts},
    wrapper::{Plugin, PluginStats, PluginStatsSnapshot, PluginWrapper},
};
