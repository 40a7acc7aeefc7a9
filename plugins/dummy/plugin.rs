// Generated by `svcplug regenerate`. Do not edit.
//
// Forwards every task to the `dummy` service unit.

use svcplug_plugins::{PluginWrapper, ServiceCatalog};

pub const NAME: &str = "dummy";

pub const TASKS: &[&str] = &[
    "ping",
    "echo",
];

pub fn wrapper(catalog: &ServiceCatalog) -> PluginWrapper {
    PluginWrapper::from_catalog(NAME, TASKS, catalog)
}
