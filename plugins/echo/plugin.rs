// Generated by `svcplug regenerate`. Do not edit.
//
// Forwards every task to the `echo` service unit.

use svcplug_plugins::{PluginWrapper, ServiceCatalog};

pub const NAME: &str = "echo";

pub const TASKS: &[&str] = &[
    "ping",
];

pub fn wrapper(catalog: &ServiceCatalog) -> PluginWrapper {
    PluginWrapper::from_catalog(NAME, TASKS, catalog)
}
