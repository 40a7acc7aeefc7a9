// Generated by `svcplug regenerate`. Do not edit.
//
// Forwards every task to the `payload_maker` service unit.

use svcplug_plugins::{PluginWrapper, ServiceCatalog};

pub const NAME: &str = "payload_maker";

pub const TASKS: &[&str] = &[
    "make_b64_payload",
];

pub fn wrapper(catalog: &ServiceCatalog) -> PluginWrapper {
    PluginWrapper::from_catalog(NAME, TASKS, catalog)
}
