// Generated by `svcplug regenerate`. Do not edit.
//
// Forwards every task to the `text_tools` service unit.

use svcplug_plugins::{PluginWrapper, ServiceCatalog};

pub const NAME: &str = "text_tools";

pub const TASKS: &[&str] = &[
    "save_text",
];

pub fn wrapper(catalog: &ServiceCatalog) -> PluginWrapper {
    PluginWrapper::from_catalog(NAME, TASKS, catalog)
}
