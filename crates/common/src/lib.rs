//! Shared contract between service units and the plugin runtime, plus the
//! error helpers every svcplug crate builds on.

pub mod error;
pub mod service;

pub use {
    error::{Error, FromMessage, Result},
    service::{Capability, Service, ServiceCatalog, ServiceFactory, TaskFuture, TaskSet},
};
