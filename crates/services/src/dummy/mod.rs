//! Minimal unit used to smoke-test the dispatch path.

use {
    anyhow::Result,
    async_trait::async_trait,
    serde_json::{Value, json},
    svcplug_common::TaskSet,
};

#[derive(Debug, Default)]
pub struct Service;

impl Service {
    pub const TASKS: &'static [&'static str] = &["ping", "echo"];

    fn ping(&self, _payload: Value) -> Result<Value> {
        Ok(json!({ "ok": true, "pong": true }))
    }

    fn echo(&self, payload: Value) -> Result<Value> {
        let payload = if payload.is_null() { json!({}) } else { payload };
        Ok(json!({ "ok": true, "echo": payload }))
    }
}

#[async_trait]
impl svcplug_common::Service for Service {
    fn register_tasks(tasks: &mut TaskSet<Self>) {
        tasks
            .blocking("ping", Service::ping)
            .blocking("echo", Service::echo);
    }
}
