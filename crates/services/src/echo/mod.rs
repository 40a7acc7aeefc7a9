//! Returns whatever it is sent.

use std::sync::Arc;

use {
    anyhow::Result,
    async_trait::async_trait,
    serde_json::{Map, Value},
    svcplug_common::{Service, TaskSet},
};

pub const TASKS: &[&str] = &["ping"];

#[derive(Debug, Default)]
pub struct Echo;

#[async_trait]
impl Service for Echo {
    fn register_tasks(tasks: &mut TaskSet<Self>) {
        tasks.task("ping", ping);
    }
}

/// The payload object with `"ok": true` added. Anything that is not an
/// object is returned under `"payload"`.
async fn ping(_svc: Arc<Echo>, payload: Value) -> Result<Value> {
    let mut out = match payload {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => Map::from_iter([("payload".to_string(), other)]),
    };
    out.insert("ok".into(), Value::Bool(true));
    Ok(Value::Object(out))
}
