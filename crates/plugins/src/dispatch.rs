//! Resolves `(unit, task, payload)` through the registry and invokes it.

use std::{collections::BTreeMap, sync::Arc};

use {
    serde::{Deserialize, Serialize},
    serde_json::Value,
    tracing::debug,
};

use crate::{
    outcome::{DispatchError, DispatchOutcome},
    registry::PluginRegistry,
};

/// A dispatch request as received from a transport layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchRequest {
    #[serde(alias = "plugin")]
    pub unit: String,
    pub task: String,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<PluginRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<PluginRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    pub async fn dispatch(&self, unit: &str, task: &str, payload: Value) -> Result<Value, DispatchError> {
        debug!(unit, task, "dispatch");
        let plugin = self.registry.resolve(unit).map_err(|e| e.with_task(task))?;
        plugin.invoke(task, payload).await
    }

    /// Same as [`dispatch`](Self::dispatch), folded into the `ok` envelope.
    pub async fn dispatch_outcome(&self, unit: &str, task: &str, payload: Value) -> DispatchOutcome {
        self.dispatch(unit, task, payload).await.into()
    }

    pub async fn handle(&self, request: DispatchRequest) -> DispatchOutcome {
        self.dispatch_outcome(&request.unit, &request.task, request.payload)
            .await
    }

    /// Dispatch using the task named by `payload.task`.
    pub async fn infer(&self, unit: &str, payload: Value) -> Result<Value, DispatchError> {
        let Some(task) = payload.get("task").and_then(Value::as_str).map(str::to_string) else {
            return Err(DispatchError::unknown_task(unit, ""));
        };
        self.dispatch(unit, &task, payload).await
    }

    /// Load the given units ahead of their first call. Failures are reported
    /// per unit and do not stop the others.
    pub async fn preload(&self, units: &[String]) -> BTreeMap<String, Result<(), DispatchError>> {
        let mut results = BTreeMap::new();
        for unit in units {
            let result = match self.registry.resolve(unit) {
                Ok(plugin) => plugin.load().await,
                Err(e) => Err(e),
            };
            results.insert(unit.clone(), result);
        }
        results
    }

    /// Drop a unit's cached instance. `Ok(true)` if one was loaded.
    pub fn evict(&self, unit: &str) -> Result<bool, DispatchError> {
        Ok(self.registry.resolve(unit)?.evict())
    }
}
