//! Runtime side of a plugin wrapper.
//!
//! A [`PluginWrapper`] shadows one service unit. It owns the unit's instance
//! slot: the capability object is built on first use, shared by every later
//! call and dropped again on [`Plugin::evict`]. Concurrent first calls
//! construct the unit once; the others wait on the same cell.

use std::{
    any::Any,
    panic::AssertUnwindSafe,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use {
    async_trait::async_trait,
    futures::FutureExt,
    serde::Serialize,
    serde_json::Value,
    svcplug_common::{Capability, ServiceCatalog, ServiceFactory},
    tokio::sync::OnceCell,
    tracing::{debug, info, warn},
};

use crate::outcome::DispatchError;

/// Uniform calling convention implemented by every wrapper.
#[async_trait]
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    /// Tasks recorded when the wrapper was generated.
    fn declared_tasks(&self) -> &[String];

    /// Effective task list: the declared list, or the loaded unit's own
    /// tasks when nothing was declared.
    fn tasks(&self) -> Vec<String>;

    fn is_loaded(&self) -> bool;

    /// Construct the unit if it is not loaded yet.
    async fn load(&self) -> Result<(), DispatchError>;

    async fn invoke(&self, task: &str, payload: Value) -> Result<Value, DispatchError>;

    /// Drop the cached capability object. Returns whether one was loaded.
    fn evict(&self) -> bool;

    fn stats(&self) -> PluginStatsSnapshot;
}

// ── Stats ───────────────────────────────────────────────────────────────────

/// Per-unit call statistics.
#[derive(Debug, Default)]
pub struct PluginStats {
    call_count: AtomicU64,
    failure_count: AtomicU64,
    load_attempts: AtomicU64,
    load_failures: AtomicU64,
    total_latency_us: AtomicU64,
}

impl PluginStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self, latency: Duration) {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        self.add_latency(latency);
    }

    pub fn record_failure(&self, latency: Duration) {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        self.failure_count.fetch_add(1, Ordering::Relaxed);
        self.add_latency(latency);
    }

    pub fn record_load(&self, ok: bool) {
        self.load_attempts.fetch_add(1, Ordering::Relaxed);
        if !ok {
            self.load_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn add_latency(&self, latency: Duration) {
        let us = micros(latency);
        self.total_latency_us.fetch_add(us, Ordering::Relaxed);
    }

    pub fn avg_latency(&self) -> Duration {
        let calls = self.call_count.load(Ordering::Relaxed);
        if calls == 0 {
            return Duration::ZERO;
        }
        Duration::from_micros(self.total_latency_us.load(Ordering::Relaxed) / calls)
    }

    pub fn snapshot(&self) -> PluginStatsSnapshot {
        PluginStatsSnapshot {
            calls: self.call_count.load(Ordering::Relaxed),
            failures: self.failure_count.load(Ordering::Relaxed),
            load_attempts: self.load_attempts.load(Ordering::Relaxed),
            load_failures: self.load_failures.load(Ordering::Relaxed),
            avg_latency_us: micros(self.avg_latency()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PluginStatsSnapshot {
    pub calls: u64,
    pub failures: u64,
    pub load_attempts: u64,
    pub load_failures: u64,
    pub avg_latency_us: u64,
}

// ── PluginWrapper ───────────────────────────────────────────────────────────

type Slot = Arc<OnceCell<Arc<dyn Capability>>>;

pub struct PluginWrapper {
    name: String,
    declared: Vec<String>,
    factory: Option<ServiceFactory>,
    slot: Mutex<Slot>,
    stats: PluginStats,
}

impl PluginWrapper {
    /// `factory` is `None` when no unit of this name is linked in; every
    /// load then fails.
    pub fn new(name: impl Into<String>, tasks: Vec<String>, factory: Option<ServiceFactory>) -> Self {
        Self {
            name: name.into(),
            declared: tasks,
            factory,
            slot: Mutex::new(Arc::new(OnceCell::new())),
            stats: PluginStats::new(),
        }
    }

    /// Constructor used by generated `plugin.rs` files.
    pub fn from_catalog(name: &str, tasks: &[&str], catalog: &ServiceCatalog) -> Self {
        Self::new(
            name,
            tasks.iter().map(|t| t.to_string()).collect(),
            catalog.factory(name),
        )
    }

    fn current_slot(&self) -> Slot {
        let slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&*slot)
    }

    async fn capability(&self) -> Result<Arc<dyn Capability>, DispatchError> {
        let slot = self.current_slot();
        let cap = slot.get_or_try_init(|| self.construct()).await?;
        Ok(Arc::clone(cap))
    }

    async fn construct(&self) -> Result<Arc<dyn Capability>, DispatchError> {
        let Some(factory) = self.factory.clone() else {
            self.stats.record_load(false);
            warn!(unit = %self.name, "no service linked under this name");
            return Err(DispatchError::load_failure(
                &self.name,
                "no service is linked under this name",
            ));
        };

        let started = Instant::now();
        let result = AssertUnwindSafe(async move { factory().await })
            .catch_unwind()
            .await;

        match result {
            Ok(Ok(cap)) => {
                self.stats.record_load(true);
                info!(
                    unit = %self.name,
                    tasks = cap.task_names().len(),
                    elapsed_ms = millis(started.elapsed()),
                    "unit loaded"
                );
                Ok(cap)
            },
            Ok(Err(e)) => {
                self.stats.record_load(false);
                warn!(unit = %self.name, error = %e, "unit failed to load");
                Err(DispatchError::load_failure(&self.name, format!("{e:#}")))
            },
            Err(panic) => {
                self.stats.record_load(false);
                let message = panic_message(panic);
                warn!(unit = %self.name, error = %message, "unit panicked while loading");
                Err(DispatchError::load_failure(&self.name, message))
            },
        }
    }

    /// Declared-list half of the double check.
    fn declares(&self, task: &str, cap: &dyn Capability) -> bool {
        if self.declared.is_empty() {
            cap.has_task(task)
        } else {
            self.declared.iter().any(|t| t == task)
        }
    }

    async fn call(&self, task: &str, payload: Value) -> Result<Value, DispatchError> {
        let cap = self.capability().await.map_err(|e| e.with_task(task))?;
        if !self.declares(task, cap.as_ref()) || !cap.has_task(task) {
            return Err(DispatchError::unknown_task(&self.name, task));
        }

        let run = async {
            match cap.invoke(task, payload) {
                Some(fut) => fut.await.map(Some),
                None => Ok(None),
            }
        };

        match AssertUnwindSafe(run).catch_unwind().await {
            Ok(Ok(Some(value))) => Ok(value),
            Ok(Ok(None)) => Err(DispatchError::unknown_task(&self.name, task)),
            Ok(Err(e)) => Err(DispatchError::invocation_failure(
                &self.name,
                task,
                format!("{e:#}"),
            )),
            Err(panic) => Err(DispatchError::invocation_failure(
                &self.name,
                task,
                panic_message(panic),
            )),
        }
    }
}

#[async_trait]
impl Plugin for PluginWrapper {
    fn name(&self) -> &str {
        &self.name
    }

    fn declared_tasks(&self) -> &[String] {
        &self.declared
    }

    fn tasks(&self) -> Vec<String> {
        if !self.declared.is_empty() {
            return self.declared.clone();
        }
        self.current_slot()
            .get()
            .map(|cap| cap.task_names())
            .unwrap_or_default()
    }

    fn is_loaded(&self) -> bool {
        self.current_slot().initialized()
    }

    async fn load(&self) -> Result<(), DispatchError> {
        self.capability().await.map(|_| ())
    }

    async fn invoke(&self, task: &str, payload: Value) -> Result<Value, DispatchError> {
        let started = Instant::now();
        let result = self.call(task, payload).await;
        let elapsed = started.elapsed();
        match &result {
            Ok(_) => {
                self.stats.record_success(elapsed);
                debug!(unit = %self.name, task, elapsed_us = micros(elapsed), "task completed");
            },
            Err(e) => {
                self.stats.record_failure(elapsed);
                warn!(unit = %self.name, task, error = %e, "task failed");
            },
        }
        result
    }

    fn evict(&self) -> bool {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        let was_loaded = slot.initialized();
        *slot = Arc::new(OnceCell::new());
        if was_loaded {
            info!(unit = %self.name, "unit evicted");
        }
        was_loaded
    }

    fn stats(&self) -> PluginStatsSnapshot {
        self.stats.snapshot()
    }
}

fn micros(d: Duration) -> u64 {
    u64::try_from(d.as_micros()).unwrap_or(u64::MAX)
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned());
    match detail {
        Some(detail) => format!("panicked: {detail}"),
        None => "panicked".into(),
    }
}
