//! Contract between implementation units and the plugin runtime.
//!
//! A unit is any type implementing [`Service`]. It declares its callable
//! surface by filling a [`TaskSet`], an explicit `name -> handler` table built
//! once when the unit is constructed. The runtime never inspects a unit for
//! methods; it only consults that table through the type-erased
//! [`Capability`] view.
//!
//! Units are linked into a process through a [`ServiceCatalog`] owned by the
//! composition root. The catalog stores one [`ServiceFactory`] per unit name;
//! calling a factory constructs the unit, runs its `load` hook and returns the
//! ready capability object.

use std::{collections::BTreeMap, future::Future, sync::Arc};

use {
    anyhow::Result as AnyResult,
    async_trait::async_trait,
    futures::future::BoxFuture,
    serde_json::Value,
    tracing::{debug, warn},
};

use crate::error::{Error, Result};

/// Future returned by a task handler.
pub type TaskFuture = BoxFuture<'static, AnyResult<Value>>;

type TaskHandler<S> = Arc<dyn Fn(Arc<S>, Value) -> TaskFuture + Send + Sync>;

/// Builds a loaded capability object for one unit.
pub type ServiceFactory =
    Arc<dyn Fn() -> BoxFuture<'static, AnyResult<Arc<dyn Capability>>> + Send + Sync>;

// ── Service ─────────────────────────────────────────────────────────────────

/// Implemented by every service unit.
#[async_trait]
pub trait Service: Send + Sync + Sized + 'static {
    /// Acquire models, connections or files before the first task runs.
    /// Called exactly once per constructed instance.
    async fn load(&mut self) -> AnyResult<()> {
        Ok(())
    }

    /// Register the tasks this unit can perform.
    fn register_tasks(tasks: &mut TaskSet<Self>);
}

// ── TaskSet ─────────────────────────────────────────────────────────────────

/// Ordered `task name -> handler` table for a service type.
pub struct TaskSet<S> {
    entries: Vec<(String, TaskHandler<S>)>,
}

impl<S: Send + Sync + 'static> TaskSet<S> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Register an async task. The handler receives a shared handle to the
    /// loaded service and the caller's payload.
    pub fn task<F, Fut>(&mut self, name: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(Arc<S>, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AnyResult<Value>> + Send + 'static,
    {
        let erased: TaskHandler<S> = Arc::new(move |service: Arc<S>, payload: Value| {
            let fut: TaskFuture = Box::pin(handler(service, payload));
            fut
        });
        self.insert(name.into(), erased);
        self
    }

    /// Register a synchronous task that may block (disk, CPU). It runs on the
    /// blocking thread pool so it never stalls the async workers.
    pub fn blocking<F>(&mut self, name: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(&S, Value) -> AnyResult<Value> + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);
        self.task(name, move |service: Arc<S>, payload: Value| {
            let handler = Arc::clone(&handler);
            async move {
                match tokio::task::spawn_blocking(move || (*handler)(&*service, payload)).await {
                    Ok(result) => result,
                    Err(e) => Err(anyhow::anyhow!("blocking task did not complete: {e}")),
                }
            }
        })
    }

    fn insert(&mut self, name: String, handler: TaskHandler<S>) {
        if let Some(slot) = self.entries.iter_mut().find(|(n, _)| *n == name) {
            warn!(task = %name, "task registered twice, keeping the latest handler");
            slot.1 = handler;
        } else {
            self.entries.push((name, handler));
        }
    }

    /// Task names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn handler(&self, name: &str) -> Option<&TaskHandler<S>> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, h)| h)
    }
}

impl<S: Send + Sync + 'static> Default for TaskSet<S> {
    fn default() -> Self {
        Self::new()
    }
}

// ── Capability ──────────────────────────────────────────────────────────────

/// Type-erased view of a loaded unit: an enumerable set of callable tasks.
pub trait Capability: Send + Sync {
    /// Tasks the live object can actually perform.
    fn task_names(&self) -> Vec<String>;

    fn has_task(&self, task: &str) -> bool;

    /// Start the named task, or `None` when the object has no such task.
    fn invoke(&self, task: &str, payload: Value) -> Option<TaskFuture>;
}

struct LoadedService<S> {
    service: Arc<S>,
    tasks: TaskSet<S>,
}

impl<S: Service> Capability for LoadedService<S> {
    fn task_names(&self) -> Vec<String> {
        self.tasks.names()
    }

    fn has_task(&self, task: &str) -> bool {
        self.tasks.contains(task)
    }

    fn invoke(&self, task: &str, payload: Value) -> Option<TaskFuture> {
        let handler = self.tasks.handler(task)?;
        Some((**handler)(Arc::clone(&self.service), payload))
    }
}

// ── ServiceCatalog ──────────────────────────────────────────────────────────

/// The set of units linked into this process, keyed by unit name.
#[derive(Clone, Default)]
pub struct ServiceCatalog {
    factories: BTreeMap<String, ServiceFactory>,
}

impl ServiceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Link a unit under `name`. `ctor` builds a fresh, unloaded instance;
    /// it runs only when the runtime decides to load the unit.
    pub fn register<S, C>(&mut self, name: impl Into<String>, ctor: C) -> Result<&mut Self>
    where
        S: Service,
        C: Fn() -> AnyResult<S> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(Error::duplicate_unit(name));
        }

        let ctor = Arc::new(ctor);
        let unit = name.clone();
        let factory: ServiceFactory =
            Arc::new(move || construct::<S, C>(unit.clone(), Arc::clone(&ctor)));

        self.factories.insert(name, factory);
        Ok(self)
    }

    /// Link a unit whose `Default` value is its unloaded state.
    pub fn register_default<S>(&mut self, name: impl Into<String>) -> Result<&mut Self>
    where
        S: Service + Default,
    {
        self.register(name, || Ok(S::default()))
    }

    pub fn factory(&self, name: &str) -> Option<ServiceFactory> {
        self.factories.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

/// Build, load and wrap one instance of `S`.
fn construct<S, C>(unit: String, ctor: Arc<C>) -> BoxFuture<'static, AnyResult<Arc<dyn Capability>>>
where
    S: Service,
    C: Fn() -> AnyResult<S> + Send + Sync + 'static,
{
    Box::pin(async move {
        let mut service = (*ctor)()?;
        service.load().await?;
        let mut tasks = TaskSet::new();
        S::register_tasks(&mut tasks);
        debug!(unit = %unit, tasks = tasks.len(), "service constructed");
        let loaded: Arc<dyn Capability> = Arc::new(LoadedService {
            service: Arc::new(service),
            tasks,
        });
        Ok::<_, anyhow::Error>(loaded)
    })
}
