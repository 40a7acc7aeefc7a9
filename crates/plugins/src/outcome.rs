//! Dispatch failures and the `(ok, result | error)` envelope returned to
//! transport layers.

use {
    serde::{Deserialize, Serialize},
    serde_json::Value,
    thiserror::Error,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("unknown unit '{unit}'")]
    UnknownUnit { unit: String, task: Option<String> },

    #[error("unit '{unit}' has no task '{task}'")]
    UnknownTask { unit: String, task: String },

    #[error("failed to load unit '{unit}': {message}")]
    LoadFailure {
        unit: String,
        task: Option<String>,
        message: String,
    },

    #[error("task '{unit}.{task}' failed: {message}")]
    InvocationFailure {
        unit: String,
        task: String,
        message: String,
    },
}

impl DispatchError {
    #[must_use]
    pub fn unknown_unit(unit: impl Into<String>) -> Self {
        Self::UnknownUnit {
            unit: unit.into(),
            task: None,
        }
    }

    #[must_use]
    pub fn unknown_task(unit: impl Into<String>, task: impl Into<String>) -> Self {
        Self::UnknownTask {
            unit: unit.into(),
            task: task.into(),
        }
    }

    #[must_use]
    pub fn load_failure(unit: impl Into<String>, message: impl Into<String>) -> Self {
        Self::LoadFailure {
            unit: unit.into(),
            task: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invocation_failure(
        unit: impl Into<String>,
        task: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvocationFailure {
            unit: unit.into(),
            task: task.into(),
            message: message.into(),
        }
    }

    /// Record the requested task on failures raised before the task was
    /// reached. Variants that already name a task are left unchanged.
    #[must_use]
    pub fn with_task(self, requested: impl Into<String>) -> Self {
        match self {
            Self::UnknownUnit { unit, task: None } => Self::UnknownUnit {
                unit,
                task: Some(requested.into()),
            },
            Self::LoadFailure {
                unit,
                task: None,
                message,
            } => Self::LoadFailure {
                unit,
                task: Some(requested.into()),
                message,
            },
            other => other,
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::UnknownUnit { .. } => FailureKind::UnknownUnit,
            Self::UnknownTask { .. } => FailureKind::UnknownTask,
            Self::LoadFailure { .. } => FailureKind::LoadFailure,
            Self::InvocationFailure { .. } => FailureKind::InvocationFailure,
        }
    }

    pub fn unit(&self) -> &str {
        match self {
            Self::UnknownUnit { unit, .. }
            | Self::UnknownTask { unit, .. }
            | Self::LoadFailure { unit, .. }
            | Self::InvocationFailure { unit, .. } => unit,
        }
    }

    pub fn task(&self) -> Option<&str> {
        match self {
            Self::UnknownTask { task, .. } | Self::InvocationFailure { task, .. } => Some(task),
            Self::UnknownUnit { task, .. } | Self::LoadFailure { task, .. } => task.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    UnknownUnit,
    UnknownTask,
    LoadFailure,
    InvocationFailure,
}

/// Serializable form of a [`DispatchError`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchFailure {
    pub kind: FailureKind,
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
    pub message: String,
}

impl From<&DispatchError> for DispatchFailure {
    fn from(err: &DispatchError) -> Self {
        Self {
            kind: err.kind(),
            unit: err.unit().to_string(),
            task: err.task().map(str::to_string),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchOutcome {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<DispatchFailure>,
}

impl DispatchOutcome {
    pub fn success(result: Value) -> Self {
        Self {
            ok: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(err: &DispatchError) -> Self {
        Self {
            ok: false,
            result: None,
            error: Some(err.into()),
        }
    }
}

impl From<Result<Value, DispatchError>> for DispatchOutcome {
    fn from(result: Result<Value, DispatchError>) -> Self {
        match result {
            Ok(value) => Self::success(value),
            Err(err) => Self::failure(&err),
        }
    }
}
