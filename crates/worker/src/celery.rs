//! Celery task message decoding.
//!
//! Two wire layouts are accepted:
//!
//! - protocol v2: task name and id in the `task` / `id` headers, body is the
//!   JSON array `[args, kwargs, embed]`;
//! - protocol v1: everything in a JSON body `{task, id, args, kwargs}`.
//!
//! Arguments may be passed positionally, by keyword or mixed, exactly as the
//! producer's `benchmark_task.delay(...)` call wrote them.

use qbench_core::benchmark::BenchmarkRequest;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Registered name of the benchmark task.
pub const BENCHMARK_TASK: &str = "benchmark.benchmark_task";

/// Parameter names of the benchmark task, in positional order.
const PARAMETERS: [&str; 5] = [
    "metrics_id",
    "molecule",
    "circuit",
    "optimizer_module",
    "optimizer_method",
];

/// A message as taken off the broker, before decoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawMessage {
    pub content_type: Option<String>,
    /// `task` header (protocol v2).
    pub task: Option<String>,
    /// `id` header (protocol v2).
    pub id: Option<String>,
    pub body: Vec<u8>,
}

/// A decoded benchmark task invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskInvocation {
    /// Celery task id, when the producer set one.
    pub id: Option<String>,
    pub request: BenchmarkRequest,
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Unsupported content type '{0}'")]
    UnsupportedContentType(String),

    #[error("Message body is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("Message has no task name")]
    MissingTaskName,

    #[error("Unexpected task '{0}'")]
    UnexpectedTask(String),

    #[error("Malformed message body: {0}")]
    MalformedBody(&'static str),

    #[error("Task takes {expected} arguments but {given} were given", expected = PARAMETERS.len())]
    TooManyArguments { given: usize },

    #[error("Argument '{0}' given both positionally and by keyword")]
    DuplicateArgument(String),

    #[error("Invalid task arguments: {0}")]
    InvalidArguments(#[source] serde_json::Error),
}

/// Protocol v1 body.
#[derive(Debug, Deserialize)]
struct LegacyBody {
    task: String,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    args: Vec<Value>,
    #[serde(default)]
    kwargs: Map<String, Value>,
}

/// Decode a raw broker message into a benchmark task invocation.
pub fn decode(message: &RawMessage) -> Result<TaskInvocation, DecodeError> {
    if let Some(content_type) = message.content_type.as_deref() {
        if !content_type.is_empty() && content_type != "application/json" {
            return Err(DecodeError::UnsupportedContentType(content_type.to_string()));
        }
    }

    let body: Value = serde_json::from_slice(&message.body).map_err(DecodeError::InvalidJson)?;

    let (task, id, args, kwargs) = match message.task.as_deref() {
        Some(task) => {
            let (args, kwargs) = split_v2_body(body)?;
            (task.to_string(), message.id.clone(), args, kwargs)
        }
        None => {
            if !body.is_object() {
                return Err(DecodeError::MissingTaskName);
            }
            let legacy: LegacyBody = serde_json::from_value(body)
                .map_err(|_| DecodeError::MalformedBody("expected {task, id, args, kwargs}"))?;
            (legacy.task, legacy.id, legacy.args, legacy.kwargs)
        }
    };

    if task != BENCHMARK_TASK {
        return Err(DecodeError::UnexpectedTask(task));
    }

    let request = bind_arguments(args, kwargs)?;
    Ok(TaskInvocation { id, request })
}

/// Split a v2 body `[args, kwargs, embed]` into its argument parts.
fn split_v2_body(body: Value) -> Result<(Vec<Value>, Map<String, Value>), DecodeError> {
    let Value::Array(mut parts) = body else {
        return Err(DecodeError::MalformedBody("expected [args, kwargs, embed]"));
    };
    if parts.len() < 2 {
        return Err(DecodeError::MalformedBody("expected [args, kwargs, embed]"));
    }
    parts.truncate(2);
    let kwargs = parts.pop();
    let args = parts.pop();

    match (args, kwargs) {
        (Some(Value::Array(args)), Some(Value::Object(kwargs))) => Ok((args, kwargs)),
        _ => Err(DecodeError::MalformedBody("args must be a list and kwargs a mapping")),
    }
}

/// Bind positional and keyword arguments to the task's parameters.
fn bind_arguments(
    args: Vec<Value>,
    mut kwargs: Map<String, Value>,
) -> Result<BenchmarkRequest, DecodeError> {
    if args.len() > PARAMETERS.len() {
        return Err(DecodeError::TooManyArguments { given: args.len() });
    }

    let mut bound = Map::new();
    for (name, value) in PARAMETERS.iter().zip(args) {
        if kwargs.contains_key(*name) {
            return Err(DecodeError::DuplicateArgument((*name).to_string()));
        }
        bound.insert((*name).to_string(), value);
    }
    for name in PARAMETERS {
        if let Some(value) = kwargs.remove(name) {
            bound.insert(name.to_string(), value);
        }
    }
    if !kwargs.is_empty() {
        tracing::debug!(
            extra = ?kwargs.keys().collect::<Vec<_>>(),
            "Ignoring unknown keyword arguments"
        );
    }

    serde_json::from_value(Value::Object(bound)).map_err(DecodeError::InvalidArguments)
}
