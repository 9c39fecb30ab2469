//! Query executor port.
//!
//! Every read and write goes through a named operation plus parameters. The
//! executor owns the backing store; the cache layer only sees rows.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// One result row, column name to value.
pub type Row = serde_json::Map<String, Value>;

/// Output slot filled with the unpaged row count by paged operations.
pub const TOTAL_RECORDS: &str = "TotalRecords";

/// Output slot filled with the identifier assigned by insert operations.
pub const NEW_ID: &str = "Id";

/// Named input parameters plus output slots the executor may fill.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    inputs: Vec<(String, Value)>,
    outputs: BTreeMap<String, Value>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an input; a later value with the same name shadows earlier ones.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(name, value);
        self
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.inputs.push((name.into(), value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.inputs
            .iter()
            .rev()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn inputs(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.inputs.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn set_output(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.outputs.insert(name.into(), value.into());
    }

    pub fn output(&self, name: &str) -> Option<&Value> {
        self.outputs.get(name)
    }

    /// The [`TOTAL_RECORDS`] output, if the executor filled it.
    pub fn total_records(&self) -> Option<u64> {
        self.output(TOTAL_RECORDS).and_then(Value::as_u64)
    }
}

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("unknown operation `{operation}`")]
    UnknownOperation { operation: String },
    #[error("parameter `{name}` is missing")]
    MissingParameter { name: String },
    #[error("parameter `{name}` is invalid: {reason}")]
    InvalidParameter { name: String, reason: String },
    #[error("backend failure: {0}")]
    Backend(String),
}

impl ExecutorError {
    pub fn unknown_operation(operation: impl Into<String>) -> Self {
        Self::UnknownOperation {
            operation: operation.into(),
        }
    }

    pub fn missing(name: impl Into<String>) -> Self {
        Self::MissingParameter { name: name.into() }
    }

    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Runs named operations against the system of record.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Run a read operation and return its rows.
    async fn query(&self, operation: &str, params: &mut QueryParams)
    -> Result<Vec<Row>, ExecutorError>;

    /// Run a write operation and return the number of affected rows.
    async fn execute(&self, operation: &str, params: &mut QueryParams)
    -> Result<u64, ExecutorError>;
}
