//! Cross-task result store.
//!
//! Each task records its return value under its own task identifier and
//! reads upstream values by theirs, mirroring the result-store surface the
//! workflow engine exposes to tasks.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{PipelineError, Result};

/// Key-value result store keyed by task identifier.
#[derive(Debug, Default)]
pub struct TaskContext {
    results: HashMap<String, Value>,
}

impl TaskContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a task's result, replacing any previous value for the task.
    pub fn put<T: Serialize>(&mut self, task_id: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value).map_err(|source| PipelineError::ResultType {
            task_id: task_id.to_string(),
            source,
        })?;
        self.results.insert(task_id.to_string(), value);
        Ok(())
    }

    /// Retrieves a prior task's result.
    pub fn get<T: DeserializeOwned>(&self, task_id: &str) -> Result<T> {
        let value = self
            .results
            .get(task_id)
            .ok_or_else(|| PipelineError::MissingResult(task_id.to_string()))?;
        serde_json::from_value(value.clone()).map_err(|source| PipelineError::ResultType {
            task_id: task_id.to_string(),
            source,
        })
    }

    #[must_use]
    pub fn contains(&self, task_id: &str) -> bool {
        self.results.contains_key(task_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_typed_value() {
        let mut ctx = TaskContext::new();
        ctx.put("create_base_workspace", &"ws-123".to_string()).unwrap();
        let id: String = ctx.get("create_base_workspace").unwrap();
        assert_eq!(id, "ws-123");
    }

    #[test]
    fn test_missing_result_is_an_error() {
        let ctx = TaskContext::new();
        let err = ctx.get::<String>("never_ran").unwrap_err();
        assert!(matches!(err, PipelineError::MissingResult(task) if task == "never_ran"));
    }

    #[test]
    fn test_type_mismatch_is_an_error() {
        let mut ctx = TaskContext::new();
        ctx.put("count", &3_u32).unwrap();
        let err = ctx.get::<Vec<String>>("count").unwrap_err();
        assert!(matches!(err, PipelineError::ResultType { .. }));
    }

    #[test]
    fn test_put_replaces_previous_value() {
        let mut ctx = TaskContext::new();
        ctx.put("stage", &"first").unwrap();
        ctx.put("stage", &"second").unwrap();
        let value: String = ctx.get("stage").unwrap();
        assert_eq!(value, "second");
    }
}
