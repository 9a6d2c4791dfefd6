//! Core identifier types for the runtime.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a submitted task.
///
/// Assigned by the scheduler before submission, monotonically unique, and
/// stable for the task's lifetime. The runtime only ever uses it as a
/// registry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskId(u64);

impl TaskId {
    /// Create a new TaskId from a raw value.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the underlying value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for TaskId {
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
