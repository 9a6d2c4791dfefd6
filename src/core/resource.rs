//! Resource claims applied to tasks at launch.
//!
//! The external resource manager decides what a task may consume before it
//! is submitted; the runtime only hands the finished claim to the task,
//! exactly once.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A pre-computed resource allocation for one task.
///
/// Combines abstract named resource slots (e.g. "gpu": 2, "db_conn": 1)
/// with optional system resource bounds. Opaque to the runtime itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceClaim {
    /// Abstract named resource slots granted from configured pools.
    pub slots: HashMap<String, u32>,

    /// CPU cores (can be fractional, e.g. 0.5 for half a core).
    pub cpu_cores: Option<f32>,

    /// Memory limit in bytes.
    pub memory_bytes: Option<u64>,
}

impl ResourceClaim {
    /// Create an empty claim (no grants).
    pub fn none() -> Self {
        Self::default()
    }

    /// Builder: add a slot grant.
    pub fn with_slot(mut self, name: impl Into<String>, count: u32) -> Self {
        self.slots.insert(name.into(), count);
        self
    }

    /// Builder: set the CPU cores grant.
    pub fn with_cpu(mut self, cores: f32) -> Self {
        self.cpu_cores = Some(cores);
        self
    }

    /// Builder: set the memory grant in bytes.
    pub fn with_memory(mut self, bytes: u64) -> Self {
        self.memory_bytes = Some(bytes);
        self
    }

    /// Check if this claim grants anything.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty() && self.cpu_cores.is_none() && self.memory_bytes.is_none()
    }
}
