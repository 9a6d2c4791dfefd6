//! Core data model: identifiers, tasks, resources, and execution state.

pub mod environment;
pub mod info;
pub mod resource;
pub mod task;
pub mod types;
