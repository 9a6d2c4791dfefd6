//! Task execution runtime.
//!
//! This module provides the execution infrastructure for running
//! resource-admitted tasks: concrete task implementations, the supervisor
//! workers that wrap one execution each, and the runner that registers,
//! harvests, and cancels them.

mod command;
mod function;
mod runner;
mod supervisor;

pub use command::{ProcessTask, ProcessTaskBuilder};
pub use function::FnTask;
pub use runner::{RunnerError, TaskOutcome, TaskRunner, DEFAULT_POLL_TIMEOUT};
