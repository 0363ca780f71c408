// src/exec/mod.rs

//! Script execution layer.
//!
//! - [`dispatcher`] validates a match and builds the [`DispatchJob`].
//! - [`backend`] provides the `ExecutorBackend` trait and the production
//!   `ProcessExecutor`.
//! - [`runner`] spawns one script and captures its output.
//! - [`refresh`] is the view refresh seam used after a run.

pub mod backend;
pub mod dispatcher;
pub mod refresh;
pub mod runner;

pub use backend::{ExecutorBackend, ProcessExecutor};
pub use dispatcher::{DispatchJob, Dispatcher, build_environment, valid_interpreter};
pub use refresh::{LogRefresher, ViewRefresher};
pub use runner::{ScriptOutcome, run_script};
