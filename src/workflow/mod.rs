// src/workflow/mod.rs

//! Descriptor-driven configuration ("smart workflow").
//!
//! [`orchestrator`] runs the two phases; the other modules are the pieces it
//! is built from: descriptor parsing, placeholder resolution, interpreter
//! and script-root discovery, the content sync seam and advisories.

pub mod advisory;
pub mod descriptor;
pub mod discovery;
pub mod orchestrator;
pub mod resolve;
pub mod sync;

pub use advisory::{Advisory, AdvisorySink, LogAdvisorySink, Severity};
pub use descriptor::{DescriptorWatchEntry, PlatformConfig, WorkflowDescriptor};
pub use discovery::{DiscoveryEnv, find_interpreter, find_script_root};
pub use orchestrator::{
    FinalizeReport, PendingPlatformConfig, WorkflowOrchestrator, WorkflowState,
};
pub use sync::{ContentSync, LocalTreeSync};
