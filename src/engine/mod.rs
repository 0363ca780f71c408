// src/engine/mod.rs

//! Runtime event loop.
//!
//! The pure mapping from events to commands lives in [`core`]; the async
//! shell that owns the channels and calls into the services is [`runtime`].

pub mod core;
pub mod runtime;

pub use core::{CoreCommand, Step, step};
pub use runtime::Runtime;

/// Events flowing into the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    /// A content sync started by the workflow completed.
    SyncFinished,
    /// Persisted settings changed; the watch service must reload.
    ConfigChanged,
    /// Ctrl-C or an embedding host asked us to stop.
    ShutdownRequested,
}
