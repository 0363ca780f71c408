// src/workflow/advisory.rs

use std::fmt::{self, Debug};

use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// A user-facing notice produced by the workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advisory {
    pub severity: Severity,
    pub title: String,
    pub message: String,
}

impl Advisory {
    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, title, message)
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, title, message)
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, title, message)
    }

    fn new(severity: Severity, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            title: title.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.message)
    }
}

pub trait AdvisorySink: Send + Sync + Debug {
    fn report(&self, advisory: Advisory);
}

/// Headless sink: advisories become log lines at the matching level.
#[derive(Debug, Clone, Default)]
pub struct LogAdvisorySink;

impl AdvisorySink for LogAdvisorySink {
    fn report(&self, advisory: Advisory) {
        match advisory.severity {
            Severity::Info => info!(title = %advisory.title, "{}", advisory.message),
            Severity::Warning => warn!(title = %advisory.title, "{}", advisory.message),
            Severity::Error => error!(title = %advisory.title, "{}", advisory.message),
        }
    }
}
