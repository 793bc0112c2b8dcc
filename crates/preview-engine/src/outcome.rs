//! Render outcomes reported to the UI

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{NormalizeError, SandboxLoadError};
use crate::sandbox::{FailureKind, HarnessReport};

/// Which boundary a failure was caught at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureOrigin {
    /// The source could not be turned into a program
    Normalization,
    /// The component threw or was missing inside the sandbox
    Runtime,
    /// The program could not be assembled or loaded
    SandboxLoad,
}

impl fmt::Display for FailureOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FailureOrigin::Normalization => "normalization",
            FailureOrigin::Runtime => "runtime",
            FailureOrigin::SandboxLoad => "sandbox-load",
        })
    }
}

/// Result of one rebuild
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RenderOutcome {
    Mounted {
        generation: u64,
        markup: String,
    },
    Failed {
        generation: u64,
        origin: FailureOrigin,
        message: String,
        /// Harness failure kind, for failures caught inside the sandbox
        #[serde(default, skip_serializing_if = "Option::is_none")]
        kind: Option<FailureKind>,
        /// Error panel shown inside the sandbox, when one was rendered
        markup: Option<String>,
    },
}

impl RenderOutcome {
    pub(crate) fn from_normalize_error(generation: u64, err: &NormalizeError) -> Self {
        RenderOutcome::Failed {
            generation,
            origin: FailureOrigin::Normalization,
            message: err.to_string(),
            kind: None,
            markup: None,
        }
    }

    pub(crate) fn from_load_error(generation: u64, err: &SandboxLoadError) -> Self {
        RenderOutcome::Failed {
            generation,
            origin: FailureOrigin::SandboxLoad,
            message: format!("preview failed to load: {}", err),
            kind: None,
            markup: None,
        }
    }

    pub(crate) fn from_report(report: HarnessReport) -> Self {
        match report {
            HarnessReport::Mounted { generation, markup } => {
                RenderOutcome::Mounted { generation, markup }
            }
            HarnessReport::Failed {
                generation,
                kind,
                message,
                markup,
            } => RenderOutcome::Failed {
                generation,
                origin: FailureOrigin::Runtime,
                message,
                kind: Some(kind),
                markup: Some(markup),
            },
        }
    }

    pub fn generation(&self) -> u64 {
        match self {
            RenderOutcome::Mounted { generation, .. } | RenderOutcome::Failed { generation, .. } => {
                *generation
            }
        }
    }

    pub fn is_mounted(&self) -> bool {
        matches!(self, RenderOutcome::Mounted { .. })
    }

    pub fn origin(&self) -> Option<FailureOrigin> {
        match self {
            RenderOutcome::Failed { origin, .. } => Some(*origin),
            RenderOutcome::Mounted { .. } => None,
        }
    }

    /// Distinguishes a missing component from one that threw
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            RenderOutcome::Failed { kind, .. } => *kind,
            RenderOutcome::Mounted { .. } => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            RenderOutcome::Failed { message, .. } => Some(message),
            RenderOutcome::Mounted { .. } => None,
        }
    }

    pub fn markup(&self) -> Option<&str> {
        match self {
            RenderOutcome::Mounted { markup, .. } => Some(markup),
            RenderOutcome::Failed { markup, .. } => markup.as_deref(),
        }
    }
}
