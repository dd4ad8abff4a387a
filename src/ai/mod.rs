//! External capabilities: turning text into tasks, and suggesting a first step.
//!
//! The coordinator only sees the two traits. `CommandCapability` drives an
//! external program; the canned implementations work offline.

pub mod canned;
pub mod command;

use serde::{Deserialize, Serialize};

use crate::model::task::RawTask;

pub use canned::{CannedIngestor, CannedSuggester};
pub use command::CommandCapability;

#[derive(Debug, thiserror::Error)]
pub enum CapabilityError {
    #[error("no {0} command configured")]
    NotConfigured(&'static str),
    #[error("could not run `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
    #[error("`{command}` failed ({status}): {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },
    #[error("unexpected response: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("{0}")]
    Other(String),
}

/// Response of the suggestion capability
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirstStepSuggestion {
    pub first_step: String,
}

/// Break natural-language text into a nested task description.
pub trait TaskIngestor {
    fn ingest(&self, text: &str) -> Result<Vec<RawTask>, CapabilityError>;
}

/// Suggest a small first action for a task title.
pub trait StepSuggester {
    fn suggest_first_step(&self, title: &str) -> Result<FirstStepSuggestion, CapabilityError>;
}

impl<F> TaskIngestor for F
where
    F: Fn(&str) -> Result<Vec<RawTask>, CapabilityError>,
{
    fn ingest(&self, text: &str) -> Result<Vec<RawTask>, CapabilityError> {
        self(text)
    }
}

impl<F> StepSuggester for F
where
    F: Fn(&str) -> Result<FirstStepSuggestion, CapabilityError>,
{
    fn suggest_first_step(&self, title: &str) -> Result<FirstStepSuggestion, CapabilityError> {
        self(title)
    }
}
