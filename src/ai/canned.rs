use super::{CapabilityError, FirstStepSuggestion, StepSuggester, TaskIngestor};
use crate::model::task::RawTask;

/// Returns the same task list whatever the input. Useful offline and as a demo.
#[derive(Debug, Clone)]
pub struct CannedIngestor {
    pub tasks: Vec<RawTask>,
}

impl Default for CannedIngestor {
    fn default() -> Self {
        CannedIngestor {
            tasks: vec![
                RawTask::leaf("Find a venue"),
                RawTask::leaf("Send invites"),
                RawTask::leaf("Get a cake"),
                RawTask::leaf("Plan activities"),
            ],
        }
    }
}

impl TaskIngestor for CannedIngestor {
    fn ingest(&self, _text: &str) -> Result<Vec<RawTask>, CapabilityError> {
        Ok(self.tasks.clone())
    }
}

/// Suggests `"<prefix> <title>"` for every task.
#[derive(Debug, Clone)]
pub struct CannedSuggester {
    pub prefix: String,
}

impl Default for CannedSuggester {
    fn default() -> Self {
        CannedSuggester {
            prefix: "Spend five minutes on:".to_string(),
        }
    }
}

impl StepSuggester for CannedSuggester {
    fn suggest_first_step(&self, title: &str) -> Result<FirstStepSuggestion, CapabilityError> {
        Ok(FirstStepSuggestion {
            first_step: format!("{} {}", self.prefix, title),
        })
    }
}
