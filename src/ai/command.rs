use std::io::Write;
use std::process::{Command, Stdio};

use serde::Serialize;

use super::{CapabilityError, FirstStepSuggestion, StepSuggester, TaskIngestor};
use crate::io::snapshot::from_str_unbounded;
use crate::model::config::AiConfig;
use crate::model::task::RawTask;

/// Runs user-configured programs (through `sh -c`) as the external capabilities.
///
/// Ingestion receives `{"text": ...}` on stdin and must print a JSON array of
/// `{title, subtasks?}`. Suggestion receives `{"task": ...}` and must print
/// `{"firstStep": ...}`.
#[derive(Debug, Clone, Default)]
pub struct CommandCapability {
    pub ingest_command: Option<String>,
    pub suggest_command: Option<String>,
}

#[derive(Serialize)]
struct IngestRequest<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct SuggestRequest<'a> {
    task: &'a str,
}

impl CommandCapability {
    pub fn from_config(config: &AiConfig) -> Self {
        CommandCapability {
            ingest_command: config.ingest_command.clone(),
            suggest_command: config.suggest_command.clone(),
        }
    }
}

impl TaskIngestor for CommandCapability {
    fn ingest(&self, text: &str) -> Result<Vec<RawTask>, CapabilityError> {
        let command = self
            .ingest_command
            .as_deref()
            .ok_or(CapabilityError::NotConfigured("ingest"))?;
        let stdout = run(command, &serde_json::to_string(&IngestRequest { text })?)?;
        Ok(from_str_unbounded(&stdout)?)
    }
}

impl StepSuggester for CommandCapability {
    fn suggest_first_step(&self, title: &str) -> Result<FirstStepSuggestion, CapabilityError> {
        let command = self
            .suggest_command
            .as_deref()
            .ok_or(CapabilityError::NotConfigured("suggest"))?;
        let stdout = run(command, &serde_json::to_string(&SuggestRequest { task: title })?)?;
        Ok(from_str_unbounded(&stdout)?)
    }
}

/// Run `command` with `request` on stdin and return its stdout.
fn run(command: &str, request: &str) -> Result<String, CapabilityError> {
    tracing::debug!(command, "running external capability");
    let spawn_err = |e: std::io::Error| CapabilityError::Spawn {
        command: command.to_string(),
        source: e,
    };

    let mut child = Command::new("sh")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(spawn_err)?;

    if let Some(mut stdin) = child.stdin.take() {
        // A command that ignores its input may close stdin early
        if let Err(e) = stdin.write_all(request.as_bytes())
            && e.kind() != std::io::ErrorKind::BrokenPipe
        {
            return Err(spawn_err(e));
        }
    }

    let output = child.wait_with_output().map_err(spawn_err)?;
    if !output.status.success() {
        return Err(CapabilityError::Failed {
            command: command.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
