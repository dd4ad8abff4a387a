use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::model::task::TaskId;

/// View state the CLI carries between invocations (written to .state.json).
/// Kept apart from the task blob so the persisted tree never holds view flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiState {
    #[serde(default)]
    pub focused_id: Option<TaskId>,
    #[serde(default)]
    pub focus_active: bool,
}

/// Read .state.json; missing or malformed files read as `None`
pub fn read_ui_state(data_dir: &Path) -> Option<UiState> {
    let content = fs::read_to_string(data_dir.join(".state.json")).ok()?;
    serde_json::from_str(&content).ok()
}

pub fn write_ui_state(data_dir: &Path, state: &UiState) -> Result<(), std::io::Error> {
    let content = serde_json::to_string_pretty(state)?;
    fs::write(data_dir.join(".state.json"), content)
}
