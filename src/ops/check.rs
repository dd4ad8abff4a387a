use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::model::task::{Task, TaskList};
use crate::ops::tree_ops;

/// Structured result from `mo check`, suitable for --json output.
#[derive(Debug, Default, Serialize)]
pub struct CheckResult {
    pub valid: bool,
    pub errors: Vec<CheckError>,
    pub warnings: Vec<CheckWarning>,
}

/// A broken tree invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum CheckError {
    /// The same id appears on more than one task
    #[serde(rename = "duplicate_id")]
    DuplicateId { task_id: String, count: usize },
    /// A task has an empty or whitespace-only id
    #[serde(rename = "blank_id")]
    BlankId { title: String },
}

/// Something odd but tolerated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum CheckWarning {
    /// Title is empty after trimming (external ingestion may produce these)
    #[serde(rename = "blank_title")]
    BlankTitle { task_id: String },
    /// First step is marked done but there is no first step
    #[serde(rename = "completed_empty_first_step")]
    CompletedEmptyFirstStep { task_id: String },
}

impl fmt::Display for CheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckError::DuplicateId { task_id, count } => {
                write!(f, "id {} is used by {} tasks", task_id, count)
            }
            CheckError::BlankId { title } => write!(f, "task \"{}\" has a blank id", title),
        }
    }
}

impl fmt::Display for CheckWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckWarning::BlankTitle { task_id } => write!(f, "task {} has a blank title", task_id),
            CheckWarning::CompletedEmptyFirstStep { task_id } => {
                write!(f, "task {} has a completed but empty first step", task_id)
            }
        }
    }
}

/// Validate a task tree. Read-only.
///
/// Checks performed:
/// 1. No duplicate ids
/// 2. No blank ids
/// 3. Warnings for blank titles and completed-but-empty first steps
pub fn check_tree(tree: &TaskList) -> CheckResult {
    let mut result = CheckResult::default();

    // First-seen order keeps the output stable
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    tree_ops::walk(tree, &mut |task: &Task| {
        if task.id.trim().is_empty() {
            result.errors.push(CheckError::BlankId {
                title: task.title.clone(),
            });
        } else {
            let n = counts.entry(task.id.clone()).or_insert(0);
            if *n == 0 {
                order.push(task.id.clone());
            }
            *n += 1;
        }
        if task.title.trim().is_empty() {
            result.warnings.push(CheckWarning::BlankTitle {
                task_id: task.id.clone(),
            });
        }
        if task.is_first_step_completed && !task.has_first_step() {
            result.warnings.push(CheckWarning::CompletedEmptyFirstStep {
                task_id: task.id.clone(),
            });
        }
    });

    for id in order {
        let count = counts[&id];
        if count > 1 {
            result.errors.push(CheckError::DuplicateId { task_id: id, count });
        }
    }

    result.valid = result.errors.is_empty();
    result
}
