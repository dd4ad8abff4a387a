use serde::Serialize;

use crate::model::task::Task;
use crate::ops::check::CheckResult;
use crate::store::{Notice, NoticeLevel};

/// Number of id characters shown in text output
pub const SHORT_ID_LEN: usize = 8;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct TaskJson {
    pub id: String,
    pub title: String,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_step: Option<String>,
    pub first_step_completed: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subtasks: Vec<TaskJson>,
}

#[derive(Serialize)]
pub struct TaskListJson {
    pub tasks: Vec<TaskJson>,
    pub focused_id: Option<String>,
    pub focus_active: bool,
}

#[derive(Serialize)]
pub struct FocusJson {
    pub focused: Option<TaskJson>,
    pub focus_active: bool,
}

#[derive(Serialize)]
pub struct CreatedJson {
    pub id: String,
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

pub fn task_to_json(task: &Task) -> TaskJson {
    TaskJson {
        id: task.id.clone(),
        title: task.title.clone(),
        completed: task.is_completed,
        first_step: task.has_first_step().then(|| task.first_step.clone()),
        first_step_completed: task.is_first_step_completed,
        subtasks: task.subtasks.iter().map(task_to_json).collect(),
    }
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(SHORT_ID_LEN) {
        Some((end, _)) => &id[..end],
        None => id,
    }
}

fn checkbox(done: bool) -> &'static str {
    if done { "[x]" } else { "[ ]" }
}

/// Format a single task as a one-line summary
pub fn format_task_line(task: &Task, focused: bool) -> String {
    let marker = if focused { " *" } else { "" };
    format!(
        "{} {} {}{}",
        checkbox(task.is_completed),
        short_id(&task.id),
        task.title,
        marker
    )
}

/// Format a task and its subtasks, indented, with first steps beneath
pub fn format_task_tree(task: &Task, indent: usize, focused_id: Option<&str>) -> Vec<String> {
    let mut lines = Vec::new();
    let prefix = "  ".repeat(indent);
    let focused = focused_id == Some(task.id.as_str());
    lines.push(format!("{}{}", prefix, format_task_line(task, focused)));
    if task.has_first_step() {
        lines.push(format!(
            "{}    -> {} {}",
            prefix,
            checkbox(task.is_first_step_completed),
            task.first_step
        ));
    }

    for sub in &task.subtasks {
        lines.extend(format_task_tree(sub, indent + 1, focused_id));
    }
    lines
}

/// Format detailed task view
pub fn format_task_detail(task: &Task) -> Vec<String> {
    let mut lines = vec![
        format!("{} {}", checkbox(task.is_completed), task.title),
        format!("id: {}", task.id),
    ];
    if task.has_first_step() {
        lines.push(format!(
            "first step: {} {}",
            checkbox(task.is_first_step_completed),
            task.first_step
        ));
    }

    if !task.subtasks.is_empty() {
        lines.push(String::new());
        lines.push("subtasks:".to_string());
        for sub in &task.subtasks {
            lines.extend(format_task_tree(sub, 1, None));
        }
    }
    lines
}

pub fn format_check(result: &CheckResult) -> Vec<String> {
    let mut lines = Vec::new();
    if !result.errors.is_empty() {
        lines.push("Errors:".to_string());
        for err in &result.errors {
            lines.push(format!("  {}", err));
        }
    }
    if !result.warnings.is_empty() {
        if !result.errors.is_empty() {
            lines.push(String::new());
        }
        lines.push("Warnings:".to_string());
        for warn in &result.warnings {
            lines.push(format!("  {}", warn));
        }
    }
    if result.valid {
        lines.push("✓ tasks are valid".to_string());
    } else {
        lines.push("✗ tasks have errors".to_string());
    }
    lines
}

pub fn format_notice(notice: &Notice) -> String {
    let level = match notice.level {
        NoticeLevel::Info => "info",
        NoticeLevel::Warning => "warning",
        NoticeLevel::Error => "error",
    };
    format!("{}: {}: {}", level, notice.title, notice.message)
}
