use serde::{Deserialize, Serialize};

/// Opaque task identifier (UUID v4 text for tasks created here)
pub type TaskId = String;

/// An ordered sequence of tasks: the root of a tree, or a task's children.
///
/// Backed by a persistent vector, so cloning is cheap and a rebuilt tree
/// shares every subtree that was not on the path to the change.
pub type TaskList = im::Vector<Task>;

/// A node in the task tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Stable identifier, never reassigned
    pub id: TaskId,
    /// Display title
    pub title: String,
    /// Children, in display order
    #[serde(default)]
    pub subtasks: TaskList,
    #[serde(default)]
    pub is_completed: bool,
    /// The single designated next action (empty = none)
    #[serde(default)]
    pub first_step: String,
    /// Only meaningful when `first_step` is non-empty
    #[serde(default)]
    pub is_first_step_completed: bool,
}

impl Task {
    /// Create a task with default fields and no children
    pub fn new(id: impl Into<TaskId>, title: impl Into<String>) -> Self {
        Task {
            id: id.into(),
            title: title.into(),
            subtasks: TaskList::new(),
            is_completed: false,
            first_step: String::new(),
            is_first_step_completed: false,
        }
    }

    /// Create a task with a freshly generated id
    pub fn with_fresh_id(title: impl Into<String>) -> Self {
        Task::new(generate_id(), title)
    }

    pub fn has_first_step(&self) -> bool {
        !self.first_step.is_empty()
    }

    /// Apply a patch in place: every field the patch sets replaces the current value.
    pub fn apply(&mut self, patch: &TaskPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(done) = patch.is_completed {
            self.is_completed = done;
        }
        if let Some(step) = &patch.first_step {
            self.first_step = step.clone();
        }
        if let Some(done) = patch.is_first_step_completed {
            self.is_first_step_completed = done;
        }
        if let Some(subtasks) = &patch.subtasks {
            self.subtasks = subtasks.clone();
        }
    }
}

/// Generate a fresh task id
pub fn generate_id() -> TaskId {
    uuid::Uuid::new_v4().to_string()
}

/// Whole-field replacements for a task. `None` leaves the field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub is_completed: Option<bool>,
    pub first_step: Option<String>,
    pub is_first_step_completed: Option<bool>,
    pub subtasks: Option<TaskList>,
}

impl TaskPatch {
    pub fn title(title: impl Into<String>) -> Self {
        TaskPatch {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn completed(done: bool) -> Self {
        TaskPatch {
            is_completed: Some(done),
            ..Default::default()
        }
    }

    pub fn first_step(text: impl Into<String>) -> Self {
        TaskPatch {
            first_step: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn first_step_completed(done: bool) -> Self {
        TaskPatch {
            is_first_step_completed: Some(done),
            ..Default::default()
        }
    }

    pub fn subtasks(subtasks: TaskList) -> Self {
        TaskPatch {
            subtasks: Some(subtasks),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == TaskPatch::default()
    }
}

/// A task as described by the external ingestion capability
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTask {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtasks: Option<Vec<RawTask>>,
}

impl RawTask {
    pub fn leaf(title: impl Into<String>) -> Self {
        RawTask {
            title: title.into(),
            subtasks: None,
        }
    }

    pub fn with_subtasks(title: impl Into<String>, subtasks: Vec<RawTask>) -> Self {
        RawTask {
            title: title.into(),
            subtasks: Some(subtasks),
        }
    }
}

/// Where a new task goes, or whose children a sibling list belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parent {
    Root,
    Task(TaskId),
}

impl Parent {
    pub fn from_option(id: Option<TaskId>) -> Self {
        match id {
            Some(id) => Parent::Task(id),
            None => Parent::Root,
        }
    }
}

/// Reorder direction within a sibling sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    /// Parse `up` / `down`
    pub fn parse(s: &str) -> Option<Direction> {
        match s {
            "up" => Some(Direction::Up),
            "down" => Some(Direction::Down),
            _ => None,
        }
    }
}
