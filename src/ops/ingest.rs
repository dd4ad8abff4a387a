use crate::model::task::{RawTask, Task, TaskId, TaskList, generate_id};

/// Turn an externally produced description into a task tree, giving every
/// node a fresh id.
///
/// Titles are copied verbatim (blank ones included), order is preserved and
/// nothing is deduplicated.
pub fn map_raw_tasks(raw: &[RawTask]) -> TaskList {
    map_raw_tasks_with(raw, &mut generate_id)
}

/// Same as [`map_raw_tasks`] with a caller-supplied id generator.
pub fn map_raw_tasks_with(raw: &[RawTask], next_id: &mut dyn FnMut() -> TaskId) -> TaskList {
    raw.iter().map(|r| map_one(r, next_id)).collect()
}

fn map_one(raw: &RawTask, next_id: &mut dyn FnMut() -> TaskId) -> Task {
    // Parent id first so ids follow pre-order
    let mut task = Task::new(next_id(), raw.title.clone());
    if let Some(children) = &raw.subtasks {
        task.subtasks = map_raw_tasks_with(children, next_id);
    }
    task
}
