//! Pure operations on the task tree.
//!
//! Every operation takes the tree by reference and returns a new tree; the
//! input is never mutated. Only the nodes on the path from the root to the
//! change are rebuilt, every other subtree is shared with the input. An id
//! that is not in the tree is a silent no-op, never an error.

use crate::model::task::{Direction, Parent, Task, TaskList, TaskPatch};

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

/// Find a task by id anywhere in the tree.
///
/// Depth-first, parents before children, sibling order respected. If ids were
/// ever duplicated the earliest one encountered wins.
pub fn find<'a>(tree: &'a TaskList, id: &str) -> Option<&'a Task> {
    for task in tree.iter() {
        if task.id == id {
            return Some(task);
        }
        if let Some(t) = find(&task.subtasks, id) {
            return Some(t);
        }
    }
    None
}

/// Index path from the root sequence down to the task with `id`.
pub fn locate(tree: &TaskList, id: &str) -> Option<Vec<usize>> {
    for (i, task) in tree.iter().enumerate() {
        if task.id == id {
            return Some(vec![i]);
        }
        if let Some(mut path) = locate(&task.subtasks, id) {
            path.insert(0, i);
            return Some(path);
        }
    }
    None
}

/// The parent of the task with `id`: `Root` for top-level tasks, `None` if absent.
pub fn parent_of(tree: &TaskList, id: &str) -> Option<Parent> {
    if tree.iter().any(|t| t.id == id) {
        return Some(Parent::Root);
    }
    find_parent_in(tree, id).map(|p| Parent::Task(p.id.clone()))
}

fn find_parent_in<'a>(list: &'a TaskList, id: &str) -> Option<&'a Task> {
    for task in list.iter() {
        if task.subtasks.iter().any(|t| t.id == id) {
            return Some(task);
        }
        if let Some(p) = find_parent_in(&task.subtasks, id) {
            return Some(p);
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Structural changes
// ---------------------------------------------------------------------------

/// Replace the task with `id` by a shallow merge of it and `patch`.
///
/// Subtasks are kept unless the patch sets them.
pub fn update(tree: &TaskList, id: &str, patch: &TaskPatch) -> TaskList {
    splice_at(tree, id, &mut |list, i| {
        let mut node = list[i].clone();
        node.apply(patch);
        let mut out = list.clone();
        out.set(i, node);
        out
    })
    .unwrap_or_else(|| tree.clone())
}

/// Append `task` to the root sequence or to the named parent's subtasks.
///
/// A parent that is not in the tree leaves the tree unchanged.
pub fn insert(tree: &TaskList, parent: &Parent, task: Task) -> TaskList {
    match parent {
        Parent::Root => {
            let mut out = tree.clone();
            out.push_back(task);
            out
        }
        Parent::Task(parent_id) => {
            let mut pending = Some(task);
            splice_at(tree, parent_id, &mut |list, i| {
                let mut node = list[i].clone();
                node.subtasks.extend(pending.take());
                let mut out = list.clone();
                out.set(i, node);
                out
            })
            .unwrap_or_else(|| tree.clone())
        }
    }
}

/// Remove the task with `id` and its entire subtree.
pub fn delete(tree: &TaskList, id: &str) -> TaskList {
    splice_at(tree, id, &mut |list, i| {
        let mut out = list.clone();
        out.remove(i);
        out
    })
    .unwrap_or_else(|| tree.clone())
}

/// Swap the task with `id` and its neighbour inside one sibling sequence.
///
/// No-op when `id` is not a member of `siblings` or when the move would go
/// past either end.
pub fn reorder_siblings(siblings: &TaskList, id: &str, direction: Direction) -> TaskList {
    let Some(idx) = siblings.iter().position(|t| t.id == id) else {
        return siblings.clone();
    };
    let neighbour = match direction {
        Direction::Up => idx.checked_sub(1),
        Direction::Down => Some(idx + 1).filter(|&j| j < siblings.len()),
    };
    match neighbour {
        Some(j) => {
            let mut out = siblings.clone();
            out.swap(idx, j);
            out
        }
        None => siblings.clone(),
    }
}

/// Move the task with `id` one place up or down among its siblings,
/// wherever in the tree those siblings live.
pub fn reorder(tree: &TaskList, id: &str, direction: Direction) -> TaskList {
    splice_at(tree, id, &mut |list, _| reorder_siblings(list, id, direction))
        .unwrap_or_else(|| tree.clone())
}

/// Replace the root sequence, or the subtasks of the named parent, with `list`.
pub fn replace_subtasks(tree: &TaskList, parent: &Parent, list: TaskList) -> TaskList {
    match parent {
        Parent::Root => list,
        Parent::Task(parent_id) => update(tree, parent_id, &TaskPatch::subtasks(list)),
    }
}

/// Locate the sibling sequence that directly contains `id`, let `edit` produce
/// its replacement, and rebuild every ancestor on the way back up.
///
/// Returns `None` when `id` is not in the tree.
fn splice_at(
    list: &TaskList,
    id: &str,
    edit: &mut dyn FnMut(&TaskList, usize) -> TaskList,
) -> Option<TaskList> {
    for (i, task) in list.iter().enumerate() {
        if task.id == id {
            return Some(edit(list, i));
        }
        if let Some(children) = splice_at(&task.subtasks, id, edit) {
            let mut out = list.clone();
            out.set(
                i,
                Task {
                    subtasks: children,
                    ..task.clone()
                },
            );
            return Some(out);
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Traversal
// ---------------------------------------------------------------------------

/// Visit every task depth-first, parents before children.
pub fn walk(tree: &TaskList, f: &mut dyn FnMut(&Task)) {
    for task in tree.iter() {
        f(task);
        walk(&task.subtasks, f);
    }
}

/// All ids in traversal order.
pub fn ids(tree: &TaskList) -> Vec<String> {
    let mut out = Vec::new();
    walk(tree, &mut |t| out.push(t.id.clone()));
    out
}

/// Total number of tasks at every depth.
pub fn count(tree: &TaskList) -> usize {
    let mut n = 0;
    walk(tree, &mut |_| n += 1);
    n
}

/// Ids of every task beneath `task` (not including `task` itself).
pub fn descendant_ids(task: &Task) -> Vec<String> {
    ids(&task.subtasks)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
