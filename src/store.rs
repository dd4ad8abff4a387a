//! The task store: one owned aggregate holding the tree and the view state
//! around it.
//!
//! Every command replaces the tree with the result of a pure tree operation
//! and then writes it through the [`BlobStore`]. Storage failures never undo
//! or block a command; they are reported as [`Notice`]s.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::ai::{CapabilityError, FirstStepSuggestion, StepSuggester, TaskIngestor};
use crate::io::blob_store::BlobStore;
use crate::io::recovery::{RecoveryCategory, RecoveryEntry};
use crate::io::snapshot;
use crate::model::config::TASKS_STORAGE_KEY;
use crate::model::task::{Direction, Parent, RawTask, Task, TaskId, TaskList, TaskPatch};
use crate::ops::{check, ingest, tree_ops};

/// Error type for store commands. State is untouched when one is returned.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0}")]
    Validation(String),
    #[error("{context}: {source}")]
    External {
        context: &'static str,
        source: CapabilityError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A message for the user about something that happened
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub message: String,
}

impl Notice {
    fn new(level: NoticeLevel, title: &str, message: impl Into<String>) -> Self {
        Notice {
            level,
            title: title.to_string(),
            message: message.into(),
        }
    }
}

/// An ingestion call that has been started and must be finished with
/// [`TaskStore::finish_ingest`].
#[derive(Debug)]
#[must_use = "an outstanding ingestion keeps the store busy until finished"]
pub struct IngestTicket {
    text: String,
}

impl IngestTicket {
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// A suggestion call that has been started and must be finished with
/// [`TaskStore::finish_suggestion`].
#[derive(Debug)]
#[must_use = "an outstanding suggestion keeps the store busy until finished"]
pub struct SuggestionTicket {
    task_id: TaskId,
    title: String,
}

impl SuggestionTicket {
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }
}

pub struct TaskStore<S: BlobStore> {
    tasks: TaskList,
    focused_id: Option<TaskId>,
    focus_active: bool,
    ingestions_in_flight: usize,
    suggestions_in_flight: usize,
    /// Tasks currently being edited in the view. Never persisted.
    editing: HashSet<TaskId>,
    notices: Vec<Notice>,
    store: S,
    key: String,
}

impl<S: BlobStore> TaskStore<S> {
    /// Open the store, restoring the tree saved under the default key.
    pub fn open(store: S) -> Self {
        Self::open_with_key(store, TASKS_STORAGE_KEY)
    }

    /// Open the store, restoring the tree saved under `key`.
    ///
    /// A missing blob gives an empty tree. An unreadable one also gives an
    /// empty tree, after handing the blob to [`BlobStore::preserve`] and
    /// recording an error notice.
    pub fn open_with_key(store: S, key: impl Into<String>) -> Self {
        let mut this = TaskStore {
            tasks: TaskList::new(),
            focused_id: None,
            focus_active: false,
            ingestions_in_flight: 0,
            suggestions_in_flight: 0,
            editing: HashSet::new(),
            notices: Vec::new(),
            store,
            key: key.into(),
        };
        this.restore();
        this
    }

    fn restore(&mut self) {
        let blob = match self.store.load(&self.key) {
            Ok(Some(blob)) => blob,
            Ok(None) => return,
            Err(e) => {
                warn!(error = %e, key = %self.key, "could not read saved tasks");
                self.notify(NoticeLevel::Error, "Could not load saved tasks", e.to_string());
                return;
            }
        };

        match snapshot::decode(&blob) {
            Ok(tasks) => {
                let result = check::check_tree(&tasks);
                for problem in &result.errors {
                    warn!(%problem, "saved tasks violate tree invariants");
                    self.notify(NoticeLevel::Warning, "Saved tasks have problems", problem.to_string());
                }
                debug!(count = tree_ops::count(&tasks), "restored tasks");
                self.tasks = tasks;
            }
            Err(e) => {
                warn!(error = %e, key = %self.key, "saved tasks are unreadable, starting empty");
                self.notify(NoticeLevel::Error, "Could not load saved tasks", e.to_string());
                let entry = RecoveryEntry::new(
                    RecoveryCategory::Unreadable,
                    "saved tasks could not be decoded",
                )
                .field("Key", self.key.clone())
                .field("Error", e.to_string())
                .body(blob);
                self.store.preserve(entry);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn tasks(&self) -> &TaskList {
        &self.tasks
    }

    pub fn find(&self, id: &str) -> Option<&Task> {
        tree_ops::find(&self.tasks, id)
    }

    pub fn focused_id(&self) -> Option<&str> {
        self.focused_id.as_deref()
    }

    /// The focused task, if one is selected and still exists
    pub fn focused_task(&self) -> Option<&Task> {
        self.focused_id.as_deref().and_then(|id| self.find(id))
    }

    pub fn focus_active(&self) -> bool {
        self.focus_active
    }

    pub fn ingestion_busy(&self) -> bool {
        self.ingestions_in_flight > 0
    }

    pub fn suggestion_busy(&self) -> bool {
        self.suggestions_in_flight > 0
    }

    pub fn is_editing(&self, id: &str) -> bool {
        self.editing.contains(id)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Drain the notices recorded since the last call.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    // -----------------------------------------------------------------------
    // Ingestion
    // -----------------------------------------------------------------------

    /// Ingest `text` through `ingestor`, replacing the whole tree.
    /// Returns the number of top-level tasks created.
    pub fn ingest(&mut self, text: &str, ingestor: &dyn TaskIngestor) -> Result<usize, StoreError> {
        let ticket = self.begin_ingest(text)?;
        let outcome = ingestor.ingest(ticket.text());
        self.finish_ingest(ticket, outcome)
    }

    /// Validate `text` and mark an ingestion as in flight.
    pub fn begin_ingest(&mut self, text: &str) -> Result<IngestTicket, StoreError> {
        if text.trim().is_empty() {
            return Err(StoreError::Validation(
                "please enter your problem or tasks".to_string(),
            ));
        }
        self.ingestions_in_flight += 1;
        debug!(chars = text.len(), "ingestion started");
        Ok(IngestTicket {
            text: text.to_string(),
        })
    }

    /// Complete an ingestion. Busy is cleared whatever the outcome; the tree
    /// is only replaced on success.
    pub fn finish_ingest(
        &mut self,
        ticket: IngestTicket,
        outcome: Result<Vec<RawTask>, CapabilityError>,
    ) -> Result<usize, StoreError> {
        self.ingestions_in_flight = self.ingestions_in_flight.saturating_sub(1);
        drop(ticket);

        let raw = outcome.map_err(|e| {
            warn!(error = %e, "ingestion failed");
            StoreError::External {
                context: "could not process your tasks",
                source: e,
            }
        })?;

        let tasks = ingest::map_raw_tasks(&raw);
        let roots = tasks.len();
        info!(roots, total = tree_ops::count(&tasks), "tasks ingested");
        self.editing.clear();
        self.set_tasks(tasks);
        self.drop_stale_focus();
        self.notify(NoticeLevel::Info, "Success", "Tasks ingested successfully!");
        Ok(roots)
    }

    // -----------------------------------------------------------------------
    // Task commands
    // -----------------------------------------------------------------------

    /// Append a new task under `parent`. Returns its id, or `None` when the
    /// parent does not exist (nothing is added).
    pub fn add_task(&mut self, parent: &Parent, title: &str) -> Result<Option<TaskId>, StoreError> {
        if title.trim().is_empty() {
            return Err(StoreError::Validation("task title cannot be empty".to_string()));
        }
        if let Parent::Task(parent_id) = parent
            && self.find(parent_id).is_none()
        {
            debug!(%parent_id, "add_task: parent not found");
            return Ok(None);
        }

        let task = Task::with_fresh_id(title);
        let id = task.id.clone();
        debug!(%id, ?parent, "add_task");
        let tasks = tree_ops::insert(&self.tasks, parent, task);
        self.set_tasks(tasks);
        Ok(Some(id))
    }

    /// Apply a patch as-is. Callers validate titles themselves.
    pub fn update_task(&mut self, id: &str, patch: &TaskPatch) {
        if patch.is_empty() {
            return;
        }
        debug!(%id, "update_task");
        let tasks = tree_ops::update(&self.tasks, id, patch);
        self.set_tasks(tasks);
    }

    /// Change a task's title and leave edit mode for it.
    pub fn rename_task(&mut self, id: &str, title: &str) -> Result<(), StoreError> {
        if title.trim().is_empty() {
            return Err(StoreError::Validation("task title cannot be empty".to_string()));
        }
        self.update_task(id, &TaskPatch::title(title));
        self.editing.remove(id);
        Ok(())
    }

    /// Remove a task and its subtree. Focus on a task that no longer exists
    /// is cleared together with focus mode.
    pub fn delete_task(&mut self, id: &str) {
        if let Some(removed) = self.find(id).cloned() {
            debug!(%id, descendants = tree_ops::count(&removed.subtasks), "delete_task");
            self.editing.remove(id);
            for gone in tree_ops::descendant_ids(&removed) {
                self.editing.remove(&gone);
            }
            if let Ok(body) = serde_json::to_string_pretty(&removed) {
                let entry =
                    RecoveryEntry::new(RecoveryCategory::Delete, format!("task {} deleted", id))
                        .field("Title", removed.title.clone())
                        .body(body);
                self.store.preserve(entry);
            }
            let tasks = tree_ops::delete(&self.tasks, id);
            self.set_tasks(tasks);
            self.notify(NoticeLevel::Info, "Task Deleted", "The task has been removed.");
        }
        if self.focused_id.as_deref() == Some(id) {
            self.clear_focus();
        }
        self.drop_stale_focus();
    }

    /// Move a task one place among its siblings.
    pub fn reorder_task(&mut self, id: &str, direction: Direction) {
        debug!(%id, ?direction, "reorder_task");
        let tasks = tree_ops::reorder(&self.tasks, id, direction);
        self.set_tasks(tasks);
    }

    pub fn toggle_complete(&mut self, id: &str) {
        if let Some(done) = self.find(id).map(|t| t.is_completed) {
            self.update_task(id, &TaskPatch::completed(!done));
        }
    }

    /// Set the first step verbatim; an empty string clears it.
    pub fn set_first_step(&mut self, id: &str, text: &str) {
        self.update_task(id, &TaskPatch::first_step(text));
    }

    pub fn toggle_first_step_complete(&mut self, id: &str) {
        if let Some(done) = self.find(id).map(|t| t.is_first_step_completed) {
            self.update_task(id, &TaskPatch::first_step_completed(!done));
        }
    }

    // -----------------------------------------------------------------------
    // First-step suggestion
    // -----------------------------------------------------------------------

    /// Ask `suggester` for a first step for `title` and store it on `id`.
    pub fn suggest_first_step(
        &mut self,
        id: &str,
        title: &str,
        suggester: &dyn StepSuggester,
    ) -> Result<(), StoreError> {
        let ticket = self.begin_suggestion(id, title);
        let outcome = suggester.suggest_first_step(ticket.title());
        self.finish_suggestion(ticket, outcome)
    }

    /// Mark a suggestion as in flight. Several may be outstanding at once.
    pub fn begin_suggestion(&mut self, id: &str, title: &str) -> SuggestionTicket {
        self.suggestions_in_flight += 1;
        debug!(%id, "suggestion started");
        SuggestionTicket {
            task_id: id.to_string(),
            title: title.to_string(),
        }
    }

    /// Complete a suggestion. The last one to finish wins; a task deleted in
    /// the meantime is silently skipped.
    pub fn finish_suggestion(
        &mut self,
        ticket: SuggestionTicket,
        outcome: Result<FirstStepSuggestion, CapabilityError>,
    ) -> Result<(), StoreError> {
        self.suggestions_in_flight = self.suggestions_in_flight.saturating_sub(1);

        let suggestion = outcome.map_err(|e| {
            warn!(error = %e, task = %ticket.task_id, "suggestion failed");
            StoreError::External {
                context: "could not suggest a first step",
                source: e,
            }
        })?;

        self.set_first_step(&ticket.task_id, &suggestion.first_step);
        self.notify(NoticeLevel::Info, "Suggestion Ready", "First step suggested.");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // View state
    // -----------------------------------------------------------------------

    /// Select the focused task. Deselecting also leaves focus mode.
    pub fn select_focus(&mut self, id: Option<TaskId>) {
        if id.is_none() {
            self.focus_active = false;
        }
        self.focused_id = id;
    }

    /// Flip focus mode. Returns the new state, or a validation error when no
    /// task is selected.
    pub fn toggle_focus_view(&mut self) -> Result<bool, StoreError> {
        if self.focused_id.is_none() {
            self.focus_active = false;
            return Err(StoreError::Validation(
                "no task selected: select a task to enter focus view".to_string(),
            ));
        }
        self.focus_active = !self.focus_active;
        Ok(self.focus_active)
    }

    /// Bring back view state saved by a front end. A task that no longer
    /// exists is not restored.
    pub fn restore_focus(&mut self, id: Option<TaskId>, active: bool) {
        self.focus_active = active && id.is_some();
        self.focused_id = id;
        self.drop_stale_focus();
    }

    pub fn set_editing(&mut self, id: &str, editing: bool) {
        if editing {
            self.editing.insert(id.to_string());
        } else {
            self.editing.remove(id);
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn set_tasks(&mut self, tasks: TaskList) {
        self.tasks = tasks;
        self.persist();
    }

    fn persist(&mut self) {
        let blob = match snapshot::encode(&self.tasks) {
            Ok(blob) => blob,
            Err(e) => {
                warn!(error = %e, "could not encode tasks");
                self.notify(NoticeLevel::Error, "Could not save tasks", e.to_string());
                return;
            }
        };
        if let Err(e) = self.store.save(&self.key, &blob) {
            warn!(error = %e, key = %self.key, "could not save tasks");
            self.notify(NoticeLevel::Error, "Could not save tasks", e.to_string());
            let entry = RecoveryEntry::new(RecoveryCategory::Write, "tasks could not be saved")
                .field("Key", self.key.clone())
                .field("Error", e.to_string())
                .body(blob);
            self.store.preserve(entry);
        }
    }

    fn clear_focus(&mut self) {
        self.focused_id = None;
        self.focus_active = false;
    }

    fn drop_stale_focus(&mut self) {
        if self.focused_id.is_some() && self.focused_task().is_none() {
            self.clear_focus();
        }
    }

    fn notify(&mut self, level: NoticeLevel, title: &str, message: impl Into<String>) {
        self.notices.push(Notice::new(level, title, message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{CannedIngestor, CannedSuggester};
    use crate::io::blob_store::{MemoryStore, StorageError};
    use pretty_assertions::assert_eq;

    fn ingestor(
        tasks: Vec<RawTask>,
    ) -> impl Fn(&str) -> Result<Vec<RawTask>, CapabilityError> {
        move |_: &str| Ok(tasks.clone())
    }

    fn failing_ingestor(_: &str) -> Result<Vec<RawTask>, CapabilityError> {
        Err(CapabilityError::Other("model unavailable".into()))
    }

    fn failing_suggester(_: &str) -> Result<FirstStepSuggestion, CapabilityError> {
        Err(CapabilityError::Other("model unavailable".into()))
    }

    fn suggestion(text: &str) -> Result<FirstStepSuggestion, CapabilityError> {
        Ok(FirstStepSuggestion {
            first_step: text.to_string(),
        })
    }

    /// Store with two root tasks, "A" and "B"
    fn two_task_store() -> (TaskStore<MemoryStore>, TaskId, TaskId) {
        let mut store = TaskStore::open(MemoryStore::new());
        let a = store.add_task(&Parent::Root, "A").unwrap().unwrap();
        let b = store.add_task(&Parent::Root, "B").unwrap().unwrap();
        store.take_notices();
        (store, a, b)
    }

    fn root_titles<S: BlobStore>(store: &TaskStore<S>) -> Vec<String> {
        store.tasks().iter().map(|t| t.title.clone()).collect()
    }

    /// Store whose saves always fail
    #[derive(Default)]
    struct BrokenStore {
        preserved: Vec<RecoveryEntry>,
    }

    impl BlobStore for BrokenStore {
        fn load(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Ok(None)
        }
        fn save(&mut self, _key: &str, _blob: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("disk full".into()))
        }
        fn preserve(&mut self, entry: RecoveryEntry) {
            self.preserved.push(entry);
        }
    }

    // --- opening ---

    #[test]
    fn open_empty_store() {
        let mut store = TaskStore::open(MemoryStore::new());
        assert!(store.tasks().is_empty());
        assert!(store.take_notices().is_empty());
        assert!(!store.ingestion_busy());
        assert!(!store.suggestion_busy());
        assert!(!store.focus_active());
    }

    #[test]
    fn open_restores_saved_tree() {
        let (store, a, _) = two_task_store();
        let blob = store.store().get(TASKS_STORAGE_KEY).unwrap().to_string();
        let reopened = TaskStore::open(MemoryStore::with_blob(TASKS_STORAGE_KEY, blob));
        assert_eq!(reopened.tasks(), store.tasks());
        assert_eq!(reopened.find(&a).unwrap().title, "A");
    }

    #[test]
    fn open_malformed_blob_falls_back_and_preserves() {
        let mut store = TaskStore::open(MemoryStore::with_blob(TASKS_STORAGE_KEY, "not json {{{"));
        assert!(store.tasks().is_empty());
        let notices = store.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Error);
        assert_eq!(notices[0].title, "Could not load saved tasks");
        let preserved = store.store().preserved();
        assert_eq!(preserved.len(), 1);
        assert_eq!(preserved[0].category, RecoveryCategory::Unreadable);
        assert_eq!(preserved[0].body, "not json {{{");
    }

    #[test]
    fn open_reports_duplicate_ids() {
        let blob = r#"{"version":1,"tasks":[{"id":"x","title":"A"},{"id":"x","title":"B"}]}"#;
        let mut store = TaskStore::open(MemoryStore::with_blob(TASKS_STORAGE_KEY, blob));
        assert_eq!(store.tasks().len(), 2);
        let notices = store.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Warning);
        assert_eq!(notices[0].message, "id x is used by 2 tasks");
    }

    #[test]
    fn open_with_custom_key() {
        let mut store = TaskStore::open_with_key(MemoryStore::new(), "other");
        store.add_task(&Parent::Root, "A").unwrap();
        assert!(store.store().get("other").is_some());
        assert!(store.store().get(TASKS_STORAGE_KEY).is_none());
    }

    // --- ingestion ---

    #[test]
    fn ingest_replaces_tree() {
        let (mut store, _, _) = two_task_store();
        let roots = store
            .ingest(
                "Plan party",
                &ingestor(vec![
                    RawTask::leaf("Find venue"),
                    RawTask::leaf("Send invites"),
                ]),
            )
            .unwrap();
        assert_eq!(roots, 2);
        assert_eq!(root_titles(&store), vec!["Find venue", "Send invites"]);
        for task in store.tasks().iter() {
            assert!(task.subtasks.is_empty());
            assert!(!task.is_completed);
        }
        assert!(!store.ingestion_busy());
        assert_eq!(store.take_notices()[0].title, "Success");
    }

    #[test]
    fn ingest_blank_text_is_rejected() {
        let (mut store, _, _) = two_task_store();
        let before = store.tasks().clone();
        let err = store.ingest("   \n", &CannedIngestor::default()).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert_eq!(store.tasks(), &before);
        assert!(!store.ingestion_busy());
    }

    #[test]
    fn ingest_failure_keeps_tree_and_clears_busy() {
        let (mut store, _, _) = two_task_store();
        let before = store.tasks().clone();
        let err = store.ingest("Plan party", &failing_ingestor).unwrap_err();
        assert!(matches!(err, StoreError::External { .. }));
        assert_eq!(
            err.to_string(),
            "could not process your tasks: model unavailable"
        );
        assert_eq!(store.tasks(), &before);
        assert!(!store.ingestion_busy());
    }

    #[test]
    fn ingest_busy_while_outstanding() {
        let mut store = TaskStore::open(MemoryStore::new());
        let ticket = store.begin_ingest("Plan party").unwrap();
        assert!(store.ingestion_busy());
        assert_eq!(ticket.text(), "Plan party");
        store
            .finish_ingest(ticket, Ok(vec![RawTask::leaf("Find venue")]))
            .unwrap();
        assert!(!store.ingestion_busy());
        assert_eq!(store.tasks().len(), 1);
    }

    #[test]
    fn ingest_clears_focus_on_replaced_tasks() {
        let (mut store, a, _) = two_task_store();
        store.select_focus(Some(a));
        store.toggle_focus_view().unwrap();
        store.ingest("New plan", &CannedIngestor::default()).unwrap();
        assert_eq!(store.focused_id(), None);
        assert!(!store.focus_active());
    }

    // --- add / update / rename ---

    #[test]
    fn add_task_appends_with_defaults() {
        let (mut store, a, _) = two_task_store();
        let id = store.add_task(&Parent::Root, "New Task").unwrap().unwrap();
        assert_eq!(root_titles(&store), vec!["A", "B", "New Task"]);
        let task = store.find(&id).unwrap();
        assert!(!task.is_completed);
        assert_eq!(task.first_step, "");
        assert!(task.subtasks.is_empty());
        assert_ne!(id, a);
    }

    #[test]
    fn add_subtask_and_missing_parent() {
        let (mut store, a, _) = two_task_store();
        let child = store
            .add_task(&Parent::Task(a.clone()), "Child")
            .unwrap()
            .unwrap();
        assert_eq!(store.find(&a).unwrap().subtasks[0].id, child);

        let before = store.tasks().clone();
        assert_eq!(
            store
                .add_task(&Parent::Task("ghost".into()), "Orphan")
                .unwrap(),
            None
        );
        assert_eq!(store.tasks(), &before);
    }

    #[test]
    fn add_blank_title_is_rejected() {
        let (mut store, _, _) = two_task_store();
        let err = store.add_task(&Parent::Root, "  ").unwrap_err();
        assert_eq!(err.to_string(), "task title cannot be empty");
        assert_eq!(store.tasks().len(), 2);
    }

    #[test]
    fn rename_validates_and_leaves_edit_mode() {
        let (mut store, a, _) = two_task_store();
        store.set_editing(&a, true);
        assert!(store.is_editing(&a));
        assert!(store.rename_task(&a, "").is_err());
        assert!(store.is_editing(&a));
        store.rename_task(&a, "Renamed").unwrap();
        assert_eq!(store.find(&a).unwrap().title, "Renamed");
        assert!(!store.is_editing(&a));
    }

    #[test]
    fn update_task_applies_patch_unvalidated() {
        let (mut store, a, _) = two_task_store();
        store.update_task(&a, &TaskPatch::title(""));
        assert_eq!(store.find(&a).unwrap().title, "");
    }

    // --- delete ---

    #[test]
    fn add_then_delete_restores_original() {
        let (mut store, _, _) = two_task_store();
        let original = store.tasks().clone();
        let id = store.add_task(&Parent::Root, "New Task").unwrap().unwrap();
        assert_eq!(store.tasks().len(), 3);
        store.delete_task(&id);
        assert_eq!(store.tasks(), &original);
    }

    #[test]
    fn delete_focused_task_clears_focus() {
        let (mut store, a, b) = two_task_store();
        store.select_focus(Some(a.clone()));
        assert_eq!(store.toggle_focus_view().unwrap(), true);
        store.delete_task(&a);
        assert_eq!(store.focused_id(), None);
        assert!(!store.focus_active());

        // Deleting some other task leaves focus alone
        let c = store.add_task(&Parent::Root, "C").unwrap().unwrap();
        store.select_focus(Some(b.clone()));
        store.toggle_focus_view().unwrap();
        store.delete_task(&c);
        assert_eq!(store.focused_id(), Some(b.as_str()));
        assert!(store.focus_active());
    }

    #[test]
    fn delete_ancestor_of_focused_task_clears_focus() {
        let (mut store, a, _) = two_task_store();
        let child = store.add_task(&Parent::Task(a.clone()), "Child").unwrap().unwrap();
        store.select_focus(Some(child));
        store.delete_task(&a);
        assert_eq!(store.focused_id(), None);
    }

    #[test]
    fn delete_preserves_subtree_and_drops_edit_marks() {
        let (mut store, a, _) = two_task_store();
        let child = store.add_task(&Parent::Task(a.clone()), "Child").unwrap().unwrap();
        store.set_editing(&child, true);
        store.delete_task(&a);
        assert!(!store.is_editing(&child));
        let preserved = store.store().preserved();
        assert_eq!(preserved.len(), 1);
        assert_eq!(preserved[0].category, RecoveryCategory::Delete);
        assert!(preserved[0].body.contains("Child"));
    }

    #[test]
    fn delete_missing_is_silent() {
        let (mut store, _, _) = two_task_store();
        let before = store.tasks().clone();
        store.delete_task("ghost");
        assert_eq!(store.tasks(), &before);
        assert!(store.take_notices().is_empty());
    }

    // --- reorder ---

    #[test]
    fn reorder_down_then_noop_at_end() {
        let (mut store, a, _) = two_task_store();
        store.reorder_task(&a, Direction::Down);
        assert_eq!(root_titles(&store), vec!["B", "A"]);
        store.reorder_task(&a, Direction::Down);
        assert_eq!(root_titles(&store), vec!["B", "A"]);
    }

    #[test]
    fn reorder_nested_siblings() {
        let (mut store, a, _) = two_task_store();
        let x = store.add_task(&Parent::Task(a.clone()), "x").unwrap().unwrap();
        store.add_task(&Parent::Task(a.clone()), "y").unwrap();
        store.reorder_task(&x, Direction::Down);
        let titles: Vec<&str> = store
            .find(&a)
            .unwrap()
            .subtasks
            .iter()
            .map(|t| t.title.as_str())
            .collect();
        assert_eq!(titles, vec!["y", "x"]);
    }

    // --- toggles and first steps ---

    #[test]
    fn toggles_flip_and_missing_is_noop() {
        let (mut store, a, _) = two_task_store();
        store.toggle_complete(&a);
        assert!(store.find(&a).unwrap().is_completed);
        store.toggle_complete(&a);
        assert!(!store.find(&a).unwrap().is_completed);

        store.set_first_step(&a, "Open the laptop");
        store.toggle_first_step_complete(&a);
        let task = store.find(&a).unwrap();
        assert_eq!(task.first_step, "Open the laptop");
        assert!(task.is_first_step_completed);

        let before = store.tasks().clone();
        store.toggle_complete("ghost");
        store.toggle_first_step_complete("ghost");
        assert_eq!(store.tasks(), &before);
    }

    #[test]
    fn empty_first_step_is_allowed() {
        let (mut store, a, _) = two_task_store();
        store.set_first_step(&a, "Something");
        store.set_first_step(&a, "");
        assert!(!store.find(&a).unwrap().has_first_step());
    }

    #[test]
    fn suggest_sets_first_step() {
        let (mut store, a, _) = two_task_store();
        store
            .suggest_first_step(&a, "A", &CannedSuggester::default())
            .unwrap();
        assert_eq!(store.find(&a).unwrap().first_step, "Spend five minutes on: A");
        assert!(!store.suggestion_busy());
        assert_eq!(store.take_notices()[0].title, "Suggestion Ready");
    }

    #[test]
    fn suggest_failure_leaves_state() {
        let (mut store, a, _) = two_task_store();
        store.set_first_step(&a, "Mine");
        let err = store.suggest_first_step(&a, "A", &failing_suggester).unwrap_err();
        assert!(matches!(err, StoreError::External { .. }));
        assert_eq!(store.find(&a).unwrap().first_step, "Mine");
        assert!(!store.suggestion_busy());
    }

    #[test]
    fn overlapping_suggestions_last_finisher_wins() {
        let (mut store, a, _) = two_task_store();
        let first = store.begin_suggestion(&a, "A");
        let second = store.begin_suggestion(&a, "A");
        let ingest = store.begin_ingest("More").unwrap();
        assert!(store.suggestion_busy());
        assert!(store.ingestion_busy());

        store.finish_suggestion(second, suggestion("second")).unwrap();
        assert!(store.suggestion_busy());
        store.finish_suggestion(first, suggestion("first")).unwrap();
        assert!(!store.suggestion_busy());
        assert_eq!(store.find(&a).unwrap().first_step, "first");

        assert!(store.finish_ingest(ingest, Err(CapabilityError::Other("x".into()))).is_err());
        assert!(!store.ingestion_busy());
    }

    #[test]
    fn suggestion_for_deleted_task_is_ignored() {
        let (mut store, a, _) = two_task_store();
        let ticket = store.begin_suggestion(&a, "A");
        assert_eq!(ticket.task_id(), a);
        store.delete_task(&a);
        let before = store.tasks().clone();
        store.finish_suggestion(ticket, suggestion("late")).unwrap();
        assert_eq!(store.tasks(), &before);
    }

    // --- focus ---

    #[test]
    fn toggle_focus_without_selection_fails() {
        let mut store = TaskStore::open(MemoryStore::new());
        let err = store.toggle_focus_view().unwrap_err();
        assert!(err.to_string().starts_with("no task selected"));
        assert!(!store.focus_active());
    }

    #[test]
    fn deselect_leaves_focus_mode() {
        let (mut store, a, _) = two_task_store();
        store.select_focus(Some(a.clone()));
        assert_eq!(store.focused_task().unwrap().title, "A");
        assert_eq!(store.toggle_focus_view().unwrap(), true);
        assert_eq!(store.toggle_focus_view().unwrap(), false);
        store.toggle_focus_view().unwrap();
        store.select_focus(None);
        assert!(!store.focus_active());
        assert!(store.focused_task().is_none());
    }

    #[test]
    fn restore_focus_skips_missing_tasks() {
        let (mut store, a, _) = two_task_store();
        store.restore_focus(Some(a.clone()), true);
        assert_eq!(store.focused_id(), Some(a.as_str()));
        assert!(store.focus_active());
        store.restore_focus(Some("ghost".into()), true);
        assert_eq!(store.focused_id(), None);
        assert!(!store.focus_active());
    }

    // --- persistence ---

    #[test]
    fn every_change_is_persisted() {
        let (mut store, a, _) = two_task_store();
        store.toggle_complete(&a);
        let saved = snapshot::decode(store.store().get(TASKS_STORAGE_KEY).unwrap()).unwrap();
        assert_eq!(&saved, store.tasks());
    }

    #[test]
    fn editing_flag_is_never_persisted() {
        let (mut store, a, _) = two_task_store();
        store.set_editing(&a, true);
        store.toggle_complete(&a);
        let blob = store.store().get(TASKS_STORAGE_KEY).unwrap();
        assert!(!blob.contains("Editing"));
    }

    #[test]
    fn deep_chain_reloads_intact() {
        let mut store = TaskStore::open(MemoryStore::new());
        let mut parent = Parent::Root;
        for level in 0..200 {
            let id = store
                .add_task(&parent, &format!("Level {}", level))
                .unwrap()
                .unwrap();
            parent = Parent::Task(id);
        }
        let Parent::Task(deepest) = parent else {
            panic!("chain was not built");
        };
        store.set_first_step(&deepest, "Start at the bottom");
        assert!(store.take_notices().is_empty());

        let blob = store.store().get(TASKS_STORAGE_KEY).unwrap().to_string();
        let mut reopened = TaskStore::open(MemoryStore::with_blob(TASKS_STORAGE_KEY, blob));
        assert!(reopened.take_notices().is_empty());
        assert_eq!(reopened.tasks(), store.tasks());
        assert_eq!(reopened.find(&deepest).unwrap().first_step, "Start at the bottom");
    }

    #[test]
    fn empty_patch_is_not_saved() {
        let mut store = TaskStore::open(MemoryStore::new());
        store.update_task("anything", &TaskPatch::default());
        assert!(store.store().get(TASKS_STORAGE_KEY).is_none());
    }

    #[test]
    fn failed_save_keeps_memory_state() {
        let mut store = TaskStore::open(BrokenStore::default());
        let id = store.add_task(&Parent::Root, "Still here").unwrap().unwrap();
        assert_eq!(store.find(&id).unwrap().title, "Still here");
        let notices = store.take_notices();
        assert_eq!(notices[0].title, "Could not save tasks");
        assert_eq!(notices[0].message, "storage unavailable: disk full");
        assert_eq!(store.store().preserved[0].category, RecoveryCategory::Write);
    }
}
