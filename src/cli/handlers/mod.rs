use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::ai::{
    CannedIngestor, CannedSuggester, CommandCapability, StepSuggester, TaskIngestor,
};
use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::blob_store::{BlobStore, FileStore};
use crate::io::lock::WriteLock;
use crate::io::{config_io, recovery, snapshot, state};
use crate::logging;
use crate::model::config::AppConfig;
use crate::model::task::{Direction, Parent, Task, TaskId};
use crate::ops::{check, tree_ops};
use crate::store::TaskStore;

type CmdResult = Result<(), Box<dyn std::error::Error>>;

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> CmdResult {
    let json = cli.json;
    let dir = config_io::resolve_data_dir(cli.data_dir.as_deref().map(Path::new))?;
    let config = config_io::read_config(&dir)?;
    logging::init(&config.log.level);
    tracing::debug!(dir = %dir.display(), "using data directory");

    match cli.command {
        // Commands that never touch the task blob
        Commands::Check => cmd_check(&dir, &config, json),
        Commands::Recovery(args) => cmd_recovery(args, &dir, json),

        cmd => {
            let mut session = Session::open(dir, config)?;
            let result = run_command(cmd, &mut session, json);
            session.close();
            result
        }
    }
}

fn run_command(cmd: Commands, session: &mut Session, json: bool) -> CmdResult {
    match cmd {
        // Read commands
        Commands::List => cmd_list(session, json),
        Commands::Show(args) => cmd_show(args, session, json),

        // Write commands
        Commands::Ingest(args) => cmd_ingest(args, session, json),
        Commands::Add(args) => cmd_add(args, session, json),
        Commands::Rename(args) => cmd_rename(args, session, json),
        Commands::Done(args) => cmd_done(args, session, json),
        Commands::Rm(args) => cmd_rm(args, session),
        Commands::Mv(args) => cmd_mv(args, session, json),
        Commands::Step(args) => cmd_step(args, session, json),
        Commands::StepDone(args) => cmd_step_done(args, session, json),
        Commands::Suggest(args) => cmd_suggest(args, session, json),
        Commands::Focus(args) => cmd_focus(args, session, json),

        Commands::Check | Commands::Recovery(_) => unreachable!("handled before opening a session"),
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One locked load → mutate → save cycle against the data directory.
struct Session {
    dir: PathBuf,
    config: AppConfig,
    store: TaskStore<FileStore>,
    _lock: WriteLock,
}

impl Session {
    fn open(dir: PathBuf, config: AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let files = FileStore::new(&dir)
            .with_lock_timeout(Duration::from_millis(config.storage.lock_timeout_ms));
        let lock = files.lock()?;
        let mut store = TaskStore::open_with_key(files, config.storage.key.clone());
        if let Some(ui) = state::read_ui_state(&dir) {
            store.restore_focus(ui.focused_id, ui.focus_active);
        }
        Ok(Session {
            dir,
            config,
            store,
            _lock: lock,
        })
    }

    /// Report notices and save the view state.
    fn close(mut self) {
        for notice in self.store.take_notices() {
            eprintln!("{}", format_notice(&notice));
        }
        let ui = state::UiState {
            focused_id: self.store.focused_id().map(str::to_string),
            focus_active: self.store.focus_active(),
        };
        if let Err(e) = state::write_ui_state(&self.dir, &ui) {
            tracing::warn!(error = %e, "could not save view state");
        }
    }

    /// Accept a full id or a unique prefix of one.
    fn resolve(&self, input: &str) -> Result<TaskId, String> {
        if self.store.find(input).is_some() {
            return Ok(input.to_string());
        }
        let matches: Vec<String> = tree_ops::ids(self.store.tasks())
            .into_iter()
            .filter(|id| id.starts_with(input))
            .collect();
        match matches.as_slice() {
            [id] => Ok(id.clone()),
            [] => Err(format!("task not found: {}", input)),
            _ => Err(format!(
                "id prefix '{}' is ambiguous ({} tasks match)",
                input,
                matches.len()
            )),
        }
    }

    fn task(&self, id: &str) -> Result<&Task, String> {
        self.store
            .find(id)
            .ok_or_else(|| format!("task not found: {}", id))
    }
}

fn print_task(task: &Task, focused_id: Option<&str>, json: bool) -> CmdResult {
    if json {
        println!("{}", serde_json::to_string_pretty(&task_to_json(task))?);
    } else {
        for line in format_task_tree(task, 0, focused_id) {
            println!("{}", line);
        }
    }
    Ok(())
}

/// Print the task after a change, as it is now
fn print_changed(session: &Session, id: &str, json: bool) -> CmdResult {
    let task = session.task(id)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&task_to_json(task))?);
    } else {
        println!("{}", format_task_line(task, session.store.focused_id() == Some(id)));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Read command handlers
// ---------------------------------------------------------------------------

fn cmd_list(session: &mut Session, json: bool) -> CmdResult {
    let store = &session.store;
    if json {
        let out = TaskListJson {
            tasks: store.tasks().iter().map(task_to_json).collect(),
            focused_id: store.focused_id().map(str::to_string),
            focus_active: store.focus_active(),
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if store.tasks().is_empty() {
        println!("no tasks (try `mo ingest`)");
        return Ok(());
    }
    for task in store.tasks() {
        for line in format_task_tree(task, 0, store.focused_id()) {
            println!("{}", line);
        }
    }
    Ok(())
}

fn cmd_show(args: IdArg, session: &mut Session, json: bool) -> CmdResult {
    let id = session.resolve(&args.id)?;
    let task = session.task(&id)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&task_to_json(task))?);
    } else {
        for line in format_task_detail(task) {
            println!("{}", line);
        }
    }
    Ok(())
}

fn cmd_check(dir: &Path, config: &AppConfig, json: bool) -> CmdResult {
    let files = FileStore::new(dir);
    let tasks = match files.load(&config.storage.key)? {
        Some(blob) => snapshot::decode(&blob)?,
        None => Default::default(),
    };
    let result = check::check_tree(&tasks);

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        for line in format_check(&result) {
            println!("{}", line);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Write command handlers
// ---------------------------------------------------------------------------

fn cmd_ingest(args: IngestArgs, session: &mut Session, json: bool) -> CmdResult {
    let text = match args.text {
        Some(text) => text,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let ingestor: Box<dyn TaskIngestor> = if args.canned {
        Box::new(CannedIngestor::default())
    } else {
        Box::new(CommandCapability::from_config(&session.config.ai))
    };

    let roots = session.store.ingest(&text, ingestor.as_ref())?;
    tracing::debug!(roots, "ingest finished");
    cmd_list(session, json)
}

fn cmd_add(args: AddArgs, session: &mut Session, json: bool) -> CmdResult {
    let parent = Parent::from_option(
        args.parent
            .as_deref()
            .map(|p| session.resolve(p))
            .transpose()?,
    );
    let id = session
        .store
        .add_task(&parent, &args.title)?
        .ok_or("parent task disappeared")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&CreatedJson { id })?);
    } else {
        println!("{}", id);
    }
    Ok(())
}

fn cmd_rename(args: RenameArgs, session: &mut Session, json: bool) -> CmdResult {
    let id = session.resolve(&args.id)?;
    session.store.rename_task(&id, &args.title)?;
    print_changed(session, &id, json)
}

fn cmd_done(args: IdArg, session: &mut Session, json: bool) -> CmdResult {
    let id = session.resolve(&args.id)?;
    session.store.toggle_complete(&id);
    print_changed(session, &id, json)
}

fn cmd_rm(args: IdArg, session: &mut Session) -> CmdResult {
    let id = session.resolve(&args.id)?;
    let removed = tree_ops::count(&session.task(&id)?.subtasks) + 1;
    session.store.delete_task(&id);
    println!(
        "deleted {} ({} task{})",
        short_id(&id),
        removed,
        if removed == 1 { "" } else { "s" }
    );
    Ok(())
}

fn cmd_mv(args: MvArgs, session: &mut Session, json: bool) -> CmdResult {
    let direction = Direction::parse(&args.direction).ok_or_else(|| {
        format!(
            "unknown direction '{}' (expected: up, down)",
            args.direction
        )
    })?;
    let id = session.resolve(&args.id)?;
    session.store.reorder_task(&id, direction);
    print_changed(session, &id, json)
}

fn cmd_step(args: StepArgs, session: &mut Session, json: bool) -> CmdResult {
    let id = session.resolve(&args.id)?;
    if args.clear {
        session.store.set_first_step(&id, "");
    } else if let Some(text) = args.text {
        session.store.set_first_step(&id, &text);
    } else if !json {
        let task = session.task(&id)?;
        if task.has_first_step() {
            println!("{}", task.first_step);
        } else {
            println!("(no first step)");
        }
        return Ok(());
    }
    print_changed(session, &id, json)
}

fn cmd_step_done(args: IdArg, session: &mut Session, json: bool) -> CmdResult {
    let id = session.resolve(&args.id)?;
    session.store.toggle_first_step_complete(&id);
    print_changed(session, &id, json)
}

fn cmd_suggest(args: SuggestArgs, session: &mut Session, json: bool) -> CmdResult {
    let id = session.resolve(&args.id)?;
    let title = session.task(&id)?.title.clone();
    let suggester: Box<dyn StepSuggester> = if args.canned {
        Box::new(CannedSuggester::default())
    } else {
        Box::new(CommandCapability::from_config(&session.config.ai))
    };

    session
        .store
        .suggest_first_step(&id, &title, suggester.as_ref())?;
    if json {
        print_changed(session, &id, json)
    } else {
        println!("{}", session.task(&id)?.first_step);
        Ok(())
    }
}

fn cmd_focus(args: FocusArgs, session: &mut Session, json: bool) -> CmdResult {
    if args.clear {
        session.store.select_focus(None);
    } else if let Some(ref input) = args.id {
        let id = session.resolve(input)?;
        session.store.select_focus(Some(id));
    }
    if args.toggle {
        session.store.toggle_focus_view()?;
    }

    let store = &session.store;
    if json {
        let out = FocusJson {
            focused: store.focused_task().map(task_to_json),
            focus_active: store.focus_active(),
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    match store.focused_task() {
        Some(task) => {
            let mode = if store.focus_active() { "on" } else { "off" };
            println!("focus view: {}", mode);
            print_task(task, None, false)?;
        }
        None => println!("no task selected"),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Recovery log
// ---------------------------------------------------------------------------

fn cmd_recovery(args: RecoveryCmd, dir: &Path, json: bool) -> CmdResult {
    match args.action {
        Some(RecoveryAction::Path) => {
            let path = recovery::recovery_log_path(dir);
            let abs = std::path::absolute(&path).unwrap_or(path);
            println!("{}", abs.display());
        }
        Some(RecoveryAction::Prune(prune)) => {
            let before = match prune.before {
                Some(ref ts) => Some(
                    DateTime::parse_from_rfc3339(ts)
                        .map_err(|e| format!("invalid timestamp '{}': {}", ts, e))?
                        .with_timezone(&Utc),
                ),
                None => None,
            };
            let removed = recovery::prune_recovery(dir, before, prune.all)?;
            println!(
                "pruned {} entr{}",
                removed,
                if removed == 1 { "y" } else { "ies" }
            );
        }
        None => {
            let entries = recovery::read_recovery_entries(dir, Some(args.limit.unwrap_or(10)));
            if json {
                let values: Vec<serde_json::Value> =
                    entries.iter().map(|e| e.to_json()).collect();
                println!("{}", serde_json::to_string_pretty(&values)?);
            } else if entries.is_empty() {
                println!("recovery log is empty");
            } else {
                for entry in &entries {
                    print!("{}", entry.to_markdown());
                }
            }
        }
    }
    Ok(())
}
