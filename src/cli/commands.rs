use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "mo", about = concat!("momentum v", env!("CARGO_PKG_VERSION"), " - one first step at a time"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Use a different data directory
    #[arg(short = 'C', long = "data-dir", global = true)]
    pub data_dir: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Break a problem description into a fresh task tree (replaces all tasks)
    Ingest(IngestArgs),
    /// List all tasks
    List,
    /// Show task details
    Show(IdArg),
    /// Add a task (at the end of the root list, or under --parent)
    Add(AddArgs),
    /// Change task title
    Rename(RenameArgs),
    /// Toggle a task's completion
    Done(IdArg),
    /// Delete a task and its subtasks
    Rm(IdArg),
    /// Move a task up or down among its siblings
    Mv(MvArgs),
    /// Show, set or clear a task's first step
    Step(StepArgs),
    /// Toggle completion of a task's first step
    StepDone(IdArg),
    /// Ask for a suggested first step
    Suggest(SuggestArgs),
    /// Show, select or clear the focused task
    Focus(FocusArgs),
    /// Validate stored tasks
    Check,
    /// View or manage the recovery log
    Recovery(RecoveryCmd),
}

// ---------------------------------------------------------------------------
// Shared args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct IdArg {
    /// Task ID (a unique prefix is enough)
    pub id: String,
}

// ---------------------------------------------------------------------------
// Ingestion
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct IngestArgs {
    /// Problem or task description (read from stdin when omitted)
    pub text: Option<String>,
    /// Use the built-in offline ingestor instead of the configured command
    #[arg(long)]
    pub canned: bool,
}

// ---------------------------------------------------------------------------
// Write command args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct AddArgs {
    /// Task title
    pub title: String,
    /// Add as the last subtask of this task
    #[arg(long)]
    pub parent: Option<String>,
}

#[derive(Args)]
pub struct RenameArgs {
    /// Task ID
    pub id: String,
    /// New title
    pub title: String,
}

#[derive(Args)]
pub struct MvArgs {
    /// Task ID
    pub id: String,
    /// Direction: up or down
    pub direction: String,
}

#[derive(Args)]
pub struct StepArgs {
    /// Task ID
    pub id: String,
    /// First step text (shows the current one when omitted)
    pub text: Option<String>,
    /// Remove the first step
    #[arg(long, conflicts_with = "text")]
    pub clear: bool,
}

#[derive(Args)]
pub struct SuggestArgs {
    /// Task ID
    pub id: String,
    /// Use the built-in offline suggester instead of the configured command
    #[arg(long)]
    pub canned: bool,
}

#[derive(Args)]
pub struct FocusArgs {
    /// Task to focus on (shows the current focus when omitted)
    pub id: Option<String>,
    /// Deselect the focused task
    #[arg(long, conflicts_with = "id")]
    pub clear: bool,
    /// Enter or leave focus view for the selected task
    #[arg(long, conflicts_with = "clear")]
    pub toggle: bool,
}

// ---------------------------------------------------------------------------
// Recovery log
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct RecoveryCmd {
    #[command(subcommand)]
    pub action: Option<RecoveryAction>,
    /// Maximum number of entries to show (default: 10)
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Subcommand)]
pub enum RecoveryAction {
    /// Remove old entries
    Prune(RecoveryPruneArgs),
    /// Print the absolute path to the recovery log
    Path,
}

#[derive(Args)]
pub struct RecoveryPruneArgs {
    /// Remove entries older than this timestamp (default: 30 days ago)
    #[arg(long)]
    pub before: Option<String>,
    /// Remove all entries
    #[arg(long)]
    pub all: bool,
}
