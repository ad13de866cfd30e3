use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::core::extract::CommandOrder;

/// Shared application context for global flags
#[derive(Clone, Debug)]
pub struct AppContext {
    pub quiet: bool,    // global --quiet
    pub no_color: bool, // global --no-color
    pub dry_run: bool,  // global --dry-run
}

#[derive(Parser)]
#[command(name = "edict")]
#[command(about = "Turn LLM replies into validated file commands and apply them to a project")]
#[command(version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Show what would be done without executing
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Emit debug logs to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract and validate commands from a model reply
    Parse(ParseArgs),

    /// Preview (default) or apply the commands in a model reply
    Apply(ApplyArgs),

    /// List the project files a reply is validated against
    Snapshot(SnapshotArgs),

    /// Print the system prompt and opening message for a task
    Prompt(PromptArgs),

    /// Initialize an edict.toml config file
    Init(InitArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Where a reply comes from; stdin when neither is given.
#[derive(Args, Debug, Clone)]
pub struct ReplyInput {
    /// Reply file to read ("-" for stdin)
    pub reply_file: Option<PathBuf>,

    /// Read the reply from the clipboard
    #[arg(long, conflicts_with = "reply_file")]
    pub from_clipboard: bool,

    /// Project root the reply refers to
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Override the configured command order
    #[arg(long, value_enum)]
    pub order: Option<CommandOrder>,
}

#[derive(Parser, Debug)]
pub struct ParseArgs {
    #[command(flatten)]
    pub input: ReplyInput,

    /// Output results in JSON format (single line)
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub input: ReplyInput,

    /// Apply changes to files (required for write operations)
    #[arg(long)]
    pub apply: bool,

    /// Context lines for diff previews (overrides config)
    #[arg(long)]
    pub context_lines: Option<usize>,

    /// Output results in JSON format (single line)
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct SnapshotArgs {
    /// Root directory to scan
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Additional glob patterns to ignore
    #[arg(short, long)]
    pub ignore: Vec<String>,

    /// Output results in JSON format (single line)
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct PromptArgs {
    /// Task description for the model
    pub task: String,

    /// Project root to list
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Emit the messages as a JSON array
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser)]
pub struct InitArgs {
    /// Directory to initialize config in
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Overwrite existing config file
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[derive(Parser)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,

    /// Output directory; if omitted and --stdout not set, prints error
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Print completion script to stdout instead of a file
    #[arg(long)]
    pub stdout: bool,
}
