//! **edict** - Turn free-form LLM replies into validated, typed file commands
//!
//! A reply is fence-normalized, scanned for ACCESS/REPLACE/CREATE/DELETE/
//! FOLLOWUP/COMPLETE blocks, and checked against a snapshot of the project
//! before anything touches disk. Applying is opt-in; previews are the default.

/// Command-line interface with clap integration
pub mod cli;

/// Shell completion generation
pub mod completion;

/// Core pipeline - normalize, extract, validate, splice, apply
pub mod core {
    /// Command keywords, typed actions and the project snapshot
    pub mod protocol;
    pub use protocol::{Action, Command, Keyword, LineRange, ProjectSnapshot};

    /// Rejection reasons with reprompt text and miette diagnostics
    pub mod error;
    pub use error::ParseError;

    /// Code-fence sentinel rewriting (nested fences stay literal)
    pub mod fence;

    /// Six-pass command extraction from a model reply
    pub mod extract;
    pub use extract::{CommandOrder, ResponseParser, parse_response};

    /// Snapshot-backed existence and range checks
    pub mod validate;

    /// Line-range splicing and the source-reader seam
    pub mod patch;
    pub use patch::{SourceReader, splice_lines};

    /// Unified diff rendering for previews
    pub mod diff;

    /// Preview/apply loop over extracted commands
    pub mod apply;
    pub use apply::{Applier, ApplyError, ApplyReport, Outcome, RunMode};

    /// System prompt and opening message for a task
    pub mod prompt;

    /// CLI flows and exit-code mapping
    pub mod edit;
    pub use edit::{apply_run, parse_run, prompt_run, snapshot_run};
}

/// Infrastructure - Configuration, file I/O and project walking
pub mod infra {
    /// Layered configuration (file + EDICT__* environment)
    pub mod config;
    pub use config::{Config, init as config_init, load_config};

    /// Project file access, atomic writes and reply input
    pub mod io;
    pub use io::FsSource;

    /// Gitignore-aware walking and snapshot capture
    pub mod walk;
    pub use walk::FileWalker;
}

// Strategic re-exports for clean CLI interface
pub use cli::{AppContext, Cli, Commands};
pub use core::{apply_run, parse_run, prompt_run, snapshot_run};
pub use infra::{Config, FileWalker, FsSource, load_config};

// Core types for external consumers
pub use core::{
    Action, Command, CommandOrder, Keyword, LineRange, ParseError, ProjectSnapshot,
    ResponseParser, parse_response,
};
