//! CLI flows: parse, apply, snapshot and prompt, plus the exit-code
//! taxonomy shared by all subcommands.
//!
//! Exit codes: 0=success, 2=reply rejected, 3=invalid input,
//! 4=project issue, 5=internal.

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, instrument};

use crate::cli::{AppContext, ApplyArgs, ParseArgs, PromptArgs, ReplyInput, SnapshotArgs};
use crate::core::apply::{Applier, ApplyError, ApplyReport, RunMode};
use crate::core::diff;
use crate::core::error::ParseError;
use crate::core::extract::ResponseParser;
use crate::core::prompt;
use crate::core::protocol::{Action, Command, ProjectSnapshot};
use crate::infra::config::{Config, load_config_from};
use crate::infra::io::{FsSource, read_reply};
use crate::infra::walk::FileWalker;

/// Domain-specific error taxonomy for exit-code mapping
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CliError {
    /// The reply broke the command grammar or referenced bad files
    #[error("reply rejected: {0}")]
    Rejected(String),

    /// Unreadable reply, bad config or bad flags
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Writes refused or failed inside the project tree
    #[error("project issue: {0}")]
    Project(String),

    /// Anything else
    #[error("internal error: {0}")]
    Internal(String),
}

/// Marker for failures caused by what the user handed us.
#[derive(thiserror::Error, Debug)]
#[error("{0}")]
struct InputError(String);

pub fn exit_code_for(e: &CliError) -> i32 {
    match e {
        CliError::Rejected(_) => 2,
        CliError::InvalidInput(_) => 3,
        CliError::Project(_) => 4,
        CliError::Internal(_) => 5,
    }
}

/// Map an error chain onto the taxonomy by looking for typed causes.
pub fn classify(e: &anyhow::Error) -> CliError {
    let msg = format!("{e:#}");
    if let Some(pe) = e.downcast_ref::<ParseError>() {
        return CliError::Rejected(pe.to_string());
    }
    if e.downcast_ref::<ApplyError>().is_some() {
        return CliError::Project(msg);
    }
    if e.chain().any(|c| c.is::<InputError>()) {
        return CliError::InvalidInput(msg);
    }
    CliError::Internal(msg)
}

/// Print the error and terminate with its mapped exit code.
pub fn finish_with_exit(result: Result<()>) -> ! {
    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            let typed = classify(&e);
            match e.downcast::<ParseError>() {
                Ok(pe) => eprintln!("{:?}", miette::Report::new(pe)),
                Err(_) => eprintln!("{typed}"),
            }
            std::process::exit(exit_code_for(&typed));
        }
    }
}

/// Extract and validate the commands in a reply.
pub fn parse_run(args: ParseArgs, ctx: &AppContext) -> Result<()> {
    let cfg = config_for(&args.input.root)?;
    let snapshot = capture(&args.input.root, &cfg, &[])?;

    let commands = match parse_input(&args.input, &cfg, &snapshot) {
        Ok(c) => c,
        Err(e) => {
            if let Some(pe) = e.downcast_ref::<ParseError>() {
                print_rejection(pe, args.json)?;
            }
            return Err(e);
        }
    };

    if args.json {
        let out = ParseOutput {
            reply: commands.first().map(|c| &*c.raw).unwrap_or_default(),
            commands: &commands,
        };
        println!("{}", serde_json::to_string(&out)?);
    } else if !ctx.quiet {
        for cmd in &commands {
            println!("{}", summarize(cmd));
        }
    }
    Ok(())
}

/// `parse --json` output: the reply once, then its commands.
#[derive(Serialize)]
struct ParseOutput<'a> {
    reply: &'a str,
    commands: &'a [Command],
}

/// Preview (default) or apply the commands in a reply.
pub fn apply_run(args: ApplyArgs, ctx: &AppContext) -> Result<()> {
    let cfg = config_for(&args.input.root)?;
    let snapshot = capture(&args.input.root, &cfg, &[])?;

    let commands = match parse_input(&args.input, &cfg, &snapshot) {
        Ok(c) => c,
        Err(e) => {
            if let Some(pe) = e.downcast_ref::<ParseError>() {
                print_rejection(pe, args.json)?;
            }
            return Err(e);
        }
    };

    let mode = if args.apply && !ctx.dry_run {
        RunMode::Apply
    } else {
        RunMode::Preview
    };
    let context_lines = args.context_lines.unwrap_or(cfg.diff.context_lines);

    let report = Applier::new(&args.input.root, mode)
        .with_context_lines(context_lines)
        .run(&commands)?;

    if args.json {
        println!("{}", serde_json::to_string(&report)?);
    } else if !ctx.quiet {
        let color = cfg.diff.color && !ctx.no_color;
        print_report(&report, mode, color);
    }

    // Earlier writes are already reported above
    match report.error {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

/// List the files a reply would be validated against.
pub fn snapshot_run(args: SnapshotArgs, ctx: &AppContext) -> Result<()> {
    let cfg = config_for(&args.path)?;
    let snapshot = capture(&args.path, &cfg, &args.ignore)?;

    if args.json {
        println!("{}", serde_json::to_string(&snapshot)?);
    } else if !ctx.quiet {
        for path in snapshot.iter() {
            println!("{path}");
        }
    }
    Ok(())
}

/// Print the system prompt and opening message for a task.
pub fn prompt_run(args: PromptArgs, ctx: &AppContext) -> Result<()> {
    let cfg = config_for(&args.root)?;
    let snapshot = capture(&args.root, &cfg, &[])?;

    if args.json {
        let messages = prompt::conversation(&args.task, &snapshot);
        println!("{}", serde_json::to_string(&messages)?);
    } else if !ctx.quiet {
        println!("{}", prompt::SYSTEM_PROMPT);
        println!();
        println!("{}", prompt::initial_message(&args.task, &snapshot));
    }
    Ok(())
}

fn config_for(root: &Path) -> Result<Config> {
    load_config_from(root).map_err(|e| InputError(format!("{e:#}")).into())
}

fn capture(root: &Path, cfg: &Config, extra: &[String]) -> Result<ProjectSnapshot> {
    if !root.is_dir() {
        return Err(InputError(format!("project root {} is not a directory", root.display())).into());
    }
    let mut ignores = cfg.ignore_patterns.clone();
    ignores.extend_from_slice(extra);

    let walker = FileWalker::new(&ignores)
        .map_err(|e| InputError(format!("bad ignore pattern: {e}")))?
        .with_include_hidden(cfg.include_hidden);
    Ok(walker.snapshot(root))
}

#[instrument(skip_all, fields(root = %input.root.display()))]
fn parse_input(input: &ReplyInput, cfg: &Config, snapshot: &ProjectSnapshot) -> Result<Vec<Command>> {
    let reply = read_reply(input.reply_file.as_deref(), input.from_clipboard)
        .map_err(|e| InputError(format!("{e:#}")))
        .context("no reply to parse")?;
    debug!(bytes = reply.len(), "reply loaded");

    let order = input.order.unwrap_or(cfg.order);
    let source = FsSource::new(&input.root);
    let commands = ResponseParser::new()
        .with_order(order)
        .parse(&reply, snapshot, &source)?;
    Ok(commands)
}

/// Reprompt text goes to stdout so it can be piped back to the model.
fn print_rejection(pe: &ParseError, json: bool) -> Result<()> {
    if json {
        let v = serde_json::json!({
            "error": pe.to_string(),
            "reprompt": pe.reprompt(),
        });
        println!("{}", serde_json::to_string(&v)?);
    } else {
        println!("{}", pe.reprompt());
    }
    Ok(())
}

fn summarize(cmd: &Command) -> String {
    match &cmd.action {
        Action::Access { path } => format!("ACCESS {path}"),
        Action::Change {
            path,
            range,
            replacement,
            ..
        } => format!(
            "REPLACE {range} {path} ({} line(s))",
            replacement.split('\n').count()
        ),
        Action::Create { path, content } => {
            format!("CREATE {path} ({} line(s))", content.split('\n').count())
        }
        Action::Delete { path } => format!("DELETE {path}"),
        Action::Followup { text } => format!("FOLLOWUP {text}"),
        Action::Complete => "COMPLETE".to_string(),
    }
}

fn print_report(report: &ApplyReport, mode: RunMode, color: bool) {
    for outcome in &report.outcomes {
        if let Some(d) = outcome.diff.as_deref().filter(|d| !d.is_empty()) {
            if color {
                print!("{}", diff::colorize(d));
            } else {
                print!("{d}");
            }
        }
        println!("{}", outcome.feedback);
    }

    if report.skipped > 0 {
        let why = if report.completed { "after COMPLETE skipped" } else { "not run" };
        println!("{} command(s) {why}", report.skipped);
    }

    if mode == RunMode::Preview {
        let hint = "Preview only; re-run with --apply to write changes";
        if color {
            println!("{}", hint.yellow());
        } else {
            println!("{hint}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code_for(&CliError::Rejected("x".into())), 2);
        assert_eq!(exit_code_for(&CliError::InvalidInput("x".into())), 3);
        assert_eq!(exit_code_for(&CliError::Project("x".into())), 4);
        assert_eq!(exit_code_for(&CliError::Internal("x".into())), 5);
    }

    #[test]
    fn test_classify_typed_causes() {
        let rejected = anyhow::Error::new(ParseError::UnrecognizedFormat);
        assert_eq!(
            classify(&rejected),
            CliError::Rejected("Invalid response format".into())
        );

        let project = anyhow::Error::new(ApplyError::OutsideRoot { path: "../x".into() });
        assert!(matches!(classify(&project), CliError::Project(_)));

        let input = anyhow::Error::new(InputError("missing".into())).context("no reply to parse");
        assert!(matches!(classify(&input), CliError::InvalidInput(_)));

        assert!(matches!(classify(&anyhow::anyhow!("boom")), CliError::Internal(_)));
    }

    #[test]
    fn test_summarize_lines() {
        use crate::core::protocol::LineRange;
        use std::sync::Arc;

        let cmd = Command::new(
            Action::Change {
                path: "a.rs".into(),
                range: LineRange { start: 1, end: 2 },
                replacement: "x\ny".into(),
                content: String::new(),
            },
            Arc::from(""),
        );
        assert_eq!(summarize(&cmd), "REPLACE 1-2 a.rs (2 line(s))");
    }
}
