//! Executes extracted commands against a project directory.
//!
//! Preview is the default: every command is evaluated (diffs rendered, files
//! read) but nothing is written. `RunMode::Apply` performs the writes.
//! COMPLETE ends the run; commands after it are counted as skipped.
//!
//! Every target path is checked against the root before the first write.
//! A failure partway through stops the run but still returns the report, so
//! writes that already happened are never lost from the record.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::core::diff;
use crate::core::protocol::{Action, Command, Keyword, LineRange};
use crate::infra::io::{create_file, delete_file, numbered, resolve_within, write_atomic};

/// Explicit run-mode computed from flags
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Preview,
    Apply,
}

/// Failures while touching the project tree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ApplyError {
    #[error("path escapes project boundary: {path}")]
    OutsideRoot { path: String },

    #[error("could not {verb} {path}: {reason}")]
    Io {
        verb: &'static str,
        path: String,
        reason: String,
    },
}

/// Result of one command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub command: Keyword,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Whether the project tree was changed
    pub applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
    /// Message to hand back to the model (or the user, for FOLLOWUP)
    pub feedback: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    pub outcomes: Vec<Outcome>,
    /// A COMPLETE command was reached
    pub completed: bool,
    /// Commands left unexecuted after COMPLETE or a failure
    pub skipped: usize,
    /// The failure that stopped the run, after the outcomes above succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApplyError>,
}

impl ApplyReport {
    /// Feedback lines joined the way they are sent back to the model.
    pub fn feedback(&self) -> String {
        self.outcomes
            .iter()
            .map(|o| o.feedback.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Runs commands relative to `root`.
#[derive(Debug, Clone)]
pub struct Applier {
    root: PathBuf,
    mode: RunMode,
    context_lines: usize,
}

impl Applier {
    pub fn new(root: impl Into<PathBuf>, mode: RunMode) -> Self {
        Self {
            root: root.into(),
            mode,
            context_lines: 3,
        }
    }

    pub fn with_context_lines(mut self, n: usize) -> Self {
        self.context_lines = n;
        self
    }

    /// Run `commands` in order.
    ///
    /// `Err` only when a path escapes the root, in which case nothing was
    /// touched. Later failures land in `ApplyReport::error`.
    #[instrument(skip_all, fields(root = %self.root.display(), mode = ?self.mode, commands = commands.len()))]
    pub fn run(&self, commands: &[Command]) -> Result<ApplyReport, ApplyError> {
        for path in commands.iter().filter_map(|c| c.action.path()) {
            self.resolve(path)?;
        }

        let mut report = ApplyReport::default();

        for (i, cmd) in commands.iter().enumerate() {
            let step = match &cmd.action {
                Action::Access { path } => self.access(path),
                Action::Change {
                    path,
                    range,
                    content,
                    ..
                } => self.change(path, *range, content),
                Action::Create { path, content } => self.create(path, content),
                Action::Delete { path } => self.delete(path),
                Action::Followup { text } => Ok(Outcome {
                    command: Keyword::Followup,
                    path: None,
                    applied: false,
                    diff: None,
                    feedback: text.clone(),
                }),
                Action::Complete => {
                    report.outcomes.push(Outcome {
                        command: Keyword::Complete,
                        path: None,
                        applied: false,
                        diff: None,
                        feedback: "Task complete".to_string(),
                    });
                    report.completed = true;
                    report.skipped = commands.len() - i - 1;
                    debug!(skipped = report.skipped, "complete reached");
                    break;
                }
            };

            match step {
                Ok(outcome) => report.outcomes.push(outcome),
                Err(e) => {
                    warn!(error = %e, done = report.outcomes.len(), "run stopped");
                    report.skipped = commands.len() - i - 1;
                    report.error = Some(e);
                    break;
                }
            }
        }

        Ok(report)
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, ApplyError> {
        resolve_within(&self.root, path).ok_or_else(|| ApplyError::OutsideRoot {
            path: path.to_string(),
        })
    }

    fn is_apply(&self) -> bool {
        self.mode == RunMode::Apply
    }

    fn access(&self, path: &str) -> Result<Outcome, ApplyError> {
        let abs = self.resolve(path)?;
        let content = read(&abs, path)?;
        Ok(Outcome {
            command: Keyword::Access,
            path: Some(path.to_string()),
            applied: false,
            diff: None,
            feedback: numbered(&content),
        })
    }

    fn change(&self, path: &str, range: LineRange, content: &str) -> Result<Outcome, ApplyError> {
        let abs = self.resolve(path)?;
        let before = read(&abs, path)?;
        let diff = diff::unified(path, &before, content, self.context_lines);

        if self.is_apply() {
            write_atomic(&abs, content.as_bytes()).map_err(|e| io_err("write", path, e))?;
            info!(%path, %range, "file updated");
        }

        Ok(Outcome {
            command: Keyword::Replace,
            path: Some(path.to_string()),
            applied: self.is_apply(),
            diff: Some(diff),
            feedback: self.status(&format!("{path} {range}"), "updated"),
        })
    }

    fn create(&self, path: &str, content: &str) -> Result<Outcome, ApplyError> {
        let abs = self.resolve(path)?;
        let diff = diff::unified(path, "", content, self.context_lines);

        if self.is_apply() {
            create_file(&abs, content).map_err(|e| io_err("create", path, e))?;
            info!(%path, bytes = content.len(), "file created");
        }

        Ok(Outcome {
            command: Keyword::Create,
            path: Some(path.to_string()),
            applied: self.is_apply(),
            diff: Some(diff),
            feedback: self.status(path, "created"),
        })
    }

    fn delete(&self, path: &str) -> Result<Outcome, ApplyError> {
        let abs = self.resolve(path)?;
        let before = read(&abs, path)?;
        let diff = diff::unified(path, &before, "", self.context_lines);

        if self.is_apply() {
            delete_file(&abs).map_err(|e| io_err("delete", path, e))?;
            info!(%path, "file deleted");
        }

        Ok(Outcome {
            command: Keyword::Delete,
            path: Some(path.to_string()),
            applied: self.is_apply(),
            diff: Some(diff),
            feedback: self.status(path, "deleted"),
        })
    }

    /// `[label] File <verb>` once applied, a preview marker otherwise.
    fn status(&self, label: &str, verb: &str) -> String {
        match self.mode {
            RunMode::Apply => format!("[{label}] File {verb}"),
            RunMode::Preview => format!("[{label}] Would be {verb} (preview)"),
        }
    }
}

fn read(abs: &Path, path: &str) -> Result<String, ApplyError> {
    fs::read_to_string(abs).map_err(|e| ApplyError::Io {
        verb: "read",
        path: path.to_string(),
        reason: e.to_string(),
    })
}

fn io_err(verb: &'static str, path: &str, e: anyhow::Error) -> ApplyError {
    ApplyError::Io {
        verb,
        path: path.to_string(),
        reason: format!("{e:#}"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tempfile::TempDir;

    use super::*;

    fn cmd(action: Action) -> Command {
        Command::new(action, Arc::from(""))
    }

    fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("test.txt"), "const foo = 2").unwrap();
        dir
    }

    fn change() -> Command {
        cmd(Action::Change {
            path: "test.txt".into(),
            range: LineRange { start: 0, end: 0 },
            replacement: "const foo = 3".into(),
            content: "const foo = 3".into(),
        })
    }

    #[test]
    fn test_preview_writes_nothing() {
        let dir = project();
        let report = Applier::new(dir.path(), RunMode::Preview)
            .run(&[
                change(),
                cmd(Action::Create {
                    path: "new.txt".into(),
                    content: "x".into(),
                }),
                cmd(Action::Delete {
                    path: "test.txt".into(),
                }),
            ])
            .unwrap();

        assert_eq!(fs::read_to_string(dir.path().join("test.txt")).unwrap(), "const foo = 2");
        assert!(!dir.path().join("new.txt").exists());
        assert!(report.outcomes.iter().all(|o| !o.applied));
        let d = report.outcomes[0].diff.as_deref().unwrap();
        assert!(d.contains("+const foo = 3"));
    }

    #[test]
    fn test_apply_updates_and_reports() {
        let dir = project();
        let report = Applier::new(dir.path(), RunMode::Apply)
            .run(&[change()])
            .unwrap();

        assert_eq!(fs::read_to_string(dir.path().join("test.txt")).unwrap(), "const foo = 3");
        assert_eq!(report.outcomes[0].feedback, "[test.txt 0-0] File updated");
        assert!(report.outcomes[0].applied);
    }

    #[test]
    fn test_apply_create_and_delete() {
        let dir = project();
        let report = Applier::new(dir.path(), RunMode::Apply)
            .run(&[
                cmd(Action::Create {
                    path: "src/new.rs".into(),
                    content: "fn main() {}\n".into(),
                }),
                cmd(Action::Delete {
                    path: "test.txt".into(),
                }),
            ])
            .unwrap();

        assert_eq!(
            fs::read_to_string(dir.path().join("src/new.rs")).unwrap(),
            "fn main() {}\n"
        );
        assert!(!dir.path().join("test.txt").exists());
        assert_eq!(
            report.feedback(),
            "[src/new.rs] File created\n[test.txt] File deleted"
        );
    }

    #[test]
    fn test_access_returns_numbered_content() {
        let dir = project();
        let report = Applier::new(dir.path(), RunMode::Preview)
            .run(&[cmd(Action::Access {
                path: "test.txt".into(),
            })])
            .unwrap();
        assert_eq!(report.outcomes[0].feedback, "0  const foo = 2");
    }

    #[test]
    fn test_complete_stops_the_run() {
        let dir = project();
        let report = Applier::new(dir.path(), RunMode::Apply)
            .run(&[
                cmd(Action::Followup {
                    text: "Which file?".into(),
                }),
                cmd(Action::Complete),
                cmd(Action::Delete {
                    path: "test.txt".into(),
                }),
            ])
            .unwrap();

        assert!(report.completed);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(report.outcomes[0].feedback, "Which file?");
        assert!(dir.path().join("test.txt").exists());
    }

    #[test]
    fn test_escaping_path_is_refused_before_any_write() {
        let dir = project();
        let err = Applier::new(dir.path(), RunMode::Apply)
            .run(&[
                cmd(Action::Create {
                    path: "ok.txt".into(),
                    content: "x".into(),
                }),
                cmd(Action::Create {
                    path: "../escape.txt".into(),
                    content: "x".into(),
                }),
            ])
            .unwrap_err();

        assert!(matches!(err, ApplyError::OutsideRoot { .. }));
        assert!(!dir.path().join("ok.txt").exists());
    }

    #[test]
    fn test_failure_midway_keeps_earlier_outcomes() {
        let dir = project();
        let report = Applier::new(dir.path(), RunMode::Apply)
            .run(&[
                cmd(Action::Create {
                    path: "first.txt".into(),
                    content: "1".into(),
                }),
                cmd(Action::Delete {
                    path: "vanished.txt".into(),
                }),
                cmd(Action::Create {
                    path: "third.txt".into(),
                    content: "3".into(),
                }),
            ])
            .unwrap();

        assert_eq!(report.feedback(), "[first.txt] File created");
        assert!(matches!(
            report.error,
            Some(ApplyError::Io { verb: "read", ref path, .. }) if path == "vanished.txt"
        ));
        assert_eq!(report.skipped, 1);
        assert!(dir.path().join("first.txt").exists());
        assert!(!dir.path().join("third.txt").exists());
    }

    #[test]
    fn test_paths_outside_root_are_refused() {
        let dir = project();
        let err = Applier::new(dir.path(), RunMode::Apply)
            .run(&[cmd(Action::Create {
                path: "../escape.txt".into(),
                content: "x".into(),
            })])
            .unwrap_err();
        assert_eq!(
            err,
            ApplyError::OutsideRoot {
                path: "../escape.txt".into()
            }
        );
    }
}
