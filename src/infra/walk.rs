//! Filepath: src/infra/walk.rs
//! Gitignore-aware project walker that produces the parser's snapshot.
//! - Respects .gitignore (with or without an initialized repo), .ignore,
//!   .git/info/exclude and the global gitignore
//! - Extra ignore globs from config (early prune + late filter)
//! - Never descends into `.git`
//! - Deterministic ordering for stable tests/CI
//!
//! Backed by ripgrep's `ignore` crate and `globset`.

use std::path::{Path, PathBuf};

use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::{DirEntry, WalkBuilder};
use tracing::{debug, warn};

use crate::core::protocol::ProjectSnapshot;

/// Gitignore-aware walker with optional extra ignore globs.
/// Extra globs are applied in two places:
///   1) Early: prune directories during traversal (filter_entry).
///   2) Late: filter out files that still slipped through.
pub struct FileWalker
{
    /// Compiled set of additional ignore patterns
    ignore_patterns: GlobSet,

    /// Include hidden (dot) files; default true
    include_hidden: bool,
}

impl FileWalker
{
    /// Build a walker with additional ignore patterns (e.g., "target/**",
    /// "node_modules/**"). Patterns match on relative paths.
    pub fn new(additional_ignores: &[String]) -> Result<Self>
    {
        let mut builder = GlobSetBuilder::new();

        for pattern in additional_ignores
        {
            builder.add(Glob::new(pattern)?);
        }

        Ok(Self {
            ignore_patterns: builder.build()?,
            include_hidden: true,
        })
    }

    /// (Optional) Include or exclude hidden files (dotfiles).
    pub fn with_include_hidden(
        mut self,
        include_hidden: bool,
    ) -> Self
    {
        self.include_hidden = include_hidden;
        self
    }

    /// Internal: construct a configured WalkBuilder for `root`.
    fn build_walk(
        &self,
        root: &Path,
    ) -> WalkBuilder
    {
        let mut b = WalkBuilder::new(root);

        // WalkBuilder::hidden(true) skips dotfiles, so invert our flag
        b.hidden(!self.include_hidden);

        // Honor .gitignore even when the project is not a git checkout
        b.git_ignore(true);
        b.git_global(true);
        b.git_exclude(true);
        b.require_git(false);

        b.follow_links(false);

        let extra = self
            .ignore_patterns
            .clone();
        let root_owned = root.to_path_buf();
        b.filter_entry(move |ent: &DirEntry| {
            let is_dir = ent
                .file_type()
                .map(|ft| ft.is_dir())
                .unwrap_or(false);

            if !is_dir
            {
                return true;
            }

            if ent.file_name() == ".git"
            {
                return false;
            }

            let rel = ent
                .path()
                .strip_prefix(&root_owned)
                .unwrap_or(ent.path());
            !extra.is_match(rel)
        });

        b
    }

    /// Traverse files under `root`, respecting ignore rules and extra globs.
    /// Returns a **sorted** list of file paths for determinism.
    pub fn walk_files<P: AsRef<Path>>(
        &self,
        root: P,
    ) -> Vec<PathBuf>
    {
        let root_path = root.as_ref();
        let walker = self
            .build_walk(root_path)
            .build();

        let mut out: Vec<PathBuf> = walker
            .filter_map(|res| match res
            {
                Ok(entry) => Some(entry),
                Err(e) =>
                {
                    warn!("skipping unreadable entry: {e}");
                    None
                }
            })
            .filter(|entry| {
                entry
                    .file_type()
                    .is_some_and(|ft| ft.is_file())
            })
            .map(|entry| entry.into_path())
            // Late file-level extra ignore filtering using RELATIVE path
            .filter(|abs| {
                let rel = abs
                    .strip_prefix(root_path)
                    .unwrap_or(abs);
                !self
                    .ignore_patterns
                    .is_match(rel)
            })
            .collect();

        out.sort();

        out
    }

    /// Capture the project-relative file listing the parser validates
    /// against. Paths use `/` separators on every platform.
    pub fn snapshot<P: AsRef<Path>>(
        &self,
        root: P,
    ) -> ProjectSnapshot
    {
        let root_path = root.as_ref();
        let snapshot: ProjectSnapshot = self
            .walk_files(root_path)
            .iter()
            .filter_map(|abs| abs.strip_prefix(root_path).ok())
            .map(to_slash)
            .collect();

        debug!(root = %root_path.display(), files = snapshot.len(), "snapshot captured");
        snapshot
    }
}

/// Relative path rendered with forward slashes.
fn to_slash(rel: &Path) -> String
{
    rel.components()
        .map(|c| {
            c.as_os_str()
                .to_string_lossy()
                .into_owned()
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests
{
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    /// Create a file with parent dirs as needed
    fn write_file(
        root: &Path,
        rel: &str,
        contents: &str,
    ) -> Result<()>
    {
        let path = root.join(rel);
        if let Some(parent) = path.parent()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)?;
        Ok(())
    }

    #[test]
    fn test_snapshot_relative_paths() -> Result<()>
    {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();

        write_file(root, "test.txt", "const foo = 2")?;
        write_file(root, "src/main.rs", "fn main() {}")?;

        let walker = FileWalker::new(&[])?;
        let snapshot = walker.snapshot(root);

        assert_eq!(
            snapshot
                .iter()
                .collect::<Vec<_>>(),
            vec!["src/main.rs", "test.txt"]
        );
        Ok(())
    }

    #[test]
    fn test_respects_gitignore_without_repo() -> Result<()>
    {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();

        write_file(root, ".gitignore", "secret.env\nbuild/\n")?;
        write_file(root, "secret.env", "TOKEN=1")?;
        write_file(root, "build/out.bin", "x")?;
        write_file(root, "keep.txt", "keep")?;

        let walker = FileWalker::new(&[])?;
        let snapshot = walker.snapshot(root);

        assert!(snapshot.contains("keep.txt"));
        assert!(!snapshot.contains("secret.env"));
        assert!(!snapshot.contains("build/out.bin"));
        Ok(())
    }

    #[test]
    fn test_skips_git_dir_and_extra_globs() -> Result<()>
    {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();

        write_file(root, ".git/HEAD", "ref: refs/heads/main")?;
        write_file(root, "node_modules/pkg/index.js", "x")?;
        write_file(root, "app.js", "x")?;

        let walker = FileWalker::new(&["node_modules".to_string()])?;
        let snapshot = walker.snapshot(root);

        assert_eq!(
            snapshot
                .iter()
                .collect::<Vec<_>>(),
            vec!["app.js"]
        );
        Ok(())
    }

    #[test]
    fn test_hidden_files_policy() -> Result<()>
    {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();

        write_file(root, ".env.example", "A=1")?;
        write_file(root, "visible.txt", "x")?;

        let with_hidden = FileWalker::new(&[])?.snapshot(root);
        assert!(with_hidden.contains(".env.example"));

        let without = FileWalker::new(&[])?
            .with_include_hidden(false)
            .snapshot(root);
        assert!(!without.contains(".env.example"));
        assert!(without.contains("visible.txt"));
        Ok(())
    }
}
