use anyhow::{Context, Result, bail};
use std::fs;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

use crate::core::patch::SourceReader;

/// Reads project files relative to a root directory.
#[derive(Debug, Clone)]
pub struct FsSource {
    root: PathBuf,
}

impl FsSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl SourceReader for FsSource {
    fn read_source(&self, path: &str) -> io::Result<String> {
        fs::read_to_string(self.root.join(path))
    }
}

/// Resolve a reply path under `root`; `None` for absolute paths and `..`.
pub fn resolve_within(root: &Path, rel: &str) -> Option<PathBuf> {
    let rel_path = Path::new(rel);
    let contained = rel_path
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    contained.then(|| root.join(rel_path))
}

/// Render `content` the way ACCESS feedback shows it: `<index>  <line>`,
/// 0-based, one entry per `\n`-separated line.
pub fn numbered(content: &str) -> String {
    let mut out = String::with_capacity(content.len() + content.len() / 8 + 8);
    for (i, line) in content.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let line = line.strip_suffix('\r').unwrap_or(line);
        out.push_str(&format!("{i}  {line}"));
    }
    out
}

/// Write a new file, creating parent directories as needed. The final
/// rename refuses to replace a file that appeared in the meantime.
pub fn create_file(path: &Path, content: &str) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory {}", dir.display()))?;

    let tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to stage {}", path.display()))?;

    use std::io::Write;
    let mut file = tmp.as_file();
    file.write_all(content.as_bytes())?;
    file.sync_all()?;

    // Temp files start owner-only
    #[cfg(unix)]
    fs::set_permissions(
        tmp.path(),
        std::os::unix::fs::PermissionsExt::from_mode(0o644),
    )
    .context("set new file permissions")?;

    match tmp.persist_noclobber(path) {
        Ok(_) => Ok(()),
        Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
            bail!("refusing to overwrite existing file {}", path.display())
        }
        Err(e) => Err(e.error).with_context(|| format!("Failed to write {}", path.display())),
    }
}

/// Remove an existing file. Missing files are an error.
pub fn delete_file(path: &Path) -> Result<()> {
    fs::remove_file(path).with_context(|| format!("Failed to delete {}", path.display()))
}

/// Atomic write with robust temp file strategy
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    // Prefer same-dir tempfile; fall back to OS temp on EPERM/ENOENT
    let dir = path.parent().unwrap_or_else(|| Path::new("."));

    // Keep the mode of files we overwrite
    #[cfg(unix)]
    let perms = fs::metadata(path)
        .map(|m| m.permissions())
        .unwrap_or_else(|_| std::os::unix::fs::PermissionsExt::from_mode(0o644));
    #[cfg(not(unix))]
    let perms = fs::metadata(path).map(|m| m.permissions()).ok();

    let tmp = match tempfile::NamedTempFile::new_in(dir) {
        Ok(t) => t,
        Err(_) => tempfile::NamedTempFile::new()?,
    };

    use std::io::Write;
    let mut file = tmp.as_file();
    file.write_all(data)?;
    file.sync_all()?;

    #[cfg(unix)]
    fs::set_permissions(tmp.path(), perms).context("set temp permissions")?;
    #[cfg(not(unix))]
    if let Some(perms) = perms {
        fs::set_permissions(tmp.path(), perms).context("set temp permissions")?;
    }

    match tmp.persist(path) {
        Ok(_) => {}
        Err(e) => {
            // Different filesystem: copy instead of rename
            fs::copy(e.file.path(), path)?;
        }
    }

    #[cfg(unix)]
    {
        if let Ok(parent_file) = fs::File::open(dir) {
            let _ = parent_file.sync_all();
        }
    }

    Ok(())
}

/// Load a model reply from the clipboard, a file, or stdin (in that order
/// of preference). CRLF and a leading BOM are left for the parser to clean.
pub fn read_reply(file: Option<&Path>, from_clipboard: bool) -> Result<String> {
    if from_clipboard {
        return get_clipboard_content();
    }
    match file {
        Some(p) if p != Path::new("-") => fs::read_to_string(p)
            .with_context(|| format!("Failed to read reply file: {}", p.display())),
        _ => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read reply from stdin")?;
            Ok(buf)
        }
    }
}

fn get_clipboard_content() -> Result<String> {
    use arboard::Clipboard;
    let mut clipboard = Clipboard::new().context("Failed to access clipboard")?;
    clipboard
        .get_text()
        .context("Failed to get text from clipboard")
}
