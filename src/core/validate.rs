//! Eager per-kind checks run while commands are extracted.
//!
//! All checks read the frozen snapshot only; nothing here touches the
//! filesystem, so a (reply, snapshot) pair always validates the same way.

use crate::core::error::ParseError;
use crate::core::protocol::{LineRange, ProjectSnapshot};

/// ACCESS needs an existing file.
pub fn check_access(path: &str, snapshot: &ProjectSnapshot) -> Result<(), ParseError> {
    require_present(path, snapshot)
}

/// DELETE needs an existing file.
pub fn check_delete(path: &str, snapshot: &ProjectSnapshot) -> Result<(), ParseError> {
    require_present(path, snapshot)
}

/// CREATE must not clobber an existing file.
pub fn check_create(path: &str, snapshot: &ProjectSnapshot) -> Result<(), ParseError> {
    if snapshot.contains(path) {
        return Err(ParseError::FileAlreadyExists {
            path: path.to_string(),
        });
    }
    Ok(())
}

/// REPLACE needs an existing file and a well-formed `start-end` span.
pub fn check_replace(
    path: &str,
    span: &str,
    snapshot: &ProjectSnapshot,
) -> Result<LineRange, ParseError> {
    require_present(path, snapshot)?;
    LineRange::parse(span)
}

fn require_present(path: &str, snapshot: &ProjectSnapshot) -> Result<(), ParseError> {
    if !snapshot.contains(path) {
        return Err(ParseError::FileNotFound {
            path: path.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap() -> ProjectSnapshot {
        ["test.txt", "src/lib.rs"].into_iter().collect()
    }

    #[test]
    fn test_existence_rules() {
        let s = snap();
        assert!(check_access("test.txt", &s).is_ok());
        assert!(check_delete("src/lib.rs", &s).is_ok());
        assert_eq!(
            check_access("missing.txt", &s),
            Err(ParseError::FileNotFound {
                path: "missing.txt".to_string()
            })
        );
        assert_eq!(
            check_create("test.txt", &s),
            Err(ParseError::FileAlreadyExists {
                path: "test.txt".to_string()
            })
        );
        assert!(check_create("new.txt", &s).is_ok());
    }

    #[test]
    fn test_replace_checks_path_before_range() {
        let s = snap();
        assert!(matches!(
            check_replace("missing.txt", "x-y", &s),
            Err(ParseError::FileNotFound { .. })
        ));
        assert!(matches!(
            check_replace("test.txt", "4-2", &s),
            Err(ParseError::InvalidRange { .. })
        ));
        assert_eq!(
            check_replace("test.txt", "2-4", &s).unwrap(),
            LineRange { start: 2, end: 4 }
        );
    }
}
