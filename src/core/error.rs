//! Rejection reasons for a model reply.
//!
//! Every variant is recoverable: the caller feeds `reprompt()` back to the
//! model and asks again.

use miette::Diagnostic;

use crate::core::protocol::Keyword;

/// Why a reply was rejected; the first violation wins.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Diagnostic)]
pub enum ParseError {
    #[error("File {path} does not exist")]
    #[diagnostic(
        code(edict::file_not_found),
        help("ACCESS, REPLACE and DELETE may only name files listed in the project")
    )]
    FileNotFound { path: String },

    #[error("File {path} already exists")]
    #[diagnostic(
        code(edict::file_already_exists),
        help("use REPLACE to modify an existing file")
    )]
    FileAlreadyExists { path: String },

    #[error("Invalid line numbers: {span}")]
    #[diagnostic(
        code(edict::invalid_range),
        help("line ranges are written <start>-<end> with 0 <= start <= end")
    )]
    InvalidRange { span: String },

    #[error("No code block found for {command} {path}")]
    #[diagnostic(
        code(edict::no_code_block),
        help("wrap the new content in triple backticks directly after the command line")
    )]
    NoCodeBlockFound { command: Keyword, path: String },

    #[error("Invalid response format")]
    #[diagnostic(
        code(edict::unrecognized_format),
        help("replies must contain at least one of ACCESS, REPLACE, CREATE, DELETE, FOLLOWUP or COMPLETE")
    )]
    UnrecognizedFormat,

    #[error("Could not read {path}: {reason}")]
    #[diagnostic(code(edict::source_unavailable))]
    SourceUnavailable { path: String, reason: String },
}

impl ParseError {
    /// Corrective message to send back to the model.
    pub fn reprompt(&self) -> String {
        format!(
            "{}. Please make sure responses are restricted to those listed in the system prompt",
            self
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reprompt_wraps_message() {
        let e = ParseError::FileNotFound {
            path: "missing.txt".to_string(),
        };
        assert_eq!(
            e.reprompt(),
            "File missing.txt does not exist. Please make sure responses are restricted to those listed in the system prompt"
        );
    }

    #[test]
    fn test_diagnostic_codes() {
        let e = ParseError::NoCodeBlockFound {
            command: Keyword::Create,
            path: "a.rs".to_string(),
        };
        assert_eq!(e.to_string(), "No code block found for CREATE a.rs");
        assert_eq!(
            e.code().map(|c| c.to_string()).as_deref(),
            Some("edict::no_code_block")
        );
    }
}
