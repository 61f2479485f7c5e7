//! Error types for parsing, generation and build supervision.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::util::diagnostic::{suggestions, Diagnostic};

/// Errors produced by omake.
#[derive(Debug, Error)]
pub enum OmakeError {
    /// A directive line whose argument list could not be read.
    #[error("parse error [line {line}]: {message}")]
    Parse { line: usize, message: String },

    /// The description parsed but names no source files.
    #[error("no source files specified (no `filebuild` directive)")]
    NoSources,

    #[error("failed to {action} `{}`", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to run `{command}`")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    /// The build tool ran and exited unsuccessfully.
    #[error("`{command}` failed with exit code {}", display_code(*code))]
    ToolFailed { command: String, code: Option<i32> },
}

fn display_code(code: Option<i32>) -> String {
    match code {
        Some(c) => c.to_string(),
        None => "none (terminated by signal)".to_string(),
    }
}

impl OmakeError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        OmakeError::Io {
            action,
            path: path.into(),
            source,
        }
    }

    /// Process exit status to report for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            OmakeError::ToolFailed {
                code: Some(code), ..
            } if *code != 0 => *code,
            _ => 1,
        }
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            OmakeError::Parse { line, message } => {
                Diagnostic::error(format!("invalid directive on line {}", line))
                    .with_context(message.clone())
                    .with_suggestion(suggestions::DIRECTIVE_SYNTAX)
            }
            OmakeError::NoSources => Diagnostic::error(self.to_string())
                .with_suggestion(suggestions::ADD_FILEBUILD),
            OmakeError::Io { source, path, .. } => Diagnostic::error(self.to_string())
                .with_context(source.to_string())
                .with_location(path.clone()),
            OmakeError::Spawn { source, .. } => Diagnostic::error(self.to_string())
                .with_context(source.to_string())
                .with_suggestion(suggestions::MAKE_NOT_FOUND),
            OmakeError::ToolFailed { .. } => {
                Diagnostic::error(self.to_string()).with_suggestion(suggestions::BUILD_FAILED)
            }
        }
    }
}
