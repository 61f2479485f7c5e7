//! Build event types for JSON output.
//!
//! These events are emitted when using `--message-format=json`, one JSON
//! object per line on stdout.
//!
//! # Event Types
//!
//! - `makefile-generated`: A Makefile was written
//! - `build-started`: The build tool was launched
//! - `build-progress`: A progress marker was read from the tool output
//! - `build-finished`: The build tool exited

use std::path::PathBuf;

use serde::Serialize;

/// A build event emitted during the run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "reason")]
pub enum BuildEvent {
    /// A Makefile was generated.
    #[serde(rename = "makefile-generated")]
    MakefileGenerated {
        /// Path of the written Makefile
        path: PathBuf,
        /// Dialect ("posix" or "msvc")
        backend: String,
    },

    /// The build tool was launched.
    #[serde(rename = "build-started")]
    BuildStarted {
        /// Command line as displayed to the user
        command: String,
        /// Number of compilation units
        total_files: usize,
    },

    /// Build progress update.
    #[serde(rename = "build-progress")]
    Progress {
        built: usize,
        total: usize,
        /// Files per second
        throughput: f64,
    },

    /// The build tool exited.
    #[serde(rename = "build-finished")]
    BuildFinished {
        success: bool,
        /// Exit code of the tool, if it exited normally
        #[serde(skip_serializing_if = "Option::is_none")]
        exit_code: Option<i32>,
        /// Total build duration in milliseconds
        duration_ms: u64,
        total_files: usize,
    },
}

impl BuildEvent {
    /// Create a progress event.
    pub fn progress(built: usize, total: usize, throughput: f64) -> Self {
        BuildEvent::Progress {
            built,
            total,
            throughput,
        }
    }

    /// Create a build finished event.
    pub fn finished(
        success: bool,
        exit_code: Option<i32>,
        duration_ms: u64,
        total_files: usize,
    ) -> Self {
        BuildEvent::BuildFinished {
            success,
            exit_code,
            duration_ms,
            total_files,
        }
    }

    /// Serialize this event to a JSON value.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }

    /// Serialize this event to a JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
