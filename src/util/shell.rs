//! Centralized shell output and progress management.
//!
//! The Shell module provides a unified API for all CLI output:
//! - Status messages with consistent formatting
//! - A refreshing single-line progress display (via indicatif)
//! - JSON output mode for machine-readable output
//!
//! JSON mode is mutually exclusive with human output.

use std::fmt::Display;
use std::io::{self, IsTerminal, Write};
use std::sync::Arc;
#[cfg(test)]
use std::sync::Mutex;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Shell output mode - Human and Json are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellMode {
    /// Human-readable output with optional colors and progress line.
    Human {
        verbosity: Verbosity,
        color: ColorChoice,
    },
    /// Machine-readable JSON output only.
    Json,
}

impl Default for ShellMode {
    fn default() -> Self {
        ShellMode::Human {
            verbosity: Verbosity::Normal,
            color: ColorChoice::Auto,
        }
    }
}

/// Output verbosity level (Human mode only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// --quiet: errors only, no progress
    Quiet,
    /// Default: status messages + progress line
    #[default]
    Normal,
    /// --verbose: every progress update on its own line
    Verbose,
}

/// Color output mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorChoice {
    /// Detect TTY and use colors if available.
    #[default]
    Auto,
    /// Always use ANSI colors.
    Always,
    /// Never use ANSI colors.
    Never,
}

impl std::str::FromStr for ColorChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(ColorChoice::Auto),
            "always" => Ok(ColorChoice::Always),
            "never" => Ok(ColorChoice::Never),
            _ => Err(format!(
                "invalid color choice '{}'; expected 'auto', 'always', or 'never'",
                s
            )),
        }
    }
}

/// Status types for output messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    // Success statuses (green)
    Generated,
    Finished,

    // In-progress statuses (cyan)
    Parsing,
    Running,
    Building,

    // Warning statuses (yellow)
    Warning,

    // Error statuses (red)
    Failed,
}

impl Status {
    /// Get the display text for this status.
    fn as_str(&self) -> &'static str {
        match self {
            Status::Generated => "Generated",
            Status::Finished => "Finished",
            Status::Parsing => "Parsing",
            Status::Running => "Running",
            Status::Building => "Building",
            Status::Warning => "Warning",
            Status::Failed => "Failed",
        }
    }

    /// Get the ANSI color code for this status.
    fn color_code(&self) -> &'static str {
        match self {
            Status::Generated | Status::Finished => "\x1b[1;32m",
            Status::Parsing | Status::Running | Status::Building => "\x1b[1;36m",
            Status::Warning => "\x1b[1;33m",
            Status::Failed => "\x1b[1;31m",
        }
    }

    fn is_error(&self) -> bool {
        matches!(self, Status::Failed)
    }

    /// Get the width for alignment (12 characters).
    fn width(&self) -> usize {
        12
    }
}

/// Central shell for all CLI output.
#[derive(Debug)]
pub struct Shell {
    mode: ShellMode,
    use_color: bool,
    /// JSON lines emitted so far, kept for assertions
    #[cfg(test)]
    json_output: Mutex<Vec<String>>,
}

impl Shell {
    /// Create a new shell with the given mode.
    pub fn new(mode: ShellMode) -> Self {
        let use_color = match &mode {
            ShellMode::Json => false,
            ShellMode::Human { color, .. } => match color {
                ColorChoice::Auto => io::stderr().is_terminal(),
                ColorChoice::Always => true,
                ColorChoice::Never => false,
            },
        };

        Shell {
            mode,
            use_color,
            #[cfg(test)]
            json_output: Mutex::new(Vec::new()),
        }
    }

    /// Create a shell from CLI flags with proper precedence.
    ///
    /// JSON mode takes precedence over quiet/verbose.
    pub fn from_flags(
        quiet: bool,
        verbose: bool,
        color: ColorChoice,
        message_format_json: bool,
    ) -> Self {
        let mode = if message_format_json {
            ShellMode::Json
        } else {
            let verbosity = if quiet {
                Verbosity::Quiet
            } else if verbose {
                Verbosity::Verbose
            } else {
                Verbosity::Normal
            };
            ShellMode::Human { verbosity, color }
        };

        Shell::new(mode)
    }

    pub fn is_quiet(&self) -> bool {
        matches!(
            self.mode,
            ShellMode::Human {
                verbosity: Verbosity::Quiet,
                ..
            }
        )
    }

    pub fn is_verbose(&self) -> bool {
        matches!(
            self.mode,
            ShellMode::Human {
                verbosity: Verbosity::Verbose,
                ..
            }
        )
    }

    pub fn is_json(&self) -> bool {
        matches!(self.mode, ShellMode::Json)
    }

    pub fn use_color(&self) -> bool {
        self.use_color
    }

    /// Print a status message.
    ///
    /// Format: `{status:>12} {message}`
    ///
    /// In quiet mode, only error statuses are printed.
    /// In JSON mode, messages are silently ignored.
    pub fn status(&self, status: Status, msg: impl Display) {
        if self.is_json() {
            return;
        }

        if self.is_quiet() && !status.is_error() {
            return;
        }

        let prefix = self.format_status(status);
        eprintln!("{} {}", prefix, msg);
    }

    /// Print a warning message.
    pub fn warn(&self, msg: impl Display) {
        self.status(Status::Warning, msg);
    }

    /// Print a JSON event to stdout.
    ///
    /// Only works in JSON mode; silently ignored in human mode.
    pub fn json_event(&self, event: &serde_json::Value) {
        if !self.is_json() {
            return;
        }

        let json_str = serde_json::to_string(event).unwrap_or_default();
        println!("{}", json_str);
        let _ = io::stdout().flush();

        #[cfg(test)]
        if let Ok(mut buffer) = self.json_output.lock() {
            buffer.push(json_str);
        }
    }

    /// JSON lines emitted so far.
    #[cfg(test)]
    pub fn json_lines(&self) -> Vec<String> {
        self.json_output
            .lock()
            .map(|buffer| buffer.clone())
            .unwrap_or_default()
    }

    /// Format a status prefix with optional color.
    fn format_status(&self, status: Status) -> String {
        let text = status.as_str();
        let width = status.width();

        if self.use_color {
            let color = status.color_code();
            format!("{}{:>width$}\x1b[0m", color, text, width = width)
        } else {
            format!("{:>width$}", text, width = width)
        }
    }

    /// Create a refreshing progress line.
    ///
    /// Drawn in place in normal mode, printed line by line in verbose mode,
    /// and silent in quiet and JSON mode.
    pub fn progress_line(self: &Arc<Self>) -> ProgressLine {
        ProgressLine::new(Arc::clone(self))
    }
}

impl Default for Shell {
    fn default() -> Self {
        Shell::new(ShellMode::default())
    }
}

/// A single line of progress output that is redrawn on every update.
pub struct ProgressLine {
    shell: Arc<Shell>,
    pb: Option<ProgressBar>,
    last: Option<String>,
}

impl ProgressLine {
    fn new(shell: Arc<Shell>) -> Self {
        let pb = if shell.is_quiet() || shell.is_verbose() || shell.is_json() {
            None
        } else {
            let pb = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{msg}")
                    .unwrap(),
            );
            Some(pb)
        };

        ProgressLine {
            shell,
            pb,
            last: None,
        }
    }

    /// Replace the displayed line.
    pub fn set_line(&mut self, line: impl Into<String>) {
        let line = line.into();

        if let Some(pb) = &self.pb {
            pb.set_message(line.clone());
        } else if self.shell.is_verbose() && self.last.as_deref() != Some(line.as_str()) {
            eprintln!("  {}", line);
        }

        self.last = Some(line);
    }

    /// The most recently displayed line.
    pub fn last_line(&self) -> Option<&str> {
        self.last.as_deref()
    }

    /// Leave the last line on screen and move past it.
    pub fn finish(&self) {
        if let Some(pb) = &self.pb {
            pb.finish();
        }
    }
}

/// Format a duration in a human-readable way.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs < 60.0 {
        format!("{:.2}s", secs)
    } else {
        let mins = secs / 60.0;
        format!("{:.1}m", mins)
    }
}
