//! Build tool supervision with progress reporting.
//!
//! With progress enabled, three threads cooperate:
//! - a reader that turns the tool's stdout into lines on a channel,
//! - a poller that drains the channel on a fixed interval, feeds markers to
//!   [`BuildStats`] and redraws the progress line,
//! - the caller, which waits for the tool to exit, clears the `keep polling`
//!   flag and joins the poller before reporting the result.
//!
//! The poller is the only writer of the statistics; they are handed back
//! through the join handle.

use std::io::{BufRead, BufReader, Read};
use std::process::ExitStatus;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::builder::events::BuildEvent;
use crate::builder::progress::{extract, BuildStats, DEFAULT_BAR_WIDTH};
use crate::core::errors::OmakeError;
use crate::util::process::ProcessBuilder;
use crate::util::shell::{format_duration, Shell, Status};

/// Default interval between progress polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Lifecycle of a supervised build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    Idle,
    Running,
    Succeeded,
    Failed,
}

impl BuildState {
    /// Terminal state for an exit status. Only the status decides.
    pub fn from_status(status: &ExitStatus) -> Self {
        if status.success() {
            BuildState::Succeeded
        } else {
            BuildState::Failed
        }
    }
}

/// Result of running the build tool.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub state: BuildState,
    /// Exit code, if the tool exited normally
    pub exit_code: Option<i32>,
    pub duration: Duration,
    pub total_files: usize,
    /// Final statistics when progress was monitored
    pub stats: Option<BuildStats>,
}

impl BuildOutcome {
    pub fn success(&self) -> bool {
        self.state == BuildState::Succeeded
    }
}

/// Runs the build tool and reports its progress.
pub struct BuildExecutor {
    shell: Arc<Shell>,
    poll_interval: Duration,
    bar_width: usize,
    state: BuildState,
}

impl BuildExecutor {
    /// Create a new build executor.
    pub fn new(shell: Arc<Shell>) -> Self {
        BuildExecutor {
            shell,
            poll_interval: DEFAULT_POLL_INTERVAL,
            bar_width: DEFAULT_BAR_WIDTH,
            state: BuildState::Idle,
        }
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn bar_width(mut self, width: usize) -> Self {
        self.bar_width = width;
        self
    }

    pub fn state(&self) -> BuildState {
        self.state
    }

    /// Run with the tool's output passed straight through.
    pub fn run(
        &mut self,
        cmd: &ProcessBuilder,
        total_files: usize,
    ) -> Result<BuildOutcome, OmakeError> {
        let command = cmd.display_command();
        self.shell.status(Status::Running, &command);
        self.emit_started(&command, total_files);

        let start = Instant::now();
        self.state = BuildState::Running;
        let status = cmd.status()?;

        let outcome = self.finish(status, start, total_files, None);
        self.report(&outcome);
        Ok(outcome)
    }

    /// Run with stdout captured and a live progress line.
    pub fn run_with_progress(
        &mut self,
        cmd: &ProcessBuilder,
        total_files: usize,
    ) -> Result<BuildOutcome, OmakeError> {
        let command = cmd.display_command();
        self.shell.status(Status::Building, format!("{} file(s)", total_files));
        self.emit_started(&command, total_files);

        let start = Instant::now();
        let mut child = cmd.spawn_piped()?;
        self.state = BuildState::Running;
        tracing::debug!("spawned `{}` (pid {})", command, child.id());

        let Some(stdout) = child.stdout.take() else {
            // Not reachable with a piped stdout; reap the child before bailing.
            let _ = child.kill();
            let _ = child.wait();
            return Err(OmakeError::Spawn {
                command,
                source: std::io::Error::other("stdout was not captured"),
            });
        };

        let lines = spawn_reader(stdout);
        let keep_polling = Arc::new(AtomicBool::new(true));
        let poller = {
            let keep_polling = Arc::clone(&keep_polling);
            let shell = Arc::clone(&self.shell);
            let interval = self.poll_interval;
            let width = self.bar_width;
            thread::spawn(move || {
                poll_progress(&shell, &lines, &keep_polling, start, total_files, interval, width)
            })
        };

        let waited = child.wait();
        keep_polling.store(false, Ordering::Release);
        let stats = poller
            .join()
            .unwrap_or_else(|panic| std::panic::resume_unwind(panic));

        let status = waited.map_err(|source| OmakeError::Spawn {
            command: command.clone(),
            source,
        })?;

        let outcome = self.finish(status, start, total_files, Some(stats));
        self.report(&outcome);
        Ok(outcome)
    }

    fn finish(
        &mut self,
        status: ExitStatus,
        start: Instant,
        total_files: usize,
        stats: Option<BuildStats>,
    ) -> BuildOutcome {
        self.state = BuildState::from_status(&status);
        BuildOutcome {
            state: self.state,
            exit_code: status.code(),
            duration: start.elapsed(),
            total_files,
            stats,
        }
    }

    fn emit_started(&self, command: &str, total_files: usize) {
        let event = BuildEvent::BuildStarted {
            command: command.to_string(),
            total_files,
        };
        self.shell.json_event(&event.to_value());
    }

    /// Print the final line. Called only after polling has stopped.
    fn report(&self, outcome: &BuildOutcome) {
        let duration = format_duration(outcome.duration);
        if outcome.success() {
            self.shell.status(
                Status::Finished,
                format!("build succeeded, {} file(s) in {}", outcome.total_files, duration),
            );
        } else {
            self.shell.status(
                Status::Failed,
                format!("build failed, {} file(s) in {}", outcome.total_files, duration),
            );
        }

        let event = BuildEvent::finished(
            outcome.success(),
            outcome.exit_code,
            outcome.duration.as_millis() as u64,
            outcome.total_files,
        );
        self.shell.json_event(&event.to_value());
    }
}

/// Forward the tool's output line by line until it closes.
fn spawn_reader<R: Read + Send + 'static>(stream: R) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf).trim_end().to_string();
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::debug!("stopped reading build output: {}", e);
                    break;
                }
            }
        }
    });
    rx
}

/// Poller body: drain, update, redraw, sleep, until told to stop.
fn poll_progress(
    shell: &Arc<Shell>,
    lines: &Receiver<String>,
    keep_polling: &AtomicBool,
    start: Instant,
    total_files: usize,
    interval: Duration,
    width: usize,
) -> BuildStats {
    let mut stats = BuildStats::started_at(start);
    let mut display = shell.progress_line();

    while keep_polling.load(Ordering::Acquire) {
        drain_available(shell, lines, &mut stats, total_files);
        display.set_line(stats.render(width));
        thread::sleep(interval);
    }

    // The tool has exited; take what the reader still holds until the pipe
    // closes, giving up after one interval if something else keeps it open.
    while let Ok(line) = lines.recv_timeout(interval) {
        apply_line(shell, &line, &mut stats, total_files);
    }
    display.set_line(stats.render(width));
    display.finish();
    stats
}

/// Apply every line currently queued. Returns whether a marker was seen.
fn drain_available(
    shell: &Shell,
    lines: &Receiver<String>,
    stats: &mut BuildStats,
    fallback_total: usize,
) -> bool {
    let mut updated = false;
    loop {
        match lines.try_recv() {
            Ok(line) => updated |= apply_line(shell, &line, stats, fallback_total),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
        }
    }
    updated
}

/// Feed one output line to the statistics. Returns whether it held a marker.
fn apply_line(shell: &Shell, line: &str, stats: &mut BuildStats, fallback_total: usize) -> bool {
    let count = extract(line);
    if count.is_empty() {
        tracing::debug!("{}", line);
        return false;
    }
    let count = count.with_fallback_total(fallback_total);
    stats.update(count.built, count.total);

    let event = BuildEvent::progress(stats.built(), stats.total(), stats.throughput());
    shell.json_event(&event.to_value());
    true
}
