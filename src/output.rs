// ABOUTME: Output formatting for CLI feedback.
// ABOUTME: Supports normal, quiet (CI), and JSON output modes.

use serde::Serialize;
use std::time::Instant;

use crate::pipeline::TargetReport;
use crate::tasks::{Failure, TaskOutcome};

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-friendly output with progress messages
    Normal,
    /// Minimal output for CI (only final result)
    Quiet,
    /// JSON lines for scripting
    Json,
}

/// Handles CLI output based on the configured mode.
pub struct Output {
    mode: OutputMode,
    start_time: Option<Instant>,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            start_time: None,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Start timing an operation.
    pub fn start_timer(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Get elapsed time since timer started.
    pub fn elapsed_secs(&self) -> f64 {
        self.start_time
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    fn duration(&self) -> Option<f64> {
        self.start_time.map(|_| self.elapsed_secs())
    }

    /// Print a progress message (suppressed in quiet/json mode).
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            println!("{message}");
        }
    }

    /// Print a success message with optional timing.
    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => {
                let elapsed = self.elapsed_secs();
                if elapsed > 0.0 {
                    println!("{message} ({:.1}s)", elapsed);
                } else {
                    println!("{message}");
                }
            }
            OutputMode::Quiet => {
                println!("{message}");
            }
            OutputMode::Json => self.emit(&JsonEvent::new("success", message, self.duration())),
        }
    }

    /// Print a non-fatal warning.
    pub fn warning(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => eprintln!("Warning: {message}"),
            OutputMode::Json => self.emit_err(&JsonEvent::new("warning", message, None)),
        }
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => {
                eprintln!("Error: {message}");
            }
            OutputMode::Json => self.emit_err(&JsonEvent::new("error", message, self.duration())),
        }
    }

    /// Print what happened on one target: notes on success, the failing
    /// command and the target's diagnostic text otherwise.
    pub fn target(&self, report: &TargetReport) {
        if self.mode == OutputMode::Json {
            self.emit(&JsonTarget::from(report));
            return;
        }

        match &report.result {
            Ok(task) => match &task.outcome {
                TaskOutcome::Success => {
                    if self.mode == OutputMode::Normal {
                        println!("  ✓ {}", report.target);
                        for note in task.notes() {
                            for line in note.lines() {
                                println!("    {line}");
                            }
                        }
                    }
                }
                TaskOutcome::Halted { step, failure, .. } => {
                    eprintln!("  ✗ {}: {} failed", report.target, step);
                    print_failure(failure);
                }
            },
            Err(e) => eprintln!("  ✗ {}: {}", report.target, e),
        }
    }

    fn emit<T: Serialize>(&self, event: &T) {
        if let Ok(json) = serde_json::to_string(event) {
            println!("{json}");
        }
    }

    fn emit_err<T: Serialize>(&self, event: &T) {
        if let Ok(json) = serde_json::to_string(event) {
            eprintln!("{json}");
        }
    }
}

fn print_failure(failure: &Failure) {
    if let Some(command) = &failure.command {
        eprintln!("    $ {command}");
    }
    for line in failure.message.lines() {
        eprintln!("    {line}");
    }
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}

impl<'a> JsonEvent<'a> {
    fn new(event: &'a str, message: &'a str, duration_secs: Option<f64>) -> Self {
        Self {
            event,
            message,
            duration_secs,
        }
    }
}

#[derive(Serialize)]
struct JsonTarget<'a> {
    event: &'static str,
    target: &'a str,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    step: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    command: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    notes: Vec<&'a str>,
}

impl<'a> From<&'a TargetReport> for JsonTarget<'a> {
    fn from(report: &'a TargetReport) -> Self {
        let mut event = JsonTarget {
            event: "target",
            target: &report.target,
            status: "success",
            step: None,
            command: None,
            message: None,
            notes: Vec::new(),
        };

        match &report.result {
            Ok(task) => match &task.outcome {
                TaskOutcome::Success => event.notes = task.notes().collect(),
                TaskOutcome::Halted { step, failure, .. } => {
                    event.status = "halted";
                    event.step = Some(step.as_str());
                    event.command = failure.command.as_deref();
                    event.message = Some(failure.message.clone());
                }
            },
            Err(e) => {
                event.status = "error";
                event.message = Some(e.to_string());
            }
        }
        event
    }
}
