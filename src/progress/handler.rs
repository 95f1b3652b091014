//! Progress handler trait and events

use crate::pipeline::Phase;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

/// Events emitted while a pipeline runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// A phase is about to run
    PhaseStarted { phase: Phase },

    /// A phase will not run
    PhaseSkipped { phase: Phase, reason: String },

    /// The temporary build script was written
    ScriptWritten { path: PathBuf },

    /// The temporary build script was removed
    ScriptRemoved { path: PathBuf },

    ContainerCreated { phase: Phase, container_id: String },

    /// The engine warned while creating the container; the phase stops here
    CreationWarnings { phase: Phase, warnings: Vec<String> },

    ContainerStarted { phase: Phase },

    /// One line of live container output
    LogLine { phase: Phase, line: String },

    ContainerExited {
        phase: Phase,
        exit_code: i64,
        elapsed: Duration,
    },

    /// Exit code zero; `output` is set when it should be shown
    PhaseSucceeded { phase: Phase, output: Option<String> },

    /// Non-zero exit code; `output` is set when it was not streamed already
    PhaseFailed {
        phase: Phase,
        exit_code: i64,
        output: Option<String>,
    },

    /// The container was left in place for inspection
    ContainerKept { phase: Phase, short_id: String },

    ContainerRemoved { phase: Phase },

    /// Every selected phase succeeded
    Completed,
}

/// Trait for handling progress events during a pipeline run
pub trait ProgressHandler: Send + Sync {
    /// Called when a progress event occurs
    fn on_progress(&self, event: &ProgressEvent);
}

/// No-op handler that ignores all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

impl ProgressHandler for NoOpHandler {
    fn on_progress(&self, _event: &ProgressEvent) {}
}

/// Handler that keeps every event, for inspection after a run
#[derive(Debug, Default)]
pub struct RecordingHandler {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Live output lines in the order they arrived
    pub fn log_lines(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ProgressEvent::LogLine { line, .. } => Some(line),
                _ => None,
            })
            .collect()
    }
}

impl ProgressHandler for RecordingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
