//! Container Runner
//!
//! Runs one phase container from creation to removal: create, start, follow
//! or collect output, wait for the exit code, report, then remove (or keep).
//! Nothing is retried. Whether the next phase runs is up to the caller.

use crate::engine::{ContainerEngine, ContainerSpec, EngineError};
use crate::pipeline::Phase;
use crate::progress::{ProgressEvent, ProgressHandler};
use futures_util::StreamExt;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

/// Length of a container id as shown to the user
pub const SHORT_ID_LEN: usize = 12;

/// What a finished container left behind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub exit_code: i64,
    pub elapsed: Duration,
    /// Streamed or fetched output; `None` when nothing was collected
    pub logs: Option<String>,
}

impl ExecutionResult {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

#[derive(Debug, Error)]
pub enum RunnerError {
    /// The engine warned while creating the container. The container is left
    /// in place and nothing else is attempted.
    #[error("The engine warned while creating the {phase} container {container_id}: {}", .warnings.join("; "))]
    CreationWarnings {
        phase: Phase,
        container_id: String,
        warnings: Vec<String>,
    },

    #[error("The {phase} container failed: {source}")]
    Engine {
        phase: Phase,
        #[source]
        source: EngineError,
    },
}

/// Per-run switches for the runner
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Leave the container in place and report its id
    pub keep: bool,
    /// Follow the output live while the container runs
    pub stream_logs: bool,
    /// Show the output of a successful container after it exits
    pub show_output: bool,
}

/// Drives a single phase container through an engine
pub struct ContainerRunner<'a> {
    engine: &'a dyn ContainerEngine,
    progress: &'a dyn ProgressHandler,
    phase: Phase,
}

impl<'a> ContainerRunner<'a> {
    pub fn new(engine: &'a dyn ContainerEngine, progress: &'a dyn ProgressHandler, phase: Phase) -> Self {
        Self {
            engine,
            progress,
            phase,
        }
    }

    pub async fn run(&self, spec: &ContainerSpec, options: RunOptions) -> Result<ExecutionResult, RunnerError> {
        let phase = self.phase;
        debug!(%phase, image = %spec.image, command = ?spec.command, "Creating container");

        let created = self
            .engine
            .create_container(spec)
            .await
            .map_err(|source| self.engine_error(source))?;

        self.progress.on_progress(&ProgressEvent::ContainerCreated {
            phase,
            container_id: created.id.clone(),
        });

        if !created.warnings.is_empty() {
            self.progress.on_progress(&ProgressEvent::CreationWarnings {
                phase,
                warnings: created.warnings.clone(),
            });
            return Err(RunnerError::CreationWarnings {
                phase,
                container_id: created.id,
                warnings: created.warnings,
            });
        }

        let id = created.id.as_str();

        self.engine
            .start_container(id)
            .await
            .map_err(|source| self.engine_error(source))?;
        let started = Instant::now();
        self.progress.on_progress(&ProgressEvent::ContainerStarted { phase });

        let mut logs = if options.stream_logs {
            Some(self.follow_logs(id).await?)
        } else {
            None
        };

        let exit_code = self
            .engine
            .wait_container(id)
            .await
            .map_err(|source| self.engine_error(source))?;
        let elapsed = started.elapsed();

        self.progress.on_progress(&ProgressEvent::ContainerExited {
            phase,
            exit_code,
            elapsed,
        });

        let streamed = logs.is_some();
        if !streamed && (exit_code != 0 || options.show_output) {
            let output = self
                .engine
                .fetch_logs(id)
                .await
                .map_err(|source| self.engine_error(source))?;
            logs = Some(output);
        }

        // Output that was streamed has already been shown line by line
        let shown_output = if streamed { None } else { logs.clone() };
        if exit_code == 0 {
            self.progress.on_progress(&ProgressEvent::PhaseSucceeded {
                phase,
                output: shown_output,
            });
        } else {
            self.progress.on_progress(&ProgressEvent::PhaseFailed {
                phase,
                exit_code,
                output: shown_output,
            });
        }

        if options.keep {
            self.progress.on_progress(&ProgressEvent::ContainerKept {
                phase,
                short_id: short_id(id).to_string(),
            });
        } else {
            self.engine
                .remove_container(id)
                .await
                .map_err(|source| self.engine_error(source))?;
            self.progress.on_progress(&ProgressEvent::ContainerRemoved { phase });
        }

        Ok(ExecutionResult {
            exit_code,
            elapsed,
            logs,
        })
    }

    async fn follow_logs(&self, id: &str) -> Result<String, RunnerError> {
        let mut stream = self.engine.stream_logs(id);
        let mut buffer = LineBuffer::default();
        let mut collected = String::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|source| self.engine_error(source))?;
            collected.push_str(&chunk);
            for line in buffer.push(&chunk) {
                self.emit_line(line);
            }
        }
        if let Some(rest) = buffer.finish() {
            self.emit_line(rest);
        }

        Ok(collected)
    }

    fn emit_line(&self, line: String) {
        self.progress.on_progress(&ProgressEvent::LogLine {
            phase: self.phase,
            line,
        });
    }

    fn engine_error(&self, source: EngineError) -> RunnerError {
        RunnerError::Engine {
            phase: self.phase,
            source,
        }
    }
}

/// The first [`SHORT_ID_LEN`] characters of a container id
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(SHORT_ID_LEN) {
        Some((end, _)) => &id[..end],
        None => id,
    }
}

/// Splits arbitrarily chunked output into whole lines.
#[derive(Debug, Default)]
struct LineBuffer {
    pending: String,
}

impl LineBuffer {
    fn push(&mut self, chunk: &str) -> Vec<String> {
        self.pending.push_str(chunk);
        let mut lines = Vec::new();
        while let Some(newline) = self.pending.find('\n') {
            let line: String = self.pending.drain(..=newline).collect();
            lines.push(line.trim_end_matches(['\n', '\r']).to_string());
        }
        lines
    }

    fn finish(self) -> Option<String> {
        if self.pending.is_empty() {
            None
        } else {
            Some(self.pending)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineCall, MockEngine};
    use crate::progress::RecordingHandler;
    use crate::volumes::VolumeMapping;
    use indexmap::IndexMap;

    fn spec() -> ContainerSpec {
        ContainerSpec::new(
            "alpine",
            vec!["/berth-build-x.sh".to_string()],
            VolumeMapping::default(),
            IndexMap::new(),
        )
    }

    async fn run(engine: &MockEngine, handler: &RecordingHandler, options: RunOptions) -> Result<ExecutionResult, RunnerError> {
        ContainerRunner::new(engine, handler, Phase::Build)
            .run(&spec(), options)
            .await
    }

    #[tokio::test]
    async fn test_successful_run_removes_container() {
        let engine = MockEngine::new();
        let handler = RecordingHandler::new();

        let result = run(&engine, &handler, RunOptions::default()).await.unwrap();

        assert!(result.succeeded());
        assert_eq!(result.logs, None);
        let id = MockEngine::container_id(0);
        assert_eq!(
            engine.calls(),
            vec![
                EngineCall::CreateContainer(spec()),
                EngineCall::StartContainer(id.clone()),
                EngineCall::WaitContainer(id.clone()),
                EngineCall::RemoveContainer(id),
            ]
        );
        assert!(handler.events().contains(&ProgressEvent::PhaseSucceeded {
            phase: Phase::Build,
            output: None,
        }));
    }

    #[tokio::test]
    async fn test_failure_fetches_output_and_still_removes() {
        let engine = MockEngine::new()
            .with_exit_codes([2])
            .with_log_chunks(["make: *** [all] Error 2\n"]);
        let handler = RecordingHandler::new();

        let result = run(&engine, &handler, RunOptions::default()).await.unwrap();

        assert_eq!(result.exit_code, 2);
        assert_eq!(result.logs.as_deref(), Some("make: *** [all] Error 2\n"));
        assert!(engine.was_removed(&MockEngine::container_id(0)));
        assert!(handler.events().contains(&ProgressEvent::PhaseFailed {
            phase: Phase::Build,
            exit_code: 2,
            output: Some("make: *** [all] Error 2\n".to_string()),
        }));
    }

    #[tokio::test]
    async fn test_keep_leaves_container_and_reports_short_id() {
        let engine = MockEngine::new().with_exit_codes([1]);
        let handler = RecordingHandler::new();
        let options = RunOptions {
            keep: true,
            ..Default::default()
        };

        let result = run(&engine, &handler, options).await.unwrap();

        assert!(!result.succeeded());
        let id = MockEngine::container_id(0);
        assert!(!engine.was_removed(&id));
        assert!(handler.events().contains(&ProgressEvent::ContainerKept {
            phase: Phase::Build,
            short_id: id[..SHORT_ID_LEN].to_string(),
        }));
    }

    #[tokio::test]
    async fn test_creation_warnings_stop_before_start() {
        let engine = MockEngine::new().with_warnings(["low disk space"]);
        let handler = RecordingHandler::new();

        let err = run(&engine, &handler, RunOptions::default()).await.unwrap_err();

        assert!(matches!(err, RunnerError::CreationWarnings { ref warnings, .. } if warnings == &vec!["low disk space".to_string()]));
        assert_eq!(engine.calls(), vec![EngineCall::CreateContainer(spec())]);
        assert!(handler.events().contains(&ProgressEvent::CreationWarnings {
            phase: Phase::Build,
            warnings: vec!["low disk space".to_string()],
        }));
    }

    #[tokio::test]
    async fn test_create_error_fails_the_phase() {
        let engine = MockEngine::new().with_create_error("no such image");
        let handler = RecordingHandler::new();

        let err = run(&engine, &handler, RunOptions::default()).await.unwrap_err();

        assert!(matches!(err, RunnerError::Engine { phase: Phase::Build, .. }));
        assert!(err.to_string().contains("no such image"));
    }

    #[tokio::test]
    async fn test_streaming_emits_lines_and_skips_fetch() {
        let engine = MockEngine::new()
            .with_exit_codes([1])
            .with_log_chunks(["compil", "ing\nlink", "ing\n", "done"]);
        let handler = RecordingHandler::new();
        let options = RunOptions {
            stream_logs: true,
            ..Default::default()
        };

        let result = run(&engine, &handler, options).await.unwrap();

        assert_eq!(handler.log_lines(), vec!["compiling", "linking", "done"]);
        assert_eq!(result.logs.as_deref(), Some("compiling\nlinking\ndone"));
        assert!(!engine
            .calls()
            .iter()
            .any(|call| matches!(call, EngineCall::FetchLogs(_))));
        assert!(handler.events().contains(&ProgressEvent::PhaseFailed {
            phase: Phase::Build,
            exit_code: 1,
            output: None,
        }));
    }

    #[tokio::test]
    async fn test_show_output_fetches_on_success() {
        let engine = MockEngine::new().with_log_chunks(["hi\n"]);
        let handler = RecordingHandler::new();
        let options = RunOptions {
            show_output: true,
            ..Default::default()
        };

        let result = run(&engine, &handler, options).await.unwrap();

        assert_eq!(result.logs.as_deref(), Some("hi\n"));
        assert!(handler.events().contains(&ProgressEvent::PhaseSucceeded {
            phase: Phase::Build,
            output: Some("hi\n".to_string()),
        }));
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("0123456789abcdef"), "0123456789ab");
        assert_eq!(short_id("abc"), "abc");
    }

    #[test]
    fn test_line_buffer_handles_crlf_and_remainder() {
        let mut buffer = LineBuffer::default();
        assert_eq!(buffer.push("a\r\nb"), vec!["a".to_string()]);
        assert_eq!(buffer.push("c\n\n"), vec!["bc".to_string(), String::new()]);
        assert_eq!(buffer.finish(), None);
    }
}
