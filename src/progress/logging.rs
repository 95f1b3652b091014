//! Logging-based progress handler

use super::{ProgressEvent, ProgressHandler};
use std::fmt;
use std::io::{self, Write};
use std::sync::Mutex;
use tracing::{debug, error, info, trace, warn};

/// Handler that reports progress through `tracing`
///
/// berth's own messages go through `tracing` (stderr). Container output is
/// written verbatim to a separate writer, stdout unless
/// [`LoggingHandler::with_writer`] says otherwise.
pub struct LoggingHandler {
    output: Mutex<Box<dyn Write + Send>>,
}

impl LoggingHandler {
    pub fn new() -> Self {
        Self::with_writer(io::stdout())
    }

    /// Sends container output to `writer` instead of stdout
    pub fn with_writer<W>(writer: W) -> Self
    where
        W: Write + Send + 'static,
    {
        Self {
            output: Mutex::new(Box::new(writer)),
        }
    }

    fn write_output(&self, text: &str) {
        let Ok(mut output) = self.output.lock() else {
            warn!("Container output writer is poisoned, dropping output");
            return;
        };
        let result = if text.ends_with('\n') {
            output.write_all(text.as_bytes())
        } else {
            writeln!(output, "{}", text)
        };
        if let Err(e) = result.and_then(|_| output.flush()) {
            debug!("Failed to write container output: {}", e);
        }
    }
}

impl Default for LoggingHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LoggingHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggingHandler").finish_non_exhaustive()
    }
}

impl ProgressHandler for LoggingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::PhaseStarted { phase } => {
                info!("{}", phase.start_message());
            }
            ProgressEvent::PhaseSkipped { phase, reason } => {
                debug!(%phase, "{}", reason);
            }
            ProgressEvent::ScriptWritten { path } => {
                debug!(path = %path.display(), "Wrote temporary build script");
            }
            ProgressEvent::ScriptRemoved { path } => {
                debug!(path = %path.display(), "Removed temporary build script");
            }
            ProgressEvent::ContainerCreated {
                phase,
                container_id,
            } => {
                trace!(%phase, container = %container_id, "Created {}", phase.container_label());
            }
            ProgressEvent::CreationWarnings { phase, warnings } => {
                error!(
                    "We got a warning when creating the {}: {:?}",
                    phase.container_label(),
                    warnings
                );
            }
            ProgressEvent::ContainerStarted { phase } => {
                debug!(%phase, "The {} started", phase.container_label());
            }
            ProgressEvent::LogLine { line, .. } => {
                self.write_output(line);
            }
            ProgressEvent::ContainerExited {
                phase,
                exit_code,
                elapsed,
            } => {
                debug!(
                    %phase,
                    exit_code,
                    "The {} has stopped after {:.1} seconds",
                    phase.container_label(),
                    elapsed.as_secs_f64()
                );
            }
            ProgressEvent::PhaseSucceeded { phase, output } => {
                info!("{}", phase.success_message());
                if let Some(output) = output {
                    self.write_output(output);
                }
            }
            ProgressEvent::PhaseFailed {
                phase,
                exit_code,
                output,
            } => match output {
                Some(output) => {
                    error!(
                        "{} failed with exit code: {}. Output follows:",
                        phase.failure_subject(),
                        exit_code
                    );
                    self.write_output(output);
                }
                None => {
                    error!(
                        "{} failed with exit code: {}.",
                        phase.failure_subject(),
                        exit_code
                    );
                }
            },
            ProgressEvent::ContainerKept { phase, short_id } => {
                info!("Keeping {} (ID: {})", phase.container_label(), short_id);
            }
            ProgressEvent::ContainerRemoved { phase } => {
                debug!("Removed {}", phase.container_label());
            }
            ProgressEvent::Completed => {
                info!("Done!");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Phase;
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_logging_handler_accepts_every_event() {
        let handler = LoggingHandler::with_writer(io::sink());
        let events = vec![
            ProgressEvent::PhaseStarted { phase: Phase::Build },
            ProgressEvent::LogLine {
                phase: Phase::Build,
                line: "compiling".to_string(),
            },
            ProgressEvent::ContainerExited {
                phase: Phase::Build,
                exit_code: 2,
                elapsed: Duration::from_secs(3),
            },
            ProgressEvent::PhaseFailed {
                phase: Phase::Build,
                exit_code: 2,
                output: Some("boom\n".to_string()),
            },
            ProgressEvent::ContainerKept {
                phase: Phase::Build,
                short_id: "c0ffee000000".to_string(),
            },
            ProgressEvent::Completed,
        ];

        for event in &events {
            handler.on_progress(event);
        }
    }

    #[test]
    fn test_container_output_is_written_verbatim() {
        let buffer = SharedBuffer::default();
        let handler = LoggingHandler::with_writer(buffer.clone());

        handler.on_progress(&ProgressEvent::PhaseStarted { phase: Phase::Build });
        handler.on_progress(&ProgressEvent::LogLine {
            phase: Phase::Build,
            line: "CONTAINER-LINE".to_string(),
        });
        handler.on_progress(&ProgressEvent::PhaseFailed {
            phase: Phase::Build,
            exit_code: 2,
            output: Some("first\nsecond\n".to_string()),
        });
        handler.on_progress(&ProgressEvent::Completed);

        assert_eq!(buffer.contents(), "CONTAINER-LINE\nfirst\nsecond\n");
    }

    #[test]
    fn test_successful_output_gets_a_trailing_newline() {
        let buffer = SharedBuffer::default();
        let handler = LoggingHandler::with_writer(buffer.clone());

        handler.on_progress(&ProgressEvent::PhaseSucceeded {
            phase: Phase::Package,
            output: Some("Created package".to_string()),
        });
        handler.on_progress(&ProgressEvent::PhaseSucceeded {
            phase: Phase::Build,
            output: None,
        });

        assert_eq!(buffer.contents(), "Created package\n");
    }
}
