//! Cooperative event loop hosting a [`CommandPipeline`].
//!
//! One `select!` loop multiplexes three inputs:
//!
//! 1. control requests (toggle/start/stop/clear) from the host,
//! 2. the capture source's events (voice activity, finished chunk),
//! 3. the outstanding transcription stream, when one exists.
//!
//! The transcription suspension point therefore never blocks control
//! handling: a toggle arriving while a transcription is outstanding is
//! observed immediately and ignored by the state machine. At most one
//! stream is held at a time; there is no cancel — the loop drives a stream
//! to its terminal item before a new recording can produce another.

use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};

use futures_util::StreamExt;

use super::CommandPipeline;
use crate::capture::CaptureEvent;
use crate::transcribe::{TranscriptionStream, TranscriptionUpdate};

/// Host-issued requests, typically wired to a key or UI button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlRequest {
    Toggle,
    Start,
    Stop,
    Clear,
    Shutdown,
}

/// Runs the pipeline until the control channel closes or `Shutdown` arrives.
pub struct PipelineDriver {
    pipeline: CommandPipeline,
    control_rx: mpsc::Receiver<ControlRequest>,
}

impl PipelineDriver {
    pub fn new(pipeline: CommandPipeline, control_rx: mpsc::Receiver<ControlRequest>) -> Self {
        Self {
            pipeline,
            control_rx,
        }
    }

    /// Drive the pipeline. Returns it on shutdown so the host can inspect
    /// final state and diagnostics.
    pub async fn run(mut self) -> CommandPipeline {
        let mut capture_rx = self.pipeline.capture_events();
        let mut outstanding: Option<TranscriptionStream> = None;

        info!("pipeline driver started");
        loop {
            tokio::select! {
                request = self.control_rx.recv() => {
                    match request {
                        Some(ControlRequest::Toggle) => {
                            if let Err(e) = self.pipeline.toggle() {
                                warn!(error = %e, "toggle rejected");
                            }
                        }
                        Some(ControlRequest::Start) => {
                            if let Err(e) = self.pipeline.start() {
                                warn!(error = %e, "start rejected");
                            }
                        }
                        Some(ControlRequest::Stop) => {
                            if let Err(e) = self.pipeline.stop() {
                                warn!(error = %e, "stop rejected");
                            }
                        }
                        Some(ControlRequest::Clear) => self.pipeline.clear(),
                        Some(ControlRequest::Shutdown) | None => break,
                    }
                }

                event = recv_capture(&mut capture_rx) => {
                    match event {
                        Some(CaptureEvent::VoiceActivity(speaking)) => {
                            self.pipeline.handle_voice_activity(speaking);
                        }
                        Some(CaptureEvent::Finished(chunk)) => {
                            if outstanding.is_some() {
                                warn!("capture finished while a transcription is outstanding — dropped");
                            } else {
                                outstanding = self.pipeline.submit_chunk(chunk);
                            }
                        }
                        None => {
                            // Source gone; stop listening for its events.
                            capture_rx = None;
                        }
                    }
                }

                update = next_update(&mut outstanding), if outstanding.is_some() => {
                    match update {
                        Some(update) => {
                            if self.pipeline.apply_update(update) {
                                outstanding = None;
                            }
                        }
                        None => {
                            self.pipeline.handle_stream_end();
                            outstanding = None;
                        }
                    }
                }
            }
        }
        info!("pipeline driver stopped");
        self.pipeline
    }
}

async fn recv_capture(
    rx: &mut Option<broadcast::Receiver<CaptureEvent>>,
) -> Option<CaptureEvent> {
    match rx.as_mut() {
        Some(receiver) => loop {
            match receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "capture event subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        },
        None => std::future::pending().await,
    }
}

async fn next_update(
    outstanding: &mut Option<TranscriptionStream>,
) -> Option<TranscriptionUpdate> {
    match outstanding.as_mut() {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}
