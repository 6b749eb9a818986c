//! `CommandPipeline` — the voice-command dispatch state machine.
//!
//! ## Lifecycle
//!
//! ```text
//! Idle ──start──► Recording ──stop──► Processing ──terminal──► Idle
//!                     │                    │
//!             voice-activity        partial segments
//!             (affordance blend)    (display, optional)
//! ```
//!
//! One cycle: a start request opens capture; a stop request closes it and
//! waits for the capture-finished chunk; the chunk is submitted to the
//! transcription engine; partial segments update the display; the terminal
//! outcome either dispatches the result text to the command sink (success)
//! or reports an error (failure). Every terminal outcome — success, failure,
//! or a stream that ends without one — returns the pipeline to Idle, so a
//! new recording can always start.
//!
//! Toggle inspects the current state: Idle starts, Recording stops, and
//! Processing ignores the request entirely (no re-entry, no extra capture
//! calls) — the outstanding transcription is guarded by state, not a lock.

pub mod driver;

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use tokio::sync::broadcast;
use tracing::{debug, error, info, trace, warn};

use crate::{
    buffering::chunk::AudioChunk,
    capture::{AudioCaptureSource, CaptureEvent},
    error::{ImperaError, Result},
    events::{PipelineStatusEvent, RecordingState},
    surfaces::{Affordance, CommandSink, DisplaySurface},
    transcribe::{TranscriptResult, TranscriptionEngine, TranscriptionStream, TranscriptionUpdate},
};

/// Status broadcast capacity; state changes are low-volume.
const STATUS_CHANNEL_CAP: usize = 64;

const LISTENING_TEXT: &str = "Listening...";
const PROCESSING_TEXT: &str = "Processing...";
const TRANSCRIPTION_FAILED_TEXT: &str = "Error: transcription failed";
const CAPTURE_UNAVAILABLE_TEXT: &str = "Error: audio capture unavailable";

/// Recognized pipeline options.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Show partial segments on the display while processing. Default: true.
    pub show_partial_results: bool,
    /// Accumulate results (each plus a newline) instead of replacing the
    /// displayed/retained text. Default: false.
    pub append_results: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            show_partial_results: true,
            append_results: false,
        }
    }
}

/// Everything the pipeline needs, passed as one struct so construction
/// stays tidy. Capture, display, affordance, and sink are all optional —
/// absence of any of them is tolerated configuration, not an error.
pub struct PipelineContext {
    pub config: PipelineConfig,
    pub capture: Option<Box<dyn AudioCaptureSource>>,
    pub engine: Box<dyn TranscriptionEngine>,
    pub display: Option<Box<dyn DisplaySurface>>,
    pub affordance: Option<Box<dyn Affordance>>,
    pub sink: Option<Box<dyn CommandSink>>,
}

/// Counters for observability. Shared so hosts can snapshot them while the
/// pipeline runs inside a driver.
#[derive(Default)]
pub struct DispatchDiagnostics {
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
    pub toggles_ignored: AtomicUsize,
    pub chunks_submitted: AtomicUsize,
    pub partials_displayed: AtomicUsize,
    pub commands_dispatched: AtomicUsize,
    pub transcription_failures: AtomicUsize,
    pub clears: AtomicUsize,
}

impl DispatchDiagnostics {
    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            starts: self.starts.load(Ordering::Relaxed),
            stops: self.stops.load(Ordering::Relaxed),
            toggles_ignored: self.toggles_ignored.load(Ordering::Relaxed),
            chunks_submitted: self.chunks_submitted.load(Ordering::Relaxed),
            partials_displayed: self.partials_displayed.load(Ordering::Relaxed),
            commands_dispatched: self.commands_dispatched.load(Ordering::Relaxed),
            transcription_failures: self.transcription_failures.load(Ordering::Relaxed),
            clears: self.clears.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DiagnosticsSnapshot {
    pub starts: usize,
    pub stops: usize,
    pub toggles_ignored: usize,
    pub chunks_submitted: usize,
    pub partials_displayed: usize,
    pub commands_dispatched: usize,
    pub transcription_failures: usize,
    pub clears: usize,
}

/// The dispatch pipeline. Exclusively owns its state and accumulated text;
/// all mutation happens through these handlers on one logical task.
pub struct CommandPipeline {
    config: PipelineConfig,
    state: RecordingState,
    /// Retained text across cycles; reset only by an explicit clear.
    accumulated: String,
    /// Set between chunk submission and the terminal update. Together with
    /// `state` this keeps transcriptions from overlapping.
    awaiting_terminal: bool,
    capture: Option<Box<dyn AudioCaptureSource>>,
    engine: Box<dyn TranscriptionEngine>,
    display: Option<Box<dyn DisplaySurface>>,
    affordance: Option<Box<dyn Affordance>>,
    sink: Option<Box<dyn CommandSink>>,
    status_tx: broadcast::Sender<PipelineStatusEvent>,
    seq: u64,
    diagnostics: Arc<DispatchDiagnostics>,
}

impl CommandPipeline {
    pub fn new(ctx: PipelineContext) -> Self {
        let (status_tx, _) = broadcast::channel(STATUS_CHANNEL_CAP);
        Self {
            config: ctx.config,
            state: RecordingState::Idle,
            accumulated: String::new(),
            awaiting_terminal: false,
            capture: ctx.capture,
            engine: ctx.engine,
            display: ctx.display,
            affordance: ctx.affordance,
            sink: ctx.sink,
            status_tx,
            seq: 0,
            diagnostics: Arc::new(DispatchDiagnostics::default()),
        }
    }

    /// Current state (snapshot).
    pub fn state(&self) -> RecordingState {
        self.state
    }

    /// The retained text. Empty until an accumulating cycle completes or a
    /// replace-mode result is stored.
    pub fn accumulated_text(&self) -> &str {
        &self.accumulated
    }

    /// Subscribe to state-change events.
    pub fn subscribe_status(&self) -> broadcast::Receiver<PipelineStatusEvent> {
        self.status_tx.subscribe()
    }

    /// Subscribe to the configured capture source's events, if any.
    pub fn capture_events(&self) -> Option<broadcast::Receiver<CaptureEvent>> {
        self.capture.as_ref().map(|c| c.subscribe())
    }

    pub fn diagnostics_snapshot(&self) -> DiagnosticsSnapshot {
        self.diagnostics.snapshot()
    }

    /// Toggle: start when Idle, stop when Recording, no-op when Processing.
    pub fn toggle(&mut self) -> Result<()> {
        match self.state {
            RecordingState::Idle => self.start(),
            RecordingState::Recording => self.stop(),
            RecordingState::Processing => {
                self.diagnostics.toggles_ignored.fetch_add(1, Ordering::Relaxed);
                debug!("toggle ignored while a transcription is outstanding");
                Ok(())
            }
        }
    }

    /// Begin a recording cycle.
    ///
    /// # Errors
    /// - `ImperaError::AlreadyRecording` / `ImperaError::StillProcessing`
    ///   when not Idle (state unchanged).
    /// - `ImperaError::CaptureUnavailable` when no source is configured;
    ///   reported on the display, pipeline stays Idle.
    pub fn start(&mut self) -> Result<()> {
        match self.state {
            RecordingState::Recording => return Err(ImperaError::AlreadyRecording),
            RecordingState::Processing => return Err(ImperaError::StillProcessing),
            RecordingState::Idle => {}
        }

        let started = match self.capture.as_mut() {
            None => {
                warn!("start requested without a capture source");
                self.display_text(CAPTURE_UNAVAILABLE_TEXT);
                return Err(ImperaError::CaptureUnavailable);
            }
            Some(capture) => capture.start_capture(),
        };
        if let Err(e) = started {
            warn!(error = %e, "capture failed to start");
            self.display_text(&format!("Error: {e}"));
            return Err(e);
        }

        self.diagnostics.starts.fetch_add(1, Ordering::Relaxed);
        self.set_state(RecordingState::Recording, None);
        self.display_text(LISTENING_TEXT);
        self.set_active_style(true);
        info!("recording started");
        Ok(())
    }

    /// End the recording; the source's capture-finished event follows.
    ///
    /// # Errors
    /// - `ImperaError::NotRecording` when Idle, `ImperaError::StillProcessing`
    ///   when Processing (state unchanged in both cases).
    pub fn stop(&mut self) -> Result<()> {
        match self.state {
            RecordingState::Idle => return Err(ImperaError::NotRecording),
            RecordingState::Processing => return Err(ImperaError::StillProcessing),
            RecordingState::Recording => {}
        }

        let stopped = match self.capture.as_mut() {
            Some(capture) => capture.stop_capture(),
            None => Ok(()),
        };
        self.set_active_style(false);

        match stopped {
            Ok(()) => {
                self.diagnostics.stops.fetch_add(1, Ordering::Relaxed);
                self.set_state(RecordingState::Processing, None);
                self.display_text(PROCESSING_TEXT);
                info!("recording stopped — awaiting transcription");
                Ok(())
            }
            Err(e) => {
                // A source that failed to stop will never hand back a chunk;
                // recover to Idle so the user can retry.
                warn!(error = %e, "capture failed to stop");
                self.set_state(RecordingState::Idle, Some(format!("capture failed to stop: {e}")));
                self.display_text(&format!("Error: {e}"));
                Err(e)
            }
        }
    }

    /// Reset the accumulated text and clear the display. State unchanged.
    pub fn clear(&mut self) {
        self.accumulated.clear();
        self.display_text("");
        self.diagnostics.clears.fetch_add(1, Ordering::Relaxed);
        debug!("accumulated text cleared");
    }

    /// Voice-activity edge from the capture source. Only blends the
    /// affordance while a recording is live.
    pub fn handle_voice_activity(&mut self, speaking: bool) {
        if self.state != RecordingState::Recording {
            return;
        }
        trace!(speaking, "voice activity");
        if let Some(affordance) = self.affordance.as_mut() {
            affordance.set_speech_highlight(speaking);
        }
    }

    /// Capture-finished event: submit the chunk to the transcription engine.
    ///
    /// Returns the update stream to drive, or `None` if the pipeline is not
    /// in a processing cycle (the event is dropped — Processing is only
    /// entered via a stop, never directly).
    pub fn submit_chunk(&mut self, chunk: AudioChunk) -> Option<TranscriptionStream> {
        if self.state != RecordingState::Processing || self.awaiting_terminal {
            warn!(state = ?self.state, "dropping capture-finished event outside a processing cycle");
            return None;
        }
        self.diagnostics.chunks_submitted.fetch_add(1, Ordering::Relaxed);
        debug!(
            samples = chunk.samples.len(),
            sample_rate = chunk.sample_rate,
            channels = chunk.channels,
            "submitting captured audio for transcription"
        );
        self.awaiting_terminal = true;
        Some(self.engine.transcribe(chunk))
    }

    /// Apply one transcription update. Returns `true` when the update was
    /// terminal and the stream should be dropped.
    pub fn apply_update(&mut self, update: TranscriptionUpdate) -> bool {
        match update {
            TranscriptionUpdate::Partial(segment) => {
                if self.state == RecordingState::Processing && self.config.show_partial_results {
                    self.diagnostics.partials_displayed.fetch_add(1, Ordering::Relaxed);
                    trace!(text = %segment.text, "partial segment");
                    let line = format!("{}...", segment.text);
                    self.display_text(&line);
                }
                false
            }
            TranscriptionUpdate::Completed(result) => {
                self.finish_success(result);
                true
            }
            TranscriptionUpdate::Failed(reason) => {
                self.finish_failure(&reason);
                true
            }
        }
    }

    /// The update stream ended. A well-behaved engine terminates it with a
    /// `Completed` or `Failed` item first; if it did not, treat the cycle as
    /// failed so the pipeline cannot stay stuck in Processing.
    pub fn handle_stream_end(&mut self) {
        if self.awaiting_terminal {
            self.finish_failure("transcription ended without a result");
        }
    }

    // ── Internal helpers ─────────────────────────────────────────────────

    fn finish_success(&mut self, result: TranscriptResult) {
        if let Some(language) = &result.language {
            debug!(language = %language, "language detected");
        }
        info!(text = %result.text, "transcription complete");

        let shown = if self.config.append_results {
            self.accumulated.push_str(&result.text);
            self.accumulated.push('\n');
            self.accumulated.clone()
        } else {
            self.accumulated = result.text.clone();
            result.text.clone()
        };
        self.display_text(&shown);

        match self.sink.as_mut() {
            Some(sink) => {
                sink.deliver(&result.text);
                self.diagnostics.commands_dispatched.fetch_add(1, Ordering::Relaxed);
                debug!(text = %result.text, "command delivered to sink");
            }
            None => debug!("no command sink configured — delivery skipped"),
        }

        self.awaiting_terminal = false;
        self.set_state(RecordingState::Idle, None);
    }

    fn finish_failure(&mut self, reason: &str) {
        self.diagnostics.transcription_failures.fetch_add(1, Ordering::Relaxed);
        error!(reason, "transcription failed");
        self.display_text(TRANSCRIPTION_FAILED_TEXT);
        self.awaiting_terminal = false;
        self.set_state(RecordingState::Idle, Some(format!("transcription failed: {reason}")));
    }

    fn set_state(&mut self, new_state: RecordingState, detail: Option<String>) {
        self.state = new_state;
        let seq = self.seq;
        self.seq += 1;
        let _ = self.status_tx.send(PipelineStatusEvent {
            seq,
            state: new_state,
            detail,
        });
    }

    fn display_text(&mut self, text: &str) {
        if let Some(display) = self.display.as_mut() {
            display.set_text(text);
        }
    }

    fn set_active_style(&mut self, active: bool) {
        if let Some(affordance) = self.affordance.as_mut() {
            affordance.set_active_style(active);
        }
    }
}
