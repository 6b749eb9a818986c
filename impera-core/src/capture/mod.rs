//! Audio capture capability.
//!
//! The pipeline consumes capture as an opaque capability: start, stop, and
//! a subscription to the source's events. Observer registration is a
//! broadcast subscription taken when the pipeline is wired up; dropping the
//! receiver deregisters. There is no global event bus.

pub mod activity;
pub mod simulated;

#[cfg(feature = "audio-cpal")]
pub mod cpal_source;

use tokio::sync::broadcast;

use crate::buffering::chunk::AudioChunk;
use crate::error::Result;

/// Events a capture source emits while (and immediately after) recording.
#[derive(Debug, Clone)]
pub enum CaptureEvent {
    /// Edge-triggered: speech started (`true`) or ended (`false`) inside the
    /// live recording.
    VoiceActivity(bool),
    /// The recording finished; ownership of the chunk moves to the receiver.
    /// Emitted exactly once per start/stop cycle, after `stop_capture`.
    Finished(AudioChunk),
}

/// Contract for audio capture backends.
///
/// Implementations may run their own threads internally (a real microphone
/// callback, for instance); that concurrency is opaque to the pipeline.
pub trait AudioCaptureSource: Send {
    /// Begin recording.
    ///
    /// # Errors
    /// - `ImperaError::AlreadyRecording` if a recording is active.
    /// - `ImperaError::CaptureSource` if the device cannot be opened.
    fn start_capture(&mut self) -> Result<()>;

    /// Stop recording. A `CaptureEvent::Finished` carrying the recorded
    /// chunk follows on the event channel.
    ///
    /// # Errors
    /// - `ImperaError::NotRecording` if no recording is active.
    fn stop_capture(&mut self) -> Result<()>;

    /// Subscribe to this source's events.
    fn subscribe(&self) -> broadcast::Receiver<CaptureEvent>;
}
