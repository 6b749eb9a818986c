//! Deterministic capture source for hosts without a microphone.
//!
//! Emits a speech edge on start, and on stop a falling edge followed by a
//! synthesized tone chunk. Used by the demo host's `--simulate` mode and by
//! integration tests that need a full capture cycle without audio hardware.

use std::f32::consts::TAU;

use tokio::sync::broadcast;

use super::{AudioCaptureSource, CaptureEvent};
use crate::buffering::chunk::AudioChunk;
use crate::error::{ImperaError, Result};

const EVENT_CHANNEL_CAP: usize = 16;

/// Scripted stand-in for a real microphone.
pub struct SimulatedCaptureSource {
    sample_rate: u32,
    tone_hz: f32,
    tone_secs: f32,
    events_tx: broadcast::Sender<CaptureEvent>,
    recording: bool,
}

impl SimulatedCaptureSource {
    pub fn new(sample_rate: u32) -> Self {
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAP);
        Self {
            sample_rate,
            tone_hz: 440.0,
            tone_secs: 0.5,
            events_tx,
            recording: false,
        }
    }

    fn synthesize(&self) -> AudioChunk {
        let n = (self.sample_rate as f32 * self.tone_secs) as usize;
        let samples = (0..n)
            .map(|i| (TAU * self.tone_hz * i as f32 / self.sample_rate as f32).sin() * 0.25)
            .collect();
        AudioChunk::new(samples, self.sample_rate, 1)
    }
}

impl AudioCaptureSource for SimulatedCaptureSource {
    fn start_capture(&mut self) -> Result<()> {
        if self.recording {
            return Err(ImperaError::AlreadyRecording);
        }
        self.recording = true;
        let _ = self.events_tx.send(CaptureEvent::VoiceActivity(true));
        Ok(())
    }

    fn stop_capture(&mut self) -> Result<()> {
        if !self.recording {
            return Err(ImperaError::NotRecording);
        }
        self.recording = false;
        let _ = self.events_tx.send(CaptureEvent::VoiceActivity(false));
        let _ = self.events_tx.send(CaptureEvent::Finished(self.synthesize()));
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<CaptureEvent> {
        self.events_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_activity_edges_and_one_finished_chunk() {
        let mut source = SimulatedCaptureSource::new(16_000);
        let mut rx = source.subscribe();

        source.start_capture().expect("start");
        source.stop_capture().expect("stop");

        assert!(matches!(
            rx.try_recv().expect("rising edge"),
            CaptureEvent::VoiceActivity(true)
        ));
        assert!(matches!(
            rx.try_recv().expect("falling edge"),
            CaptureEvent::VoiceActivity(false)
        ));
        match rx.try_recv().expect("finished chunk") {
            CaptureEvent::Finished(chunk) => {
                assert_eq!(chunk.sample_rate, 16_000);
                assert_eq!(chunk.channels, 1);
                assert_eq!(chunk.samples.len(), 8_000);
            }
            other => panic!("expected Finished, got {other:?}"),
        }
    }

    #[test]
    fn double_start_is_rejected() {
        let mut source = SimulatedCaptureSource::new(16_000);
        source.start_capture().expect("start");
        assert!(matches!(
            source.start_capture(),
            Err(ImperaError::AlreadyRecording)
        ));
    }

    #[test]
    fn stop_without_start_is_rejected() {
        let mut source = SimulatedCaptureSource::new(16_000);
        assert!(matches!(
            source.stop_capture(),
            Err(ImperaError::NotRecording)
        ));
    }
}
