//! Microphone capture source backed by cpal.
//!
//! # Design constraints
//!
//! The cpal input callback runs on an OS audio thread at elevated priority.
//! It **must not** allocate, block on a lock, or perform I/O; it only pushes
//! into the SPSC ring producer (`push_slice` is lock-free).
//!
//! # Threading note
//!
//! `cpal::Stream` is `!Send` on Windows/macOS (COM / CoreAudio thread
//! affinity). The stream is therefore opened *inside* `spawn_blocking` and
//! dropped on that same thread; a sync channel hands the open result (and
//! the device's actual sample rate) back to `start_capture`.
//!
//! The drain side of the ring runs on the same blocking thread: each block
//! feeds the activity gate (voice-activity edges) and is appended to the
//! recording. When the stop flag falls, the remaining samples are drained
//! and the finished [`AudioChunk`] is broadcast.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    SampleFormat, SampleRate, Stream, StreamConfig,
};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use super::{activity::ActivityGate, AudioCaptureSource, CaptureEvent};
use crate::buffering::{create_audio_ring, AudioProducer, Consumer, Producer};
use crate::buffering::chunk::AudioChunk;
use crate::error::{ImperaError, Result};

/// Samples drained from the ring per iteration: 20 ms at 48 kHz.
const DRAIN_BLOCK: usize = 960;

/// Sleep while the ring is empty (avoids busy-waiting a core).
const SLEEP_EMPTY_MS: u64 = 5;

/// Upper bound on one recording; older samples are discarded beyond it.
/// 120 s at 48 kHz — far more than any spoken command.
const MAX_RECORD_SAMPLES: usize = 48_000 * 120;

/// Broadcast capacity for capture events; activity edges are sparse.
const EVENT_CHANNEL_CAP: usize = 64;

/// Capture source reading the system microphone.
pub struct CpalCaptureSource {
    preferred_device: Option<String>,
    gate_threshold: f32,
    gate_hangover_blocks: u32,
    events_tx: broadcast::Sender<CaptureEvent>,
    /// Stop flag for the recording in progress; `None` while idle.
    active: Option<Arc<AtomicBool>>,
}

impl CpalCaptureSource {
    /// Create an idle source. `preferred_device` narrows device selection by
    /// name; `None` uses the default input.
    pub fn new(
        preferred_device: Option<String>,
        gate_threshold: f32,
        gate_hangover_blocks: u32,
    ) -> Self {
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAP);
        Self {
            preferred_device,
            gate_threshold,
            gate_hangover_blocks,
            events_tx,
            active: None,
        }
    }
}

impl AudioCaptureSource for CpalCaptureSource {
    fn start_capture(&mut self) -> Result<()> {
        if self.active.is_some() {
            return Err(ImperaError::AlreadyRecording);
        }

        let (producer, mut consumer) = create_audio_ring();
        let running = Arc::new(AtomicBool::new(true));
        let thread_running = Arc::clone(&running);
        let events = self.events_tx.clone();
        let preferred = self.preferred_device.clone();
        let mut gate = ActivityGate::new(self.gate_threshold, self.gate_hangover_blocks);

        // Sync handshake: the blocking thread reports open success/failure.
        let (open_tx, open_rx) = std::sync::mpsc::channel::<Result<u32>>();

        tokio::task::spawn_blocking(move || {
            // The stream must be opened and dropped on this thread.
            let opened =
                match open_input_stream(producer, Arc::clone(&thread_running), preferred.as_deref())
                {
                    Ok(o) => {
                        let _ = open_tx.send(Ok(o.sample_rate));
                        o
                    }
                    Err(e) => {
                        let _ = open_tx.send(Err(e));
                        thread_running.store(false, Ordering::SeqCst);
                        return;
                    }
                };

            let sample_rate = opened.sample_rate;
            let mut block = vec![0f32; DRAIN_BLOCK];
            let mut recorded: Vec<f32> = Vec::new();

            loop {
                let n = consumer.pop_slice(&mut block);
                if n == 0 {
                    if !thread_running.load(Ordering::Relaxed) {
                        // Stop requested and the ring is drained.
                        break;
                    }
                    std::thread::sleep(Duration::from_millis(SLEEP_EMPTY_MS));
                    continue;
                }

                if let Some(edge) = gate.update(&block[..n]) {
                    let _ = events.send(CaptureEvent::VoiceActivity(edge));
                }
                append_recent(&mut recorded, &block[..n], MAX_RECORD_SAMPLES);
            }

            if gate.is_active() {
                let _ = events.send(CaptureEvent::VoiceActivity(false));
            }

            debug!(
                samples = recorded.len(),
                sample_rate, "capture finished — handing off chunk"
            );
            let _ = events.send(CaptureEvent::Finished(AudioChunk::new(
                recorded,
                sample_rate,
                1,
            )));

            // Stream drops here, releasing the device on this thread.
            drop(opened);
        });

        match open_rx.recv() {
            Ok(Ok(rate)) => {
                info!(sample_rate = rate, "microphone capture started");
                self.active = Some(running);
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(ImperaError::CaptureSource(
                "capture task died before opening the device".into(),
            )),
        }
    }

    fn stop_capture(&mut self) -> Result<()> {
        match self.active.take() {
            Some(flag) => {
                flag.store(false, Ordering::SeqCst);
                info!("microphone capture stop requested");
                Ok(())
            }
            None => Err(ImperaError::NotRecording),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<CaptureEvent> {
        self.events_tx.subscribe()
    }
}

struct OpenedCapture {
    _stream: Stream,
    sample_rate: u32,
}

/// Open an input device (preferred name → default → first available) and
/// start pushing mono f32 frames into `producer`.
fn open_input_stream(
    producer: AudioProducer,
    running: Arc<AtomicBool>,
    preferred_name: Option<&str>,
) -> Result<OpenedCapture> {
    let host = cpal::default_host();

    let mut selected = None;
    if let Some(name) = preferred_name {
        match host.input_devices() {
            Ok(mut devices) => {
                selected = devices.find(|d| d.name().map(|n| n == name).unwrap_or(false));
                if selected.is_none() {
                    warn!("preferred input device '{name}' not found, falling back");
                }
            }
            Err(e) => warn!("failed to list input devices while resolving preference: {e}"),
        }
    }

    let device = if let Some(device) = selected {
        device
    } else if let Some(default) = host.default_input_device() {
        default
    } else {
        let mut devices = host
            .input_devices()
            .map_err(|e| ImperaError::CaptureSource(e.to_string()))?;
        let fallback = devices.next().ok_or_else(|| {
            ImperaError::CaptureSource("no input device available".into())
        })?;
        warn!("no default input device, falling back to first available input");
        fallback
    };

    info!(
        device = device.name().unwrap_or_default().as_str(),
        "opening input device"
    );

    let supported = device
        .default_input_config()
        .map_err(|e| ImperaError::CaptureSource(e.to_string()))?;
    let sample_rate = supported.sample_rate().0;
    let channels = supported.channels() as usize;

    info!(sample_rate, channels, "audio config selected");

    let config = StreamConfig {
        channels: channels as u16,
        sample_rate: SampleRate(sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let err_fn = |err| error!("audio stream error: {err}");

    let stream = match supported.sample_format() {
        SampleFormat::F32 => {
            let mut producer = producer;
            let mut scratch: Vec<f32> = Vec::new();
            let running = Arc::clone(&running);
            device.build_input_stream(
                &config,
                move |data: &[f32], _info| {
                    if !running.load(Ordering::Relaxed) {
                        return;
                    }
                    push_mono(&mut producer, &mut scratch, data.iter().copied(), channels);
                },
                err_fn,
                None,
            )
        }

        SampleFormat::I16 => {
            let mut producer = producer;
            let mut scratch: Vec<f32> = Vec::new();
            let running = Arc::clone(&running);
            device.build_input_stream(
                &config,
                move |data: &[i16], _info| {
                    if !running.load(Ordering::Relaxed) {
                        return;
                    }
                    let samples = data.iter().map(|s| *s as f32 / 32_768.0);
                    push_mono(&mut producer, &mut scratch, samples, channels);
                },
                err_fn,
                None,
            )
        }

        SampleFormat::U8 => {
            let mut producer = producer;
            let mut scratch: Vec<f32> = Vec::new();
            let running = Arc::clone(&running);
            device.build_input_stream(
                &config,
                move |data: &[u8], _info| {
                    if !running.load(Ordering::Relaxed) {
                        return;
                    }
                    let samples = data.iter().map(|s| (*s as f32 - 128.0) / 128.0);
                    push_mono(&mut producer, &mut scratch, samples, channels);
                },
                err_fn,
                None,
            )
        }

        fmt => {
            return Err(ImperaError::CaptureSource(format!(
                "unsupported sample format: {fmt:?}"
            )))
        }
    }
    .map_err(|e| ImperaError::CaptureSource(e.to_string()))?;

    stream
        .play()
        .map_err(|e| ImperaError::CaptureSource(e.to_string()))?;

    Ok(OpenedCapture {
        _stream: stream,
        sample_rate,
    })
}

/// Mix interleaved frames down to mono and push them into the ring.
/// Runs on the audio callback thread: `scratch` is reused, never grown past
/// one callback's frame count after warm-up.
fn push_mono<I>(producer: &mut AudioProducer, scratch: &mut Vec<f32>, samples: I, channels: usize)
where
    I: Iterator<Item = f32>,
{
    scratch.clear();
    if channels <= 1 {
        scratch.extend(samples);
    } else {
        let mut acc = 0f32;
        let mut filled = 0usize;
        for s in samples {
            acc += s;
            filled += 1;
            if filled == channels {
                scratch.push(acc / channels as f32);
                acc = 0.0;
                filled = 0;
            }
        }
    }

    let written = producer.push_slice(scratch);
    if written < scratch.len() {
        warn!(
            "ring buffer full: dropped {} frames",
            scratch.len() - written
        );
    }
}

/// Append `samples`, keeping at most the `max_len` most recent.
fn append_recent(buf: &mut Vec<f32>, samples: &[f32], max_len: usize) {
    if samples.len() >= max_len {
        buf.clear();
        buf.extend_from_slice(&samples[samples.len() - max_len..]);
        return;
    }
    let needed = buf.len().saturating_add(samples.len());
    if needed > max_len {
        buf.drain(..needed - max_len);
    }
    buf.extend_from_slice(samples);
}
