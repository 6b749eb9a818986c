//! Finished audio handed from a capture source to the dispatch pipeline.

/// A contiguous block of PCM samples captured in one recording cycle.
///
/// Immutable once produced; ownership transfers from the capture source to
/// the pipeline with the capture-finished event.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// f32 samples in [-1.0, 1.0], interleaved if `channels > 1`.
    pub samples: Vec<f32>,
    /// Sample rate in Hz (e.g. 16000, 44100, 48000).
    pub sample_rate: u32,
    /// Channel count; capture sources that mix down report 1.
    pub channels: u16,
}

impl AudioChunk {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    /// Number of sample frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    /// Duration of this chunk in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_accounts_for_channel_count() {
        let mono = AudioChunk::new(vec![0.0; 16_000], 16_000, 1);
        assert!((mono.duration_secs() - 1.0).abs() < 1e-9);

        let stereo = AudioChunk::new(vec![0.0; 16_000], 16_000, 2);
        assert_eq!(stereo.frames(), 8_000);
        assert!((stereo.duration_secs() - 0.5).abs() < 1e-9);
    }
}
