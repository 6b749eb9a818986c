//! `StubEngine` — placeholder backend that echoes chunk metadata without
//! real inference. Lets the full dispatch pipeline be exercised end-to-end
//! before a real speech backend is wired in.

use futures_util::stream::{self, StreamExt};
use tracing::debug;

use super::{
    TranscriptResult, TranscriptSegment, TranscriptionEngine, TranscriptionStream,
    TranscriptionUpdate,
};
use crate::buffering::chunk::AudioChunk;

/// Echo-style stub engine.
///
/// For every chunk of non-trivial length it streams:
/// 1. one partial segment (simulates streaming latency), then
/// 2. a final result: `"[stub: <N> samples @ <SR> Hz]"`.
///
/// Chunks under 10 ms fail the cycle, exercising the error path.
pub struct StubEngine {
    utterance_count: u32,
}

impl StubEngine {
    pub fn new() -> Self {
        Self { utterance_count: 0 }
    }
}

impl Default for StubEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TranscriptionEngine for StubEngine {
    fn transcribe(&mut self, chunk: AudioChunk) -> TranscriptionStream {
        if chunk.frames() < (chunk.sample_rate / 100) as usize {
            debug!(frames = chunk.frames(), "stub: chunk too short");
            return stream::iter(vec![TranscriptionUpdate::Failed(
                "audio too short to transcribe".into(),
            )])
            .boxed();
        }

        self.utterance_count += 1;
        debug!(utterance = self.utterance_count, "stub transcription");

        let updates = vec![
            TranscriptionUpdate::Partial(TranscriptSegment {
                text: "\u{2026}".to_string(),
                is_final: false,
            }),
            TranscriptionUpdate::Completed(TranscriptResult {
                text: format!(
                    "[stub: {} samples @ {} Hz]",
                    chunk.samples.len(),
                    chunk.sample_rate
                ),
                language: None,
            }),
        ];
        stream::iter(updates).boxed()
    }
}
