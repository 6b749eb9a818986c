//! Transcription capability.
//!
//! The `TranscriptionEngine` trait decouples the pipeline from any specific
//! speech-to-text backend. A backend receives a finished [`AudioChunk`] and
//! returns one stream of updates: zero or more partial segments followed by
//! exactly one terminal item (a completed result or a failure). Putting the
//! ordering in the stream shape — rather than in timing — is what guarantees
//! every partial is observed before its cycle's result.
//!
//! `&mut self` on `transcribe` expresses that decoders are stateful; the
//! returned stream must be `'static` (own what it needs) so the caller can
//! keep driving the pipeline while the transcription is outstanding.

pub mod stub;

use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::buffering::chunk::AudioChunk;

/// An incomplete, revisable piece of text emitted while transcription is
/// still in progress. Ephemeral: displayed, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptSegment {
    pub text: String,
    /// Whether the backend considers this segment committed.
    pub is_final: bool,
}

/// Terminal output of one transcription cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptResult {
    pub text: String,
    /// Detected language, if the backend reports one.
    pub language: Option<String>,
}

/// One item of a transcription update stream.
#[derive(Debug, Clone)]
pub enum TranscriptionUpdate {
    /// Streaming partial; more updates follow.
    Partial(TranscriptSegment),
    /// Terminal: the cycle succeeded. Last item of the stream.
    Completed(TranscriptResult),
    /// Terminal: the cycle failed. Last item of the stream.
    Failed(String),
}

/// Update stream for one submitted chunk. Ends after its terminal item.
pub type TranscriptionStream = BoxStream<'static, TranscriptionUpdate>;

/// Contract for speech-to-text backends.
pub trait TranscriptionEngine: Send {
    /// Begin transcribing `chunk`. The pipeline enforces that at most one
    /// returned stream is outstanding per pipeline instance.
    fn transcribe(&mut self, chunk: AudioChunk) -> TranscriptionStream;
}
