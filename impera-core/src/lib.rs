//! # impera-core
//!
//! Reusable voice-command dispatch SDK.
//!
//! ## Architecture
//!
//! ```text
//! toggle/start/stop ──► CommandPipeline ◄── CaptureEvent (activity, finished chunk)
//!                            │
//!                  TranscriptionEngine::transcribe
//!                            │
//!            partial segments … then one terminal update
//!                            │
//!        DisplaySurface + Affordance + CommandSink side effects
//! ```
//!
//! The pipeline is a single-owner state machine (Idle → Recording →
//! Processing → Idle). All transitions happen on one logical task; the only
//! suspension point is the outstanding transcription stream, and the state
//! guard (not a lock) keeps it unique. `PipelineDriver` hosts the
//! cooperative `select!` loop so control requests stay responsive while a
//! transcription is in flight.
//!
//! A second, independent command producer lives in [`select`]: an ordered
//! roster of trigger/target bindings scanned once per tick, re-issuing the
//! current movement goal to a [`select::NavigationTarget`] every tick.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod buffering;
pub mod capture;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod select;
pub mod surfaces;
pub mod transcribe;

// Convenience re-exports for downstream crates
pub use dispatch::{
    driver::{ControlRequest, PipelineDriver},
    CommandPipeline, PipelineConfig, PipelineContext,
};
pub use error::ImperaError;
pub use events::{PipelineStatusEvent, RecordingState};
pub use surfaces::{Affordance, CommandSink, DisplaySurface};
pub use transcribe::{
    TranscriptResult, TranscriptSegment, TranscriptionEngine, TranscriptionStream,
    TranscriptionUpdate,
};

#[cfg(feature = "audio-cpal")]
pub use capture::cpal_source::CpalCaptureSource;
