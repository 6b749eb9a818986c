//! Outbound capabilities the pipeline drives.
//!
//! All three are fire-and-forget: the pipeline observes no return values,
//! and a missing capability is a configuration state the pipeline tolerates
//! (it skips the call), never an error.

/// Text widget (or any display) the pipeline keeps updated with prompts,
/// partial segments, and results.
pub trait DisplaySurface: Send {
    fn set_text(&mut self, text: &str);
}

/// Visual element whose style reflects pipeline state (e.g. a record
/// button).
pub trait Affordance: Send {
    /// Recording-active vs idle style.
    fn set_active_style(&mut self, active: bool);

    /// Blend toward the highlighted style while speech is detected within a
    /// live recording. Default: no-op, for affordances without a highlight.
    fn set_speech_highlight(&mut self, _highlighted: bool) {}
}

/// Downstream consumer of finished text commands. Delivery failures are not
/// surfaced back to the pipeline.
pub trait CommandSink: Send {
    fn deliver(&mut self, text: &str);
}
