//! Console implementations of the pipeline's outbound capabilities.

use tokio::sync::mpsc;
use tracing::{debug, info, trace};

use impera_core::select::{NavigationTarget, Point};
use impera_core::{Affordance, CommandSink, DisplaySurface};

/// Prints pipeline text to stdout, prefixed so it stands out from log lines.
pub struct ConsoleDisplay;

impl DisplaySurface for ConsoleDisplay {
    fn set_text(&mut self, text: &str) {
        println!("  ▸ {text}");
    }
}

/// Stand-in for a record button: logs style changes instead of recoloring.
#[derive(Default)]
pub struct ConsoleBadge {
    active: bool,
}

impl Affordance for ConsoleBadge {
    fn set_active_style(&mut self, active: bool) {
        self.active = active;
        info!(recording = active, "record indicator updated");
    }

    fn set_speech_highlight(&mut self, highlighted: bool) {
        if self.active {
            debug!(highlighted, "speech highlight");
        }
    }
}

/// Forwards dispatched command text to the host loop. Fire-and-forget: a
/// full queue drops the command; delivery failures are not surfaced back.
pub struct OrderSink {
    tx: mpsc::Sender<String>,
}

impl OrderSink {
    pub fn new(tx: mpsc::Sender<String>) -> Self {
        Self { tx }
    }
}

impl CommandSink for OrderSink {
    fn deliver(&mut self, text: &str) {
        let _ = self.tx.try_send(text.to_string());
    }
}

/// Navigation stand-in: logs issued goals — at info when the goal moves,
/// at trace for the steady per-tick re-issue.
#[derive(Default)]
pub struct LoggedNav {
    last: Option<Point>,
}

impl NavigationTarget for LoggedNav {
    fn move_to(&mut self, point: Point) {
        if self.last != Some(point) {
            info!(x = point.x, y = point.y, z = point.z, "movement goal set");
            self.last = Some(point);
        } else {
            trace!(x = point.x, y = point.y, z = point.z, "movement goal re-issued");
        }
    }
}
