//! Persistent application settings (JSON file in the user config directory).

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use impera_core::select::{Point, Target, MAX_TARGETS};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct AppSettings {
    /// Show partial transcription segments while processing.
    pub show_partial_results: bool,
    /// Accumulate results instead of replacing the displayed text.
    pub append_results: bool,
    /// Use the synthesized capture source instead of a microphone.
    pub simulate_capture: bool,
    /// Input device name; `None` uses the system default.
    pub preferred_input_device: Option<String>,
    /// RMS threshold for the voice-activity gate.
    pub activity_threshold: f32,
    /// Silent blocks absorbed before the gate reports speech ended.
    pub activity_hangover_blocks: u32,
    /// Selector tick period in milliseconds.
    pub tick_interval_ms: u64,
    /// Ordered roster of selectable movement targets (at most nine).
    pub targets: Vec<Target>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            show_partial_results: true,
            append_results: false,
            simulate_capture: false,
            preferred_input_device: None,
            activity_threshold: 0.02,
            activity_hangover_blocks: 8,
            tick_interval_ms: 100,
            targets: default_targets(),
        }
    }
}

fn default_targets() -> Vec<Target> {
    vec![
        Target {
            name: "alpha".into(),
            position: Point::new(12.0, 0.0, 4.0),
        },
        Target {
            name: "bravo".into(),
            position: Point::new(-6.0, 0.0, 18.0),
        },
        Target {
            name: "charlie".into(),
            position: Point::new(3.0, 0.0, -9.0),
        },
    ]
}

impl AppSettings {
    pub fn normalize(&mut self) {
        self.activity_threshold = self.activity_threshold.clamp(0.001, 0.5);
        self.activity_hangover_blocks = self.activity_hangover_blocks.min(64);
        self.tick_interval_ms = self.tick_interval_ms.clamp(16, 1000);
        self.preferred_input_device = self
            .preferred_input_device
            .as_ref()
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        for target in &mut self.targets {
            target.name = target.name.trim().to_string();
        }
        self.targets.retain(|t| !t.name.is_empty());
        self.targets.truncate(MAX_TARGETS);
    }
}

pub fn default_settings_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("impera")
        .join("settings.json")
}

/// Load settings from `path`, falling back to defaults on a missing or
/// unreadable file. The result is always normalized.
pub fn load_settings(path: &Path) -> AppSettings {
    let mut settings: AppSettings = fs::read_to_string(path)
        .ok()
        .and_then(|raw| serde_json::from_str(&raw).ok())
        .unwrap_or_default();
    settings.normalize();
    settings
}

pub fn save_settings(path: &Path, settings: &AppSettings) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(settings)?)?;
    Ok(())
}
