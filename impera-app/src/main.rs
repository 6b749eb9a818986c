//! Impera console host.
//!
//! Wires the dispatch pipeline to a terminal: Enter or `t` toggles
//! recording, digits `0`–`8` press a selection key for the next tick, `c`
//! clears the accumulated text, `q` quits. Dispatched voice orders are
//! logged, and an order that names a configured target re-aims the
//! navigation goal.
//!
//! ## Runtime note
//!
//! Everything runs on a current-thread Tokio runtime: the pipeline driver,
//! the selector tick, stdin handling, and order routing cooperate on one
//! thread. The only OS threads beyond it live inside the cpal capture
//! source.

mod console;
mod settings;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use impera_core::capture::{simulated::SimulatedCaptureSource, AudioCaptureSource};
use impera_core::select::{SelectionBinding, Target, TargetSelector, MAX_TARGETS};
use impera_core::transcribe::stub::StubEngine;
use impera_core::{
    CommandPipeline, ControlRequest, CpalCaptureSource, PipelineConfig, PipelineContext,
    PipelineDriver,
};

use console::{ConsoleBadge, ConsoleDisplay, LoggedNav, OrderSink};
use settings::AppSettings;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings_path = settings::default_settings_path();
    if !settings_path.exists() {
        if let Err(e) = settings::save_settings(&settings_path, &AppSettings::default()) {
            warn!(error = %e, "could not write default settings");
        }
    }
    let settings = settings::load_settings(&settings_path);
    info!(path = %settings_path.display(), "settings loaded");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build runtime")?;
    runtime.block_on(run(settings))
}

async fn run(settings: AppSettings) -> anyhow::Result<()> {
    let capture: Box<dyn AudioCaptureSource> = if settings.simulate_capture {
        info!("using simulated capture source");
        Box::new(SimulatedCaptureSource::new(16_000))
    } else {
        Box::new(CpalCaptureSource::new(
            settings.preferred_input_device.clone(),
            settings.activity_threshold,
            settings.activity_hangover_blocks,
        ))
    };

    let (order_tx, mut order_rx) = mpsc::channel::<String>(16);

    let pipeline = CommandPipeline::new(PipelineContext {
        config: PipelineConfig {
            show_partial_results: settings.show_partial_results,
            append_results: settings.append_results,
        },
        capture: Some(capture),
        engine: Box::new(StubEngine::new()),
        display: Some(Box::new(ConsoleDisplay)),
        affordance: Some(Box::new(ConsoleBadge::default())),
        sink: Some(Box::new(OrderSink::new(order_tx))),
    });
    let mut status_rx = pipeline.subscribe_status();

    let (control_tx, control_rx) = mpsc::channel(16);
    let driver = tokio::spawn(PipelineDriver::new(pipeline, control_rx).run());

    // Keys pressed since the last tick; the selection triggers read it.
    let pressed: Arc<Mutex<HashSet<usize>>> = Arc::new(Mutex::new(HashSet::new()));
    let bindings = settings
        .targets
        .iter()
        .cloned()
        .enumerate()
        .map(|(index, target)| {
            let pressed = Arc::clone(&pressed);
            SelectionBinding::new(move || pressed.lock().contains(&index), target)
        })
        .collect();
    let mut selector = TargetSelector::new(bindings)?;
    let mut nav = LoggedNav::default();

    println!("impera — voice-command dispatch console");
    println!("  enter/t = toggle recording, 0-8 = select target, c = clear, q = quit");
    println!("  ▸ Press button to start recording...");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut tick = tokio::time::interval(Duration::from_millis(settings.tick_interval_ms));

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    Some(input) => {
                        if !handle_input(input.trim(), &control_tx, &pressed).await {
                            break;
                        }
                    }
                    None => break,
                }
            }

            _ = tick.tick() => {
                selector.tick(&mut nav);
                pressed.lock().clear();
            }

            Some(order) = order_rx.recv() => {
                info!(command = %order, "voice order dispatched");
                if let Some(name) = match_target_name(&order, &settings.targets) {
                    if selector.select_by_name(&name) {
                        info!(target = %name, "movement goal set by voice");
                    }
                }
            }

            status = status_rx.recv() => {
                match status {
                    Ok(event) => {
                        if let Some(detail) = event.detail {
                            warn!(state = ?event.state, detail = %detail, "pipeline status");
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => {
                        warn!("pipeline status channel closed");
                        break;
                    }
                }
            }
        }
    }

    drop(control_tx);
    let pipeline = driver.await.context("driver task failed")?;
    let diagnostics = pipeline.diagnostics_snapshot();
    info!(
        starts = diagnostics.starts,
        stops = diagnostics.stops,
        commands_dispatched = diagnostics.commands_dispatched,
        transcription_failures = diagnostics.transcription_failures,
        "session finished"
    );
    Ok(())
}

/// Apply one line of input. Returns false when the session should end.
async fn handle_input(
    input: &str,
    control_tx: &mpsc::Sender<ControlRequest>,
    pressed: &Arc<Mutex<HashSet<usize>>>,
) -> bool {
    match input {
        "" | "t" => {
            let _ = control_tx.send(ControlRequest::Toggle).await;
        }
        "c" => {
            let _ = control_tx.send(ControlRequest::Clear).await;
        }
        "q" => {
            let _ = control_tx.send(ControlRequest::Shutdown).await;
            return false;
        }
        other => match other.parse::<usize>() {
            Ok(index) if index < MAX_TARGETS => {
                pressed.lock().insert(index);
            }
            _ => println!("  ? unrecognized input: {other}"),
        },
    }
    true
}

/// Find the first configured target whose name appears in the order text.
fn match_target_name(order: &str, targets: &[Target]) -> Option<String> {
    let lowered = order.to_lowercase();
    targets
        .iter()
        .map(|t| &t.name)
        .find(|name| lowered.contains(&name.to_lowercase()))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::match_target_name;
    use impera_core::select::{Point, Target};

    fn targets() -> Vec<Target> {
        ["alpha", "bravo"]
            .iter()
            .map(|n| Target {
                name: (*n).into(),
                position: Point::default(),
            })
            .collect()
    }

    #[test]
    fn order_text_matches_target_names_case_insensitively() {
        assert_eq!(
            match_target_name("Move to Bravo now", &targets()).as_deref(),
            Some("bravo")
        );
        assert_eq!(match_target_name("hold position", &targets()), None);
    }
}
