//! End-to-end driver flow: control requests in, dispatched command out.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::sleep;

use impera_core::capture::simulated::SimulatedCaptureSource;
use impera_core::transcribe::stub::StubEngine;
use impera_core::{
    CommandPipeline, CommandSink, ControlRequest, DisplaySurface, PipelineConfig, PipelineContext,
    PipelineDriver, RecordingState,
};

#[derive(Clone, Default)]
struct SharedLog(Arc<Mutex<Vec<String>>>);

impl SharedLog {
    fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

struct LogDisplay(SharedLog);

impl DisplaySurface for LogDisplay {
    fn set_text(&mut self, text: &str) {
        self.0 .0.lock().push(text.to_string());
    }
}

struct LogSink(SharedLog);

impl CommandSink for LogSink {
    fn deliver(&mut self, text: &str) {
        self.0 .0.lock().push(text.to_string());
    }
}

async fn wait_for<F: Fn() -> bool>(condition: F, what: &str) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for {what}");
}

#[tokio::test(flavor = "current_thread")]
async fn toggle_cycle_dispatches_final_transcript_to_sink() {
    let display = SharedLog::default();
    let sink = SharedLog::default();

    let pipeline = CommandPipeline::new(PipelineContext {
        config: PipelineConfig::default(),
        capture: Some(Box::new(SimulatedCaptureSource::new(16_000))),
        engine: Box::new(StubEngine::new()),
        display: Some(Box::new(LogDisplay(display.clone()))),
        affordance: None,
        sink: Some(Box::new(LogSink(sink.clone()))),
    });

    let (control_tx, control_rx) = mpsc::channel(8);
    let driver = tokio::spawn(PipelineDriver::new(pipeline, control_rx).run());

    control_tx.send(ControlRequest::Toggle).await.expect("start");
    // Let the driver observe the start before stopping.
    sleep(Duration::from_millis(10)).await;
    control_tx.send(ControlRequest::Toggle).await.expect("stop");

    let sink_probe = sink.clone();
    wait_for(|| !sink_probe.entries().is_empty(), "sink delivery").await;

    control_tx
        .send(ControlRequest::Shutdown)
        .await
        .expect("shutdown");
    let pipeline = driver.await.expect("driver task");

    assert_eq!(pipeline.state(), RecordingState::Idle);

    let delivered = sink.entries();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0], "[stub: 8000 samples @ 16000 Hz]");

    let shown = display.entries();
    assert!(shown.contains(&"Listening...".to_string()), "{shown:?}");
    assert!(shown.contains(&"Processing...".to_string()), "{shown:?}");
    assert_eq!(shown.last().map(String::as_str), Some("[stub: 8000 samples @ 16000 Hz]"));

    let diagnostics = pipeline.diagnostics_snapshot();
    assert_eq!(diagnostics.starts, 1);
    assert_eq!(diagnostics.stops, 1);
    assert_eq!(diagnostics.chunks_submitted, 1);
    assert_eq!(diagnostics.commands_dispatched, 1);
    assert_eq!(diagnostics.transcription_failures, 0);
}

#[tokio::test(flavor = "current_thread")]
async fn control_requests_stay_responsive_between_cycles() {
    let sink = SharedLog::default();

    let pipeline = CommandPipeline::new(PipelineContext {
        config: PipelineConfig {
            append_results: true,
            ..PipelineConfig::default()
        },
        capture: Some(Box::new(SimulatedCaptureSource::new(16_000))),
        engine: Box::new(StubEngine::new()),
        display: None,
        affordance: None,
        sink: Some(Box::new(LogSink(sink.clone()))),
    });

    let (control_tx, control_rx) = mpsc::channel(8);
    let driver = tokio::spawn(PipelineDriver::new(pipeline, control_rx).run());

    for _ in 0..2 {
        control_tx.send(ControlRequest::Toggle).await.expect("start");
        sleep(Duration::from_millis(10)).await;
        control_tx.send(ControlRequest::Toggle).await.expect("stop");
        sleep(Duration::from_millis(10)).await;
    }

    let sink_probe = sink.clone();
    wait_for(|| sink_probe.entries().len() == 2, "two sink deliveries").await;

    control_tx.send(ControlRequest::Clear).await.expect("clear");
    control_tx
        .send(ControlRequest::Shutdown)
        .await
        .expect("shutdown");
    let pipeline = driver.await.expect("driver task");

    assert_eq!(pipeline.state(), RecordingState::Idle);
    // Clear wiped the accumulation but not the already-dispatched commands.
    assert_eq!(pipeline.accumulated_text(), "");
    assert_eq!(sink.entries().len(), 2);
}
