// tests/session_integration.rs
//! End-to-end capture sessions against the simulated armband

use emg_capture::acquisition::{GestureClass, Phase, SensorFrame, SessionConfig};
use emg_capture::config::DeviceSettings;
use emg_capture::export::{
    CsvExporter, ExportDestination, ExportError, ExportSummary, Exporter,
};
use emg_capture::hal::simulator::{MetadataField, SimulatedArmband, SimulatorConfig};
use emg_capture::presenter::{GesturePrompt, Presenter};
use emg_capture::session::SessionManager;
use emg_capture::{CaptureError, StreamingMode};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const ADDRESS: &str = "D4:2A:11:00:BE:EF";

/// Keeps every batch it is handed instead of writing files
#[derive(Default)]
struct RecordingExporter {
    batches: Mutex<Vec<Vec<SensorFrame>>>,
    fail: bool,
}

impl RecordingExporter {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    fn calls(&self) -> usize {
        self.batches.lock().len()
    }
}

impl Exporter for RecordingExporter {
    fn write(
        &self,
        frames: &[SensorFrame],
        destination: &ExportDestination,
    ) -> Result<ExportSummary, ExportError> {
        self.batches.lock().push(frames.to_vec());
        if self.fail {
            return Err(ExportError::InvalidDestination("disk full".to_string()));
        }
        Ok(ExportSummary {
            path: destination.path_with_extension("csv"),
            rows: frames.len(),
            labeled_rows: frames.iter().filter(|f| f.label.is_some()).count(),
        })
    }
}

#[derive(Default)]
struct CountingPresenter {
    prompts: Mutex<Vec<(String, u32)>>,
    finished: AtomicUsize,
}

impl Presenter for CountingPresenter {
    fn announce(&self, prompt: &GesturePrompt) {
        self.prompts
            .lock()
            .push((prompt.class.name.clone(), prompt.repetition));
    }

    fn finished(&self, _frames: usize) {
        self.finished.fetch_add(1, Ordering::SeqCst);
    }
}

fn fist_open_config() -> SessionConfig {
    SessionConfig {
        classes: vec![GestureClass::new(0, "fist"), GestureClass::new(1, "open")],
        repetitions_per_class: 2,
        prepare_duration: Duration::from_secs(3),
        record_duration: Duration::from_secs(5),
        pause_duration: Duration::from_secs(1),
    }
}

fn short_config() -> SessionConfig {
    SessionConfig {
        classes: vec![GestureClass::new(7, "pinch")],
        repetitions_per_class: 1,
        prepare_duration: Duration::from_millis(500),
        record_duration: Duration::from_secs(1),
        pause_duration: Duration::from_millis(500),
    }
}

fn simulator(config: SimulatorConfig) -> SimulatedArmband {
    SimulatedArmband::new(SimulatorConfig {
        address: ADDRESS.to_string(),
        ..config
    })
    .unwrap()
}

fn device_settings() -> DeviceSettings {
    DeviceSettings {
        address: ADDRESS.to_string(),
        ..DeviceSettings::default()
    }
}

fn destination() -> ExportDestination {
    ExportDestination::new("data", "session_test")
}

#[tokio::test(start_paused = true)]
async fn test_fist_open_session_exports_every_frame_once() {
    let armband = simulator(SimulatorConfig::default());
    let stats = armband.stats();
    let manager = SessionManager::new(armband, device_settings());
    let exporter = RecordingExporter::default();
    let presenter = CountingPresenter::default();

    let outcome = manager
        .run(
            fist_open_config(),
            &exporter,
            &destination(),
            &presenter,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    // one export with the whole buffer
    assert_eq!(exporter.calls(), 1);
    let frames = exporter.batches.lock()[0].clone();
    assert_eq!(frames.len(), outcome.frames_captured);
    assert_eq!(outcome.frames_captured as u64, outcome.ingest_invocations);
    assert_eq!(outcome.late_frames, 0);
    // 36 s at 50 Hz
    assert!(frames.len() >= 1_750, "only {} frames", frames.len());

    // prepare and pause frames are exported too
    assert!(frames.iter().any(|f| f.label.is_none()));
    assert!(frames.iter().any(|f| f.label == Some(0)));
    assert!(frames.iter().any(|f| f.label == Some(1)));

    let windows: Vec<(u32, u32)> = outcome
        .phases
        .iter()
        .filter(|p| p.phase == Phase::Record)
        .map(|p| (p.class_id, p.repetition))
        .collect();
    assert_eq!(windows, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);

    let prompts = presenter.prompts.lock().clone();
    assert_eq!(prompts.len(), 4);
    assert_eq!(presenter.finished.load(Ordering::SeqCst), 1);

    assert_eq!(stats.opens(), 1);
    assert_eq!(stats.closes(), 1);
    assert_eq!(outcome.metadata.name.as_deref(), Some("Simulated Armband"));
    assert_eq!(
        outcome.metadata.info.as_deref(),
        Some("simulated armband, 8 EMG channels")
    );
    assert!(outcome.auxiliary_notifications);
}

#[tokio::test(start_paused = true)]
async fn test_frames_carry_the_label_of_their_phase() {
    let manager = SessionManager::new(simulator(SimulatorConfig::default()), device_settings());
    let exporter = RecordingExporter::default();
    let config = fist_open_config();
    let catalog: Vec<u32> = config.classes.iter().map(|c| c.id).collect();

    let outcome = manager
        .run(
            config,
            &exporter,
            &destination(),
            &CountingPresenter::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    let frames = exporter.batches.lock()[0].clone();

    for frame in &frames {
        if let Some(label) = frame.label {
            assert!(catalog.contains(&label));
        }
        if let Some(phase) = outcome.phases.iter().find(|p| p.contains(frame.received_at)) {
            match phase.phase {
                Phase::Record => assert_eq!(frame.label, Some(phase.class_id)),
                Phase::Prepare | Phase::Pause => assert_eq!(frame.label, None),
            }
        }
    }

    // 1 s into fist-0's record window
    let fist_0 = outcome
        .phases
        .iter()
        .find(|p| p.phase == Phase::Record && p.class_id == 0 && p.repetition == 0)
        .unwrap();
    let checkpoint = fist_0.started_at + Duration::from_secs(1);
    let near: Vec<&SensorFrame> = frames
        .iter()
        .filter(|f| f.received_at >= checkpoint && f.received_at < checkpoint + Duration::from_millis(100))
        .collect();
    assert!(!near.is_empty());
    assert!(near.iter().all(|f| f.label == Some(0)));
}

#[tokio::test(start_paused = true)]
async fn test_unsupported_notifications_still_export() {
    let armband = simulator(SimulatorConfig {
        auxiliary_notifications_supported: false,
        ..SimulatorConfig::default()
    });
    let stats = armband.stats();
    let manager = SessionManager::new(armband, device_settings());
    let exporter = RecordingExporter::default();

    let outcome = manager
        .run(
            short_config(),
            &exporter,
            &destination(),
            &CountingPresenter::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(!outcome.auxiliary_notifications);
    assert_eq!(exporter.calls(), 1);
    assert!(outcome.export.labeled_rows > 0);
    assert_eq!(stats.closes(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_metadata_failures_are_not_fatal() {
    let manager = SessionManager::new(
        simulator(SimulatorConfig {
            failing_metadata: vec![
                MetadataField::Battery,
                MetadataField::Firmware,
                MetadataField::Info,
            ],
            ..SimulatorConfig::default()
        }),
        device_settings(),
    );
    let exporter = RecordingExporter::default();

    let outcome = manager
        .run(
            short_config(),
            &exporter,
            &destination(),
            &CountingPresenter::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.metadata.name.as_deref(), Some("Simulated Armband"));
    assert_eq!(outcome.metadata.battery_percent, None);
    assert_eq!(outcome.metadata.firmware, None);
    assert_eq!(outcome.metadata.info, None);
    assert_eq!(exporter.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_address_allocates_nothing() {
    let armband = simulator(SimulatorConfig::default());
    let stats = armband.stats();
    let manager = SessionManager::new(
        armband,
        DeviceSettings {
            address: "AA:AA:AA:AA:AA:AA".to_string(),
            ..DeviceSettings::default()
        },
    );
    let exporter = RecordingExporter::default();

    let result = manager
        .run(
            short_config(),
            &exporter,
            &destination(),
            &CountingPresenter::default(),
            &CancellationToken::new(),
        )
        .await;

    assert!(matches!(result, Err(CaptureError::DeviceNotFound { .. })));
    assert_eq!(stats.opens(), 0);
    assert_eq!(stats.closes(), 0);
    assert_eq!(exporter.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_discovery_gives_up_at_timeout() {
    let manager = SessionManager::new(
        simulator(SimulatorConfig {
            discovery_latency_ms: 60_000,
            ..SimulatorConfig::default()
        }),
        device_settings(),
    );

    let started = tokio::time::Instant::now();
    let result = manager.connect(ADDRESS).await;

    assert!(matches!(
        result,
        Err(CaptureError::DeviceNotFound { timeout, .. }) if timeout == Duration::from_secs(10)
    ));
    let waited = started.elapsed();
    assert!(waited >= Duration::from_secs(10) && waited < Duration::from_millis(10_050));
}

#[tokio::test(start_paused = true)]
async fn test_activation_failure_still_closes_once() {
    let armband = simulator(SimulatorConfig {
        fail_streaming_activation: true,
        ..SimulatorConfig::default()
    });
    let stats = armband.stats();
    let manager = SessionManager::new(armband, device_settings());
    let exporter = RecordingExporter::default();

    let result = manager
        .run(
            short_config(),
            &exporter,
            &destination(),
            &CountingPresenter::default(),
            &CancellationToken::new(),
        )
        .await;

    assert!(matches!(result, Err(CaptureError::Link { .. })));
    assert_eq!(stats.opens(), 1);
    assert_eq!(stats.closes(), 1);
    assert_eq!(exporter.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_closes_without_export() {
    let armband = simulator(SimulatorConfig::default());
    let stats = armband.stats();
    let manager = SessionManager::new(armband, device_settings());
    let exporter = RecordingExporter::default();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(10)).await;
        trigger.cancel();
    });

    let result = manager
        .run(
            fist_open_config(),
            &exporter,
            &destination(),
            &CountingPresenter::default(),
            &cancel,
        )
        .await;

    assert!(matches!(result, Err(CaptureError::Cancelled { .. })));
    assert_eq!(stats.closes(), 1);
    assert_eq!(exporter.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_oversized_session_can_be_cancelled() {
    let armband = simulator(SimulatorConfig::default());
    let stats = armband.stats();
    let manager = SessionManager::new(armband, device_settings());
    let exporter = RecordingExporter::default();

    let config = SessionConfig {
        repetitions_per_class: u32::MAX,
        prepare_duration: Duration::MAX,
        record_duration: Duration::from_millis(u64::MAX / 4),
        pause_duration: Duration::MAX,
        ..fist_open_config()
    };
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        trigger.cancel();
    });

    let result = manager
        .run(
            config,
            &exporter,
            &destination(),
            &CountingPresenter::default(),
            &cancel,
        )
        .await;

    assert!(matches!(result, Err(CaptureError::Cancelled { .. })));
    assert_eq!(stats.closes(), 1);
    assert_eq!(exporter.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_export_failure_returns_frames() {
    let armband = simulator(SimulatorConfig::default());
    let stats = armband.stats();
    let manager = SessionManager::new(armband, device_settings());
    let exporter = RecordingExporter::failing();

    let result = manager
        .run(
            short_config(),
            &exporter,
            &destination(),
            &CountingPresenter::default(),
            &CancellationToken::new(),
        )
        .await;

    match result {
        Err(CaptureError::Export { frames, .. }) => {
            assert!(!frames.is_empty());
            assert_eq!(frames.len(), exporter.batches.lock()[0].len());
        }
        other => panic!("expected export error, got {:?}", other.map(|o| o.frames_captured)),
    }
    assert_eq!(exporter.calls(), 1);
    assert_eq!(stats.closes(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_session_config_fails_before_connecting() {
    let armband = simulator(SimulatorConfig::default());
    let stats = armband.stats();
    let manager = SessionManager::new(armband, device_settings());

    let mut config = short_config();
    config.repetitions_per_class = 0;
    let result = manager
        .run(
            config,
            &RecordingExporter::default(),
            &destination(),
            &CountingPresenter::default(),
            &CancellationToken::new(),
        )
        .await;

    assert!(matches!(result, Err(CaptureError::Configuration { .. })));
    assert_eq!(stats.opens(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_aborted_session_is_closed_on_drop() {
    let armband = simulator(SimulatorConfig::default());
    let stats = armband.stats();
    let manager = SessionManager::new(armband, device_settings());

    let task = tokio::spawn(async move {
        let exporter = RecordingExporter::default();
        let presenter = CountingPresenter::default();
        manager
            .run(
                fist_open_config(),
                &exporter,
                &destination(),
                &presenter,
                &CancellationToken::new(),
            )
            .await
            .map(|outcome| outcome.frames_captured)
    });

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(stats.opens(), 1);
    task.abort();
    assert!(task.await.unwrap_err().is_cancelled());

    for _ in 0..5 {
        tokio::task::yield_now().await;
    }
    assert_eq!(stats.closes(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_streaming_mode_is_configurable() {
    let armband = simulator(SimulatorConfig::default());
    let stats = armband.stats();
    let manager = SessionManager::new(
        armband,
        DeviceSettings {
            streaming_mode: StreamingMode::EmgRaw,
            ..device_settings()
        },
    );

    let handle = manager.connect(ADDRESS).await.unwrap();
    let mut active = manager.open(&handle).await.unwrap();
    manager
        .activate_streaming(&mut active, StreamingMode::EmgRaw)
        .await
        .unwrap();
    assert!(active.is_streaming());

    let rejected = manager.activate_streaming(&mut active, StreamingMode::Off).await;
    assert!(matches!(rejected, Err(CaptureError::Configuration { .. })));

    active.close().await.unwrap();
    assert_eq!(stats.mode_changes(), 2);
    assert_eq!(stats.closes(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_csv_export_of_a_real_session() {
    let dir = tempfile::tempdir().unwrap();
    let manager = SessionManager::new(simulator(SimulatorConfig::default()), device_settings());

    let outcome = manager
        .run(
            short_config(),
            &CsvExporter::new(),
            &ExportDestination::new(dir.path().join("out"), "session_1"),
            &CountingPresenter::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.export.path, dir.path().join("out").join("session_1.csv"));
    let mut reader = csv::Reader::from_path(&outcome.export.path).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(headers.len(), 17);
    assert_eq!(&headers[16], "Label");

    let labels: Vec<String> = reader
        .records()
        .map(|r| r.unwrap()[16].to_string())
        .collect();
    assert_eq!(labels.len(), outcome.frames_captured);
    assert!(labels.iter().any(|l| l == "7"));
    assert!(labels.iter().any(|l| l.is_empty()));
    assert!(labels.iter().all(|l| l.is_empty() || l == "7"));
}
