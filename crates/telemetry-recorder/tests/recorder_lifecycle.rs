//! End-to-end session lifecycle tests with mock hooks, a mock host, and a
//! marker-file screen grabber.  Everything runs headless: no real hooks,
//! no real monitors, no sockets.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use telemetry_core::HostEventSource;
use telemetry_recorder::application::{Recorder, RecorderError, RecorderOptions, RecorderState};
use telemetry_recorder::infrastructure::host_bridge::mock::MockHost;
use telemetry_recorder::infrastructure::input_capture::mock::MockHook;
use telemetry_recorder::infrastructure::input_capture::{HookKind, HookSlot};
use telemetry_recorder::infrastructure::screenshot::{CaptureError, ScreenGrabber};

/// Grabber that writes a marker file and counts calls.
struct MarkerGrabber {
    calls: Arc<AtomicUsize>,
}

impl ScreenGrabber for MarkerGrabber {
    fn grab(&mut self, output: &Path) -> Result<(), CaptureError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::fs::write(output, b"jpeg").map_err(|source| CaptureError::Io {
            path: output.to_path_buf(),
            source,
        })
    }
}

struct Fixture {
    keyboard_slot: Arc<HookSlot>,
    mouse_slot: Arc<HookSlot>,
    grabs: Arc<AtomicUsize>,
    host: Arc<MockHost>,
}

fn build_recorder(output_dir: &Path, fail_mouse_start: bool) -> (Recorder, Fixture) {
    let keyboard_slot = Arc::new(HookSlot::new());
    let mouse_slot = Arc::new(HookSlot::new());
    let grabs = Arc::new(AtomicUsize::new(0));
    let host = Arc::new(MockHost::new("alice", "tower.db", "Level 1"));

    let keyboard = MockHook::with_slot(HookKind::Keyboard, keyboard_slot.clone());
    let mut mouse = MockHook::with_slot(HookKind::Mouse, mouse_slot.clone());
    if fail_mouse_start {
        mouse = mouse.failing_start();
    }

    let recorder = Recorder::new(
        RecorderOptions {
            output_dir: output_dir.to_path_buf(),
            remote_endpoint: None,
            capture_interval: Duration::from_millis(50),
        },
        Box::new(keyboard),
        Box::new(mouse),
        host.clone() as Arc<dyn HostEventSource>,
        Box::new(MarkerGrabber {
            calls: grabs.clone(),
        }),
    );

    (
        recorder,
        Fixture {
            keyboard_slot,
            mouse_slot,
            grabs,
            host,
        },
    )
}

fn project_lines(dir: &Path) -> Vec<String> {
    std::fs::read_to_string(dir.join("Project.log"))
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn test_session_records_from_start_to_stop() {
    let dir = tempfile::tempdir().unwrap();
    let (mut recorder, fixture) = build_recorder(dir.path(), false);

    recorder.start().expect("start");
    assert_eq!(recorder.state(), RecorderState::Running);
    assert!(fixture.keyboard_slot.is_installed());
    assert!(fixture.mouse_slot.is_installed());
    assert!(fixture.host.has_subscriber());

    fixture.host.fire_document_opened("C:/projects/tower.db");
    std::thread::sleep(Duration::from_millis(80));

    recorder.stop().expect("stop");
    assert_eq!(recorder.state(), RecorderState::Stopped);
    assert!(!fixture.keyboard_slot.is_installed());
    assert!(!fixture.mouse_slot.is_installed());
    assert!(!fixture.host.has_subscriber());

    // All four log streams plus the picture directory exist.
    for name in ["Project.log", "Mouse.log", "MouseMove.log", "Keyboard.log"] {
        assert!(dir.path().join(name).exists(), "{name} must exist");
    }
    assert!(fixture.grabs.load(Ordering::SeqCst) >= 1, "at least the immediate capture");
    let pictures = std::fs::read_dir(dir.path().join("picture")).unwrap().count();
    assert!(pictures >= 1);

    // The project stream is bracketed by the lifecycle records.
    let lines = project_lines(dir.path());
    assert!(lines.first().unwrap().starts_with("Lifecycle, "));
    assert!(lines.first().unwrap().ends_with(", Started"));
    assert!(lines.last().unwrap().ends_with(", Stopped"));
    assert!(lines.iter().any(|l| l.starts_with("DocumentOpen, ")));
}

#[test]
fn test_failed_hook_start_unwinds_to_a_clean_stop() {
    let dir = tempfile::tempdir().unwrap();
    let (mut recorder, fixture) = build_recorder(dir.path(), true);

    let result = recorder.start();
    assert!(matches!(result, Err(RecorderError::Hook(_))));
    assert_eq!(recorder.state(), RecorderState::Stopped);

    // The keyboard hook came up first and must have been removed again.
    assert!(!fixture.keyboard_slot.is_installed());
    assert!(!fixture.mouse_slot.is_installed());
    assert!(!fixture.host.has_subscriber());

    // No lifecycle record for a session that never ran.
    let lines = project_lines(dir.path());
    assert!(
        !lines.iter().any(|l| l.starts_with("Lifecycle, ")),
        "unexpected lifecycle records: {lines:?}"
    );
}

#[test]
fn test_restart_records_a_second_session_without_duplication() {
    let dir = tempfile::tempdir().unwrap();
    let (mut recorder, fixture) = build_recorder(dir.path(), false);

    recorder.start().expect("first start");
    recorder.stop().expect("first stop");
    recorder.start().expect("restart");
    assert_eq!(recorder.state(), RecorderState::Running);
    assert!(fixture.keyboard_slot.is_installed());

    fixture.host.fire_document_opened("C:/projects/tower.db");
    recorder.stop().expect("second stop");

    let lines = project_lines(dir.path());
    // Two bracketed sessions appended to the same file, and the second
    // session's host event recorded exactly once — the first session's
    // subscriptions must not survive its stop.
    assert_eq!(
        lines.iter().filter(|l| l.ends_with(", Started")).count(),
        2
    );
    assert_eq!(
        lines.iter().filter(|l| l.ends_with(", Stopped")).count(),
        2
    );
    assert_eq!(
        lines
            .iter()
            .filter(|l| l.starts_with("DocumentOpen, "))
            .count(),
        1
    );
}

#[test]
fn test_start_twice_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (mut recorder, _fixture) = build_recorder(dir.path(), false);

    recorder.start().expect("start");
    assert!(matches!(
        recorder.start(),
        Err(RecorderError::AlreadyRunning)
    ));
    recorder.stop().expect("stop");
}

#[test]
fn test_stop_without_start_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (mut recorder, _fixture) = build_recorder(dir.path(), false);
    assert!(matches!(recorder.stop(), Err(RecorderError::NotRunning)));
}
