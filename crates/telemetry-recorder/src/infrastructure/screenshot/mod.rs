//! Periodic screen capture.
//!
//! A [`CaptureWorker`] owns a dedicated thread that grabs the primary
//! monitor at a fixed interval and writes timestamped JPEG files into the
//! session's `picture/` directory.  Capture runs on its own thread because
//! a grab plus JPEG encode can take hundreds of milliseconds and must never
//! stall the hook callbacks or the host event bridge.
//!
//! One failed capture is logged and skipped; the cadence continues.  A
//! persistently broken grabber therefore costs log noise, not a crash.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

use chrono::Local;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Error type for screen capture.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no monitor available for capture: {0}")]
    NoMonitor(String),

    #[error("screen grab failed: {0}")]
    Grab(String),

    #[error("failed to encode capture to {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to write capture to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One screen grab written to one file.
///
/// Production uses [`XcapGrabber`]; tests substitute counting or failing
/// implementations so the worker's cadence can be exercised headless.
pub trait ScreenGrabber: Send {
    /// Captures the primary monitor and writes it to `output` as JPEG.
    ///
    /// # Errors
    ///
    /// Returns a [`CaptureError`]; the worker logs it and keeps its cadence.
    fn grab(&mut self, output: &Path) -> Result<(), CaptureError>;
}

/// Grabber backed by the `xcap` monitor API with `image` JPEG encoding.
#[derive(Debug, Default)]
pub struct XcapGrabber;

impl XcapGrabber {
    const JPEG_QUALITY: u8 = 85;
}

impl ScreenGrabber for XcapGrabber {
    fn grab(&mut self, output: &Path) -> Result<(), CaptureError> {
        let monitors =
            xcap::Monitor::all().map_err(|error| CaptureError::NoMonitor(error.to_string()))?;
        let monitor = monitors
            .iter()
            .find(|m| m.is_primary())
            .or_else(|| monitors.first())
            .ok_or_else(|| CaptureError::NoMonitor("no monitors reported".to_string()))?;

        let rgba = monitor
            .capture_image()
            .map_err(|error| CaptureError::Grab(error.to_string()))?;
        // JPEG has no alpha channel.
        let rgb = image::DynamicImage::ImageRgba8(rgba).to_rgb8();

        let file = std::fs::File::create(output).map_err(|source| CaptureError::Io {
            path: output.to_path_buf(),
            source,
        })?;
        let mut writer = std::io::BufWriter::new(file);
        let encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut writer, Self::JPEG_QUALITY);
        rgb.write_with_encoder(encoder)
            .map_err(|source| CaptureError::Encode {
                path: output.to_path_buf(),
                source,
            })
    }
}

/// File name for a capture taken now, second resolution.
///
/// Two captures inside the same second overwrite each other; intervals are
/// a second or more in practice, so the last one wins by design of the
/// naming scheme.
fn capture_file_name() -> String {
    format!("{}.jpg", Local::now().format("%Y_%m_%d_%H_%M_%S"))
}

/// Background thread grabbing the screen at a fixed interval.
pub struct CaptureWorker {
    cancel: Sender<()>,
    join: JoinHandle<()>,
}

impl CaptureWorker {
    /// Spawns the capture thread.  The first capture happens immediately,
    /// then one per `interval` until [`CaptureWorker::stop`].
    ///
    /// # Errors
    ///
    /// Returns the spawn error if the OS refuses the thread.
    pub fn spawn(
        interval: Duration,
        picture_dir: &Path,
        mut grabber: Box<dyn ScreenGrabber>,
    ) -> std::io::Result<Self> {
        let (cancel, cancelled) = mpsc::channel::<()>();
        let dir = picture_dir.to_path_buf();
        let join = std::thread::Builder::new()
            .name("telemetry-capture".to_string())
            .spawn(move || {
                info!(dir = %dir.display(), interval_secs = interval.as_secs_f64(), "capture worker started");
                loop {
                    let output = dir.join(capture_file_name());
                    match grabber.grab(&output) {
                        Ok(()) => debug!(path = %output.display(), "captured screen"),
                        Err(error) => warn!("screen capture failed: {error}"),
                    }
                    // The cancel channel doubles as the interval sleep so a
                    // stop request interrupts the wait immediately.
                    match cancelled.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                info!("capture worker stopped");
            })?;
        Ok(Self { cancel, join })
    }

    /// Signals the worker and waits for the thread to exit.  The in-flight
    /// capture, if any, is allowed to finish.
    pub fn stop(self) {
        // Send fails only if the thread already exited; join either way.
        let _ = self.cancel.send(());
        if self.join.join().is_err() {
            warn!("capture worker thread panicked");
        }
    }
}

impl std::fmt::Debug for CaptureWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureWorker").finish_non_exhaustive()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Instant;

    use super::*;

    /// Grabber that counts calls and writes a marker file.
    struct CountingGrabber {
        calls: Arc<AtomicUsize>,
    }

    impl ScreenGrabber for CountingGrabber {
        fn grab(&mut self, output: &Path) -> Result<(), CaptureError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::fs::write(output, b"jpeg").map_err(|source| CaptureError::Io {
                path: output.to_path_buf(),
                source,
            })
        }
    }

    /// Grabber that always fails.
    struct BrokenGrabber {
        calls: Arc<AtomicUsize>,
    }

    impl ScreenGrabber for BrokenGrabber {
        fn grab(&mut self, _output: &Path) -> Result<(), CaptureError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(CaptureError::Grab("display detached".to_string()))
        }
    }

    #[test]
    fn test_worker_captures_immediately_then_on_interval() {
        let dir = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let grabber = Box::new(CountingGrabber {
            calls: calls.clone(),
        });

        let worker =
            CaptureWorker::spawn(Duration::from_millis(50), dir.path(), grabber).unwrap();
        std::thread::sleep(Duration::from_millis(170));
        worker.stop();

        // Immediate capture plus roughly one per interval; generous bounds
        // keep the test stable under scheduler jitter.
        let count = calls.load(Ordering::SeqCst);
        assert!((2..=5).contains(&count), "expected 2..=5 captures, got {count}");
    }

    #[test]
    fn test_stop_interrupts_a_long_interval() {
        let dir = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let grabber = Box::new(CountingGrabber {
            calls: calls.clone(),
        });

        let worker = CaptureWorker::spawn(Duration::from_secs(3600), dir.path(), grabber).unwrap();
        std::thread::sleep(Duration::from_millis(50));

        let stop_started = Instant::now();
        worker.stop();
        assert!(
            stop_started.elapsed() < Duration::from_millis(500),
            "stop must not wait out the interval"
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1, "only the immediate capture");
    }

    #[test]
    fn test_failed_captures_do_not_stop_the_cadence() {
        let dir = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let grabber = Box::new(BrokenGrabber {
            calls: calls.clone(),
        });

        let worker =
            CaptureWorker::spawn(Duration::from_millis(40), dir.path(), grabber).unwrap();
        std::thread::sleep(Duration::from_millis(130));
        worker.stop();

        assert!(
            calls.load(Ordering::SeqCst) >= 2,
            "worker must keep trying after a failure"
        );
    }

    #[test]
    fn test_capture_file_name_shape() {
        let name = capture_file_name();
        assert!(name.ends_with(".jpg"));
        // yyyy_MM_dd_HH_mm_ss.jpg
        assert_eq!(name.len(), "2025_01_02_03_04_05.jpg".len());
        assert_eq!(name.matches('_').count(), 5);
    }
}
