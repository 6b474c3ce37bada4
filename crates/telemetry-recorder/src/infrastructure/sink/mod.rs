//! Record sinks: dual file/socket fan-out and the per-stream sink set.
//!
//! A [`DualSink`] is one logical log destination.  Every emitted record is
//! appended as one line to a local file and, when a remote leg is attached,
//! written to it as well.  The two legs have opposite failure policies:
//!
//! - **file leg** – local durability is a strict requirement; a write
//!   failure propagates as [`SinkError::Write`].
//! - **remote leg** – best effort; connect and write failures are absorbed
//!   and logged at debug level.  There is no retry and no reconnect: a
//!   telemetry recorder must keep working, file-only, with no peer present.
//!
//! `emit` may be called from the hook threads and the host callback thread
//! concurrently; each sink serializes its writers internally, so lines are
//! never interleaved mid-record.  `emit` also has to complete in bounded,
//! short time (it runs inline in hook callbacks), which is why the remote
//! leg carries a write timeout and never attempts reconnection inline.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use telemetry_core::Record;
use thiserror::Error;
use tracing::{debug, info, warn};

/// How long to wait for the remote peer at startup.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
/// Upper bound for one remote line write; emit runs inside hook callbacks.
const WRITE_TIMEOUT: Duration = Duration::from_secs(1);

/// Error type for sink operations.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The log file could not be opened for appending.  Fatal to startup.
    #[error("failed to open sink file {path}: {source}")]
    Init {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file-leg write failed.  Local durability is a strict requirement,
    /// so this surfaces to the caller.
    #[error("failed to write to sink file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ── Remote leg ────────────────────────────────────────────────────────────────

/// The socket leg of a dual sink.
///
/// Production uses [`TcpRemote`]; tests substitute recording or failing
/// implementations.
pub trait RemoteWriter: Send + Sync {
    /// Writes one record line (without terminator) to the peer.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error; the caller absorbs it.
    fn write_line(&self, line: &str) -> std::io::Result<()>;

    /// Flushes and closes the connection.  Default: nothing to do.
    fn close(&self) -> std::io::Result<()> {
        Ok(())
    }
}

/// A long-lived TCP stream carrying newline-terminated record lines.
///
/// No application-level framing beyond the line terminator, and nothing is
/// ever read back from the peer.  After the first write error the stream is
/// dropped so later emits fail fast instead of stalling a hook callback on
/// a dead peer.
pub struct TcpRemote {
    stream: Mutex<Option<TcpStream>>,
    endpoint: String,
}

impl TcpRemote {
    /// Connects once to `endpoint` (`host:port`).
    ///
    /// # Errors
    ///
    /// Returns the resolution or connection error; the caller degrades to
    /// file-only operation rather than failing startup.
    pub fn connect(endpoint: &str) -> std::io::Result<Self> {
        let addr = endpoint
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::AddrNotAvailable,
                    format!("endpoint {endpoint} resolved to no address"),
                )
            })?;
        let stream = TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT)?;
        stream.set_write_timeout(Some(WRITE_TIMEOUT))?;
        stream.set_nodelay(true)?;
        info!("remote sink connected to {endpoint}");
        Ok(Self {
            stream: Mutex::new(Some(stream)),
            endpoint: endpoint.to_string(),
        })
    }
}

impl RemoteWriter for TcpRemote {
    fn write_line(&self, line: &str) -> std::io::Result<()> {
        let mut guard = self.stream.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(stream) = guard.as_mut() else {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "remote sink already failed",
            ));
        };
        let result = stream
            .write_all(line.as_bytes())
            .and_then(|()| stream.write_all(b"\n"));
        if result.is_err() {
            // One failure retires the leg for the process lifetime.
            warn!(
                endpoint = %self.endpoint,
                "remote sink write failed; continuing file-only"
            );
            *guard = None;
        }
        result
    }

    fn close(&self) -> std::io::Result<()> {
        let mut guard = self.stream.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(stream) = guard.take() {
            stream.shutdown(Shutdown::Write)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for TcpRemote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpRemote")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

// ── Dual sink ─────────────────────────────────────────────────────────────────

/// One log destination: an append-mode file plus an optional remote leg.
pub struct DualSink {
    path: PathBuf,
    file: Mutex<BufWriter<File>>,
    remote: Option<Arc<dyn RemoteWriter>>,
}

impl DualSink {
    /// Opens `path` in append mode (creating it if absent) and attaches the
    /// optional remote leg.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Init`] if the file cannot be opened; this aborts
    /// recorder startup.
    pub fn open(path: &Path, remote: Option<Arc<dyn RemoteWriter>>) -> Result<Self, SinkError> {
        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(path)
            .map_err(|source| SinkError::Init {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(BufWriter::new(file)),
            remote,
        })
    }

    /// Serializes `record` and writes it to both legs.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Write`] only for the file leg; remote failures
    /// are absorbed.
    pub fn emit(&self, record: &Record) -> Result<(), SinkError> {
        self.write_line(&record.to_line())
    }

    /// Appends one pre-rendered line to both legs.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Write`] if the file leg fails.
    pub fn write_line(&self, line: &str) -> Result<(), SinkError> {
        {
            let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
            writeln!(file, "{line}")
                .and_then(|()| file.flush())
                .map_err(|source| SinkError::Write {
                    path: self.path.clone(),
                    source,
                })?;
        }

        if let Some(remote) = &self.remote {
            if let Err(error) = remote.write_line(line) {
                debug!("remote leg dropped a record line: {error}");
            }
        }
        Ok(())
    }

    /// Flushes and closes both legs.  Safe to call on a sink whose remote
    /// leg never came up.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Write`] if the final file flush fails.
    pub fn close(&self) -> Result<(), SinkError> {
        if let Some(remote) = &self.remote {
            if let Err(error) = remote.close() {
                debug!("remote leg close failed: {error}");
            }
        }
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        file.flush().map_err(|source| SinkError::Write {
            path: self.path.clone(),
            source,
        })
    }

    #[must_use]
    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for DualSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DualSink")
            .field("path", &self.path)
            .field("has_remote", &self.has_remote())
            .finish_non_exhaustive()
    }
}

// ── Sink set ──────────────────────────────────────────────────────────────────

/// The four telemetry log streams.
///
/// Project, mouse, and keyboard share one remote connection; mouse-move is
/// deliberately file-only to keep its volume off the wire.
#[derive(Debug)]
pub struct TelemetrySinks {
    pub project: Arc<DualSink>,
    pub mouse: Arc<DualSink>,
    pub mouse_move: Arc<DualSink>,
    pub keyboard: Arc<DualSink>,
    offline: bool,
}

impl TelemetrySinks {
    /// Opens the four log files under `journal_dir` and attempts a single
    /// connection to `remote_endpoint` if one is configured.
    ///
    /// A connection failure degrades to file-only operation ("offline
    /// mode") instead of failing startup; [`TelemetrySinks::is_offline`]
    /// reports it so the host can show its one informational notice.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Init`] if any log file cannot be opened.
    pub fn open(journal_dir: &Path, remote_endpoint: Option<&str>) -> Result<Self, SinkError> {
        let (remote, offline): (Option<Arc<dyn RemoteWriter>>, bool) = match remote_endpoint {
            None => (None, false),
            Some(endpoint) => match TcpRemote::connect(endpoint) {
                Ok(remote) => (Some(Arc::new(remote)), false),
                Err(error) => {
                    warn!("can't connect to {endpoint}: {error}; operating in offline mode");
                    (None, true)
                }
            },
        };
        Self::open_with_remote(journal_dir, remote, offline)
    }

    /// Same as [`TelemetrySinks::open`] but with the remote leg injected,
    /// for tests.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Init`] if any log file cannot be opened.
    pub fn open_with_remote(
        journal_dir: &Path,
        remote: Option<Arc<dyn RemoteWriter>>,
        offline: bool,
    ) -> Result<Self, SinkError> {
        Ok(Self {
            project: Arc::new(DualSink::open(
                &journal_dir.join("Project.log"),
                remote.clone(),
            )?),
            mouse: Arc::new(DualSink::open(&journal_dir.join("Mouse.log"), remote.clone())?),
            // Mouse-move stays off the remote leg to limit volume.
            mouse_move: Arc::new(DualSink::open(&journal_dir.join("MouseMove.log"), None)?),
            keyboard: Arc::new(DualSink::open(&journal_dir.join("Keyboard.log"), remote)?),
            offline,
        })
    }

    /// `true` when a remote endpoint was configured but unreachable.
    #[must_use]
    pub fn is_offline(&self) -> bool {
        self.offline
    }

    /// Flushes and closes all four streams, continuing past individual
    /// failures so one bad stream cannot keep another's data buffered.
    ///
    /// # Errors
    ///
    /// Returns the first flush failure after attempting all streams.
    pub fn close(&self) -> Result<(), SinkError> {
        let mut first_error = None;
        for sink in [&self.project, &self.mouse, &self.mouse_move, &self.keyboard] {
            if let Err(error) = sink.close() {
                if first_error.is_none() {
                    first_error = Some(error);
                }
            }
        }
        match first_error {
            None => Ok(()),
            Some(error) => Err(error),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use telemetry_core::{ClickKind, MouseButton, Record};

    use super::*;

    /// Remote leg that records every line it is given.
    #[derive(Default)]
    struct RecordingRemote {
        lines: Mutex<Vec<String>>,
    }

    impl RemoteWriter for RecordingRemote {
        fn write_line(&self, line: &str) -> std::io::Result<()> {
            self.lines.lock().unwrap().push(line.to_string());
            Ok(())
        }
    }

    /// Remote leg that fails every write.
    #[derive(Default)]
    struct FailingRemote {
        attempts: AtomicUsize,
    }

    impl RemoteWriter for FailingRemote {
        fn write_line(&self, _line: &str) -> std::io::Result<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "peer went away",
            ))
        }
    }

    fn read_lines(path: &Path) -> Vec<String> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_emit_without_remote_appends_exactly_one_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Mouse.log");
        let sink = DualSink::open(&path, None).unwrap();

        let record = Record::mouse_button(77, 120, 340, MouseButton::Left, ClickKind::Down);
        sink.emit(&record).unwrap();

        assert_eq!(read_lines(&path), vec!["Mouse, 77, 120, 340, Left, Down"]);
    }

    #[test]
    fn test_emit_with_failing_remote_still_appends_and_does_not_raise() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Keyboard.log");
        let remote = Arc::new(FailingRemote::default());
        let sink = DualSink::open(&path, Some(remote.clone() as Arc<dyn RemoteWriter>)).unwrap();

        sink.write_line("Keyboard, 1, 65, Down").unwrap();
        sink.write_line("Keyboard, 2, 65, Up").unwrap();

        assert_eq!(read_lines(&path).len(), 2);
        assert_eq!(remote.attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_emit_mirrors_lines_to_healthy_remote() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Project.log");
        let remote = Arc::new(RecordingRemote::default());
        let sink = DualSink::open(&path, Some(remote.clone() as Arc<dyn RemoteWriter>)).unwrap();

        sink.write_line("Command, 1, Wall, ID_WALL, 7").unwrap();

        assert_eq!(read_lines(&path), vec!["Command, 1, Wall, ID_WALL, 7"]);
        assert_eq!(
            *remote.lines.lock().unwrap(),
            vec!["Command, 1, Wall, ID_WALL, 7"]
        );
    }

    #[test]
    fn test_open_fails_for_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing_dir = dir.path().join("does-not-exist");
        let result = DualSink::open(&missing_dir.join("Project.log"), None);
        assert!(matches!(result, Err(SinkError::Init { .. })));
    }

    /// `/dev/full` accepts the open but fails every write with `ENOSPC`,
    /// which is exactly the file-leg failure that must surface to the
    /// caller rather than being absorbed like a remote-leg error.
    #[cfg(target_os = "linux")]
    #[test]
    fn test_file_leg_write_failure_surfaces_to_the_caller() {
        let sink = DualSink::open(Path::new("/dev/full"), None).unwrap();
        let result = sink.write_line("Lifecycle, 1, Started");
        assert!(matches!(result, Err(SinkError::Write { .. })));
    }

    #[test]
    fn test_emit_appends_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Project.log");

        {
            let sink = DualSink::open(&path, None).unwrap();
            sink.write_line("Lifecycle, 1, Started").unwrap();
            sink.close().unwrap();
        }
        {
            let sink = DualSink::open(&path, None).unwrap();
            sink.write_line("Lifecycle, 2, Stopped").unwrap();
            sink.close().unwrap();
        }

        assert_eq!(
            read_lines(&path),
            vec!["Lifecycle, 1, Started", "Lifecycle, 2, Stopped"]
        );
    }

    #[test]
    fn test_sink_set_opens_all_four_streams() {
        let dir = tempfile::tempdir().unwrap();
        let sinks = TelemetrySinks::open(dir.path(), None).unwrap();

        for name in ["Project.log", "Mouse.log", "MouseMove.log", "Keyboard.log"] {
            assert!(dir.path().join(name).exists(), "{name} must exist");
        }
        assert!(!sinks.is_offline());
        sinks.close().unwrap();
    }

    #[test]
    fn test_sink_set_keeps_mouse_move_off_the_remote_leg() {
        let dir = tempfile::tempdir().unwrap();
        let remote = Arc::new(RecordingRemote::default());
        let sinks = TelemetrySinks::open_with_remote(
            dir.path(),
            Some(remote.clone() as Arc<dyn RemoteWriter>),
            false,
        )
        .unwrap();

        sinks.mouse_move.write_line("Mouse, 1, 2, 3, Move").unwrap();
        sinks.mouse.write_line("Mouse, 1, 2, 3, Left, Down").unwrap();

        assert_eq!(
            *remote.lines.lock().unwrap(),
            vec!["Mouse, 1, 2, 3, Left, Down"],
            "mouse-move lines must not reach the remote"
        );
    }

    #[test]
    fn test_unreachable_endpoint_degrades_to_offline_mode() {
        let dir = tempfile::tempdir().unwrap();
        // Reserved TEST-NET-1 address: connect fails fast.
        let sinks = TelemetrySinks::open(dir.path(), Some("192.0.2.1:9090")).unwrap();

        assert!(sinks.is_offline());
        assert!(!sinks.project.has_remote());
        sinks
            .project
            .write_line("Lifecycle, 1, Started")
            .expect("offline mode must keep the file leg working");
    }
}
