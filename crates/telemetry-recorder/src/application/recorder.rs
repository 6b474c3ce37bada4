//! Session lifecycle: bring-up order, the running resource set, and
//! orderly teardown.
//!
//! Bring-up is strictly ordered so a partial failure leaves nothing
//! running: directories, then sinks, then the capture worker, then the
//! hooks, then the host subscription, and finally the `Lifecycle, Started`
//! record.  Any error on the way unwinds everything already started before
//! it surfaces.  Teardown mirrors the order in reverse, completes every
//! step even when one fails, and reports the first failure.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use telemetry_core::{now_ticks, HostEventSource, LifecycleMarker, Record};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::application::event_bridge::EventBridge;
use crate::application::input_log::InputLogger;
use crate::infrastructure::input_capture::{HookError, InputHook};
use crate::infrastructure::screenshot::{CaptureWorker, ScreenGrabber};
use crate::infrastructure::sink::{SinkError, TelemetrySinks};

/// Error type for recorder lifecycle operations.
#[derive(Debug, Error)]
pub enum RecorderError {
    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error(transparent)]
    Hook(#[from] HookError),

    #[error("failed to create session directory {path}: {source}")]
    SessionDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to spawn capture worker: {0}")]
    CaptureSpawn(#[source] std::io::Error),

    /// `start` was called while a session is already running.
    #[error("recorder is already running")]
    AlreadyRunning,

    /// `stop` was called with no session running.
    #[error("recorder is not running")]
    NotRunning,
}

/// Where and how a session records.
#[derive(Debug, Clone)]
pub struct RecorderOptions {
    /// Directory receiving the log files and the `picture/` subdirectory.
    pub output_dir: PathBuf,
    /// Optional `host:port` to mirror records to.
    pub remote_endpoint: Option<String>,
    /// Screen capture cadence.
    pub capture_interval: Duration,
}

/// Lifecycle state, for diagnostics and guard checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Idle,
    Running,
    Stopped,
}

/// Resources owned by a running session.
struct Session {
    sinks: Arc<TelemetrySinks>,
    capture: Option<CaptureWorker>,
    host_subscribed: bool,
}

/// The recording session controller.
///
/// Owns the two input hooks, the host attachment, and while running the
/// sink set and capture worker.  Construct with [`Recorder::new`], then
/// drive with [`Recorder::start`] and [`Recorder::stop`].
pub struct Recorder {
    options: RecorderOptions,
    keyboard: Box<dyn InputHook>,
    mouse: Box<dyn InputHook>,
    host: Arc<dyn HostEventSource>,
    grabber: Option<Box<dyn ScreenGrabber>>,
    state: RecorderState,
    session: Option<Session>,
}

impl Recorder {
    #[must_use]
    pub fn new(
        options: RecorderOptions,
        keyboard: Box<dyn InputHook>,
        mouse: Box<dyn InputHook>,
        host: Arc<dyn HostEventSource>,
        grabber: Box<dyn ScreenGrabber>,
    ) -> Self {
        Self {
            options,
            keyboard,
            mouse,
            host,
            grabber: Some(grabber),
            state: RecorderState::Idle,
            session: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> RecorderState {
        self.state
    }

    /// Starts the session.
    ///
    /// # Errors
    ///
    /// Returns the first bring-up failure after unwinding everything
    /// already started, leaving the recorder in `Stopped` with no hook
    /// installed and no thread running.
    pub fn start(&mut self) -> Result<(), RecorderError> {
        if self.session.is_some() {
            return Err(RecorderError::AlreadyRunning);
        }
        match self.bring_up() {
            Ok(()) => {
                self.state = RecorderState::Running;
                info!(dir = %self.options.output_dir.display(), "recording started");
                Ok(())
            }
            Err(err) => {
                error!("recorder start failed: {err}");
                self.tear_down();
                Err(err)
            }
        }
    }

    fn bring_up(&mut self) -> Result<(), RecorderError> {
        let picture_dir = self.options.output_dir.join("picture");
        std::fs::create_dir_all(&picture_dir).map_err(|source| RecorderError::SessionDir {
            path: picture_dir.clone(),
            source,
        })?;

        let sinks = Arc::new(TelemetrySinks::open(
            &self.options.output_dir,
            self.options.remote_endpoint.as_deref(),
        )?);
        if sinks.is_offline() {
            info!("record mirroring unavailable; session is file-only");
        }

        let capture = match self.grabber.take() {
            Some(grabber) => Some(
                CaptureWorker::spawn(self.options.capture_interval, &picture_dir, grabber)
                    .map_err(RecorderError::CaptureSpawn)?,
            ),
            // A restarted recorder has spent its grabber; captures are the
            // one resource that does not survive a second session.
            None => {
                warn!("no screen grabber available; session records without captures");
                None
            }
        };

        self.session = Some(Session {
            sinks: sinks.clone(),
            capture,
            host_subscribed: false,
        });

        let logger = Arc::new(InputLogger::new(sinks.clone()));
        {
            let logger = logger.clone();
            self.keyboard
                .subscribe(Arc::new(move |event| logger.handle(event)));
        }
        self.keyboard.start()?;
        self.mouse
            .subscribe(Arc::new(move |event| logger.handle(event)));
        self.mouse.start()?;

        self.host
            .subscribe(Arc::new(EventBridge::new(sinks.project.clone())));
        if let Some(session) = &mut self.session {
            session.host_subscribed = true;
        }

        sinks
            .project
            .emit(&Record::lifecycle(now_ticks(), LifecycleMarker::Started))?;
        Ok(())
    }

    /// Stops the session: writes the `Lifecycle, Stopped` record, detaches
    /// from the host, removes both hooks, stops the capture worker, and
    /// closes the sinks.  Every step runs even when an earlier one fails.
    ///
    /// # Errors
    ///
    /// Returns the first teardown failure.
    pub fn stop(&mut self) -> Result<(), RecorderError> {
        if self.session.is_none() {
            return Err(RecorderError::NotRunning);
        }
        let first_error = self.tear_down();
        info!("recording stopped");
        match first_error {
            None => Ok(()),
            Some(err) => Err(err),
        }
    }

    /// Shared unwind path for both `stop` and a failed `start`.  Leaves the
    /// recorder in `Stopped`.
    fn tear_down(&mut self) -> Option<RecorderError> {
        let mut first_error: Option<RecorderError> = None;
        let mut note = |result: Result<(), RecorderError>| {
            if let Err(err) = result {
                error!("shutdown step failed: {err}");
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
        };

        let session = self.session.take();

        if let Some(session) = &session {
            // A session that never reached Running wrote no Started record
            // and gets no Stopped record either.
            if self.state == RecorderState::Running {
                note(
                    session
                        .sinks
                        .project
                        .emit(&Record::lifecycle(now_ticks(), LifecycleMarker::Stopped))
                        .map_err(RecorderError::from),
                );
            }
            if session.host_subscribed {
                self.host.unsubscribe();
            }
        }

        if self.keyboard.is_installed() {
            note(self.keyboard.stop().map_err(RecorderError::from));
        }
        if self.mouse.is_installed() {
            note(self.mouse.stop().map_err(RecorderError::from));
        }

        if let Some(session) = session {
            if let Some(capture) = session.capture {
                capture.stop();
            }
            note(session.sinks.close().map_err(RecorderError::from));
        }

        self.state = RecorderState::Stopped;
        first_error
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        if self.session.is_some() {
            self.tear_down();
        }
    }
}

impl std::fmt::Debug for Recorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recorder")
            .field("state", &self.state)
            .field("output_dir", &self.options.output_dir)
            .finish_non_exhaustive()
    }
}
