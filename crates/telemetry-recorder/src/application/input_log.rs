//! Routing of raw input events into the mouse and keyboard record streams.
//!
//! The stamp-and-route step is a pure function so the stream choice and
//! field rendering can be tested without hooks or files; [`InputLogger`]
//! wraps it with the real sink set and runs inline in hook callbacks, so it
//! absorbs sink errors instead of propagating them.

use std::sync::Arc;

use telemetry_core::{now_ticks, Record, Ticks};
use tracing::error;

use crate::infrastructure::input_capture::{InputEvent, KeyboardEvent, MouseEvent};
use crate::infrastructure::sink::TelemetrySinks;

/// Which of the sink set's streams a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Mouse,
    MouseMove,
    Keyboard,
}

/// Stamps `event` with `ticks` and renders it as a record on its stream.
///
/// Cursor motion gets its own stream so its volume never drowns the click
/// and key streams.
#[must_use]
pub fn route(event: &InputEvent, ticks: Ticks) -> (Stream, Record) {
    match event {
        InputEvent::Key(KeyboardEvent { code, direction }) => {
            (Stream::Keyboard, Record::keyboard(ticks, *code, *direction))
        }
        InputEvent::Mouse(MouseEvent::Move { x, y }) => {
            (Stream::MouseMove, Record::mouse_move(ticks, *x, *y))
        }
        InputEvent::Mouse(MouseEvent::Wheel { x, y, delta }) => {
            (Stream::Mouse, Record::mouse_wheel(ticks, *x, *y, *delta))
        }
        InputEvent::Mouse(MouseEvent::Button {
            button,
            click,
            x,
            y,
        }) => (
            Stream::Mouse,
            Record::mouse_button(ticks, *x, *y, *button, *click),
        ),
    }
}

/// Hook subscriber writing each input event to the matching sink.
pub struct InputLogger {
    sinks: Arc<TelemetrySinks>,
}

impl InputLogger {
    #[must_use]
    pub fn new(sinks: Arc<TelemetrySinks>) -> Self {
        Self { sinks }
    }

    /// Timestamps and records one event.  Runs inline in a hook callback:
    /// sink failures are logged, never raised, so input forwarding to the
    /// OS is unaffected.
    pub fn handle(&self, event: &InputEvent) {
        let (stream, record) = route(event, now_ticks());
        let sink = match stream {
            Stream::Mouse => &self.sinks.mouse,
            Stream::MouseMove => &self.sinks.mouse_move,
            Stream::Keyboard => &self.sinks.keyboard,
        };
        if let Err(err) = sink.emit(&record) {
            error!("failed to record input event: {err}");
        }
    }
}

impl std::fmt::Debug for InputLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputLogger").finish_non_exhaustive()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
