//! Host application attachment.
//!
//! The recorder is designed to run embedded in a host application that
//! raises document and command events through `telemetry-core`'s
//! [`HostEventSource`].  The standalone binary has no such host, so it
//! attaches to a [`DetachedHost`] that never raises anything; input hooks
//! and screen capture work exactly the same either way.
//!
//! `mock` provides a scriptable host for tests.

pub mod mock;

use std::sync::{Arc, PoisonError, RwLock};

use telemetry_core::{HostEventSink, HostEventSource};
use tracing::debug;

/// Event source for standalone operation: accepts a subscriber and never
/// calls it.
#[derive(Default)]
pub struct DetachedHost {
    sink: RwLock<Option<Arc<dyn HostEventSink>>>,
}

impl DetachedHost {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl HostEventSource for DetachedHost {
    fn subscribe(&self, sink: Arc<dyn HostEventSink>) {
        debug!("running detached; host events will not occur");
        *self.sink.write().unwrap_or_else(PoisonError::into_inner) = Some(sink);
    }

    fn unsubscribe(&self) {
        *self.sink.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl std::fmt::Debug for DetachedHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetachedHost").finish_non_exhaustive()
    }
}
