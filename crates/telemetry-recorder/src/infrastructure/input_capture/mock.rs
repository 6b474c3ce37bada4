//! Mock input hook for unit and integration testing.
//!
//! Allows tests to push synthetic native messages through the real
//! decode-dispatch path without a running Win32 message loop or OS hooks.
//! Forwarding to the next hook in the OS chain is modeled as a counter so
//! tests can assert that every injected message was forwarded exactly once,
//! however many subscribers were attached.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use super::decode::{relay_key, relay_mouse, NativeKeyMessage, NativeMouseMessage};
use super::{EventBus, HookError, HookKind, HookSlot, InputEvent, InputHook};

/// A mock implementation of [`InputHook`] driven by injected messages.
#[derive(Debug)]
pub struct MockHook {
    kind: HookKind,
    bus: Arc<EventBus<InputEvent>>,
    slot: Arc<HookSlot>,
    holds_slot: bool,
    forwarded: AtomicU64,
    start_calls: AtomicU32,
    stop_calls: AtomicU32,
    fail_start: bool,
    fail_stop: bool,
}

impl MockHook {
    /// Creates a mock hook with its own private registration slot.
    #[must_use]
    pub fn new(kind: HookKind) -> Self {
        Self::with_slot(kind, Arc::new(HookSlot::new()))
    }

    /// Creates a mock hook sharing `slot`, so tests can exercise the
    /// one-registration-per-hook-type rule across instances.
    #[must_use]
    pub fn with_slot(kind: HookKind, slot: Arc<HookSlot>) -> Self {
        Self {
            kind,
            bus: Arc::new(EventBus::new()),
            slot,
            holds_slot: false,
            forwarded: AtomicU64::new(0),
            start_calls: AtomicU32::new(0),
            stop_calls: AtomicU32::new(0),
            fail_start: false,
            fail_stop: false,
        }
    }

    /// Makes every `start()` fail with [`HookError::InstallFailed`].
    #[must_use]
    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    /// Makes every `stop()` of an installed hook report
    /// [`HookError::RemovalFailed`] (the slot is still released).
    #[must_use]
    pub fn failing_stop(mut self) -> Self {
        self.fail_stop = true;
        self
    }

    /// Injects a synthetic keyboard message, as if delivered by the OS.
    ///
    /// Panics if the hook is not installed – a real hook callback only runs
    /// while its registration is live.
    pub fn inject_key(&self, native: NativeKeyMessage) {
        assert!(
            self.holds_slot,
            "MockHook::inject_key called before start()"
        );
        relay_key(&self.bus, &native);
        self.forwarded.fetch_add(1, Ordering::SeqCst);
    }

    /// Injects a synthetic mouse message, as if delivered by the OS.
    pub fn inject_mouse(&self, native: NativeMouseMessage) {
        assert!(
            self.holds_slot,
            "MockHook::inject_mouse called before start()"
        );
        relay_mouse(&self.bus, &native);
        self.forwarded.fetch_add(1, Ordering::SeqCst);
    }

    /// Number of native messages forwarded to the (simulated) next hook.
    #[must_use]
    pub fn forwarded_count(&self) -> u64 {
        self.forwarded.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn start_calls(&self) -> u32 {
        self.start_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn stop_calls(&self) -> u32 {
        self.stop_calls.load(Ordering::SeqCst)
    }

    /// The registration slot this mock installs into.
    #[must_use]
    pub fn slot(&self) -> Arc<HookSlot> {
        Arc::clone(&self.slot)
    }
}

impl InputHook for MockHook {
    fn kind(&self) -> HookKind {
        self.kind
    }

    fn subscribe(&self, subscriber: Arc<dyn Fn(&InputEvent) + Send + Sync>) {
        self.bus.subscribe(subscriber);
    }

    fn start(&mut self) -> Result<(), HookError> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        if self.holds_slot {
            return Ok(());
        }
        if self.fail_start {
            return Err(HookError::InstallFailed {
                kind: self.kind,
                reason: "simulated install failure".to_string(),
            });
        }
        if !self.slot.try_acquire() {
            return Err(HookError::SlotBusy { kind: self.kind });
        }
        self.holds_slot = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), HookError> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        self.bus.clear();
        if !self.holds_slot {
            return Ok(());
        }
        self.slot.release();
        self.holds_slot = false;
        if self.fail_stop {
            return Err(HookError::RemovalFailed {
                kind: self.kind,
                reason: "simulated removal failure".to_string(),
            });
        }
        Ok(())
    }

    fn is_installed(&self) -> bool {
        self.holds_slot
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
