//! Global input capture: hook lifecycle, event bus, and registration slots.
//!
//! On Windows, each hook installs a system-wide low-level interception point
//! (WH_KEYBOARD_LL or WH_MOUSE_LL) on its own dedicated Win32 message-loop
//! thread.  The hook callback decodes the native message, delivers the
//! semantic event synchronously to every subscriber, and then forwards the
//! native message to the next hook in the OS dispatch chain – always, no
//! matter what the subscribers did.  A swallowed event would break every
//! other process observing the same global input stream.
//!
//! # Callback discipline
//!
//! Hook callbacks run inline inside the OS input-dispatch path; a blocking
//! subscriber stalls input system-wide, not just for this process.  Windows
//! additionally removes hooks whose callbacks take too long (~300 ms), so
//! subscribers must complete in bounded, short time.  Subscriber panics are
//! contained by the event bus and never reach the chain-forwarding call.
//!
//! # Registration slots
//!
//! The OS provides a single global interception slot per hook type, so the
//! process must never install the same hook twice.  [`HookSlot`] models that
//! slot as an explicit acquire/release resource rather than a bare global,
//! and the hook's `stop()` releases it deterministically instead of leaving
//! the release to drop timing.
//!
//! # Testability
//!
//! The decode table lives in [`decode`] and is platform neutral, so the
//! entire translate-dispatch-forward path is exercised off-Windows through
//! [`mock::MockHook`].

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use telemetry_core::{ClickKind, KeyDirection, MouseButton};
use tracing::warn;

pub mod decode;
pub mod mock;

#[cfg(target_os = "windows")]
pub mod windows;

/// A semantic keyboard event decoded from one native message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyboardEvent {
    /// Virtual key code as reported by the platform.
    pub code: u32,
    pub direction: KeyDirection,
}

/// A semantic mouse event decoded from one native message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MouseEvent {
    /// The cursor moved to an absolute screen position.
    Move { x: i32, y: i32 },
    /// The vertical wheel was scrolled; positive delta is away from the user.
    Wheel { x: i32, y: i32, delta: i16 },
    /// A button changed state.  Down/Up/Double comes from the native message
    /// code, not from application-level debouncing.
    Button {
        button: MouseButton,
        click: ClickKind,
        x: i32,
        y: i32,
    },
}

/// Unified event type carried by the hook event bus.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    Key(KeyboardEvent),
    Mouse(MouseEvent),
}

/// Which hook type an instance manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    Keyboard,
    Mouse,
}

impl std::fmt::Display for HookKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Keyboard => "keyboard",
            Self::Mouse => "mouse",
        })
    }
}

/// Error type for hook lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    /// The platform refused to install the hook (privilege, resource
    /// exhaustion, or the hook thread failed to start).
    #[error("failed to install {kind} hook: {reason}")]
    InstallFailed { kind: HookKind, reason: String },

    /// The platform reported a removal failure.  Fatal to shutdown, but the
    /// caller must still proceed to release other resources.
    #[error("failed to remove {kind} hook: {reason}")]
    RemovalFailed { kind: HookKind, reason: String },

    /// The global registration slot for this hook type is held by another
    /// instance.
    #[error("{kind} hook is already installed by another instance")]
    SlotBusy { kind: HookKind },

    /// No hook implementation exists for this platform.
    #[error("global input hooks are not supported on this platform")]
    UnsupportedPlatform,
}

/// A global low-level input hook for one input class.
///
/// `start()` and `stop()` are both idempotent: starting an installed hook and
/// stopping a not-installed hook are no-ops.
pub trait InputHook: Send {
    fn kind(&self) -> HookKind;

    /// Registers a subscriber.  Subscribers are invoked synchronously on the
    /// hook thread, in subscription order, for every decoded event.
    fn subscribe(&self, subscriber: Arc<dyn Fn(&InputEvent) + Send + Sync>);

    /// Installs the system-wide hook.
    ///
    /// # Errors
    ///
    /// Returns [`HookError::InstallFailed`] if the platform refuses the
    /// installation (after clearing any partial state), or
    /// [`HookError::SlotBusy`] if another instance holds the registration
    /// slot for this hook type.
    fn start(&mut self) -> Result<(), HookError>;

    /// Removes the hook, releases the registration slot, and drops all
    /// subscribers.  A session that restarts the hook must subscribe again;
    /// nothing from the previous session keeps receiving events.
    ///
    /// # Errors
    ///
    /// Returns [`HookError::RemovalFailed`] if the platform reports a
    /// removal failure.  The slot and subscribers are released regardless.
    fn stop(&mut self) -> Result<(), HookError>;

    fn is_installed(&self) -> bool;
}

/// Constructs the platform keyboard and mouse hooks.
///
/// # Errors
///
/// Returns [`HookError::UnsupportedPlatform`] on platforms without a global
/// input-interception primitive.
#[cfg(target_os = "windows")]
pub fn platform_hooks() -> Result<(Box<dyn InputHook>, Box<dyn InputHook>), HookError> {
    Ok((
        Box::new(windows::WindowsInputHook::keyboard()),
        Box::new(windows::WindowsInputHook::mouse()),
    ))
}

/// Constructs the platform keyboard and mouse hooks.
///
/// # Errors
///
/// Always fails: no global input-interception primitive on this platform.
#[cfg(not(target_os = "windows"))]
pub fn platform_hooks() -> Result<(Box<dyn InputHook>, Box<dyn InputHook>), HookError> {
    Err(HookError::UnsupportedPlatform)
}

// ── Event bus ─────────────────────────────────────────────────────────────────

/// Fan-out of decoded events to registered subscribers.
///
/// Dispatch is synchronous and in subscription order.  A panicking
/// subscriber is logged and skipped; it can never prevent the remaining
/// subscribers from running or the native event from being forwarded.
pub struct EventBus<E> {
    subscribers: RwLock<Vec<Arc<dyn Fn(&E) + Send + Sync>>>,
}

impl<E> EventBus<E> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
        }
    }

    pub fn subscribe(&self, subscriber: Arc<dyn Fn(&E) + Send + Sync>) {
        let mut subscribers = self
            .subscribers
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        subscribers.push(subscriber);
    }

    /// Delivers `event` to every subscriber, containing panics per subscriber.
    pub fn dispatch(&self, event: &E) {
        let subscribers = self
            .subscribers
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        for subscriber in subscribers.iter() {
            if panic::catch_unwind(AssertUnwindSafe(|| subscriber(event))).is_err() {
                warn!("input subscriber panicked; event still forwarded");
            }
        }
    }

    /// Drops every subscriber.  Hooks call this on `stop()` so a later
    /// session starts from an empty bus instead of stacking its subscribers
    /// on top of the previous session's.
    pub fn clear(&self) {
        self.subscribers
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clear();
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

// ── Registration slot ─────────────────────────────────────────────────────────

/// Explicit acquire/release guard for the per-hook-type global registration
/// slot.
///
/// The platform interception primitive is a single global slot per hook
/// type, not per-instance, so exactly one live registration may exist at a
/// time.  `try_acquire` refuses a second acquisition until `release`.
#[derive(Debug)]
pub struct HookSlot {
    installed: AtomicBool,
}

impl HookSlot {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            installed: AtomicBool::new(false),
        }
    }

    /// Claims the slot.  Returns `false` if it is already held.
    pub fn try_acquire(&self) -> bool {
        self.installed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn release(&self) {
        self.installed.store(false, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_installed(&self) -> bool {
        self.installed.load(Ordering::SeqCst)
    }
}

impl Default for HookSlot {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
