//! Windows low-level keyboard and mouse hook implementation.
//!
//! Each hook installs its `WH_KEYBOARD_LL` / `WH_MOUSE_LL` registration on a
//! dedicated Win32 message-loop thread: `SetWindowsHookExW` ties the hook to
//! the installing thread's message loop, and `stop()` posts `WM_QUIT` to that
//! thread so the loop exits, unhooks, and reports the removal result.
//!
//! # Safety
//!
//! This module uses `unsafe` code exclusively for Windows API FFI calls.
//! All `unsafe` blocks are annotated with `// SAFETY:` comments.

#![cfg(target_os = "windows")]

use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, RwLock};
use std::thread::{self, JoinHandle};

use windows::Win32::Foundation::{LPARAM, LRESULT, WPARAM};
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, DispatchMessageW, GetMessageW, PeekMessageW, PostThreadMessageW,
    SetWindowsHookExW, UnhookWindowsHookEx, HC_ACTION, HHOOK, KBDLLHOOKSTRUCT, MSG,
    MSLLHOOKSTRUCT, PM_NOREMOVE, WH_KEYBOARD_LL, WH_MOUSE_LL, WINDOWS_HOOK_ID, WM_QUIT, WM_USER,
};

use super::decode::{relay_key, relay_mouse, NativeKeyMessage, NativeMouseMessage};
use super::{EventBus, HookError, HookKind, HookSlot, InputEvent, InputHook};

type BusCell = RwLock<Option<Arc<EventBus<InputEvent>>>>;
type HookProc = unsafe extern "system" fn(i32, WPARAM, LPARAM) -> LRESULT;

/// Dispatch target for the keyboard hook procedure.  Hook procedures are
/// plain function pointers with no closure state, so the bus they fan out to
/// lives in a per-hook-type static cell, populated by `start()` and cleared
/// by `stop()`.
static KEYBOARD_BUS: BusCell = RwLock::new(None);
static MOUSE_BUS: BusCell = RwLock::new(None);

/// One live registration per hook type, process-wide.
static KEYBOARD_SLOT: HookSlot = HookSlot::new();
static MOUSE_SLOT: HookSlot = HookSlot::new();

/// Handle to a running hook message-loop thread.
struct HookWorker {
    /// Win32 thread id, target of the `WM_QUIT` shutdown post.
    win32_thread_id: u32,
    /// Joins to the removal result once the loop exits.
    join: JoinHandle<Result<(), String>>,
}

/// A Windows global low-level input hook for one input class.
pub struct WindowsInputHook {
    kind: HookKind,
    hook_id: WINDOWS_HOOK_ID,
    hook_proc: HookProc,
    bus_cell: &'static BusCell,
    slot: &'static HookSlot,
    bus: Arc<EventBus<InputEvent>>,
    worker: Option<HookWorker>,
    holds_slot: bool,
}

impl WindowsInputHook {
    /// Creates the (unstarted) global keyboard hook.
    #[must_use]
    pub fn keyboard() -> Self {
        Self {
            kind: HookKind::Keyboard,
            hook_id: WH_KEYBOARD_LL,
            hook_proc: keyboard_hook_proc,
            bus_cell: &KEYBOARD_BUS,
            slot: &KEYBOARD_SLOT,
            bus: Arc::new(EventBus::new()),
            worker: None,
            holds_slot: false,
        }
    }

    /// Creates the (unstarted) global mouse hook.
    #[must_use]
    pub fn mouse() -> Self {
        Self {
            kind: HookKind::Mouse,
            hook_id: WH_MOUSE_LL,
            hook_proc: mouse_hook_proc,
            bus_cell: &MOUSE_BUS,
            slot: &MOUSE_SLOT,
            bus: Arc::new(EventBus::new()),
            worker: None,
            holds_slot: false,
        }
    }

    fn clear_registration(&mut self) {
        let mut cell = self
            .bus_cell
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *cell = None;
        drop(cell);
        self.bus.clear();
        if self.holds_slot {
            self.slot.release();
            self.holds_slot = false;
        }
    }
}

impl InputHook for WindowsInputHook {
    fn kind(&self) -> HookKind {
        self.kind
    }

    fn subscribe(&self, subscriber: Arc<dyn Fn(&InputEvent) + Send + Sync>) {
        self.bus.subscribe(subscriber);
    }

    fn start(&mut self) -> Result<(), HookError> {
        if self.worker.is_some() {
            return Ok(());
        }
        if !self.slot.try_acquire() {
            return Err(HookError::SlotBusy { kind: self.kind });
        }
        self.holds_slot = true;

        {
            let mut cell = self
                .bus_cell
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            *cell = Some(Arc::clone(&self.bus));
        }

        match spawn_hook_worker(self.kind, self.hook_id, self.hook_proc) {
            Ok(worker) => {
                self.worker = Some(worker);
                Ok(())
            }
            Err(error) => {
                // Clear the partial registration before surfacing the error.
                let _ = self.stop();
                Err(error)
            }
        }
    }

    fn stop(&mut self) -> Result<(), HookError> {
        let Some(worker) = self.worker.take() else {
            self.clear_registration();
            return Ok(());
        };

        // SAFETY: plain Win32 call; the target thread's message queue exists
        // because the worker touches it before reporting readiness.
        let posted =
            unsafe { PostThreadMessageW(worker.win32_thread_id, WM_QUIT, WPARAM(0), LPARAM(0)) };
        if posted.is_err() {
            // Cannot reach the loop, so joining would hang; release the
            // registration bookkeeping and report the removal failure.
            self.clear_registration();
            return Err(HookError::RemovalFailed {
                kind: self.kind,
                reason: "failed to post WM_QUIT to the hook thread".to_string(),
            });
        }

        let removal = worker.join.join();
        self.clear_registration();

        match removal {
            Ok(Ok(())) => Ok(()),
            Ok(Err(reason)) => Err(HookError::RemovalFailed {
                kind: self.kind,
                reason,
            }),
            Err(_) => Err(HookError::RemovalFailed {
                kind: self.kind,
                reason: "hook thread panicked".to_string(),
            }),
        }
    }

    fn is_installed(&self) -> bool {
        self.worker.is_some()
    }
}

impl Drop for WindowsInputHook {
    /// A registration left behind at process exit corrupts the OS-wide
    /// interception chain for other processes, so dropping an installed hook
    /// removes it.  Orderly shutdown goes through `stop()` and sees errors;
    /// this path cannot report them.
    fn drop(&mut self) {
        if self.worker.is_some() {
            let _ = self.stop();
        }
    }
}

/// Spawns the message-loop thread and waits for it to report whether the
/// platform accepted the hook installation.
fn spawn_hook_worker(
    kind: HookKind,
    hook_id: WINDOWS_HOOK_ID,
    hook_proc: HookProc,
) -> Result<HookWorker, HookError> {
    let (ready_tx, ready_rx) = mpsc::channel::<Result<u32, String>>();

    let join = thread::Builder::new()
        .name(format!("telemetry-{kind}-hook"))
        .spawn(move || run_hook_message_loop(hook_id, hook_proc, &ready_tx))
        .map_err(|e| HookError::InstallFailed {
            kind,
            reason: e.to_string(),
        })?;

    match ready_rx.recv() {
        Ok(Ok(win32_thread_id)) => Ok(HookWorker {
            win32_thread_id,
            join,
        }),
        Ok(Err(reason)) => {
            let _ = join.join();
            Err(HookError::InstallFailed { kind, reason })
        }
        Err(_) => {
            let _ = join.join();
            Err(HookError::InstallFailed {
                kind,
                reason: "hook thread exited before reporting readiness".to_string(),
            })
        }
    }
}

/// Body of the dedicated hook message-loop thread.
///
/// Returns the result of the final `UnhookWindowsHookEx`, which `stop()`
/// surfaces as [`HookError::RemovalFailed`].
fn run_hook_message_loop(
    hook_id: WINDOWS_HOOK_ID,
    hook_proc: HookProc,
    ready_tx: &Sender<Result<u32, String>>,
) -> Result<(), String> {
    // SAFETY: SetWindowsHookExW ties the hook to the calling thread's message
    // loop; this function is that thread.
    let hook: HHOOK = match unsafe { SetWindowsHookExW(hook_id, Some(hook_proc), None, 0) } {
        Ok(hook) => hook,
        Err(error) => {
            let _ = ready_tx.send(Err(error.to_string()));
            return Ok(());
        }
    };

    // Touch the message queue before reporting readiness so a later
    // PostThreadMessageW from stop() cannot race its creation.
    let mut msg = MSG::default();
    // SAFETY: PM_NOREMOVE peek with a valid MSG out-pointer.
    unsafe {
        let _ = PeekMessageW(&mut msg, None, WM_USER, WM_USER, PM_NOREMOVE);
        let _ = ready_tx.send(Ok(GetCurrentThreadId()));
    }

    // SAFETY: standard Win32 GetMessage/DispatchMessage loop; blocks until
    // WM_QUIT is posted by stop().
    unsafe {
        while GetMessageW(&mut msg, None, 0, 0).as_bool() {
            DispatchMessageW(&msg);
        }
    }

    // SAFETY: the hook handle is the one installed above.
    unsafe { UnhookWindowsHookEx(hook) }.map_err(|e| e.to_string())
}

/// Low-level keyboard hook procedure.
///
/// # Safety
///
/// Called by Windows on the hook thread.  Must return quickly (< ~300 ms) to
/// avoid hook removal by the OS, and must always hand the event to the next
/// hook in the chain.
unsafe extern "system" fn keyboard_hook_proc(
    n_code: i32,
    w_param: WPARAM,
    l_param: LPARAM,
) -> LRESULT {
    if n_code == HC_ACTION as i32 {
        // SAFETY: l_param points to a KBDLLHOOKSTRUCT when n_code == HC_ACTION.
        let kbs = &*(l_param.0 as *const KBDLLHOOKSTRUCT);
        let native = NativeKeyMessage {
            message: w_param.0 as u32,
            vk_code: kbs.vkCode,
        };
        if let Ok(cell) = KEYBOARD_BUS.read() {
            if let Some(bus) = cell.as_ref() {
                relay_key(bus, &native);
            }
        }
    }

    // SAFETY: unconditional chain forwarding; subscribers can never consume
    // the event on behalf of other processes.
    CallNextHookEx(None, n_code, w_param, l_param)
}

/// Low-level mouse hook procedure.
///
/// # Safety
///
/// Called by Windows on the hook thread; same timing and forwarding rules as
/// the keyboard procedure.
unsafe extern "system" fn mouse_hook_proc(
    n_code: i32,
    w_param: WPARAM,
    l_param: LPARAM,
) -> LRESULT {
    if n_code == HC_ACTION as i32 {
        // SAFETY: l_param points to a MSLLHOOKSTRUCT when n_code == HC_ACTION.
        let mhs = &*(l_param.0 as *const MSLLHOOKSTRUCT);
        let native = NativeMouseMessage {
            message: w_param.0 as u32,
            x: mhs.pt.x,
            y: mhs.pt.y,
            mouse_data: mhs.mouseData,
        };
        if let Ok(cell) = MOUSE_BUS.read() {
            if let Some(bus) = cell.as_ref() {
                relay_mouse(bus, &native);
            }
        }
    }

    // SAFETY: unconditional chain forwarding.
    CallNextHookEx(None, n_code, w_param, l_param)
}
