//! Platform-neutral decode table from native hook messages to semantic
//! events.
//!
//! The `WM_*` message codes are defined here by value rather than imported
//! from the Windows bindings so the table compiles and is testable on every
//! platform; the Windows hook procedures feed it real messages, the mock
//! hook feeds it synthetic ones.
//!
//! Unknown message codes decode to `None`.  The caller still forwards the
//! native event down the OS chain – decoding and forwarding are independent.

use telemetry_core::{ClickKind, KeyDirection, MouseButton};

use super::{EventBus, InputEvent, KeyboardEvent, MouseEvent};

// ── Native message codes ──────────────────────────────────────────────────────

pub const WM_KEYDOWN: u32 = 0x0100;
pub const WM_KEYUP: u32 = 0x0101;
pub const WM_SYSKEYDOWN: u32 = 0x0104;
pub const WM_SYSKEYUP: u32 = 0x0105;

pub const WM_MOUSEMOVE: u32 = 0x0200;
pub const WM_LBUTTONDOWN: u32 = 0x0201;
pub const WM_LBUTTONUP: u32 = 0x0202;
pub const WM_LBUTTONDBLCLK: u32 = 0x0203;
pub const WM_RBUTTONDOWN: u32 = 0x0204;
pub const WM_RBUTTONUP: u32 = 0x0205;
pub const WM_RBUTTONDBLCLK: u32 = 0x0206;
pub const WM_MBUTTONDOWN: u32 = 0x0207;
pub const WM_MBUTTONUP: u32 = 0x0208;
pub const WM_MBUTTONDBLCLK: u32 = 0x0209;
pub const WM_MOUSEWHEEL: u32 = 0x020A;
pub const WM_XBUTTONDOWN: u32 = 0x020B;
pub const WM_XBUTTONUP: u32 = 0x020C;

/// High word of `mouse_data` identifying the first extended button.
const XBUTTON1: u16 = 1;

// ── Native message payloads ───────────────────────────────────────────────────

/// The fields of one low-level keyboard message a hook callback sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeKeyMessage {
    /// `WM_*` message code (the `wParam` of the hook callback).
    pub message: u32,
    /// Virtual key code from the keyboard hook struct.
    pub vk_code: u32,
}

/// The fields of one low-level mouse message a hook callback sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeMouseMessage {
    /// `WM_*` message code (the `wParam` of the hook callback).
    pub message: u32,
    /// Absolute cursor X in virtual screen coordinates.
    pub x: i32,
    /// Absolute cursor Y in virtual screen coordinates.
    pub y: i32,
    /// Message-specific data: wheel delta or extended-button id in the high
    /// word.
    pub mouse_data: u32,
}

// ── Decoding ──────────────────────────────────────────────────────────────────

/// Decodes one keyboard message, or `None` for message codes that carry no
/// key transition.
#[must_use]
pub fn decode_key(native: &NativeKeyMessage) -> Option<KeyboardEvent> {
    let direction = match native.message {
        WM_KEYDOWN | WM_SYSKEYDOWN => KeyDirection::Down,
        WM_KEYUP | WM_SYSKEYUP => KeyDirection::Up,
        _ => return None,
    };
    Some(KeyboardEvent {
        code: native.vk_code,
        direction,
    })
}

/// Decodes one mouse message, or `None` for message codes outside the
/// move/wheel/button taxonomy.
#[must_use]
pub fn decode_mouse(native: &NativeMouseMessage) -> Option<MouseEvent> {
    let (x, y) = (native.x, native.y);

    let button_event = |button, click| MouseEvent::Button {
        button,
        click,
        x,
        y,
    };

    let event = match native.message {
        WM_MOUSEMOVE => MouseEvent::Move { x, y },
        WM_MOUSEWHEEL => MouseEvent::Wheel {
            x,
            y,
            delta: wheel_delta(native.mouse_data),
        },
        WM_LBUTTONDOWN => button_event(MouseButton::Left, ClickKind::Down),
        WM_LBUTTONUP => button_event(MouseButton::Left, ClickKind::Up),
        WM_LBUTTONDBLCLK => button_event(MouseButton::Left, ClickKind::Double),
        WM_RBUTTONDOWN => button_event(MouseButton::Right, ClickKind::Down),
        WM_RBUTTONUP => button_event(MouseButton::Right, ClickKind::Up),
        WM_RBUTTONDBLCLK => button_event(MouseButton::Right, ClickKind::Double),
        WM_MBUTTONDOWN => button_event(MouseButton::Middle, ClickKind::Down),
        WM_MBUTTONUP => button_event(MouseButton::Middle, ClickKind::Up),
        WM_MBUTTONDBLCLK => button_event(MouseButton::Middle, ClickKind::Double),
        WM_XBUTTONDOWN => button_event(x_button(native.mouse_data), ClickKind::Down),
        WM_XBUTTONUP => button_event(x_button(native.mouse_data), ClickKind::Up),
        _ => return None,
    };
    Some(event)
}

/// Signed wheel delta from the high word of `mouse_data`.
fn wheel_delta(mouse_data: u32) -> i16 {
    (mouse_data >> 16) as u16 as i16
}

/// Extended-button discrimination from the high word of `mouse_data`.
fn x_button(mouse_data: u32) -> MouseButton {
    if (mouse_data >> 16) as u16 == XBUTTON1 {
        MouseButton::X1
    } else {
        MouseButton::X2
    }
}

// ── Relay helpers ─────────────────────────────────────────────────────────────

/// Decode-and-dispatch core of a keyboard hook callback.
///
/// The caller forwards the native event down the OS chain afterwards,
/// whether or not the message decoded.
pub fn relay_key(bus: &EventBus<InputEvent>, native: &NativeKeyMessage) {
    if let Some(event) = decode_key(native) {
        bus.dispatch(&InputEvent::Key(event));
    }
}

/// Decode-and-dispatch core of a mouse hook callback.
pub fn relay_mouse(bus: &EventBus<InputEvent>, native: &NativeMouseMessage) {
    if let Some(event) = decode_mouse(native) {
        bus.dispatch(&InputEvent::Mouse(event));
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
