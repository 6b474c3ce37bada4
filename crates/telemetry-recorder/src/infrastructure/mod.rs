//! Infrastructure layer: everything that touches an OS resource.
//!
//! - `input_capture` – global low-level keyboard/mouse hooks (Windows) plus
//!   the platform-neutral decode table and a mock hook for tests.
//! - `sink` – the dual file/socket record sink and the per-stream sink set.
//! - `screenshot` – the periodic screen capture worker.
//! - `storage` – TOML configuration persistence.
//! - `host_bridge` – stand-in and mock implementations of the host-facing
//!   callback surface.

pub mod host_bridge;
pub mod input_capture;
pub mod screenshot;
pub mod sink;
pub mod storage;
