//! Application layer: the recorder session and the policies that route
//! events into record streams.
//!
//! - [`input_log`] turns raw hook events into `Mouse` / `Keyboard` records
//!   and picks the stream each one belongs to.
//! - [`event_bridge`] renders host application events (documents, commands,
//!   element changes, failures) into `Project.log` records.
//! - [`recorder`] owns the session lifecycle: bring-up order, the running
//!   set of resources, and orderly teardown.

pub mod event_bridge;
pub mod input_log;
pub mod recorder;

pub use event_bridge::EventBridge;
pub use input_log::InputLogger;
pub use recorder::{Recorder, RecorderError, RecorderOptions, RecorderState};
