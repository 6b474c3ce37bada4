//! # telemetry-core
//!
//! Shared library for the activity telemetry recorder containing the record
//! model, the tick timestamp encoding, and the host-facing domain surface.
//!
//! This crate is used by the recorder application and by any host glue that
//! feeds domain events into it.  It has zero dependencies on OS APIs, UI
//! frameworks, or network sockets.
//!
//! # Architecture overview
//!
//! The recorder is an embedded observer: it watches three independent event
//! streams (global keyboard input, global mouse input, and host-application
//! domain events) plus a periodic screen snapshot, normalizes everything into
//! timestamped text records, and appends those records to a local log file
//! set and an optional remote stream.
//!
//! This crate (`telemetry-core`) is the shared foundation.  It defines:
//!
//! - **`record`** – The unit of telemetry.  A [`Record`] is a category, a
//!   tick timestamp, and an ordered field list; it renders to exactly one
//!   comma-and-space separated line.  The line vocabulary (category names,
//!   button names, the `Whell` wheel marker) is a fixed legacy format that
//!   downstream consumers already parse, so it is hand rendered rather than
//!   serde-derived.
//!
//! - **`host`** – The surface the recorder *consumes* from its embedding
//!   host: lifecycle callbacks (document opened/changed, command executed,
//!   failures processing) and on-demand queries (active document, active
//!   view, selection, per-element geometry).  Everything is expressed as
//!   traits so tests can drive the bridge with mock hosts.

pub mod host;
pub mod record;

// Re-export the most-used types at the crate root so callers can write
// `telemetry_core::Record` instead of `telemetry_core::record::Record`.
pub use host::{
    BoundingBox, ChangeSet, CommandInfo, ElementId, ElementInfo, FailureBatch, FailureNote,
    FailureSeverity, HostContext, HostEventSink, HostEventSource, Point3,
};
pub use record::{
    now_ticks, ClickKind, ElementChangeKind, KeyDirection, LifecycleMarker, MouseButton, Record,
    RecordCategory, Ticks,
};
