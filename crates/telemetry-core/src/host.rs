//! Host-facing domain surface.
//!
//! The recorder is embedded inside a larger host application.  This module
//! defines the boundary it consumes: lifecycle callbacks the host pushes into
//! the recorder, and the queries the recorder makes back into the host while
//! handling a callback (active document, active view, current selection,
//! per-element geometry).
//!
//! Everything here is a trait or a plain data type.  The production host glue
//! lives outside this workspace; tests drive the event bridge through mock
//! implementations of the same traits.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Identifier of a host document element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(pub i64);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A point in host model space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    #[must_use]
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for Point3 {
    /// Renders as `(x, y, z)` with three decimal places, the form element
    /// geometry takes inside a record line.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3}, {:.3})", self.x, self.y, self.z)
    }
}

/// Axis-aligned bounding box of an element.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Point3,
    pub max: Point3,
}

/// Snapshot of one element, queried from the host at callback time.
///
/// `bounding_box` is `None` for elements the host cannot provide geometry
/// for (view-specific annotations, unplaced types); the bridge skips the
/// record for such elements rather than emitting a short line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementInfo {
    pub category: String,
    pub type_name: String,
    pub name: String,
    pub bounding_box: Option<BoundingBox>,
}

/// Descriptor of an executed host command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandInfo {
    /// Display name as shown in the host UI.
    pub name: String,
    /// Stable command identifier.
    pub id: String,
    /// Opaque cookie attached by the host's command framework.
    pub cookie: String,
}

/// Element ids affected by one document-changed callback.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub added: Vec<ElementId>,
    pub deleted: Vec<ElementId>,
    pub modified: Vec<ElementId>,
}

/// Severity of one failure message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureSeverity {
    Warning,
    Error,
}

/// One failure message inside a failures-processing callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureNote {
    pub severity: FailureSeverity,
    pub description: String,
    pub definition_id: String,
}

/// Accessor for the failure set of one failures-processing callback.
///
/// `mark_journaled` must acknowledge every message so the host does not
/// re-surface them; the bridge calls it exactly once per callback.
pub trait FailureBatch {
    /// Name of the transaction the failures were raised in.
    fn transaction_name(&self) -> String;

    /// All failure messages in this batch.
    fn messages(&self) -> Vec<FailureNote>;

    /// Marks the batch as journaled (acknowledged) in the host.
    fn mark_journaled(&self);
}

/// On-demand queries into host state, valid for the duration of a callback.
pub trait HostContext: Send + Sync {
    /// The host username for record attribution.
    fn username(&self) -> String;

    /// Path of the active document.
    fn active_document_path(&self) -> String;

    /// Name of the active view.
    fn active_view_name(&self) -> String;

    /// Element ids currently selected.
    fn selection(&self) -> Vec<ElementId>;

    /// Snapshot of one element, or `None` if the host no longer knows it.
    fn element(&self, id: ElementId) -> Option<ElementInfo>;
}

/// The recorder-side receiver of host lifecycle callbacks.
///
/// Implemented by the event bridge.  Handlers run synchronously on whichever
/// thread the host dispatches its callbacks from and must not block.
pub trait HostEventSink: Send + Sync {
    /// A document finished opening.
    fn document_opened(&self, path: &str);

    /// A UI command was executed.
    fn command_executed(&self, command: &CommandInfo);

    /// A document transaction changed elements.
    fn document_changed(&self, context: &dyn HostContext, changes: &ChangeSet);

    /// The host is processing a batch of failures.
    fn failures_processing(&self, context: &dyn HostContext, batch: &dyn FailureBatch);
}

/// The host-side subscription surface.
///
/// Exactly one sink may be subscribed at a time; subscribing replaces any
/// previous sink and unsubscribing stops all callback delivery.
pub trait HostEventSource: Send + Sync {
    fn subscribe(&self, sink: Arc<dyn HostEventSink>);
    fn unsubscribe(&self);
}

// ── Tests ─────────────────────────────────────────────────────────────────────
