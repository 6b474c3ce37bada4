//! The telemetry record model and its canonical line rendering.
//!
//! Every captured event – a keystroke, a mouse click, a host command, a
//! document change – becomes exactly one [`Record`], and every record renders
//! to exactly one comma-and-space separated line:
//!
//! ```text
//! <Category>, <ticks>, <field>, <field>, ...
//! ```
//!
//! Field order and count are fixed per category; the constructors in this
//! module are the only place that order is encoded.  Records are immutable
//! once constructed.
//!
//! # Tick timestamps
//!
//! Timestamps are an integer count of 100-nanosecond ticks since the Unix
//! epoch, rendered as a decimal string.  Ticks were chosen over formatted
//! wall-clock strings because they sort correctly as integers, carry no
//! locale, and are cheap to produce inside an input-hook callback.

use std::fmt;

use crate::host::{BoundingBox, ElementId};

/// Integer count of 100-nanosecond intervals since the Unix epoch.
pub type Ticks = i64;

/// Returns the current wall-clock time as [`Ticks`].
#[must_use]
pub fn now_ticks() -> Ticks {
    // timestamp_nanos overflows an i64 in the year 2262; fall back to
    // microsecond precision rather than panicking inside a hook callback.
    chrono::Utc::now()
        .timestamp_nanos_opt()
        .map_or_else(|| chrono::Utc::now().timestamp_micros() * 10, |ns| ns / 100)
}

// ── Line vocabulary ───────────────────────────────────────────────────────────

/// Category of a telemetry record.  The `Display` form is the first field of
/// every rendered line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordCategory {
    Command,
    ElementChange,
    DocumentOpen,
    Error,
    Warning,
    Mouse,
    Keyboard,
    Lifecycle,
}

impl fmt::Display for RecordCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Command => "Command",
            Self::ElementChange => "ElementChange",
            Self::DocumentOpen => "DocumentOpen",
            Self::Error => "Error",
            Self::Warning => "Warning",
            Self::Mouse => "Mouse",
            Self::Keyboard => "Keyboard",
            Self::Lifecycle => "Lifecycle",
        };
        f.write_str(name)
    }
}

/// Mouse button identifier as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    X1,
    X2,
}

impl fmt::Display for MouseButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Left => "Left",
            Self::Right => "Right",
            Self::Middle => "Middle",
            Self::X1 => "XButton1",
            Self::X2 => "XButton2",
        };
        f.write_str(name)
    }
}

/// Click discrimination for a mouse button record.
///
/// Derived from the native message code (`*BUTTONDOWN` / `*BUTTONUP` /
/// `*BUTTONDBLCLK`), never from application-level debouncing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickKind {
    Down,
    Up,
    Double,
}

impl fmt::Display for ClickKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Down => "Down",
            Self::Up => "Up",
            Self::Double => "Double",
        };
        f.write_str(name)
    }
}

/// Direction of a keyboard record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDirection {
    Down,
    Up,
}

impl fmt::Display for KeyDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Down => "Down",
            Self::Up => "Up",
        })
    }
}

/// Subtype marker of an element-change record.
///
/// The casing is uneven (`Deleted` vs `ADDED`/`MODIFIED`) because downstream
/// consumers already parse these exact spellings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementChangeKind {
    Deleted,
    Added,
    Modified,
}

impl fmt::Display for ElementChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Deleted => "Deleted",
            Self::Added => "ADDED",
            Self::Modified => "MODIFIED",
        })
    }
}

/// Marker of a recorder lifecycle record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleMarker {
    Started,
    Stopped,
}

impl fmt::Display for LifecycleMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Started => "Started",
            Self::Stopped => "Stopped",
        })
    }
}

// ── Record ────────────────────────────────────────────────────────────────────

/// One normalized, timestamped, line-serializable telemetry event.
///
/// Produced by the input hooks and the event bridge; consumed only by the
/// sinks.  There are no cross-record relationships.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    category: RecordCategory,
    ticks: Ticks,
    fields: Vec<String>,
}

impl Record {
    /// Creates a record from pre-rendered fields.
    ///
    /// Prefer the per-category constructors below; they are the single
    /// encoding of each category's field order.
    #[must_use]
    pub fn new(category: RecordCategory, ticks: Ticks, fields: Vec<String>) -> Self {
        Self {
            category,
            ticks,
            fields,
        }
    }

    #[must_use]
    pub fn category(&self) -> RecordCategory {
        self.category
    }

    #[must_use]
    pub fn ticks(&self) -> Ticks {
        self.ticks
    }

    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Renders the canonical single-line form, without a trailing newline.
    #[must_use]
    pub fn to_line(&self) -> String {
        let mut line = format!("{}, {}", self.category, self.ticks);
        for field in &self.fields {
            line.push_str(", ");
            line.push_str(field);
        }
        line
    }

    // ── Per-category constructors ─────────────────────────────────────────────

    /// `Mouse, <ticks>, <x>, <y>, Move`
    #[must_use]
    pub fn mouse_move(ticks: Ticks, x: i32, y: i32) -> Self {
        Self::new(
            RecordCategory::Mouse,
            ticks,
            vec![x.to_string(), y.to_string(), "Move".to_string()],
        )
    }

    /// `Mouse, <ticks>, <x>, <y>, Whell, <delta>`
    ///
    /// `Whell` is a historical misspelling preserved for log compatibility.
    #[must_use]
    pub fn mouse_wheel(ticks: Ticks, x: i32, y: i32, delta: i16) -> Self {
        Self::new(
            RecordCategory::Mouse,
            ticks,
            vec![
                x.to_string(),
                y.to_string(),
                "Whell".to_string(),
                delta.to_string(),
            ],
        )
    }

    /// `Mouse, <ticks>, <x>, <y>, <Button>, Down|Up|Double`
    #[must_use]
    pub fn mouse_button(ticks: Ticks, x: i32, y: i32, button: MouseButton, click: ClickKind) -> Self {
        Self::new(
            RecordCategory::Mouse,
            ticks,
            vec![
                x.to_string(),
                y.to_string(),
                button.to_string(),
                click.to_string(),
            ],
        )
    }

    /// `Keyboard, <ticks>, <keyCode>, Down|Up`
    #[must_use]
    pub fn keyboard(ticks: Ticks, key_code: u32, direction: KeyDirection) -> Self {
        Self::new(
            RecordCategory::Keyboard,
            ticks,
            vec![key_code.to_string(), direction.to_string()],
        )
    }

    /// `Lifecycle, <ticks>, Started|Stopped`
    #[must_use]
    pub fn lifecycle(ticks: Ticks, marker: LifecycleMarker) -> Self {
        Self::new(RecordCategory::Lifecycle, ticks, vec![marker.to_string()])
    }

    /// `DocumentOpen, <ticks>, <path>`
    #[must_use]
    pub fn document_open(ticks: Ticks, path: &str) -> Self {
        Self::new(RecordCategory::DocumentOpen, ticks, vec![path.to_string()])
    }

    /// `Command, <ticks>, <name>, <id>, <cookie>`
    #[must_use]
    pub fn command(ticks: Ticks, name: &str, id: &str, cookie: &str) -> Self {
        Self::new(
            RecordCategory::Command,
            ticks,
            vec![name.to_string(), id.to_string(), cookie.to_string()],
        )
    }

    /// `ElementChange, <ticks>, <user>, Deleted, <id>`
    #[must_use]
    pub fn element_deleted(ticks: Ticks, user: &str, id: ElementId) -> Self {
        Self::new(
            RecordCategory::ElementChange,
            ticks,
            vec![
                user.to_string(),
                ElementChangeKind::Deleted.to_string(),
                id.to_string(),
            ],
        )
    }

    /// `ElementChange, <ticks>, <user>, ADDED|MODIFIED, <category>, <min>,
    /// <max>, <type>, <name>, <id>, <view>, <document>`
    ///
    /// Shared by the added and modified subtypes; deleted elements no longer
    /// exist and use the short [`Record::element_deleted`] form instead.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn element_snapshot(
        ticks: Ticks,
        user: &str,
        kind: ElementChangeKind,
        id: ElementId,
        category: &str,
        bounding_box: &BoundingBox,
        type_name: &str,
        name: &str,
        view: &str,
        document: &str,
    ) -> Self {
        Self::new(
            RecordCategory::ElementChange,
            ticks,
            vec![
                user.to_string(),
                kind.to_string(),
                category.to_string(),
                bounding_box.min.to_string(),
                bounding_box.max.to_string(),
                type_name.to_string(),
                name.to_string(),
                id.to_string(),
                view.to_string(),
                document.to_string(),
            ],
        )
    }

    /// `Error|Warning, <ticks>, <user>, <transaction>, <description>, <definitionId>`
    #[must_use]
    pub fn failure(
        ticks: Ticks,
        severity: crate::host::FailureSeverity,
        user: &str,
        transaction: &str,
        description: &str,
        definition_id: &str,
    ) -> Self {
        let category = match severity {
            crate::host::FailureSeverity::Error => RecordCategory::Error,
            crate::host::FailureSeverity::Warning => RecordCategory::Warning,
        };
        Self::new(
            category,
            ticks,
            vec![
                user.to_string(),
                transaction.to_string(),
                description.to_string(),
                definition_id.to_string(),
            ],
        )
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
