//! Rendering of host application events into `Project.log` records.
//!
//! The bridge implements `telemetry-core`'s [`HostEventSink`] and is handed
//! to whatever [`HostEventSource`](telemetry_core::HostEventSource) the
//! recorder is attached to.  Host callbacks cannot return errors to the
//! host, so every failure here is logged and swallowed; one element that
//! cannot be described must never cost the records of its neighbours in
//! the same change set.

use std::sync::Arc;

use telemetry_core::{
    now_ticks, ChangeSet, CommandInfo, ElementChangeKind, ElementId, FailureBatch, HostContext,
    HostEventSink, Record, Ticks,
};
use tracing::{error, warn};

use crate::infrastructure::sink::DualSink;

/// Writes host events to the project stream.
pub struct EventBridge {
    project: Arc<DualSink>,
}

impl EventBridge {
    #[must_use]
    pub fn new(project: Arc<DualSink>) -> Self {
        Self { project }
    }

    fn emit(&self, record: &Record) {
        if let Err(err) = self.project.emit(record) {
            error!("failed to record host event: {err}");
        }
    }

    /// Builds the full snapshot record for an added or modified element, or
    /// `None` when the host cannot describe it.  The snapshot form has a
    /// fixed field count, so an element with no geometry is skipped rather
    /// than written short.
    fn snapshot(
        &self,
        ticks: Ticks,
        context: &dyn HostContext,
        user: &str,
        kind: ElementChangeKind,
        id: ElementId,
    ) -> Option<Record> {
        let Some(info) = context.element(id) else {
            warn!(element = %id, "change set names an element the host cannot describe");
            return None;
        };
        let Some(bounding_box) = info.bounding_box else {
            warn!(element = %id, "element has no geometry; skipping snapshot record");
            return None;
        };
        Some(Record::element_snapshot(
            ticks,
            user,
            kind,
            id,
            &info.category,
            &bounding_box,
            &info.type_name,
            &info.name,
            &context.active_view_name(),
            &context.active_document_path(),
        ))
    }
}

impl HostEventSink for EventBridge {
    fn document_opened(&self, path: &str) {
        self.emit(&Record::document_open(now_ticks(), path));
    }

    fn command_executed(&self, command: &CommandInfo) {
        self.emit(&Record::command(
            now_ticks(),
            &command.name,
            &command.id,
            &command.cookie,
        ));
    }

    fn document_changed(&self, context: &dyn HostContext, changes: &ChangeSet) {
        let ticks = now_ticks();
        let user = context.username();
        let selection = context.selection();

        for id in &changes.deleted {
            self.emit(&Record::element_deleted(ticks, &user, *id));
        }
        for id in &changes.added {
            if let Some(record) =
                self.snapshot(ticks, context, &user, ElementChangeKind::Added, *id)
            {
                self.emit(&record);
            }
        }
        // A change transaction touches many elements incidentally; only the
        // ones the user had selected count as deliberate modifications.
        for id in &changes.modified {
            if !selection.contains(id) {
                continue;
            }
            if let Some(record) =
                self.snapshot(ticks, context, &user, ElementChangeKind::Modified, *id)
            {
                self.emit(&record);
            }
        }
    }

    fn failures_processing(&self, context: &dyn HostContext, batch: &dyn FailureBatch) {
        let ticks = now_ticks();
        let user = context.username();
        let transaction = batch.transaction_name();

        for note in batch.messages() {
            self.emit(&Record::failure(
                ticks,
                note.severity,
                &user,
                &transaction,
                &note.description,
                &note.definition_id,
            ));
        }
        batch.mark_journaled();
    }
}

impl std::fmt::Debug for EventBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBridge").finish_non_exhaustive()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use telemetry_core::{
        BoundingBox, ElementInfo, FailureNote, FailureSeverity, HostEventSource, Point3,
    };

    use crate::infrastructure::host_bridge::mock::{MockFailureBatch, MockHost};

    use super::*;

    fn project_sink(dir: &std::path::Path) -> Arc<DualSink> {
        Arc::new(DualSink::open(&dir.join("Project.log"), None).unwrap())
    }

    fn project_lines(dir: &std::path::Path) -> Vec<String> {
        std::fs::read_to_string(dir.join("Project.log"))
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn wall(id: i64) -> ElementInfo {
        ElementInfo {
            category: "Walls".to_string(),
            type_name: "Basic Wall".to_string(),
            name: format!("Wall {id}"),
            bounding_box: Some(BoundingBox {
                min: Point3::new(0.0, 0.0, 0.0),
                max: Point3::new(4.0, 0.2, 3.0),
            }),
        }
    }

    #[test]
    fn test_document_and_command_events_land_in_the_project_stream() {
        let dir = tempfile::tempdir().unwrap();
        let host = MockHost::new("alice", "tower.db", "Level 1");
        host.subscribe(Arc::new(EventBridge::new(project_sink(dir.path()))));

        host.fire_document_opened("C:/projects/tower.db");
        host.fire_command_executed(&CommandInfo {
            name: "Wall".to_string(),
            id: "ID_WALL".to_string(),
            cookie: "12".to_string(),
        });

        let lines = project_lines(dir.path());
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("DocumentOpen, "));
        assert!(lines[0].ends_with(", C:/projects/tower.db"));
        assert!(lines[1].starts_with("Command, "));
        assert!(lines[1].ends_with(", Wall, ID_WALL, 12"));
    }

    #[test]
    fn test_unselected_modifications_are_filtered_out() {
        let dir = tempfile::tempdir().unwrap();
        let host = MockHost::new("alice", "tower.db", "Level 1");
        host.put_element(ElementId(5), wall(5));
        host.subscribe(Arc::new(EventBridge::new(project_sink(dir.path()))));

        // Deletions of 5 and 9, plus a modification of 5 with nothing
        // selected: the modification is incidental and must not appear.
        let changes = ChangeSet {
            added: vec![],
            deleted: vec![ElementId(5), ElementId(9)],
            modified: vec![ElementId(5)],
        };
        host.fire_document_changed(&changes);

        let lines = project_lines(dir.path());
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|l| l.contains(", Deleted, ")));
        assert!(!lines.iter().any(|l| l.contains("MODIFIED")));
    }

    #[test]
    fn test_selected_modification_produces_a_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let host = MockHost::new("bob", "plant.db", "East Elevation");
        host.put_element(ElementId(7), wall(7));
        host.set_selection(vec![ElementId(7)]);
        host.subscribe(Arc::new(EventBridge::new(project_sink(dir.path()))));

        let changes = ChangeSet {
            added: vec![],
            deleted: vec![],
            modified: vec![ElementId(7)],
        };
        host.fire_document_changed(&changes);

        let lines = project_lines(dir.path());
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains(
            ", bob, MODIFIED, Walls, (0.000, 0.000, 0.000), (4.000, 0.200, 3.000), \
             Basic Wall, Wall 7, 7, East Elevation, plant.db"
        ));
    }

    #[test]
    fn test_indescribable_added_element_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let host = MockHost::new("alice", "tower.db", "Level 1");
        // 21 is unknown to the host; 22 is fine.
        host.put_element(ElementId(22), wall(22));
        host.subscribe(Arc::new(EventBridge::new(project_sink(dir.path()))));

        let changes = ChangeSet {
            added: vec![ElementId(21), ElementId(22)],
            deleted: vec![],
            modified: vec![],
        };
        host.fire_document_changed(&changes);

        let lines = project_lines(dir.path());
        assert_eq!(lines.len(), 1, "only the describable element is recorded");
        assert!(lines[0].contains(", ADDED, "));
        assert!(lines[0].contains("Wall 22"));
    }

    #[test]
    fn test_failure_batch_is_recorded_and_journaled_once() {
        let dir = tempfile::tempdir().unwrap();
        let host = MockHost::new("carol", "tower.db", "Level 2");
        host.subscribe(Arc::new(EventBridge::new(project_sink(dir.path()))));

        let batch = MockFailureBatch::new(
            "Delete walls",
            vec![
                FailureNote {
                    severity: FailureSeverity::Warning,
                    description: "Wall is slightly off axis".to_string(),
                    definition_id: "wall-off-axis".to_string(),
                },
                FailureNote {
                    severity: FailureSeverity::Error,
                    description: "Room boundary lost".to_string(),
                    definition_id: "room-no-boundary".to_string(),
                },
            ],
        );
        host.fire_failures_processing(&batch);

        let lines = project_lines(dir.path());
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Warning, "));
        assert!(lines[0].ends_with(", carol, Delete walls, Wall is slightly off axis, wall-off-axis"));
        assert!(lines[1].starts_with("Error, "));
        assert_eq!(batch.journaled_count(), 1);
    }
}
