//! Integration tests for the telemetry-core record model.
//!
//! These tests pin the exact wire form of every record category through the
//! public API, since downstream log consumers parse these lines verbatim.

use telemetry_core::{
    BoundingBox, ClickKind, ElementChangeKind, ElementId, FailureSeverity, KeyDirection,
    LifecycleMarker, MouseButton, Point3, Record, RecordCategory,
};

#[test]
fn test_every_line_starts_with_category_then_ticks() {
    let records = vec![
        Record::mouse_move(100, 1, 2),
        Record::mouse_wheel(100, 1, 2, 120),
        Record::mouse_button(100, 1, 2, MouseButton::Right, ClickKind::Double),
        Record::keyboard(100, 13, KeyDirection::Down),
        Record::lifecycle(100, LifecycleMarker::Started),
        Record::document_open(100, "C:/models/a.rvt"),
        Record::command(100, "Wall", "ID_WALL", "17"),
        Record::element_deleted(100, "carol", ElementId(9)),
    ];

    for record in records {
        let line = record.to_line();
        let mut parts = line.split(", ");
        assert_eq!(parts.next().unwrap(), record.category().to_string());
        assert_eq!(parts.next().unwrap(), "100");
    }
}

#[test]
fn test_single_left_click_at_120_340() {
    let line = Record::mouse_button(555, 120, 340, MouseButton::Left, ClickKind::Down).to_line();
    assert_eq!(line, "Mouse, 555, 120, 340, Left, Down");
}

#[test]
fn test_double_click_marker() {
    let line = Record::mouse_button(1, 0, 0, MouseButton::Middle, ClickKind::Double).to_line();
    assert!(line.ends_with(", Middle, Double"));
}

#[test]
fn test_command_line_order_is_name_id_cookie() {
    let line = Record::command(9, "Modify|Wall", "ID_OBJECTS_WALL", "4711").to_line();
    assert_eq!(line, "Command, 9, Modify|Wall, ID_OBJECTS_WALL, 4711");
}

#[test]
fn test_document_open_line() {
    let line = Record::document_open(8, "C:/models/tower.rvt").to_line();
    assert_eq!(line, "DocumentOpen, 8, C:/models/tower.rvt");
}

#[test]
fn test_lifecycle_lines() {
    assert_eq!(
        Record::lifecycle(3, LifecycleMarker::Started).to_line(),
        "Lifecycle, 3, Started"
    );
    assert_eq!(
        Record::lifecycle(4, LifecycleMarker::Stopped).to_line(),
        "Lifecycle, 4, Stopped"
    );
}

#[test]
fn test_modified_snapshot_uses_upper_case_marker() {
    let bounding_box = BoundingBox {
        min: Point3::new(-1.0, -1.0, 0.0),
        max: Point3::new(1.0, 1.0, 3.0),
    };
    let line = Record::element_snapshot(
        12,
        "dave",
        ElementChangeKind::Modified,
        ElementId(7),
        "Doors",
        &bounding_box,
        "FamilyInstance",
        "Single-Flush",
        "3D View 1",
        "C:/models/tower.rvt",
    )
    .to_line();

    assert!(line.starts_with("ElementChange, 12, dave, MODIFIED, Doors, "));
    assert!(line.contains("(-1.000, -1.000, 0.000), (1.000, 1.000, 3.000)"));
    assert!(line.ends_with(", FamilyInstance, Single-Flush, 7, 3D View 1, C:/models/tower.rvt"));
}

#[test]
fn test_failure_lines_discriminate_severity() {
    let error =
        Record::failure(20, FailureSeverity::Error, "erin", "Create Wall", "overlap", "E123");
    let warning =
        Record::failure(20, FailureSeverity::Warning, "erin", "Create Wall", "slightly off", "W9");

    assert_eq!(
        error.to_line(),
        "Error, 20, erin, Create Wall, overlap, E123"
    );
    assert_eq!(
        warning.to_line(),
        "Warning, 20, erin, Create Wall, slightly off, W9"
    );
    assert_eq!(error.category(), RecordCategory::Error);
}
