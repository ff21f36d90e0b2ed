//! Pointer sessions driven end to end through the public engine API.

use std::time::{Duration as StdDuration, Instant};

use chrono::NaiveDateTime;
use resource_gantt::engine::{EventLog, GanttEvent, Hit, HitTarget, Point};
use resource_gantt::model::{calendar, ResourceKind};
use resource_gantt::{EditRejection, Gantt, GanttOptions, PositionUpdate, Resource, Surface, TaskRecord, ViewMode};

fn dt(s: &str) -> NaiveDateTime {
    calendar::parse(s).unwrap()
}

fn chart(resources: Vec<Resource>, tasks: Vec<TaskRecord>, options: GanttOptions) -> (Gantt, EventLog) {
    let log = EventLog::new();
    let gantt = Gantt::with_listener(Surface::new(1200.0, 600.0), resources, tasks, options, log.clone()).unwrap();
    (gantt, log)
}

fn cell() -> Vec<Resource> {
    vec![
        Resource::new("W1", "Welding", ResourceKind::Workcenter),
        Resource::new("M1", "Robot 1", ResourceKind::Machine).with_parent("W1"),
        Resource::new("M2", "Robot 2", ResourceKind::Machine).with_parent("W1"),
        Resource::new("X1", "Outsourced", ResourceKind::Other),
    ]
}

fn offset(p: Point, dx: f64, dy: f64) -> Point {
    Point::new(p.x + dx, p.y + dy)
}

/// Press on `target` of the task's bar, move by `(dx, dy)` and release.
fn drag(gantt: &mut Gantt, id: &str, target: HitTarget, dx: f64, dy: f64) -> bool {
    let g = gantt.get_bar(id).unwrap().geometry;
    let at = match target {
        HitTarget::LeftHandle => Point::new(g.x + 2.0, g.y + 2.0),
        HitTarget::RightHandle => Point::new(g.end_x() - 2.0, g.y + 2.0),
        _ => g.center(),
    };
    let hit = gantt.hit_test(at).unwrap();
    assert_eq!(hit.target, target);
    let mut session = gantt.pointer_down(&hit, at).unwrap();
    gantt.pointer_move(&mut session, offset(at, dx, dy));
    gantt.pointer_up(session)
}

#[test]
fn one_column_drag_in_hour_view_reports_one_date_change() {
    let (mut g, log) = chart(
        cell(),
        vec![TaskRecord::new("T1", "Weld frame").span("2024-01-01 08:00", "2024-01-01 10:00").on("M1")],
        GanttOptions::default(),
    );
    g.change_view_mode(ViewMode::Hour);
    log.take();

    let column = g.options().column_width;
    assert!(drag(&mut g, "T1", HitTarget::Body, column, 0.0));

    let events = log.take();
    assert_eq!(events.len(), 1, "{events:?}");
    match &events[0] {
        GanttEvent::DateChange { task, start, end } => {
            assert_eq!(task.id, "T1");
            assert_eq!(*start, dt("2024-01-01 09:00"));
            assert_eq!(*end, dt("2024-01-01 11:00"));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(g.get_task("T1").unwrap().duration, 120);
}

#[test]
fn dependency_floor_blocks_left_resize() {
    let (mut g, log) = chart(
        cell(),
        vec![
            TaskRecord::new("A", "Cut").span("2024-01-01", "2024-01-03").on("M1"),
            TaskRecord::new("B", "Weld").span("2024-01-05", "2024-01-08").on("M2").after("A"),
        ],
        GanttOptions::default(),
    );
    g.change_view_mode(ViewMode::Day);
    log.take();
    let column = g.options().column_width;
    let before = g.get_bar("B").unwrap().geometry;

    assert!(!drag(&mut g, "B", HitTarget::LeftHandle, -4.0 * column, 0.0));
    assert_eq!(g.get_bar("B").unwrap().geometry, before);
    assert_eq!(g.get_task("B").unwrap().start, dt("2024-01-05"));
    assert!(log.take().is_empty());

    let err = g
        .update_position("B", PositionUpdate::to_x(g.scale().time_to_x(dt("2024-01-02"))))
        .unwrap_err();
    assert_eq!(
        err,
        EditRejection::DependencyFloor {
            task: "B".into(),
            predecessor: "A".into()
        }
    );

    // Up to the predecessor's end is fine.
    assert!(drag(&mut g, "B", HitTarget::LeftHandle, -2.0 * column, 0.0));
    assert_eq!(g.get_task("B").unwrap().start, dt("2024-01-03"));
}

#[test]
fn dragging_a_predecessor_carries_its_dependents() {
    let (mut g, log) = chart(
        cell(),
        vec![
            TaskRecord::new("A", "Cut").span("2024-01-02", "2024-01-03").on("M1"),
            TaskRecord::new("B", "Weld").span("2024-01-03", "2024-01-05").on("M2").after("A"),
        ],
        GanttOptions::default(),
    );
    g.change_view_mode(ViewMode::Day);
    log.take();
    let column = g.options().column_width;

    assert!(drag(&mut g, "A", HitTarget::Body, -column, 0.0));
    assert_eq!(g.get_task("A").unwrap().start, dt("2024-01-01"));
    assert_eq!(g.get_task("B").unwrap().start, dt("2024-01-02"));
    assert_eq!(log.take().len(), 2);

    // A right resize only moves the bar itself.
    assert!(drag(&mut g, "A", HitTarget::RightHandle, column, 0.0));
    assert_eq!(g.get_task("A").unwrap().end, dt("2024-01-03"));
    assert_eq!(g.get_task("B").unwrap().start, dt("2024-01-02"));
}

fn family(lock_child: bool) -> Vec<TaskRecord> {
    vec![
        TaskRecord::new("P", "Order").span("2024-03-01", "2024-03-10").on("M1").with_subtask("C"),
        TaskRecord {
            isstartviewonly: lock_child,
            ..TaskRecord::new("C", "Operation").span("2024-03-02", "2024-03-05").on("M2").child_of("P")
        },
    ]
}

#[test]
fn locked_subtask_rejects_parent_drag_and_resize() {
    let (mut g, log) = chart(cell(), family(true), GanttOptions::default());
    g.change_view_mode(ViewMode::Day);
    log.take();
    let column = g.options().column_width;
    let before: Vec<_> = g.bars().iter().map(|b| b.geometry).collect();

    assert!(!drag(&mut g, "P", HitTarget::Body, 2.0 * column, 0.0));
    assert!(!drag(&mut g, "P", HitTarget::LeftHandle, 3.0 * column, 0.0));

    let after: Vec<_> = g.bars().iter().map(|b| b.geometry).collect();
    assert_eq!(before, after);
    assert_eq!(g.get_task("C").unwrap().start, dt("2024-03-02"));
    assert!(log.take().is_empty());
}

#[test]
fn unlocked_subtask_follows_parent_drag() {
    let (mut g, log) = chart(cell(), family(false), GanttOptions::default());
    g.change_view_mode(ViewMode::Day);
    log.take();
    let column = g.options().column_width;

    assert!(drag(&mut g, "P", HitTarget::Body, 2.0 * column, 0.0));
    let c = g.get_task("C").unwrap();
    assert_eq!((c.start, c.end), (dt("2024-03-04"), dt("2024-03-07")));
    let changed: Vec<_> = log
        .take()
        .into_iter()
        .filter_map(|e| match e {
            GanttEvent::DateChange { task, .. } => Some(task.id),
            _ => None,
        })
        .collect();
    assert_eq!(changed, vec!["P", "C"]);
}

#[test]
fn vertical_drag_without_changeresource_keeps_row() {
    let (mut g, log) = chart(
        cell(),
        vec![TaskRecord::new("A", "Weld").span("2024-01-02", "2024-01-04").on("M1")],
        GanttOptions::default(),
    );
    log.take();
    let row_height = g.options().row_height();
    let index = g.get_task("A").unwrap().index;

    let center = g.get_bar("A").unwrap().geometry.center();
    let hit = g.hit_test(center).unwrap();
    let mut session = g.pointer_down(&hit, center).unwrap();
    g.pointer_move(&mut session, offset(center, 0.0, row_height));
    assert_eq!(session.resource_delta, 1);
    assert_eq!(session.prospective_row, None);
    assert!(!g.pointer_up(session));

    assert_eq!(g.get_task("A").unwrap().index, index);
    assert_eq!(g.update_resource("A", 1), Err(EditRejection::ResourceChangeDisabled("A".into())));
    assert!(log.take().is_empty());
}

#[test]
fn related_and_free_resource_changes() {
    let movable = || {
        vec![TaskRecord {
            changeresource: true,
            ..TaskRecord::new("A", "Weld").span("2024-01-02", "2024-01-04").on("M2")
        }]
    };

    // M2 -> X1 leaves the W1 family.
    let (mut g, _) = chart(cell(), movable(), GanttOptions::default());
    assert_eq!(
        g.update_resource("A", 1),
        Err(EditRejection::ResourceNotRelated {
            from: "M2".into(),
            to: "X1".into()
        })
    );
    assert!(g.update_resource("A", -1).unwrap());
    assert_eq!(g.get_task("A").unwrap().resource_id, "M1");

    let free = GanttOptions {
        resourcechange: true,
        ..Default::default()
    };
    let (mut g, log) = chart(cell(), movable(), free);
    log.take();
    let row_height = g.options().row_height();
    assert!(drag(&mut g, "A", HitTarget::Body, 0.0, row_height));
    assert_eq!(g.get_task("A").unwrap().resource_id, "X1");
    let events = log.take();
    assert!(
        matches!(events.as_slice(), [GanttEvent::ResourceChange { old, new, .. }] if old.id == "M2" && new.id == "X1"),
        "{events:?}"
    );
}

#[test]
fn click_right_after_drag_is_swallowed() {
    let (mut g, log) = chart(
        cell(),
        vec![
            TaskRecord::new("A", "Weld").span("2024-01-02", "2024-01-04").on("M1"),
            TaskRecord::new("B", "Grind").span("2024-01-02", "2024-01-04").on("M2"),
        ],
        GanttOptions::default(),
    );
    g.change_view_mode(ViewMode::Day);
    let column = g.options().column_width;
    assert!(drag(&mut g, "A", HitTarget::Body, column, 0.0));
    log.take();

    assert!(!g.click("A"));
    assert!(g.click("B"));
    assert!(g.click_at("A", Instant::now() + StdDuration::from_secs(2)));
    let clicked: Vec<_> = log
        .take()
        .into_iter()
        .filter_map(|e| match e {
            GanttEvent::Click(task) => Some(task.id),
            _ => None,
        })
        .collect();
    assert_eq!(clicked, vec!["B", "A"]);
}

#[test]
fn long_spans_pick_a_coarse_view() {
    let (g, _) = chart(
        cell(),
        vec![
            TaskRecord::new("A", "Start").span("2024-01-01", "2024-01-02").on("M1"),
            TaskRecord::new("B", "Finish").span("2025-02-03", "2025-02-04").on("M2"),
        ],
        GanttOptions::default(),
    );
    assert!(g.view_mode() >= ViewMode::Month, "{:?}", g.view_mode());

    let (g, _) = chart(
        cell(),
        vec![TaskRecord::new("A", "Short").span("2024-01-01 08:00", "2024-01-01 12:00").on("M1")],
        GanttOptions::default(),
    );
    assert!(g.view_mode() < ViewMode::Day);
}

#[test]
fn unknown_resource_gets_a_placeholder_row() {
    let (g, _) = chart(
        cell(),
        vec![TaskRecord::new("A", "Stray").span("2024-01-01", "2024-01-02").on("NOPE")],
        GanttOptions::default(),
    );
    let row = g.get_task("A").unwrap().index;
    let resource = &g.resources()[row];
    assert!(resource.placeholder);
    assert_eq!(resource.id, "NOPE");
}

#[test]
fn progress_grip_session_only_snapshots_the_bar() {
    let (mut g, _) = chart(
        cell(),
        vec![
            TaskRecord::new("A", "Weld").span("2024-01-02", "2024-01-12").on("M1"),
            TaskRecord::new("B", "Grind").span("2024-01-12", "2024-01-14").on("M2").after("A"),
        ],
        GanttOptions::default(),
    );
    let hit = Hit {
        task_id: "A".into(),
        target: HitTarget::ProgressHandle,
    };
    let g_a = g.get_bar("A").unwrap().geometry;
    let session = g.pointer_down(&hit, Point::new(g_a.x, g_a.bottom())).unwrap();
    assert_eq!(session.snapshots.len(), 1);

    let body = Hit {
        task_id: "A".into(),
        target: HitTarget::Body,
    };
    let session = g.pointer_down(&body, g_a.center()).unwrap();
    assert_eq!(session.snapshots.len(), 2);
}
