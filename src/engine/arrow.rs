//! Relationship arrows between bars.

use super::bar::{Geometry, Point};
use crate::model::{ArrowType, Schedule};

/// One drawn relationship. `points` is the routed polyline, refreshed
/// whenever either end moves.
#[derive(Debug, Clone, PartialEq)]
pub struct Arrow {
    pub from: String,
    pub to: String,
    pub points: Vec<Point>,
}

/// Arrow endpoints for the configured relationship kind.
pub fn connect(schedule: &Schedule, kind: ArrowType) -> Vec<Arrow> {
    let mut pairs: Vec<(String, String)> = Vec::new();
    for task in schedule.tasks() {
        match kind {
            ArrowType::Dependency => {
                for pred in &task.dependencies {
                    pairs.push((pred.clone(), task.id.clone()));
                }
            }
            ArrowType::Subtask => {
                for child in &task.subtasks {
                    pairs.push((task.id.clone(), child.clone()));
                }
            }
            ArrowType::Parent => {
                if let Some(parent) = &task.parent_task {
                    pairs.push((task.id.clone(), parent.clone()));
                }
            }
            ArrowType::None => {}
        }
    }
    pairs
        .into_iter()
        .map(|(from, to)| Arrow {
            from,
            to,
            points: Vec::new(),
        })
        .collect()
}

/// Route from the middle of `from` down (or up) to the vertical centre of
/// `to`, then across into its left edge. The elbow is cut by `curve` pixels.
pub fn route(from: &Geometry, to: &Geometry, curve: f64, padding: f64) -> Vec<Point> {
    let mut start_x = from.x + from.width / 2.0;
    let limit = to.x - padding / 2.0;
    if start_x > limit {
        start_x = limit.max(from.x);
    }
    let end_y = to.center().y;
    let start_y = if end_y >= from.bottom() {
        from.bottom()
    } else {
        from.y
    };

    let mut points = vec![Point::new(start_x, start_y)];
    let rise = end_y - start_y;
    if rise.abs() > curve && to.x - start_x > curve {
        points.push(Point::new(start_x, end_y - curve * rise.signum()));
        points.push(Point::new(start_x + curve, end_y));
    } else {
        points.push(Point::new(start_x, end_y));
    }
    points.push(Point::new(to.x, end_y));
    points
}
