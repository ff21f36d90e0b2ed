//! Per-task bar geometry.

use chrono::NaiveDateTime;

use crate::model::{GanttOptions, Task, TimeScale};

/// Narrowest a bar is ever drawn, so zero-length tasks stay grabbable.
pub const MIN_BAR_WIDTH: f64 = 10.0;
/// Width of the resize grips at either end of a bar.
pub const HANDLE_WIDTH: f64 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in chart pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Geometry {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Geometry {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn end_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.end_x() && p.y >= self.y && p.y <= self.bottom()
    }

    /// Whether the half-open spans `[x, end_x)` intersect.
    pub fn overlaps_x(&self, other: &Geometry) -> bool {
        self.x < other.end_x() && other.x < self.end_x()
    }
}

/// The drawn, draggable representation of one task.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub task_id: String,
    pub geometry: Geometry,
    pub progress_width: f64,
    /// Actual start/end span, when known.
    pub actual: Option<Geometry>,
    /// Top of the bar's resource row at full height.
    pub row_y: f64,
    pub full_height: f64,
    /// Indices into the engine's arrow list touching this bar.
    pub arrows: Vec<usize>,
    /// Dates last reported through a `date_change` event.
    pub(crate) committed: (NaiveDateTime, NaiveDateTime),
}

impl Bar {
    pub fn new(task: &Task, scale: &TimeScale, options: &GanttOptions) -> Self {
        let row_y = compute_y(task.index, options);
        let width = compute_width(task, scale);
        let geometry = Geometry::new(compute_x(task, scale), row_y, width, options.bar_height);
        let actual = match (task.actual_start, task.actual_end) {
            (Some(s), Some(e)) if e >= s => Some(Geometry::new(
                scale.time_to_x(s),
                row_y + options.bar_height * 0.75,
                scale.span_width(s, e).max(MIN_BAR_WIDTH),
                options.bar_height * 0.25,
            )),
            _ => None,
        };
        Self {
            task_id: task.id.clone(),
            geometry,
            progress_width: progress_width(width, task.progress),
            actual,
            row_y,
            full_height: options.bar_height,
            arrows: Vec::new(),
            committed: (task.start, task.end),
        }
    }

    /// Progress as a percentage of the bar's width.
    pub fn progress_percent(&self) -> f64 {
        if self.geometry.width <= 0.0 {
            return 0.0;
        }
        (self.progress_width / self.geometry.width * 100.0).clamp(0.0, 100.0)
    }

    /// Move the bar horizontally, keeping the progress fraction.
    pub(crate) fn set_span(&mut self, x: f64, width: f64) {
        let fraction = if self.geometry.width > 0.0 {
            self.progress_width / self.geometry.width
        } else {
            0.0
        };
        self.geometry.x = x;
        self.geometry.width = width.max(MIN_BAR_WIDTH);
        self.progress_width = (self.geometry.width * fraction).min(self.geometry.width);
    }

    /// Place the bar on a new row at full height.
    pub(crate) fn set_row(&mut self, row_y: f64) {
        self.row_y = row_y;
        self.geometry.y = row_y;
        self.geometry.height = self.full_height;
        if let Some(actual) = &mut self.actual {
            actual.y = row_y + self.full_height * 0.75;
        }
    }
}

pub fn compute_x(task: &Task, scale: &TimeScale) -> f64 {
    scale.time_to_x(task.start)
}

pub fn compute_y(resource_index: usize, options: &GanttOptions) -> f64 {
    options.header_height + options.padding + resource_index as f64 * options.row_height()
}

pub fn compute_width(task: &Task, scale: &TimeScale) -> f64 {
    scale.span_width(task.start, task.end).max(MIN_BAR_WIDTH)
}

pub fn progress_width(bar_width: f64, progress: f64) -> f64 {
    (bar_width * progress / 100.0).clamp(0.0, bar_width)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::calendar::parse;
    use crate::model::{Schedule, TaskRecord, ViewMode, WorkingTime};

    fn task(start: &str, end: &str, progress: f64) -> Task {
        let record = TaskRecord {
            progress,
            ..TaskRecord::new("T", "t").span(start, end)
        };
        Schedule::setup(Vec::new(), vec![record], &WorkingTime::default()).tasks()[0].clone()
    }

    fn scale() -> TimeScale {
        TimeScale::new(
            ViewMode::Hour,
            parse("2024-01-01").unwrap(),
            parse("2024-01-03").unwrap(),
            0.0,
        )
    }

    #[test]
    fn test_geometry_from_task() {
        let opts = GanttOptions::default();
        let t = task("2024-01-01 02:00", "2024-01-01 04:00", 50.0);
        let bar = Bar::new(&t, &scale(), &opts);
        assert_eq!(bar.geometry.x, 76.0);
        assert_eq!(bar.geometry.width, 76.0);
        assert_eq!(bar.geometry.y, 50.0 + 18.0);
        assert_eq!(bar.progress_width, 38.0);
        assert_eq!(bar.progress_percent(), 50.0);
    }

    #[test]
    fn test_degenerate_task_keeps_min_width() {
        let t = task("2024-01-01 02:00", "2024-01-01 02:00", 100.0);
        let bar = Bar::new(&t, &scale(), &GanttOptions::default());
        assert_eq!(bar.geometry.width, MIN_BAR_WIDTH);
        assert!(bar.progress_width <= bar.geometry.width);
    }

    #[test]
    fn test_rows_stack_by_resource_index() {
        let opts = GanttOptions::default();
        assert_eq!(compute_y(0, &opts), 68.0);
        assert_eq!(compute_y(2, &opts), 68.0 + 2.0 * 38.0);
    }

    #[test]
    fn test_overlaps_are_half_open() {
        let a = Geometry::new(0.0, 0.0, 10.0, 5.0);
        let b = Geometry::new(10.0, 0.0, 10.0, 5.0);
        let c = Geometry::new(9.0, 0.0, 10.0, 5.0);
        assert!(!a.overlaps_x(&b));
        assert!(a.overlaps_x(&c));
        assert!(c.overlaps_x(&b));
    }
}
