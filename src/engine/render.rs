//! Display-list rendering.
//!
//! A [`Scene`] is built in two passes. The geometry pass lays out every
//! primitive from bars and the time scale; the label pass then measures bar
//! labels and decides whether each fits inside its bar.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDateTime, Timelike};

use super::arrow::Arrow;
use super::bar::{Bar, Geometry, Point, HANDLE_WIDTH};
use super::WorkPeriod;
use crate::model::calendar::{self, DateUnit};
use crate::model::{GanttOptions, Schedule, Task, TimeScale, ViewMode, WorkingTime};

pub const LAYERS: [&str; 6] = ["grid", "date", "arrow", "progress", "bar", "details"];

const GRID: usize = 0;
const DATE: usize = 1;
const ARROW: usize = 2;
const PROGRESS: usize = 3;
const BAR: usize = 4;
const DETAILS: usize = 5;

/// Gap between a bar edge and its label.
const LABEL_GAP: f64 = 6.0;
const BADGE_WIDTH: f64 = 18.0;
const BADGE_HEIGHT: f64 = 10.0;
const PROGRESS_GRIP: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Start,
    Middle,
    End,
}

/// One drawable item. Classes name what the item is; the host picks colours.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Rect {
        class: String,
        task_id: Option<String>,
        rect: Geometry,
        radius: f64,
        /// Caller-supplied colour, only for work-period bands.
        fill: Option<String>,
    },
    Line {
        class: String,
        from: Point,
        to: Point,
    },
    Arrow {
        from: String,
        to: String,
        points: Vec<Point>,
    },
    Text {
        class: String,
        task_id: Option<String>,
        at: Point,
        text: String,
        anchor: Anchor,
    },
}

impl Primitive {
    fn rect(class: impl Into<String>, rect: Geometry) -> Self {
        Primitive::Rect {
            class: class.into(),
            task_id: None,
            rect,
            radius: 0.0,
            fill: None,
        }
    }

    fn line(class: &str, from: Point, to: Point) -> Self {
        Primitive::Line {
            class: class.to_string(),
            from,
            to,
        }
    }

    fn text(class: &str, at: Point, text: impl Into<String>, anchor: Anchor) -> Self {
        Primitive::Text {
            class: class.to_string(),
            task_id: None,
            at,
            text: text.into(),
            anchor,
        }
    }

    fn of_task(mut self, id: &str) -> Self {
        match &mut self {
            Primitive::Rect { task_id, .. } | Primitive::Text { task_id, .. } => {
                *task_id = Some(id.to_string());
            }
            _ => {}
        }
        self
    }

    fn rounded(mut self, r: f64) -> Self {
        if let Primitive::Rect { radius, .. } = &mut self {
            *radius = r;
        }
        self
    }

    pub fn class(&self) -> &str {
        match self {
            Primitive::Rect { class, .. }
            | Primitive::Line { class, .. }
            | Primitive::Text { class, .. } => class,
            Primitive::Arrow { .. } => "arrow",
        }
    }

    pub fn task_id(&self) -> Option<&str> {
        match self {
            Primitive::Rect { task_id, .. } | Primitive::Text { task_id, .. } => task_id.as_deref(),
            Primitive::Arrow { from, .. } => Some(from.as_str()),
            Primitive::Line { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub name: &'static str,
    pub items: Vec<Primitive>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub layers: Vec<Layer>,
    pub width: f64,
    pub height: f64,
    /// x of the current instant, when it is on the axis.
    pub now_marker: Option<f64>,
}

impl Scene {
    fn empty(width: f64, height: f64) -> Self {
        Self {
            layers: LAYERS
                .iter()
                .map(|&name| Layer {
                    name,
                    items: Vec::new(),
                })
                .collect(),
            width,
            height,
            now_marker: None,
        }
    }

    pub fn layer(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.name == name)
    }

    /// Every primitive in paint order.
    pub fn primitives(&self) -> impl Iterator<Item = &Primitive> {
        self.layers.iter().flat_map(|l| l.items.iter())
    }

    pub fn find(&self, class: &str, task_id: &str) -> Option<&Primitive> {
        self.primitives()
            .find(|p| p.class() == class && p.task_id() == Some(task_id))
    }

    fn push(&mut self, layer: usize, item: Primitive) {
        self.layers[layer].items.push(item);
    }
}

/// Text width oracle for label placement.
pub trait TextMeasure {
    fn text_width(&self, text: &str) -> f64;
}

/// Fixed advance per character. Good enough for tests and headless use.
#[derive(Debug, Clone, Copy)]
pub struct ApproxMeasure {
    pub char_width: f64,
}

impl Default for ApproxMeasure {
    fn default() -> Self {
        Self { char_width: 7.0 }
    }
}

impl TextMeasure for ApproxMeasure {
    fn text_width(&self, text: &str) -> f64 {
        text.chars().count() as f64 * self.char_width
    }
}

/// Everything a render pass reads.
pub(crate) struct SceneInput<'a> {
    pub options: &'a GanttOptions,
    pub working: &'a WorkingTime,
    pub scale: &'a TimeScale,
    pub schedule: &'a Schedule,
    pub bars: &'a [Bar],
    pub arrows: &'a [Arrow],
    pub work_periods: &'a [WorkPeriod],
    pub now: NaiveDateTime,
}

pub(crate) fn build(input: &SceneInput, measure: &dyn TextMeasure) -> Scene {
    let opts = input.options;
    let rows = input.schedule.row_count() as f64;
    let height = opts.header_height + opts.padding + rows * opts.row_height();
    let mut scene = Scene::empty(input.scale.grid_width(), height);

    draw_grid(input, &mut scene);
    draw_dates(input, &mut scene);
    for arrow in input.arrows {
        scene.push(
            ARROW,
            Primitive::Arrow {
                from: arrow.from.clone(),
                to: arrow.to.clone(),
                points: arrow.points.clone(),
            },
        );
    }
    for (bar, task) in input.bars.iter().zip(input.schedule.tasks()) {
        draw_bar(input, bar, task, &mut scene);
    }
    if let Some(x) = input
        .scale
        .contains(input.now)
        .then(|| input.scale.time_to_x(input.now))
    {
        scene.now_marker = Some(x);
        scene.push(
            DETAILS,
            Primitive::line("now-marker", Point::new(x, opts.header_height), Point::new(x, height)),
        );
    }

    place_labels(&mut scene, input.bars, measure);
    scene
}

fn draw_grid(input: &SceneInput, scene: &mut Scene) {
    let opts = input.options;
    let scale = input.scale;
    let width = scene.width;
    let height = scene.height;
    let row_height = opts.row_height();

    scene.push(GRID, Primitive::rect("grid-background", Geometry::new(0.0, 0.0, width, height)));
    if opts.resourcecolumnwidth > 0.0 {
        scene.push(
            GRID,
            Primitive::rect(
                "resource-column",
                Geometry::new(opts.xoffset, 0.0, opts.resourcecolumnwidth, height),
            ),
        );
    }
    for (i, resource) in input.schedule.resources().iter().enumerate() {
        let y = opts.header_height + opts.padding / 2.0 + i as f64 * row_height;
        scene.push(GRID, Primitive::rect("grid-row", Geometry::new(0.0, y, width, row_height)));
        scene.push(
            GRID,
            Primitive::line("row-line", Point::new(0.0, y + row_height), Point::new(width, y + row_height)),
        );
        if opts.resourcecolumnwidth > 0.0 {
            scene.push(
                GRID,
                Primitive::text(
                    "resource-label",
                    Point::new(opts.xoffset + LABEL_GAP, y + row_height / 2.0),
                    resource.name.clone(),
                    Anchor::Start,
                ),
            );
        }
    }
    scene.push(GRID, Primitive::rect("grid-header", Geometry::new(0.0, 0.0, width, opts.header_height)));

    for date in scale.column_dates() {
        let x = scale.time_to_x(date);
        let class = if is_thick_tick(scale.mode, date) {
            "tick thick"
        } else {
            "tick"
        };
        scene.push(GRID, Primitive::line(class, Point::new(x, opts.header_height), Point::new(x, height)));
        if scale.mode == ViewMode::Day && input.working.is_weekend(date) {
            scene.push(
                GRID,
                Primitive::rect(
                    "weekend-highlight",
                    Geometry::new(x, opts.header_height, scale.column_width, height - opts.header_height),
                ),
            );
        }
    }

    for period in input.work_periods {
        let x = scale.time_to_x(period.start);
        let w = scale.span_width(period.start, period.end).max(1.0);
        scene.push(
            GRID,
            Primitive::Rect {
                class: format!("work-period {}", period.kind),
                task_id: None,
                rect: Geometry::new(x, opts.header_height, w, height - opts.header_height),
                radius: 0.0,
                fill: Some(period.color.clone()),
            },
        );
        if !period.code.is_empty() {
            scene.push(
                GRID,
                Primitive::text(
                    "work-period-code",
                    Point::new(x + w / 2.0, opts.header_height + LABEL_GAP),
                    period.code.clone(),
                    Anchor::Middle,
                ),
            );
        }
    }

    if matches!(scale.mode, ViewMode::Day | ViewMode::Week | ViewMode::Month) {
        let today = calendar::start_of(input.now, DateUnit::Day);
        if scale.contains(today) {
            let column = ((scale.time_to_x(today) - scale.offset) / scale.column_width).floor();
            let x = scale.offset + column * scale.column_width;
            scene.push(
                GRID,
                Primitive::rect(
                    "today-highlight",
                    Geometry::new(x, opts.header_height, scale.column_width, height - opts.header_height),
                ),
            );
        }
    }
}

fn is_thick_tick(mode: ViewMode, date: NaiveDateTime) -> bool {
    match mode {
        ViewMode::Day => date.day() == 1,
        ViewMode::Week => date.day() <= 7,
        ViewMode::Month => date.month0() % 3 == 0,
        ViewMode::Year => false,
        _ => date.hour() == 0 && date.minute() == 0,
    }
}

/// Lower label for a column, and the upper label when this column starts a
/// new upper period.
fn header_labels(
    mode: ViewMode,
    date: NaiveDateTime,
    prev: Option<NaiveDateTime>,
    lang: &str,
) -> (String, Option<String>) {
    let changed = |unit: DateUnit| {
        prev.map_or(true, |p| calendar::start_of(p, unit) != calendar::start_of(date, unit))
    };
    let (lower, upper, unit) = match mode {
        ViewMode::TenMinutes | ViewMode::ThirtyMinutes => ("HH:mm", "D MMM", DateUnit::Day),
        ViewMode::Hour => ("HH", "D MMMM", DateUnit::Day),
        ViewMode::QuarterDay | ViewMode::HalfDay => ("HH", "D MMM", DateUnit::Day),
        ViewMode::Day => ("D", "MMMM", DateUnit::Month),
        ViewMode::Week => ("D MMM", "MMMM", DateUnit::Month),
        ViewMode::Month => ("MMMM", "YYYY", DateUnit::Year),
        ViewMode::Year => ("YYYY", "", DateUnit::Year),
    };
    let upper = (!upper.is_empty() && changed(unit)).then(|| calendar::format(date, upper, lang));
    (calendar::format(date, lower, lang), upper)
}

fn draw_dates(input: &SceneInput, scene: &mut Scene) {
    let opts = input.options;
    let scale = input.scale;
    let mut prev = None;
    for date in scale.column_dates() {
        let x = scale.time_to_x(date);
        let (lower, upper) = header_labels(scale.mode, date, prev, &opts.language);
        scene.push(
            DATE,
            Primitive::text(
                "lower-text",
                Point::new(x + scale.column_width / 2.0, opts.header_height - 10.0),
                lower,
                Anchor::Middle,
            ),
        );
        if let Some(upper) = upper {
            scene.push(
                DATE,
                Primitive::text("upper-text", Point::new(x + 2.0, opts.header_height - 30.0), upper, Anchor::Start),
            );
        }
        prev = Some(date);
    }
}

fn draw_bar(input: &SceneInput, bar: &Bar, task: &Task, scene: &mut Scene) {
    let opts = input.options;
    let g = bar.geometry;
    let id = task.id.as_str();

    if opts.showactual {
        if let Some(actual) = bar.actual {
            scene.push(PROGRESS, Primitive::rect("bar-actual", actual).of_task(id));
        }
    }

    let class = if task.is_locked() { "bar-locked" } else { "bar" };
    scene.push(BAR, Primitive::rect(class, g).of_task(id).rounded(opts.bar_corner_radius));
    scene.push(
        BAR,
        Primitive::rect("bar-progress", Geometry::new(g.x, g.y, bar.progress_width.min(g.width), g.height))
            .of_task(id)
            .rounded(opts.bar_corner_radius),
    );
    scene.push(
        BAR,
        Primitive::text("bar-label", g.center(), task.name.clone(), Anchor::Middle).of_task(id),
    );

    if !opts.viewonly {
        let handle_height = (g.height - 2.0).max(1.0);
        if !task.start_locked {
            scene.push(
                BAR,
                Primitive::rect("handle-left", Geometry::new(g.x + 1.0, g.y + 1.0, HANDLE_WIDTH, handle_height))
                    .of_task(id)
                    .rounded(1.0),
            );
        }
        if !task.end_locked {
            scene.push(
                BAR,
                Primitive::rect(
                    "handle-right",
                    Geometry::new(g.end_x() - HANDLE_WIDTH - 1.0, g.y + 1.0, HANDLE_WIDTH, handle_height),
                )
                .of_task(id)
                .rounded(1.0),
            );
        }
        if !task.is_locked() {
            scene.push(
                BAR,
                Primitive::rect(
                    "handle-progress",
                    Geometry::new(g.x + bar.progress_width - PROGRESS_GRIP, g.bottom() - 5.0, PROGRESS_GRIP * 2.0, 5.0),
                )
                .of_task(id),
            );
        }
    }

    for (k, badge) in task.badges.iter().enumerate() {
        let x = g.x + 2.0 + k as f64 * (BADGE_WIDTH + 2.0);
        let rect = Geometry::new(x, g.y - BADGE_HEIGHT / 2.0, BADGE_WIDTH, BADGE_HEIGHT);
        scene.push(DETAILS, Primitive::rect("badge", rect).of_task(id).rounded(BADGE_HEIGHT / 2.0));
        scene.push(
            DETAILS,
            Primitive::text("badge-label", rect.center(), badge.label.clone(), Anchor::Middle).of_task(id),
        );
    }

    if let Some(issue) = &task.issue_type {
        scene.push(
            DETAILS,
            Primitive::rect(format!("issue {issue}"), Geometry::new(g.end_x() - 6.0, g.y, 6.0, 6.0)).of_task(id),
        );
    }
}

/// Second pass: keep a label centred in its bar when it fits, otherwise
/// move it just past the bar's right edge.
fn place_labels(scene: &mut Scene, bars: &[Bar], measure: &dyn TextMeasure) {
    let geometry: HashMap<&str, Geometry> = bars
        .iter()
        .map(|b| (b.task_id.as_str(), b.geometry))
        .collect();
    for item in &mut scene.layers[BAR].items {
        let Primitive::Text {
            class,
            task_id: Some(id),
            at,
            text,
            anchor,
        } = item
        else {
            continue;
        };
        let Some(g) = geometry.get(id.as_str()) else {
            continue;
        };
        if measure.text_width(text) + 2.0 * LABEL_GAP <= g.width {
            *at = g.center();
            *anchor = Anchor::Middle;
            *class = "bar-label".to_string();
        } else {
            *at = Point::new(g.end_x() + LABEL_GAP, g.center().y);
            *anchor = Anchor::Start;
            *class = "bar-label big".to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::calendar::parse;

    #[test]
    fn test_header_labels_mark_new_periods() {
        let a = parse("2024-01-31").unwrap();
        let b = parse("2024-02-01").unwrap();
        let (lower, upper) = header_labels(ViewMode::Day, a, None, "en");
        assert_eq!(lower, "31");
        assert_eq!(upper.as_deref(), Some("January"));
        let (lower, upper) = header_labels(ViewMode::Day, b, Some(a), "en");
        assert_eq!(lower, "1");
        assert_eq!(upper.as_deref(), Some("February"));
        let (_, upper) = header_labels(ViewMode::Day, b, Some(b), "en");
        assert!(upper.is_none());
    }

    #[test]
    fn test_hour_labels() {
        let a = parse("2024-01-01 09:00").unwrap();
        let (lower, upper) = header_labels(ViewMode::Hour, a, None, "en");
        assert_eq!(lower, "09");
        assert_eq!(upper.as_deref(), Some("1 January"));
    }

    #[test]
    fn test_thick_ticks() {
        assert!(is_thick_tick(ViewMode::Day, parse("2024-03-01").unwrap()));
        assert!(!is_thick_tick(ViewMode::Day, parse("2024-03-02").unwrap()));
        assert!(is_thick_tick(ViewMode::Hour, parse("2024-03-02").unwrap()));
        assert!(is_thick_tick(ViewMode::Month, parse("2024-04-01").unwrap()));
    }

    #[test]
    fn test_approx_measure() {
        assert_eq!(ApproxMeasure::default().text_width("abc"), 21.0);
    }
}
