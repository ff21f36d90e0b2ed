//! The interactive engine. Owns the schedule, the bars derived from it and
//! the render pipeline, applies edits with their cascades, and reports what
//! happened through a [`GanttListener`].

pub mod arrow;
pub mod bar;
mod cascade;
pub mod events;
pub mod overlap;
pub mod render;
pub mod session;

use std::collections::HashSet;
use std::time::{Duration as StdDuration, Instant};

use chrono::{Duration, NaiveDateTime};

pub use arrow::Arrow;
pub use bar::{Bar, Geometry, Point, HANDLE_WIDTH, MIN_BAR_WIDTH};
pub use events::{EventLog, GanttEvent, GanttListener, NoopListener};
pub use render::{Anchor, ApproxMeasure, Layer, Primitive, Scene, TextMeasure};
pub use session::{BarSnapshot, DragMode, DragSession, Hit, HitTarget};

use crate::errors::{EditRejection, EditResult, GanttError, Result};
use crate::model::calendar;
use crate::model::{
    GanttOptions, PopupTrigger, Resource, Schedule, ScheduleIssue, Task, TaskRecord, TimeScale,
    ViewMode, WorkingTime,
};
use cascade::SpanEdit;

/// How long a finished drag suppresses clicks on the same bar.
const CLICK_LATCH: StdDuration = StdDuration::from_secs(1);
/// Slack for pixel edges derived from millisecond-rounded instants.
const EDGE_EPSILON: f64 = 0.01;
/// Half-width of the progress grip for hit testing.
const PROGRESS_GRIP: f64 = 4.0;

/// Size of the host's drawing area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Surface {
    pub width: f64,
    pub height: f64,
}

impl Surface {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    fn validate(self) -> Result<Self> {
        let ok = |v: f64| v.is_finite() && v > 0.0;
        if ok(self.width) && ok(self.height) {
            Ok(self)
        } else {
            Err(GanttError::InvalidSurface(format!(
                "{}x{}",
                self.width, self.height
            )))
        }
    }
}

/// Caller-declared shaded time band, redrawn on every render.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkPeriod {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub kind: String,
    pub color: String,
    pub code: String,
}

/// Arguments to [`Gantt::update_position`]. Pixel fields describe a pointer
/// edit; `start`/`end` a programmatic one. Pixel fields win when both are set.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PositionUpdate {
    pub x: Option<f64>,
    pub width: Option<f64>,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub skip_cascade: bool,
}

impl PositionUpdate {
    pub fn to_x(x: f64) -> Self {
        Self {
            x: Some(x),
            ..Default::default()
        }
    }

    pub fn pixels(x: f64, width: f64) -> Self {
        Self {
            x: Some(x),
            width: Some(width),
            ..Default::default()
        }
    }

    pub fn span(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
            ..Default::default()
        }
    }

    fn is_pixel(&self) -> bool {
        self.x.is_some() || self.width.is_some()
    }
}

/// Details shown for a task, anchored at its bar.
#[derive(Debug, Clone, PartialEq)]
pub struct Popup {
    pub task_id: String,
    pub anchor: Geometry,
    pub title: String,
    pub subtitle: String,
    pub details: Vec<String>,
    /// Output of the caller's custom popup renderer, when one is set.
    pub custom: Option<String>,
    pub trigger: PopupTrigger,
}

type PopupRenderer = Box<dyn Fn(&Task) -> String>;

pub struct Gantt {
    surface: Surface,
    options: GanttOptions,
    working: WorkingTime,
    schedule: Schedule,
    scale: TimeScale,
    /// One per task, in [`Schedule::tasks`] order.
    bars: Vec<Bar>,
    arrows: Vec<Arrow>,
    work_periods: Vec<WorkPeriod>,
    /// Set once the caller chose a view mode; disables auto-picking.
    mode_pinned: bool,
    scroll_x: f64,
    pending_scroll: Option<f64>,
    now: NaiveDateTime,
    scene: Option<Scene>,
    measure: Box<dyn TextMeasure>,
    listener: Box<dyn GanttListener>,
    custom_popup: Option<PopupRenderer>,
    latch: Option<(String, Instant)>,
}

impl Gantt {
    pub fn new(
        surface: Surface,
        resources: Vec<Resource>,
        records: Vec<TaskRecord>,
        options: GanttOptions,
    ) -> Result<Self> {
        Self::with_listener(surface, resources, records, options, NoopListener)
    }

    pub fn with_listener(
        surface: Surface,
        resources: Vec<Resource>,
        records: Vec<TaskRecord>,
        options: GanttOptions,
        listener: impl GanttListener + 'static,
    ) -> Result<Self> {
        let surface = surface.validate()?;
        let working = options.working_time();
        let schedule = Schedule::setup(resources, records, &working);
        let now = calendar::now();
        let scale = TimeScale::new(options.view_mode, now, now, 0.0);

        let mut gantt = Self {
            surface,
            options,
            working,
            schedule,
            scale,
            bars: Vec::new(),
            arrows: Vec::new(),
            work_periods: Vec::new(),
            mode_pinned: false,
            scroll_x: 0.0,
            pending_scroll: None,
            now,
            scene: None,
            measure: Box::new(ApproxMeasure::default()),
            listener: Box::new(listener),
            custom_popup: None,
            latch: None,
        };
        gantt.render();
        let initial = gantt.initial_scroll();
        gantt.scroll_x = initial;
        gantt.pending_scroll = Some(initial);
        gantt.notify_render_complete();
        Ok(gantt)
    }

    // ── Render pipeline ─────────────────────────────────────────

    /// Rebuild scale, bars, arrows and row layout from the schedule.
    fn render(&mut self) {
        self.scale = self.compute_scale();
        self.options.view_mode = self.scale.mode;
        self.options.column_width = self.scale.column_width;
        self.options.step = self.scale.step_hours;

        self.bars = self
            .schedule
            .tasks()
            .iter()
            .map(|t| Bar::new(t, &self.scale, &self.options))
            .collect();
        self.arrows = arrow::connect(&self.schedule, self.options.arrowtype);
        for (i, a) in self.arrows.iter().enumerate() {
            for id in [&a.from, &a.to] {
                if let Some(pos) = self.schedule.position(id) {
                    self.bars[pos].arrows.push(i);
                }
            }
        }
        self.resolve_rows(0..self.schedule.row_count());
        self.scene = None;
        log::info!(
            "rendered {} bars in {} view, axis {} .. {}",
            self.bars.len(),
            self.scale.mode.label(),
            self.scale.axis_start,
            self.scale.axis_end
        );
    }

    fn compute_scale(&self) -> TimeScale {
        let today = calendar::today();
        let (mut start, mut end) = self
            .schedule
            .span()
            .unwrap_or((today, today + Duration::days(1)));
        let pinned_start = pinned_bound(&self.options.start, "start");
        let pinned_end = pinned_bound(&self.options.end, "end");
        if let Some(s) = pinned_start {
            start = start.min(s);
        }
        if let Some(e) = pinned_end {
            end = end.max(e);
        }
        if self.options.todayasdefault {
            start = start.min(self.now);
            end = end.max(self.now);
        }

        let mode = if self.mode_pinned || (pinned_start.is_some() && pinned_end.is_some()) {
            self.options.view_mode
        } else {
            ViewMode::pick(start, end)
        };
        let offset = self.options.xoffset + self.options.resourcecolumnwidth;
        TimeScale::covering(mode, start, end, offset)
    }

    fn initial_scroll(&self) -> f64 {
        let anchor = if self.options.todayasdefault {
            self.now
        } else {
            self.schedule.span().map_or(self.now, |(s, _)| s)
        };
        self.clamp_scroll(self.scale.time_to_x(anchor) - self.scale.offset - self.scale.column_width)
    }

    fn clamp_scroll(&self, x: f64) -> f64 {
        let max = (self.scale.grid_width() - self.surface.width).max(0.0);
        x.clamp(0.0, max)
    }

    fn notify_render_complete(&mut self) {
        let mut listener = std::mem::replace(&mut self.listener, Box::new(NoopListener));
        listener.on_render_complete(self);
        self.listener = listener;
    }

    /// Re-run overlap layout on `rows` and re-route the arrows of every bar
    /// on them.
    fn resolve_rows(&mut self, rows: impl IntoIterator<Item = usize>) {
        let mut touched = Vec::new();
        let mut seen = HashSet::new();
        for row in rows {
            if !seen.insert(row) {
                continue;
            }
            let row_y = bar::compute_y(row, &self.options);
            let mut members = Vec::new();
            let mut geometry = Vec::new();
            for (pos, (b, task)) in self.bars.iter_mut().zip(self.schedule.tasks()).enumerate() {
                if task.index == row {
                    members.push(pos);
                    geometry.push(&mut b.geometry);
                }
            }
            overlap::resolve_row(row_y, self.options.bar_height, &mut geometry);
            touched.extend(members);
        }
        self.reroute(&touched);
    }

    fn reroute(&mut self, positions: &[usize]) {
        let mut ids: Vec<usize> = positions
            .iter()
            .flat_map(|&p| self.bars[p].arrows.iter().copied())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        for i in ids {
            let arrow = &self.arrows[i];
            let (Some(from), Some(to)) = (self.geometry_of(&arrow.from), self.geometry_of(&arrow.to)) else {
                continue;
            };
            self.arrows[i].points =
                arrow::route(&from, &to, self.options.arrow_curve, self.options.padding);
        }
    }

    fn geometry_of(&self, id: &str) -> Option<Geometry> {
        self.schedule.position(id).map(|p| self.bars[p].geometry)
    }

    /// The current display list, rebuilt if anything changed since the last
    /// call.
    pub fn scene(&mut self) -> &Scene {
        let scene = match self.scene.take() {
            Some(scene) => scene,
            None => render::build(
                &render::SceneInput {
                    options: &self.options,
                    working: &self.working,
                    scale: &self.scale,
                    schedule: &self.schedule,
                    bars: &self.bars,
                    arrows: &self.arrows,
                    work_periods: &self.work_periods,
                    now: self.now,
                },
                self.measure.as_ref(),
            ),
        };
        self.scene.insert(scene)
    }

    pub fn set_text_measure(&mut self, measure: impl TextMeasure + 'static) {
        self.measure = Box::new(measure);
        self.scene = None;
    }

    /// Advance the "now" marker. Returns its x when on the axis.
    pub fn tick(&mut self, now: NaiveDateTime) -> Option<f64> {
        self.now = now;
        self.scene = None;
        self.now_marker()
    }

    pub fn now_marker(&self) -> Option<f64> {
        self.scale
            .contains(self.now)
            .then(|| self.scale.time_to_x(self.now))
    }

    // ── Public operations ───────────────────────────────────────

    /// Replace the whole task set. Resources and their rows are kept.
    pub fn refresh(&mut self, records: Vec<TaskRecord>) {
        self.schedule.replace_tasks(records, &self.working);
        self.latch = None;
        self.render();
        self.notify_render_complete();
    }

    /// Switch granularity, keeping the instant at the left edge of the view
    /// in place.
    pub fn change_view_mode(&mut self, mode: ViewMode) {
        let visible = self.scale.x_to_time(self.scroll_x + self.scale.offset);
        self.mode_pinned = true;
        self.options.view_mode = mode;
        self.render();
        self.scroll_to_time(visible);
        self.listener.on_view_change(mode);
        self.notify_render_complete();
    }

    pub fn scroll_to_time(&mut self, instant: NaiveDateTime) {
        let x = self.clamp_scroll(self.scale.time_to_x(instant) - self.scale.offset);
        self.scroll_x = x;
        self.pending_scroll = Some(x);
    }

    /// Scroll position requested by the engine since the last call.
    pub fn take_scroll(&mut self) -> Option<f64> {
        self.pending_scroll.take()
    }

    /// Record where the host is currently scrolled to.
    pub fn set_scroll(&mut self, x: f64) {
        self.scroll_x = x.max(0.0);
    }

    pub fn scroll_x(&self) -> f64 {
        self.scroll_x
    }

    pub fn set_surface(&mut self, surface: Surface) -> Result<()> {
        self.surface = surface.validate()?;
        Ok(())
    }

    pub fn get_task(&self, id: &str) -> Option<&Task> {
        self.schedule.task(id)
    }

    pub fn get_bar(&self, id: &str) -> Option<&Bar> {
        self.schedule.position(id).map(|p| &self.bars[p])
    }

    pub fn tasks(&self) -> &[Task] {
        self.schedule.tasks()
    }

    pub fn resources(&self) -> &[Resource] {
        self.schedule.resources()
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn arrows(&self) -> &[Arrow] {
        &self.arrows
    }

    pub fn issues(&self) -> &[ScheduleIssue] {
        self.schedule.issues()
    }

    pub fn scale(&self) -> &TimeScale {
        &self.scale
    }

    pub fn options(&self) -> &GanttOptions {
        &self.options
    }

    pub fn view_mode(&self) -> ViewMode {
        self.scale.mode
    }

    pub fn work_periods(&self) -> &[WorkPeriod] {
        &self.work_periods
    }

    pub fn update_task_issue(&mut self, id: &str, issue: Option<&str>) -> Result<()> {
        let task = self
            .schedule
            .task_mut(id)
            .ok_or_else(|| GanttError::TaskNotFound(id.to_string()))?;
        task.issue_type = issue.map(str::to_string);
        self.scene = None;
        Ok(())
    }

    /// Returns whether a badge was removed.
    pub fn remove_task_badge(&mut self, task_id: &str, employee_id: &str) -> Result<bool> {
        let task = self
            .schedule
            .task_mut(task_id)
            .ok_or_else(|| GanttError::TaskNotFound(task_id.to_string()))?;
        let before = task.badges.len();
        task.badges.retain(|b| b.employee_id != employee_id);
        let removed = task.badges.len() != before;
        if removed {
            self.scene = None;
        }
        Ok(removed)
    }

    pub fn draw_work_period_column(
        &mut self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        kind: &str,
        color: &str,
        code: &str,
    ) {
        self.work_periods.push(WorkPeriod {
            start: start.min(end),
            end: end.max(start),
            kind: kind.to_string(),
            color: color.to_string(),
            code: code.to_string(),
        });
        self.scene = None;
    }

    pub fn clear_work_periods(&mut self) {
        self.work_periods.clear();
        self.scene = None;
    }

    pub fn set_listener(&mut self, listener: impl GanttListener + 'static) {
        self.listener = Box::new(listener);
    }

    pub fn set_custom_popup(&mut self, renderer: impl Fn(&Task) -> String + 'static) {
        self.custom_popup = Some(Box::new(renderer));
    }

    pub fn popup(&self, id: &str) -> Result<Popup> {
        let pos = self
            .schedule
            .position(id)
            .ok_or_else(|| GanttError::PopupWithoutTarget(id.to_string()))?;
        let task = &self.schedule.tasks()[pos];
        let fmt = |d| calendar::format(d, &self.options.date_format, &self.options.language);

        let mut details = vec![
            format!("Duration: {}h {:02}m", task.duration / 60, task.duration % 60),
            format!("Progress: {:.0}%", task.progress),
        ];
        if let Some(resource) = self.schedule.resource_at(task.index) {
            details.push(format!("Resource: {}", resource.name));
        }
        if let (Some(s), Some(e)) = (task.actual_start, task.actual_end) {
            details.push(format!("Actual: {} - {}", fmt(s), fmt(e)));
        }
        for badge in &task.badges {
            details.push(format!("{}: {}", badge.label, badge.description));
        }
        if let Some(issue) = &task.issue_type {
            details.push(format!("Issue: {issue}"));
        }

        Ok(Popup {
            task_id: task.id.clone(),
            anchor: self.bars[pos].geometry,
            title: task.name.clone(),
            subtitle: format!("{} - {}", fmt(task.start), fmt(task.end)),
            details,
            custom: self.custom_popup.as_ref().map(|f| f(task)),
            trigger: self.options.popup_trigger,
        })
    }

    // ── Editing ─────────────────────────────────────────────────

    /// Move or resize one bar. On success returns every task whose span
    /// changed, the edited task first.
    pub fn update_position(&mut self, id: &str, update: PositionUpdate) -> EditResult<Vec<String>> {
        self.apply_position(id, update, &HashSet::new())
    }

    /// Like [`Gantt::update_position`], but predecessors in `group` are moving
    /// alongside and do not act as a floor.
    fn apply_position(
        &mut self,
        id: &str,
        update: PositionUpdate,
        group: &HashSet<String>,
    ) -> EditResult<Vec<String>> {
        if self.options.viewonly {
            return Err(EditRejection::ViewOnly);
        }
        let task = self
            .schedule
            .task(id)
            .ok_or_else(|| EditRejection::UnknownTask(id.to_string()))?;
        if task.is_locked() {
            return Err(EditRejection::BothEdgesLocked(id.to_string()));
        }

        let old = (task.start, task.end);
        let (start, end, x, width) = if update.is_pixel() {
            let x = update.x.unwrap_or_else(|| self.scale.time_to_x(task.start));
            let start = match update.x {
                Some(x) => self.scale.x_to_time(x),
                None => task.start,
            };
            let (end, width) = match update.width {
                Some(w) => (self.scale.x_to_time(x + w), w),
                None => (start + (task.end - task.start), self.scale.span_width(task.start, task.end)),
            };
            (start, end, x, width)
        } else {
            let start = update.start.unwrap_or(task.start);
            let end = update.end.unwrap_or(task.end);
            (start, end, self.scale.time_to_x(start), self.scale.span_width(start, end))
        };

        if (start, end) == old {
            return Ok(Vec::new());
        }
        if start != task.start && task.start_locked {
            return Err(EditRejection::StartLocked(id.to_string()));
        }
        if end != task.end && task.end_locked {
            return Err(EditRejection::EndLocked(id.to_string()));
        }
        if end < start {
            return Err(EditRejection::EndBeforeStart(id.to_string()));
        }
        if update.is_pixel() && start < task.start {
            self.check_dependency_floor(task, x, group)?;
        }

        let mut plan = vec![SpanEdit {
            id: id.to_string(),
            start,
            end,
        }];
        if !update.skip_cascade {
            let mut visited = HashSet::from([id.to_string()]);
            self.plan_subtasks(id, old, (start, end), &mut visited, &mut plan)?;
            if self.options.updateparent {
                self.plan_parents(id, (start, end), &mut visited, &mut plan);
            }
        }
        Ok(self.apply_plan(plan, (x, width)))
    }

    fn check_dependency_floor(&self, task: &Task, x: f64, group: &HashSet<String>) -> EditResult<()> {
        for pred_id in task.dependencies.iter().filter(|p| !group.contains(*p)) {
            let Some(pred) = self.schedule.task(pred_id) else {
                continue;
            };
            if x < self.scale.time_to_x(pred.end) - EDGE_EPSILON {
                return Err(EditRejection::DependencyFloor {
                    task: task.id.clone(),
                    predecessor: pred_id.clone(),
                });
            }
        }
        Ok(())
    }

    /// Write a validated plan to tasks and bars. The first edit is placed at
    /// `primary` pixels; the rest follow their new spans.
    fn apply_plan(&mut self, plan: Vec<SpanEdit>, primary: (f64, f64)) -> Vec<String> {
        let mut rows = Vec::new();
        let mut changed = Vec::with_capacity(plan.len());
        for (i, edit) in plan.into_iter().enumerate() {
            let Some(pos) = self.schedule.position(&edit.id) else {
                continue;
            };
            let (x, width) = if i == 0 {
                primary
            } else {
                (
                    self.scale.time_to_x(edit.start),
                    self.scale.span_width(edit.start, edit.end),
                )
            };
            if let Some(task) = self.schedule.task_mut(&edit.id) {
                task.start = edit.start;
                task.end = edit.end;
                rows.push(task.index);
            }
            self.bars[pos].set_span(x, width);
            changed.push(edit.id);
        }
        self.resolve_rows(rows);
        self.scene = None;
        changed
    }

    /// Report a task's new dates if they differ from the last report.
    /// Recomputes the working duration first.
    pub fn date_changed(&mut self, id: &str) -> bool {
        let Some(pos) = self.schedule.position(id) else {
            return false;
        };
        let Some(task) = self.schedule.task_mut(id) else {
            return false;
        };
        let span = (task.start, task.end);
        if self.bars[pos].committed == span {
            return false;
        }
        task.duration = self.working.duration_minutes(span.0, span.1);
        self.bars[pos].committed = span;
        log::info!("task '{id}' now {} .. {}", span.0, span.1);
        self.listener.on_date_change(task, span.0, span.1);
        true
    }

    /// Programmatic reschedule: validate, cascade, then report every task
    /// that moved.
    pub fn move_task(&mut self, id: &str, start: NaiveDateTime, end: NaiveDateTime) -> EditResult<()> {
        let changed = self.update_position(id, PositionUpdate::span(start, end))?;
        for task_id in &changed {
            self.date_changed(task_id);
        }
        Ok(())
    }

    /// Take the progress from the bar's progress width and report it when it
    /// differs from the task's.
    pub fn progress_changed(&mut self, id: &str) -> Option<f64> {
        let pos = self.schedule.position(id)?;
        let percent = self.bars[pos].progress_percent();
        let task = self.schedule.task_mut(id)?;
        if (task.progress - percent).abs() < f64::EPSILON {
            return None;
        }
        task.progress = percent;
        self.listener.on_progress_change(task, percent);
        Some(percent)
    }

    /// Row a task would land on after moving `delta` rows, or why it can't.
    /// `Ok(None)` for a zero delta.
    pub fn check_resource_change(&self, id: &str, delta: i64) -> EditResult<Option<usize>> {
        if self.options.viewonly {
            return Err(EditRejection::ViewOnly);
        }
        let task = self
            .schedule
            .task(id)
            .ok_or_else(|| EditRejection::UnknownTask(id.to_string()))?;
        if delta == 0 {
            return Ok(None);
        }
        if !task.can_change_resource() {
            return Err(EditRejection::ResourceChangeDisabled(id.to_string()));
        }
        let target = task.index as i64 + delta;
        let next = usize::try_from(target)
            .ok()
            .and_then(|t| self.schedule.resource_at(t))
            .ok_or(EditRejection::NoSuchRow(target))?;
        let current = self
            .schedule
            .resource_at(task.index)
            .ok_or(EditRejection::NoSuchRow(task.index as i64))?;
        if !self.options.resourcechange && !current.is_related(next) {
            return Err(EditRejection::ResourceNotRelated {
                from: current.id.clone(),
                to: next.id.clone(),
            });
        }
        Ok(Some(next.index))
    }

    /// Move a task `delta` rows. Returns whether it moved.
    pub fn update_resource(&mut self, id: &str, delta: i64) -> EditResult<bool> {
        let Some(target) = self.check_resource_change(id, delta)? else {
            return Ok(false);
        };
        let pos = self
            .schedule
            .position(id)
            .ok_or_else(|| EditRejection::UnknownTask(id.to_string()))?;
        let old_row = self.schedule.tasks()[pos].index;
        let (old, new) = self
            .schedule
            .assign(id, target)
            .ok_or(EditRejection::NoSuchRow(target as i64))?;
        self.bars[pos].set_row(bar::compute_y(target, &self.options));
        self.resolve_rows([old_row, target]);
        self.scene = None;

        log::info!("task '{id}' moved from '{}' to '{}'", old.id, new.id);
        let task = &self.schedule.tasks()[pos];
        self.listener.on_resource_change(task, &old, &new);
        Ok(true)
    }

    // ── Pointer session ─────────────────────────────────────────

    /// Which bar part is under `p`, topmost bar first.
    pub fn hit_test(&self, p: Point) -> Option<Hit> {
        let (b, task) = self
            .bars
            .iter()
            .zip(self.schedule.tasks())
            .rev()
            .find(|(b, _)| b.geometry.contains(p))?;
        let g = &b.geometry;
        let target = if self.options.viewonly {
            HitTarget::Body
        } else if !task.is_locked()
            && (p.x - (g.x + b.progress_width)).abs() <= PROGRESS_GRIP
            && p.y >= g.bottom() - g.height / 3.0
        {
            HitTarget::ProgressHandle
        } else if !task.start_locked && p.x <= g.x + HANDLE_WIDTH {
            HitTarget::LeftHandle
        } else if !task.end_locked && p.x >= g.end_x() - HANDLE_WIDTH {
            HitTarget::RightHandle
        } else {
            HitTarget::Body
        };
        Some(Hit {
            task_id: task.id.clone(),
            target,
        })
    }

    /// Start a session on `hit`. The bar and its transitive dependents are
    /// snapshotted; a progress drag only snapshots the bar itself.
    pub fn pointer_down(&mut self, hit: &Hit, at: Point) -> Option<DragSession> {
        if self.options.viewonly {
            return None;
        }
        let mode = DragMode::from(hit.target);
        let ids = match mode {
            DragMode::Progress => vec![hit.task_id.clone()],
            _ => self.schedule.transitive_dependents(&hit.task_id),
        };
        let snapshots: Vec<BarSnapshot> = ids.iter().filter_map(|id| self.snapshot(id)).collect();
        if snapshots.is_empty() {
            return None;
        }
        log::debug!("{mode:?} session on '{}' with {} bars", hit.task_id, snapshots.len());
        Some(DragSession::new(hit.task_id.clone(), mode, at, snapshots))
    }

    fn snapshot(&self, id: &str) -> Option<BarSnapshot> {
        let pos = self.schedule.position(id)?;
        let task = &self.schedule.tasks()[pos];
        let b = &self.bars[pos];
        Some(BarSnapshot {
            task_id: task.id.clone(),
            geometry: b.geometry,
            span_width: self.scale.span_width(task.start, task.end),
            progress_width: b.progress_width,
            start: task.start,
            end: task.end,
        })
    }

    /// Apply the pointer's displacement since the session began.
    pub fn pointer_move(&mut self, session: &mut DragSession, at: Point) {
        session.dx = self.scale.snap(at.x - session.origin.x);
        session.dy = at.y - session.origin.y;
        let dx = session.dx;

        if session.mode == DragMode::Progress {
            if let Some(pos) = session
                .primary_snapshot()
                .and_then(|s| self.schedule.position(&s.task_id))
            {
                let start_width = session.snapshots[0].progress_width;
                let b = &mut self.bars[pos];
                b.progress_width = (start_width + dx).clamp(0.0, b.geometry.width);
                self.scene = None;
            }
            return;
        }

        let group: HashSet<String> = session.snapshots.iter().map(|s| s.task_id.clone()).collect();
        let mut touched = Vec::new();
        for (i, snap) in session.snapshots.iter().enumerate() {
            let update = match (i, session.mode) {
                (0, DragMode::ResizeLeft) => PositionUpdate::pixels(snap.geometry.x + dx, snap.span_width - dx),
                (0, DragMode::ResizeRight) => PositionUpdate {
                    width: Some(snap.span_width + dx),
                    ..Default::default()
                },
                (_, DragMode::ResizeRight) => continue,
                _ => PositionUpdate::to_x(snap.geometry.x + dx),
            };
            match self.apply_position(&snap.task_id, update, &group) {
                Ok(changed) => touched.extend(changed),
                Err(reason) => {
                    log::debug!("drag of '{}' rejected: {reason}", snap.task_id);
                    if i == 0 {
                        break;
                    }
                }
            }
        }
        session.touch(touched);

        if session.mode == DragMode::Move {
            session.resource_delta = (session.dy / self.options.row_height()).round() as i64;
            session.prospective_row = self
                .check_resource_change(&session.primary, session.resource_delta)
                .ok()
                .flatten();
        }
    }

    /// Finish a session: commit a resource change, report every moved bar
    /// and latch the bar against an immediate click. Returns whether anything
    /// was reported.
    pub fn pointer_up(&mut self, session: DragSession) -> bool {
        let mut acted = false;
        if session.mode == DragMode::Progress {
            acted = self.progress_changed(&session.primary).is_some();
        } else {
            if session.mode == DragMode::Move && session.resource_delta != 0 {
                match self.update_resource(&session.primary, session.resource_delta) {
                    Ok(moved) => acted |= moved,
                    Err(reason) => log::debug!("resource change rejected: {reason}"),
                }
            }
            for id in &session.touched {
                acted |= self.date_changed(id);
            }
        }
        if acted || session.has_moved() {
            self.latch = Some((session.primary.clone(), Instant::now()));
        }
        acted
    }

    pub fn click(&mut self, id: &str) -> bool {
        self.click_at(id, Instant::now())
    }

    /// Report a click unless the same bar just finished a drag.
    pub fn click_at(&mut self, id: &str, at: Instant) -> bool {
        if let Some((latched, since)) = &self.latch {
            if latched == id && at.saturating_duration_since(*since) < CLICK_LATCH {
                log::debug!("click on '{id}' suppressed after drag");
                return false;
            }
        }
        let Some(task) = self.schedule.task(id) else {
            return false;
        };
        self.listener.on_click(task);
        true
    }
}

fn pinned_bound(text: &Option<String>, what: &str) -> Option<NaiveDateTime> {
    let text = text.as_deref()?;
    match calendar::parse(text) {
        Ok(date) => Some(date),
        Err(e) => {
            log::warn!("ignoring {what} option: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::calendar::parse;
    use crate::model::{Badge, ResourceKind};

    fn dt(s: &str) -> NaiveDateTime {
        parse(s).unwrap()
    }

    fn resources() -> Vec<Resource> {
        vec![
            Resource::new("L1", "Line", ResourceKind::Line),
            Resource::new("W1", "Workcenter", ResourceKind::Workcenter).with_parent("L1"),
            Resource::new("M1", "Machine", ResourceKind::Machine).with_parent("W1"),
            Resource::new("M2", "Machine 2", ResourceKind::Machine).with_parent("W1"),
        ]
    }

    fn gantt(records: Vec<TaskRecord>) -> (Gantt, EventLog) {
        let log = EventLog::new();
        let g = Gantt::with_listener(
            Surface::new(1200.0, 600.0),
            resources(),
            records,
            GanttOptions::default(),
            log.clone(),
        )
        .unwrap();
        (g, log)
    }

    #[test]
    fn test_invalid_surface_is_fatal() {
        let err = Gantt::new(Surface::new(0.0, 300.0), Vec::new(), Vec::new(), GanttOptions::default());
        assert!(matches!(err, Err(GanttError::InvalidSurface(_))));
        let err = Gantt::new(Surface::new(f64::NAN, 300.0), Vec::new(), Vec::new(), GanttOptions::default());
        assert!(err.is_err());
    }

    #[test]
    fn test_construction_reports_render_complete() {
        let (_, log) = gantt(vec![TaskRecord::new("A", "a").span("2024-01-01", "2024-01-03").on("M1")]);
        assert_eq!(log.take(), vec![GanttEvent::RenderComplete]);
    }

    #[test]
    fn test_options_follow_view_mode() {
        let (mut g, log) = gantt(vec![TaskRecord::new("A", "a").span("2024-01-01", "2024-01-03").on("M1")]);
        log.take();
        g.change_view_mode(ViewMode::Week);
        assert_eq!(g.options().view_mode, ViewMode::Week);
        assert_eq!(g.options().column_width, 140.0);
        assert_eq!(g.options().step, 168.0);
        assert_eq!(
            log.take(),
            vec![GanttEvent::ViewChange(ViewMode::Week), GanttEvent::RenderComplete]
        );
    }

    #[test]
    fn test_view_change_keeps_visible_instant() {
        let (mut g, _) = gantt(vec![TaskRecord::new("A", "a").span("2024-01-01", "2024-01-20").on("M1")]);
        g.change_view_mode(ViewMode::Day);
        g.scroll_to_time(dt("2024-01-10"));
        g.take_scroll();
        g.change_view_mode(ViewMode::Hour);
        let x = g.take_scroll().unwrap();
        assert_eq!(g.scale().x_to_time(x + g.scale().offset), dt("2024-01-10"));
    }

    #[test]
    fn test_end_before_start_rejected() {
        let (mut g, log) = gantt(vec![TaskRecord::new("A", "a").span("2024-01-02", "2024-01-03").on("M1")]);
        log.take();
        let err = g.move_task("A", dt("2024-01-05"), dt("2024-01-04")).unwrap_err();
        assert_eq!(err, EditRejection::EndBeforeStart("A".into()));
        assert!(log.take().is_empty());
    }

    #[test]
    fn test_locked_edges() {
        let (mut g, _) = gantt(vec![
            TaskRecord {
                isstartviewonly: true,
                ..TaskRecord::new("S", "s").span("2024-01-02", "2024-01-03").on("M1")
            },
            TaskRecord {
                isstartviewonly: true,
                isendviewonly: true,
                ..TaskRecord::new("B", "b").span("2024-01-02", "2024-01-03").on("M2")
            },
        ]);
        assert_eq!(
            g.move_task("S", dt("2024-01-01"), dt("2024-01-03")),
            Err(EditRejection::StartLocked("S".into()))
        );
        assert!(g.move_task("S", dt("2024-01-02"), dt("2024-01-05")).is_ok());
        assert_eq!(
            g.move_task("B", dt("2024-01-02"), dt("2024-01-04")),
            Err(EditRejection::BothEdgesLocked("B".into()))
        );
    }

    #[test]
    fn test_move_task_recomputes_duration_and_reports() {
        let (mut g, log) = gantt(vec![TaskRecord::new("A", "a").span("2024-01-02", "2024-01-03").on("M1")]);
        log.take();
        g.move_task("A", dt("2024-01-02 08:00"), dt("2024-01-02 10:00")).unwrap();
        assert_eq!(g.get_task("A").unwrap().duration, 120);
        let events = log.take();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], GanttEvent::DateChange { start, .. } if *start == dt("2024-01-02 08:00")));
        assert!(!g.date_changed("A"));
    }

    #[test]
    fn test_view_only_blocks_edits_and_sessions() {
        let log = EventLog::new();
        let options = GanttOptions {
            viewonly: true,
            ..Default::default()
        };
        let mut g = Gantt::with_listener(
            Surface::new(800.0, 600.0),
            resources(),
            vec![TaskRecord::new("A", "a").span("2024-01-02", "2024-01-03").on("M1")],
            options,
            log,
        )
        .unwrap();
        assert_eq!(
            g.move_task("A", dt("2024-01-03"), dt("2024-01-04")),
            Err(EditRejection::ViewOnly)
        );
        let center = g.get_bar("A").unwrap().geometry.center();
        let hit = g.hit_test(center).unwrap();
        assert!(g.pointer_down(&hit, center).is_none());
        assert!(g.scene().find("handle-left", "A").is_none());
    }

    #[test]
    fn test_hit_test_targets() {
        let (g, _) = gantt(vec![TaskRecord {
            progress: 50.0,
            ..TaskRecord::new("A", "a").span("2024-01-02", "2024-01-12").on("M1")
        }]);
        let geo = g.get_bar("A").unwrap().geometry;
        let at = |x: f64, y: f64| g.hit_test(Point::new(x, y)).map(|h| h.target);
        assert_eq!(at(geo.x + 2.0, geo.y + 2.0), Some(HitTarget::LeftHandle));
        assert_eq!(at(geo.end_x() - 2.0, geo.y + 2.0), Some(HitTarget::RightHandle));
        assert_eq!(at(geo.x + geo.width / 2.0, geo.bottom() - 1.0), Some(HitTarget::ProgressHandle));
        assert_eq!(at(geo.x + geo.width / 4.0, geo.y + 2.0), Some(HitTarget::Body));
        assert_eq!(at(geo.x - 50.0, geo.y), None);
    }

    #[test]
    fn test_progress_drag_reports_percent() {
        let (mut g, log) = gantt(vec![TaskRecord {
            progress: 50.0,
            ..TaskRecord::new("A", "a").span("2024-01-02", "2024-01-12").on("M1")
        }]);
        log.take();
        let geo = g.get_bar("A").unwrap().geometry;
        let hit = Hit {
            task_id: "A".into(),
            target: HitTarget::ProgressHandle,
        };
        let origin = Point::new(geo.x + geo.width / 2.0, geo.bottom());
        let mut session = g.pointer_down(&hit, origin).unwrap();
        g.pointer_move(&mut session, Point::new(geo.end_x() + 100.0, geo.bottom()));
        assert!(g.pointer_up(session));
        assert_eq!(g.get_task("A").unwrap().progress, 100.0);
        assert!(matches!(log.take().as_slice(), [GanttEvent::ProgressChange { progress, .. }] if *progress == 100.0));
    }

    #[test]
    fn test_related_resource_change() {
        let (mut g, log) = gantt(vec![TaskRecord {
            changeresource: true,
            ..TaskRecord::new("A", "a").span("2024-01-02", "2024-01-03").on("M1")
        }]);
        log.take();
        // M1 -> M2 are siblings under W1.
        assert!(g.update_resource("A", 1).unwrap());
        assert_eq!(g.get_task("A").unwrap().resource_id, "M2");
        assert_eq!(g.get_bar("A").unwrap().geometry.y, bar::compute_y(3, g.options()));
        // M2 -> L1 skips the hierarchy.
        assert_eq!(
            g.update_resource("A", -3),
            Err(EditRejection::ResourceNotRelated {
                from: "M2".into(),
                to: "L1".into()
            })
        );
        assert_eq!(g.update_resource("A", 5), Err(EditRejection::NoSuchRow(8)));
        let events = log.take();
        assert_eq!(events.len(), 1);
        assert!(
            matches!(&events[0], GanttEvent::ResourceChange { old, new, .. } if old.id == "M1" && new.id == "M2")
        );
    }

    #[test]
    fn test_popup_and_decorations() {
        let (mut g, _) = gantt(vec![TaskRecord {
            badges: vec![Badge {
                employee_id: "E1".into(),
                label: "JS".into(),
                description: "Jo Smith".into(),
            }],
            ..TaskRecord::new("A", "Weld").span("2024-01-02", "2024-01-03").on("M1")
        }]);
        let popup = g.popup("A").unwrap();
        assert_eq!(popup.title, "Weld");
        assert_eq!(popup.subtitle, "2024-01-02 - 2024-01-03");
        assert!(popup.details.contains(&"JS: Jo Smith".to_string()));
        assert!(popup.custom.is_none());
        assert!(matches!(g.popup("nope"), Err(GanttError::PopupWithoutTarget(_))));

        g.set_custom_popup(|t| format!("<b>{}</b>", t.name));
        assert_eq!(g.popup("A").unwrap().custom.as_deref(), Some("<b>Weld</b>"));

        assert!(g.scene().find("badge", "A").is_some());
        assert!(g.remove_task_badge("A", "E1").unwrap());
        assert!(!g.remove_task_badge("A", "E1").unwrap());
        assert!(g.scene().find("badge", "A").is_none());

        g.update_task_issue("A", Some("late")).unwrap();
        assert!(g.scene().find("issue late", "A").is_some());
        assert!(g.update_task_issue("zz", None).is_err());
    }

    #[test]
    fn test_work_periods_persist_across_renders() {
        let (mut g, _) = gantt(vec![TaskRecord::new("A", "a").span("2024-01-02", "2024-01-03").on("M1")]);
        g.draw_work_period_column(dt("2024-01-02 08:00"), dt("2024-01-02 12:00"), "shift", "#ffcc00", "S1");
        g.change_view_mode(ViewMode::Hour);
        let scene = g.scene();
        let band = scene
            .primitives()
            .find(|p| p.class() == "work-period shift")
            .unwrap();
        assert!(matches!(band, Primitive::Rect { fill: Some(c), .. } if c == "#ffcc00"));
    }

    #[test]
    fn test_now_marker_tracks_tick() {
        let (mut g, _) = gantt(vec![TaskRecord::new("A", "a").span("2024-01-02", "2024-01-03").on("M1")]);
        let x = g.tick(dt("2024-01-02 12:00")).unwrap();
        assert_eq!(x, g.scale().time_to_x(dt("2024-01-02 12:00")));
        assert_eq!(g.scene().now_marker, Some(x));
        assert!(g.tick(dt("2030-01-01")).is_none());
    }

    #[test]
    fn test_labels_move_outside_narrow_bars() {
        let (mut g, _) = gantt(vec![
            TaskRecord::new("A", "a very long label that will not fit")
                .span("2024-01-02", "2024-01-02 01:00")
                .on("M1"),
            TaskRecord::new("B", "ok").span("2024-01-02", "2024-01-20").on("M2"),
        ]);
        let end_a = g.get_bar("A").unwrap().geometry.end_x();
        let scene = g.scene();
        match scene.find("bar-label big", "A") {
            Some(Primitive::Text { at, anchor, .. }) => {
                assert_eq!(*anchor, Anchor::Start);
                assert!(at.x > end_a);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(scene.find("bar-label", "B").is_some());
    }

    #[test]
    fn test_arrows_follow_moved_bar() {
        let (mut g, _) = gantt(vec![
            TaskRecord::new("A", "a").span("2024-01-02", "2024-01-03").on("M1"),
            TaskRecord::new("B", "b").span("2024-01-04", "2024-01-05").on("M2").after("A"),
        ]);
        assert_eq!(g.arrows().len(), 1);
        assert_eq!(g.get_bar("A").unwrap().arrows, vec![0]);
        let before = g.arrows()[0].points.clone();
        g.move_task("B", dt("2024-01-06"), dt("2024-01-07")).unwrap();
        let after = &g.arrows()[0].points;
        assert_ne!(&before, after);
        assert_eq!(after.last().unwrap().x, g.get_bar("B").unwrap().geometry.x);
    }

    fn gantt_with(options: GanttOptions, records: Vec<TaskRecord>) -> Gantt {
        Gantt::new(Surface::new(1200.0, 600.0), resources(), records, options).unwrap()
    }

    #[test]
    fn test_pinned_bounds_keep_the_configured_mode() {
        let options = GanttOptions {
            start: Some("2023-06-01".into()),
            end: Some("2025-06-01".into()),
            view_mode: ViewMode::Week,
            ..GanttOptions::default()
        };
        let g = gantt_with(options, vec![TaskRecord::new("A", "a").span("2024-03-01", "2024-03-02").on("M1")]);
        assert_eq!(g.view_mode(), ViewMode::Week);
        assert!(g.scale().axis_start <= dt("2023-06-01"));
        assert!(g.scale().axis_end >= dt("2025-06-01"));
    }

    #[test]
    fn test_single_pinned_bound_still_picks_mode() {
        let options = GanttOptions {
            start: Some("2020-01-01".into()),
            view_mode: ViewMode::Hour,
            ..GanttOptions::default()
        };
        let g = gantt_with(options, vec![TaskRecord::new("A", "a").span("2024-03-01", "2024-03-02").on("M1")]);
        assert_eq!(g.view_mode(), ViewMode::Month);
        assert!(g.scale().axis_start <= dt("2020-01-01"));
    }

    #[test]
    fn test_today_as_default_covers_now_and_anchors_scroll() {
        let records = || vec![TaskRecord::new("A", "a").span("2024-01-01", "2024-01-03").on("M1")];

        let g = gantt_with(GanttOptions::default(), records());
        assert!(!g.scale().contains(g.now));
        assert_eq!(g.now_marker(), None);
        let data_start = g.scale.time_to_x(dt("2024-01-01")) - g.scale.offset - g.scale.column_width;
        assert_eq!(g.scroll_x(), g.clamp_scroll(data_start));

        let options = GanttOptions {
            todayasdefault: true,
            ..GanttOptions::default()
        };
        let mut g = gantt_with(options, records());
        assert!(g.scale().contains(g.now));
        assert!(g.scale().axis_start <= dt("2024-01-01"));
        assert!(g.now_marker().is_some());
        let expected = g.clamp_scroll(g.scale.time_to_x(g.now) - g.scale.offset - g.scale.column_width);
        assert!(expected > 0.0);
        assert_eq!(g.scroll_x(), expected);
        assert_eq!(g.take_scroll(), Some(expected));
    }

    #[test]
    fn test_refresh_rebuilds_graphs_and_keeps_rows() {
        let (mut g, log) = gantt(vec![
            TaskRecord::new("A", "a").span("2024-01-02", "2024-01-03").on("M1"),
            TaskRecord::new("B", "b").span("2024-01-04", "2024-01-05").on("X9").after("A"),
        ]);
        assert_eq!(g.resources().len(), 5);
        assert_eq!(g.arrows().len(), 1);
        log.take();

        g.refresh(vec![
            TaskRecord::new("C", "c").span("2024-01-02", "2024-01-03").on("M2"),
            TaskRecord::new("D", "d").span("2024-01-06", "2024-01-07").on("M1").after("C").after("A"),
        ]);
        assert!(g.get_task("A").is_none());
        assert_eq!(g.bars().len(), 2);
        assert_eq!(g.arrows().len(), 1);
        assert_eq!((g.arrows()[0].from.as_str(), g.arrows()[0].to.as_str()), ("C", "D"));
        assert_eq!(g.get_task("D").unwrap().dependencies, vec!["C".to_string()]);

        let placeholder = g.resources().iter().find(|r| r.id == "X9").unwrap();
        assert!(placeholder.placeholder);
        assert_eq!(placeholder.index, 4);
        assert_eq!(log.take(), vec![GanttEvent::RenderComplete]);
    }

    #[test]
    fn test_today_highlight_follows_tick() {
        let (mut g, _) = gantt(vec![TaskRecord::new("A", "a").span("2024-01-01", "2024-01-20").on("M1")]);
        g.change_view_mode(ViewMode::Day);
        let highlight_x = |g: &mut Gantt| {
            g.scene().primitives().find_map(|p| match p {
                Primitive::Rect { class, rect, .. } if class == "today-highlight" => Some(rect.x),
                _ => None,
            })
        };

        g.tick(dt("2024-01-10 15:00"));
        let x = highlight_x(&mut g).unwrap();
        assert!((x - g.scale().time_to_x(dt("2024-01-10"))).abs() < 1e-6);

        g.tick(dt("2024-01-12 01:00"));
        let x = highlight_x(&mut g).unwrap();
        assert!((x - g.scale().time_to_x(dt("2024-01-12"))).abs() < 1e-6);

        g.tick(dt("2030-01-01"));
        assert_eq!(highlight_x(&mut g), None);
    }
}
