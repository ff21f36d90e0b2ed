//! Domain events and the listener seam through which the engine reports them.

use std::cell::RefCell;
use std::rc::Rc;

use chrono::NaiveDateTime;

use super::Gantt;
use crate::model::{Resource, Task, ViewMode};

/// Callbacks for engine events. Every method defaults to doing nothing.
pub trait GanttListener {
    fn on_view_change(&mut self, _mode: ViewMode) {}
    fn on_date_change(&mut self, _task: &Task, _start: NaiveDateTime, _end: NaiveDateTime) {}
    fn on_progress_change(&mut self, _task: &Task, _progress: f64) {}
    fn on_resource_change(&mut self, _task: &Task, _old: &Resource, _new: &Resource) {}
    fn on_click(&mut self, _task: &Task) {}
    fn on_render_complete(&mut self, _gantt: &Gantt) {}
}

pub struct NoopListener;

impl GanttListener for NoopListener {}

/// An event as recorded by [`EventLog`].
#[derive(Debug, Clone, PartialEq)]
pub enum GanttEvent {
    ViewChange(ViewMode),
    DateChange {
        task: Task,
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
    ProgressChange {
        task: Task,
        progress: f64,
    },
    ResourceChange {
        task: Task,
        old: Resource,
        new: Resource,
    },
    Click(Task),
    RenderComplete,
}

/// Listener that records every event. Clones share the same log, so the
/// host keeps one handle and gives the engine another.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Rc<RefCell<Vec<GanttEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain everything recorded so far.
    pub fn take(&self) -> Vec<GanttEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    pub fn snapshot(&self) -> Vec<GanttEvent> {
        self.events.borrow().clone()
    }

    fn push(&self, event: GanttEvent) {
        self.events.borrow_mut().push(event);
    }
}

impl GanttListener for EventLog {
    fn on_view_change(&mut self, mode: ViewMode) {
        self.push(GanttEvent::ViewChange(mode));
    }

    fn on_date_change(&mut self, task: &Task, start: NaiveDateTime, end: NaiveDateTime) {
        self.push(GanttEvent::DateChange {
            task: task.clone(),
            start,
            end,
        });
    }

    fn on_progress_change(&mut self, task: &Task, progress: f64) {
        self.push(GanttEvent::ProgressChange {
            task: task.clone(),
            progress,
        });
    }

    fn on_resource_change(&mut self, task: &Task, old: &Resource, new: &Resource) {
        self.push(GanttEvent::ResourceChange {
            task: task.clone(),
            old: old.clone(),
            new: new.clone(),
        });
    }

    fn on_click(&mut self, task: &Task) {
        self.push(GanttEvent::Click(task.clone()));
    }

    fn on_render_complete(&mut self, _gantt: &Gantt) {
        self.push(GanttEvent::RenderComplete);
    }
}
