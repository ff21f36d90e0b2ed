//! State of one pointer interaction, from press to release.
//!
//! The session is a value owned by the host between pointer events and handed
//! back to the engine on every move; releasing consumes it.

use chrono::NaiveDateTime;

use super::bar::{Geometry, Point};

/// Which part of a bar the pointer went down on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
    Body,
    LeftHandle,
    RightHandle,
    ProgressHandle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub task_id: String,
    pub target: HitTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragMode {
    Move,
    ResizeLeft,
    ResizeRight,
    Progress,
}

impl From<HitTarget> for DragMode {
    fn from(target: HitTarget) -> Self {
        match target {
            HitTarget::Body => DragMode::Move,
            HitTarget::LeftHandle => DragMode::ResizeLeft,
            HitTarget::RightHandle => DragMode::ResizeRight,
            HitTarget::ProgressHandle => DragMode::Progress,
        }
    }
}

/// A bar's state when the session began.
#[derive(Debug, Clone, PartialEq)]
pub struct BarSnapshot {
    pub task_id: String,
    pub geometry: Geometry,
    /// Unclamped pixel width of the task's span.
    pub span_width: f64,
    pub progress_width: f64,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    pub primary: String,
    pub mode: DragMode,
    pub origin: Point,
    /// Primary bar first, then its transitive dependents.
    pub snapshots: Vec<BarSnapshot>,
    pub dx: f64,
    pub dy: f64,
    /// Whole rows the pointer has travelled vertically.
    pub resource_delta: i64,
    /// Row the primary task would move to on release, if allowed.
    pub prospective_row: Option<usize>,
    /// Tasks whose geometry changed at any point during the session.
    pub(crate) touched: Vec<String>,
}

impl DragSession {
    pub(crate) fn new(
        primary: String,
        mode: DragMode,
        origin: Point,
        snapshots: Vec<BarSnapshot>,
    ) -> Self {
        Self {
            primary,
            mode,
            origin,
            snapshots,
            dx: 0.0,
            dy: 0.0,
            resource_delta: 0,
            prospective_row: None,
            touched: Vec::new(),
        }
    }

    pub fn primary_snapshot(&self) -> Option<&BarSnapshot> {
        self.snapshots.first()
    }

    pub fn has_moved(&self) -> bool {
        self.dx != 0.0 || self.dy != 0.0
    }

    pub(crate) fn touch(&mut self, ids: impl IntoIterator<Item = String>) {
        for id in ids {
            if !self.touched.contains(&id) {
                self.touched.push(id);
            }
        }
    }
}
