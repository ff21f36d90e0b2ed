//! Propagation of an edit to related tasks.
//!
//! Planning is separate from applying. A plan is computed against the current
//! schedule and then applied whole or discarded, so a lock found deep in the
//! subtask tree leaves every bar where it was.

use std::collections::HashSet;

use chrono::{Duration, NaiveDateTime};

use super::Gantt;
use crate::errors::{EditRejection, EditResult};

type Span = (NaiveDateTime, NaiveDateTime);

/// New span for one task, part of a plan.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SpanEdit {
    pub id: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// Which edges of a parent moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shift {
    Start,
    End,
    Both,
    Translate(Duration),
}

fn classify(old: Span, new: Span) -> Option<Shift> {
    let ds = new.0 - old.0;
    let de = new.1 - old.1;
    match (ds.is_zero(), de.is_zero()) {
        (true, true) => None,
        (false, true) => Some(Shift::Start),
        (true, false) => Some(Shift::End),
        _ if ds == de => Some(Shift::Translate(ds)),
        _ => Some(Shift::Both),
    }
}

/// Where a child goes when its parent's span becomes `parent`.
fn follow(shift: Shift, parent: Span, child: Span) -> Span {
    let (mut start, mut end) = child;
    if let Shift::Translate(offset) = shift {
        return (start + offset, end + offset);
    }
    if matches!(shift, Shift::Start | Shift::Both) && start < parent.0 {
        start = parent.0;
        end = end.max(start);
    }
    if matches!(shift, Shift::End | Shift::Both) && end > parent.1 {
        end = parent.1;
        start = start.min(end);
    }
    (start, end)
}

impl Gantt {
    /// Depth-first plan for the subtasks of `parent` after its span moved
    /// from `old` to `new`. Fails without side effects when any descendant
    /// would need a locked edge moved.
    pub(crate) fn plan_subtasks(
        &self,
        parent: &str,
        old: Span,
        new: Span,
        visited: &mut HashSet<String>,
        plan: &mut Vec<SpanEdit>,
    ) -> EditResult<()> {
        let Some(shift) = classify(old, new) else {
            return Ok(());
        };
        for child_id in self.schedule.subtasks_of(parent) {
            if !visited.insert(child_id.clone()) {
                continue;
            }
            let Some(child) = self.schedule.task(child_id) else {
                continue;
            };
            let current = (child.start, child.end);
            let (start, end) = follow(shift, new, current);
            if (start, end) == current {
                continue;
            }
            if (start != child.start && child.start_locked) || (end != child.end && child.end_locked) {
                log::debug!("cascade from '{parent}' blocked by locked subtask '{child_id}'");
                return Err(EditRejection::DescendantLocked(child_id.clone()));
            }
            log::debug!("cascade {shift:?} from '{parent}' moves '{child_id}'");
            plan.push(SpanEdit {
                id: child_id.clone(),
                start,
                end,
            });
            self.plan_subtasks(child_id, current, (start, end), visited, plan)?;
        }
        Ok(())
    }

    /// Widen the parent chain of `child` to cover `span`. Never narrows, and
    /// stops at the first parent whose affected edge is locked.
    pub(crate) fn plan_parents(
        &self,
        child: &str,
        span: Span,
        visited: &mut HashSet<String>,
        plan: &mut Vec<SpanEdit>,
    ) {
        let Some(parent_id) = self
            .schedule
            .task(child)
            .and_then(|t| t.parent_task.as_deref())
        else {
            return;
        };
        if !visited.insert(parent_id.to_string()) {
            return;
        }
        let Some(parent) = self.schedule.task(parent_id) else {
            return;
        };
        let start = parent.start.min(span.0);
        let end = parent.end.max(span.1);
        if (start, end) == (parent.start, parent.end) {
            return;
        }
        if (start != parent.start && parent.start_locked) || (end != parent.end && parent.end_locked) {
            log::debug!("parent '{parent_id}' is locked, not widened");
            return;
        }
        plan.push(SpanEdit {
            id: parent_id.to_string(),
            start,
            end,
        });
        self.plan_parents(parent_id, (start, end), visited, plan);
    }
}
