//! Tasks, resources and the relationship graphs between them.
//!
//! The dependency and subtask graphs are built once per [`Schedule::setup`]
//! or [`Schedule::replace_tasks`] and are read-only afterwards. Changing a
//! task's relationships means supplying a new task set.

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::{Duration, NaiveDateTime};

use super::calendar::{self, DateUnit};
use super::resource::Resource;
use super::task::{clean_ids, Task, TaskRecord};
use super::working_time::WorkingTime;

/// Configuration problems found while building the graphs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleIssue {
    /// Task ids forming a loop through `subtasks`, first id repeated last.
    SubtaskCycle(Vec<String>),
}

#[derive(Debug, Clone, Default)]
pub struct Schedule {
    resources: Vec<Resource>,
    tasks: Vec<Task>,
    positions: HashMap<String, usize>,
    /// Predecessor id -> successor ids.
    dependents: HashMap<String, Vec<String>>,
    /// Parent id -> child ids.
    children: HashMap<String, Vec<String>>,
    issues: Vec<ScheduleIssue>,
}

impl Schedule {
    pub fn setup(resources: Vec<Resource>, records: Vec<TaskRecord>, working: &WorkingTime) -> Self {
        let mut schedule = Self {
            resources,
            ..Default::default()
        };
        for (i, resource) in schedule.resources.iter_mut().enumerate() {
            resource.index = i;
        }
        schedule.replace_tasks(records, working);
        schedule
    }

    /// Swap in a complete new task set. Resources, including placeholders
    /// synthesized earlier, keep their rows.
    pub fn replace_tasks(&mut self, records: Vec<TaskRecord>, working: &WorkingTime) {
        let today = calendar::today();
        let mut tasks = Vec::with_capacity(records.len());
        for record in records {
            let task = self.normalize(record, working, today);
            tasks.push(task);
        }
        self.tasks = tasks;
        self.positions = self
            .tasks
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.clone(), i))
            .collect();
        self.build_graphs();
        log::info!(
            "schedule ready: {} tasks on {} resources",
            self.tasks.len(),
            self.resources.len()
        );
    }

    fn normalize(&mut self, record: TaskRecord, working: &WorkingTime, today: NaiveDateTime) -> Task {
        let id = record
            .id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let parse = |field: &Option<String>, what: &str| {
            field.as_deref().and_then(|text| match calendar::parse(text) {
                Ok(d) => Some(d),
                Err(e) => {
                    log::warn!("task '{id}': ignoring {what}: {e}");
                    None
                }
            })
        };
        let (start, mut end) = match (parse(&record.start, "start"), parse(&record.end, "end")) {
            (Some(s), Some(e)) => (s, e),
            (Some(s), None) => (s, s + Duration::days(1)),
            (None, Some(e)) => (e - Duration::days(1), e),
            (None, None) => (today, today + Duration::days(1)),
        };
        if end > calendar::add(start, 10, DateUnit::Year) {
            log::warn!("task '{id}': span exceeds 10 years, end re-derived");
            end = start + Duration::days(1);
        }
        let end = end.max(start);

        let resource_id = record.resourceid.clone().unwrap_or_default().trim().to_string();
        let index = self.resolve_resource(&resource_id);

        Task {
            duration: working.duration_minutes(start, end),
            actual_start: parse(&record.actualstart, "actual start"),
            actual_end: parse(&record.actualend, "actual end"),
            id,
            name: record.name,
            start,
            end,
            progress: record.progress.clamp(0.0, 100.0),
            resource_id,
            dependencies: clean_ids(&record.dependencies),
            subtasks: clean_ids(&record.subtasks),
            parent_task: record
                .parenttask
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty()),
            start_locked: record.isstartviewonly,
            end_locked: record.isendviewonly,
            resource_locked: record.isresourceviewonly,
            change_resource: record.changeresource,
            badges: record.badges,
            issue_type: record.issuetype,
            index,
        }
    }

    /// Row index for a resource id, appending a placeholder when unknown.
    fn resolve_resource(&mut self, resource_id: &str) -> usize {
        if let Some(r) = self.resources.iter().find(|r| r.id == resource_id) {
            return r.index;
        }
        let index = self.resources.len();
        log::warn!("unknown resource '{resource_id}', adding placeholder row {index}");
        self.resources.push(Resource::placeholder(resource_id, index));
        index
    }

    fn build_graphs(&mut self) {
        let known: HashSet<String> = self.positions.keys().cloned().collect();
        let mut dependents: HashMap<String, Vec<String>> = HashMap::new();
        let mut children: HashMap<String, Vec<String>> = HashMap::new();

        for task in &mut self.tasks {
            let own_id = task.id.clone();
            let keep = |id: &String| {
                let ok = known.contains(id) && *id != own_id;
                if !ok {
                    log::debug!("task '{own_id}': dropping reference to '{id}'");
                }
                ok
            };
            task.dependencies.retain(keep);
            task.subtasks.retain(keep);
            if task.parent_task.as_ref().is_some_and(|p| !keep(p)) {
                task.parent_task = None;
            }

            for pred in &task.dependencies {
                dependents.entry(pred.clone()).or_default().push(task.id.clone());
            }
            children.insert(task.id.clone(), task.subtasks.clone());
        }

        self.dependents = dependents;
        self.children = children;
        self.issues = self.find_subtask_cycles();
        for issue in &self.issues {
            log::warn!("configuration error: {issue:?}");
        }
    }

    fn find_subtask_cycles(&self) -> Vec<ScheduleIssue> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }

        fn visit<'a>(
            id: &'a str,
            children: &'a HashMap<String, Vec<String>>,
            marks: &mut HashMap<&'a str, Mark>,
            path: &mut Vec<&'a str>,
            found: &mut Vec<ScheduleIssue>,
        ) {
            marks.insert(id, Mark::Visiting);
            path.push(id);
            for child in children.get(id).into_iter().flatten() {
                match marks.get(child.as_str()) {
                    Some(Mark::Visiting) => {
                        let from = path.iter().position(|p| *p == child.as_str()).unwrap_or(0);
                        let mut cycle: Vec<String> =
                            path[from..].iter().map(|s| s.to_string()).collect();
                        cycle.push(child.clone());
                        found.push(ScheduleIssue::SubtaskCycle(cycle));
                    }
                    Some(Mark::Done) => {}
                    None => visit(child, children, marks, path, found),
                }
            }
            path.pop();
            marks.insert(id, Mark::Done);
        }

        let mut marks = HashMap::new();
        let mut found = Vec::new();
        for task in &self.tasks {
            if !marks.contains_key(task.id.as_str()) {
                visit(&task.id, &self.children, &mut marks, &mut Vec::new(), &mut found);
            }
        }
        found
    }

    // ── Lookups ─────────────────────────────────────────────────

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn issues(&self) -> &[ScheduleIssue] {
        &self.issues
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.positions.get(id).map(|&i| &self.tasks[i])
    }

    /// Position of a task in [`Schedule::tasks`].
    pub fn position(&self, id: &str) -> Option<usize> {
        self.positions.get(id).copied()
    }

    pub fn task_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.positions.get(id).map(|&i| &mut self.tasks[i])
    }

    pub fn resource(&self, id: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.id == id)
    }

    pub fn resource_at(&self, index: usize) -> Option<&Resource> {
        self.resources.iter().find(|r| r.index == index)
    }

    pub fn row_count(&self) -> usize {
        self.resources.len()
    }

    pub fn successors(&self, id: &str) -> &[String] {
        self.dependents.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn subtasks_of(&self, id: &str) -> &[String] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `id` followed by every task reachable through the dependency graph,
    /// breadth first, each once.
    pub fn transitive_dependents(&self, id: &str) -> Vec<String> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut order = Vec::new();
        let mut queue = VecDeque::from([id]);
        while let Some(current) = queue.pop_front() {
            if !seen.insert(current) {
                continue;
            }
            order.push(current.to_string());
            for next in self.successors(current) {
                queue.push_back(next);
            }
        }
        order
    }

    /// Earliest start and latest end over all tasks.
    pub fn span(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let start = self.tasks.iter().map(|t| t.start).min()?;
        let end = self.tasks.iter().map(|t| t.end).max()?;
        Some((start, end))
    }

    /// Move a task to another resource row, keeping the row index and the
    /// resource id in step.
    pub(crate) fn assign(&mut self, task_id: &str, resource_index: usize) -> Option<(Resource, Resource)> {
        let target = self.resource_at(resource_index)?.clone();
        let task = self.task_mut(task_id)?;
        let old_index = task.index;
        task.resource_id = target.id.clone();
        task.index = target.index;
        let old = self.resource_at(old_index)?.clone();
        Some((old, target))
    }
}
