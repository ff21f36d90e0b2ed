use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};

use super::calendar;

/// An employee assigned to a task, drawn as a small badge on the bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Badge {
    #[serde(rename = "employeeId")]
    pub employee_id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: String,
}

/// A task as supplied by the caller, before normalization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskRecord {
    pub id: Option<String>,
    pub name: String,
    pub start: Option<String>,
    pub end: Option<String>,
    pub actualstart: Option<String>,
    pub actualend: Option<String>,
    pub progress: f64,
    pub resourceid: Option<String>,
    #[serde(deserialize_with = "id_list")]
    pub dependencies: Vec<String>,
    #[serde(deserialize_with = "id_list")]
    pub subtasks: Vec<String>,
    pub parenttask: Option<String>,
    pub isstartviewonly: bool,
    pub isendviewonly: bool,
    pub isresourceviewonly: bool,
    pub changeresource: bool,
    pub badges: Vec<Badge>,
    pub issuetype: Option<String>,
}

impl TaskRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn span(mut self, start: &str, end: &str) -> Self {
        self.start = Some(start.to_string());
        self.end = Some(end.to_string());
        self
    }

    pub fn on(mut self, resource_id: &str) -> Self {
        self.resourceid = Some(resource_id.to_string());
        self
    }

    pub fn after(mut self, predecessor: &str) -> Self {
        self.dependencies.push(predecessor.to_string());
        self
    }

    pub fn with_subtask(mut self, child: &str) -> Self {
        self.subtasks.push(child.to_string());
        self
    }

    pub fn child_of(mut self, parent: &str) -> Self {
        self.parenttask = Some(parent.to_string());
        self
    }
}

/// Accepts `"a, b"` or `["a", "b"]`.
fn id_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Joined(String),
        List(Vec<String>),
        Missing(()),
    }

    Ok(match Repr::deserialize(deserializer)? {
        Repr::Joined(s) => s.split(',').map(str::to_string).collect(),
        Repr::List(v) => v,
        Repr::Missing(()) => Vec::new(),
    })
}

/// Trim, drop empties and duplicates, keep first-seen order.
pub(crate) fn clean_ids(ids: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(ids.len());
    for id in ids.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        if !out.iter().any(|o| o == id) {
            out.push(id.to_string());
        }
    }
    out
}

/// A normalized task bound to a resource row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Task {
    pub id: String,
    pub name: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub actual_start: Option<NaiveDateTime>,
    pub actual_end: Option<NaiveDateTime>,
    /// Working minutes between start and end.
    pub duration: i64,
    /// 0 to 100.
    pub progress: f64,
    pub resource_id: String,
    pub dependencies: Vec<String>,
    pub subtasks: Vec<String>,
    pub parent_task: Option<String>,
    pub start_locked: bool,
    pub end_locked: bool,
    pub resource_locked: bool,
    pub change_resource: bool,
    pub badges: Vec<Badge>,
    pub issue_type: Option<String>,
    /// Row of the resolved resource.
    pub index: usize,
}

impl Task {
    pub fn is_locked(&self) -> bool {
        self.start_locked && self.end_locked
    }

    pub fn can_change_resource(&self) -> bool {
        self.change_resource && !self.resource_locked
    }

    /// Back to the caller's input shape, dates formatted as
    /// `YYYY-MM-DD HH:mm:ss`.
    pub fn to_record(&self) -> TaskRecord {
        let fmt = |d: NaiveDateTime| calendar::format(d, "YYYY-MM-DD HH:mm:ss", "en");
        TaskRecord {
            id: Some(self.id.clone()),
            name: self.name.clone(),
            start: Some(fmt(self.start)),
            end: Some(fmt(self.end)),
            actualstart: self.actual_start.map(fmt),
            actualend: self.actual_end.map(fmt),
            progress: self.progress,
            resourceid: Some(self.resource_id.clone()),
            dependencies: self.dependencies.clone(),
            subtasks: self.subtasks.clone(),
            parenttask: self.parent_task.clone(),
            isstartviewonly: self.start_locked,
            isendviewonly: self.end_locked,
            isresourceviewonly: self.resource_locked,
            changeresource: self.change_resource,
            badges: self.badges.clone(),
            issuetype: self.issue_type.clone(),
        }
    }
}
