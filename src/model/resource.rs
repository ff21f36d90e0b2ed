use serde::{Deserialize, Serialize};

/// Kind of schedulable lane. Lines sit at the top of the hierarchy,
/// workcenters and machines below them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Line,
    Workcenter,
    Machine,
    #[default]
    #[serde(other)]
    Other,
}

/// A row of the chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: ResourceKind,
    #[serde(rename = "parentid", default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Stable row position, assigned at setup and never reused.
    #[serde(skip)]
    pub index: usize,
    /// Synthesized for a task whose resource id matched nothing.
    #[serde(skip)]
    pub placeholder: bool,
}

impl Resource {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            parent_id: None,
            index: 0,
            placeholder: false,
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub(crate) fn placeholder(id: &str, index: usize) -> Self {
        let name = if id.is_empty() { "Unassigned" } else { id };
        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind: ResourceKind::Other,
            parent_id: None,
            index,
            placeholder: true,
        }
    }

    /// Parent/child or siblings under the same parent.
    pub fn is_related(&self, other: &Resource) -> bool {
        if self.id == other.id {
            return true;
        }
        let parent_of = |a: &Resource, b: &Resource| a.parent_id.as_deref() == Some(b.id.as_str());
        let siblings = match (&self.parent_id, &other.parent_id) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        };
        parent_of(self, other) || parent_of(other, self) || siblings
    }
}
