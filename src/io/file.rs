use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::engine::Gantt;
use crate::errors::Result;
use crate::model::{GanttOptions, Resource, TaskRecord};

/// Everything needed to construct a chart: resources, tasks and, optionally,
/// the options they were saved with.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Dataset {
    pub resources: Vec<Resource>,
    pub tasks: Vec<TaskRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<GanttOptions>,
}

impl Dataset {
    /// Snapshot a live chart. Placeholder rows are left out; they are
    /// synthesized again on load.
    pub fn capture(gantt: &Gantt) -> Self {
        Self {
            resources: gantt
                .resources()
                .iter()
                .filter(|r| !r.placeholder)
                .cloned()
                .collect(),
            tasks: gantt.tasks().iter().map(|t| t.to_record()).collect(),
            options: Some(gantt.options().clone()),
        }
    }
}

/// Save a dataset as pretty JSON.
pub fn save_dataset(dataset: &Dataset, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(dataset)?;
    std::fs::write(path, json)?;
    log::info!("saved {} tasks to {}", dataset.tasks.len(), path.display());
    Ok(())
}

/// Load a dataset from JSON.
pub fn load_dataset(path: &Path) -> Result<Dataset> {
    let json = std::fs::read_to_string(path)?;
    let dataset: Dataset = serde_json::from_str(&json)?;
    log::info!(
        "loaded {} resources and {} tasks from {}",
        dataset.resources.len(),
        dataset.tasks.len(),
        path.display()
    );
    Ok(dataset)
}

/// Read an options file. A missing file yields the defaults.
pub fn load_options(path: &Path) -> Result<GanttOptions> {
    if !path.exists() {
        log::debug!("no options at {}, using defaults", path.display());
        return Ok(GanttOptions::default());
    }
    GanttOptions::from_json(&std::fs::read_to_string(path)?)
}

pub fn save_options(options: &GanttOptions, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(options)?)?;
    Ok(())
}
