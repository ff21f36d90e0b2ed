//! Engine options. Every field has a default so a partial JSON object (or
//! none at all) is a valid configuration.

use serde::{Deserialize, Serialize};

use super::timeline::ViewMode;
use super::working_time::WorkingTime;

/// Which relationship the arrows layer draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ArrowType {
    /// Predecessor to successor (`d`).
    #[default]
    #[serde(rename = "d")]
    Dependency,
    /// Parent to each subtask (`s`).
    #[serde(rename = "s")]
    Subtask,
    /// Child to its parent task (`p`).
    #[serde(rename = "p")]
    Parent,
    #[serde(rename = "n")]
    None,
}

/// When the host should open a task popup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PopupTrigger {
    #[default]
    Click,
    Hover,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GanttOptions {
    pub header_height: f64,
    pub column_width: f64,
    pub step: f64,
    pub bar_height: f64,
    pub bar_corner_radius: f64,
    pub arrow_curve: f64,
    pub padding: f64,
    pub view_mode: ViewMode,
    pub date_format: String,
    pub popup_trigger: PopupTrigger,
    pub language: String,
    /// Horizontal pixel offset of the time axis origin.
    pub xoffset: f64,
    /// Draw the actual start/end span under the planned bar.
    pub showactual: bool,
    /// Always widen the axis to include the current instant.
    pub todayasdefault: bool,
    pub viewonly: bool,
    pub resourcecolumnwidth: f64,
    /// Free resource change: any row may receive any task.
    pub resourcechange: bool,
    pub weekend: String,
    pub outofworkingtime: String,
    pub start: Option<String>,
    pub end: Option<String>,
    pub arrowtype: ArrowType,
    /// Widen parent tasks to cover edited children.
    pub updateparent: bool,
}

impl Default for GanttOptions {
    fn default() -> Self {
        Self {
            header_height: 50.0,
            column_width: 30.0,
            step: 24.0,
            bar_height: 20.0,
            bar_corner_radius: 3.0,
            arrow_curve: 5.0,
            padding: 18.0,
            view_mode: ViewMode::Day,
            date_format: "YYYY-MM-DD".to_string(),
            popup_trigger: PopupTrigger::Click,
            language: "en".to_string(),
            xoffset: 0.0,
            showactual: false,
            todayasdefault: false,
            viewonly: false,
            resourcecolumnwidth: 0.0,
            resourcechange: false,
            weekend: String::new(),
            outofworkingtime: String::new(),
            start: None,
            end: None,
            arrowtype: ArrowType::Dependency,
            updateparent: false,
        }
    }
}

impl GanttOptions {
    pub fn from_json(json: &str) -> crate::errors::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn working_time(&self) -> WorkingTime {
        WorkingTime::parse(&self.weekend, &self.outofworkingtime)
    }

    /// Vertical distance between two resource rows.
    pub fn row_height(&self) -> f64 {
        self.bar_height + self.padding
    }
}
