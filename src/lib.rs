//! Resource-scheduling Gantt engine.
//!
//! [`model`] holds the pure data: calendar math, the time scale, tasks,
//! resources and their graphs. [`engine`] turns a schedule into draggable
//! bars, applies edits with their cascades and produces a display list.
//! [`ui`] paints that display list with egui.

pub mod engine;
pub mod errors;
pub mod io;
pub mod logging;
pub mod model;
pub mod ui;

pub use engine::{Gantt, PositionUpdate, Surface};
pub use errors::{EditRejection, GanttError, Result};
pub use model::{GanttOptions, Resource, TaskRecord, ViewMode};
