pub mod calendar;
pub mod options;
pub mod resource;
pub mod schedule;
pub mod task;
pub mod timeline;
pub mod working_time;

pub use options::{ArrowType, GanttOptions, PopupTrigger};
pub use resource::{Resource, ResourceKind};
pub use schedule::{Schedule, ScheduleIssue};
pub use task::{Badge, Task, TaskRecord};
pub use timeline::{TimeScale, ViewMode};
pub use working_time::WorkingTime;
