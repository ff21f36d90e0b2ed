//! egui host for the engine: paints the display list and feeds pointer
//! input back as drag sessions.

pub mod gantt_chart;
pub mod theme;
pub mod toolbar;
