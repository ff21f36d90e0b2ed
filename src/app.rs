use std::path::PathBuf;
use std::time::{Duration as StdDuration, Instant};

use chrono::{Duration, NaiveDateTime};
use resource_gantt::engine::{EventLog, GanttEvent, Surface};
use resource_gantt::io::file::{self, Dataset};
use resource_gantt::model::{calendar, Badge, GanttOptions, Resource, ResourceKind, TaskRecord, ViewMode};
use resource_gantt::ui;
use resource_gantt::ui::gantt_chart::{ChartState, EguiMeasure};
use resource_gantt::ui::toolbar::ToolbarAction;
use resource_gantt::{Gantt, Result};

/// How often the "now" marker advances.
const TICK: StdDuration = StdDuration::from_secs(60);

/// Main application state.
pub struct GanttApp {
    pub gantt: Gantt,
    pub events: EventLog,
    pub chart: ChartState,
    pub file_path: Option<PathBuf>,
    /// Where options are persisted, when the OS has a config directory.
    pub options_path: Option<PathBuf>,
    pub status_message: String,
    pub show_about: bool,
    ctx: egui::Context,
    surface: Surface,
    last_tick: Instant,
}

impl GanttApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Result<Self> {
        // Register Phosphor icon font as a fallback so icons render inline with text
        let mut fonts = egui::FontDefinitions::default();
        egui_phosphor::add_to_fonts(&mut fonts, egui_phosphor::Variant::Regular);
        cc.egui_ctx.set_fonts(fonts);
        ui::theme::apply_theme(&cc.egui_ctx);

        let options_path = Self::options_path();
        let options = match &options_path {
            Some(path) => file::load_options(path).unwrap_or_else(|e| {
                log::warn!("ignoring {}: {e}", path.display());
                GanttOptions::default()
            }),
            None => GanttOptions::default(),
        };

        let events = EventLog::new();
        let surface = Surface::new(1280.0, 720.0);
        let (resources, tasks) = Self::sample_plant(calendar::today());
        let mut gantt = Gantt::with_listener(surface, resources, tasks, options, events.clone())?;
        gantt.set_text_measure(EguiMeasure::new(cc.egui_ctx.clone()));
        events.take();

        Ok(Self {
            gantt,
            events,
            chart: ChartState::default(),
            file_path: None,
            options_path,
            status_message: "Ready".to_string(),
            show_about: false,
            ctx: cc.egui_ctx.clone(),
            surface,
            last_tick: Instant::now(),
        })
    }

    fn options_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "ResourceGantt")
            .map(|dirs| dirs.config_dir().join("options.json"))
    }

    /// A small plant to show on first start: one line, two workcenters and
    /// their machines, with a chain of operations around today.
    fn sample_plant(today: NaiveDateTime) -> (Vec<Resource>, Vec<TaskRecord>) {
        let resources = vec![
            Resource::new("L1", "Assembly line", ResourceKind::Line),
            Resource::new("W1", "Machining", ResourceKind::Workcenter).with_parent("L1"),
            Resource::new("M1", "Lathe", ResourceKind::Machine).with_parent("W1"),
            Resource::new("M2", "Mill", ResourceKind::Machine).with_parent("W1"),
            Resource::new("W2", "Finishing", ResourceKind::Workcenter).with_parent("L1"),
            Resource::new("M3", "Paint booth", ResourceKind::Machine).with_parent("W2"),
        ];

        let at = |hours: i64| calendar::format(today + Duration::hours(hours), "YYYY-MM-DD HH:mm:ss", "en");
        let op = |id: &str, name: &str, from: i64, to: i64, on: &str| {
            TaskRecord::new(id, name).span(&at(from), &at(to)).on(on)
        };
        let tasks = vec![
            TaskRecord {
                progress: 40.0,
                ..op("ORD", "Order 1042", 6, 40, "L1")
                    .with_subtask("TURN")
                    .with_subtask("MILL")
            },
            TaskRecord {
                progress: 100.0,
                changeresource: true,
                ..op("TURN", "Turn shafts", 6, 14, "M1").child_of("ORD")
            },
            TaskRecord {
                progress: 30.0,
                changeresource: true,
                badges: vec![Badge {
                    employee_id: "E7".into(),
                    label: "AK".into(),
                    description: "A. Kowalski".into(),
                }],
                ..op("MILL", "Mill housings", 14, 26, "M2").child_of("ORD").after("TURN")
            },
            TaskRecord {
                isstartviewonly: true,
                ..op("PAINT", "Paint", 28, 36, "M3").after("MILL")
            },
            TaskRecord {
                issuetype: Some("late".into()),
                ..op("QC", "Final check", 36, 40, "W2").after("PAINT")
            },
        ];
        (resources, tasks)
    }

    // --- File operations ---

    pub fn open_dataset(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Gantt dataset", &["json"])
            .pick_file()
        else {
            return;
        };
        let loaded = file::load_dataset(&path).and_then(|data| self.rebuild(data));
        match loaded {
            Ok(()) => {
                self.status_message = format!("Loaded {}", path.display());
                self.file_path = Some(path);
            }
            Err(e) => self.status_message = format!("Error loading: {e}"),
        }
    }

    pub fn save_dataset(&mut self) {
        match self.file_path.clone() {
            Some(path) => self.write_dataset(path),
            None => self.save_dataset_as(),
        }
    }

    pub fn save_dataset_as(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Gantt dataset", &["json"])
            .set_file_name("schedule.json")
            .save_file()
        {
            self.write_dataset(path);
        }
    }

    fn write_dataset(&mut self, path: PathBuf) {
        match file::save_dataset(&Dataset::capture(&self.gantt), &path) {
            Ok(()) => {
                self.status_message = format!("Saved {}", path.display());
                self.file_path = Some(path);
            }
            Err(e) => self.status_message = format!("Error saving: {e}"),
        }
    }

    pub fn import_csv(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("CSV Files", &["csv", "txt"])
            .pick_file()
        else {
            return;
        };
        match resource_gantt::io::csv_import::import_csv(&path) {
            Ok(import) => {
                let count = import.records.len();
                self.chart.reset();
                self.gantt.refresh(import.records);
                self.status_message = if import.skipped > 0 {
                    format!("Imported {count} tasks ({} rows skipped)", import.skipped)
                } else {
                    format!("Imported {count} tasks")
                };
            }
            Err(e) => self.status_message = format!("CSV import failed: {e}"),
        }
    }

    /// Replace the chart with a new one built from `data`.
    fn rebuild(&mut self, data: Dataset) -> Result<()> {
        let options = data.options.unwrap_or_else(|| self.gantt.options().clone());
        let mut gantt =
            Gantt::with_listener(self.surface, data.resources, data.tasks, options, self.events.clone())?;
        gantt.set_text_measure(EguiMeasure::new(self.ctx.clone()));
        self.gantt = gantt;
        self.chart.reset();
        Ok(())
    }

    fn set_view_mode(&mut self, mode: ViewMode) {
        self.gantt.change_view_mode(mode);
        self.persist_options();
    }

    fn toggle_view_only(&mut self) {
        let mode = self.gantt.view_mode();
        let mut data = Dataset::capture(&self.gantt);
        if let Some(options) = data.options.as_mut() {
            options.viewonly = !options.viewonly;
        }
        match self.rebuild(data) {
            Ok(()) => {
                self.gantt.change_view_mode(mode);
                self.persist_options();
                self.status_message = if self.gantt.options().viewonly {
                    "Read only".to_string()
                } else {
                    "Editing enabled".to_string()
                };
            }
            Err(e) => self.status_message = format!("Error: {e}"),
        }
    }

    fn persist_options(&self) {
        let Some(path) = &self.options_path else {
            return;
        };
        if let Err(e) = file::save_options(self.gantt.options(), path) {
            log::warn!("could not save options to {}: {e}", path.display());
        }
    }

    fn handle_toolbar(&mut self, action: ToolbarAction) {
        match action {
            ToolbarAction::None => {}
            ToolbarAction::Open => self.open_dataset(),
            ToolbarAction::Save => self.save_dataset(),
            ToolbarAction::SaveAs => self.save_dataset_as(),
            ToolbarAction::ImportCsv => self.import_csv(),
            ToolbarAction::ViewMode(mode) => self.set_view_mode(mode),
            ToolbarAction::ScrollToNow => self.gantt.scroll_to_time(calendar::now()),
            ToolbarAction::ToggleViewOnly => self.toggle_view_only(),
            ToolbarAction::About => self.show_about = true,
        }
    }

    /// Turn what the engine reported since the last frame into a status line.
    fn drain_events(&mut self) {
        for event in self.events.take() {
            if let Some(message) = describe(&event) {
                self.status_message = message;
            }
        }
    }

    fn show_about_dialog(&mut self, ctx: &egui::Context) {
        egui::Window::new("About")
            .open(&mut self.show_about)
            .resizable(false)
            .collapsible(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.heading("Resource Gantt");
                ui.label(format!("Version {}", env!("CARGO_PKG_VERSION")));
                ui.add_space(4.0);
                ui.label("Drag bars to reschedule, drag vertically to change resource,");
                ui.label("drag the edges to resize and the lower grip to set progress.");
                ui.label("Ctrl + wheel changes the granularity.");
            });
    }
}

fn describe(event: &GanttEvent) -> Option<String> {
    let fmt = |d: &NaiveDateTime| d.format("%Y-%m-%d %H:%M").to_string();
    match event {
        GanttEvent::DateChange { task, start, end } => {
            Some(format!("Updated '{}' ({} → {})", task.name, fmt(start), fmt(end)))
        }
        GanttEvent::ProgressChange { task, progress } => {
            Some(format!("'{}' is {progress:.0}% done", task.name))
        }
        GanttEvent::ResourceChange { task, old, new } => {
            Some(format!("Moved '{}' from {} to {}", task.name, old.name, new.name))
        }
        GanttEvent::Click(task) => Some(format!("Selected '{}'", task.name)),
        GanttEvent::ViewChange(mode) => Some(format!("{} view", mode.label())),
        GanttEvent::RenderComplete => None,
    }
}

impl eframe::App for GanttApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.last_tick.elapsed() >= TICK {
            self.gantt.tick(calendar::now());
            self.last_tick = Instant::now();
        }
        ctx.request_repaint_after(TICK);

        if ctx.input(|i| i.modifiers.ctrl && i.key_pressed(egui::Key::S)) {
            self.save_dataset();
        }

        // Top panel: toolbar
        let title = self
            .file_path
            .as_ref()
            .and_then(|p| p.file_name())
            .map_or_else(|| "(unsaved)".to_string(), |n| n.to_string_lossy().into_owned());
        let action = egui::TopBottomPanel::top("toolbar")
            .show(ctx, |ui| {
                ui::toolbar::show_toolbar(ui, self.gantt.view_mode(), self.gantt.options().viewonly, &title)
            })
            .inner;
        self.handle_toolbar(action);

        // Bottom panel: status bar
        egui::TopBottomPanel::bottom("status_bar")
            .exact_height(ui::theme::STATUS_BAR_HEIGHT)
            .frame(
                egui::Frame::default()
                    .fill(ui::theme::BG_HEADER)
                    .inner_margin(egui::Margin::symmetric(10.0, 0.0)),
            )
            .show(ctx, |ui| {
                ui.horizontal_centered(|ui| {
                    ui.label(
                        egui::RichText::new(&self.status_message)
                            .font(ui::theme::font_sub())
                            .color(ui::theme::TEXT_SECONDARY),
                    );
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        let issues = self.gantt.issues().len();
                        if issues > 0 {
                            ui.label(
                                egui::RichText::new(format!("Issues: {issues}"))
                                    .size(10.5)
                                    .color(ui::theme::ISSUE_FILL),
                            );
                            ui.label(egui::RichText::new(" · ").size(10.5).color(ui::theme::TEXT_DIM));
                        }
                        ui.label(
                            egui::RichText::new(format!(
                                "Tasks: {} · Resources: {}",
                                self.gantt.tasks().len(),
                                self.gantt.resources().len()
                            ))
                            .size(10.5)
                            .color(ui::theme::TEXT_DIM),
                        );
                    });
                });
            });

        // Central panel: Gantt chart
        let chart_frame = egui::Frame::default()
            .fill(ui::theme::BG_DARK)
            .inner_margin(egui::Margin::ZERO);
        egui::CentralPanel::default().frame(chart_frame).show(ctx, |ui| {
            let size = ui.available_size();
            let surface = Surface::new(size.x as f64, size.y as f64);
            if surface != self.surface && self.gantt.set_surface(surface).is_ok() {
                self.surface = surface;
            }
            ui::gantt_chart::show_gantt_chart(&mut self.gantt, &mut self.chart, ui);
        });

        self.drain_events();

        if self.show_about {
            self.show_about_dialog(ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_plant_builds_without_issues() {
        let (resources, tasks) = GanttApp::sample_plant(calendar::today());
        let gantt = Gantt::new(Surface::new(1280.0, 720.0), resources, tasks, GanttOptions::default()).unwrap();
        assert!(gantt.issues().is_empty());
        assert_eq!(gantt.resources().len(), 6);
        assert_eq!(gantt.arrows().len(), 3);
    }

    #[test]
    fn test_render_complete_is_not_a_status() {
        assert!(describe(&GanttEvent::RenderComplete).is_none());
        assert_eq!(
            describe(&GanttEvent::ViewChange(ViewMode::Week)).as_deref(),
            Some("Week view")
        );
    }

    #[test]
    fn test_now_marker_ticks_once_a_minute() {
        assert_eq!(TICK, StdDuration::from_secs(60));
    }
}
