#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod app;

fn main() -> eframe::Result<()> {
    resource_gantt::logging::init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_min_inner_size([800.0, 400.0])
            .with_title("Resource Gantt"),
        ..Default::default()
    };

    eframe::run_native(
        "Resource Gantt",
        options,
        Box::new(|cc| Ok(Box::new(app::GanttApp::new(cc)?))),
    )
}
