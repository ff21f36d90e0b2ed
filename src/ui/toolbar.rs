use crate::model::ViewMode;
use crate::ui::theme;
use egui::{menu, RichText, Ui};
use egui_phosphor::regular as icons;

/// What the user picked in the toolbar this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolbarAction {
    None,
    Open,
    Save,
    SaveAs,
    ImportCsv,
    ViewMode(ViewMode),
    ScrollToNow,
    ToggleViewOnly,
    About,
}

/// Render the top menu bar.
pub fn show_toolbar(ui: &mut Ui, current: ViewMode, view_only: bool, title: &str) -> ToolbarAction {
    let mut action = ToolbarAction::None;
    menu::bar(ui, |ui| {
        ui.menu_button(RichText::new("  File  ").font(theme::font_menu()), |ui| {
            if ui.button(format!("{}  Open...", icons::FOLDER_OPEN)).clicked() {
                action = ToolbarAction::Open;
                ui.close_menu();
            }
            ui.separator();
            if ui.button(format!("{}  Save          Ctrl+S", icons::FLOPPY_DISK)).clicked() {
                action = ToolbarAction::Save;
                ui.close_menu();
            }
            if ui.button("     Save As...").clicked() {
                action = ToolbarAction::SaveAs;
                ui.close_menu();
            }
            ui.separator();
            if ui.button(format!("{}  Import CSV...", icons::FILE_CSV)).clicked() {
                action = ToolbarAction::ImportCsv;
                ui.close_menu();
            }
        });

        ui.menu_button(RichText::new("  View  ").font(theme::font_menu()), |ui| {
            ui.label(RichText::new("Granularity").small().weak());
            for mode in ViewMode::ALL {
                if ui.radio(mode == current, mode.label()).clicked() {
                    action = ToolbarAction::ViewMode(mode);
                    ui.close_menu();
                }
            }
            ui.separator();
            if ui.button(format!("{}  Go to now", icons::CROSSHAIR)).clicked() {
                action = ToolbarAction::ScrollToNow;
                ui.close_menu();
            }
            let mut read_only = view_only;
            if ui.checkbox(&mut read_only, "Read only").changed() {
                action = ToolbarAction::ToggleViewOnly;
                ui.close_menu();
            }
        });

        ui.menu_button(RichText::new("  Help  ").font(theme::font_menu()), |ui| {
            if ui.button("About").clicked() {
                action = ToolbarAction::About;
                ui.close_menu();
            }
        });

        ui.separator();
        ui.label(RichText::new(current.label()).size(11.0).color(theme::TEXT_SECONDARY));

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            ui.label(RichText::new(title).size(11.0).weak());
        });
    });
    action
}
