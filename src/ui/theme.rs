use egui::{Color32, FontId, Rounding, Stroke, Visuals};

// ── Palette ──────────────────────────────────────────────────────────────────

pub const BG_DARK: Color32 = Color32::from_rgb(24, 24, 32);
pub const BG_PANEL: Color32 = Color32::from_rgb(30, 30, 40);
pub const BG_HEADER: Color32 = Color32::from_rgb(34, 37, 48);
pub const BG_ROW_EVEN: Color32 = Color32::from_rgba_premultiplied(255, 255, 255, 6);
pub const BG_RESOURCE_COLUMN: Color32 = Color32::from_rgb(28, 29, 38);
pub const BG_SELECTED: Color32 = Color32::from_rgba_premultiplied(80, 140, 220, 45);
pub const BG_WEEKEND: Color32 = Color32::from_rgba_premultiplied(0, 0, 0, 40);
pub const BG_TODAY: Color32 = Color32::from_rgba_premultiplied(60, 45, 10, 40);

pub const BORDER_SUBTLE: Color32 = Color32::from_rgb(50, 52, 64);
pub const BORDER_ACCENT: Color32 = Color32::from_rgb(90, 140, 220);

pub const TEXT_PRIMARY: Color32 = Color32::from_rgb(230, 232, 240);
pub const TEXT_SECONDARY: Color32 = Color32::from_rgb(155, 160, 178);
pub const TEXT_DIM: Color32 = Color32::from_rgb(100, 105, 120);
pub const TEXT_ON_BAR: Color32 = Color32::from_rgb(255, 255, 255);

pub const ACCENT: Color32 = Color32::from_rgb(80, 140, 220);
pub const NOW_LINE: Color32 = Color32::from_rgb(240, 75, 75);
pub const GRID_LINE: Color32 = Color32::from_rgb(44, 46, 58);
pub const GRID_LINE_THICK: Color32 = Color32::from_rgb(62, 65, 80);
pub const HANDLE_COLOR: Color32 = Color32::from_rgba_premultiplied(230, 230, 230, 160);
pub const ARROW_COLOR: Color32 = Color32::from_rgb(120, 125, 145);

pub const BAR_FILL: Color32 = Color32::from_rgb(66, 133, 244);
pub const BAR_LOCKED: Color32 = Color32::from_rgb(110, 115, 135);
pub const BAR_ACTUAL: Color32 = Color32::from_rgba_premultiplied(52, 168, 83, 120);
pub const PROGRESS_OVERLAY: Color32 = Color32::from_rgba_premultiplied(0, 0, 0, 55);
pub const BADGE_FILL: Color32 = Color32::from_rgb(171, 71, 188);
pub const ISSUE_FILL: Color32 = Color32::from_rgb(229, 57, 53);
pub const WORK_PERIOD_FALLBACK: Color32 = Color32::from_rgba_premultiplied(255, 193, 7, 30);

// ── Sizes ────────────────────────────────────────────────────────────────────

pub const STATUS_BAR_HEIGHT: f32 = 22.0;
pub const ARROW_HEAD: f32 = 5.0;

// ── Fonts ────────────────────────────────────────────────────────────────────

pub fn font_header() -> FontId {
    FontId::proportional(12.0)
}

pub fn font_sub() -> FontId {
    FontId::proportional(10.5)
}

pub fn font_bar() -> FontId {
    FontId::proportional(11.5)
}

pub fn font_small() -> FontId {
    FontId::proportional(9.5)
}

pub fn font_menu() -> FontId {
    FontId::proportional(13.0)
}

// ── Scene classes ────────────────────────────────────────────────────────────

/// Fill and stroke for a scene primitive, keyed on its class.
#[derive(Debug, Clone, Copy)]
pub struct ClassStyle {
    pub fill: Color32,
    pub stroke: Stroke,
}

impl ClassStyle {
    const fn fill(fill: Color32) -> Self {
        Self {
            fill,
            stroke: Stroke::NONE,
        }
    }

    const fn line(width: f32, color: Color32) -> Self {
        Self {
            fill: Color32::TRANSPARENT,
            stroke: Stroke {
                width,
                color,
            },
        }
    }
}

/// Classes can carry a modifier (`tick thick`, `work-period shift`); the
/// first word picks the style unless the full class has its own.
pub fn class_style(class: &str) -> ClassStyle {
    match class {
        "grid-background" => ClassStyle::fill(BG_DARK),
        "grid-row" => ClassStyle::fill(BG_ROW_EVEN),
        "grid-header" => ClassStyle::fill(BG_HEADER),
        "resource-column" => ClassStyle::fill(BG_RESOURCE_COLUMN),
        "row-line" => ClassStyle::line(0.5, BORDER_SUBTLE),
        "tick thick" => ClassStyle::line(1.0, GRID_LINE_THICK),
        "weekend-highlight" => ClassStyle::fill(BG_WEEKEND),
        "today-highlight" => ClassStyle::fill(BG_TODAY),
        "now-marker" => ClassStyle::line(1.5, NOW_LINE),
        "bar" => ClassStyle::fill(BAR_FILL),
        "bar-locked" => ClassStyle::fill(BAR_LOCKED),
        "bar-actual" => ClassStyle::fill(BAR_ACTUAL),
        "bar-progress" => ClassStyle::fill(PROGRESS_OVERLAY),
        "handle-left" | "handle-right" | "handle-progress" => ClassStyle::fill(HANDLE_COLOR),
        "badge" => ClassStyle::fill(BADGE_FILL),
        "arrow" => ClassStyle::line(1.2, ARROW_COLOR),
        _ => match class.split_whitespace().next().unwrap_or_default() {
            "tick" => ClassStyle::line(0.5, GRID_LINE),
            "issue" => ClassStyle::fill(ISSUE_FILL),
            "work-period" => ClassStyle::fill(WORK_PERIOD_FALLBACK),
            _ => ClassStyle::fill(Color32::TRANSPARENT),
        },
    }
}

/// Font and colour for a text primitive.
pub fn text_style(class: &str) -> (FontId, Color32) {
    match class {
        "upper-text" => (font_header(), TEXT_PRIMARY),
        "lower-text" => (font_sub(), TEXT_SECONDARY),
        "resource-label" => (font_bar(), TEXT_PRIMARY),
        "bar-label" => (font_bar(), TEXT_ON_BAR),
        "bar-label big" => (font_bar(), TEXT_SECONDARY),
        "badge-label" | "work-period-code" => (font_small(), TEXT_ON_BAR),
        _ => (font_small(), TEXT_DIM),
    }
}

/// Parse `#rgb`, `#rrggbb` or `#rrggbbaa`. Work-period bands are drawn at a
/// low alpha so bars stay readable over them.
pub fn parse_color(text: &str) -> Option<Color32> {
    let hex = text.trim().strip_prefix('#').filter(|h| h.is_ascii())?;
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    let (r, g, b, a) = match hex.len() {
        3 => {
            let c: Vec<u8> = hex
                .chars()
                .map(|c| c.to_digit(16).map(|d| (d * 17) as u8))
                .collect::<Option<_>>()?;
            (c[0], c[1], c[2], 60)
        }
        6 => (channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?, 60),
        8 => (
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
            channel(&hex[6..8])?,
        ),
        _ => return None,
    };
    Some(Color32::from_rgba_unmultiplied(r, g, b, a))
}

// ── Apply custom visuals ─────────────────────────────────────────────────────

pub fn apply_theme(ctx: &egui::Context) {
    let mut visuals = Visuals::dark();

    visuals.override_text_color = Some(TEXT_PRIMARY);
    visuals.panel_fill = BG_PANEL;
    visuals.window_fill = BG_PANEL;
    visuals.extreme_bg_color = Color32::from_rgb(20, 20, 28);

    visuals.widgets.noninteractive.bg_fill = BG_PANEL;
    visuals.widgets.noninteractive.bg_stroke = Stroke::new(1.0, BORDER_SUBTLE);
    visuals.widgets.noninteractive.fg_stroke = Stroke::new(1.0, TEXT_SECONDARY);
    visuals.widgets.noninteractive.rounding = Rounding::same(4.0);

    visuals.widgets.inactive.bg_fill = Color32::from_rgb(42, 44, 56);
    visuals.widgets.inactive.bg_stroke = Stroke::new(1.0, BORDER_SUBTLE);
    visuals.widgets.inactive.fg_stroke = Stroke::new(1.0, TEXT_PRIMARY);
    visuals.widgets.inactive.rounding = Rounding::same(4.0);

    visuals.widgets.hovered.bg_fill = Color32::from_rgb(52, 54, 68);
    visuals.widgets.hovered.bg_stroke = Stroke::new(1.0, ACCENT);
    visuals.widgets.hovered.fg_stroke = Stroke::new(1.0, TEXT_PRIMARY);
    visuals.widgets.hovered.rounding = Rounding::same(4.0);

    visuals.widgets.active.bg_fill = Color32::from_rgb(60, 62, 76);
    visuals.widgets.active.bg_stroke = Stroke::new(1.0, ACCENT);
    visuals.widgets.active.fg_stroke = Stroke::new(2.0, Color32::WHITE);
    visuals.widgets.active.rounding = Rounding::same(4.0);

    visuals.selection.bg_fill = BG_SELECTED;
    visuals.selection.stroke = Stroke::new(1.0, ACCENT);

    visuals.window_rounding = Rounding::same(8.0);
    visuals.window_stroke = Stroke::new(1.0, BORDER_SUBTLE);
    visuals.striped = false;

    ctx.set_visuals(visuals);

    let mut style = (*ctx.style()).clone();
    style.spacing.item_spacing = egui::vec2(8.0, 4.0);
    style.spacing.button_padding = egui::vec2(8.0, 4.0);
    ctx.set_style(style);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifier_classes_fall_back_to_base() {
        assert_eq!(class_style("tick").stroke, class_style("tick monday").stroke);
        assert_ne!(class_style("tick").stroke, class_style("tick thick").stroke);
        assert_eq!(class_style("issue late").fill, ISSUE_FILL);
        assert_eq!(class_style("nonsense").fill, Color32::TRANSPARENT);
    }

    #[test]
    fn test_parse_color() {
        assert_eq!(
            parse_color("#ff0000"),
            Some(Color32::from_rgba_unmultiplied(255, 0, 0, 60))
        );
        assert_eq!(
            parse_color("#0f08"),
            None
        );
        assert_eq!(
            parse_color("#fff"),
            Some(Color32::from_rgba_unmultiplied(255, 255, 255, 60))
        );
        assert_eq!(
            parse_color("#00ff0080"),
            Some(Color32::from_rgba_unmultiplied(0, 255, 0, 128))
        );
        assert_eq!(parse_color("red"), None);
    }
}
