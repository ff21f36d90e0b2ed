use crate::engine::{Anchor, DragMode, DragSession, Gantt, HitTarget, Point, Popup, Primitive, Scene, TextMeasure};
use crate::model::{PopupTrigger, ViewMode};
use crate::ui::theme;
use egui::{Align2, Color32, CursorIcon, FontId, Id, Painter, Pos2, Rect, Sense, Shape, Stroke, Ui, Vec2};

/// Measures bar labels with the fonts egui will draw them with.
pub struct EguiMeasure {
    ctx: egui::Context,
    font: FontId,
}

impl EguiMeasure {
    pub fn new(ctx: egui::Context) -> Self {
        Self {
            ctx,
            font: theme::font_bar(),
        }
    }
}

impl TextMeasure for EguiMeasure {
    fn text_width(&self, text: &str) -> f64 {
        self.ctx.fonts(|fonts| {
            fonts
                .layout_no_wrap(text.to_string(), self.font.clone(), Color32::WHITE)
                .size()
                .x as f64
        })
    }
}

/// Per-chart state that lives across frames.
#[derive(Debug, Default)]
pub struct ChartState {
    session: Option<DragSession>,
    /// Task whose click popup is open.
    popup: Option<String>,
}

impl ChartState {
    pub fn close_popup(&mut self) {
        self.popup = None;
    }

    /// Drop an in-flight drag, e.g. when the chart is replaced.
    pub fn reset(&mut self) {
        self.session = None;
        self.popup = None;
    }
}

/// What happened in the chart this frame.
#[derive(Debug, Clone, Default)]
pub struct ChartInteraction {
    /// A drag finished and reported at least one change.
    pub changed: bool,
    pub clicked: Option<String>,
}

/// Render the chart and route pointer input into the engine.
pub fn show_gantt_chart(gantt: &mut Gantt, state: &mut ChartState, ui: &mut Ui) -> ChartInteraction {
    let mut interaction = ChartInteraction::default();

    // Ctrl + wheel steps through view modes.
    if ui.rect_contains_pointer(ui.max_rect()) && ui.input(|i| i.modifiers.ctrl) {
        let wheel = ui.input(|i| i.smooth_scroll_delta.y);
        if wheel.abs() > 0.0 {
            if let Some(mode) = neighbour_mode(gantt.view_mode(), wheel > 0.0) {
                gantt.change_view_mode(mode);
            }
        }
    }

    let available = ui.available_size();
    let mut area = egui::ScrollArea::both().auto_shrink([false, false]);
    if let Some(x) = gantt.take_scroll() {
        area = area.horizontal_scroll_offset(x as f32);
    }

    let output = area.show(ui, |ui| {
        let size = {
            let scene = gantt.scene();
            Vec2::new(scene.width as f32, scene.height as f32)
        };
        let (response, painter) = ui.allocate_painter(size.max(available), Sense::click_and_drag());
        let origin = response.rect.min;
        let to_chart = |p: Pos2| Point::new((p.x - origin.x) as f64, (p.y - origin.y) as f64);

        // Pointer handling runs before painting so this frame shows the result.
        if response.drag_started() {
            let press = ui.input(|i| i.pointer.press_origin()).or(response.interact_pointer_pos());
            if let Some(at) = press.map(to_chart) {
                if let Some(hit) = gantt.hit_test(at) {
                    state.session = gantt.pointer_down(&hit, at);
                    state.popup = None;
                }
            }
        }
        if response.dragged() {
            if let (Some(session), Some(pos)) = (state.session.as_mut(), response.interact_pointer_pos()) {
                gantt.pointer_move(session, to_chart(pos));
                ui.ctx().set_cursor_icon(match session.mode {
                    DragMode::Move => CursorIcon::Grabbing,
                    _ => CursorIcon::ResizeHorizontal,
                });
            }
        }
        if response.drag_stopped() {
            if let Some(session) = state.session.take() {
                interaction.changed = gantt.pointer_up(session);
            }
        }
        if response.clicked() {
            let hit = response
                .interact_pointer_pos()
                .and_then(|p| gantt.hit_test(to_chart(p)));
            state.popup = None;
            if let Some(hit) = hit {
                if gantt.click(&hit.task_id) {
                    if gantt.options().popup_trigger == PopupTrigger::Click {
                        state.popup = Some(hit.task_id.clone());
                    }
                    interaction.clicked = Some(hit.task_id);
                }
            }
        }

        let hovered = if state.session.is_none() {
            response.hover_pos().and_then(|p| gantt.hit_test(to_chart(p)))
        } else {
            None
        };
        if let Some(hit) = &hovered {
            ui.ctx().set_cursor_icon(match hit.target {
                HitTarget::Body => CursorIcon::Grab,
                HitTarget::LeftHandle | HitTarget::RightHandle => CursorIcon::ResizeHorizontal,
                HitTarget::ProgressHandle => CursorIcon::PointingHand,
            });
        }

        paint_scene(&painter, origin, gantt.scene());
        if let Some(session) = &state.session {
            paint_drop_target(&painter, origin, gantt, session);
        }

        if let Some(hit) = hovered.filter(|_| gantt.options().popup_trigger == PopupTrigger::Hover) {
            if let Ok(popup) = gantt.popup(&hit.task_id) {
                response.on_hover_ui_at_pointer(|ui| popup_contents(ui, &popup));
            }
        } else if let Some(id) = &state.popup {
            match gantt.popup(id) {
                Ok(popup) => {
                    let anchor = origin
                        + Vec2::new(popup.anchor.x as f32, (popup.anchor.bottom() + 4.0) as f32);
                    egui::Area::new(Id::new("task_popup"))
                        .order(egui::Order::Foreground)
                        .fixed_pos(anchor)
                        .show(ui.ctx(), |ui| {
                            egui::Frame::popup(ui.style()).show(ui, |ui| popup_contents(ui, &popup));
                        });
                }
                Err(e) => {
                    log::debug!("closing popup: {e}");
                    state.popup = None;
                }
            }
        }
    });

    gantt.set_scroll(output.state.offset.x as f64);
    if ui.input(|i| i.key_pressed(egui::Key::Escape)) {
        state.popup = None;
    }
    interaction
}

fn neighbour_mode(mode: ViewMode, finer: bool) -> Option<ViewMode> {
    let i = ViewMode::ALL.iter().position(|m| *m == mode)?;
    if finer {
        i.checked_sub(1).map(|j| ViewMode::ALL[j])
    } else {
        ViewMode::ALL.get(i + 1).copied()
    }
}

fn pos(origin: Pos2, p: Point) -> Pos2 {
    origin + Vec2::new(p.x as f32, p.y as f32)
}

fn rect(origin: Pos2, g: &crate::engine::Geometry) -> Rect {
    Rect::from_min_size(pos(origin, Point::new(g.x, g.y)), Vec2::new(g.width as f32, g.height as f32))
}

/// Paint every primitive in layer order. Styling comes from the theme,
/// keyed on each primitive's class.
pub fn paint_scene(painter: &Painter, origin: Pos2, scene: &Scene) {
    let clip = painter.clip_rect();
    for item in scene.primitives() {
        match item {
            Primitive::Rect {
                class, rect: g, radius, fill, ..
            } => {
                let r = rect(origin, g);
                if !clip.intersects(r) {
                    continue;
                }
                let color = fill
                    .as_deref()
                    .and_then(theme::parse_color)
                    .unwrap_or(theme::class_style(class).fill);
                painter.rect_filled(r, *radius as f32, color);
            }
            Primitive::Line { class, from, to } => {
                painter.line_segment([pos(origin, *from), pos(origin, *to)], theme::class_style(class).stroke);
            }
            Primitive::Arrow { points, .. } => {
                let pts: Vec<Pos2> = points.iter().map(|p| pos(origin, *p)).collect();
                paint_arrow(painter, pts, theme::class_style("arrow").stroke);
            }
            Primitive::Text {
                class, at, text, anchor, ..
            } => {
                let (font, color) = theme::text_style(class);
                let align = match anchor {
                    Anchor::Start => Align2::LEFT_CENTER,
                    Anchor::Middle => Align2::CENTER_CENTER,
                    Anchor::End => Align2::RIGHT_CENTER,
                };
                painter.text(pos(origin, *at), align, text, font, color);
            }
        }
    }
}

fn paint_arrow(painter: &Painter, pts: Vec<Pos2>, stroke: Stroke) {
    let [.., prev, tip] = pts.as_slice() else {
        return;
    };
    let dir = (*tip - *prev).normalized();
    let side = dir.rot90() * theme::ARROW_HEAD * 0.6;
    let base = *tip - dir * theme::ARROW_HEAD;
    let head = vec![*tip, base + side, base - side];
    painter.add(Shape::line(pts, stroke));
    painter.add(Shape::convex_polygon(head, stroke.color, Stroke::NONE));
}

/// Outline the row a vertical drag would drop the task on.
fn paint_drop_target(painter: &Painter, origin: Pos2, gantt: &Gantt, session: &DragSession) {
    if session.mode != DragMode::Move || session.resource_delta == 0 {
        return;
    }
    let opts = gantt.options();
    let width = gantt.scale().grid_width() + gantt.scale().offset;
    let (row, color) = match session.prospective_row {
        Some(row) => (row as i64, theme::BORDER_ACCENT),
        None => {
            let current = gantt.get_task(&session.primary).map_or(0, |t| t.index as i64);
            (current + session.resource_delta, theme::ISSUE_FILL)
        }
    };
    if row < 0 || row as usize >= gantt.resources().len() {
        return;
    }
    let y = opts.header_height + opts.padding / 2.0 + row as f64 * opts.row_height();
    let r = Rect::from_min_size(
        pos(origin, Point::new(0.0, y)),
        Vec2::new(width as f32, opts.row_height() as f32),
    );
    painter.rect_filled(r, 0.0, theme::BG_SELECTED);
    painter.rect_stroke(r, 0.0, Stroke::new(1.0, color));
}

fn popup_contents(ui: &mut Ui, popup: &Popup) {
    ui.set_max_width(260.0);
    if let Some(custom) = &popup.custom {
        ui.label(custom);
        return;
    }
    ui.label(egui::RichText::new(&popup.title).font(theme::font_header()).strong());
    ui.label(egui::RichText::new(&popup.subtitle).font(theme::font_sub()).color(theme::TEXT_SECONDARY));
    ui.separator();
    for line in &popup.details {
        ui.label(egui::RichText::new(line).font(theme::font_sub()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neighbour_mode_stops_at_ends() {
        assert_eq!(neighbour_mode(ViewMode::Day, true), Some(ViewMode::HalfDay));
        assert_eq!(neighbour_mode(ViewMode::Day, false), Some(ViewMode::Week));
        assert_eq!(neighbour_mode(ViewMode::TenMinutes, true), None);
        assert_eq!(neighbour_mode(ViewMode::Year, false), None);
    }
}
