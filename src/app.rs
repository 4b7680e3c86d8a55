use std::path::Path;
use std::time::{Duration, Instant};

use eframe::egui;
use image::DynamicImage;

use crate::error::ExportError;
use crate::gesture;
use crate::model::{CoordinateRecord, Eye};
use crate::session::{ImageUpdate, LoadState, Session};

/// Grab distance for drag handles, in screen pixels.
const HANDLE_GRAB_RADIUS: f32 = 8.0;
const HANDLE_RADIUS: f32 = 4.0;
const POLL_INTERVAL: Duration = Duration::from_millis(50);

const ARROW_COLOR: egui::Color32 = egui::Color32::from_rgb(255, 210, 0);
const EYE_COLOR: egui::Color32 = egui::Color32::from_rgb(0, 200, 120);
const HANDLE_COLOR: egui::Color32 = egui::Color32::from_rgb(0, 120, 255);
const ACTIVE_HANDLE_COLOR: egui::Color32 = egui::Color32::from_rgb(255, 60, 60);

fn export_record(path: &Path, record: &CoordinateRecord) -> Result<(), ExportError> {
    let data = serde_json::to_string_pretty(record)?;
    std::fs::write(path, data)?;
    Ok(())
}

// ── App ─────────────────────────────────────────────────────────────────────

pub struct EyesApp {
    session: Session,
    texture: Option<egui::TextureHandle>,
    image_size: (f32, f32),

    // pan & zoom
    pan: egui::Vec2,
    zoom: f32,
    panning: bool,
}

impl EyesApp {
    pub fn new(mut session: Session) -> Self {
        session.on_ready();
        Self {
            session,
            texture: None,
            image_size: (800.0, 600.0),
            pan: egui::Vec2::ZERO,
            zoom: 1.0,
            panning: false,
        }
    }

    /// Convert image-space coords to screen-space
    fn image_to_screen(&self, canvas_rect: egui::Rect, img_pos: egui::Pos2) -> egui::Pos2 {
        let center = canvas_rect.center();
        center
            + self.pan
            + (img_pos.to_vec2() - egui::vec2(self.image_size.0, self.image_size.1) * 0.5)
                * self.zoom
    }

    /// Convert screen-space coords to image-space
    fn screen_to_image(&self, canvas_rect: egui::Rect, screen_pos: egui::Pos2) -> egui::Pos2 {
        let center = canvas_rect.center();
        let rel = screen_pos - center - self.pan;
        egui::pos2(
            rel.x / self.zoom + self.image_size.0 * 0.5,
            rel.y / self.zoom + self.image_size.1 * 0.5,
        )
    }

    fn image_rect_on_screen(&self, canvas_rect: egui::Rect) -> egui::Rect {
        let top_left = self.image_to_screen(canvas_rect, egui::Pos2::ZERO);
        let bot_right = self.image_to_screen(
            canvas_rect,
            egui::pos2(self.image_size.0, self.image_size.1),
        );
        egui::Rect::from_min_max(top_left, bot_right)
    }

    fn upload_texture(&mut self, ctx: &egui::Context, img: DynamicImage) {
        let rgba = img.to_rgba8();
        let size = [rgba.width() as usize, rgba.height() as usize];
        let pixels = rgba.as_flat_samples();
        let color_image = egui::ColorImage::from_rgba_unmultiplied(size, pixels.as_slice());
        self.image_size = (size[0] as f32, size[1] as f32);
        self.texture = Some(ctx.load_texture("page", color_image, egui::TextureOptions::LINEAR));
    }

    fn point(&self, canvas_rect: egui::Rect, p: (f32, f32)) -> egui::Pos2 {
        self.image_to_screen(canvas_rect, egui::pos2(p.0, p.1))
    }

    fn draw_overlay(&self, painter: &egui::Painter, canvas_rect: egui::Rect) {
        let (Some(record), Some(arrows)) = (self.session.record(), self.session.arrows()) else {
            return;
        };
        let active = self.session.active_gesture();

        for eye in Eye::BOTH {
            let l = record.eye(eye);
            let center = self.point(canvas_rect, l.center);
            let radius = l.radius() * self.zoom;
            painter.circle_stroke(center, radius, egui::Stroke::new(1.5, EYE_COLOR));
            painter.text(
                center - egui::vec2(0.0, radius + 4.0),
                egui::Align2::CENTER_BOTTOM,
                eye.label(),
                egui::FontId::proportional(14.0),
                EYE_COLOR,
            );
            for arrow in arrows.eye(eye).iter() {
                let points = arrow
                    .points()
                    .iter()
                    .map(|&p| self.point(canvas_rect, p))
                    .collect();
                painter.add(egui::Shape::line(points, egui::Stroke::new(1.5, ARROW_COLOR)));
            }
        }

        for (gesture, pos) in gesture::handles(record) {
            let color = if active == Some(gesture) {
                ACTIVE_HANDLE_COLOR
            } else {
                HANDLE_COLOR
            };
            painter.circle_filled(self.point(canvas_rect, pos), HANDLE_RADIUS, color);
        }
    }

    fn export(&mut self) {
        let Some(record) = self.session.record() else {
            return;
        };
        let Some(path) = rfd::FileDialog::new()
            .set_file_name(format!("coordinates{}.json", self.session.page()))
            .add_filter("JSON", &["json"])
            .save_file()
        else {
            return;
        };
        let result = export_record(&path, record);
        let now = Instant::now();
        match result {
            Ok(()) => {
                log::info!("Exported coordinates to {}", path.display());
                self.session.notify("Exported", false, now);
            }
            Err(e) => {
                log::error!("Export to {} failed: {e}", path.display());
                self.session.notify(format!("Export failed: {e}"), true, now);
            }
        }
    }

    fn toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label("Page:");
            let markers = self.session.pagination().markers().to_vec();
            for page in markers {
                let lit = self.session.pagination().is_highlighted(page);
                if ui.selectable_label(lit, page.to_string()).clicked() {
                    self.session.change_page(page);
                }
            }
            ui.separator();
            let editable = self.session.is_editable();
            if ui.add_enabled(editable, egui::Button::new("Save")).clicked() {
                self.session.save(Instant::now());
            }
            if ui
                .add_enabled(editable, egui::Button::new("Export JSON…"))
                .clicked()
            {
                self.export();
            }
            ui.separator();
            if let Some(scope) = self.session.scope() {
                ui.label(format!("Scope: {scope}"));
                ui.separator();
            }
            ui.label(format!("Zoom: {:.0}%", self.zoom * 100.0));
        });
    }

    fn status_bar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| match self.session.load_state().clone() {
            LoadState::Idle => {}
            LoadState::Loading { page } => {
                ui.spinner();
                ui.label(format!("Loading page {page}…"));
            }
            LoadState::Ready { page } => {
                ui.label(format!("Page {page}"));
            }
            LoadState::Failed { page, message } => {
                ui.colored_label(
                    egui::Color32::from_rgb(230, 80, 80),
                    format!("Page {page} failed to load: {message}"),
                );
                if ui.button("Retry").clicked() {
                    self.session.retry();
                }
            }
        });
    }

    fn handle_pointer(&mut self, ctx: &egui::Context, response: &egui::Response) {
        let canvas_rect = response.rect;

        if response.drag_started_by(egui::PointerButton::Primary) {
            // the drag only registers past egui's threshold, so grab at the press point
            let pressed_at = ctx
                .input(|i| i.pointer.press_origin())
                .or(response.hover_pos());
            if let (Some(pos), Some(record)) = (pressed_at, self.session.record()) {
                let img_pos = self.screen_to_image(canvas_rect, pos);
                let grab = HANDLE_GRAB_RADIUS / self.zoom;
                if let Some(g) = gesture::hit_test(record, (img_pos.x, img_pos.y), grab) {
                    self.session.begin_gesture(g);
                }
            }
        }

        if response.dragged_by(egui::PointerButton::Primary) && self.session.active_gesture().is_some() {
            if let Some(pos) = response.interact_pointer_pos() {
                let img_pos = self.screen_to_image(canvas_rect, pos);
                self.session.pointer_moved((img_pos.x, img_pos.y));
            }
        }

        if response.drag_stopped() || ctx.input(|i| i.pointer.any_released()) {
            self.session.end_gesture();
        }
    }
}

// ── eframe App impl ────────────────────────────────────────────────────────

impl eframe::App for EyesApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.session.poll();
        match self.session.take_image_update() {
            Some(ImageUpdate::Show(img)) => self.upload_texture(ctx, img),
            Some(ImageUpdate::Clear) => self.texture = None,
            None => {}
        }
        if self.session.is_busy() {
            ctx.request_repaint_after(POLL_INTERVAL);
        }

        if ctx.input(|i| i.modifiers.ctrl && i.key_pressed(egui::Key::S)) {
            self.session.save(Instant::now());
        }

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| self.toolbar(ui));
        egui::TopBottomPanel::bottom("status").show(ctx, |ui| self.status_bar(ui));

        // Canvas
        egui::CentralPanel::default().show(ctx, |ui| {
            let (response, painter) =
                ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
            let canvas_rect = response.rect;

            painter.rect_filled(canvas_rect, 0.0, egui::Color32::from_gray(40));

            if let Some(ref tex) = self.texture {
                let img_rect = self.image_rect_on_screen(canvas_rect);
                painter.image(
                    tex.id(),
                    img_rect,
                    egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                    egui::Color32::WHITE,
                );
            }

            self.draw_overlay(&painter, canvas_rect);

            // Handle pan (middle mouse button)
            let middle_down = ctx.input(|i| i.pointer.middle_down());
            if middle_down {
                let delta = ctx.input(|i| i.pointer.delta());
                self.pan += delta;
                self.panning = true;
            } else {
                self.panning = false;
            }

            // Handle zoom (scroll wheel)
            let scroll_delta = ctx.input(|i| i.smooth_scroll_delta.y);
            if scroll_delta != 0.0 && response.hovered() {
                let zoom_factor = 1.0 + scroll_delta * 0.002;
                let new_zoom = (self.zoom * zoom_factor).clamp(0.1, 10.0);
                if let Some(cursor) = response.hover_pos() {
                    let center = canvas_rect.center();
                    let cursor_rel = cursor - center - self.pan;
                    self.pan -= cursor_rel * (new_zoom / self.zoom - 1.0);
                }
                self.zoom = new_zoom;
            }

            if !self.panning {
                self.handle_pointer(ctx, &response);
            }
        });

        // Transient notification
        let now = Instant::now();
        if let Some(note) = self.session.notification(now) {
            let color = if note.is_error {
                egui::Color32::from_rgb(230, 80, 80)
            } else {
                egui::Color32::WHITE
            };
            let text = note.text.clone();
            egui::Area::new(egui::Id::new("notification"))
                .anchor(egui::Align2::CENTER_BOTTOM, egui::vec2(0.0, -40.0))
                .order(egui::Order::Foreground)
                .show(ctx, |ui| {
                    egui::Frame::popup(ui.style()).show(ui, |ui| {
                        ui.colored_label(color, text);
                    });
                });
            ctx.request_repaint_after(POLL_INTERVAL);
        }
    }
}
