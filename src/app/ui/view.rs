use std::sync::Arc;

use eframe::egui::{self, Align2, Color32, FontId, Pos2, Rect, Sense, Ui, vec2};
use eframe::egui_glow;
use glam::Vec4;

use super::super::ViewModel;
use super::super::gpu::Viewport;
use crate::util::display_address;

/// Longest frame step fed to the navigator, so a stall does not fling the camera.
const MAX_FRAME_DT: f32 = 0.1;
const SELECTION_LABEL_OFFSET: f32 = 14.0;

/// Maps a clip-space position to a point inside `rect`; `None` behind the camera.
fn clip_to_canvas(clip: Vec4, rect: Rect) -> Option<Pos2> {
    if clip.w <= f32::EPSILON {
        return None;
    }
    let ndc = clip.truncate() / clip.w;
    if ndc.x.abs() > 1.0 || ndc.y.abs() > 1.0 || ndc.z > 1.0 {
        return None;
    }
    Some(Pos2::new(
        rect.min.x + (ndc.x + 1.0) * 0.5 * rect.width(),
        rect.min.y + (1.0 - ndc.y) * 0.5 * rect.height(),
    ))
}

impl ViewModel {
    pub(in crate::app) fn draw_scene(&mut self, ui: &mut Ui) {
        let (rect, _response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let ctx = ui.ctx().clone();

        let keyboard_captured = ctx.wants_keyboard_input();
        if keyboard_captured {
            self.scene.release_keys();
        }
        self.translator.set_canvas(rect, &mut self.scene);
        let events = ctx.input(|input| input.events.clone());
        self.translator.dispatch(&events, keyboard_captured, &mut self.scene);

        let pick = self.renderer.lock().take_pick_result();
        if let Some(result) = pick {
            self.scene.apply_pick(result);
        }

        let dt = ctx.input(|input| input.stable_dt).min(MAX_FRAME_DT);
        self.scene.advance(dt);

        let frame = self.scene.frame_data();
        let renderer = Arc::clone(&self.renderer);
        let callback = egui::PaintCallback {
            rect,
            callback: Arc::new(egui_glow::CallbackFn::new(move |info, painter| {
                let pixels = info.viewport_in_pixels();
                let viewport = Viewport {
                    x: pixels.left_px,
                    y: pixels.from_bottom_px,
                    width: pixels.width_px,
                    height: pixels.height_px,
                };
                renderer
                    .lock()
                    .paint(painter.gl(), &frame, viewport, painter.intermediate_fbo());
            })),
        };
        ui.painter().add(callback);

        let painter = ui.painter_at(rect);
        let text_color = ui.visuals().strong_text_color();
        if let Some(peer) = self.scene.world().selected_peer()
            && let Some(anchor) = self
                .scene
                .world()
                .selected_clip_center()
                .and_then(|clip| clip_to_canvas(clip, rect))
        {
            painter.text(
                anchor + vec2(SELECTION_LABEL_OFFSET, -SELECTION_LABEL_OFFSET),
                Align2::LEFT_BOTTOM,
                display_address(&peer.address),
                FontId::proportional(14.0),
                text_color,
            );
        }
        self.draw_legend(&painter, rect, text_color);

        if self.scene.world().counts().hidden > 0 {
            painter.text(
                rect.right_bottom() + vec2(-10.0, -10.0),
                Align2::RIGHT_BOTTOM,
                format!("{} peers hidden", self.scene.world().counts().hidden),
                FontId::proportional(12.0),
                Color32::from_rgb(230, 170, 60),
            );
        }

        ctx.request_repaint();
    }
}
