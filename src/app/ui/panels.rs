use std::collections::VecDeque;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use eframe::egui::{self, Align, Context, Layout, mutex::Mutex};
use eframe::glow;

use super::super::gpu::SceneRenderer;
use super::super::input::EventTranslator;
use super::super::overlay::{OverlayId, OverlayState};
use super::super::scene::{Scene, SceneConfig};
use super::super::world::{WORLD_HEIGHT, WORLD_WIDTH};
use super::super::{LoadedData, ViewModel};

impl ViewModel {
    pub(in crate::app) fn new(
        data: LoadedData,
        config: SceneConfig,
        gl: Option<&glow::Context>,
        dark_mode: bool,
    ) -> Result<Self> {
        let gl = gl.context("no OpenGL context available; run with the glow renderer")?;
        let mut renderer = SceneRenderer::new(gl, WORLD_WIDTH, WORLD_HEIGHT)?;
        if let Some(map) = &data.map {
            renderer.set_map_texture(gl, map)?;
        }

        let mut scene = Scene::new(data.snapshot, config, OverlayState::default(), dark_mode);
        scene.set_map_available(renderer.has_map());

        Ok(Self {
            scene,
            renderer: Arc::new(Mutex::new(renderer)),
            translator: EventTranslator::default(),
            dark_mode,
            search: String::new(),
            search_cache: None,
            fps_current: 0.0,
            fps_samples: VecDeque::new(),
        })
    }

    pub(in crate::app) fn show(&mut self, ctx: &Context, reload_requested: &mut bool, is_loading: bool) {
        self.update_fps_counter(ctx);

        let dark_mode = ctx.style().visuals.dark_mode;
        if dark_mode != self.dark_mode {
            self.dark_mode = dark_mode;
            self.scene.on_color_scheme_changed(dark_mode);
        }

        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("peermap");
                    ui.separator();
                    ui.label(format!("source: {}", self.scene.world().snapshot().source));
                    ui.label(self.scene.overlay().text(OverlayId::Status));
                    let reload_button = ui.add_enabled(!is_loading, egui::Button::new("Reload snapshot"));
                    if reload_button.clicked() {
                        *reload_requested = true;
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        let overlay = self.scene.overlay();
                        if overlay.visible(OverlayId::Fps) {
                            ui.label(overlay.text(OverlayId::Fps));
                        }
                        if is_loading {
                            ui.spinner();
                        }
                    });
                });
            });

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(300.0)
            .show(ctx, |ui| self.draw_controls(ui));

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| self.draw_details(ui));

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| self.draw_scene(ui));
    }

    /// Releases GL objects and stops input; the model is inert afterwards.
    pub(in crate::app) fn teardown(&mut self, gl: Option<&glow::Context>) {
        if !self.translator.is_attached() {
            return;
        }
        self.translator.detach();
        match gl {
            Some(gl) => self.renderer.lock().destroy(gl),
            None => log::warn!("no GL context at teardown; GPU objects leak with the context"),
        }
    }
}
