use eframe::egui::Key;
use glam::Vec2;

mod actions;
mod events;
mod navigator;

pub(in crate::app) use actions::{Action, KEY_HELP, action_for_key};
pub(in crate::app) use events::EventTranslator;
pub(in crate::app) use navigator::{Navigator, NavigatorConfig};

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) enum ZoomInput {
    /// Discrete steps; positive zooms in.
    Ticks(i32),
    /// Direct change of the zoom logarithm.
    Pinch(f32),
}

/// Abstract input callbacks. Positions are canvas-local points.
pub(in crate::app) trait InputHandler {
    fn on_click(&mut self, position: Vec2);
    fn on_slide(&mut self, delta: Vec2);
    fn on_zoom(&mut self, zoom: ZoomInput, anchor: Option<Vec2>);
    fn on_key_press(&mut self, key: Key);
    fn on_key_release(&mut self, key: Key);
    fn on_resize(&mut self, size: Vec2);
}
