use std::fmt::Write as _;

use eframe::egui::Key;
use glam::Vec2;

use super::camera::Camera;
use super::color::background_color;
use super::gpu::{FrameData, PickResult};
use super::input::{Action, InputHandler, Navigator, NavigatorConfig, ZoomInput, action_for_key};
use super::overlay::{DisplayFlag, DisplayFlags, OverlayId, OverlaySink};
use super::world::{ConnectionMode, World};
use crate::snapshot::{Metric, Snapshot};
use crate::util::{display_address, format_metric};

const INITIAL_VIEWPORT: Vec2 = Vec2::new(1280.0, 720.0);

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct SceneConfig {
    /// Below this many peers clustering is off and every connection may be drawn.
    pub small_graph_threshold: usize,
    pub navigator: NavigatorConfig,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            small_graph_threshold: 150,
            navigator: NavigatorConfig::default(),
        }
    }
}

/// One loaded session: world, camera, navigation and overlay state.
pub(in crate::app) struct Scene<S: OverlaySink> {
    world: World,
    camera: Camera,
    navigator: Navigator,
    flags: DisplayFlags,
    overlay: S,
    pending_pick: Option<Vec2>,
    clear_color: [f32; 3],
}

impl<S: OverlaySink> Scene<S> {
    pub(in crate::app) fn new(snapshot: Snapshot, config: SceneConfig, overlay: S, dark_mode: bool) -> Self {
        let mut scene = Self {
            world: World::new(snapshot, config.small_graph_threshold),
            camera: Camera::new(INITIAL_VIEWPORT),
            navigator: Navigator::new(config.navigator),
            flags: DisplayFlags::default(),
            overlay,
            pending_pick: None,
            clear_color: background_color(dark_mode),
        };
        let (fps, legend) = (scene.flags.get(DisplayFlag::Fps), scene.flags.get(DisplayFlag::Legend));
        scene.overlay.set_visible(OverlayId::Fps, fps);
        scene.overlay.set_visible(OverlayId::GradientLegend, legend);
        scene.overlay.set_visible(OverlayId::ColorMode, true);
        scene.overlay.set_visible(OverlayId::Status, true);
        scene.refresh_overlays();
        scene
    }

    /// Integrates navigation and rewrites per-instance data for this frame.
    pub(in crate::app) fn advance(&mut self, dt: f32) {
        self.navigator.advance(&mut self.camera, dt);
        self.world.update(&self.camera, dt);
    }

    pub(in crate::app) fn apply_pick(&mut self, result: PickResult) {
        self.world.apply_pick(result);
        self.refresh_overlays();
    }

    pub(in crate::app) fn apply_action(&mut self, action: Action, pressed: bool) {
        match action {
            Action::Pan(direction) => self.navigator.set_pan(direction, pressed),
            Action::Zoom(direction) => self.navigator.set_zoom(direction, pressed),
            _ if !pressed => {}
            Action::CycleColorMode => {
                let mode = self.world.cycle_color_mode();
                log::debug!("color mode: {}", mode.label());
            }
            Action::CycleConnectionMode => {
                let mode = self.world.cycle_connection_mode();
                log::debug!("connection mode: {}", mode.label());
            }
            Action::Toggle(flag) => {
                if let Some(event) = self.flags.toggle(flag) {
                    event.apply(&mut self.overlay);
                }
            }
            Action::ClearSelection => self.world.clear(),
            Action::ResetCamera => {
                self.camera.reset();
                self.navigator.on_zoom_clamped();
            }
            Action::ZoomTick(ticks) => self.navigator.queue_ticks(ticks, None),
        }
        self.refresh_overlays();
    }

    pub(in crate::app) fn set_display_flag(&mut self, flag: DisplayFlag, enabled: bool) {
        if let Some(event) = self.flags.set(flag, enabled) {
            event.apply(&mut self.overlay);
        }
    }

    pub(in crate::app) fn set_map_available(&mut self, available: bool) {
        if let Some(event) = self.flags.set_map_available(available) {
            event.apply(&mut self.overlay);
        }
    }

    pub(in crate::app) fn set_color_mode(&mut self, mode: Metric) {
        self.world.set_color_mode(mode);
        self.refresh_overlays();
    }

    pub(in crate::app) fn set_connection_mode(&mut self, mode: ConnectionMode) {
        self.world.set_connection_mode(mode);
        self.refresh_overlays();
    }

    /// Selects a peer, unfolds its cluster and centers the camera on it.
    pub(in crate::app) fn reveal(&mut self, peer: usize) {
        if let Some(position) = self.world.reveal(peer) {
            self.camera.focus(position.x, position.y);
        }
        self.refresh_overlays();
    }

    pub(in crate::app) fn clear_selection(&mut self) {
        self.world.clear();
        self.refresh_overlays();
    }

    /// Per-frame draw input; a pending click is handed over exactly once.
    pub(in crate::app) fn frame_data(&mut self) -> FrameData {
        FrameData {
            clear_color: self.clear_color,
            view_projection: self.camera.view_projection(),
            classes: self.world.class_frames(),
            lines: self.world.lines().to_vec(),
            show_map: self.flags.get(DisplayFlag::Map),
            pick_request: self.pending_pick.take(),
            picker_inset: self.flags.get(DisplayFlag::PickerDebug),
        }
    }

    /// Only the clear color follows the system theme.
    pub(in crate::app) fn on_color_scheme_changed(&mut self, dark_mode: bool) {
        self.clear_color = background_color(dark_mode);
    }

    /// Drops held movement keys, e.g. when a text field takes the keyboard.
    pub(in crate::app) fn release_keys(&mut self) {
        self.navigator.release_all();
    }

    fn refresh_overlays(&mut self) {
        let world = &self.world;
        let mode = world.color_mode();

        self.overlay.set_text(OverlayId::ColorMode, &format!("color: {}", mode.label()));

        let range = world.range(mode);
        self.overlay.set_text(
            OverlayId::GradientLegend,
            &format!("{}: {} .. {}", mode.label(), format_metric(range.min), format_metric(range.max)),
        );

        let counts = world.counts();
        self.overlay.set_text(
            OverlayId::Status,
            &format!(
                "{} peers, {} clusters, {} edges | lines: {}",
                world.snapshot().peer_count(),
                counts.super_,
                world.snapshot().edge_count,
                world.connection_mode().label()
            ),
        );

        match world.selected_peer() {
            Some(peer) => {
                let mut details = String::new();
                let _ = writeln!(details, "{}", display_address(&peer.address));
                let _ = writeln!(details, "network: {}", peer.network.label());
                let _ = writeln!(details, "location: {}", peer.geo.place());
                let _ = writeln!(details, "betweenness: {}", format_metric(peer.betweenness));
                let _ = writeln!(details, "closeness: {}", format_metric(peer.closeness));
                let _ = writeln!(details, "degree: {}", peer.degree);
                match world.cluster_size(peer.index) {
                    Some(size) => {
                        let _ = write!(details, "cluster: {size} peers at {}", peer.geostr);
                    }
                    None => details.push_str("cluster: none"),
                }
                self.overlay.set_text(OverlayId::NodeDetails, &details);
                self.overlay.set_visible(OverlayId::NodeDetails, true);
            }
            None => {
                self.overlay.set_text(OverlayId::NodeDetails, "");
                self.overlay.set_visible(OverlayId::NodeDetails, false);
            }
        }
    }

    pub(in crate::app) fn world(&self) -> &World {
        &self.world
    }

    #[cfg(test)]
    pub(in crate::app) fn camera(&self) -> &Camera {
        &self.camera
    }

    pub(in crate::app) fn flags(&self) -> &DisplayFlags {
        &self.flags
    }

    pub(in crate::app) fn overlay(&self) -> &S {
        &self.overlay
    }

    pub(in crate::app) fn overlay_mut(&mut self) -> &mut S {
        &mut self.overlay
    }
}

impl<S: OverlaySink> InputHandler for Scene<S> {
    fn on_click(&mut self, position: Vec2) {
        self.pending_pick = Some(position / self.camera.viewport());
    }

    fn on_slide(&mut self, delta: Vec2) {
        self.camera.drag(delta.x, delta.y);
    }

    fn on_zoom(&mut self, zoom: ZoomInput, anchor: Option<Vec2>) {
        match zoom {
            ZoomInput::Ticks(ticks) => self.navigator.queue_ticks(ticks, anchor),
            ZoomInput::Pinch(delta) => {
                if self.camera.inc_zoom_logarithm(delta, anchor) {
                    self.navigator.on_zoom_clamped();
                }
            }
        }
    }

    fn on_key_press(&mut self, key: Key) {
        if let Some(action) = action_for_key(key) {
            self.apply_action(action, true);
        }
    }

    fn on_key_release(&mut self, key: Key) {
        if let Some(action) = action_for_key(key)
            && action.is_held()
        {
            self.apply_action(action, false);
        }
    }

    fn on_resize(&mut self, size: Vec2) {
        self.camera.set_viewport(size);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::app::camera::MAX_ZOOM_LOG;
    use crate::snapshot::snapshot_from_json;

    #[derive(Debug, Default)]
    struct RecordingSink {
        text: HashMap<OverlayId, String>,
        visible: HashMap<OverlayId, bool>,
        writes: usize,
    }

    impl OverlaySink for RecordingSink {
        fn set_text(&mut self, id: OverlayId, text: &str) {
            self.text.insert(id, text.to_owned());
            self.writes += 1;
        }

        fn set_visible(&mut self, id: OverlayId, visible: bool) {
            self.visible.insert(id, visible);
        }
    }

    impl RecordingSink {
        fn text(&self, id: OverlayId) -> &str {
            self.text.get(&id).map_or("", String::as_str)
        }

        fn visible(&self, id: OverlayId) -> bool {
            self.visible.get(&id).copied().unwrap_or(false)
        }
    }

    const SAMPLE: &str = r#"{"nodes": [
        {"address": "/ip4/203.0.113.7/tcp/4001", "betweenness": 0.3, "closeness": 0.4,
         "connections": [1], "geolocation": {"lat": 52.5, "long": 13.4, "city": "Berlin", "country": "DE"}},
        {"address": "/ip4/198.51.100.2/tcp/4001", "betweenness": 0.1, "closeness": 0.2,
         "connections": [], "geolocation": {"lat": 35.7, "long": 139.7, "city": "Tokyo", "country": "JP"}}
    ]}"#;

    fn scene() -> Scene<RecordingSink> {
        let snapshot = snapshot_from_json(SAMPLE, "test").expect("valid sample");
        let mut scene = Scene::new(snapshot, SceneConfig::default(), RecordingSink::default(), true);
        scene.on_resize(Vec2::new(800.0, 600.0));
        scene
    }

    #[test]
    fn initial_overlays_describe_the_session() {
        let scene = scene();
        assert_eq!(scene.overlay().text(OverlayId::ColorMode), "color: betweenness");
        assert!(scene.overlay().text(OverlayId::Status).starts_with("2 peers"));
        assert!(scene.overlay().visible(OverlayId::Fps));
        assert!(scene.overlay().visible(OverlayId::GradientLegend));
        assert!(!scene.overlay().visible(OverlayId::NodeDetails));
    }

    #[test]
    fn click_is_normalized_and_handed_over_once() {
        let mut scene = scene();
        scene.on_click(Vec2::new(200.0, 450.0));
        assert_eq!(scene.frame_data().pick_request, Some(Vec2::new(0.25, 0.75)));
        assert_eq!(scene.frame_data().pick_request, None);
    }

    #[test]
    fn hit_shows_details_and_miss_keeps_them() {
        let mut scene = scene();
        scene.apply_pick(PickResult::Hit(0));
        assert!(scene.overlay().visible(OverlayId::NodeDetails));
        let details = scene.overlay().text(OverlayId::NodeDetails).to_owned();
        assert!(details.starts_with("203.0.113.7:4001"));
        assert!(details.contains("Berlin, DE"));
        assert!(details.contains("degree: 1"));

        scene.apply_pick(PickResult::Miss);
        assert!(scene.overlay().visible(OverlayId::NodeDetails));
        assert_eq!(scene.overlay().text(OverlayId::NodeDetails), details);

        scene.on_key_press(Key::Escape);
        assert!(!scene.overlay().visible(OverlayId::NodeDetails));
    }

    #[test]
    fn keys_cycle_modes_and_toggle_overlays() {
        let mut scene = scene();
        scene.on_key_press(Key::C);
        assert_eq!(scene.overlay().text(OverlayId::ColorMode), "color: closeness");
        scene.on_key_press(Key::F);
        assert!(!scene.overlay().visible(OverlayId::Fps));
        scene.on_key_press(Key::G);
        assert!(!scene.overlay().visible(OverlayId::GradientLegend));
        scene.on_key_press(Key::L);
        assert!(scene.overlay().text(OverlayId::Status).ends_with("lines: selected"));
        scene.on_key_press(Key::L);
        assert!(scene.overlay().text(OverlayId::Status).ends_with("lines: all"));
    }

    #[test]
    fn map_toggle_needs_a_map() {
        let mut scene = scene();
        scene.on_key_press(Key::M);
        assert!(!scene.frame_data().show_map);
        scene.set_map_available(true);
        assert!(scene.frame_data().show_map);
        scene.on_key_press(Key::M);
        assert!(!scene.frame_data().show_map);
    }

    #[test]
    fn held_pan_key_moves_until_released() {
        let mut scene = scene();
        scene.on_key_press(Key::ArrowRight);
        scene.advance(0.1);
        let moved = scene.camera().position().x;
        assert!(moved > 0.0);

        scene.on_key_release(Key::ArrowRight);
        for _ in 0..20 {
            scene.advance(0.1);
        }
        let settled = scene.camera().position().x;
        scene.advance(0.1);
        assert_eq!(scene.camera().position().x, settled);
    }

    #[test]
    fn pinch_past_the_limit_drops_queued_ticks() {
        let mut scene = scene();
        scene.on_zoom(ZoomInput::Ticks(-5), None);
        scene.on_zoom(ZoomInput::Pinch(50.0), Some(Vec2::new(400.0, 300.0)));
        assert_eq!(scene.camera().zoom_log(), MAX_ZOOM_LOG);
        let before = scene.camera().zoom_log();
        scene.advance(0.016);
        assert_eq!(scene.camera().zoom_log(), before);
    }

    #[test]
    fn reveal_focuses_the_camera() {
        let mut scene = scene();
        scene.reveal(1);
        assert!(scene.overlay().text(OverlayId::NodeDetails).contains("Tokyo"));
        assert!(scene.camera().position().x > 100.0);
    }

    #[test]
    fn color_scheme_change_only_touches_clear_color() {
        let mut scene = scene();
        let writes = scene.overlay().writes;
        scene.on_color_scheme_changed(false);
        assert_eq!(scene.frame_data().clear_color, background_color(false));
        assert_eq!(scene.overlay().writes, writes);
    }
}
