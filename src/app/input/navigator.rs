use glam::Vec2;

use super::actions::{PanDirection, ZoomDirection};
use crate::app::camera::Camera;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct NavigatorConfig {
    /// Canvas points per second squared.
    pub pan_acceleration: f32,
    pub pan_deceleration: f32,
    pub pan_max_speed: f32,
    /// Zoom logarithm units per second squared.
    pub zoom_acceleration: f32,
    pub zoom_deceleration: f32,
    pub zoom_max_speed: f32,
    pub zoom_tick_step: f32,
    pub max_queued_zoom_ticks: i32,
    pub zoom_ticks_per_frame: i32,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            pan_acceleration: 2400.0,
            pan_deceleration: 3600.0,
            pan_max_speed: 1200.0,
            zoom_acceleration: 6.0,
            zoom_deceleration: 8.0,
            zoom_max_speed: 2.0,
            zoom_tick_step: 0.12,
            max_queued_zoom_ticks: 12,
            zoom_ticks_per_frame: 1,
        }
    }
}

/// Moves `velocity` towards the held direction, or back to rest without overshoot.
fn integrate(velocity: f32, direction: f32, acceleration: f32, deceleration: f32, max: f32, dt: f32) -> f32 {
    if direction != 0.0 {
        (velocity + direction * acceleration * dt).clamp(-max, max)
    } else if velocity > 0.0 {
        (velocity - deceleration * dt).max(0.0)
    } else {
        (velocity + deceleration * dt).min(0.0)
    }
}

/// Frame-rate independent keyboard and wheel navigation.
#[derive(Clone, Debug, Default)]
pub(in crate::app) struct Navigator {
    config: NavigatorConfig,
    held_pan: [bool; 4],
    held_zoom: [bool; 2],
    pan_velocity: Vec2,
    zoom_velocity: f32,
    queued_ticks: i32,
    tick_anchor: Option<Vec2>,
}

impl Navigator {
    pub(in crate::app) fn new(config: NavigatorConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub(in crate::app) fn set_pan(&mut self, direction: PanDirection, held: bool) {
        self.held_pan[direction as usize] = held;
    }

    pub(in crate::app) fn set_zoom(&mut self, direction: ZoomDirection, held: bool) {
        self.held_zoom[direction as usize] = held;
    }

    /// Positive ticks zoom in. The queue saturates in both directions.
    pub(in crate::app) fn queue_ticks(&mut self, ticks: i32, anchor: Option<Vec2>) {
        let max = self.config.max_queued_zoom_ticks;
        self.queued_ticks = (self.queued_ticks + ticks).clamp(-max, max);
        self.tick_anchor = anchor;
    }

    /// Drops zoom momentum after the camera hit a zoom limit.
    pub(in crate::app) fn on_zoom_clamped(&mut self) {
        self.zoom_velocity = 0.0;
        self.queued_ticks = 0;
        self.tick_anchor = None;
    }

    pub(in crate::app) fn release_all(&mut self) {
        self.held_pan = [false; 4];
        self.held_zoom = [false; 2];
    }

    pub(in crate::app) fn advance(&mut self, camera: &mut Camera, dt: f32) {
        let held = |flag: bool| if flag { 1.0 } else { 0.0 };
        let [left, right, up, down] = self.held_pan.map(held);
        let [zoom_in, zoom_out] = self.held_zoom.map(held);
        let config = self.config;

        self.pan_velocity.x = integrate(
            self.pan_velocity.x,
            right - left,
            config.pan_acceleration,
            config.pan_deceleration,
            config.pan_max_speed,
            dt,
        );
        self.pan_velocity.y = integrate(
            self.pan_velocity.y,
            up - down,
            config.pan_acceleration,
            config.pan_deceleration,
            config.pan_max_speed,
            dt,
        );
        if self.pan_velocity != Vec2::ZERO {
            camera.drag(-self.pan_velocity.x * dt, self.pan_velocity.y * dt);
        }

        self.zoom_velocity = integrate(
            self.zoom_velocity,
            zoom_out - zoom_in,
            config.zoom_acceleration,
            config.zoom_deceleration,
            config.zoom_max_speed,
            dt,
        );
        if self.zoom_velocity != 0.0 && camera.inc_zoom_logarithm(self.zoom_velocity * dt, None) {
            self.on_zoom_clamped();
        }

        if self.queued_ticks != 0 {
            let step = self.queued_ticks.signum() * self.queued_ticks.abs().min(config.zoom_ticks_per_frame);
            self.queued_ticks -= step;
            if camera.inc_zoom_logarithm(-(step as f32) * config.zoom_tick_step, self.tick_anchor) {
                self.on_zoom_clamped();
            }
        }
    }

    #[cfg(test)]
    pub(in crate::app) fn pan_velocity(&self) -> Vec2 {
        self.pan_velocity
    }

    #[cfg(test)]
    pub(in crate::app) fn zoom_velocity(&self) -> f32 {
        self.zoom_velocity
    }

    #[cfg(test)]
    pub(in crate::app) fn queued_ticks(&self) -> i32 {
        self.queued_ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::camera::{MAX_ZOOM_LOG, MIN_ZOOM_LOG};

    fn setup() -> (Navigator, Camera) {
        (
            Navigator::new(NavigatorConfig::default()),
            Camera::new(Vec2::new(1000.0, 700.0)),
        )
    }

    #[test]
    fn pan_accelerates_to_cap_then_decelerates_to_rest() {
        let (mut navigator, mut camera) = setup();
        navigator.set_pan(PanDirection::Right, true);
        navigator.advance(&mut camera, 0.1);
        assert!((navigator.pan_velocity().x - 240.0).abs() < 1.0e-3);
        for _ in 0..20 {
            navigator.advance(&mut camera, 0.1);
        }
        assert_eq!(navigator.pan_velocity().x, 1200.0);
        assert!(camera.position().x > 0.0);

        navigator.set_pan(PanDirection::Right, false);
        navigator.advance(&mut camera, 0.1);
        assert!((navigator.pan_velocity().x - 840.0).abs() < 1.0e-3);
        for _ in 0..10 {
            navigator.advance(&mut camera, 0.1);
        }
        assert_eq!(navigator.pan_velocity(), Vec2::ZERO);
    }

    #[test]
    fn pan_up_moves_camera_up() {
        let (mut navigator, mut camera) = setup();
        navigator.set_pan(PanDirection::Up, true);
        navigator.advance(&mut camera, 0.1);
        assert!(camera.position().y > 0.0);
    }

    #[test]
    fn ticks_are_capped_and_consumed_one_per_frame() {
        let (mut navigator, mut camera) = setup();
        navigator.queue_ticks(40, None);
        assert_eq!(navigator.queued_ticks(), 12);
        let before = camera.zoom_log();
        navigator.advance(&mut camera, 0.016);
        assert_eq!(navigator.queued_ticks(), 11);
        assert!((before - camera.zoom_log() - 0.12).abs() < 1.0e-5);
    }

    #[test]
    fn clamp_zeroes_velocity_and_drops_ticks() {
        let (mut navigator, mut camera) = setup();
        navigator.set_zoom(ZoomDirection::Out, true);
        let mut clamped_at = None;
        for frame in 0..400 {
            navigator.advance(&mut camera, 0.05);
            assert!((MIN_ZOOM_LOG..=MAX_ZOOM_LOG).contains(&camera.zoom_log()));
            if camera.zoom_log() == MAX_ZOOM_LOG {
                clamped_at = Some(frame);
                break;
            }
            assert!(navigator.zoom_velocity() > 0.0);
        }
        assert!(clamped_at.is_some());
        assert_eq!(navigator.zoom_velocity(), 0.0);

        navigator.set_zoom(ZoomDirection::Out, false);
        navigator.queue_ticks(-12, None);
        navigator.advance(&mut camera, 0.05);
        assert_eq!(navigator.queued_ticks(), 0);
        assert_eq!(camera.zoom_log(), MAX_ZOOM_LOG);
    }

    #[test]
    fn zoom_in_ticks_stop_at_the_lower_limit() {
        let (mut navigator, mut camera) = setup();
        for _ in 0..100 {
            navigator.queue_ticks(12, None);
            navigator.advance(&mut camera, 0.016);
        }
        assert_eq!(camera.zoom_log(), MIN_ZOOM_LOG);
        assert_eq!(navigator.queued_ticks(), 0);
    }
}
