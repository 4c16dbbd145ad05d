use std::collections::BTreeMap;

use eframe::egui::{self, Event, Key, MouseWheelUnit, PointerButton, Pos2, Rect, TouchPhase};
use glam::Vec2;

use super::{InputHandler, ZoomInput};

/// A press that moves further than this becomes a slide instead of a click.
pub(in crate::app) const CLICK_SLOP_PX: f32 = 4.0;
/// Smooth-scrolling devices report points; this many make one zoom tick.
const WHEEL_POINTS_PER_TICK: f32 = 50.0;

#[derive(Clone, Copy, Debug)]
struct Press {
    origin: Pos2,
    last: Pos2,
    sliding: bool,
}

/// Turns raw egui events into [`InputHandler`] callbacks for one canvas.
#[derive(Debug)]
pub(in crate::app) struct EventTranslator {
    attached: bool,
    canvas: Rect,
    hover: Option<Pos2>,
    press: Option<Press>,
    touches: BTreeMap<u64, Pos2>,
    pinch_distance: Option<f32>,
    wheel_points: f32,
}

impl Default for EventTranslator {
    fn default() -> Self {
        Self {
            attached: true,
            canvas: Rect::NOTHING,
            hover: None,
            press: None,
            touches: BTreeMap::new(),
            pinch_distance: None,
            wheel_points: 0.0,
        }
    }
}

fn to_vec2(value: egui::Vec2) -> Vec2 {
    Vec2::new(value.x, value.y)
}

impl EventTranslator {
    /// Stops all dispatch; the translator stays inert afterwards.
    pub(in crate::app) fn detach(&mut self) {
        self.attached = false;
        self.press = None;
        self.touches.clear();
        self.pinch_distance = None;
        log::debug!("input translator detached");
    }

    pub(in crate::app) fn is_attached(&self) -> bool {
        self.attached
    }

    fn local(&self, pos: Pos2) -> Vec2 {
        to_vec2(pos - self.canvas.min)
    }

    /// Records the canvas rect and reports size changes.
    pub(in crate::app) fn set_canvas<H: InputHandler>(&mut self, canvas: Rect, handler: &mut H) {
        if !self.attached || canvas == self.canvas {
            return;
        }
        let resized = canvas.size() != self.canvas.size();
        self.canvas = canvas;
        if resized {
            handler.on_resize(to_vec2(canvas.size()));
        }
    }

    pub(in crate::app) fn dispatch<H: InputHandler>(
        &mut self,
        events: &[Event],
        keyboard_captured: bool,
        handler: &mut H,
    ) {
        if !self.attached {
            return;
        }
        for event in events {
            match event {
                Event::PointerButton {
                    pos,
                    button: PointerButton::Primary,
                    pressed,
                    ..
                } => self.button(*pos, *pressed, handler),
                Event::PointerMoved(pos) => self.moved(*pos, handler),
                Event::PointerGone => {
                    self.hover = None;
                    self.press = None;
                }
                Event::MouseWheel { unit, delta, .. } => self.wheel(*unit, delta.y, handler),
                Event::Zoom(factor) => self.zoom_factor(*factor, handler),
                Event::Touch { id, phase, pos, .. } => self.touch(id.0, *phase, *pos, handler),
                Event::Key {
                    key,
                    pressed,
                    repeat,
                    ..
                } => self.key(*key, *pressed, *repeat, keyboard_captured, handler),
                _ => {}
            }
        }
    }

    pub(in crate::app) fn button<H: InputHandler>(&mut self, pos: Pos2, pressed: bool, handler: &mut H) {
        if pressed {
            if self.canvas.contains(pos) && self.touches.len() < 2 {
                self.press = Some(Press {
                    origin: pos,
                    last: pos,
                    sliding: false,
                });
            }
            return;
        }

        if let Some(press) = self.press.take()
            && !press.sliding
            && press.origin.distance(pos) <= CLICK_SLOP_PX
        {
            handler.on_click(self.local(pos));
        }
    }

    pub(in crate::app) fn moved<H: InputHandler>(&mut self, pos: Pos2, handler: &mut H) {
        self.hover = self.canvas.contains(pos).then_some(pos);
        let Some(press) = self.press.as_mut() else {
            return;
        };
        if !press.sliding {
            if press.origin.distance(pos) <= CLICK_SLOP_PX {
                return;
            }
            press.sliding = true;
        }
        let delta = pos - press.last;
        press.last = pos;
        handler.on_slide(to_vec2(delta));
    }

    pub(in crate::app) fn wheel<H: InputHandler>(&mut self, unit: MouseWheelUnit, delta_y: f32, handler: &mut H) {
        let Some(hover) = self.hover else {
            return;
        };
        let ticks = match unit {
            MouseWheelUnit::Line | MouseWheelUnit::Page => {
                if delta_y == 0.0 {
                    0
                } else {
                    (delta_y.abs().round().max(1.0) as i32) * delta_y.signum() as i32
                }
            }
            MouseWheelUnit::Point => {
                self.wheel_points += delta_y;
                let ticks = (self.wheel_points / WHEEL_POINTS_PER_TICK).trunc();
                self.wheel_points -= ticks * WHEEL_POINTS_PER_TICK;
                ticks as i32
            }
        };
        if ticks != 0 {
            handler.on_zoom(ZoomInput::Ticks(ticks), Some(self.local(hover)));
        }
    }

    /// Trackpad pinch reported by the platform as a multiplicative factor.
    fn zoom_factor<H: InputHandler>(&mut self, factor: f32, handler: &mut H) {
        if let Some(hover) = self.hover
            && factor > 0.0
            && factor != 1.0
        {
            handler.on_zoom(ZoomInput::Pinch(-factor.ln()), Some(self.local(hover)));
        }
    }

    pub(in crate::app) fn touch<H: InputHandler>(&mut self, id: u64, phase: TouchPhase, pos: Pos2, handler: &mut H) {
        match phase {
            TouchPhase::Start => {
                if self.canvas.contains(pos) {
                    self.touches.insert(id, pos);
                }
            }
            TouchPhase::Move => {
                if let Some(tracked) = self.touches.get_mut(&id) {
                    *tracked = pos;
                }
            }
            TouchPhase::End | TouchPhase::Cancel => {
                self.touches.remove(&id);
            }
        }

        if self.touches.len() != 2 {
            self.pinch_distance = None;
            return;
        }
        // Two fingers own the gesture; the simulated pointer must not click or slide.
        self.press = None;

        let mut points = self.touches.values().copied();
        let (Some(a), Some(b)) = (points.next(), points.next()) else {
            return;
        };
        let distance = a.distance(b);
        let midpoint = a + (b - a) * 0.5;
        if let Some(previous) = self.pinch_distance
            && distance > f32::EPSILON
            && previous > f32::EPSILON
        {
            handler.on_zoom(ZoomInput::Pinch((previous / distance).ln()), Some(self.local(midpoint)));
        }
        self.pinch_distance = Some(distance);
    }

    pub(in crate::app) fn key<H: InputHandler>(
        &mut self,
        key: Key,
        pressed: bool,
        repeat: bool,
        keyboard_captured: bool,
        handler: &mut H,
    ) {
        if keyboard_captured {
            return;
        }
        if pressed {
            if !repeat {
                handler.on_key_press(key);
            }
        } else {
            handler.on_key_release(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::pos2;

    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Recorder {
        clicks: Vec<Vec2>,
        slides: Vec<Vec2>,
        zooms: Vec<(ZoomInput, Option<Vec2>)>,
        pressed: Vec<Key>,
        released: Vec<Key>,
        resizes: Vec<Vec2>,
    }

    impl InputHandler for Recorder {
        fn on_click(&mut self, position: Vec2) {
            self.clicks.push(position);
        }
        fn on_slide(&mut self, delta: Vec2) {
            self.slides.push(delta);
        }
        fn on_zoom(&mut self, zoom: ZoomInput, anchor: Option<Vec2>) {
            self.zooms.push((zoom, anchor));
        }
        fn on_key_press(&mut self, key: Key) {
            self.pressed.push(key);
        }
        fn on_key_release(&mut self, key: Key) {
            self.released.push(key);
        }
        fn on_resize(&mut self, size: Vec2) {
            self.resizes.push(size);
        }
    }

    fn translator(recorder: &mut Recorder) -> EventTranslator {
        let mut translator = EventTranslator::default();
        translator.set_canvas(Rect::from_min_max(pos2(100.0, 50.0), pos2(900.0, 650.0)), recorder);
        translator
    }

    #[test]
    fn resize_is_reported_once_per_size() {
        let mut recorder = Recorder::default();
        let mut translator = translator(&mut recorder);
        translator.set_canvas(Rect::from_min_max(pos2(100.0, 50.0), pos2(900.0, 650.0)), &mut recorder);
        assert_eq!(recorder.resizes, vec![Vec2::new(800.0, 600.0)]);
    }

    #[test]
    fn press_and_release_within_slop_is_a_click() {
        let mut recorder = Recorder::default();
        let mut translator = translator(&mut recorder);
        translator.button(pos2(300.0, 200.0), true, &mut recorder);
        translator.moved(pos2(302.0, 201.0), &mut recorder);
        translator.button(pos2(302.0, 201.0), false, &mut recorder);

        assert_eq!(recorder.clicks, vec![Vec2::new(202.0, 151.0)]);
        assert!(recorder.slides.is_empty());
    }

    #[test]
    fn moving_past_slop_slides_without_clicking() {
        let mut recorder = Recorder::default();
        let mut translator = translator(&mut recorder);
        translator.button(pos2(300.0, 200.0), true, &mut recorder);
        translator.moved(pos2(320.0, 200.0), &mut recorder);
        translator.moved(pos2(330.0, 190.0), &mut recorder);
        translator.button(pos2(300.0, 200.0), false, &mut recorder);

        assert!(recorder.clicks.is_empty());
        assert_eq!(recorder.slides, vec![Vec2::new(20.0, 0.0), Vec2::new(10.0, -10.0)]);
    }

    #[test]
    fn presses_outside_the_canvas_are_ignored() {
        let mut recorder = Recorder::default();
        let mut translator = translator(&mut recorder);
        translator.button(pos2(10.0, 10.0), true, &mut recorder);
        translator.moved(pos2(400.0, 300.0), &mut recorder);
        translator.button(pos2(10.0, 10.0), false, &mut recorder);
        assert_eq!(recorder, Recorder {
            resizes: vec![Vec2::new(800.0, 600.0)],
            ..Recorder::default()
        });
    }

    #[test]
    fn wheel_lines_and_points_become_ticks() {
        let mut recorder = Recorder::default();
        let mut translator = translator(&mut recorder);
        translator.wheel(MouseWheelUnit::Line, 1.0, &mut recorder);
        assert!(recorder.zooms.is_empty(), "wheel without hover must be ignored");

        translator.moved(pos2(500.0, 350.0), &mut recorder);
        translator.wheel(MouseWheelUnit::Line, -2.0, &mut recorder);
        translator.wheel(MouseWheelUnit::Point, 30.0, &mut recorder);
        translator.wheel(MouseWheelUnit::Point, 30.0, &mut recorder);

        let anchor = Some(Vec2::new(400.0, 300.0));
        assert_eq!(
            recorder.zooms,
            vec![(ZoomInput::Ticks(-2), anchor), (ZoomInput::Ticks(1), anchor)]
        );
    }

    #[test]
    fn two_finger_spread_zooms_in_at_midpoint() {
        let mut recorder = Recorder::default();
        let mut translator = translator(&mut recorder);
        translator.touch(1, TouchPhase::Start, pos2(400.0, 300.0), &mut recorder);
        translator.touch(2, TouchPhase::Start, pos2(500.0, 300.0), &mut recorder);
        translator.touch(2, TouchPhase::Move, pos2(600.0, 300.0), &mut recorder);

        let [(zoom, anchor)] = recorder.zooms.as_slice() else {
            panic!("expected one pinch, got {:?}", recorder.zooms);
        };
        let ZoomInput::Pinch(delta) = zoom else {
            panic!("expected pinch input");
        };
        assert!((delta - 0.5_f32.ln()).abs() < 1.0e-5);
        assert_eq!(*anchor, Some(Vec2::new(400.0, 250.0)));

        translator.touch(1, TouchPhase::End, pos2(400.0, 300.0), &mut recorder);
        translator.touch(2, TouchPhase::Move, pos2(650.0, 300.0), &mut recorder);
        assert_eq!(recorder.zooms.len(), 1);
    }

    #[test]
    fn captured_keyboard_and_repeats_are_ignored() {
        let mut recorder = Recorder::default();
        let mut translator = translator(&mut recorder);
        translator.key(Key::C, true, false, true, &mut recorder);
        translator.key(Key::C, true, false, false, &mut recorder);
        translator.key(Key::C, true, true, false, &mut recorder);
        translator.key(Key::C, false, false, false, &mut recorder);
        assert_eq!(recorder.pressed, vec![Key::C]);
        assert_eq!(recorder.released, vec![Key::C]);
    }

    #[test]
    fn detached_translator_dispatches_nothing() {
        let mut recorder = Recorder::default();
        let mut translator = translator(&mut recorder);
        translator.detach();
        translator.dispatch(
            &[Event::PointerMoved(pos2(500.0, 300.0)), Event::Zoom(2.0)],
            false,
            &mut recorder,
        );
        assert!(!translator.is_attached());
        assert!(recorder.zooms.is_empty());
    }

    #[test]
    fn platform_zoom_factor_is_anchored_at_the_cursor() {
        let mut recorder = Recorder::default();
        let mut translator = translator(&mut recorder);
        translator.dispatch(
            &[Event::PointerMoved(pos2(500.0, 300.0)), Event::Zoom(2.0)],
            false,
            &mut recorder,
        );
        let [(ZoomInput::Pinch(delta), anchor)] = recorder.zooms.as_slice() else {
            panic!("expected one zoom, got {:?}", recorder.zooms);
        };
        assert!((delta + 2.0_f32.ln()).abs() < 1.0e-6);
        assert_eq!(*anchor, Some(Vec2::new(400.0, 250.0)));
    }
}
