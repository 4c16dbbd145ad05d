use eframe::egui::Color32;
use glam::{Vec3, Vec4};

pub(in crate::app) const SUPER_COLOR: Vec4 = Vec4::new(1.0, 0.42, 0.86, 1.0);
pub(in crate::app) const NEUTRAL_COLOR: Vec4 = Vec4::new(0.56, 0.57, 0.6, 1.0);

const RAMP: [Vec3; 5] = [
    Vec3::new(0.0, 0.0, 1.0),
    Vec3::new(0.0, 1.0, 1.0),
    Vec3::new(0.0, 1.0, 0.0),
    Vec3::new(1.0, 1.0, 0.0),
    Vec3::new(1.0, 0.0, 0.0),
];

const DARK_BACKGROUND: [f32; 3] = [0.075, 0.09, 0.114];
const LIGHT_BACKGROUND: [f32; 3] = [0.86, 0.88, 0.9];

/// Linear position of `value` inside `[min, max]`; a degenerate range maps to the middle.
pub(in crate::app) fn normalize(value: f64, min: f64, max: f64) -> f32 {
    let span = max - min;
    if !span.is_finite() || span.abs() < f64::EPSILON {
        return 0.5;
    }
    ((value - min) / span).clamp(0.0, 1.0) as f32
}

/// Blue -> cyan -> green -> yellow -> red, piecewise linear over four quartiles.
pub(in crate::app) fn ramp_color(t: f32) -> Vec4 {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let scaled = t * 4.0;
    let segment = (scaled.floor() as usize).min(3);
    let local = scaled - segment as f32;
    RAMP[segment].lerp(RAMP[segment + 1], local).extend(1.0)
}

pub(in crate::app) fn background_color(dark_mode: bool) -> [f32; 3] {
    if dark_mode {
        DARK_BACKGROUND
    } else {
        LIGHT_BACKGROUND
    }
}

pub(in crate::app) fn to_color32(color: Vec4) -> Color32 {
    let [r, g, b, a] = (color.clamp(Vec4::ZERO, Vec4::ONE) * 255.0).round().to_array();
    Color32::from_rgba_unmultiplied(r as u8, g as u8, b as u8, a as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vec4, b: Vec4) -> bool {
        (a - b).abs().max_element() < 1.0e-4
    }

    #[test]
    fn ramp_hits_the_named_stops() {
        assert!(close(ramp_color(0.0), Vec4::new(0.0, 0.0, 1.0, 1.0)));
        assert!(close(ramp_color(0.25), Vec4::new(0.0, 1.0, 1.0, 1.0)));
        assert!(close(ramp_color(0.5), Vec4::new(0.0, 1.0, 0.0, 1.0)));
        assert!(close(ramp_color(0.75), Vec4::new(1.0, 1.0, 0.0, 1.0)));
        assert!(close(ramp_color(1.0), Vec4::new(1.0, 0.0, 0.0, 1.0)));
    }

    #[test]
    fn ramp_is_continuous_across_quartiles() {
        for boundary in [0.25_f32, 0.5, 0.75] {
            let below = ramp_color(boundary - 1.0e-4);
            let above = ramp_color(boundary + 1.0e-4);
            assert!((below - above).abs().max_element() < 1.0e-2, "jump at {boundary}");
        }
    }

    #[test]
    fn ramp_clamps_out_of_range_input() {
        assert!(close(ramp_color(-3.0), ramp_color(0.0)));
        assert!(close(ramp_color(7.0), ramp_color(1.0)));
        assert!(close(ramp_color(f32::NAN), ramp_color(0.0)));
    }

    #[test]
    fn normalize_handles_degenerate_ranges() {
        assert_eq!(normalize(3.0, 3.0, 3.0), 0.5);
        assert_eq!(normalize(5.0, 0.0, 10.0), 0.5);
        assert_eq!(normalize(-1.0, 0.0, 10.0), 0.0);
        assert_eq!(normalize(11.0, 0.0, 10.0), 1.0);
    }
}
