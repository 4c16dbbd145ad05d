use eframe::egui::{Align2, Color32, CornerRadius, FontId, Painter, Pos2, Rect, vec2};

use super::super::ViewModel;
use super::super::color::{normalize, ramp_color, to_color32};
use super::super::overlay::OverlayId;
use crate::snapshot::Histogram;

const LEGEND_WIDTH: f32 = 240.0;
const GRADIENT_HEIGHT: f32 = 12.0;
const HISTOGRAM_HEIGHT: f32 = 42.0;
const GRADIENT_STEPS: usize = 48;
const MARGIN: f32 = 12.0;
const PADDING: f32 = 8.0;
const TEXT_HEIGHT: f32 = 18.0;

/// Bar heights in `[0, 1]` relative to the fullest bucket.
fn bucket_heights(histogram: &Histogram) -> Vec<f32> {
    let max = histogram.buckets.iter().copied().max().unwrap_or(0);
    if max == 0 {
        return vec![0.0; histogram.buckets.len()];
    }
    histogram
        .buckets
        .iter()
        .map(|&count| count as f32 / max as f32)
        .collect()
}

impl ViewModel {
    pub(in crate::app) fn draw_legend(&self, painter: &Painter, canvas: Rect, text_color: Color32) {
        let overlay = self.scene.overlay();
        if !overlay.visible(OverlayId::GradientLegend) {
            return;
        }

        let world = self.scene.world();
        let mode = world.color_mode();
        let histogram = world
            .snapshot()
            .histogram(mode)
            .filter(|histogram| !histogram.buckets.is_empty());
        let histogram_height = if histogram.is_some() { HISTOGRAM_HEIGHT } else { 0.0 };

        let inner_height = TEXT_HEIGHT + histogram_height + GRADIENT_HEIGHT;
        let frame = Rect::from_min_size(
            Pos2::new(
                canvas.min.x + MARGIN,
                canvas.max.y - MARGIN - inner_height - 2.0 * PADDING,
            ),
            vec2(LEGEND_WIDTH + 2.0 * PADDING, inner_height + 2.0 * PADDING),
        );
        painter.rect_filled(frame, CornerRadius::same(6), Color32::from_black_alpha(150));

        let left = frame.min.x + PADDING;
        let top = frame.min.y + PADDING;
        painter.text(
            Pos2::new(left, top),
            Align2::LEFT_TOP,
            overlay.text(OverlayId::GradientLegend),
            FontId::proportional(13.0),
            text_color,
        );

        let gradient_top = top + TEXT_HEIGHT + histogram_height;
        if let Some(histogram) = histogram {
            // Bars follow the histogram's own range, colored where they land on the world range.
            let range = world.range(mode);
            let heights = bucket_heights(histogram);
            let bar_width = LEGEND_WIDTH / heights.len() as f32;
            let bucket_span = (histogram.max - histogram.min) / heights.len() as f64;
            for (index, height) in heights.into_iter().enumerate() {
                if height <= 0.0 {
                    continue;
                }
                let center = histogram.min + bucket_span * (index as f64 + 0.5);
                let color = to_color32(ramp_color(normalize(center, range.min, range.max)));
                let bar = Rect::from_min_max(
                    Pos2::new(left + bar_width * index as f32, gradient_top - height * HISTOGRAM_HEIGHT),
                    Pos2::new(left + bar_width * (index + 1) as f32 - 1.0, gradient_top - 2.0),
                );
                painter.rect_filled(bar, CornerRadius::ZERO, color);
            }
        }

        let step_width = LEGEND_WIDTH / GRADIENT_STEPS as f32;
        for step in 0..GRADIENT_STEPS {
            let t = step as f32 / (GRADIENT_STEPS - 1) as f32;
            let cell = Rect::from_min_size(
                Pos2::new(left + step_width * step as f32, gradient_top),
                vec2(step_width + 0.5, GRADIENT_HEIGHT),
            );
            painter.rect_filled(cell, CornerRadius::ZERO, to_color32(ramp_color(t)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn histogram(buckets: Vec<u64>) -> Histogram {
        Histogram {
            metric: "degree".to_owned(),
            min: 0.0,
            max: 10.0,
            buckets,
        }
    }

    #[test]
    fn heights_are_relative_to_the_largest_bucket() {
        assert_eq!(bucket_heights(&histogram(vec![2, 8, 4, 0])), vec![0.25, 1.0, 0.5, 0.0]);
    }

    #[test]
    fn empty_buckets_stay_flat() {
        assert_eq!(bucket_heights(&histogram(vec![0, 0])), vec![0.0, 0.0]);
    }
}
