//! City labels with greedy collision-free placement.

use std::rc::Rc;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::assets::features::Feature;
use crate::core::projection::Projection;
use crate::renderer::canvas::{Canvas, TextStyle};
use crate::renderer::color::Rgba;
use crate::systems::view::{ViewListener, ViewSnapshot, ViewTransform};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    /// Labels placed per pass.
    pub max_in_view: usize,
    /// Clearance around markers and text, in pixels.
    pub pad: f64,
    pub text_height: f64,
    /// Baseline distance below the marker center.
    pub text_offset: f64,
    /// Marker radius is `marker_scale * weight ^ marker_exponent`.
    pub marker_scale: f64,
    pub marker_exponent: f64,
    /// Halo copies are drawn at offsets up to this many pixels each way.
    pub halo_radius: i32,
    /// Halo alpha relative to the label's.
    pub halo_alpha: f64,
    pub font: String,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            max_in_view: 10,
            pad: 3.0,
            text_height: 15.0,
            text_offset: 15.0,
            marker_scale: 0.075,
            marker_exponent: 0.3,
            halo_radius: 2,
            halo_alpha: 0.25,
            font: "12px Verdana".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Rect {
    x: f64,
    y: f64,
    w: f64,
    h: f64,
}

impl Rect {
    /// Overlap test. Touching edges count as a collision.
    fn collides(&self, other: &Rect) -> bool {
        !(self.x + self.w < other.x
            || self.x > other.x + other.w
            || self.y + self.h < other.y
            || self.y > other.y + other.h)
    }
}

#[derive(Debug, Clone)]
struct Label {
    feature: Feature,
    radius: f64,
    /// Accumulated visibility this frame.
    alpha: f64,
}

pub struct LabelLayer<C: Canvas> {
    config: LabelConfig,
    canvas: C,
    projection: Rc<dyn Projection>,
    /// Heaviest first.
    labels: Vec<Label>,
    style: TextStyle,
}

impl<C: Canvas> LabelLayer<C> {
    pub fn new(
        canvas: C,
        projection: Rc<dyn Projection>,
        mut features: Vec<Feature>,
        config: LabelConfig,
    ) -> Self {
        features.sort_by(|a, b| b.weight.total_cmp(&a.weight));
        let labels = features
            .into_iter()
            .map(|feature| Label {
                radius: config.marker_scale * feature.weight.max(0.0).powf(config.marker_exponent),
                feature,
                alpha: 0.0,
            })
            .collect();
        let style = TextStyle {
            font: config.font.clone(),
        };
        Self {
            config,
            canvas,
            projection,
            labels,
            style,
        }
    }

    /// Features in placement order.
    pub fn features(&self) -> impl Iterator<Item = &Feature> {
        self.labels.iter().map(|l| &l.feature)
    }

    /// Current visibility per feature, in placement order, capped at 1.
    pub fn alphas(&self) -> Vec<(&str, f64)> {
        self.labels
            .iter()
            .map(|l| (l.feature.name.as_str(), l.alpha.min(1.0)))
            .collect()
    }

    pub fn canvas(&self) -> &C {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut C {
        &mut self.canvas
    }

    /// Recompute visibility for `view` and redraw.
    ///
    /// During a zoom, placement runs for both ends of the transition and the
    /// two results are cross-faded by zoom progress.
    pub fn refresh(&mut self, view: &ViewSnapshot) {
        for label in &mut self.labels {
            label.alpha = 0.0;
        }
        if view.is_zooming() {
            self.place(&view.start, 1.0 - view.progress);
            self.place(&view.target, view.progress);
        } else {
            self.place(&view.transform, 1.0);
        }
        self.render(&view.transform);
    }

    fn screen_position(&self, feature: &Feature, transform: &ViewTransform) -> DVec2 {
        transform.apply(self.projection.project(feature.lon, feature.lat))
    }

    /// Greedy pass in weight order: accept each on-screen label whose marker
    /// and text boxes are free, adding `weight` to its alpha.
    fn place(&mut self, transform: &ViewTransform, weight: f64) {
        let pad = self.config.pad;
        let text_height = self.config.text_height;
        let mut taken: Vec<Rect> = Vec::new();
        let mut accepted = 0;
        for i in 0..self.labels.len() {
            if accepted >= self.config.max_in_view {
                break;
            }
            let label = &self.labels[i];
            let p = self.screen_position(&label.feature, transform);
            if !self.canvas.contains(p) {
                continue;
            }
            let r = label.radius;
            let dot = Rect {
                x: p.x - r - pad,
                y: p.y - r - pad,
                w: 2.0 * (r + pad),
                h: 2.0 * (r + pad),
            };
            let text_width = self.canvas.measure_text(&label.feature.name, &self.style);
            let baseline = p.y + self.config.text_offset;
            let text = Rect {
                x: p.x - text_width / 2.0 - pad,
                y: baseline - text_height - pad,
                w: text_width + 2.0 * pad,
                h: text_height + 2.0 * pad,
            };
            if taken.iter().any(|t| t.collides(&dot) || t.collides(&text)) {
                continue;
            }
            taken.push(text);
            taken.push(dot);
            self.labels[i].alpha += weight;
            accepted += 1;
        }
    }

    fn render(&mut self, transform: &ViewTransform) {
        self.canvas.clear();
        let halo = self.config.halo_radius;
        for i in 0..self.labels.len() {
            let label = &self.labels[i];
            let alpha = label.alpha.min(1.0);
            if alpha <= 0.0 {
                continue;
            }
            let p = self.screen_position(&label.feature, transform);
            if !self.canvas.contains(p) {
                continue;
            }
            let a = alpha as f32;
            let name = label.feature.name.clone();
            let radius = label.radius;
            let anchor = DVec2::new(p.x, p.y + self.config.text_offset);

            self.canvas
                .draw_marker(p, radius, Rgba::WHITE.with_alpha(a), Rgba::BLACK.with_alpha(a));
            let halo_color = Rgba::WHITE.with_alpha((self.config.halo_alpha * alpha) as f32);
            for dx in -halo..=halo {
                for dy in -halo..=halo {
                    let at = anchor + DVec2::new(dx as f64, dy as f64);
                    self.canvas.fill_text(&name, at, &self.style, halo_color);
                }
            }
            self.canvas
                .fill_text(&name, anchor, &self.style, Rgba::BLACK.with_alpha(a));
        }
    }
}

impl<C: Canvas> ViewListener for LabelLayer<C> {
    fn on_move(&mut self, view: &ViewSnapshot) {
        self.refresh(view);
    }

    fn on_end_move(&mut self, view: &ViewSnapshot) {
        self.refresh(view);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::projection::Identity;
    use crate::renderer::recording::RecordingCanvas;
    use crate::systems::view::ViewMode;

    fn layer(features: Vec<Feature>) -> LabelLayer<RecordingCanvas> {
        LabelLayer::new(
            RecordingCanvas::new(500.0, 300.0),
            Rc::new(Identity),
            features,
            LabelConfig::default(),
        )
    }

    fn alpha_of(layer: &LabelLayer<RecordingCanvas>, name: &str) -> f64 {
        layer
            .alphas()
            .into_iter()
            .find(|(n, _)| *n == name)
            .map(|(_, a)| a)
            .unwrap()
    }

    fn rest() -> ViewSnapshot {
        ViewSnapshot::at_rest(ViewTransform::IDENTITY)
    }

    #[test]
    fn sorts_heaviest_first() {
        let l = layer(vec![
            Feature::new("small", 10.0, 10.0, 5.0),
            Feature::new("big", 20.0, 20.0, 500.0),
            Feature::new("mid", 30.0, 30.0, 50.0),
        ]);
        let names: Vec<&str> = l.features().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["big", "mid", "small"]);
    }

    #[test]
    fn overlapping_labels_keep_the_heavier() {
        let mut l = layer(vec![
            Feature::new("light", 105.0, 100.0, 10.0),
            Feature::new("heavy", 100.0, 100.0, 1000.0),
        ]);
        l.refresh(&rest());
        assert_eq!(alpha_of(&l, "heavy"), 1.0);
        assert_eq!(alpha_of(&l, "light"), 0.0);
    }

    #[test]
    fn separate_labels_both_show() {
        let mut l = layer(vec![
            Feature::new("west", 100.0, 100.0, 1000.0),
            Feature::new("east", 300.0, 200.0, 10.0),
        ]);
        l.refresh(&rest());
        assert_eq!(alpha_of(&l, "west"), 1.0);
        assert_eq!(alpha_of(&l, "east"), 1.0);
    }

    #[test]
    fn placement_stops_at_cap() {
        let features = (0..15)
            .map(|i| Feature::new(format!("c{}", i), 20.0 + 30.0 * i as f64, 100.0, 100.0 + i as f64))
            .collect();
        let mut l = layer(features);
        l.refresh(&rest());
        let shown: Vec<&str> = l
            .alphas()
            .into_iter()
            .filter(|(_, a)| *a > 0.0)
            .map(|(n, _)| n)
            .collect();
        assert_eq!(shown.len(), 10);
        // The ten heaviest.
        assert!(shown.contains(&"c14"));
        assert!(shown.contains(&"c5"));
        assert!(!shown.contains(&"c4"));
    }

    #[test]
    fn off_canvas_features_are_skipped() {
        let mut l = layer(vec![
            Feature::new("away", -50.0, 100.0, 1000.0),
            Feature::new("home", 100.0, 100.0, 1.0),
        ]);
        l.refresh(&rest());
        assert_eq!(alpha_of(&l, "away"), 0.0);
        assert_eq!(alpha_of(&l, "home"), 1.0);
    }

    #[test]
    fn zoom_cross_fades_by_progress() {
        let mut l = layer(vec![Feature::new("erie", 100.0, 100.0, 1000.0)]);
        let view = ViewSnapshot {
            transform: ViewTransform::IDENTITY,
            start: ViewTransform::IDENTITY,
            target: ViewTransform::new(1.0, DVec2::new(1000.0, 0.0)),
            mode: ViewMode::Zooming,
            progress: 0.3,
            pointer: None,
        };
        l.refresh(&view);
        assert!((alpha_of(&l, "erie") - 0.7).abs() < 1e-12);
    }

    #[test]
    fn renders_marker_halo_and_text() {
        let mut l = layer(vec![Feature::new("erie", 100.0, 100.0, 1000.0)]);
        l.refresh(&rest());
        let texts: Vec<(&str, Rgba)> = l.canvas().texts().collect();
        assert_eq!(texts.len(), 26);
        assert!(texts[..25].iter().all(|(_, c)| *c == Rgba::WHITE.with_alpha(0.25)));
        assert_eq!(texts[25], ("erie", Rgba::BLACK));
    }
}
