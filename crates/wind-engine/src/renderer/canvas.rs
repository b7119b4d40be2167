//! The drawing surface the displays paint on.
//!
//! The engine never talks to a real graphics API. Each display owns some
//! `Canvas` implementation: `wind-web` wraps a browser 2D context, tests use
//! [`RecordingCanvas`](super::recording::RecordingCanvas).

use glam::DVec2;

use super::color::Rgba;

/// Font and alignment for label text. Text is centered horizontally on the
/// anchor with the anchor's y on the baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    /// CSS font shorthand, e.g. `12px Verdana`.
    pub font: String,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font: "12px Verdana".to_string(),
        }
    }
}

/// Minimal 2D drawing capability over a pixel surface of known size.
pub trait Canvas {
    /// Surface width in pixels.
    fn width(&self) -> f64;

    /// Surface height in pixels.
    fn height(&self) -> f64;

    /// Erase the whole surface to transparent.
    fn clear(&mut self);

    /// Fill a rectangle, blending with what is already there.
    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: Rgba);

    /// Stroke a straight segment.
    fn stroke_line(&mut self, from: DVec2, to: DVec2, width: f64, color: Rgba);

    /// Filled and outlined circle.
    fn draw_marker(&mut self, center: DVec2, radius: f64, fill: Rgba, stroke: Rgba);

    /// Draw text at `anchor` (see [`TextStyle`]).
    fn fill_text(&mut self, text: &str, anchor: DVec2, style: &TextStyle, color: Rgba);

    /// Advance width of `text` in pixels.
    fn measure_text(&self, text: &str, style: &TextStyle) -> f64;

    /// Copy the current surface into the snapshot buffer.
    fn save_snapshot(&mut self);

    /// Blit the snapshot buffer scaled into the given rectangle.
    fn draw_snapshot(&mut self, x: f64, y: f64, w: f64, h: f64);

    /// Whether a screen point lies on the surface (edges inclusive).
    fn contains(&self, p: DVec2) -> bool {
        p.x >= 0.0 && p.y >= 0.0 && p.x <= self.width() && p.y <= self.height()
    }
}
