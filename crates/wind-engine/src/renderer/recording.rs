//! Headless canvas that records draw calls for tests.

use glam::DVec2;

use super::canvas::{Canvas, TextStyle};
use super::color::Rgba;

/// One recorded draw call.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear,
    FillRect { x: f64, y: f64, w: f64, h: f64, color: Rgba },
    Line { from: DVec2, to: DVec2, width: f64, color: Rgba },
    Marker { center: DVec2, radius: f64, fill: Rgba, stroke: Rgba },
    Text { text: String, anchor: DVec2, color: Rgba },
    SaveSnapshot,
    DrawSnapshot { x: f64, y: f64, w: f64, h: f64 },
}

#[derive(Debug, Clone)]
pub struct RecordingCanvas {
    width: f64,
    height: f64,
    /// Advance width per character used by `measure_text`.
    char_width: f64,
    commands: Vec<DrawCommand>,
    snapshots: usize,
}

impl RecordingCanvas {
    pub const DEFAULT_CHAR_WIDTH: f64 = 7.0;

    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            char_width: Self::DEFAULT_CHAR_WIDTH,
            commands: Vec::new(),
            snapshots: 0,
        }
    }

    pub fn with_char_width(mut self, char_width: f64) -> Self {
        self.char_width = char_width;
        self
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Take all recorded commands, leaving the canvas empty.
    pub fn take_commands(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Number of `save_snapshot` calls so far.
    pub fn snapshot_count(&self) -> usize {
        self.snapshots
    }

    /// Recorded text draws as `(text, color)`.
    pub fn texts(&self) -> impl Iterator<Item = (&str, Rgba)> {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::Text { text, color, .. } => Some((text.as_str(), *color)),
            _ => None,
        })
    }
}

impl Canvas for RecordingCanvas {
    fn width(&self) -> f64 {
        self.width
    }

    fn height(&self) -> f64 {
        self.height
    }

    fn clear(&mut self) {
        self.commands.push(DrawCommand::Clear);
    }

    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: Rgba) {
        self.commands.push(DrawCommand::FillRect { x, y, w, h, color });
    }

    fn stroke_line(&mut self, from: DVec2, to: DVec2, width: f64, color: Rgba) {
        self.commands.push(DrawCommand::Line { from, to, width, color });
    }

    fn draw_marker(&mut self, center: DVec2, radius: f64, fill: Rgba, stroke: Rgba) {
        self.commands.push(DrawCommand::Marker { center, radius, fill, stroke });
    }

    fn fill_text(&mut self, text: &str, anchor: DVec2, _style: &TextStyle, color: Rgba) {
        self.commands.push(DrawCommand::Text {
            text: text.to_string(),
            anchor,
            color,
        });
    }

    fn measure_text(&self, text: &str, _style: &TextStyle) -> f64 {
        text.chars().count() as f64 * self.char_width
    }

    fn save_snapshot(&mut self) {
        self.snapshots += 1;
        self.commands.push(DrawCommand::SaveSnapshot);
    }

    fn draw_snapshot(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.commands.push(DrawCommand::DrawSnapshot { x, y, w, h });
    }
}
