pub mod canvas;
pub mod color;
pub mod recording;

pub use canvas::{Canvas, TextStyle};
pub use color::Rgba;
pub use recording::{DrawCommand, RecordingCanvas};
