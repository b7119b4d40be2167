pub mod api;
pub mod core;
pub mod systems;
pub mod renderer;
pub mod input;
pub mod assets;
pub mod extensions;

// Re-export key types at crate root for convenience
pub use api::session::{Session, SessionConfig};
pub use assets::features::Feature;
pub use assets::field_data::FieldData;
pub use core::bounds::GeoBounds;
pub use core::field::{FieldError, FieldStats, VectorField};
pub use core::projection::{Albers, AlbersParams, Identity, Projection, ProjectionConfig, ScaledProjection};
pub use core::rng::Rng;
pub use core::time::FixedTimestep;
pub use core::vector::VectorExt;
pub use input::queue::{InputEvent, InputQueue};
pub use renderer::{Canvas, DrawCommand, RecordingCanvas, Rgba, TextStyle};
pub use systems::labels::{LabelConfig, LabelLayer};
pub use systems::legend::{Legend, LegendConfig};
pub use systems::particles::{Particle, ParticleConfig, ParticleField};
pub use systems::readout::{HoverReadout, Readout};
pub use systems::view::{
    SharedListener, ViewConfig, ViewController, ViewEvent, ViewListener, ViewMode,
    ViewSnapshot, ViewTransform,
};

// Extensions
pub use extensions::{ease, mix, mix_vec2, Easing};
