//! Continuous wind field built from a regularly sampled grid.
//!
//! Samples are stored column-major (`x` outer, `y` inner) and blended with
//! bilinear interpolation. Construction validates the grid; sampling assumes
//! the caller has checked [`VectorField::in_bounds`] first.

use glam::DVec2;
use thiserror::Error;

use super::bounds::GeoBounds;
use super::vector::VectorExt;
use crate::assets::field_data::FieldData;

/// Raw samples are stored in tenths; multiply on read.
pub const SAMPLE_SCALE: f64 = 10.0;

/// Converts a field length to the m/s figure shown to users.
pub const DISPLAY_SPEED_DIVISOR: f64 = 1.15 * SAMPLE_SCALE;

/// Keeps fractional indices off the last row/column so `ceil` stays in range.
const INDEX_EPSILON: f64 = 1e-6;

#[derive(Debug, Error)]
pub enum FieldError {
    #[error("grid must be at least 2x2, got {width}x{height}")]
    GridTooSmall { width: usize, height: usize },
    #[error("grid {width}x{height} is too large")]
    GridTooLarge { width: usize, height: usize },
    #[error("grid column {column} has {actual} rows, expected {expected}")]
    RaggedGrid { column: usize, expected: usize, actual: usize },
    #[error("invalid bounds: ({x0}, {y0}) .. ({x1}, {y1})")]
    InvalidBounds { x0: f64, y0: f64, x1: f64, y1: f64 },
    #[error("expected {expected} sample values, got {actual}")]
    SampleCount { expected: usize, actual: usize },
    #[error("non-finite sample at grid ({x}, {y})")]
    NonFiniteSample { x: usize, y: usize },
    #[error("failed to parse field data: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
enum Sampler {
    Grid {
        cells: Vec<DVec2>,
        width: usize,
        height: usize,
    },
    Constant(DVec2),
}

/// Summary speeds in display units (m/s).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldStats {
    pub max_speed: f64,
    pub average_speed: Option<f64>,
}

/// An immutable 2D vector field over a geographic rectangle.
#[derive(Debug, Clone)]
pub struct VectorField {
    bounds: GeoBounds,
    sampler: Sampler,
    max_length: f64,
    average_length: Option<f64>,
}

impl VectorField {
    /// Build from columns of samples: `grid[x][y]`.
    pub fn from_grid(grid: Vec<Vec<DVec2>>, bounds: GeoBounds) -> Result<Self, FieldError> {
        let width = grid.len();
        let height = grid.first().map_or(0, Vec::len);
        if width < 2 || height < 2 {
            return Err(FieldError::GridTooSmall { width, height });
        }
        let mut cells = Vec::with_capacity(cell_count(width, height, 1)?);
        for (column, col) in grid.into_iter().enumerate() {
            if col.len() != height {
                return Err(FieldError::RaggedGrid {
                    column,
                    expected: height,
                    actual: col.len(),
                });
            }
            cells.extend(col);
        }
        Self::from_cells(cells, width, height, bounds)
    }

    /// Build from a flat column-major buffer of `width * height` vectors.
    pub fn from_cells(
        cells: Vec<DVec2>,
        width: usize,
        height: usize,
        bounds: GeoBounds,
    ) -> Result<Self, FieldError> {
        if width < 2 || height < 2 {
            return Err(FieldError::GridTooSmall { width, height });
        }
        if !bounds.is_valid() {
            return Err(invalid_bounds(&bounds));
        }
        let expected = cell_count(width, height, 1)?;
        if cells.len() != expected {
            return Err(FieldError::SampleCount {
                expected,
                actual: cells.len(),
            });
        }
        if let Some(i) = cells.iter().position(|v| !v.is_finite()) {
            return Err(FieldError::NonFiniteSample {
                x: i / height,
                y: i % height,
            });
        }

        let max_length = cells.iter().map(|v| v.length()).fold(0.0, f64::max);

        Ok(Self {
            bounds,
            sampler: Sampler::Grid { cells, width, height },
            max_length,
            average_length: None,
        })
    }

    /// A field that returns `value` everywhere inside `bounds`.
    pub fn constant(value: DVec2, bounds: GeoBounds) -> Self {
        Self {
            bounds,
            sampler: Sampler::Constant(value),
            max_length: value.length(),
            average_length: None,
        }
    }

    /// Build from downloaded field data.
    ///
    /// Raw samples are scaled by [`SAMPLE_SCALE`]. With `correct_for_sphere`,
    /// each sample's x component is stretched by `1 / cos(lat)` and the vector
    /// is renormalized to its original length, undoing the equirectangular
    /// grid's squeeze at high latitude. The same pass accumulates a
    /// latitude-weighted average length over nonzero samples.
    pub fn read(data: &FieldData, correct_for_sphere: bool) -> Result<Self, FieldError> {
        let width = data.grid_width;
        let height = data.grid_height;
        if width < 2 || height < 2 {
            return Err(FieldError::GridTooSmall { width, height });
        }
        let bounds = data.bounds();
        if !bounds.is_valid() {
            return Err(invalid_bounds(&bounds));
        }
        let expected = cell_count(width, height, 2)?;
        if data.field.len() != expected {
            return Err(FieldError::SampleCount {
                expected,
                actual: data.field.len(),
            });
        }

        let mut cells = Vec::with_capacity(expected / 2);
        let mut total = 0.0;
        let mut weight = 0.0;
        for (i, pair) in data.field.chunks_exact(2).enumerate() {
            let mut v = DVec2::new(pair[0], pair[1]) * SAMPLE_SCALE;
            if correct_for_sphere {
                let y = i % height;
                let uy = y as f64 / (height - 1) as f64;
                let lat = bounds.y0 * (1.0 - uy) + bounds.y1 * uy;
                let m = lat.to_radians();
                let length = v.length();
                if length != 0.0 {
                    total += length * m;
                    weight += m;
                }
                v.x /= m.cos();
                v = v.with_length(length);
            }
            cells.push(v);
        }

        let mut field = Self::from_cells(cells, width, height, bounds)?;
        if total != 0.0 && weight != 0.0 {
            field.average_length = Some(total / weight);
        }
        log::info!(
            "vector field {}x{} over ({:.2}, {:.2})..({:.2}, {:.2}): max length {:.2}, average {:?}",
            width,
            height,
            bounds.x0,
            bounds.y0,
            bounds.x1,
            bounds.y1,
            field.max_length,
            field.average_length
        );
        Ok(field)
    }

    /// Parse JSON field data and build the field.
    pub fn from_json(json: &str, correct_for_sphere: bool) -> Result<Self, FieldError> {
        let data = FieldData::from_json(json)?;
        Self::read(&data, correct_for_sphere)
    }

    #[inline]
    pub fn in_bounds(&self, x: f64, y: f64) -> bool {
        self.bounds.contains(x, y)
    }

    /// Interpolated vector at `(x, y)`. Only meaningful when `in_bounds(x, y)`;
    /// outside, the query is clamped to the grid edge.
    pub fn sample(&self, x: f64, y: f64) -> DVec2 {
        match &self.sampler {
            Sampler::Constant(v) => *v,
            Sampler::Grid { cells, width, height } => {
                let b = &self.bounds;
                let max_a = (*width - 1) as f64 - INDEX_EPSILON;
                let max_b = (*height - 1) as f64 - INDEX_EPSILON;
                let a = (max_a * (x - b.x0) / b.width()).clamp(0.0, max_a);
                let b = (max_b * (y - b.y0) / b.height()).clamp(0.0, max_b);
                bilinear(cells, *height, a, b)
            }
        }
    }

    #[inline]
    pub fn sample_at(&self, p: DVec2) -> DVec2 {
        self.sample(p.x, p.y)
    }

    pub fn bounds(&self) -> GeoBounds {
        self.bounds
    }

    /// Largest vector length over the grid.
    pub fn max_length(&self) -> f64 {
        self.max_length
    }

    /// Latitude-weighted average length, if computed during [`VectorField::read`].
    pub fn average_length(&self) -> Option<f64> {
        self.average_length
    }

    /// Grid dimensions, or `None` for a constant field.
    pub fn grid_size(&self) -> Option<(usize, usize)> {
        match self.sampler {
            Sampler::Grid { width, height, .. } => Some((width, height)),
            Sampler::Constant(_) => None,
        }
    }

    pub fn stats(&self) -> FieldStats {
        FieldStats {
            max_speed: self.max_length / DISPLAY_SPEED_DIVISOR,
            average_speed: self.average_length.map(|a| a / DISPLAY_SPEED_DIVISOR),
        }
    }
}

/// `width * height * per_cell`, or `GridTooLarge` when it overflows.
fn cell_count(width: usize, height: usize, per_cell: usize) -> Result<usize, FieldError> {
    width
        .checked_mul(height)
        .and_then(|n| n.checked_mul(per_cell))
        .ok_or(FieldError::GridTooLarge { width, height })
}

fn invalid_bounds(b: &GeoBounds) -> FieldError {
    FieldError::InvalidBounds {
        x0: b.x0,
        y0: b.y0,
        x1: b.x1,
        y1: b.y1,
    }
}

#[inline]
fn bilinear(cells: &[DVec2], height: usize, a: f64, b: f64) -> DVec2 {
    let na = a.floor() as usize;
    let nb = b.floor() as usize;
    let ma = a.ceil() as usize;
    let mb = b.ceil() as usize;
    let fa = a - na as f64;
    let fb = b - nb as f64;

    let at = |i: usize, j: usize| cells[i * height + j];
    let low = at(na, nb) + (at(ma, nb) - at(na, nb)) * fa;
    let high = at(na, mb) + (at(ma, mb) - at(na, mb)) * fa;
    low + (high - low) * fb
}
