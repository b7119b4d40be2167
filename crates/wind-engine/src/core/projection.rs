//! Map projections: geographic (lon, lat) in degrees to planar coordinates and back.

use glam::DVec2;
use serde::{Deserialize, Serialize};

/// A forward/inverse projection pair.
///
/// `invert(project(p))` must return `p` up to floating-point error over the
/// domain the map covers.
pub trait Projection {
    fn project(&self, lon: f64, lat: f64) -> DVec2;
    fn invert(&self, x: f64, y: f64) -> DVec2;
}

/// Passes coordinates through unchanged. Used by the legend panels, whose
/// "geography" is already screen space.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Identity;

impl Projection for Identity {
    #[inline]
    fn project(&self, lon: f64, lat: f64) -> DVec2 {
        DVec2::new(lon, lat)
    }

    #[inline]
    fn invert(&self, x: f64, y: f64) -> DVec2 {
        DVec2::new(x, y)
    }
}

/// Reference parameters of an Albers equal-area conic, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlbersParams {
    /// First standard parallel.
    pub parallel_1: f64,
    /// Second standard parallel.
    pub parallel_2: f64,
    /// Latitude of origin.
    pub origin_lat: f64,
    /// Central meridian.
    pub origin_lon: f64,
}

impl Default for AlbersParams {
    fn default() -> Self {
        Self {
            parallel_1: 25.0,
            parallel_2: 52.0,
            origin_lat: 37.0,
            origin_lon: -125.0,
        }
    }
}

/// Albers equal-area conic projection on the unit sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Albers {
    n: f64,
    c: f64,
    rho0: f64,
    lambda0: f64,
}

impl Albers {
    pub fn new(params: AlbersParams) -> Self {
        let phi1 = params.parallel_1.to_radians();
        let phi2 = params.parallel_2.to_radians();
        let n = 0.5 * (phi1 + phi2);
        let c = phi1.cos() * phi1.cos() + 2.0 * n * phi1.sin();
        let phi0 = params.origin_lat.to_radians();
        let rho0 = (c - 2.0 * n * phi0.sin()).sqrt() / n;
        Self {
            n,
            c,
            rho0,
            lambda0: params.origin_lon.to_radians(),
        }
    }
}

impl Default for Albers {
    fn default() -> Self {
        Self::new(AlbersParams::default())
    }
}

impl Projection for Albers {
    fn project(&self, lon: f64, lat: f64) -> DVec2 {
        let theta = self.n * (lon.to_radians() - self.lambda0);
        let rho = (self.c - 2.0 * self.n * lat.to_radians().sin()).sqrt() / self.n;
        DVec2::new(rho * theta.sin(), self.rho0 - rho * theta.cos())
    }

    fn invert(&self, x: f64, y: f64) -> DVec2 {
        let dy = self.rho0 - y;
        let rho2 = x * x + dy * dy;
        let theta = (x / dy).atan();
        let lon = self.lambda0 + theta / self.n;
        let lat = ((self.c / self.n - rho2 * self.n) / 2.0).asin();
        DVec2::new(lon.to_degrees(), lat.to_degrees())
    }
}

/// Scales and offsets a base projection into screen pixels.
///
/// The base image of `corner` lands on `(offset_x, offset_y)`; x grows to the
/// right and y grows downward, so the base y axis is flipped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaledProjection<P> {
    base: P,
    scale: f64,
    offset: DVec2,
    corner: DVec2,
}

impl<P: Projection> ScaledProjection<P> {
    pub fn new(base: P, scale: f64, offset_x: f64, offset_y: f64, corner_lon: f64, corner_lat: f64) -> Self {
        let corner = base.project(corner_lon, corner_lat);
        Self {
            base,
            scale,
            offset: DVec2::new(offset_x, offset_y),
            corner,
        }
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn offset(&self) -> DVec2 {
        self.offset
    }
}

impl<P: Projection> Projection for ScaledProjection<P> {
    fn project(&self, lon: f64, lat: f64) -> DVec2 {
        let p = self.base.project(lon, lat);
        DVec2::new(
            self.scale * (p.x - self.corner.x) + self.offset.x,
            -self.scale * (p.y - self.corner.y) + self.offset.y,
        )
    }

    fn invert(&self, x: f64, y: f64) -> DVec2 {
        let a = (x - self.offset.x) / self.scale + self.corner.x;
        let b = (y - self.offset.y) / -self.scale + self.corner.y;
        self.base.invert(a, b)
    }
}

/// Settings for the map's scaled Albers projection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    /// Pixels per unit of the base projection.
    pub scale: f64,
    pub offset_x: f64,
    /// Screen y of the reference corner. `None` pins it to the canvas bottom edge.
    pub offset_y: Option<f64>,
    /// Reference (south-west) corner of the mapped region.
    pub corner_lon: f64,
    pub corner_lat: f64,
    pub albers: AlbersParams,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            scale: 1900.0,
            offset_x: 0.0,
            offset_y: None,
            corner_lon: -135.0,
            corner_lat: 30.0,
            albers: AlbersParams::default(),
        }
    }
}

impl ProjectionConfig {
    /// Build the projection for a canvas of the given height.
    pub fn build(&self, canvas_height: f64) -> ScaledProjection<Albers> {
        ScaledProjection::new(
            Albers::new(self.albers),
            self.scale,
            self.offset_x,
            self.offset_y.unwrap_or(canvas_height),
            self.corner_lon,
            self.corner_lat,
        )
    }
}
