//! Particle advection and trail drawing.
//!
//! Particles live in geographic coordinates. Each `animate` tick moves them
//! along the field and strokes a segment from last frame's screen position to
//! this frame's, over a background that is faded a little every frame so old
//! trail segments dim out.

use std::rc::Rc;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::core::bounds::GeoBounds;
use crate::core::field::VectorField;
use crate::core::projection::Projection;
use crate::core::rng::Rng;
use crate::renderer::canvas::Canvas;
use crate::renderer::color::Rgba;
use crate::systems::view::{ViewListener, ViewSnapshot, ViewTransform};

/// Seeding acceptance: a sample of relative speed `m` survives when a uniform
/// draw exceeds `m * SLOW_BIAS`, so slow regions get proportionally more particles.
const SLOW_BIAS: f64 = 0.9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleConfig {
    pub count: usize,
    /// Multiplier on field velocity per tick.
    pub speed_scale: f64,
    /// Particles live between 1 and `max_age` ticks.
    pub max_age: u32,
    pub line_width: f64,
    pub background: Rgba,
    /// Alpha of the background wash laid over each frame after the first.
    pub fade_alpha: f32,
    /// Fill for canvas area outside the map while panning or zooming.
    pub outside_color: Rgba,
    /// Gray level of a trail in still air.
    pub color_base: f64,
    /// Gray levels added at the reference speed.
    pub color_range: f64,
    /// Extra area above the canvas, as a fraction of its height, included
    /// when re-deriving the sampling window after a zoom.
    pub top_overscan: f64,
    /// Below this scale the sampling window resets to the whole field.
    pub settle_scale: f64,
    /// Seeding attempts before a particle is accepted regardless of speed or position.
    pub max_rejections: u32,
    pub seed: u64,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            count: 5000,
            speed_scale: 2.5,
            max_age: 40,
            line_width: 0.75,
            background: Rgba::rgb8(40, 40, 40),
            fade_alpha: 0.02,
            outside_color: Rgba::WHITE,
            color_base: 90.0,
            color_range: 350.0,
            top_overscan: 0.2,
            settle_scale: 1.1,
            max_rejections: 10,
            seed: 0x5eed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    /// Geographic position.
    pub pos: DVec2,
    /// Screen position at the last draw, if drawn yet.
    pub prev_screen: Option<DVec2>,
    /// Ticks left. Zero means the particle is replaced on the next tick.
    pub age: u32,
    /// Per-particle random value in [0, 1).
    pub jitter: f64,
}

impl Particle {
    pub fn new(pos: DVec2, age: u32, jitter: f64) -> Self {
        Self {
            pos,
            prev_screen: None,
            age,
            jitter,
        }
    }
}

/// Animated particle display over one canvas.
pub struct ParticleField<C: Canvas> {
    config: ParticleConfig,
    canvas: C,
    field: Rc<VectorField>,
    projection: Rc<dyn Projection>,
    /// Geographic region new particles are drawn from.
    window: GeoBounds,
    particles: Vec<Particle>,
    rng: Rng,
    /// Length that maps to the brightest trail color.
    color_reference: f64,
    palette: Vec<Rgba>,
    first_frame: bool,
    /// Seeding rejections since the last full reseed.
    rejections: usize,
}

impl<C: Canvas> ParticleField<C> {
    pub fn new(
        canvas: C,
        field: Rc<VectorField>,
        projection: Rc<dyn Projection>,
        config: ParticleConfig,
    ) -> Self {
        let window = field.bounds();
        let color_reference = field.max_length();
        let mut display = Self {
            rng: Rng::new(config.seed),
            canvas,
            field,
            projection,
            window,
            particles: Vec::with_capacity(config.count),
            color_reference,
            palette: (0..=255u8).map(Rgba::gray8).collect(),
            first_frame: true,
            rejections: 0,
            config,
        };
        display.reseed(&ViewTransform::IDENTITY);
        display
    }

    /// Alpha of the per-frame background wash. Lower values give longer trails.
    pub fn set_fade_alpha(&mut self, alpha: f32) {
        self.config.fade_alpha = alpha;
    }

    /// Normalize trail colors against `max_length` instead of this field's
    /// own maximum, so several displays share one color scale.
    pub fn set_color_reference(&mut self, max_length: f64) {
        self.color_reference = max_length;
    }

    pub fn color_reference(&self) -> f64 {
        self.color_reference
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn window(&self) -> GeoBounds {
        self.window
    }

    pub fn canvas(&self) -> &C {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut C {
        &mut self.canvas
    }

    pub fn field(&self) -> &VectorField {
        &self.field
    }

    pub fn config(&self) -> &ParticleConfig {
        &self.config
    }

    /// Seeding rejections since the last full reseed.
    pub fn rejections(&self) -> usize {
        self.rejections
    }

    /// Trail color for a speed relative to the color reference.
    pub fn trail_color(&self, relative_speed: f64) -> Rgba {
        self.palette[self.color_bucket(relative_speed)]
    }

    fn color_bucket(&self, relative_speed: f64) -> usize {
        let level = self.config.color_base + (self.config.color_range * relative_speed).round();
        level.clamp(0.0, 255.0) as usize
    }

    /// Replace every particle with a fresh one from the current window.
    pub fn reseed(&mut self, view: &ViewTransform) {
        self.rejections = 0;
        self.particles.clear();
        for _ in 0..self.config.count {
            let p = self.seed_particle(view);
            self.particles.push(p);
        }
        log::debug!(
            "seeded {} particles in ({:.2}, {:.2})..({:.2}, {:.2}), {} rejections",
            self.particles.len(),
            self.window.x0,
            self.window.y0,
            self.window.x1,
            self.window.y1,
            self.rejections
        );
    }

    /// Draw one particle from the window, favoring slow air and positions on screen.
    fn seed_particle(&mut self, view: &ViewTransform) -> Particle {
        let max_length = self.field.max_length();
        let mut attempts = 0;
        loop {
            let a = self.rng.next_f64();
            let b = self.rng.next_f64();
            let pos = self.window.mix(a, b);
            let age = 1 + (self.config.max_age as f64 * self.rng.next_f64()) as u32;
            let jitter = self.rng.next_f64();
            if max_length == 0.0 {
                return Particle::new(pos, age, jitter);
            }

            let forced = attempts >= self.config.max_rejections;
            if forced {
                log::trace!("forcing particle at ({:.3}, {:.3})", pos.x, pos.y);
                return Particle::new(pos, age, jitter);
            }

            let v = self.field.sample_at(pos);
            let m = v.length() / max_length;
            if v != DVec2::ZERO && self.rng.next_f64() > m * SLOW_BIAS {
                let screen = view.apply(self.projection.project(pos.x, pos.y));
                if self.canvas.contains(screen) {
                    return Particle::new(pos, age, jitter);
                }
            }
            attempts += 1;
            self.rejections += 1;
        }
    }

    /// Move every particle one tick along the field, replacing expired ones.
    pub fn advance(&mut self, view: &ViewTransform) {
        let speed = 0.01 * self.config.speed_scale / view.scale;
        for i in 0..self.particles.len() {
            let p = self.particles[i];
            if p.age > 0 && self.field.in_bounds(p.pos.x, p.pos.y) {
                let v = self.field.sample_at(p.pos);
                let particle = &mut self.particles[i];
                particle.pos += v * speed;
                particle.age -= 1;
            } else {
                self.particles[i] = self.seed_particle(view);
            }
        }
    }

    /// Fade the previous frame and stroke this frame's trail segments.
    pub fn draw(&mut self, view: &ViewTransform) {
        let fill = if self.first_frame {
            self.first_frame = false;
            self.config.background
        } else {
            self.config.background.with_alpha(self.config.fade_alpha)
        };
        let w = self.canvas.width();
        let h = self.canvas.height();
        self.canvas
            .fill_rect(view.offset.x, view.offset.y, w * view.scale, h * view.scale, fill);

        let reference = self.color_reference;
        for i in 0..self.particles.len() {
            let p = self.particles[i];
            if !self.field.in_bounds(p.pos.x, p.pos.y) {
                self.particles[i].age = 0;
                continue;
            }
            let screen = view.apply(self.projection.project(p.pos.x, p.pos.y));
            if !self.canvas.contains(screen) {
                self.particles[i].age = 0;
            }
            if let Some(prev) = p.prev_screen {
                let s = if reference > 0.0 {
                    self.field.sample_at(p.pos).length() / reference
                } else {
                    0.0
                };
                let color = self.trail_color(s);
                self.canvas.stroke_line(screen, prev, self.config.line_width, color);
            }
            self.particles[i].prev_screen = Some(screen);
        }
    }

    /// Re-derive the sampling window for the view that just settled and reseed.
    pub fn settle(&mut self, view: &ViewTransform) {
        let bounds = self.field.bounds();
        self.window = if view.scale < self.config.settle_scale {
            bounds
        } else {
            let w = self.canvas.width();
            let h = self.canvas.height();
            let top = -self.config.top_overscan * h;
            let invert = |x: f64, y: f64| {
                let p = view.invert(DVec2::new(x, y));
                self.projection.invert(p.x, p.y)
            };
            let mut visible = GeoBounds::from_point(invert(0.0, 0.0));
            for (x, y) in [(0.0, top), (w, top), (0.0, h), (w, h)] {
                visible.expand(invert(x, y));
            }
            let window = visible.intersect(&bounds);
            if window.is_valid() {
                window
            } else {
                log::debug!("view does not overlap the field, sampling the whole field");
                bounds
            }
        };
        self.reseed(view);
    }
}

impl<C: Canvas> ViewListener for ParticleField<C> {
    fn on_start_move(&mut self, _view: &ViewSnapshot) {
        self.canvas.save_snapshot();
    }

    fn on_move(&mut self, view: &ViewSnapshot) {
        let w = self.canvas.width();
        let h = self.canvas.height();
        let t = view.transform;
        self.canvas.fill_rect(0.0, 0.0, w, h, self.config.outside_color);
        self.canvas
            .fill_rect(t.offset.x, t.offset.y, w * t.scale, h * t.scale, self.config.background);
        let z = view.relative_zoom();
        let origin = view.relative_offset();
        self.canvas.draw_snapshot(origin.x, origin.y, z * w, z * h);
    }

    fn on_end_move(&mut self, view: &ViewSnapshot) {
        self.settle(&view.transform);
    }

    fn on_animate(&mut self, view: &ViewSnapshot) {
        self.advance(&view.transform);
        self.draw(&view.transform);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::projection::Identity;
    use crate::renderer::recording::{DrawCommand, RecordingCanvas};

    fn display(value: DVec2, bounds: GeoBounds, w: f64, h: f64, count: usize) -> ParticleField<RecordingCanvas> {
        let field = Rc::new(VectorField::constant(value, bounds));
        let config = ParticleConfig {
            count,
            ..ParticleConfig::default()
        };
        ParticleField::new(RecordingCanvas::new(w, h), field, Rc::new(Identity), config)
    }

    fn wide() -> GeoBounds {
        GeoBounds::new(0.0, 0.0, 200.0, 100.0)
    }

    fn lines(commands: &[DrawCommand]) -> Vec<Rgba> {
        commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Line { color, .. } => Some(*color),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn still_air_seeds_without_rejection() {
        let d = display(DVec2::ZERO, wide(), 200.0, 100.0, 500);
        assert_eq!(d.particles().len(), 500);
        assert_eq!(d.rejections(), 0);
        for p in d.particles() {
            assert!(p.pos.x > 0.0 && p.pos.x <= 200.0);
            assert!(p.pos.y > 0.0 && p.pos.y <= 100.0);
            assert!((1..=40).contains(&p.age));
            assert!((0.0..1.0).contains(&p.jitter));
        }
    }

    #[test]
    fn seeding_favors_slow_air() {
        // Columns 0-1 blow at a tenth of columns 2-3. x < 100 is uniformly
        // slow, x > 200 uniformly fast.
        let grid = (0..4)
            .map(|i| {
                let speed = if i < 2 { 1.0 } else { 10.0 };
                vec![DVec2::new(speed, 0.0); 2]
            })
            .collect();
        let bounds = GeoBounds::new(0.0, 0.0, 300.0, 100.0);
        let field = Rc::new(VectorField::from_grid(grid, bounds).unwrap());
        let config = ParticleConfig {
            count: 3000,
            ..ParticleConfig::default()
        };
        let d = ParticleField::new(RecordingCanvas::new(300.0, 100.0), field, Rc::new(Identity), config);

        let slow = d.particles().iter().filter(|p| p.pos.x < 100.0).count();
        let fast = d.particles().iter().filter(|p| p.pos.x > 200.0).count();
        // Acceptance is 0.91 in slow air and 0.1 in fast air.
        assert!(fast > 0);
        assert!(slow > 4 * fast, "slow {} vs fast {}", slow, fast);
        assert!(d.rejections() > 0);
    }

    #[test]
    fn seeding_terminates_when_nothing_is_on_screen() {
        // Field far off the canvas: every attempt is rejected until forced.
        let d = display(DVec2::new(5.0, 0.0), GeoBounds::new(500.0, 500.0, 600.0, 600.0), 100.0, 100.0, 20);
        assert_eq!(d.particles().len(), 20);
        assert_eq!(d.rejections(), 20 * 10);
    }

    #[test]
    fn advance_moves_along_field() {
        let mut d = display(DVec2::new(40.0, 0.0), wide(), 200.0, 100.0, 100);
        let before: Vec<DVec2> = d.particles().iter().map(|p| p.pos).collect();
        d.advance(&ViewTransform::IDENTITY);
        for (p, old) in d.particles().iter().zip(before) {
            if old.x < 200.0 {
                assert!((p.pos - old - DVec2::new(1.0, 0.0)).length() < 1e-9);
            }
        }
    }

    #[test]
    fn zooming_in_slows_particles() {
        let mut d = display(DVec2::new(40.0, 0.0), wide(), 200.0, 100.0, 10);
        let before: Vec<DVec2> = d.particles().iter().map(|p| p.pos).collect();
        d.advance(&ViewTransform::new(2.0, DVec2::ZERO));
        for (p, old) in d.particles().iter().zip(before) {
            if old.x < 200.0 {
                assert!((p.pos.x - old.x - 0.5).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn first_frame_is_opaque_then_fades() {
        let mut d = display(DVec2::new(40.0, 0.0), wide(), 200.0, 100.0, 50);
        let view = ViewSnapshot::at_rest(ViewTransform::IDENTITY);
        d.on_animate(&view);
        d.on_animate(&view);
        let fills: Vec<Rgba> = d
            .canvas()
            .commands()
            .iter()
            .filter_map(|c| match c {
                DrawCommand::FillRect { color, .. } => Some(*color),
                _ => None,
            })
            .collect();
        assert_eq!(fills.len(), 2);
        assert_eq!(fills[0].a, 1.0);
        assert_eq!(fills[1].a, 0.02);
    }

    #[test]
    fn trails_need_a_previous_position() {
        let mut d = display(DVec2::new(40.0, 0.0), wide(), 200.0, 100.0, 50);
        let view = ViewSnapshot::at_rest(ViewTransform::IDENTITY);
        d.on_animate(&view);
        assert!(lines(d.canvas().commands()).is_empty());
        d.on_animate(&view);
        let colors = lines(d.canvas().commands());
        assert!(!colors.is_empty());
        // Uniform field at its own maximum: every trail is the brightest gray.
        assert!(colors.iter().all(|c| *c == Rgba::WHITE));
    }

    #[test]
    fn color_reference_scales_brightness() {
        let mut d = display(DVec2::new(40.0, 0.0), wide(), 200.0, 100.0, 50);
        d.set_color_reference(400.0);
        let view = ViewSnapshot::at_rest(ViewTransform::IDENTITY);
        d.on_animate(&view);
        d.on_animate(&view);
        let colors = lines(d.canvas().commands());
        assert!(!colors.is_empty());
        assert!(colors.iter().all(|c| *c == Rgba::gray8(125)));
    }

    #[test]
    fn color_bucket_saturates() {
        let d = display(DVec2::new(1.0, 0.0), wide(), 200.0, 100.0, 1);
        assert_eq!(d.trail_color(0.0), Rgba::gray8(90));
        assert_eq!(d.trail_color(0.2), Rgba::gray8(160));
        assert_eq!(d.trail_color(1.0), Rgba::gray8(255));
    }

    #[test]
    fn off_canvas_particles_are_marked() {
        let mut d = display(DVec2::new(40.0, 0.0), wide(), 200.0, 100.0, 30);
        let view = ViewSnapshot::at_rest(ViewTransform::new(1.0, DVec2::new(1000.0, 0.0)));
        d.draw(&view.transform);
        assert!(d.particles().iter().all(|p| p.age == 0));
    }

    #[test]
    fn settle_narrows_window_when_zoomed() {
        let mut d = display(DVec2::new(40.0, 0.0), wide(), 200.0, 100.0, 100);
        let zoomed = ViewTransform::new(2.0, DVec2::ZERO);
        d.on_end_move(&ViewSnapshot::at_rest(zoomed));
        assert_eq!(d.window(), GeoBounds::new(0.0, 0.0, 100.0, 50.0));
        for p in d.particles() {
            assert!(p.pos.x > 0.0 && p.pos.x <= 100.0);
            assert!(p.pos.y > 0.0 && p.pos.y <= 50.0);
        }

        d.on_end_move(&ViewSnapshot::at_rest(ViewTransform::new(1.05, DVec2::ZERO)));
        assert_eq!(d.window(), wide());
    }

    #[test]
    fn move_blits_saved_screen() {
        let mut d = display(DVec2::new(40.0, 0.0), wide(), 200.0, 100.0, 10);
        let start = ViewSnapshot::at_rest(ViewTransform::IDENTITY);
        d.on_start_move(&start);
        assert_eq!(d.canvas().snapshot_count(), 1);
        d.canvas_mut().take_commands();

        let view = ViewSnapshot {
            transform: ViewTransform::new(2.0, DVec2::new(-10.0, -20.0)),
            ..start
        };
        d.on_move(&view);
        let commands = d.canvas().commands();
        assert_eq!(commands.len(), 3);
        assert_eq!(
            commands[0],
            DrawCommand::FillRect { x: 0.0, y: 0.0, w: 200.0, h: 100.0, color: Rgba::WHITE }
        );
        assert_eq!(
            commands[2],
            DrawCommand::DrawSnapshot { x: -10.0, y: -20.0, w: 400.0, h: 200.0 }
        );
    }
}
