//! Speed legend: small particle panels, one per reference speed.
//!
//! Each panel runs a uniform field on its own canvas in screen coordinates.
//! Trail colors are normalized against the map's field so a panel's
//! brightness matches the same speed on the map.

use std::cell::RefCell;
use std::rc::Rc;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::core::bounds::GeoBounds;
use crate::core::field::VectorField;
use crate::core::projection::Identity;
use crate::renderer::canvas::Canvas;
use crate::systems::particles::{ParticleConfig, ParticleField};
use crate::systems::view::ViewController;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegendConfig {
    /// Panel speeds in m/s, one per panel.
    pub speeds: Vec<f64>,
    /// Field length per m/s on the legend canvases.
    pub speed_factor: f64,
    /// Particles per panel.
    pub particles: usize,
}

impl Default for LegendConfig {
    fn default() -> Self {
        Self {
            speeds: vec![1.0, 3.0, 5.0, 10.0, 15.0, 30.0],
            speed_factor: 40.0 / 1.15,
            particles: 30,
        }
    }
}

pub struct Legend<C: Canvas> {
    controller: ViewController,
    panels: Vec<Rc<RefCell<ParticleField<C>>>>,
}

impl<C: Canvas + 'static> Legend<C> {
    /// One panel per canvas, paired with `config.speeds` in order. Extra
    /// canvases or speeds are ignored.
    pub fn new(
        canvases: Vec<C>,
        map_max_length: f64,
        config: &LegendConfig,
        particles: &ParticleConfig,
    ) -> Self {
        let mut controller = ViewController::default();
        let mut panels = Vec::new();
        for (i, (canvas, speed)) in canvases.into_iter().zip(&config.speeds).enumerate() {
            let bounds = GeoBounds::new(0.0, 0.0, canvas.width(), canvas.height());
            let field = VectorField::constant(DVec2::new(speed * config.speed_factor, 0.0), bounds);
            let panel_config = ParticleConfig {
                count: config.particles,
                seed: particles.seed.wrapping_add(i as u64 + 1),
                ..particles.clone()
            };
            let mut panel = ParticleField::new(canvas, Rc::new(field), Rc::new(Identity), panel_config);
            panel.set_color_reference(map_max_length * config.speed_factor);
            let panel = Rc::new(RefCell::new(panel));
            controller.add_listener(panel.clone());
            panels.push(panel);
        }
        log::debug!("legend with {} panels", panels.len());
        Self { controller, panels }
    }

    /// Notifications are suppressed while `guard` returns false.
    pub fn set_guard(&mut self, guard: impl Fn() -> bool + 'static) {
        self.controller.set_guard(guard);
    }

    pub fn set_fade_alpha(&mut self, alpha: f32) {
        for panel in &self.panels {
            panel.borrow_mut().set_fade_alpha(alpha);
        }
    }

    pub fn tick(&mut self) {
        self.controller.tick();
    }

    pub fn panels(&self) -> &[Rc<RefCell<ParticleField<C>>>] {
        &self.panels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::recording::{DrawCommand, RecordingCanvas};

    fn first_line_level(panel: &ParticleField<RecordingCanvas>) -> f32 {
        panel
            .canvas()
            .commands()
            .iter()
            .find_map(|c| match c {
                DrawCommand::Line { color, .. } => Some(color.r),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn faster_panels_draw_brighter() {
        let canvases: Vec<RecordingCanvas> = (0..6).map(|_| RecordingCanvas::new(200.0, 20.0)).collect();
        let mut legend = Legend::new(canvases, 100.0, &LegendConfig::default(), &ParticleConfig::default());
        assert_eq!(legend.panels().len(), 6);
        legend.tick();
        legend.tick();

        let levels: Vec<f32> = legend
            .panels()
            .iter()
            .map(|p| first_line_level(&p.borrow()))
            .collect();
        assert!(levels.windows(2).all(|w| w[0] <= w[1]), "{:?}", levels);
        assert!(levels[5] > levels[0]);
        for panel in legend.panels() {
            assert_eq!(panel.borrow().particles().len(), 30);
        }
    }

    #[test]
    fn pairs_canvases_with_speeds() {
        let canvases: Vec<RecordingCanvas> = (0..2).map(|_| RecordingCanvas::new(60.0, 20.0)).collect();
        let legend = Legend::new(canvases, 100.0, &LegendConfig::default(), &ParticleConfig::default());
        assert_eq!(legend.panels().len(), 2);
        let slow = legend.panels()[0].borrow().field().max_length();
        let fast = legend.panels()[1].borrow().field().max_length();
        assert!((fast / slow - 3.0).abs() < 1e-12);
    }
}
