use std::cell::{Cell, Ref, RefCell};
use std::rc::Rc;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::assets::features::Feature;
use crate::assets::field_data::{split_timestamp, FieldData};
use crate::core::field::{FieldError, FieldStats, VectorField};
use crate::core::projection::{Projection, ProjectionConfig};
use crate::core::time::FixedTimestep;
use crate::input::queue::{InputEvent, InputQueue};
use crate::renderer::canvas::Canvas;
use crate::systems::labels::{LabelConfig, LabelLayer};
use crate::systems::legend::{Legend, LegendConfig};
use crate::systems::particles::{ParticleConfig, ParticleField};
use crate::systems::readout::{HoverReadout, Readout};
use crate::systems::view::{SharedListener, ViewConfig, ViewController, ViewSnapshot};

/// Configuration for a map session. Every field has a default; a JSON
/// config only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Tick length in milliseconds (default: 40).
    pub tick_ms: f64,
    /// Apply the latitude correction when reading field data.
    pub correct_for_sphere: bool,
    /// How long the pointer must rest before the hover readout shows.
    pub hover_dwell_ms: f64,
    pub particles: ParticleConfig,
    pub labels: LabelConfig,
    pub view: ViewConfig,
    pub projection: ProjectionConfig,
    pub legend: LegendConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_ms: 40.0,
            correct_for_sphere: true,
            hover_dwell_ms: 200.0,
            particles: ParticleConfig::default(),
            labels: LabelConfig::default(),
            view: ViewConfig::default(),
            projection: ProjectionConfig::default(),
            legend: LegendConfig::default(),
        }
    }
}

impl SessionConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// One running wind map: the field, its displays, and the controller that
/// drives them.
///
/// The host pushes pointer input as it arrives and calls [`Session::tick`]
/// with elapsed wall time once per frame.
pub struct Session<C: Canvas> {
    config: SessionConfig,
    field: Rc<VectorField>,
    timestamp: Option<String>,
    projection: Rc<dyn Projection>,
    controller: ViewController,
    particles: Rc<RefCell<ParticleField<C>>>,
    labels: Option<Rc<RefCell<LabelLayer<C>>>>,
    readout: Rc<RefCell<HoverReadout>>,
    legend: Option<Legend<C>>,
    input: InputQueue,
    timestep: FixedTimestep,
    animating: Rc<Cell<bool>>,
}

impl<C: Canvas + 'static> Session<C> {
    /// Build a session drawing particles onto `canvas`.
    pub fn new(field: VectorField, canvas: C, config: SessionConfig) -> Self {
        let field = Rc::new(field);
        let projection: Rc<dyn Projection> = Rc::new(config.projection.build(canvas.height()));
        let timestep = FixedTimestep::from_millis(config.tick_ms);
        let animating = Rc::new(Cell::new(true));

        let mut controller = ViewController::new(config.view);
        let flag = animating.clone();
        controller.set_guard(move || flag.get());

        let particles = Rc::new(RefCell::new(ParticleField::new(
            canvas,
            field.clone(),
            projection.clone(),
            config.particles.clone(),
        )));
        controller.add_listener(particles.clone());

        let dwell = timestep.ticks_for(config.hover_dwell_ms / 1000.0);
        let readout = Rc::new(RefCell::new(HoverReadout::new(field.clone(), projection.clone(), dwell)));
        controller.add_listener(readout.clone());

        log::info!(
            "wind map session: {} particles, tick {} ms, max speed {:.1} m/s",
            config.particles.count,
            config.tick_ms,
            field.stats().max_speed
        );

        Self {
            config,
            field,
            timestamp: None,
            projection,
            controller,
            particles,
            labels: None,
            readout,
            legend: None,
            input: InputQueue::new(),
            timestep,
            animating,
        }
    }

    /// Parse field data JSON and build a session from it.
    pub fn from_json(field_json: &str, canvas: C, config: SessionConfig) -> Result<Self, FieldError> {
        let data = FieldData::from_json(field_json)?;
        let field = VectorField::read(&data, config.correct_for_sphere)?;
        let mut session = Self::new(field, canvas, config);
        session.timestamp = data.timestamp;
        Ok(session)
    }

    /// Add the label layer on its own canvas and draw it for the current view.
    pub fn with_labels(mut self, canvas: C, features: Vec<Feature>) -> Self {
        let mut layer = LabelLayer::new(canvas, self.projection.clone(), features, self.config.labels.clone());
        layer.refresh(&ViewSnapshot::at_rest(self.controller.transform()));
        let layer = Rc::new(RefCell::new(layer));
        self.controller.add_listener(layer.clone());
        self.labels = Some(layer);
        self
    }

    /// Add speed legend panels, one canvas per configured speed.
    pub fn with_legend(mut self, canvases: Vec<C>) -> Self {
        let mut legend = Legend::new(
            canvases,
            self.field.max_length(),
            &self.config.legend,
            &self.config.particles,
        );
        let flag = self.animating.clone();
        legend.set_guard(move || flag.get());
        self.legend = Some(legend);
        self
    }

    /// Register an extra view listener after the built-in displays.
    pub fn add_listener(&mut self, listener: SharedListener) {
        self.controller.add_listener(listener);
    }

    pub fn push_input(&mut self, event: InputEvent) {
        self.input.push(event);
    }

    /// Apply queued input, then run as many fixed ticks as `dt` seconds
    /// cover. Returns the number of ticks run.
    pub fn tick(&mut self, dt: f64) -> u32 {
        for event in self.input.drain() {
            self.apply(event);
        }
        let steps = self.timestep.accumulate(dt);
        for _ in 0..steps {
            self.step();
        }
        steps
    }

    /// One fixed tick for the map, the readout and the legend.
    pub fn step(&mut self) {
        self.controller.tick();
        self.readout.borrow_mut().tick();
        if let Some(legend) = &mut self.legend {
            legend.tick();
        }
    }

    fn apply(&mut self, event: InputEvent) {
        match event {
            InputEvent::PointerDown { x, y } => self.controller.pointer_down(DVec2::new(x, y)),
            InputEvent::PointerUp { x, y } => self.controller.pointer_up(DVec2::new(x, y)),
            InputEvent::PointerMove { x, y } => self.controller.pointer_move(DVec2::new(x, y)),
            InputEvent::PointerLeave => self.controller.pointer_leave(),
            InputEvent::Unzoom => self.controller.unzoom(),
        }
    }

    /// Pause or resume all display updates. The view keeps tracking input.
    pub fn set_animating(&mut self, animating: bool) {
        self.animating.set(animating);
    }

    pub fn is_animating(&self) -> bool {
        self.animating.get()
    }

    /// Background fade alpha for the map and legend.
    pub fn set_fade_alpha(&mut self, alpha: f32) {
        self.particles.borrow_mut().set_fade_alpha(alpha);
        if let Some(legend) = &mut self.legend {
            legend.set_fade_alpha(alpha);
        }
    }

    pub fn is_zoomed(&self) -> bool {
        self.controller.is_zoomed()
    }

    pub fn view(&self) -> ViewSnapshot {
        self.controller.snapshot()
    }

    /// Hover readout, when the callout should be showing.
    pub fn readout(&self) -> Option<Readout> {
        self.readout.borrow().visible().copied()
    }

    pub fn stats(&self) -> FieldStats {
        self.field.stats()
    }

    /// Download time split into `(time, day)`, if the data carried one.
    pub fn timestamp_parts(&self) -> Option<(String, String)> {
        split_timestamp(self.timestamp.as_deref()?)
    }

    pub fn field(&self) -> &VectorField {
        &self.field
    }

    pub fn projection(&self) -> &dyn Projection {
        self.projection.as_ref()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn particles(&self) -> Ref<'_, ParticleField<C>> {
        self.particles.borrow()
    }

    pub fn labels(&self) -> Option<Ref<'_, LabelLayer<C>>> {
        self.labels.as_ref().map(|l| l.borrow())
    }

    pub fn legend(&self) -> Option<&Legend<C>> {
        self.legend.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::recording::{DrawCommand, RecordingCanvas};

    /// 3x3 grid of eastward wind over the west coast.
    fn field_json() -> String {
        let field: Vec<String> = (0..9).map(|_| "1.0, 0.0".to_string()).collect();
        format!(
            r#"{{ "timestamp": "6:00 am on May 03, 2012",
                 "x0": -140.0, "y0": 25.0, "x1": -100.0, "y1": 55.0,
                 "gridWidth": 3.0, "gridHeight": 3.0,
                 "field": [{}] }}"#,
            field.join(", ")
        )
    }

    fn config() -> SessionConfig {
        SessionConfig {
            particles: ParticleConfig {
                count: 200,
                ..ParticleConfig::default()
            },
            ..SessionConfig::default()
        }
    }

    fn session() -> Session<RecordingCanvas> {
        Session::from_json(&field_json(), RecordingCanvas::new(600.0, 700.0), config()).unwrap()
    }

    fn run(session: &mut Session<RecordingCanvas>, ticks: usize) {
        for _ in 0..ticks {
            session.tick(0.04);
        }
    }

    #[test]
    fn config_from_partial_json() {
        let config = SessionConfig::from_json(r#"{ "tick_ms": 20, "particles": { "count": 3500 } }"#).unwrap();
        assert_eq!(config.tick_ms, 20.0);
        assert_eq!(config.particles.count, 3500);
        assert_eq!(config.particles.speed_scale, 2.5);
        assert_eq!(config.view.zoom_factor, 1.7);
        assert!(config.correct_for_sphere);
    }

    #[test]
    fn bad_field_json_is_an_error() {
        let result = Session::from_json("{ not json", RecordingCanvas::new(10.0, 10.0), config());
        assert!(matches!(result, Err(FieldError::Parse(_))));

        let small = r#"{ "x0": 0, "y0": 0, "x1": 1, "y1": 1, "gridWidth": 1, "gridHeight": 1, "field": [0, 0] }"#;
        let result = Session::from_json(small, RecordingCanvas::new(10.0, 10.0), config());
        assert!(matches!(result, Err(FieldError::GridTooSmall { .. })));
    }

    #[test]
    fn idle_ticks_draw_particles() {
        let mut s = session();
        assert_eq!(s.tick(0.04), 1);
        let p = s.particles();
        assert!(p
            .canvas()
            .commands()
            .iter()
            .any(|c| matches!(c, DrawCommand::FillRect { .. })));
    }

    #[test]
    fn paused_session_draws_nothing() {
        let mut s = session();
        s.set_animating(false);
        run(&mut s, 3);
        assert!(s.particles().canvas().commands().is_empty());
        s.set_animating(true);
        run(&mut s, 1);
        assert!(!s.particles().canvas().commands().is_empty());
    }

    #[test]
    fn click_zooms_and_narrows_sampling() {
        let mut s = session();
        s.push_input(InputEvent::PointerDown { x: 300.0, y: 350.0 });
        s.push_input(InputEvent::PointerUp { x: 300.0, y: 350.0 });
        run(&mut s, 20);
        assert!(s.is_zoomed());
        assert!((s.view().scale() - 1.7).abs() < 1e-12);
        let window = s.particles().window();
        assert!(window.width() < s.field().bounds().width());
        assert_eq!(s.particles().canvas().snapshot_count(), 2);

        s.push_input(InputEvent::Unzoom);
        run(&mut s, 20);
        assert!(!s.is_zoomed());
        assert_eq!(s.particles().window(), s.field().bounds());
    }

    #[test]
    fn hover_readout_after_dwell() {
        let mut s = session();
        let p = s.projection().project(-120.0, 40.0);
        s.push_input(InputEvent::PointerMove { x: p.x, y: p.y });
        run(&mut s, 2);
        assert!(s.readout().is_none());
        run(&mut s, 5);
        let readout = s.readout().unwrap();
        assert!((readout.lon + 120.0).abs() < 1e-6);
        assert!((readout.lat - 40.0).abs() < 1e-6);
        assert!((readout.speed - 10.0 / 11.5).abs() < 1e-9);

        s.push_input(InputEvent::PointerLeave);
        run(&mut s, 1);
        assert!(s.readout().is_none());
    }

    #[test]
    fn readout_follows_the_pointer_through_a_pan() {
        let mut s = session();
        let a = s.projection().project(-120.0, 40.0);
        let b = a + DVec2::new(100.0, 50.0);
        s.push_input(InputEvent::PointerMove { x: a.x, y: a.y });
        run(&mut s, 10);
        assert!(s.readout().is_some());

        s.push_input(InputEvent::PointerDown { x: a.x, y: a.y });
        s.push_input(InputEvent::PointerMove { x: b.x, y: b.y });
        s.push_input(InputEvent::PointerUp { x: b.x, y: b.y });
        run(&mut s, 10);
        let readout = s.readout().unwrap();
        assert_eq!(readout.screen, b);
        assert!((readout.lon + 120.0).abs() < 1e-6);
        assert!((readout.lat - 40.0).abs() < 1e-6);
    }

    #[test]
    fn readout_works_while_paused() {
        let mut s = session();
        s.set_animating(false);
        let p = s.projection().project(-120.0, 40.0);
        s.push_input(InputEvent::PointerMove { x: p.x, y: p.y });
        run(&mut s, 10);
        assert!(s.readout().is_some());
        assert!(s.particles().canvas().commands().is_empty());
    }

    #[test]
    fn labels_and_legend_follow_ticks() {
        let features = vec![Feature::new("Portland", -122.68, 45.52, 583776.0)];
        let legend: Vec<RecordingCanvas> = (0..6).map(|_| RecordingCanvas::new(80.0, 20.0)).collect();
        let mut s = session()
            .with_labels(RecordingCanvas::new(600.0, 700.0), features)
            .with_legend(legend);
        {
            let labels = s.labels().unwrap();
            assert_eq!(labels.alphas(), vec![("Portland", 1.0)]);
        }
        run(&mut s, 1);
        let legend = s.legend().unwrap();
        assert_eq!(legend.panels().len(), 6);
        for panel in legend.panels() {
            assert!(!panel.borrow().canvas().commands().is_empty());
        }
    }

    #[test]
    fn timestamp_and_stats() {
        let s = session();
        let (time, day) = s.timestamp_parts().unwrap();
        assert_eq!(time, "6:00 am");
        assert_eq!(day, "May 3, 2012");
        let stats = s.stats();
        assert!((stats.max_speed - 10.0 / 11.5).abs() < 1e-9);
        assert!(stats.average_speed.is_some());
    }
}
