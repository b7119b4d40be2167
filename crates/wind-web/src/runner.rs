use std::cell::RefCell;
use std::rc::Rc;

use serde::Deserialize;
use wasm_bindgen::JsCast;
use web_sys::HtmlElement;
use wind_engine::systems::readout::format_speed;
use wind_engine::{Feature, InputEvent, Session, SessionConfig};

use crate::canvas::WebCanvas;
use crate::error::WebError;
use crate::mask::MapMask;

/// Page element ids and engine configuration, passed as JSON to `map_init`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MapSetup {
    /// Particle canvas.
    pub display: String,
    /// Canvas used to hold the screen while panning. Offscreen when absent.
    pub snapshot: Option<String>,
    /// Label canvas. No labels when absent.
    pub labels: Option<String>,
    /// Legend canvases, slowest speed first.
    pub legend: Vec<String>,
    pub mask: Option<MaskSetup>,
    pub config: SessionConfig,
}

impl Default for MapSetup {
    fn default() -> Self {
        Self {
            display: "display".to_string(),
            snapshot: None,
            labels: None,
            legend: Vec::new(),
            mask: None,
            config: SessionConfig::default(),
        }
    }
}

/// Overlay image kept aligned with the map.
#[derive(Debug, Clone, Deserialize)]
pub struct MaskSetup {
    pub id: String,
    pub width: f64,
    pub height: f64,
}

impl MapSetup {
    pub fn from_json(json: &str) -> Result<Self, WebError> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(json)?)
    }
}

/// Owns the session and the page bindings.
///
/// wasm-bindgen cannot export generic structs, so `lib.rs` keeps one runner
/// in a `thread_local!` and exports free functions over it.
pub struct MapRunner {
    session: Session<WebCanvas>,
}

impl MapRunner {
    pub fn new(field_json: &str, features_json: &str, setup: MapSetup) -> Result<Self, WebError> {
        let window = web_sys::window().ok_or(WebError::NoWindow)?;
        let document = window.document().ok_or(WebError::NoDocument)?;

        let mut display = WebCanvas::from_id(&document, &setup.display)?;
        if let Some(id) = &setup.snapshot {
            display = display.with_snapshot_canvas(id)?;
        }
        let mut session = Session::from_json(field_json, display, setup.config.clone())?;

        if let Some(id) = &setup.labels {
            let features = Feature::list_from_json(features_json)?;
            log::info!("{} label features", features.len());
            session = session.with_labels(WebCanvas::from_id(&document, id)?, features);
        }

        if !setup.legend.is_empty() {
            let canvases = setup
                .legend
                .iter()
                .map(|id| WebCanvas::from_id(&document, id))
                .collect::<Result<Vec<_>, _>>()?;
            session = session.with_legend(canvases);
        }

        if let Some(mask) = &setup.mask {
            let element = document
                .get_element_by_id(&mask.id)
                .ok_or_else(|| WebError::MissingElement(mask.id.clone()))?
                .dyn_into::<HtmlElement>()
                .map_err(|_| WebError::MissingElement(mask.id.clone()))?;
            session.add_listener(Rc::new(RefCell::new(MapMask::new(element, mask.width, mask.height))));
        }

        Ok(Self { session })
    }

    pub fn push_input(&mut self, event: InputEvent) {
        self.session.push_input(event);
    }

    /// Run one frame. `dt` is elapsed wall time in seconds.
    pub fn tick(&mut self, dt: f64) {
        self.session.tick(dt);
    }

    pub fn set_animating(&mut self, animating: bool) {
        self.session.set_animating(animating);
    }

    pub fn set_fade_alpha(&mut self, alpha: f32) {
        self.session.set_fade_alpha(alpha);
    }

    pub fn is_zoomed(&self) -> bool {
        self.session.is_zoomed()
    }

    /// Callout lines joined by newlines, while the callout is showing.
    pub fn readout_text(&self) -> Option<String> {
        self.session.readout().map(|r| r.lines().join("\n"))
    }

    /// Screen position of the callout, or empty when hidden.
    pub fn readout_anchor(&self) -> Vec<f64> {
        self.session
            .readout()
            .map(|r| vec![r.screen.x, r.screen.y])
            .unwrap_or_default()
    }

    /// Top and average speed for the page header.
    pub fn stats_text(&self) -> String {
        let stats = self.session.stats();
        match stats.average_speed {
            Some(avg) => format!(
                "top speed: {} m/s\naverage: {} m/s",
                format_speed(stats.max_speed),
                format_speed(avg)
            ),
            None => format!("top speed: {} m/s", format_speed(stats.max_speed)),
        }
    }

    /// Download time as `day\ntime`.
    pub fn timestamp_text(&self) -> Option<String> {
        self.session
            .timestamp_parts()
            .map(|(time, day)| format!("{}\n{}", day, time))
    }
}
