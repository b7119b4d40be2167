//! Hover callout: wind speed and position under a resting pointer.

use std::rc::Rc;

use glam::DVec2;

use crate::core::field::{VectorField, DISPLAY_SPEED_DIVISOR};
use crate::core::projection::Projection;
use crate::systems::view::{ViewListener, ViewSnapshot};

/// What the callout shows for one pointer position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Readout {
    /// Screen position of the pointer.
    pub screen: DVec2,
    pub lon: f64,
    pub lat: f64,
    /// Wind speed in m/s. Zero outside the field.
    pub speed: f64,
}

impl Readout {
    pub fn speed_text(&self) -> String {
        format!("{} m/s", format_speed(self.speed))
    }

    pub fn position_text(&self) -> String {
        format!(
            "{}, {}",
            format_degrees(self.lat, 'N', 'S'),
            format_degrees(self.lon, 'E', 'W')
        )
    }

    /// Callout lines, top to bottom.
    pub fn lines(&self) -> [String; 3] {
        [
            format!("{} current speed", self.speed_text()),
            self.position_text(),
            "click to zoom".to_string(),
        ]
    }
}

/// Speed rounded to one decimal.
pub fn format_speed(speed: f64) -> String {
    format!("{:.1}", (speed * 10.0).round() / 10.0)
}

/// Degrees and zero-padded minutes with a hemisphere letter, e.g. `42° 08'N`.
pub fn format_degrees(value: f64, positive: char, negative: char) -> String {
    let total = (value.abs() * 60.0).round() as u64;
    let hemisphere = if value < 0.0 && total > 0 { negative } else { positive };
    format!("{}° {:02}'{}", total / 60, total % 60, hemisphere)
}

/// Tracks the pointer and decides when the callout is visible.
///
/// The callout appears once the pointer has rested for `dwell_ticks` ticks
/// over a point with nonzero wind, and hides on any movement, press, or
/// when the pointer leaves the map.
pub struct HoverReadout {
    field: Rc<VectorField>,
    projection: Rc<dyn Projection>,
    dwell_ticks: u32,
    still_ticks: u32,
    last_pointer: Option<DVec2>,
    current: Option<Readout>,
}

impl HoverReadout {
    pub fn new(field: Rc<VectorField>, projection: Rc<dyn Projection>, dwell_ticks: u32) -> Self {
        Self {
            field,
            projection,
            dwell_ticks,
            still_ticks: 0,
            last_pointer: None,
            current: None,
        }
    }

    /// Readout for screen point `p` under the view's transform.
    pub fn probe(&self, view: &ViewSnapshot, p: DVec2) -> Readout {
        let map = view.transform.invert(p);
        let geo = self.projection.invert(map.x, map.y);
        let speed = if self.field.in_bounds(geo.x, geo.y) {
            self.field.sample_at(geo).length() / DISPLAY_SPEED_DIVISOR
        } else {
            0.0
        };
        Readout {
            screen: p,
            lon: geo.x,
            lat: geo.y,
            speed,
        }
    }

    /// Count one tick of the pointer resting.
    pub fn tick(&mut self) {
        self.still_ticks = self.still_ticks.saturating_add(1);
    }

    pub fn is_visible(&self) -> bool {
        self.still_ticks >= self.dwell_ticks && self.current.is_some_and(|r| r.speed != 0.0)
    }

    /// The callout contents when visible.
    pub fn visible(&self) -> Option<&Readout> {
        if self.is_visible() {
            self.current.as_ref()
        } else {
            None
        }
    }

    /// The latest probe, shown or not.
    pub fn current(&self) -> Option<&Readout> {
        self.current.as_ref()
    }

    fn reset(&mut self) {
        self.still_ticks = 0;
    }

    fn follow(&mut self, view: &ViewSnapshot, p: DVec2) {
        self.last_pointer = Some(p);
        self.reset();
        self.current = Some(self.probe(view, p));
    }
}

impl ViewListener for HoverReadout {
    fn on_start_move(&mut self, _view: &ViewSnapshot) {
        self.reset();
    }

    /// The map moved under the pointer, so the old probe no longer applies.
    fn on_end_move(&mut self, view: &ViewSnapshot) {
        if let Some(p) = view.pointer {
            self.follow(view, p);
        }
    }

    fn on_hover(&mut self, view: &ViewSnapshot) {
        match view.pointer {
            Some(p) => {
                if self.last_pointer != Some(p) {
                    self.follow(view, p);
                }
            }
            None => {
                self.last_pointer = None;
                self.current = None;
                self.reset();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bounds::GeoBounds;
    use crate::core::projection::Identity;
    use crate::systems::view::{ViewController, ViewTransform};
    use std::cell::RefCell;

    fn readout() -> HoverReadout {
        // 11.5 field units per m/s.
        let field = VectorField::constant(DVec2::new(0.0, 34.5), GeoBounds::new(0.0, 0.0, 100.0, 100.0));
        HoverReadout::new(Rc::new(field), Rc::new(Identity), 5)
    }

    fn hover(at: Option<DVec2>) -> ViewSnapshot {
        ViewSnapshot {
            pointer: at,
            ..ViewSnapshot::at_rest(ViewTransform::IDENTITY)
        }
    }

    #[test]
    fn formats_degrees_and_minutes() {
        assert_eq!(format_degrees(42.129, 'N', 'S'), "42° 08'N");
        assert_eq!(format_degrees(-80.085, 'E', 'W'), "80° 05'W");
        assert_eq!(format_degrees(37.0, 'N', 'S'), "37° 00'N");
        assert_eq!(format_degrees(-0.001, 'E', 'W'), "0° 00'E");
    }

    #[test]
    fn formats_speed_with_one_decimal() {
        assert_eq!(format_speed(3.0), "3.0");
        assert_eq!(format_speed(12.345), "12.3");
    }

    #[test]
    fn probe_inverts_the_view() {
        let r = readout();
        let view = ViewSnapshot::at_rest(ViewTransform::new(2.0, DVec2::new(10.0, 0.0)));
        let probe = r.probe(&view, DVec2::new(30.0, 40.0));
        assert_eq!((probe.lon, probe.lat), (10.0, 20.0));
        assert!((probe.speed - 3.0).abs() < 1e-12);
        assert_eq!(probe.speed_text(), "3.0 m/s");
    }

    #[test]
    fn shows_after_dwell() {
        let mut r = readout();
        r.on_hover(&hover(Some(DVec2::new(50.0, 50.0))));
        for _ in 0..4 {
            r.tick();
        }
        assert!(r.visible().is_none());
        r.tick();
        let shown = r.visible().unwrap();
        assert_eq!(shown.lines()[2], "click to zoom");

        // Same position again does not restart the dwell.
        r.on_hover(&hover(Some(DVec2::new(50.0, 50.0))));
        assert!(r.is_visible());
        r.on_hover(&hover(Some(DVec2::new(51.0, 50.0))));
        assert!(!r.is_visible());
    }

    #[test]
    fn follows_the_pointer_after_a_pan() {
        let r = Rc::new(RefCell::new(readout()));
        let mut view = ViewController::default();
        view.add_listener(r.clone());

        let a = DVec2::new(30.0, 30.0);
        view.pointer_move(a);
        view.pointer_down(a);
        view.pointer_move(a + DVec2::new(40.0, 20.0));
        view.pointer_up(a + DVec2::new(40.0, 20.0));
        for _ in 0..10 {
            r.borrow_mut().tick();
        }

        let r = r.borrow();
        let shown = r.visible().unwrap();
        assert_eq!(shown.screen, DVec2::new(70.0, 50.0));
        // The map moved with the pointer, so the geography under it is unchanged.
        assert_eq!((shown.lon, shown.lat), (30.0, 30.0));
    }

    #[test]
    fn re_probes_when_a_zoom_ends() {
        let mut r = readout();
        let p = DVec2::new(40.0, 40.0);
        r.on_hover(&hover(Some(p)));
        let zoomed = ViewSnapshot {
            pointer: Some(p),
            ..ViewSnapshot::at_rest(ViewTransform::new(2.0, DVec2::ZERO))
        };
        r.on_end_move(&zoomed);
        assert_eq!(r.current().unwrap().lon, 20.0);
        assert!(!r.is_visible());
    }

    #[test]
    fn hides_outside_the_field_and_on_leave() {
        let mut r = readout();
        r.on_hover(&hover(Some(DVec2::new(150.0, 50.0))));
        for _ in 0..10 {
            r.tick();
        }
        assert!(!r.is_visible());
        assert_eq!(r.current().unwrap().speed, 0.0);

        r.on_hover(&hover(Some(DVec2::new(20.0, 20.0))));
        for _ in 0..10 {
            r.tick();
        }
        assert!(r.is_visible());
        r.on_hover(&hover(None));
        assert!(!r.is_visible());
        assert!(r.current().is_none());
    }
}
