use web_sys::HtmlElement;
use wind_engine::{ViewListener, ViewSnapshot};

use crate::error::WebError;

/// Keeps an overlay image (coastlines, borders) aligned with the view by
/// resizing and moving it on every view change.
pub struct MapMask {
    element: HtmlElement,
    /// Unscaled size in pixels.
    width: f64,
    height: f64,
}

impl MapMask {
    pub fn new(element: HtmlElement, width: f64, height: f64) -> Self {
        Self {
            element,
            width,
            height,
        }
    }

    fn place(&self, view: &ViewSnapshot) -> Result<(), WebError> {
        let style = self.element.style();
        let scale = view.scale();
        let offset = view.offset();
        style.set_property("width", &format!("{}px", (scale * self.width).trunc()))?;
        style.set_property("height", &format!("{}px", (scale * self.height).trunc()))?;
        style.set_property("left", &format!("{}px", offset.x))?;
        style.set_property("top", &format!("{}px", offset.y))?;
        Ok(())
    }

    fn update(&self, view: &ViewSnapshot) {
        if let Err(err) = self.place(view) {
            log::warn!("map mask: {}", err);
        }
    }
}

impl ViewListener for MapMask {
    fn on_move(&mut self, view: &ViewSnapshot) {
        self.update(view);
    }

    fn on_end_move(&mut self, view: &ViewSnapshot) {
        self.update(view);
    }
}
