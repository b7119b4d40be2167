use std::f64::consts::TAU;

use glam::DVec2;
use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, Document, HtmlCanvasElement};
use wind_engine::{Canvas, Rgba, TextStyle};

use crate::error::WebError;

/// A canvas element and its 2d context.
struct Surface {
    element: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
}

impl Surface {
    fn new(element: HtmlCanvasElement, id: &str) -> Result<Self, WebError> {
        let ctx = element
            .get_context("2d")?
            .ok_or_else(|| WebError::NoContext(id.to_string()))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| WebError::NoContext(id.to_string()))?;
        Ok(Self { element, ctx })
    }
}

/// [`Canvas`] over a browser `<canvas>` element.
///
/// Snapshots go to a second canvas of the same size, either one named on the
/// page or an offscreen one created on demand.
pub struct WebCanvas {
    main: Surface,
    snapshot: Option<Surface>,
    document: Document,
}

impl WebCanvas {
    /// Look up `<canvas id=...>` in `document`.
    pub fn from_id(document: &Document, id: &str) -> Result<Self, WebError> {
        let element = canvas_by_id(document, id)?;
        Ok(Self {
            main: Surface::new(element, id)?,
            snapshot: None,
            document: document.clone(),
        })
    }

    /// Use the page canvas `id` as the snapshot buffer.
    pub fn with_snapshot_canvas(mut self, id: &str) -> Result<Self, WebError> {
        let element = canvas_by_id(&self.document, id)?;
        self.snapshot = Some(Surface::new(element, id)?);
        Ok(self)
    }

    pub fn element(&self) -> &HtmlCanvasElement {
        &self.main.element
    }

    fn snapshot_surface(&mut self) -> Result<&Surface, WebError> {
        if self.snapshot.is_none() {
            let element = self
                .document
                .create_element("canvas")?
                .dyn_into::<HtmlCanvasElement>()
                .map_err(|_| WebError::NotACanvas("offscreen".to_string()))?;
            element.set_width(self.main.element.width());
            element.set_height(self.main.element.height());
            self.snapshot = Some(Surface::new(element, "offscreen")?);
        }
        self.snapshot
            .as_ref()
            .ok_or_else(|| WebError::NoContext("offscreen".to_string()))
    }

    fn try_save_snapshot(&mut self) -> Result<(), WebError> {
        let w = self.width();
        let h = self.height();
        let main = self.main.element.clone();
        let snap = self.snapshot_surface()?;
        snap.ctx.clear_rect(0.0, 0.0, w, h);
        snap.ctx.draw_image_with_html_canvas_element(&main, 0.0, 0.0)?;
        Ok(())
    }
}

fn canvas_by_id(document: &Document, id: &str) -> Result<HtmlCanvasElement, WebError> {
    document
        .get_element_by_id(id)
        .ok_or_else(|| WebError::MissingElement(id.to_string()))?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|_| WebError::NotACanvas(id.to_string()))
}

fn report(result: Result<(), WebError>, what: &str) {
    if let Err(err) = result {
        log::warn!("{}: {}", what, err);
    }
}

impl Canvas for WebCanvas {
    fn width(&self) -> f64 {
        self.main.element.width() as f64
    }

    fn height(&self) -> f64 {
        self.main.element.height() as f64
    }

    fn clear(&mut self) {
        self.main.ctx.clear_rect(0.0, 0.0, self.width(), self.height());
    }

    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: Rgba) {
        self.main.ctx.set_fill_style_str(&color.to_css());
        self.main.ctx.fill_rect(x, y, w, h);
    }

    fn stroke_line(&mut self, from: DVec2, to: DVec2, width: f64, color: Rgba) {
        let ctx = &self.main.ctx;
        ctx.set_line_width(width);
        ctx.set_stroke_style_str(&color.to_css());
        ctx.begin_path();
        ctx.move_to(from.x, from.y);
        ctx.line_to(to.x, to.y);
        ctx.stroke();
    }

    fn draw_marker(&mut self, center: DVec2, radius: f64, fill: Rgba, stroke: Rgba) {
        let ctx = &self.main.ctx;
        ctx.begin_path();
        let drawn = ctx.arc(center.x, center.y, radius, 0.0, TAU);
        ctx.close_path();
        ctx.set_fill_style_str(&fill.to_css());
        ctx.fill();
        ctx.set_stroke_style_str(&stroke.to_css());
        ctx.stroke();
        report(drawn.map_err(WebError::from), "marker");
    }

    fn fill_text(&mut self, text: &str, anchor: DVec2, style: &TextStyle, color: Rgba) {
        let ctx = &self.main.ctx;
        ctx.set_font(&style.font);
        ctx.set_text_align("center");
        ctx.set_fill_style_str(&color.to_css());
        report(ctx.fill_text(text, anchor.x, anchor.y).map_err(WebError::from), "text");
    }

    fn measure_text(&self, text: &str, style: &TextStyle) -> f64 {
        self.main.ctx.set_font(&style.font);
        match self.main.ctx.measure_text(text) {
            Ok(metrics) => metrics.width(),
            Err(err) => {
                log::warn!("measure_text: {}", WebError::from(err));
                0.0
            }
        }
    }

    fn save_snapshot(&mut self) {
        let result = self.try_save_snapshot();
        report(result, "save snapshot");
    }

    fn draw_snapshot(&mut self, x: f64, y: f64, w: f64, h: f64) {
        let Some(snap) = &self.snapshot else {
            return;
        };
        let result = self
            .main
            .ctx
            .draw_image_with_html_canvas_element_and_dw_and_dh(&snap.element, x, y, w, h);
        report(result.map_err(WebError::from), "draw snapshot");
    }
}
