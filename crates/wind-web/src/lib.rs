pub mod canvas;
pub mod error;
pub mod mask;
pub mod runner;

pub use canvas::WebCanvas;
pub use error::WebError;
pub use mask::MapMask;
pub use runner::{MapRunner, MapSetup};

use std::cell::RefCell;

use wasm_bindgen::prelude::*;
use wind_engine::InputEvent;

thread_local! {
    static RUNNER: RefCell<Option<MapRunner>> = const { RefCell::new(None) };
}

fn with_runner<R>(f: impl FnOnce(&mut MapRunner) -> R) -> R {
    RUNNER.with(|cell| {
        let mut borrow = cell.borrow_mut();
        let runner = borrow.as_mut().expect("Map not initialized. Call map_init() first.");
        f(runner)
    })
}

/// Build the map from field data JSON, label features JSON and a
/// [`MapSetup`] JSON (empty for defaults).
#[wasm_bindgen]
pub fn map_init(field_json: &str, features_json: &str, setup_json: &str) -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);

    let setup = MapSetup::from_json(setup_json)?;
    let runner = MapRunner::new(field_json, features_json, setup)?;
    RUNNER.with(|cell| {
        *cell.borrow_mut() = Some(runner);
    });
    log::info!("wind map: initialized");
    Ok(())
}

/// Advance by `dt` seconds of wall time.
#[wasm_bindgen]
pub fn map_tick(dt: f64) {
    with_runner(|r| r.tick(dt));
}

#[wasm_bindgen]
pub fn map_pointer_down(x: f64, y: f64) {
    with_runner(|r| r.push_input(InputEvent::PointerDown { x, y }));
}

#[wasm_bindgen]
pub fn map_pointer_up(x: f64, y: f64) {
    with_runner(|r| r.push_input(InputEvent::PointerUp { x, y }));
}

#[wasm_bindgen]
pub fn map_pointer_move(x: f64, y: f64) {
    with_runner(|r| r.push_input(InputEvent::PointerMove { x, y }));
}

#[wasm_bindgen]
pub fn map_pointer_leave() {
    with_runner(|r| r.push_input(InputEvent::PointerLeave));
}

#[wasm_bindgen]
pub fn map_unzoom() {
    with_runner(|r| r.push_input(InputEvent::Unzoom));
}

#[wasm_bindgen]
pub fn map_set_animating(animating: bool) {
    with_runner(|r| r.set_animating(animating));
}

#[wasm_bindgen]
pub fn map_set_fade_alpha(alpha: f32) {
    with_runner(|r| r.set_fade_alpha(alpha));
}

// ---- Page readouts ----

/// Whether the unzoom button should be shown.
#[wasm_bindgen]
pub fn map_is_zoomed() -> bool {
    with_runner(|r| r.is_zoomed())
}

#[wasm_bindgen]
pub fn map_readout_text() -> Option<String> {
    with_runner(|r| r.readout_text())
}

#[wasm_bindgen]
pub fn map_readout_anchor() -> Vec<f64> {
    with_runner(|r| r.readout_anchor())
}

#[wasm_bindgen]
pub fn map_stats_text() -> String {
    with_runner(|r| r.stats_text())
}

#[wasm_bindgen]
pub fn map_timestamp_text() -> Option<String> {
    with_runner(|r| r.timestamp_text())
}
