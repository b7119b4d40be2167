use thiserror::Error;
use wasm_bindgen::JsValue;
use wind_engine::FieldError;

/// Failures while binding the map to the page.
#[derive(Debug, Error)]
pub enum WebError {
    #[error("no global window")]
    NoWindow,
    #[error("window has no document")]
    NoDocument,
    #[error("element #{0} not found")]
    MissingElement(String),
    #[error("element #{0} is not a canvas")]
    NotACanvas(String),
    #[error("canvas #{0} has no 2d context")]
    NoContext(String),
    #[error("browser call failed: {0}")]
    Js(String),
    #[error(transparent)]
    Field(#[from] FieldError),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<JsValue> for WebError {
    fn from(value: JsValue) -> Self {
        WebError::Js(value.as_string().unwrap_or_else(|| format!("{:?}", value)))
    }
}

impl From<WebError> for JsValue {
    fn from(err: WebError) -> Self {
        js_sys::Error::new(&err.to_string()).into()
    }
}
