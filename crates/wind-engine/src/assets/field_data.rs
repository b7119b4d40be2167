use serde::{Deserialize, Deserializer, Serialize};

use crate::core::bounds::GeoBounds;

/// Wind field as written by the download scripts.
///
/// `field` holds interleaved `(u, v)` pairs, column-major: all rows of grid
/// column 0 first, then column 1, and so on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldData {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
    /// Written as a float (`501.0`) by the scripts.
    #[serde(deserialize_with = "grid_dimension")]
    pub grid_width: usize,
    #[serde(deserialize_with = "grid_dimension")]
    pub grid_height: usize,
    pub field: Vec<f64>,
    /// Forecast download time, e.g. `"12:00 pm on April 18, 2012"`.
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl FieldData {
    /// Parse field data from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn bounds(&self) -> GeoBounds {
        GeoBounds::new(self.x0, self.y0, self.x1, self.y1)
    }

    /// The timestamp split by [`split_timestamp`].
    pub fn timestamp_parts(&self) -> Option<(String, String)> {
        split_timestamp(self.timestamp.as_deref()?)
    }
}

/// Split a download timestamp into `(time, day)` around the `" on "`
/// separator. Zero-padded day numbers lose their padding ("April 08" -> "April 8").
pub fn split_timestamp(ts: &str) -> Option<(String, String)> {
    let (time, day) = ts.split_once(" on ")?;
    Some((time.trim().to_string(), day.trim().replace(" 0", " ")))
}

fn grid_dimension<'de, D: Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
    let value = f64::deserialize(deserializer)?;
    if value < 0.0 || value.fract() != 0.0 || !value.is_finite() {
        return Err(serde::de::Error::custom(format!(
            "grid dimension must be a non-negative integer, got {}",
            value
        )));
    }
    Ok(value as usize)
}
