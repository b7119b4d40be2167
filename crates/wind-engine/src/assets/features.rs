use serde::{Deserialize, Serialize};

/// A labeled point on the map (a city, usually).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(alias = "city")]
    pub name: String,
    #[serde(default)]
    pub state: Option<String>,
    pub lon: f64,
    pub lat: f64,
    /// Placement priority. Population for cities, though not always.
    #[serde(alias = "pop")]
    pub weight: f64,
}

impl Feature {
    pub fn new(name: impl Into<String>, lon: f64, lat: f64, weight: f64) -> Self {
        Self {
            name: name.into(),
            state: None,
            lon,
            lat,
            weight,
        }
    }

    /// Parse a JSON array of features.
    pub fn list_from_json(json: &str) -> Result<Vec<Self>, serde_json::Error> {
        serde_json::from_str(json)
    }
}
