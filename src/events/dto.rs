use serde::Deserialize;

use super::model::Event;

#[derive(Debug, Deserialize)]
pub struct LocationInput {
    #[serde(default)]
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Create payload. Missing fields default to empty so the validator can
/// report every problem at once instead of failing on decode.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub location: Option<LocationInput>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub max_attendees: Option<i64>,
}

#[derive(Debug, serde::Serialize)]
pub struct EventResponse {
    pub message: String,
    pub event: Event,
}
