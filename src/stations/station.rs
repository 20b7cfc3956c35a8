use super::HealthStatus;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// Station in the shape the front-end consumes.
#[derive(PartialEq, Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    pub uuid: String,
    pub name: String,
    pub url: String,
    pub stream_url: Option<String>,
    pub favicon: String,
    pub country: String,
    pub country_code: Option<String>,
    pub state: Option<String>,
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language_codes: Option<Vec<String>>,
    pub tags: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_list: Option<Vec<String>>,
    pub bitrate: Number,
    pub codec: Option<String>,
    pub homepage: Option<String>,
    pub hls: bool,
    pub last_check_ok: bool,
    pub last_check_ok_time: Option<String>,
    pub last_check_time: Option<String>,
    pub last_local_check_time: Option<String>,
    pub ssl_error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub votes: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub click_count: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub click_trend: Option<Number>,
    pub is_stream_healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_status: Option<HealthStatus>,
}

#[derive(PartialEq, Eq, Serialize, Deserialize, Debug, Clone)]
pub struct Country {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub iso_3166_1: String,
    #[serde(default)]
    pub stationcount: u32,
    /// Upstream fields passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(PartialEq, Eq, Serialize, Deserialize, Debug, Clone)]
pub struct LanguageSummary {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub stationcount: u32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(PartialEq, Eq, Serialize, Deserialize, Debug, Clone)]
pub struct TagSummary {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub stationcount: u32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
