//! Station health scoring.
//!
//! Every station gets a composite score in 0..=100 built from its bitrate,
//! its vote count and the result of the last stream check, plus a three way
//! classification of that score.

use super::fields;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const BITRATE_FULL_SCORE: f64 = 256.0;
const VOTES_FULL_SCORE: f64 = 100.0;

/// Score used when a station reports no usable bitrate.
const UNKNOWN_BITRATE_SCORE: f64 = 0.4;
/// Score used when a station reports no usable vote count.
const UNKNOWN_VOTES_SCORE: f64 = 0.0;

const RELIABILITY_OK: f64 = 1.0;
const RELIABILITY_FAILED: f64 = 0.5;

const WEIGHT_BITRATE: f64 = 0.5;
const WEIGHT_VOTES: f64 = 0.1;
const WEIGHT_RELIABILITY: f64 = 0.4;

const GOOD_MIN_SCORE: u8 = 70;
const ERROR_MAX_SCORE: u8 = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Good,
    Warning,
    Error,
}

impl HealthStatus {
    /// 70 and above is good, 40 and below is error.
    pub fn from_score(score: u8) -> Self {
        if score >= GOOD_MIN_SCORE {
            HealthStatus::Good
        } else if score <= ERROR_MAX_SCORE {
            HealthStatus::Error
        } else {
            HealthStatus::Warning
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Good => "good",
            HealthStatus::Warning => "warning",
            HealthStatus::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthReport {
    pub is_likely_up: bool,
    pub health_score: u8,
    pub health_status: HealthStatus,
}

impl HealthReport {
    pub fn assess(bitrate: Option<f64>, votes: Option<f64>, last_check_ok: bool) -> Self {
        let bitrate_score = bitrate
            .map(|b| (b / BITRATE_FULL_SCORE).clamp(0.0, 1.0))
            .unwrap_or(UNKNOWN_BITRATE_SCORE);
        let vote_score = votes
            .map(|v| (v / VOTES_FULL_SCORE).clamp(0.0, 1.0))
            .unwrap_or(UNKNOWN_VOTES_SCORE);
        let reliability = if last_check_ok {
            RELIABILITY_OK
        } else {
            RELIABILITY_FAILED
        };

        let composite = (bitrate_score * WEIGHT_BITRATE
            + vote_score * WEIGHT_VOTES
            + reliability * WEIGHT_RELIABILITY)
            * 100.0;
        let health_score = composite.round().clamp(0.0, 100.0) as u8;

        HealthReport {
            is_likely_up: last_check_ok,
            health_score,
            health_status: HealthStatus::from_score(health_score),
        }
    }

    /// Reads `bitrate`, `votes` and `lastCheckOk` from a JSON station record.
    /// A missing or null `lastCheckOk` counts as a passed check.
    pub fn for_record(record: &Value) -> Self {
        let last_check_ok = fields::present(record, "lastCheckOk")
            .map(fields::truthy)
            .unwrap_or(true);
        HealthReport::assess(
            fields::number(record, "bitrate"),
            fields::number(record, "votes"),
            last_check_ok,
        )
    }

    fn apply(&self, record: &mut Map<String, Value>) {
        record.insert("isLikelyUp".to_string(), Value::Bool(self.is_likely_up));
        record.insert("healthScore".to_string(), Value::from(self.health_score));
        record.insert(
            "healthStatus".to_string(),
            Value::String(self.health_status.as_str().to_string()),
        );
    }
}

/// Annotates every station of a JSON array with `isLikelyUp`, `healthScore`
/// and `healthStatus`. All other fields are copied through. Anything that is
/// not an array yields an empty list.
pub fn annotate_health(stations: &Value) -> Vec<Value> {
    let list = match stations.as_array() {
        Some(list) => list,
        None => return vec![],
    };

    list.iter().map(annotate_record).collect()
}

fn annotate_record(record: &Value) -> Value {
    let report = HealthReport::for_record(record);
    let mut annotated = match record {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    report.apply(&mut annotated);
    Value::Object(annotated)
}
