use super::fields;
use super::HealthStatus;
use super::Station;
use serde_json::{Number, Value};

const FALLBACK_COUNTRY: &str = "Unknown";

fn trimmed_non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty()).map(String::from)
}

fn first_string(raw: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| fields::string(raw, key))
        .map(String::from)
}

/// Numbers are kept as sent, strings contribute their leading integer, anything else is 0.
fn bitrate(raw: &Value) -> Number {
    match raw.get("bitrate") {
        Some(Value::Number(n)) => n.clone(),
        Some(Value::String(s)) => Number::from(fields::parse_int_prefix(s).unwrap_or(0)),
        _ => Number::from(0),
    }
}

fn stream_health(stream_url: &Option<String>, ssl_error: bool, last_check_ok: bool) -> (bool, Option<HealthStatus>) {
    let is_stream_healthy = stream_url.is_some() && !ssl_error && last_check_ok;

    let mut status = if stream_url.is_none() || ssl_error || !last_check_ok {
        Some(HealthStatus::Warning)
    } else {
        Some(HealthStatus::Good)
    };
    if ssl_error && !last_check_ok {
        status = Some(HealthStatus::Error);
    }
    (is_stream_healthy, status)
}

/// Converts one raw Radio Browser station into a [`Station`].
///
/// Returns `None` when the record has no identifier, no name, or neither a
/// stream url nor a homepage.
pub fn normalize_station(raw: &Value) -> Option<Station> {
    if !raw.is_object() {
        return None;
    }

    let uuid = first_string(raw, &["uuid", "stationuuid", "url"]).filter(|s| !s.is_empty())?;
    let name = fields::string(raw, "name")
        .map(str::trim)
        .filter(|s| !s.is_empty())?
        .to_string();

    let stream_url = trimmed_non_empty(fields::string(raw, "url_resolved"))
        .or_else(|| trimmed_non_empty(fields::string(raw, "url")));
    let homepage = trimmed_non_empty(fields::string(raw, "homepage"));
    if stream_url.is_none() && homepage.is_none() {
        return None;
    }

    let tags = fields::string(raw, "tags").map(String::from);
    let tag_list = tags.as_deref().map(fields::split_list);
    let language_codes = fields::string(raw, "languagecodes").map(fields::split_list);

    let last_check_ok = fields::flag(raw.get("lastcheckok"));
    let ssl_error = fields::flag(raw.get("ssl_error"));
    let (is_stream_healthy, health_status) = stream_health(&stream_url, ssl_error, last_check_ok);

    let country = first_string(raw, &["country", "countrycode"])
        .unwrap_or_else(|| FALLBACK_COUNTRY.to_string());
    let country_code = match fields::string(raw, "countrycode") {
        Some(code) => Some(code.to_string()),
        None => fields::string(raw, "iso_3166_1").map(String::from),
    }
    .filter(|code| !code.is_empty());

    Some(Station {
        uuid,
        name,
        url: stream_url.clone().unwrap_or_default(),
        stream_url,
        favicon: fields::string(raw, "favicon").unwrap_or_default().to_string(),
        country,
        country_code,
        state: non_blank(fields::string(raw, "state")),
        language: non_blank(fields::string(raw, "language")),
        language_codes,
        tags,
        tag_list,
        bitrate: bitrate(raw),
        codec: fields::string(raw, "codec").map(String::from),
        homepage,
        hls: fields::flag(raw.get("hls")),
        last_check_ok,
        last_check_ok_time: first_string(raw, &["lastcheckoktime_iso8601", "lastcheckoktime"]),
        last_check_time: first_string(raw, &["lastchecktime_iso8601", "lastchecktime"]),
        last_local_check_time: first_string(raw, &["lastlocalchecktime_iso8601", "lastlocalchecktime"]),
        ssl_error,
        votes: fields::loose_number(raw.get("votes")),
        click_count: fields::loose_number(raw.get("clickcount")),
        click_trend: fields::loose_number(raw.get("clicktrend")),
        is_stream_healthy,
        health_status,
    })
}

/// Normalizes a JSON array of raw stations, dropping the unusable ones.
pub fn normalize_stations(raw: &Value) -> Vec<Station> {
    match raw.as_array() {
        Some(list) => list.iter().filter_map(normalize_station).collect(),
        None => vec![],
    }
}
