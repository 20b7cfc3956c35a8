use super::fields;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashSet;

/// Regions and codes that hint at a language.
const LANGUAGE_ALIASES: &[(&str, &[&str])] = &[
    ("portuguese", &["pt", "brazil", "portugal"]),
    ("spanish", &["es", "latin", "spain", "mexico", "argentina"]),
    ("english", &["en", "uk", "us", "au", "ca", "nz"]),
    ("french", &["fr", "france", "paris", "quebec"]),
    ("japanese", &["ja", "japan", "tokyo"]),
    ("arabic", &["ar", "dubai", "doha", "cairo", "saudi"]),
    ("german", &["de", "germany", "berlin", "austria"]),
    ("italian", &["it", "italy", "rome"]),
    ("chinese", &["zh", "mandarin", "hong kong", "china", "taiwan"]),
    ("hindi", &["hi", "india"]),
    ("malayalam", &["ml", "india", "kerala"]),
    ("tamil", &["ta", "india", "sri lanka", "singapore"]),
    ("kannada", &["kn", "india", "karnataka"]),
    ("telugu", &["te", "india", "andhra pradesh"]),
    ("punjabi", &["pa", "india", "pakistan"]),
    ("bengali", &["bn", "india", "bangladesh"]),
    ("marathi", &["mr", "india"]),
    ("gujarati", &["gu", "india"]),
    ("korean", &["ko", "korea"]),
    ("russian", &["ru", "russia"]),
    ("dutch", &["nl", "netherlands"]),
];

const WEIGHT_TAG_MATCH: f64 = 5.0;
const WEIGHT_COUNTRY_MATCH: f64 = 4.0;
const WEIGHT_LANGUAGE_MATCH: f64 = 3.0;
const WEIGHT_BITRATE: f64 = 0.02;
const WEIGHT_VOTE: f64 = 0.01;

/// What the listener asked for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntentMeta {
    pub prompt: Option<String>,
    pub mood: Option<String>,
}

impl IntentMeta {
    pub fn new(prompt: Option<String>, mood: Option<String>) -> Self {
        IntentMeta { prompt, mood }
    }

    fn tokens(&self) -> Vec<String> {
        tokenize(&[self.prompt.as_deref(), self.mood.as_deref()])
    }
}

fn tokenize(values: &[Option<&str>]) -> Vec<String> {
    let joined = values
        .iter()
        .filter_map(|v| *v)
        .filter(|v| !v.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<String>>()
        .join(" ");

    joined
        .split(|c: char| !(c.is_ascii_lowercase() || c.is_ascii_digit()))
        .filter(|token| token.len() > 1)
        .map(String::from)
        .collect()
}

fn tag_set(station: &Value) -> HashSet<String> {
    let mut tags = HashSet::new();
    if let Some(list) = station.get("tagList").and_then(Value::as_array) {
        for tag in list.iter().filter_map(Value::as_str) {
            if !tag.is_empty() {
                tags.insert(tag.to_lowercase());
            }
        }
    }
    if let Some(csv) = fields::string(station, "tags") {
        for tag in fields::split_list(csv) {
            tags.insert(tag.to_lowercase());
        }
    }
    tags
}

fn score_station(station: &Value, tokens: &[String]) -> f64 {
    let mut score = 0.0;

    let tags = tag_set(station);
    let country = fields::string(station, "country").unwrap_or_default().to_lowercase();
    let language = fields::string(station, "language").unwrap_or_default().to_lowercase();

    for token in tokens {
        if tags.contains(token) {
            score += WEIGHT_TAG_MATCH;
        }
        if country.contains(token.as_str()) {
            score += WEIGHT_COUNTRY_MATCH;
        }
        if language.contains(token.as_str()) {
            score += WEIGHT_LANGUAGE_MATCH;
        }

        // token names a language: boost the regions that speak it
        if let Some((_, aliases)) = LANGUAGE_ALIASES.iter().find(|(lang, _)| *lang == token.as_str()) {
            for alias in aliases.iter() {
                if country.contains(alias) || language.contains(alias) {
                    score += WEIGHT_COUNTRY_MATCH;
                }
            }
        }

        // token names a region: boost its languages
        for (lang, aliases) in LANGUAGE_ALIASES {
            if aliases.contains(&token.as_str()) && language.contains(lang) {
                score += WEIGHT_LANGUAGE_MATCH;
            }
        }
    }

    if let Some(bitrate) = fields::number(station, "bitrate") {
        score += bitrate * WEIGHT_BITRATE;
    }
    if let Some(votes) = fields::number(station, "votes") {
        score += votes * WEIGHT_VOTE;
    }

    score
}

/// Orders stations by how well they match the intent, best first. Stations
/// with equal scores keep their relative order. Anything that is not an array
/// yields an empty list.
pub fn rank_stations(stations: &Value, intent: &IntentMeta) -> Vec<Value> {
    let list = match stations.as_array() {
        Some(list) => list,
        None => return vec![],
    };

    let tokens = intent.tokens();
    trace!("rank_stations() {} stations, tokens {:?}", list.len(), tokens);

    let mut scored: Vec<(f64, &Value)> = list
        .iter()
        .map(|station| (score_station(station, &tokens), station))
        .collect();
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
    scored.into_iter().map(|(_, station)| station.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn station(uuid: &str, extra: Value) -> Value {
        let mut base = json!({
            "uuid": uuid,
            "name": "Station",
            "country": "Brazil",
            "language": "Portuguese",
            "tagList": [],
            "tags": null,
            "bitrate": 192,
            "votes": 0,
            "lastCheckOk": true
        });
        if let (Some(base_map), Some(extra_map)) = (base.as_object_mut(), extra.as_object()) {
            for (k, v) in extra_map {
                base_map.insert(k.clone(), v.clone());
            }
        }
        base
    }

    fn uuids(list: &[Value]) -> Vec<&str> {
        list.iter().map(|s| s["uuid"].as_str().unwrap()).collect()
    }

    #[test]
    fn tokenizer() {
        let intent = IntentMeta::new(Some("Psychedelic JAZZ, from Brazil!".into()), Some("a chill-out".into()));
        assert_eq!(
            intent.tokens(),
            vec!["psychedelic", "jazz", "from", "brazil", "chill", "out"]
        );
        assert!(IntentMeta::default().tokens().is_empty());
    }

    #[test]
    fn prompt_keywords_win() {
        let stations = json!([
            station("a", json!({"tagList": ["ambient"], "country": "Iceland"})),
            station("b", json!({"tagList": ["jazz", "psychedelic"], "country": "Brazil"})),
            station("c", json!({"country": "Qatar", "language": "Arabic"})),
        ]);
        let intent = IntentMeta::new(Some("psychedelic jazz from Brazil".into()), None);
        let ranked = rank_stations(&stations, &intent);
        assert_eq!(ranked[0]["uuid"], json!("b"));
        assert_eq!(ranked.len(), 3);
    }

    #[test]
    fn bitrate_breaks_the_tie() {
        let stations = json!([
            station("a", json!({"bitrate": 64})),
            station("b", json!({"bitrate": 320})),
            station("c", json!({"bitrate": 128})),
        ]);
        let intent = IntentMeta::new(Some("classical".into()), None);
        assert_eq!(uuids(&rank_stations(&stations, &intent)), vec!["b", "c", "a"]);
    }

    #[test]
    fn comma_tags_count() {
        let stations = json!([
            station("plain", json!({"bitrate": 128})),
            station("tagged", json!({"tags": "Fado, Lisboa", "bitrate": 64})),
        ]);
        let intent = IntentMeta::new(None, Some("fado".into()));
        assert_eq!(uuids(&rank_stations(&stations, &intent)), vec!["tagged", "plain"]);
    }

    #[test]
    fn language_names_boost_regions() {
        let stations = json!([
            station("fr", json!({"country": "France", "language": "french", "bitrate": 128})),
            station("jp", json!({"country": "Japan", "language": "japanese", "bitrate": 128})),
        ]);
        let intent = IntentMeta::new(Some("japanese".into()), None);
        assert_eq!(uuids(&rank_stations(&stations, &intent)), vec!["jp", "fr"]);
    }

    #[test]
    fn region_names_boost_languages() {
        let stations = json!([
            station("de", json!({"country": "Switzerland", "language": "german", "bitrate": 128})),
            station("it", json!({"country": "Switzerland", "language": "italian", "bitrate": 128})),
        ]);
        let intent = IntentMeta::new(Some("rome".into()), None);
        assert_eq!(uuids(&rank_stations(&stations, &intent)), vec!["it", "de"]);
    }

    #[test]
    fn ties_keep_input_order() {
        let stations = json!([
            {"uuid": "1"},
            {"uuid": "2"},
            {"uuid": "3"},
        ]);
        let ranked = rank_stations(&stations, &IntentMeta::default());
        assert_eq!(uuids(&ranked), vec!["1", "2", "3"]);
    }

    #[test]
    fn non_array_is_empty() {
        assert!(rank_stations(&Value::Null, &IntentMeta::default()).is_empty());
        assert!(rank_stations(&json!({"uuid": "x"}), &IntentMeta::default()).is_empty());
    }
}
