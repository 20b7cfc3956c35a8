use super::CatalogError;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use std::error::Error;
use std::sync::Mutex;
use std::time::Duration;

/// Community mirrors, loosely ordered by reliability and geographic spread.
pub const DEFAULT_MIRRORS: &[&str] = &[
    "https://de2.api.radio-browser.info",
    "https://fi1.api.radio-browser.info",
    "https://de1.api.radio-browser.info",
    "https://fr1.api.radio-browser.info",
    "https://nl1.api.radio-browser.info",
    "https://gb1.api.radio-browser.info",
    "https://us1.api.radio-browser.info",
];

/// Round robin name, only asked when every mirror failed.
pub const DEFAULT_FALLBACK_SERVER: &str = "https://api.radio-browser.info";

/// Anything that answers Radio Browser style JSON paths like `/json/countries`.
pub trait CatalogSource: Send + Sync {
    fn fetch_json(&self, path: &str) -> Result<Value, CatalogError>;
}

pub struct RadioBrowserClient {
    client: Client,
    mirrors: Vec<String>,
    fallback: String,
    preferred: Mutex<Option<String>>,
}

impl RadioBrowserClient {
    pub fn new(
        useragent: &str,
        tcp_timeout: Duration,
        mirrors: Vec<String>,
        fallback: String,
    ) -> Result<Self, Box<dyn Error>> {
        let client = Client::builder()
            .user_agent(useragent)
            .timeout(tcp_timeout)
            .build()?;
        Ok(RadioBrowserClient {
            client,
            mirrors,
            fallback,
            preferred: Mutex::new(None),
        })
    }

    /// Mirror that answered last, if any.
    pub fn preferred_mirror(&self) -> Option<String> {
        match self.preferred.lock() {
            Ok(preferred) => preferred.clone(),
            Err(err) => {
                error!("Unable to lock preferred mirror: {}", err);
                None
            }
        }
    }

    fn fetch_from(&self, base: &str, path: &str) -> Result<Value, CatalogError> {
        let url = format!("{}{}", base.trim_end_matches('/'), path);
        trace!("GET {}", url);
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|err| CatalogError::Http(url.clone(), err.to_string()))?;

        if !response.status().is_success() {
            return Err(CatalogError::Http(url, format!("status {}", response.status())));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        if !content_type.contains("application/json") {
            return Err(CatalogError::Decode(
                url,
                format!("unexpected content type '{}'", content_type),
            ));
        }

        let value: Value = response
            .json()
            .map_err(|err| CatalogError::Decode(url.clone(), err.to_string()))?;
        if value.is_null() {
            return Err(CatalogError::Decode(url, String::from("empty answer")));
        }
        Ok(value)
    }
}

impl CatalogSource for RadioBrowserClient {
    fn fetch_json(&self, path: &str) -> Result<Value, CatalogError> {
        fetch_with_fallback(&self.preferred, &self.mirrors, &self.fallback, path, |base| {
            self.fetch_from(base, path)
        })
    }
}

/// Asks the preferred mirror first, then the remaining mirrors in order, then
/// the fallback server. A mirror that answers becomes the preferred one.
fn fetch_with_fallback<F>(
    preferred: &Mutex<Option<String>>,
    mirrors: &[String],
    fallback: &str,
    path: &str,
    fetch: F,
) -> Result<Value, CatalogError>
where
    F: Fn(&str) -> Result<Value, CatalogError>,
{
    let cached: Option<String> = match preferred.lock() {
        Ok(preferred) => preferred.clone(),
        Err(err) => {
            error!("Unable to lock preferred mirror: {}", err);
            None
        }
    };

    if let Some(ref base) = cached {
        match fetch(base) {
            Ok(value) => return Ok(value),
            Err(err) => debug!("preferred mirror failed: {}", err),
        }
    }

    for base in mirrors {
        if cached.as_ref() == Some(base) {
            continue;
        }
        match fetch(base) {
            Ok(value) => {
                match preferred.lock() {
                    Ok(mut preferred) => {
                        *preferred = Some(base.clone());
                    }
                    Err(err) => {
                        error!("Unable to lock preferred mirror: {}", err);
                    }
                }
                return Ok(value);
            }
            Err(err) => debug!("mirror failed: {}", err),
        }
    }

    match fetch(fallback) {
        Ok(value) => Ok(value),
        Err(err) => {
            warn!("fallback server failed: {}", err);
            Err(CatalogError::AllMirrorsFailed(path.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;

    fn mirrors(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn first_answering_mirror_becomes_preferred() {
        let preferred = Mutex::new(None);
        let asked = RefCell::new(vec![]);
        let list = mirrors(&["m1", "m2", "m3"]);

        let value = fetch_with_fallback(&preferred, &list, "fallback", "/json/countries", |base| {
            asked.borrow_mut().push(base.to_string());
            if base == "m2" {
                Ok(json!([1]))
            } else {
                Err(CatalogError::Http(base.to_string(), "down".into()))
            }
        })
        .unwrap();

        assert_eq!(value, json!([1]));
        assert_eq!(*asked.borrow(), vec!["m1", "m2"]);
        assert_eq!(preferred.lock().unwrap().as_deref(), Some("m2"));
    }

    #[test]
    fn preferred_mirror_is_asked_first_and_only_once() {
        let preferred = Mutex::new(Some("m3".to_string()));
        let asked = RefCell::new(vec![]);
        let list = mirrors(&["m1", "m2", "m3"]);

        let result = fetch_with_fallback(&preferred, &list, "fallback", "/json/tags", |base| {
            asked.borrow_mut().push(base.to_string());
            Err(CatalogError::Http(base.to_string(), "down".into()))
        });

        assert_eq!(*asked.borrow(), vec!["m3", "m1", "m2", "fallback"]);
        match result {
            Err(CatalogError::AllMirrorsFailed(path)) => assert_eq!(path, "/json/tags"),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn fallback_answer_does_not_change_preference() {
        let preferred = Mutex::new(None);
        let list = mirrors(&["m1"]);

        let value = fetch_with_fallback(&preferred, &list, "fallback", "/json/languages", |base| {
            if base == "fallback" {
                Ok(json!([]))
            } else {
                Err(CatalogError::Http(base.to_string(), "down".into()))
            }
        })
        .unwrap();

        assert_eq!(value, json!([]));
        assert!(preferred.lock().unwrap().is_none());
    }

    #[test]
    fn talks_to_a_real_http_mirror() {
        let server = rouille::Server::new("127.0.0.1:0", |request| {
            if request.url() == "/json/countries" {
                rouille::Response::json(&json!([{"name": "Germany", "iso_3166_1": "DE", "stationcount": 3}]))
            } else {
                rouille::Response::text("not json")
            }
        })
        .unwrap();
        let base = format!("http://{}", server.server_addr());
        let (handle, stop) = server.stoppable();

        let client = RadioBrowserClient::new(
            "radiopassport-test",
            Duration::from_secs(5),
            vec![base.clone()],
            base.clone(),
        )
        .unwrap();

        let countries = client.fetch_json("/json/countries").unwrap();
        assert_eq!(countries[0]["iso_3166_1"], json!("DE"));
        assert_eq!(client.preferred_mirror(), Some(base));

        match client.fetch_json("/json/tags") {
            Err(CatalogError::AllMirrorsFailed(_)) => {}
            other => panic!("text answer must not count, got {:?}", other),
        }

        let _ = stop.send(());
        let _ = handle.join();
    }
}
