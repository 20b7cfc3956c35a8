mod api_error;
mod data;
mod parameters;
mod prometheus_exporter;

use self::api_error::ApiError;
use self::data::Status;
use self::parameters::RequestParameters;

use crate::catalog::SnapshotLoader;
use crate::catalog::SnapshotOptions;
use crate::catalog::MIN_STATION_LIMIT;
use crate::stations::annotate_health;
use crate::stations::rank_stations;
use crate::stations::IntentMeta;

use rouille::Request;
use rouille::Response;
use serde_json::Value;
use std::fs::OpenOptions;
use std::io::prelude::*;
use std::sync::Arc;

pub use self::prometheus_exporter::Metrics;

pub struct ApiState {
    pub loader: Arc<SnapshotLoader>,
    /// `None` when the exporter is switched off.
    pub metrics: Option<Metrics>,
    pub log_dir: String,
}

fn add_cors(result: Response) -> Response {
    result
        .with_unique_header("Access-Control-Allow-Origin", "*")
        .with_unique_header("Access-Control-Allow-Headers", "origin, x-requested-with, content-type")
        .with_unique_header("Access-Control-Allow-Methods", "GET,POST,OPTIONS")
}

fn log_to_file(log_dir: &str, file_name: &str, line: &str) {
    if log_dir.is_empty() {
        return;
    }
    let file_name = format!("{}/{}", log_dir, file_name);
    let file = OpenOptions::new().append(true).create(true).open(file_name);

    match file {
        Ok(mut file) => {
            if let Err(e) = writeln!(file, "{}", line) {
                error!("Couldn't write to file: {}", e);
            }
        }
        Err(err) => {
            error!("Could not open log file {}", err);
        }
    }
}

fn read_json_body(request: &Request) -> Result<Value, ApiError> {
    let mut data = request
        .data()
        .ok_or_else(|| ApiError::BadRequest(String::from("request body already read")))?;
    let mut buf = Vec::new();
    data.read_to_end(&mut buf)
        .map_err(|err| ApiError::BadRequest(err.to_string()))?;
    if buf.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(&buf).map_err(|err| ApiError::BadRequest(format!("invalid json: {}", err)))
}

fn radio_catalog(state: &ApiState, request: &Request) -> Result<Response, ApiError> {
    let params = RequestParameters::new(request);
    let station_limit = params
        .get_integer("stations")
        .map(|n| n.clamp(i64::from(MIN_STATION_LIMIT), i64::from(u32::MAX)) as u32);
    let force_refresh = params.get_bool("refresh", false);

    let snapshot = state
        .loader
        .load(SnapshotOptions {
            station_limit,
            force_refresh,
        })
        .map_err(|err| {
            if let Some(ref metrics) = state.metrics {
                metrics.snapshot_failed();
            }
            ApiError::InternalError(err.to_string())
        })?;

    Ok(Response::json(snapshot.as_ref()).with_unique_header("Cache-Control", "no-store"))
}

fn stations_health(request: &Request) -> Result<Response, ApiError> {
    let body = read_json_body(request)?;
    let annotated = annotate_health(&body);
    Ok(Response::json(&annotated).with_no_cache())
}

/// Accepts either a bare station array or `{"stations": [...], "prompt": .., "mood": ..}`.
/// Query parameters take precedence over body fields.
fn stations_rank(request: &Request) -> Result<Response, ApiError> {
    let params = RequestParameters::new(request);
    let body = read_json_body(request)?;

    let body_field = |name: &str| body.get(name).and_then(Value::as_str).map(String::from);
    let intent = IntentMeta::new(
        params.get_string("prompt").or_else(|| body_field("prompt")),
        params.get_string("mood").or_else(|| body_field("mood")),
    );
    let stations = body.get("stations").unwrap_or(&body);

    let ranked = rank_stations(stations, &intent);
    let annotated = annotate_health(&Value::Array(ranked));
    Ok(Response::json(&annotated).with_no_cache())
}

fn metrics(state: &ApiState) -> Result<Response, ApiError> {
    match state.metrics {
        Some(ref metrics) => metrics
            .render(&state.loader)
            .map_err(|err| ApiError::InternalError(err.to_string())),
        None => Ok(Response::text("Exporter not enabled!").with_status_code(423)),
    }
}

fn status(state: &ApiState) -> Result<Response, ApiError> {
    let status = Status::new(env!("CARGO_PKG_VERSION").to_string(), &state.loader);
    Ok(Response::json(&status).with_no_cache())
}

/// Routes one request. Returns the route label used for metrics next to the response.
fn handle_connection_internal(state: &ApiState, request: &Request) -> (&'static str, Result<Response, ApiError>) {
    match (request.method(), request.url().as_str()) {
        ("GET", "/") => ("status", status(state)),
        ("GET", "/api/radio-catalog") | ("POST", "/api/radio-catalog") => ("catalog", radio_catalog(state, request)),
        ("POST", "/api/stations/health") => ("health", stations_health(request)),
        ("POST", "/api/stations/rank") => ("rank", stations_rank(request)),
        ("GET", "/metrics") => ("metrics", metrics(state)),
        ("OPTIONS", _) => ("preflight", Ok(Response::text(""))),
        _ => ("unknown", Ok(Response::empty_404())),
    }
}

pub fn handle_request(state: &ApiState, request: &Request) -> Response {
    let (route, result) = handle_connection_internal(state, request);
    let response = match result {
        Ok(response) => response,
        Err(err) => {
            error!("{} {}: {}", request.method(), request.raw_url(), err);
            Response::text(err.to_string()).with_status_code(err.status_code())
        }
    };
    if let Some(ref metrics) = state.metrics {
        metrics.observe_request(route, response.status_code);
    }
    add_cors(response)
}

fn handle_connection(state: &ApiState, request: &Request) -> Response {
    let remote_ip: String = request
        .header("X-Forwarded-For")
        .map(String::from)
        .unwrap_or_else(|| request.remote_addr().ip().to_string());
    let referer: String = request.header("Referer").unwrap_or("-").to_string();
    let user_agent: String = request.header("User-agent").unwrap_or("-").to_string();

    let now = chrono::Utc::now().format("%d/%m/%Y:%H:%M:%S%.6f");
    let log_ok = |req: &Request, resp: &Response, elap: std::time::Duration| {
        let line = format!(
            r#"{} - - [{}] "{} {}" {} {}ms "{}" "{}""#,
            remote_ip,
            now,
            req.method(),
            req.raw_url(),
            resp.status_code,
            elap.as_millis(),
            referer,
            user_agent
        );
        debug!("{}", line);
        log_to_file(&state.log_dir, "access.log", &line);
    };
    let log_err = |req: &Request, _elap: std::time::Duration| {
        let line = format!("{} {} Handler panicked: {} {}", remote_ip, now, req.method(), req.raw_url());
        error!("{}", line);
        log_to_file(&state.log_dir, "error.log", &line);
    };
    rouille::log_custom(request, log_ok, log_err, || handle_request(state, request))
}

pub fn run(state: ApiState, host: &str, port: u16, threads: usize) {
    let listen_str = format!("{}:{}", host, port);
    info!("Listen on {} with {} threads", listen_str, threads);
    rouille::start_server_with_pool(listen_str, Some(threads), move |request| {
        handle_connection(&state, request)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogError;
    use crate::catalog::CatalogSource;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    struct FakeSource {
        down: Arc<AtomicBool>,
        station_searches: Arc<AtomicUsize>,
    }

    impl CatalogSource for FakeSource {
        fn fetch_json(&self, path: &str) -> Result<Value, CatalogError> {
            if self.down.load(Ordering::SeqCst) {
                return Err(CatalogError::AllMirrorsFailed(path.to_string()));
            }
            if path.starts_with("/json/stations/search") {
                self.station_searches.fetch_add(1, Ordering::SeqCst);
                let limit_ok = path.contains("limit=100&") || path.contains("limit=8000&");
                Ok(json!([{
                    "stationuuid": if limit_ok { "s1" } else { "unexpected-limit" },
                    "name": "One",
                    "url": "http://one",
                    "lastcheckok": 1
                }]))
            } else {
                Ok(json!([]))
            }
        }
    }

    struct Fixture {
        state: ApiState,
        down: Arc<AtomicBool>,
        station_searches: Arc<AtomicUsize>,
    }

    fn fixture(with_metrics: bool) -> Fixture {
        let down = Arc::new(AtomicBool::new(false));
        let station_searches = Arc::new(AtomicUsize::new(0));
        let source = FakeSource {
            down: down.clone(),
            station_searches: station_searches.clone(),
        };
        let loader = SnapshotLoader::new(Box::new(source), Duration::from_secs(300), 8000).unwrap();
        let metrics = if with_metrics {
            Some(Metrics::new("test_").unwrap())
        } else {
            None
        };
        Fixture {
            state: ApiState {
                loader: Arc::new(loader),
                metrics,
                log_dir: String::from("."),
            },
            down,
            station_searches,
        }
    }

    fn body_of(response: Response) -> String {
        let (mut reader, _) = response.data.into_reader_and_size();
        let mut body = String::new();
        reader.read_to_string(&mut body).unwrap();
        body
    }

    fn header<'a>(response: &'a Response, name: &str) -> Option<&'a str> {
        response
            .headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| &**v)
    }

    fn post(url: &str, body: &str) -> Request {
        Request::fake_http(
            "POST",
            url,
            vec![("Content-Type".to_owned(), "application/json".to_owned())],
            body.as_bytes().to_vec(),
        )
    }

    fn get(url: &str) -> Request {
        Request::fake_http("GET", url, vec![], vec![])
    }

    #[test]
    fn health_endpoint_annotates() {
        let f = fixture(true);
        let response = handle_request(
            &f.state,
            &post("/api/stations/health", r#"[{"uuid":"x","bitrate":256,"votes":100,"lastCheckOk":true},{"uuid":"y","lastCheckOk":false}]"#),
        );
        assert_eq!(response.status_code, 200);
        assert_eq!(header(&response, "Access-Control-Allow-Origin"), Some("*"));
        let body: Value = serde_json::from_str(&body_of(response)).unwrap();
        assert_eq!(body[0]["uuid"], json!("x"));
        assert_eq!(body[0]["healthScore"], json!(100));
        assert_eq!(body[0]["healthStatus"], json!("good"));
        assert_eq!(body[1]["healthScore"], json!(40));
        assert_eq!(body[1]["healthStatus"], json!("error"));
    }

    #[test]
    fn health_endpoint_degrades() {
        let f = fixture(false);
        let response = handle_request(&f.state, &post("/api/stations/health", r#"{"not":"a list"}"#));
        assert_eq!(response.status_code, 200);
        assert_eq!(body_of(response), "[]");

        let response = handle_request(&f.state, &post("/api/stations/health", ""));
        assert_eq!(body_of(response), "[]");

        let response = handle_request(&f.state, &post("/api/stations/health", "[{"));
        assert_eq!(response.status_code, 400);
    }

    #[test]
    fn rank_endpoint_ranks_then_annotates() {
        let f = fixture(false);
        let stations = r#"[
            {"uuid":"a","country":"Iceland","tagList":["ambient"],"bitrate":128},
            {"uuid":"b","country":"Brazil","tags":"jazz,samba","bitrate":128}
        ]"#;
        let response = handle_request(&f.state, &post("/api/stations/rank?prompt=samba", stations));
        let body: Value = serde_json::from_str(&body_of(response)).unwrap();
        assert_eq!(body[0]["uuid"], json!("b"));
        assert!(body[0]["healthScore"].is_number());

        let wrapped = format!(r#"{{"stations": {}, "mood": "ambient"}}"#, stations);
        let response = handle_request(&f.state, &post("/api/stations/rank", &wrapped));
        let body: Value = serde_json::from_str(&body_of(response)).unwrap();
        assert_eq!(body[0]["uuid"], json!("a"));
        assert_eq!(body.as_array().unwrap().len(), 2);
    }

    #[test]
    fn catalog_is_cached_and_not_stored_by_clients() {
        let f = fixture(true);
        let response = handle_request(&f.state, &get("/api/radio-catalog"));
        assert_eq!(response.status_code, 200);
        assert_eq!(header(&response, "Cache-Control"), Some("no-store"));
        let body: Value = serde_json::from_str(&body_of(response)).unwrap();
        assert_eq!(body["stations"][0]["uuid"], json!("s1"));
        assert!(body["fetchedAt"].is_string());

        handle_request(&f.state, &get("/api/radio-catalog"));
        assert_eq!(f.station_searches.load(Ordering::SeqCst), 1);

        handle_request(&f.state, &get("/api/radio-catalog?refresh=true&stations=5"));
        assert_eq!(f.station_searches.load(Ordering::SeqCst), 2);
        let snapshot = f.state.loader.current().unwrap();
        assert_eq!(snapshot.stations[0].uuid, "s1");
    }

    #[test]
    fn catalog_failure_is_a_server_error() {
        let f = fixture(true);
        f.down.store(true, Ordering::SeqCst);
        let response = handle_request(&f.state, &get("/api/radio-catalog"));
        assert_eq!(response.status_code, 500);
        assert!(body_of(response).contains("/json/"));

        let metrics = body_of(handle_request(&f.state, &get("/metrics")));
        assert!(metrics.contains("test_catalog_snapshot_failures_total 1"));
        assert!(metrics.contains(r#"test_requests_total{route="catalog",status="500"} 1"#));
    }

    #[test]
    fn metrics_can_be_disabled() {
        let f = fixture(false);
        let response = handle_request(&f.state, &get("/metrics"));
        assert_eq!(response.status_code, 423);
    }

    #[test]
    fn status_and_unknown_routes() {
        let f = fixture(false);
        let response = handle_request(&f.state, &get("/"));
        assert_eq!(response.status_code, 200);
        let body: Value = serde_json::from_str(&body_of(response)).unwrap();
        assert_eq!(body["status"], json!("OK"));
        assert_eq!(body["snapshot_builds"], json!(0));

        assert_eq!(handle_request(&f.state, &get("/json/stations")).status_code, 404);
        assert_eq!(handle_request(&f.state, &get("/api/stations/health")).status_code, 404);
        let preflight = Request::fake_http("OPTIONS", "/api/stations/health", vec![], vec![]);
        let response = handle_request(&f.state, &preflight);
        assert_eq!(response.status_code, 200);
        assert_eq!(header(&response, "Access-Control-Allow-Methods"), Some("GET,POST,OPTIONS"));
    }
}
