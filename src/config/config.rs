use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub catalog_cache_ttl: Duration,
    pub catalog_prefetch_interval: Duration,
    pub catalog_station_limit: u32,
    pub fallback_server: String,
    pub listen_host: String,
    pub listen_port: u16,
    pub log_dir: String,
    pub log_level: usize,
    pub mirrors: Vec<String>,
    pub prometheus_exporter_prefix: String,
    pub prometheus_exporter: bool,
    pub tcp_timeout: Duration,
    pub threads: usize,
    pub useragent: String,
}
