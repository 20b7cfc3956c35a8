#[macro_use]
extern crate log;

mod api;
mod catalog;
mod config;
mod logger;
mod stations;

use catalog::RadioBrowserClient;
use catalog::SnapshotLoader;
use std::error::Error;
use std::sync::Arc;

fn run() -> Result<(), Box<dyn Error>> {
    let config = config::load_config()?;
    logger::setup_logger(config.log_level, &config.log_dir)?;
    info!("Config: {:#?}", config);

    let client = RadioBrowserClient::new(
        &config.useragent,
        config.tcp_timeout,
        config.mirrors.clone(),
        config.fallback_server.clone(),
    )?;
    let loader = Arc::new(SnapshotLoader::new(
        Box::new(client),
        config.catalog_cache_ttl,
        config.catalog_station_limit,
    )?);
    catalog::start_prefetch(loader.clone(), config.catalog_prefetch_interval);

    let metrics = if config.prometheus_exporter {
        Some(api::Metrics::new(&config.prometheus_exporter_prefix)?)
    } else {
        None
    };

    let state = api::ApiState {
        loader,
        metrics,
        log_dir: config.log_dir.clone(),
    };
    api::run(state, &config.listen_host, config.listen_port, config.threads);
    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{}", err);
        std::process::exit(1);
    }
}
