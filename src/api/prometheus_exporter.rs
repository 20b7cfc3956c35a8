use crate::catalog::SnapshotLoader;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::error::Error;

pub struct Metrics {
    registry: Registry,
    requests: IntCounterVec,
    snapshot_failures: IntCounter,
    snapshot_builds: IntGauge,
    snapshot_stations: IntGauge,
}

impl Metrics {
    pub fn new(prefix: &str) -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests = IntCounterVec::new(
            Opts::new(format!("{}requests_total", prefix), "Handled requests by route and status code"),
            &["route", "status"],
        )?;
        let snapshot_failures = IntCounter::new(
            format!("{}catalog_snapshot_failures_total", prefix),
            "Catalog snapshot builds that failed because no mirror answered",
        )?;
        let snapshot_builds = IntGauge::new(
            format!("{}catalog_snapshot_builds", prefix),
            "Catalog snapshots built since start",
        )?;
        let snapshot_stations = IntGauge::new(
            format!("{}catalog_snapshot_stations", prefix),
            "Stations in the current catalog snapshot",
        )?;

        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(snapshot_failures.clone()))?;
        registry.register(Box::new(snapshot_builds.clone()))?;
        registry.register(Box::new(snapshot_stations.clone()))?;

        Ok(Metrics {
            registry,
            requests,
            snapshot_failures,
            snapshot_builds,
            snapshot_stations,
        })
    }

    pub fn observe_request(&self, route: &str, status: u16) {
        self.requests
            .with_label_values(&[route, &status.to_string()])
            .inc();
    }

    pub fn snapshot_failed(&self) {
        self.snapshot_failures.inc();
    }

    pub fn render(&self, loader: &SnapshotLoader) -> Result<rouille::Response, Box<dyn Error>> {
        self.snapshot_builds.set(loader.builds() as i64);
        self.snapshot_stations.set(
            loader
                .current()
                .map(|snapshot| snapshot.stations.len() as i64)
                .unwrap_or(0),
        );

        let encoder = TextEncoder::new();
        let mut buffer = vec![];
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(rouille::Response::from_data(encoder.format_type().to_string(), buffer))
    }
}
