use crate::catalog::SnapshotLoader;
use serde::{Deserialize, Serialize};

/// Answer of `GET /`.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct Status {
    pub software_version: String,
    status: String,
    snapshot_fetched_at: Option<String>,
    snapshot_stations: u64,
    snapshot_builds: u64,
}

impl Status {
    pub fn new(software_version: String, loader: &SnapshotLoader) -> Self {
        let snapshot = loader.current();
        Status {
            software_version,
            status: "OK".to_string(),
            snapshot_fetched_at: snapshot.as_ref().map(|s| s.fetched_at.clone()),
            snapshot_stations: snapshot.as_ref().map(|s| s.stations.len() as u64).unwrap_or(0),
            snapshot_builds: loader.builds(),
        }
    }
}
