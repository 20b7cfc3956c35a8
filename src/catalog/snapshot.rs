use super::cache::ExpiringSlot;
use super::CatalogError;
use super::CatalogSource;
use crate::stations::normalize_stations;
use crate::stations::Country;
use crate::stations::LanguageSummary;
use crate::stations::Station;
use crate::stations::TagSummary;
use chrono::SecondsFormat;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

pub const DEFAULT_STATION_LIMIT: u32 = 8000;
pub const MIN_STATION_LIMIT: u32 = 100;
const TAG_LIMIT: u32 = 500;
/// One thread per upstream endpoint of a build.
const FETCH_THREADS: usize = 4;

#[derive(PartialEq, Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSnapshot {
    pub fetched_at: String,
    pub stations: Vec<Station>,
    pub countries: Vec<Country>,
    pub languages: Vec<LanguageSummary>,
    pub tags: Vec<TagSummary>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotOptions {
    pub station_limit: Option<u32>,
    pub force_refresh: bool,
}

pub struct SnapshotLoader {
    source: Box<dyn CatalogSource>,
    default_station_limit: u32,
    cache: Mutex<ExpiringSlot<CatalogSnapshot>>,
    /// Held for the whole build so concurrent callers share one upstream fetch.
    build_lock: Mutex<()>,
    pool: rayon::ThreadPool,
    builds: AtomicU64,
}

fn fetch_list<T: DeserializeOwned>(source: &dyn CatalogSource, path: &str) -> Result<Vec<T>, CatalogError> {
    let value = source.fetch_json(path)?;
    match value.as_array() {
        Some(list) => Ok(list
            .iter()
            .filter_map(|item| serde_json::from_value(item.clone()).ok())
            .collect()),
        None => {
            warn!("'{}' did not answer with a list", path);
            Ok(vec![])
        }
    }
}

fn fetch_stations(source: &dyn CatalogSource, limit: u32) -> Result<Vec<Station>, CatalogError> {
    let path = format!(
        "/json/stations/search?limit={}&hidebroken=true&order=clickcount&reverse=true&has_geo_info=true",
        limit
    );
    let raw = source.fetch_json(&path)?;
    Ok(normalize_stations(&raw))
}

impl SnapshotLoader {
    pub fn new(
        source: Box<dyn CatalogSource>,
        ttl: Duration,
        default_station_limit: u32,
    ) -> Result<Self, Box<dyn Error>> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(FETCH_THREADS)
            .thread_name(|i| format!("catalog-fetch-{}", i))
            .build()?;
        Ok(SnapshotLoader {
            source,
            default_station_limit: default_station_limit.max(MIN_STATION_LIMIT),
            cache: Mutex::new(ExpiringSlot::new(ttl)),
            build_lock: Mutex::new(()),
            pool,
            builds: AtomicU64::new(0),
        })
    }

    fn cached(&self) -> Option<Arc<CatalogSnapshot>> {
        let cache = self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        cache.get()
    }

    /// Cached snapshot if it is still fresh, a newly built one otherwise.
    /// Failed builds leave the cache untouched.
    pub fn load(&self, options: SnapshotOptions) -> Result<Arc<CatalogSnapshot>, CatalogError> {
        if !options.force_refresh {
            if let Some(snapshot) = self.cached() {
                trace!("catalog snapshot served from cache");
                return Ok(snapshot);
            }
        }

        let _building = self.build_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        // another caller may have finished a build while we waited
        if !options.force_refresh {
            if let Some(snapshot) = self.cached() {
                trace!("catalog snapshot built by a concurrent request");
                return Ok(snapshot);
            }
        }

        let limit = options.station_limit.unwrap_or(self.default_station_limit);
        let snapshot = Arc::new(self.build(limit)?);
        let mut cache = self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        cache.set(snapshot.clone());
        Ok(snapshot)
    }

    /// Last built snapshot, fresh or not. Never triggers a fetch and does not
    /// wait for a running build.
    pub fn current(&self) -> Option<Arc<CatalogSnapshot>> {
        let cache = self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        cache.peek()
    }

    /// Number of successful builds since start.
    pub fn builds(&self) -> u64 {
        self.builds.load(Ordering::Relaxed)
    }

    fn build(&self, station_limit: u32) -> Result<CatalogSnapshot, CatalogError> {
        debug!("building catalog snapshot (stations={})", station_limit);
        let source = self.source.as_ref();
        let tags_path = format!("/json/tags?limit={}&order=stationcount&reverse=true", TAG_LIMIT);

        let ((stations, countries), (languages, tags)) = self.pool.install(|| {
            rayon::join(
                || {
                    rayon::join(
                        || fetch_stations(source, station_limit),
                        || fetch_list::<Country>(source, "/json/countries"),
                    )
                },
                || {
                    rayon::join(
                        || fetch_list::<LanguageSummary>(source, "/json/languages"),
                        || fetch_list::<TagSummary>(source, &tags_path),
                    )
                },
            )
        });

        let snapshot = CatalogSnapshot {
            fetched_at: chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            stations: stations?,
            countries: countries?,
            languages: languages?,
            tags: tags?,
        };
        self.builds.fetch_add(1, Ordering::Relaxed);
        info!(
            "catalog snapshot built: stations={} countries={} languages={} tags={}",
            snapshot.stations.len(),
            snapshot.countries.len(),
            snapshot.languages.len(),
            snapshot.tags.len()
        );
        Ok(snapshot)
    }
}

/// Rebuilds the snapshot at a fixed interval so requests rarely wait for
/// the upstream. A zero interval disables the worker.
pub fn start_prefetch(loader: Arc<SnapshotLoader>, interval: Duration) {
    if interval.is_zero() {
        return;
    }
    thread::spawn(move || loop {
        let result = loader.load(SnapshotOptions {
            station_limit: None,
            force_refresh: true,
        });
        if let Err(err) = result {
            error!("Catalog prefetch error: {}", err);
        }
        thread::sleep(interval);
    });
}
