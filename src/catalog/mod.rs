mod cache;
mod catalog_error;
mod client;
mod snapshot;

pub use self::catalog_error::CatalogError;
pub use self::client::CatalogSource;
pub use self::client::RadioBrowserClient;
pub use self::client::DEFAULT_FALLBACK_SERVER;
pub use self::client::DEFAULT_MIRRORS;
pub use self::snapshot::CatalogSnapshot;
pub use self::snapshot::SnapshotLoader;
pub use self::snapshot::start_prefetch;
pub use self::snapshot::SnapshotOptions;
pub use self::snapshot::DEFAULT_STATION_LIMIT;
pub use self::snapshot::MIN_STATION_LIMIT;
