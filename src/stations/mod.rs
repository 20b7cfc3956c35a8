mod fields;
mod health;
mod normalize;
mod ranking;
mod station;

pub use self::health::annotate_health;
pub use self::health::HealthReport;
pub use self::health::HealthStatus;
pub use self::normalize::normalize_station;
pub use self::normalize::normalize_stations;
pub use self::ranking::rank_stations;
pub use self::ranking::IntentMeta;
pub use self::station::Country;
pub use self::station::LanguageSummary;
pub use self::station::Station;
pub use self::station::TagSummary;
