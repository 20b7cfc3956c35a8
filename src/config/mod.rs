mod config;
mod config_error;

use clap::parser::ValueSource;
use clap::{crate_version, Arg, ArgAction, ArgMatches, Command};
use std::error::Error;
use std::fs;
use std::time::Duration;
use url::Url;

use crate::catalog::DEFAULT_FALLBACK_SERVER;
use crate::catalog::DEFAULT_MIRRORS;
use crate::catalog::DEFAULT_STATION_LIMIT;
use crate::catalog::MIN_STATION_LIMIT;

pub use config::Config;
pub use config_error::ConfigError;

fn get_option_string(
    matches: &ArgMatches,
    config: &toml::Value,
    setting_name: &str,
    default_value: String,
) -> Result<String, Box<dyn Error>> {
    if let Some(value_from_clap) = matches.get_one::<String>(setting_name) {
        return Ok(value_from_clap.to_string());
    }

    let setting = config.get(setting_name);
    if let Some(setting) = setting {
        if let Some(setting_decoded) = setting.as_str() {
            return Ok(String::from(setting_decoded));
        } else {
            return Err(Box::new(ConfigError::TypeError(setting_name.into(), setting.to_string())));
        }
    }

    Ok(default_value)
}

fn get_option_duration(
    matches: &ArgMatches,
    config: &toml::Value,
    setting_name: &str,
    default_value: String,
) -> Result<Duration, Box<dyn Error>> {
    let s = get_option_string(matches, config, setting_name, default_value)?;
    Ok(s.parse::<humantime::Duration>()?.into())
}

fn get_option_number(
    matches: &ArgMatches,
    config: &toml::Value,
    setting_name: &str,
    default_value: i64,
) -> Result<i64, Box<dyn Error>> {
    if let Some(value_from_clap) = matches.get_one::<String>(setting_name) {
        return Ok(value_from_clap.parse()?);
    }

    let setting = config.get(setting_name);
    if let Some(setting) = setting {
        if let Some(setting_decoded) = setting.as_integer() {
            return Ok(setting_decoded);
        } else {
            return Err(Box::new(ConfigError::TypeError(setting_name.into(), setting.to_string())));
        }
    }

    Ok(default_value)
}

fn get_option_number_occurences(
    matches: &ArgMatches,
    config: &toml::Value,
    setting_name: &str,
    default_value: usize,
) -> Result<usize, Box<dyn Error>> {
    let value_from_clap = matches.get_count(setting_name) as usize;
    if value_from_clap > 0 {
        return Ok(value_from_clap);
    }

    let setting = config.get(setting_name);
    if let Some(setting) = setting {
        if let Some(setting_decoded) = setting.as_integer() {
            return Ok(setting_decoded as usize);
        } else {
            return Err(Box::new(ConfigError::TypeError(setting_name.into(), setting.to_string())));
        }
    }

    Ok(default_value)
}

fn get_option_bool(
    matches: &ArgMatches,
    config: &toml::Value,
    setting_name: &str,
    default_value: bool,
) -> Result<bool, Box<dyn Error>> {
    if let Some(value_from_clap) = matches.get_one::<String>(setting_name) {
        return Ok(value_from_clap.parse()?);
    }

    let setting = config.get(setting_name);
    if let Some(setting) = setting {
        if let Some(setting_decoded) = setting.as_bool() {
            return Ok(setting_decoded);
        } else {
            return Err(Box::new(ConfigError::TypeError(setting_name.into(), setting.to_string())));
        }
    }

    Ok(default_value)
}

/// `[mirrors.<name>]` tables in file order, which needs the `preserve_order` feature of toml.
fn get_mirrors_from_config(config: &toml::Value) -> Result<Vec<String>, Box<dyn Error>> {
    let mut list = vec![];
    let setting = config.get("mirrors");
    if let Some(setting) = setting {
        let setting_decoded = setting
            .as_table()
            .ok_or_else(|| ConfigError::TypeError("mirrors".into(), setting.to_string()))?;
        for (_, mirror) in setting_decoded {
            if let Some(host) = mirror.get("host") {
                let host_str = host
                    .as_str()
                    .ok_or_else(|| ConfigError::TypeError("host".into(), host.to_string()))?;
                list.push(host_str.to_string());
            }
        }
    }
    Ok(list)
}

fn check_server_url(setting_name: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|err| ConfigError::InvalidValue(setting_name.into(), format!("'{}': {}", value, err)))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(ConfigError::InvalidValue(
            setting_name.into(),
            format!("'{}': unsupported scheme {}", value, scheme),
        )),
    }
}

pub fn build_cli() -> Command {
    Command::new("radiopassport-api")
        .version(crate_version!())
        .about("Catalog and station health API for Radio Passport")
        .arg(
            Arg::new("config-file")
                .short('f')
                .long("config-file")
                .value_name("CONFIG-FILE")
                .help("Path to config file")
                .env("CONFIG_FILE")
                .default_value("/etc/radiopassport/config.toml"),
        )
        .arg(
            Arg::new("log-dir")
                .short('l')
                .long("log-dir")
                .value_name("LOG-DIR")
                .help("Path to log dir")
                .env("LOG_DIR"),
        )
        .arg(
            Arg::new("log-level")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .help("increases the log level. can be specified mutliple times 0..3"),
        )
        .arg(
            Arg::new("listen-host")
                .long("host")
                .value_name("HOST")
                .help("listening host ip")
                .env("HOST"),
        )
        .arg(
            Arg::new("listen-port")
                .short('p')
                .long("port")
                .value_name("PORT")
                .help("listening port")
                .env("PORT"),
        )
        .arg(
            Arg::new("threads")
                .short('t')
                .long("threads")
                .value_name("THREADS")
                .help("concurrent threads used by socket")
                .env("THREADS"),
        )
        .arg(
            Arg::new("useragent")
                .long("useragent")
                .value_name("USERAGENT")
                .help("user agent value for http requests to the catalog mirrors")
                .env("USERAGENT"),
        )
        .arg(
            Arg::new("tcp-timeout")
                .long("tcp-timeout")
                .value_name("TCP_TIMEOUT")
                .help("timeout for a single request to a catalog mirror")
                .env("TCP_TIMEOUT"),
        )
        .arg(
            Arg::new("mirror")
                .short('m')
                .long("mirror")
                .value_name("MIRROR")
                .help("radio browser server to fetch the catalog from, in order of preference")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("fallback-server")
                .long("fallback-server")
                .value_name("FALLBACK_SERVER")
                .help("server asked when every mirror failed")
                .env("FALLBACK_SERVER"),
        )
        .arg(
            Arg::new("catalog-station-limit")
                .short('n')
                .long("catalog-station-limit")
                .value_name("CATALOG_STATION_LIMIT")
                .help("stations in a catalog snapshot if the request does not ask for a number")
                .env("CATALOG_STATION_LIMIT"),
        )
        .arg(
            Arg::new("catalog-cache-ttl")
                .long("catalog-cache-ttl")
                .value_name("CATALOG_CACHE_TTL")
                .help("how long a catalog snapshot is served from cache")
                .env("CATALOG_CACHE_TTL"),
        )
        .arg(
            Arg::new("catalog-prefetch-interval")
                .long("catalog-prefetch-interval")
                .value_name("CATALOG_PREFETCH_INTERVAL")
                .help("rebuild the catalog snapshot in the background at an interval, 0 disables")
                .env("CATALOG_PREFETCH_INTERVAL"),
        )
        .arg(
            Arg::new("prometheus-exporter")
                .short('e')
                .long("prometheus-exporter")
                .value_name("PROMETHEUS_EXPORTER")
                .help("export statistics through a prometheus compatible exporter"),
        )
        .arg(
            Arg::new("prometheus-exporter-prefix")
                .long("prometheus-exporter-prefix")
                .value_name("PROMETHEUS_EXPORTER_PREFIX")
                .help("prefix for all exported values on /metrics"),
        )
}

fn read_config_file(matches: &ArgMatches) -> Result<toml::Value, Box<dyn Error>> {
    let config_file_path = matches
        .get_one::<String>("config-file")
        .cloned()
        .unwrap_or_default();
    let explicit = matches.value_source("config-file") != Some(ValueSource::DefaultValue);

    match fs::read_to_string(&config_file_path) {
        Ok(contents) => Ok(toml::Value::Table(contents.parse::<toml::Table>()?)),
        Err(err) => {
            if explicit {
                Err(Box::new(ConfigError::InvalidValue(
                    "config-file".into(),
                    format!("{}: {}", config_file_path, err),
                )))
            } else {
                Ok(toml::Value::Table(toml::Table::new()))
            }
        }
    }
}

pub fn config_from(matches: &ArgMatches, config: &toml::Value) -> Result<Config, Box<dyn Error>> {
    let log_dir: String = get_option_string(matches, config, "log-dir", String::from("."))?;
    let log_level: usize = get_option_number_occurences(matches, config, "log-level", 0)?;
    let listen_host: String = get_option_string(matches, config, "listen-host", String::from("127.0.0.1"))?;
    let listen_port = get_option_number(matches, config, "listen-port", 8080)?;
    let listen_port = u16::try_from(listen_port)
        .map_err(|_| ConfigError::InvalidValue("listen-port".into(), listen_port.to_string()))?;
    let threads: usize = get_option_number(matches, config, "threads", 4)?.max(1) as usize;
    let useragent = get_option_string(matches, config, "useragent", String::from("radio-passport/1.0 (+cozy dev)"))?;
    let tcp_timeout = get_option_duration(matches, config, "tcp-timeout", String::from("10secs"))?;
    let fallback_server = get_option_string(matches, config, "fallback-server", String::from(DEFAULT_FALLBACK_SERVER))?;
    check_server_url("fallback-server", &fallback_server)?;

    let catalog_station_limit = get_option_number(matches, config, "catalog-station-limit", i64::from(DEFAULT_STATION_LIMIT))?;
    if catalog_station_limit < i64::from(MIN_STATION_LIMIT) || catalog_station_limit > i64::from(u32::MAX) {
        return Err(Box::new(ConfigError::InvalidValue(
            "catalog-station-limit".into(),
            format!("{} is below {} or too large", catalog_station_limit, MIN_STATION_LIMIT),
        )));
    }
    let catalog_station_limit = catalog_station_limit as u32;
    let catalog_cache_ttl = get_option_duration(matches, config, "catalog-cache-ttl", String::from("5mins"))?;
    let catalog_prefetch_interval = get_option_duration(matches, config, "catalog-prefetch-interval", String::from("0s"))?;

    let prometheus_exporter: bool = get_option_bool(matches, config, "prometheus-exporter", true)?;
    let prometheus_exporter_prefix: String =
        get_option_string(matches, config, "prometheus-exporter-prefix", String::from("radio_passport_"))?;

    let mut mirrors: Vec<String> = matches
        .get_many::<String>("mirror")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    mirrors.append(&mut get_mirrors_from_config(config)?);
    if mirrors.is_empty() {
        mirrors = DEFAULT_MIRRORS.iter().map(|s| s.to_string()).collect();
    }
    for mirror in mirrors.iter() {
        check_server_url("mirror", mirror)?;
    }

    Ok(Config {
        catalog_cache_ttl,
        catalog_prefetch_interval,
        catalog_station_limit,
        fallback_server,
        listen_host,
        listen_port,
        log_dir,
        log_level,
        mirrors,
        prometheus_exporter_prefix,
        prometheus_exporter,
        tcp_timeout,
        threads,
        useragent,
    })
}

pub fn load_config() -> Result<Config, Box<dyn Error>> {
    let matches = build_cli().get_matches();
    let config = read_config_file(&matches)?;
    config_from(&matches, &config)
}
