use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;
use std::io;

const CRATE_TARGET: &str = "radiopassport_api";

/// Level for this crate and for everything else at a given `-v` count.
fn levels(verbosity: usize) -> (LevelFilter, LevelFilter) {
    match verbosity {
        0 => (LevelFilter::Warn, LevelFilter::Warn),
        1 => (LevelFilter::Info, LevelFilter::Warn),
        2 => (LevelFilter::Debug, LevelFilter::Info),
        _3_or_more => (LevelFilter::Trace, LevelFilter::Info),
    }
}

fn timestamp() -> chrono::format::DelayedFormat<chrono::format::StrftimeItems<'static>> {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S,%f")
}

/// Coloured output on stdout, plain output in `<log_dir>/main.log`.
/// An empty `log_dir` logs to stdout only.
pub fn setup_logger(verbosity: usize, log_dir: &str) -> Result<(), fern::InitError> {
    let (own_level, other_level) = levels(verbosity);
    let mut base_config = fern::Dispatch::new()
        .level(other_level)
        .level_for(CRATE_TARGET, own_level)
        // connection pool chatter from the mirror client
        .level_for("hyper", LevelFilter::Warn);

    let colors_line = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::BrightWhite)
        .debug(Color::White)
        .trace(Color::BrightBlack);

    if !log_dir.is_empty() {
        let file_config = fern::Dispatch::new()
            .format(|out, message, record| {
                out.finish(format_args!(
                    "{} {} {} {}",
                    timestamp(),
                    record.level(),
                    record.target(),
                    message
                ))
            })
            .chain(fern::log_file(format!("{}/main.log", log_dir))?);
        base_config = base_config.chain(file_config);
    }

    let stdout_config = fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{} {} {} {}",
                timestamp(),
                colors_line.color(record.level()),
                record.target(),
                message
            ));
        })
        .chain(io::stdout());

    base_config.chain(stdout_config).apply()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_levels() {
        assert_eq!(levels(0), (LevelFilter::Warn, LevelFilter::Warn));
        assert_eq!(levels(1), (LevelFilter::Info, LevelFilter::Warn));
        assert_eq!(levels(2), (LevelFilter::Debug, LevelFilter::Info));
        assert_eq!(levels(7), (LevelFilter::Trace, LevelFilter::Info));
    }
}
