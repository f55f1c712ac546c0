//! Stderr logging, formatted to match the original daemon's wire
//! format: a microsecond monotonic timestamp and a doubled one-letter
//! severity marker ahead of the message.

use std::io::Write;
use std::time::Instant;

use log::LevelFilter;

fn severity_marker(level: log::Level) -> &'static str {
    match level {
        log::Level::Error => "ER",
        log::Level::Warn => "WN",
        log::Level::Info => "IN",
        log::Level::Debug => "DB",
        log::Level::Trace => "TR",
    }
}

/// `-v` count to a `log` level filter: none is Info (the original's
/// default runtime verbosity), each repeat steps one level more verbose.
pub fn level_filter_for_verbosity(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

pub fn init(verbosity: u8) {
    let start = Instant::now();
    let filter = level_filter_for_verbosity(verbosity);

    env_logger::Builder::new()
        .filter_level(filter)
        .format(move |buf, record| {
            let elapsed = start.elapsed();
            let marker = severity_marker(record.level());
            writeln!(
                buf,
                "[{:10}.{:09}] {}{} {}",
                elapsed.as_secs(),
                elapsed.subsec_nanos(),
                marker,
                marker,
                record.args()
            )
        })
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_maps_to_expected_levels() {
        assert_eq!(level_filter_for_verbosity(0), LevelFilter::Info);
        assert_eq!(level_filter_for_verbosity(1), LevelFilter::Debug);
        assert_eq!(level_filter_for_verbosity(2), LevelFilter::Trace);
        assert_eq!(level_filter_for_verbosity(9), LevelFilter::Trace);
    }

    #[test]
    fn severity_markers_are_doubled_single_letters() {
        assert_eq!(severity_marker(log::Level::Error), "ER");
        assert_eq!(severity_marker(log::Level::Warn), "WN");
        assert_eq!(severity_marker(log::Level::Info), "IN");
    }
}
