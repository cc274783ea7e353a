//! A minimal stderr backend for the `log` facade.

use log::{LevelFilter, Log, Metadata, Record};
use std::{env, io::Write, str::FromStr};

/// Environment variable that sets the log level: `off`, `error`, `warn`,
/// `info`, `debug`, or `trace`.
pub const LOG_ENV_VAR: &str = "HOLDPLAN_LOG";

const DEFAULT_LEVEL: LevelFilter = LevelFilter::Warn;

static LOGGER: StderrLogger = StderrLogger;

struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        // ignore write failures; there's nowhere else to report them
        let _ = writeln!(
            std::io::stderr().lock(),
            "[{} {}] {}",
            record.level(),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Parse a level name, falling back to the default for anything unrecognized.
pub fn parse_level(s: Option<&str>) -> LevelFilter {
    s.and_then(|s| LevelFilter::from_str(s.trim()).ok())
        .unwrap_or(DEFAULT_LEVEL)
}

/// The level named by [`LOG_ENV_VAR`], or `warn` if unset or invalid.
pub fn level_from_env() -> LevelFilter {
    parse_level(env::var(LOG_ENV_VAR).ok().as_deref())
}

/// Install the stderr logger as the global `log` backend. Can only be called
/// once per process.
pub fn init(level: LevelFilter) -> Result<(), String> {
    log::set_logger(&LOGGER).map_err(|err| format!("failed to install logger: {err}"))?;
    log::set_max_level(level);
    Ok(())
}
