// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Parse a level name (`trace`, `debug`, `info`, `warn`, `error`).
pub fn parse_level(name: &str) -> Result<Level, String> {
    name.trim()
        .parse::<Level>()
        .map_err(|_| format!("unknown log level '{}'", name))
}

/// Install the global subscriber. Unknown or missing levels fall back to
/// INFO. Logs go to stderr so stdout stays free for sweep output.
///
/// A second call is ignored.
pub fn init_logging(log_level: Option<&str>) {
    let level = log_level
        .and_then(|s| parse_level(s).ok())
        .unwrap_or(Level::INFO);

    let _ = FmtSubscriber::builder()
        .with_target(false)
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug").unwrap(), Level::DEBUG);
        assert_eq!(parse_level(" WARN ").unwrap(), Level::WARN);
        assert!(parse_level("loud").is_err());
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init_logging(Some("debug"));
        init_logging(None);
    }
}
