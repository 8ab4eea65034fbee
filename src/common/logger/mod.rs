use std::{fs, path::Path};

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

pub mod formatter;
pub mod writer;

pub use formatter::*;
use writer::CircularFileWriter;

use crate::configs::Config;

fn filter_directives(config: &Config) -> String {
    let level = config.logging.level.as_deref().unwrap_or("info");
    let filters = config.logging.filters.as_deref().unwrap_or("");

    // symphonia probes are chatty at debug
    if filters.is_empty() {
        format!("{},symphonia=warn", level)
    } else {
        format!("{},symphonia=warn,{}", level, filters)
    }
}

/// Install the global subscriber. Returns `false` if one was already set.
pub fn init(config: &Config) -> bool {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(config)));

    let stdout_layer = fmt::layer()
        .event_format(RoomFormatter::new(true))
        .with_ansi(true);

    let file_layer = config.logging.file.as_ref().map(|file_config| {
        if let Some(parent) = Path::new(&file_config.path).parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                eprintln!("Failed to create log directory: {}", e);
            }
        }

        let writer = CircularFileWriter::new(file_config.path.clone(), file_config.max_lines);
        fmt::layer()
            .with_writer(writer)
            .event_format(RoomFormatter::new(false))
            .with_ansi(false)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configs::LoggingConfig;

    #[test]
    fn test_filter_directives_default() {
        let config = Config::default();
        assert_eq!(filter_directives(&config), "info,symphonia=warn");
    }

    #[test]
    fn test_filter_directives_with_extra_filters() {
        let config = Config {
            logging: LoggingConfig {
                level: Some("debug".into()),
                filters: Some("reqwest=info".into()),
                file: None,
            },
            ..Config::default()
        };
        assert_eq!(
            filter_directives(&config),
            "debug,symphonia=warn,reqwest=info"
        );
    }
}
