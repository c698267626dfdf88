use log::LevelFilter;

/// Log levels: one default for every dependency, one for this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogSettings {
    pub default_level: LevelFilter,
    pub exporter_level: LevelFilter,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            default_level: LevelFilter::Error,
            exporter_level: LevelFilter::Trace,
        }
    }
}

impl LogSettings {
    /// `env_logger` filter string for these settings.
    pub fn filter(&self) -> String {
        format!(
            "{},{}={}",
            self.default_level.to_string().to_lowercase(),
            env!("CARGO_CRATE_NAME"),
            self.exporter_level.to_string().to_lowercase()
        )
    }

    /// Install the logger. `RUST_LOG` overrides these settings when set.
    /// Later calls are no-ops.
    pub fn init(&self) {
        let env = env_logger::Env::default().default_filter_or(self.filter());
        let _ = env_logger::Builder::from_env(env).format_timestamp_millis().try_init();
    }
}
