use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_SPORT_FEED_URL: &str = "https://stapubox.com/sportslist/";

#[derive(Debug)]
pub enum ConfigError {
    Invalid { var: &'static str, value: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Invalid { var, value } => write!(f, "invalid value for {var}: {value:?}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Process configuration, read once from `SLOTBOOK_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub max_connections: usize,
    pub lock_timeout: Duration,
    pub compact_threshold: u64,
    pub metrics_port: Option<u16>,
    /// `None` disables the sport catalog sync.
    pub sport_feed_url: Option<String>,
    pub sport_sync_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 8080,
            data_dir: PathBuf::from("./data"),
            max_connections: 256,
            lock_timeout: Duration::from_millis(5_000),
            compact_threshold: 1_000,
            metrics_port: None,
            sport_feed_url: Some(DEFAULT_SPORT_FEED_URL.into()),
            sport_sync_interval: Duration::from_secs(3_600),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            bind: lookup("SLOTBOOK_BIND").unwrap_or(defaults.bind),
            port: parse(&lookup, "SLOTBOOK_PORT")?.unwrap_or(defaults.port),
            data_dir: lookup("SLOTBOOK_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            max_connections: parse_nonzero(&lookup, "SLOTBOOK_MAX_CONNECTIONS")?
                .unwrap_or(defaults.max_connections),
            lock_timeout: parse_nonzero(&lookup, "SLOTBOOK_LOCK_TIMEOUT_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.lock_timeout),
            compact_threshold: parse(&lookup, "SLOTBOOK_COMPACT_THRESHOLD")?
                .unwrap_or(defaults.compact_threshold),
            metrics_port: parse(&lookup, "SLOTBOOK_METRICS_PORT")?,
            sport_feed_url: match lookup("SLOTBOOK_SPORT_FEED_URL") {
                Some(url) if url.trim().is_empty() => None,
                Some(url) => Some(url),
                None => defaults.sport_feed_url,
            },
            sport_sync_interval: parse_nonzero(&lookup, "SLOTBOOK_SPORT_SYNC_INTERVAL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.sport_sync_interval),
        })
    }

    pub fn wal_path(&self) -> PathBuf {
        self.data_dir.join("slotbook.wal")
    }
}

fn parse<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { var, value }),
    }
}

/// Like `parse`, for values where zero would stall or panic at runtime.
fn parse_nonzero<T: std::str::FromStr + Default + PartialEq>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError> {
    match parse::<T>(lookup, var)? {
        Some(v) if v == T::default() => Err(ConfigError::Invalid {
            var,
            value: lookup(var).unwrap_or_default(),
        }),
        other => Ok(other),
    }
}
