//! Application-level configuration loading: admin code, reveal pacing and backend selection.

use std::{env, fs, io::ErrorKind, path::PathBuf, str::FromStr, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::state::reveal::{DEFAULT_REVEAL_SIZE, RevealTimings};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "SCOREBOARD_BACK_CONFIG_PATH";
const ADMIN_CODE_ENV: &str = "SCOREBOARD_ADMIN_CODE";
const STORE_ENV: &str = "SCOREBOARD_STORE";

const DEFAULT_ADMIN_CODE: &str = "1234";
const DEFAULT_TIME_UNIT_MS: u64 = 1_000;
const DEFAULT_SSE_CAPACITY: usize = 64;
/// Units an access denial stays on screen.
const ACCESS_ERROR_CLEAR_UNITS: u32 = 3;

/// Which participant table backend the server connects to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreKind {
    /// In-process table, no external service.
    #[default]
    Memory,
    /// CouchDB over HTTP.
    Couch,
    /// MongoDB replica set.
    Mongo,
}

impl StoreKind {
    /// Name used in logs and the health response.
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKind::Memory => "memory",
            StoreKind::Couch => "couch",
            StoreKind::Mongo => "mongo",
        }
    }
}

impl FromStr for StoreKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreKind::Memory),
            "couch" | "couchdb" => Ok(StoreKind::Couch),
            "mongo" | "mongodb" => Ok(StoreKind::Mongo),
            other => Err(format!("unknown store `{other}`")),
        }
    }
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    admin_code: String,
    store: StoreKind,
    time_unit: Duration,
    hold_units: u32,
    gap_units: u32,
    reveal_size: usize,
    sse_capacity: usize,
}

impl AppConfig {
    /// Load the configuration from disk and the environment, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let config = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        store = app_config.store.as_str(),
                        "loaded configuration file"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        };

        config.with_env_overrides(env::var(ADMIN_CODE_ENV).ok(), env::var(STORE_ENV).ok())
    }

    fn with_env_overrides(mut self, admin_code: Option<String>, store: Option<String>) -> Self {
        if let Some(code) = admin_code.filter(|code| !code.is_empty()) {
            self.admin_code = code;
        }
        if let Some(raw) = store {
            match raw.parse() {
                Ok(kind) => self.store = kind,
                Err(err) => warn!(error = %err, "ignoring {STORE_ENV}"),
            }
        }
        self
    }

    /// Replace the shared admin code.
    pub fn with_admin_code(mut self, code: impl Into<String>) -> Self {
        self.admin_code = code.into();
        self
    }

    /// Replace the length of one reveal time unit.
    pub fn with_time_unit(mut self, unit: Duration) -> Self {
        self.time_unit = unit;
        self
    }

    /// Shared code unlocking the admin surface.
    pub fn admin_code(&self) -> &str {
        &self.admin_code
    }

    /// Participant table backend to connect.
    pub fn store(&self) -> StoreKind {
        self.store
    }

    /// Spotlight and gap durations of the reveal.
    pub fn reveal_timings(&self) -> RevealTimings {
        RevealTimings {
            unit: self.time_unit,
            hold_units: self.hold_units,
            gap_units: self.gap_units,
        }
    }

    /// Number of top participants captured by a reveal.
    pub fn reveal_size(&self) -> usize {
        self.reveal_size
    }

    /// How long a client should keep an access denial visible.
    pub fn access_error_clear_after(&self) -> Duration {
        self.time_unit.saturating_mul(ACCESS_ERROR_CLEAR_UNITS)
    }

    /// Events a public SSE subscriber may lag behind before skipping.
    pub fn sse_capacity(&self) -> usize {
        self.sse_capacity
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let timings = RevealTimings::default();
        Self {
            admin_code: DEFAULT_ADMIN_CODE.to_string(),
            store: StoreKind::default(),
            time_unit: Duration::from_millis(DEFAULT_TIME_UNIT_MS),
            hold_units: timings.hold_units,
            gap_units: timings.gap_units,
            reveal_size: DEFAULT_REVEAL_SIZE,
            sse_capacity: DEFAULT_SSE_CAPACITY,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    admin_code: Option<String>,
    store: Option<String>,
    time_unit_ms: Option<u64>,
    hold_units: Option<u32>,
    gap_units: Option<u32>,
    reveal_size: Option<usize>,
    sse_capacity: Option<usize>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = Self::default();
        let store = match value.store.as_deref().map(str::parse::<StoreKind>) {
            Some(Ok(kind)) => kind,
            Some(Err(err)) => {
                warn!(error = %err, "ignoring configured store");
                defaults.store
            }
            None => defaults.store,
        };

        Self {
            admin_code: value
                .admin_code
                .filter(|code| !code.is_empty())
                .unwrap_or(defaults.admin_code),
            store,
            time_unit: value
                .time_unit_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.time_unit),
            hold_units: value.hold_units.unwrap_or(defaults.hold_units),
            gap_units: value.gap_units.unwrap_or(defaults.gap_units),
            reveal_size: value
                .reveal_size
                .filter(|size| *size > 0)
                .unwrap_or(defaults.reveal_size),
            sse_capacity: value
                .sse_capacity
                .filter(|capacity| *capacity > 0)
                .unwrap_or(defaults.sse_capacity),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_event_setup() {
        let config = AppConfig::default();
        assert_eq!(config.admin_code(), "1234");
        assert_eq!(config.store(), StoreKind::Memory);
        assert_eq!(config.reveal_size(), 6);
        assert_eq!(config.reveal_timings(), RevealTimings::default());
        assert_eq!(config.access_error_clear_after(), Duration::from_secs(3));
    }

    #[test]
    fn shipped_file_matches_the_defaults() {
        let raw: RawConfig = serde_json::from_str(include_str!("../config/app.json")).unwrap();
        let config = AppConfig::from(raw);

        assert_eq!(config.admin_code(), AppConfig::default().admin_code());
        assert_eq!(config.store(), StoreKind::Memory);
        assert_eq!(config.reveal_timings(), RevealTimings::default());
        assert_eq!(config.reveal_size(), 6);
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let raw: RawConfig =
            serde_json::from_str(r#"{"store": "mongodb", "time_unit_ms": 250}"#).unwrap();
        let config = AppConfig::from(raw);

        assert_eq!(config.store(), StoreKind::Mongo);
        assert_eq!(config.reveal_timings().unit, Duration::from_millis(250));
        assert_eq!(config.access_error_clear_after(), Duration::from_millis(750));
        assert_eq!(config.admin_code(), "1234");
    }

    #[test]
    fn huge_time_unit_saturates() {
        let raw: RawConfig =
            serde_json::from_str(&format!(r#"{{"time_unit_ms": {}}}"#, u64::MAX)).unwrap();
        let config = AppConfig::from(raw);

        assert_eq!(config.access_error_clear_after(), Duration::MAX);
        assert_eq!(
            config.reveal_timings().delay(crate::state::reveal::RevealDelay::Hold),
            Duration::MAX
        );
    }

    #[test]
    fn invalid_values_fall_back() {
        let raw: RawConfig =
            serde_json::from_str(r#"{"store": "sqlite", "admin_code": "", "reveal_size": 0}"#)
                .unwrap();
        let config = AppConfig::from(raw);

        assert_eq!(config.store(), StoreKind::Memory);
        assert_eq!(config.admin_code(), "1234");
        assert_eq!(config.reveal_size(), 6);
    }

    #[test]
    fn environment_overrides_the_file() {
        let config = AppConfig::default()
            .with_env_overrides(Some("9999".into()), Some("Couch".into()));
        assert_eq!(config.admin_code(), "9999");
        assert_eq!(config.store(), StoreKind::Couch);

        let unchanged = AppConfig::default().with_env_overrides(Some(String::new()), None);
        assert_eq!(unchanged.admin_code(), "1234");
    }
}
