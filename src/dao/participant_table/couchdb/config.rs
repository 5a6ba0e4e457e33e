use std::{env, time::Duration};

use super::error::{CouchDaoError, CouchResult};

const DEFAULT_DATABASE: &str = "participants";
/// How long CouchDB may hold a longpoll `_changes` request open.
const DEFAULT_FEED_TIMEOUT: Duration = Duration::from_secs(30);
/// Extra time the HTTP client waits beyond the longpoll window.
const REQUEST_TIMEOUT_MARGIN: Duration = Duration::from_secs(10);

/// Basic-auth credentials for the CouchDB server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouchCredentials {
    /// CouchDB user name.
    pub username: String,
    /// Password of that user.
    pub password: String,
}

/// Where the participant database lives and how to reach it.
#[derive(Debug, Clone)]
pub struct CouchConfig {
    /// Server root such as `http://localhost:5984`, without a trailing slash.
    pub base_url: String,
    /// Database holding one document per participant.
    pub database: String,
    /// Optional basic-auth credentials.
    pub credentials: Option<CouchCredentials>,
    /// Longpoll window of the `_changes` feed.
    pub feed_timeout: Duration,
}

impl CouchConfig {
    /// Validate `base_url` and target the default participant database.
    pub fn new(base_url: &str) -> CouchResult<Self> {
        let base_url = base_url.trim().trim_end_matches('/');
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(CouchDaoError::InvalidSetting {
                name: "COUCH_BASE_URL",
                reason: format!("`{base_url}` is not an http(s) URL"),
            });
        }

        Ok(Self {
            base_url: base_url.to_owned(),
            database: DEFAULT_DATABASE.to_owned(),
            credentials: None,
            feed_timeout: DEFAULT_FEED_TIMEOUT,
        })
    }

    /// Read `COUCH_BASE_URL` (required), `COUCH_DB`, `COUCH_USERNAME`/`COUCH_PASSWORD`
    /// and `COUCH_FEED_TIMEOUT_SECS`.
    pub fn from_env() -> CouchResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> CouchResult<Self> {
        let base_url = lookup("COUCH_BASE_URL").ok_or(CouchDaoError::MissingEnvVar {
            var: "COUCH_BASE_URL",
        })?;
        let mut config = Self::new(&base_url)?;

        if let Some(database) = lookup("COUCH_DB").filter(|db| !db.trim().is_empty()) {
            config.database = database.trim().to_owned();
        }

        config.credentials = match (lookup("COUCH_USERNAME"), lookup("COUCH_PASSWORD")) {
            (Some(username), Some(password)) => Some(CouchCredentials { username, password }),
            (None, None) => None,
            _ => {
                return Err(CouchDaoError::InvalidSetting {
                    name: "COUCH_USERNAME",
                    reason: "username and password must be set together".into(),
                });
            }
        };

        if let Some(raw) = lookup("COUCH_FEED_TIMEOUT_SECS") {
            let secs = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| CouchDaoError::InvalidSetting {
                    name: "COUCH_FEED_TIMEOUT_SECS",
                    reason: format!("`{raw}` is not a positive number of seconds"),
                })?;
            config.feed_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Client-side timeout, long enough to outlast a longpoll request.
    pub fn request_timeout(&self) -> Duration {
        self.feed_timeout.saturating_add(REQUEST_TIMEOUT_MARGIN)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn only_the_base_url_is_required() {
        let config = CouchConfig::from_lookup(lookup(&[("COUCH_BASE_URL", "http://couch:5984/")]))
            .unwrap();
        assert_eq!(config.base_url, "http://couch:5984");
        assert_eq!(config.database, "participants");
        assert_eq!(config.credentials, None);
        assert_eq!(config.request_timeout(), Duration::from_secs(40));

        let err = CouchConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, CouchDaoError::MissingEnvVar { var: "COUCH_BASE_URL" }));
    }

    #[test]
    fn optional_settings_are_applied() {
        let config = CouchConfig::from_lookup(lookup(&[
            ("COUCH_BASE_URL", "https://couch.example"),
            ("COUCH_DB", "finals"),
            ("COUCH_USERNAME", "admin"),
            ("COUCH_PASSWORD", "secret"),
            ("COUCH_FEED_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();
        assert_eq!(config.database, "finals");
        assert_eq!(
            config.credentials,
            Some(CouchCredentials {
                username: "admin".into(),
                password: "secret".into(),
            })
        );
        assert_eq!(config.feed_timeout, Duration::from_secs(5));
    }

    #[test]
    fn inconsistent_settings_are_rejected() {
        for vars in [
            vec![("COUCH_BASE_URL", "couch:5984")],
            vec![("COUCH_BASE_URL", "http://couch"), ("COUCH_USERNAME", "admin")],
            vec![("COUCH_BASE_URL", "http://couch"), ("COUCH_FEED_TIMEOUT_SECS", "0")],
        ] {
            let err = CouchConfig::from_lookup(lookup(&vars)).unwrap_err();
            assert!(matches!(err, CouchDaoError::InvalidSetting { .. }), "{vars:?}");
        }
    }
}
