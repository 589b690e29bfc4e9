use std::{env, path::PathBuf, str::FromStr, time::Duration};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
#[error("invalid value {value:?} for {key}")]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub data_path: PathBuf,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            port: try_load("PORT", 8080)?,
            data_path: path_var("APP_DATA_PATH", "data/accounts.json"),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server_url: String,
    pub pending_path: PathBuf,
    pub sync_interval: Duration,
    pub probe_interval: Duration,
    pub request_timeout: Duration,
    /// Set when taps should also schedule a flush after a quiet window.
    pub debounce: Option<Duration>,
    /// Session token to resume without logging in again.
    pub session: Option<String>,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let debounce = match env::var("COUNTER_DEBOUNCE_MS") {
            Ok(raw) => Some(Duration::from_millis(parse("COUNTER_DEBOUNCE_MS", &raw)?)),
            Err(_) => None,
        };

        Ok(Self {
            server_url: env::var("COUNTER_SERVER_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8080".to_string())
                .trim_end_matches('/')
                .to_string(),
            pending_path: path_var("COUNTER_PENDING_PATH", "data/pending.json"),
            sync_interval: Duration::from_secs(positive("COUNTER_SYNC_INTERVAL_SECS", 5)?),
            probe_interval: Duration::from_secs(positive("COUNTER_PROBE_INTERVAL_SECS", 10)?),
            request_timeout: Duration::from_secs(positive("COUNTER_REQUEST_TIMEOUT_SECS", 10)?),
            debounce,
            session: env::var("COUNTER_SESSION").ok().filter(|token| !token.is_empty()),
        })
    }
}

fn path_var(key: &str, default: &str) -> PathBuf {
    env::var(key)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(default))
}

fn try_load<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => parse(key, &raw),
        Err(_) => {
            info!("{key} not set, using default");
            Ok(default)
        }
    }
}

fn positive(key: &'static str, default: u64) -> Result<u64, ConfigError> {
    let value = try_load(key, default)?;
    if value == 0 {
        return Err(ConfigError {
            key,
            value: value.to_string(),
        });
    }
    Ok(value)
}

fn parse<T: FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError {
        key,
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_garbage() {
        let err = parse::<u64>("COUNTER_SYNC_INTERVAL_SECS", "soon").unwrap_err();
        assert_eq!(err.key, "COUNTER_SYNC_INTERVAL_SECS");
        assert_eq!(parse::<u16>("PORT", " 9090 ").unwrap(), 9090);
    }
}
