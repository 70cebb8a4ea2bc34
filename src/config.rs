use std::path::PathBuf;
use std::str::FromStr;

use chrono::Duration;

use crate::errors::AppError;

pub const DEFAULT_API_URL: &str = "http://localhost:8001/api/v1";
pub const DEFAULT_STORE_PATH: &str = ".ferdi-session.json";

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub api_url: String,
    /// Idle time after which the session is considered over.
    pub session_timeout: Duration,
    pub cache_ttl: Duration,
    /// Maximum age of anything kept in persistent storage.
    pub storage_retention: Duration,
    pub poll_interval: std::time::Duration,
    pub warning_window: Duration,
    pub http_timeout: std::time::Duration,
    pub store_path: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            session_timeout: Duration::hours(8),
            cache_ttl: Duration::minutes(30),
            storage_retention: Duration::days(7),
            poll_interval: std::time::Duration::from_secs(60),
            warning_window: Duration::minutes(5),
            http_timeout: std::time::Duration::from_secs(30),
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
        }
    }
}

impl SessionConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let defaults = Self::default();

        let api_url = std::env::var("FERDI_API_URL").unwrap_or(defaults.api_url);
        let api_url = api_url.trim_end_matches('/').to_string();
        if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
            return Err(AppError::configuration("FERDI_API_URL must be an http(s) URL"));
        }

        let session_timeout = env_number::<i64>("FERDI_SESSION_TIMEOUT_MINUTES", 480)?;
        let cache_ttl = env_number::<i64>("FERDI_CACHE_TTL_MINUTES", 30)?;
        let retention = env_number::<i64>("FERDI_STORAGE_RETENTION_DAYS", 7)?;
        let poll = env_number::<u64>("FERDI_SESSION_POLL_SECONDS", 60)?;
        let warning = env_number::<i64>("FERDI_SESSION_WARNING_MINUTES", 5)?;
        let http_timeout = env_number::<u64>("FERDI_HTTP_TIMEOUT_SECONDS", 30)?;

        if poll == 0 {
            return Err(AppError::configuration("FERDI_SESSION_POLL_SECONDS must be positive"));
        }

        let store_path = std::env::var("FERDI_STORE_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.store_path);

        Ok(Self {
            api_url,
            session_timeout: positive_duration(
                "FERDI_SESSION_TIMEOUT_MINUTES",
                Duration::try_minutes(session_timeout),
            )?,
            cache_ttl: positive_duration("FERDI_CACHE_TTL_MINUTES", Duration::try_minutes(cache_ttl))?,
            storage_retention: positive_duration(
                "FERDI_STORAGE_RETENTION_DAYS",
                Duration::try_days(retention),
            )?,
            poll_interval: std::time::Duration::from_secs(poll),
            warning_window: Duration::try_minutes(warning.max(0))
                .filter(|window| *window <= Duration::days(MAX_WINDOW_DAYS))
                .ok_or_else(|| {
                    AppError::configuration("FERDI_SESSION_WARNING_MINUTES is out of range")
                })?,
            http_timeout: std::time::Duration::from_secs(http_timeout),
            store_path,
        })
    }
}

fn env_number<T: FromStr>(name: &str, default: T) -> Result<T, AppError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| AppError::configuration(format!("{name} must be a valid integer"))),
        Err(_) => Ok(default),
    }
}

/// Upper bound for any configured window, keeps `now + window` representable.
const MAX_WINDOW_DAYS: i64 = 36_500;

/// `None` means the value overflowed `chrono::Duration`.
fn positive_duration(name: &str, duration: Option<Duration>) -> Result<Duration, AppError> {
    match duration {
        Some(duration) if duration <= Duration::zero() => {
            Err(AppError::configuration(format!("{name} must be positive")))
        }
        Some(duration) if duration <= Duration::days(MAX_WINDOW_DAYS) => Ok(duration),
        _ => Err(AppError::configuration(format!("{name} is out of range"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = SessionConfig::default();
        assert_eq!(config.cache_ttl, Duration::minutes(30));
        assert_eq!(config.storage_retention, Duration::days(7));
        assert_eq!(config.session_timeout, Duration::hours(8));
        assert_eq!(config.poll_interval, std::time::Duration::from_secs(60));
    }

    #[test]
    fn env_number_rejects_garbage() {
        std::env::set_var("FERDI_TEST_GARBAGE_NUMBER", "ten");
        let err = env_number::<i64>("FERDI_TEST_GARBAGE_NUMBER", 1).unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
        assert_eq!(env_number::<i64>("FERDI_TEST_MISSING_NUMBER", 7).unwrap(), 7);
    }

    #[test]
    fn out_of_range_durations_are_configuration_errors() {
        let err = positive_duration("FERDI_SESSION_TIMEOUT_MINUTES", Duration::try_minutes(999_999_999_999_999_999))
            .unwrap_err();
        assert!(matches!(&err, AppError::Configuration(message) if message.contains("out of range")));

        let err = positive_duration("FERDI_CACHE_TTL_MINUTES", Duration::try_minutes(0)).unwrap_err();
        assert!(matches!(&err, AppError::Configuration(message) if message.contains("positive")));

        // representable as a Duration, but not once added to a timestamp
        let err = positive_duration("FERDI_SESSION_TIMEOUT_MINUTES", Duration::try_minutes(1 << 40)).unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));

        assert_eq!(
            positive_duration("FERDI_STORAGE_RETENTION_DAYS", Duration::try_days(7)).unwrap(),
            Duration::days(7)
        );
    }

    #[test]
    fn from_env_rejects_huge_warning_window() {
        std::env::set_var("FERDI_SESSION_WARNING_MINUTES", "999999999999999999");
        let result = SessionConfig::from_env();
        std::env::remove_var("FERDI_SESSION_WARNING_MINUTES");

        assert!(matches!(result, Err(AppError::Configuration(_))));
    }
}
