use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;

use thiserror::Error;

const MIN_JWT_SECRET_BYTES: usize = 32;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub database_path: String,
    pub jwt_secret: String,
    pub jwt_ttl: Duration,
    pub auth_clock_skew: Duration,
    pub lock_ttl: Duration,
    pub rate_limit_window: Duration,
    pub login_rate_limit_per_window: u32,
    pub register_rate_limit_per_window: u32,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("database_path", &self.database_path)
            .field("jwt_secret", &"[REDACTED]")
            .field("jwt_ttl", &self.jwt_ttl)
            .field("auth_clock_skew", &self.auth_clock_skew)
            .field("lock_ttl", &self.lock_ttl)
            .field("rate_limit_window", &self.rate_limit_window)
            .field(
                "login_rate_limit_per_window",
                &self.login_rate_limit_per_window,
            )
            .field(
                "register_rate_limit_per_window",
                &self.register_rate_limit_per_window,
            )
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = value_or_default(&lookup, "NOTELOCK_BIND_ADDR", "127.0.0.1:8080");
        let database_path = value_or_default(&lookup, "NOTELOCK_DATABASE_PATH", "notelock.db");

        let jwt_secret = required_trimmed(&lookup, "JWT_SECRET")?;
        if jwt_secret.len() < MIN_JWT_SECRET_BYTES {
            return Err(ConfigError::Invalid(format!(
                "JWT_SECRET must be at least {MIN_JWT_SECRET_BYTES} bytes"
            )));
        }

        let jwt_exp_minutes = ranged(&lookup, "JWT_EXP_MINUTES", "15", 1, 1_440)?;
        let auth_clock_skew_secs = ranged(&lookup, "AUTH_CLOCK_SKEW_SECS", "60", 0, 300)?;
        let lock_ttl_secs = ranged(&lookup, "LOCK_TTL_SECONDS", "300", 5, 3_600)?;
        let rate_limit_window_secs = ranged(&lookup, "RATE_LIMIT_WINDOW_SECS", "60", 10, 3_600)?;

        let login_rate_limit_per_window =
            ranged(&lookup, "LOGIN_RATE_LIMIT_PER_WINDOW", "10", 1, 1_000)?;
        let register_rate_limit_per_window =
            ranged(&lookup, "REGISTER_RATE_LIMIT_PER_WINDOW", "5", 1, 1_000)?;

        Ok(Self {
            bind_addr,
            database_path,
            jwt_secret,
            jwt_ttl: Duration::from_secs(jwt_exp_minutes * 60),
            auth_clock_skew: Duration::from_secs(auth_clock_skew_secs),
            lock_ttl: Duration::from_secs(lock_ttl_secs),
            rate_limit_window: Duration::from_secs(rate_limit_window_secs),
            login_rate_limit_per_window: narrow(login_rate_limit_per_window),
            register_rate_limit_per_window: narrow(register_rate_limit_per_window),
        })
    }
}

/// Parse `name` as an integer in `[min, max]`, falling back to `default`
fn ranged(
    lookup: impl Fn(&str) -> Option<String>,
    name: &str,
    default: &str,
    min: u64,
    max: u64,
) -> Result<u64, ConfigError> {
    let value = value_or_default(lookup, name, default)
        .parse::<u64>()
        .map_err(|_| {
            ConfigError::Invalid(format!("{name} must be an integer in [{min}, {max}]"))
        })?;
    if !(min..=max).contains(&value) {
        return Err(ConfigError::Invalid(format!(
            "{name} must be in [{min}, {max}]"
        )));
    }
    Ok(value)
}

// Callers bound these to at most 1000.
fn narrow(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

fn value_or_default(lookup: impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    optional_trimmed(lookup, name).unwrap_or_else(|| default.to_string())
}

fn required_trimmed(
    lookup: impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<String, ConfigError> {
    optional_trimmed(lookup, name).ok_or(ConfigError::MissingVar(name))
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef-sensitive";

    fn load(map: &HashMap<&str, &str>) -> Result<AppConfig, ConfigError> {
        AppConfig::from_lookup(|key| map.get(key).map(|value| (*value).to_string()))
    }

    #[test]
    fn config_requires_jwt_secret() {
        let map: HashMap<&str, &str> = HashMap::new();
        let err = load(&map).unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn config_rejects_short_secret() {
        let map = HashMap::from([("JWT_SECRET", "too-short")]);
        let err = load(&map).unwrap_err();
        assert!(err.to_string().contains("at least 32 bytes"));
    }

    #[test]
    fn config_applies_defaults() {
        let map = HashMap::from([("JWT_SECRET", SECRET)]);
        let config = load(&map).unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.database_path, "notelock.db");
        assert_eq!(config.jwt_ttl, Duration::from_secs(15 * 60));
        assert_eq!(config.auth_clock_skew, Duration::from_secs(60));
        assert_eq!(config.lock_ttl, Duration::from_secs(300));
        assert_eq!(config.rate_limit_window, Duration::from_secs(60));
        assert_eq!(config.login_rate_limit_per_window, 10);
        assert_eq!(config.register_rate_limit_per_window, 5);
    }

    #[test]
    fn config_enforces_ranges() {
        for (name, value) in [
            ("LOCK_TTL_SECONDS", "4"),
            ("LOCK_TTL_SECONDS", "3601"),
            ("JWT_EXP_MINUTES", "0"),
            ("AUTH_CLOCK_SKEW_SECS", "301"),
            ("RATE_LIMIT_WINDOW_SECS", "abc"),
            ("LOGIN_RATE_LIMIT_PER_WINDOW", "1001"),
        ] {
            let map = HashMap::from([("JWT_SECRET", SECRET), (name, value)]);
            let err = load(&map).unwrap_err();
            assert!(err.to_string().contains(name), "{name}={value}");
        }
    }

    #[test]
    fn config_redacts_sensitive_debug_fields() {
        let map = HashMap::from([("JWT_SECRET", SECRET), ("LOCK_TTL_SECONDS", "30")]);
        let config = load(&map).unwrap();
        assert_eq!(config.lock_ttl, Duration::from_secs(30));

        let debug_output = format!("{config:?}");
        assert!(!debug_output.contains("sensitive"));
        assert!(debug_output.contains("[REDACTED]"));
    }
}
