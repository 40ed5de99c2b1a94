use std::path::PathBuf;
use std::time::Duration;

use crate::rate_limit::RateLimitConfig;

const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("JWT_SECRET must be at least 32 characters long")]
    WeakSecret,
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Process settings, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub jwt_secret: String,
    pub bind_addr: String,
    pub frontend_url: String,
    pub data_dir: PathBuf,
    pub database_url: Option<String>,
    pub rate_limit_enabled: bool,
    pub rate_limit: RateLimitConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = get("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;
        if jwt_secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::WeakSecret);
        }

        let parse_num = |name: &'static str, default: u64| -> Result<u64, ConfigError> {
            match get(name) {
                None => Ok(default),
                Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid { name, value: v }),
            }
        };
        let defaults = RateLimitConfig::default();
        let rate_limit = RateLimitConfig {
            post_limit: parse_num("RL_POST_LIMIT", defaults.post_limit as u64)? as usize,
            post_window: Duration::from_secs(parse_num("RL_POST_WINDOW", defaults.post_window.as_secs())?),
        };
        let rate_limit_enabled = get("RL_DISABLED")
            .map(|v| !(v == "1" || v.eq_ignore_ascii_case("true")))
            .unwrap_or(true);

        Ok(Self {
            jwt_secret,
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            frontend_url: get("FRONTEND_URL").unwrap_or_else(|| "http://localhost:5173".to_string()),
            data_dir: get("PMTHREADS_DATA_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("data")),
            database_url: get("DATABASE_URL"),
            rate_limit_enabled,
            rate_limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| map.get(k).cloned()
    }

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn defaults_apply() {
        let cfg = AppConfig::from_lookup(lookup(&[("JWT_SECRET", SECRET)])).unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:8080");
        assert_eq!(cfg.data_dir, PathBuf::from("data"));
        assert!(cfg.rate_limit_enabled);
        assert_eq!(cfg.rate_limit.post_limit, 10);
        assert!(cfg.database_url.is_none());
    }

    #[test]
    fn secret_is_required_and_long() {
        assert!(matches!(AppConfig::from_lookup(lookup(&[])), Err(ConfigError::Missing("JWT_SECRET"))));
        assert!(matches!(
            AppConfig::from_lookup(lookup(&[("JWT_SECRET", "short")])),
            Err(ConfigError::WeakSecret)
        ));
    }

    #[test]
    fn rate_limit_overrides() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("JWT_SECRET", SECRET),
            ("RL_POST_LIMIT", "3"),
            ("RL_POST_WINDOW", "120"),
            ("RL_DISABLED", "true"),
        ]))
        .unwrap();
        assert_eq!(cfg.rate_limit.post_limit, 3);
        assert_eq!(cfg.rate_limit.post_window, Duration::from_secs(120));
        assert!(!cfg.rate_limit_enabled);
    }

    #[test]
    fn bad_number_is_reported() {
        let err = AppConfig::from_lookup(lookup(&[("JWT_SECRET", SECRET), ("RL_POST_LIMIT", "many")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "RL_POST_LIMIT", .. }));
    }
}
